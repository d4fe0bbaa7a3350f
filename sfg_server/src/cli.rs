use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Only these are printed. SFG_MP_ACCESS_TOKEN and SFG_MP_WEBHOOK_SECRET must never appear here.
    const DISPLAY_ENVS: [&str; 12] = [
        "RUST_LOG",
        "SFG_HOST",
        "SFG_PORT",
        "SFG_DATABASE_URL",
        "SFG_BASE_URL",
        "SFG_MP_API_URL",
        "SFG_MP_SIGNATURE_CHECKS",
        "SFG_MATCH_STRATEGY",
        "SFG_RECORD_DECLINED_PAYMENTS",
        "SFG_PENDING_RECHECK_INTERVAL",
        "SFG_USE_X_FORWARDED_FOR",
        "SFG_USE_FORWARDED",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
