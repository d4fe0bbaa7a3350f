//! Helpers for exercising the engine against a throw-away database and a scripted payment provider.
pub mod prepare_env;
pub mod scripted_gateway;
