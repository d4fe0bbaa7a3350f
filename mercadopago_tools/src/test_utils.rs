use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

/// Starts a local HTTP responder that answers exactly one request with the given status and JSON body.
///
/// Returns the base URL to point a [`crate::MercadoPagoConfig`] at, and a handle that resolves to the raw request the
/// responder received.
pub async fn respond_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Could not bind the test responder");
    let url = format!("http://{}", listener.local_addr().expect("Test responder has no address"));
    let response = format!(
        "HTTP/1.1 {status} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: \
         close\r\n\r\n{body}",
        body.len()
    );
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("Test responder could not accept a connection");
        let request = read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.expect("Test responder could not write");
        let _ = socket.shutdown().await;
        request
    });
    (url, handle)
}

/// Reads the request head and as much of the body as `Content-Length` announces.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.expect("Test responder could not read");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
