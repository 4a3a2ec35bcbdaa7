//! Test servers for cases `wiremock` cannot express: a port nobody listens
//! on, and a streaming body that arrives in stages and then stalls.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// Base URL of a local port that refuses connections.
pub(crate) fn refused_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

/// Answers a single request with a `200` body that is written in two
/// stages: `head` right away, `tail` once `release` is called. The
/// connection is then held open without sending anything else.
pub(crate) struct StagedStreamServer {
    pub base_url: String,
    release: Option<oneshot::Sender<()>>,
}

impl StagedStreamServer {
    pub(crate) async fn start(head: Vec<String>, tail: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
        let (release_tx, release_rx) = oneshot::channel();

        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            read_request_head(&mut socket).await;

            let _ = socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/x-ndjson\r\nconnection: close\r\n\r\n",
                )
                .await;
            write_lines(&mut socket, &head).await;
            if release_rx.await.is_ok() {
                write_lines(&mut socket, &tail).await;
            }
            std::future::pending::<()>().await;
        });

        Self {
            base_url,
            release: Some(release_tx),
        }
    }

    pub(crate) fn release(&mut self) {
        if let Some(tx) = self.release.take() {
            let _ = tx.send(());
        }
    }
}

async fn read_request_head(socket: &mut TcpStream) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
}

async fn write_lines(socket: &mut TcpStream, lines: &[String]) {
    for line in lines {
        let _ = socket.write_all(format!("{line}\n").as_bytes()).await;
    }
    let _ = socket.flush().await;
}
