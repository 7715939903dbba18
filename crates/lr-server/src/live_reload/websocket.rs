//! WebSocket handler for live reload.
//!
//! Registers each upgraded socket and forwards reload signals to it. Inbound
//! frames are only used to notice that the client went away.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;

use super::connection::{Connection, RELOAD_MESSAGE};
use crate::state::AppState;

/// Why a connection task ended.
#[derive(Debug, thiserror::Error)]
enum Disconnect {
    #[error("closed by client")]
    ClientClosed,
    #[error("read failed: {0}")]
    ReadFailed(axum::Error),
    #[error("write failed: {0}")]
    WriteFailed(axum::Error),
    #[error("write timed out")]
    WriteTimedOut,
    #[error("closed by server")]
    ServerClosed,
}

/// Handle WebSocket upgrade for live reload.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_failed_upgrade(|error| {
        tracing::warn!(%error, "Live reload upgrade failed");
    })
    .on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let (conn, mut inbox) = Connection::new(state.send_buffer);
    let id = conn.id();

    // Registered before the first read, so a failure below always has an entry to remove
    state.registry.add(Arc::clone(&conn));
    tracing::debug!(client = %id, clients = state.registry.len(), "Live reload client connected");

    let reason = loop {
        tokio::select! {
            signal = inbox.recv() => {
                // `conn` keeps the sender alive, so the inbox never runs dry
                if signal.is_none() {
                    break Disconnect::ServerClosed;
                }
                let send = socket.send(Message::Text(RELOAD_MESSAGE.into()));
                match tokio::time::timeout(state.write_timeout, send).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => break Disconnect::WriteFailed(e),
                    Err(_) => break Disconnect::WriteTimedOut,
                }
            }
            message = socket.recv() => match message {
                Some(Ok(Message::Close(_))) | None => break Disconnect::ClientClosed,
                Some(Ok(_)) => {}
                Some(Err(e)) => break Disconnect::ReadFailed(e),
            },
            () = conn.closed() => break Disconnect::ServerClosed,
        }
    };

    conn.close();
    state.registry.remove(id);
    tracing::debug!(
        client = %id,
        %reason,
        clients = state.registry.len(),
        "Live reload client disconnected"
    );

    if matches!(reason, Disconnect::ServerClosed) {
        close_socket(socket, state.write_timeout).await;
    }
}

/// Best-effort close handshake, bounded by the write deadline.
async fn close_socket(mut socket: WebSocket, deadline: Duration) {
    let _ = tokio::time::timeout(deadline, socket.send(Message::Close(None))).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::create_router;
    use crate::live_reload::broadcast::broadcast_reload;
    use crate::live_reload::registry::ConnectionRegistry;
    use futures::{SinkExt, StreamExt};
    use pretty_assertions::assert_eq;
    use std::net::SocketAddr;
    use tokio::net::TcpStream;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn boot_server(registry: &Arc<ConnectionRegistry>) -> (SocketAddr, tempfile::TempDir) {
        let root = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState {
            registry: Arc::clone(registry),
            endpoint: "/reload".to_owned(),
            write_timeout: Duration::from_secs(1),
            send_buffer: 4,
        });
        let app = create_router(state, root.path());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        }));
        (addr, root)
    }

    async fn connect(addr: SocketAddr) -> Client {
        let (ws, _) = connect_async(format!("ws://{addr}/reload")).await.unwrap();
        ws
    }

    /// Poll until the registry reaches `len` members.
    async fn wait_for_clients(registry: &ConnectionRegistry, len: usize) {
        tokio::time::timeout(TIMEOUT, async {
            while registry.len() != len {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("registry never reached {len} clients"));
    }

    async fn read_text(ws: &mut Client) -> String {
        let msg = tokio::time::timeout(TIMEOUT, ws.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream closed")
            .expect("ws error");
        msg.to_text().unwrap().to_owned()
    }

    async fn assert_silent(ws: &mut Client) {
        let next = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
        assert!(next.is_err(), "unexpected message: {next:?}");
    }

    #[tokio::test]
    async fn test_clients_receive_reload_until_disconnect() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (addr, _root) = boot_server(&registry).await;

        let mut a = connect(addr).await;
        let mut b = connect(addr).await;
        wait_for_clients(&registry, 2).await;

        assert_eq!(broadcast_reload(&registry).delivered, 2);
        assert_eq!(read_text(&mut a).await, "reload");
        assert_eq!(read_text(&mut b).await, "reload");
        assert_silent(&mut b).await;

        a.close(None).await.unwrap();
        wait_for_clients(&registry, 1).await;

        assert_eq!(broadcast_reload(&registry).delivered, 1);
        assert_eq!(read_text(&mut b).await, "reload");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_inbound_messages_are_ignored() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (addr, _root) = boot_server(&registry).await;

        let mut client = connect(addr).await;
        wait_for_clients(&registry, 1).await;

        client
            .send(tungstenite::Message::text("reload please"))
            .await
            .unwrap();
        assert_silent(&mut client).await;
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_client_is_unregistered() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (addr, _root) = boot_server(&registry).await;

        let client = connect(addr).await;
        wait_for_clients(&registry, 1).await;

        drop(client);
        wait_for_clients(&registry, 0).await;

        assert_eq!(broadcast_reload(&registry).delivered, 0);
    }

    #[tokio::test]
    async fn test_server_close_sends_close_frame() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (addr, _root) = boot_server(&registry).await;

        let mut client = connect(addr).await;
        wait_for_clients(&registry, 1).await;

        assert_eq!(registry.close_all(), 1);

        let msg = tokio::time::timeout(TIMEOUT, client.next())
            .await
            .expect("timeout waiting for close")
            .expect("stream closed")
            .expect("ws error");
        assert!(msg.is_close());
    }

    #[tokio::test]
    async fn test_plain_request_to_endpoint_rejected() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (addr, _root) = boot_server(&registry).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        tokio::io::AsyncWriteExt::write_all(
            &mut stream,
            b"GET /reload HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await
        .unwrap();
        let mut response = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut stream, &mut response)
            .await
            .unwrap();

        let response = String::from_utf8_lossy(&response);
        assert!(!response.starts_with("HTTP/1.1 101"), "{response}");
        assert!(registry.is_empty());
    }
}
