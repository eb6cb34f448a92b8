use crate::render::{render_binary, render_frame, render_liveness, LISTENING_BANNER};
use dt_core::config::ListenConfig;
use dt_core::event::{decode, ping_message, Liveness, PING_TIMESTAMP};
use dt_core::ListenError;
use futures::{SinkExt, StreamExt};
use std::future::Future;
use std::io::{ErrorKind, Write};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One WebSocket connection to the device event service. Rendered output
/// goes to `out`; diagnostics go through `tracing`.
pub struct Session<W> {
    url: String,
    stream: WsStream,
    out: W,
}

impl<W: Write> Session<W> {
    pub async fn connect(config: &ListenConfig, out: W) -> Result<Self, ListenError> {
        let url = config.url();
        info!(url = %url, "connecting");
        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|err| map_connect_error(&url, err))?;
        info!(url = %url, "connected");
        Ok(Self { url, stream, out })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends one PING and waits for exactly one reply. The verdict is
    /// reported but never closes the connection.
    pub async fn check_liveness(&mut self) -> Result<Liveness, ListenError> {
        self.stream
            .send(Message::text(ping_message(PING_TIMESTAMP)))
            .await
            .map_err(map_transport_error)?;
        let liveness = match self.next_message().await? {
            Message::Text(text) => Liveness::from_reply(text.as_str()),
            other => Liveness::Failed {
                reply: format!("{other:?}"),
            },
        };
        debug!(?liveness, "liveness reply");
        if !liveness.passed() {
            warn!("liveness check failed");
        }
        self.emit(&render_liveness(&liveness))?;
        Ok(liveness)
    }

    /// Prints frames until the connection ends. Never returns on its own
    /// while frames keep arriving; the returned error says why it stopped.
    pub async fn listen(&mut self) -> ListenError {
        loop {
            let message = match self.next_message().await {
                Ok(message) => message,
                Err(err) => return err,
            };
            let rendered = match message {
                Message::Text(text) => render_frame(&decode(text.as_str())),
                Message::Binary(data) => render_binary(data.len()),
                _ => continue,
            };
            if let Err(err) = self.emit(&rendered) {
                return err;
            }
        }
    }

    /// Liveness check, banner, then the receive loop.
    pub async fn run(&mut self) -> ListenError {
        if let Err(err) = self.check_liveness().await {
            return err;
        }
        let banner = format!("\n{LISTENING_BANNER}\n\n");
        if let Err(err) = self.emit(&banner) {
            return err;
        }
        self.listen().await
    }

    /// Sends a close frame. Errors are ignored: the peer may already be gone.
    pub async fn close(mut self) {
        if let Err(err) = self.stream.close(None).await {
            debug!(error = %err, "close after disconnect");
        }
        let _ = self.out.flush();
    }

    async fn next_message(&mut self) -> Result<Message, ListenError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "close frame received");
                    return Err(ListenError::Closed);
                }
                Some(Ok(message)) => return Ok(message),
                Some(Err(err)) => return Err(map_transport_error(err)),
                None => return Err(ListenError::Closed),
            }
        }
    }

    fn emit(&mut self, text: &str) -> Result<(), ListenError> {
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Connects and runs a session until it ends or `shutdown` resolves, which
/// may happen mid-handshake. Once connected, the connection is closed on
/// every path. `Ok` means the operator stopped it.
pub async fn run_until<W, F>(config: &ListenConfig, out: W, shutdown: F) -> Result<(), ListenError>
where
    W: Write,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut session = tokio::select! {
        connected = Session::connect(config, out) => connected?,
        () = &mut shutdown => {
            info!("stopped by user before connecting");
            return Ok(());
        }
    };
    let ended = tokio::select! {
        err = session.run() => Some(err),
        () = &mut shutdown => None,
    };
    session.close().await;
    match ended {
        Some(err) => Err(err),
        None => {
            info!("stopped by user");
            Ok(())
        }
    }
}

fn map_connect_error(url: &str, err: WsError) -> ListenError {
    match err {
        WsError::Io(io) if io.kind() == ErrorKind::ConnectionRefused => ListenError::Refused {
            url: url.to_string(),
        },
        other => map_transport_error(other),
    }
}

fn map_transport_error(err: WsError) -> ListenError {
    match err {
        WsError::ConnectionClosed
        | WsError::AlreadyClosed
        | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => ListenError::Closed,
        other => ListenError::Transport {
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::{Message as AxMessage, Utf8Bytes, WebSocket, WebSocketUpgrade};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::{mpsc, oneshot};

    async fn spawn_server<H, Fut>(handler: H) -> SocketAddr
    where
        H: Fn(WebSocket) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let app = Router::new().route(
            "/",
            get(move |ws: WebSocketUpgrade| {
                let handler = handler.clone();
                async move { ws.on_upgrade(handler).into_response() }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn text(value: impl Into<String>) -> AxMessage {
        AxMessage::Text(Utf8Bytes::from(value.into()))
    }

    /// Answers PONG only to a well-formed PING.
    async fn answer_ping(socket: &mut WebSocket) {
        let Some(Ok(AxMessage::Text(ping))) = socket.recv().await else {
            return;
        };
        let ping: Value = serde_json::from_str(ping.as_str()).unwrap_or(Value::Null);
        let reply = if ping == json!({ "type": "PING", "timestamp": 123456789 }) {
            json!({ "type": "PONG" }).to_string()
        } else {
            "unexpected ping".to_string()
        };
        let _ = socket.send(text(reply)).await;
    }

    fn config(addr: SocketAddr) -> ListenConfig {
        ListenConfig::new("127.0.0.1", addr.port())
    }

    #[tokio::test]
    async fn test_liveness_passes_and_events_render() {
        let addr = spawn_server(|mut socket: WebSocket| async move {
            answer_ping(&mut socket).await;
            let frames = [
                json!({ "type": "NOTIFICATION", "timestamp": 1, "payload": { "title": "Hi", "body": "there" } })
                    .to_string(),
                "definitely not json".to_string(),
                json!({ "type": "SCREEN_OFF", "timestamp": 2, "payload": "locked" }).to_string(),
            ];
            for frame in frames {
                let _ = socket.send(text(frame)).await;
            }
            let _ = socket.send(AxMessage::Close(None)).await;
        })
        .await;

        let mut out = Vec::new();
        let mut session = Session::connect(&config(addr), &mut out).await.unwrap();
        assert_eq!(session.check_liveness().await.unwrap(), Liveness::Passed);
        let ended = session.listen().await;
        assert!(matches!(ended, ListenError::Closed));
        session.close().await;

        let output = String::from_utf8(out).unwrap();
        assert_eq!(
            output,
            "PING/PONG check passed\n\
             [NOTIFICATION] 1\n  title: Hi\n  body: there\n\n\
             Raw event: definitely not json\n\n\
             [SCREEN_OFF] 2\n  payload: locked\n\n"
        );
    }

    #[tokio::test]
    async fn test_failed_liveness_keeps_connection() {
        let addr = spawn_server(|mut socket: WebSocket| async move {
            let _ = socket.recv().await;
            let _ = socket.send(text("hello")).await;
            let _ = socket
                .send(text(json!({ "type": "CALL", "timestamp": 3 }).to_string()))
                .await;
            let _ = socket.send(AxMessage::Close(None)).await;
        })
        .await;

        let mut out = Vec::new();
        let mut session = Session::connect(&config(addr), &mut out).await.unwrap();
        let liveness = session.check_liveness().await.unwrap();
        assert_eq!(
            liveness,
            Liveness::Failed {
                reply: "hello".to_string()
            }
        );
        assert!(matches!(session.listen().await, ListenError::Closed));
        session.close().await;

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("PING/PONG check failed, received: hello"));
        assert!(output.contains("[CALL] 3\n"));
    }

    #[tokio::test]
    async fn test_binary_frames_do_not_end_session() {
        let addr = spawn_server(|mut socket: WebSocket| async move {
            answer_ping(&mut socket).await;
            let _ = socket.send(AxMessage::Binary(vec![1u8, 2, 3].into())).await;
            let _ = socket.send(text(json!({ "type": "AFTER" }).to_string())).await;
            let _ = socket.send(AxMessage::Close(None)).await;
        })
        .await;

        let mut out = Vec::new();
        let mut session = Session::connect(&config(addr), &mut out).await.unwrap();
        assert!(matches!(session.run().await, ListenError::Closed));
        session.close().await;

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("Binary event: 3 bytes"));
        assert!(output.contains("[AFTER]\n"));
    }

    #[tokio::test]
    async fn test_shutdown_closes_connection() {
        let (closed_tx, mut closed_rx) = mpsc::unbounded_channel::<bool>();
        let addr = spawn_server(move |mut socket: WebSocket| {
            let closed_tx = closed_tx.clone();
            async move {
                answer_ping(&mut socket).await;
                while let Some(message) = socket.recv().await {
                    if let Ok(AxMessage::Close(_)) = message {
                        let _ = closed_tx.send(true);
                        return;
                    }
                }
                let _ = closed_tx.send(false);
            }
        })
        .await;

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = stop_tx.send(());
        });

        let mut out = Vec::new();
        let result = run_until(&config(addr), &mut out, async {
            let _ = stop_rx.await;
        })
        .await;
        assert!(result.is_ok());

        let closed = tokio::time::timeout(Duration::from_secs(5), closed_rx.recv())
            .await
            .unwrap();
        assert_eq!(closed, Some(true));
        assert!(String::from_utf8(out).unwrap().contains(LISTENING_BANNER));
    }

    #[tokio::test]
    async fn test_shutdown_during_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accepts TCP but never answers the upgrade request.
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = stop_tx.send(());
        });

        let mut out = Vec::new();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run_until(&config(addr), &mut out, async {
                let _ = stop_rx.await;
            }),
        )
        .await
        .unwrap();
        assert!(result.is_ok());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_server_close_is_reported() {
        let addr = spawn_server(|mut socket: WebSocket| async move {
            answer_ping(&mut socket).await;
            let _ = socket.send(AxMessage::Close(None)).await;
        })
        .await;

        let mut out = Vec::new();
        let result = run_until(&config(addr), &mut out, std::future::pending()).await;
        assert!(matches!(result, Err(ListenError::Closed)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = Session::connect(&config(addr), Vec::new()).await;
        let Err(err) = result else {
            panic!("expected connection failure");
        };
        assert!(matches!(err, ListenError::Refused { .. }));
        assert!(err.to_string().contains("WebSocket service enabled"));
    }
}
