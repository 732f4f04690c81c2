//! Shared utilities for integration testing: scripted JSON-RPC nodes.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone)]
pub enum Reply {
    Result(Value),
    Error(i64, String),
    /// Record the request but never answer it.
    Silent,
}

/// Per-method answers. The last answer for a method repeats once the
/// others are used up; unknown methods get -32601.
#[derive(Debug, Default)]
pub struct RpcScript {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<(String, Value)>>,
    delay: Mutex<Option<Duration>>,
}

impl RpcScript {
    pub fn result(&self, method: &str, values: Vec<Value>) {
        self.replies.lock().unwrap().insert(
            method.to_string(),
            values.into_iter().map(Reply::Result).collect(),
        );
    }

    pub fn error(&self, method: &str, code: i64, message: &str) {
        self.replies.lock().unwrap().insert(
            method.to_string(),
            VecDeque::from([Reply::Error(code, message.to_string())]),
        );
    }

    pub fn silent(&self, method: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(method.to_string(), VecDeque::from([Reply::Silent]));
    }

    /// Hold every later answer for `delay`.
    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    fn current_delay(&self) -> Option<Duration> {
        *self.delay.lock().unwrap()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.methods().iter().filter(|m| *m == method).count()
    }

    pub fn params_of(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Build the response envelope for one request.
    fn answer(&self, request: &Value) -> Option<Value> {
        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let method = request
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let params = request.get("params").cloned().unwrap_or(Value::Null);
        self.calls.lock().unwrap().push((method.clone(), params));

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(&method) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        let envelope = match reply {
            Some(Reply::Result(result)) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
            Some(Reply::Error(code, message)) => {
                json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
            }
            Some(Reply::Silent) => return None,
            None => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": format!("the method {} does not exist", method)}
            }),
        };
        Some(envelope)
    }
}

/// A node answering JSON-RPC over plain HTTP/1.1, one request per connection.
pub struct MockHttpNode {
    pub addr: SocketAddr,
    pub script: Arc<RpcScript>,
}

impl MockHttpNode {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let script = Arc::new(RpcScript::default());

        let node_script = script.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, _)) => {
                        let script = node_script.clone();
                        tokio::spawn(async move {
                            let _ = serve_http(socket, &script).await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        Self { addr, script }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

async fn serve_http(mut socket: TcpStream, script: &RpcScript) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request: Value = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);
    let Some(body) = script.answer(&request).map(|v| v.to_string()) else {
        return Ok(());
    };
    if let Some(delay) = script.current_delay() {
        tokio::time::sleep(delay).await;
    }
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await?;
    tokio::time::sleep(Duration::from_millis(10)).await;
    Ok(())
}

#[derive(Debug, Clone)]
enum WsCommand {
    Notify { subscription: String, result: Value },
    Disconnect,
}

/// A node answering JSON-RPC over WebSocket that can push subscription
/// notifications and drop its connections on demand.
pub struct MockWsNode {
    pub addr: SocketAddr,
    pub script: Arc<RpcScript>,
    commands: broadcast::Sender<WsCommand>,
}

impl MockWsNode {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let script = Arc::new(RpcScript::default());
        let (commands, _) = broadcast::channel(64);

        let node_script = script.clone();
        let node_commands = commands.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let script = node_script.clone();
                let rx = node_commands.subscribe();
                tokio::spawn(serve_ws(socket, script, rx));
            }
        });

        Self {
            addr,
            script,
            commands,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn notify(&self, subscription: &str, result: Value) {
        let _ = self.commands.send(WsCommand::Notify {
            subscription: subscription.to_string(),
            result,
        });
    }

    pub fn disconnect(&self) {
        let _ = self.commands.send(WsCommand::Disconnect);
    }
}

async fn serve_ws(
    socket: TcpStream,
    script: Arc<RpcScript>,
    mut commands: broadcast::Receiver<WsCommand>,
) {
    let Ok(stream) = tokio_tungstenite::accept_async(socket).await else {
        return;
    };
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let request: Value = serde_json::from_str(text.as_str()).unwrap_or(Value::Null);
                    if let Some(reply) = script.answer(&request) {
                        if write.send(Message::Text(reply.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            command = commands.recv() => match command {
                Ok(WsCommand::Notify { subscription, result }) => {
                    let frame = json!({
                        "jsonrpc": "2.0",
                        "method": "itc_subscription",
                        "params": {"subscription": subscription, "result": result}
                    });
                    if write.send(Message::Text(frame.to_string().into())).await.is_err() {
                        break;
                    }
                }
                Ok(WsCommand::Disconnect) | Err(_) => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn wait_until<F: Fn() -> bool>(check: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
