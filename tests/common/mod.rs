//! 测试公共设施：本地桩 HTTP 服务
//!
//! 按入队顺序逐个返回预置的 JSON 响应体，并记录每个请求的路径，
//! 供断言重试与重登录次数。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub struct StubServer {
    pub base_url: String,
    pub paths: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    /// 启动桩服务；`bodies` 耗尽后，后续请求一律返回最后一个响应体
    pub async fn start(bodies: Vec<String>) -> StubServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let paths: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let recorded = paths.clone();
        tokio::spawn(async move {
            let mut queue: VecDeque<String> = bodies.into();
            let mut last = queue.back().cloned().unwrap_or_else(|| "{}".into());
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut raw = Vec::new();
                let mut buf = [0u8; 1024];
                // 只处理无请求体的 GET，读到头部结束即可
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) => break,
                        Ok(n) => {
                            raw.extend_from_slice(&buf[..n]);
                            if raw.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
                let request = String::from_utf8_lossy(&raw);
                if let Some(line) = request.lines().next() {
                    if let Some(path) = line.split_whitespace().nth(1) {
                        recorded.lock().unwrap().push(path.to_string());
                    }
                }

                let body = match queue.pop_front() {
                    Some(next) => {
                        last = next.clone();
                        next
                    }
                    None => last.clone(),
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        StubServer {
            base_url: format!("http://{addr}"),
            paths,
        }
    }

    pub fn recorded_paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}
