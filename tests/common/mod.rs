//! In-process HTTP stub of the datastore service
//!
//! Each server runs on its own thread and runtime, so it works the same
//! under `#[test]` and `#[tokio::test]`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// What the stub saw for one request
#[derive(Debug, Clone)]
pub struct StubRequest {
    pub method: Method,
    pub path: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

type Handler = Arc<dyn Fn(StubRequest) -> (StatusCode, String) + Send + Sync>;

#[derive(Clone)]
enum Mode {
    Handler(Handler),
    Silent,
    /// Write these bytes verbatim after the request head, then close
    Raw(&'static [u8]),
}

pub struct StubServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl StubServer {
    /// Serve every request with `handler`
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(StubRequest) -> (StatusCode, String) + Send + Sync + 'static,
    {
        Self::spawn(Mode::Handler(Arc::new(handler)))
    }

    /// Accept connections but never answer them
    pub fn silent() -> Self {
        Self::spawn(Mode::Silent)
    }

    /// Answer every connection with a hand-written response, then hang up
    ///
    /// Used for responses hyper's server would refuse to produce, such as a
    /// body shorter than its `Content-Length`.
    pub fn raw(response: &'static [u8]) -> Self {
        Self::spawn(Mode::Raw(response))
    }

    /// Answer every request with the same status and body
    pub fn fixed(status: StatusCode, body: &'static str) -> Self {
        Self::start(move |_| (status, body.to_string()))
    }

    pub fn host(&self) -> &'static str {
        "127.0.0.1"
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    fn spawn(mode: Mode) -> Self {
        let (addr_tx, addr_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let thread = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("stub runtime");
            runtime.block_on(serve(mode, addr_tx, shutdown_rx));
        });

        let addr = addr_rx.recv().expect("stub server failed to bind");
        Self {
            addr,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        }
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn serve(
    mode: Mode,
    addr_tx: mpsc::Sender<SocketAddr>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    addr_tx.send(listener.local_addr().expect("addr")).expect("report addr");

    // Held open by the silent server so clients wait for a response.
    let mut parked = Vec::new();

    loop {
        tokio::select! {
            result = listener.accept() => {
                let Ok((stream, _)) = result else { continue };
                let handler = match mode.clone() {
                    Mode::Handler(handler) => handler,
                    Mode::Silent => {
                        parked.push(stream);
                        continue;
                    }
                    Mode::Raw(response) => {
                        tokio::spawn(write_raw(stream, response));
                        continue;
                    }
                };

                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let handler = handler.clone();
                        async move { Ok::<_, Infallible>(respond(&handler, req).await) }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
            _ = &mut shutdown_rx => break,
        }
    }
}

async fn write_raw(mut stream: TcpStream, response: &'static [u8]) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    let _ = stream.write_all(response).await;
    let _ = stream.shutdown().await;
}

async fn respond(handler: &Handler, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    };

    let (status, text) = (**handler)(StubRequest {
        method,
        path,
        content_type,
        body,
    });

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Full::new(Bytes::from(text)))
        .expect("valid response")
}

/// Handler backed by an in-memory map, mimicking the real service
pub fn memory_store() -> impl Fn(StubRequest) -> (StatusCode, String) + Send + Sync + 'static {
    let store: Mutex<HashMap<String, String>> = Mutex::new(HashMap::new());

    move |req| {
        if req.path == "/health" {
            return (StatusCode::OK, "healthy".to_string());
        }
        let Some(key) = req.path.strip_prefix("/key/") else {
            return (StatusCode::NOT_FOUND, String::new());
        };

        let mut store = store.lock().expect("store lock");
        match req.method {
            Method::GET => match store.get(key) {
                Some(value) => (StatusCode::OK, value.clone()),
                None => (StatusCode::NOT_FOUND, String::new()),
            },
            Method::POST => {
                let value = String::from_utf8_lossy(&req.body).into_owned();
                store.insert(key.to_string(), value);
                (StatusCode::OK, String::new())
            }
            _ => (StatusCode::METHOD_NOT_ALLOWED, String::new()),
        }
    }
}

/// Health handler that fails `failures` times before reporting `body`
pub fn flaky_health(
    failures: usize,
    body: &'static str,
    calls: Arc<AtomicUsize>,
) -> impl Fn(StubRequest) -> (StatusCode, String) + Send + Sync + 'static {
    move |_| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        if n < failures {
            (StatusCode::SERVICE_UNAVAILABLE, "starting".to_string())
        } else {
            (StatusCode::OK, body.to_string())
        }
    }
}

/// A local port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    port
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
