//! HTTP listener answering requests from a [`StubTable`].

use super::request::IncomingRequest;
use super::response::{RenderedResponse, ResponseRenderer};
use super::table::StubTable;
use super::StubEngine;
use crate::error::EngineError;
use crate::spec::HttpMethod;
use crate::stub::StubRule;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// Stub engine serving its rule table over HTTP/1.
pub struct HttpStubEngine {
    table: Arc<StubTable>,
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    stopped: AtomicBool,
}

impl HttpStubEngine {
    /// Bind `host:port` and start serving. Port 0 picks a free port.
    pub async fn start(host: &str, port: u16, renderer: ResponseRenderer) -> Result<Self, EngineError> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| EngineError::Bind(format!("{host}:{port}"), e.to_string()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| EngineError::Bind(format!("{host}:{port}"), e.to_string()))?;
        info!("Mock server listening on {}", local_addr);

        let table = Arc::new(StubTable::new());
        let renderer = Arc::new(renderer);
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut shutdown_rx = shutdown_tx.subscribe();

        let serving_table = Arc::clone(&table);
        let connection_shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, addr)) => {
                                let table = Arc::clone(&serving_table);
                                let renderer = Arc::clone(&renderer);
                                let mut shutdown = connection_shutdown.subscribe();
                                tokio::spawn(async move {
                                    let io = TokioIo::new(stream);
                                    let service = service_fn(move |req| {
                                        let table = Arc::clone(&table);
                                        let renderer = Arc::clone(&renderer);
                                        async move { handle_request(req, table, renderer).await }
                                    });
                                    let connection = http1::Builder::new().serve_connection(io, service);
                                    tokio::pin!(connection);
                                    // in-flight requests finish, idle keep-alive connections close
                                    let result = tokio::select! {
                                        result = connection.as_mut() => result,
                                        _ = shutdown.recv() => {
                                            connection.as_mut().graceful_shutdown();
                                            connection.as_mut().await
                                        }
                                    };
                                    if let Err(e) = result {
                                        debug!("Connection error from {}: {}", addr, e);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Accept error on {}: {}", local_addr, e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Mock server on {} shutting down", local_addr);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            table,
            local_addr,
            shutdown_tx,
            stopped: AtomicBool::new(false),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URL clients can reach the engine at.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }
}

impl StubEngine for HttpStubEngine {
    fn add_rule(&self, rule: StubRule) {
        self.table.add_rule(rule);
    }

    fn add_rules(&self, rules: Vec<StubRule>) {
        self.table.add_rules(rules);
    }

    fn replace_rules(&self, rules: Vec<StubRule>) {
        self.table.replace_rules(rules);
    }

    fn rules(&self) -> Vec<StubRule> {
        self.table.rules()
    }

    fn find_rule(&self, request: &IncomingRequest) -> Option<StubRule> {
        self.table.find_rule(request)
    }

    fn shutdown(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            let _ = self.shutdown_tx.send(());
        }
    }
}

impl Drop for HttpStubEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Answer one request from the rule table.
async fn handle_request(
    req: Request<Incoming>,
    table: Arc<StubTable>,
    renderer: Arc<ResponseRenderer>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let Ok(method) = req.method().as_str().parse::<HttpMethod>() else {
        debug!("Unsupported method {} for {}", req.method(), target);
        let request = IncomingRequest::from_target(HttpMethod::Get, &target);
        return Ok(to_response(RenderedResponse::not_found(&request)));
    };

    let request = req.headers().iter().fold(
        IncomingRequest::from_target(method, &target),
        |request, (name, value)| match value.to_str() {
            Ok(value) => request.with_header(name.as_str(), value),
            Err(_) => request,
        },
    );

    let rule = table.find_rule(&request);
    if rule.is_none() {
        debug!("No rule matched {} {}", request.method, request.url());
    }
    Ok(to_response(renderer.render(rule.as_ref(), &request)))
}

fn to_response(rendered: RenderedResponse) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(rendered.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    for (name, value) in &rendered.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.body(Full::new(rendered.body)).unwrap_or_else(|_| {
        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Full::new(Bytes::from("Invalid response definition")))
            .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
    })
}
