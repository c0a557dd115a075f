// crates/hcp-rpc/src/server.rs
//
// RPC server setup: HcpRpcServer, RpcService and RpcConfig.
//
// A single tonic unary service accepts JSON-encoded requests with a method
// field, dispatches to the matching handler under a per-call deadline, and
// returns JSON-encoded responses. No proto codegen is involved; tonic only
// provides transport and interceptors.

use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tonic::transport::Server;
use tonic::Status;
use tracing::{Instrument, Span};

use hcp_core::error::HcpError;
use hcp_core::registration::NodeRegistry;
use hcp_core::traits::TelemetryStore;

use crate::handlers::{self, SharedStore};
use crate::middleware;

// ---------------------------------------------------------------------------
// RpcConfig
// ---------------------------------------------------------------------------

/// Configuration for the RPC server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Host to bind to (e.g., "127.0.0.1" or "0.0.0.0").
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Deadline applied to every dispatched call.
    pub request_timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50051,
            request_timeout_ms: 5000,
        }
    }
}

// ---------------------------------------------------------------------------
// JSON-RPC Envelope
// ---------------------------------------------------------------------------

/// A JSON-RPC-style request envelope.
/// The client sends a method name and a JSON params payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// The RPC method to invoke (e.g., "node/register", "transaction/stats").
    pub method: String,
    /// JSON-encoded parameters for the method. Absent or null means `{}`.
    #[serde(default)]
    pub params: Value,
}

/// A JSON-RPC-style response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// The result data (if success).
    pub result: Option<Value>,
    /// Error message (if not success).
    pub error: Option<String>,
    /// Stable error code (if not success), see [`error_code`].
    pub code: Option<String>,
}

impl JsonRpcResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            code: None,
        }
    }

    pub fn failure(err: &HcpError) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(err.to_string()),
            code: Some(error_code(err).to_string()),
        }
    }
}

/// Wire code for each error variant.
pub fn error_code(err: &HcpError) -> &'static str {
    match err {
        HcpError::NotFound(_) => "NOT_FOUND",
        HcpError::Conflict(_) => "ALREADY_EXISTS",
        HcpError::Validation(_) => "INVALID_ARGUMENT",
        HcpError::StoreUnavailable(_) => "UNAVAILABLE",
        HcpError::Serialization(_) => "INTERNAL",
        HcpError::Timeout(_) => "DEADLINE_EXCEEDED",
    }
}

// ---------------------------------------------------------------------------
// RpcService
// ---------------------------------------------------------------------------

/// Transport-independent dispatcher: owns the store handle and routes each
/// method to its handler.
#[derive(Clone)]
pub struct RpcService {
    store: SharedStore,
    registry: NodeRegistry<dyn TelemetryStore>,
    timeout: Duration,
    span: Span,
}

impl std::fmt::Debug for RpcService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcService")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RpcService {
    pub fn new(store: SharedStore, config: &RpcConfig, span: Span) -> Self {
        let registry = NodeRegistry::new(store.clone(), span.clone());
        Self {
            store,
            registry,
            timeout: Duration::from_millis(config.request_timeout_ms),
            span,
        }
    }

    /// Dispatch one request under the configured deadline. Never fails:
    /// errors are folded into the response envelope.
    pub async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let method = request.method.clone();
        let call_span = tracing::debug_span!(parent: &self.span, "rpc", method = %method);
        let started = Instant::now();

        let outcome = run_with_deadline(&method, self.timeout, self.route(request))
            .instrument(call_span)
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(value) => {
                tracing::debug!(parent: &self.span, %method, elapsed_ms, "rpc ok");
                JsonRpcResponse::ok(value)
            }
            Err(err) => {
                match &err {
                    HcpError::StoreUnavailable(_) | HcpError::Serialization(_) => {
                        tracing::error!(parent: &self.span, %method, error = %err, "rpc failed");
                    }
                    HcpError::Timeout(_) => {
                        tracing::warn!(parent: &self.span, %method, elapsed_ms, "rpc deadline exceeded");
                    }
                    _ => {
                        tracing::debug!(parent: &self.span, %method, error = %err, "rpc rejected");
                    }
                }
                JsonRpcResponse::failure(&err)
            }
        }
    }

    async fn route(&self, request: JsonRpcRequest) -> Result<Value, HcpError> {
        let params = match request.params {
            Value::Null => Value::Object(Map::new()),
            params => params,
        };
        let store = &self.store;
        let registry = &self.registry;

        match request.method.as_str() {
            // Nodes
            "node/register" => {
                dispatch_handler(params, |r| handlers::node::handle_register_node(registry, r)).await
            }
            "node/get" => dispatch_handler(params, |r| handlers::node::handle_get_node(store, r)).await,
            "node/list" => dispatch_handler(params, |r| handlers::node::handle_list_nodes(store, r)).await,
            "node/update_status" => {
                dispatch_handler(params, |r| handlers::node::handle_update_node_status(registry, r)).await
            }
            "node/topology" => dispatch_handler(params, |r| handlers::node::handle_topology(store, r)).await,

            // Benchmarks
            "benchmark/create" => {
                dispatch_handler(params, |r| handlers::benchmark::handle_create_benchmark(store, r)).await
            }
            "benchmark/get" => {
                dispatch_handler(params, |r| handlers::benchmark::handle_get_benchmark(store, r)).await
            }
            "benchmark/list" => {
                dispatch_handler(params, |r| handlers::benchmark::handle_list_benchmarks(store, r)).await
            }
            "benchmark/update" => {
                dispatch_handler(params, |r| handlers::benchmark::handle_update_benchmark(store, r)).await
            }
            "benchmark/delete" => {
                dispatch_handler(params, |r| handlers::benchmark::handle_delete_benchmark(store, r)).await
            }

            // Transaction ledger
            "transaction/create" => {
                dispatch_handler(params, |r| handlers::transaction::handle_create_transaction(store, r)).await
            }
            "transaction/get" => {
                dispatch_handler(params, |r| handlers::transaction::handle_get_transaction(store, r)).await
            }
            "transaction/list" => {
                dispatch_handler(params, |r| handlers::transaction::handle_list_transactions(store, r)).await
            }
            "transaction/confirm" => {
                dispatch_handler(params, |r| handlers::transaction::handle_confirm_transaction(store, r)).await
            }
            "transaction/stats" => {
                dispatch_handler(params, |r| handlers::transaction::handle_transaction_stats(store, r)).await
            }

            // Metrics
            "metric/report" => {
                dispatch_handler(params, |r| handlers::metric::handle_report_metric(store, r)).await
            }
            "metric/report_batch" => {
                dispatch_handler(params, |r| handlers::metric::handle_report_metric_batch(store, r)).await
            }
            "metric/node" => dispatch_handler(params, |r| handlers::metric::handle_node_metrics(store, r)).await,
            "metric/benchmark" => {
                dispatch_handler(params, |r| handlers::metric::handle_benchmark_metrics(store, r)).await
            }

            // Anomalies
            "anomaly/create" => {
                dispatch_handler(params, |r| handlers::anomaly::handle_create_anomaly(store, r)).await
            }
            "anomaly/get" => dispatch_handler(params, |r| handlers::anomaly::handle_get_anomaly(store, r)).await,
            "anomaly/list" => {
                dispatch_handler(params, |r| handlers::anomaly::handle_list_anomalies(store, r)).await
            }
            "anomaly/update_status" => {
                dispatch_handler(params, |r| handlers::anomaly::handle_update_anomaly_status(store, r)).await
            }

            // System
            "system/health" => dispatch_handler(params, |r| handlers::system::handle_health(store, r)).await,

            other => Err(HcpError::Validation(format!("Unknown method: {}", other))),
        }
    }
}

/// Generic dispatch helper: deserialize params into a request type,
/// call the handler, and serialize the result to JSON.
async fn dispatch_handler<Req, Resp, F, Fut>(params: Value, handler: F) -> Result<Value, HcpError>
where
    Req: serde::de::DeserializeOwned,
    Resp: serde::Serialize,
    F: FnOnce(Req) -> Fut,
    Fut: Future<Output = Result<Resp, HcpError>>,
{
    let request: Req = serde_json::from_value(params)
        .map_err(|e| HcpError::Validation(format!("Failed to deserialize request: {}", e)))?;
    let response = handler(request).await?;
    Ok(serde_json::to_value(response)?)
}

/// Drive `fut` to completion or abandon it once `timeout` elapses. Dropping
/// the future aborts the store call at its next await point.
pub(crate) async fn run_with_deadline<T, F>(method: &str, timeout: Duration, fut: F) -> Result<T, HcpError>
where
    F: Future<Output = Result<T, HcpError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(HcpError::Timeout(format!(
            "{} exceeded {} ms",
            method,
            timeout.as_millis()
        ))),
    }
}

// ---------------------------------------------------------------------------
// HcpRpcServer
// ---------------------------------------------------------------------------

/// The network-facing RPC server.
#[derive(Debug, Clone)]
pub struct HcpRpcServer {
    config: RpcConfig,
    service: RpcService,
    span: Span,
}

impl HcpRpcServer {
    /// Create a server over `store`. `span` is the parent of every event the
    /// server and its dispatcher emit.
    pub fn new(config: RpcConfig, store: SharedStore, span: Span) -> Self {
        let service = RpcService::new(store, &config, span.clone());
        Self { config, service, span }
    }

    pub fn service(&self) -> &RpcService {
        &self.service
    }

    /// Serve until the process is terminated.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Serve until `signal` resolves, then drain in-flight calls and return.
    pub async fn start_with_shutdown<F>(&self, signal: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send,
    {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        tracing::info!(parent: &self.span, %addr, timeout_ms = self.config.request_timeout_ms, "HCP RPC server starting");

        Server::builder()
            .accept_http1(true)
            .add_service(tonic::service::interceptor::InterceptedService::new(
                HcpJsonRpcServer::new(self.service.clone()),
                middleware::logging_interceptor,
            ))
            .serve_with_shutdown(addr, signal)
            .await?;

        tracing::info!(parent: &self.span, "HCP RPC server stopped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tonic Service Wiring
// ---------------------------------------------------------------------------
// One service with one method. Request and response bodies are raw
// JSON-encoded JsonRpcRequest/JsonRpcResponse bytes.

/// The tonic service wrapper. Implements the low-level gRPC service
/// by accepting bytes, deserializing as JSON-RPC, and dispatching.
#[derive(Clone)]
pub struct HcpJsonRpcServer {
    inner: RpcService,
}

impl std::fmt::Debug for HcpJsonRpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HcpJsonRpcServer").finish()
    }
}

impl HcpJsonRpcServer {
    fn new(inner: RpcService) -> Self {
        Self { inner }
    }
}

impl tonic::server::NamedService for HcpJsonRpcServer {
    const NAME: &'static str = "hcp.rpc.HcpService";
}

impl<B> tower_service::Service<http::Request<B>> for HcpJsonRpcServer
where
    B: HttpBody + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
    B::Data: Send,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            let body_bytes = match collect_body(req.into_body(), MAX_REQUEST_BYTES).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!("Failed to read request body: {}", e);
                    let err = HcpError::Serialization(format!("Failed to read request body: {}", e));
                    return Ok(build_response(&JsonRpcResponse::failure(&err)));
                }
            };

            let rpc_request: JsonRpcRequest = match serde_json::from_slice(&body_bytes) {
                Ok(r) => r,
                Err(e) => {
                    let err = HcpError::Validation(format!("Invalid JSON-RPC request: {}", e));
                    return Ok(build_response(&JsonRpcResponse::failure(&err)));
                }
            };

            let rpc_response = inner.dispatch(rpc_request).await;
            Ok(build_response(&rpc_response))
        })
    }
}

/// Largest request body accepted, in bytes.
pub const MAX_REQUEST_BYTES: usize = 4 * 1024 * 1024;

/// Collect the body of an HTTP request into bytes, refusing anything
/// longer than `limit`.
async fn collect_body<B>(body: B, limit: usize) -> Result<bytes::Bytes, String>
where
    B: HttpBody + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    B::Data: Send,
{
    http_body_util::Limited::new(body, limit)
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| e.to_string())
}

/// Build a 200 response carrying the JSON envelope.
fn build_response(envelope: &JsonRpcResponse) -> http::Response<tonic::body::BoxBody> {
    let json = serde_json::to_vec(envelope).unwrap_or_default();
    let body = tonic::body::BoxBody::new(
        http_body_util::Full::new(bytes::Bytes::from(json))
            .map_err(|e| Status::internal(format!("body error: {}", e))),
    );

    let mut response = http::Response::new(body);
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}
