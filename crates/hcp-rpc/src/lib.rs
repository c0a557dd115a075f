// crates/hcp-rpc/src/lib.rs
//
// hcp-rpc: JSON-RPC request boundary for the HCP telemetry server.
//
// Converts wire requests into domain values, runs them against a
// `TelemetryStore` under a per-call deadline, and maps errors to stable
// wire codes. Transport is tonic with a hand-written JSON service.

pub mod handlers;
pub mod middleware;
pub mod server;

pub use handlers::SharedStore;
pub use server::{error_code, HcpRpcServer, JsonRpcRequest, JsonRpcResponse, RpcConfig, RpcService};
