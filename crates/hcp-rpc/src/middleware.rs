// crates/hcp-rpc/src/middleware.rs
//
// Interceptors applied to every incoming RPC request.

use tonic::{Request, Status};

/// Logging interceptor for tonic gRPC requests.
///
/// Records the caller's user agent; authentication would hook in here.
pub fn logging_interceptor(req: Request<()>) -> Result<Request<()>, Status> {
    let user_agent = req
        .metadata()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::debug!(user_agent, "incoming RPC request");
    Ok(req)
}
