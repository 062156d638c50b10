//! Transport connector for the NDK service manager socket.
//!
//! The service manager listens on a trusted local socket, so channels are
//! opened without transport security. Two endpoint forms are accepted:
//!
//! ```text
//! unix:///opt/srlinux/var/run/sr_sdk_service_manager:50053
//! http://127.0.0.1:50053
//! ```
//!
//! Connecting is eager: an unreachable endpoint is reported immediately and is
//! never retried here.

use std::path::PathBuf;

use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;
use tracing::debug;

/// Default NDK service manager endpoint on SR Linux.
pub const DEFAULT_ENDPOINT: &str = "unix:///opt/srlinux/var/run/sr_sdk_service_manager:50053";

const UNIX_SCHEME: &str = "unix://";

/// Placeholder authority for unix socket channels; the connector ignores it.
const UNIX_AUTHORITY: &str = "http://[::]:50053";

/// Result type for transport and RPC operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Endpoint string cannot be used to build a channel
    #[error("Invalid endpoint {endpoint}: {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    /// Dialing the endpoint failed
    #[error("Connection to {endpoint} failed: {message}")]
    ConnectionFailed { endpoint: String, message: String },

    /// Agent name cannot be carried as request metadata
    #[error("Agent name {name:?} is not valid request metadata")]
    InvalidAgentName { name: String },

    /// The remote side rejected or failed the call
    #[error("RPC failed: {0}")]
    Rpc(#[from] tonic::Status),

    /// The connection has been closed locally
    #[error("Connection is closed")]
    Closed,
}

/// Check that `endpoint` has a form [`connect`] understands.
pub fn validate_endpoint(endpoint: &str) -> std::result::Result<(), String> {
    if let Some(path) = endpoint.strip_prefix(UNIX_SCHEME) {
        if path.is_empty() {
            return Err("unix endpoint has an empty socket path".to_string());
        }
        return Ok(());
    }
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return Uri::try_from(endpoint)
            .map(|_| ())
            .map_err(|e| e.to_string());
    }
    Err(format!(
        "unsupported endpoint scheme (expected {UNIX_SCHEME}, http:// or https://)"
    ))
}

/// Open a channel to the NDK service manager at `endpoint`.
///
/// # Errors
///
/// Returns [`TransportError::InvalidEndpoint`] for malformed endpoints and
/// [`TransportError::ConnectionFailed`] when the endpoint cannot be reached.
pub async fn connect(endpoint: &str) -> Result<Channel> {
    validate_endpoint(endpoint).map_err(|message| TransportError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        message,
    })?;

    let connected = match endpoint.strip_prefix(UNIX_SCHEME) {
        Some(path) => {
            let path = PathBuf::from(path);
            debug!("Dialing NDK unix socket {}", path.display());
            Endpoint::from_static(UNIX_AUTHORITY)
                .connect_with_connector(service_fn(move |_: Uri| {
                    let path = path.clone();
                    async move { Ok::<_, std::io::Error>(TokioIo::new(UnixStream::connect(path).await?)) }
                }))
                .await
        }
        None => {
            debug!("Dialing NDK endpoint {endpoint}");
            let target = Endpoint::from_shared(endpoint.to_string()).map_err(|e| {
                TransportError::InvalidEndpoint {
                    endpoint: endpoint.to_string(),
                    message: describe(&e),
                }
            })?;
            target.connect().await
        }
    };

    connected.map_err(|e| TransportError::ConnectionFailed {
        endpoint: endpoint.to_string(),
        message: describe(&e),
    })
}

/// Render an error with its source chain on one line.
fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
