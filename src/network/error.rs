use thiserror::Error;
use tonic::{Code, Status};

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("RPC error: {0}")]
    RpcError(#[from] Status),

    #[error("Transport error: {0}")]
    TransportError(#[from] tonic::transport::Error),

    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl NetworkError {
    /// True when the remote node could not service the call (down, suspended,
    /// timed out) as opposed to rejecting it.
    pub fn is_unavailable(&self) -> bool {
        match self {
            NetworkError::RpcError(status) => matches!(
                status.code(),
                Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled
            ),
            NetworkError::TransportError(_) | NetworkError::ConnectionError(_) => true,
        }
    }
}
