use armada_core::{ServiceError, ServiceErrorKind};
use thiserror::Error;
use tonic::{Code, Status};

#[derive(Debug, Error)]
pub enum GrpcError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("auth token is not a valid header value")]
    InvalidToken,

    #[error("invalid channel config: {0}")]
    Config(String),
}

/// Classify a gRPC status for the retry logic in `armada-core`.
pub fn service_error(status: Status) -> ServiceError {
    let kind = match status.code() {
        Code::InvalidArgument
        | Code::FailedPrecondition
        | Code::OutOfRange
        | Code::AlreadyExists => ServiceErrorKind::InvalidArgument,
        Code::PermissionDenied | Code::Unauthenticated => ServiceErrorKind::PermissionDenied,
        Code::NotFound => ServiceErrorKind::NotFound,
        Code::Unavailable | Code::ResourceExhausted | Code::Aborted => {
            ServiceErrorKind::Unavailable
        }
        // tonic reports its own request timeout as `Cancelled`.
        Code::DeadlineExceeded | Code::Cancelled => ServiceErrorKind::DeadlineExceeded,
        Code::Unimplemented => ServiceErrorKind::Unimplemented,
        Code::Ok | Code::Unknown | Code::Internal | Code::DataLoss => ServiceErrorKind::Internal,
    };
    ServiceError::new(kind, status.message().to_string())
}
