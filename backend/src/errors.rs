use axum::{extract::rejection::JsonRejection, http::StatusCode, response::{IntoResponse, Response}, Json};
use melody_zk::{ErrorClass, ZkError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Well-formed request that fails a proof or registry rule.
    #[error("unprocessable: {0}")]
    Unprocessable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error")]
    Internal,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "missing or invalid X-API-KEY".to_string()),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
        };

        (status, Json(ErrorBody { error: msg })).into_response()
    }
}

impl From<ZkError> for ApiError {
    fn from(e: ZkError) -> Self {
        let class = e.class();
        match class {
            ErrorClass::Input | ErrorClass::Arithmetic | ErrorClass::Artifact => {
                tracing::debug!(?class, error = %e, "rejected zk request");
                ApiError::BadRequest(e.to_string())
            }
            ErrorClass::Unsatisfiable => {
                tracing::info!("proof request rejected: melody does not match commitment");
                ApiError::Unprocessable("melody and salt do not match the expected hash".to_string())
            }
            ErrorClass::Internal => {
                tracing::error!(error = %e, "zk pipeline failure");
                ApiError::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // 422 belongs to melody/commitment mismatches only.
        tracing::debug!(status = %rejection.status(), "rejected request body");
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Fatal errors while bringing the service up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("i/o error: {0}")]
    Io(String),

    #[error("key material: {0}")]
    Keys(#[from] ZkError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use melody_zk::error::{ArtifactError, InputError, WitnessError};

    #[test]
    fn zk_errors_map_by_class() {
        let e: ApiError = ZkError::from(InputError::UnknownNote("H4".into())).into();
        assert!(matches!(e, ApiError::BadRequest(m) if m.contains("H4")));

        let e: ApiError = ZkError::from(WitnessError::UnsatisfiableConstraint { constraint: None }).into();
        assert!(matches!(e, ApiError::Unprocessable(_)));

        let e: ApiError = ZkError::from(ArtifactError::BadMagic).into();
        assert!(matches!(e, ApiError::BadRequest(_)));

        let e: ApiError = ZkError::Setup("boom".into()).into();
        assert!(matches!(e, ApiError::Internal));
    }

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::Unprocessable("x".into()).into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::Unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Internal.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
