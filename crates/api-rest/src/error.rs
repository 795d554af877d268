use api_shared::dto::ErrorRes;
use api_shared::AuthError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use ed_core::{ServiceError, StoreError, TriageError};

/// An error response: status code plus a JSON `{"error": "..."}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorRes {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, err.to_string())
    }
}

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        let status = match &err {
            TriageError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TriageError::InvalidState { .. } | TriageError::Duplicate { .. } => {
                StatusCode::CONFLICT
            }
            TriageError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        Self::new(status, err.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Triage(err) => err.into(),
            ServiceError::Unauthorized { .. } => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            ServiceError::PatientNotFound(_) => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            ServiceError::InvalidInput(_) => Self::bad_request(err.to_string()),
            ServiceError::Store(ref store) => {
                tracing::error!(error = %store, "store failure while handling request");
                let status = match store {
                    StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                Self::new(status, "Internal error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed_core::{Permission, TriageId};

    #[test]
    fn test_service_errors_map_to_status_codes() {
        let not_found = ApiError::from(ServiceError::Triage(TriageError::NotFound(TriageId::new())));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let denied = ApiError::from(ServiceError::Unauthorized {
            user: "Ana".into(),
            permission: Permission::ManageRoster,
        });
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        let offline = ApiError::from(ServiceError::Store(StoreError::Unavailable(
            "database offline".into(),
        )));
        assert_eq!(offline.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(offline.message, "Internal error");

        let missing_header = ApiError::from(AuthError::MissingHeader("x-api-key"));
        assert_eq!(missing_header.status(), StatusCode::UNAUTHORIZED);
    }
}
