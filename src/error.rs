use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized [{0}]: {1}")]
    Unauthorized(&'static str, String),
    #[error("forbidden [{0}]: {1}")]
    Forbidden(&'static str, String),
    #[error("bad request [{0}]: {1}")]
    BadRequest(&'static str, String),
    #[error("not found [{0}]: {1}")]
    NotFound(&'static str, String),
    #[error("conflict [{0}]: {1}")]
    Conflict(&'static str, String),
    #[error("internal error")]
    Internal,
}

impl ApiError {
    /// Same payload whether the email is unknown or the password is wrong.
    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized("INVALID_CREDENTIALS", "Email or password is incorrect".into())
    }

    pub fn session_expired() -> Self {
        ApiError::Unauthorized("SESSION_EXPIRED", "Session expired".into())
    }

    /// Store failure: the detail goes to the operator log, never to the client.
    pub fn db(e: sqlx::Error) -> Self {
        tracing::error!("db error: {e}");
        ApiError::Internal
    }

    /// Translate a unique-constraint violation from an account/profile insert
    /// into the matching conflict. The database is the arbiter of duplicate
    /// emails under concurrent signup; application code never check-then-inserts.
    pub fn insert_conflict(e: sqlx::Error) -> Self {
        let constraint = match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                db.constraint().map(str::to_string)
            }
            _ => None,
        };

        match constraint.as_deref() {
            Some("account_email_key") => ApiError::Conflict(
                "EMAIL_TAKEN",
                "An account with this email already exists".into(),
            ),
            Some("patient_profile_pkey") | Some("dentist_profile_pkey") => ApiError::Conflict(
                "PROFILE_EXISTS",
                "A role profile already exists for this account".into(),
            ),
            _ => ApiError::db(e),
        }
    }

    fn to_error_response(code: &str, message: &str) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: message.to_string(),
            },
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(code, msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Forbidden(code, msg) => {
                (StatusCode::FORBIDDEN, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::BadRequest(code, msg) => {
                (StatusCode::BAD_REQUEST, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::NotFound(code, msg) => {
                (StatusCode::NOT_FOUND, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Conflict(code, msg) => {
                (StatusCode::CONFLICT, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::to_error_response("INTERNAL", "internal server error"),
            )
                .into_response(),
        }
    }
}
