use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use uuid::Uuid;

use crate::auth::hash_access_token;
use crate::error::ApiError;
use crate::models::AppState;

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: Uuid,
    pub role: i16,
    pub session_token_id: Uuid,
}

#[derive(Debug, sqlx::FromRow)]
struct SessionLookupRow {
    session_token_id: Uuid,
    account_id: Uuid,
    role: i16,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            // Extract Authorization: Bearer <token>
            let TypedHeader(authz): TypedHeader<Authorization<Bearer>> =
                TypedHeader::from_request_parts(parts, state)
                    .await
                    .map_err(|_| ApiError::session_expired())?;

            let token_hash = hash_access_token(authz.token());

            // An absent, unknown, revoked, or expired token all fail the same
            // way. The join also guarantees the account behind the session
            // still exists.
            let row: SessionLookupRow = sqlx::query_as::<_, SessionLookupRow>(
                r#"
                SELECT st.session_token_id, st.account_id, a.role
                FROM session_token st
                JOIN account a ON a.account_id = st.account_id
                WHERE st.session_token_hash = $1
                  AND st.revoked_at IS NULL
                  AND st.expires_at > now()
                "#,
            )
            .bind(&token_hash)
            .fetch_optional(&state.db)
            .await
            .map_err(ApiError::db)?
            .ok_or_else(ApiError::session_expired)?;

            // Touch last_seen_at (best-effort)
            let _ = sqlx::query(
                r#"
                UPDATE session_token
                SET last_seen_at = now()
                WHERE session_token_id = $1
                "#,
            )
            .bind(row.session_token_id)
            .execute(&state.db)
            .await;

            Ok(AuthContext {
                account_id: row.account_id,
                role: row.role,
                session_token_id: row.session_token_id,
            })
        }
    }
}
