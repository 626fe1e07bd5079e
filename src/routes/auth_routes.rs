use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::TypedHeader;
use chrono::{DateTime, Duration, Utc};
use headers::{Authorization, authorization::Bearer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{generate_access_token, hash_access_token, hash_password, verify_password},
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::*,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

/* ============================================================
   Request/response DTOs
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub role: String,
    pub phone: Option<String>,
    pub specialty: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user: SignupUser,
}

#[derive(Debug, Serialize)]
pub struct SignupUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: PublicUser,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: PublicUser,
}

/* ============================================================
   Validation
   ============================================================ */

fn validate_password(pw: &str, min_len: usize) -> Result<(), ApiError> {
    if pw.trim().len() < min_len {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("password must be at least {min_len} characters"),
        ));
    }
    Ok(())
}

/// Checks every required signup field before any store mutation.
/// Returns the resolved role and the role-specific field (phone for
/// patients, specialty for dentists).
fn validate_signup(req: &SignupRequest, password_min_len: usize) -> Result<(i16, String), ApiError> {
    if req.email.trim().is_empty()
        || req.password.is_empty()
        || req.full_name.trim().is_empty()
        || req.role.trim().is_empty()
    {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "email, password, fullName and role are required".into(),
        ));
    }

    let Some(role) = role_from_str(req.role.trim()) else {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "role must be patient or dentist".into(),
        ));
    };

    validate_password(&req.password, password_min_len)?;

    let role_field = match role {
        ROLE_PATIENT => req.phone.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        _ => req.specialty.as_deref().map(str::trim).filter(|s| !s.is_empty()),
    };

    match role_field {
        Some(v) => Ok((role, v.to_string())),
        None if role == ROLE_PATIENT => Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "Phone number is required for patients".into(),
        )),
        None => Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "Specialty is required for dentists".into(),
        )),
    }
}

/* ============================================================
   POST /signup
   ============================================================ */

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let (role, role_field) = validate_signup(&req, state.password_min_len)?;

    let password_hash = hash_password(req.password.trim()).map_err(|e| {
        tracing::error!("{e}");
        ApiError::Internal
    })?;

    // Account and role profile land in one transaction; if the profile
    // insert fails the account does not persist.
    let mut tx = state.db.begin().await.map_err(ApiError::db)?;

    let account: AccountRow = sqlx::query_as::<_, AccountRow>(
        r#"
        INSERT INTO account (email, full_name, password_hash, role)
        VALUES ($1, $2, $3, $4)
        RETURNING account_id, email, full_name, password_hash, role, created_at
        "#,
    )
    .bind(req.email.trim())
    .bind(req.full_name.trim())
    .bind(&password_hash)
    .bind(role)
    .fetch_one(&mut *tx)
    .await
    .map_err(ApiError::insert_conflict)?;

    let profile_insert = match role {
        ROLE_PATIENT => {
            sqlx::query(r#"INSERT INTO patient_profile (account_id, phone) VALUES ($1, $2)"#)
        }
        _ => sqlx::query(r#"INSERT INTO dentist_profile (account_id, specialty) VALUES ($1, $2)"#),
    };
    profile_insert
        .bind(account.account_id)
        .bind(&role_field)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::insert_conflict)?;

    tx.commit().await.map_err(ApiError::db)?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user: SignupUser {
                id: account.account_id,
                email: account.email,
                role: role_to_string(account.role),
            },
        }),
    ))
}

/* ============================================================
   POST /login
   ============================================================ */

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "email and password are required".into(),
        ));
    }

    let account: AccountRow = sqlx::query_as::<_, AccountRow>(
        r#"
        SELECT account_id, email, full_name, password_hash, role, created_at
        FROM account
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(ApiError::invalid_credentials)?;

    if !verify_password(&req.password, &account.password_hash) {
        return Err(ApiError::invalid_credentials());
    }

    let (phone, specialty) = load_role_fields(&state, account.account_id, account.role).await?;

    let access_token = generate_access_token();
    let token_hash = hash_access_token(&access_token);
    let expires_at = Utc::now() + Duration::days(state.session_ttl_days);

    let session: SessionTokenRow = sqlx::query_as::<_, SessionTokenRow>(
        r#"
        INSERT INTO session_token (account_id, session_token_hash, expires_at)
        VALUES ($1, $2, $3)
        RETURNING session_token_id, expires_at
        "#,
    )
    .bind(account.account_id)
    .bind(&token_hash)
    .bind(expires_at)
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(LoginResponse {
        user: PublicUser {
            id: account.account_id,
            email: account.email,
            role: role_to_string(account.role),
            full_name: account.full_name,
            created_at: None,
            phone,
            specialty,
        },
        access_token,
        expires_at: session.expires_at,
    }))
}

/* ============================================================
   GET /me
   ============================================================ */

pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<MeResponse>, ApiError> {
    let account: AccountRow = sqlx::query_as::<_, AccountRow>(
        r#"
        SELECT account_id, email, full_name, password_hash, role, created_at
        FROM account
        WHERE account_id = $1
        "#,
    )
    .bind(auth.account_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(ApiError::session_expired)?;

    let (phone, specialty) = load_role_fields(&state, account.account_id, account.role).await?;

    Ok(Json(MeResponse {
        user: PublicUser {
            id: account.account_id,
            email: account.email,
            role: role_to_string(account.role),
            full_name: account.full_name,
            created_at: Some(account.created_at),
            phone,
            specialty,
        },
    }))
}

/* ============================================================
   POST /logout
   ============================================================ */

/// Revoking an absent, unknown, or already-revoked token is not an error,
/// so the Bearer header is read directly instead of going through the
/// AuthContext extractor.
pub async fn logout(
    State(state): State<AppState>,
    authz: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<OkResponse>, ApiError> {
    if let Some(TypedHeader(authz)) = authz {
        let token_hash = hash_access_token(authz.token());
        sqlx::query(
            r#"
            UPDATE session_token
            SET revoked_at = now()
            WHERE session_token_hash = $1
              AND revoked_at IS NULL
            "#,
        )
        .bind(&token_hash)
        .execute(&state.db)
        .await
        .map_err(ApiError::db)?;
    }

    Ok(Json(OkResponse { ok: true }))
}

/* ============================================================
   Helpers
   ============================================================ */

/// Loads the role-specific field for an account. A missing profile row
/// degrades to an absent field rather than an error.
async fn load_role_fields(
    state: &AppState,
    account_id: Uuid,
    role: i16,
) -> Result<(Option<String>, Option<String>), ApiError> {
    if role == ROLE_PATIENT {
        let phone: Option<String> =
            sqlx::query_scalar(r#"SELECT phone FROM patient_profile WHERE account_id = $1"#)
                .bind(account_id)
                .fetch_optional(&state.db)
                .await
                .map_err(ApiError::db)?;
        Ok((phone, None))
    } else {
        let specialty: Option<String> =
            sqlx::query_scalar(r#"SELECT specialty FROM dentist_profile WHERE account_id = $1"#)
                .bind(account_id)
                .fetch_optional(&state.db)
                .await
                .map_err(ApiError::db)?;
        Ok((None, specialty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_signup() -> SignupRequest {
        SignupRequest {
            email: "alice@example.com".into(),
            password: "secret1".into(),
            full_name: "Alice Martin".into(),
            role: "patient".into(),
            phone: Some("0611111111".into()),
            specialty: None,
        }
    }

    #[test]
    fn test_validate_signup_ok() {
        let (role, field) = validate_signup(&base_signup(), 6).unwrap();
        assert_eq!(role, ROLE_PATIENT);
        assert_eq!(field, "0611111111");
    }

    #[test]
    fn test_validate_signup_requires_identity_fields() {
        let mut req = base_signup();
        req.email = "  ".into();
        assert!(validate_signup(&req, 6).is_err());

        let mut req = base_signup();
        req.full_name = String::new();
        assert!(validate_signup(&req, 6).is_err());

        let mut req = base_signup();
        req.role = String::new();
        assert!(validate_signup(&req, 6).is_err());
    }

    #[test]
    fn test_validate_signup_patient_needs_phone() {
        let mut req = base_signup();
        req.phone = None;
        assert!(validate_signup(&req, 6).is_err());

        let mut req = base_signup();
        req.phone = Some("   ".into());
        assert!(validate_signup(&req, 6).is_err());
    }

    #[test]
    fn test_validate_signup_dentist_needs_specialty() {
        let mut req = base_signup();
        req.role = "dentist".into();
        req.specialty = None;
        assert!(validate_signup(&req, 6).is_err());

        req.specialty = Some("Orthodontics".into());
        let (role, field) = validate_signup(&req, 6).unwrap();
        assert_eq!(role, ROLE_DENTIST);
        assert_eq!(field, "Orthodontics");
    }

    #[test]
    fn test_validate_signup_rejects_unknown_role() {
        let mut req = base_signup();
        req.role = "admin".into();
        assert!(validate_signup(&req, 6).is_err());
    }

    #[test]
    fn test_validate_password_policy_is_configurable() {
        assert!(validate_password("secret", 6).is_ok());
        assert!(validate_password("short", 6).is_err());
        assert!(validate_password("short", 3).is_ok());
        assert!(validate_password("", 1).is_err());
    }
}
