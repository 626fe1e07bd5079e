// src/routes/patient_routes.rs

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::hash_password,
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::*,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/{patient_id}", put(update_patient))
}

/// Every directory operation is dentist-only. The message never reveals
/// which role would have been accepted.
fn ensure_dentist(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.role == ROLE_DENTIST {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "You do not have access to this resource".into(),
        ))
    }
}

/* ============================================================
   DTOs
   ============================================================ */

#[derive(Debug, sqlx::FromRow)]
pub struct PatientJoinRow {
    pub account_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PatientSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PatientsListResponse {
    pub patients: Vec<PatientSummary>,
}

#[derive(Debug, Serialize)]
pub struct PatientCreateResponse {
    pub patient: PatientSummary,
}

#[derive(Debug, Deserialize)]
pub struct CreatePatientRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePatientRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

/// A patient account with no profile row still lists; phone degrades to "".
fn summarize(row: PatientJoinRow) -> PatientSummary {
    PatientSummary {
        id: row.account_id,
        name: row.full_name,
        email: row.email,
        phone: row.phone.unwrap_or_default(),
        created_at: row.created_at,
    }
}

/// Partial-update merge: a provided, non-blank value wins; anything else
/// keeps the stored one.
fn merge_field(provided: Option<&str>, existing: &str) -> String {
    match provided.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => existing.to_string(),
    }
}

/* ============================================================
   GET /patients
   ============================================================ */

pub async fn list_patients(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<PatientsListResponse>, ApiError> {
    ensure_dentist(&auth)?;

    let rows: Vec<PatientJoinRow> = sqlx::query_as::<_, PatientJoinRow>(
        r#"
        SELECT a.account_id, a.email, a.full_name, a.created_at, pp.phone
        FROM account a
        LEFT JOIN patient_profile pp ON pp.account_id = a.account_id
        WHERE a.role = $1
        ORDER BY a.created_at DESC
        "#,
    )
    .bind(ROLE_PATIENT)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(PatientsListResponse {
        patients: rows.into_iter().map(summarize).collect(),
    }))
}

/* ============================================================
   POST /patients
   ============================================================ */

pub async fn create_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<PatientCreateResponse>), ApiError> {
    ensure_dentist(&auth)?;

    let email = req.email.trim();
    let full_name = req.full_name.trim();
    let phone = req.phone.trim();

    if email.is_empty() || req.password.is_empty() || full_name.is_empty() || phone.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "email, password, fullName and phone are required".into(),
        ));
    }
    if req.password.trim().len() < state.password_min_len {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!(
                "password must be at least {} characters",
                state.password_min_len
            ),
        ));
    }

    let password_hash = hash_password(req.password.trim()).map_err(|e| {
        tracing::error!("{e}");
        ApiError::Internal
    })?;

    let mut tx = state.db.begin().await.map_err(ApiError::db)?;

    let account: AccountRow = sqlx::query_as::<_, AccountRow>(
        r#"
        INSERT INTO account (email, full_name, password_hash, role)
        VALUES ($1, $2, $3, $4)
        RETURNING account_id, email, full_name, password_hash, role, created_at
        "#,
    )
    .bind(email)
    .bind(full_name)
    .bind(&password_hash)
    .bind(ROLE_PATIENT)
    .fetch_one(&mut *tx)
    .await
    .map_err(ApiError::insert_conflict)?;

    sqlx::query(r#"INSERT INTO patient_profile (account_id, phone) VALUES ($1, $2)"#)
        .bind(account.account_id)
        .bind(phone)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::insert_conflict)?;

    tx.commit().await.map_err(ApiError::db)?;

    Ok((
        StatusCode::CREATED,
        Json(PatientCreateResponse {
            patient: PatientSummary {
                id: account.account_id,
                name: account.full_name,
                email: account.email,
                phone: phone.to_string(),
                created_at: account.created_at,
            },
        }),
    ))
}

/* ============================================================
   PUT /patients/{patient_id}
   ============================================================ */

pub async fn update_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<UpdatePatientRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_dentist(&auth)?;

    // Load existing; the target must be a patient-role account.
    let existing: AccountRow = sqlx::query_as::<_, AccountRow>(
        r#"
        SELECT account_id, email, full_name, password_hash, role, created_at
        FROM account
        WHERE account_id = $1
        "#,
    )
    .bind(patient_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "patient not found".into()))?;

    if existing.role != ROLE_PATIENT {
        return Err(ApiError::NotFound(
            "NOT_A_PATIENT",
            "patient not found".into(),
        ));
    }

    let email = merge_field(req.email.as_deref(), &existing.email);
    let full_name = merge_field(req.full_name.as_deref(), &existing.full_name);

    // Email uniqueness re-checked against every account except the target.
    if email != existing.email {
        let taken: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT account_id
            FROM account
            WHERE email = $1
              AND account_id <> $2
            "#,
        )
        .bind(&email)
        .bind(patient_id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::db)?;

        if taken.is_some() {
            return Err(ApiError::Conflict(
                "EMAIL_TAKEN",
                "An account with this email already exists".into(),
            ));
        }
    }

    let password_hash = match req.password.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(pw) => {
            if pw.len() < state.password_min_len {
                return Err(ApiError::BadRequest(
                    "VALIDATION_ERROR",
                    format!(
                        "password must be at least {} characters",
                        state.password_min_len
                    ),
                ));
            }
            hash_password(pw).map_err(|e| {
                tracing::error!("{e}");
                ApiError::Internal
            })?
        }
        None => existing.password_hash.clone(),
    };

    let mut tx = state.db.begin().await.map_err(ApiError::db)?;

    sqlx::query(
        r#"
        UPDATE account
        SET email = $1,
            full_name = $2,
            password_hash = $3
        WHERE account_id = $4
        "#,
    )
    .bind(&email)
    .bind(&full_name)
    .bind(&password_hash)
    .bind(patient_id)
    .execute(&mut *tx)
    .await
    .map_err(ApiError::insert_conflict)?;

    if let Some(phone) = req.phone.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(
            r#"
            INSERT INTO patient_profile (account_id, phone)
            VALUES ($1, $2)
            ON CONFLICT (account_id) DO UPDATE SET phone = EXCLUDED.phone
            "#,
        )
        .bind(patient_id)
        .bind(phone)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::db)?;
    }

    tx.commit().await.map_err(ApiError::db)?;

    Ok(Json(OkResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_merge_field_keeps_existing_when_absent_or_blank() {
        assert_eq!(merge_field(None, "old@example.com"), "old@example.com");
        assert_eq!(merge_field(Some(""), "old@example.com"), "old@example.com");
        assert_eq!(merge_field(Some("   "), "Alice"), "Alice");
    }

    #[test]
    fn test_merge_field_takes_trimmed_provided_value() {
        assert_eq!(merge_field(Some(" new@example.com "), "old@example.com"), "new@example.com");
    }

    #[test]
    fn test_summarize_defaults_missing_phone_to_empty() {
        let created = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();
        let row = PatientJoinRow {
            account_id: Uuid::new_v4(),
            email: "alice@example.com".into(),
            full_name: "Alice Martin".into(),
            created_at: created,
            phone: None,
        };
        let summary = summarize(row);
        assert_eq!(summary.phone, "");
        assert_eq!(summary.name, "Alice Martin");
        assert_eq!(summary.created_at, created);
    }

    #[test]
    fn test_summarize_passes_phone_through() {
        let row = PatientJoinRow {
            account_id: Uuid::new_v4(),
            email: "bob@example.com".into(),
            full_name: "Bob Stone".into(),
            created_at: Utc::now(),
            phone: Some("0600000000".into()),
        };
        assert_eq!(summarize(row).phone, "0600000000");
    }
}
