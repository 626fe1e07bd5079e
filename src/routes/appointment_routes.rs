// src/routes/appointment_routes.rs

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, ROLE_DENTIST, appointment_status_to_string},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/appointments", get(list_appointments))
}

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

#[derive(Debug, Deserialize)]
pub struct AppointmentsQuery {
    // YYYY-MM-DD, exact-match filter
    pub date: Option<String>,
    pub dentist_id: Option<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct AppointmentJoinRow {
    pub appointment_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: Option<NaiveTime>,
    pub duration_min: Option<i32>,
    pub service: Option<String>,
    pub status: Option<i16>,
    pub notes: Option<String>,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AppointmentView {
    pub id: Uuid,
    pub patient: String,
    pub service: String,
    pub time: String,
    pub duration: i32,
    pub status: String,
    pub phone: String,
    pub email: String,
    pub date: NaiveDate,
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct AppointmentsListResponse {
    pub appointments: Vec<AppointmentView>,
}

/// All defaulting happens here, at the read boundary; stored rows are never
/// touched. An appointment whose patient join came back empty still renders,
/// with placeholder identity fields.
fn shape_appointment(row: AppointmentJoinRow) -> AppointmentView {
    AppointmentView {
        id: row.appointment_id,
        patient: row.patient_name.unwrap_or_else(|| "Unknown".to_string()),
        service: row.service.unwrap_or_else(|| "Consultation".to_string()),
        time: row
            .appointment_time
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_default(),
        duration: row.duration_min.unwrap_or(30),
        status: appointment_status_to_string(row.status.unwrap_or(0)),
        phone: row.patient_phone.unwrap_or_default(),
        email: row.patient_email.unwrap_or_default(),
        date: row.appointment_date,
        notes: row.notes.unwrap_or_default(),
    }
}

/* ============================================================
   GET /appointments
   ============================================================ */

pub async fn list_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<AppointmentsQuery>,
) -> Result<Json<AppointmentsListResponse>, ApiError> {
    ensure_dentist(&auth)?;

    // A dentist may only query their own schedule.
    let dentist_id = match q.dentist_id {
        Some(id) if id != auth.account_id => {
            return Err(ApiError::Forbidden(
                "FORBIDDEN",
                "Dentists can only view their own appointments".into(),
            ));
        }
        Some(id) => id,
        None => auth.account_id,
    };

    let date = match q.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Some(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
            ApiError::BadRequest("VALIDATION_ERROR", "date must be YYYY-MM-DD".into())
        })?),
        None => None,
    };

    let rows: Vec<AppointmentJoinRow> = if let Some(date) = date {
        sqlx::query_as::<_, AppointmentJoinRow>(
            r#"
            SELECT
              a.appointment_id,
              a.appointment_date,
              a.appointment_time,
              a.duration_min,
              a.service,
              a.status,
              a.notes,
              p.full_name AS patient_name,
              p.email AS patient_email,
              pp.phone AS patient_phone
            FROM appointment a
            LEFT JOIN account p ON p.account_id = a.patient_id
            LEFT JOIN patient_profile pp ON pp.account_id = a.patient_id
            WHERE a.dentist_id = $1
              AND a.appointment_date = $2
            ORDER BY a.appointment_time ASC NULLS LAST
            "#,
        )
        .bind(dentist_id)
        .bind(date)
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::db)?
    } else {
        sqlx::query_as::<_, AppointmentJoinRow>(
            r#"
            SELECT
              a.appointment_id,
              a.appointment_date,
              a.appointment_time,
              a.duration_min,
              a.service,
              a.status,
              a.notes,
              p.full_name AS patient_name,
              p.email AS patient_email,
              pp.phone AS patient_phone
            FROM appointment a
            LEFT JOIN account p ON p.account_id = a.patient_id
            LEFT JOIN patient_profile pp ON pp.account_id = a.patient_id
            WHERE a.dentist_id = $1
            ORDER BY a.appointment_date ASC, a.appointment_time ASC NULLS LAST
            "#,
        )
        .bind(dentist_id)
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::db)?
    };

    Ok(Json(AppointmentsListResponse {
        appointments: rows.into_iter().map(shape_appointment).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_row() -> AppointmentJoinRow {
        AppointmentJoinRow {
            appointment_id: Uuid::new_v4(),
            appointment_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            appointment_time: None,
            duration_min: None,
            service: None,
            status: None,
            notes: None,
            patient_name: None,
            patient_email: None,
            patient_phone: None,
        }
    }

    #[test]
    fn test_shape_applies_read_boundary_defaults() {
        let view = shape_appointment(bare_row());
        assert_eq!(view.duration, 30);
        assert_eq!(view.service, "Consultation");
        assert_eq!(view.status, "pending");
        assert_eq!(view.notes, "");
        assert_eq!(view.time, "");
    }

    #[test]
    fn test_shape_degrades_missing_patient_join() {
        let view = shape_appointment(bare_row());
        assert_eq!(view.patient, "Unknown");
        assert_eq!(view.email, "");
        assert_eq!(view.phone, "");
    }

    #[test]
    fn test_shape_passes_populated_row_through() {
        let mut row = bare_row();
        row.appointment_time = NaiveTime::from_hms_opt(9, 30, 0);
        row.duration_min = Some(45);
        row.service = Some("Root canal".into());
        row.status = Some(1);
        row.notes = Some("follow-up".into());
        row.patient_name = Some("Alice Martin".into());
        row.patient_email = Some("alice@example.com".into());
        row.patient_phone = Some("0611111111".into());

        let view = shape_appointment(row);
        assert_eq!(view.time, "09:30");
        assert_eq!(view.duration, 45);
        assert_eq!(view.service, "Root canal");
        assert_eq!(view.status, "confirmed");
        assert_eq!(view.patient, "Alice Martin");
        assert_eq!(view.email, "alice@example.com");
        assert_eq!(view.phone, "0611111111");
        assert_eq!(view.notes, "follow-up");
    }
}
