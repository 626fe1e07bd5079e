use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub session_ttl_days: i64,
    pub password_min_len: usize,
}

/* -------------------------
   Roles
--------------------------*/

/// account.role is a smallint: 0 patient, 1 dentist.
/// Role is fixed at signup and never updated.
pub const ROLE_PATIENT: i16 = 0;
pub const ROLE_DENTIST: i16 = 1;

pub fn role_to_string(role: i16) -> String {
    match role {
        0 => "patient",
        1 => "dentist",
        _ => "unknown",
    }
    .to_string()
}

pub fn role_from_str(role: &str) -> Option<i16> {
    match role {
        "patient" => Some(ROLE_PATIENT),
        "dentist" => Some(ROLE_DENTIST),
        _ => None,
    }
}

/* -------------------------
   Appointment status
--------------------------*/

/// appointment.status smallint: 0 pending, 1 confirmed, 2 completed,
/// 3 cancelled, 4 no-show. NULL reads as pending.
pub fn appointment_status_to_string(status: i16) -> String {
    match status {
        0 => "pending",
        1 => "confirmed",
        2 => "completed",
        3 => "cancelled",
        4 => "no-show",
        _ => "unknown",
    }
    .to_string()
}

/* -------------------------
   DB Row Models
--------------------------*/

#[derive(Debug, sqlx::FromRow)]
pub struct AccountRow {
    pub account_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: i16,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionTokenRow {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/* -------------------------
   Shared API DTOs
--------------------------*/

/// Account as exposed to clients. password_hash never leaves the service;
/// the role-specific field (phone or specialty) is flattened alongside the
/// identity fields.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_mapping_roundtrip() {
        assert_eq!(role_from_str("patient"), Some(ROLE_PATIENT));
        assert_eq!(role_from_str("dentist"), Some(ROLE_DENTIST));
        assert_eq!(role_to_string(ROLE_PATIENT), "patient");
        assert_eq!(role_to_string(ROLE_DENTIST), "dentist");
    }

    #[test]
    fn test_role_from_str_rejects_unknown() {
        assert_eq!(role_from_str("admin"), None);
        assert_eq!(role_from_str(""), None);
        assert_eq!(role_from_str("Patient"), None);
    }

    #[test]
    fn test_public_user_omits_absent_role_fields() {
        let user = PublicUser {
            id: Uuid::new_v4(),
            email: "bob@example.com".into(),
            role: "dentist".into(),
            full_name: "Bob Stone".into(),
            created_at: None,
            phone: None,
            specialty: Some("Orthodontics".into()),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("phone").is_none());
        assert!(json.get("createdAt").is_none());
        assert_eq!(json["specialty"], "Orthodontics");
        assert_eq!(json["fullName"], "Bob Stone");
        // nothing resembling a password hash is ever serialized
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_appointment_status_names() {
        assert_eq!(appointment_status_to_string(0), "pending");
        assert_eq!(appointment_status_to_string(1), "confirmed");
        assert_eq!(appointment_status_to_string(2), "completed");
        assert_eq!(appointment_status_to_string(3), "cancelled");
        assert_eq!(appointment_status_to_string(4), "no-show");
        assert_eq!(appointment_status_to_string(9), "unknown");
    }
}
