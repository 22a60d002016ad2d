use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{PageRequest, QueryMap};
use crate::schema::{ai_audit_log, prescription_pharmacy_queue, prescriptions};
use crate::validation::{self as check, FieldErrors, Presence};

pub const STATUS_SAVED: &str = "ai-analysed-saved";
pub const STATUS_SUBMITTED: &str = "ai-analysed-submitted";
pub const STATUS_ALLOCATED: &str = "allocated-to-pharmacies";

pub const QUEUE_PENDING: &str = "pending";

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = prescriptions, primary_key(prescription_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Prescription {
    pub prescription_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub image_path: Option<String>,
    pub ai_session_id: Option<String>,
    pub analysis_data: Option<Value>,
    pub allocated_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SavePrescriptionInput {
    pub analysis: Option<Value>,
    #[serde(rename = "uploadedPath")]
    pub uploaded_path: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug)]
pub struct SavedAnalysis {
    analysis: Value,
    image_path: String,
    session_id: Option<String>,
}

impl SavePrescriptionInput {
    pub fn validate(self) -> Result<SavedAnalysis, FieldErrors> {
        let mut errors = FieldErrors::default();
        let analysis = self.analysis.filter(|value| !value.is_null());
        if analysis.is_none() {
            errors.push("analysis", "Required");
        }
        let image_path = check::text(&mut errors, "uploadedPath", self.uploaded_path, Presence::Required, 1024);
        let session_id = check::text(&mut errors, "sessionId", self.session_id, Presence::Optional, 100);
        match (analysis, image_path) {
            (Some(analysis), Some(image_path)) if errors.is_empty() => Ok(SavedAnalysis {
                analysis,
                image_path,
                session_id,
            }),
            _ => Err(errors),
        }
    }
}

impl Prescription {
    pub fn saved(id: Uuid, owner: Uuid, saved: SavedAnalysis, now: DateTime<Utc>) -> Self {
        Prescription {
            prescription_id: id,
            user_id: owner,
            status: STATUS_SAVED.to_owned(),
            image_path: Some(saved.image_path),
            ai_session_id: saved.session_id,
            analysis_data: Some(saved.analysis),
            allocated_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// `GET /api/patient/prescriptions` query.
#[derive(Debug, Clone)]
pub struct PrescriptionQuery {
    pub paging: PageRequest,
    pub status: Option<String>,
}

impl PrescriptionQuery {
    pub fn parse(query: &QueryMap) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::default();
        let paging = PageRequest::parse(query, &mut errors);
        let status = check::text(&mut errors, "status", query.get("status").cloned(), Presence::Optional, 50);
        errors.into_result(PrescriptionQuery { paging, status })
    }
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = prescription_pharmacy_queue, primary_key(queue_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct QueueEntry {
    pub queue_id: Uuid,
    pub prescription_id: Uuid,
    pub pharmacy_id: Uuid,
    pub patient_profile_id: Uuid,
    pub status: String,
    pub distance_km: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = ai_audit_log, primary_key(audit_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AuditEntry {
    pub audit_id: Uuid,
    pub user_id: Uuid,
    pub operation: String,
    pub success: bool,
    pub cost_incurred: f64,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn save_requires_analysis_and_path() {
        let errors = SavePrescriptionInput {
            analysis: Some(Value::Null),
            uploaded_path: Some("  ".into()),
            session_id: None,
        }
        .validate()
        .unwrap_err();
        assert!(errors.contains("analysis"));
        assert!(errors.contains("uploadedPath"));
    }

    #[test]
    fn saved_rows_start_in_saved_status() {
        let saved = SavePrescriptionInput {
            analysis: Some(json!({ "medications": [] })),
            uploaded_path: Some("user/prescriptions/1_scan.jpg".into()),
            session_id: Some("scan_1_abc".into()),
        }
        .validate()
        .unwrap();
        let row = Prescription::saved(Uuid::new_v4(), Uuid::new_v4(), saved, Utc::now());
        assert_eq!(row.status, STATUS_SAVED);
        assert_eq!(row.ai_session_id.as_deref(), Some("scan_1_abc"));
        assert!(row.allocated_at.is_none());
    }
}
