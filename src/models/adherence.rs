use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{AdherenceStatus, str_enum};
use crate::models::{QueryMap, Resource, assign, cmp_opt, contains_ci};
use crate::schema::medication_adherence;
use crate::validation::{self as check, FieldErrors, Presence};

/// One scheduled dose and whether it was taken.
#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = medication_adherence, primary_key(adherence_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AdherenceRecord {
    pub adherence_id: Uuid,
    pub user_id: Uuid,
    pub medication_id: Option<Uuid>,
    pub medication_name: String,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub actual_time: Option<DateTime<Utc>>,
    pub status: AdherenceStatus,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdherenceInput {
    pub medication_id: Option<String>,
    pub medication_name: Option<String>,
    pub scheduled_time: Option<String>,
    pub actual_time: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct AdherencePatch {
    pub medication_id: Option<Option<Uuid>>,
    pub medication_name: Option<String>,
    pub scheduled_time: Option<Option<DateTime<Utc>>>,
    pub actual_time: Option<Option<DateTime<Utc>>>,
    pub status: Option<AdherenceStatus>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug)]
pub struct AdherenceDraft {
    medication_name: String,
    status: AdherenceStatus,
    details: AdherencePatch,
}

#[derive(Debug, Default)]
pub struct AdherenceFilter {
    pub status: Option<AdherenceStatus>,
}

str_enum!(AdherenceSort {
    CreatedAt => "created_at",
    MedicationName => "medication_name",
    ScheduledTime => "scheduled_time",
    Status => "status",
});

impl Default for AdherenceSort {
    fn default() -> Self {
        AdherenceSort::CreatedAt
    }
}

fn collect(input: AdherenceInput, required: Presence, errors: &mut FieldErrors) -> AdherencePatch {
    AdherencePatch {
        medication_id: check::changed(input.medication_id, |raw| {
            check::uuid(errors, "medication_id", raw)
        }),
        medication_name: check::text(errors, "medication_name", input.medication_name, required, 200),
        scheduled_time: check::changed(input.scheduled_time, |raw| {
            check::timestamp(errors, "scheduled_time", raw)
        }),
        actual_time: check::changed(input.actual_time, |raw| {
            check::timestamp(errors, "actual_time", raw)
        }),
        status: check::choice(errors, "status", input.status, required),
        notes: check::changed(input.notes, |raw| {
            check::text(errors, "notes", raw, Presence::Optional, usize::MAX)
        }),
    }
}

impl Resource for AdherenceRecord {
    const LABEL: &'static str = "Adherence record";

    type Input = AdherenceInput;
    type Draft = AdherenceDraft;
    type Patch = AdherencePatch;
    type Filter = AdherenceFilter;
    type Sort = AdherenceSort;

    fn validate_create(input: AdherenceInput) -> Result<AdherenceDraft, FieldErrors> {
        let mut errors = FieldErrors::default();
        let mut details = collect(input, Presence::Required, &mut errors);
        match (details.medication_name.take(), details.status) {
            (Some(medication_name), Some(status)) if errors.is_empty() => Ok(AdherenceDraft {
                medication_name,
                status,
                details,
            }),
            _ => Err(errors),
        }
    }

    fn validate_update(input: AdherenceInput) -> Result<AdherencePatch, FieldErrors> {
        let mut errors = FieldErrors::default();
        let patch = collect(input, Presence::NonEmpty, &mut errors);
        errors.into_result(patch)
    }

    fn parse_filter(query: &QueryMap, errors: &mut FieldErrors) -> AdherenceFilter {
        AdherenceFilter {
            status: check::choice(errors, "status", query.get("status").cloned(), Presence::Optional),
        }
    }

    fn from_draft(id: Uuid, owner: Uuid, draft: AdherenceDraft, now: DateTime<Utc>) -> Self {
        let mut record = AdherenceRecord {
            adherence_id: id,
            user_id: owner,
            medication_id: None,
            medication_name: draft.medication_name,
            scheduled_time: None,
            actual_time: None,
            status: draft.status,
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        record.apply(draft.details, now);
        record
    }

    fn apply(&mut self, patch: AdherencePatch, now: DateTime<Utc>) {
        assign(&mut self.medication_id, patch.medication_id);
        assign(&mut self.medication_name, patch.medication_name);
        assign(&mut self.scheduled_time, patch.scheduled_time);
        assign(&mut self.actual_time, patch.actual_time);
        assign(&mut self.status, patch.status);
        assign(&mut self.notes, patch.notes);
        self.updated_at = now;
    }

    fn id(&self) -> Uuid {
        self.adherence_id
    }

    fn owner(&self) -> Uuid {
        self.user_id
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }

    fn matches(&self, filter: &AdherenceFilter, search: Option<&str>) -> bool {
        filter.status.is_none_or(|wanted| self.status == wanted)
            && search.is_none_or(|needle| contains_ci(Some(self.medication_name.as_str()), needle))
    }

    fn compare(&self, other: &Self, sort: AdherenceSort) -> Ordering {
        match sort {
            AdherenceSort::CreatedAt => self.created_at.cmp(&other.created_at),
            AdherenceSort::MedicationName => self.medication_name.cmp(&other.medication_name),
            AdherenceSort::ScheduledTime => cmp_opt(self.scheduled_time, other.scheduled_time),
            AdherenceSort::Status => self.status.as_str().cmp(other.status.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_status() {
        let errors = AdherenceRecord::validate_create(AdherenceInput {
            medication_name: Some("Metformin".into()),
            ..AdherenceInput::default()
        })
        .unwrap_err();
        assert!(errors.contains("status"));
        assert!(!errors.contains("medication_name"));
    }

    #[test]
    fn times_and_medication_link_are_parsed() {
        let medication_id = Uuid::new_v4();
        let draft = AdherenceRecord::validate_create(AdherenceInput {
            medication_id: Some(medication_id.to_string()),
            medication_name: Some("Metformin".into()),
            scheduled_time: Some("2024-05-01T08:00:00Z".into()),
            actual_time: Some("2024-05-01T08:40:00Z".into()),
            status: Some("taken_late".into()),
            ..AdherenceInput::default()
        })
        .unwrap();
        let record = AdherenceRecord::from_draft(Uuid::new_v4(), Uuid::new_v4(), draft, Utc::now());
        assert_eq!(record.medication_id, Some(medication_id));
        assert_eq!(record.status, AdherenceStatus::TakenLate);
        assert!(record.actual_time > record.scheduled_time);

        let errors = AdherenceRecord::validate_update(AdherenceInput {
            medication_id: Some("rx-1".into()),
            scheduled_time: Some("tomorrow".into()),
            ..AdherenceInput::default()
        })
        .unwrap_err();
        assert!(errors.contains("medication_id"));
        assert!(errors.contains("scheduled_time"));
    }
}
