use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{SurgeryOutcome, SurgeryType, str_enum};
use crate::models::{QueryMap, Resource, assign, cmp_opt, contains_ci};
use crate::schema::surgeries;
use crate::validation::{self as check, FieldErrors, Presence};

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = surgeries, primary_key(surgery_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Surgery {
    pub surgery_id: Uuid,
    pub user_id: Uuid,
    pub surgery_name: String,
    pub surgery_type: Option<SurgeryType>,
    pub surgery_date: Option<NaiveDate>,
    pub hospital_name: Option<String>,
    pub surgeon_name: Option<String>,
    pub surgeon_practice_number: Option<String>,
    pub anesthetist_name: Option<String>,
    pub procedure_code: Option<String>,
    pub complications: Option<String>,
    pub recovery_notes: Option<String>,
    pub outcome: Option<SurgeryOutcome>,
    pub related_condition_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SurgeryInput {
    pub surgery_name: Option<String>,
    pub surgery_type: Option<String>,
    pub surgery_date: Option<String>,
    pub hospital_name: Option<String>,
    pub surgeon_name: Option<String>,
    pub surgeon_practice_number: Option<String>,
    pub anesthetist_name: Option<String>,
    pub procedure_code: Option<String>,
    pub complications: Option<String>,
    pub recovery_notes: Option<String>,
    pub outcome: Option<String>,
    pub related_condition_id: Option<String>,
}

#[derive(Debug, Default)]
pub struct SurgeryPatch {
    pub surgery_name: Option<String>,
    pub surgery_type: Option<Option<SurgeryType>>,
    pub surgery_date: Option<Option<NaiveDate>>,
    pub hospital_name: Option<Option<String>>,
    pub surgeon_name: Option<Option<String>>,
    pub surgeon_practice_number: Option<Option<String>>,
    pub anesthetist_name: Option<Option<String>>,
    pub procedure_code: Option<Option<String>>,
    pub complications: Option<Option<String>>,
    pub recovery_notes: Option<Option<String>>,
    pub outcome: Option<Option<SurgeryOutcome>>,
    pub related_condition_id: Option<Option<Uuid>>,
}

#[derive(Debug)]
pub struct SurgeryDraft {
    surgery_name: String,
    details: SurgeryPatch,
}

#[derive(Debug, Default)]
pub struct SurgeryFilter {
    pub surgery_type: Option<SurgeryType>,
    pub outcome: Option<SurgeryOutcome>,
}

str_enum!(SurgerySort {
    CreatedAt => "created_at",
    SurgeryName => "surgery_name",
    SurgeryDate => "surgery_date",
    SurgeryType => "surgery_type",
    Outcome => "outcome",
});

impl Default for SurgerySort {
    fn default() -> Self {
        SurgerySort::CreatedAt
    }
}

fn collect(input: SurgeryInput, required: Presence, errors: &mut FieldErrors) -> SurgeryPatch {
    let optional = Presence::Optional;
    SurgeryPatch {
        surgery_name: check::text(errors, "surgery_name", input.surgery_name, required, 500),
        surgery_type: check::changed(input.surgery_type, |raw| check::choice(errors, "surgery_type", raw, optional)),
        surgery_date: check::changed(input.surgery_date, |raw| check::date(errors, "surgery_date", raw)),
        hospital_name: check::changed(input.hospital_name, |raw| {
            check::text(errors, "hospital_name", raw, optional, usize::MAX)
        }),
        surgeon_name: check::changed(input.surgeon_name, |raw| {
            check::text(errors, "surgeon_name", raw, optional, usize::MAX)
        }),
        surgeon_practice_number: check::changed(input.surgeon_practice_number, |raw| {
            check::text(errors, "surgeon_practice_number", raw, optional, usize::MAX)
        }),
        anesthetist_name: check::changed(input.anesthetist_name, |raw| {
            check::text(errors, "anesthetist_name", raw, optional, usize::MAX)
        }),
        procedure_code: check::changed(input.procedure_code, |raw| {
            check::text(errors, "procedure_code", raw, optional, usize::MAX)
        }),
        complications: check::changed(input.complications, |raw| {
            check::text(errors, "complications", raw, optional, usize::MAX)
        }),
        recovery_notes: check::changed(input.recovery_notes, |raw| {
            check::text(errors, "recovery_notes", raw, optional, usize::MAX)
        }),
        outcome: check::changed(input.outcome, |raw| check::choice(errors, "outcome", raw, optional)),
        related_condition_id: check::changed(input.related_condition_id, |raw| {
            check::uuid(errors, "related_condition_id", raw)
        }),
    }
}

impl Resource for Surgery {
    const LABEL: &'static str = "Surgery";

    type Input = SurgeryInput;
    type Draft = SurgeryDraft;
    type Patch = SurgeryPatch;
    type Filter = SurgeryFilter;
    type Sort = SurgerySort;

    fn validate_create(input: SurgeryInput) -> Result<SurgeryDraft, FieldErrors> {
        let mut errors = FieldErrors::default();
        let mut details = collect(input, Presence::Required, &mut errors);
        match details.surgery_name.take() {
            Some(surgery_name) if errors.is_empty() => Ok(SurgeryDraft { surgery_name, details }),
            _ => Err(errors),
        }
    }

    fn validate_update(input: SurgeryInput) -> Result<SurgeryPatch, FieldErrors> {
        let mut errors = FieldErrors::default();
        let patch = collect(input, Presence::NonEmpty, &mut errors);
        errors.into_result(patch)
    }

    fn parse_filter(query: &QueryMap, errors: &mut FieldErrors) -> SurgeryFilter {
        SurgeryFilter {
            surgery_type: check::choice(errors, "surgery_type", query.get("surgery_type").cloned(), Presence::Optional),
            outcome: check::choice(errors, "outcome", query.get("outcome").cloned(), Presence::Optional),
        }
    }

    fn from_draft(id: Uuid, owner: Uuid, draft: SurgeryDraft, now: DateTime<Utc>) -> Self {
        let mut surgery = Surgery {
            surgery_id: id,
            user_id: owner,
            surgery_name: draft.surgery_name,
            surgery_type: None,
            surgery_date: None,
            hospital_name: None,
            surgeon_name: None,
            surgeon_practice_number: None,
            anesthetist_name: None,
            procedure_code: None,
            complications: None,
            recovery_notes: None,
            outcome: None,
            related_condition_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        surgery.apply(draft.details, now);
        surgery
    }

    fn apply(&mut self, patch: SurgeryPatch, now: DateTime<Utc>) {
        assign(&mut self.surgery_name, patch.surgery_name);
        assign(&mut self.surgery_type, patch.surgery_type);
        assign(&mut self.surgery_date, patch.surgery_date);
        assign(&mut self.hospital_name, patch.hospital_name);
        assign(&mut self.surgeon_name, patch.surgeon_name);
        assign(&mut self.surgeon_practice_number, patch.surgeon_practice_number);
        assign(&mut self.anesthetist_name, patch.anesthetist_name);
        assign(&mut self.procedure_code, patch.procedure_code);
        assign(&mut self.complications, patch.complications);
        assign(&mut self.recovery_notes, patch.recovery_notes);
        assign(&mut self.outcome, patch.outcome);
        assign(&mut self.related_condition_id, patch.related_condition_id);
        self.updated_at = now;
    }

    fn id(&self) -> Uuid {
        self.surgery_id
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

    fn matches(&self, filter: &SurgeryFilter, search: Option<&str>) -> bool {
        filter.surgery_type.is_none_or(|wanted| self.surgery_type == Some(wanted))
            && filter.outcome.is_none_or(|wanted| self.outcome == Some(wanted))
            && search.is_none_or(|needle| {
                contains_ci(Some(self.surgery_name.as_str()), needle)
                    || contains_ci(self.surgeon_name.as_deref(), needle)
                    || contains_ci(self.hospital_name.as_deref(), needle)
            })
    }

    fn compare(&self, other: &Self, sort: SurgerySort) -> Ordering {
        match sort {
            SurgerySort::CreatedAt => self.created_at.cmp(&other.created_at),
            SurgerySort::SurgeryName => self.surgery_name.cmp(&other.surgery_name),
            SurgerySort::SurgeryDate => cmp_opt(self.surgery_date, other.surgery_date),
            SurgerySort::SurgeryType => cmp_opt(
                self.surgery_type.map(|value| value.as_str()),
                other.surgery_type.map(|value| value.as_str()),
            ),
            SurgerySort::Outcome => cmp_opt(
                self.outcome.map(|value| value.as_str()),
                other.outcome.map(|value| value.as_str()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_vocabulary_is_enforced() {
        let errors = Surgery::validate_create(SurgeryInput {
            surgery_name: Some("Appendectomy".into()),
            outcome: Some("great".into()),
            ..SurgeryInput::default()
        })
        .unwrap_err();
        assert!(errors.contains("outcome"));
        assert!(!errors.contains("surgery_name"));
    }

    #[test]
    fn search_includes_hospital() {
        let draft = Surgery::validate_create(SurgeryInput {
            surgery_name: Some("Appendectomy".into()),
            hospital_name: Some("Groote Schuur".into()),
            outcome: Some("partial_success".into()),
            ..SurgeryInput::default()
        })
        .unwrap();
        let surgery = Surgery::from_draft(Uuid::new_v4(), Uuid::new_v4(), draft, Utc::now());
        assert_eq!(surgery.outcome, Some(SurgeryOutcome::PartialSuccess));
        assert!(surgery.matches(&SurgeryFilter::default(), Some("schuur")));
    }
}
