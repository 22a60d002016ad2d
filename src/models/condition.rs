use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{ConditionSeverity, ConditionStatus, str_enum};
use crate::models::{QueryMap, Resource, assign, cmp_opt, contains_ci};
use crate::schema::conditions;
use crate::validation::{self as check, FieldErrors, Presence};

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = conditions, primary_key(condition_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Condition {
    pub condition_id: Uuid,
    pub user_id: Uuid,
    pub condition_name: String,
    pub icd10_code: Option<String>,
    pub other_standard_codes: Option<String>,
    pub diagnosis_date: Option<NaiveDate>,
    pub diagnosis_doctor_name: Option<String>,
    pub diagnosis_doctor_surname: Option<String>,
    pub practice_number: Option<String>,
    pub severity: Option<ConditionSeverity>,
    pub treatment: Option<String>,
    pub current_status: Option<ConditionStatus>,
    pub related_allergies_id: Option<Uuid>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConditionInput {
    pub condition_name: Option<String>,
    pub icd10_code: Option<String>,
    pub other_standard_codes: Option<String>,
    pub diagnosis_date: Option<String>,
    pub diagnosis_doctor_name: Option<String>,
    pub diagnosis_doctor_surname: Option<String>,
    pub practice_number: Option<String>,
    pub severity: Option<String>,
    pub treatment: Option<String>,
    pub current_status: Option<String>,
    pub related_allergies_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct ConditionPatch {
    pub condition_name: Option<String>,
    pub icd10_code: Option<Option<String>>,
    pub other_standard_codes: Option<Option<String>>,
    pub diagnosis_date: Option<Option<NaiveDate>>,
    pub diagnosis_doctor_name: Option<Option<String>>,
    pub diagnosis_doctor_surname: Option<Option<String>>,
    pub practice_number: Option<Option<String>>,
    pub severity: Option<Option<ConditionSeverity>>,
    pub treatment: Option<Option<String>>,
    pub current_status: Option<Option<ConditionStatus>>,
    pub related_allergies_id: Option<Option<Uuid>>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug)]
pub struct ConditionDraft {
    condition_name: String,
    details: ConditionPatch,
}

#[derive(Debug, Default)]
pub struct ConditionFilter {
    pub severity: Option<ConditionSeverity>,
    pub current_status: Option<ConditionStatus>,
}

str_enum!(ConditionSort {
    CreatedAt => "created_at",
    ConditionName => "condition_name",
    Severity => "severity",
    CurrentStatus => "current_status",
});

impl Default for ConditionSort {
    fn default() -> Self {
        ConditionSort::CreatedAt
    }
}

fn collect(input: ConditionInput, required: Presence, errors: &mut FieldErrors) -> ConditionPatch {
    let optional = Presence::Optional;
    ConditionPatch {
        condition_name: check::text(errors, "condition_name", input.condition_name, required, 500),
        icd10_code: check::changed(input.icd10_code, |raw| {
            check::text(errors, "icd10_code", raw, optional, usize::MAX)
        }),
        other_standard_codes: check::changed(input.other_standard_codes, |raw| {
            check::text(errors, "other_standard_codes", raw, optional, usize::MAX)
        }),
        diagnosis_date: check::changed(input.diagnosis_date, |raw| check::date(errors, "diagnosis_date", raw)),
        diagnosis_doctor_name: check::changed(input.diagnosis_doctor_name, |raw| {
            check::text(errors, "diagnosis_doctor_name", raw, optional, usize::MAX)
        }),
        diagnosis_doctor_surname: check::changed(input.diagnosis_doctor_surname, |raw| {
            check::text(errors, "diagnosis_doctor_surname", raw, optional, usize::MAX)
        }),
        practice_number: check::changed(input.practice_number, |raw| {
            check::text(errors, "practice_number", raw, optional, usize::MAX)
        }),
        severity: check::changed(input.severity, |raw| check::choice(errors, "severity", raw, optional)),
        treatment: check::changed(input.treatment, |raw| {
            check::text(errors, "treatment", raw, optional, usize::MAX)
        }),
        current_status: check::changed(input.current_status, |raw| {
            check::choice(errors, "current_status", raw, optional)
        }),
        related_allergies_id: check::changed(input.related_allergies_id, |raw| {
            check::uuid(errors, "related_allergies_id", raw)
        }),
        notes: check::changed(input.notes, |raw| {
            check::text(errors, "notes", raw, optional, usize::MAX)
        }),
    }
}

impl Resource for Condition {
    const LABEL: &'static str = "Condition";

    type Input = ConditionInput;
    type Draft = ConditionDraft;
    type Patch = ConditionPatch;
    type Filter = ConditionFilter;
    type Sort = ConditionSort;

    fn validate_create(input: ConditionInput) -> Result<ConditionDraft, FieldErrors> {
        let mut errors = FieldErrors::default();
        let mut details = collect(input, Presence::Required, &mut errors);
        match details.condition_name.take() {
            Some(condition_name) if errors.is_empty() => Ok(ConditionDraft {
                condition_name,
                details,
            }),
            _ => Err(errors),
        }
    }

    fn validate_update(input: ConditionInput) -> Result<ConditionPatch, FieldErrors> {
        let mut errors = FieldErrors::default();
        let patch = collect(input, Presence::NonEmpty, &mut errors);
        errors.into_result(patch)
    }

    fn parse_filter(query: &QueryMap, errors: &mut FieldErrors) -> ConditionFilter {
        ConditionFilter {
            severity: check::choice(errors, "severity", query.get("severity").cloned(), Presence::Optional),
            current_status: check::choice(
                errors,
                "current_status",
                query.get("current_status").cloned(),
                Presence::Optional,
            ),
        }
    }

    fn from_draft(id: Uuid, owner: Uuid, draft: ConditionDraft, now: DateTime<Utc>) -> Self {
        let mut condition = Condition {
            condition_id: id,
            user_id: owner,
            condition_name: draft.condition_name,
            icd10_code: None,
            other_standard_codes: None,
            diagnosis_date: None,
            diagnosis_doctor_name: None,
            diagnosis_doctor_surname: None,
            practice_number: None,
            severity: None,
            treatment: None,
            current_status: None,
            related_allergies_id: None,
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        condition.apply(draft.details, now);
        condition
    }

    fn apply(&mut self, patch: ConditionPatch, now: DateTime<Utc>) {
        assign(&mut self.condition_name, patch.condition_name);
        assign(&mut self.icd10_code, patch.icd10_code);
        assign(&mut self.other_standard_codes, patch.other_standard_codes);
        assign(&mut self.diagnosis_date, patch.diagnosis_date);
        assign(&mut self.diagnosis_doctor_name, patch.diagnosis_doctor_name);
        assign(&mut self.diagnosis_doctor_surname, patch.diagnosis_doctor_surname);
        assign(&mut self.practice_number, patch.practice_number);
        assign(&mut self.severity, patch.severity);
        assign(&mut self.treatment, patch.treatment);
        assign(&mut self.current_status, patch.current_status);
        assign(&mut self.related_allergies_id, patch.related_allergies_id);
        assign(&mut self.notes, patch.notes);
        self.updated_at = now;
    }

    fn id(&self) -> Uuid {
        self.condition_id
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

    fn matches(&self, filter: &ConditionFilter, search: Option<&str>) -> bool {
        filter.severity.is_none_or(|wanted| self.severity == Some(wanted))
            && filter.current_status.is_none_or(|wanted| self.current_status == Some(wanted))
            && search.is_none_or(|needle| {
                contains_ci(Some(self.condition_name.as_str()), needle)
                    || contains_ci(self.treatment.as_deref(), needle)
            })
    }

    fn compare(&self, other: &Self, sort: ConditionSort) -> Ordering {
        match sort {
            ConditionSort::CreatedAt => self.created_at.cmp(&other.created_at),
            ConditionSort::ConditionName => self.condition_name.cmp(&other.condition_name),
            ConditionSort::Severity => cmp_opt(
                self.severity.map(|value| value.as_str()),
                other.severity.map(|value| value.as_str()),
            ),
            ConditionSort::CurrentStatus => cmp_opt(
                self.current_status.map(|value| value.as_str()),
                other.current_status.map(|value| value.as_str()),
            ),
        }
    }
}
