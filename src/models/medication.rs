use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{MedicationRoute, MedicationStatus, str_enum};
use crate::models::{QueryMap, Resource, assign, cmp_opt, contains_ci};
use crate::schema::active_medications;
use crate::validation::{self as check, FieldErrors, Presence};

/// A medication the patient is currently on (or has paused or stopped).
#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = active_medications, primary_key(medication_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ActiveMedication {
    pub medication_id: Uuid,
    pub user_id: Uuid,
    pub medication_name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub route: Option<MedicationRoute>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub prescriber: Option<String>,
    pub status: MedicationStatus,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActiveMedicationInput {
    pub medication_name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub route: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub prescriber: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct ActiveMedicationPatch {
    pub medication_name: Option<String>,
    pub dosage: Option<Option<String>>,
    pub frequency: Option<Option<String>>,
    pub route: Option<Option<MedicationRoute>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub prescriber: Option<Option<String>>,
    pub status: Option<MedicationStatus>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug)]
pub struct ActiveMedicationDraft {
    medication_name: String,
    details: ActiveMedicationPatch,
}

#[derive(Debug, Default)]
pub struct ActiveMedicationFilter {
    pub status: Option<MedicationStatus>,
    pub route: Option<MedicationRoute>,
}

str_enum!(ActiveMedicationSort {
    CreatedAt => "created_at",
    MedicationName => "medication_name",
    Status => "status",
    Frequency => "frequency",
    StartDate => "start_date",
});

impl Default for ActiveMedicationSort {
    fn default() -> Self {
        ActiveMedicationSort::CreatedAt
    }
}

fn collect(
    input: ActiveMedicationInput,
    required: Presence,
    errors: &mut FieldErrors,
) -> ActiveMedicationPatch {
    let optional = Presence::Optional;
    ActiveMedicationPatch {
        medication_name: check::text(errors, "medication_name", input.medication_name, required, 200),
        dosage: check::changed(input.dosage, |raw| check::text(errors, "dosage", raw, optional, 100)),
        frequency: check::changed(input.frequency, |raw| {
            check::text(errors, "frequency", raw, optional, 100)
        }),
        route: check::changed(input.route, |raw| check::choice(errors, "route", raw, optional)),
        start_date: check::changed(input.start_date, |raw| check::date(errors, "start_date", raw)),
        end_date: check::changed(input.end_date, |raw| check::date(errors, "end_date", raw)),
        prescriber: check::changed(input.prescriber, |raw| {
            check::text(errors, "prescriber", raw, optional, 200)
        }),
        status: check::choice(errors, "status", input.status, Presence::NonEmpty),
        notes: check::changed(input.notes, |raw| check::text(errors, "notes", raw, optional, usize::MAX)),
    }
}

impl Resource for ActiveMedication {
    const LABEL: &'static str = "Medication";

    type Input = ActiveMedicationInput;
    type Draft = ActiveMedicationDraft;
    type Patch = ActiveMedicationPatch;
    type Filter = ActiveMedicationFilter;
    type Sort = ActiveMedicationSort;

    fn validate_create(input: ActiveMedicationInput) -> Result<ActiveMedicationDraft, FieldErrors> {
        let mut errors = FieldErrors::default();
        let mut details = collect(input, Presence::Required, &mut errors);
        match details.medication_name.take() {
            Some(medication_name) if errors.is_empty() => Ok(ActiveMedicationDraft {
                medication_name,
                details,
            }),
            _ => Err(errors),
        }
    }

    fn validate_update(input: ActiveMedicationInput) -> Result<ActiveMedicationPatch, FieldErrors> {
        let mut errors = FieldErrors::default();
        let patch = collect(input, Presence::NonEmpty, &mut errors);
        errors.into_result(patch)
    }

    fn parse_filter(query: &QueryMap, errors: &mut FieldErrors) -> ActiveMedicationFilter {
        ActiveMedicationFilter {
            status: check::choice(errors, "status", query.get("status").cloned(), Presence::Optional),
            route: check::choice(errors, "route", query.get("route").cloned(), Presence::Optional),
        }
    }

    fn from_draft(id: Uuid, owner: Uuid, draft: ActiveMedicationDraft, now: DateTime<Utc>) -> Self {
        let mut medication = ActiveMedication {
            medication_id: id,
            user_id: owner,
            medication_name: draft.medication_name,
            dosage: None,
            frequency: None,
            route: None,
            start_date: None,
            end_date: None,
            prescriber: None,
            status: MedicationStatus::Active,
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        medication.apply(draft.details, now);
        medication
    }

    fn apply(&mut self, patch: ActiveMedicationPatch, now: DateTime<Utc>) {
        assign(&mut self.medication_name, patch.medication_name);
        assign(&mut self.dosage, patch.dosage);
        assign(&mut self.frequency, patch.frequency);
        assign(&mut self.route, patch.route);
        assign(&mut self.start_date, patch.start_date);
        assign(&mut self.end_date, patch.end_date);
        assign(&mut self.prescriber, patch.prescriber);
        assign(&mut self.status, patch.status);
        assign(&mut self.notes, patch.notes);
        self.updated_at = now;
    }

    fn id(&self) -> Uuid {
        self.medication_id
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

    fn matches(&self, filter: &ActiveMedicationFilter, search: Option<&str>) -> bool {
        filter.status.is_none_or(|wanted| self.status == wanted)
            && filter.route.is_none_or(|wanted| self.route == Some(wanted))
            && search.is_none_or(|needle| {
                contains_ci(Some(self.medication_name.as_str()), needle)
                    || contains_ci(self.prescriber.as_deref(), needle)
            })
    }

    fn compare(&self, other: &Self, sort: ActiveMedicationSort) -> Ordering {
        match sort {
            ActiveMedicationSort::CreatedAt => self.created_at.cmp(&other.created_at),
            ActiveMedicationSort::MedicationName => self.medication_name.cmp(&other.medication_name),
            ActiveMedicationSort::Status => self.status.as_str().cmp(other.status.as_str()),
            ActiveMedicationSort::Frequency => cmp_opt(self.frequency.as_ref(), other.frequency.as_ref()),
            ActiveMedicationSort::StartDate => cmp_opt(self.start_date, other.start_date),
        }
    }
}
