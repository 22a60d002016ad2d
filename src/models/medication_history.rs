use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{Effectiveness, str_enum};
use crate::models::{QueryMap, Resource, assign, cmp_opt, contains_ci};
use crate::schema::medication_history;
use crate::validation::{self as check, FieldErrors, Presence};

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = medication_history, primary_key(history_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MedicationHistory {
    pub history_id: Uuid,
    pub user_id: Uuid,
    pub medication_name: String,
    pub taken_period: Option<String>,
    pub reason: Option<String>,
    pub effectiveness: Option<Effectiveness>,
    pub side_effects: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MedicationHistoryInput {
    pub medication_name: Option<String>,
    pub taken_period: Option<String>,
    pub reason: Option<String>,
    pub effectiveness: Option<String>,
    pub side_effects: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct MedicationHistoryPatch {
    pub medication_name: Option<String>,
    pub taken_period: Option<Option<String>>,
    pub reason: Option<Option<String>>,
    pub effectiveness: Option<Option<Effectiveness>>,
    pub side_effects: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug)]
pub struct MedicationHistoryDraft {
    medication_name: String,
    details: MedicationHistoryPatch,
}

#[derive(Debug, Default)]
pub struct MedicationHistoryFilter {
    pub effectiveness: Option<Effectiveness>,
}

str_enum!(MedicationHistorySort {
    CreatedAt => "created_at",
    MedicationName => "medication_name",
    TakenPeriod => "taken_period",
    Effectiveness => "effectiveness",
});

impl Default for MedicationHistorySort {
    fn default() -> Self {
        MedicationHistorySort::CreatedAt
    }
}

fn collect(
    input: MedicationHistoryInput,
    required: Presence,
    errors: &mut FieldErrors,
) -> MedicationHistoryPatch {
    let optional = Presence::Optional;
    MedicationHistoryPatch {
        medication_name: check::text(errors, "medication_name", input.medication_name, required, 200),
        taken_period: check::changed(input.taken_period, |raw| {
            check::text(errors, "taken_period", raw, optional, 100)
        }),
        reason: check::changed(input.reason, |raw| check::text(errors, "reason", raw, optional, 500)),
        effectiveness: check::changed(input.effectiveness, |raw| {
            check::choice(errors, "effectiveness", raw, optional)
        }),
        side_effects: check::changed(input.side_effects, |raw| {
            check::text(errors, "side_effects", raw, optional, usize::MAX)
        }),
        notes: check::changed(input.notes, |raw| check::text(errors, "notes", raw, optional, usize::MAX)),
    }
}

impl Resource for MedicationHistory {
    const LABEL: &'static str = "History record";

    type Input = MedicationHistoryInput;
    type Draft = MedicationHistoryDraft;
    type Patch = MedicationHistoryPatch;
    type Filter = MedicationHistoryFilter;
    type Sort = MedicationHistorySort;

    fn validate_create(
        input: MedicationHistoryInput,
    ) -> Result<MedicationHistoryDraft, FieldErrors> {
        let mut errors = FieldErrors::default();
        let mut details = collect(input, Presence::Required, &mut errors);
        match details.medication_name.take() {
            Some(medication_name) if errors.is_empty() => Ok(MedicationHistoryDraft {
                medication_name,
                details,
            }),
            _ => Err(errors),
        }
    }

    fn validate_update(
        input: MedicationHistoryInput,
    ) -> Result<MedicationHistoryPatch, FieldErrors> {
        let mut errors = FieldErrors::default();
        let patch = collect(input, Presence::NonEmpty, &mut errors);
        errors.into_result(patch)
    }

    fn parse_filter(query: &QueryMap, errors: &mut FieldErrors) -> MedicationHistoryFilter {
        MedicationHistoryFilter {
            effectiveness: check::choice(
                errors,
                "effectiveness",
                query.get("effectiveness").cloned(),
                Presence::Optional,
            ),
        }
    }

    fn from_draft(
        id: Uuid,
        owner: Uuid,
        draft: MedicationHistoryDraft,
        now: DateTime<Utc>,
    ) -> Self {
        let mut record = MedicationHistory {
            history_id: id,
            user_id: owner,
            medication_name: draft.medication_name,
            taken_period: None,
            reason: None,
            effectiveness: None,
            side_effects: None,
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        record.apply(draft.details, now);
        record
    }

    fn apply(&mut self, patch: MedicationHistoryPatch, now: DateTime<Utc>) {
        assign(&mut self.medication_name, patch.medication_name);
        assign(&mut self.taken_period, patch.taken_period);
        assign(&mut self.reason, patch.reason);
        assign(&mut self.effectiveness, patch.effectiveness);
        assign(&mut self.side_effects, patch.side_effects);
        assign(&mut self.notes, patch.notes);
        self.updated_at = now;
    }

    fn id(&self) -> Uuid {
        self.history_id
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

    fn matches(&self, filter: &MedicationHistoryFilter, search: Option<&str>) -> bool {
        filter.effectiveness.is_none_or(|wanted| self.effectiveness == Some(wanted))
            && search.is_none_or(|needle| {
                contains_ci(Some(self.medication_name.as_str()), needle)
                    || contains_ci(self.reason.as_deref(), needle)
            })
    }

    fn compare(&self, other: &Self, sort: MedicationHistorySort) -> Ordering {
        match sort {
            MedicationHistorySort::CreatedAt => self.created_at.cmp(&other.created_at),
            MedicationHistorySort::MedicationName => self.medication_name.cmp(&other.medication_name),
            MedicationHistorySort::TakenPeriod => {
                cmp_opt(self.taken_period.as_ref(), other.taken_period.as_ref())
            }
            MedicationHistorySort::Effectiveness => cmp_opt(
                self.effectiveness.map(|value| value.as_str()),
                other.effectiveness.map(|value| value.as_str()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_needs_a_name_and_known_effectiveness() {
        let errors = MedicationHistory::validate_create(MedicationHistoryInput {
            effectiveness: Some("miraculous".into()),
            ..MedicationHistoryInput::default()
        })
        .unwrap_err();
        assert!(errors.contains("medication_name"));
        assert!(errors.contains("effectiveness"));
    }

    #[test]
    fn search_matches_reason() {
        let draft = MedicationHistory::validate_create(MedicationHistoryInput {
            medication_name: Some("Amoxicillin".into()),
            reason: Some("Chest infection".into()),
            effectiveness: Some("effective".into()),
            side_effects: Some("Nausea ".repeat(200)),
            ..MedicationHistoryInput::default()
        })
        .unwrap();
        let record = MedicationHistory::from_draft(Uuid::new_v4(), Uuid::new_v4(), draft, Utc::now());
        assert!(record.matches(&MedicationHistoryFilter::default(), Some("infection")));
        let adverse = MedicationHistoryFilter {
            effectiveness: Some(Effectiveness::AdverseReaction),
        };
        assert!(!record.matches(&adverse, None));
    }
}
