use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{AllergenType, AllergySeverity, str_enum};
use crate::models::{QueryMap, Resource, assign, contains_ci};
use crate::schema::allergies;
use crate::validation::{self as check, FieldErrors, Presence};

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = allergies, primary_key(allergy_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Allergy {
    pub allergy_id: Uuid,
    pub user_id: Uuid,
    pub allergen: String,
    pub allergen_type: AllergenType,
    pub severity: AllergySeverity,
    pub reaction: Option<String>,
    pub first_observed: Option<NaiveDate>,
    pub notes: Option<String>,
    pub trigger_factors: Option<String>,
    pub emergency_action_plan: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AllergyInput {
    pub allergen: Option<String>,
    pub allergen_type: Option<String>,
    pub severity: Option<String>,
    pub reaction: Option<String>,
    pub first_observed: Option<String>,
    pub notes: Option<String>,
    pub trigger_factors: Option<String>,
    pub emergency_action_plan: Option<String>,
}

#[derive(Debug, Default)]
pub struct AllergyPatch {
    pub allergen: Option<String>,
    pub allergen_type: Option<AllergenType>,
    pub severity: Option<AllergySeverity>,
    pub reaction: Option<Option<String>>,
    pub first_observed: Option<Option<NaiveDate>>,
    pub notes: Option<Option<String>>,
    pub trigger_factors: Option<Option<String>>,
    pub emergency_action_plan: Option<Option<String>>,
}

#[derive(Debug)]
pub struct AllergyDraft {
    allergen: String,
    allergen_type: AllergenType,
    severity: AllergySeverity,
    details: AllergyPatch,
}

#[derive(Debug, Default)]
pub struct AllergyFilter {
    pub allergen_type: Option<AllergenType>,
    pub severity: Option<AllergySeverity>,
}

str_enum!(AllergySort {
    CreatedAt => "created_at",
    Allergen => "allergen",
    Severity => "severity",
    AllergenType => "allergen_type",
});

impl Default for AllergySort {
    fn default() -> Self {
        AllergySort::CreatedAt
    }
}

fn collect(input: AllergyInput, required: Presence, errors: &mut FieldErrors) -> AllergyPatch {
    AllergyPatch {
        allergen: check::text(errors, "allergen", input.allergen, required, 200),
        allergen_type: check::choice(errors, "allergen_type", input.allergen_type, required),
        severity: check::choice(errors, "severity", input.severity, required),
        reaction: check::changed(input.reaction, |raw| {
            check::text(errors, "reaction", raw, Presence::Optional, 1000)
        }),
        first_observed: check::changed(input.first_observed, |raw| check::date(errors, "first_observed", raw)),
        notes: check::changed(input.notes, |raw| {
            check::text(errors, "notes", raw, Presence::Optional, usize::MAX)
        }),
        trigger_factors: check::changed(input.trigger_factors, |raw| {
            check::text(errors, "trigger_factors", raw, Presence::Optional, usize::MAX)
        }),
        emergency_action_plan: check::changed(input.emergency_action_plan, |raw| {
            check::text(errors, "emergency_action_plan", raw, Presence::Optional, usize::MAX)
        }),
    }
}

impl Resource for Allergy {
    const LABEL: &'static str = "Allergy";

    type Input = AllergyInput;
    type Draft = AllergyDraft;
    type Patch = AllergyPatch;
    type Filter = AllergyFilter;
    type Sort = AllergySort;

    fn validate_create(input: AllergyInput) -> Result<AllergyDraft, FieldErrors> {
        let mut errors = FieldErrors::default();
        let mut details = collect(input, Presence::Required, &mut errors);
        match (details.allergen.take(), details.allergen_type, details.severity) {
            (Some(allergen), Some(allergen_type), Some(severity)) if errors.is_empty() => Ok(AllergyDraft {
                allergen,
                allergen_type,
                severity,
                details,
            }),
            _ => Err(errors),
        }
    }

    fn validate_update(input: AllergyInput) -> Result<AllergyPatch, FieldErrors> {
        let mut errors = FieldErrors::default();
        let patch = collect(input, Presence::NonEmpty, &mut errors);
        errors.into_result(patch)
    }

    fn parse_filter(query: &QueryMap, errors: &mut FieldErrors) -> AllergyFilter {
        AllergyFilter {
            allergen_type: check::choice(errors, "allergen_type", query.get("allergen_type").cloned(), Presence::Optional),
            severity: check::choice(errors, "severity", query.get("severity").cloned(), Presence::Optional),
        }
    }

    fn from_draft(id: Uuid, owner: Uuid, draft: AllergyDraft, now: DateTime<Utc>) -> Self {
        let mut allergy = Allergy {
            allergy_id: id,
            user_id: owner,
            allergen: draft.allergen,
            allergen_type: draft.allergen_type,
            severity: draft.severity,
            reaction: None,
            first_observed: None,
            notes: None,
            trigger_factors: None,
            emergency_action_plan: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        allergy.apply(draft.details, now);
        allergy
    }

    fn apply(&mut self, patch: AllergyPatch, now: DateTime<Utc>) {
        assign(&mut self.allergen, patch.allergen);
        assign(&mut self.allergen_type, patch.allergen_type);
        assign(&mut self.severity, patch.severity);
        assign(&mut self.reaction, patch.reaction);
        assign(&mut self.first_observed, patch.first_observed);
        assign(&mut self.notes, patch.notes);
        assign(&mut self.trigger_factors, patch.trigger_factors);
        assign(&mut self.emergency_action_plan, patch.emergency_action_plan);
        self.updated_at = now;
    }

    fn id(&self) -> Uuid {
        self.allergy_id
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

    fn matches(&self, filter: &AllergyFilter, search: Option<&str>) -> bool {
        filter.allergen_type.is_none_or(|wanted| self.allergen_type == wanted)
            && filter.severity.is_none_or(|wanted| self.severity == wanted)
            && search.is_none_or(|needle| {
                contains_ci(Some(self.allergen.as_str()), needle) || contains_ci(self.reaction.as_deref(), needle)
            })
    }

    fn compare(&self, other: &Self, sort: AllergySort) -> Ordering {
        match sort {
            AllergySort::CreatedAt => self.created_at.cmp(&other.created_at),
            AllergySort::Allergen => self.allergen.cmp(&other.allergen),
            AllergySort::Severity => self.severity.as_str().cmp(other.severity.as_str()),
            AllergySort::AllergenType => self.allergen_type.as_str().cmp(other.allergen_type.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> AllergyInput {
        AllergyInput {
            allergen: Some("  Peanuts ".into()),
            allergen_type: Some("food".into()),
            severity: Some("severe".into()),
            ..AllergyInput::default()
        }
    }

    #[test]
    fn create_trims_and_defaults_optionals() {
        let draft = Allergy::validate_create(input()).unwrap();
        let allergy = Allergy::from_draft(Uuid::new_v4(), Uuid::new_v4(), draft, Utc::now());
        assert_eq!(allergy.allergen, "Peanuts");
        assert_eq!(allergy.severity, AllergySeverity::Severe);
        assert!(allergy.reaction.is_none());
        assert!(allergy.is_active);
    }

    #[test]
    fn create_reports_every_missing_field() {
        let errors = Allergy::validate_create(AllergyInput::default()).unwrap_err();
        assert!(errors.contains("allergen"));
        assert!(errors.contains("allergen_type"));
        assert!(errors.contains("severity"));
    }

    #[test]
    fn create_rejects_unknown_severity() {
        let errors = Allergy::validate_create(AllergyInput {
            severity: Some("fatal".into()),
            ..input()
        })
        .unwrap_err();
        assert!(errors.contains("severity"));
    }

    #[test]
    fn update_is_partial_and_clears_blank_optionals() {
        let draft = Allergy::validate_create(AllergyInput {
            reaction: Some("Hives".into()),
            ..input()
        })
        .unwrap();
        let created = Utc::now();
        let mut allergy = Allergy::from_draft(Uuid::new_v4(), Uuid::new_v4(), draft, created);

        let patch = Allergy::validate_update(AllergyInput {
            severity: Some("mild".into()),
            reaction: Some("".into()),
            ..AllergyInput::default()
        })
        .unwrap();
        let later = created + chrono::Duration::seconds(5);
        allergy.apply(patch, later);

        assert_eq!(allergy.allergen, "Peanuts");
        assert_eq!(allergy.severity, AllergySeverity::Mild);
        assert!(allergy.reaction.is_none());
        assert_eq!(allergy.updated_at, later);
    }

    #[test]
    fn update_rejects_blank_required_field() {
        let errors = Allergy::validate_update(AllergyInput {
            allergen: Some("   ".into()),
            ..AllergyInput::default()
        })
        .unwrap_err();
        assert!(errors.contains("allergen"));
    }

    #[test]
    fn search_covers_allergen_and_reaction() {
        let draft = Allergy::validate_create(AllergyInput {
            reaction: Some("Anaphylaxis".into()),
            ..input()
        })
        .unwrap();
        let allergy = Allergy::from_draft(Uuid::new_v4(), Uuid::new_v4(), draft, Utc::now());
        let filter = AllergyFilter::default();
        assert!(allergy.matches(&filter, Some("peanut")));
        assert!(allergy.matches(&filter, Some("anaph")));
        assert!(!allergy.matches(&filter, Some("pollen")));
        let severe_only = AllergyFilter {
            severity: Some(AllergySeverity::Mild),
            ..AllergyFilter::default()
        };
        assert!(!allergy.matches(&severe_only, None));
    }
}
