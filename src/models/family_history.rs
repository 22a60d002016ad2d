use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{FamilyRelationship, str_enum};
use crate::models::{QueryMap, Resource, assign, cmp_opt, contains_ci};
use crate::schema::family_history;
use crate::validation::{self as check, FieldErrors, Presence};

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = family_history, primary_key(family_history_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FamilyHistory {
    pub family_history_id: Uuid,
    pub user_id: Uuid,
    pub relative: String,
    pub condition: String,
    pub relationship: FamilyRelationship,
    pub age_at_onset: Option<i32>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FamilyHistoryInput {
    pub relative: Option<String>,
    pub condition: Option<String>,
    pub relationship: Option<String>,
    pub age_at_onset: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct FamilyHistoryPatch {
    pub relative: Option<String>,
    pub condition: Option<String>,
    pub relationship: Option<FamilyRelationship>,
    pub age_at_onset: Option<Option<i32>>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug)]
pub struct FamilyHistoryDraft {
    relative: String,
    condition: String,
    relationship: FamilyRelationship,
    details: FamilyHistoryPatch,
}

#[derive(Debug, Default)]
pub struct FamilyHistoryFilter {
    pub relationship: Option<FamilyRelationship>,
}

str_enum!(FamilyHistorySort {
    CreatedAt => "created_at",
    Relative => "relative",
    Condition => "condition",
    Relationship => "relationship",
    AgeAtOnset => "age_at_onset",
});

impl Default for FamilyHistorySort {
    fn default() -> Self {
        FamilyHistorySort::CreatedAt
    }
}

fn collect(
    input: FamilyHistoryInput,
    required: Presence,
    errors: &mut FieldErrors,
) -> FamilyHistoryPatch {
    FamilyHistoryPatch {
        relative: check::text(errors, "relative", input.relative, required, 200),
        condition: check::text(errors, "condition", input.condition, required, 200),
        relationship: check::choice(errors, "relationship", input.relationship, required),
        age_at_onset: check::changed(input.age_at_onset, |raw| check::integer(errors, "age_at_onset", raw, 0, 150)),
        notes: check::changed(input.notes, |raw| {
            check::text(errors, "notes", raw, Presence::Optional, usize::MAX)
        }),
    }
}

impl Resource for FamilyHistory {
    const LABEL: &'static str = "Family history";

    type Input = FamilyHistoryInput;
    type Draft = FamilyHistoryDraft;
    type Patch = FamilyHistoryPatch;
    type Filter = FamilyHistoryFilter;
    type Sort = FamilyHistorySort;

    fn validate_create(input: FamilyHistoryInput) -> Result<FamilyHistoryDraft, FieldErrors> {
        let mut errors = FieldErrors::default();
        let mut details = collect(input, Presence::Required, &mut errors);
        match (details.relative.take(), details.condition.take(), details.relationship) {
            (Some(relative), Some(condition), Some(relationship)) if errors.is_empty() => Ok(FamilyHistoryDraft {
                relative,
                condition,
                relationship,
                details,
            }),
            _ => Err(errors),
        }
    }

    fn validate_update(input: FamilyHistoryInput) -> Result<FamilyHistoryPatch, FieldErrors> {
        let mut errors = FieldErrors::default();
        let patch = collect(input, Presence::NonEmpty, &mut errors);
        errors.into_result(patch)
    }

    fn parse_filter(query: &QueryMap, errors: &mut FieldErrors) -> FamilyHistoryFilter {
        FamilyHistoryFilter {
            relationship: check::choice(errors, "relationship", query.get("relationship").cloned(), Presence::Optional),
        }
    }

    fn from_draft(id: Uuid, owner: Uuid, draft: FamilyHistoryDraft, now: DateTime<Utc>) -> Self {
        let mut entry = FamilyHistory {
            family_history_id: id,
            user_id: owner,
            relative: draft.relative,
            condition: draft.condition,
            relationship: draft.relationship,
            age_at_onset: None,
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        entry.apply(draft.details, now);
        entry
    }

    fn apply(&mut self, patch: FamilyHistoryPatch, now: DateTime<Utc>) {
        assign(&mut self.relative, patch.relative);
        assign(&mut self.condition, patch.condition);
        assign(&mut self.relationship, patch.relationship);
        assign(&mut self.age_at_onset, patch.age_at_onset);
        assign(&mut self.notes, patch.notes);
        self.updated_at = now;
    }

    fn id(&self) -> Uuid {
        self.family_history_id
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

    fn matches(&self, filter: &FamilyHistoryFilter, search: Option<&str>) -> bool {
        filter.relationship.is_none_or(|wanted| self.relationship == wanted)
            && search.is_none_or(|needle| {
                contains_ci(Some(self.relative.as_str()), needle) || contains_ci(Some(self.condition.as_str()), needle)
            })
    }

    fn compare(&self, other: &Self, sort: FamilyHistorySort) -> Ordering {
        match sort {
            FamilyHistorySort::CreatedAt => self.created_at.cmp(&other.created_at),
            FamilyHistorySort::Relative => self.relative.cmp(&other.relative),
            FamilyHistorySort::Condition => self.condition.cmp(&other.condition),
            FamilyHistorySort::Relationship => self.relationship.as_str().cmp(other.relationship.as_str()),
            FamilyHistorySort::AgeAtOnset => cmp_opt(self.age_at_onset, other.age_at_onset),
        }
    }
}
