use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{DependentRelationship, PersonTitle, str_enum};
use crate::models::{QueryMap, Resource, assign, cmp_opt, contains_ci};
use crate::schema::dependents;
use crate::validation::{self as check, FieldErrors, Presence};

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = dependents, primary_key(dependent_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Dependent {
    pub dependent_id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub relationship: Option<DependentRelationship>,
    pub date_of_birth: Option<NaiveDate>,
    pub id_number: Option<String>,
    pub medical_aid_number: Option<String>,
    pub title: Option<PersonTitle>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub passport_number: Option<String>,
    pub citizenship: Option<String>,
    pub use_profile_info: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DependentInput {
    pub full_name: Option<String>,
    pub relationship: Option<String>,
    pub date_of_birth: Option<String>,
    pub id_number: Option<String>,
    pub medical_aid_number: Option<String>,
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub passport_number: Option<String>,
    pub citizenship: Option<String>,
    pub use_profile_info: Option<bool>,
}

#[derive(Debug, Default)]
pub struct DependentPatch {
    pub full_name: Option<String>,
    pub relationship: Option<Option<DependentRelationship>>,
    pub date_of_birth: Option<Option<NaiveDate>>,
    pub id_number: Option<Option<String>>,
    pub medical_aid_number: Option<Option<String>>,
    pub title: Option<Option<PersonTitle>>,
    pub first_name: Option<Option<String>>,
    pub middle_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub passport_number: Option<Option<String>>,
    pub citizenship: Option<Option<String>>,
    pub use_profile_info: Option<bool>,
}

#[derive(Debug)]
pub struct DependentDraft {
    full_name: String,
    details: DependentPatch,
}

#[derive(Debug, Default)]
pub struct DependentFilter {
    pub relationship: Option<DependentRelationship>,
    pub citizenship: Option<String>,
}

str_enum!(DependentSort {
    CreatedAt => "created_at",
    FullName => "full_name",
    Relationship => "relationship",
    DateOfBirth => "date_of_birth",
});

impl Default for DependentSort {
    fn default() -> Self {
        DependentSort::CreatedAt
    }
}

fn collect(input: DependentInput, required: Presence, errors: &mut FieldErrors) -> DependentPatch {
    let optional = Presence::Optional;
    DependentPatch {
        full_name: check::text(errors, "full_name", input.full_name, required, 200),
        relationship: check::changed(input.relationship, |raw| check::choice(errors, "relationship", raw, optional)),
        date_of_birth: check::changed(input.date_of_birth, |raw| check::date(errors, "date_of_birth", raw)),
        id_number: check::changed(input.id_number, |raw| check::text(errors, "id_number", raw, optional, 20)),
        medical_aid_number: check::changed(input.medical_aid_number, |raw| {
            check::text(errors, "medical_aid_number", raw, optional, 50)
        }),
        title: check::changed(input.title, |raw| check::choice(errors, "title", raw, optional)),
        first_name: check::changed(input.first_name, |raw| check::text(errors, "first_name", raw, optional, 100)),
        middle_name: check::changed(input.middle_name, |raw| check::text(errors, "middle_name", raw, optional, 100)),
        last_name: check::changed(input.last_name, |raw| check::text(errors, "last_name", raw, optional, 100)),
        passport_number: check::changed(input.passport_number, |raw| {
            check::text(errors, "passport_number", raw, optional, 20)
        }),
        citizenship: check::changed(input.citizenship, |raw| check::text(errors, "citizenship", raw, optional, 100)),
        use_profile_info: input.use_profile_info,
    }
}

impl Resource for Dependent {
    const LABEL: &'static str = "Dependent";

    type Input = DependentInput;
    type Draft = DependentDraft;
    type Patch = DependentPatch;
    type Filter = DependentFilter;
    type Sort = DependentSort;

    fn validate_create(input: DependentInput) -> Result<DependentDraft, FieldErrors> {
        let mut errors = FieldErrors::default();
        let mut details = collect(input, Presence::Required, &mut errors);
        match details.full_name.take() {
            Some(full_name) if errors.is_empty() => Ok(DependentDraft { full_name, details }),
            _ => Err(errors),
        }
    }

    fn validate_update(input: DependentInput) -> Result<DependentPatch, FieldErrors> {
        let mut errors = FieldErrors::default();
        let patch = collect(input, Presence::NonEmpty, &mut errors);
        errors.into_result(patch)
    }

    fn parse_filter(query: &QueryMap, errors: &mut FieldErrors) -> DependentFilter {
        DependentFilter {
            relationship: check::choice(errors, "relationship", query.get("relationship").cloned(), Presence::Optional),
            citizenship: check::text(errors, "citizenship", query.get("citizenship").cloned(), Presence::Optional, 100),
        }
    }

    fn from_draft(id: Uuid, owner: Uuid, draft: DependentDraft, now: DateTime<Utc>) -> Self {
        let mut dependent = Dependent {
            dependent_id: id,
            user_id: owner,
            full_name: draft.full_name,
            relationship: None,
            date_of_birth: None,
            id_number: None,
            medical_aid_number: None,
            title: None,
            first_name: None,
            middle_name: None,
            last_name: None,
            passport_number: None,
            citizenship: None,
            use_profile_info: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        dependent.apply(draft.details, now);
        dependent
    }

    fn apply(&mut self, patch: DependentPatch, now: DateTime<Utc>) {
        assign(&mut self.full_name, patch.full_name);
        assign(&mut self.relationship, patch.relationship);
        assign(&mut self.date_of_birth, patch.date_of_birth);
        assign(&mut self.id_number, patch.id_number);
        assign(&mut self.medical_aid_number, patch.medical_aid_number);
        assign(&mut self.title, patch.title);
        assign(&mut self.first_name, patch.first_name);
        assign(&mut self.middle_name, patch.middle_name);
        assign(&mut self.last_name, patch.last_name);
        assign(&mut self.passport_number, patch.passport_number);
        assign(&mut self.citizenship, patch.citizenship);
        assign(&mut self.use_profile_info, patch.use_profile_info);
        self.updated_at = now;
    }

    fn id(&self) -> Uuid {
        self.dependent_id
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

    fn matches(&self, filter: &DependentFilter, search: Option<&str>) -> bool {
        filter.relationship.is_none_or(|wanted| self.relationship == Some(wanted))
            && filter
                .citizenship
                .as_deref()
                .is_none_or(|wanted| self.citizenship.as_deref() == Some(wanted))
            && search.is_none_or(|needle| {
                contains_ci(Some(self.full_name.as_str()), needle)
                    || contains_ci(self.first_name.as_deref(), needle)
                    || contains_ci(self.last_name.as_deref(), needle)
            })
    }

    fn compare(&self, other: &Self, sort: DependentSort) -> Ordering {
        match sort {
            DependentSort::CreatedAt => self.created_at.cmp(&other.created_at),
            DependentSort::FullName => self.full_name.cmp(&other.full_name),
            DependentSort::Relationship => cmp_opt(
                self.relationship.map(|value| value.as_str()),
                other.relationship.map(|value| value.as_str()),
            ),
            DependentSort::DateOfBirth => cmp_opt(self.date_of_birth, other.date_of_birth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_are_case_sensitive() {
        let errors = Dependent::validate_create(DependentInput {
            full_name: Some("Lerato Mokoena".into()),
            title: Some("miss".into()),
            ..DependentInput::default()
        })
        .unwrap_err();
        assert!(errors.contains("title"));

        let draft = Dependent::validate_create(DependentInput {
            full_name: Some("Lerato Mokoena".into()),
            title: Some("Miss".into()),
            relationship: Some("child".into()),
            ..DependentInput::default()
        })
        .unwrap();
        let dependent = Dependent::from_draft(Uuid::new_v4(), Uuid::new_v4(), draft, Utc::now());
        assert_eq!(dependent.title, Some(PersonTitle::Miss));
        assert!(!dependent.use_profile_info);
    }

    #[test]
    fn id_number_length_is_capped() {
        let errors = Dependent::validate_create(DependentInput {
            full_name: Some("Lerato Mokoena".into()),
            id_number: Some("1".repeat(21)),
            ..DependentInput::default()
        })
        .unwrap_err();
        assert!(errors.contains("id_number"));
    }
}
