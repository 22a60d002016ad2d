use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{ContactRelationship, str_enum};
use crate::models::{QueryMap, Resource, assign, cmp_opt, contains_ci};
use crate::schema::emergency_contacts;
use crate::validation::{self as check, FieldErrors, Presence};

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = emergency_contacts, primary_key(contact_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EmergencyContact {
    pub contact_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub relationship: Option<ContactRelationship>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_primary: bool,
    pub address: Option<String>,
    pub alternative_phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmergencyContactInput {
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_primary: Option<bool>,
    pub address: Option<String>,
    pub alternative_phone: Option<String>,
}

#[derive(Debug, Default)]
pub struct EmergencyContactPatch {
    pub name: Option<String>,
    pub relationship: Option<Option<ContactRelationship>>,
    pub phone: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub is_primary: Option<bool>,
    pub address: Option<Option<String>>,
    pub alternative_phone: Option<Option<String>>,
}

#[derive(Debug)]
pub struct EmergencyContactDraft {
    name: String,
    details: EmergencyContactPatch,
}

#[derive(Debug, Default)]
pub struct EmergencyContactFilter {
    pub relationship: Option<ContactRelationship>,
    pub is_primary: Option<bool>,
}

str_enum!(EmergencyContactSort {
    CreatedAt => "created_at",
    Name => "name",
    Relationship => "relationship",
    IsPrimary => "is_primary",
});

impl Default for EmergencyContactSort {
    fn default() -> Self {
        EmergencyContactSort::CreatedAt
    }
}

fn collect(
    input: EmergencyContactInput,
    required: Presence,
    errors: &mut FieldErrors,
) -> EmergencyContactPatch {
    let optional = Presence::Optional;
    EmergencyContactPatch {
        name: check::text(errors, "name", input.name, required, 200),
        relationship: check::changed(input.relationship, |raw| check::choice(errors, "relationship", raw, optional)),
        phone: check::changed(input.phone, |raw| check::phone(errors, "phone", raw, optional)),
        email: check::changed(input.email, |raw| check::email(errors, "email", raw, optional)),
        is_primary: input.is_primary,
        address: check::changed(input.address, |raw| {
            check::text(errors, "address", raw, optional, usize::MAX)
        }),
        alternative_phone: check::changed(input.alternative_phone, |raw| {
            check::phone(errors, "alternative_phone", raw, optional)
        }),
    }
}

impl Resource for EmergencyContact {
    const LABEL: &'static str = "Emergency contact";

    type Input = EmergencyContactInput;
    type Draft = EmergencyContactDraft;
    type Patch = EmergencyContactPatch;
    type Filter = EmergencyContactFilter;
    type Sort = EmergencyContactSort;

    fn validate_create(input: EmergencyContactInput) -> Result<EmergencyContactDraft, FieldErrors> {
        let mut errors = FieldErrors::default();
        let mut details = collect(input, Presence::Required, &mut errors);
        let reachable = details.phone.as_ref().is_some_and(Option::is_some)
            || details.email.as_ref().is_some_and(Option::is_some);
        if !reachable && !errors.contains("phone") && !errors.contains("email") {
            errors.push("phone", "Either phone or email must be provided");
        }
        match details.name.take() {
            Some(name) if errors.is_empty() => Ok(EmergencyContactDraft { name, details }),
            _ => Err(errors),
        }
    }

    fn validate_update(input: EmergencyContactInput) -> Result<EmergencyContactPatch, FieldErrors> {
        let mut errors = FieldErrors::default();
        let patch = collect(input, Presence::NonEmpty, &mut errors);
        errors.into_result(patch)
    }

    fn parse_filter(query: &QueryMap, errors: &mut FieldErrors) -> EmergencyContactFilter {
        EmergencyContactFilter {
            relationship: check::choice(errors, "relationship", query.get("relationship").cloned(), Presence::Optional),
            is_primary: check::flag(errors, "is_primary", query.get("is_primary")),
        }
    }

    fn from_draft(id: Uuid, owner: Uuid, draft: EmergencyContactDraft, now: DateTime<Utc>) -> Self {
        let mut contact = EmergencyContact {
            contact_id: id,
            user_id: owner,
            name: draft.name,
            relationship: None,
            phone: None,
            email: None,
            is_primary: false,
            address: None,
            alternative_phone: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        contact.apply(draft.details, now);
        contact
    }

    fn apply(&mut self, patch: EmergencyContactPatch, now: DateTime<Utc>) {
        assign(&mut self.name, patch.name);
        assign(&mut self.relationship, patch.relationship);
        assign(&mut self.phone, patch.phone);
        assign(&mut self.email, patch.email);
        assign(&mut self.is_primary, patch.is_primary);
        assign(&mut self.address, patch.address);
        assign(&mut self.alternative_phone, patch.alternative_phone);
        self.updated_at = now;
    }

    fn id(&self) -> Uuid {
        self.contact_id
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

    fn matches(&self, filter: &EmergencyContactFilter, search: Option<&str>) -> bool {
        filter.relationship.is_none_or(|wanted| self.relationship == Some(wanted))
            && filter.is_primary.is_none_or(|wanted| self.is_primary == wanted)
            && search.is_none_or(|needle| {
                contains_ci(Some(self.name.as_str()), needle)
                    || contains_ci(self.phone.as_deref(), needle)
                    || contains_ci(self.email.as_deref(), needle)
            })
    }

    fn compare(&self, other: &Self, sort: EmergencyContactSort) -> Ordering {
        match sort {
            EmergencyContactSort::CreatedAt => self.created_at.cmp(&other.created_at),
            EmergencyContactSort::Name => self.name.cmp(&other.name),
            EmergencyContactSort::Relationship => cmp_opt(
                self.relationship.map(|value| value.as_str()),
                other.relationship.map(|value| value.as_str()),
            ),
            EmergencyContactSort::IsPrimary => self.is_primary.cmp(&other.is_primary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_needs_a_channel() {
        let errors = EmergencyContact::validate_create(EmergencyContactInput {
            name: Some("Sipho".into()),
            ..EmergencyContactInput::default()
        })
        .unwrap_err();
        assert!(errors.contains("phone"));

        let draft = EmergencyContact::validate_create(EmergencyContactInput {
            name: Some("Sipho".into()),
            email: Some("sipho@example.org".into()),
            ..EmergencyContactInput::default()
        });
        assert!(draft.is_ok());
    }

    #[test]
    fn blank_phone_does_not_count_as_a_channel() {
        let errors = EmergencyContact::validate_create(EmergencyContactInput {
            name: Some("Sipho".into()),
            phone: Some("   ".into()),
            ..EmergencyContactInput::default()
        })
        .unwrap_err();
        assert!(errors.contains("phone"));
    }

    #[test]
    fn primary_flag_filter() {
        let draft = EmergencyContact::validate_create(EmergencyContactInput {
            name: Some("Sipho".into()),
            phone: Some("082 555 0101".into()),
            is_primary: Some(true),
            ..EmergencyContactInput::default()
        })
        .unwrap();
        let contact = EmergencyContact::from_draft(Uuid::new_v4(), Uuid::new_v4(), draft, Utc::now());
        let not_primary = EmergencyContactFilter {
            is_primary: Some(false),
            ..EmergencyContactFilter::default()
        };
        assert!(!contact.matches(&not_primary, None));
        assert!(contact.matches(&EmergencyContactFilter::default(), Some("555")));
    }
}
