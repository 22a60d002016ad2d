use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::enums::{AccessLevel, CaregiverRelationship, EmergencyPriority, str_enum};
use crate::models::{QueryMap, Resource, assign, contains_ci};
use crate::schema::caregivers;
use crate::validation::{self as check, FieldErrors, Presence};

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = caregivers, primary_key(caregiver_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Caregiver {
    pub caregiver_id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub id_number: Option<String>,
    pub passport_number: Option<String>,
    pub citizenship: Option<String>,
    pub relationship: CaregiverRelationship,
    pub phone: String,
    pub email: Option<String>,
    pub emergency_contact: EmergencyPriority,
    pub access_level: AccessLevel,
    pub permissions: Option<Value>,
    pub use_profile_info: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CaregiverInput {
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub id_number: Option<String>,
    pub passport_number: Option<String>,
    pub citizenship: Option<String>,
    pub relationship: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub emergency_contact: Option<String>,
    pub access_level: Option<String>,
    pub permissions: Option<Value>,
    pub use_profile_info: Option<bool>,
}

#[derive(Debug, Default)]
pub struct CaregiverPatch {
    pub title: Option<Option<String>>,
    pub first_name: Option<String>,
    pub middle_name: Option<Option<String>>,
    pub last_name: Option<String>,
    pub id_number: Option<Option<String>>,
    pub passport_number: Option<Option<String>>,
    pub citizenship: Option<Option<String>>,
    pub relationship: Option<CaregiverRelationship>,
    pub phone: Option<String>,
    pub email: Option<Option<String>>,
    pub emergency_contact: Option<EmergencyPriority>,
    pub access_level: Option<AccessLevel>,
    pub permissions: Option<Option<Value>>,
    pub use_profile_info: Option<bool>,
}

#[derive(Debug)]
pub struct CaregiverDraft {
    first_name: String,
    last_name: String,
    relationship: CaregiverRelationship,
    phone: String,
    emergency_contact: EmergencyPriority,
    access_level: AccessLevel,
    details: CaregiverPatch,
}

#[derive(Debug, Default)]
pub struct CaregiverFilter {
    pub relationship: Option<CaregiverRelationship>,
    pub access_level: Option<AccessLevel>,
    pub emergency_contact: Option<EmergencyPriority>,
}

str_enum!(CaregiverSort {
    CreatedAt => "created_at",
    LastName => "last_name",
    Relationship => "relationship",
    AccessLevel => "access_level",
});

impl Default for CaregiverSort {
    fn default() -> Self {
        CaregiverSort::CreatedAt
    }
}

/// Permission flags are a flat JSON object of booleans.
fn permissions(errors: &mut FieldErrors, raw: Value) -> Option<Value> {
    match &raw {
        Value::Null => None,
        Value::Object(flags) if flags.values().all(Value::is_boolean) => Some(raw),
        _ => {
            errors.push("permissions", "Expected an object of boolean flags");
            None
        }
    }
}

fn collect(input: CaregiverInput, required: Presence, errors: &mut FieldErrors) -> CaregiverPatch {
    let optional = Presence::Optional;
    CaregiverPatch {
        title: check::changed(input.title, |raw| {
            check::text(errors, "title", raw, optional, usize::MAX)
        }),
        first_name: check::text(errors, "first_name", input.first_name, required, 50),
        middle_name: check::changed(input.middle_name, |raw| {
            check::text(errors, "middle_name", raw, optional, usize::MAX)
        }),
        last_name: check::text(errors, "last_name", input.last_name, required, 50),
        id_number: check::changed(input.id_number, |raw| {
            check::text(errors, "id_number", raw, optional, usize::MAX)
        }),
        passport_number: check::changed(input.passport_number, |raw| {
            check::text(errors, "passport_number", raw, optional, usize::MAX)
        }),
        citizenship: check::changed(input.citizenship, |raw| {
            check::text(errors, "citizenship", raw, optional, usize::MAX)
        }),
        relationship: check::choice(errors, "relationship", input.relationship, required),
        phone: check::phone(errors, "phone", input.phone, required),
        email: check::changed(input.email, |raw| check::email(errors, "email", raw, optional)),
        emergency_contact: check::choice(errors, "emergency_contact", input.emergency_contact, required),
        access_level: check::choice(errors, "access_level", input.access_level, required),
        permissions: input.permissions.map(|raw| permissions(errors, raw)),
        use_profile_info: input.use_profile_info,
    }
}

impl Resource for Caregiver {
    const LABEL: &'static str = "Caregiver";

    type Input = CaregiverInput;
    type Draft = CaregiverDraft;
    type Patch = CaregiverPatch;
    type Filter = CaregiverFilter;
    type Sort = CaregiverSort;

    fn validate_create(input: CaregiverInput) -> Result<CaregiverDraft, FieldErrors> {
        let mut errors = FieldErrors::default();
        let mut details = collect(input, Presence::Required, &mut errors);
        match (
            details.first_name.take(),
            details.last_name.take(),
            details.relationship,
            details.phone.take(),
            details.emergency_contact,
            details.access_level,
        ) {
            (
                Some(first_name),
                Some(last_name),
                Some(relationship),
                Some(phone),
                Some(emergency_contact),
                Some(access_level),
            ) if errors.is_empty() => Ok(CaregiverDraft {
                first_name,
                last_name,
                relationship,
                phone,
                emergency_contact,
                access_level,
                details,
            }),
            _ => Err(errors),
        }
    }

    fn validate_update(input: CaregiverInput) -> Result<CaregiverPatch, FieldErrors> {
        let mut errors = FieldErrors::default();
        let patch = collect(input, Presence::NonEmpty, &mut errors);
        errors.into_result(patch)
    }

    fn parse_filter(query: &QueryMap, errors: &mut FieldErrors) -> CaregiverFilter {
        let optional = Presence::Optional;
        CaregiverFilter {
            relationship: check::choice(errors, "relationship", query.get("relationship").cloned(), optional),
            access_level: check::choice(errors, "access_level", query.get("access_level").cloned(), optional),
            emergency_contact: check::choice(
                errors,
                "emergency_contact",
                query.get("emergency_contact").cloned(),
                optional,
            ),
        }
    }

    fn from_draft(id: Uuid, owner: Uuid, draft: CaregiverDraft, now: DateTime<Utc>) -> Self {
        let mut caregiver = Caregiver {
            caregiver_id: id,
            user_id: owner,
            title: None,
            first_name: draft.first_name,
            middle_name: None,
            last_name: draft.last_name,
            id_number: None,
            passport_number: None,
            citizenship: None,
            relationship: draft.relationship,
            phone: draft.phone,
            email: None,
            emergency_contact: draft.emergency_contact,
            access_level: draft.access_level,
            permissions: None,
            use_profile_info: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        caregiver.apply(draft.details, now);
        caregiver
    }

    fn apply(&mut self, patch: CaregiverPatch, now: DateTime<Utc>) {
        assign(&mut self.title, patch.title);
        assign(&mut self.first_name, patch.first_name);
        assign(&mut self.middle_name, patch.middle_name);
        assign(&mut self.last_name, patch.last_name);
        assign(&mut self.id_number, patch.id_number);
        assign(&mut self.passport_number, patch.passport_number);
        assign(&mut self.citizenship, patch.citizenship);
        assign(&mut self.relationship, patch.relationship);
        assign(&mut self.phone, patch.phone);
        assign(&mut self.email, patch.email);
        assign(&mut self.emergency_contact, patch.emergency_contact);
        assign(&mut self.access_level, patch.access_level);
        assign(&mut self.permissions, patch.permissions);
        assign(&mut self.use_profile_info, patch.use_profile_info);
        self.updated_at = now;
    }

    fn id(&self) -> Uuid {
        self.caregiver_id
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

    fn matches(&self, filter: &CaregiverFilter, search: Option<&str>) -> bool {
        filter.relationship.is_none_or(|wanted| self.relationship == wanted)
            && filter.access_level.is_none_or(|wanted| self.access_level == wanted)
            && filter.emergency_contact.is_none_or(|wanted| self.emergency_contact == wanted)
            && search.is_none_or(|needle| {
                contains_ci(Some(self.first_name.as_str()), needle)
                    || contains_ci(Some(self.last_name.as_str()), needle)
                    || contains_ci(Some(self.phone.as_str()), needle)
                    || contains_ci(self.email.as_deref(), needle)
            })
    }

    fn compare(&self, other: &Self, sort: CaregiverSort) -> Ordering {
        match sort {
            CaregiverSort::CreatedAt => self.created_at.cmp(&other.created_at),
            CaregiverSort::LastName => self.last_name.cmp(&other.last_name),
            CaregiverSort::Relationship => self.relationship.as_str().cmp(other.relationship.as_str()),
            CaregiverSort::AccessLevel => self.access_level.as_str().cmp(other.access_level.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn input() -> CaregiverInput {
        CaregiverInput {
            first_name: Some("Thandi".into()),
            last_name: Some("Nkosi".into()),
            relationship: Some("professional".into()),
            phone: Some("+27 82 555 0101".into()),
            emergency_contact: Some("none".into()),
            access_level: Some("medical_info_only".into()),
            ..CaregiverInput::default()
        }
    }

    #[test]
    fn complete_caregiver_is_accepted() {
        let draft = Caregiver::validate_create(CaregiverInput {
            permissions: Some(json!({ "view_medications": true, "book_appointments": false })),
            ..input()
        })
        .unwrap();
        let caregiver = Caregiver::from_draft(Uuid::new_v4(), Uuid::new_v4(), draft, Utc::now());
        assert_eq!(caregiver.emergency_contact, EmergencyPriority::Unassigned);
        assert_eq!(caregiver.access_level, AccessLevel::MedicalInfoOnly);
        assert!(!caregiver.use_profile_info);
        assert!(caregiver.permissions.is_some());
    }

    #[test]
    fn phone_and_permissions_are_checked() {
        let errors = Caregiver::validate_create(CaregiverInput {
            phone: Some("ring ring".into()),
            permissions: Some(json!({ "view_medications": "yes" })),
            email: Some("nobody".into()),
            ..input()
        })
        .unwrap_err();
        assert!(errors.contains("phone"));
        assert!(errors.contains("permissions"));
        assert!(errors.contains("email"));
    }
}
