use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::assign;
use crate::schema::medical_aids;
use crate::validation::{self as check, FieldErrors, Presence};

/// The patient's medical aid (health insurance) membership; at most one per user.
#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = medical_aids, primary_key(medical_aid_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MedicalAid {
    pub medical_aid_id: Uuid,
    pub user_id: Uuid,
    pub medical_aid_name: String,
    pub member_number: String,
    pub plan_type: Option<String>,
    pub policy_holder_id: Option<String>,
    pub dependent_code: Option<String>,
    pub is_primary_member: Option<bool>,
    pub policy_holder_first_name: Option<String>,
    pub policy_holder_last_name: Option<String>,
    pub policy_holder_email: Option<String>,
    pub policy_holder_phone: Option<String>,
    pub number_of_dependents: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Forms post the dependant count as either a number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Count {
    Number(f64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
pub struct MedicalAidInput {
    pub medical_aid_name: Option<String>,
    pub member_number: Option<String>,
    pub plan_type: Option<String>,
    pub policy_holder_id: Option<String>,
    pub dependent_code: Option<String>,
    pub is_primary_member: Option<bool>,
    pub policy_holder_first_name: Option<String>,
    pub policy_holder_last_name: Option<String>,
    pub policy_holder_email: Option<String>,
    pub policy_holder_phone: Option<String>,
    pub number_of_dependents: Option<Count>,
}

#[derive(Debug)]
pub struct MedicalAidUpdate {
    medical_aid_name: String,
    member_number: String,
    plan_type: Option<Option<String>>,
    policy_holder_id: Option<Option<String>>,
    dependent_code: Option<Option<String>>,
    is_primary_member: Option<Option<bool>>,
    policy_holder_first_name: Option<Option<String>>,
    policy_holder_last_name: Option<Option<String>>,
    policy_holder_email: Option<Option<String>>,
    policy_holder_phone: Option<Option<String>>,
    number_of_dependents: Option<Option<i32>>,
}

fn dependants(errors: &mut FieldErrors, raw: Count) -> Option<i32> {
    let value = match raw {
        Count::Number(value) => value,
        Count::Text(text) => match text.trim().parse::<f64>() {
            Ok(value) => value,
            Err(_) => {
                errors.push("number_of_dependents", "Must be an integer");
                return None;
            }
        },
    };
    check::integer(errors, "number_of_dependents", Some(value), 0, i32::MAX)
}

impl MedicalAidInput {
    pub fn validate(self) -> Result<MedicalAidUpdate, FieldErrors> {
        let mut errors = FieldErrors::default();
        let e = &mut errors;
        let (required, optional) = (Presence::Required, Presence::Optional);
        let free_text = |e: &mut FieldErrors, field: &str, raw: Option<String>| {
            check::changed(raw, |raw| check::text(e, field, raw, optional, usize::MAX))
        };

        let medical_aid_name =
            check::text(e, "medical_aid_name", self.medical_aid_name, required, usize::MAX);
        let member_number = check::text(e, "member_number", self.member_number, required, usize::MAX);
        let plan_type = free_text(e, "plan_type", self.plan_type);
        let policy_holder_id = free_text(e, "policy_holder_id", self.policy_holder_id);
        let dependent_code = free_text(e, "dependent_code", self.dependent_code);
        let policy_holder_first_name =
            free_text(e, "policy_holder_first_name", self.policy_holder_first_name);
        let policy_holder_last_name = free_text(e, "policy_holder_last_name", self.policy_holder_last_name);
        let policy_holder_email = check::changed(self.policy_holder_email, |raw| {
            check::email(e, "policy_holder_email", raw, optional)
        });
        let policy_holder_phone = free_text(e, "policy_holder_phone", self.policy_holder_phone);
        let number_of_dependents = self.number_of_dependents.map(|raw| dependants(e, raw));

        match (medical_aid_name, member_number) {
            (Some(medical_aid_name), Some(member_number)) if errors.is_empty() => Ok(MedicalAidUpdate {
                medical_aid_name,
                member_number,
                plan_type,
                policy_holder_id,
                dependent_code,
                is_primary_member: self.is_primary_member.map(Some),
                policy_holder_first_name,
                policy_holder_last_name,
                policy_holder_email,
                policy_holder_phone,
                number_of_dependents,
            }),
            _ => Err(errors),
        }
    }
}

impl MedicalAid {
    pub fn create(id: Uuid, owner: Uuid, update: MedicalAidUpdate, now: DateTime<Utc>) -> Self {
        let mut aid = MedicalAid {
            medical_aid_id: id,
            user_id: owner,
            medical_aid_name: String::new(),
            member_number: String::new(),
            plan_type: None,
            policy_holder_id: None,
            dependent_code: None,
            is_primary_member: None,
            policy_holder_first_name: None,
            policy_holder_last_name: None,
            policy_holder_email: None,
            policy_holder_phone: None,
            number_of_dependents: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        aid.apply(update, now);
        aid
    }

    pub fn apply(&mut self, update: MedicalAidUpdate, now: DateTime<Utc>) {
        self.medical_aid_name = update.medical_aid_name;
        self.member_number = update.member_number;
        assign(&mut self.plan_type, update.plan_type);
        assign(&mut self.policy_holder_id, update.policy_holder_id);
        assign(&mut self.dependent_code, update.dependent_code);
        assign(&mut self.is_primary_member, update.is_primary_member);
        assign(&mut self.policy_holder_first_name, update.policy_holder_first_name);
        assign(&mut self.policy_holder_last_name, update.policy_holder_last_name);
        assign(&mut self.policy_holder_email, update.policy_holder_email);
        assign(&mut self.policy_holder_phone, update.policy_holder_phone);
        assign(&mut self.number_of_dependents, update.number_of_dependents);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> MedicalAidInput {
        MedicalAidInput {
            medical_aid_name: Some(" Discovery ".into()),
            member_number: Some("123456789".into()),
            ..MedicalAidInput::default()
        }
    }

    #[test]
    fn name_and_member_number_are_required() {
        let errors = MedicalAidInput::default().validate().unwrap_err();
        assert!(errors.contains("medical_aid_name"));
        assert!(errors.contains("member_number"));
    }

    #[test]
    fn dependant_count_accepts_numeric_strings() {
        let update = MedicalAidInput {
            number_of_dependents: Some(Count::Text(" 3 ".into())),
            ..input()
        }
        .validate()
        .unwrap();
        let aid = MedicalAid::create(Uuid::new_v4(), Uuid::new_v4(), update, Utc::now());
        assert_eq!(aid.medical_aid_name, "Discovery");
        assert_eq!(aid.number_of_dependents, Some(3));

        for bad in [Count::Number(-1.0), Count::Number(2.5), Count::Text("two".into())] {
            let errors = MedicalAidInput {
                number_of_dependents: Some(bad),
                ..input()
            }
            .validate()
            .unwrap_err();
            assert!(errors.contains("number_of_dependents"));
        }
    }

    #[test]
    fn reapplying_keeps_fields_the_update_omits() {
        let now = Utc::now();
        let first = MedicalAidInput {
            plan_type: Some("Comprehensive".into()),
            is_primary_member: Some(true),
            policy_holder_email: Some("holder@example.org".into()),
            ..input()
        }
        .validate()
        .unwrap();
        let mut aid = MedicalAid::create(Uuid::new_v4(), Uuid::new_v4(), first, now);

        let second = MedicalAidInput {
            member_number: Some("987654321".into()),
            plan_type: Some(String::new()),
            ..input()
        }
        .validate()
        .unwrap();
        aid.apply(second, now);
        assert_eq!(aid.member_number, "987654321");
        assert!(aid.plan_type.is_none());
        assert_eq!(aid.is_primary_member, Some(true));
        assert_eq!(aid.policy_holder_email.as_deref(), Some("holder@example.org"));
    }

    #[test]
    fn holder_email_must_be_valid() {
        let errors = MedicalAidInput {
            policy_holder_email: Some("not-an-email".into()),
            ..input()
        }
        .validate()
        .unwrap_err();
        assert!(errors.contains("policy_holder_email"));
    }
}
