use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::models::enums::{CommType, str_enum};
use crate::models::{PageRequest, QueryMap};
use crate::schema::communications;
use crate::validation::{self as check, FieldErrors, Presence};

pub const STATUS_SENT: &str = "sent";
pub const STATUS_READ: &str = "read";

/// Upper bound on a conversation thread.
pub const THREAD_LIMIT: i64 = 200;

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = communications, primary_key(comm_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Communication {
    pub comm_id: Uuid,
    pub comm_type: CommType,
    pub user_from: Uuid,
    pub user_to: Uuid,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub status: String,
    pub read_at: Option<DateTime<Utc>>,
    pub meta: Option<Value>,
    pub created_at: DateTime<Utc>,
}

str_enum!(ContextType {
    Prescription => "prescription",
});

/// Either a user id or an email to resolve through the profile directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Id(Uuid),
    Email(String),
}

impl Recipient {
    fn parse(raw: String) -> Self {
        match Uuid::parse_str(&raw) {
            Ok(id) => Recipient::Id(id),
            Err(_) => Recipient::Email(raw),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SendInput {
    pub to: Option<String>,
    #[serde(rename = "type")]
    pub comm_type: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub context_type: Option<String>,
    pub context_id: Option<String>,
}

#[derive(Debug)]
pub struct Outgoing {
    pub to: Recipient,
    comm_type: CommType,
    subject: Option<String>,
    body: Option<String>,
    meta: Option<Value>,
}

impl SendInput {
    pub fn validate(self) -> Result<Outgoing, FieldErrors> {
        let mut errors = FieldErrors::default();
        let to = check::text(&mut errors, "to", self.to, Presence::Required, 320);
        let comm_type = check::choice(&mut errors, "type", self.comm_type, Presence::Optional);
        let subject = check::text(&mut errors, "subject", self.subject, Presence::Optional, 200);
        let body = check::text(&mut errors, "body", self.body, Presence::Optional, 5000);
        let context_type: Option<ContextType> =
            check::choice(&mut errors, "context_type", self.context_type, Presence::Optional);
        let context_id = check::text(&mut errors, "context_id", self.context_id, Presence::Optional, 100);

        match to {
            Some(to) if errors.is_empty() => Ok(Outgoing {
                to: Recipient::parse(to),
                comm_type: comm_type.unwrap_or(CommType::Message),
                subject,
                body,
                meta: context_type
                    .zip(context_id)
                    .map(|(kind, id)| json!({ "context_type": kind, "context_id": id })),
            }),
            _ => Err(errors),
        }
    }
}

impl Communication {
    pub fn outgoing(id: Uuid, from: Uuid, to: Uuid, message: Outgoing, now: DateTime<Utc>) -> Self {
        Communication {
            comm_id: id,
            comm_type: message.comm_type,
            user_from: from,
            user_to: to,
            subject: message.subject,
            body: message.body,
            status: STATUS_SENT.to_owned(),
            read_at: None,
            meta: message.meta,
            created_at: now,
        }
    }

    /// Whether this message belongs to the direct conversation between `a` and `b`.
    pub fn between(&self, a: Uuid, b: Uuid) -> bool {
        self.comm_type == CommType::Message
            && ((self.user_from == a && self.user_to == b) || (self.user_from == b && self.user_to == a))
    }
}

#[derive(Debug, Clone)]
pub struct InboxQuery {
    pub paging: PageRequest,
    pub comm_type: Option<CommType>,
}

impl InboxQuery {
    pub fn parse(query: &QueryMap) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::default();
        let paging = PageRequest::parse(query, &mut errors);
        let comm_type = check::choice(&mut errors, "type", query.get("type").cloned(), Presence::Optional);
        errors.into_result(InboxQuery { paging, comm_type })
    }
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable)]
#[diesel(table_name = communications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReadReceipt {
    pub comm_id: Uuid,
    pub status: String,
    pub read_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_accepts_uuid_or_email() {
        let id = Uuid::new_v4();
        let message = SendInput {
            to: Some(id.to_string()),
            ..SendInput::default()
        }
        .validate()
        .unwrap();
        assert_eq!(message.to, Recipient::Id(id));
        assert_eq!(message.comm_type, CommType::Message);

        let message = SendInput {
            to: Some("dr.naidoo@clinic.org".into()),
            ..SendInput::default()
        }
        .validate()
        .unwrap();
        assert_eq!(message.to, Recipient::Email("dr.naidoo@clinic.org".into()));
    }

    #[test]
    fn context_meta_needs_both_parts() {
        let message = SendInput {
            to: Some("dr.naidoo@clinic.org".into()),
            context_type: Some("prescription".into()),
            context_id: Some("abc".into()),
            ..SendInput::default()
        }
        .validate()
        .unwrap();
        assert_eq!(message.meta, Some(json!({ "context_type": "prescription", "context_id": "abc" })));

        let message = SendInput {
            to: Some("dr.naidoo@clinic.org".into()),
            context_type: Some("prescription".into()),
            ..SendInput::default()
        }
        .validate()
        .unwrap();
        assert!(message.meta.is_none());
    }

    #[test]
    fn oversized_subject_and_unknown_type_are_rejected() {
        let errors = SendInput {
            to: Some("x@y.org".into()),
            comm_type: Some("letter".into()),
            subject: Some("s".repeat(201)),
            ..SendInput::default()
        }
        .validate()
        .unwrap_err();
        assert!(errors.contains("type"));
        assert!(errors.contains("subject"));
    }
}
