use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Closed string vocabulary with `as_str`, `FromStr`, `Display` and serde support.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $(#[$meta])*
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::enums::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err($crate::models::enums::UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_owned(),
                    }),
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// A `str_enum!` stored in a `TEXT` column.
macro_rules! column_enum {
    ($name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $crate::models::enums::str_enum!(
            #[derive(diesel::AsExpression, diesel::FromSqlRow)]
            #[diesel(sql_type = diesel::sql_types::Text)]
            $name { $($variant => $value),+ }
        );

        impl diesel::serialize::ToSql<diesel::sql_types::Text, diesel::pg::Pg> for $name {
            fn to_sql<'b>(
                &'b self,
                out: &mut diesel::serialize::Output<'b, '_, diesel::pg::Pg>,
            ) -> diesel::serialize::Result {
                use std::io::Write;
                out.write_all(self.as_str().as_bytes())?;
                Ok(diesel::serialize::IsNull::No)
            }
        }

        impl diesel::deserialize::FromSql<diesel::sql_types::Text, diesel::pg::Pg> for $name {
            fn from_sql(bytes: diesel::pg::PgValue<'_>) -> diesel::deserialize::Result<Self> {
                let raw = std::str::from_utf8(bytes.as_bytes())?;
                Ok(raw.parse()?)
            }
        }
    };
}

pub(crate) use column_enum;
pub(crate) use str_enum;

column_enum!(AllergenType {
    Food => "food",
    Medication => "medication",
    Environmental => "environmental",
    Other => "other",
});

column_enum!(AllergySeverity {
    Mild => "mild",
    Moderate => "moderate",
    Severe => "severe",
    LifeThreatening => "life_threatening",
});

column_enum!(ConditionSeverity {
    Mild => "mild",
    Moderate => "moderate",
    Severe => "severe",
    Critical => "critical",
});

column_enum!(ConditionStatus {
    Active => "active",
    Resolved => "resolved",
    Chronic => "chronic",
    Remission => "remission",
});

column_enum!(SurgeryType {
    Elective => "elective",
    Emergency => "emergency",
    Diagnostic => "diagnostic",
    Cosmetic => "cosmetic",
    Reconstructive => "reconstructive",
});

column_enum!(SurgeryOutcome {
    Successful => "successful",
    Complications => "complications",
    PartialSuccess => "partial_success",
    Failed => "failed",
});

column_enum!(InjectionSite {
    LeftArm => "left_arm",
    RightArm => "right_arm",
    LeftThigh => "left_thigh",
    RightThigh => "right_thigh",
    Oral => "oral",
    Nasal => "nasal",
});

column_enum!(AdministrationRoute {
    Intramuscular => "intramuscular",
    Subcutaneous => "subcutaneous",
    Oral => "oral",
    Intranasal => "intranasal",
    Intradermal => "intradermal",
});

column_enum!(FamilyRelationship {
    Parent => "parent",
    Sibling => "sibling",
    Grandparent => "grandparent",
    Child => "child",
    Aunt => "aunt",
    Uncle => "uncle",
    Cousin => "cousin",
});

column_enum!(CaregiverRelationship {
    Spouse => "spouse",
    Parent => "parent",
    Child => "child",
    Sibling => "sibling",
    Partner => "partner",
    Friend => "friend",
    Relative => "relative",
    Guardian => "guardian",
    Professional => "professional",
    Other => "other",
});

column_enum!(EmergencyPriority {
    Primary => "primary",
    Secondary => "secondary",
    Tertiary => "tertiary",
    Unassigned => "none",
});

column_enum!(AccessLevel {
    Full => "full",
    MedicalInfoOnly => "medical_info_only",
    EmergencyOnly => "emergency_only",
    Limited => "limited",
    NoAccess => "none",
});

column_enum!(ContactRelationship {
    Spouse => "spouse",
    Parent => "parent",
    Child => "child",
    Sibling => "sibling",
    Partner => "partner",
    Friend => "friend",
    Relative => "relative",
    Guardian => "guardian",
    Caregiver => "caregiver",
    Other => "other",
});

column_enum!(DependentRelationship {
    Spouse => "spouse",
    Child => "child",
    Parent => "parent",
    Sibling => "sibling",
    Partner => "partner",
    Guardian => "guardian",
    Other => "other",
});

column_enum!(PersonTitle {
    Mr => "Mr",
    Mrs => "Mrs",
    Ms => "Ms",
    Dr => "Dr",
    Prof => "Prof",
    Master => "Master",
    Miss => "Miss",
});

column_enum!(Gender {
    Male => "male",
    Female => "female",
    NonBinary => "non-binary",
    PreferNotToSay => "prefer-not-to-say",
});

column_enum!(MaritalStatus {
    Single => "single",
    Married => "married",
    Divorced => "divorced",
    Widowed => "widowed",
    Separated => "separated",
});

column_enum!(AddressType {
    Home => "home",
    Postal => "postal",
    Delivery => "delivery",
});

column_enum!(CommType {
    Message => "message",
    Alert => "alert",
    Notification => "notification",
});

column_enum!(MedicationStatus {
    Active => "active",
    Paused => "paused",
    Completed => "completed",
    Discontinued => "discontinued",
});

column_enum!(MedicationRoute {
    Oral => "oral",
    Topical => "topical",
    Injection => "injection",
    Inhaled => "inhaled",
    Sublingual => "sublingual",
    Rectal => "rectal",
    Transdermal => "transdermal",
});

column_enum!(Effectiveness {
    VeryEffective => "very_effective",
    Effective => "effective",
    SomewhatEffective => "somewhat_effective",
    NotEffective => "not_effective",
    AdverseReaction => "adverse_reaction",
});

column_enum!(AdherenceStatus {
    Taken => "taken",
    TakenLate => "taken_late",
    TakenEarly => "taken_early",
    Missed => "missed",
    Skipped => "skipped",
});

str_enum!(SortDir {
    Asc => "asc",
    Desc => "desc",
});

impl Default for SortDir {
    fn default() -> Self {
        SortDir::Desc
    }
}

impl SortDir {
    pub fn apply(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_round_trip_through_strings() {
        assert_eq!("life_threatening".parse::<AllergySeverity>(), Ok(AllergySeverity::LifeThreatening));
        assert_eq!(AccessLevel::NoAccess.as_str(), "none");
        assert_eq!("prefer-not-to-say".parse::<Gender>(), Ok(Gender::PreferNotToSay));
        assert_eq!(PersonTitle::Dr.to_string(), "Dr");
    }

    #[test]
    fn unknown_values_name_the_kind() {
        let err = "Fatal".parse::<AllergySeverity>().unwrap_err();
        assert_eq!(err.kind, "AllergySeverity");
        assert_eq!(err.to_string(), "unknown AllergySeverity value 'Fatal'");
        assert!("dr".parse::<PersonTitle>().is_err());
    }

    #[test]
    fn serde_uses_wire_values() {
        let json = serde_json::to_string(&InjectionSite::LeftArm).unwrap();
        assert_eq!(json, "\"left_arm\"");
        let parsed: SurgeryOutcome = serde_json::from_str("\"partial_success\"").unwrap();
        assert_eq!(parsed, SurgeryOutcome::PartialSuccess);
    }

    #[test]
    fn descending_reverses_ordering() {
        use std::cmp::Ordering;
        assert_eq!(SortDir::default().apply(Ordering::Less), Ordering::Greater);
        assert_eq!(SortDir::Asc.apply(Ordering::Less), Ordering::Less);
    }
}
