use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{AdministrationRoute, InjectionSite, str_enum};
use crate::models::{QueryMap, Resource, assign, cmp_opt, contains_ci};
use crate::schema::immunizations;
use crate::validation::{self as check, FieldErrors, Presence};

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = immunizations, primary_key(immunization_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Immunization {
    pub immunization_id: Uuid,
    pub user_id: Uuid,
    pub vaccine_name: String,
    pub vaccine_code: Option<String>,
    pub date_given: Option<NaiveDate>,
    pub provider_name: Option<String>,
    pub batch_number: Option<String>,
    pub site: Option<InjectionSite>,
    pub route: Option<AdministrationRoute>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImmunizationInput {
    pub vaccine_name: Option<String>,
    pub vaccine_code: Option<String>,
    pub date_given: Option<String>,
    pub provider_name: Option<String>,
    pub batch_number: Option<String>,
    pub site: Option<String>,
    pub route: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct ImmunizationPatch {
    pub vaccine_name: Option<String>,
    pub vaccine_code: Option<Option<String>>,
    pub date_given: Option<Option<NaiveDate>>,
    pub provider_name: Option<Option<String>>,
    pub batch_number: Option<Option<String>>,
    pub site: Option<Option<InjectionSite>>,
    pub route: Option<Option<AdministrationRoute>>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug)]
pub struct ImmunizationDraft {
    vaccine_name: String,
    details: ImmunizationPatch,
}

/// `start_date`/`end_date` bound `date_given`, both inclusive.
#[derive(Debug, Default)]
pub struct ImmunizationFilter {
    pub site: Option<InjectionSite>,
    pub route: Option<AdministrationRoute>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

str_enum!(ImmunizationSort {
    CreatedAt => "created_at",
    VaccineName => "vaccine_name",
    DateGiven => "date_given",
    ProviderName => "provider_name",
});

impl Default for ImmunizationSort {
    fn default() -> Self {
        ImmunizationSort::CreatedAt
    }
}

fn collect(
    input: ImmunizationInput,
    required: Presence,
    errors: &mut FieldErrors,
) -> ImmunizationPatch {
    let optional = Presence::Optional;
    ImmunizationPatch {
        vaccine_name: check::text(errors, "vaccine_name", input.vaccine_name, required, 200),
        vaccine_code: check::changed(input.vaccine_code, |raw| {
            check::text(errors, "vaccine_code", raw, optional, 50)
        }),
        date_given: check::changed(input.date_given, |raw| check::date(errors, "date_given", raw)),
        provider_name: check::changed(input.provider_name, |raw| {
            check::text(errors, "provider_name", raw, optional, 200)
        }),
        batch_number: check::changed(input.batch_number, |raw| {
            check::text(errors, "batch_number", raw, optional, 50)
        }),
        site: check::changed(input.site, |raw| check::choice(errors, "site", raw, optional)),
        route: check::changed(input.route, |raw| check::choice(errors, "route", raw, optional)),
        notes: check::changed(input.notes, |raw| {
            check::text(errors, "notes", raw, optional, usize::MAX)
        }),
    }
}

impl Resource for Immunization {
    const LABEL: &'static str = "Immunization";

    type Input = ImmunizationInput;
    type Draft = ImmunizationDraft;
    type Patch = ImmunizationPatch;
    type Filter = ImmunizationFilter;
    type Sort = ImmunizationSort;

    fn validate_create(input: ImmunizationInput) -> Result<ImmunizationDraft, FieldErrors> {
        let mut errors = FieldErrors::default();
        let mut details = collect(input, Presence::Required, &mut errors);
        match details.vaccine_name.take() {
            Some(vaccine_name) if errors.is_empty() => Ok(ImmunizationDraft { vaccine_name, details }),
            _ => Err(errors),
        }
    }

    fn validate_update(input: ImmunizationInput) -> Result<ImmunizationPatch, FieldErrors> {
        let mut errors = FieldErrors::default();
        let patch = collect(input, Presence::NonEmpty, &mut errors);
        errors.into_result(patch)
    }

    fn parse_filter(query: &QueryMap, errors: &mut FieldErrors) -> ImmunizationFilter {
        ImmunizationFilter {
            site: check::choice(errors, "site", query.get("site").cloned(), Presence::Optional),
            route: check::choice(errors, "route", query.get("route").cloned(), Presence::Optional),
            start_date: check::date(errors, "start_date", query.get("start_date").cloned()),
            end_date: check::date(errors, "end_date", query.get("end_date").cloned()),
        }
    }

    fn from_draft(id: Uuid, owner: Uuid, draft: ImmunizationDraft, now: DateTime<Utc>) -> Self {
        let mut immunization = Immunization {
            immunization_id: id,
            user_id: owner,
            vaccine_name: draft.vaccine_name,
            vaccine_code: None,
            date_given: None,
            provider_name: None,
            batch_number: None,
            site: None,
            route: None,
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        immunization.apply(draft.details, now);
        immunization
    }

    fn apply(&mut self, patch: ImmunizationPatch, now: DateTime<Utc>) {
        assign(&mut self.vaccine_name, patch.vaccine_name);
        assign(&mut self.vaccine_code, patch.vaccine_code);
        assign(&mut self.date_given, patch.date_given);
        assign(&mut self.provider_name, patch.provider_name);
        assign(&mut self.batch_number, patch.batch_number);
        assign(&mut self.site, patch.site);
        assign(&mut self.route, patch.route);
        assign(&mut self.notes, patch.notes);
        self.updated_at = now;
    }

    fn id(&self) -> Uuid {
        self.immunization_id
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

    fn matches(&self, filter: &ImmunizationFilter, search: Option<&str>) -> bool {
        filter.site.is_none_or(|wanted| self.site == Some(wanted))
            && filter.route.is_none_or(|wanted| self.route == Some(wanted))
            && filter
                .start_date
                .is_none_or(|from| self.date_given.is_some_and(|given| given >= from))
            && filter
                .end_date
                .is_none_or(|to| self.date_given.is_some_and(|given| given <= to))
            && search.is_none_or(|needle| {
                contains_ci(Some(self.vaccine_name.as_str()), needle)
                    || contains_ci(self.provider_name.as_deref(), needle)
                    || contains_ci(self.notes.as_deref(), needle)
            })
    }

    fn compare(&self, other: &Self, sort: ImmunizationSort) -> Ordering {
        match sort {
            ImmunizationSort::CreatedAt => self.created_at.cmp(&other.created_at),
            ImmunizationSort::VaccineName => self.vaccine_name.cmp(&other.vaccine_name),
            ImmunizationSort::DateGiven => cmp_opt(self.date_given, other.date_given),
            ImmunizationSort::ProviderName => cmp_opt(self.provider_name.as_deref(), other.provider_name.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn given_on(date: &str) -> Immunization {
        let draft = Immunization::validate_create(ImmunizationInput {
            vaccine_name: Some("Influenza".into()),
            date_given: Some(date.into()),
            site: Some("left_arm".into()),
            ..ImmunizationInput::default()
        })
        .unwrap();
        Immunization::from_draft(Uuid::new_v4(), Uuid::new_v4(), draft, Utc::now())
    }

    #[test]
    fn date_window_is_inclusive() {
        let shot = given_on("2024-05-01");
        let filter = ImmunizationFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 31),
            ..ImmunizationFilter::default()
        };
        assert!(shot.matches(&filter, None));

        let later = ImmunizationFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 5, 2),
            ..ImmunizationFilter::default()
        };
        assert!(!shot.matches(&later, None));
    }

    #[test]
    fn invalid_filter_dates_are_reported() {
        let mut errors = FieldErrors::default();
        let query: QueryMap = [("start_date".to_owned(), "May 1st".to_owned())].into_iter().collect();
        Immunization::parse_filter(&query, &mut errors);
        assert!(errors.contains("start_date"));
    }
}
