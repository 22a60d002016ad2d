use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::str_enum;
use crate::models::{QueryMap, Resource, assign, cmp_f64, contains_ci};
use crate::schema::sleep_entries;
use crate::validation::{self as check, Bounds, FieldErrors, Presence};

const RATING: Bounds = Bounds::range(1.0, 5.0);
const MINUTES: Bounds = Bounds::at_least(0.0);

/// One night of sleep.
#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = sleep_entries, primary_key(sleep_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SleepEntry {
    pub sleep_id: Uuid,
    pub user_id: Uuid,
    pub sleep_date: NaiveDate,
    pub bedtime: Option<String>,
    pub wake_time: Option<String>,
    pub sleep_duration_hours: Option<f64>,
    pub sleep_efficiency_percentage: Option<f64>,
    pub sleep_quality_rating: Option<f64>,
    pub rem_minutes: Option<f64>,
    pub deep_sleep_minutes: Option<f64>,
    pub light_sleep_minutes: Option<f64>,
    pub interruptions_count: Option<i32>,
    pub sleep_environment_rating: Option<f64>,
    pub sleep_aids_used: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SleepInput {
    pub sleep_date: Option<String>,
    pub bedtime: Option<String>,
    pub wake_time: Option<String>,
    pub sleep_duration_hours: Option<f64>,
    pub sleep_efficiency_percentage: Option<f64>,
    pub sleep_quality_rating: Option<f64>,
    pub rem_minutes: Option<f64>,
    pub deep_sleep_minutes: Option<f64>,
    pub light_sleep_minutes: Option<f64>,
    pub interruptions_count: Option<f64>,
    pub sleep_environment_rating: Option<f64>,
    pub sleep_aids_used: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct SleepPatch {
    pub sleep_date: Option<NaiveDate>,
    pub bedtime: Option<Option<String>>,
    pub wake_time: Option<Option<String>>,
    pub sleep_duration_hours: Option<Option<f64>>,
    pub sleep_efficiency_percentage: Option<Option<f64>>,
    pub sleep_quality_rating: Option<Option<f64>>,
    pub rem_minutes: Option<Option<f64>>,
    pub deep_sleep_minutes: Option<Option<f64>>,
    pub light_sleep_minutes: Option<Option<f64>>,
    pub interruptions_count: Option<Option<i32>>,
    pub sleep_environment_rating: Option<Option<f64>>,
    pub sleep_aids_used: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug)]
pub struct SleepDraft {
    sleep_date: NaiveDate,
    details: SleepPatch,
}

#[derive(Debug, Default)]
pub struct SleepFilter {
    pub min_quality: Option<i32>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

str_enum!(SleepSort {
    SleepDate => "sleep_date",
    CreatedAt => "created_at",
    SleepQualityRating => "sleep_quality_rating",
});

impl Default for SleepSort {
    fn default() -> Self {
        SleepSort::SleepDate
    }
}

fn collect(input: SleepInput, required: Presence, errors: &mut FieldErrors) -> SleepPatch {
    let optional = Presence::Optional;
    let mut reading = |field: &str, raw: Option<f64>, bounds: Bounds| {
        raw.map(|value| check::number(errors, field, Some(value), bounds))
    };
    let sleep_duration_hours =
        reading("sleep_duration_hours", input.sleep_duration_hours, Bounds::range(0.0, 48.0));
    let sleep_efficiency_percentage = reading(
        "sleep_efficiency_percentage",
        input.sleep_efficiency_percentage,
        Bounds::range(0.0, 100.0),
    );
    let sleep_quality_rating = reading("sleep_quality_rating", input.sleep_quality_rating, RATING);
    let rem_minutes = reading("rem_minutes", input.rem_minutes, MINUTES);
    let deep_sleep_minutes = reading("deep_sleep_minutes", input.deep_sleep_minutes, MINUTES);
    let light_sleep_minutes = reading("light_sleep_minutes", input.light_sleep_minutes, MINUTES);
    let sleep_environment_rating =
        reading("sleep_environment_rating", input.sleep_environment_rating, RATING);

    SleepPatch {
        sleep_date: check::date_with(errors, "sleep_date", input.sleep_date, required),
        bedtime: check::changed(input.bedtime, |raw| {
            check::text(errors, "bedtime", raw, optional, usize::MAX)
        }),
        wake_time: check::changed(input.wake_time, |raw| {
            check::text(errors, "wake_time", raw, optional, usize::MAX)
        }),
        sleep_duration_hours,
        sleep_efficiency_percentage,
        sleep_quality_rating,
        rem_minutes,
        deep_sleep_minutes,
        light_sleep_minutes,
        interruptions_count: check::changed(input.interruptions_count, |raw| {
            check::integer(errors, "interruptions_count", raw, 0, i32::MAX)
        }),
        sleep_environment_rating,
        sleep_aids_used: check::changed(input.sleep_aids_used, |raw| {
            check::text(errors, "sleep_aids_used", raw, optional, 200)
        }),
        notes: check::changed(input.notes, |raw| check::text(errors, "notes", raw, optional, usize::MAX)),
    }
}

impl Resource for SleepEntry {
    const LABEL: &'static str = "Sleep entry";

    type Input = SleepInput;
    type Draft = SleepDraft;
    type Patch = SleepPatch;
    type Filter = SleepFilter;
    type Sort = SleepSort;

    fn validate_create(input: SleepInput) -> Result<SleepDraft, FieldErrors> {
        let mut errors = FieldErrors::default();
        let mut details = collect(input, Presence::Required, &mut errors);
        match details.sleep_date.take() {
            Some(sleep_date) if errors.is_empty() => Ok(SleepDraft { sleep_date, details }),
            _ => Err(errors),
        }
    }

    fn validate_update(input: SleepInput) -> Result<SleepPatch, FieldErrors> {
        let mut errors = FieldErrors::default();
        let patch = collect(input, Presence::NonEmpty, &mut errors);
        errors.into_result(patch)
    }

    fn parse_filter(query: &QueryMap, errors: &mut FieldErrors) -> SleepFilter {
        let min_quality = match query.get("min_quality").map(|raw| raw.trim()) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<f64>() {
                Ok(value) => check::integer(errors, "min_quality", Some(value), 1, 5),
                Err(_) => {
                    errors.push("min_quality", "Must be an integer");
                    None
                }
            },
        };
        SleepFilter {
            min_quality,
            date_from: check::date(errors, "date_from", query.get("date_from").cloned()),
            date_to: check::date(errors, "date_to", query.get("date_to").cloned()),
        }
    }

    fn from_draft(id: Uuid, owner: Uuid, draft: SleepDraft, now: DateTime<Utc>) -> Self {
        let mut entry = SleepEntry {
            sleep_id: id,
            user_id: owner,
            sleep_date: draft.sleep_date,
            bedtime: None,
            wake_time: None,
            sleep_duration_hours: None,
            sleep_efficiency_percentage: None,
            sleep_quality_rating: None,
            rem_minutes: None,
            deep_sleep_minutes: None,
            light_sleep_minutes: None,
            interruptions_count: None,
            sleep_environment_rating: None,
            sleep_aids_used: None,
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        entry.apply(draft.details, now);
        entry
    }

    fn apply(&mut self, patch: SleepPatch, now: DateTime<Utc>) {
        assign(&mut self.sleep_date, patch.sleep_date);
        assign(&mut self.bedtime, patch.bedtime);
        assign(&mut self.wake_time, patch.wake_time);
        assign(&mut self.sleep_duration_hours, patch.sleep_duration_hours);
        assign(&mut self.sleep_efficiency_percentage, patch.sleep_efficiency_percentage);
        assign(&mut self.sleep_quality_rating, patch.sleep_quality_rating);
        assign(&mut self.rem_minutes, patch.rem_minutes);
        assign(&mut self.deep_sleep_minutes, patch.deep_sleep_minutes);
        assign(&mut self.light_sleep_minutes, patch.light_sleep_minutes);
        assign(&mut self.interruptions_count, patch.interruptions_count);
        assign(&mut self.sleep_environment_rating, patch.sleep_environment_rating);
        assign(&mut self.sleep_aids_used, patch.sleep_aids_used);
        assign(&mut self.notes, patch.notes);
        self.updated_at = now;
    }

    fn id(&self) -> Uuid {
        self.sleep_id
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

    fn matches(&self, filter: &SleepFilter, search: Option<&str>) -> bool {
        filter.min_quality.is_none_or(|min| {
            self.sleep_quality_rating.is_some_and(|rating| rating >= f64::from(min))
        }) && filter.date_from.is_none_or(|from| self.sleep_date >= from)
            && filter.date_to.is_none_or(|to| self.sleep_date <= to)
            && search.is_none_or(|needle| {
                contains_ci(self.notes.as_deref(), needle)
                    || contains_ci(self.sleep_aids_used.as_deref(), needle)
            })
    }

    fn compare(&self, other: &Self, sort: SleepSort) -> Ordering {
        match sort {
            SleepSort::SleepDate => self.sleep_date.cmp(&other.sleep_date),
            SleepSort::CreatedAt => self.created_at.cmp(&other.created_at),
            SleepSort::SleepQualityRating => {
                cmp_f64(self.sleep_quality_rating, other.sleep_quality_rating)
            }
        }
    }
}
