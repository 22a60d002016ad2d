use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::str_enum;
use crate::models::{QueryMap, Resource, assign, cmp_f64, cmp_opt, contains_ci};
use crate::schema::vital_signs;
use crate::validation::{self as check, Bounds, FieldErrors, Presence};

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = vital_signs, primary_key(vital_sign_id), treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VitalSign {
    pub vital_sign_id: Uuid,
    pub user_id: Uuid,
    pub measurement_date: Option<NaiveDate>,
    pub systolic_bp: Option<f64>,
    pub diastolic_bp: Option<f64>,
    pub heart_rate: Option<f64>,
    pub temperature: Option<f64>,
    pub oxygen_saturation: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub blood_glucose: Option<f64>,
    pub cholesterol_total: Option<f64>,
    pub hdl_cholesterol: Option<f64>,
    pub ldl_cholesterol: Option<f64>,
    pub triglycerides: Option<f64>,
    pub measurement_device: Option<String>,
    pub measurement_context: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VitalSignInput {
    pub measurement_date: Option<String>,
    pub systolic_bp: Option<f64>,
    pub diastolic_bp: Option<f64>,
    pub heart_rate: Option<f64>,
    pub temperature: Option<f64>,
    pub oxygen_saturation: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub blood_glucose: Option<f64>,
    pub cholesterol_total: Option<f64>,
    pub hdl_cholesterol: Option<f64>,
    pub ldl_cholesterol: Option<f64>,
    pub triglycerides: Option<f64>,
    pub measurement_device: Option<String>,
    pub measurement_context: Option<String>,
    pub notes: Option<String>,
}

/// Every vital is optional, so the same shape serves create and update.
#[derive(Debug, Default)]
pub struct VitalSignPatch {
    pub measurement_date: Option<Option<NaiveDate>>,
    pub systolic_bp: Option<Option<f64>>,
    pub diastolic_bp: Option<Option<f64>>,
    pub heart_rate: Option<Option<f64>>,
    pub temperature: Option<Option<f64>>,
    pub oxygen_saturation: Option<Option<f64>>,
    pub respiratory_rate: Option<Option<f64>>,
    pub blood_glucose: Option<Option<f64>>,
    pub cholesterol_total: Option<Option<f64>>,
    pub hdl_cholesterol: Option<Option<f64>>,
    pub ldl_cholesterol: Option<Option<f64>>,
    pub triglycerides: Option<Option<f64>>,
    pub measurement_device: Option<Option<String>>,
    pub measurement_context: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Default)]
pub struct VitalSignFilter {
    pub measurement_context: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

str_enum!(VitalSignSort {
    CreatedAt => "created_at",
    MeasurementDate => "measurement_date",
    SystolicBp => "systolic_bp",
    HeartRate => "heart_rate",
    Temperature => "temperature",
});

impl Default for VitalSignSort {
    fn default() -> Self {
        VitalSignSort::CreatedAt
    }
}

fn collect(input: VitalSignInput, errors: &mut FieldErrors) -> VitalSignPatch {
    let optional = Presence::Optional;
    let mut reading = |field: &str, raw: Option<f64>, bounds: Bounds| {
        raw.map(|value| check::number(errors, field, Some(value), bounds))
    };
    let systolic_bp = reading("systolic_bp", input.systolic_bp, Bounds::positive(300.0));
    let diastolic_bp = reading("diastolic_bp", input.diastolic_bp, Bounds::positive(200.0));
    let heart_rate = reading("heart_rate", input.heart_rate, Bounds::positive(300.0));
    let temperature = reading("temperature", input.temperature, Bounds::range(30.0, 50.0));
    let oxygen_saturation = reading("oxygen_saturation", input.oxygen_saturation, Bounds::range(0.0, 100.0));
    let respiratory_rate = reading("respiratory_rate", input.respiratory_rate, Bounds::positive(60.0));
    let blood_glucose = reading("blood_glucose", input.blood_glucose, Bounds::positive(1000.0));
    let cholesterol_total = reading("cholesterol_total", input.cholesterol_total, Bounds::positive(1000.0));
    let hdl_cholesterol = reading("hdl_cholesterol", input.hdl_cholesterol, Bounds::positive(200.0));
    let ldl_cholesterol = reading("ldl_cholesterol", input.ldl_cholesterol, Bounds::positive(500.0));
    let triglycerides = reading("triglycerides", input.triglycerides, Bounds::positive(2000.0));

    VitalSignPatch {
        measurement_date: check::changed(input.measurement_date, |raw| check::date(errors, "measurement_date", raw)),
        systolic_bp,
        diastolic_bp,
        heart_rate,
        temperature,
        oxygen_saturation,
        respiratory_rate,
        blood_glucose,
        cholesterol_total,
        hdl_cholesterol,
        ldl_cholesterol,
        triglycerides,
        measurement_device: check::changed(input.measurement_device, |raw| {
            check::text(errors, "measurement_device", raw, optional, 200)
        }),
        measurement_context: check::changed(input.measurement_context, |raw| {
            check::text(errors, "measurement_context", raw, optional, 100)
        }),
        notes: check::changed(input.notes, |raw| check::text(errors, "notes", raw, optional, 1000)),
    }
}

impl Resource for VitalSign {
    const LABEL: &'static str = "Vital sign";

    type Input = VitalSignInput;
    type Draft = VitalSignPatch;
    type Patch = VitalSignPatch;
    type Filter = VitalSignFilter;
    type Sort = VitalSignSort;

    fn validate_create(input: VitalSignInput) -> Result<VitalSignPatch, FieldErrors> {
        let mut errors = FieldErrors::default();
        let draft = collect(input, &mut errors);
        errors.into_result(draft)
    }

    fn validate_update(input: VitalSignInput) -> Result<VitalSignPatch, FieldErrors> {
        Self::validate_create(input)
    }

    fn parse_filter(query: &QueryMap, errors: &mut FieldErrors) -> VitalSignFilter {
        VitalSignFilter {
            measurement_context: check::text(
                errors,
                "measurement_context",
                query.get("measurement_context").cloned(),
                Presence::Optional,
                100,
            ),
            date_from: check::date(errors, "date_from", query.get("date_from").cloned()),
            date_to: check::date(errors, "date_to", query.get("date_to").cloned()),
        }
    }

    fn from_draft(id: Uuid, owner: Uuid, draft: VitalSignPatch, now: DateTime<Utc>) -> Self {
        let mut vital = VitalSign {
            vital_sign_id: id,
            user_id: owner,
            measurement_date: None,
            systolic_bp: None,
            diastolic_bp: None,
            heart_rate: None,
            temperature: None,
            oxygen_saturation: None,
            respiratory_rate: None,
            blood_glucose: None,
            cholesterol_total: None,
            hdl_cholesterol: None,
            ldl_cholesterol: None,
            triglycerides: None,
            measurement_device: None,
            measurement_context: None,
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        vital.apply(draft, now);
        vital
    }

    fn apply(&mut self, patch: VitalSignPatch, now: DateTime<Utc>) {
        assign(&mut self.measurement_date, patch.measurement_date);
        assign(&mut self.systolic_bp, patch.systolic_bp);
        assign(&mut self.diastolic_bp, patch.diastolic_bp);
        assign(&mut self.heart_rate, patch.heart_rate);
        assign(&mut self.temperature, patch.temperature);
        assign(&mut self.oxygen_saturation, patch.oxygen_saturation);
        assign(&mut self.respiratory_rate, patch.respiratory_rate);
        assign(&mut self.blood_glucose, patch.blood_glucose);
        assign(&mut self.cholesterol_total, patch.cholesterol_total);
        assign(&mut self.hdl_cholesterol, patch.hdl_cholesterol);
        assign(&mut self.ldl_cholesterol, patch.ldl_cholesterol);
        assign(&mut self.triglycerides, patch.triglycerides);
        assign(&mut self.measurement_device, patch.measurement_device);
        assign(&mut self.measurement_context, patch.measurement_context);
        assign(&mut self.notes, patch.notes);
        self.updated_at = now;
    }

    fn id(&self) -> Uuid {
        self.vital_sign_id
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

    fn matches(&self, filter: &VitalSignFilter, search: Option<&str>) -> bool {
        filter
            .measurement_context
            .as_deref()
            .is_none_or(|wanted| self.measurement_context.as_deref() == Some(wanted))
            && filter
                .date_from
                .is_none_or(|from| self.measurement_date.is_some_and(|taken| taken >= from))
            && filter
                .date_to
                .is_none_or(|to| self.measurement_date.is_some_and(|taken| taken <= to))
            && search.is_none_or(|needle| {
                contains_ci(self.measurement_device.as_deref(), needle)
                    || contains_ci(self.measurement_context.as_deref(), needle)
                    || contains_ci(self.notes.as_deref(), needle)
            })
    }

    fn compare(&self, other: &Self, sort: VitalSignSort) -> Ordering {
        match sort {
            VitalSignSort::CreatedAt => self.created_at.cmp(&other.created_at),
            VitalSignSort::MeasurementDate => cmp_opt(self.measurement_date, other.measurement_date),
            VitalSignSort::SystolicBp => cmp_f64(self.systolic_bp, other.systolic_bp),
            VitalSignSort::HeartRate => cmp_f64(self.heart_rate, other.heart_rate),
            VitalSignSort::Temperature => cmp_f64(self.temperature, other.temperature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reading_is_allowed() {
        let draft = VitalSign::validate_create(VitalSignInput::default()).unwrap();
        let vital = VitalSign::from_draft(Uuid::new_v4(), Uuid::new_v4(), draft, Utc::now());
        assert!(vital.heart_rate.is_none());
    }

    #[test]
    fn physiological_bounds_are_enforced() {
        let errors = VitalSign::validate_create(VitalSignInput {
            heart_rate: Some(0.0),
            temperature: Some(29.9),
            oxygen_saturation: Some(100.5),
            systolic_bp: Some(120.0),
            ..VitalSignInput::default()
        })
        .unwrap_err();
        assert!(errors.contains("heart_rate"));
        assert!(errors.contains("temperature"));
        assert!(errors.contains("oxygen_saturation"));
        assert!(!errors.contains("systolic_bp"));
    }

    #[test]
    fn date_range_filter() {
        let draft = VitalSign::validate_create(VitalSignInput {
            measurement_date: Some("2024-03-10".into()),
            measurement_context: Some("resting".into()),
            ..VitalSignInput::default()
        })
        .unwrap();
        let vital = VitalSign::from_draft(Uuid::new_v4(), Uuid::new_v4(), draft, Utc::now());
        let march = VitalSignFilter {
            date_from: NaiveDate::from_ymd_opt(2024, 3, 1),
            date_to: NaiveDate::from_ymd_opt(2024, 3, 31),
            ..VitalSignFilter::default()
        };
        assert!(vital.matches(&march, Some("rest")));
        let april = VitalSignFilter {
            date_from: NaiveDate::from_ymd_opt(2024, 4, 1),
            ..VitalSignFilter::default()
        };
        assert!(!vital.matches(&april, None));
    }
}
