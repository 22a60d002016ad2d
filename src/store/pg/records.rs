use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use super::PgStore;
use crate::models::adherence::AdherenceSort;
use crate::models::allergy::AllergySort;
use crate::models::caregiver::CaregiverSort;
use crate::models::condition::ConditionSort;
use crate::models::dependent::DependentSort;
use crate::models::emergency_contact::EmergencyContactSort;
use crate::models::family_history::FamilyHistorySort;
use crate::models::immunization::ImmunizationSort;
use crate::models::medication::ActiveMedicationSort;
use crate::models::medication_history::MedicationHistorySort;
use crate::models::sleep::SleepSort;
use crate::models::surgery::SurgerySort;
use crate::models::vital_sign::VitalSignSort;
use crate::models::{
    ActiveMedication, AdherenceRecord, Allergy, Caregiver, Condition, Dependent, EmergencyContact,
    FamilyHistory, Immunization, ListParams, MedicationHistory, Resource, SleepEntry, SortDir, Surgery,
    VitalSign,
};
use crate::schema::{
    active_medications, allergies, caregivers, conditions, dependents, emergency_contacts,
    family_history, immunizations, medication_adherence, medication_history, sleep_entries, surgeries,
    vital_signs,
};
use crate::store::{ResourceStore, StoreResult};

macro_rules! order_by {
    ($query:ident, $dir:expr, $column:expr) => {
        match $dir {
            SortDir::Asc => $query.order($column.asc()),
            SortDir::Desc => $query.order($column.desc()),
        }
    };
}

/// Implements `ResourceStore` for one record table. `$filtered` builds the
/// owner-scoped, filtered query and `$ordered` applies the requested sort.
macro_rules! record_store {
    ($model:ty, $table:ident, $key:ident, $filtered:ident, $ordered:ident) => {
        impl ResourceStore<$model> for PgStore {
            fn list(
                &self,
                owner: Uuid,
                params: &ListParams<$model>,
            ) -> StoreResult<(Vec<$model>, i64)> {
                let mut conn = self.conn()?;
                let total: i64 = $filtered(owner, params).count().get_result(&mut conn)?;
                let rows = $ordered($filtered(owner, params), params)
                    .then_order_by($table::$key.asc())
                    .limit(params.paging.page_size)
                    .offset(params.paging.offset())
                    .select(<$model>::as_select())
                    .load(&mut conn)?;
                Ok((rows, total))
            }

            fn get(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<$model>> {
                let mut conn = self.conn()?;
                let row = $table::table
                    .filter($table::$key.eq(id))
                    .filter($table::user_id.eq(owner))
                    .filter($table::is_active.eq(true))
                    .select(<$model>::as_select())
                    .first(&mut conn)
                    .optional()?;
                Ok(row)
            }

            fn insert(&self, row: $model) -> StoreResult<$model> {
                let mut conn = self.conn()?;
                let row = diesel::insert_into($table::table)
                    .values(&row)
                    .returning(<$model>::as_returning())
                    .get_result(&mut conn)?;
                Ok(row)
            }

            fn update(
                &self,
                owner: Uuid,
                id: Uuid,
                patch: <$model as Resource>::Patch,
            ) -> StoreResult<Option<$model>> {
                let mut conn = self.conn()?;
                let updated = conn.transaction::<_, diesel::result::Error, _>(|conn| {
                    let current = $table::table
                        .filter($table::$key.eq(id))
                        .filter($table::user_id.eq(owner))
                        .filter($table::is_active.eq(true))
                        .select(<$model>::as_select())
                        .for_update()
                        .first(conn)
                        .optional()?;
                    let Some(mut row) = current else {
                        return Ok(None);
                    };
                    row.apply(patch, Utc::now());
                    diesel::update($table::table.find(id))
                        .set(&row)
                        .returning(<$model>::as_returning())
                        .get_result(conn)
                        .map(Some)
                })?;
                Ok(updated)
            }

            fn deactivate(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
                let mut conn = self.conn()?;
                let changed = diesel::update(
                    $table::table
                        .filter($table::$key.eq(id))
                        .filter($table::user_id.eq(owner))
                        .filter($table::is_active.eq(true)),
                )
                .set(($table::is_active.eq(false), $table::updated_at.eq(Utc::now())))
                .execute(&mut conn)?;
                Ok(changed > 0)
            }
        }
    };
}

record_store!(Allergy, allergies, allergy_id, filtered_allergies, ordered_allergies);
record_store!(Condition, conditions, condition_id, filtered_conditions, ordered_conditions);
record_store!(Surgery, surgeries, surgery_id, filtered_surgeries, ordered_surgeries);
record_store!(
    Immunization,
    immunizations,
    immunization_id,
    filtered_immunizations,
    ordered_immunizations
);
record_store!(
    FamilyHistory,
    family_history,
    family_history_id,
    filtered_family_history,
    ordered_family_history
);
record_store!(Caregiver, caregivers, caregiver_id, filtered_caregivers, ordered_caregivers);
record_store!(
    EmergencyContact,
    emergency_contacts,
    contact_id,
    filtered_contacts,
    ordered_contacts
);
record_store!(Dependent, dependents, dependent_id, filtered_dependents, ordered_dependents);
record_store!(VitalSign, vital_signs, vital_sign_id, filtered_vital_signs, ordered_vital_signs);
record_store!(SleepEntry, sleep_entries, sleep_id, filtered_sleep, ordered_sleep);
record_store!(
    ActiveMedication,
    active_medications,
    medication_id,
    filtered_medications,
    ordered_medications
);
record_store!(MedicationHistory, medication_history, history_id, filtered_history, ordered_history);
record_store!(
    AdherenceRecord,
    medication_adherence,
    adherence_id,
    filtered_adherence,
    ordered_adherence
);

fn filtered_allergies(
    owner: Uuid,
    params: &ListParams<Allergy>,
) -> allergies::BoxedQuery<'static, Pg> {
    let mut query = allergies::table
        .filter(allergies::user_id.eq(owner))
        .filter(allergies::is_active.eq(true))
        .into_boxed();
    if let Some(kind) = params.filter.allergen_type {
        query = query.filter(allergies::allergen_type.eq(kind));
    }
    if let Some(severity) = params.filter.severity {
        query = query.filter(allergies::severity.eq(severity));
    }
    if let Some(pattern) = params.search_pattern() {
        query = query.filter(
            allergies::allergen
                .nullable()
                .ilike(pattern.clone())
                .or(allergies::reaction.ilike(pattern)),
        );
    }
    query
}

fn ordered_allergies(
    query: allergies::BoxedQuery<'static, Pg>,
    params: &ListParams<Allergy>,
) -> allergies::BoxedQuery<'static, Pg> {
    match params.sort_by {
        AllergySort::CreatedAt => order_by!(query, params.sort_dir, allergies::created_at),
        AllergySort::Allergen => order_by!(query, params.sort_dir, allergies::allergen),
        AllergySort::Severity => order_by!(query, params.sort_dir, allergies::severity),
        AllergySort::AllergenType => order_by!(query, params.sort_dir, allergies::allergen_type),
    }
}

fn filtered_conditions(
    owner: Uuid,
    params: &ListParams<Condition>,
) -> conditions::BoxedQuery<'static, Pg> {
    let mut query = conditions::table
        .filter(conditions::user_id.eq(owner))
        .filter(conditions::is_active.eq(true))
        .into_boxed();
    if let Some(severity) = params.filter.severity {
        query = query.filter(conditions::severity.eq(severity));
    }
    if let Some(status) = params.filter.current_status {
        query = query.filter(conditions::current_status.eq(status));
    }
    if let Some(pattern) = params.search_pattern() {
        query = query.filter(
            conditions::condition_name
                .nullable()
                .ilike(pattern.clone())
                .or(conditions::treatment.ilike(pattern)),
        );
    }
    query
}

fn ordered_conditions(
    query: conditions::BoxedQuery<'static, Pg>,
    params: &ListParams<Condition>,
) -> conditions::BoxedQuery<'static, Pg> {
    match params.sort_by {
        ConditionSort::CreatedAt => order_by!(query, params.sort_dir, conditions::created_at),
        ConditionSort::ConditionName => order_by!(query, params.sort_dir, conditions::condition_name),
        ConditionSort::Severity => order_by!(query, params.sort_dir, conditions::severity),
        ConditionSort::CurrentStatus => order_by!(query, params.sort_dir, conditions::current_status),
    }
}

fn filtered_surgeries(
    owner: Uuid,
    params: &ListParams<Surgery>,
) -> surgeries::BoxedQuery<'static, Pg> {
    let mut query = surgeries::table
        .filter(surgeries::user_id.eq(owner))
        .filter(surgeries::is_active.eq(true))
        .into_boxed();
    if let Some(kind) = params.filter.surgery_type {
        query = query.filter(surgeries::surgery_type.eq(kind));
    }
    if let Some(outcome) = params.filter.outcome {
        query = query.filter(surgeries::outcome.eq(outcome));
    }
    if let Some(pattern) = params.search_pattern() {
        query = query.filter(
            surgeries::surgery_name
                .nullable()
                .ilike(pattern.clone())
                .or(surgeries::surgeon_name.ilike(pattern.clone()))
                .or(surgeries::hospital_name.ilike(pattern)),
        );
    }
    query
}

fn ordered_surgeries(
    query: surgeries::BoxedQuery<'static, Pg>,
    params: &ListParams<Surgery>,
) -> surgeries::BoxedQuery<'static, Pg> {
    match params.sort_by {
        SurgerySort::CreatedAt => order_by!(query, params.sort_dir, surgeries::created_at),
        SurgerySort::SurgeryName => order_by!(query, params.sort_dir, surgeries::surgery_name),
        SurgerySort::SurgeryDate => order_by!(query, params.sort_dir, surgeries::surgery_date),
        SurgerySort::SurgeryType => order_by!(query, params.sort_dir, surgeries::surgery_type),
        SurgerySort::Outcome => order_by!(query, params.sort_dir, surgeries::outcome),
    }
}

fn filtered_immunizations(
    owner: Uuid,
    params: &ListParams<Immunization>,
) -> immunizations::BoxedQuery<'static, Pg> {
    let mut query = immunizations::table
        .filter(immunizations::user_id.eq(owner))
        .filter(immunizations::is_active.eq(true))
        .into_boxed();
    let filter = &params.filter;
    if let Some(site) = filter.site {
        query = query.filter(immunizations::site.eq(site));
    }
    if let Some(route) = filter.route {
        query = query.filter(immunizations::route.eq(route));
    }
    if let Some(from) = filter.start_date {
        query = query.filter(immunizations::date_given.ge(from));
    }
    if let Some(to) = filter.end_date {
        query = query.filter(immunizations::date_given.le(to));
    }
    if let Some(pattern) = params.search_pattern() {
        query = query.filter(
            immunizations::vaccine_name
                .nullable()
                .ilike(pattern.clone())
                .or(immunizations::provider_name.ilike(pattern.clone()))
                .or(immunizations::notes.ilike(pattern)),
        );
    }
    query
}

fn ordered_immunizations(
    query: immunizations::BoxedQuery<'static, Pg>,
    params: &ListParams<Immunization>,
) -> immunizations::BoxedQuery<'static, Pg> {
    match params.sort_by {
        ImmunizationSort::CreatedAt => order_by!(query, params.sort_dir, immunizations::created_at),
        ImmunizationSort::VaccineName => order_by!(query, params.sort_dir, immunizations::vaccine_name),
        ImmunizationSort::DateGiven => order_by!(query, params.sort_dir, immunizations::date_given),
        ImmunizationSort::ProviderName => order_by!(query, params.sort_dir, immunizations::provider_name),
    }
}

fn filtered_family_history(
    owner: Uuid,
    params: &ListParams<FamilyHistory>,
) -> family_history::BoxedQuery<'static, Pg> {
    let mut query = family_history::table
        .filter(family_history::user_id.eq(owner))
        .filter(family_history::is_active.eq(true))
        .into_boxed();
    if let Some(relationship) = params.filter.relationship {
        query = query.filter(family_history::relationship.eq(relationship));
    }
    if let Some(pattern) = params.search_pattern() {
        query = query.filter(
            family_history::relative
                .ilike(pattern.clone())
                .or(family_history::condition.ilike(pattern)),
        );
    }
    query
}

fn ordered_family_history(
    query: family_history::BoxedQuery<'static, Pg>,
    params: &ListParams<FamilyHistory>,
) -> family_history::BoxedQuery<'static, Pg> {
    match params.sort_by {
        FamilyHistorySort::CreatedAt => order_by!(query, params.sort_dir, family_history::created_at),
        FamilyHistorySort::Relative => order_by!(query, params.sort_dir, family_history::relative),
        FamilyHistorySort::Condition => order_by!(query, params.sort_dir, family_history::condition),
        FamilyHistorySort::Relationship => order_by!(query, params.sort_dir, family_history::relationship),
        FamilyHistorySort::AgeAtOnset => order_by!(query, params.sort_dir, family_history::age_at_onset),
    }
}

fn filtered_caregivers(
    owner: Uuid,
    params: &ListParams<Caregiver>,
) -> caregivers::BoxedQuery<'static, Pg> {
    let mut query = caregivers::table
        .filter(caregivers::user_id.eq(owner))
        .filter(caregivers::is_active.eq(true))
        .into_boxed();
    let filter = &params.filter;
    if let Some(relationship) = filter.relationship {
        query = query.filter(caregivers::relationship.eq(relationship));
    }
    if let Some(level) = filter.access_level {
        query = query.filter(caregivers::access_level.eq(level));
    }
    if let Some(priority) = filter.emergency_contact {
        query = query.filter(caregivers::emergency_contact.eq(priority));
    }
    if let Some(pattern) = params.search_pattern() {
        query = query.filter(
            caregivers::first_name
                .nullable()
                .ilike(pattern.clone())
                .or(caregivers::last_name.nullable().ilike(pattern.clone()))
                .or(caregivers::phone.nullable().ilike(pattern.clone()))
                .or(caregivers::email.ilike(pattern)),
        );
    }
    query
}

fn ordered_caregivers(
    query: caregivers::BoxedQuery<'static, Pg>,
    params: &ListParams<Caregiver>,
) -> caregivers::BoxedQuery<'static, Pg> {
    match params.sort_by {
        CaregiverSort::CreatedAt => order_by!(query, params.sort_dir, caregivers::created_at),
        CaregiverSort::LastName => order_by!(query, params.sort_dir, caregivers::last_name),
        CaregiverSort::Relationship => order_by!(query, params.sort_dir, caregivers::relationship),
        CaregiverSort::AccessLevel => order_by!(query, params.sort_dir, caregivers::access_level),
    }
}

fn filtered_contacts(
    owner: Uuid,
    params: &ListParams<EmergencyContact>,
) -> emergency_contacts::BoxedQuery<'static, Pg> {
    let mut query = emergency_contacts::table
        .filter(emergency_contacts::user_id.eq(owner))
        .filter(emergency_contacts::is_active.eq(true))
        .into_boxed();
    if let Some(relationship) = params.filter.relationship {
        query = query.filter(emergency_contacts::relationship.eq(relationship));
    }
    if let Some(primary) = params.filter.is_primary {
        query = query.filter(emergency_contacts::is_primary.eq(primary));
    }
    if let Some(pattern) = params.search_pattern() {
        query = query.filter(
            emergency_contacts::name
                .nullable()
                .ilike(pattern.clone())
                .or(emergency_contacts::phone.ilike(pattern.clone()))
                .or(emergency_contacts::email.ilike(pattern)),
        );
    }
    query
}

fn ordered_contacts(
    query: emergency_contacts::BoxedQuery<'static, Pg>,
    params: &ListParams<EmergencyContact>,
) -> emergency_contacts::BoxedQuery<'static, Pg> {
    match params.sort_by {
        EmergencyContactSort::CreatedAt => order_by!(query, params.sort_dir, emergency_contacts::created_at),
        EmergencyContactSort::Name => order_by!(query, params.sort_dir, emergency_contacts::name),
        EmergencyContactSort::Relationship => order_by!(query, params.sort_dir, emergency_contacts::relationship),
        EmergencyContactSort::IsPrimary => order_by!(query, params.sort_dir, emergency_contacts::is_primary),
    }
}

fn filtered_dependents(
    owner: Uuid,
    params: &ListParams<Dependent>,
) -> dependents::BoxedQuery<'static, Pg> {
    let mut query = dependents::table
        .filter(dependents::user_id.eq(owner))
        .filter(dependents::is_active.eq(true))
        .into_boxed();
    if let Some(relationship) = params.filter.relationship {
        query = query.filter(dependents::relationship.eq(relationship));
    }
    if let Some(citizenship) = params.filter.citizenship.clone() {
        query = query.filter(dependents::citizenship.eq(citizenship));
    }
    if let Some(pattern) = params.search_pattern() {
        query = query.filter(
            dependents::full_name
                .nullable()
                .ilike(pattern.clone())
                .or(dependents::first_name.ilike(pattern.clone()))
                .or(dependents::last_name.ilike(pattern)),
        );
    }
    query
}

fn ordered_dependents(
    query: dependents::BoxedQuery<'static, Pg>,
    params: &ListParams<Dependent>,
) -> dependents::BoxedQuery<'static, Pg> {
    match params.sort_by {
        DependentSort::CreatedAt => order_by!(query, params.sort_dir, dependents::created_at),
        DependentSort::FullName => order_by!(query, params.sort_dir, dependents::full_name),
        DependentSort::Relationship => order_by!(query, params.sort_dir, dependents::relationship),
        DependentSort::DateOfBirth => order_by!(query, params.sort_dir, dependents::date_of_birth),
    }
}

fn filtered_vital_signs(
    owner: Uuid,
    params: &ListParams<VitalSign>,
) -> vital_signs::BoxedQuery<'static, Pg> {
    let mut query = vital_signs::table
        .filter(vital_signs::user_id.eq(owner))
        .filter(vital_signs::is_active.eq(true))
        .into_boxed();
    let filter = &params.filter;
    if let Some(context) = filter.measurement_context.clone() {
        query = query.filter(vital_signs::measurement_context.eq(context));
    }
    if let Some(from) = filter.date_from {
        query = query.filter(vital_signs::measurement_date.ge(from));
    }
    if let Some(to) = filter.date_to {
        query = query.filter(vital_signs::measurement_date.le(to));
    }
    if let Some(pattern) = params.search_pattern() {
        query = query.filter(
            vital_signs::measurement_device
                .ilike(pattern.clone())
                .or(vital_signs::measurement_context.ilike(pattern.clone()))
                .or(vital_signs::notes.ilike(pattern)),
        );
    }
    query
}

fn ordered_vital_signs(
    query: vital_signs::BoxedQuery<'static, Pg>,
    params: &ListParams<VitalSign>,
) -> vital_signs::BoxedQuery<'static, Pg> {
    match params.sort_by {
        VitalSignSort::CreatedAt => order_by!(query, params.sort_dir, vital_signs::created_at),
        VitalSignSort::MeasurementDate => order_by!(query, params.sort_dir, vital_signs::measurement_date),
        VitalSignSort::SystolicBp => order_by!(query, params.sort_dir, vital_signs::systolic_bp),
        VitalSignSort::HeartRate => order_by!(query, params.sort_dir, vital_signs::heart_rate),
        VitalSignSort::Temperature => order_by!(query, params.sort_dir, vital_signs::temperature),
    }
}

fn filtered_sleep(
    owner: Uuid,
    params: &ListParams<SleepEntry>,
) -> sleep_entries::BoxedQuery<'static, Pg> {
    let mut query = sleep_entries::table
        .filter(sleep_entries::user_id.eq(owner))
        .filter(sleep_entries::is_active.eq(true))
        .into_boxed();
    let filter = &params.filter;
    if let Some(min) = filter.min_quality {
        query = query.filter(sleep_entries::sleep_quality_rating.ge(f64::from(min)));
    }
    if let Some(from) = filter.date_from {
        query = query.filter(sleep_entries::sleep_date.ge(from));
    }
    if let Some(to) = filter.date_to {
        query = query.filter(sleep_entries::sleep_date.le(to));
    }
    if let Some(pattern) = params.search_pattern() {
        query = query.filter(
            sleep_entries::notes
                .ilike(pattern.clone())
                .or(sleep_entries::sleep_aids_used.ilike(pattern)),
        );
    }
    query
}

fn ordered_sleep(
    query: sleep_entries::BoxedQuery<'static, Pg>,
    params: &ListParams<SleepEntry>,
) -> sleep_entries::BoxedQuery<'static, Pg> {
    match params.sort_by {
        SleepSort::SleepDate => order_by!(query, params.sort_dir, sleep_entries::sleep_date),
        SleepSort::CreatedAt => order_by!(query, params.sort_dir, sleep_entries::created_at),
        SleepSort::SleepQualityRating => {
            order_by!(query, params.sort_dir, sleep_entries::sleep_quality_rating)
        }
    }
}

fn filtered_medications(
    owner: Uuid,
    params: &ListParams<ActiveMedication>,
) -> active_medications::BoxedQuery<'static, Pg> {
    let mut query = active_medications::table
        .filter(active_medications::user_id.eq(owner))
        .filter(active_medications::is_active.eq(true))
        .into_boxed();
    if let Some(status) = params.filter.status {
        query = query.filter(active_medications::status.eq(status));
    }
    if let Some(route) = params.filter.route {
        query = query.filter(active_medications::route.eq(route));
    }
    if let Some(pattern) = params.search_pattern() {
        query = query.filter(
            active_medications::medication_name
                .nullable()
                .ilike(pattern.clone())
                .or(active_medications::prescriber.ilike(pattern)),
        );
    }
    query
}

fn ordered_medications(
    query: active_medications::BoxedQuery<'static, Pg>,
    params: &ListParams<ActiveMedication>,
) -> active_medications::BoxedQuery<'static, Pg> {
    let dir = params.sort_dir;
    match params.sort_by {
        ActiveMedicationSort::CreatedAt => order_by!(query, dir, active_medications::created_at),
        ActiveMedicationSort::MedicationName => {
            order_by!(query, dir, active_medications::medication_name)
        }
        ActiveMedicationSort::Status => order_by!(query, dir, active_medications::status),
        ActiveMedicationSort::Frequency => order_by!(query, dir, active_medications::frequency),
        ActiveMedicationSort::StartDate => order_by!(query, dir, active_medications::start_date),
    }
}

fn filtered_history(
    owner: Uuid,
    params: &ListParams<MedicationHistory>,
) -> medication_history::BoxedQuery<'static, Pg> {
    let mut query = medication_history::table
        .filter(medication_history::user_id.eq(owner))
        .filter(medication_history::is_active.eq(true))
        .into_boxed();
    if let Some(effectiveness) = params.filter.effectiveness {
        query = query.filter(medication_history::effectiveness.eq(effectiveness));
    }
    if let Some(pattern) = params.search_pattern() {
        query = query.filter(
            medication_history::medication_name
                .nullable()
                .ilike(pattern.clone())
                .or(medication_history::reason.ilike(pattern)),
        );
    }
    query
}

fn ordered_history(
    query: medication_history::BoxedQuery<'static, Pg>,
    params: &ListParams<MedicationHistory>,
) -> medication_history::BoxedQuery<'static, Pg> {
    use crate::schema::medication_history as history;
    let dir = params.sort_dir;
    match params.sort_by {
        MedicationHistorySort::CreatedAt => order_by!(query, dir, history::created_at),
        MedicationHistorySort::MedicationName => order_by!(query, dir, history::medication_name),
        MedicationHistorySort::TakenPeriod => order_by!(query, dir, history::taken_period),
        MedicationHistorySort::Effectiveness => order_by!(query, dir, history::effectiveness),
    }
}

fn filtered_adherence(
    owner: Uuid,
    params: &ListParams<AdherenceRecord>,
) -> medication_adherence::BoxedQuery<'static, Pg> {
    let mut query = medication_adherence::table
        .filter(medication_adherence::user_id.eq(owner))
        .filter(medication_adherence::is_active.eq(true))
        .into_boxed();
    if let Some(status) = params.filter.status {
        query = query.filter(medication_adherence::status.eq(status));
    }
    if let Some(pattern) = params.search_pattern() {
        query = query.filter(medication_adherence::medication_name.ilike(pattern));
    }
    query
}

fn ordered_adherence(
    query: medication_adherence::BoxedQuery<'static, Pg>,
    params: &ListParams<AdherenceRecord>,
) -> medication_adherence::BoxedQuery<'static, Pg> {
    use crate::schema::medication_adherence as adherence;
    let dir = params.sort_dir;
    match params.sort_by {
        AdherenceSort::CreatedAt => order_by!(query, dir, adherence::created_at),
        AdherenceSort::MedicationName => order_by!(query, dir, adherence::medication_name),
        AdherenceSort::ScheduledTime => order_by!(query, dir, adherence::scheduled_time),
        AdherenceSort::Status => order_by!(query, dir, adherence::status),
    }
}
