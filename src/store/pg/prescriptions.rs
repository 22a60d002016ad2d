use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use super::PgStore;
use crate::models::prescription::{AuditEntry, PrescriptionQuery, QueueEntry, STATUS_ALLOCATED};
use crate::models::{Pharmacy, Prescription};
use crate::schema::{ai_audit_log, pharmacy_profiles, prescription_pharmacy_queue, prescriptions};
use crate::store::{PharmacyDirectory, PrescriptionStore, StoreResult};

fn owned(owner: Uuid, query: &PrescriptionQuery) -> prescriptions::BoxedQuery<'static, Pg> {
    let mut rows = prescriptions::table
        .filter(prescriptions::user_id.eq(owner))
        .filter(prescriptions::is_active.eq(true))
        .into_boxed();
    if let Some(status) = query.status.clone() {
        rows = rows.filter(prescriptions::status.eq(status));
    }
    rows
}

impl PrescriptionStore for PgStore {
    fn list(
        &self,
        owner: Uuid,
        query: &PrescriptionQuery,
    ) -> StoreResult<(Vec<Prescription>, i64)> {
        let mut conn = self.conn()?;
        let total: i64 = owned(owner, query).count().get_result(&mut conn)?;
        let rows = owned(owner, query)
            .order((prescriptions::created_at.desc(), prescriptions::prescription_id.asc()))
            .limit(query.paging.page_size)
            .offset(query.paging.offset())
            .select(Prescription::as_select())
            .load(&mut conn)?;
        Ok((rows, total))
    }

    fn get(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Prescription>> {
        let mut conn = self.conn()?;
        let row = prescriptions::table
            .filter(prescriptions::prescription_id.eq(id))
            .filter(prescriptions::user_id.eq(owner))
            .filter(prescriptions::is_active.eq(true))
            .select(Prescription::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row)
    }

    fn insert(&self, row: Prescription) -> StoreResult<Prescription> {
        let mut conn = self.conn()?;
        let row = diesel::insert_into(prescriptions::table)
            .values(&row)
            .returning(Prescription::as_returning())
            .get_result(&mut conn)?;
        Ok(row)
    }

    fn set_status(&self, owner: Uuid, id: Uuid, status: &str) -> StoreResult<Option<Prescription>> {
        let mut conn = self.conn()?;
        let row = diesel::update(
            prescriptions::table
                .filter(prescriptions::prescription_id.eq(id))
                .filter(prescriptions::user_id.eq(owner))
                .filter(prescriptions::is_active.eq(true)),
        )
        .set((prescriptions::status.eq(status), prescriptions::updated_at.eq(Utc::now())))
        .returning(Prescription::as_returning())
        .get_result(&mut conn)
        .optional()?;
        Ok(row)
    }

    fn record_allocation(
        &self,
        owner: Uuid,
        id: Uuid,
        entries: Vec<QueueEntry>,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut conn = self.conn()?;
        let allocated = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let changed = diesel::update(
                prescriptions::table
                    .filter(prescriptions::prescription_id.eq(id))
                    .filter(prescriptions::user_id.eq(owner))
                    .filter(prescriptions::is_active.eq(true)),
            )
            .set((
                prescriptions::status.eq(STATUS_ALLOCATED),
                prescriptions::allocated_at.eq(Some(at)),
                prescriptions::updated_at.eq(at),
            ))
            .execute(conn)?;
            if changed == 0 {
                return Ok(false);
            }
            diesel::insert_into(prescription_pharmacy_queue::table)
                .values(&entries)
                .execute(conn)?;
            Ok(true)
        })?;
        Ok(allocated)
    }

    fn log_ai_interaction(&self, entry: AuditEntry) -> StoreResult<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(ai_audit_log::table)
            .values(&entry)
            .execute(&mut conn)?;
        Ok(())
    }
}

impl PharmacyDirectory for PgStore {
    fn active_pharmacies(&self) -> StoreResult<Vec<Pharmacy>> {
        let mut conn = self.conn()?;
        let rows = pharmacy_profiles::table
            .filter(pharmacy_profiles::is_active.eq(true))
            .filter(pharmacy_profiles::latitude.is_not_null())
            .filter(pharmacy_profiles::longitude.is_not_null())
            .select(Pharmacy::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }
}
