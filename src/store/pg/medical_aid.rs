use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use super::PgStore;
use crate::models::MedicalAid;
use crate::models::medical_aid::MedicalAidUpdate;
use crate::schema::medical_aids;
use crate::store::{MedicalAidStore, StoreResult};

impl MedicalAidStore for PgStore {
    fn get(&self, owner: Uuid) -> StoreResult<Option<MedicalAid>> {
        let mut conn = self.conn()?;
        let aid = medical_aids::table
            .filter(medical_aids::user_id.eq(owner))
            .filter(medical_aids::is_active.eq(true))
            .select(MedicalAid::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(aid)
    }

    fn upsert(&self, owner: Uuid, update: MedicalAidUpdate) -> StoreResult<MedicalAid> {
        let mut conn = self.conn()?;
        let aid = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let now = Utc::now();
            let existing = medical_aids::table
                .filter(medical_aids::user_id.eq(owner))
                .select(MedicalAid::as_select())
                .for_update()
                .first(conn)
                .optional()?;
            match existing {
                Some(mut aid) => {
                    aid.apply(update, now);
                    diesel::update(medical_aids::table.find(aid.medical_aid_id))
                        .set(&aid)
                        .returning(MedicalAid::as_returning())
                        .get_result(conn)
                }
                None => diesel::insert_into(medical_aids::table)
                    .values(&MedicalAid::create(Uuid::new_v4(), owner, update, now))
                    .returning(MedicalAid::as_returning())
                    .get_result(conn),
            }
        })?;
        Ok(aid)
    }
}
