use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use super::PgStore;
use crate::models::like_pattern;
use crate::models::profile::{AddressUpdate, DirectoryEntry, ProfileUpdate};
use crate::models::{Address, Profile};
use crate::schema::{addresses, profiles};
use crate::store::{ProfileStore, StoreResult};

impl ProfileStore for PgStore {
    fn get(&self, owner: Uuid) -> StoreResult<Option<Profile>> {
        let mut conn = self.conn()?;
        let profile = profiles::table
            .filter(profiles::user_id.eq(owner))
            .filter(profiles::is_active.eq(true))
            .select(Profile::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(profile)
    }

    fn upsert(&self, owner: Uuid, update: ProfileUpdate) -> StoreResult<Profile> {
        let mut conn = self.conn()?;
        let profile = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let now = Utc::now();
            let existing = profiles::table
                .filter(profiles::user_id.eq(owner))
                .select(Profile::as_select())
                .for_update()
                .first(conn)
                .optional()?;
            match existing {
                Some(mut profile) => {
                    profile.apply(update, now);
                    diesel::update(profiles::table.find(profile.profile_id))
                        .set(&profile)
                        .returning(Profile::as_returning())
                        .get_result(conn)
                }
                None => diesel::insert_into(profiles::table)
                    .values(&Profile::create(Uuid::new_v4(), owner, update, now))
                    .returning(Profile::as_returning())
                    .get_result(conn),
            }
        })?;
        Ok(profile)
    }

    fn addresses(&self, owner: Uuid) -> StoreResult<Vec<Address>> {
        let mut conn = self.conn()?;
        let rows = addresses::table
            .filter(addresses::user_id.eq(owner))
            .order(addresses::address_type.asc())
            .select(Address::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    fn upsert_address(&self, owner: Uuid, update: AddressUpdate) -> StoreResult<Address> {
        let mut conn = self.conn()?;
        let address = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let now = Utc::now();
            let existing = addresses::table
                .filter(addresses::user_id.eq(owner))
                .filter(addresses::address_type.eq(update.address_type))
                .select(Address::as_select())
                .for_update()
                .first(conn)
                .optional()?;
            match existing {
                Some(mut address) => {
                    address.apply(update, now);
                    diesel::update(addresses::table.find(address.address_id))
                        .set(&address)
                        .returning(Address::as_returning())
                        .get_result(conn)
                }
                None => diesel::insert_into(addresses::table)
                    .values(&Address::create(Uuid::new_v4(), owner, update, now))
                    .returning(Address::as_returning())
                    .get_result(conn),
            }
        })?;
        Ok(address)
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<Uuid>> {
        let mut conn = self.conn()?;
        let exact = email.trim().replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        let user = profiles::table
            .filter(profiles::email.ilike(exact))
            .filter(profiles::is_active.eq(true))
            .select(profiles::user_id)
            .first(&mut conn)
            .optional()?;
        Ok(user)
    }

    fn search_directory(&self, term: &str, limit: usize) -> StoreResult<Vec<DirectoryEntry>> {
        let mut conn = self.conn()?;
        let pattern = like_pattern(term);
        let rows = profiles::table
            .filter(profiles::is_active.eq(true))
            .filter(
                profiles::email
                    .ilike(pattern.clone())
                    .or(profiles::first_name.nullable().ilike(pattern.clone()))
                    .or(profiles::last_name.nullable().ilike(pattern.clone()))
                    .or(profiles::nick_name.ilike(pattern)),
            )
            .order((profiles::last_name.asc(), profiles::first_name.asc()))
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .select(Profile::as_select())
            .load(&mut conn)?;
        Ok(rows.iter().map(Profile::directory_entry).collect())
    }
}
