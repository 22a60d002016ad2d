use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use super::PgStore;
use crate::models::Communication;
use crate::models::communication::{InboxQuery, ReadReceipt, STATUS_READ};
use crate::models::enums::CommType;
use crate::schema::communications;
use crate::store::{CommStore, StoreResult};

fn inbox_query(recipient: Uuid, query: &InboxQuery) -> communications::BoxedQuery<'static, Pg> {
    let mut rows = communications::table
        .filter(communications::user_to.eq(recipient))
        .into_boxed();
    if let Some(kind) = query.comm_type {
        rows = rows.filter(communications::comm_type.eq(kind));
    }
    rows
}

impl CommStore for PgStore {
    fn inbox(&self, recipient: Uuid, query: &InboxQuery) -> StoreResult<(Vec<Communication>, i64)> {
        let mut conn = self.conn()?;
        let total: i64 = inbox_query(recipient, query).count().get_result(&mut conn)?;
        let rows = inbox_query(recipient, query)
            .order((communications::created_at.desc(), communications::comm_id.asc()))
            .limit(query.paging.page_size)
            .offset(query.paging.offset())
            .select(Communication::as_select())
            .load(&mut conn)?;
        Ok((rows, total))
    }

    fn insert(&self, row: Communication) -> StoreResult<Communication> {
        let mut conn = self.conn()?;
        let row = diesel::insert_into(communications::table)
            .values(&row)
            .returning(Communication::as_returning())
            .get_result(&mut conn)?;
        Ok(row)
    }

    fn mark_read(
        &self,
        recipient: Uuid,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<ReadReceipt>> {
        let mut conn = self.conn()?;
        let receipt = diesel::update(
            communications::table
                .filter(communications::comm_id.eq(id))
                .filter(communications::user_to.eq(recipient)),
        )
        .set((communications::status.eq(STATUS_READ), communications::read_at.eq(Some(at))))
        .returning(ReadReceipt::as_returning())
        .get_result(&mut conn)
        .optional()?;
        Ok(receipt)
    }

    fn unread_count(&self, recipient: Uuid) -> StoreResult<i64> {
        let mut conn = self.conn()?;
        let count = communications::table
            .filter(communications::user_to.eq(recipient))
            .filter(communications::read_at.is_null())
            .count()
            .get_result(&mut conn)?;
        Ok(count)
    }

    fn thread(&self, user: Uuid, other: Uuid, limit: i64) -> StoreResult<Vec<Communication>> {
        let mut conn = self.conn()?;
        let rows = communications::table
            .filter(communications::comm_type.eq(CommType::Message))
            .filter(
                communications::user_from
                    .eq(user)
                    .and(communications::user_to.eq(other))
                    .or(communications::user_from.eq(other).and(communications::user_to.eq(user))),
            )
            .order(communications::created_at.desc())
            .limit(limit)
            .select(Communication::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }
}
