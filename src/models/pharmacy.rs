use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::pharmacy_profiles;

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = pharmacy_profiles, primary_key(pharmacy_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Pharmacy {
    pub pharmacy_id: Uuid,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
}

impl Pharmacy {
    pub fn location(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}
