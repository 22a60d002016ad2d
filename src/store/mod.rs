//! Storage traits and the two backends behind them.
//!
//! Every trait method is synchronous; handlers move calls onto the blocking
//! pool with `web::block`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::communication::{InboxQuery, ReadReceipt};
use crate::models::prescription::{AuditEntry, PrescriptionQuery, QueueEntry};
use crate::models::medical_aid::MedicalAidUpdate;
use crate::models::profile::{AddressUpdate, DirectoryEntry, ProfileUpdate};
use crate::models::{
    ActiveMedication, AdherenceRecord, Address, Allergy, Caregiver, Communication, Condition,
    Dependent, EmergencyContact, FamilyHistory, Immunization, ListParams, MedicalAid,
    MedicationHistory, Pharmacy, Prescription, Profile, Resource, SleepEntry, Surgery, VitalSign,
};

pub mod memory;
pub mod pg;

pub use memory::MemoryStores;
pub use pg::{DbPool, PgStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection pool: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("database: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("in-memory store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Owner-scoped CRUD over one record resource. Soft-deleted rows are invisible.
pub trait ResourceStore<R: Resource>: Send + Sync {
    /// One page of matching rows plus the total match count.
    fn list(&self, owner: Uuid, params: &ListParams<R>) -> StoreResult<(Vec<R>, i64)>;
    fn get(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<R>>;
    fn insert(&self, row: R) -> StoreResult<R>;
    fn update(&self, owner: Uuid, id: Uuid, patch: R::Patch) -> StoreResult<Option<R>>;
    fn deactivate(&self, owner: Uuid, id: Uuid) -> StoreResult<bool>;
}

pub trait PrescriptionStore: Send + Sync {
    fn list(&self, owner: Uuid, query: &PrescriptionQuery) -> StoreResult<(Vec<Prescription>, i64)>;
    fn get(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Prescription>>;
    fn insert(&self, row: Prescription) -> StoreResult<Prescription>;
    /// Sets the status of an owned, active prescription; `None` when nothing matched.
    fn set_status(&self, owner: Uuid, id: Uuid, status: &str) -> StoreResult<Option<Prescription>>;
    /// Writes the queue rows and marks the prescription allocated, atomically.
    fn record_allocation(
        &self,
        owner: Uuid,
        id: Uuid,
        entries: Vec<QueueEntry>,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;
    fn log_ai_interaction(&self, entry: AuditEntry) -> StoreResult<()>;
}

pub trait CommStore: Send + Sync {
    fn inbox(&self, recipient: Uuid, query: &InboxQuery) -> StoreResult<(Vec<Communication>, i64)>;
    fn insert(&self, row: Communication) -> StoreResult<Communication>;
    fn mark_read(
        &self,
        recipient: Uuid,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<ReadReceipt>>;
    fn unread_count(&self, recipient: Uuid) -> StoreResult<i64>;
    /// Direct messages between two users, newest first.
    fn thread(&self, user: Uuid, other: Uuid, limit: i64) -> StoreResult<Vec<Communication>>;
}

pub trait ProfileStore: Send + Sync {
    fn get(&self, owner: Uuid) -> StoreResult<Option<Profile>>;
    fn upsert(&self, owner: Uuid, update: ProfileUpdate) -> StoreResult<Profile>;
    fn addresses(&self, owner: Uuid) -> StoreResult<Vec<Address>>;
    fn upsert_address(&self, owner: Uuid, update: AddressUpdate) -> StoreResult<Address>;
    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<Uuid>>;
    fn search_directory(&self, term: &str, limit: usize) -> StoreResult<Vec<DirectoryEntry>>;
}

/// The single medical aid membership each user may hold.
pub trait MedicalAidStore: Send + Sync {
    fn get(&self, owner: Uuid) -> StoreResult<Option<MedicalAid>>;
    fn upsert(&self, owner: Uuid, update: MedicalAidUpdate) -> StoreResult<MedicalAid>;
}

pub trait PharmacyDirectory: Send + Sync {
    /// Active pharmacies that have coordinates.
    fn active_pharmacies(&self) -> StoreResult<Vec<Pharmacy>>;
}

/// Every store the HTTP layer needs, behind trait objects.
#[derive(Clone)]
pub struct Stores {
    pub allergies: Arc<dyn ResourceStore<Allergy>>,
    pub conditions: Arc<dyn ResourceStore<Condition>>,
    pub surgeries: Arc<dyn ResourceStore<Surgery>>,
    pub immunizations: Arc<dyn ResourceStore<Immunization>>,
    pub family_history: Arc<dyn ResourceStore<FamilyHistory>>,
    pub caregivers: Arc<dyn ResourceStore<Caregiver>>,
    pub emergency_contacts: Arc<dyn ResourceStore<EmergencyContact>>,
    pub dependents: Arc<dyn ResourceStore<Dependent>>,
    pub vital_signs: Arc<dyn ResourceStore<VitalSign>>,
    pub sleep: Arc<dyn ResourceStore<SleepEntry>>,
    pub active_medications: Arc<dyn ResourceStore<ActiveMedication>>,
    pub medication_history: Arc<dyn ResourceStore<MedicationHistory>>,
    pub medication_adherence: Arc<dyn ResourceStore<AdherenceRecord>>,
    pub prescriptions: Arc<dyn PrescriptionStore>,
    pub communications: Arc<dyn CommStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub medical_aid: Arc<dyn MedicalAidStore>,
    pub pharmacies: Arc<dyn PharmacyDirectory>,
}

impl Stores {
    pub fn postgres(pool: DbPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Stores {
            allergies: store.clone(),
            conditions: store.clone(),
            surgeries: store.clone(),
            immunizations: store.clone(),
            family_history: store.clone(),
            caregivers: store.clone(),
            emergency_contacts: store.clone(),
            dependents: store.clone(),
            vital_signs: store.clone(),
            sleep: store.clone(),
            active_medications: store.clone(),
            medication_history: store.clone(),
            medication_adherence: store.clone(),
            prescriptions: store.clone(),
            communications: store.clone(),
            profiles: store.clone(),
            medical_aid: store.clone(),
            pharmacies: store,
        }
    }

    pub fn memory() -> Self {
        MemoryStores::default().into_stores()
    }
}
