//! Process-local storage used by `PORTAL_STORAGE=memory` and the test suite.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::communication::{InboxQuery, ReadReceipt, STATUS_READ};
use crate::models::prescription::{AuditEntry, PrescriptionQuery, QueueEntry, STATUS_ALLOCATED};
use crate::models::medical_aid::MedicalAidUpdate;
use crate::models::profile::{AddressUpdate, DirectoryEntry, ProfileUpdate};
use crate::models::{
    ActiveMedication, AdherenceRecord, Address, Allergy, Caregiver, Communication, Condition,
    Dependent, EmergencyContact, FamilyHistory, Immunization, ListParams, MedicalAid,
    MedicationHistory, Pharmacy, Prescription, Profile, Resource, SleepEntry, Surgery, VitalSign,
};
use crate::store::{
    CommStore, MedicalAidStore, PharmacyDirectory, PrescriptionStore, ProfileStore, ResourceStore,
    StoreError, StoreResult, Stores,
};

fn guard<T>(lock: &Mutex<T>) -> StoreResult<MutexGuard<'_, T>> {
    lock.lock().map_err(|_| StoreError::Poisoned)
}

pub struct MemoryStore<R> {
    rows: Mutex<Vec<R>>,
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        MemoryStore {
            rows: Mutex::new(Vec::new()),
        }
    }
}

impl<R: Resource> MemoryStore<R> {
    /// Every stored row, including soft-deleted ones.
    pub fn snapshot(&self) -> StoreResult<Vec<R>> {
        Ok(guard(&self.rows)?.clone())
    }
}

impl<R: Resource> ResourceStore<R> for MemoryStore<R> {
    fn list(&self, owner: Uuid, params: &ListParams<R>) -> StoreResult<(Vec<R>, i64)> {
        let rows = guard(&self.rows)?;
        let needle = params.search_needle();
        let mut matched: Vec<R> = rows
            .iter()
            .filter(|row| row.owner() == owner && row.is_active())
            .filter(|row| row.matches(&params.filter, needle.as_deref()))
            .cloned()
            .collect();
        matched.sort_by(|a, b| params.sort_dir.apply(a.compare(b, params.sort_by)).then(a.id().cmp(&b.id())));
        let total = matched.len() as i64;
        Ok((params.paging.window(matched), total))
    }

    fn get(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<R>> {
        let rows = guard(&self.rows)?;
        Ok(rows
            .iter()
            .find(|row| row.id() == id && row.owner() == owner && row.is_active())
            .cloned())
    }

    fn insert(&self, row: R) -> StoreResult<R> {
        guard(&self.rows)?.push(row.clone());
        Ok(row)
    }

    fn update(&self, owner: Uuid, id: Uuid, patch: R::Patch) -> StoreResult<Option<R>> {
        let mut rows = guard(&self.rows)?;
        let Some(row) = rows
            .iter_mut()
            .find(|row| row.id() == id && row.owner() == owner && row.is_active())
        else {
            return Ok(None);
        };
        row.apply(patch, Utc::now());
        Ok(Some(row.clone()))
    }

    fn deactivate(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut rows = guard(&self.rows)?;
        match rows
            .iter_mut()
            .find(|row| row.id() == id && row.owner() == owner && row.is_active())
        {
            Some(row) => {
                row.deactivate(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
struct PrescriptionState {
    prescriptions: Vec<Prescription>,
    queue: Vec<QueueEntry>,
    audit: Vec<AuditEntry>,
}

#[derive(Default)]
pub struct MemoryPrescriptions {
    state: Mutex<PrescriptionState>,
}

impl MemoryPrescriptions {
    pub fn queue(&self) -> StoreResult<Vec<QueueEntry>> {
        Ok(guard(&self.state)?.queue.clone())
    }

    pub fn audit_log(&self) -> StoreResult<Vec<AuditEntry>> {
        Ok(guard(&self.state)?.audit.clone())
    }
}

fn owned_prescription(
    rows: &mut [Prescription],
    owner: Uuid,
    id: Uuid,
) -> Option<&mut Prescription> {
    rows.iter_mut()
        .find(|row| row.prescription_id == id && row.user_id == owner && row.is_active)
}

impl PrescriptionStore for MemoryPrescriptions {
    fn list(
        &self,
        owner: Uuid,
        query: &PrescriptionQuery,
    ) -> StoreResult<(Vec<Prescription>, i64)> {
        let state = guard(&self.state)?;
        let mut matched: Vec<Prescription> = state
            .prescriptions
            .iter()
            .filter(|row| row.user_id == owner && row.is_active)
            .filter(|row| query.status.as_deref().is_none_or(|status| row.status == status))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matched.len() as i64;
        Ok((query.paging.window(matched), total))
    }

    fn get(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Prescription>> {
        let state = guard(&self.state)?;
        Ok(state
            .prescriptions
            .iter()
            .find(|row| row.prescription_id == id && row.user_id == owner && row.is_active)
            .cloned())
    }

    fn insert(&self, row: Prescription) -> StoreResult<Prescription> {
        guard(&self.state)?.prescriptions.push(row.clone());
        Ok(row)
    }

    fn set_status(&self, owner: Uuid, id: Uuid, status: &str) -> StoreResult<Option<Prescription>> {
        let mut state = guard(&self.state)?;
        Ok(owned_prescription(&mut state.prescriptions, owner, id).map(|row| {
            row.status = status.to_owned();
            row.updated_at = Utc::now();
            row.clone()
        }))
    }

    fn record_allocation(
        &self,
        owner: Uuid,
        id: Uuid,
        entries: Vec<QueueEntry>,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = guard(&self.state)?;
        let Some(row) = owned_prescription(&mut state.prescriptions, owner, id) else {
            return Ok(false);
        };
        row.status = STATUS_ALLOCATED.to_owned();
        row.allocated_at = Some(at);
        row.updated_at = at;
        state.queue.extend(entries);
        Ok(true)
    }

    fn log_ai_interaction(&self, entry: AuditEntry) -> StoreResult<()> {
        guard(&self.state)?.audit.push(entry);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryComms {
    rows: Mutex<Vec<Communication>>,
}

impl CommStore for MemoryComms {
    fn inbox(&self, recipient: Uuid, query: &InboxQuery) -> StoreResult<(Vec<Communication>, i64)> {
        let rows = guard(&self.rows)?;
        let mut matched: Vec<Communication> = rows
            .iter()
            .filter(|row| row.user_to == recipient)
            .filter(|row| query.comm_type.is_none_or(|kind| row.comm_type == kind))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matched.len() as i64;
        Ok((query.paging.window(matched), total))
    }

    fn insert(&self, row: Communication) -> StoreResult<Communication> {
        guard(&self.rows)?.push(row.clone());
        Ok(row)
    }

    fn mark_read(
        &self,
        recipient: Uuid,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<ReadReceipt>> {
        let mut rows = guard(&self.rows)?;
        Ok(rows
            .iter_mut()
            .find(|row| row.comm_id == id && row.user_to == recipient)
            .map(|row| {
                row.status = STATUS_READ.to_owned();
                row.read_at = Some(at);
                ReadReceipt {
                    comm_id: row.comm_id,
                    status: row.status.clone(),
                    read_at: row.read_at,
                }
            }))
    }

    fn unread_count(&self, recipient: Uuid) -> StoreResult<i64> {
        let rows = guard(&self.rows)?;
        Ok(rows
            .iter()
            .filter(|row| row.user_to == recipient && row.read_at.is_none())
            .count() as i64)
    }

    fn thread(&self, user: Uuid, other: Uuid, limit: i64) -> StoreResult<Vec<Communication>> {
        let rows = guard(&self.rows)?;
        let mut thread: Vec<Communication> = rows.iter().filter(|row| row.between(user, other)).cloned().collect();
        thread.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        thread.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(thread)
    }
}

#[derive(Default)]
struct ProfileState {
    profiles: Vec<Profile>,
    addresses: Vec<Address>,
}

#[derive(Default)]
pub struct MemoryProfiles {
    state: Mutex<ProfileState>,
}

impl ProfileStore for MemoryProfiles {
    fn get(&self, owner: Uuid) -> StoreResult<Option<Profile>> {
        let state = guard(&self.state)?;
        Ok(state
            .profiles
            .iter()
            .find(|profile| profile.user_id == owner && profile.is_active)
            .cloned())
    }

    fn upsert(&self, owner: Uuid, update: ProfileUpdate) -> StoreResult<Profile> {
        let mut state = guard(&self.state)?;
        let now = Utc::now();
        if let Some(profile) = state.profiles.iter_mut().find(|profile| profile.user_id == owner) {
            profile.apply(update, now);
            return Ok(profile.clone());
        }
        let profile = Profile::create(Uuid::new_v4(), owner, update, now);
        state.profiles.push(profile.clone());
        Ok(profile)
    }

    fn addresses(&self, owner: Uuid) -> StoreResult<Vec<Address>> {
        let state = guard(&self.state)?;
        let mut rows: Vec<Address> = state
            .addresses
            .iter()
            .filter(|address| address.user_id == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.address_type.as_str().cmp(b.address_type.as_str()));
        Ok(rows)
    }

    fn upsert_address(&self, owner: Uuid, update: AddressUpdate) -> StoreResult<Address> {
        let mut state = guard(&self.state)?;
        let now = Utc::now();
        if let Some(address) = state
            .addresses
            .iter_mut()
            .find(|address| address.user_id == owner && address.address_type == update.address_type)
        {
            address.apply(update, now);
            return Ok(address.clone());
        }
        let address = Address::create(Uuid::new_v4(), owner, update, now);
        state.addresses.push(address.clone());
        Ok(address)
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<Uuid>> {
        let state = guard(&self.state)?;
        let wanted = email.trim().to_lowercase();
        Ok(state
            .profiles
            .iter()
            .filter(|profile| profile.is_active)
            .find(|profile| profile.email.as_deref().is_some_and(|known| known.to_lowercase() == wanted))
            .map(|profile| profile.user_id))
    }

    fn search_directory(&self, term: &str, limit: usize) -> StoreResult<Vec<DirectoryEntry>> {
        let state = guard(&self.state)?;
        let needle = term.to_lowercase();
        let mut matched: Vec<&Profile> = state
            .profiles
            .iter()
            .filter(|profile| profile.is_active && profile.matches_directory(&needle))
            .collect();
        matched.sort_by(|a, b| (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name)));
        Ok(matched.into_iter().take(limit).map(Profile::directory_entry).collect())
    }
}

#[derive(Default)]
pub struct MemoryMedicalAid {
    rows: Mutex<Vec<MedicalAid>>,
}

impl MedicalAidStore for MemoryMedicalAid {
    fn get(&self, owner: Uuid) -> StoreResult<Option<MedicalAid>> {
        let rows = guard(&self.rows)?;
        Ok(rows.iter().find(|aid| aid.user_id == owner && aid.is_active).cloned())
    }

    fn upsert(&self, owner: Uuid, update: MedicalAidUpdate) -> StoreResult<MedicalAid> {
        let mut rows = guard(&self.rows)?;
        let now = Utc::now();
        if let Some(aid) = rows.iter_mut().find(|aid| aid.user_id == owner) {
            aid.apply(update, now);
            return Ok(aid.clone());
        }
        let aid = MedicalAid::create(Uuid::new_v4(), owner, update, now);
        rows.push(aid.clone());
        Ok(aid)
    }
}

#[derive(Default)]
pub struct MemoryPharmacies {
    rows: Mutex<Vec<Pharmacy>>,
}

impl MemoryPharmacies {
    pub fn add(&self, pharmacy: Pharmacy) -> StoreResult<()> {
        guard(&self.rows)?.push(pharmacy);
        Ok(())
    }
}

impl PharmacyDirectory for MemoryPharmacies {
    fn active_pharmacies(&self) -> StoreResult<Vec<Pharmacy>> {
        let rows = guard(&self.rows)?;
        Ok(rows
            .iter()
            .filter(|pharmacy| pharmacy.is_active && pharmacy.location().is_some())
            .cloned()
            .collect())
    }
}

/// Concrete handles to every in-memory store, so tests can seed and inspect
/// state behind the trait objects handed to the app.
#[derive(Default, Clone)]
pub struct MemoryStores {
    pub allergies: Arc<MemoryStore<Allergy>>,
    pub conditions: Arc<MemoryStore<Condition>>,
    pub surgeries: Arc<MemoryStore<Surgery>>,
    pub immunizations: Arc<MemoryStore<Immunization>>,
    pub family_history: Arc<MemoryStore<FamilyHistory>>,
    pub caregivers: Arc<MemoryStore<Caregiver>>,
    pub emergency_contacts: Arc<MemoryStore<EmergencyContact>>,
    pub dependents: Arc<MemoryStore<Dependent>>,
    pub vital_signs: Arc<MemoryStore<VitalSign>>,
    pub sleep: Arc<MemoryStore<SleepEntry>>,
    pub active_medications: Arc<MemoryStore<ActiveMedication>>,
    pub medication_history: Arc<MemoryStore<MedicationHistory>>,
    pub medication_adherence: Arc<MemoryStore<AdherenceRecord>>,
    pub prescriptions: Arc<MemoryPrescriptions>,
    pub communications: Arc<MemoryComms>,
    pub profiles: Arc<MemoryProfiles>,
    pub medical_aid: Arc<MemoryMedicalAid>,
    pub pharmacies: Arc<MemoryPharmacies>,
}

impl MemoryStores {
    pub fn into_stores(self) -> Stores {
        Stores {
            allergies: self.allergies,
            conditions: self.conditions,
            surgeries: self.surgeries,
            immunizations: self.immunizations,
            family_history: self.family_history,
            caregivers: self.caregivers,
            emergency_contacts: self.emergency_contacts,
            dependents: self.dependents,
            vital_signs: self.vital_signs,
            sleep: self.sleep,
            active_medications: self.active_medications,
            medication_history: self.medication_history,
            medication_adherence: self.medication_adherence,
            prescriptions: self.prescriptions,
            communications: self.communications,
            profiles: self.profiles,
            medical_aid: self.medical_aid,
            pharmacies: self.pharmacies,
        }
    }
}
