use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::handlers::action_id;
use crate::models::prescription::{
    PrescriptionQuery, QUEUE_PENDING, QueueEntry, STATUS_SUBMITTED, SavePrescriptionInput,
};
use crate::models::{Page, Prescription, QueryMap};
use crate::services::geo::{self, ALLOCATION_LIMIT};
use crate::services::scan::AnalyzeInput;
use crate::services::{AllocationNotifier, ScanService, dispatch_allocation};
use crate::store::{PharmacyDirectory, PrescriptionStore, ProfileStore};

type Prescriptions = web::Data<dyn PrescriptionStore>;

pub async fn analyze(
    user: AuthenticatedUser,
    scanner: web::Data<ScanService>,
    body: web::Json<AnalyzeInput>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner().validate().map_err(ApiError::invalid_input)?;
    let outcome = scanner.analyze(user.id, request).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

pub async fn save(
    user: AuthenticatedUser,
    store: Prescriptions,
    body: web::Json<SavePrescriptionInput>,
) -> Result<HttpResponse, ApiError> {
    let saved = body.into_inner().validate().map_err(ApiError::invalid_input)?;
    let row = Prescription::saved(Uuid::new_v4(), user.id, saved, Utc::now());
    let store = store.into_inner();
    let row = web::block(move || store.insert(row)).await??;
    tracing::info!(user = %user.id, prescription_id = %row.prescription_id, "prescription saved");
    Ok(HttpResponse::Created().json(row))
}

pub async fn list(
    user: AuthenticatedUser,
    store: Prescriptions,
    query: web::Query<QueryMap>,
) -> Result<HttpResponse, ApiError> {
    let query = PrescriptionQuery::parse(&query).map_err(ApiError::invalid_query)?;
    let paging = query.paging;
    let store = store.into_inner();
    let (rows, total) = web::block(move || store.list(user.id, &query)).await??;
    Ok(HttpResponse::Ok().json(Page::new(rows, total, paging)))
}

pub async fn show(
    user: AuthenticatedUser,
    store: Prescriptions,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = Uuid::parse_str(&path).map_err(|_| ApiError::not_found("Prescription"))?;
    let store = store.into_inner();
    let row = web::block(move || store.get(user.id, id)).await??;
    let row = row.ok_or_else(|| ApiError::not_found("Prescription"))?;
    Ok(HttpResponse::Ok().json(row))
}

/// Marks the prescription submitted, then asks for allocation in the
/// background. The response never waits on, or reflects, the allocation.
pub async fn submit(
    user: AuthenticatedUser,
    store: Prescriptions,
    notifier: web::Data<dyn AllocationNotifier>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = action_id(&path)?;
    let owner = user.id;
    let store = store.into_inner();
    let row = web::block(move || store.set_status(owner, id, STATUS_SUBMITTED)).await??;
    let Some(row) = row else {
        tracing::warn!(user = %owner, prescription_id = %id, "submit matched no prescription");
        return Err(ApiError::Failed {
            message: "Update failed",
        });
    };

    dispatch_allocation(notifier.into_inner(), id, user.credentials);
    tracing::info!(user = %owner, prescription_id = %id, "prescription submitted");
    Ok(HttpResponse::Ok().json(row))
}

#[derive(Debug, Serialize)]
struct AllocatedPharmacy {
    name: String,
    distance_km: String,
}

pub async fn allocate(
    user: AuthenticatedUser,
    prescriptions: Prescriptions,
    profiles: web::Data<dyn ProfileStore>,
    pharmacies: web::Data<dyn PharmacyDirectory>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = action_id(&path)?;
    let owner = user.id;

    let store = prescriptions.clone().into_inner();
    if web::block(move || store.get(owner, id)).await??.is_none() {
        return Err(ApiError::not_found("Prescription"));
    }

    let profiles = profiles.into_inner();
    let profile = web::block(move || profiles.get(owner)).await??;
    let Some((origin, max_distance_km)) = profile
        .as_ref()
        .and_then(|profile| Some((profile.location()?, profile.max_pharmacy_distance_km)))
    else {
        return Err(ApiError::BadRequest(
            "Patient location not set. Please update your profile location first.".to_owned(),
        ));
    };

    let pharmacies = pharmacies.into_inner();
    let candidates = web::block(move || pharmacies.active_pharmacies()).await??;
    let ranked = geo::nearest(origin, candidates, max_distance_km, ALLOCATION_LIMIT);
    if ranked.is_empty() {
        return Err(ApiError::NotFound("No pharmacies available for allocation".to_owned()));
    }

    let now = Utc::now();
    let entries: Vec<QueueEntry> = ranked
        .iter()
        .map(|candidate| QueueEntry {
            queue_id: Uuid::new_v4(),
            prescription_id: id,
            pharmacy_id: candidate.pharmacy.pharmacy_id,
            patient_profile_id: owner,
            status: QUEUE_PENDING.to_owned(),
            distance_km: candidate.distance_km,
            created_at: now,
        })
        .collect();

    let store = prescriptions.into_inner();
    if !web::block(move || store.record_allocation(owner, id, entries, now)).await?? {
        return Err(ApiError::not_found("Prescription"));
    }

    let allocated: Vec<AllocatedPharmacy> = ranked
        .into_iter()
        .map(|candidate| AllocatedPharmacy {
            name: candidate.pharmacy.name,
            distance_km: format!("{:.1}", candidate.distance_km),
        })
        .collect();
    tracing::info!(user = %owner, prescription_id = %id, pharmacies = allocated.len(), "prescription allocated");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully allocated to pharmacies",
        "pharmacies_count": allocated.len(),
        "pharmacies": allocated,
    })))
}
