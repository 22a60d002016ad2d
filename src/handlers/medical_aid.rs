use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::medical_aid::MedicalAidInput;
use crate::store::MedicalAidStore;

type MedicalAids = web::Data<dyn MedicalAidStore>;

/// A user without a membership gets `{"data": null}` rather than a 404.
pub async fn show(user: AuthenticatedUser, store: MedicalAids) -> Result<HttpResponse, ApiError> {
    let store = store.into_inner();
    let data = web::block(move || store.get(user.id)).await??;
    Ok(HttpResponse::Ok().json(json!({ "data": data })))
}

pub async fn upsert(
    user: AuthenticatedUser,
    store: MedicalAids,
    body: web::Json<MedicalAidInput>,
) -> Result<HttpResponse, ApiError> {
    let update = body.into_inner().validate().map_err(ApiError::invalid_input)?;
    let store = store.into_inner();
    let aid = web::block(move || store.upsert(user.id, update)).await??;
    tracing::debug!(user = %aid.user_id, "medical aid saved");
    Ok(HttpResponse::Ok().json(aid))
}
