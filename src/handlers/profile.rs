use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::profile::{AddressInput, ProfileInput};
use crate::store::ProfileStore;

type Profiles = web::Data<dyn ProfileStore>;

pub async fn show(user: AuthenticatedUser, store: Profiles) -> Result<HttpResponse, ApiError> {
    let store = store.into_inner();
    let profile = web::block(move || store.get(user.id)).await??;
    let profile = profile.ok_or_else(|| ApiError::not_found("Profile"))?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn upsert(
    user: AuthenticatedUser,
    store: Profiles,
    body: web::Json<ProfileInput>,
) -> Result<HttpResponse, ApiError> {
    let update = body.into_inner().validate().map_err(ApiError::invalid_input)?;
    let store = store.into_inner();
    let profile = web::block(move || store.upsert(user.id, update)).await??;
    tracing::debug!(user = %profile.user_id, "profile saved");
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn addresses(user: AuthenticatedUser, store: Profiles) -> Result<HttpResponse, ApiError> {
    let store = store.into_inner();
    let data = web::block(move || store.addresses(user.id)).await??;
    Ok(HttpResponse::Ok().json(json!({ "data": data })))
}

pub async fn upsert_address(
    user: AuthenticatedUser,
    store: Profiles,
    body: web::Json<AddressInput>,
) -> Result<HttpResponse, ApiError> {
    let update = body.into_inner().validate().map_err(ApiError::invalid_input)?;
    let store = store.into_inner();
    let address = web::block(move || store.upsert_address(user.id, update)).await??;
    Ok(HttpResponse::Ok().json(address))
}
