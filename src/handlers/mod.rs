//! HTTP handlers. Record resources share the generic list/detail handlers in
//! this module; the rest live in per-area submodules.

use std::sync::Arc;

use actix_web::{HttpResponse, Scope, web};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::{ListParams, Page, QueryMap, Resource};
use crate::store::ResourceStore;
use crate::validation::FieldErrors;

pub mod communications;
pub mod medical_aid;
pub mod prescriptions;
pub mod profile;

type Store<R> = web::Data<dyn ResourceStore<R>>;

/// Path ids on record resources: anything that is not a UUID cannot exist.
fn record_id<R: Resource>(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(R::LABEL))
}

/// Path ids on action endpoints, where a malformed id is a client error.
pub(crate) fn action_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        let mut details = FieldErrors::default();
        details.push("id", "Must be a valid UUID");
        ApiError::Validation {
            message: "Invalid id",
            details,
        }
    })
}

pub async fn list<R: Resource>(
    user: AuthenticatedUser,
    store: Store<R>,
    query: web::Query<QueryMap>,
) -> Result<HttpResponse, ApiError> {
    let params = ListParams::<R>::parse(&query).map_err(ApiError::invalid_query)?;
    let paging = params.paging;
    let store = store.into_inner();
    let (rows, total) = web::block(move || store.list(user.id, &params)).await??;
    Ok(HttpResponse::Ok().json(Page::new(rows, total, paging)))
}

pub async fn show<R: Resource>(
    user: AuthenticatedUser,
    store: Store<R>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = record_id::<R>(&path)?;
    let store = store.into_inner();
    let row = web::block(move || store.get(user.id, id)).await??;
    let row = row.ok_or_else(|| ApiError::not_found(R::LABEL))?;
    Ok(HttpResponse::Ok().json(row))
}

pub async fn create<R: Resource>(
    user: AuthenticatedUser,
    store: Store<R>,
    body: web::Json<R::Input>,
) -> Result<HttpResponse, ApiError> {
    let draft = R::validate_create(body.into_inner()).map_err(ApiError::invalid_input)?;
    let row = R::from_draft(Uuid::new_v4(), user.id, draft, Utc::now());
    let store = store.into_inner();
    let row = web::block(move || store.insert(row)).await??;
    tracing::debug!(resource = R::LABEL, id = %row.id(), "record created");
    Ok(HttpResponse::Created().json(row))
}

pub async fn update<R: Resource>(
    user: AuthenticatedUser,
    store: Store<R>,
    path: web::Path<String>,
    body: web::Json<R::Input>,
) -> Result<HttpResponse, ApiError> {
    let id = record_id::<R>(&path)?;
    let patch = R::validate_update(body.into_inner()).map_err(ApiError::invalid_input)?;
    let store = store.into_inner();
    let row = web::block(move || store.update(user.id, id, patch)).await??;
    let row = row.ok_or_else(|| ApiError::not_found(R::LABEL))?;
    Ok(HttpResponse::Ok().json(row))
}

pub async fn remove<R: Resource>(
    user: AuthenticatedUser,
    store: Store<R>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = record_id::<R>(&path)?;
    let store = store.into_inner();
    if !web::block(move || store.deactivate(user.id, id)).await?? {
        return Err(ApiError::not_found(R::LABEL));
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// List/detail routes for one record resource, bound to its store.
pub fn records<R: Resource>(base: &str, store: Arc<dyn ResourceStore<R>>) -> Scope {
    web::scope(base)
        .app_data(web::Data::from(store))
        .route("", web::get().to(list::<R>))
        .route("", web::post().to(create::<R>))
        .route("/{id}", web::get().to(show::<R>))
        .route("/{id}", web::put().to(update::<R>))
        .route("/{id}", web::delete().to(remove::<R>))
}
