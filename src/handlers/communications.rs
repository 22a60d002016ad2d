use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::handlers::action_id;
use crate::models::communication::{InboxQuery, Recipient, SendInput, THREAD_LIMIT};
use crate::models::profile::{DIRECTORY_LIMIT, MIN_DIRECTORY_QUERY};
use crate::models::{Communication, QueryMap};
use crate::store::{CommStore, ProfileStore};

type Comms = web::Data<dyn CommStore>;

pub async fn inbox(
    user: AuthenticatedUser,
    store: Comms,
    query: web::Query<QueryMap>,
) -> Result<HttpResponse, ApiError> {
    let query = InboxQuery::parse(&query).map_err(ApiError::invalid_query)?;
    let store = store.into_inner();
    let (items, total) = web::block(move || store.inbox(user.id, &query)).await??;
    Ok(HttpResponse::Ok().json(json!({ "items": items, "total": total })))
}

pub async fn send(
    user: AuthenticatedUser,
    store: Comms,
    profiles: web::Data<dyn ProfileStore>,
    body: web::Json<SendInput>,
) -> Result<HttpResponse, ApiError> {
    let message = body.into_inner().validate().map_err(ApiError::invalid_input)?;
    let recipient = match &message.to {
        Recipient::Id(id) => *id,
        Recipient::Email(email) => {
            let email = email.clone();
            let profiles = profiles.into_inner();
            web::block(move || profiles.find_user_by_email(&email))
                .await??
                .ok_or_else(|| ApiError::NotFound("Recipient not found".to_owned()))?
        }
    };

    let row = Communication::outgoing(Uuid::new_v4(), user.id, recipient, message, Utc::now());
    let store = store.into_inner();
    let row = web::block(move || store.insert(row)).await??;
    tracing::debug!(from = %user.id, to = %recipient, comm_id = %row.comm_id, "communication sent");
    Ok(HttpResponse::Created().json(json!({
        "ok": true,
        "id": row.comm_id,
        "created_at": row.created_at,
    })))
}

pub async fn mark_read(
    user: AuthenticatedUser,
    store: Comms,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = Uuid::parse_str(&path).map_err(|_| ApiError::not_found("Communication"))?;
    let store = store.into_inner();
    let receipt = web::block(move || store.mark_read(user.id, id, Utc::now())).await??;
    let item = receipt.ok_or_else(|| ApiError::not_found("Communication"))?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "item": item })))
}

/// Badge counter: never fails, anonymous callers see zero.
pub async fn unread_count(user: Option<AuthenticatedUser>, store: Comms) -> HttpResponse {
    let Some(user) = user else {
        return HttpResponse::Ok().json(json!({ "count": 0 }));
    };
    let store = store.into_inner();
    let count = match web::block(move || store.unread_count(user.id)).await {
        Ok(Ok(count)) => count,
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "unread count failed");
            0
        }
        Err(err) => {
            tracing::warn!(error = %err, "unread count failed");
            0
        }
    };
    HttpResponse::Ok().json(json!({ "count": count }))
}

pub async fn thread(
    user: AuthenticatedUser,
    store: Comms,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let other = action_id(&path)?;
    let store = store.into_inner();
    let items = web::block(move || store.thread(user.id, other, THREAD_LIMIT)).await??;
    Ok(HttpResponse::Ok().json(json!({ "items": items })))
}

#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    #[serde(default)]
    q: String,
}

pub async fn recipients(
    _user: AuthenticatedUser,
    profiles: web::Data<dyn ProfileStore>,
    query: web::Query<DirectoryQuery>,
) -> Result<HttpResponse, ApiError> {
    let term = query.into_inner().q.trim().to_owned();
    if term.chars().count() < MIN_DIRECTORY_QUERY {
        return Ok(HttpResponse::Ok().json(json!({ "items": [] })));
    }
    let profiles = profiles.into_inner();
    let items = web::block(move || profiles.search_directory(&term, DIRECTORY_LIMIT)).await??;
    Ok(HttpResponse::Ok().json(json!({ "items": items })))
}
