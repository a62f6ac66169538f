use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::Value;

use crate::database::document::{document_to_json, documents_to_json, id_filter, json_to_document};
use crate::database::{Collection, DeleteAck, FindPage, InsertAck, UpdateAck};
use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub size: Option<String>,
}

impl PageQuery {
    /// Lenient parsing: a missing, non-numeric or non-positive `size` means
    /// no pagination; a bad `page` falls back to the first page.
    pub fn to_find_page(&self) -> FindPage {
        let size = match self.size.as_deref().and_then(|s| s.trim().parse::<i64>().ok()) {
            Some(size) if size > 0 => size,
            _ => return FindPage::all(),
        };
        let page = self
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<u64>().ok())
            .unwrap_or(0);

        // Stores take a signed skip.
        FindPage {
            skip: page.saturating_mul(size as u64).min(i64::MAX as u64),
            limit: Some(size),
        }
    }
}

/// POST /all-jobs - store the posted job verbatim
pub async fn create(State(state): State<AppState>, Json(body): Json<Value>) -> ApiResult<Json<InsertAck>> {
    let job = json_to_document(body)?;
    let ack = state.store.insert_one(Collection::Jobs, job).await?;
    Ok(Json(ack))
}

/// GET /all-jobs?page=&size= - jobs in natural order
pub async fn list(State(state): State<AppState>, Query(query): Query<PageQuery>) -> ApiResult<Json<Value>> {
    let jobs = state
        .store
        .find(Collection::Jobs, doc! {}, query.to_find_page())
        .await?;
    Ok(Json(documents_to_json(jobs)))
}

/// GET /job/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Option<Value>>> {
    let job = state.store.find_one(Collection::Jobs, id_filter(&id)?).await?;
    Ok(Json(job.map(document_to_json)))
}

/// GET /all-jobs/:email - jobs posted by `email` (session required)
///
/// Any signed-in caller may list any owner's jobs.
pub async fn list_by_owner(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(email): Path<String>,
) -> ApiResult<Json<Value>> {
    tracing::debug!("{} listing jobs owned by {}", user.email, email);
    let jobs = state
        .store
        .find(Collection::Jobs, doc! { "email": email }, FindPage::all())
        .await?;
    Ok(Json(documents_to_json(jobs)))
}

/// PUT /job/:id - `$set` the posted fields, creating the job if absent
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<UpdateAck>> {
    let filter = id_filter(&id)?;
    let mut fields = json_to_document(body)?;
    // _id is immutable; clients often echo it back
    fields.remove("_id");

    let ack = state
        .store
        .update_one(Collection::Jobs, filter, doc! { "$set": fields }, true)
        .await?;
    Ok(Json(ack))
}

/// DELETE /job/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<DeleteAck>> {
    let ack = state.store.delete_one(Collection::Jobs, id_filter(&id)?).await?;
    Ok(Json(ack))
}
