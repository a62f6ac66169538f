use axum::{
    extract::{Path, State},
    Json,
};
use mongodb::bson::doc;
use serde_json::Value;

use crate::database::document::{document_to_json, documents_to_json, id_filter};
use crate::database::{Collection, FindPage};
use crate::error::ApiResult;
use crate::state::AppState;

async fn list_all(state: &AppState, collection: Collection) -> ApiResult<Json<Value>> {
    let documents = state.store.find(collection, doc! {}, FindPage::all()).await?;
    Ok(Json(documents_to_json(documents)))
}

/// GET /companies
pub async fn companies(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    list_all(&state, Collection::Companies).await
}

/// GET /blogs
pub async fn blogs(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    list_all(&state, Collection::Blogs).await
}

/// GET /blog/:id
pub async fn blog_get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Option<Value>>> {
    let blog = state.store.find_one(Collection::Blogs, id_filter(&id)?).await?;
    Ok(Json(blog.map(document_to_json)))
}
