use axum::{
    extract::{Path, State},
    Json,
};
use mongodb::bson::{doc, Bson};
use serde_json::Value;

use crate::database::document::{documents_to_json, json_to_document, parse_object_id, DocumentError};
use crate::database::{Collection, FindPage, InsertAck, StoreError};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /job-apply - record an application and bump the job's applicant count
///
/// A second application with the same `email` and `jobId` is rejected with
/// 400. The counter update is a separate write; if it fails the application
/// stays stored and the failure is only logged.
pub async fn apply(State(state): State<AppState>, Json(body): Json<Value>) -> ApiResult<Json<InsertAck>> {
    let application = json_to_document(body)?;
    let email = application
        .get("email")
        .cloned()
        .ok_or(DocumentError::MissingField("email"))?;
    let job_id = application
        .get("jobId")
        .cloned()
        .ok_or(DocumentError::MissingField("jobId"))?;

    let existing = state
        .store
        .find_one(
            Collection::JobApplications,
            doc! { "email": email.clone(), "jobId": job_id.clone() },
        )
        .await?;
    if existing.is_some() {
        tracing::info!("Duplicate application from {} for job {}", email, job_id);
        return Err(ApiError::AlreadyApplied);
    }

    // The unique (email, jobId) index catches requests that raced past the check above.
    let ack = match state.store.insert_one(Collection::JobApplications, application).await {
        Ok(ack) => ack,
        Err(StoreError::DuplicateKey(_)) => return Err(ApiError::AlreadyApplied),
        Err(e) => return Err(e.into()),
    };

    increment_applicants(&state, &job_id).await;
    Ok(Json(ack))
}

async fn increment_applicants(state: &AppState, job_id: &Bson) {
    let oid = match job_id {
        Bson::ObjectId(oid) => *oid,
        Bson::String(hex) => match parse_object_id(hex) {
            Ok(oid) => oid,
            Err(e) => {
                tracing::warn!("Skipping applicant count update: {}", e);
                return;
            }
        },
        other => {
            tracing::warn!("Skipping applicant count update: jobId {} is not an id", other);
            return;
        }
    };

    match state
        .store
        .update_one(
            Collection::Jobs,
            doc! { "_id": oid },
            doc! { "$inc": { "job_applicants": 1 } },
            false,
        )
        .await
    {
        Ok(ack) => tracing::debug!(
            job = %oid,
            matched = ack.matched_count,
            modified = ack.modified_count,
            "applicant count updated"
        ),
        Err(e) => tracing::warn!(job = %oid, "applicant count update failed: {}", e),
    }
}

/// GET /my-apply/:email - applications submitted by `email`
pub async fn my_applications(State(state): State<AppState>, Path(email): Path<String>) -> ApiResult<Json<Value>> {
    let applications = state
        .store
        .find(Collection::JobApplications, doc! { "email": email }, FindPage::all())
        .await?;
    Ok(Json(documents_to_json(applications)))
}
