mod common;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use mongodb::bson::Document;
use serde_json::json;

use vix_career_api::database::{
    Collection, DeleteAck, DocumentStore, FindPage, InsertAck, MemoryStore, StoreError, UpdateAck,
};

/// Reports no existing applications, as a lookup that raced a concurrent insert would.
struct StaleApplicationReads(Arc<MemoryStore>);

#[async_trait]
impl DocumentStore for StaleApplicationReads {
    async fn insert_one(&self, collection: Collection, document: Document) -> Result<InsertAck, StoreError> {
        self.0.insert_one(collection, document).await
    }

    async fn find(
        &self,
        collection: Collection,
        filter: Document,
        page: FindPage,
    ) -> Result<Vec<Document>, StoreError> {
        self.0.find(collection, filter, page).await
    }

    async fn find_one(&self, collection: Collection, filter: Document) -> Result<Option<Document>, StoreError> {
        match collection {
            Collection::JobApplications => Ok(None),
            _ => self.0.find_one(collection, filter).await,
        }
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateAck, StoreError> {
        self.0.update_one(collection, filter, update, upsert).await
    }

    async fn delete_one(&self, collection: Collection, filter: Document) -> Result<DeleteAck, StoreError> {
        self.0.delete_one(collection, filter).await
    }

    async fn ensure_unique_index(&self, collection: Collection, keys: &[&str]) -> Result<(), StoreError> {
        self.0.ensure_unique_index(collection, keys).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.0.ping().await
    }
}

#[tokio::test]
async fn second_identical_application_is_rejected() -> Result<()> {
    let app = common::test_app().await?;
    let job_id = app
        .create_job(&json!({ "title": "Rust Engineer", "email": "hr@vix.io", "job_applicants": 0 }))
        .await?;
    let application = json!({
        "email": "dev@mail.io",
        "name": "Dev",
        "resume": "https://resume.example/dev.pdf",
        "jobId": job_id
    });

    let res = app.send_json(Method::POST, "/job-apply", &application).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let ack = common::body_json(res).await?;
    assert_eq!(ack["acknowledged"], true);
    assert!(ack["insertedId"].is_string());

    let job = common::body_json(app.get(&format!("/job/{}", job_id)).await?).await?;
    assert_eq!(job["job_applicants"], 1);

    let res = app.send_json(Method::POST, "/job-apply", &application).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::body_text(res).await?, "You have already Applied on this Job");

    // No state change from the rejected request
    let job = common::body_json(app.get(&format!("/job/{}", job_id)).await?).await?;
    assert_eq!(job["job_applicants"], 1);
    let mine = common::body_json(app.get("/my-apply/dev@mail.io").await?).await?;
    assert_eq!(mine.as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn different_applicants_each_count() -> Result<()> {
    let app = common::test_app().await?;
    let job_id = app
        .create_job(&json!({ "title": "SRE", "job_applicants": 0 }))
        .await?;

    for email in ["a@mail.io", "b@mail.io", "c@mail.io"] {
        let res = app
            .send_json(Method::POST, "/job-apply", &json!({ "email": email, "jobId": job_id }))
            .await?;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let job = common::body_json(app.get(&format!("/job/{}", job_id)).await?).await?;
    assert_eq!(job["job_applicants"], 3);
    Ok(())
}

#[tokio::test]
async fn counter_starts_when_job_has_none() -> Result<()> {
    let app = common::test_app().await?;
    let job_id = app.create_job(&json!({ "title": "No counter yet" })).await?;

    app.send_json(Method::POST, "/job-apply", &json!({ "email": "a@mail.io", "jobId": job_id }))
        .await?;

    let job = common::body_json(app.get(&format!("/job/{}", job_id)).await?).await?;
    assert_eq!(job["job_applicants"], 1);
    Ok(())
}

#[tokio::test]
async fn application_is_kept_when_job_reference_is_not_an_id() -> Result<()> {
    let app = common::test_app().await?;

    let res = app
        .send_json(Method::POST, "/job-apply", &json!({ "email": "a@mail.io", "jobId": "legacy-42" }))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let mine = common::body_json(app.get("/my-apply/a@mail.io").await?).await?;
    assert_eq!(mine[0]["jobId"], "legacy-42");
    Ok(())
}

#[tokio::test]
async fn application_requires_email_and_job_reference() -> Result<()> {
    let app = common::test_app().await?;

    let res = app
        .send_json(Method::POST, "/job-apply", &json!({ "jobId": "65f1a2b3c4d5e6f708192a3b" }))
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .send_json(Method::POST, "/job-apply", &json!({ "email": "a@mail.io" }))
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let mine = common::body_json(app.get("/my-apply/a@mail.io").await?).await?;
    assert_eq!(mine, json!([]));
    Ok(())
}

#[tokio::test]
async fn duplicate_caught_by_unique_index_gets_same_rejection() -> Result<()> {
    let memory = Arc::new(MemoryStore::new());
    let app = common::test_app_with_store(Arc::new(StaleApplicationReads(memory.clone())), memory).await?;
    let job_id = app.create_job(&json!({ "title": "Backend", "job_applicants": 0 })).await?;
    let application = json!({ "email": "dev@mail.io", "jobId": job_id });

    let res = app.send_json(Method::POST, "/job-apply", &application).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.send_json(Method::POST, "/job-apply", &application).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::body_text(res).await?, "You have already Applied on this Job");

    let job = common::body_json(app.get(&format!("/job/{}", job_id)).await?).await?;
    assert_eq!(job["job_applicants"], 1);
    let stored = app
        .store
        .find(Collection::JobApplications, Document::new(), FindPage::all())
        .await?;
    assert_eq!(stored.len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_applications_admit_one() -> Result<()> {
    let app = Arc::new(common::test_app().await?);
    let job_id = app.create_job(&json!({ "title": "Platform", "job_applicants": 0 })).await?;
    let application = json!({ "email": "dev@mail.io", "jobId": job_id });

    let requests = (0..8).map(|_| {
        let app = app.clone();
        let application = application.clone();
        tokio::spawn(async move {
            let res = app.send_json(Method::POST, "/job-apply", &application).await?;
            let status = res.status();
            let body = common::body_text(res).await?;
            anyhow::Ok((status, body))
        })
    });

    let mut accepted = 0;
    for outcome in futures::future::join_all(requests).await {
        let (status, body) = outcome??;
        if status == StatusCode::OK {
            accepted += 1;
        } else {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, "You have already Applied on this Job");
        }
    }
    assert_eq!(accepted, 1);

    let job = common::body_json(app.get(&format!("/job/{}", job_id)).await?).await?;
    assert_eq!(job["job_applicants"], 1);
    Ok(())
}
