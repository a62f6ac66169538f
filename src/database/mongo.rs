use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions, IndexOptions, ServerApi, ServerApiVersion, UpdateOptions},
    Client, Database, IndexModel,
};
use tracing::info;

use super::{Collection, DeleteAck, DocumentStore, FindPage, InsertAck, StoreError, UpdateAck};

const DUPLICATE_KEY_CODE: i32 = 11000;

/// DocumentStore backed by a MongoDB deployment.
///
/// The driver's `Client` pools connections internally; one store is built at
/// startup and shared by every request.
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database_name: &str) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri).await.map_err(map_driver_error)?;
        options.server_api = Some(
            ServerApi::builder()
                .version(ServerApiVersion::V1)
                .strict(true)
                .deprecation_errors(true)
                .build(),
        );

        let client = Client::with_options(options).map_err(map_driver_error)?;
        let database = client.database(database_name);
        info!("MongoDB client configured for database {}", database_name);

        Ok(Self { client, database })
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<Document> {
        self.database.collection(collection.name())
    }
}

fn map_driver_error(err: mongodb::error::Error) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE => {
            StoreError::DuplicateKey(write.message.clone())
        }
        ErrorKind::ServerSelection { message, .. } => StoreError::Unavailable(message.clone()),
        _ => StoreError::Driver(err),
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_one(&self, collection: Collection, document: Document) -> Result<InsertAck, StoreError> {
        let result = self
            .collection(collection)
            .insert_one(document, None)
            .await
            .map_err(map_driver_error)?;

        Ok(InsertAck {
            acknowledged: true,
            inserted_id: result.inserted_id,
        })
    }

    async fn find(
        &self,
        collection: Collection,
        filter: Document,
        page: FindPage,
    ) -> Result<Vec<Document>, StoreError> {
        let options = FindOptions::builder().skip(page.skip).limit(page.limit).build();
        let cursor = self
            .collection(collection)
            .find(filter, options)
            .await
            .map_err(map_driver_error)?;

        cursor.try_collect().await.map_err(map_driver_error)
    }

    async fn find_one(&self, collection: Collection, filter: Document) -> Result<Option<Document>, StoreError> {
        self.collection(collection)
            .find_one(filter, None)
            .await
            .map_err(map_driver_error)
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateAck, StoreError> {
        let options = UpdateOptions::builder().upsert(upsert).build();
        let result = self
            .collection(collection)
            .update_one(filter, update, options)
            .await
            .map_err(map_driver_error)?;

        Ok(UpdateAck {
            acknowledged: true,
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_count: u64::from(result.upserted_id.is_some()),
            upserted_id: result.upserted_id,
        })
    }

    async fn delete_one(&self, collection: Collection, filter: Document) -> Result<DeleteAck, StoreError> {
        let result = self
            .collection(collection)
            .delete_one(filter, None)
            .await
            .map_err(map_driver_error)?;

        Ok(DeleteAck {
            acknowledged: true,
            deleted_count: result.deleted_count,
        })
    }

    async fn ensure_unique_index(&self, collection: Collection, keys: &[&str]) -> Result<(), StoreError> {
        let mut keys_doc = Document::new();
        for key in keys {
            keys_doc.insert(*key, 1);
        }
        let index = IndexModel::builder()
            .keys(keys_doc)
            .options(IndexOptions::builder().unique(true).build())
            .build();

        let created = self
            .collection(collection)
            .create_index(index, None)
            .await
            .map_err(map_driver_error)?;
        info!("Ensured unique index {} on {}", created.index_name, collection.name());
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(map_driver_error)?;
        Ok(())
    }
}
