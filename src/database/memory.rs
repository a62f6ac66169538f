use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use tokio::sync::RwLock;

use super::{Collection, DeleteAck, DocumentStore, FindPage, InsertAck, StoreError, UpdateAck};

/// In-process DocumentStore with the same filter and update semantics the
/// HTTP layer relies on from MongoDB. Documents keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<Collection, Vec<Document>>,
    unique_indexes: HashMap<Collection, Vec<Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn docs(&self, collection: Collection) -> &[Document] {
        self.collections.get(&collection).map(Vec::as_slice).unwrap_or(&[])
    }

    fn position(&self, collection: Collection, filter: &Document) -> Result<Option<usize>, StoreError> {
        for (i, doc) in self.docs(collection).iter().enumerate() {
            if matches_filter(doc, filter)? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Checks `_id` and every unique index of `collection` against `candidate`,
    /// ignoring the document stored at `skip`.
    fn check_unique(
        &self,
        collection: Collection,
        candidate: &Document,
        skip: Option<usize>,
    ) -> Result<(), StoreError> {
        let mut indexes = vec![vec!["_id".to_string()]];
        if let Some(extra) = self.unique_indexes.get(&collection) {
            indexes.extend(extra.iter().cloned());
        }

        for keys in &indexes {
            let clash = self
                .docs(collection)
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != skip)
                .any(|(_, existing)| {
                    keys.iter().all(|key| {
                        let a = get_path(existing, key).unwrap_or(&Bson::Null);
                        let b = get_path(candidate, key).unwrap_or(&Bson::Null);
                        values_equal(a, b)
                    })
                });
            if clash {
                return Err(StoreError::DuplicateKey(format!(
                    "{} index on ({})",
                    collection.name(),
                    keys.join(", ")
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: Collection, document: Document) -> Result<InsertAck, StoreError> {
        let document = with_id(document);
        let inserted_id = document.get("_id").cloned().unwrap_or(Bson::Null);

        let mut inner = self.inner.write().await;
        inner.check_unique(collection, &document, None)?;
        inner.collections.entry(collection).or_default().push(document);

        Ok(InsertAck {
            acknowledged: true,
            inserted_id,
        })
    }

    async fn find(
        &self,
        collection: Collection,
        filter: Document,
        page: FindPage,
    ) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.read().await;
        let mut matched = Vec::new();
        for doc in inner.docs(collection) {
            if matches_filter(doc, &filter)? {
                matched.push(doc.clone());
            }
        }

        let skip = usize::try_from(page.skip).unwrap_or(usize::MAX);
        let iter = matched.into_iter().skip(skip);
        Ok(match page.limit {
            Some(limit) if limit != 0 => iter.take(limit.unsigned_abs() as usize).collect(),
            _ => iter.collect(),
        })
    }

    async fn find_one(&self, collection: Collection, filter: Document) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.read().await;
        let found = inner.position(collection, &filter)?;
        Ok(found.map(|i| inner.docs(collection)[i].clone()))
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateAck, StoreError> {
        let mut inner = self.inner.write().await;

        if let Some(i) = inner.position(collection, &filter)? {
            let mut updated = inner.docs(collection)[i].clone();
            let modified = apply_update(&mut updated, &update)?;
            inner.check_unique(collection, &updated, Some(i))?;
            if let Some(docs) = inner.collections.get_mut(&collection) {
                docs[i] = updated;
            }
            return Ok(UpdateAck {
                acknowledged: true,
                matched_count: 1,
                modified_count: u64::from(modified),
                upserted_count: 0,
                upserted_id: None,
            });
        }

        if !upsert {
            return Ok(UpdateAck {
                acknowledged: true,
                matched_count: 0,
                modified_count: 0,
                upserted_count: 0,
                upserted_id: None,
            });
        }

        // Upsert seeds the new document from the filter's equality fields.
        let mut seeded = Document::new();
        for (key, value) in filter.iter() {
            if !key.starts_with('$') {
                set_path(&mut seeded, key, value.clone());
            }
        }
        apply_update(&mut seeded, &update)?;
        let seeded = with_id(seeded);
        let upserted_id = seeded.get("_id").cloned();

        inner.check_unique(collection, &seeded, None)?;
        inner.collections.entry(collection).or_default().push(seeded);

        Ok(UpdateAck {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_count: 1,
            upserted_id,
        })
    }

    async fn delete_one(&self, collection: Collection, filter: Document) -> Result<DeleteAck, StoreError> {
        let mut inner = self.inner.write().await;
        let deleted_count = match inner.position(collection, &filter)? {
            Some(i) => {
                if let Some(docs) = inner.collections.get_mut(&collection) {
                    docs.remove(i);
                }
                1
            }
            None => 0,
        };
        Ok(DeleteAck {
            acknowledged: true,
            deleted_count,
        })
    }

    async fn ensure_unique_index(&self, collection: Collection, keys: &[&str]) -> Result<(), StoreError> {
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        let mut inner = self.inner.write().await;
        let indexes = inner.unique_indexes.entry(collection).or_default();
        if !indexes.contains(&keys) {
            indexes.push(keys);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Puts a fresh ObjectId first when the document carries no `_id`.
fn with_id(document: Document) -> Document {
    if document.contains_key("_id") {
        return document;
    }
    let mut with_id = Document::new();
    with_id.insert("_id", ObjectId::new());
    for (key, value) in document {
        with_id.insert(key, value);
    }
    with_id
}

fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

fn set_path(document: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(document.get(head), Some(Bson::Document(_))) {
                document.insert(head, Document::new());
            }
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                set_path(inner, rest, value);
            }
        }
    }
}

fn matches_filter(document: &Document, filter: &Document) -> Result<bool, StoreError> {
    for (key, expected) in filter.iter() {
        if key.starts_with('$') {
            return Err(StoreError::QueryError(format!("unsupported filter operator {}", key)));
        }
        if let Bson::Document(inner) = expected {
            if inner.keys().any(|k| k.starts_with('$')) {
                return Err(StoreError::QueryError(format!("unsupported operator in filter on {}", key)));
            }
        }

        let matched = match get_path(document, key) {
            Some(Bson::Array(items)) if !matches!(expected, Bson::Array(_)) => {
                items.iter().any(|item| values_equal(item, expected))
            }
            Some(actual) => values_equal(actual, expected),
            None => matches!(expected, Bson::Null),
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// Numbers compare by value across Int32/Int64/Double, like the server does.
fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn add_numbers(current: &Bson, delta: &Bson) -> Option<Bson> {
    match (current, delta) {
        (Bson::Int32(a), Bson::Int32(b)) => Some(match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(i64::from(*a) + i64::from(*b)),
        }),
        (Bson::Int32(a), Bson::Int64(b)) | (Bson::Int64(b), Bson::Int32(a)) => {
            Some(Bson::Int64(i64::from(*a).checked_add(*b)?))
        }
        (Bson::Int64(a), Bson::Int64(b)) => Some(Bson::Int64(a.checked_add(*b)?)),
        _ => Some(Bson::Double(as_f64(current)? + as_f64(delta)?)),
    }
}

/// Applies `$set`/`$inc` to `document`; returns whether anything changed.
fn apply_update(document: &mut Document, update: &Document) -> Result<bool, StoreError> {
    let mut changed = false;

    for (operator, fields) in update.iter() {
        let fields = match fields {
            Bson::Document(fields) => fields,
            _ => return Err(StoreError::QueryError(format!("{} expects a document", operator))),
        };

        match operator.as_str() {
            "$set" => {
                for (path, value) in fields.iter() {
                    let current = get_path(document, path);
                    if path == "_id" && current.is_some_and(|id| id != value) {
                        return Err(StoreError::QueryError("_id is immutable".to_string()));
                    }
                    if current != Some(value) {
                        set_path(document, path, value.clone());
                        changed = true;
                    }
                }
            }
            "$inc" => {
                for (path, delta) in fields.iter() {
                    if as_f64(delta).is_none() {
                        return Err(StoreError::QueryError(format!("$inc on {} needs a number", path)));
                    }
                    let next = match get_path(document, path) {
                        None => delta.clone(),
                        Some(current) => add_numbers(current, delta).ok_or_else(|| {
                            StoreError::QueryError(format!("cannot apply $inc to non-numeric field {}", path))
                        })?,
                    };
                    set_path(document, path, next);
                    changed = true;
                }
            }
            other => return Err(StoreError::QueryError(format!("unsupported update operator {}", other))),
        }
    }

    Ok(changed)
}
