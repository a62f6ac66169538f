// Conversions between request/response JSON and stored BSON documents.
use mongodb::bson::{self, doc, oid::ObjectId, Bson, Document};
use serde::Serializer;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid id: {0}")]
    InvalidObjectId(String),

    #[error("Document encoding failed: {0}")]
    Encode(#[from] bson::ser::Error),
}

/// Converts a JSON object into a BSON document, rejecting any other JSON shape.
pub fn json_to_document(value: Value) -> Result<Document, DocumentError> {
    match value {
        Value::Object(map) => Ok(bson::to_document(&map)?),
        _ => Err(DocumentError::NotAnObject),
    }
}

/// Renders a BSON value as plain JSON. ObjectIds become hex strings.
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::Document(doc) => document_to_json(doc),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        other => other.into_relaxed_extjson(),
    }
}

pub fn document_to_json(document: Document) -> Value {
    let map: Map<String, Value> = document.into_iter().map(|(k, v)| (k, bson_to_json(v))).collect();
    Value::Object(map)
}

pub fn documents_to_json(documents: Vec<Document>) -> Value {
    Value::Array(documents.into_iter().map(document_to_json).collect())
}

pub fn parse_object_id(id: &str) -> Result<ObjectId, DocumentError> {
    ObjectId::parse_str(id).map_err(|_| DocumentError::InvalidObjectId(id.to_string()))
}

/// `{ _id: ObjectId(id) }`
pub fn id_filter(id: &str) -> Result<Document, DocumentError> {
    Ok(doc! { "_id": parse_object_id(id)? })
}

pub fn serialize_bson<S: Serializer>(value: &Bson, serializer: S) -> Result<S::Ok, S::Error> {
    serde::Serialize::serialize(&bson_to_json(value.clone()), serializer)
}

pub fn serialize_optional_bson<S: Serializer>(value: &Option<Bson>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serialize_bson(v, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_ids_render_as_hex() {
        let oid = ObjectId::new();
        let doc = doc! { "_id": oid, "tags": [ { "ref": oid } ] };
        let value = document_to_json(doc);
        assert_eq!(value["_id"], json!(oid.to_hex()));
        assert_eq!(value["tags"][0]["ref"], json!(oid.to_hex()));
    }

    #[test]
    fn test_json_body_keeps_shape() {
        let body = json!({
            "title": "Backend Engineer",
            "email": "hr@vix.io",
            "job_applicants": 0,
            "salary": { "min": 1000, "max": 2500.5 },
            "remote": true
        });
        let doc = json_to_document(body.clone()).unwrap();
        assert_eq!(document_to_json(doc), body);
    }

    #[test]
    fn test_non_object_body_rejected() {
        assert!(matches!(json_to_document(json!([1, 2])), Err(DocumentError::NotAnObject)));
        assert!(matches!(json_to_document(json!("job")), Err(DocumentError::NotAnObject)));
    }

    #[test]
    fn test_malformed_id() {
        assert!(matches!(id_filter("not-an-id"), Err(DocumentError::InvalidObjectId(_))));
        assert!(id_filter("65f1a2b3c4d5e6f708192a3b").is_ok());
    }
}
