//! BSON to JSON rendering for API responses.
//!
//! ObjectIds render as their hex string and dates as RFC 3339 strings, which
//! is what the admin frontend expects. Everything else follows relaxed
//! extended JSON.

use mongodb::bson::{Bson, Document};
use serde_json::Value;

pub fn document_to_json(document: Document) -> Value {
    Value::Object(
        document
            .into_iter()
            .map(|(key, value)| (key, bson_to_json(value)))
            .collect(),
    )
}

pub fn documents_to_json(documents: Vec<Document>) -> Value {
    Value::Array(documents.into_iter().map(document_to_json).collect())
}

pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => Value::String(
            dt.try_to_rfc3339_string()
                .unwrap_or_else(|_| dt.timestamp_millis().to_string()),
        ),
        Bson::Document(document) => document_to_json(document),
        Bson::Array(values) => Value::Array(values.into_iter().map(bson_to_json).collect()),
        other => other.into_relaxed_extjson(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId, DateTime};

    #[test]
    fn test_object_ids_render_as_hex() {
        let oid = ObjectId::new();
        let json = document_to_json(doc! { "_id": oid, "refs": [oid] });
        assert_eq!(json["_id"], Value::String(oid.to_hex()));
        assert_eq!(json["refs"][0], Value::String(oid.to_hex()));
    }

    #[test]
    fn test_dates_render_as_rfc3339() {
        let json = document_to_json(doc! { "createdAt": DateTime::from_millis(0) });
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_nested_documents_and_scalars() {
        let json = document_to_json(doc! {
            "title": "My Site",
            "pages": { "home": { "visible": true } },
            "count": 3_i32,
        });
        assert_eq!(json["title"], "My Site");
        assert_eq!(json["pages"]["home"]["visible"], true);
        assert_eq!(json["count"], 3);
    }

    #[test]
    fn test_empty_list_renders_as_array() {
        assert_eq!(documents_to_json(vec![]), Value::Array(vec![]));
    }
}
