use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use super::client::FirebaseApp;
use super::error::FeedbackError;

/// 取得したドキュメント（Firestore の型付き値はプレーンな JSON に展開済み）
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub name: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        let raw = self.fields.get(field)?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// フィードバック 1 件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackDocument {
    pub timestamp: Option<DateTime<Utc>>,
    pub content: String,
}

impl FeedbackDocument {
    pub fn from_document(doc: &Document, order_by: &str) -> Result<Self, FeedbackError> {
        let content = doc
            .fields
            .get("content")
            .ok_or_else(|| FeedbackError::Read(format!("missing field `content` in {}", doc.name)))?
            .as_str()
            .ok_or_else(|| FeedbackError::Read(format!("field `content` in {} is not a string", doc.name)))?;

        Ok(Self {
            timestamp: doc.timestamp(order_by),
            content: content.to_string(),
        })
    }
}

/// 降順に並べた先頭 `limit` 件を返すドキュメントストア
pub trait DocumentStore {
    fn latest(&self, collection: &str, order_by: &str, limit: u32) -> Result<Vec<Document>, FeedbackError>;
}

/// Firestore REST API (`documents:runQuery`)
pub struct FirestoreStore<'a> {
    app: &'a FirebaseApp,
    base_url: String,
}

impl<'a> FirestoreStore<'a> {
    pub fn new(app: &'a FirebaseApp, base_url: &str) -> Self {
        Self {
            app,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents:runQuery",
            self.base_url,
            self.app.project_id()
        )
    }
}

pub fn latest_query(collection: &str, order_by: &str, limit: u32) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "orderBy": [{
                "field": { "fieldPath": order_by },
                "direction": "DESCENDING"
            }],
            "limit": limit
        }
    })
}

impl DocumentStore for FirestoreStore<'_> {
    fn latest(&self, collection: &str, order_by: &str, limit: u32) -> Result<Vec<Document>, FeedbackError> {
        let token = self.app.access_token()?;
        let response = self
            .app
            .http()
            .post(self.documents_url())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&latest_query(collection, order_by, limit))
            .send()
            .map_err(|e| FeedbackError::Query(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FeedbackError::Query(format!("runQuery returned {status}: {body}")));
        }

        let body: Value = response
            .json()
            .map_err(|e| FeedbackError::Read(e.to_string()))?;
        parse_run_query_response(&body)
    }
}

/// runQuery のレスポンス（結果ごとの配列）からドキュメントを取り出す
///
/// 結果 0 件のときは `document` を持たない要素が 1 つだけ返ってくる。
pub fn parse_run_query_response(body: &Value) -> Result<Vec<Document>, FeedbackError> {
    let results = body
        .as_array()
        .ok_or_else(|| FeedbackError::Read("runQuery response is not an array".to_string()))?;

    let mut documents = Vec::new();
    for result in results {
        let Some(doc) = result.get("document") else {
            continue;
        };
        let name = doc
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| FeedbackError::Read("document without name".to_string()))?;
        let mut fields = Map::new();
        if let Some(raw) = doc.get("fields").and_then(Value::as_object) {
            for (key, value) in raw {
                fields.insert(key.clone(), decode_value(value));
            }
        }
        documents.push(Document {
            name: name.to_string(),
            fields,
        });
    }
    Ok(documents)
}

/// Firestore の型付き値をプレーンな JSON に変換
fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Value::Null;
    };
    match kind.as_str() {
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "mapValue" => {
            let mut map = Map::new();
            if let Some(fields) = inner.get("fields").and_then(Value::as_object) {
                for (k, v) in fields {
                    map.insert(k.clone(), decode_value(v));
                }
            }
            Value::Object(map)
        }
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vs| vs.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "nullValue" => Value::Null,
        _ => inner.clone(),
    }
}

/// メモリ上のドキュメントストア
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: HashMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: &str, document: Document) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// `timestamp` と `content` を持つドキュメントを追加
    pub fn insert_feedback(&mut self, collection: &str, timestamp: DateTime<Utc>, content: &str) {
        let id = self.collections.get(collection).map_or(0, Vec::len);
        let doc = Document::new(format!("{collection}/{id}"))
            .with_field("timestamp", timestamp.to_rfc3339())
            .with_field("content", content);
        self.insert(collection, doc);
    }
}

impl DocumentStore for MemoryStore {
    fn latest(&self, collection: &str, order_by: &str, limit: u32) -> Result<Vec<Document>, FeedbackError> {
        // order_by のフィールドが無いドキュメントは Firestore と同様に結果から外れる
        let mut docs: Vec<(DateTime<Utc>, &Document)> = self
            .collections
            .get(collection)
            .into_iter()
            .flatten()
            .filter_map(|d| d.timestamp(order_by).map(|t| (t, d)))
            .collect();
        docs.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(docs
            .into_iter()
            .take(limit as usize)
            .map(|(_, d)| d.clone())
            .collect())
    }
}
