use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Body of the account-level token request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AccountTokenRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Body of the client-scoped token request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ClientTokenRequest {
    pub client_id: u64,
}

/// Both token endpoints answer with this envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
}

/// Identity of a listing record, as the provider reports it.
///
/// Integers that fit neither `i64` nor `u64`, and non-integral numbers, are
/// kept as their JSON text so one odd id does not fail the whole page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Unsigned(u64),
    Text(String),
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => Ok(match (n.as_i64(), n.as_u64()) {
                (Some(signed), _) => RecordId::Number(signed),
                (None, Some(unsigned)) => RecordId::Unsigned(unsigned),
                _ => RecordId::Text(n.to_string()),
            }),
            Value::String(s) => Ok(RecordId::Text(s)),
            other => Err(de::Error::custom(format!(
                "record id must be a number or string, got {}",
                other
            ))),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Unsigned(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

/// A single listing (estate) from the provider.
///
/// Only `id` is interpreted; every other field is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ListingRecord {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Number(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Text(id.to_string())
    }
}

/// Pagination window of a listing search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

/// Listing search parameters.
///
/// Supplying `page.limit` selects single-page mode; leaving it unset makes
/// the client walk every page and de-duplicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListingQuery {
    /// Any further provider parameters, sent verbatim. Serialized first so
    /// the typed fields below win on key collisions.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
    #[serde(default)]
    pub page: PageRequest,
}

impl ListingQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a single page of `limit` records.
    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.page = PageRequest {
            limit: Some(limit),
            offset: Some(offset),
        };
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.page.limit = Some(limit);
        self
    }

    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, sort: Value) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn is_single_page(&self) -> bool {
        self.page.limit.is_some()
    }

    /// Copy of this query pinned to one page window.
    pub(crate) fn at(&self, limit: u32, offset: u32) -> Self {
        let mut query = self.clone();
        // The window is owned by `page`; never let a stray extra key move it.
        query.extra.remove("Page");
        query.page = PageRequest {
            limit: Some(limit),
            offset: Some(offset),
        };
        query
    }
}

/// Raw listing search response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub estates: Vec<ListingRecord>,
    #[serde(default)]
    pub total_count: u64,
}

/// Result of a listing fetch in either mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingsPage {
    pub records: Vec<ListingRecord>,
    pub total_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_passthrough() {
        let record: ListingRecord = serde_json::from_value(json!({
            "id": 5012,
            "price": 349000,
            "address": "Rue Haute 12",
            "pictures": [{"urlLarge": "https://cdn.example.com/1.jpg"}]
        }))
        .unwrap();

        assert_eq!(record.id, RecordId::Number(5012));
        assert_eq!(record.field("price"), Some(&json!(349000)));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["address"], "Rue Haute 12");
        assert_eq!(back["id"], 5012);
    }

    #[test]
    fn test_string_ids_accepted() {
        let record: ListingRecord = serde_json::from_value(json!({"id": "A-17"})).unwrap();
        assert_eq!(record.id, RecordId::Text("A-17".into()));
        assert_eq!(record.id.to_string(), "A-17");
    }

    #[test]
    fn test_query_wire_shape() {
        let query = ListingQuery::new()
            .filter(json!({"PurposeIds": [1]}))
            .sort(json!([{"Field": "price", "Ascending": true}]))
            .page(8, 16);

        let body = serde_json::to_value(&query).unwrap();
        assert_eq!(body["Page"], json!({"Limit": 8, "Offset": 16}));
        assert_eq!(body["Filter"]["PurposeIds"], json!([1]));
        assert!(body["Sort"].is_array());
    }

    #[test]
    fn test_single_page_mode_selected_by_limit() {
        assert!(!ListingQuery::new().is_single_page());
        assert!(ListingQuery::new().limit(8).is_single_page());

        let offset_only = ListingQuery {
            page: PageRequest {
                limit: None,
                offset: Some(10),
            },
            ..Default::default()
        };
        assert!(!offset_only.is_single_page());
    }

    #[test]
    fn test_large_and_fractional_ids_accepted() {
        let records: Vec<ListingRecord> = serde_json::from_value(json!([
            {"id": 18446744073709551615u64},
            {"id": 12.5},
            {"id": -4}
        ]))
        .unwrap();

        assert_eq!(records[0].id, RecordId::Unsigned(u64::MAX));
        assert_eq!(records[1].id, RecordId::Text("12.5".into()));
        assert_eq!(records[2].id, RecordId::Number(-4));
    }

    #[test]
    fn test_null_id_rejected() {
        let result = serde_json::from_value::<ListingRecord>(json!({"id": null}));
        assert!(result.is_err());
    }

    #[test]
    fn test_extra_page_key_cannot_override_window() {
        let mut query = ListingQuery::new();
        query
            .extra
            .insert("Page".into(), json!({"Limit": 1000, "Offset": 7}));
        query.extra.insert("Language".into(), json!("nl-BE"));

        let body = serde_json::to_value(query.at(50, 100)).unwrap();
        assert_eq!(body["Page"], json!({"Limit": 50, "Offset": 100}));
        assert_eq!(body["Language"], "nl-BE");
    }

    #[test]
    fn test_typed_fields_win_over_extra() {
        let mut query = ListingQuery::new().filter(json!({"CityIds": [9]}));
        query.extra.insert("Filter".into(), json!({"CityIds": [1]}));

        let body = serde_json::to_value(&query).unwrap();
        assert_eq!(body["Filter"], json!({"CityIds": [9]}));
    }

    #[test]
    fn test_search_response_defaults() {
        let response: SearchResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.estates.is_empty());
        assert_eq!(response.total_count, 0);
    }
}
