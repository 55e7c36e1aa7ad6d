//! Shaping workflow parameters into Clerk request bodies and query strings.
//!
//! Workflow items use camelCase names, optionally grouped (`additionalFields`, `updateFields`,
//! `filters`, `metadata`). Clerk wants snake_case keys and a few value conversions: comma
//! separated lists become arrays, metadata strings become JSON, dates become RFC 3339 strings in
//! bodies and epoch milliseconds in list filters.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::errors::{Error, Result};

/// Page size used when a list operation does not ask for everything
pub const DEFAULT_LIMIT: usize = 50;

/// Convert camelCase to snake_case. Every uppercase letter starts a new word, so `userID`
/// becomes `user_i_d`.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Convert every top-level key of an object to snake_case. Values are untouched.
pub fn convert_keys_to_snake_case(object: &Map<String, Value>) -> Map<String, Value> {
    object.iter().map(|(k, v)| (to_snake_case(k), v.clone())).collect()
}

/// Drop `null` and empty-string values. `false`, `0` and `[]` are kept.
pub fn clean_object(object: Map<String, Value>) -> Map<String, Value> {
    object
        .into_iter()
        .filter(|(_, v)| !matches!(v, Value::Null) && v.as_str() != Some(""))
        .collect()
}

/// Parse a JSON metadata string. Empty or invalid input yields `None`.
pub fn parse_metadata(raw: Option<&str>) -> Option<Value> {
    let raw = raw.filter(|s| !s.is_empty())?;
    serde_json::from_str(raw).ok()
}

/// Split a comma separated list, trimming each entry.
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.trim().to_string()).collect()
}

/// Parse the date formats workflows commonly produce. Timestamps without an offset are UTC.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0)) {
        return Ok(midnight.and_utc());
    }

    Err(Error::BadRequest {
        message: format!("Invalid date: {raw}"),
    })
}

/// `2024-01-01T00:00:00.000Z`
pub fn to_iso_timestamp(raw: &str) -> Result<String> {
    Ok(parse_date(raw)?.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn to_epoch_millis(raw: &str) -> Result<i64> {
    Ok(parse_date(raw)?.timestamp_millis())
}

/// Loose truthiness used to decide whether an optional field was set at all.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Read access to one workflow item's parameters.
#[derive(Debug, Clone, Copy)]
pub struct OperationParams<'a> {
    item: &'a Map<String, Value>,
}

impl<'a> OperationParams<'a> {
    pub fn new(item: &'a Value) -> Result<Self> {
        match item {
            Value::Object(item) => Ok(Self { item }),
            _ => Err(Error::BadRequest {
                message: "Operation parameters must be a JSON object".to_string(),
            }),
        }
    }

    /// A top-level parameter that must be present and non-null.
    pub fn required(&self, name: &str) -> Result<&'a Value> {
        match self.item.get(name) {
            Some(Value::Null) | None => Err(Error::MissingParameter { name: name.to_string() }),
            Some(value) => Ok(value),
        }
    }

    /// A required identifier: non-empty string, numbers are accepted and stringified.
    pub fn required_id(&self, name: &str) -> Result<String> {
        match self.required(name)? {
            Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Value::Number(n) => Ok(n.to_string()),
            Value::String(_) => Err(Error::MissingParameter { name: name.to_string() }),
            _ => Err(Error::BadRequest {
                message: format!("Parameter \"{name}\" must be a string"),
            }),
        }
    }

    /// A parameter, either top level or inside a named group.
    pub fn get(&self, group: Option<&str>, name: &str) -> Option<&'a Value> {
        match group {
            None => self.item.get(name),
            Some(group) => self.item.get(group)?.as_object()?.get(name),
        }
    }

    /// `returnAll`, defaulting to false.
    pub fn return_all(&self) -> bool {
        self.item.get("returnAll").and_then(Value::as_bool).unwrap_or(false)
    }

    /// `limit`, defaulting to [`DEFAULT_LIMIT`].
    pub fn limit(&self) -> usize {
        self.item
            .get("limit")
            .and_then(Value::as_u64)
            .map(|l| l as usize)
            .unwrap_or(DEFAULT_LIMIT)
    }
}

/// How a parameter value is turned into a request value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Passed through; an optional field is only sent when truthy
    Value,
    /// Passed through whenever present, so `false` and `0` are sent
    Flag,
    /// Comma separated string sent as an array
    Csv,
    /// JSON string sent as a parsed value; unparseable input is dropped
    Metadata,
    /// Date sent as an RFC 3339 string
    IsoDate,
    /// Date sent as epoch milliseconds
    EpochMillis,
}

/// One body or query field of an endpoint.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    group: Option<&'static str>,
    name: &'static str,
    wire: Option<&'static str>,
    kind: FieldKind,
}

impl Field {
    /// Top-level parameter that must be supplied
    pub const fn required(name: &'static str) -> Self {
        Self {
            group: None,
            name,
            wire: None,
            kind: FieldKind::Value,
        }
    }

    /// Optional parameter inside a group such as `additionalFields`
    pub const fn optional(group: &'static str, name: &'static str) -> Self {
        Self {
            group: Some(group),
            name,
            wire: None,
            kind: FieldKind::Value,
        }
    }

    pub const fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Override the snake_case wire name
    pub const fn wire(mut self, wire: &'static str) -> Self {
        self.wire = Some(wire);
        self
    }

    pub fn wire_key(&self) -> String {
        self.wire.map(str::to_string).unwrap_or_else(|| to_snake_case(self.name))
    }

    /// Resolve the field against an item. `Ok(None)` means the field is not sent.
    pub fn extract(&self, params: &OperationParams<'_>) -> Result<Option<Value>> {
        let value = match self.group {
            None => params.required(self.name)?,
            Some(_) => match params.get(self.group, self.name) {
                Some(v) if self.kind == FieldKind::Flag && !v.is_null() => v,
                Some(v) if is_truthy(v) => v,
                _ => return Ok(None),
            },
        };

        self.convert(value)
    }

    fn convert(&self, value: &Value) -> Result<Option<Value>> {
        let converted = match (self.kind, value) {
            (FieldKind::Value | FieldKind::Flag, v) => v.clone(),
            (FieldKind::Csv, Value::String(s)) => Value::from(split_csv(s)),
            (FieldKind::Csv, Value::Array(items)) => Value::Array(items.clone()),
            (FieldKind::Csv, v) => Value::Array(vec![v.clone()]),
            (FieldKind::Metadata, Value::String(s)) => match parse_metadata(Some(s)) {
                Some(parsed) => parsed,
                None => return Ok(None),
            },
            (FieldKind::Metadata, v) => v.clone(),
            (FieldKind::IsoDate, Value::String(s)) => Value::from(to_iso_timestamp(s)?),
            (FieldKind::EpochMillis, Value::String(s)) => Value::from(to_epoch_millis(s)?),
            (FieldKind::EpochMillis, Value::Number(n)) => Value::Number(n.clone()),
            (FieldKind::IsoDate | FieldKind::EpochMillis, _) => {
                return Err(Error::BadRequest {
                    message: format!("Parameter \"{}\" must be a date string", self.name),
                });
            }
        };
        Ok(Some(converted))
    }
}

/// Build a JSON object from a list of fields.
pub fn build_object(fields: &[Field], params: &OperationParams<'_>) -> Result<Map<String, Value>> {
    let mut object = Map::new();
    for field in fields {
        if let Some(value) = field.extract(params)? {
            object.insert(field.wire_key(), value);
        }
    }
    Ok(object)
}

/// Flatten a query object into `(key, value)` pairs. Arrays repeat their key.
pub fn to_query_pairs(query: &Map<String, Value>) -> Vec<(String, String)> {
    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    let mut pairs = Vec::new();
    for (key, value) in query {
        match value {
            Value::Array(items) => pairs.extend(items.iter().filter_map(scalar).map(|v| (key.clone(), v))),
            other => pairs.extend(scalar(other).map(|v| (key.clone(), v))),
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_parse_metadata() {
        assert_eq!(
            parse_metadata(Some(r#"{"key": "value", "number": 42}"#)),
            Some(json!({"key": "value", "number": 42}))
        );
        assert_eq!(parse_metadata(Some(r#"{"nested": {"key": "value"}}"#)), Some(json!({"nested": {"key": "value"}})));
        assert_eq!(parse_metadata(Some(r#"{"items": [1, 2, 3]}"#)), Some(json!({"items": [1, 2, 3]})));
        assert_eq!(parse_metadata(Some(r#"{"value": null}"#)), Some(json!({"value": null})));
        assert_eq!(parse_metadata(Some("")), None);
        assert_eq!(parse_metadata(None), None);
        assert_eq!(parse_metadata(Some("not valid json")), None);
    }

    #[test]
    fn test_clean_object() {
        let cleaned = clean_object(object(json!({"a": 1, "b": null, "c": "test", "d": ""})));
        assert_eq!(Value::Object(cleaned), json!({"a": 1, "c": "test"}));

        let kept = clean_object(object(json!({"a": false, "b": 0, "c": []})));
        assert_eq!(Value::Object(kept), json!({"a": false, "b": 0, "c": []}));

        assert!(clean_object(object(json!({"a": null, "b": ""}))).is_empty());
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("firstName"), "first_name");
        assert_eq!(to_snake_case("emailAddress"), "email_address");
        assert_eq!(to_snake_case("primaryWeb3WalletId"), "primary_web3_wallet_id");
        assert_eq!(to_snake_case("name"), "name");
        assert_eq!(to_snake_case(""), "");
        assert_eq!(to_snake_case("userID"), "user_i_d");
    }

    #[test]
    fn test_convert_keys_to_snake_case() {
        let converted = convert_keys_to_snake_case(&object(json!({
            "userId": 123,
            "isActive": true,
            "tags": ["a", "b"],
        })));
        assert_eq!(
            Value::Object(converted),
            json!({"user_id": 123, "is_active": true, "tags": ["a", "b"]})
        );
        assert!(convert_keys_to_snake_case(&Map::new()).is_empty());
    }

    #[test]
    fn test_split_csv() {
        assert_eq!(split_csv("a@x.com, b@x.com ,c@x.com"), vec!["a@x.com", "b@x.com", "c@x.com"]);
        assert_eq!(split_csv("single"), vec!["single"]);
    }

    #[test]
    fn test_dates() {
        assert_eq!(to_iso_timestamp("2024-01-01").unwrap(), "2024-01-01T00:00:00.000Z");
        assert_eq!(to_iso_timestamp("2024-01-01T10:30:00").unwrap(), "2024-01-01T10:30:00.000Z");
        assert_eq!(to_iso_timestamp("2024-01-01T12:00:00+02:00").unwrap(), "2024-01-01T10:00:00.000Z");
        assert_eq!(to_epoch_millis("2024-01-01T00:00:00Z").unwrap(), 1_704_067_200_000);
        assert!(matches!(to_epoch_millis("last tuesday"), Err(Error::BadRequest { .. })));
    }

    #[test]
    fn test_required_parameters() {
        let item = json!({"userId": "user_1", "count": 3, "empty": "", "nothing": null});
        let params = OperationParams::new(&item).unwrap();

        assert_eq!(params.required_id("userId").unwrap(), "user_1");
        assert_eq!(params.required_id("count").unwrap(), "3");
        assert!(matches!(params.required_id("empty"), Err(Error::MissingParameter { .. })));
        assert!(matches!(params.required("nothing"), Err(Error::MissingParameter { .. })));
        assert!(matches!(params.required("absent"), Err(Error::MissingParameter { .. })));
    }

    #[test]
    fn test_params_must_be_object() {
        assert!(matches!(OperationParams::new(&json!([1, 2])), Err(Error::BadRequest { .. })));
    }

    #[test]
    fn test_paging_defaults() {
        let item = json!({});
        let params = OperationParams::new(&item).unwrap();
        assert!(!params.return_all());
        assert_eq!(params.limit(), DEFAULT_LIMIT);

        let item = json!({"returnAll": true, "limit": 7});
        let params = OperationParams::new(&item).unwrap();
        assert!(params.return_all());
        assert_eq!(params.limit(), 7);
    }

    #[test]
    fn test_build_object_optional_semantics() {
        let fields = [
            Field::required("name"),
            Field::optional("additionalFields", "slug"),
            Field::optional("additionalFields", "maxAllowedMemberships"),
            Field::optional("additionalFields", "adminDeleteEnabled").kind(FieldKind::Flag),
            Field::optional("additionalFields", "emailAddress").kind(FieldKind::Csv),
            Field::optional("additionalFields", "publicMetadata").kind(FieldKind::Metadata),
            Field::optional("additionalFields", "privateMetadata").kind(FieldKind::Metadata),
            Field::optional("additionalFields", "createdAt").kind(FieldKind::IsoDate),
        ];
        let item = json!({
            "name": "Acme",
            "additionalFields": {
                "slug": "",
                "maxAllowedMemberships": 0,
                "adminDeleteEnabled": false,
                "emailAddress": "a@x.com, b@x.com",
                "publicMetadata": "{\"plan\": \"pro\"}",
                "privateMetadata": "{broken",
                "createdAt": "2024-01-01"
            }
        });

        let body = build_object(&fields, &OperationParams::new(&item).unwrap()).unwrap();
        assert_eq!(
            Value::Object(body),
            json!({
                "name": "Acme",
                "admin_delete_enabled": false,
                "email_address": ["a@x.com", "b@x.com"],
                "public_metadata": {"plan": "pro"},
                "created_at": "2024-01-01T00:00:00.000Z"
            })
        );
    }

    #[test]
    fn test_build_object_missing_required() {
        let fields = [Field::required("name")];
        let item = json!({"additionalFields": {}});
        let err = build_object(&fields, &OperationParams::new(&item).unwrap()).unwrap_err();
        assert!(matches!(err, Error::MissingParameter { name } if name == "name"));
    }

    #[test]
    fn test_wire_override() {
        let field = Field::required("invitationIds").kind(FieldKind::Csv).wire("organization_invitation_id");
        assert_eq!(field.wire_key(), "organization_invitation_id");
        assert_eq!(Field::required("createdBy").wire_key(), "created_by");
    }

    #[test]
    fn test_query_pairs_repeat_array_keys() {
        let query = object(json!({"user_id": ["u1", "u2"], "limit": 10, "include_members_count": true, "skip": null}));
        let pairs = to_query_pairs(&query);
        assert_eq!(
            pairs,
            vec![
                ("user_id".to_string(), "u1".to_string()),
                ("user_id".to_string(), "u2".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("include_members_count".to_string(), "true".to_string()),
            ]
        );
    }
}
