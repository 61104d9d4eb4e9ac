//! Typed records for the upstream collections.
//!
//! Records are decoded at the boundary. Upstream sends ids as integers or
//! strings, amounts as numbers or numeric strings, and the cancellation flag
//! as a MySQL BIT buffer, so decoding is lenient: odd values degrade to
//! defaults instead of failing the whole page.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A collection served under `items/{NAME}` on the data API.
pub trait UpstreamCollection: DeserializeOwned {
    /// Collection name as it appears in the URL
    const NAME: &'static str;
}

/// Entity identifier as sent by upstream.
///
/// Integer and string forms of the same value are equal, so a detail that
/// references `"12"` joins against a header whose id is `12`. The original
/// form is kept for serialization.
#[derive(Debug, Clone)]
pub enum RecordKey {
    Int(i64),
    Text(String),
}

impl RecordKey {
    pub fn canonical(&self) -> Cow<'_, str> {
        match self {
            RecordKey::Int(i) => Cow::Owned(i.to_string()),
            RecordKey::Text(s) => Cow::Borrowed(s.trim()),
        }
    }

    fn from_json(value: Value) -> Result<Option<Self>, String> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(Some(
                n.as_i64()
                    .map(RecordKey::Int)
                    .unwrap_or_else(|| RecordKey::Text(n.to_string())),
            )),
            Value::String(s) => Ok(Some(RecordKey::Text(s))),
            // Expanded relation (`fields=*.*`): use the related record's id
            Value::Object(mut map) => match map.remove("id") {
                Some(id) => RecordKey::from_json(id),
                None => Err("related object without an 'id' field".to_string()),
            },
            other => Err(format!("expected an integer or string key, got {}", other)),
        }
    }
}

impl PartialEq for RecordKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for RecordKey {}

impl Hash for RecordKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Int(i) => write!(f, "{}", i),
            RecordKey::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RecordKey {
    fn from(value: i64) -> Self {
        RecordKey::Int(value)
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        RecordKey::Text(value.to_string())
    }
}

impl Serialize for RecordKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecordKey::Int(i) => serializer.serialize_i64(*i),
            RecordKey::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for RecordKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        RecordKey::from_json(value)
            .map_err(D::Error::custom)?
            .ok_or_else(|| D::Error::custom("key must not be null"))
    }
}

fn optional_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<RecordKey>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    RecordKey::from_json(value).map_err(D::Error::custom)
}

/// Cancellation state of a collection header.
///
/// Only an explicit zero/false counts as active. An absent or malformed flag
/// is `Unknown` and is treated like a cancelled header by the join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationFlag {
    Active,
    Cancelled,
    #[default]
    Unknown,
}

impl CancellationFlag {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(cancelled) => Self::from_bool(*cancelled),
            Value::Number(n) => match n.as_f64() {
                Some(f) => Self::from_bool(f != 0.0),
                None => CancellationFlag::Unknown,
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "0" | "false" => CancellationFlag::Active,
                "1" | "true" => CancellationFlag::Cancelled,
                _ => CancellationFlag::Unknown,
            },
            // {"type": "Buffer", "data": [0]}
            Value::Object(map) => match map.get("data").and_then(Value::as_array) {
                Some(bytes) => match bytes.first().and_then(Value::as_u64) {
                    Some(bit) => Self::from_bool(bit != 0),
                    None => CancellationFlag::Unknown,
                },
                None => CancellationFlag::Unknown,
            },
            Value::Array(_) | Value::Null => CancellationFlag::Unknown,
        }
    }

    fn from_bool(cancelled: bool) -> Self {
        if cancelled {
            CancellationFlag::Cancelled
        } else {
            CancellationFlag::Active
        }
    }
}

impl<'de> Deserialize<'de> for CancellationFlag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(CancellationFlag::from_json(&value))
    }
}

/// Numeric coercion with a zero fallback.
///
/// Numbers pass through, numeric strings are parsed, everything else is 0.
pub fn coerce_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .unwrap_or(0.0),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => 0.0,
    }
}

/// Integer coercion with a zero fallback; fractional values truncate.
pub fn coerce_i64(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or_else(|| coerce_f64(value) as i64),
        _ => coerce_f64(value) as i64,
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(coerce_f64(&Value::deserialize(deserializer)?))
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(coerce_i64(&Value::deserialize(deserializer)?))
}

/// Text field that upstream sometimes sends as a number.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Header row of `items/collection`
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionHeader {
    /// Headers without an id cannot be joined and are left out of lookups
    #[serde(default, deserialize_with = "optional_key")]
    pub id: Option<RecordKey>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub collection_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub collection_date: Option<String>,
    #[serde(default, deserialize_with = "optional_key")]
    pub salesman_id: Option<RecordKey>,
    #[serde(default, rename = "isCancelled")]
    pub is_cancelled: CancellationFlag,
}

impl UpstreamCollection for CollectionHeader {
    const NAME: &'static str = "collection";
}

/// Line row of `items/collection_details`
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionDetail {
    #[serde(default, deserialize_with = "optional_key")]
    pub id: Option<RecordKey>,
    #[serde(default, deserialize_with = "optional_key")]
    pub collection_id: Option<RecordKey>,
    #[serde(default, deserialize_with = "optional_key")]
    pub customer_code: Option<RecordKey>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
}

impl UpstreamCollection for CollectionDetail {
    const NAME: &'static str = "collection_details";
}

/// Row of `items/customer`
#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default, deserialize_with = "optional_key")]
    pub customer_code: Option<RecordKey>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer_name: Option<String>,
}

impl UpstreamCollection for Customer {
    const NAME: &'static str = "customer";
}

/// Row of `items/salesman`
#[derive(Debug, Clone, Deserialize)]
pub struct Salesman {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub salesman_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub salesman_name: Option<String>,
}

impl UpstreamCollection for Salesman {
    const NAME: &'static str = "salesman";
}

pub const USER_PASSWORD_FIELD: &str = "user_password";
pub const USER_EMAIL_FIELD: &str = "user_email";

/// Row of `items/user`, kept as a free-form object because the login
/// response echoes it back minus the password.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct UserRecord(pub Map<String, Value>);

impl UpstreamCollection for UserRecord {
    const NAME: &'static str = "user";
}

impl UserRecord {
    pub fn email(&self) -> Option<&str> {
        self.0.get(USER_EMAIL_FIELD).and_then(Value::as_str)
    }

    /// Plaintext comparison against the stored password.
    pub fn matches(&self, email: &str, password: &str) -> bool {
        self.email() == Some(email)
            && self.0.get(USER_PASSWORD_FIELD).and_then(Value::as_str) == Some(password)
    }

    /// The record without its password field.
    pub fn into_public(mut self) -> Map<String, Value> {
        self.0.remove(USER_PASSWORD_FIELD);
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_key_int_and_string_are_equal() {
        let a: RecordKey = serde_json::from_value(json!(12)).unwrap();
        let b: RecordKey = serde_json::from_value(json!("12")).unwrap();

        assert_eq!(a, b);
        assert_eq!(serde_json::to_value(&a).unwrap(), json!(12));
        assert_eq!(serde_json::to_value(&b).unwrap(), json!("12"));
    }

    #[test]
    fn test_record_key_from_expanded_relation() {
        let key: RecordKey = serde_json::from_value(json!({"id": 7, "collection_no": "C-7"})).unwrap();
        assert_eq!(key, RecordKey::Int(7));
    }

    #[test]
    fn test_record_key_rejects_bool() {
        assert!(serde_json::from_value::<RecordKey>(json!(true)).is_err());
    }

    #[test]
    fn test_cancellation_flag_buffer() {
        assert_eq!(
            CancellationFlag::from_json(&json!({"type": "Buffer", "data": [0]})),
            CancellationFlag::Active
        );
        assert_eq!(
            CancellationFlag::from_json(&json!({"type": "Buffer", "data": [1]})),
            CancellationFlag::Cancelled
        );
        assert_eq!(
            CancellationFlag::from_json(&json!({"type": "Buffer", "data": []})),
            CancellationFlag::Unknown
        );
    }

    #[test]
    fn test_cancellation_flag_scalars() {
        assert_eq!(CancellationFlag::from_json(&json!(false)), CancellationFlag::Active);
        assert_eq!(CancellationFlag::from_json(&json!(1)), CancellationFlag::Cancelled);
        assert_eq!(CancellationFlag::from_json(&json!("0")), CancellationFlag::Active);
        assert_eq!(CancellationFlag::from_json(&json!(null)), CancellationFlag::Unknown);
    }

    #[test]
    fn test_header_without_flag_is_unknown() {
        let header: CollectionHeader = serde_json::from_value(json!({"id": 1})).unwrap();
        assert_eq!(header.is_cancelled, CancellationFlag::Unknown);
        assert!(header.salesman_id.is_none());
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(coerce_f64(&json!(12.5)), 12.5);
        assert_eq!(coerce_f64(&json!(" 40.25 ")), 40.25);
        assert_eq!(coerce_f64(&json!("n/a")), 0.0);
        assert_eq!(coerce_f64(&json!(null)), 0.0);
        assert_eq!(coerce_i64(&json!("17")), 17);
        assert_eq!(coerce_i64(&json!(3.9)), 3);
    }

    #[test]
    fn test_detail_decodes_lenient_amount() {
        let detail: CollectionDetail = serde_json::from_value(json!({
            "id": "d-1",
            "collection_id": 4,
            "customer_code": "CUST-9",
            "amount": "1500.75"
        }))
        .unwrap();

        assert_eq!(detail.amount, 1500.75);
        assert_eq!(detail.collection_id, Some(RecordKey::Int(4)));

        let missing: CollectionDetail = serde_json::from_value(json!({"id": 2, "amount": null})).unwrap();
        assert_eq!(missing.amount, 0.0);
        assert!(missing.customer_code.is_none());
    }

    #[test]
    fn test_records_without_id_still_decode() {
        let details: Vec<CollectionDetail> = serde_json::from_value(json!([
            {"id": 1, "collection_id": 8, "amount": 3},
            {"collection_id": 8, "amount": 7},
            {"id": null, "collection_id": 8}
        ]))
        .unwrap();

        assert_eq!(details.len(), 3);
        assert_eq!(details[0].id, Some(RecordKey::Int(1)));
        assert!(details[1].id.is_none());
        assert_eq!(details[1].amount, 7.0);
        assert!(details[2].id.is_none());

        let header: CollectionHeader =
            serde_json::from_value(json!({"id": null, "isCancelled": false})).unwrap();
        assert!(header.id.is_none());
        assert_eq!(header.is_cancelled, CancellationFlag::Active);
    }

    #[test]
    fn test_customer_name_accepts_number() {
        let customer: Customer =
            serde_json::from_value(json!({"id": "31", "customer_code": 100, "customer_name": 2024}))
                .unwrap();
        assert_eq!(customer.id, 31);
        assert_eq!(customer.customer_name.as_deref(), Some("2024"));
    }

    #[test]
    fn test_user_record_strips_password() {
        let user: UserRecord = serde_json::from_value(json!({
            "id": 1,
            "user_email": "a@b.com",
            "user_password": "x"
        }))
        .unwrap();

        assert!(user.matches("a@b.com", "x"));
        assert!(!user.matches("a@b.com", "y"));

        let public = user.into_public();
        assert!(!public.contains_key(USER_PASSWORD_FIELD));
        assert_eq!(public.get("user_email"), Some(&json!("a@b.com")));
    }
}
