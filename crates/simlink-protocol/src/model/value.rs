//! Field values and the ordered field map that carries every command.
//!
//! The wire form is JSON. Dates and date-times are encoded as objects with
//! capitalised calendar keys; on decode, any object with `Year`, `Month` and
//! `Day` becomes a date, or a date-time when `Spec`, `Hour`, `Minute` and
//! `Second` are also present. Every other object stays a [`FieldMap`], which
//! is how nested commands and opaque values such as coordinates travel.

use std::fmt;

use serde_json::{Map, Number, Value};
use time::{Date, Month, PrimitiveDateTime, Time};

use crate::error::ProtocolError;

const YEAR: &str = "Year";
const MONTH: &str = "Month";
const DAY: &str = "Day";
const SPEC: &str = "Spec";
const HOUR: &str = "Hour";
const MINUTE: &str = "Minute";
const SECOND: &str = "Second";
const UTC_SPEC: &str = "UTC";

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// JSON `null`.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer or floating point number, kept exactly as decoded.
    Number(Number),
    /// Text.
    String(String),
    /// Ordered list.
    Array(Vec<FieldValue>),
    /// Calendar date.
    Date(Date),
    /// UTC date and time with second resolution.
    DateTime(PrimitiveDateTime),
    /// Nested field map (nested commands and opaque structured values).
    Map(FieldMap),
}

impl FieldValue {
    /// Returns the text when the value is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Returns the boolean when the value is one.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Returns the value as `i64` when it is an integral number.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(number) => number.as_i64(),
            _ => None,
        }
    }

    /// Returns the value as `f64` when it is numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(number) => number.as_f64(),
            _ => None,
        }
    }

    /// Returns the date-time when the value is one.
    #[must_use]
    pub const fn as_date_time(&self) -> Option<PrimitiveDateTime> {
        match self {
            Self::DateTime(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the date when the value is one.
    #[must_use]
    pub const fn as_date(&self) -> Option<Date> {
        match self {
            Self::Date(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the nested map when the value is one.
    #[must_use]
    pub const fn as_map(&self) -> Option<&FieldMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    fn to_json_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(flag) => Value::Bool(*flag),
            Self::Number(number) => Value::Number(number.clone()),
            Self::String(text) => Value::String(text.clone()),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json_value).collect()),
            Self::Date(date) => Value::Object(date_object(*date)),
            Self::DateTime(date_time) => {
                let mut object = Map::new();
                object.insert(SPEC.to_owned(), Value::String(UTC_SPEC.to_owned()));
                object.extend(date_object(date_time.date()));
                object.insert(HOUR.to_owned(), Value::from(date_time.hour()));
                object.insert(MINUTE.to_owned(), Value::from(date_time.minute()));
                object.insert(SECOND.to_owned(), Value::from(date_time.second()));
                Value::Object(object)
            }
            Self::Map(map) => Value::Object(map.to_json_object()),
        }
    }

    fn from_json_value(value: Value) -> Result<Self, ProtocolError> {
        Ok(match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => Self::Number(number),
            Value::String(text) => Self::String(text),
            Value::Array(items) => Self::Array(
                items
                    .into_iter()
                    .map(Self::from_json_value)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(object) => decode_object(object)?,
        })
    }
}

fn date_object(date: Date) -> Map<String, Value> {
    let mut object = Map::new();
    object.insert(YEAR.to_owned(), Value::from(date.year()));
    object.insert(MONTH.to_owned(), Value::from(u8::from(date.month())));
    object.insert(DAY.to_owned(), Value::from(date.day()));
    object
}

fn decode_object(object: Map<String, Value>) -> Result<FieldValue, ProtocolError> {
    let is_date = [YEAR, MONTH, DAY].iter().all(|key| object.contains_key(*key));
    if !is_date {
        return FieldMap::from_json_object(object).map(FieldValue::Map);
    }

    let date = Date::from_calendar_date(
        calendar_field(&object, YEAR)?,
        Month::try_from(calendar_field::<u8>(&object, MONTH)?)
            .map_err(|error| ProtocolError::parse(format!("invalid month: {error}")))?,
        calendar_field(&object, DAY)?,
    )
    .map_err(|error| ProtocolError::parse(format!("invalid date: {error}")))?;

    let is_date_time = [SPEC, HOUR, MINUTE, SECOND]
        .iter()
        .all(|key| object.contains_key(*key));
    if !is_date_time {
        return Ok(FieldValue::Date(date));
    }

    let time = Time::from_hms(
        calendar_field(&object, HOUR)?,
        calendar_field(&object, MINUTE)?,
        calendar_field(&object, SECOND)?,
    )
    .map_err(|error| ProtocolError::parse(format!("invalid time: {error}")))?;
    Ok(FieldValue::DateTime(PrimitiveDateTime::new(date, time)))
}

fn calendar_field<T: TryFrom<i64>>(
    object: &Map<String, Value>,
    key: &str,
) -> Result<T, ProtocolError> {
    object
        .get(key)
        .and_then(Value::as_i64)
        .and_then(|raw| T::try_from(raw).ok())
        .ok_or_else(|| ProtocolError::parse(format!("date field '{key}' is not a valid integer")))
}

impl fmt::Display for FieldValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => formatter.write_str("null"),
            Self::Bool(flag) => write!(formatter, "{flag}"),
            Self::Number(number) => write!(formatter, "{number}"),
            Self::String(text) => formatter.write_str(text),
            Self::Array(items) => {
                formatter.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        formatter.write_str(", ")?;
                    }
                    write!(formatter, "{item}")?;
                }
                formatter.write_str("]")
            }
            Self::Date(date) => write!(formatter, "{date}"),
            Self::DateTime(date_time) => write!(
                formatter,
                "{} {:02}:{:02}:{:02}",
                date_time.date(),
                date_time.hour(),
                date_time.minute(),
                date_time.second()
            ),
            Self::Map(map) => write!(formatter, "{map}"),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::Number(Number::from(value))
    }
}

/// Non-finite floats have no JSON form and become [`FieldValue::Null`].
impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Date> for FieldValue {
    fn from(value: Date) -> Self {
        Self::Date(value)
    }
}

impl From<PrimitiveDateTime> for FieldValue {
    fn from(value: PrimitiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<FieldMap> for FieldValue {
    fn from(value: FieldMap) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<Self>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        Self::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Insertion-ordered mapping from field name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, FieldValue)>,
}

impl FieldMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Looks up a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Returns `true` when the field is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Sets a field, replacing an existing value in place.
    ///
    /// Returns the previous value when the field already existed.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        let name: String = key.into();
        let field = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, field)),
            None => {
                self.entries.push((name, field));
                None
            }
        }
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        let index = self.entries.iter().position(|(name, _)| name == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Iterates over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the map has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes the map as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Parse`] if serialisation fails.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(&Value::Object(self.to_json_object()))
            .map_err(|error| ProtocolError::json("failed to encode field map", error))
    }

    /// Decodes JSON text into a map.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Parse`] for malformed JSON, a top-level value
    /// that is not an object, or an out-of-range date.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(object)) => Self::from_json_object(object),
            Ok(other) => Err(ProtocolError::parse(format!(
                "expected an object, found {}",
                json_type_name(&other)
            ))),
            Err(error) => Err(ProtocolError::json("malformed payload", error)),
        }
    }

    fn to_json_object(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json_value()))
            .collect()
    }

    fn from_json_object(object: Map<String, Value>) -> Result<Self, ProtocolError> {
        let entries = object
            .into_iter()
            .map(|(name, value)| FieldValue::from_json_value(value).map(|decoded| (name, decoded)))
            .collect::<Result<_, _>>()?;
        Ok(Self { entries })
    }
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl fmt::Display for FieldMap {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("{")?;
        for (index, (name, value)) in self.entries.iter().enumerate() {
            if index > 0 {
                formatter.write_str(", ")?;
            }
            write!(formatter, "{name}: {value}")?;
        }
        formatter.write_str("}")
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
