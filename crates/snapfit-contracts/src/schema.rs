use serde_json::{Map, Value};
use thiserror::Error;

use crate::result::Level;

/// A payload that did not match the shape its consumer expects.
///
/// `path` is a dotted path from the payload root, with array indices in
/// brackets (`records[0]._tags.Color[1].prob`). The root itself is `$`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema mismatch at `{path}`: expected {expected}, found {found}")]
pub struct SchemaError {
    pub path: String,
    pub expected: String,
    pub found: String,
}

impl SchemaError {
    pub fn new(path: &str, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            path: display_path(path),
            expected: expected.into(),
            found: found.into(),
        }
    }

    fn mismatch(path: &str, expected: impl Into<String>, value: &Value) -> Self {
        Self::new(path, expected, describe(value))
    }
}

/// Strict narrowing of an untyped JSON value into a typed shape.
///
/// Implementations must not coerce: a number never satisfies a string field,
/// and nullable fields must be present (holding `null` or the declared type).
pub trait FromJson: Sized {
    fn from_json_at(value: &Value, path: &str) -> Result<Self, SchemaError>;

    fn from_json(value: &Value) -> Result<Self, SchemaError> {
        Self::from_json_at(value, "")
    }
}

/// Field accessor over one JSON object, tracking the path for error reports.
#[derive(Debug, Clone, Copy)]
pub struct ObjectReader<'a> {
    path: &'a str,
    fields: &'a Map<String, Value>,
}

impl<'a> ObjectReader<'a> {
    pub fn new(value: &'a Value, path: &'a str) -> Result<Self, SchemaError> {
        let Some(fields) = value.as_object() else {
            return Err(SchemaError::mismatch(path, "object", value));
        };
        Ok(Self { path, fields })
    }

    pub fn path(&self) -> &str {
        self.path
    }

    pub fn field(&self, key: &str) -> Result<&'a Value, SchemaError> {
        self.fields
            .get(key)
            .ok_or_else(|| SchemaError::new(&join_path(self.path, key), "required field", "nothing"))
    }

    pub fn string(&self, key: &str) -> Result<String, SchemaError> {
        let value = self.field(key)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SchemaError::mismatch(&join_path(self.path, key), "string", value))
    }

    pub fn non_empty_string(&self, key: &str) -> Result<String, SchemaError> {
        let text = self.string(key)?;
        if text.trim().is_empty() {
            return Err(SchemaError::new(
                &join_path(self.path, key),
                "non-empty string",
                "empty string",
            ));
        }
        Ok(text)
    }

    /// The key must be present; `null` maps to `None`.
    pub fn nullable_string(&self, key: &str) -> Result<Option<String>, SchemaError> {
        match self.field(key)? {
            Value::Null => Ok(None),
            Value::String(text) => Ok(Some(text.clone())),
            other => Err(SchemaError::mismatch(
                &join_path(self.path, key),
                "string or null",
                other,
            )),
        }
    }

    pub fn boolean(&self, key: &str) -> Result<bool, SchemaError> {
        let value = self.field(key)?;
        value
            .as_bool()
            .ok_or_else(|| SchemaError::mismatch(&join_path(self.path, key), "boolean", value))
    }

    pub fn number(&self, key: &str) -> Result<f64, SchemaError> {
        let value = self.field(key)?;
        value
            .as_f64()
            .ok_or_else(|| SchemaError::mismatch(&join_path(self.path, key), "number", value))
    }

    pub fn probability(&self, key: &str) -> Result<f64, SchemaError> {
        let value = self.number(key)?;
        if !(0.0..=1.0).contains(&value) {
            return Err(SchemaError::new(
                &join_path(self.path, key),
                "number between 0 and 1",
                value.to_string(),
            ));
        }
        Ok(value)
    }

    pub fn array(&self, key: &str) -> Result<&'a [Value], SchemaError> {
        let value = self.field(key)?;
        value
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| SchemaError::mismatch(&join_path(self.path, key), "array", value))
    }

    /// Absent keys map to `None`; a present key must hold an array.
    pub fn optional_array(&self, key: &str) -> Result<Option<&'a [Value]>, SchemaError> {
        if !self.fields.contains_key(key) {
            return Ok(None);
        }
        self.array(key).map(Some)
    }

    pub fn level(&self, key: &str, allowed: &[Level]) -> Result<Level, SchemaError> {
        let path = join_path(self.path, key);
        let expected = format!(
            "one of {}",
            allowed
                .iter()
                .map(|level| level.as_str())
                .collect::<Vec<&str>>()
                .join("|")
        );
        let value = self.field(key)?;
        let Some(label) = value.as_str() else {
            return Err(SchemaError::mismatch(&path, expected, value));
        };
        Level::parse(label)
            .filter(|level| allowed.contains(level))
            .ok_or_else(|| SchemaError::new(&path, expected, format!("\"{label}\"")))
    }

    pub fn parse<T: FromJson>(&self, key: &str) -> Result<T, SchemaError> {
        let value = self.field(key)?;
        T::from_json_at(value, &join_path(self.path, key))
    }
}

pub fn join_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{base}.{key}")
    }
}

pub fn index_path(base: &str, index: usize) -> String {
    format!("{}[{index}]", display_path(base))
}

pub fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(number) => format!("number {number}"),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "$".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{index_path, ObjectReader, SchemaError};
    use crate::result::Level;

    #[test]
    fn string_field_rejects_number_without_coercion() {
        let value = json!({"color": 7});
        let reader = ObjectReader::new(&value, "").unwrap();
        let err = reader.string("color").unwrap_err();
        assert_eq!(err.path, "color");
        assert_eq!(err.expected, "string");
        assert_eq!(err.found, "number 7");
    }

    #[test]
    fn nullable_field_must_be_present() {
        let value = json!({"material": null});
        let reader = ObjectReader::new(&value, "").unwrap();
        assert_eq!(reader.nullable_string("material"), Ok(None));

        let err = reader.nullable_string("productName").unwrap_err();
        assert_eq!(err.path, "productName");
        assert_eq!(err.expected, "required field");
    }

    #[test]
    fn nullable_field_keeps_empty_string_distinct_from_null() {
        let value = json!({"material": ""});
        let reader = ObjectReader::new(&value, "").unwrap();
        assert_eq!(reader.nullable_string("material"), Ok(Some(String::new())));
    }

    #[test]
    fn level_outside_allowed_set_names_the_path() {
        let value = json!({"confidence": {"brand": "unsure", "material": "none"}});
        let root = ObjectReader::new(&value, "").unwrap();
        let confidence = root.field("confidence").unwrap();
        let reader = ObjectReader::new(confidence, "confidence").unwrap();

        let err = reader.level("brand", &Level::ALL).unwrap_err();
        assert_eq!(err.path, "confidence.brand");
        assert_eq!(err.found, "\"unsure\"");
        assert!(err.to_string().contains("one of high|medium|low|none"));

        let err = reader.level("material", &Level::GRADED).unwrap_err();
        assert_eq!(err.path, "confidence.material");
    }

    #[test]
    fn level_is_case_sensitive() {
        let value = json!({"brand": "High"});
        let reader = ObjectReader::new(&value, "").unwrap();
        assert!(reader.level("brand", &Level::ALL).is_err());
    }

    #[test]
    fn probability_must_stay_in_unit_interval() {
        let value = json!({"prob": 1.5});
        let reader = ObjectReader::new(&value, "records[0]").unwrap();
        let err = reader.probability("prob").unwrap_err();
        assert_eq!(err.path, "records[0].prob");
    }

    #[test]
    fn root_type_errors_use_dollar_path() {
        let value = json!([1, 2]);
        let err = ObjectReader::new(&value, "").unwrap_err();
        assert_eq!(
            err,
            SchemaError {
                path: "$".to_string(),
                expected: "object".to_string(),
                found: "array".to_string(),
            }
        );
        assert_eq!(index_path("", 2), "$[2]");
        assert_eq!(index_path("records", 0), "records[0]");
    }
}
