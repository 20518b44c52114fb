//! Declarative payload schemas.
//!
//! A `Schema` describes the expected shape of a JSON value. Validation walks
//! the value once, collects every issue in document order, and on success
//! returns a normalized copy with defaults filled in. Object keys the schema
//! does not mention are carried through untouched.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single schema violation, located by its path from the payload root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: Vec<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: &[String], message: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            message: message.into(),
        }
    }

    /// Path rendered as `a -> b -> 0`.
    pub fn path_display(&self) -> String {
        self.path.join(" -> ")
    }
}

#[derive(Debug, Clone)]
pub enum Schema {
    Any,
    String(StringSchema),
    Integer { min: Option<(i64, String)> },
    Number { min: Option<(f64, String)> },
    Boolean,
    Enum(Vec<String>),
    Array(Box<Schema>),
    Object(Vec<Field>),
    Nullable(Box<Schema>),
}

impl Schema {
    pub fn string() -> StringSchema {
        StringSchema::default()
    }

    pub fn integer() -> Schema {
        Schema::Integer { min: None }
    }

    pub fn integer_min(min: i64, message: impl Into<String>) -> Schema {
        Schema::Integer {
            min: Some((min, message.into())),
        }
    }

    pub fn number() -> Schema {
        Schema::Number { min: None }
    }

    pub fn enumeration<I, S>(variants: I) -> Schema
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Schema::Enum(variants.into_iter().map(Into::into).collect())
    }

    pub fn array(items: impl Into<Schema>) -> Schema {
        Schema::Array(Box::new(items.into()))
    }

    pub fn object(fields: Vec<Field>) -> Schema {
        Schema::Object(fields)
    }

    pub fn nullable(inner: impl Into<Schema>) -> Schema {
        Schema::Nullable(Box::new(inner.into()))
    }

    /// Validate `value`, returning the normalized value or every issue found.
    pub fn validate(&self, value: &Value) -> Result<Value, Vec<ValidationIssue>> {
        let mut path = Vec::new();
        let mut issues = Vec::new();
        let normalized = self.check(value, &mut path, &mut issues);
        if issues.is_empty() {
            Ok(normalized)
        } else {
            Err(issues)
        }
    }

    fn check(&self, value: &Value, path: &mut Vec<String>, issues: &mut Vec<ValidationIssue>) -> Value {
        match self {
            Schema::Any => value.clone(),
            Schema::String(rules) => match value.as_str() {
                Some(s) => {
                    rules.check(s, path, issues);
                    value.clone()
                }
                None => type_issue("string", value, path, issues),
            },
            Schema::Integer { min } => match value.as_i64() {
                Some(n) => {
                    if let Some((bound, message)) = min {
                        if n < *bound {
                            issues.push(ValidationIssue::new(path, message.clone()));
                        }
                    }
                    value.clone()
                }
                None if value.is_u64() => value.clone(),
                None => type_issue("integer", value, path, issues),
            },
            Schema::Number { min } => match value.as_f64() {
                Some(n) => {
                    if let Some((bound, message)) = min {
                        if n < *bound {
                            issues.push(ValidationIssue::new(path, message.clone()));
                        }
                    }
                    value.clone()
                }
                None => type_issue("number", value, path, issues),
            },
            Schema::Boolean => match value {
                Value::Bool(_) => value.clone(),
                _ => type_issue("boolean", value, path, issues),
            },
            Schema::Enum(variants) => {
                let matched = value
                    .as_str()
                    .is_some_and(|s| variants.iter().any(|v| v == s));
                if !matched {
                    let expected = variants
                        .iter()
                        .map(|v| format!("'{v}'"))
                        .collect::<Vec<_>>()
                        .join(" | ");
                    issues.push(ValidationIssue::new(
                        path,
                        format!("Invalid enum value. Expected {expected}, received {}", describe(value)),
                    ));
                }
                value.clone()
            }
            Schema::Array(items) => match value.as_array() {
                Some(elements) => {
                    let checked = elements
                        .iter()
                        .enumerate()
                        .map(|(index, element)| {
                            path.push(index.to_string());
                            let out = items.check(element, path, issues);
                            path.pop();
                            out
                        })
                        .collect();
                    Value::Array(checked)
                }
                None => type_issue("array", value, path, issues),
            },
            Schema::Object(fields) => match value.as_object() {
                Some(map) => Value::Object(check_fields(fields, map, path, issues)),
                None => type_issue("object", value, path, issues),
            },
            Schema::Nullable(inner) => {
                if value.is_null() {
                    Value::Null
                } else {
                    inner.check(value, path, issues)
                }
            }
        }
    }
}

fn check_fields(
    fields: &[Field],
    map: &Map<String, Value>,
    path: &mut Vec<String>,
    issues: &mut Vec<ValidationIssue>,
) -> Map<String, Value> {
    let mut out = map.clone();
    for field in fields {
        path.push(field.name.clone());
        let present = map.get(&field.name).filter(|v| !v.is_null());
        match (present, &field.presence) {
            (Some(value), _) => {
                let checked = field.schema.check(value, path, issues);
                out.insert(field.name.clone(), checked);
            }
            // Nullable fields may legitimately carry an explicit null.
            (None, Presence::Required) if map.get(&field.name).is_some_and(Value::is_null) => {
                if !matches!(field.schema, Schema::Nullable(_)) {
                    issues.push(ValidationIssue::new(path, "Expected value, received null"));
                }
            }
            (None, Presence::Required) => {
                issues.push(ValidationIssue::new(path, "Required"));
            }
            (None, Presence::Optional) => {}
            (None, Presence::Default(default)) => {
                out.insert(field.name.clone(), default.clone());
            }
        }
        path.pop();
    }
    out
}

fn type_issue(expected: &str, value: &Value, path: &[String], issues: &mut Vec<ValidationIssue>) -> Value {
    issues.push(ValidationIssue::new(
        path,
        format!("Expected {expected}, received {}", kind_of(value)),
    ));
    value.clone()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{s}'"),
        other => kind_of(other).to_string(),
    }
}

#[derive(Debug, Clone)]
pub enum Presence {
    Required,
    Optional,
    Default(Value),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub presence: Presence,
}

impl Field {
    pub fn required(name: &str, schema: impl Into<Schema>) -> Self {
        Self {
            name: name.to_string(),
            schema: schema.into(),
            presence: Presence::Required,
        }
    }

    pub fn optional(name: &str, schema: impl Into<Schema>) -> Self {
        Self {
            name: name.to_string(),
            schema: schema.into(),
            presence: Presence::Optional,
        }
    }

    pub fn with_default(name: &str, schema: impl Into<Schema>, default: Value) -> Self {
        Self {
            name: name.to_string(),
            schema: schema.into(),
            presence: Presence::Default(default),
        }
    }
}

#[derive(Debug, Clone)]
enum StringCheck {
    MinLen(usize, String),
    MaxLen(usize, String),
    Email(String),
    Date(String),
    NotPast(String),
}

/// Builder for string constraints, converted into `Schema::String`.
#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    checks: Vec<StringCheck>,
}

impl StringSchema {
    pub fn min_len(mut self, len: usize, message: impl Into<String>) -> Self {
        self.checks.push(StringCheck::MinLen(len, message.into()));
        self
    }

    pub fn max_len(mut self, len: usize, message: impl Into<String>) -> Self {
        self.checks.push(StringCheck::MaxLen(len, message.into()));
        self
    }

    pub fn email(mut self, message: impl Into<String>) -> Self {
        self.checks.push(StringCheck::Email(message.into()));
        self
    }

    /// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub fn date(mut self, message: impl Into<String>) -> Self {
        self.checks.push(StringCheck::Date(message.into()));
        self
    }

    /// Rejects dates before today (local time). Unparseable input is left to `date`.
    pub fn not_past(mut self, message: impl Into<String>) -> Self {
        self.checks.push(StringCheck::NotPast(message.into()));
        self
    }

    fn check(&self, s: &str, path: &[String], issues: &mut Vec<ValidationIssue>) {
        for check in &self.checks {
            let failed = match check {
                StringCheck::MinLen(len, message) => (s.chars().count() < *len).then_some(message),
                StringCheck::MaxLen(len, message) => (s.chars().count() > *len).then_some(message),
                StringCheck::Email(message) => (!looks_like_email(s)).then_some(message),
                StringCheck::Date(message) => parse_date(s).is_none().then_some(message),
                StringCheck::NotPast(message) => parse_date(s)
                    .is_some_and(|date| date < Local::now().date_naive())
                    .then_some(message),
            };
            if let Some(message) = failed {
                issues.push(ValidationIssue::new(path, message.clone()));
            }
        }
    }
}

impl From<StringSchema> for Schema {
    fn from(rules: StringSchema) -> Self {
        Schema::String(rules)
    }
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !s.chars().any(char::is_whitespace)
        && !domain.contains('@')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person() -> Schema {
        Schema::object(vec![
            Field::required("name", Schema::string().min_len(1, "Name is required")),
            Field::optional("age", Schema::integer_min(0, "Age must be positive")),
            Field::with_default("role", Schema::enumeration(["admin", "member"]), json!("member")),
            Field::optional("tags", Schema::array(Schema::string())),
        ])
    }

    #[test]
    fn valid_object_gets_defaults() {
        let out = person().validate(&json!({"name": "Ann"})).unwrap();
        assert_eq!(out, json!({"name": "Ann", "role": "member"}));
    }

    #[test]
    fn unknown_keys_are_kept() {
        let out = person()
            .validate(&json!({"name": "Ann", "extra": true}))
            .unwrap();
        assert_eq!(out["extra"], true);
    }

    #[test]
    fn missing_required_field_is_reported() {
        let issues = person().validate(&json!({})).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, vec!["name".to_string()]);
        assert_eq!(issues[0].message, "Required");
    }

    #[test]
    fn issues_are_collected_in_order() {
        let issues = person()
            .validate(&json!({"name": "", "age": -1, "role": "owner"}))
            .unwrap_err();
        let paths: Vec<String> = issues.iter().map(ValidationIssue::path_display).collect();
        assert_eq!(paths, vec!["name", "age", "role"]);
        assert_eq!(issues[0].message, "Name is required");
        assert!(issues[2].message.starts_with("Invalid enum value"));
    }

    #[test]
    fn nested_array_paths() {
        let issues = person()
            .validate(&json!({"name": "Ann", "tags": ["ok", 3]}))
            .unwrap_err();
        assert_eq!(issues[0].path_display(), "tags -> 1");
        assert_eq!(issues[0].message, "Expected string, received number");
    }

    #[test]
    fn null_optional_counts_as_absent() {
        let out = person()
            .validate(&json!({"name": "Ann", "age": null}))
            .unwrap();
        assert_eq!(out["age"], Value::Null);
    }

    #[test]
    fn nullable_required_accepts_null() {
        let schema = Schema::object(vec![Field::required(
            "modifiedBy",
            Schema::nullable(Schema::integer()),
        )]);
        assert!(schema.validate(&json!({"modifiedBy": null})).is_ok());
        assert!(schema.validate(&json!({"modifiedBy": 3})).is_ok());
        assert!(schema.validate(&json!({"modifiedBy": "x"})).is_err());
    }

    #[test]
    fn non_object_root() {
        let issues = person().validate(&json!([1])).unwrap_err();
        assert!(issues[0].path.is_empty());
        assert_eq!(issues[0].message, "Expected object, received array");
    }

    #[test]
    fn email_and_dates() {
        let email = Schema::from(Schema::string().email("bad email"));
        assert!(email.validate(&json!("a@b.co")).is_ok());
        assert!(email.validate(&json!("a@b")).is_err());
        assert!(email.validate(&json!("not an email")).is_err());

        let date = Schema::from(Schema::string().date("bad date").not_past("past"));
        assert!(date.validate(&json!("2999-01-01")).is_ok());
        assert!(date.validate(&json!("2999-01-01T10:00:00Z")).is_ok());
        let issues = date.validate(&json!("2000-01-01")).unwrap_err();
        assert_eq!(issues[0].message, "past");
        let issues = date.validate(&json!("someday")).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "bad date");
    }

    #[test]
    fn integers_reject_fractions() {
        let schema = Schema::integer();
        assert!(schema.validate(&json!(3)).is_ok());
        assert!(schema.validate(&json!(3.5)).is_err());
    }
}
