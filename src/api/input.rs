//! Request bodies and queries, validated by declarative field rules.
//!
//! Every body is decoded into loosely typed JSON fields first, so that a
//! wrong enum value or a mistyped field becomes a readable message instead of
//! a decoding failure. The [`Input::normalize`] step then turns the checked
//! values into domain types.

use std::{borrow::Cow, str::FromStr};

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::db::{
    self,
    ticket::{Priority, Status},
};

const TITLE_MAX_LEN: usize = 255;

const BODY_NOT_OBJECT: &str = r#""value" must be of type object"#;
const TITLE_REQUIRED: &str = r#""title" is required"#;
const TITLE_NOT_STRING: &str = r#""title" must be a string"#;
const TITLE_EMPTY: &str = r#""title" is not allowed to be empty"#;
const TITLE_TOO_LONG: &str =
    r#""title" length must be less than or equal to 255 characters long"#;
const DESCRIPTION_REQUIRED: &str = r#""description" is required"#;
const DESCRIPTION_EMPTY: &str = r#""description" is not allowed to be empty"#;
const DESCRIPTION_NOT_STRING: &str = r#""description" must be a string"#;
const PRIORITY_UNKNOWN: &str =
    r#""priority" must be one of [Low, Medium, High]"#;
const PRIORITY_NOT_STRING: &str = r#""priority" must be a string"#;
const STATUS_UNKNOWN: &str =
    r#""status" must be one of [Open, In Progress, Closed]"#;
const STATUS_NOT_STRING: &str = r#""status" must be a string"#;

/// Non-empty list of human-readable constraint violations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Invalid(pub Vec<String>);

impl Invalid {
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    /// Flattens `errors` into messages, ordered as `fields` lists them.
    fn collect(errors: &ValidationErrors, fields: &[&str]) -> Self {
        let by_field = errors.field_errors();
        let messages = fields
            .iter()
            .filter_map(|field| by_field.get(*field).map(|errs| (field, errs)))
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!(r#""{field}" is invalid"#),
                })
            })
            .collect();
        Self(messages)
    }
}

/// Raw input that can be validated and turned into a typed value.
pub trait Input: DeserializeOwned + Validate {
    /// Field names in the order their violations are reported.
    const FIELDS: &'static [&'static str];

    type Output;

    /// Decodes a JSON body. Only non-objects are refused here, everything
    /// else is left to [`Input::check`].
    fn from_json(value: Value) -> Result<Self, Invalid> {
        if !value.is_object() {
            return Err(Invalid::single(BODY_NOT_OBJECT));
        }
        serde_json::from_value(value)
            .map_err(|e| Invalid::single(e.to_string()))
    }

    /// Converts already validated fields into their typed form.
    fn normalize(self) -> Result<Self::Output, Invalid>;

    /// Runs every field rule at once and normalizes on success.
    fn check(self) -> Result<Self::Output, Invalid> {
        self.validate()
            .map_err(|errors| Invalid::collect(&errors, Self::FIELDS))?;
        self.normalize()
    }
}

/// Body of `POST /tickets`. A `null` field counts as absent.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateTicket {
    #[validate(
        required(message = "\"title\" is required"),
        custom(function = "validate_title")
    )]
    pub title: Option<Value>,
    #[validate(
        required(message = "\"description\" is required"),
        custom(function = "validate_description")
    )]
    pub description: Option<Value>,
    #[validate(custom(function = "validate_priority"))]
    pub priority: Option<Value>,
    #[validate(custom(function = "validate_status"))]
    pub status: Option<Value>,
}

impl Input for CreateTicket {
    const FIELDS: &'static [&'static str] =
        &["title", "description", "priority", "status"];

    type Output = db::NewTicket;

    fn normalize(self) -> Result<Self::Output, Invalid> {
        Ok(db::NewTicket {
            title: text(self.title, TITLE_NOT_STRING)?
                .ok_or_else(|| Invalid::single(TITLE_REQUIRED))?,
            description: text(self.description, DESCRIPTION_NOT_STRING)?
                .ok_or_else(|| Invalid::single(DESCRIPTION_REQUIRED))?,
            priority: parse(self.priority, PRIORITY_UNKNOWN)?
                .unwrap_or_default(),
            status: parse(self.status, STATUS_UNKNOWN)?.unwrap_or_default(),
        })
    }
}

/// Body of `PUT /tickets/:id`. Absent fields stay untouched.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTicket {
    #[validate(custom(function = "validate_title"))]
    pub title: Option<Value>,
    #[validate(custom(function = "validate_description"))]
    pub description: Option<Value>,
    #[validate(custom(function = "validate_priority"))]
    pub priority: Option<Value>,
    #[validate(custom(function = "validate_status"))]
    pub status: Option<Value>,
}

impl Input for UpdateTicket {
    const FIELDS: &'static [&'static str] =
        &["title", "description", "priority", "status"];

    type Output = db::Changes;

    fn normalize(self) -> Result<Self::Output, Invalid> {
        Ok(db::Changes {
            title: text(self.title, TITLE_NOT_STRING)?,
            description: text(self.description, DESCRIPTION_NOT_STRING)?,
            priority: parse(self.priority, PRIORITY_UNKNOWN)?,
            status: parse(self.status, STATUS_UNKNOWN)?,
        })
    }
}

/// Query of `GET /tickets`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListTickets {
    #[validate(custom(function = "validate_status_key"))]
    pub status: Option<String>,
}

impl Input for ListTickets {
    const FIELDS: &'static [&'static str] = &["status"];

    type Output = Option<Status>;

    fn normalize(self) -> Result<Self::Output, Invalid> {
        self.status
            .map(|s| {
                Status::from_key(&s)
                    .ok_or_else(|| Invalid::single(STATUS_UNKNOWN))
            })
            .transpose()
    }
}

fn text(
    value: Option<Value>,
    message: &'static str,
) -> Result<Option<String>, Invalid> {
    match value {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(Invalid::single(message)),
    }
}

fn parse<T: FromStr>(
    value: Option<Value>,
    message: &'static str,
) -> Result<Option<T>, Invalid> {
    text(value, message)?
        .map(|v| v.parse().map_err(|_| Invalid::single(message)))
        .transpose()
}

fn violation(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn string<'v>(
    value: &'v Value,
    message: &'static str,
) -> Result<&'v str, ValidationError> {
    value.as_str().ok_or_else(|| violation("type", message))
}

fn validate_title(title: &Value) -> Result<(), ValidationError> {
    let title = string(title, TITLE_NOT_STRING)?;
    if title.is_empty() {
        return Err(violation("empty", TITLE_EMPTY));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(violation("length", TITLE_TOO_LONG));
    }
    Ok(())
}

fn validate_description(description: &Value) -> Result<(), ValidationError> {
    if string(description, DESCRIPTION_NOT_STRING)?.is_empty() {
        return Err(violation("empty", DESCRIPTION_EMPTY));
    }
    Ok(())
}

fn validate_priority(priority: &Value) -> Result<(), ValidationError> {
    string(priority, PRIORITY_NOT_STRING)?
        .parse::<Priority>()
        .map(drop)
        .map_err(|_| violation("one_of", PRIORITY_UNKNOWN))
}

fn validate_status(status: &Value) -> Result<(), ValidationError> {
    string(status, STATUS_NOT_STRING)?
        .parse::<Status>()
        .map(drop)
        .map_err(|_| violation("one_of", STATUS_UNKNOWN))
}

fn validate_status_key(status: &str) -> Result<(), ValidationError> {
    Status::from_key(status)
        .map(drop)
        .ok_or_else(|| violation("one_of", STATUS_UNKNOWN))
}
