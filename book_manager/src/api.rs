use std::collections::HashMap;

use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

pub type BookId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
#[cfg_attr(any(feature = "server", test), derive(sqlx::FromRow))]
/// Book as stored in the `books` table
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub year: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
/// Year as sent by a client, either a JSON number or a string such as `"1999"`
pub enum YearValue {
    Number(serde_json::Number),
    Text(String),
}

impl From<i64> for YearValue {
    fn from(year: i64) -> Self {
        YearValue::Number(year.into())
    }
}

impl From<&str> for YearValue {
    fn from(year: &str) -> Self {
        YearValue::Text(year.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// Request body of create and update. Every field is optional here,
/// which fields are required is decided by validation.
///
/// The outer `Option` tells whether the key was sent at all, the inner one
/// is `None` for an explicit `null`.
pub struct BookPayload {
    #[serde(default, deserialize_with = "sent", skip_serializing_if = "Option::is_none")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "sent", skip_serializing_if = "Option::is_none")]
    pub author: Option<Option<String>>,
    #[serde(default, deserialize_with = "sent", skip_serializing_if = "Option::is_none")]
    pub year: Option<Option<YearValue>>,
    /// Keys the service does not know about, kept only to tell `{}` apart from them
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

impl BookPayload {
    /// Payload with every field sent and none of them `null`
    pub fn new(title: &str, author: &str, year: YearValue) -> Self {
        Self {
            title: Some(Some(title.to_string())),
            author: Some(Some(author.to_string())),
            year: Some(Some(year)),
            ..Self::default()
        }
    }

    /// True when the body carried no keys at all, `null` values count as keys
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.year.is_none()
            && self.unknown_fields.is_empty()
    }
}

/// Marks a key as sent, even when its value is `null`
fn sent<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// Field types are loosely typed JSON, so the schema is left open.
impl paperclip::v2::schema::Apiv2Schema for BookPayload {}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Apiv2Schema)]
/// Query parameters accepted by the list endpoint
pub struct BookFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct ErrorResponse {
    pub error: String,
}
