//! Records persisted by the web-form workflows

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Client details captured with each submission
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: String,
}

/// A stored contact-form submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[serde(deserialize_with = "stored_time")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Unsubscribed,
}

/// A newsletter subscription. Records are never deleted, only marked
/// unsubscribed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub email: String,
    #[serde(deserialize_with = "stored_time")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub user_agent: String,
    pub status: SubscriptionStatus,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(
        default,
        deserialize_with = "optional_stored_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

impl Subscriber {
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    pub fn is_active_for(&self, email: &str) -> bool {
        self.is_active() && self.email == email
    }
}

fn default_source() -> String {
    "website".to_string()
}

/// RFC 3339, or an ISO time without offset as older files hold. The
/// latter is read as UTC.
fn parse_stored_time(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc())
        })
}

fn stored_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_stored_time(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {:?}", text)))
}

fn optional_stored_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(text) => parse_stored_time(&text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {:?}", text))),
    }
}

/// Accept only JSON strings; any other value reads as absent
pub(crate) fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}
