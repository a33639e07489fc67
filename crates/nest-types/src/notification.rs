//! Notification records fetched from the remote service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity/category of a notification. Closed set, matches the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

/// A single inbox notification.
///
/// Remote-sourced only; the service returns at most the 50 newest records,
/// newest first, and the client treats that ordering as authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    /// Optional deep-link target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}
