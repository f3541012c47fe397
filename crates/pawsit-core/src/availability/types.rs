//! Core types for availability synchronization.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned identifier of an availability row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailabilityId(pub i64);

impl fmt::Display for AvailabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque user identifier handed out by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One date on which a sitter is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    /// `None` for a date selected locally but not persisted yet.
    pub id: Option<AvailabilityId>,
    pub date: NaiveDate,
}

impl AvailabilityRecord {
    pub fn persisted(id: AvailabilityId, date: NaiveDate) -> Self {
        Self { id: Some(id), date }
    }

    pub fn local(date: NaiveDate) -> Self {
        Self { id: None, date }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Availability row as the backend returns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRow {
    pub id: AvailabilityId,
    pub available_date: NaiveDate,
}

impl From<AvailabilityRow> for AvailabilityRecord {
    fn from(row: AvailabilityRow) -> Self {
        Self::persisted(row.id, row.available_date)
    }
}

/// Item of a bulk-create request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAvailability {
    pub available_date: NaiveDate,
}

/// Progress state rendered next to the calendar.
///
/// Always projected from engine state, never assigned by UI code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Pending,
    Saving,
    Saved,
    Error,
}

/// User-facing notice attached to a status.
///
/// The UI translates [`StatusMessage::i18n_key`]; the fallback text is
/// English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusMessage {
    Saved,
    /// Write refused because the user has no sitter role.
    NotEligible,
    SaveFailed,
    LoadFailed,
}

impl StatusMessage {
    pub fn i18n_key(&self) -> &'static str {
        match self {
            StatusMessage::Saved => "availability.saved",
            StatusMessage::NotEligible => "availability.error.not_sitter",
            StatusMessage::SaveFailed => "availability.error.save_failed",
            StatusMessage::LoadFailed => "availability.error.load_failed",
        }
    }

    pub fn fallback_text(&self) -> &'static str {
        match self {
            StatusMessage::Saved => "Availability saved.",
            StatusMessage::NotEligible => {
                "You need a sitter profile before you can publish availability."
            }
            StatusMessage::SaveFailed => "Could not save your availability. Please try again.",
            StatusMessage::LoadFailed => "Could not load your availability.",
        }
    }

    /// Message for a failed write: the role check gets its own text.
    pub fn for_write_error(error: &crate::error::AvailabilityError) -> Self {
        if error.is_not_eligible() {
            StatusMessage::NotEligible
        } else {
            StatusMessage::SaveFailed
        }
    }
}

/// What the UI renders: one status and at most one message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    pub status: SyncStatus,
    pub message: Option<StatusMessage>,
}

impl StatusView {
    pub fn new(status: SyncStatus) -> Self {
        Self {
            status,
            message: None,
        }
    }

    pub fn with_message(status: SyncStatus, message: StatusMessage) -> Self {
        Self {
            status,
            message: Some(message),
        }
    }
}
