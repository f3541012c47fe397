//! Availability synchronization.
//!
//! Keeps the set of dates a sitter marked as available on the calendar in
//! sync with the backend: edits are debounced, diffed against the last
//! server-confirmed snapshot and written as one bulk-create plus per-row
//! deletes, and a single status is projected for the UI.

pub mod backend;
pub mod date;
pub mod debounce;
pub mod engine;
pub mod http;
pub mod set;
pub mod state;
pub mod types;


pub use backend::{AvailabilityBackend, CredentialProvider, StaticCredentials};
pub use date::{canonical_date, format_civil_date, parse_civil_date, parse_selection};
pub use engine::AvailabilitySyncEngine;
pub use http::HttpAvailabilityBackend;
pub use set::{AvailabilityDiff, AvailabilitySet};
pub use state::SyncState;
pub use types::{
    AvailabilityId, AvailabilityRecord, AvailabilityRow, NewAvailability, StatusMessage,
    StatusView, SyncStatus, UserId,
};
