//! # Pawsit Core Library
//!
//! Sitter availability synchronization for the Pawsit pet-sitting
//! marketplace. A calendar front end feeds the full selection of available
//! dates into an [`AvailabilitySyncEngine`], which persists the changes to
//! the backend and reports a single [`SyncStatus`] back.
//!
//! ## Key Components
//!
//! - [`AvailabilitySyncEngine`]: debounced, diff-based sync driver
//! - [`AvailabilityBackend`]: persistence seam, with [`HttpAvailabilityBackend`]
//! - [`CredentialProvider`]: injected identity and bearer token
//! - [`EngineConfig`]: timings and backend location (TOML + env)

pub mod availability;
pub mod config;
pub mod error;

pub use availability::{
    AvailabilityBackend, AvailabilityDiff, AvailabilityId, AvailabilityRecord, AvailabilitySet,
    AvailabilitySyncEngine, CredentialProvider, HttpAvailabilityBackend, StaticCredentials,
    StatusMessage, StatusView, SyncStatus, UserId,
};
pub use config::{BackendConfig, EngineConfig};
pub use error::{AvailabilityError, ConfigError};
