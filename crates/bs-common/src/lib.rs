//! Shared core of the BITSPARK match service: profiles, compatibility scoring,
//! ranking, daily matches, identity gating, storage and the service layer the
//! HTTP API is built on.

pub mod api;
pub mod db;
pub mod deep_links;
pub mod identity;
pub mod logging;
pub mod matching;
pub mod profile;
pub mod service;
pub mod store;
pub mod timezone;

pub use profile::{ProfileSummary, UserProfile};
pub use service::{MatchService, ServiceConfig, ServiceError};
pub use store::{MatchStore, MemoryStore, StoreError};
