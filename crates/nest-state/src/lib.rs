//! Client-side reactive state layer.
//!
//! Keeps the per-user comparison list and the notification inbox consistent
//! across an anonymous local store and the authenticated remote service, and
//! re-initializes both whenever the identity changes.

pub mod auth;
pub mod config;
pub mod gateway;
pub mod local;
pub mod logging;
pub mod stores;

pub use auth::{AuthObserver, AuthState, IdentityProvider};
pub use gateway::{Gateway, RequestBody, RequestOptions};
pub use local::LocalStore;
pub use stores::comparison::{Backend, ComparisonStore, MAX_COMPARE};
pub use stores::inbox::InboxStore;
pub use stores::{MutationRecord, MutationStatus};
