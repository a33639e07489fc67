//! Reactive stores (comparison list, notification inbox).

mod changelog;
pub mod comparison;
pub mod inbox;

pub use changelog::{Changelog, MutationRecord, MutationStatus};
