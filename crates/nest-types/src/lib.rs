//! Shared types for the nest client state layer (identity, notifications, notices).

pub mod identity;
pub mod notice;
pub mod notification;

pub use identity::{Claims, IdToken, Identity};
pub use notice::{Notice, NoticeLevel};
pub use notification::{Notification, NotificationKind};
