//! Application services: the snippet dispatch core and the host page built on it.

pub mod dispatch;
pub mod embed;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod page;
pub mod privilege;
pub mod render;
pub mod repos;
pub mod request;
pub mod safe_mode;
