//! sniphook: dispatch core for operator-authored snippets bound to named host hooks.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
