//! HTTP handlers grouped by resource

pub mod auth;
pub mod client;
pub mod health;
pub mod servers;
pub mod sync;
pub mod users;
