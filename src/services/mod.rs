//! Business logic between the web layer and the repositories

pub mod access;
pub mod auth;
pub mod client;
pub mod push_config;
pub mod servers;
pub mod users;

pub use access::AccessGate;
pub use auth::{AuthService, Claims, TokenResponse, TokenService};
pub use client::ClientService;
pub use push_config::PushConfigMediator;
pub use servers::ServerService;
pub use users::UserService;
