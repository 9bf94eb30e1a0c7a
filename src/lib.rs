pub mod assets;
pub mod config;
pub mod credentials;
pub mod database;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod services;
pub mod sync;
pub mod upstream;
pub mod utils;
pub mod web;
