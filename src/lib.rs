//! Patient portal REST API: medical records, prescriptions and messaging.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod security;
pub mod services;
pub mod store;
pub mod validation;
