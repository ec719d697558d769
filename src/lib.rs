pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod pipeline;
pub mod server;
pub mod stages;
pub mod validation;
