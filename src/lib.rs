pub mod app;
pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod query;
pub mod services;
pub mod state;
pub mod storage;
