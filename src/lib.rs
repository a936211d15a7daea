pub mod analytics;
pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod database;
pub mod error;
pub mod model;
pub mod predictor;
pub mod session;
pub mod store;
