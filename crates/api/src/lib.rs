pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
