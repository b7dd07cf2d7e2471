pub mod archive;
pub mod auth;
pub mod config;
pub mod error;
pub mod generation;
pub mod image_processing;
pub mod logging;
pub mod mcp_server;
pub mod providers;
pub mod publish;
pub mod routes;
pub mod status;
pub mod store;
