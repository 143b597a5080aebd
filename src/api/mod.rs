//! API Module
//!
//! HTTP handlers and routing for the status API read by health reporting
//! and operator tooling.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache and recovery statistics
//! - `POST /cache/cleanup` - Sweep expired entries
//! - `DELETE /cache` - Clear the cache or one category
//! - `POST /cache/persist` - Persist the cache now
//! - `POST /cache/remediate` - Relieve cache pressure
//! - `GET /patterns`, `POST /patterns` - Error pattern table

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
