//! Request and Response models for the status API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{ClearQuery, RemediateRequest};
pub use responses::{
    CleanupResponse, ClearResponse, ErrorResponse, HealthResponse, PatternsResponse,
    PersistResponse, RemediateResponse, StatsResponse,
};
