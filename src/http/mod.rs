//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with the caption endpoints
//! - Request handlers for batch and quick requests
//! - JSON error responses and 404 fallback
//! - CORS middleware

pub mod handlers;
pub mod routes;

pub use routes::create_router;
