//! # API Shared
//!
//! Shared utilities and definitions for the ED triage APIs.
//!
//! Contains:
//! - Request/response types with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//! - Authentication utilities: API key validation, building the acting user from request
//!   headers, and the role-based `RolePolicy`
//!
//! Used by `api-rest` and the `ed-run` binary.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{AuthError, RolePolicy};
pub use health::HealthService;
