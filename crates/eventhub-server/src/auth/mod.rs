//! Authentication module for the `EventHub` server.
//!
//! Sessions are managed elsewhere; this module validates bearer JWTs and
//! exposes the acting user's id and role.

pub mod claims;
pub mod jwt;

pub use claims::{Claims, Role};
pub use jwt::JwtManager;
