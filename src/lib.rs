//! Credential Authority Library
//!
//! Multi-tenant credential authority: user registration, password login,
//! and per-app signed session tokens, exposed over JSON RPC endpoints.

pub mod auth;
pub mod config;
pub mod middleware;
