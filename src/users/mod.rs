//! Read-only user lookups for authenticated callers.

pub mod handlers;
mod service;

pub use service::UsersService;
