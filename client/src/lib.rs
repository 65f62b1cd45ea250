//! Client library for the movie catalogue REST API.
//!
//! The core is an authenticated session: [`domain::HttpPipeline`] attaches
//! the stored bearer token to each request and transparently refreshes it
//! once on a 401, while [`domain::SessionManager`] owns the user/token state
//! and keeps it in step with durable storage.

pub mod config;
pub mod domain;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::ClientSettings;
