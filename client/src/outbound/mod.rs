//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **http**: `reqwest`-backed [`crate::domain::ports::HttpTransport`]
//! - **storage**: `cap-std`-backed [`crate::domain::ports::SessionStore`]
//!
//! Adapters are thin translators between domain types and library types.
//! They contain no business logic.

pub mod http;
pub mod storage;
