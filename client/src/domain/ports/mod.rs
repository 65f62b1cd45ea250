//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod auth_api;
mod http_transport;
mod login_redirect;
mod session_store;

#[cfg(test)]
pub use auth_api::MockAuthApi;
pub use auth_api::{AuthApi, LoginGrant, RefreshGrant};
pub use http_transport::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, TransportError};
pub use login_redirect::{LoginRedirect, TracingLoginRedirect};
#[cfg(test)]
pub use session_store::MockSessionStore;
pub use session_store::{InMemorySessionStore, SessionStore, SessionStoreError, StorageKey};
