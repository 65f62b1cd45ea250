//! Domain primitives, the request pipeline and the session lifecycle.
//!
//! Purpose: Keep the movie API client transport agnostic. Driven adapters
//! live in [`crate::outbound`] and plug in through the traits in [`ports`].
//!
//! Public surface:
//! - `HttpPipeline`: the single request sender (token attach, one-shot
//!   refresh-and-retry, error normalisation).
//! - `SessionManager`: owner of `{user, token, is_loading}`.
//! - `AuthService`, `MovieService`: typed endpoint wrappers.
//! - `ApiError`: the one error shape callers ever see.

pub mod auth;
pub mod auth_service;
mod envelope;
pub mod error;
pub mod http_pipeline;
pub mod movie;
pub mod movie_service;
pub mod ports;
pub mod session;
pub mod session_manager;
pub mod user;

pub use self::auth::{AuthToken, LoginCredentials, LoginValidationError};
pub use self::auth_service::{AuthService, Registration};
pub use self::envelope::ApiEnvelope;
pub use self::error::{ApiError, ErrorKind, codes};
pub use self::http_pipeline::{DEFAULT_LOGIN_PATH, HttpPipeline, PendingRequest, REFRESH_PATH};
pub use self::movie::{
    Movie, MovieFilters, REVIEW_BODY_MIN_CHARS, REVIEW_RATING_MAX, REVIEW_RATING_MIN, Review,
    ReviewDraft, SortBy, SortOrder,
};
pub use self::movie_service::MovieService;
pub use self::session::{Session, SessionPhase, SessionState};
pub use self::session_manager::{SessionManager, SessionTeardown};
pub use self::user::{User, UserId, UserProfile, UserValidationError};
