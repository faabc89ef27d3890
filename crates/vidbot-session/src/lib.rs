//! Ephemeral session state.
//!
//! - [`SessionStore`]: time-boxed opaque tokens carrying a query and its
//!   candidate list, issued by an anonymous search and resolved later by an
//!   explicit preparation request
//! - [`CandidateCache`]: a short TTL map of recently shown candidates, used
//!   when a preparation arrives with a bare id

pub mod cache;
pub mod error;
pub mod store;

pub use cache::CandidateCache;
pub use error::{SessionError, SessionResult};
pub use store::SessionStore;
