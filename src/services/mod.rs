pub mod ownership_service;
pub mod pagination;
pub mod session_service;

pub use ownership_service::{AddressFilter, OwnershipError, OwnershipService, RemovalOutcome};
pub use pagination::{Page, PageRequest};
pub use session_service::{IssuedSession, SessionError, SessionService};
