pub mod accounts;
pub mod manager;
pub mod models;
pub mod owners;
pub mod query_builder;
pub mod repository;
pub mod schema;

pub use accounts::{AccountRepository, SessionRepository};
pub use manager::{DatabaseError, DatabaseManager};
pub use owners::OwnerRepository;
pub use repository::AddressRepository;
