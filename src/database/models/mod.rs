pub mod account;
pub mod address;
pub mod session;

pub use account::{Account, AccountCredentials, AddressUser};
pub use address::{AddressFields, AddressPayload, FieldErrors, PostalAddress, UniqueRule};
pub use session::Session;
