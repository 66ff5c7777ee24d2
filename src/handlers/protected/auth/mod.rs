pub mod account;
pub mod session;

// Re-export handler functions for use in routing
pub use account::delete as account_delete;
pub use session::logout as session_logout;
pub use session::whoami as session_whoami;
