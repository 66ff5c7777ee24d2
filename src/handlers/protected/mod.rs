pub mod addressbook;
pub mod auth;
