pub mod address;
pub mod db;
pub mod user;
