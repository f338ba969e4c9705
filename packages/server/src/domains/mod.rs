pub mod auth;
pub mod contracts;
