// HTTP routes
pub mod auth;
pub mod callback;
pub mod contracts;
pub mod files;
pub mod health;

pub use auth::*;
pub use callback::*;
pub use contracts::*;
pub use files::*;
pub use health::*;
