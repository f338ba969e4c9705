pub mod jwt;
pub mod users;

pub use jwt::{Claims, JwtService};
pub use users::{UserAccount, UserDirectory};
