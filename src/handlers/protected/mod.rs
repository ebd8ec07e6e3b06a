// handlers/protected/mod.rs - Protected handlers (baseline permission required)
//
// Every route in this tier runs behind `middleware::authenticate`, which
// verifies the bearer token and provisions the caller's user record.

pub mod comments;
pub mod games;
pub mod lists;
pub mod users;

pub use comments::create as comments_create;
pub use games::create as games_create;
pub use lists::*;
pub use users::me as users_me;
