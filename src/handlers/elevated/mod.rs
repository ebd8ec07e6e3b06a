// handlers/elevated/mod.rs - Elevated handlers (admin permissions required)
//
// Catalogue-wide mutation. `authenticate` checks `patch:games` or
// `delete:games` before the user is provisioned, so a caller without the
// permission is rejected without touching the store.

pub mod games;

pub use games::destroy as games_destroy;
pub use games::update as games_update;
