pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use manager::{connect, migrate, open_store};
pub use memory::MemoryCatalogueStore;
pub use postgres::PgCatalogueStore;
pub use store::{
    CatalogueStore, GameChanges, MembershipList, NewGame, NewUser, StoreError, StoreResult,
};
