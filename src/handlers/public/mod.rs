// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Catalogue reads, external search and service metadata.

pub mod games;
pub mod search;
pub mod system;

pub use games::list as games_list;
pub use games::show as games_show;
pub use games::top as games_top;
pub use search::{search_game_details, search_games};
pub use system::{health, root};
