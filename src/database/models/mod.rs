pub mod comment;
pub mod game;
pub mod user;

pub use comment::{Comment, CommentAuthor};
pub use game::{Game, GameStatus, GameSummary, TopGame};
pub use user::User;
