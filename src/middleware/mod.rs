pub mod auth;
pub mod extract;
pub mod guard;
pub mod response;

pub use auth::{authenticate, CurrentUser};
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use guard::authorize;
pub use response::{ApiResponse, ApiResult};
