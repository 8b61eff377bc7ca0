pub mod conversations;
pub mod errors;
pub mod routes;

pub use conversations::ConversationStore;
pub use errors::{ApiError, ErrorResponse};
pub use routes::{build_router, serve, AppState};
