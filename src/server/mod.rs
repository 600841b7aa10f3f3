mod handlers;
mod state;
mod translate;
mod upload;

pub use handlers::{router, run_server};
pub use state::AppState;
