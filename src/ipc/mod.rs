mod error;
mod handlers;
mod helpers;
mod router;
mod server;
mod types;

pub use router::handle_request;
pub use server::serve;
pub use types::{AppState, Request};
