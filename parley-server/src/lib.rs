//! HTTP surface for parley

pub mod handlers;
pub mod server;
pub mod state;

pub use server::{build_router, run_server};
pub use state::AppState;
