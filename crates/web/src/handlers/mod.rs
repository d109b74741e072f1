use axum::{Router, routing::get};

use crate::AppState;

pub mod og;

pub fn build_router() -> Router<AppState> {
    // The whole path is the card title, so a single catch-all route serves every card
    Router::new().route("/{*path}", get(og::get_card))
}
