mod dto;
pub mod handlers;
mod password;
pub mod repo;
pub mod repo_types;
mod service;
pub mod validation;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
