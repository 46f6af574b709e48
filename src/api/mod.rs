//! HTTP surface: one read endpoint over the query engine

pub mod error;
pub mod handlers;
pub mod router;

use crate::pipeline::query::QueryEngine;
use std::sync::Arc;

pub use error::ApiError;
pub use router::create_router;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
}

impl AppState {
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self { engine }
    }
}
