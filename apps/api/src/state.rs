use std::sync::Arc;

use sqlx::PgPool;

use crate::generation::adapt::ResumeAdapter;
use crate::generation::generator::IterativeGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Owns the requirements extractor, the content backend and the audit queue.
    pub generator: Arc<IterativeGenerator>,
    pub adapter: Arc<ResumeAdapter>,
}
