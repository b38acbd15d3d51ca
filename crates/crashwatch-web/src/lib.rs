//! # Crashwatch Web
//!
//! Thin axum boundary over the crashwatch aggregator and poller.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /api/indicators/:key` | Reading, fallback values with `error` when degraded |
//! | `GET /api/quotes/:instrument` | Quote, or HTTP 500 with zeroed fields |
//! | `GET /api/crash-risk` | Composite breakdown plus per-indicator status |
//! | `GET /api/snapshot` | Latest published snapshot |
//! | `GET /health` | Liveness and last cycle id |
//!
//! Unknown indicator keys and instruments answer 404 `{ "error": ... }`.

pub mod error;
pub mod routes;
pub mod server;
pub mod types;

pub use error::WebError;
pub use server::{router, serve, AppState};
