//! The HTTP front-end (C12): the control API, health/metrics/CF probes, the
//! sentinel route, and the catch-all that feeds requests into the engine.

pub mod auth;
pub mod handlers;
pub mod router;

use std::sync::Arc;

use engine::Engine;
use runtime::Runtime;

/// Shared state handed to every handler: the live engine, the loaded
/// catalogue (for `/capi/v1/config`), and the control API's credentials.
pub struct AppState<RT: Runtime> {
    pub engine: Engine<RT>,
    pub config: engine::Config,
    pub api_username: String,
    pub api_password: String,
}

pub type SharedState<RT> = Arc<AppState<RT>>;

pub use router::build_router;
