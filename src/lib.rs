//! Lazy region loading and inline edition over a fetch-then-swap protocol.
//!
//! Regions are named zones of a page. [`lazy::LazyLoader`] fills regions that
//! still show a placeholder, [`session::SessionController`] drives inline
//! edition forms, and both commit content through [`swap::SwapEngine`], which
//! keeps at most one relevant request per region.

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod fetch;
pub mod form;
pub mod lazy;
pub mod models;
pub mod render;
pub mod session;
pub mod swap;
pub mod transport;

use std::sync::Arc;

pub use config::Config;
pub use error::{RelEditError, Result};

use events::EventBus;
use fetch::FetchClient;
use lazy::LazyLoader;
use render::Renderer;
use session::SessionController;
use swap::SwapEngine;
use transport::Transport;

/// Everything one page needs, sharing a single swap engine.
pub struct Page {
    pub engine: Arc<SwapEngine>,
    pub lazy: LazyLoader,
    pub sessions: SessionController,
}

impl Page {
    pub fn new(config: Config, transport: Arc<dyn Transport>, renderer: Arc<dyn Renderer>) -> Self {
        let fetch = FetchClient::new(transport, Arc::new(config));
        let engine = Arc::new(SwapEngine::new(renderer, EventBus::default()));
        Self {
            lazy: LazyLoader::new(engine.clone(), fetch.clone()),
            sessions: SessionController::new(engine.clone(), fetch),
            engine,
        }
    }
}
