//! Fragment swap engine.
//!
//! Every region owns a request token. Starting a load bumps it; a completed
//! fetch is committed only if it still holds the region's current token,
//! otherwise its result is dropped. Token check, render call and region update
//! happen under one lock acquisition with no await in between.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{RelEditError, Result};
use crate::events::{EventBus, RegionEvent};
use crate::models::{Content, Region, RegionId, SwapMode, SwapOutcome};
use crate::render::Renderer;

struct Slot {
    region: Region,
    token: u64,
    visible: bool,
}

#[derive(Default)]
struct SwapState {
    slots: HashMap<RegionId, Slot>,
    next_token: u64,
}

impl SwapState {
    fn bump(&mut self, region: &str) -> Result<u64> {
        self.next_token += 1;
        let token = self.next_token;
        let slot = self
            .slots
            .get_mut(region)
            .ok_or_else(|| RelEditError::UnknownRegion(region.to_string()))?;
        slot.token = token;
        Ok(token)
    }
}

/// Proof that a load was started; only the latest ticket of a region commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    region: RegionId,
    token: u64,
}

pub struct SwapEngine {
    state: Mutex<SwapState>,
    renderer: Arc<dyn Renderer>,
    events: EventBus,
}

impl SwapEngine {
    pub fn new(renderer: Arc<dyn Renderer>, events: EventBus) -> Self {
        Self {
            state: Mutex::new(SwapState::default()),
            renderer,
            events,
        }
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register a region, or update the flags of a known one. A pending load
    /// on an already known region stays current.
    pub async fn register(&self, region: Region) {
        let mut state = self.state.lock().await;
        match state.slots.get_mut(&region.id) {
            Some(slot) => slot.region = region,
            None => {
                debug!(region = %region.id, placeholder = region.has_placeholder, "region registered");
                state.slots.insert(
                    region.id.clone(),
                    Slot {
                        region,
                        token: 0,
                        visible: true,
                    },
                );
            }
        }
    }

    /// Register `id` as an already rendered region unless it is known.
    pub async fn ensure(&self, id: &str) {
        let mut state = self.state.lock().await;
        state.slots.entry(id.to_string()).or_insert_with(|| Slot {
            region: Region::filled(id),
            token: 0,
            visible: true,
        });
    }

    pub async fn region(&self, id: &str) -> Option<Region> {
        let state = self.state.lock().await;
        state.slots.get(id).map(|slot| slot.region.clone())
    }

    pub async fn regions(&self) -> Vec<Region> {
        let state = self.state.lock().await;
        let mut regions: Vec<Region> = state.slots.values().map(|s| s.region.clone()).collect();
        regions.sort_by(|a, b| a.id.cmp(&b.id));
        regions
    }

    /// Start a load on `region`, superseding any load still pending there.
    pub async fn begin(&self, region: &str) -> Result<Ticket> {
        let token = self.state.lock().await.bump(region)?;
        Ok(Ticket {
            region: region.to_string(),
            token,
        })
    }

    /// Abandon interest in whatever is pending on `region`. Returns false for
    /// unknown regions.
    pub async fn cancel(&self, region: &str) -> bool {
        let cancelled = self.state.lock().await.bump(region).is_ok();
        if cancelled {
            debug!(region, "pending load abandoned");
        }
        cancelled
    }

    pub async fn is_current(&self, ticket: &Ticket) -> bool {
        let state = self.state.lock().await;
        state
            .slots
            .get(&ticket.region)
            .is_some_and(|slot| slot.token == ticket.token)
    }

    pub async fn commit(
        &self,
        ticket: Ticket,
        content: Content,
        mode: SwapMode,
    ) -> Result<SwapOutcome> {
        self.commit_then(ticket, content, mode, |_, _| true).await
    }

    /// Commit `content` if `ticket` is still current. `on_commit` runs first,
    /// while the region is locked; when it returns false the content is
    /// dropped as superseded and nothing is rendered.
    ///
    /// Error documents are returned as [`RelEditError::ServerReported`] and
    /// leave the region untouched.
    pub async fn commit_then<H>(
        &self,
        ticket: Ticket,
        content: Content,
        mode: SwapMode,
        on_commit: H,
    ) -> Result<SwapOutcome>
    where
        H: FnOnce(&Content, &dyn Renderer) -> bool,
    {
        let mut state = self.state.lock().await;
        let slot = state
            .slots
            .get_mut(&ticket.region)
            .ok_or_else(|| RelEditError::UnknownRegion(ticket.region.clone()))?;
        if slot.token != ticket.token {
            debug!(region = %ticket.region, token = ticket.token, current = slot.token, "stale result dropped");
            return Ok(SwapOutcome::Superseded);
        }
        if let Some(message) = content.error_message() {
            warn!(region = %ticket.region, %message, "server reported an error");
            return Err(RelEditError::ServerReported(message));
        }

        if !on_commit(&content, self.renderer.as_ref()) {
            debug!(region = %ticket.region, "result refused by its owner");
            return Ok(SwapOutcome::Superseded);
        }

        self.renderer.set_content(&ticket.region, &content, mode);
        if mode == SwapMode::ToggleVisibility {
            slot.visible = !slot.visible;
            self.renderer.set_visible(&ticket.region, slot.visible);
        }
        slot.region.has_placeholder = false;
        drop(state);

        info!(region = %ticket.region, ?mode, "content swapped");
        self.events.emit(RegionEvent::ContentLoaded {
            region: ticket.region,
        });
        Ok(SwapOutcome::Applied)
    }

    /// Commit content that is already at hand.
    pub async fn swap(&self, region: &str, content: Content, mode: SwapMode) -> Result<SwapOutcome> {
        let ticket = self.begin(region).await?;
        self.commit(ticket, content, mode).await
    }

    pub async fn load<F>(&self, region: &str, mode: SwapMode, fetch: F) -> Result<SwapOutcome>
    where
        F: Future<Output = Result<Content>>,
    {
        self.load_then(region, mode, fetch, |_, _| true).await
    }

    /// Take a ticket, await `fetch`, then commit. Failures of a load that was
    /// superseded meanwhile are dropped like its results.
    pub async fn load_then<F, H>(
        &self,
        region: &str,
        mode: SwapMode,
        fetch: F,
        on_commit: H,
    ) -> Result<SwapOutcome>
    where
        F: Future<Output = Result<Content>>,
        H: FnOnce(&Content, &dyn Renderer) -> bool,
    {
        let ticket = self.begin(region).await?;
        debug!(region, token = ticket.token, "load started");
        match fetch.await {
            Ok(content) => self.commit_then(ticket, content, mode, on_commit).await,
            Err(err) if self.is_current(&ticket).await => {
                warn!(region, error = %err, "load failed");
                Err(err)
            }
            Err(err) => {
                debug!(region, error = %err, "superseded load failed, ignored");
                Ok(SwapOutcome::Superseded)
            }
        }
    }
}
