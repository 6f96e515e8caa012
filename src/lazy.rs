//! Lazy loading: decide whether a region needs fetching and fetch it.

use futures_util::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::constants::COMPONENT_FUNCTION;
use crate::error::{RelEditError, Result};
use crate::fetch::FetchClient;
use crate::models::{FetchRequest, Method, Region, RegionId, SwapMode, SwapOutcome};
use crate::swap::SwapEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Load,
    Skip,
}

/// Load when the placeholder is still there, or when asked to reload.
/// An absent `reloadable` never refetches a filled region.
pub fn maybe_load(region: &Region, reloadable: Option<bool>) -> Decision {
    if region.has_placeholder || reloadable.unwrap_or(false) {
        Decision::Load
    } else {
        Decision::Skip
    }
}

#[derive(Clone)]
pub struct LazyLoader {
    engine: Arc<SwapEngine>,
    fetch: FetchClient,
}

impl LazyLoader {
    pub fn new(engine: Arc<SwapEngine>, fetch: FetchClient) -> Self {
        Self { engine, fetch }
    }

    /// Load `region` from its load url if [`maybe_load`] says so. `None` when
    /// skipped. Without an explicit `reloadable` the region's own flag applies.
    pub async fn load_now(&self, region: &str, reloadable: Option<bool>) -> Result<Option<SwapOutcome>> {
        let current = self
            .engine
            .region(region)
            .await
            .ok_or_else(|| RelEditError::UnknownRegion(region.to_string()))?;
        let reloadable = reloadable.or(current.is_reloadable.then_some(true));
        if maybe_load(&current, reloadable) == Decision::Skip {
            debug!(region, "already loaded, skipping");
            return Ok(None);
        }
        let url = current
            .load_url
            .ok_or_else(|| RelEditError::NoLoadUrl(region.to_string()))?;
        let params: Vec<(String, String)> = self
            .fetch
            .config()
            .page_id
            .iter()
            .map(|page_id| ("pageid".to_string(), page_id.clone()))
            .collect();
        let outcome = self
            .engine
            .load(
                region,
                SwapMode::Replace,
                self.fetch.fetch(&url, &params, Method::Get),
            )
            .await?;
        Ok(Some(outcome))
    }

    /// Trigger every region still showing a placeholder. Regions are
    /// independent, so they load concurrently.
    pub async fn load_pending(&self) -> Vec<(RegionId, Result<Option<SwapOutcome>>)> {
        let pending: Vec<RegionId> = self
            .engine
            .regions()
            .await
            .into_iter()
            .filter(|region| region.has_placeholder)
            .map(|region| region.id)
            .collect();
        info!(count = pending.len(), "loading pending regions");
        let loads = pending.iter().map(|id| self.load_now(id, None));
        let results = join_all(loads).await;
        pending.into_iter().zip(results).collect()
    }

    /// Re-render component `component` of `registry` for `rql` and swap it
    /// in place of `region`.
    pub async fn reload_component(
        &self,
        region: &str,
        component: &str,
        rql: Option<&str>,
        registry: &str,
        extra: Value,
    ) -> Result<SwapOutcome> {
        let request = FetchRequest::new(region, COMPONENT_FUNCTION)
            .arg(component)
            .arg(rql.map_or(Value::Null, |rql| Value::String(rql.to_string())))
            .arg(registry)
            .arg(extra)
            .method(Method::Get);
        self.engine
            .load(region, SwapMode::Swap, self.fetch.call(&request))
            .await
    }
}
