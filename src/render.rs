//! Presentation boundary and a headless document implementing it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::{Content, SwapMode};

/// Whatever actually displays regions. Calls are synchronous: once content is
/// available it is committed without yielding.
pub trait Renderer: Send + Sync {
    fn set_content(&self, region: &str, content: &Content, mode: SwapMode);
    fn set_visible(&self, region: &str, visible: bool);
    /// Replace the current location
    fn navigate(&self, url: &str);
    /// Reload the current page in place
    fn reload_page(&self);
    /// Drop any displayed error message
    fn clear_messages(&self);
}

/// One call made across the presentation boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum DomCall {
    SetContent {
        region: String,
        markup: String,
        mode: SwapMode,
    },
    SetVisible {
        region: String,
        visible: bool,
    },
    Navigate(String),
    Reload,
    ClearMessages,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    markup: String,
    visible: bool,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            markup: String::new(),
            visible: true,
        }
    }
}

#[derive(Debug, Default)]
struct DocumentState {
    nodes: HashMap<String, Node>,
    messages: Vec<String>,
    location: Option<String>,
    reloads: usize,
    calls: Vec<DomCall>,
}

/// In-memory document: keeps region markup and visibility, and records every
/// call so the outside effects of a session can be inspected.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    state: Mutex<DocumentState>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DocumentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a region with markup, as the initial page render would.
    pub fn insert(&self, region: &str, markup: &str) {
        self.state().nodes.insert(
            region.to_string(),
            Node {
                markup: markup.to_string(),
                visible: true,
            },
        );
    }

    pub fn content(&self, region: &str) -> Option<String> {
        self.state().nodes.get(region).map(|node| node.markup.clone())
    }

    /// Regions never touched are visible.
    pub fn is_visible(&self, region: &str) -> bool {
        self.state().nodes.get(region).is_none_or(|node| node.visible)
    }

    pub fn push_message(&self, message: &str) {
        self.state().messages.push(message.to_string());
    }

    pub fn messages(&self) -> Vec<String> {
        self.state().messages.clone()
    }

    pub fn location(&self) -> Option<String> {
        self.state().location.clone()
    }

    pub fn reload_count(&self) -> usize {
        self.state().reloads
    }

    pub fn calls(&self) -> Vec<DomCall> {
        self.state().calls.clone()
    }

    /// Number of content writes, whatever the region.
    pub fn content_writes(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| matches!(call, DomCall::SetContent { .. }))
            .count()
    }
}

impl Renderer for MemoryDocument {
    fn set_content(&self, region: &str, content: &Content, mode: SwapMode) {
        let markup = content.as_markup().into_owned();
        let mut state = self.state();
        let node = state.nodes.entry(region.to_string()).or_default();
        match mode {
            SwapMode::Replace | SwapMode::Swap | SwapMode::ToggleVisibility => {
                node.markup = markup.clone()
            }
            SwapMode::Append => node.markup.push_str(&markup),
            SwapMode::Prepend => node.markup.insert_str(0, &markup),
        }
        state.calls.push(DomCall::SetContent {
            region: region.to_string(),
            markup,
            mode,
        });
    }

    fn set_visible(&self, region: &str, visible: bool) {
        let mut state = self.state();
        state.nodes.entry(region.to_string()).or_default().visible = visible;
        state.calls.push(DomCall::SetVisible {
            region: region.to_string(),
            visible,
        });
    }

    fn navigate(&self, url: &str) {
        let mut state = self.state();
        state.location = Some(url.to_string());
        state.calls.push(DomCall::Navigate(url.to_string()));
    }

    fn reload_page(&self) {
        let mut state = self.state();
        state.reloads += 1;
        state.calls.push(DomCall::Reload);
    }

    fn clear_messages(&self) {
        let mut state = self.state();
        state.messages.clear();
        state.calls.push(DomCall::ClearMessages);
    }
}
