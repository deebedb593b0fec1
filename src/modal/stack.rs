use super::options::ModalOptions;
use super::view::Modal;
use crate::component::Component;
use crate::error::ModalResult;
use crate::{theme::Theme, Frame};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::layout::Rect;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Shared count of currently open modals.
///
/// Clones share one counter. The count only feeds layer stacking; it is
/// advisory and never blocks an open.
#[derive(Debug, Clone, Default)]
pub struct OpenModals(Arc<AtomicUsize>);

impl OpenModals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Modals currently open against this counter
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    /// Record an open; returns the count before it
    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a close; saturates at zero
    pub fn decrement(&self) {
        let result = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                count.checked_sub(1)
            });
        if result.is_err() {
            warn!("open-modal count would go negative; leaving at zero");
        }
    }
}

/// Layer weights for one modal's backdrop and surface.
///
/// Weights are derived from how many modals were already open at open time,
/// so each modal's backdrop sits above every earlier surface and its own
/// surface sits above its backdrop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stacking {
    pub backdrop: i32,
    pub surface: i32,
}

impl Stacking {
    /// Weight of the bottom-most backdrop
    pub const BASE: i32 = 100;
    /// Weight gap between consecutive modals
    pub const STEP: i32 = 10;

    /// Weights for the modal opened with `depth` modals already open
    pub fn for_depth(depth: usize) -> Self {
        let backdrop = Self::BASE + depth as i32 * Self::STEP;
        Self {
            backdrop,
            surface: backdrop + 1,
        }
    }
}

impl Default for Stacking {
    fn default() -> Self {
        Self::for_depth(0)
    }
}

/// Notifications a [`ModalStack`] publishes about its contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackEvent {
    /// A modal was pushed; `depth` is the stack size after the push
    Opened { depth: usize },
    /// A closed modal was pruned; `depth` is the stack size after pruning
    Closed { depth: usize },
}

/// Orchestrator owning a shared open-count and the modals opened through it.
///
/// Modals are kept bottom to top. Input goes to the topmost modal only;
/// rendering paints every modal in layer order so lower dialogs stay visible
/// behind the stack above them. Closed modals are pruned on tick.
pub struct ModalStack {
    modals: Vec<Modal>,
    open_modals: OpenModals,
    events: Option<mpsc::UnboundedSender<StackEvent>>,
    area: Rect,
}

impl ModalStack {
    pub fn new() -> Self {
        Self {
            modals: Vec::new(),
            open_modals: OpenModals::new(),
            events: None,
            area: Rect::default(),
        }
    }

    /// Handle to the shared open-count
    pub fn open_modals(&self) -> OpenModals {
        self.open_modals.clone()
    }

    /// Publish [`StackEvent`]s to the given channel
    pub fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<StackEvent>) {
        self.events = Some(sender);
    }

    /// Build a modal from options and open it on top of the stack
    pub async fn push(&mut self, options: ModalOptions) -> ModalResult<()> {
        self.push_modal(Modal::new(options)).await
    }

    /// Open an already configured modal on top of the stack
    pub async fn push_modal(&mut self, mut modal: Modal) -> ModalResult<()> {
        modal.set_open_modals(self.open_modals.clone());
        modal.set_size(self.area);
        modal.open().await?;
        self.modals.push(modal);
        let depth = self.modals.len();
        debug!(depth, "modal pushed");
        self.send(StackEvent::Opened { depth });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.modals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modals.is_empty()
    }

    /// Topmost modal, the one receiving input
    pub fn top(&self) -> Option<&Modal> {
        self.modals.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Modal> {
        self.modals.last_mut()
    }

    fn send(&self, event: StackEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }
}

impl Default for ModalStack {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Component for ModalStack {
    async fn handle_key_event(&mut self, event: KeyEvent) -> Result<()> {
        if let Some(top) = self.modals.last_mut() {
            top.handle_key_event(event).await?;
        }
        Ok(())
    }

    async fn handle_mouse_event(&mut self, event: MouseEvent) -> Result<()> {
        if let Some(top) = self.modals.last_mut() {
            top.handle_mouse_event(event).await?;
        }
        Ok(())
    }

    async fn tick(&mut self) -> Result<()> {
        for modal in &mut self.modals {
            modal.tick().await?;
        }
        let mut index = 0;
        while index < self.modals.len() {
            if self.modals[index].is_closed() {
                self.modals.remove(index);
                let depth = self.modals.len();
                debug!(depth, "closed modal pruned");
                self.send(StackEvent::Closed { depth });
            } else {
                index += 1;
            }
        }
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        if self.area != area {
            self.set_size(area);
        }
        self.modals
            .sort_by_key(|modal| modal.stacking().map_or(i32::MAX, |s| s.surface));
        for modal in &mut self.modals {
            modal.render(frame, area, theme);
        }
    }

    fn size(&self) -> Rect {
        self.area
    }

    fn set_size(&mut self, size: Rect) {
        self.area = size;
        for modal in &mut self.modals {
            modal.set_size(size);
        }
    }

    fn has_focus(&self) -> bool {
        !self.modals.is_empty()
    }

    fn is_visible(&self) -> bool {
        !self.modals.is_empty()
    }
}
