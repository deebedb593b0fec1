use crate::{theme::Theme, Frame};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::layout::Rect;

/// Contract every drawable piece of the crate implements: modals, modal
/// stacks, and nested content views all hang off this trait, so a host
/// application can treat an overlay like any other widget it drives.
#[async_trait]
pub trait Component: Send + Sync {
    /// Handle keyboard input
    async fn handle_key_event(&mut self, event: KeyEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    /// Handle mouse input
    async fn handle_mouse_event(&mut self, event: MouseEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    /// Advance time-driven work: animations, queued signals, pruning
    async fn tick(&mut self) -> Result<()> {
        Ok(())
    }

    /// Draw onto the frame within `area`
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme);

    /// Screen region last assigned to this component
    fn size(&self) -> Rect;

    /// Assign the screen region this component may use
    fn set_size(&mut self, size: Rect);

    /// Whether input should be routed here
    fn has_focus(&self) -> bool {
        false
    }

    fn set_focus(&mut self, focus: bool) {
        let _ = focus;
    }

    /// Whether the component currently draws anything
    fn is_visible(&self) -> bool {
        true
    }

    fn set_visible(&mut self, visible: bool) {
        let _ = visible;
    }
}

/// Size, focus, and visibility bookkeeping shared by concrete components
#[derive(Debug, Clone)]
pub struct ComponentState {
    pub size: Rect,
    pub has_focus: bool,
    pub is_visible: bool,
}

impl Default for ComponentState {
    fn default() -> Self {
        Self {
            size: Rect::default(),
            has_focus: false,
            is_visible: true,
        }
    }
}

impl ComponentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: Rect) -> Self {
        self.size = size;
        self
    }

    pub fn with_focus(mut self, focus: bool) -> Self {
        self.has_focus = focus;
        self
    }
}
