use super::signal::AnimateGate;
use super::template::{Markup, Template, TemplateContext};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Backdrop behavior behind the dialog surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backdrop {
    /// No backdrop is drawn
    Off,
    /// Dimmed backdrop; clicking it can cancel the dialog
    On,
    /// Dimmed backdrop that ignores clicks
    Static,
}

/// Phase passed to a custom animate hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimatePhase {
    Open,
    Close,
}

/// Custom animate hook. Runs when the markup is built (open phase) and when
/// a close begins (close phase); the close phase must eventually call
/// [`AnimateGate::proceed`] or the modal stays in its closing state.
pub type AnimateHook = Arc<dyn Fn(AnimatePhase, AnimateGate) + Send + Sync>;

/// Animation applied when presenting and dismissing the dialog
#[derive(Clone, Default)]
pub enum Animate {
    /// Present and dismiss immediately
    #[default]
    None,
    /// Tick-driven fade handled by the dialog widget
    Fade,
    /// Caller-supplied hook driving its own transition
    Hook(AnimateHook),
}

impl fmt::Debug for Animate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Animate::None => f.write_str("None"),
            Animate::Fade => f.write_str("Fade"),
            Animate::Hook(_) => f.write_str("Hook(..)"),
        }
    }
}

/// Configuration for a [`Modal`](super::Modal)
#[derive(Clone)]
pub struct ModalOptions {
    /// Header title; no title means no header row
    pub title: Option<String>,
    /// Confirm button label; `None` omits the button
    pub ok_text: Option<String>,
    /// Dismiss button label; `None` omits the button
    pub cancel_text: Option<String>,
    /// Master switch for every cancel affordance
    pub allow_cancel: bool,
    /// Whether the Escape key cancels (only when cancelling is allowed)
    pub escape: bool,
    /// Presentation animation
    pub animate: Animate,
    /// Template override; the default template is used when unset
    pub template: Option<Template>,
    /// Fixed surface width; fit-to-content when unset
    pub width: Option<u16>,
    /// Backdrop override; derived from `allow_cancel` when unset
    pub backdrop: Option<Backdrop>,
    /// Whether the confirm button takes focus once shown
    pub focus_ok: bool,
    /// Whether confirming also closes the modal
    pub ok_closes: bool,
}

impl Default for ModalOptions {
    fn default() -> Self {
        Self {
            title: None,
            ok_text: Some("OK".to_string()),
            cancel_text: Some("Cancel".to_string()),
            allow_cancel: true,
            escape: true,
            animate: Animate::None,
            template: None,
            width: None,
            backdrop: None,
            focus_ok: true,
            ok_closes: true,
        }
    }
}

impl fmt::Debug for ModalOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalOptions")
            .field("title", &self.title)
            .field("ok_text", &self.ok_text)
            .field("cancel_text", &self.cancel_text)
            .field("allow_cancel", &self.allow_cancel)
            .field("escape", &self.escape)
            .field("animate", &self.animate)
            .field("template", &self.template.as_ref().map(|_| "custom"))
            .field("width", &self.width)
            .field("backdrop", &self.backdrop)
            .field("focus_ok", &self.focus_ok)
            .field("ok_closes", &self.ok_closes)
            .finish()
    }
}

impl ModalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the confirm button label
    pub fn with_ok_text(mut self, text: impl Into<String>) -> Self {
        self.ok_text = Some(text.into());
        self
    }

    /// Drop the confirm button
    pub fn without_ok_text(mut self) -> Self {
        self.ok_text = None;
        self
    }

    /// Set the dismiss button label
    pub fn with_cancel_text(mut self, text: impl Into<String>) -> Self {
        self.cancel_text = Some(text.into());
        self
    }

    /// Drop the dismiss button
    pub fn without_cancel_text(mut self) -> Self {
        self.cancel_text = None;
        self
    }

    /// Allow or disallow cancelling altogether
    pub fn allow_cancel(mut self, allow: bool) -> Self {
        self.allow_cancel = allow;
        self
    }

    /// Enable or disable the Escape key shortcut
    pub fn escape(mut self, escape: bool) -> Self {
        self.escape = escape;
        self
    }

    /// Set the presentation animation
    pub fn with_animate(mut self, animate: Animate) -> Self {
        self.animate = animate;
        self
    }

    /// Install a custom animate hook
    pub fn with_animate_hook(
        mut self,
        hook: impl Fn(AnimatePhase, AnimateGate) + Send + Sync + 'static,
    ) -> Self {
        self.animate = Animate::Hook(Arc::new(hook));
        self
    }

    /// Install a custom template
    pub fn with_template(
        mut self,
        template: impl Fn(&TemplateContext) -> Markup + Send + Sync + 'static,
    ) -> Self {
        self.template = Some(Arc::new(template));
        self
    }

    /// Fix the surface width instead of fitting to content
    pub fn with_width(mut self, width: u16) -> Self {
        self.width = Some(width);
        self
    }

    /// Override the derived backdrop behavior
    pub fn with_backdrop(mut self, backdrop: Backdrop) -> Self {
        self.backdrop = Some(backdrop);
        self
    }

    /// Control whether the confirm button takes focus once shown
    pub fn focus_ok(mut self, focus: bool) -> Self {
        self.focus_ok = focus;
        self
    }

    /// Control whether confirming also closes the modal
    pub fn ok_closes(mut self, closes: bool) -> Self {
        self.ok_closes = closes;
        self
    }

    /// Backdrop behavior after applying the `allow_cancel` default:
    /// cancellable dialogs get an interactive backdrop, others a static one
    pub fn effective_backdrop(&self) -> Backdrop {
        self.backdrop.unwrap_or(if self.allow_cancel {
            Backdrop::On
        } else {
            Backdrop::Static
        })
    }

    /// Whether the Escape shortcut is live for this configuration
    pub fn keyboard_enabled(&self) -> bool {
        self.allow_cancel && self.escape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ModalOptions::new();
        assert_eq!(options.title, None);
        assert_eq!(options.ok_text.as_deref(), Some("OK"));
        assert_eq!(options.cancel_text.as_deref(), Some("Cancel"));
        assert!(options.allow_cancel);
        assert!(options.escape);
        assert!(options.focus_ok);
        assert!(options.ok_closes);
        assert!(options.width.is_none());
        assert!(options.backdrop.is_none());
        assert!(matches!(options.animate, Animate::None));
    }

    #[test]
    fn test_backdrop_derived_from_allow_cancel() {
        assert_eq!(ModalOptions::new().effective_backdrop(), Backdrop::On);
        assert_eq!(
            ModalOptions::new().allow_cancel(false).effective_backdrop(),
            Backdrop::Static
        );
    }

    #[test]
    fn test_backdrop_override_wins() {
        let options = ModalOptions::new()
            .allow_cancel(false)
            .with_backdrop(Backdrop::Off);
        assert_eq!(options.effective_backdrop(), Backdrop::Off);
    }

    #[test]
    fn test_keyboard_requires_both_flags() {
        assert!(ModalOptions::new().keyboard_enabled());
        assert!(!ModalOptions::new().escape(false).keyboard_enabled());
        assert!(!ModalOptions::new().allow_cancel(false).keyboard_enabled());
        // escape alone cannot re-enable a non-cancellable dialog
        assert!(!ModalOptions::new()
            .allow_cancel(false)
            .escape(true)
            .keyboard_enabled());
    }

    #[test]
    fn test_button_builders() {
        let options = ModalOptions::new()
            .with_ok_text("Apply")
            .without_cancel_text();
        assert_eq!(options.ok_text.as_deref(), Some("Apply"));
        assert!(options.cancel_text.is_none());
    }
}
