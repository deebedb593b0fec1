use super::view::Modal;
use crate::component::Component;
use crate::events::ModalEvent;
use std::fmt;

/// A component that can live inside a dialog body.
///
/// Beyond normal [`Component`] duties, a content view observes the modal's
/// lifecycle: every semantic event the modal emits is forwarded here first,
/// together with the modal itself, so the view can subscribe further, read
/// options, or veto a pending close.
pub trait ContentView: Component {
    /// React to a modal lifecycle event
    fn on_modal_event(&mut self, event: ModalEvent, modal: &mut Modal) {
        let _ = (event, modal);
    }

    /// Preferred body size as (width, height), used to fit the surface
    fn preferred_size(&self) -> (u16, u16) {
        (30, 5)
    }
}

/// Body content carried by a modal
#[derive(Default)]
pub enum ModalContent {
    /// No body content beyond what the template renders
    #[default]
    None,
    /// Plain text handed to the template as `content_text`
    Text(String),
    /// A nested view rendered inside the body region
    View(Box<dyn ContentView>),
}

impl ModalContent {
    /// Wrap plain text
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Wrap a content view
    pub fn view(view: impl ContentView + 'static) -> Self {
        Self::View(Box::new(view))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn is_view(&self) -> bool {
        matches!(self, Self::View(_))
    }

    /// Text handed to the template; views render themselves instead
    pub(crate) fn text_for_template(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for ModalContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::View(_) => f.write_str("View(..)"),
        }
    }
}

impl From<&str> for ModalContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ModalContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}
