//! Modal dialogs rendered as terminal overlays.
//!
//! [`Modal`] is the coordinator: it builds markup through a [`Template`],
//! delegates presentation to a [`DialogWidget`], and emits
//! [`ModalEvent`](crate::events::ModalEvent)s as the user interacts with it.
//! [`ModalStack`] manages several modals layered over each other.

pub mod content;
pub mod options;
mod signal;
pub mod stack;
pub mod template;
pub mod view;
pub mod widget;

pub use content::{ContentView, ModalContent};
pub use options::{Animate, AnimateHook, AnimatePhase, Backdrop, ModalOptions};
pub use signal::{AnimateGate, SignalHandle};
pub use stack::{ModalStack, OpenModals, StackEvent, Stacking};
pub use template::{Body, Footer, Header, Markup, Template, TemplateContext};
pub use view::{Modal, ModalState};
pub use widget::{
    DialogWidget, FooterButton, HitTarget, LayoutSpec, OverlayDialog, OverlayLayout, ShowOptions,
};
