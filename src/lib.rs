//! Modal dialog overlays for ratatui terminal interfaces.
//!
//! A [`Modal`] is configured once, opened over the rest of the UI, and
//! reports what the user did through semantic events: `shown`, `hidden`,
//! `cancel`, and `ok`. Presentation (centering, backdrop, fade) is handled
//! by a swappable [`DialogWidget`](modal::DialogWidget); arbitrary
//! [`Component`]s can be embedded as the dialog body.
//!
//! ```no_run
//! use scrim::modal::{Modal, ModalOptions};
//!
//! # async fn confirm_delete() -> anyhow::Result<()> {
//! let mut modal = Modal::new(
//!     ModalOptions::new()
//!         .with_title("Delete file")
//!         .with_ok_text("Delete"),
//! )
//! .with_content("This cannot be undone.");
//!
//! modal
//!     .open_with(|modal| {
//!         // runs when the user confirms
//!         let _ = modal;
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! After opening, drive the modal like any other component: feed it input
//! events, call `tick` regularly, and render it last so it paints over the
//! page beneath it. [`ModalStack`](modal::ModalStack) does this bookkeeping
//! when several modals are layered.

pub mod component;
pub mod error;
pub mod events;
pub mod modal;
pub mod theme;

pub use component::{Component, ComponentState};
pub use error::{ModalError, ModalResult};
pub use events::{ModalEvent, Subscription};
pub use modal::{Modal, ModalOptions, ModalStack};
pub use theme::Theme;

pub type Frame<'a> = ratatui::Frame<'a>;
