use super::content::ModalContent;
use super::options::{Animate, AnimatePhase, Backdrop, ModalOptions};
use super::signal::{AnimateGate, ModalSignal, SignalHandle};
use super::stack::{OpenModals, Stacking};
use super::template::{default_template, Body, Markup, TemplateContext};
use super::widget::{
    DialogWidget, FooterButton, HitTarget, LayoutSpec, OverlayDialog, ShowOptions,
};
use crate::component::{Component, ComponentState};
use crate::error::{ModalError, ModalResult};
use crate::events::{Emitter, ModalEvent, Subscription};
use crate::{theme::Theme, Frame};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Lifecycle states of a [`Modal`]. The lifecycle is one-way: a closed
/// modal cannot be reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalState {
    /// Constructed, markup not built yet
    Created,
    /// Markup built, not presented
    Rendered,
    /// Presentation started, shown signal pending
    Opening,
    /// Fully presented and interactive
    Open,
    /// Dismissal started, hidden signal pending
    Closing,
    /// Dismissed and torn down
    Closed,
}

/// A modal dialog: markup built from a template, presented by a dialog
/// widget over a backdrop, emitting semantic lifecycle events.
///
/// The modal plays the coordinator. It owns its markup exclusively, derives
/// presentation policy from its options, translates raw input into semantic
/// intents (confirm, cancel, focus movement), and pumps widget signals into
/// state transitions and [`ModalEvent`]s on every tick.
pub struct Modal {
    options: ModalOptions,
    content: ModalContent,
    widget: Box<dyn DialogWidget>,
    emitter: Emitter<Modal>,
    open_modals: OpenModals,
    state: ModalState,
    component: ComponentState,
    markup: Option<Markup>,
    prevent_close: bool,
    escape_armed: bool,
    backdrop_armed: bool,
    awaiting_gate: bool,
    focus: Option<FooterButton>,
    stacking: Option<Stacking>,
    signals: SignalHandle,
    signals_rx: mpsc::UnboundedReceiver<ModalSignal>,
}

impl Modal {
    /// Create a modal with the stock [`OverlayDialog`] widget
    pub fn new(options: ModalOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let signals = SignalHandle::new(tx);
        let mut widget: Box<dyn DialogWidget> = Box::new(OverlayDialog::new());
        widget.bind(signals.clone());
        let mut component = ComponentState::new();
        component.is_visible = false;
        Self {
            options,
            content: ModalContent::None,
            widget,
            emitter: Emitter::new(),
            open_modals: OpenModals::new(),
            state: ModalState::Created,
            component,
            markup: None,
            prevent_close: false,
            escape_armed: false,
            backdrop_armed: false,
            awaiting_gate: false,
            focus: None,
            stacking: None,
            signals,
            signals_rx: rx,
        }
    }

    /// Set the body content. Configure before opening; the markup is built
    /// once and text content is baked into it.
    pub fn with_content(mut self, content: impl Into<ModalContent>) -> Self {
        self.content = content.into();
        self
    }

    /// Swap in a custom dialog widget. Must happen before opening.
    pub fn with_widget(mut self, mut widget: Box<dyn DialogWidget>) -> Self {
        widget.bind(self.signals.clone());
        self.widget = widget;
        self
    }

    /// Share an open-count with other modals so stacking weights layer
    pub fn with_open_modals(mut self, open_modals: OpenModals) -> Self {
        self.open_modals = open_modals;
        self
    }

    pub(crate) fn set_open_modals(&mut self, open_modals: OpenModals) {
        self.open_modals = open_modals;
    }

    pub fn options(&self) -> &ModalOptions {
        &self.options
    }

    pub fn state(&self) -> ModalState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ModalState::Opening | ModalState::Open)
    }

    pub fn is_closed(&self) -> bool {
        self.state == ModalState::Closed
    }

    /// The dialog markup, while it exists
    pub fn markup(&self) -> Option<&Markup> {
        self.markup.as_ref()
    }

    /// Layer weights assigned at open time
    pub fn stacking(&self) -> Option<Stacking> {
        self.stacking
    }

    /// Geometry from the widget's last layout pass
    pub fn layout(&self) -> Option<&super::widget::OverlayLayout> {
        self.widget.layout()
    }

    /// Classify a screen coordinate against the presented dialog
    pub fn hit(&self, column: u16, row: u16) -> HitTarget {
        self.widget.hit(column, row)
    }

    /// Register a handler for `event`
    pub fn on(
        &mut self,
        event: ModalEvent,
        handler: impl FnMut(&mut Modal) + Send + Sync + 'static,
    ) -> Subscription {
        self.emitter.on(event, handler)
    }

    /// Register a handler that runs at most once
    pub fn once(
        &mut self,
        event: ModalEvent,
        handler: impl FnMut(&mut Modal) + Send + Sync + 'static,
    ) -> Subscription {
        self.emitter.once(event, handler)
    }

    /// Remove a handler; returns whether it was still registered
    pub fn off(&mut self, event: ModalEvent, subscription: Subscription) -> bool {
        self.emitter.off(event, subscription)
    }

    /// Build the dialog markup from the template. Runs once; later calls are
    /// no-ops, so opening an already rendered modal never duplicates markup.
    pub fn render_markup(&mut self) -> &mut Self {
        if self.state != ModalState::Created {
            return self;
        }
        let ctx = TemplateContext {
            title: self.options.title.clone(),
            allow_cancel: self.options.allow_cancel,
            ok_text: self.options.ok_text.clone(),
            cancel_text: self.options.cancel_text.clone(),
            content_text: self.content.text_for_template(),
        };
        let mut markup = match &self.options.template {
            Some(template) => (template.as_ref())(&ctx),
            None => default_template(&ctx),
        };
        if self.content.is_view() {
            // A content view always claims the body region
            markup.body = Body::ViewSlot;
        }
        self.markup = Some(markup);
        self.state = ModalState::Rendered;
        trace!("dialog markup built");

        let open_hook = match &self.options.animate {
            Animate::Hook(hook) => Some(hook.clone()),
            _ => None,
        };
        if let Some(hook) = open_hook {
            (hook.as_ref())(AnimatePhase::Open, AnimateGate::new(self.signals.clone()));
        }

        self.relayout();
        self
    }

    /// Open the modal: build markup if needed, derive presentation policy,
    /// take a stacking slot, and delegate presentation to the widget. The
    /// shown event is emitted once the widget reports presentation complete.
    pub async fn open(&mut self) -> ModalResult<()> {
        match self.state {
            ModalState::Created | ModalState::Rendered => {}
            ModalState::Closed => return Err(ModalError::Closed),
            _ => return Err(ModalError::AlreadyOpen),
        }
        self.render_markup();

        let show = ShowOptions::derive(&self.options);
        let depth = self.open_modals.increment();
        let stacking = Stacking::for_depth(depth);
        self.widget.set_stacking(stacking);
        self.stacking = Some(stacking);

        if let Err(error) = self.widget.show(show).await {
            self.open_modals.decrement();
            self.stacking = None;
            return Err(error.into());
        }

        self.escape_armed = self.options.keyboard_enabled();
        self.backdrop_armed = self.options.allow_cancel && show.backdrop == Backdrop::On;
        self.state = ModalState::Opening;
        self.component.is_visible = true;
        self.component.has_focus = true;
        debug!(depth, fade = show.fade, "modal opened");
        Ok(())
    }

    /// Open and register `on_ok` against the ok event in one step
    pub async fn open_with(
        &mut self,
        on_ok: impl FnMut(&mut Modal) + Send + Sync + 'static,
    ) -> ModalResult<Subscription> {
        self.open().await?;
        Ok(self.on(ModalEvent::Ok, on_ok))
    }

    /// Close the modal.
    ///
    /// A pending [`prevent_close`](Self::prevent_close) veto consumes itself
    /// here and aborts the close. Otherwise the open-count is released
    /// immediately, dismissal is delegated to the widget (or to the close
    /// phase of an animate hook), and the hidden event follows once the
    /// widget reports dismissal complete. Closing a modal that is not open
    /// is a no-op.
    pub async fn close(&mut self) -> ModalResult<()> {
        if self.prevent_close {
            self.prevent_close = false;
            trace!("close vetoed");
            return Ok(());
        }
        match self.state {
            ModalState::Opening | ModalState::Open => {}
            _ => return Ok(()),
        }
        self.state = ModalState::Closing;
        self.open_modals.decrement();
        debug!("modal closing");

        let close_hook = match &self.options.animate {
            Animate::Hook(hook) => Some(hook.clone()),
            _ => None,
        };
        if let Some(hook) = close_hook {
            self.awaiting_gate = true;
            (hook.as_ref())(AnimatePhase::Close, AnimateGate::new(self.signals.clone()));
        } else {
            self.widget.hide().await?;
        }
        Ok(())
    }

    /// Veto the next close. Typically called from an ok or cancel handler
    /// to keep the dialog open; the flag is consumed by the next
    /// [`close`](Self::close) call, whenever that happens.
    pub fn prevent_close(&mut self) {
        self.prevent_close = true;
    }

    /// Queue a close to run on the next tick. Safe to call from event
    /// handlers and other synchronous contexts.
    pub fn request_close(&self) {
        self.signals.send(ModalSignal::CloseRequested);
    }

    pub fn content(&self) -> &ModalContent {
        &self.content
    }

    fn accepts_input(&self) -> bool {
        matches!(self.state, ModalState::Opening | ModalState::Open)
    }

    /// Forward an event to the content view, then run subscribed handlers
    fn emit(&mut self, event: ModalEvent) {
        trace!(event = %event, "modal event");
        self.forward_to_content(event);
        let mut dispatch = self.emitter.dispatch(event);
        dispatch.run(self);
        self.emitter.finish(dispatch);
    }

    fn forward_to_content(&mut self, event: ModalEvent) {
        if !self.content.is_view() {
            return;
        }
        // The view is taken out so it can receive the modal itself
        if let ModalContent::View(mut view) = std::mem::take(&mut self.content) {
            view.on_modal_event(event, self);
            let replaced = std::mem::replace(&mut self.content, ModalContent::View(view));
            if !replaced.is_none() {
                warn!("content installed during event forwarding was discarded");
            }
        }
    }

    async fn activate_ok(&mut self) -> Result<()> {
        self.emit(ModalEvent::Ok);
        if self.options.ok_closes {
            self.close().await?;
        }
        Ok(())
    }

    /// Cancel intent: emit the event, then close. Running the close after
    /// every cancel handler keeps the veto window open regardless of
    /// subscription order.
    async fn trigger_cancel(&mut self) -> Result<()> {
        self.emit(ModalEvent::Cancel);
        self.close().await?;
        Ok(())
    }

    fn cycle_focus(&mut self) -> bool {
        let Some(markup) = &self.markup else {
            return false;
        };
        let has_ok = markup.has_ok_button();
        let has_cancel = markup.has_cancel_button();
        if !has_ok && !has_cancel {
            return false;
        }
        self.focus = match self.focus {
            None => {
                if has_ok {
                    Some(FooterButton::Ok)
                } else {
                    Some(FooterButton::Cancel)
                }
            }
            Some(FooterButton::Ok) => {
                if has_cancel {
                    Some(FooterButton::Cancel)
                } else {
                    Some(FooterButton::Ok)
                }
            }
            Some(FooterButton::Cancel) => {
                if has_ok {
                    Some(FooterButton::Ok)
                } else {
                    Some(FooterButton::Cancel)
                }
            }
        };
        self.widget.set_focus_target(self.focus);
        true
    }

    fn relayout(&mut self) {
        let area = self.component.size;
        if area.width == 0 || area.height == 0 {
            return;
        }
        let Some(markup) = &self.markup else {
            return;
        };
        let spec = LayoutSpec {
            width: self.options.width,
            content_hint: self.content_hint(),
        };
        self.widget.relayout(area, markup, spec);
        let body = self.widget.layout().map(|layout| layout.body);
        if let (Some(body), ModalContent::View(view)) = (body, &mut self.content) {
            view.set_size(body);
        }
    }

    fn content_hint(&self) -> (u16, u16) {
        match &self.content {
            ModalContent::View(view) => view.preferred_size(),
            _ => (0, 0),
        }
    }

    async fn pump_signals(&mut self) -> Result<()> {
        loop {
            let signal = match self.signals_rx.try_recv() {
                Ok(signal) => signal,
                Err(_) => break,
            };
            self.process_signal(signal).await?;
        }
        Ok(())
    }

    async fn process_signal(&mut self, signal: ModalSignal) -> Result<()> {
        match signal {
            ModalSignal::Shown => {
                if self.state == ModalState::Opening {
                    self.state = ModalState::Open;
                    debug!("modal shown");
                    if self.options.focus_ok
                        && self.markup.as_ref().map_or(false, Markup::has_ok_button)
                    {
                        self.focus = Some(FooterButton::Ok);
                        self.widget.set_focus_target(self.focus);
                    }
                    self.emit(ModalEvent::Shown);
                }
            }
            ModalSignal::Hidden => {
                if self.state == ModalState::Closing {
                    self.markup = None;
                    self.state = ModalState::Closed;
                    self.component.is_visible = false;
                    self.component.has_focus = false;
                    self.focus = None;
                    debug!("modal hidden");
                    self.emit(ModalEvent::Hidden);
                }
            }
            ModalSignal::ProceedClose => {
                if self.state == ModalState::Closing && self.awaiting_gate {
                    self.awaiting_gate = false;
                    self.widget.hide().await?;
                }
            }
            ModalSignal::CloseRequested => {
                self.close().await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Component for Modal {
    async fn handle_key_event(&mut self, event: KeyEvent) -> Result<()> {
        if !self.accepts_input() {
            return Ok(());
        }
        match event.code {
            KeyCode::Esc if event.modifiers.is_empty() => {
                if self.escape_armed {
                    self.escape_armed = false;
                    self.trigger_cancel().await?;
                }
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Left | KeyCode::Right => {
                if !self.cycle_focus() {
                    if let ModalContent::View(view) = &mut self.content {
                        view.handle_key_event(event).await?;
                    }
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') if self.focus.is_some() => match self.focus {
                Some(FooterButton::Ok) => self.activate_ok().await?,
                Some(FooterButton::Cancel) => self.trigger_cancel().await?,
                None => {}
            },
            _ => {
                if let ModalContent::View(view) = &mut self.content {
                    view.handle_key_event(event).await?;
                }
            }
        }
        Ok(())
    }

    async fn handle_mouse_event(&mut self, event: MouseEvent) -> Result<()> {
        if !self.accepts_input() {
            return Ok(());
        }
        if !matches!(event.kind, MouseEventKind::Down(MouseButton::Left)) {
            if let ModalContent::View(view) = &mut self.content {
                view.handle_mouse_event(event).await?;
            }
            return Ok(());
        }
        match self.widget.hit(event.column, event.row) {
            HitTarget::CloseIcon => self.trigger_cancel().await?,
            HitTarget::OkButton => self.activate_ok().await?,
            HitTarget::CancelButton => self.trigger_cancel().await?,
            HitTarget::Backdrop => {
                if self.backdrop_armed {
                    self.backdrop_armed = false;
                    self.trigger_cancel().await?;
                }
            }
            HitTarget::Body => {
                if let ModalContent::View(view) = &mut self.content {
                    view.handle_mouse_event(event).await?;
                }
            }
            HitTarget::Surface | HitTarget::Outside => {}
        }
        Ok(())
    }

    async fn tick(&mut self) -> Result<()> {
        self.widget.tick().await?;
        self.pump_signals().await?;
        if let ModalContent::View(view) = &mut self.content {
            view.tick().await?;
        }
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        if self.component.size != area {
            self.component.size = area;
            self.relayout();
        }
        if !self.widget.is_presented() {
            return;
        }
        let Some(markup) = &self.markup else {
            return;
        };
        self.widget.render(frame, area, markup, theme);
        let body = self.widget.layout().map(|layout| layout.body);
        if let (Some(body), ModalContent::View(view)) = (body, &mut self.content) {
            if body.width > 0 && body.height > 0 {
                view.set_size(body);
                view.render(frame, body, theme);
            }
        }
    }

    fn size(&self) -> Rect {
        self.component.size
    }

    fn set_size(&mut self, size: Rect) {
        self.component.size = size;
        self.relayout();
    }

    fn has_focus(&self) -> bool {
        self.component.has_focus
    }

    fn set_focus(&mut self, focus: bool) {
        self.component.has_focus = focus;
    }

    fn is_visible(&self) -> bool {
        self.component.is_visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.component.is_visible = visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modal::content::ContentView;
    use crossterm::event::KeyModifiers;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const AREA: Rect = Rect {
        x: 0,
        y: 0,
        width: 80,
        height: 24,
    };

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::from(code)
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::empty(),
        }
    }

    async fn opened(options: ModalOptions) -> Modal {
        let mut modal = Modal::new(options).with_content("Are you sure?");
        modal.set_size(AREA);
        modal.open().await.unwrap();
        modal.tick().await.unwrap();
        assert_eq!(modal.state(), ModalState::Open);
        modal
    }

    fn counting(modal: &mut Modal, event: ModalEvent) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        modal.on(event, move |_| {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    struct Probe {
        state: ComponentState,
        seen: Arc<Mutex<Vec<ModalEvent>>>,
        keys: Arc<AtomicUsize>,
    }

    impl Probe {
        fn new() -> (Self, Arc<Mutex<Vec<ModalEvent>>>, Arc<AtomicUsize>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let keys = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    state: ComponentState::new(),
                    seen: seen.clone(),
                    keys: keys.clone(),
                },
                seen,
                keys,
            )
        }
    }

    #[async_trait]
    impl Component for Probe {
        async fn handle_key_event(&mut self, _event: KeyEvent) -> Result<()> {
            self.keys.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn render(&mut self, _frame: &mut Frame, _area: Rect, _theme: &Theme) {}

        fn size(&self) -> Rect {
            self.state.size
        }

        fn set_size(&mut self, size: Rect) {
            self.state.size = size;
        }
    }

    impl ContentView for Probe {
        fn on_modal_event(&mut self, event: ModalEvent, _modal: &mut Modal) {
            self.seen.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn test_open_emits_shown_and_close_emits_hidden() {
        let mut modal = Modal::new(ModalOptions::new().with_title("Confirm"));
        let shown = counting(&mut modal, ModalEvent::Shown);
        let hidden = counting(&mut modal, ModalEvent::Hidden);
        modal.set_size(AREA);

        modal.open().await.unwrap();
        assert_eq!(modal.state(), ModalState::Opening);
        assert!(modal.markup().is_some());

        modal.tick().await.unwrap();
        assert_eq!(modal.state(), ModalState::Open);
        assert_eq!(shown.load(Ordering::SeqCst), 1);

        modal.close().await.unwrap();
        assert_eq!(modal.state(), ModalState::Closing);

        modal.tick().await.unwrap();
        assert_eq!(modal.state(), ModalState::Closed);
        assert_eq!(hidden.load(Ordering::SeqCst), 1);
        assert!(modal.markup().is_none());
    }

    #[tokio::test]
    async fn test_open_lifecycle_errors() {
        let mut modal = Modal::new(ModalOptions::new());
        modal.set_size(AREA);
        modal.open().await.unwrap();

        let again = modal.open().await;
        assert!(matches!(again, Err(ModalError::AlreadyOpen)));

        modal.tick().await.unwrap();
        modal.close().await.unwrap();
        modal.tick().await.unwrap();

        let reopened = modal.open().await;
        assert!(matches!(reopened, Err(ModalError::Closed)));
    }

    #[tokio::test]
    async fn test_open_count_restored_on_close() {
        let counter = OpenModals::new();
        let mut modal = Modal::new(ModalOptions::new()).with_open_modals(counter.clone());
        modal.set_size(AREA);

        modal.open().await.unwrap();
        assert_eq!(counter.count(), 1);
        assert_eq!(modal.stacking(), Some(Stacking::for_depth(0)));

        modal.close().await.unwrap();
        assert_eq!(counter.count(), 0);

        // Repeated closes must not decrement again
        modal.close().await.unwrap();
        modal.tick().await.unwrap();
        modal.close().await.unwrap();
        assert_eq!(counter.count(), 0);
    }

    #[tokio::test]
    async fn test_render_markup_is_idempotent() {
        let mut modal = Modal::new(ModalOptions::new().with_title("Once"));
        modal.set_size(AREA);
        modal.render_markup();
        let first = modal.markup().cloned();
        modal.render_markup();
        assert_eq!(modal.markup().cloned(), first);
        // Opening a pre-rendered modal reuses the markup
        modal.open().await.unwrap();
        assert_eq!(modal.markup().cloned(), first);
    }

    #[tokio::test]
    async fn test_enter_on_focused_ok_emits_and_closes() {
        let mut modal = opened(ModalOptions::new().with_title("Confirm")).await;
        let ok = counting(&mut modal, ModalEvent::Ok);
        let cancel = counting(&mut modal, ModalEvent::Cancel);

        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        modal.tick().await.unwrap();

        assert_eq!(ok.load(Ordering::SeqCst), 1);
        assert_eq!(cancel.load(Ordering::SeqCst), 0);
        assert_eq!(modal.state(), ModalState::Closed);
    }

    #[tokio::test]
    async fn test_ok_closes_false_keeps_modal_open() {
        let mut modal = opened(ModalOptions::new().ok_closes(false)).await;
        let ok = counting(&mut modal, ModalEvent::Ok);

        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        modal.tick().await.unwrap();
        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        modal.tick().await.unwrap();

        assert_eq!(ok.load(Ordering::SeqCst), 2);
        assert_eq!(modal.state(), ModalState::Open);
        assert!(modal.markup().is_some());
    }

    #[tokio::test]
    async fn test_prevent_close_vetoes_one_close() {
        let mut modal = opened(ModalOptions::new()).await;
        let cancel = counting(&mut modal, ModalEvent::Cancel);
        modal.on(ModalEvent::Cancel, |modal| modal.prevent_close());

        modal.handle_key_event(key(KeyCode::Esc)).await.unwrap();
        modal.tick().await.unwrap();

        assert_eq!(cancel.load(Ordering::SeqCst), 1);
        assert_eq!(modal.state(), ModalState::Open);
        assert!(modal.markup().is_some());

        // The veto was consumed; a direct close now goes through
        modal.close().await.unwrap();
        modal.tick().await.unwrap();
        assert_eq!(modal.state(), ModalState::Closed);
    }

    #[tokio::test]
    async fn test_prevent_close_inside_ok_handler_keeps_modal_open() {
        let counter = OpenModals::new();
        let mut modal = Modal::new(ModalOptions::new()).with_open_modals(counter.clone());
        modal.set_size(AREA);
        modal.open().await.unwrap();
        modal.tick().await.unwrap();
        let ok = counting(&mut modal, ModalEvent::Ok);
        modal.on(ModalEvent::Ok, |modal| modal.prevent_close());

        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        modal.tick().await.unwrap();

        assert_eq!(ok.load(Ordering::SeqCst), 1);
        assert_eq!(modal.state(), ModalState::Open);
        assert!(modal.markup().is_some());
        assert_eq!(counter.count(), 1);
    }

    #[tokio::test]
    async fn test_escape_requires_allow_cancel_and_escape() {
        let mut modal = opened(ModalOptions::new().allow_cancel(false)).await;
        let cancel = counting(&mut modal, ModalEvent::Cancel);
        modal.handle_key_event(key(KeyCode::Esc)).await.unwrap();
        modal.tick().await.unwrap();
        assert_eq!(cancel.load(Ordering::SeqCst), 0);
        assert_eq!(modal.state(), ModalState::Open);

        let mut modal = opened(ModalOptions::new().escape(false)).await;
        let cancel = counting(&mut modal, ModalEvent::Cancel);
        modal.handle_key_event(key(KeyCode::Esc)).await.unwrap();
        modal.tick().await.unwrap();
        assert_eq!(cancel.load(Ordering::SeqCst), 0);
        assert_eq!(modal.state(), ModalState::Open);
    }

    #[tokio::test]
    async fn test_backdrop_click_cancels_and_is_one_shot() {
        let mut modal = opened(ModalOptions::new()).await;
        let cancel = counting(&mut modal, ModalEvent::Cancel);
        modal.on(ModalEvent::Cancel, |modal| modal.prevent_close());
        assert_eq!(modal.hit(0, 0), HitTarget::Backdrop);

        modal.handle_mouse_event(click(0, 0)).await.unwrap();
        modal.tick().await.unwrap();
        assert_eq!(cancel.load(Ordering::SeqCst), 1);
        assert_eq!(modal.state(), ModalState::Open);

        // The one-shot is spent even though the close was vetoed
        modal.handle_mouse_event(click(0, 0)).await.unwrap();
        modal.tick().await.unwrap();
        assert_eq!(cancel.load(Ordering::SeqCst), 1);
        assert_eq!(modal.state(), ModalState::Open);
    }

    #[tokio::test]
    async fn test_allow_cancel_false_disarms_backdrop_clicks() {
        let mut modal = opened(ModalOptions::new().allow_cancel(false)).await;
        let cancel = counting(&mut modal, ModalEvent::Cancel);

        modal.handle_mouse_event(click(0, 0)).await.unwrap();
        modal.tick().await.unwrap();

        assert_eq!(cancel.load(Ordering::SeqCst), 0);
        assert_eq!(modal.state(), ModalState::Open);
        assert!(modal.markup().is_some());
    }

    #[tokio::test]
    async fn test_static_backdrop_ignores_clicks() {
        let mut modal = opened(ModalOptions::new().with_backdrop(Backdrop::Static)).await;
        let cancel = counting(&mut modal, ModalEvent::Cancel);

        modal.handle_mouse_event(click(0, 0)).await.unwrap();
        modal.tick().await.unwrap();
        assert_eq!(cancel.load(Ordering::SeqCst), 0);
        assert_eq!(modal.state(), ModalState::Open);

        // Escape still works; only the backdrop is inert
        modal.handle_key_event(key(KeyCode::Esc)).await.unwrap();
        modal.tick().await.unwrap();
        assert_eq!(cancel.load(Ordering::SeqCst), 1);
        assert_eq!(modal.state(), ModalState::Closed);
    }

    #[tokio::test]
    async fn test_close_icon_click_cancels() {
        let mut modal = opened(ModalOptions::new().with_title("Confirm")).await;
        let cancel = counting(&mut modal, ModalEvent::Cancel);

        let icon = modal.layout().unwrap().close_icon.unwrap();
        modal
            .handle_mouse_event(click(icon.x + 1, icon.y))
            .await
            .unwrap();
        modal.tick().await.unwrap();

        assert_eq!(cancel.load(Ordering::SeqCst), 1);
        assert_eq!(modal.state(), ModalState::Closed);
    }

    #[tokio::test]
    async fn test_button_clicks_map_to_intents() {
        let mut modal = opened(ModalOptions::new().with_title("Confirm")).await;
        let ok = counting(&mut modal, ModalEvent::Ok);

        let button = modal.layout().unwrap().ok_button.unwrap();
        modal
            .handle_mouse_event(click(button.x + 1, button.y + 1))
            .await
            .unwrap();
        modal.tick().await.unwrap();

        assert_eq!(ok.load(Ordering::SeqCst), 1);
        assert_eq!(modal.state(), ModalState::Closed);
    }

    #[tokio::test]
    async fn test_tab_moves_focus_to_cancel() {
        let mut modal = opened(ModalOptions::new()).await;
        let ok = counting(&mut modal, ModalEvent::Ok);
        let cancel = counting(&mut modal, ModalEvent::Cancel);

        modal.handle_key_event(key(KeyCode::Tab)).await.unwrap();
        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        modal.tick().await.unwrap();

        assert_eq!(ok.load(Ordering::SeqCst), 0);
        assert_eq!(cancel.load(Ordering::SeqCst), 1);
        assert_eq!(modal.state(), ModalState::Closed);
    }

    #[tokio::test]
    async fn test_focus_ok_false_forwards_enter_to_content() {
        let (probe, _seen, keys) = Probe::new();
        let mut modal = Modal::new(ModalOptions::new().focus_ok(false))
            .with_content(ModalContent::view(probe));
        modal.set_size(AREA);
        modal.open().await.unwrap();
        modal.tick().await.unwrap();

        let ok = counting(&mut modal, ModalEvent::Ok);
        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        modal.tick().await.unwrap();

        assert_eq!(ok.load(Ordering::SeqCst), 0);
        assert_eq!(keys.load(Ordering::SeqCst), 1);
        assert_eq!(modal.state(), ModalState::Open);
    }

    #[tokio::test]
    async fn test_content_view_sees_events_before_handlers() {
        let (probe, seen, _keys) = Probe::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut modal = Modal::new(ModalOptions::new()).with_content(ModalContent::view(probe));
        let handler_order = order.clone();
        modal.on(ModalEvent::Shown, move |_| {
            handler_order.lock().unwrap().push("handler");
        });
        modal.set_size(AREA);

        modal.open().await.unwrap();
        modal.tick().await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![ModalEvent::Shown]);
        assert_eq!(*order.lock().unwrap(), vec!["handler"]);

        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        modal.tick().await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ModalEvent::Shown, ModalEvent::Ok, ModalEvent::Hidden]
        );
    }

    #[tokio::test]
    async fn test_custom_template_controls_markup() {
        let options = ModalOptions::new().with_title("ignored").with_template(|ctx| Markup {
            header: None,
            body: Body::Text(format!("asked: {}", ctx.title.as_deref().unwrap_or(""))),
            footer: None,
        });
        let mut modal = Modal::new(options);
        modal.set_size(AREA);
        modal.open().await.unwrap();
        modal.tick().await.unwrap();

        let markup = modal.markup().unwrap();
        assert!(markup.header.is_none());
        assert!(markup.footer.is_none());
        assert_eq!(markup.body, Body::Text("asked: ignored".to_string()));

        // No footer means Enter has nothing to activate
        let ok = counting(&mut modal, ModalEvent::Ok);
        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        assert_eq!(ok.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_animate_hook_gates_the_close() {
        let phases = Arc::new(Mutex::new(Vec::new()));
        let gate_slot: Arc<Mutex<Option<AnimateGate>>> = Arc::new(Mutex::new(None));
        let hook_phases = phases.clone();
        let hook_slot = gate_slot.clone();
        let options = ModalOptions::new().with_animate_hook(move |phase, gate| {
            hook_phases.lock().unwrap().push(phase);
            if phase == AnimatePhase::Close {
                *hook_slot.lock().unwrap() = Some(gate);
            }
        });

        let mut modal = Modal::new(options);
        modal.set_size(AREA);
        modal.open().await.unwrap();
        modal.tick().await.unwrap();
        assert_eq!(*phases.lock().unwrap(), vec![AnimatePhase::Open]);

        modal.close().await.unwrap();
        modal.tick().await.unwrap();
        // Hide is deferred until the hook proceeds
        assert_eq!(modal.state(), ModalState::Closing);
        assert_eq!(
            *phases.lock().unwrap(),
            vec![AnimatePhase::Open, AnimatePhase::Close]
        );

        gate_slot.lock().unwrap().take().unwrap().proceed();
        modal.tick().await.unwrap();
        assert_eq!(modal.state(), ModalState::Closed);
    }

    #[tokio::test]
    async fn test_fade_widget_drives_lifecycle_through_ticks() {
        let widget = OverlayDialog::new().with_fade_duration(Duration::ZERO);
        let mut modal = Modal::new(ModalOptions::new().with_animate(Animate::Fade))
            .with_widget(Box::new(widget));
        modal.set_size(AREA);

        modal.open().await.unwrap();
        assert_eq!(modal.state(), ModalState::Opening);

        modal.tick().await.unwrap();
        assert_eq!(modal.state(), ModalState::Open);

        modal.close().await.unwrap();
        assert_eq!(modal.state(), ModalState::Closing);

        modal.tick().await.unwrap();
        assert_eq!(modal.state(), ModalState::Closed);
    }

    #[tokio::test]
    async fn test_request_close_runs_on_next_tick() {
        let mut modal = opened(ModalOptions::new()).await;
        modal.request_close();
        assert_eq!(modal.state(), ModalState::Open);

        modal.tick().await.unwrap();
        assert_eq!(modal.state(), ModalState::Closed);
    }

    #[tokio::test]
    async fn test_once_and_off_subscriptions() {
        let mut modal = opened(ModalOptions::new().ok_closes(false)).await;
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        modal.once(ModalEvent::Ok, move |_| {
            inner.fetch_add(1, Ordering::SeqCst);
        });

        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let removed = count.clone();
        let subscription = modal.on(ModalEvent::Ok, move |_| {
            removed.fetch_add(10, Ordering::SeqCst);
        });
        assert!(modal.off(ModalEvent::Ok, subscription));
        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_open_with_registers_ok_callback() {
        let mut modal = Modal::new(ModalOptions::new());
        modal.set_size(AREA);
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        modal
            .open_with(move |_| {
                inner.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        modal.tick().await.unwrap();

        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        modal.tick().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(modal.state(), ModalState::Closed);
    }

    #[tokio::test]
    async fn test_handler_can_requeue_subscriptions_during_emit() {
        let mut modal = opened(ModalOptions::new().ok_closes(false)).await;
        let count = Arc::new(AtomicUsize::new(0));
        let outer = count.clone();
        modal.on(ModalEvent::Ok, move |modal| {
            outer.fetch_add(1, Ordering::SeqCst);
            let inner = outer.clone();
            modal.once(ModalEvent::Ok, move |_| {
                inner.fetch_add(100, Ordering::SeqCst);
            });
        });

        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 102);
    }

    #[tokio::test]
    async fn test_handler_can_unsubscribe_another_during_emit() {
        let mut modal = opened(ModalOptions::new().ok_closes(false)).await;
        let count = Arc::new(AtomicUsize::new(0));
        let noisy = count.clone();
        let subscription = modal.on(ModalEvent::Ok, move |_| {
            noisy.fetch_add(1, Ordering::SeqCst);
        });
        let removed = Arc::new(AtomicBool::new(false));
        let outcome = removed.clone();
        modal.on(ModalEvent::Ok, move |modal| {
            outcome.fetch_or(modal.off(ModalEvent::Ok, subscription), Ordering::SeqCst);
        });

        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        assert!(removed.load(Ordering::SeqCst));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        modal.handle_key_event(key(KeyCode::Enter)).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
