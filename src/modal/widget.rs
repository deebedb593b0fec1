use super::options::{Animate, Backdrop, ModalOptions};
use super::signal::SignalHandle;
use super::stack::Stacking;
use super::template::{Body, Footer, Markup};
use crate::{theme::Theme, Frame};
use anyhow::Result;
use async_trait::async_trait;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use std::time::{Duration, Instant};
use tracing::trace;
use unicode_width::UnicodeWidthStr;

/// Presentation options a modal derives from its [`ModalOptions`] at show time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowOptions {
    /// Whether the Escape shortcut is live
    pub keyboard: bool,
    /// Effective backdrop behavior
    pub backdrop: Backdrop,
    /// Whether presentation and dismissal fade
    pub fade: bool,
}

impl ShowOptions {
    pub fn derive(options: &ModalOptions) -> Self {
        Self {
            keyboard: options.keyboard_enabled(),
            backdrop: options.effective_backdrop(),
            fade: matches!(options.animate, Animate::Fade),
        }
    }
}

/// Footer button identity, used for focus tracking and activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FooterButton {
    Ok,
    Cancel,
}

/// What lies under a screen coordinate while a dialog is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    /// Not over the dialog, its backdrop, or the screen at all
    Outside,
    /// Over the dimmed layer behind the surface
    Backdrop,
    /// Over dialog chrome with no specific control
    Surface,
    /// Over the body region
    Body,
    OkButton,
    CancelButton,
    CloseIcon,
}

/// Sizing inputs the modal hands its widget at layout time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutSpec {
    /// Fixed surface width, if configured
    pub width: Option<u16>,
    /// Preferred (width, height) of a nested content view
    pub content_hint: (u16, u16),
}

/// Contract between a modal and its dialog widget collaborator.
///
/// The widget owns presentation: geometry, chrome, backdrop, and animation.
/// It reports presentation milestones through the bound [`SignalHandle`],
/// once per show and once per hide. The modal owns everything else.
#[async_trait]
pub trait DialogWidget: Send + Sync {
    /// Install the channel the widget reports shown/hidden through
    fn bind(&mut self, signals: SignalHandle);

    /// Present the dialog surface
    async fn show(&mut self, options: ShowOptions) -> Result<()>;

    /// Dismiss the dialog surface
    async fn hide(&mut self) -> Result<()>;

    /// Advance animations; completion is reported through the signal handle
    async fn tick(&mut self) -> Result<()>;

    /// Recompute geometry for a screen area
    fn relayout(&mut self, area: Rect, markup: &Markup, spec: LayoutSpec);

    /// Geometry from the last layout pass
    fn layout(&self) -> Option<&OverlayLayout>;

    /// Hit-test a screen coordinate against the last layout pass
    fn hit(&self, column: u16, row: u16) -> HitTarget;

    /// Layer weights for the backdrop and the surface
    fn set_stacking(&mut self, stacking: Stacking);

    /// Footer button to draw highlighted, if any
    fn set_focus_target(&mut self, focus: Option<FooterButton>);

    /// True from the start of `show` until dismissal completes
    fn is_presented(&self) -> bool;

    /// Draw the backdrop, chrome, text body, and footer for this frame
    fn render(&mut self, frame: &mut Frame, area: Rect, markup: &Markup, theme: &Theme);
}

const MIN_SURFACE_WIDTH: u16 = 24;
const MAX_BODY_TEXT_WIDTH: u16 = 46;
const FOOTER_HEIGHT: u16 = 3;

/// Resolved geometry for a presented dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayLayout {
    pub screen: Rect,
    pub surface: Rect,
    pub header: Option<Rect>,
    pub close_icon: Option<Rect>,
    pub body: Rect,
    pub footer: Option<Rect>,
    pub ok_button: Option<Rect>,
    pub cancel_button: Option<Rect>,
}

impl OverlayLayout {
    /// Resolve markup against a screen area: the surface is centered, sized
    /// to the fixed width when given and to fit content otherwise.
    pub fn compute(screen: Rect, markup: &Markup, spec: LayoutSpec) -> Self {
        let width = Self::surface_width(screen, markup, spec);
        let text_width = width.saturating_sub(4) as usize;

        let header_rows = u16::from(markup.header.is_some());
        let body_rows = match &markup.body {
            Body::Empty => 1,
            Body::Text(text) => Self::wrapped_height(text, text_width),
            Body::ViewSlot => spec.content_hint.1.max(1),
        };
        let footer_rows = if markup.footer.is_some() {
            FOOTER_HEIGHT
        } else {
            0
        };

        let height = (2 + header_rows + body_rows + footer_rows).min(screen.height);
        let x = screen.x + screen.width.saturating_sub(width) / 2;
        let y = screen.y + screen.height.saturating_sub(height) / 2;
        let surface = Rect::new(x, y, width, height);
        let inner = Rect {
            x: surface.x + 1,
            y: surface.y + 1,
            width: surface.width.saturating_sub(2),
            height: surface.height.saturating_sub(2),
        };

        let mut cursor = inner.y;
        let header = markup.header.as_ref().map(|_| {
            let rect = intersect(Rect::new(inner.x, cursor, inner.width, 1), inner);
            cursor += 1;
            rect
        });
        let close_icon = match (&markup.header, header) {
            (Some(header), Some(rect)) if header.close_icon && rect.width > 0 => {
                let icon_width = 3.min(rect.width);
                Some(Rect::new(
                    rect.x + rect.width - icon_width,
                    rect.y,
                    icon_width,
                    1,
                ))
            }
            _ => None,
        };

        let body = intersect(
            Rect::new(
                inner.x + 1,
                cursor,
                inner.width.saturating_sub(2),
                body_rows,
            ),
            inner,
        );
        cursor += body_rows;

        let footer = markup
            .footer
            .as_ref()
            .map(|_| intersect(Rect::new(inner.x, cursor, inner.width, FOOTER_HEIGHT), inner));
        let (ok_button, cancel_button) = match (&markup.footer, footer) {
            (Some(footer), Some(rect)) if rect.width > 0 && rect.height > 0 => {
                Self::footer_buttons(footer, rect)
            }
            _ => (None, None),
        };

        Self {
            screen,
            surface,
            header,
            close_icon,
            body,
            footer,
            ok_button,
            cancel_button,
        }
    }

    fn surface_width(screen: Rect, markup: &Markup, spec: LayoutSpec) -> u16 {
        if let Some(width) = spec.width {
            return width.min(screen.width);
        }

        let title_width = markup.header.as_ref().map_or(0, |header| {
            let icon = if header.close_icon { 4 } else { 0 };
            header.title.as_str().width() as u16 + 4 + icon
        });
        let body_width = match &markup.body {
            Body::Empty => 0,
            Body::Text(text) => {
                let longest = text
                    .lines()
                    .map(|line| line.width() as u16)
                    .max()
                    .unwrap_or(0);
                longest.min(MAX_BODY_TEXT_WIDTH) + 4
            }
            Body::ViewSlot => spec.content_hint.0.saturating_add(4),
        };
        let footer_width = markup.footer.as_ref().map_or(0, |footer| {
            let ok = footer
                .ok
                .as_deref()
                .map_or(0, |label| label.width() as u16 + 4);
            let cancel = footer
                .cancel
                .as_deref()
                .map_or(0, |label| label.width() as u16 + 4);
            let gap = if ok > 0 && cancel > 0 { 1 } else { 0 };
            ok + cancel + gap + 4
        });

        title_width
            .max(body_width)
            .max(footer_width)
            .max(MIN_SURFACE_WIDTH)
            .min(screen.width)
    }

    fn wrapped_height(text: &str, width: usize) -> u16 {
        if width == 0 {
            return 1;
        }
        let rows: usize = text
            .lines()
            .map(|line| {
                if line.is_empty() {
                    1
                } else {
                    textwrap::wrap(line, width).len()
                }
            })
            .sum();
        rows.max(1) as u16
    }

    fn footer_buttons(footer: &Footer, area: Rect) -> (Option<Rect>, Option<Rect>) {
        let mut right = area.x + area.width;
        let mut place = |label: &str| {
            let width = (label.width() as u16 + 4).min(area.width);
            let x = right.saturating_sub(width).max(area.x);
            right = x.saturating_sub(1);
            Rect::new(x, area.y, width, area.height)
        };
        // Confirm sits at the right edge, dismiss to its left
        let ok = footer.ok.as_deref().map(&mut place);
        let cancel = footer.cancel.as_deref().map(&mut place);
        (ok, cancel)
    }

    /// Classify a screen coordinate, most specific control first
    pub fn hit(&self, column: u16, row: u16) -> HitTarget {
        if let Some(rect) = self.close_icon {
            if contains(rect, column, row) {
                return HitTarget::CloseIcon;
            }
        }
        if let Some(rect) = self.ok_button {
            if contains(rect, column, row) {
                return HitTarget::OkButton;
            }
        }
        if let Some(rect) = self.cancel_button {
            if contains(rect, column, row) {
                return HitTarget::CancelButton;
            }
        }
        if contains(self.body, column, row) {
            return HitTarget::Body;
        }
        if contains(self.surface, column, row) {
            return HitTarget::Surface;
        }
        if contains(self.screen, column, row) {
            return HitTarget::Backdrop;
        }
        HitTarget::Outside
    }
}

fn contains(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn indent(rect: Rect, columns: u16) -> Rect {
    let shift = columns.min(rect.width);
    Rect {
        x: rect.x + shift,
        width: rect.width - shift,
        ..rect
    }
}

fn intersect(rect: Rect, bounds: Rect) -> Rect {
    let x1 = rect.x.max(bounds.x);
    let y1 = rect.y.max(bounds.y);
    let x2 = (rect.x + rect.width).min(bounds.x + bounds.width);
    let y2 = (rect.y + rect.height).min(bounds.y + bounds.height);
    Rect {
        x: x1,
        y: y1,
        width: x2.saturating_sub(x1),
        height: y2.saturating_sub(y1),
    }
}

/// Presentation phase of the stock overlay widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Opening { since: Instant },
    Presented,
    Closing { since: Instant },
    Dismissed,
}

const FADE_DURATION: Duration = Duration::from_millis(300);

/// Stock [`DialogWidget`]: a centered bordered box over a dimmed backdrop,
/// with an optional tick-driven fade in and out.
pub struct OverlayDialog {
    signals: Option<SignalHandle>,
    show_options: ShowOptions,
    stacking: Stacking,
    phase: Phase,
    fade_duration: Duration,
    layout: Option<OverlayLayout>,
    spec: LayoutSpec,
    area: Rect,
    focus: Option<FooterButton>,
}

impl OverlayDialog {
    pub fn new() -> Self {
        Self {
            signals: None,
            show_options: ShowOptions {
                keyboard: true,
                backdrop: Backdrop::On,
                fade: false,
            },
            stacking: Stacking::default(),
            phase: Phase::Idle,
            fade_duration: FADE_DURATION,
            layout: None,
            spec: LayoutSpec::default(),
            area: Rect::default(),
            focus: None,
        }
    }

    /// Override how long the fade runs
    pub fn with_fade_duration(mut self, duration: Duration) -> Self {
        self.fade_duration = duration;
        self
    }

    /// Current opacity in `[0, 1]`, following the fade phase
    pub fn opacity(&self) -> f32 {
        match self.phase {
            Phase::Idle | Phase::Dismissed => 0.0,
            Phase::Presented => 1.0,
            Phase::Opening { since } => self.progress(since),
            Phase::Closing { since } => 1.0 - self.progress(since),
        }
    }

    /// Assigned layer weights
    pub fn stacking(&self) -> Stacking {
        self.stacking
    }

    fn progress(&self, since: Instant) -> f32 {
        if self.fade_duration.is_zero() {
            return 1.0;
        }
        let linear = since.elapsed().as_secs_f32() / self.fade_duration.as_secs_f32();
        smoothstep(linear.clamp(0.0, 1.0))
    }

    fn signal_shown(&self) {
        if let Some(signals) = &self.signals {
            signals.shown();
        }
    }

    fn signal_hidden(&self) {
        if let Some(signals) = &self.signals {
            signals.hidden();
        }
    }

    fn render_button(
        &self,
        frame: &mut Frame,
        rect: Rect,
        label: &str,
        focused: bool,
        surface_bg: Color,
        opacity: f32,
        theme: &Theme,
    ) {
        if rect.width == 0 || rect.height == 0 {
            return;
        }
        let (style, border_style) = if focused {
            (
                theme
                    .button_focused_style()
                    .bg(blend(surface_bg, theme.primary, opacity)),
                theme.focused_border_style(),
            )
        } else {
            (
                theme.button_style().bg(surface_bg),
                Style::default().fg(blend(surface_bg, theme.border, opacity)),
            )
        };
        let button = Paragraph::new(label)
            .alignment(Alignment::Center)
            .style(style)
            .block(Block::default().borders(Borders::ALL).border_style(border_style));
        frame.render_widget(button, rect);
    }
}

impl Default for OverlayDialog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DialogWidget for OverlayDialog {
    fn bind(&mut self, signals: SignalHandle) {
        self.signals = Some(signals);
    }

    async fn show(&mut self, options: ShowOptions) -> Result<()> {
        if self.is_presented() {
            trace!("show ignored; dialog already presented");
            return Ok(());
        }
        self.show_options = options;
        if options.fade {
            self.phase = Phase::Opening {
                since: Instant::now(),
            };
        } else {
            self.phase = Phase::Presented;
            self.signal_shown();
        }
        Ok(())
    }

    async fn hide(&mut self) -> Result<()> {
        match self.phase {
            Phase::Idle | Phase::Dismissed | Phase::Closing { .. } => {
                trace!("hide ignored; dialog not presented");
            }
            Phase::Opening { .. } | Phase::Presented => {
                if self.show_options.fade {
                    self.phase = Phase::Closing {
                        since: Instant::now(),
                    };
                } else {
                    self.phase = Phase::Dismissed;
                    self.signal_hidden();
                }
            }
        }
        Ok(())
    }

    async fn tick(&mut self) -> Result<()> {
        match self.phase {
            Phase::Opening { since } => {
                if since.elapsed() >= self.fade_duration {
                    self.phase = Phase::Presented;
                    self.signal_shown();
                }
            }
            Phase::Closing { since } => {
                if since.elapsed() >= self.fade_duration {
                    self.phase = Phase::Dismissed;
                    self.signal_hidden();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn relayout(&mut self, area: Rect, markup: &Markup, spec: LayoutSpec) {
        self.area = area;
        self.spec = spec;
        if area.width == 0 || area.height == 0 {
            self.layout = None;
            return;
        }
        self.layout = Some(OverlayLayout::compute(area, markup, spec));
    }

    fn layout(&self) -> Option<&OverlayLayout> {
        self.layout.as_ref()
    }

    fn hit(&self, column: u16, row: u16) -> HitTarget {
        if !self.is_presented() {
            return HitTarget::Outside;
        }
        let Some(layout) = &self.layout else {
            return HitTarget::Outside;
        };
        let target = layout.hit(column, row);
        if target == HitTarget::Backdrop && self.show_options.backdrop == Backdrop::Off {
            // Nothing is drawn there, so nothing is hit
            return HitTarget::Outside;
        }
        target
    }

    fn set_stacking(&mut self, stacking: Stacking) {
        self.stacking = stacking;
    }

    fn set_focus_target(&mut self, focus: Option<FooterButton>) {
        self.focus = focus;
    }

    fn is_presented(&self) -> bool {
        matches!(
            self.phase,
            Phase::Opening { .. } | Phase::Presented | Phase::Closing { .. }
        )
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, markup: &Markup, theme: &Theme) {
        if !self.is_presented() {
            return;
        }
        if self.area != area || self.layout.is_none() {
            self.relayout(area, markup, self.spec);
        }
        let Some(layout) = self.layout.clone() else {
            return;
        };
        let opacity = self.opacity();

        if self.show_options.backdrop != Backdrop::Off {
            // Dim what is beneath without erasing it
            frame.render_widget(Block::default().style(theme.backdrop_style()), area);
        }

        if layout.surface.width == 0 || layout.surface.height == 0 {
            return;
        }
        frame.render_widget(Clear, layout.surface);

        let surface_bg = blend(theme.background, theme.background_alt, opacity);
        let border_color = blend(theme.background, theme.border, opacity);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .style(theme.surface_style().bg(surface_bg));
        frame.render_widget(block, layout.surface);

        if let (Some(header), Some(rect)) = (&markup.header, layout.header) {
            let title_color = blend(surface_bg, theme.text_bright, opacity);
            let title = Paragraph::new(header.title.as_str())
                .style(theme.title_style().fg(title_color).bg(surface_bg));
            frame.render_widget(title, indent(rect, 1));
            if let Some(icon_rect) = layout.close_icon {
                let icon = Paragraph::new(" ✕ ").style(theme.close_icon_style().bg(surface_bg));
                frame.render_widget(icon, icon_rect);
            }
        }

        if let Body::Text(text) = &markup.body {
            let body_color = blend(surface_bg, theme.text, opacity);
            let body = Paragraph::new(text.as_str())
                .wrap(Wrap { trim: false })
                .style(Style::default().fg(body_color).bg(surface_bg));
            frame.render_widget(body, layout.body);
        }

        if let Some(footer) = &markup.footer {
            if let (Some(label), Some(rect)) = (footer.cancel.as_deref(), layout.cancel_button) {
                let focused = self.focus == Some(FooterButton::Cancel);
                self.render_button(frame, rect, label, focused, surface_bg, opacity, theme);
            }
            if let (Some(label), Some(rect)) = (footer.ok.as_deref(), layout.ok_button) {
                let focused = self.focus == Some(FooterButton::Ok);
                self.render_button(frame, rect, label, focused, surface_bg, opacity, theme);
            }
        }
    }
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Blend `target` toward `base`; opacity 1.0 keeps the target color
fn blend(base: Color, target: Color, opacity: f32) -> Color {
    match (base, target) {
        (Color::Rgb(br, bg, bb), Color::Rgb(tr, tg, tb)) => {
            let mix = |b: u8, t: u8| (b as f32 + (t as f32 - b as f32) * opacity) as u8;
            Color::Rgb(mix(br, tr), mix(bg, tg), mix(bb, tb))
        }
        _ => target,
    }
}
