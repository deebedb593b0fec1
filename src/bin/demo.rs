//! Interactive tour of the modal overlay crate.
//!
//! Run with `cargo run --bin demo`. A background page stays live while
//! modals open over it; watch the status line react to modal events.

use anyhow::Result;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event as CrosstermEvent, KeyCode, KeyEvent,
    KeyModifiers, MouseEvent,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;
use scrim::modal::{Animate, Modal, ModalOptions, ModalStack};
use scrim::{Component, Frame, ModalEvent, Theme};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Backend = CrosstermBackend<io::Stdout>;

const HELP: &str = "\
o       open a confirm dialog
f       open a fading dialog
ctrl-n  stack a notice on top
q       quit

Inside a dialog: Tab moves focus, Enter activates,
Esc or a backdrop click cancels. The mouse works too.";

struct DemoApp {
    stack: ModalStack,
    theme: Theme,
    status: String,
    status_tx: mpsc::UnboundedSender<String>,
    status_rx: mpsc::UnboundedReceiver<String>,
    opened: usize,
    should_quit: bool,
}

impl DemoApp {
    fn new() -> Self {
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        Self {
            stack: ModalStack::new(),
            theme: Theme::default(),
            status: "ready".to_string(),
            status_tx,
            status_rx,
            opened: 0,
            should_quit: false,
        }
    }

    async fn handle_key(&mut self, event: KeyEvent) -> Result<()> {
        if event.code == KeyCode::Char('c') && event.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return Ok(());
        }
        if event.code == KeyCode::Char('n') && event.modifiers.contains(KeyModifiers::CONTROL) {
            return self.open_notice().await;
        }
        if !self.stack.is_empty() {
            return self.stack.handle_key_event(event).await;
        }
        match event.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('o') => self.open_confirm().await?,
            KeyCode::Char('f') => self.open_fading().await?,
            _ => {}
        }
        Ok(())
    }

    async fn handle_mouse(&mut self, event: MouseEvent) -> Result<()> {
        self.stack.handle_mouse_event(event).await
    }

    async fn tick(&mut self) -> Result<()> {
        self.stack.tick().await?;
        while let Ok(message) = self.status_rx.try_recv() {
            self.status = message;
        }
        Ok(())
    }

    async fn open_confirm(&mut self) -> Result<()> {
        self.opened += 1;
        let label = format!("#{}", self.opened);
        let mut modal = Modal::new(
            ModalOptions::new()
                .with_title(format!("Confirm {label}"))
                .with_ok_text("Yes")
                .with_cancel_text("No"),
        )
        .with_content("Apply the pending changes?");

        let status = self.status_tx.clone();
        let ok_label = label.clone();
        modal.on(ModalEvent::Ok, move |_| {
            let _ = status.send(format!("confirm {ok_label}: confirmed"));
        });
        let status = self.status_tx.clone();
        modal.on(ModalEvent::Cancel, move |_| {
            let _ = status.send(format!("confirm {label}: cancelled"));
        });

        self.stack.push_modal(modal).await?;
        Ok(())
    }

    async fn open_fading(&mut self) -> Result<()> {
        let modal = Modal::new(
            ModalOptions::new()
                .with_title("Fading dialog")
                .with_animate(Animate::Fade),
        )
        .with_content("This one fades in and out.");
        self.stack.push_modal(modal).await?;
        Ok(())
    }

    async fn open_notice(&mut self) -> Result<()> {
        let mut modal = Modal::new(
            ModalOptions::new()
                .with_title("Notice")
                .without_cancel_text(),
        )
        .with_content("Stacked on top of whatever was open.");
        let status = self.status_tx.clone();
        modal.on(ModalEvent::Hidden, move |_| {
            let _ = status.send("notice dismissed".to_string());
        });
        self.stack.push_modal(modal).await?;
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let page = Paragraph::new(HELP)
            .style(self.theme.text_style())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(self.theme.border_style())
                    .title(" scrim demo ")
                    .title_style(self.theme.title_style()),
            );
        frame.render_widget(page, area);

        if area.height > 2 {
            let status_area = Rect::new(area.x + 2, area.y + area.height - 2, area.width.saturating_sub(4), 1);
            let status = Paragraph::new(self.status.as_str()).style(self.theme.dim_style());
            frame.render_widget(status, status_area);
        }

        self.stack.render(frame, area, &self.theme);
    }
}

fn init_logging() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scrim=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}

fn init_terminal() -> Result<Terminal<Backend>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<Backend>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

async fn next_event() -> Result<Option<CrosstermEvent>> {
    let event = tokio::task::spawn_blocking(|| -> Result<Option<CrosstermEvent>> {
        if crossterm::event::poll(Duration::from_millis(50))? {
            Ok(Some(crossterm::event::read()?))
        } else {
            Ok(None)
        }
    })
    .await??;
    Ok(event)
}

async fn run_app(terminal: &mut Terminal<Backend>) -> Result<()> {
    let mut app = DemoApp::new();
    loop {
        terminal.draw(|frame| app.render(frame))?;
        if let Some(event) = next_event().await? {
            match event {
                CrosstermEvent::Key(key) => app.handle_key(key).await?,
                CrosstermEvent::Mouse(mouse) => app.handle_mouse(mouse).await?,
                _ => {}
            }
        }
        app.tick().await?;
        if app.should_quit {
            break;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        eprintln!("{panic_info}");
    }));

    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let mut terminal = match init_terminal() {
        Ok(terminal) => terminal,
        Err(e) => {
            eprintln!("Failed to initialize terminal: {}", e);
            std::process::exit(1);
        }
    };

    let result = run_app(&mut terminal).await;
    if let Err(e) = restore_terminal(&mut terminal) {
        eprintln!("Failed to restore terminal: {}", e);
    }
    if let Err(e) = result {
        error!("Demo error: {}", e);
        std::process::exit(1);
    }
}
