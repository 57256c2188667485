//! crossterm terminal display
//!
//! Owns the terminal while the dashboard runs: raw mode (no echo, no line
//! buffering), alternate screen and hidden cursor. Everything is restored on
//! [`TerminalDisplay::restore`] or on drop, whichever comes first.
//!
//! Keyboard input is read by a separate task ([`watch_input`]) so drawing
//! never blocks on it.

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::{cursor, execute, queue, terminal};
use futures::stream::StreamExt;
use log::{debug, info, warn};
use std::io::{self, Stdout, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{Display, DisplayError, Style};

fn color_for(style: Style) -> Color {
    match style {
        Style::Plain => Color::Reset,
        Style::Primary => Color::Cyan,
        Style::Secondary => Color::Green,
        Style::Idle => Color::Magenta,
    }
}

/// Real terminal, drawn through queued crossterm commands
pub struct TerminalDisplay {
    out: Stdout,
    cols: u16,
    rows: u16,
    active: bool,
}

impl TerminalDisplay {
    /// Take over the terminal
    pub fn enter() -> Result<Self, DisplayError> {
        let (cols, rows) = terminal::size()?;
        let mut out = io::stdout();

        terminal::enable_raw_mode()?;
        if let Err(e) = execute!(
            out,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All)
        ) {
            let _ = terminal::disable_raw_mode();
            return Err(e.into());
        }

        info!("Terminal ready ({}x{})", cols, rows);
        Ok(Self { out, cols, rows, active: true })
    }

    /// Give the terminal back (idempotent)
    pub fn restore(&mut self) -> Result<(), DisplayError> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        execute!(self.out, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()?;
        debug!("Terminal restored");
        Ok(())
    }
}

impl Display for TerminalDisplay {
    fn size(&self) -> Result<(u16, u16), DisplayError> {
        Ok((self.cols, self.rows))
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        queue!(self.out, ResetColor, terminal::Clear(terminal::ClearType::All))?;
        Ok(())
    }

    fn put_str(&mut self, row: u16, col: u16, text: &str, style: Style) -> Result<(), DisplayError> {
        let width = text.chars().count();
        if row >= self.rows || usize::from(col) + width > usize::from(self.cols) {
            return Err(DisplayError::OutOfBounds { row, col, rows: self.rows, cols: self.cols });
        }

        queue!(
            self.out,
            cursor::MoveTo(col, row),
            SetForegroundColor(color_for(style)),
            Print(text),
            ResetColor
        )?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!("Failed to restore terminal: {}", e);
        }
    }
}

/// Keys that stop the dashboard: `q`, `Esc` and `Ctrl+C` (raw mode swallows SIGINT)
pub fn is_quit_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        KeyCode::Char('q') | KeyCode::Esc => true,
        _ => false,
    }
}

/// Read keyboard input in the background.
///
/// Every key press is forwarded on the returned channel; quit keys also
/// cancel `shutdown`. The task ends when `shutdown` is cancelled or the
/// input stream closes.
pub fn watch_input(shutdown: CancellationToken) -> (JoinHandle<()>, mpsc::Receiver<KeyEvent>) {
    let (sender, receiver) = mpsc::channel(16);

    let handle = tokio::spawn(async move {
        let mut events = EventStream::new();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.next() => match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if is_quit_key(&key) {
                            info!("Quit requested from keyboard");
                            shutdown.cancel();
                        }
                        let _ = sender.try_send(key);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Input error: {}", e);
                        break;
                    }
                    None => break,
                },
            }
        }
        debug!("Input watcher exited");
    });

    (handle, receiver)
}

/// Block until a key is pressed or `shutdown` fires (`Ok(None)`).
///
/// Reads the terminal directly; only for use once [`watch_input`] is gone.
pub fn read_key_blocking(shutdown: CancellationToken) -> io::Result<Option<KeyEvent>> {
    while !shutdown.is_cancelled() {
        if !crossterm::event::poll(Duration::from_millis(100))? {
            continue;
        }
        if let Event::Key(key) = crossterm::event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(Some(key));
            }
        }
    }
    Ok(None)
}

/// Wait for one key press, or for `shutdown`.
///
/// Keys normally arrive from the [`watch_input`] channel. If that watcher has
/// already exited the channel is closed, and `fallback` (usually
/// [`read_key_blocking`]) runs on the blocking pool instead.
pub async fn wait_for_key<F>(keys: &mut mpsc::Receiver<KeyEvent>, shutdown: &CancellationToken, fallback: F)
where
    F: FnOnce(CancellationToken) -> io::Result<Option<KeyEvent>> + Send + 'static,
{
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => return,
        key = keys.recv() => if key.is_some() {
            return;
        },
    }

    debug!("Input watcher gone, reading the terminal directly");
    let token = shutdown.clone();
    match tokio::task::spawn_blocking(move || fallback(token)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!("Key read failed: {}", e),
        Err(e) => warn!("Key reader task failed: {}", e),
    }
}
