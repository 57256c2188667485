//! Display abstraction for the character-grid terminal
//!
//! This module provides a unified interface for painting styled text at
//! (row, column) positions, so the panels can be rendered to a real terminal
//! ([`terminal`]) or to an in-memory grid ([`mock`]).

pub mod mock;
pub mod terminal;

pub use mock::{DrawOp, MockDisplay};
pub use terminal::TerminalDisplay;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Draw at row {row}, column {col} is outside the {rows}x{cols} screen")]
    OutOfBounds { row: u16, col: u16, rows: u16, cols: u16 },

    #[error("Terminal is {cols}x{rows}, at least {min_cols}x{min_rows} is required")]
    TooSmall { cols: u16, rows: u16, min_cols: u16, min_rows: u16 },
}

/// Color/attribute selection for a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    /// Terminal default colors
    Plain,
    /// Left panel accent (cyan); also the armed-switch dot
    Primary,
    /// Right panel accent (green)
    Secondary,
    /// Left dot when the switch is off (magenta)
    Idle,
}

/// Unified interface for character-grid output
pub trait Display {
    /// Screen size as (columns, rows)
    fn size(&self) -> Result<(u16, u16), DisplayError>;

    /// Blank the whole screen
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Write `text` starting at (`row`, `col`)
    fn put_str(&mut self, row: u16, col: u16, text: &str, style: Style) -> Result<(), DisplayError>;

    /// Push pending writes to the screen
    fn flush(&mut self) -> Result<(), DisplayError>;
}

/// Draw a single-line box whose outer corners are (`top`, `left`) and
/// (`top + height - 1`, `left + width - 1`)
pub fn draw_box<D: Display + ?Sized>(
    display: &mut D,
    top: u16,
    left: u16,
    height: u16,
    width: u16,
    style: Style,
) -> Result<(), DisplayError> {
    if height < 2 || width < 2 {
        return Ok(());
    }

    let inner = usize::from(width - 2);
    let top_line = format!("┌{}┐", "─".repeat(inner));
    let bottom_line = format!("└{}┘", "─".repeat(inner));

    display.put_str(top, left, &top_line, style)?;
    for row in top + 1..top + height - 1 {
        display.put_str(row, left, "│", style)?;
        display.put_str(row, left + width - 1, "│", style)?;
    }
    display.put_str(top + height - 1, left, &bottom_line, style)?;
    Ok(())
}

/// Like [`draw_box`] but also blanks the interior
pub fn draw_filled_box<D: Display + ?Sized>(
    display: &mut D,
    top: u16,
    left: u16,
    height: u16,
    width: u16,
    style: Style,
) -> Result<(), DisplayError> {
    if height < 2 || width < 2 {
        return Ok(());
    }

    let middle = format!("│{}│", " ".repeat(usize::from(width - 2)));
    draw_box(display, top, left, height, width, style)?;
    for row in top + 1..top + height - 1 {
        display.put_str(row, left, &middle, style)?;
    }
    Ok(())
}
