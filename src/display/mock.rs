//! Recording display for testing.
//!
//! This display keeps an in-memory cell grid plus a log of every draw call
//! instead of touching the terminal. Writes outside the grid fail the same
//! way a too-small terminal would.

use log::debug;

use super::{Display, DisplayError, Style};

/// One recorded display call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOp {
    Clear,
    Text { row: u16, col: u16, text: String, style: Style },
    Flush,
}

#[derive(Debug, Clone)]
pub struct MockDisplay {
    cols: u16,
    rows: u16,
    cells: Vec<(char, Style)>,
    ops: Vec<DrawOp>,
}

impl MockDisplay {
    /// Create a blank `cols` x `rows` screen
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            cells: vec![(' ', Style::Plain); usize::from(cols) * usize::from(rows)],
            ops: Vec::new(),
        }
    }

    fn index(&self, row: u16, col: u16) -> usize {
        usize::from(row) * usize::from(self.cols) + usize::from(col)
    }

    /// Character and style at one cell
    pub fn cell(&self, row: u16, col: u16) -> (char, Style) {
        self.cells[self.index(row, col)]
    }

    /// Whole row as a string
    pub fn row_text(&self, row: u16) -> String {
        (0..self.cols).map(|col| self.cell(row, col).0).collect()
    }

    /// Every call since creation or the last [`MockDisplay::take_ops`]
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Drain the call log
    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    /// Text writes in the log, as (row, col, text)
    pub fn texts(&self) -> Vec<(u16, u16, &str)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { row, col, text, .. } => Some((*row, *col, text.as_str())),
                _ => None,
            })
            .collect()
    }
}

impl Display for MockDisplay {
    fn size(&self) -> Result<(u16, u16), DisplayError> {
        Ok((self.cols, self.rows))
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.cells.fill((' ', Style::Plain));
        self.ops.push(DrawOp::Clear);
        Ok(())
    }

    fn put_str(&mut self, row: u16, col: u16, text: &str, style: Style) -> Result<(), DisplayError> {
        let width = text.chars().count();
        if row >= self.rows || usize::from(col) + width > usize::from(self.cols) {
            return Err(DisplayError::OutOfBounds { row, col, rows: self.rows, cols: self.cols });
        }

        for (offset, ch) in text.chars().enumerate() {
            let index = self.index(row, col) + offset;
            self.cells[index] = (ch, style);
        }

        debug!("[MOCK DISPLAY] ({}, {}) {:?}", row, col, text);
        self.ops.push(DrawOp::Text { row, col, text: text.to_string(), style });
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.ops.push(DrawOp::Flush);
        Ok(())
    }
}
