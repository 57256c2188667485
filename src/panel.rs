//! Joystick panel rendering
//!
//! Two panels sit side by side, each showing the numeric readouts of one
//! stick and a box in which a dot tracks the stick position. The framing is
//! painted once; per sample only the readouts and the dot change, and the
//! dot's previous cell is the only thing ever erased.

use log::debug;

use crate::display::{draw_box, draw_filled_box, Display, DisplayError, Style};
use crate::telemetry::{Sample, AXIS_MAX};

/// Tracking box interior height (rows)
pub const BOX_HEIGHT: u16 = 19;

/// Tracking box interior width (columns)
pub const BOX_WIDTH: u16 = BOX_HEIGHT * 2;

/// Window row of the first box interior line
const BOX_TOP: u16 = 7;

/// Window column of the first box interior cell
const BOX_LEFT: u16 = 2;

/// Window column where readout values start
const VALUE_COL: u16 = 6;

/// Smallest window that fits the box plus its own border
const MIN_WINDOW_WIDTH: u16 = BOX_LEFT + BOX_WIDTH + 2;
const MIN_WINDOW_HEIGHT: u16 = BOX_TOP + BOX_HEIGHT + 2;

/// Smallest terminal that fits both windows inside the outer border
pub const MIN_COLS: u16 = (MIN_WINDOW_WIDTH + 2) * 2;
pub const MIN_ROWS: u16 = MIN_WINDOW_HEIGHT + 2;

pub const DOT_GLYPH: &str = "◉";
pub const BLANK_GLYPH: &str = " ";

/// Which stick a panel shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A cell inside the tracking box (0 <= column < BOX_WIDTH, 0 <= row < BOX_HEIGHT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenPoint {
    pub column: u16,
    pub row: u16,
}

/// Map raw stick axes to a box cell.
///
/// The horizontal axis is inverted (higher X, smaller column) and lands in
/// `1..=BOX_WIDTH - 3`. The vertical axis is not inverted and is clamped to
/// the last row so a full-scale reading stays inside the box.
pub fn stick_point(x: u16, y: u16) -> ScreenPoint {
    let max = u32::from(AXIS_MAX);
    let x = u32::from(x.min(AXIS_MAX));
    let y = u32::from(y.min(AXIS_MAX));

    let x_span = u32::from(BOX_WIDTH - 2) - 2;
    let y_rows = u32::from(BOX_HEIGHT);

    // Integer division truncates exactly like the float form for this domain
    let column = 1 + (x_span - x * x_span / max);
    let row = (y * (y_rows - 1) / max).min(y_rows - 1);

    ScreenPoint { column: column as u16, row: row as u16 }
}

/// Result of moving one panel's dot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DotUpdate {
    /// Where the dot is now drawn
    pub point: ScreenPoint,
    /// Cell cleared before drawing, if the dot moved
    pub erased: Option<ScreenPoint>,
}

/// Decide the draw work for a dot given where it was last drawn
pub fn plan_dot(previous: Option<ScreenPoint>, x: u16, y: u16) -> DotUpdate {
    let point = stick_point(x, y);
    let erased = previous.filter(|prev| *prev != point);
    DotUpdate { point, erased }
}

/// Per-panel render memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelState {
    /// Last drawn dot, absent before the first sample
    pub last_point: Option<ScreenPoint>,
    /// Last switch value (left panel only)
    pub last_switch: bool,
}

/// Screen rectangle owned by one panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub top: u16,
    pub left: u16,
    pub height: u16,
    pub width: u16,
}

/// Screen split into the two panel windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub cols: u16,
    pub rows: u16,
    pub left: Window,
    pub right: Window,
}

impl Layout {
    /// Split a `cols` x `rows` screen, failing if the tracking boxes do not fit
    pub fn for_screen(cols: u16, rows: u16) -> Result<Self, DisplayError> {
        if cols < MIN_COLS || rows < MIN_ROWS {
            return Err(DisplayError::TooSmall {
                cols,
                rows,
                min_cols: MIN_COLS,
                min_rows: MIN_ROWS,
            });
        }

        let height = rows - 2;
        let width = cols / 2 - 2;
        Ok(Self {
            cols,
            rows,
            left: Window { top: 1, left: 1, height, width },
            right: Window { top: 1, left: cols / 2 + 1, height, width },
        })
    }
}

/// One joystick panel: its window, labels and dot memory
#[derive(Debug, Clone)]
pub struct Panel {
    side: Side,
    window: Window,
    state: PanelState,
}

impl Panel {
    pub fn new(side: Side, window: Window) -> Self {
        Self { side, window, state: PanelState::default() }
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    fn accent(&self) -> Style {
        match self.side {
            Side::Left => Style::Primary,
            Side::Right => Style::Secondary,
        }
    }

    fn title(&self) -> &'static str {
        match self.side {
            Side::Left => " Joystick 1 ",
            Side::Right => " Joystick 2 ",
        }
    }

    fn has_switch(&self) -> bool {
        self.side == Side::Left
    }

    fn dot_style(&self) -> Style {
        match self.side {
            Side::Left if self.state.last_switch => Style::Primary,
            Side::Left => Style::Idle,
            Side::Right => Style::Secondary,
        }
    }

    /// Write at a window-relative position
    fn put<D: Display + ?Sized>(
        &self,
        display: &mut D,
        row: u16,
        col: u16,
        text: &str,
        style: Style,
    ) -> Result<(), DisplayError> {
        display.put_str(self.window.top + row, self.window.left + col, text, style)
    }

    /// Paint border, title, labels and the empty tracking box
    pub fn draw_static<D: Display + ?Sized>(&self, display: &mut D) -> Result<(), DisplayError> {
        let accent = self.accent();
        let w = self.window;

        draw_box(display, w.top, w.left, w.height, w.width, Style::Plain)?;
        self.put(display, 0, 2, self.title(), accent)?;

        self.put(display, 2, 2, "X :", accent)?;
        self.put(display, 3, 2, "Y :", accent)?;
        if self.has_switch() {
            self.put(display, 4, 2, "SW:", accent)?;
        }

        draw_filled_box(
            display,
            w.top + BOX_TOP - 1,
            w.left + BOX_LEFT - 1,
            BOX_HEIGHT + 2,
            BOX_WIDTH + 2,
            Style::Plain,
        )
    }

    /// Update readouts and move the dot for one sample
    pub fn render<D: Display + ?Sized>(
        &mut self,
        display: &mut D,
        x: u16,
        y: u16,
        switch: Option<bool>,
    ) -> Result<DotUpdate, DisplayError> {
        self.put(display, 2, VALUE_COL, &format!("{:4}", x), Style::Plain)?;
        self.put(display, 3, VALUE_COL, &format!("{:4}", y), Style::Plain)?;

        if let (true, Some(on)) = (self.has_switch(), switch) {
            self.state.last_switch = on;
            let glyph = if on { " + " } else { " - " };
            self.put(display, 4, VALUE_COL, glyph, Style::Plain)?;
        }

        let update = plan_dot(self.state.last_point, x, y);
        if let Some(prev) = update.erased {
            self.put(display, BOX_TOP + prev.row, BOX_LEFT + prev.column, BLANK_GLYPH, Style::Plain)?;
        }

        let point = update.point;
        self.put(display, BOX_TOP + point.row, BOX_LEFT + point.column, DOT_GLYPH, self.dot_style())?;
        self.state.last_point = Some(point);

        Ok(update)
    }
}

/// Dot updates of both panels for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameUpdate {
    pub left: DotUpdate,
    pub right: DotUpdate,
}

/// Both panels plus the screen they share. Owned by the dashboard loop.
#[derive(Debug, Clone)]
pub struct RenderSession {
    layout: Layout,
    left: Panel,
    right: Panel,
}

impl RenderSession {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            left: Panel::new(Side::Left, layout.left),
            right: Panel::new(Side::Right, layout.right),
        }
    }

    /// Size the session to the display it will draw on
    pub fn for_display<D: Display + ?Sized>(display: &D) -> Result<Self, DisplayError> {
        let (cols, rows) = display.size()?;
        Ok(Self::new(Layout::for_screen(cols, rows)?))
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn panel(&self, side: Side) -> &Panel {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Paint the static framing. Called once before the first sample.
    pub fn draw_static<D: Display + ?Sized>(&self, display: &mut D) -> Result<(), DisplayError> {
        display.clear()?;
        draw_box(display, 0, 0, self.layout.rows, self.layout.cols, Style::Plain)?;
        self.left.draw_static(display)?;
        self.right.draw_static(display)?;
        display.flush()
    }

    /// Apply one sample to both panels and flush
    pub fn render<D: Display + ?Sized>(
        &mut self,
        sample: &Sample,
        display: &mut D,
    ) -> Result<FrameUpdate, DisplayError> {
        let (x1, y1) = sample.left();
        let (x2, y2) = sample.right();

        let left = self.left.render(display, x1, y1, Some(sample.sw1))?;
        let right = self.right.render(display, x2, y2, None)?;
        display.flush()?;

        debug!("Frame: left {:?} right {:?}", left.point, right.point);
        Ok(FrameUpdate { left, right })
    }
}
