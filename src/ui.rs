use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Style, Stylize},
    text::Line,
    widgets::{Cell as UICell, Paragraph, Row, Table},
};
use tracing::{error, trace};

use crate::domain::{HELP_TEXT, Message, TableConfig};
use crate::model::{Column, TableModel};
use crate::render::{RedrawCounter, get_visible_name};

pub const STATUSLINE_HEIGHT: u16 = 1;
pub const TABLE_HEADER_HEIGHT: u16 = 1;
pub const COLUMN_SPACING: u16 = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ViewStatus {
    RUNNING,
    QUITTING,
}

/// Header cell position from the last draw.
#[derive(Debug, Clone, Copy)]
struct HeaderSpan {
    column: usize,
    x_begin: u16,
    x_end: u16,
}

/// Terminal view of a [`TableModel`]. Keeps the cursor and scroll state and
/// turns messages into sort requests on the model.
pub struct TableUI {
    name: String,
    status: ViewStatus,
    max_column_width: usize,
    selected_column: usize,
    offset_column: usize,
    offset_row: usize,
    table_height: usize,
    header_y: u16,
    header_spans: Vec<HeaderSpan>,
    status_message: String,
    redraws: RedrawCounter,
    seen_redraws: usize,
    dirty: bool,
}

impl TableUI {
    pub fn new(name: impl Into<String>, cfg: &TableConfig, redraws: RedrawCounter) -> Self {
        Self {
            name: name.into(),
            status: ViewStatus::RUNNING,
            max_column_width: cfg.max_column_width,
            selected_column: 0,
            offset_column: 0,
            offset_row: 0,
            table_height: 0,
            header_y: 0,
            header_spans: Vec::new(),
            status_message: HELP_TEXT.to_string(),
            redraws,
            seen_redraws: 0,
            dirty: true,
        }
    }

    pub fn status(&self) -> ViewStatus {
        self.status
    }

    pub fn selected_column(&self) -> usize {
        self.selected_column
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// True if the model asked for a redraw or a message changed the view.
    pub fn needs_redraw(&mut self) -> bool {
        let redraws = self.redraws.count();
        if redraws != self.seen_redraws {
            self.seen_redraws = redraws;
            self.dirty = true;
        }
        std::mem::take(&mut self.dirty)
    }

    pub fn update(&mut self, model: &mut TableModel, message: Message) {
        trace!("Update: {message:?}");
        let ncolumns = model.columns().count();
        let nrows = model.row_count();
        let page = std::cmp::max(self.table_height, 1);
        match message {
            Message::Quit => self.status = ViewStatus::QUITTING,
            Message::MoveLeft => self.selected_column = self.selected_column.saturating_sub(1),
            Message::MoveRight => {
                self.selected_column =
                    std::cmp::min(self.selected_column + 1, ncolumns.saturating_sub(1))
            }
            Message::MoveUp => self.scroll_up(1),
            Message::MoveDown => self.scroll_down(1, nrows),
            Message::MovePageUp => self.scroll_up(page),
            Message::MovePageDown => self.scroll_down(page, nrows),
            Message::SortSelected => self.sort_column(model, self.selected_column),
            Message::Click(x, y) => {
                if let Some(column) = self.header_column_at(x, y) {
                    self.selected_column = column;
                    self.sort_column(model, column);
                }
            }
            Message::Resize(width, height) => {
                trace!("UI was resized to w:{width}, h:{height}");
            }
        }
        self.dirty = true;
    }

    fn scroll_up(&mut self, size: usize) {
        self.offset_row = self.offset_row.saturating_sub(size);
    }

    fn scroll_down(&mut self, size: usize, nrows: usize) {
        let last = nrows.saturating_sub(std::cmp::max(self.table_height, 1));
        self.offset_row = std::cmp::min(self.offset_row + size, last);
    }

    fn header_column_at(&self, x: u16, y: u16) -> Option<usize> {
        if y != self.header_y {
            return None;
        }
        self.header_spans
            .iter()
            .find(|s| s.x_begin <= x && x < s.x_end)
            .map(|s| s.column)
    }

    fn sort_column(&mut self, model: &mut TableModel, column: usize) {
        let Some((field, _)) = model.columns().get_index(column) else {
            return;
        };
        let field = field.to_string();
        match model.toggle_sort(&field) {
            Ok(order) => {
                self.offset_row = 0;
                self.status_message =
                    format!("Sorted by {field} ({} rows moved)", order.changed_count());
            }
            Err(e) => {
                error!("Sorting by {field} failed: {e}");
                self.status_message = format!("Error: {e}");
            }
        }
    }

    fn column_width(&self, column: &Column) -> u16 {
        // One extra character for the sort marker.
        let width = std::cmp::max(column.field().chars().count() + 1, column.max_width())
            + COLUMN_WIDTH_MARGIN;
        u16::try_from(std::cmp::min(width, self.max_column_width)).unwrap_or(u16::MAX)
    }

    /// Columns (index, width) that fit into `width`, starting at the column
    /// offset. Moves the offset until the selected column is visible.
    fn visible_columns(&mut self, model: &TableModel, width: u16) -> Vec<(usize, u16)> {
        let widths = model.columns().map(|_, c| self.column_width(c));
        if widths.is_empty() {
            return Vec::new();
        }
        self.selected_column = std::cmp::min(self.selected_column, widths.len() - 1);
        self.offset_column = std::cmp::min(self.offset_column, self.selected_column);
        loop {
            let mut used = 0;
            let mut visible = Vec::new();
            for (idx, &w) in widths.iter().enumerate().skip(self.offset_column) {
                if used + w > width {
                    // Add the last partial visible column
                    if used < width {
                        visible.push((idx, width - used));
                    }
                    break;
                }
                visible.push((idx, w));
                used += w + COLUMN_SPACING;
            }
            let shows_selected = visible
                .iter()
                .any(|&(idx, w)| idx == self.selected_column && w == widths[idx]);
            if shows_selected || self.offset_column == self.selected_column {
                return visible;
            }
            self.offset_column += 1;
        }
    }

    pub fn draw(&mut self, model: &TableModel, frame: &mut Frame) {
        let [table_area, status_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(STATUSLINE_HEIGHT)])
                .areas(frame.area());
        self.table_height = table_area.height.saturating_sub(TABLE_HEADER_HEIGHT) as usize;
        self.draw_table(model, frame, table_area);

        let status = Line::from(vec![
            format!(" {} ", self.name).bold(),
            format!("[{} rows] ", model.row_count()).into(),
            self.status_message.clone().into(),
        ]);
        frame.render_widget(Paragraph::new(status).reversed(), status_area);
    }

    fn draw_table(&mut self, model: &TableModel, frame: &mut Frame, area: Rect) {
        let visible = self.visible_columns(model, area.width);
        self.header_y = area.y;
        self.header_spans.clear();
        let mut x = area.x;
        for &(column, w) in &visible {
            self.header_spans.push(HeaderSpan {
                column,
                x_begin: x,
                x_end: x + w,
            });
            x += w + COLUMN_SPACING;
        }

        let columns: Vec<&Column> = visible
            .iter()
            .filter_map(|&(idx, _)| model.columns().get_index(idx).map(|(_, c)| c))
            .collect();

        let header = Row::new(visible.iter().zip(&columns).map(|(&(idx, w), c)| {
            let marker = if model.last_sort() == Some(c.field()) { "*" } else { "" };
            let name = get_visible_name(&format!("{}{marker}", c.field()), w as usize);
            let style = if idx == self.selected_column {
                Style::new().bold().reversed()
            } else {
                Style::new().bold()
            };
            UICell::from(name).style(style)
        }));

        let rbegin = self.offset_row;
        let rend = std::cmp::min(rbegin + self.table_height, model.row_count());
        let rows = (rbegin..rend).map(|ridx| {
            Row::new(
                visible
                    .iter()
                    .zip(&columns)
                    .map(|(&(_, w), c)| get_visible_name(c.cells()[ridx].display(), w as usize)),
            )
        });

        let widths = visible.iter().map(|&(_, w)| Constraint::Length(w));
        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(COLUMN_SPACING);
        frame.render_widget(table, area);
    }
}
