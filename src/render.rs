//! Renderer side of the table model.
//!
//! The model only tells a renderer that the columns changed. Whether that
//! means repainting a terminal, printing text or nothing at all is up to the
//! implementation.

use std::io::Write;
use std::rc::Rc;

use tracing::error;

use crate::container::Keyed;
use crate::model::Column;

pub trait Renderer {
    /// Called once after the columns were (re)loaded or reordered.
    fn redraw(&mut self, columns: &Keyed<Column>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRenderer;

impl Renderer for NoopRenderer {
    fn redraw(&mut self, _columns: &Keyed<Column>) {}
}

/// Counts redraw requests. Clones share the counter.
#[derive(Debug, Default, Clone)]
pub struct RedrawCounter {
    count: Rc<std::cell::Cell<usize>>,
}

impl RedrawCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }
}

impl Renderer for RedrawCounter {
    fn redraw(&mut self, _columns: &Keyed<Column>) {
        self.count.set(self.count.get() + 1);
    }
}

/// Shortens `name` to `width` characters, marking the cut with "...".
pub fn get_visible_name(name: &str, width: usize) -> String {
    if width < 3 {
        return String::new();
    }
    if name.chars().count() > width {
        let mut reduced: String = name.chars().take(width - 3).collect();
        reduced.push_str("...");
        reduced
    } else {
        name.to_string()
    }
}

/// Writes the table as aligned plain text, header line first.
pub struct TextRenderer<W: Write> {
    out: W,
    max_column_width: usize,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, max_column_width: usize) -> Self {
        Self {
            out,
            max_column_width,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn column_width(&self, column: &Column) -> usize {
        std::cmp::min(
            std::cmp::max(column.field().chars().count(), column.max_width()),
            self.max_column_width,
        )
    }

    fn write_table(&mut self, columns: &Keyed<Column>) -> std::io::Result<()> {
        let widths = columns.map(|_, c| self.column_width(c));
        let header = columns
            .map(|field, _| field.to_string())
            .iter()
            .zip(&widths)
            .map(|(name, &w)| format!("{:<w$}", get_visible_name(name, w)))
            .collect::<Vec<String>>();
        writeln!(self.out, "{}", header.join("  ").trim_end())?;

        let nrows = columns.values().next().map_or(0, Column::len);
        for row in 0..nrows {
            let line = columns
                .values()
                .zip(&widths)
                .map(|(c, &w)| format!("{:<w$}", get_visible_name(c.cells()[row].display(), w)))
                .collect::<Vec<String>>();
            writeln!(self.out, "{}", line.join("  ").trim_end())?;
        }
        self.out.flush()
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn redraw(&mut self, columns: &Keyed<Column>) {
        if let Err(e) = self.write_table(columns) {
            error!("Failed to write table: {e}");
        }
    }
}
