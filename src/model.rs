use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info, instrument, trace};

use crate::container::{Keyed, RawValue, Record};
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::domain::{Field, TableConfig, TableError};
use crate::render::{NoopRenderer, Renderer};
use crate::sort::{self, Permutation};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Status {
    EMPTY,
    LOADED,
}

/// One value of a column together with its render form.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    raw: RawValue,
    display: String,
}

impl Cell {
    pub fn new(raw: RawValue, absent_placeholder: &str) -> Self {
        let display = raw.display(absent_placeholder);
        Self { raw, display }
    }

    pub fn raw(&self) -> &RawValue {
        &self.raw
    }

    pub fn display(&self) -> &str {
        &self.display
    }
}

impl From<RawValue> for Cell {
    fn from(raw: RawValue) -> Self {
        Cell::new(raw, "")
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::new(RawValue::from(s), "")
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    field: Field,
    cells: Vec<Cell>,
    max_width: usize,
}

impl Column {
    pub fn new(field: impl Into<Field>) -> Self {
        Self {
            field: field.into(),
            cells: Vec::new(),
            max_width: 0,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Widest render form in characters.
    pub fn max_width(&self) -> usize {
        self.max_width
    }

    pub fn push(&mut self, cell: Cell) {
        self.max_width = std::cmp::max(self.max_width, cell.display().chars().count());
        self.cells.push(cell);
    }

    pub fn as_string(&self) -> String {
        format!(
            "\"{}\", width_max: {}, # rows {}",
            self.field,
            self.max_width,
            self.cells.len(),
        )
    }
}

/// Columns of a comparison table, kept row-aligned: cell `i` of every column
/// belongs to the same source record.
pub struct TableModel {
    config: TableConfig,
    status: Status,
    columns: Keyed<Column>,
    last_sort: Option<Field>,
    renderer: Box<dyn Renderer>,
    diagnostics: Box<dyn Diagnostics>,
}

impl TableModel {
    pub fn new(config: TableConfig) -> Self {
        Self {
            config,
            status: Status::EMPTY,
            columns: Keyed::new(),
            last_sort: None,
            renderer: Box::new(NoopRenderer),
            diagnostics: Box::new(TracingDiagnostics),
        }
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: impl Diagnostics + 'static) -> Self {
        self.diagnostics = Box::new(diagnostics);
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn fields(&self) -> Vec<Field> {
        self.columns.keys()
    }

    pub fn columns(&self) -> &Keyed<Column> {
        &self.columns
    }

    pub fn column(&self, field: &str) -> Option<&Column> {
        self.columns.get(field)
    }

    pub fn row_count(&self) -> usize {
        self.columns.values().next().map_or(0, Column::len)
    }

    /// Field of the most recent successful sort.
    pub fn last_sort(&self) -> Option<&str> {
        self.last_sort.as_deref()
    }

    /// Registers an empty column. On a loaded table the column is filled with
    /// absent values so all columns keep the same length. Columns added before
    /// the first load are filled from the records like header fields.
    pub fn add_column(&mut self, field: impl Into<Field>) -> Result<(), TableError> {
        let field = field.into();
        if self.columns.contains_key(&field) {
            return Err(TableError::DuplicateField(field));
        }
        let mut column = Column::new(field.clone());
        for _ in 0..self.row_count() {
            column.push(Cell::new(RawValue::Absent, &self.config.absent_placeholder));
        }
        trace!("Added column {}", column.as_string());
        self.columns.insert(field, column);
        Ok(())
    }

    /// Builds the columns from `records`. The first record only provides the
    /// field names (its keys); every following record becomes one row.
    #[instrument(level = "debug", skip_all, fields(nrecords = records.len()))]
    pub fn load_records(&mut self, records: Vec<Record>) -> Result<(), TableError> {
        let start_time = Instant::now();
        let mut records = records.into_iter();
        let Some(header) = records.next() else {
            return Err(TableError::MalformedRecord(
                "no header record to take the fields from".into(),
            ));
        };

        // Columns registered before the first load are kept and filled from
        // the records; a reload starts over from the new header.
        if self.status == Status::LOADED {
            self.columns = Keyed::new();
            self.last_sort = None;
        } else if let Some(field) = header
            .keys()
            .into_iter()
            .find(|f| self.columns.contains_key(f))
        {
            return Err(TableError::DuplicateField(field));
        }
        for field in header.keys() {
            self.add_column(field)?;
        }

        let placeholder = self.config.absent_placeholder.clone();
        let mut nrecords = 0;
        for (idx, record) in records.enumerate() {
            for column in self.columns.values_mut() {
                let raw = record
                    .get(column.field())
                    .cloned()
                    .unwrap_or(RawValue::Absent);
                column.push(Cell::new(raw, &placeholder));
            }

            if self.config.verify_no_leftover_keys {
                let name = Self::record_name(&record, idx);
                let columns = &self.columns;
                let diagnostics = &mut self.diagnostics;
                record
                    .filter(|field, _| !columns.contains_key(field))
                    .for_each(|field, _| {
                        diagnostics.warn(&format!("Ignoring field '{field}' from record '{name}'"));
                    });
            }
            nrecords += 1;
        }
        self.status = Status::LOADED;

        info!(
            "Loaded {nrecords} records into {} columns in {}ms",
            self.columns.count(),
            start_time.elapsed().as_millis()
        );
        for c in self.columns.values() {
            debug!("Column: {}", c.as_string());
        }

        if let Some(field) = self.config.initial_sort.clone() {
            if let Err(e) = self.reorder(&field, false) {
                self.diagnostics
                    .warn(&format!("Initial sort by '{field}' skipped: {e}"));
            }
        }
        self.renderer.redraw(&self.columns);
        Ok(())
    }

    /// Sorts all columns by the values of `field`. If the table is already
    /// sorted by that column and `allow_reverse_on_no_change` is set, the rows
    /// are reversed instead. Returns the order that was applied.
    #[instrument(level = "debug", skip(self))]
    pub fn sort_by(
        &mut self,
        field: &str,
        allow_reverse_on_no_change: bool,
    ) -> Result<Permutation, TableError> {
        if self.status != Status::LOADED {
            return Err(TableError::NotLoaded);
        }
        let order = self.reorder(field, allow_reverse_on_no_change)?;
        self.renderer.redraw(&self.columns);
        Ok(order)
    }

    /// Sort request from a header click: ascending first, then flipping.
    pub fn toggle_sort(&mut self, field: &str) -> Result<Permutation, TableError> {
        self.sort_by(field, true)
    }

    fn reorder(
        &mut self,
        field: &str,
        allow_reverse_on_no_change: bool,
    ) -> Result<Permutation, TableError> {
        let column = self
            .columns
            .get(field)
            .ok_or_else(|| TableError::UnknownField(field.to_string()))?;
        self.diagnostics.info(&format!("Sorting by {field}"));

        let start_time = Instant::now();
        let order = sort::compute_order(column.cells(), allow_reverse_on_no_change);

        // Rebuild every column first, so a failure leaves the table untouched.
        let reordered: Vec<Vec<Cell>> = self
            .columns
            .values()
            .collect::<Vec<&Column>>()
            .par_iter()
            .map(|c| sort::apply_order(c.cells(), &order))
            .collect::<Result<_, _>>()?;
        for (column, cells) in self.columns.values_mut().zip(reordered) {
            column.cells = cells;
        }

        debug!(
            "Reordered {} columns by '{field}' in {}µs",
            self.columns.count(),
            start_time.elapsed().as_micros()
        );
        self.last_sort = Some(field.to_string());
        Ok(order)
    }

    fn record_name(record: &Record, idx: usize) -> String {
        record
            .get("name")
            .filter(|v| !v.is_absent())
            .map(|v| v.display(""))
            .unwrap_or_else(|| format!("#{}", idx + 1))
    }
}
