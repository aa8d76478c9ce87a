//! Append-only row store backing the results view.
//!
//! Cells with a widget spec are "widget-backed": the view draws an overlay
//! there and `cell_value` returns empty text so nothing is drawn twice.
//! Overlays are built lazily, only for rows inside the current viewport, and
//! are kept once built so scrolling and filtering never rebuild them.

use super::filter::CellSource;
use super::types::{CellWidget, Column, NormalizedResult, NormalizedRow};
use crate::error::{Result, ViewerError};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use tracing::{debug, warn};

/// Rows materialized before the view has reported its first viewport.
pub const INITIAL_VIEWPORT_ROWS: usize = 40;

/// Builds the overlay drawn for a widget-backed cell.
pub trait WidgetFactory {
    type Widget;

    fn build(&self, row_index: usize, row: &NormalizedRow, spec: &CellWidget)
        -> Result<Self::Widget>;

    /// Overlay used when `build` fails.
    fn fallback(&self, error: &ViewerError) -> Self::Widget;
}

pub struct TableModel<W> {
    rows: Vec<NormalizedResult>,
    widget_backed: HashSet<(usize, Column)>,
    overlays: HashMap<(usize, Column), W>,
    viewport: Range<usize>,
}

impl<W> Default for TableModel<W> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            widget_backed: HashSet::new(),
            overlays: HashMap::new(),
            viewport: 0..INITIAL_VIEWPORT_ROWS,
        }
    }
}

impl<W> TableModel<W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        Column::COUNT
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&NormalizedRow> {
        self.rows.get(index).map(|r| &r.row)
    }

    pub fn rows(&self) -> impl Iterator<Item = &NormalizedRow> {
        self.rows.iter().map(|r| &r.row)
    }

    pub fn is_widget_backed(&self, row: usize, column: Column) -> bool {
        self.widget_backed.contains(&(row, column))
    }

    /// Text to draw in a cell. Empty for widget-backed cells; `None` when
    /// the cell does not exist.
    pub fn cell_value(&self, row: usize, column: usize) -> Option<&str> {
        let column = Column::from_index(column)?;
        if self.is_widget_backed(row, column) {
            return self.rows.get(row).map(|_| "");
        }
        self.rows.get(row).map(|r| r.row.text(column))
    }

    /// Full text of a cell, widget-backed or not. Used by filters and
    /// exports.
    pub fn cell_text(&self, row: usize, column: usize) -> Option<&str> {
        let column = Column::from_index(column)?;
        self.rows.get(row).map(|r| r.row.text(column))
    }

    /// Built overlay of a cell, if it has been materialized.
    pub fn overlay(&self, row: usize, column: Column) -> Option<&W> {
        self.overlays.get(&(row, column))
    }

    #[cfg(test)]
    pub fn materialized_count(&self) -> usize {
        self.overlays.len()
    }

    #[cfg(test)]
    pub fn viewport(&self) -> Range<usize> {
        self.viewport.clone()
    }

    /// Append rows and build overlays for the ones already in view.
    /// Returns the index range of the new rows.
    pub fn append_batch<F>(&mut self, batch: Vec<NormalizedResult>, factory: &F) -> Range<usize>
    where
        F: WidgetFactory<Widget = W>,
    {
        let start = self.rows.len();
        for (offset, entry) in batch.iter().enumerate() {
            for column in entry.widgets.keys() {
                self.widget_backed.insert((start + offset, *column));
            }
        }
        self.rows.extend(batch);
        let appended = start..self.rows.len();

        let visible = intersect(&self.viewport, &appended);
        self.materialize(visible, factory);
        debug!(
            "Appended {} rows ({} overlays built)",
            appended.len(),
            self.overlays.len()
        );
        appended
    }

    /// Drop everything and load `batch` in its place.
    pub fn replace<F>(&mut self, batch: Vec<NormalizedResult>, factory: &F) -> Range<usize>
    where
        F: WidgetFactory<Widget = W>,
    {
        self.clear();
        self.append_batch(batch, factory)
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.widget_backed.clear();
        self.overlays.clear();
        self.viewport = 0..INITIAL_VIEWPORT_ROWS;
    }

    /// Record the rows currently on screen and build any missing overlays.
    /// Returns how many overlays were built.
    pub fn set_viewport<F>(&mut self, viewport: Range<usize>, factory: &F) -> usize
    where
        F: WidgetFactory<Widget = W>,
    {
        self.viewport = viewport.clone();
        self.materialize(viewport, factory)
    }

    /// Build missing overlays for specific rows, e.g. the on-screen rows of
    /// a filtered view. Returns how many overlays were built.
    pub fn materialize_rows<F>(&mut self, rows: &[usize], factory: &F) -> usize
    where
        F: WidgetFactory<Widget = W>,
    {
        rows.iter()
            .map(|&index| self.materialize_row(index, factory))
            .sum()
    }

    /// Throw away built overlays, e.g. after the ontology lookup changed.
    /// They are rebuilt as rows come back into view.
    pub fn invalidate_overlays<F>(&mut self, factory: &F)
    where
        F: WidgetFactory<Widget = W>,
    {
        self.overlays.clear();
        let viewport = self.viewport.clone();
        self.materialize(viewport, factory);
    }

    fn materialize<F>(&mut self, range: Range<usize>, factory: &F) -> usize
    where
        F: WidgetFactory<Widget = W>,
    {
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        (start..end)
            .map(|index| self.materialize_row(index, factory))
            .sum()
    }

    fn materialize_row<F>(&mut self, index: usize, factory: &F) -> usize
    where
        F: WidgetFactory<Widget = W>,
    {
        let Some(entry) = self.rows.get(index) else {
            return 0;
        };
        let mut built = 0;
        for (column, spec) in &entry.widgets {
            let key = (index, *column);
            if self.overlays.contains_key(&key) {
                continue;
            }
            let widget = match factory.build(index, &entry.row, spec) {
                Ok(widget) => widget,
                Err(e) => {
                    warn!("{}", e);
                    factory.fallback(&e)
                }
            };
            self.overlays.insert(key, widget);
            built += 1;
        }
        built
    }
}

impl<W: Sync> CellSource for TableModel<W> {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn cell_text(&self, row: usize, column: usize) -> Option<&str> {
        TableModel::cell_text(self, row, column)
    }
}

fn intersect(a: &Range<usize>, b: &Range<usize>) -> Range<usize> {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    start..end.max(start)
}
