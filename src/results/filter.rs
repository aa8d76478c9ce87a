//! Substring filters over table columns, combined with AND or OR.

use rayon::prelude::*;

/// Read access to cell text, implemented by the table model.
pub trait CellSource {
    fn row_count(&self) -> usize;
    fn cell_text(&self, row: usize, column: usize) -> Option<&str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    And,
    Or,
}

impl FilterMode {
    pub fn label(self) -> &'static str {
        match self {
            FilterMode::And => "AND",
            FilterMode::Or => "OR",
        }
    }
}

/// Handle of a predicate, held by the control that edits it.
pub type PredicateId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPredicate {
    pub id: PredicateId,
    pub column: usize,
    pub pattern: String,
    attached: bool,
}

impl FilterPredicate {
    fn needle(&self) -> Option<String> {
        let needle = self.pattern.trim().to_lowercase();
        (!needle.is_empty()).then_some(needle)
    }
}

/// Ordered predicates plus the way they combine.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    predicates: Vec<FilterPredicate>,
    pub mode: FilterMode,
    next_id: PredicateId,
}

impl FilterState {
    pub fn new(mode: FilterMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Add a predicate on `column` and return its handle.
    pub fn add(&mut self, column: usize, pattern: impl Into<String>) -> PredicateId {
        let id = self.next_id;
        self.next_id += 1;
        self.predicates.push(FilterPredicate {
            id,
            column,
            pattern: pattern.into(),
            attached: true,
        });
        id
    }

    pub fn get_mut(&mut self, id: PredicateId) -> Option<&mut FilterPredicate> {
        self.predicates
            .iter_mut()
            .find(|p| p.id == id && p.attached)
    }

    /// Mark a predicate whose control was removed. It is dropped on the next
    /// `prune`.
    pub fn detach(&mut self, id: PredicateId) {
        if let Some(p) = self.predicates.iter_mut().find(|p| p.id == id) {
            p.attached = false;
        }
    }

    /// Drop detached predicates.
    pub fn prune(&mut self) {
        self.predicates.retain(|p| p.attached);
    }

    pub fn predicates(&self) -> &[FilterPredicate] {
        &self.predicates
    }

    pub fn clear(&mut self) {
        self.predicates.clear();
    }

    /// Predicates that constrain rows: attached and with a non-empty pattern.
    fn active(&self) -> Vec<(usize, String)> {
        self.predicates
            .iter()
            .filter(|p| p.attached)
            .filter_map(|p| p.needle().map(|n| (p.column, n)))
            .collect()
    }
}

/// Which rows pass the current filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Visibility {
    pub mask: Vec<bool>,
    pub rows: Vec<usize>,
}

impl Visibility {
    /// All `row_count` rows visible.
    #[cfg(test)]
    pub fn all(row_count: usize) -> Self {
        Self {
            mask: vec![true; row_count],
            rows: (0..row_count).collect(),
        }
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_visible(&self, row: usize) -> bool {
        self.mask.get(row).copied().unwrap_or(false)
    }

    pub fn status_text(&self) -> String {
        match self.count() {
            0 => "No results found".to_string(),
            1 => "1 row visible".to_string(),
            n => format!("{} rows visible", n),
        }
    }
}

/// Evaluate `state` against every row of `source`. Detached predicates are
/// pruned first.
pub fn apply<S>(state: &mut FilterState, source: &S) -> Visibility
where
    S: CellSource + Sync,
{
    state.prune();
    let active = state.active();
    let mode = state.mode;

    let mask: Vec<bool> = (0..source.row_count())
        .into_par_iter()
        .map(|row| row_visible(source, row, &active, mode))
        .collect();
    let rows = mask
        .iter()
        .enumerate()
        .filter_map(|(i, visible)| visible.then_some(i))
        .collect();

    Visibility { mask, rows }
}

fn row_visible<S: CellSource>(
    source: &S,
    row: usize,
    active: &[(usize, String)],
    mode: FilterMode,
) -> bool {
    if active.is_empty() {
        return true;
    }
    let matches = |(column, needle): &(usize, String)| {
        source
            .cell_text(row, *column)
            .map(|text| text.trim().to_lowercase().contains(needle.as_str()))
            .unwrap_or(false)
    };
    match mode {
        FilterMode::And => active.iter().all(matches),
        FilterMode::Or => active.iter().any(matches),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rows(Vec<Vec<String>>);

    impl Rows {
        fn new(rows: &[&[&str]]) -> Self {
            Rows(
                rows.iter()
                    .map(|r| r.iter().map(|c| c.to_string()).collect())
                    .collect(),
            )
        }
    }

    impl CellSource for Rows {
        fn row_count(&self) -> usize {
            self.0.len()
        }

        fn cell_text(&self, row: usize, column: usize) -> Option<&str> {
            self.0.get(row)?.get(column).map(String::as_str)
        }
    }

    #[test]
    fn test_case_insensitive_substring() {
        let rows = Rows::new(&[&["XABCX"]]);
        let mut state = FilterState::new(FilterMode::And);
        state.add(0, "abc");
        let vis = apply(&mut state, &rows);
        assert_eq!(vis.rows, vec![0]);
    }

    #[test]
    fn test_pattern_and_cell_are_trimmed() {
        let rows = Rows::new(&[&["  Kinase  "], &["phosphatase"]]);
        let mut state = FilterState::new(FilterMode::And);
        state.add(0, "  KINASE ");
        let vis = apply(&mut state, &rows);
        assert_eq!(vis.rows, vec![0]);
    }

    #[test]
    fn test_no_predicates_shows_everything() {
        let rows = Rows::new(&[&["a"], &["b"], &["c"]]);
        for mode in [FilterMode::And, FilterMode::Or] {
            let mut state = FilterState::new(mode);
            let vis = apply(&mut state, &rows);
            assert_eq!(vis.count(), 3);
            assert_eq!(vis, Visibility::all(3));
        }
    }

    #[test]
    fn test_empty_pattern_is_skipped() {
        let rows = Rows::new(&[&["abc", "x"], &["def", "y"]]);
        let mut state = FilterState::new(FilterMode::And);
        state.add(0, "   ");
        state.add(1, "y");
        let vis = apply(&mut state, &rows);
        assert_eq!(vis.rows, vec![1]);

        let mut only_empty = FilterState::new(FilterMode::Or);
        only_empty.add(0, "");
        assert_eq!(apply(&mut only_empty, &rows).count(), 2);
    }

    #[test]
    fn test_and_versus_or() {
        let rows = Rows::new(&[&["kinase", "bacteria"]]);
        let mut state = FilterState::new(FilterMode::Or);
        state.add(0, "kinase");
        state.add(1, "fungi");
        assert!(apply(&mut state, &rows).is_visible(0));

        state.mode = FilterMode::And;
        let vis = apply(&mut state, &rows);
        assert!(!vis.is_visible(0));
        assert_eq!(vis.status_text(), "No results found");
    }

    #[test]
    fn test_detached_predicates_are_pruned() {
        let rows = Rows::new(&[&["alpha"], &["beta"]]);
        let mut state = FilterState::new(FilterMode::And);
        let id = state.add(0, "alpha");
        assert_eq!(apply(&mut state, &rows).rows, vec![0]);

        state.detach(id);
        let vis = apply(&mut state, &rows);
        assert_eq!(vis.count(), 2);
        assert!(state.predicates().is_empty());

        // A detached handle no longer resolves.
        assert!(state.get_mut(id).is_none());
    }

    #[test]
    fn test_missing_column_never_matches() {
        let rows = Rows::new(&[&["alpha"]]);
        let mut state = FilterState::new(FilterMode::Or);
        state.add(7, "alpha");
        assert_eq!(apply(&mut state, &rows).count(), 0);
    }

    #[test]
    fn test_status_text() {
        assert_eq!(Visibility::all(1).status_text(), "1 row visible");
        assert_eq!(Visibility::all(42).status_text(), "42 rows visible");
    }
}
