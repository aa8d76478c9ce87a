//! Result document model: normalization, summaries, the table store,
//! filtering, loading, ontology lookup and export.

pub mod export;
pub mod filter;
pub mod loader;
pub mod normalize;
pub mod ontology;
pub mod summary;
pub mod table;
pub mod types;

pub use export::{export_to_path, ExportFormat};
pub use filter::{apply as apply_filter, FilterMode, FilterState, PredicateId, Visibility};
pub use loader::{spawn_load, LoadHandle, LoadOutcome};
pub use normalize::normalize;
pub use ontology::{GoType, OntologyDefinitions};
pub use summary::{identity_percent, resolve_go_term, resolve_go_terms, visible_tags, GoTermLabel};
pub use table::{TableModel, WidgetFactory};
pub use types::{CellWidget, Classification, Column, NormalizedRow, RawResult, TagKind};
