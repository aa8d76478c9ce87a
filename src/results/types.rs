//! Data types for annotation results: the raw per-protein shapes read from
//! the source document and the normalized rows the table is built from.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Text used for any display field the source did not provide.
pub const PLACEHOLDER: &str = "N/A";

/// Identifier and label of rows that could not be read.
pub const ERROR_LABEL: &str = "Error";

/// Maximum characters of a malformed entry kept as its description.
pub const ERROR_DESCRIPTION_LIMIT: usize = 100;

/// Maximum GO terms kept in a row's summary.
pub const GO_SUMMARY_LIMIT: usize = 7;

/// A row is classified once its GO term count exceeds this.
pub const CLASSIFIED_GO_THRESHOLD: usize = 10;

/// Separator between InterPro descriptions in cell text.
pub const INTERPRO_SEPARATOR: &str = "; ";

/// Fixed display columns. The names double as keys of the JSON export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    ProteinId,
    Description,
    Length,
    Hits,
    Pfam,
    GoTerms,
    Classification,
    PreferredName,
    CogCategory,
    EnzymeCode,
    InterproDomains,
}

impl Column {
    pub const COUNT: usize = 11;

    pub const ALL: [Column; Column::COUNT] = [
        Column::ProteinId,
        Column::Description,
        Column::Length,
        Column::Hits,
        Column::Pfam,
        Column::GoTerms,
        Column::Classification,
        Column::PreferredName,
        Column::CogCategory,
        Column::EnzymeCode,
        Column::InterproDomains,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::ProteinId => "PROTID",
            Column::Description => "Annot",
            Column::Length => "Prot Length",
            Column::Hits => "Hits",
            Column::Pfam => "PFAM",
            Column::GoTerms => "GOs",
            Column::Classification => "Classification",
            Column::PreferredName => "Preferred name",
            Column::CogCategory => "COG category",
            Column::EnzymeCode => "EC",
            Column::InterproDomains => "InterPro Domain",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Column> {
        Column::ALL.get(index).copied()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Raw shapes
// ============================================================================

/// GO terms as found in the source: either one comma-joined string or a list.
#[derive(Debug, Clone, PartialEq)]
pub enum TermList {
    Joined(String),
    Listed(Vec<String>),
}

impl TermList {
    /// Number of tokens a plain comma split produces. An empty string still
    /// yields one (empty) token.
    pub fn split_count(&self) -> usize {
        match self {
            TermList::Joined(s) => s.split(',').count(),
            TermList::Listed(items) => items.len().max(1),
        }
    }

    /// Trimmed, non-empty terms in source order.
    pub fn terms(&self) -> Vec<&str> {
        match self {
            TermList::Joined(s) => s.split(',').map(str::trim).filter(|t| !t.is_empty()).collect(),
            TermList::Listed(items) => items.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect(),
        }
    }
}

/// One eggNOG-mapper annotation. Only the first per query is used for display.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EggnogAnnotation {
    #[serde(rename = "Description", deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(rename = "PFAMs", deserialize_with = "lenient::text")]
    pub pfams: Option<String>,
    #[serde(rename = "GOs", deserialize_with = "lenient::terms")]
    pub gos: Option<TermList>,
    #[serde(rename = "Preferred_name", deserialize_with = "lenient::text")]
    pub preferred_name: Option<String>,
    #[serde(rename = "COG_category", deserialize_with = "lenient::text")]
    pub cog_category: Option<String>,
    #[serde(rename = "EC", deserialize_with = "lenient::text")]
    pub ec: Option<String>,
}

/// One InterProScan match.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InterproAnnotation {
    #[serde(deserialize_with = "lenient::text")]
    pub interpro_accession: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub interpro_description: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub signature_accession: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub signature_description: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub analysis: Option<String>,
    #[serde(deserialize_with = "lenient::integer")]
    pub start: Option<u64>,
    #[serde(deserialize_with = "lenient::integer")]
    pub end: Option<u64>,
    #[serde(deserialize_with = "lenient::float")]
    pub evalue: Option<f64>,
}

/// One BLAST alignment against a database sequence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BlastHit {
    #[serde(deserialize_with = "lenient::text")]
    pub hit_id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub hit_def: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub accession: Option<String>,
    #[serde(deserialize_with = "lenient::float")]
    pub percent_identity: Option<f64>,
    #[serde(deserialize_with = "lenient::float")]
    pub alignment_length: Option<f64>,
    #[serde(deserialize_with = "lenient::float")]
    pub evalue: Option<f64>,
    #[serde(deserialize_with = "lenient::float")]
    pub bit_score: Option<f64>,
    #[serde(deserialize_with = "lenient::integer")]
    pub query_start: Option<u64>,
    #[serde(deserialize_with = "lenient::integer")]
    pub query_end: Option<u64>,
    #[serde(deserialize_with = "lenient::integer")]
    pub hit_start: Option<u64>,
    #[serde(deserialize_with = "lenient::integer")]
    pub hit_end: Option<u64>,
    #[serde(deserialize_with = "lenient::integer")]
    pub hit_len: Option<u64>,
}

/// Pipeline output for one query protein.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineResult {
    #[serde(deserialize_with = "lenient::text")]
    pub query_id: Option<String>,
    #[serde(deserialize_with = "lenient::integer")]
    pub query_len: Option<u64>,
    #[serde(rename = "eggNOG_annotations", deserialize_with = "lenient::entries")]
    pub eggnog_annotations: Vec<EggnogAnnotation>,
    #[serde(rename = "InterproScan_annotation", deserialize_with = "lenient::entries")]
    pub interpro_annotations: Vec<InterproAnnotation>,
    #[serde(deserialize_with = "lenient::entries")]
    pub blast_hits: Vec<BlastHit>,
}

/// A row previously written by the JSON exporter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportedResult {
    #[serde(rename = "PROTID", deserialize_with = "lenient::text")]
    pub protein_id: Option<String>,
    #[serde(rename = "Annot", deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(rename = "Prot Length", deserialize_with = "lenient::integer")]
    pub length: Option<u64>,
    #[serde(rename = "Hits")]
    pub hits: Option<Value>,
    #[serde(rename = "InterPro Domain")]
    pub interpro: Option<Value>,
    #[serde(rename = "GOs", deserialize_with = "lenient::terms")]
    pub gos: Option<TermList>,
    #[serde(rename = "Classification", deserialize_with = "lenient::text")]
    pub classification: Option<String>,
    #[serde(rename = "PFAM", deserialize_with = "lenient::text")]
    pub pfam: Option<String>,
    #[serde(rename = "Preferred name", deserialize_with = "lenient::text")]
    pub preferred_name: Option<String>,
    #[serde(rename = "COG category", deserialize_with = "lenient::text")]
    pub cog_category: Option<String>,
    #[serde(rename = "EC", deserialize_with = "lenient::text")]
    pub ec: Option<String>,
}

/// One entry of the source `results` array, classified by shape.
#[derive(Debug, Clone)]
pub enum RawResult {
    /// Pipeline output (`query_id`, `blast_hits`, ...).
    Pipeline(Box<PipelineResult>),
    /// Exporter output, recognised by its `PROTID` key.
    Exported(Box<ExportedResult>),
    /// JSON `null`.
    Missing,
    /// A bare string where an object was expected.
    Text(String),
    /// Any other value; holds its compact JSON text.
    Malformed(String),
}

impl RawResult {
    /// Classify a JSON value by shape.
    pub fn classify(value: Value) -> RawResult {
        match value {
            Value::Null => RawResult::Missing,
            Value::String(s) => RawResult::Text(s),
            Value::Object(map) => {
                let exported = map.contains_key("PROTID");
                let value = Value::Object(map);
                let text = || value.to_string();
                if exported {
                    match serde_json::from_value::<ExportedResult>(value.clone()) {
                        Ok(r) => RawResult::Exported(Box::new(r)),
                        Err(_) => RawResult::Malformed(text()),
                    }
                } else {
                    match serde_json::from_value::<PipelineResult>(value.clone()) {
                        Ok(r) => RawResult::Pipeline(Box::new(r)),
                        Err(_) => RawResult::Malformed(text()),
                    }
                }
            }
            other => RawResult::Malformed(other.to_string()),
        }
    }

    pub fn blast_hits(&self) -> &[BlastHit] {
        match self {
            RawResult::Pipeline(r) => &r.blast_hits,
            _ => &[],
        }
    }

    pub fn interpro_annotations(&self) -> &[InterproAnnotation] {
        match self {
            RawResult::Pipeline(r) => &r.interpro_annotations,
            _ => &[],
        }
    }

    /// Every GO term the entry references, without the display limit.
    pub fn all_go_terms(&self) -> Vec<String> {
        let list = match self {
            RawResult::Pipeline(r) => r.eggnog_annotations.first().and_then(|a| a.gos.as_ref()),
            RawResult::Exported(r) => r.gos.as_ref(),
            _ => None,
        };
        list.map(|l| {
            l.terms()
                .into_iter()
                .filter(|t| *t != PLACEHOLDER && *t != crate::results::summary::ELLIPSIS)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
    }
}

// ============================================================================
// Normalized rows
// ============================================================================

/// Source of a result tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKind {
    Blast,
    Interpro,
    Default,
}

impl TagKind {
    pub fn name(self) -> &'static str {
        match self {
            TagKind::Blast => "blast",
            TagKind::Interpro => "interpro",
            TagKind::Default => "default",
        }
    }

    pub fn from_name(name: &str) -> Option<TagKind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "blast" => Some(TagKind::Blast),
            "interpro" => Some(TagKind::Interpro),
            "default" => Some(TagKind::Default),
            _ => None,
        }
    }
}

/// A (kind, count) pair. `count` is `None` for the `N/A` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTag {
    pub kind: TagKind,
    pub count: Option<usize>,
}

impl ResultTag {
    pub fn counted(kind: TagKind, count: usize) -> Self {
        Self {
            kind,
            count: Some(count),
        }
    }

    pub fn not_available() -> Self {
        Self {
            kind: TagKind::Default,
            count: None,
        }
    }

    pub fn label(&self) -> String {
        match (self.kind, self.count) {
            (TagKind::Default, None) => PLACEHOLDER.to_string(),
            (kind, Some(n)) => format!("{}: {}", kind.name(), n),
            (kind, None) => format!("{}: {}", kind.name(), PLACEHOLDER),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Classified,
    Unclassified,
}

impl Classification {
    pub fn label(self) -> &'static str {
        match self {
            Classification::Classified => "Classified",
            Classification::Unclassified => "Unclassified",
        }
    }

    pub fn from_label(label: &str) -> Option<Classification> {
        match label.trim().to_ascii_lowercase().as_str() {
            "classified" => Some(Classification::Classified),
            "unclassified" => Some(Classification::Unclassified),
            _ => None,
        }
    }
}

/// The first few GO terms of a row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoSummary {
    pub terms: Vec<String>,
    /// More terms existed in the source than were kept.
    pub truncated: bool,
}

/// Canonical, schema-fixed record for one result entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub protein_id: String,
    pub length: u64,
    pub tags: Vec<ResultTag>,
    pub go_terms: GoSummary,
    pub classification: Classification,
    pub interpro: Vec<String>,
    pub(crate) text: [String; Column::COUNT],
}

impl NormalizedRow {
    /// Display text of a column.
    pub fn text(&self, column: Column) -> &str {
        &self.text[column.index()]
    }

    pub fn description(&self) -> &str {
        self.text(Column::Description)
    }

    pub fn is_placeholder(&self) -> bool {
        self.protein_id == PLACEHOLDER || self.protein_id == ERROR_LABEL
    }
}

/// Payload of a cell rendered with a custom widget instead of plain text.
#[derive(Debug, Clone, PartialEq)]
pub enum CellWidget {
    ResultTags(Vec<ResultTag>),
    GoTerms(GoSummary),
    Classification(Classification),
    InterproDomains(Vec<String>),
}

/// Which columns of a row need custom rendering.
pub type WidgetSpecs = BTreeMap<Column, CellWidget>;

/// A normalized row together with its widget specs.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResult {
    pub row: NormalizedRow,
    pub widgets: WidgetSpecs,
}

// ============================================================================
// Lenient field readers
// ============================================================================

/// Field deserializers that never fail on a value of the wrong kind; they
/// fall back to "absent" instead.
pub(crate) mod lenient {
    use super::TermList;
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn scalar_text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
                Some(parts.join(","))
            }
            Value::Null | Value::Object(_) => None,
        }
    }

    pub fn text<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(d)?;
        Ok(scalar_text(&value))
    }

    pub fn integer<'de, D>(d: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn float<'de, D>(d: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn terms<'de, D>(d: D) -> Result<Option<TermList>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::String(s) => Some(TermList::Joined(s)),
            Value::Array(items) => Some(TermList::Listed(
                items.iter().filter_map(scalar_text).collect(),
            )),
            _ => None,
        })
    }

    /// Array entries that are not objects still occupy a slot (as an empty
    /// entry) so collection lengths match the source.
    pub fn entries<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| {
                    if item.is_object() {
                        serde_json::from_value(item).unwrap_or_default()
                    } else {
                        T::default()
                    }
                })
                .collect(),
            _ => Vec::new(),
        })
    }
}
