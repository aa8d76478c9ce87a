//! Compact summaries of the nested collections of a result entry.

use super::ontology::{GoType, OntologyDefinitions};
use super::types::{
    BlastHit, Classification, GoSummary, InterproAnnotation, NormalizedRow, RawResult, ResultTag,
    TagKind, TermList, GO_SUMMARY_LIMIT, INTERPRO_SEPARATOR, PLACEHOLDER,
};
use serde_json::Value;
use std::collections::HashMap;

/// Marker appended to GO text when terms were cut off.
pub const ELLIPSIS: &str = "...";

/// Result tags rendered before collapsing the rest into "+N".
pub const MAX_VISIBLE_TAGS: usize = 3;

// ============================================================================
// Result tags
// ============================================================================

/// One tag per non-empty collection, or a single `N/A` tag.
pub fn result_tags(blast_hits: usize, interpro_annotations: usize) -> Vec<ResultTag> {
    let mut tags = Vec::with_capacity(2);
    if blast_hits > 0 {
        tags.push(ResultTag::counted(TagKind::Blast, blast_hits));
    }
    if interpro_annotations > 0 {
        tags.push(ResultTag::counted(TagKind::Interpro, interpro_annotations));
    }
    if tags.is_empty() {
        tags.push(ResultTag::not_available());
    }
    tags
}

pub fn tags_text(tags: &[ResultTag]) -> String {
    tags.iter()
        .map(ResultTag::label)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Tags to render and how many were left out.
pub fn visible_tags(tags: &[ResultTag]) -> (&[ResultTag], usize) {
    let shown = tags.len().min(MAX_VISIBLE_TAGS);
    (&tags[..shown], tags.len() - shown)
}

/// Read tags back from exported `Hits` text (`blast: 5, interpro: 2`) or a
/// list of `{kind, count}` objects.
pub fn parse_tags(value: &Value) -> Vec<ResultTag> {
    let mut tags = Vec::new();
    match value {
        Value::String(s) => {
            for part in s.split(',') {
                let part = part.trim();
                if part.is_empty() || part == PLACEHOLDER {
                    continue;
                }
                let Some((kind, count)) = part.split_once(':') else {
                    continue;
                };
                let Some(kind) = TagKind::from_name(kind) else {
                    continue;
                };
                let count = count.trim();
                if count == PLACEHOLDER {
                    tags.push(ResultTag { kind, count: None });
                } else if let Ok(n) = count.parse() {
                    tags.push(ResultTag::counted(kind, n));
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                let Some(kind) = item
                    .get("kind")
                    .and_then(Value::as_str)
                    .and_then(TagKind::from_name)
                else {
                    continue;
                };
                let count = item
                    .get("count")
                    .and_then(Value::as_u64)
                    .map(|n| n as usize);
                tags.push(ResultTag { kind, count });
            }
        }
        _ => {}
    }
    if tags.is_empty() {
        tags.push(ResultTag::not_available());
    }
    tags
}

// ============================================================================
// GO terms
// ============================================================================

/// Keep the first terms in source order. Duplicates are kept. A trailing
/// `...` (as written by `go_text`) marks the list as already truncated.
pub fn go_summary(list: &TermList) -> GoSummary {
    let all = list.terms();
    let marked = all.last() == Some(&ELLIPSIS);
    let terms: Vec<&str> = all.into_iter().filter(|t| *t != ELLIPSIS).collect();
    GoSummary {
        truncated: marked || terms.len() > GO_SUMMARY_LIMIT,
        terms: terms
            .into_iter()
            .take(GO_SUMMARY_LIMIT)
            .map(str::to_string)
            .collect(),
    }
}

pub fn go_text(summary: &GoSummary) -> String {
    let mut text = summary.terms.join(", ");
    if summary.truncated {
        text.push_str(", ");
        text.push_str(ELLIPSIS);
    }
    text
}

/// A GO id with whatever the ontology knows about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoTermLabel {
    pub id: String,
    pub description: String,
    pub kind: Option<GoType>,
}

impl GoTermLabel {
    pub fn tooltip(&self) -> String {
        match self.kind {
            Some(kind) => format!("{} - {} [{}]", self.id, self.description, kind.label()),
            None => self.id.clone(),
        }
    }
}

pub fn resolve_go_term(id: &str, ontology: &OntologyDefinitions) -> GoTermLabel {
    match ontology.get(id) {
        Some(def) => GoTermLabel {
            id: id.to_string(),
            description: def.name.clone(),
            kind: Some(def.kind),
        },
        None => GoTermLabel {
            id: id.to_string(),
            description: String::new(),
            kind: None,
        },
    }
}

pub fn resolve_go_terms(summary: &GoSummary, ontology: &OntologyDefinitions) -> Vec<GoTermLabel> {
    summary
        .terms
        .iter()
        .map(|id| resolve_go_term(id, ontology))
        .collect()
}

// ============================================================================
// InterPro
// ============================================================================

/// Descriptions of the annotations that carry one. Annotations without a
/// description, or with a blank one, are skipped, so the result can be
/// shorter than the input.
pub fn interpro_descriptions(annotations: &[InterproAnnotation]) -> Vec<String> {
    annotations
        .iter()
        .filter_map(|a| a.interpro_description.as_deref())
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Read descriptions back from exported text, a list of strings, or a list
/// of annotation objects.
pub fn interpro_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if s.trim() == PLACEHOLDER => Vec::new(),
        Value::String(s) => s
            .split(INTERPRO_SEPARATOR)
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.as_str()),
                Value::Object(map) => map.get("interpro_description").and_then(Value::as_str),
                _ => None,
            })
            .filter(|d| !d.trim().is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

pub fn interpro_text(descriptions: &[String]) -> String {
    descriptions.join(INTERPRO_SEPARATOR)
}

// ============================================================================
// Hits
// ============================================================================

/// `percent_identity / alignment_length * 100` from the raw hit fields.
///
/// This is a ratio of two reported values, not a recomputed sequence
/// identity.
pub fn identity_percent(hit: &BlastHit) -> Option<f64> {
    let identity = hit.percent_identity?;
    let length = hit.alignment_length?;
    if length == 0.0 {
        return None;
    }
    Some(identity / length * 100.0)
}

// ============================================================================
// Whole-table aggregates
// ============================================================================

/// How often each GO id is referenced across all entries, most frequent
/// first. Uses the full term lists, not the truncated row summaries.
pub fn go_term_counts(entries: &[RawResult]) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for entry in entries {
        for term in entry.all_go_terms() {
            *counts.entry(term).or_insert(0) += 1;
        }
    }
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Row counts shown on the charts tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowStats {
    pub classified: usize,
    pub unclassified: usize,
    pub with_blast: usize,
    pub with_interpro: usize,
    pub without_hits: usize,
    pub placeholders: usize,
}

pub fn row_stats<'a>(rows: impl IntoIterator<Item = &'a NormalizedRow>) -> RowStats {
    let mut stats = RowStats::default();
    for row in rows {
        match row.classification {
            Classification::Classified => stats.classified += 1,
            Classification::Unclassified => stats.unclassified += 1,
        }
        if row.is_placeholder() {
            stats.placeholders += 1;
        }
        let mut any = false;
        for tag in &row.tags {
            match tag.kind {
                TagKind::Blast => stats.with_blast += 1,
                TagKind::Interpro => stats.with_interpro += 1,
                TagKind::Default => continue,
            }
            any = true;
        }
        if !any {
            stats.without_hits += 1;
        }
    }
    stats
}

/// First `limit` characters of `s`.
pub fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}
