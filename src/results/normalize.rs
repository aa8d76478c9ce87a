//! Normalization of raw result entries into fixed-schema table rows.

use super::summary::{
    go_summary, go_text, interpro_descriptions, interpro_from_value, interpro_text, parse_tags,
    result_tags, tags_text, truncate_chars,
};
use super::types::{
    CellWidget, Classification, Column, ExportedResult, GoSummary, NormalizedResult,
    NormalizedRow, PipelineResult, RawResult, ResultTag, TermList, WidgetSpecs,
    CLASSIFIED_GO_THRESHOLD, ERROR_DESCRIPTION_LIMIT, ERROR_LABEL, PLACEHOLDER,
};
use serde_json::Value;

/// Normalize one entry. Never fails: unreadable entries become placeholder
/// rows.
pub fn normalize(raw: &RawResult) -> NormalizedResult {
    let row = match raw {
        RawResult::Pipeline(r) => from_pipeline(r),
        RawResult::Exported(r) => from_exported(r),
        RawResult::Missing => missing_row(),
        RawResult::Text(s) | RawResult::Malformed(s) => error_row(s),
    };
    let widgets = widget_specs(&row);
    NormalizedResult { row, widgets }
}

/// Classify and normalize a JSON value.
#[cfg(test)]
pub fn normalize_value(value: Value) -> NormalizedResult {
    normalize(&RawResult::classify(value))
}

/// Columns rendered with a custom widget, with their payloads.
pub fn widget_specs(row: &NormalizedRow) -> WidgetSpecs {
    let mut specs = WidgetSpecs::new();
    specs.insert(Column::Hits, CellWidget::ResultTags(row.tags.clone()));
    specs.insert(Column::GoTerms, CellWidget::GoTerms(row.go_terms.clone()));
    specs.insert(
        Column::Classification,
        CellWidget::Classification(row.classification),
    );
    specs.insert(
        Column::InterproDomains,
        CellWidget::InterproDomains(row.interpro.clone()),
    );
    specs
}

fn from_pipeline(result: &PipelineResult) -> NormalizedRow {
    let mut row = RowBuilder {
        protein_id: result.query_id.clone(),
        length: result.query_len,
        tags: result_tags(result.blast_hits.len(), result.interpro_annotations.len()),
        interpro: interpro_descriptions(&result.interpro_annotations),
        ..Default::default()
    };

    if let Some(eggnog) = result.eggnog_annotations.first() {
        row.description = eggnog.description.clone();
        row.pfam = eggnog.pfams.clone();
        row.preferred_name = eggnog.preferred_name.clone();
        row.cog_category = eggnog.cog_category.clone();
        row.enzyme_code = eggnog.ec.clone();
        if let Some(gos) = &eggnog.gos {
            row.classification = Some(classify_go(gos));
            row.go_terms = Some(go_summary(gos));
        }
    }

    row.finish()
}

fn from_exported(result: &ExportedResult) -> NormalizedRow {
    let row = RowBuilder {
        protein_id: result.protein_id.clone(),
        description: result.description.clone(),
        length: result.length,
        tags: result.hits.as_ref().map(parse_tags).unwrap_or_default(),
        pfam: result.pfam.clone(),
        go_terms: result
            .gos
            .as_ref()
            .filter(|gos| gos.terms() != [PLACEHOLDER])
            .map(go_summary),
        // Exported GO lists are already cut down, so the label is trusted.
        classification: result
            .classification
            .as_deref()
            .and_then(Classification::from_label),
        preferred_name: result.preferred_name.clone(),
        cog_category: result.cog_category.clone(),
        enzyme_code: result.ec.clone(),
        interpro: result
            .interpro
            .as_ref()
            .map(interpro_from_value)
            .unwrap_or_default(),
    };
    row.finish()
}

/// Classified when the raw comma split of the GO field has more than
/// `CLASSIFIED_GO_THRESHOLD` tokens.
pub fn classify_go(gos: &TermList) -> Classification {
    if gos.split_count() > CLASSIFIED_GO_THRESHOLD {
        Classification::Classified
    } else {
        Classification::Unclassified
    }
}

fn missing_row() -> NormalizedRow {
    RowBuilder {
        protein_id: Some(PLACEHOLDER.to_string()),
        description: Some(PLACEHOLDER.to_string()),
        ..Default::default()
    }
    .finish()
}

fn error_row(input: &str) -> NormalizedRow {
    RowBuilder {
        protein_id: Some(ERROR_LABEL.to_string()),
        description: Some(truncate_chars(input, ERROR_DESCRIPTION_LIMIT)),
        ..Default::default()
    }
    .finish()
}

/// Fields collected by shape-specific processing. Anything left `None` is
/// shown as `N/A`.
#[derive(Default)]
struct RowBuilder {
    protein_id: Option<String>,
    description: Option<String>,
    length: Option<u64>,
    tags: Vec<ResultTag>,
    pfam: Option<String>,
    go_terms: Option<GoSummary>,
    classification: Option<Classification>,
    preferred_name: Option<String>,
    cog_category: Option<String>,
    enzyme_code: Option<String>,
    interpro: Vec<String>,
}

impl RowBuilder {
    fn finish(self) -> NormalizedRow {
        let or_placeholder = |v: Option<String>| v.unwrap_or_else(|| PLACEHOLDER.to_string());

        let tags = if self.tags.is_empty() {
            vec![ResultTag::not_available()]
        } else {
            self.tags
        };
        let go_terms = self
            .go_terms
            .filter(|g| !g.terms.is_empty())
            .unwrap_or_default();
        let classification = self.classification.unwrap_or(Classification::Unclassified);
        let length = self.length.unwrap_or(0);
        let protein_id = or_placeholder(self.protein_id);

        let go_display = if go_terms.terms.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            go_text(&go_terms)
        };
        let interpro_display = if self.interpro.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            interpro_text(&self.interpro)
        };

        let text = [
            protein_id.clone(),
            or_placeholder(self.description),
            length.to_string(),
            tags_text(&tags),
            or_placeholder(self.pfam),
            go_display,
            classification.label().to_string(),
            or_placeholder(self.preferred_name),
            or_placeholder(self.cog_category),
            or_placeholder(self.enzyme_code),
            interpro_display,
        ];

        NormalizedRow {
            protein_id,
            length,
            tags,
            go_terms,
            classification,
            interpro: self.interpro,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::types::TagKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn go_string(n: usize) -> String {
        (0..n)
            .map(|i| format!("GO:{:07}", i + 1))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn pipeline_with_gos(gos: &str) -> Value {
        json!({
            "query_id": "Q1",
            "query_len": 120,
            "eggNOG_annotations": [{"Description": "kinase", "GOs": gos}],
            "InterproScan_annotation": [],
            "blast_hits": [],
        })
    }

    fn full_pipeline() -> Value {
        json!({
            "query_id": "sp|P12345|KIN1",
            "query_len": 412,
            "eggNOG_annotations": [
                {
                    "Description": "Serine/threonine-protein kinase",
                    "PFAMs": "Pkinase",
                    "GOs": go_string(12),
                    "Preferred_name": "KIN1",
                    "COG_category": "T",
                    "EC": "2.7.11.1"
                },
                {"Description": "ignored second annotation"}
            ],
            "InterproScan_annotation": [
                {"interpro_accession": "IPR000719", "interpro_description": "Protein kinase domain"},
                {"signature_accession": "PF00069"},
                {"interpro_accession": "IPR008271", "interpro_description": "Ser/Thr kinase active site"}
            ],
            "blast_hits": [
                {"hit_id": "h1", "percent_identity": 90.0, "alignment_length": 400},
                {"hit_id": "h2", "percent_identity": 70.0, "alignment_length": 350}
            ]
        })
    }

    #[test]
    fn test_every_shape_yields_complete_row() {
        let inputs = vec![
            full_pipeline(),
            json!({"query_id": "bare"}),
            json!({"PROTID": "P1", "Annot": "x", "Hits": "blast: 1"}),
            json!(null),
            json!("just a string"),
            json!([1, 2, 3]),
            json!({}),
        ];
        for input in inputs {
            let result = normalize_value(input);
            for column in Column::ALL {
                assert!(
                    !result.row.text(column).is_empty(),
                    "column {} empty",
                    column
                );
            }
            assert!(!result.row.tags.is_empty());
            assert_eq!(result.widgets.len(), 4);
        }
    }

    #[test]
    fn test_full_pipeline_row() {
        let result = normalize_value(full_pipeline());
        let row = &result.row;
        assert_eq!(row.protein_id, "sp|P12345|KIN1");
        assert_eq!(row.text(Column::Description), "Serine/threonine-protein kinase");
        assert_eq!(row.length, 412);
        assert_eq!(row.text(Column::Length), "412");
        assert_eq!(row.text(Column::Hits), "blast: 2, interpro: 3");
        assert_eq!(row.text(Column::Pfam), "Pkinase");
        assert_eq!(row.go_terms.terms.len(), 7);
        assert!(row.go_terms.truncated);
        assert_eq!(row.classification, Classification::Classified);
        assert_eq!(row.text(Column::PreferredName), "KIN1");
        assert_eq!(row.text(Column::CogCategory), "T");
        assert_eq!(row.text(Column::EnzymeCode), "2.7.11.1");
        // The annotation without a description is not listed.
        assert_eq!(
            row.interpro,
            vec!["Protein kinase domain", "Ser/Thr kinase active site"]
        );
    }

    #[test]
    fn test_classification_boundary() {
        let eleven = normalize_value(pipeline_with_gos(&go_string(11)));
        assert_eq!(eleven.row.classification, Classification::Classified);

        let ten = normalize_value(pipeline_with_gos(&go_string(10)));
        assert_eq!(ten.row.classification, Classification::Unclassified);

        let empty = normalize_value(pipeline_with_gos(""));
        assert_eq!(empty.row.classification, Classification::Unclassified);
        assert_eq!(empty.row.text(Column::GoTerms), PLACEHOLDER);
    }

    #[test]
    fn test_classification_counts_terms_not_distinct() {
        let repeated = vec!["GO:0000001"; 11].join(",");
        let result = normalize_value(pipeline_with_gos(&repeated));
        assert_eq!(result.row.classification, Classification::Classified);
        assert_eq!(result.row.go_terms.terms, vec!["GO:0000001"; 7]);
    }

    #[test]
    fn test_go_summary_length() {
        for n in [1usize, 5, 7, 9] {
            let result = normalize_value(pipeline_with_gos(&go_string(n)));
            assert_eq!(result.row.go_terms.terms.len(), n.min(7));
            assert_eq!(result.row.go_terms.terms[0], "GO:0000001");
        }
    }

    #[test]
    fn test_null_placeholder() {
        let result = normalize_value(Value::Null);
        let row = &result.row;
        assert_eq!(row.protein_id, PLACEHOLDER);
        assert_eq!(row.text(Column::Description), PLACEHOLDER);
        assert_eq!(row.classification, Classification::Unclassified);
        assert_eq!(row.tags, vec![ResultTag::not_available()]);
        assert!(row.go_terms.terms.is_empty());
        assert!(row.interpro.is_empty());
        assert_eq!(row.length, 0);
    }

    #[test]
    fn test_string_becomes_error_row() {
        let long = "x".repeat(250);
        let result = normalize_value(Value::String(long));
        assert_eq!(result.row.protein_id, ERROR_LABEL);
        assert_eq!(result.row.description().chars().count(), 100);
        assert!(result.row.is_placeholder());
    }

    #[test]
    fn test_malformed_values_become_error_rows() {
        let result = normalize_value(json!([1, 2, 3]));
        assert_eq!(result.row.protein_id, ERROR_LABEL);
        assert_eq!(result.row.description(), "[1,2,3]");

        let long = json!((0..100).collect::<Vec<u32>>());
        let compact = long.to_string();
        assert!(compact.len() > 100);
        let result = normalize_value(long);
        assert_eq!(result.row.protein_id, ERROR_LABEL);
        assert_eq!(result.row.description().chars().count(), 100);
        assert_eq!(result.row.description(), &compact[..100]);

        let result = normalize_value(json!(true));
        assert_eq!(result.row.description(), "true");
    }

    #[test]
    fn test_missing_keys_are_backfilled() {
        let result = normalize_value(json!({"query_id": "Q9"}));
        let row = &result.row;
        assert_eq!(row.text(Column::Description), PLACEHOLDER);
        assert_eq!(row.text(Column::Pfam), PLACEHOLDER);
        assert_eq!(row.text(Column::EnzymeCode), PLACEHOLDER);
        assert_eq!(row.text(Column::InterproDomains), PLACEHOLDER);
        assert_eq!(row.text(Column::Length), "0");
        assert_eq!(row.tags, vec![ResultTag::not_available()]);
    }

    #[test]
    fn test_exported_shape() {
        let result = normalize_value(json!({
            "PROTID": "P7",
            "Annot": "transporter",
            "Prot Length": "88",
            "Hits": "blast: 3",
            "InterPro Domain": "MFS domain; Sugar transporter",
            "GOs": "GO:0000001, GO:0000002",
            "Classification": "Classified",
        }));
        let row = &result.row;
        assert_eq!(row.protein_id, "P7");
        assert_eq!(row.length, 88);
        assert_eq!(row.tags, vec![ResultTag::counted(TagKind::Blast, 3)]);
        assert_eq!(row.interpro, vec!["MFS domain", "Sugar transporter"]);
        assert_eq!(row.go_terms.terms, vec!["GO:0000001", "GO:0000002"]);
        assert_eq!(row.classification, Classification::Classified);
        assert_eq!(row.text(Column::Pfam), PLACEHOLDER);
    }

    #[test]
    fn test_widget_specs_follow_row() {
        let result = normalize_value(full_pipeline());
        assert_eq!(
            result.widgets.get(&Column::Classification),
            Some(&CellWidget::Classification(Classification::Classified))
        );
        assert!(matches!(
            result.widgets.get(&Column::Hits),
            Some(CellWidget::ResultTags(tags)) if tags.len() == 2
        ));
        assert!(!result.widgets.contains_key(&Column::ProteinId));
    }
}
