//! Prepared render data for widget-backed table cells.
//!
//! Building an overlay resolves colors and GO labels once; drawing it each
//! frame is then just a few labels.

use crate::error::{Result, ViewerError};
use crate::results::{
    resolve_go_terms, visible_tags, CellWidget, Column, GoTermLabel, NormalizedRow,
    OntologyDefinitions, WidgetFactory,
};
use crate::style::STYLES;
use eframe::egui::{self, Color32, RichText};

#[derive(Debug, Clone, PartialEq)]
pub enum CellOverlay {
    Tags {
        shown: Vec<(String, Color32)>,
        overflow: usize,
    },
    GoTerms {
        terms: Vec<GoTermLabel>,
        truncated: bool,
    },
    Badge {
        label: &'static str,
        color: Color32,
    },
    Domains {
        first: String,
        more: usize,
        tooltip: String,
    },
    Error,
}

impl CellOverlay {
    pub fn show(&self, ui: &mut egui::Ui) {
        match self {
            CellOverlay::Tags { shown, overflow } => {
                ui.horizontal(|ui| {
                    for (label, color) in shown {
                        ui.label(RichText::new(label).color(*color).small());
                    }
                    if *overflow > 0 {
                        ui.label(RichText::new(format!("+{}", overflow)).small().weak());
                    }
                });
            }
            CellOverlay::GoTerms { terms, truncated } => {
                if terms.is_empty() {
                    ui.colored_label(STYLES.muted, "N/A");
                    return;
                }
                ui.horizontal(|ui| {
                    for term in terms {
                        ui.label(
                            RichText::new(&term.id)
                                .monospace()
                                .small()
                                .color(STYLES.go_type(term.kind)),
                        )
                        .on_hover_text(term.tooltip());
                    }
                    if *truncated {
                        ui.label(RichText::new("...").weak());
                    }
                });
            }
            CellOverlay::Badge { label, color } => {
                ui.label(RichText::new(*label).color(*color).strong());
            }
            CellOverlay::Domains {
                first,
                more,
                tooltip,
            } => {
                let text = if *more > 0 {
                    format!("{} (+{})", first, more)
                } else {
                    first.clone()
                };
                let response = ui.label(text);
                if !tooltip.is_empty() {
                    response.on_hover_text(tooltip.as_str());
                }
            }
            CellOverlay::Error => {
                ui.colored_label(STYLES.error, "Error");
            }
        }
    }
}

/// Builds overlays against the loaded ontology definitions.
#[derive(Default)]
pub struct OverlayFactory {
    pub ontology: OntologyDefinitions,
}

impl OverlayFactory {
    pub fn new(ontology: OntologyDefinitions) -> Self {
        Self { ontology }
    }
}

impl WidgetFactory for OverlayFactory {
    type Widget = CellOverlay;

    fn build(&self, row_index: usize, _row: &NormalizedRow, spec: &CellWidget) -> Result<CellOverlay> {
        let overlay = match spec {
            CellWidget::ResultTags(tags) => {
                if tags.is_empty() {
                    return Err(ViewerError::Widget {
                        row: row_index,
                        column: Column::Hits.index(),
                        message: "no result tags".to_string(),
                    });
                }
                let (shown, overflow) = visible_tags(tags);
                CellOverlay::Tags {
                    shown: shown
                        .iter()
                        .map(|t| (t.label(), STYLES.tag(t.kind)))
                        .collect(),
                    overflow,
                }
            }
            CellWidget::GoTerms(summary) => CellOverlay::GoTerms {
                terms: resolve_go_terms(summary, &self.ontology),
                truncated: summary.truncated,
            },
            CellWidget::Classification(classification) => CellOverlay::Badge {
                label: classification.label(),
                color: STYLES.classification(*classification),
            },
            CellWidget::InterproDomains(domains) => match domains.split_first() {
                Some((first, rest)) => CellOverlay::Domains {
                    first: first.clone(),
                    more: rest.len(),
                    tooltip: domains.join("\n"),
                },
                None => CellOverlay::Domains {
                    first: "N/A".to_string(),
                    more: 0,
                    tooltip: String::new(),
                },
            },
        };
        Ok(overlay)
    }

    fn fallback(&self, _error: &ViewerError) -> CellOverlay {
        CellOverlay::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::normalize::normalize_value;
    use crate::results::types::ResultTag;
    use crate::results::{GoType, TableModel, TagKind};
    use serde_json::json;

    fn row() -> NormalizedRow {
        normalize_value(json!({"query_id": "Q1"})).row
    }

    #[test]
    fn test_tags_overlay_collapses_overflow() {
        let factory = OverlayFactory::default();
        let tags = vec![ResultTag::counted(TagKind::Blast, 1); 5];
        let overlay = factory
            .build(0, &row(), &CellWidget::ResultTags(tags))
            .unwrap();
        let CellOverlay::Tags { shown, overflow } = overlay else {
            panic!("expected tags overlay");
        };
        assert_eq!(shown.len(), 3);
        assert_eq!(overflow, 2);
        assert_eq!(shown[0].0, "blast: 1");
    }

    #[test]
    fn test_go_overlay_resolves_names() {
        let mut ontology = OntologyDefinitions::default();
        ontology.insert("GO:0005575", "cellular_component", GoType::Cellular);
        let factory = OverlayFactory::new(ontology);
        let result = normalize_value(json!({
            "eggNOG_annotations": [{"GOs": "GO:0005575,GO:0000001"}]
        }));
        let spec = result.widgets.get(&Column::GoTerms).unwrap();
        let CellOverlay::GoTerms { terms, truncated } = factory.build(0, &result.row, spec).unwrap()
        else {
            panic!("expected GO overlay");
        };
        assert!(!truncated);
        assert_eq!(terms[0].kind, Some(GoType::Cellular));
        assert_eq!(terms[1].kind, None);
    }

    #[test]
    fn test_empty_tags_fall_back_to_error_in_table() {
        let factory = OverlayFactory::default();
        let mut result = normalize_value(json!({"query_id": "Q1"}));
        result
            .widgets
            .insert(Column::Hits, CellWidget::ResultTags(Vec::new()));
        let mut model = TableModel::new();
        model.append_batch(vec![result], &factory);
        assert_eq!(model.overlay(0, Column::Hits), Some(&CellOverlay::Error));
        assert!(matches!(
            model.overlay(0, Column::Classification),
            Some(CellOverlay::Badge { label: "Unclassified", .. })
        ));
    }

    #[test]
    fn test_domains_overlay() {
        let factory = OverlayFactory::default();
        let spec = CellWidget::InterproDomains(vec!["A".into(), "B".into(), "C".into()]);
        let overlay = factory.build(0, &row(), &spec).unwrap();
        assert_eq!(
            overlay,
            CellOverlay::Domains {
                first: "A".to_string(),
                more: 2,
                tooltip: "A\nB\nC".to_string(),
            }
        );
    }
}
