//! Main application state and UI

use eframe::egui::{self, RichText};
use egui_extras::{Column as TableColumn, TableBuilder};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::Config;
use crate::overlay::{CellOverlay, OverlayFactory};
use crate::results::summary::{go_term_counts, row_stats, RowStats};
use crate::results::types::{NormalizedResult, PLACEHOLDER};
use crate::results::{
    apply_filter, export_to_path, identity_percent, normalize, resolve_go_term, spawn_load,
    Column, ExportFormat, FilterMode, FilterState, GoType, LoadHandle, LoadOutcome,
    OntologyDefinitions, PredicateId, RawResult, TableModel, Visibility,
};
use crate::style::STYLES;

const ROW_HEIGHT: f32 = 22.0;
const GO_ROW_HEIGHT: f32 = 20.0;
const BAR_HEIGHT: f32 = 18.0;

/// Application state
pub struct BlastViewerApp {
    config: Config,
    factory: OverlayFactory,

    // Loaded document
    source_path: Option<PathBuf>,
    raw_results: Vec<RawResult>,
    model: TableModel<CellOverlay>,

    // Loading state
    load_handle: Option<LoadHandle>,
    load_status: Option<String>,

    // Filtering
    filter: FilterState,
    visibility: Visibility,
    filter_dirty: bool,

    // View state
    current_tab: Tab,
    selected_row: Option<usize>,
    go_browser_text: String,
    go_browser_type: Option<GoType>,
    go_index: Vec<(String, usize)>,

    // Errors
    load_error: Option<String>,
    export_error: Option<String>,
    config_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Results,
    HitDetails,
    Domains,
    GoTerms,
    Charts,
}

impl Default for BlastViewerApp {
    fn default() -> Self {
        Self {
            config: Config::default(),
            factory: OverlayFactory::default(),
            source_path: None,
            raw_results: Vec::new(),
            model: TableModel::new(),
            load_handle: None,
            load_status: None,
            filter: FilterState::new(FilterMode::And),
            visibility: Visibility::default(),
            filter_dirty: false,
            current_tab: Tab::Results,
            selected_row: None,
            go_browser_text: String::new(),
            go_browser_type: None,
            go_index: Vec::new(),
            load_error: None,
            export_error: None,
            config_error: None,
        }
    }
}

impl BlastViewerApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: Config,
        ontology: OntologyDefinitions,
        config_error: Option<String>,
        initial_file: Option<PathBuf>,
    ) -> Self {
        let mut app = Self {
            config,
            factory: OverlayFactory::new(ontology),
            config_error,
            ..Self::default()
        };
        if let Some(path) = initial_file {
            app.start_load(path);
        }
        app
    }

    fn is_loading(&self) -> bool {
        self.load_handle.is_some()
    }

    /// Start reading `path` in the background, cancelling any load already
    /// running. The current table stays until the new one is ready.
    fn start_load(&mut self, path: PathBuf) {
        if let Some(previous) = self.load_handle.take() {
            info!("Cancelling load of {}", previous.path().display());
            previous.cancel();
        }
        self.load_error = None;
        self.load_status = None;
        self.load_handle = Some(spawn_load(path));
    }

    fn check_load_progress(&mut self) {
        let Some(handle) = self.load_handle.as_mut() else {
            return;
        };
        let Some(outcome) = handle.poll() else {
            return;
        };
        let path = handle.path().to_path_buf();
        self.load_handle = None;

        match outcome {
            LoadOutcome::Loaded(raw) => self.install_results(path, raw),
            LoadOutcome::Cancelled => {
                self.load_status = Some("Loading cancelled".to_string());
            }
            LoadOutcome::Failed(e) => {
                error!("Failed to load {}: {}", path.display(), e);
                self.load_error = Some(format!("Failed to load {}: {}", path.display(), e));
            }
        }
    }

    fn install_results(&mut self, path: PathBuf, raw: Vec<RawResult>) {
        let normalized: Vec<NormalizedResult> = raw.par_iter().map(normalize).collect();
        self.model.replace(normalized, &self.factory);
        self.go_index = go_term_counts(&raw);
        self.raw_results = raw;
        self.selected_row = None;
        self.filter_dirty = true;
        self.load_status = Some(format!(
            "Loaded {} entries from {}",
            self.model.row_count(),
            file_label(&path)
        ));
        self.source_path = Some(path);
    }

    fn open_results_file(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            self.start_load(path);
        }
    }

    fn open_ontology_file(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("OBO", &["obo"])
            .pick_file()
        {
            match OntologyDefinitions::from_path(&path) {
                Ok(ontology) => {
                    self.factory.ontology = ontology;
                    self.model.invalidate_overlays(&self.factory);
                    self.config_error = None;
                }
                Err(e) => {
                    error!("{}", e);
                    self.config_error = Some(format!("Failed to load ontology: {}", e));
                }
            }
        }
    }

    fn export_results(&mut self, format: ExportFormat) {
        if self.model.is_empty() {
            self.export_error = Some("No results to export".to_string());
            return;
        }

        let mut dialog = rfd::FileDialog::new()
            .add_filter(format.label(), &[format.extension()])
            .set_file_name(format!("results.{}", format.extension()));
        if let Some(dir) = &self.config.export_dir {
            dialog = dialog.set_directory(dir);
        }

        if let Some(path) = dialog.save_file() {
            match export_to_path(&path, format, &self.model, &self.visibility.rows) {
                Ok(()) => self.export_error = None,
                Err(e) => {
                    error!("{}", e);
                    self.export_error = Some(format!("Export failed: {}", e));
                }
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .find_map(|file| file.path.clone())
        });
        if let Some(path) = dropped {
            self.start_load(path);
        }
    }

    fn refresh_filter(&mut self) {
        if self.filter_dirty {
            self.visibility = apply_filter(&mut self.filter, &self.model);
            self.filter_dirty = false;
            // Detail tabs follow the filter
            if let Some(index) = self.selected_row {
                if !self.visibility.is_visible(index) {
                    self.selected_row = None;
                }
            }
        }
    }
}

impl eframe::App for BlastViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.is_loading() {
            self.check_load_progress();
            ctx.request_repaint();
        }
        self.handle_dropped_files(ctx);
        self.refresh_filter();

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Results...").clicked() {
                        self.open_results_file();
                        ui.close_menu();
                    }
                    if ui.button("Load GO Ontology...").clicked() {
                        self.open_ontology_file();
                        ui.close_menu();
                    }
                    ui.separator();
                    let can_export = !self.model.is_empty();
                    for format in ExportFormat::ALL {
                        if ui
                            .add_enabled(
                                can_export,
                                egui::Button::new(format!("Export {}...", format.label())),
                            )
                            .clicked()
                        {
                            self.export_results(format);
                            ui.close_menu();
                        }
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
        });

        // Tab bar
        egui::TopBottomPanel::top("tabs").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(
                    &mut self.current_tab,
                    Tab::Results,
                    format!("Results ({})", self.model.row_count()),
                );
                ui.selectable_value(&mut self.current_tab, Tab::HitDetails, "Hit Details");
                ui.selectable_value(&mut self.current_tab, Tab::Domains, "Domains");
                ui.selectable_value(
                    &mut self.current_tab,
                    Tab::GoTerms,
                    format!("GO Terms ({})", self.go_index.len()),
                );
                ui.selectable_value(&mut self.current_tab, Tab::Charts, "Charts");
            });
        });

        // Status bar
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            self.show_status_bar(ui);
        });

        // Main content
        egui::CentralPanel::default().show(ctx, |ui| match self.current_tab {
            Tab::Results => self.show_results_tab(ui),
            Tab::HitDetails => self.show_hit_details_tab(ui),
            Tab::Domains => self.show_domains_tab(ui),
            Tab::GoTerms => self.show_go_terms_tab(ui),
            Tab::Charts => self.show_charts_tab(ui),
        });
    }
}

impl BlastViewerApp {
    fn show_status_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if let Some(handle) = &self.load_handle {
                ui.spinner();
                match handle.progress() {
                    Some(progress) => {
                        ui.add(
                            egui::ProgressBar::new((progress.percent / 100.0) as f32)
                                .desired_width(200.0)
                                .show_percentage(),
                        );
                        ui.label(progress.message());
                    }
                    None => {
                        ui.label(format!("Reading {}...", file_label(handle.path())));
                    }
                }
                if ui.button("Cancel").clicked() {
                    handle.cancel();
                }
            } else if self.model.is_empty() {
                ui.label(
                    self.load_status
                        .as_deref()
                        .unwrap_or("Open a results file to begin"),
                );
            } else {
                let mut parts = Vec::new();
                if let Some(path) = &self.source_path {
                    parts.push(file_label(path));
                }
                parts.push(self.visibility.status_text());
                if !self.factory.ontology.is_empty() {
                    parts.push(format!("{} GO definitions", self.factory.ontology.len()));
                }
                if let Some(status) = &self.load_status {
                    parts.push(status.clone());
                }
                ui.label(parts.join(" | "));
            }

            for message in [&self.load_error, &self.export_error, &self.config_error]
                .into_iter()
                .flatten()
            {
                ui.separator();
                ui.colored_label(STYLES.error, message.as_str());
            }
        });
    }

    fn show_results_tab(&mut self, ui: &mut egui::Ui) {
        self.show_filter_panel(ui);
        ui.separator();

        if self.model.is_empty() {
            ui.label("No results loaded.");
            return;
        }
        if self.visibility.count() == 0 {
            ui.label(self.visibility.status_text());
            return;
        }

        let model = &self.model;
        let visible_rows = &self.visibility.rows;
        let mut selected = self.selected_row;
        let mut rendered: Vec<usize> = Vec::new();

        egui::ScrollArea::horizontal().show(ui, |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .sense(egui::Sense::click())
                .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
                .columns(
                    TableColumn::initial(120.0).at_least(40.0).clip(true),
                    model.column_count(),
                )
                .min_scrolled_height(0.0)
                .header(20.0, |mut header| {
                    for column in Column::ALL {
                        header.col(|ui| {
                            ui.strong(column.name());
                        });
                    }
                })
                .body(|body| {
                    body.rows(ROW_HEIGHT, visible_rows.len(), |mut row| {
                        let index = visible_rows[row.index()];
                        rendered.push(index);
                        row.set_selected(selected == Some(index));

                        for column in Column::ALL {
                            row.col(|ui| match model.overlay(index, column) {
                                Some(overlay) => overlay.show(ui),
                                None => {
                                    let text = model.cell_value(index, column.index()).unwrap_or("");
                                    ui.add(egui::Label::new(text).truncate());
                                }
                            });
                        }

                        if row.response().clicked() {
                            selected = Some(index);
                        }
                    });
                });
        });

        self.selected_row = selected;

        // Build overlays for whatever came into view this frame
        let built = if self.visibility.count() == self.model.row_count() {
            match (rendered.iter().min(), rendered.iter().max()) {
                (Some(&first), Some(&last)) => {
                    self.model.set_viewport(first..last + 1, &self.factory)
                }
                _ => 0,
            }
        } else {
            self.model.materialize_rows(&rendered, &self.factory)
        };
        if built > 0 {
            ui.ctx().request_repaint();
        }
    }

    fn show_filter_panel(&mut self, ui: &mut egui::Ui) {
        let mut changed = false;
        let mut removed: Option<PredicateId> = None;

        ui.horizontal(|ui| {
            ui.label("Filters:");
            for mode in [FilterMode::And, FilterMode::Or] {
                if ui
                    .radio_value(&mut self.filter.mode, mode, mode.label())
                    .changed()
                {
                    changed = true;
                }
            }
            if ui.button("Add Filter").clicked() {
                self.filter.add(Column::ProteinId.index(), "");
                changed = true;
            }
            let can_clear = !self.filter.predicates().is_empty();
            if ui
                .add_enabled(can_clear, egui::Button::new("Clear"))
                .clicked()
            {
                self.filter.clear();
                changed = true;
            }
        });

        let ids: Vec<PredicateId> = self.filter.predicates().iter().map(|p| p.id).collect();
        for id in ids {
            let Some(predicate) = self.filter.get_mut(id) else {
                continue;
            };
            ui.horizontal(|ui| {
                let selected = Column::from_index(predicate.column)
                    .map(Column::name)
                    .unwrap_or("?");
                egui::ComboBox::from_id_salt(("filter_column", id))
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        for column in Column::ALL {
                            if ui
                                .selectable_value(
                                    &mut predicate.column,
                                    column.index(),
                                    column.name(),
                                )
                                .changed()
                            {
                                changed = true;
                            }
                        }
                    });
                if ui
                    .add(
                        egui::TextEdit::singleline(&mut predicate.pattern)
                            .hint_text("contains...")
                            .desired_width(220.0),
                    )
                    .changed()
                {
                    changed = true;
                }
                if ui.small_button("X").clicked() {
                    removed = Some(id);
                }
            });
        }

        if let Some(id) = removed {
            self.filter.detach(id);
            changed = true;
        }
        if changed {
            self.filter_dirty = true;
            self.refresh_filter();
        }
    }

    /// Header shared by the per-row detail tabs. Returns the selected index.
    fn show_selection_header(&self, ui: &mut egui::Ui) -> Option<usize> {
        let Some(index) = self.selected_row else {
            ui.label("Select a row on the Results tab to see its details.");
            return None;
        };
        let row = self.model.row(index)?;
        ui.heading(&row.protein_id);
        ui.label(row.description());
        ui.label(format!(
            "Length: {} | {}",
            row.text(Column::Length),
            row.classification.label()
        ));
        ui.separator();
        Some(index)
    }

    fn show_hit_details_tab(&mut self, ui: &mut egui::Ui) {
        let Some(index) = self.show_selection_header(ui) else {
            return;
        };
        let Some(raw) = self.raw_results.get(index) else {
            return;
        };
        let hits = raw.blast_hits();
        if hits.is_empty() {
            ui.label("No BLAST hits recorded for this entry.");
            return;
        }

        ui.label(format!("{} BLAST hits", hits.len()));
        egui::ScrollArea::both().show(ui, |ui| {
            egui::Grid::new("blast_hits")
                .striped(true)
                .num_columns(8)
                .show(ui, |ui| {
                    for title in [
                        "Hit", "Definition", "Accession", "Identity", "Align len", "E-value",
                        "Bit score", "Query / Hit",
                    ] {
                        ui.strong(title);
                    }
                    ui.end_row();

                    for hit in hits {
                        ui.label(text_or_placeholder(hit.hit_id.as_deref()));
                        ui.label(text_or_placeholder(hit.hit_def.as_deref()));
                        ui.label(text_or_placeholder(hit.accession.as_deref()));
                        match identity_percent(hit) {
                            Some(pct) => ui.label(format!("{:.1}%", pct)),
                            None => ui.colored_label(STYLES.muted, PLACEHOLDER),
                        };
                        ui.label(display_or_placeholder(hit.alignment_length));
                        ui.label(evalue_text(hit.evalue));
                        ui.label(
                            hit.bit_score
                                .map(|s| format!("{:.1}", s))
                                .unwrap_or_else(|| PLACEHOLDER.to_string()),
                        );
                        ui.label(format!(
                            "{}-{} / {}-{} (of {})",
                            display_or_placeholder(hit.query_start),
                            display_or_placeholder(hit.query_end),
                            display_or_placeholder(hit.hit_start),
                            display_or_placeholder(hit.hit_end),
                            display_or_placeholder(hit.hit_len),
                        ));
                        ui.end_row();
                    }
                });
        });
    }

    fn show_domains_tab(&mut self, ui: &mut egui::Ui) {
        let Some(index) = self.show_selection_header(ui) else {
            return;
        };
        let Some(raw) = self.raw_results.get(index) else {
            return;
        };

        let annotations = raw.interpro_annotations();
        if annotations.is_empty() {
            // Exported rows only carry the joined descriptions
            let domains = self
                .model
                .row(index)
                .map(|r| r.interpro.clone())
                .unwrap_or_default();
            if domains.is_empty() {
                ui.label("No InterPro domains recorded for this entry.");
            } else {
                for domain in domains {
                    ui.label(domain);
                }
            }
            return;
        }

        egui::ScrollArea::both().show(ui, |ui| {
            egui::Grid::new("interpro_domains")
                .striped(true)
                .num_columns(6)
                .show(ui, |ui| {
                    for title in ["InterPro", "Description", "Signature", "Analysis", "Range", "E-value"] {
                        ui.strong(title);
                    }
                    ui.end_row();

                    for annotation in annotations {
                        ui.label(text_or_placeholder(annotation.interpro_accession.as_deref()));
                        ui.label(text_or_placeholder(annotation.interpro_description.as_deref()));
                        ui.label(format!(
                            "{} {}",
                            text_or_placeholder(annotation.signature_accession.as_deref()),
                            annotation.signature_description.as_deref().unwrap_or("")
                        ));
                        ui.label(text_or_placeholder(annotation.analysis.as_deref()));
                        ui.label(format!(
                            "{}-{}",
                            display_or_placeholder(annotation.start),
                            display_or_placeholder(annotation.end)
                        ));
                        ui.label(evalue_text(annotation.evalue));
                        ui.end_row();
                    }
                });
        });
    }

    fn show_go_terms_tab(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Search:");
            ui.text_edit_singleline(&mut self.go_browser_text);
            egui::ComboBox::from_id_salt("go_type")
                .selected_text(self.go_browser_type.map(GoType::label).unwrap_or("All"))
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.go_browser_type, None, "All");
                    for kind in GoType::ALL {
                        ui.selectable_value(&mut self.go_browser_type, Some(kind), kind.label());
                    }
                });
        });
        if self.factory.ontology.is_empty() {
            ui.colored_label(
                STYLES.muted,
                "No ontology loaded; term names and types are unavailable.",
            );
        }
        ui.separator();

        let needle = self.go_browser_text.trim().to_lowercase();
        let entries: Vec<_> = self
            .go_index
            .iter()
            .map(|(id, count)| (resolve_go_term(id, &self.factory.ontology), *count))
            .filter(|(label, _)| self.go_browser_type.is_none() || label.kind == self.go_browser_type)
            .filter(|(label, _)| {
                needle.is_empty()
                    || label.id.to_lowercase().contains(&needle)
                    || label.description.to_lowercase().contains(&needle)
            })
            .collect();

        if entries.is_empty() {
            ui.label("No GO terms match.");
            return;
        }

        ui.label(format!("{} terms", entries.len()));
        egui::ScrollArea::vertical().id_salt("go_terms").show_rows(
            ui,
            GO_ROW_HEIGHT,
            entries.len(),
            |ui, range| {
                for (label, count) in &entries[range] {
                    ui.horizontal(|ui| {
                        ui.label(
                            RichText::new(&label.id)
                                .monospace()
                                .color(STYLES.go_type(label.kind)),
                        );
                        ui.label(format!("x{}", count));
                        if let Some(kind) = label.kind {
                            ui.label(RichText::new(kind.label()).weak());
                        }
                        ui.label(&label.description);
                    });
                }
            },
        );
    }

    fn show_charts_tab(&mut self, ui: &mut egui::Ui) {
        if self.model.is_empty() {
            ui.label("No results loaded.");
            return;
        }

        let stats: RowStats = row_stats(self.model.rows());

        ui.heading("Classification");
        bar_chart(
            ui,
            "classification_chart",
            &[
                ("Classified", stats.classified, STYLES.ok),
                ("Unclassified", stats.unclassified, STYLES.warning),
            ],
        );
        ui.add_space(10.0);

        ui.heading("Evidence");
        bar_chart(
            ui,
            "evidence_chart",
            &[
                ("BLAST hits", stats.with_blast, STYLES.bar),
                ("InterPro domains", stats.with_interpro, STYLES.bar),
                ("No hits", stats.without_hits, STYLES.muted),
                ("Placeholder rows", stats.placeholders, STYLES.error),
            ],
        );
        ui.add_space(10.0);

        ui.heading("GO namespaces");
        let mut by_type = [0usize; 3];
        let mut unknown = 0usize;
        for (id, count) in &self.go_index {
            match self.factory.ontology.get(id).map(|d| d.kind) {
                Some(GoType::Molecular) => by_type[0] += count,
                Some(GoType::Biological) => by_type[1] += count,
                Some(GoType::Cellular) => by_type[2] += count,
                None => unknown += count,
            }
        }
        let mut bars: Vec<(&str, usize, egui::Color32)> = GoType::ALL
            .iter()
            .zip(by_type)
            .map(|(kind, count)| (kind.label(), count, STYLES.go_type(Some(*kind))))
            .collect();
        bars.push(("Unknown", unknown, STYLES.go_type(None)));
        bar_chart(ui, "go_namespace_chart", &bars);
    }
}

/// Horizontal bars scaled to the largest value.
fn bar_chart(ui: &mut egui::Ui, id: &str, bars: &[(&str, usize, egui::Color32)]) {
    let max = bars.iter().map(|(_, v, _)| *v).max().unwrap_or(0).max(1);
    let full_width = (ui.available_width() - 260.0).max(50.0);

    egui::Grid::new(id).num_columns(3).show(ui, |ui| {
        for (label, value, color) in bars {
            ui.label(*label);
            let width = full_width * (*value as f32 / max as f32);
            let (rect, _) =
                ui.allocate_exact_size(egui::vec2(full_width, BAR_HEIGHT), egui::Sense::hover());
            let bar = egui::Rect::from_min_size(rect.min, egui::vec2(width, BAR_HEIGHT));
            ui.painter().rect_filled(bar, 2.0, *color);
            ui.label(value.to_string());
            ui.end_row();
        }
    });
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn text_or_placeholder(value: Option<&str>) -> &str {
    value.filter(|s| !s.is_empty()).unwrap_or(PLACEHOLDER)
}

fn display_or_placeholder<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn evalue_text(evalue: Option<f64>) -> String {
    evalue
        .map(|e| format!("{:.2e}", e))
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}
