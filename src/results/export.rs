//! CSV, TSV and JSON writers for the visible rows of the table.

use super::filter::CellSource;
use super::types::Column;
use crate::error::{Result, ViewerError};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Tsv,
    Json,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Csv, ExportFormat::Tsv, ExportFormat::Json];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Tsv => "TSV",
            ExportFormat::Json => "JSON",
        }
    }
}

/// Header row plus one record per row; missing cells are written empty.
pub fn write_delimited<W, S>(writer: W, source: &S, rows: &[usize], delimiter: u8) -> Result<()>
where
    W: Write,
    S: CellSource,
{
    let mut out = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    out.write_record(Column::ALL.iter().map(|c| c.name()))?;
    for &row in rows {
        out.write_record(
            Column::ALL
                .iter()
                .map(|c| source.cell_text(row, c.index()).unwrap_or("")),
        )?;
    }
    out.flush()
        .map_err(|e| ViewerError::Export(e.to_string()))?;
    Ok(())
}

/// One flat object per row, keyed by column name.
pub fn json_objects<S: CellSource>(source: &S, rows: &[usize]) -> Vec<Value> {
    rows.iter()
        .map(|&row| {
            let mut object = Map::new();
            for column in Column::ALL {
                let text = source.cell_text(row, column.index()).unwrap_or("");
                let value = match column {
                    Column::Length => text
                        .parse::<u64>()
                        .map(Value::from)
                        .unwrap_or_else(|_| Value::from(text)),
                    _ => Value::from(text),
                };
                object.insert(column.name().to_string(), value);
            }
            Value::Object(object)
        })
        .collect()
}

pub fn write_json<W, S>(writer: W, source: &S, rows: &[usize]) -> Result<()>
where
    W: Write,
    S: CellSource,
{
    let objects = json_objects(source, rows);
    serde_json::to_writer_pretty(writer, &objects)?;
    Ok(())
}

pub fn write<W, S>(writer: W, format: ExportFormat, source: &S, rows: &[usize]) -> Result<()>
where
    W: Write,
    S: CellSource,
{
    match format {
        ExportFormat::Csv => write_delimited(writer, source, rows, b','),
        ExportFormat::Tsv => write_delimited(writer, source, rows, b'\t'),
        ExportFormat::Json => write_json(writer, source, rows),
    }
}

pub fn export_to_path<S: CellSource>(
    path: &Path,
    format: ExportFormat,
    source: &S,
    rows: &[usize],
) -> Result<()> {
    let file = File::create(path).map_err(|e| ViewerError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer, format, source, rows)?;
    writer.flush().map_err(|e| ViewerError::io(path, e))?;
    info!(
        "Exported {} rows as {} to {}",
        rows.len(),
        format.label(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::normalize::{normalize, normalize_value};
    use crate::results::table::{TableModel, WidgetFactory};
    use crate::results::types::{CellWidget, NormalizedRow, RawResult};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct NoWidgets;

    impl WidgetFactory for NoWidgets {
        type Widget = ();

        fn build(&self, _: usize, _: &NormalizedRow, _: &CellWidget) -> Result<()> {
            Ok(())
        }

        fn fallback(&self, _: &ViewerError) {}
    }

    fn sample_model() -> TableModel<()> {
        let gos: Vec<String> = (1..=12).map(|i| format!("GO:{:07}", i)).collect();
        let entries = vec![
            json!({"query_id": "bare_protein", "query_len": 50}),
            json!({
                "query_id": "sp|P12345|KIN1",
                "query_len": 412,
                "eggNOG_annotations": [{
                    "Description": "Serine/threonine-protein kinase, putative",
                    "PFAMs": "Pkinase,Pkinase_Tyr",
                    "GOs": gos.join(","),
                    "Preferred_name": "KIN1",
                    "COG_category": "T",
                    "EC": "2.7.11.1"
                }],
                "InterproScan_annotation": [
                    {"interpro_description": "Protein kinase domain"},
                    {"interpro_description": "Kinase-like domain superfamily"}
                ],
                "blast_hits": [{"hit_id": "a"}, {"hit_id": "b"}, {"hit_id": "c"}]
            }),
        ];
        let mut model = TableModel::new();
        model.append_batch(entries.into_iter().map(normalize_value).collect(), &NoWidgets);
        model
    }

    #[test]
    fn test_json_roundtrip_reproduces_display() {
        let model = sample_model();
        let objects = json_objects(&model, &[0, 1]);

        for (row, object) in objects.into_iter().enumerate() {
            let raw = RawResult::classify(object);
            assert!(matches!(raw, RawResult::Exported(_)));
            let again = normalize(&raw);
            for column in Column::ALL {
                assert_eq!(
                    again.row.text(column),
                    model.cell_text(row, column.index()).unwrap(),
                    "column {} of row {}",
                    column,
                    row
                );
            }
            assert_eq!(&again.row, model.row(row).unwrap());
        }
    }

    #[test]
    fn test_csv_and_tsv_differ_only_in_delimiter() {
        let model = sample_model();
        let mut csv_out = Vec::new();
        write(&mut csv_out, ExportFormat::Csv, &model, &[0]).unwrap();
        let mut tsv_out = Vec::new();
        write(&mut tsv_out, ExportFormat::Tsv, &model, &[0]).unwrap();

        let csv_text = String::from_utf8(csv_out).unwrap();
        let tsv_text = String::from_utf8(tsv_out).unwrap();
        let header: Vec<&str> = Column::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(csv_text.lines().next().unwrap(), header.join(","));
        assert_eq!(tsv_text.lines().next().unwrap(), header.join("\t"));
        assert_eq!(csv_text.lines().count(), 2);
        assert_eq!(csv_text.replace(',', "\t"), tsv_text);
    }

    #[test]
    fn test_csv_quotes_fields_with_delimiter() {
        let model = sample_model();
        let mut out = Vec::new();
        write(&mut out, ExportFormat::Csv, &model, &[1]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"Serine/threonine-protein kinase, putative\""));

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "sp|P12345|KIN1");
        assert_eq!(&record[3], "blast: 3, interpro: 2");
    }

    #[test]
    fn test_only_requested_rows_are_written() {
        let model = sample_model();
        let objects = json_objects(&model, &[1]);
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0]["PROTID"], json!("sp|P12345|KIN1"));
        assert_eq!(objects[0]["Prot Length"], json!(412));
        assert_eq!(objects[0]["Classification"], json!("Classified"));
    }

    #[test]
    fn test_export_to_path() {
        let model = sample_model();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        export_to_path(&path, ExportFormat::Json, &model, &[0, 1]).unwrap();
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.as_array().map(Vec::len), Some(2));
    }
}
