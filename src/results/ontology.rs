//! Gene Ontology definitions read from an OBO flat file.
//!
//! Only `[Term]` stanzas are read, and only their `id`, `name`, `namespace`
//! and `is_obsolete` tags. The result is a plain id → definition lookup used
//! to label GO terms in the table and the GO browser.

use crate::error::{Result, ViewerError};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// GO namespace of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GoType {
    Molecular,
    Biological,
    Cellular,
}

impl GoType {
    pub const ALL: [GoType; 3] = [GoType::Molecular, GoType::Biological, GoType::Cellular];

    pub fn from_namespace(namespace: &str) -> Option<GoType> {
        match namespace.trim() {
            "molecular_function" => Some(GoType::Molecular),
            "biological_process" => Some(GoType::Biological),
            "cellular_component" => Some(GoType::Cellular),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GoType::Molecular => "Molecular",
            GoType::Biological => "Biological",
            GoType::Cellular => "Cellular",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoDefinition {
    pub name: String,
    pub kind: GoType,
}

/// Lookup from GO id to its definition.
#[derive(Debug, Clone, Default)]
pub struct OntologyDefinitions {
    terms: HashMap<String, GoDefinition>,
}

impl OntologyDefinitions {
    pub fn get(&self, id: &str) -> Option<&GoDefinition> {
        self.terms.get(id.trim())
    }

    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>, kind: GoType) {
        self.terms.insert(
            id.into(),
            GoDefinition {
                name: name.into(),
                kind,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Read definitions from an OBO file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ViewerError::io(path, e))?;
        let definitions = Self::parse_obo(&content)?;
        info!(
            "Loaded {} GO definitions from {}",
            definitions.len(),
            path.display()
        );
        Ok(definitions)
    }

    /// Read definitions from an optional path. A missing path or unreadable
    /// file yields an empty lookup.
    pub fn load_or_empty(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::from_path(path) {
            Ok(defs) => defs,
            Err(e) => {
                warn!("Ontology definitions unavailable: {}", e);
                Self::default()
            }
        }
    }

    /// Parse OBO content.
    pub fn parse_obo(content: &str) -> Result<Self> {
        let mut definitions = Self::default();
        let mut stanza: Option<TermStanza> = None;

        for (line_no, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('!') {
                continue;
            }

            if line.starts_with('[') {
                if let Some(done) = stanza.take() {
                    done.commit(&mut definitions);
                }
                if !line.ends_with(']') {
                    return Err(ViewerError::Ontology {
                        line: line_no + 1,
                        message: format!("unterminated stanza header '{}'", line),
                    });
                }
                if line == "[Term]" {
                    stanza = Some(TermStanza::default());
                }
                continue;
            }

            // Header tags and non-Term stanzas are skipped.
            let Some(current) = stanza.as_mut() else {
                continue;
            };
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = strip_trailing_comment(value.trim());
            match key.trim() {
                "id" => current.id = Some(value.to_string()),
                "name" => current.name = Some(value.to_string()),
                "namespace" => current.kind = GoType::from_namespace(value),
                "is_obsolete" => current.obsolete = value == "true",
                _ => {}
            }
        }

        if let Some(done) = stanza.take() {
            done.commit(&mut definitions);
        }

        Ok(definitions)
    }
}

#[derive(Default)]
struct TermStanza {
    id: Option<String>,
    name: Option<String>,
    kind: Option<GoType>,
    obsolete: bool,
}

impl TermStanza {
    fn commit(self, definitions: &mut OntologyDefinitions) {
        if self.obsolete {
            return;
        }
        if let (Some(id), Some(kind)) = (self.id, self.kind) {
            definitions.insert(id, self.name.unwrap_or_default(), kind);
        }
    }
}

fn strip_trailing_comment(value: &str) -> &str {
    match value.find(" ! ") {
        Some(pos) => value[..pos].trim_end(),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"format-version: 1.2
data-version: releases/2024-01-01
ontology: go

[Term]
id: GO:0003674
name: molecular_function
namespace: molecular_function

[Term]
id: GO:0008150
name: biological_process
namespace: biological_process
is_a: GO:0000000 ! placeholder

[Term]
id: GO:0005575
name: cellular_component
namespace: cellular_component

[Term]
id: GO:0000005
name: obsolete ribosomal chaperone activity
namespace: molecular_function
is_obsolete: true

[Typedef]
id: part_of
name: part of
"#;

    #[test]
    fn test_parse_obo_terms() {
        let defs = OntologyDefinitions::parse_obo(SAMPLE).unwrap();
        assert_eq!(defs.len(), 3);
        let bp = defs.get("GO:0008150").unwrap();
        assert_eq!(bp.name, "biological_process");
        assert_eq!(bp.kind, GoType::Biological);
        assert_eq!(defs.get("GO:0005575").unwrap().kind, GoType::Cellular);
        assert!(defs.get("GO:0000005").is_none());
        assert!(defs.get("part_of").is_none());
    }

    #[test]
    fn test_unterminated_header_is_error() {
        let err = OntologyDefinitions::parse_obo("[Term\nid: GO:1\n").unwrap_err();
        assert!(matches!(err, ViewerError::Ontology { line: 1, .. }));
    }

    #[test]
    fn test_load_from_file_and_missing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let defs = OntologyDefinitions::load_or_empty(Some(file.path()));
        assert_eq!(defs.len(), 3);

        let missing = OntologyDefinitions::load_or_empty(Some(Path::new(
            "/nonexistent/go-basic.obo",
        )));
        assert!(missing.is_empty());
        assert!(OntologyDefinitions::load_or_empty(None).is_empty());
    }
}
