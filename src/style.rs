//! Colors shared by the table overlays, detail tabs and charts.

use crate::results::{Classification, GoType, TagKind};
use eframe::egui::Color32;
use once_cell::sync::Lazy;

pub static STYLES: Lazy<StyleRegistry> = Lazy::new(StyleRegistry::new);

pub struct StyleRegistry {
    pub ok: Color32,
    pub warning: Color32,
    pub error: Color32,
    pub muted: Color32,
    pub bar: Color32,
    blast: Color32,
    interpro: Color32,
    molecular: Color32,
    biological: Color32,
    cellular: Color32,
}

impl StyleRegistry {
    fn new() -> Self {
        Self {
            ok: Color32::from_rgb(100, 200, 100),
            warning: Color32::from_rgb(255, 180, 100),
            error: Color32::from_rgb(220, 80, 80),
            muted: Color32::GRAY,
            bar: Color32::from_rgb(100, 150, 255),
            blast: Color32::from_rgb(100, 150, 255),
            interpro: Color32::from_rgb(180, 130, 230),
            molecular: Color32::from_rgb(255, 200, 60),
            biological: Color32::from_rgb(100, 200, 100),
            cellular: Color32::from_rgb(100, 190, 220),
        }
    }

    pub fn tag(&self, kind: TagKind) -> Color32 {
        match kind {
            TagKind::Blast => self.blast,
            TagKind::Interpro => self.interpro,
            TagKind::Default => self.muted,
        }
    }

    pub fn go_type(&self, kind: Option<GoType>) -> Color32 {
        match kind {
            Some(GoType::Molecular) => self.molecular,
            Some(GoType::Biological) => self.biological,
            Some(GoType::Cellular) => self.cellular,
            None => self.muted,
        }
    }

    pub fn classification(&self, classification: Classification) -> Color32 {
        match classification {
            Classification::Classified => self.ok,
            Classification::Unclassified => self.warning,
        }
    }
}
