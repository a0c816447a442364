//! Persistence boundary: the wire shape of field records plus the record
//! store and object storage traits the engine consumes.
//!
//! Records coming back from storage are externally-owned, possibly-malformed
//! data: every optional column defaults, geometry may still be in the legacy
//! pixel format, and nothing is trusted until it has passed through
//! migration and normalization.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{PlacardError, PlacardResult};
use crate::model::field::{
    Field, FieldKind, FieldShape, FieldStyle, PctRect, Shadow, TextAlign, TextStyle,
};
use crate::model::migrate::migrate_field;
use crate::model::project::{Project, SubmissionRecord};

fn default_font_size() -> f64 {
    16.0
}
fn default_font_color() -> String {
    "#000000".to_string()
}
fn default_font_family() -> String {
    "Inter".to_string()
}
fn default_font_weight() -> u16 {
    400
}
fn default_border_size() -> f64 {
    2.0
}
fn default_border_color() -> String {
    "#000000".to_string()
}
fn default_background_color() -> String {
    "#ffffff".to_string()
}
fn default_opacity() -> f64 {
    1.0
}
fn default_line_height() -> f64 {
    1.2
}
fn default_shadow_color() -> String {
    "#000000".to_string()
}

/// Flat persisted form of one field, using the storage column names.
///
/// `x_position`/`y_position`/`width`/`height` are percentages in persisted
/// form; any value above 100 on read is a legacy pixel record and goes
/// through migration before use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    /// Stable record id.
    pub id: String,
    /// `"photo"` or `"text"`.
    pub field_type: FieldKind,
    /// Field label / submission key.
    pub field_name: String,
    /// Left edge, percent (legacy: pixels).
    #[serde(default)]
    pub x_position: f64,
    /// Top edge, percent (legacy: pixels).
    #[serde(default)]
    pub y_position: f64,
    /// Width, percent (legacy: pixels).
    #[serde(default)]
    pub width: f64,
    /// Height, percent (legacy: pixels).
    #[serde(default)]
    pub height: f64,
    /// Font size in points.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    /// Text hex color.
    #[serde(default = "default_font_color")]
    pub font_color: String,
    /// Font family name.
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// CSS-style weight.
    #[serde(default = "default_font_weight")]
    pub font_weight: u16,
    /// Italic face.
    #[serde(default)]
    pub font_italic: bool,
    /// Horizontal anchor.
    #[serde(default = "default_text_align")]
    pub text_align: TextAlign,
    /// Extra advance per glyph in pixels.
    #[serde(default)]
    pub letter_spacing: f64,
    /// Line box multiplier.
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    /// Whether a border is stroked.
    #[serde(default)]
    pub border_enabled: bool,
    /// Border stroke width in pixels.
    #[serde(default = "default_border_size")]
    pub border_size: f64,
    /// Border hex color.
    #[serde(default = "default_border_color")]
    pub border_color: String,
    /// Background hex color.
    #[serde(default = "default_background_color")]
    pub background_color: String,
    /// Background alpha in [0,1].
    #[serde(default)]
    pub background_opacity: f64,
    /// Whole-field alpha in [0,1].
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Rotation about the rect center, degrees.
    #[serde(default)]
    pub rotation_deg: f64,
    /// Whether a drop shadow is drawn.
    #[serde(default)]
    pub shadow_enabled: bool,
    /// Shadow blur radius in pixels.
    #[serde(default)]
    pub shadow_blur: f64,
    /// Shadow hex color.
    #[serde(default = "default_shadow_color")]
    pub shadow_color: String,
    /// Clip shape.
    #[serde(default = "default_shape")]
    pub shape: FieldShape,
    /// Paint-order key.
    #[serde(default)]
    pub z_index: i32,
}

fn default_text_align() -> TextAlign {
    TextAlign::Left
}

fn default_shape() -> FieldShape {
    FieldShape::Rectangle
}

impl FieldRecord {
    /// Flatten a model field into its persisted form.
    pub fn from_field(field: &Field) -> Self {
        Self {
            id: field.id.clone(),
            field_type: field.kind,
            field_name: field.name.clone(),
            x_position: field.rect.x,
            y_position: field.rect.y,
            width: field.rect.width,
            height: field.rect.height,
            font_size: field.text.font_size_pt,
            font_color: field.text.color.clone(),
            font_family: field.text.font_family.clone(),
            font_weight: field.text.font_weight,
            font_italic: field.text.italic,
            text_align: field.text.align,
            letter_spacing: field.text.letter_spacing,
            line_height: field.text.line_height,
            border_enabled: field.style.border_enabled,
            border_size: field.style.border_width,
            border_color: field.style.border_color.clone(),
            background_color: field.style.background_color.clone(),
            background_opacity: field.style.background_opacity,
            opacity: field.style.opacity,
            rotation_deg: field.style.rotation_deg,
            shadow_enabled: field.style.shadow.enabled,
            shadow_blur: field.style.shadow.blur,
            shadow_color: field.style.shadow.color.clone(),
            shape: field.shape,
            z_index: field.z_index,
        }
    }

    /// Rehydrate the model field. The result has NOT been migrated or
    /// normalized; use [`load_fields`] for untrusted data.
    pub fn into_field(self) -> Field {
        Field {
            id: self.id,
            kind: self.field_type,
            name: self.field_name,
            rect: PctRect::new(self.x_position, self.y_position, self.width, self.height),
            shape: self.shape,
            text: TextStyle {
                font_family: self.font_family,
                font_weight: self.font_weight,
                font_size_pt: self.font_size,
                italic: self.font_italic,
                align: self.text_align,
                color: self.font_color,
                letter_spacing: self.letter_spacing,
                line_height: self.line_height,
            },
            style: FieldStyle {
                border_enabled: self.border_enabled,
                border_width: self.border_size,
                border_color: self.border_color,
                background_color: self.background_color,
                background_opacity: self.background_opacity,
                opacity: self.opacity,
                rotation_deg: self.rotation_deg,
                shadow: Shadow {
                    enabled: self.shadow_enabled,
                    blur: self.shadow_blur,
                    color: self.shadow_color,
                },
            },
            z_index: self.z_index,
        }
    }
}

/// External record persistence, keyed by project.
///
/// `replace_all_fields` has full delete-then-insert semantics; partial field
/// updates are not supported by the backend.
pub trait RecordStore {
    /// All field records for a project, in stored order.
    fn list_fields(&self, project_id: &str) -> PlacardResult<Vec<FieldRecord>>;
    /// Replace the project's whole field list.
    fn replace_all_fields(
        &mut self,
        project_id: &str,
        fields: &[FieldRecord],
    ) -> PlacardResult<()>;
    /// Fetch a project by id.
    fn get_project(&self, id: &str) -> PlacardResult<Project>;
    /// Insert or update a project.
    fn put_project(&mut self, project: &Project) -> PlacardResult<()>;
    /// Record a completed submission.
    fn insert_submission(&mut self, submission: &SubmissionRecord) -> PlacardResult<()>;
}

/// Load a project's fields, transparently migrating legacy pixel records and
/// normalizing everything. Nothing is written back until an explicit save.
pub fn load_fields(store: &dyn RecordStore, project_id: &str) -> PlacardResult<Vec<Field>> {
    let records = store.list_fields(project_id)?;
    Ok(records
        .into_iter()
        .map(|r| migrate_field(r.into_field()))
        .collect())
}

/// Persist a field list with delete-then-insert semantics.
pub fn save_fields(
    store: &mut dyn RecordStore,
    project_id: &str,
    fields: &[Field],
) -> PlacardResult<()> {
    let records: Vec<FieldRecord> = fields.iter().map(FieldRecord::from_field).collect();
    store.replace_all_fields(project_id, &records)
}

/// In-memory record store for tests and the CLI.
#[derive(Debug, Default)]
pub struct MemoryStore {
    fields: HashMap<String, Vec<FieldRecord>>,
    projects: HashMap<String, Project>,
    submissions: Vec<SubmissionRecord>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded submissions, in insertion order.
    pub fn submissions(&self) -> &[SubmissionRecord] {
        &self.submissions
    }
}

impl RecordStore for MemoryStore {
    fn list_fields(&self, project_id: &str) -> PlacardResult<Vec<FieldRecord>> {
        Ok(self.fields.get(project_id).cloned().unwrap_or_default())
    }

    fn replace_all_fields(
        &mut self,
        project_id: &str,
        fields: &[FieldRecord],
    ) -> PlacardResult<()> {
        self.fields.insert(project_id.to_string(), fields.to_vec());
        Ok(())
    }

    fn get_project(&self, id: &str) -> PlacardResult<Project> {
        self.projects
            .get(id)
            .cloned()
            .ok_or_else(|| PlacardError::storage(format!("project '{id}' not found")))
    }

    fn put_project(&mut self, project: &Project) -> PlacardResult<()> {
        self.projects.insert(project.id.clone(), project.clone());
        Ok(())
    }

    fn insert_submission(&mut self, submission: &SubmissionRecord) -> PlacardResult<()> {
        self.submissions.push(submission.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::normalize;

    #[test]
    fn record_round_trip_preserves_normalized_fields() {
        let mut f = Field::text("t0");
        f.text.letter_spacing = 1.5;
        f.style.shadow.enabled = true;
        f.style.shadow.blur = 6.0;
        f.z_index = 3;
        let f = normalize(f);

        let back = FieldRecord::from_field(&f).into_field();
        assert_eq!(back, f);
    }

    #[test]
    fn minimal_json_fills_documented_defaults() {
        let json = r#"{
            "id": "abc",
            "field_type": "text",
            "field_name": "Name",
            "x_position": 10, "y_position": 10, "width": 20, "height": 5
        }"#;
        let rec: FieldRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.font_size, 16.0);
        assert_eq!(rec.font_family, "Inter");
        assert_eq!(rec.font_weight, 400);
        assert_eq!(rec.opacity, 1.0);
        assert_eq!(rec.shape, FieldShape::Rectangle);
        assert_eq!(rec.z_index, 0);
        assert!(!rec.shadow_enabled);
    }

    #[test]
    fn load_fields_migrates_only_legacy_records() {
        let mut store = MemoryStore::new();
        let legacy = FieldRecord {
            x_position: 400.0,
            y_position: 300.0,
            width: 160.0,
            height: 120.0,
            ..FieldRecord::from_field(&Field::photo("legacy"))
        };
        let modern = FieldRecord::from_field(&normalize(Field::photo("modern")));
        store
            .replace_all_fields("p1", &[legacy, modern])
            .unwrap();

        let fields = load_fields(&store, "p1").unwrap();
        assert_eq!(fields[0].rect, PctRect::new(50.0, 50.0, 20.0, 20.0));
        assert_eq!(fields[1].rect, PctRect::new(10.0, 10.0, 15.0, 20.0));
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut store = MemoryStore::new();
        let fields = vec![
            normalize(Field::photo("a")),
            normalize(Field::text("b")),
        ];
        save_fields(&mut store, "p1", &fields).unwrap();
        let loaded = load_fields(&store, "p1").unwrap();
        assert_eq!(loaded, fields);
    }

    #[test]
    fn missing_project_is_a_storage_error() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_project("nope"),
            Err(PlacardError::Storage(_))
        ));
    }
}
