//! The project aggregate: template, fields, and submission values/records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::render::assets::PreparedImage;

/// A card template: a background image plus an ordered set of fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Opaque identity.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Public URL of the background template image.
    pub template_image_url: String,
    /// Lifecycle status; only `"active"` projects accept submissions.
    pub status: String,
}

impl Project {
    /// Whether the project currently accepts submissions.
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// Values captured from one participant: text per field name, plus at most
/// one uploaded photo. Never mutated once the final bitmap is produced.
#[derive(Clone, Debug, Default)]
pub struct SubmissionValues {
    /// Submitted text keyed by field name.
    pub texts: BTreeMap<String, String>,
    /// Decoded participant photo, if one was uploaded.
    pub photo: Option<PreparedImage>,
}

impl SubmissionValues {
    /// Text value for a field name, trimmed; `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Participant display name: the "Name" value, else the first text value,
    /// else "Unknown".
    pub fn participant_name(&self) -> String {
        self.text("Name")
            .or_else(|| self.texts.values().map(|s| s.trim()).find(|s| !s.is_empty()))
            .unwrap_or("Unknown")
            .to_string()
    }
}

/// Flat record persisted after a card has been generated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// Owning project.
    pub project_id: String,
    /// Participant display name (see [`SubmissionValues::participant_name`]).
    pub participant_name: String,
    /// Public URL of the uploaded participant photo, if any.
    pub photo_url: Option<String>,
    /// Public URL of the generated card bitmap.
    pub generated_card_url: String,
    /// All submitted text values, keyed by field name.
    pub field_values: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_name_prefers_name_field() {
        let mut v = SubmissionValues::default();
        v.texts.insert("Department".into(), "Ops".into());
        v.texts.insert("Name".into(), "  Ada  ".into());
        assert_eq!(v.participant_name(), "Ada");
    }

    #[test]
    fn participant_name_falls_back_in_order() {
        let mut v = SubmissionValues::default();
        assert_eq!(v.participant_name(), "Unknown");
        v.texts.insert("Role".into(), "Captain".into());
        assert_eq!(v.participant_name(), "Captain");
    }

    #[test]
    fn blank_texts_read_as_absent() {
        let mut v = SubmissionValues::default();
        v.texts.insert("Name".into(), "   ".into());
        assert_eq!(v.text("Name"), None);
    }
}
