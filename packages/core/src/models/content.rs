//! Content Payloads
//!
//! A `ContentPayload` holds the human-readable material of exactly one node,
//! referenced through `MapNode::content_ref`. Keeping content separate from
//! tree bookkeeping lets deep copy stamp fresh payloads without touching
//! coordinates or parent links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content owned exclusively by one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPayload {
    pub id: String,
    pub title: String,
    pub body: String,
    /// Short projection of the body used for context assembly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Field values for creating a payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFields {
    pub title: String,
    pub body: String,
    pub preview: Option<String>,
    pub link: Option<String>,
}

impl ContentPayload {
    pub fn new(fields: ContentFields) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: fields.title,
            body: fields.body,
            preview: fields.preview,
            link: fields.link,
            created_at: now,
            modified_at: now,
        }
    }

    /// Copy this payload under a fresh id and fresh timestamps
    pub fn duplicate(&self) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: self.title.clone(),
            body: self.body.clone(),
            preview: self.preview.clone(),
            link: self.link.clone(),
            created_at: now,
            modified_at: now,
        }
    }
}

/// Partial payload update
///
/// Builder-style patch: only the fields that were set are applied.
///
/// # Examples
///
/// ```rust
/// use hexmap_core::models::ContentPatch;
///
/// let patch = ContentPatch::new()
///     .with_title("Renamed".to_string())
///     .with_body("New body".to_string());
/// assert!(patch.title.is_some());
/// assert!(patch.link.is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub preview: Option<Option<String>>,
    pub link: Option<Option<String>>,
}

impl ContentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_preview(mut self, preview: Option<String>) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.link = Some(link);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.preview.is_none() && self.link.is_none()
    }

    /// Apply the set fields to a payload, bumping `modified_at`
    pub fn apply(self, payload: &mut ContentPayload) {
        if let Some(title) = self.title {
            payload.title = title;
        }
        if let Some(body) = self.body {
            payload.body = body;
        }
        if let Some(preview) = self.preview {
            payload.preview = preview;
        }
        if let Some(link) = self.link {
            payload.link = link;
        }
        payload.modified_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> ContentPayload {
        ContentPayload::new(ContentFields {
            title: "Title".to_string(),
            body: "Body".to_string(),
            preview: Some("Preview".to_string()),
            link: None,
        })
    }

    #[test]
    fn test_patch_applies_only_set_fields() {
        let mut payload = sample_payload();
        let original_created = payload.created_at;

        ContentPatch::new()
            .with_body("Updated body".to_string())
            .apply(&mut payload);

        assert_eq!(payload.title, "Title");
        assert_eq!(payload.body, "Updated body");
        assert_eq!(payload.preview.as_deref(), Some("Preview"));
        assert_eq!(payload.created_at, original_created);
        assert!(payload.modified_at >= original_created);
    }

    #[test]
    fn test_patch_can_clear_optional_fields() {
        let mut payload = sample_payload();
        ContentPatch::new().with_preview(None).apply(&mut payload);
        assert_eq!(payload.preview, None);
    }

    #[test]
    fn test_duplicate_stamps_fresh_identity() {
        let payload = sample_payload();
        let copy = payload.duplicate();
        assert_ne!(copy.id, payload.id);
        assert_eq!(copy.title, payload.title);
        assert_eq!(copy.body, payload.body);
        assert_eq!(copy.preview, payload.preview);
    }

    #[test]
    fn test_empty_patch() {
        assert!(ContentPatch::new().is_empty());
        assert!(!ContentPatch::new().with_title("t".to_string()).is_empty());
    }
}
