use crate::config::ContentConfig;
use crate::error::{DaybookError, Result};
use crate::store::ContentStore;
use crate::types::type_key;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ContentRef
// ---------------------------------------------------------------------------

/// Pointer from an action to a content item, optionally pinned to a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    #[serde(rename = "type", default)]
    pub content_type: String,
    pub id: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "sourceCollection",
        alias = "collection"
    )]
    pub source_collection: Option<String>,
}

impl ContentRef {
    pub fn new(content_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            id: id.into(),
            source_collection: None,
        }
    }

    pub fn in_collection(mut self, collection: impl Into<String>) -> Self {
        self.source_collection = Some(collection.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Stored documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "pdfUrl")]
    pub pdf_url: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "durationMin",
        alias = "durationMinutes"
    )]
    pub duration_minutes: Option<u32>,
}

/// A content document as stored, in either the unified library or a legacy
/// per-type collection. URL fields are probed in a fixed order by
/// [`ContentDocument::primary_url`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentDocument {
    pub id: String,
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "videoUrl")]
    pub video_url: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "estimatedTime",
        alias = "durationMin"
    )]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ContentDetails>,
}

fn populated(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ContentDocument {
    /// First populated of `details.url`, `details.pdf_url`, `url`, `video_url`.
    pub fn primary_url(&self) -> Option<&str> {
        let details = self.details.as_ref();
        details
            .and_then(|d| populated(&d.url))
            .or_else(|| details.and_then(|d| populated(&d.pdf_url)))
            .or_else(|| populated(&self.url))
            .or_else(|| populated(&self.video_url))
    }

    pub fn duration(&self) -> Option<u32> {
        self.duration_minutes
            .or_else(|| self.details.as_ref().and_then(|d| d.duration_minutes))
    }

    pub fn normalize(&self, collection: &str) -> ContentItem {
        ContentItem {
            id: self.id.clone(),
            content_type: self.content_type.clone(),
            title: self.title.clone(),
            url: self.primary_url().map(str::to_string),
            duration_minutes: self.duration(),
            collection: collection.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// ContentItem (normalized)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub content_type: String,
    pub title: String,
    pub url: Option<String>,
    pub duration_minutes: Option<u32>,
    /// Collection the item was served from.
    pub collection: String,
}

// ---------------------------------------------------------------------------
// ContentResolver
// ---------------------------------------------------------------------------

pub struct ContentResolver<'a> {
    store: &'a dyn ContentStore,
    config: &'a ContentConfig,
}

impl<'a> ContentResolver<'a> {
    pub fn new(store: &'a dyn ContentStore, config: &'a ContentConfig) -> Self {
        Self { store, config }
    }

    /// Collections probed for `r`: its pinned collection, then the unified
    /// library, then the legacy collections implied by its type.
    pub fn probe_order(&self, r: &ContentRef) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        let mut push = |c: &str| {
            if !order.iter().any(|o| o == c) {
                order.push(c.to_string());
            }
        };
        if let Some(pinned) = r.source_collection.as_deref() {
            push(pinned);
        }
        push(self.config.unified_collection.as_str());
        for c in self.config.legacy_for(&r.content_type) {
            push(c.as_str());
        }
        order
    }

    /// Resolve `r` to a normalized item, or `ContentNotFound` when no probed
    /// collection holds the id.
    pub fn resolve(&self, r: &ContentRef) -> Result<ContentItem> {
        for collection in self.probe_order(r) {
            if let Some(doc) = self.store.get_content(&collection, &r.id)? {
                if collection != self.config.unified_collection
                    && r.source_collection.as_deref() != Some(collection.as_str())
                {
                    tracing::debug!(
                        id = %r.id,
                        collection = %collection,
                        "content served from legacy collection"
                    );
                }
                if !doc.content_type.is_empty()
                    && !r.content_type.is_empty()
                    && type_key(&doc.content_type) != type_key(&r.content_type)
                {
                    tracing::debug!(
                        id = %r.id,
                        expected = %r.content_type,
                        found = %doc.content_type,
                        "content type differs from reference"
                    );
                }
                return Ok(doc.normalize(&collection));
            }
        }
        tracing::warn!(id = %r.id, content_type = %r.content_type, "content not found");
        Err(DaybookError::ContentNotFound {
            content_type: r.content_type.clone(),
            id: r.id.clone(),
        })
    }

    /// Every known collection holding `id`, in resolution priority order.
    /// The first element, if any, is what [`Self::resolve`] would return for
    /// a reference of a matching type.
    pub fn locate_all(&self, id: &str) -> Result<Vec<ContentItem>> {
        let mut found = Vec::new();
        for collection in self.config.all_collections() {
            if let Some(doc) = self.store.get_content(&collection, id)? {
                found.push(doc.normalize(&collection));
            }
        }
        Ok(found)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn doc(id: &str, content_type: &str, title: &str) -> ContentDocument {
        ContentDocument {
            id: id.to_string(),
            content_type: content_type.to_string(),
            title: title.to_string(),
            ..ContentDocument::default()
        }
    }

    #[test]
    fn url_priority_order() {
        let mut d = doc("v1", "VIDEO", "Start With Why");
        d.video_url = Some("https://video".into());
        assert_eq!(d.primary_url(), Some("https://video"));

        d.url = Some("https://url".into());
        assert_eq!(d.primary_url(), Some("https://url"));

        d.details = Some(ContentDetails {
            pdf_url: Some("https://pdf".into()),
            ..ContentDetails::default()
        });
        assert_eq!(d.primary_url(), Some("https://pdf"));

        d.details.as_mut().unwrap().url = Some("https://details".into());
        assert_eq!(d.primary_url(), Some("https://details"));
    }

    #[test]
    fn blank_url_fields_are_skipped() {
        let mut d = doc("v1", "VIDEO", "t");
        d.details = Some(ContentDetails {
            url: Some("  ".into()),
            ..ContentDetails::default()
        });
        d.video_url = Some("https://video".into());
        assert_eq!(d.primary_url(), Some("https://video"));
    }

    #[test]
    fn legacy_field_names_deserialize() {
        let yaml = r#"
id: doc-1
type: DOCUMENT
title: Feedback Framework
estimatedTime: 12
details:
  pdfUrl: https://cdn/feedback.pdf
"#;
        let d: ContentDocument = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(d.primary_url(), Some("https://cdn/feedback.pdf"));
        assert_eq!(d.duration(), Some(12));
    }

    #[test]
    fn unified_wins_over_legacy() {
        let mut store = MemoryStore::new();
        store.put_content("content_library", doc("v1", "VIDEO", "Unified title"));
        store.put_content("content_videos", doc("v1", "VIDEO", "Legacy title"));
        let cfg = ContentConfig::default();
        let resolver = ContentResolver::new(&store, &cfg);

        let item = resolver.resolve(&ContentRef::new("video", "v1")).unwrap();
        assert_eq!(item.title, "Unified title");
        assert_eq!(item.collection, "content_library");

        let all = resolver.locate_all("v1").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Unified title");
    }

    #[test]
    fn falls_back_to_legacy_by_type() {
        let mut store = MemoryStore::new();
        store.put_content("content_readings", doc("r1", "READING", "Atomic Habits"));
        let cfg = ContentConfig::default();
        let resolver = ContentResolver::new(&store, &cfg);

        // document probes content_documents, then content_readings
        let item = resolver.resolve(&ContentRef::new("DOCUMENT", "r1")).unwrap();
        assert_eq!(item.collection, "content_readings");
    }

    #[test]
    fn pinned_collection_is_probed_first() {
        let mut store = MemoryStore::new();
        store.put_content("content_library", doc("v1", "VIDEO", "Unified"));
        store.put_content("content_videos", doc("v1", "VIDEO", "Pinned"));
        let cfg = ContentConfig::default();
        let resolver = ContentResolver::new(&store, &cfg);

        let r = ContentRef::new("video", "v1").in_collection("content_videos");
        assert_eq!(resolver.resolve(&r).unwrap().title, "Pinned");
        assert_eq!(
            resolver.probe_order(&r),
            vec!["content_videos", "content_library"]
        );
    }

    #[test]
    fn missing_content_is_reported() {
        let store = MemoryStore::new();
        let cfg = ContentConfig::default();
        let resolver = ContentResolver::new(&store, &cfg);
        let err = resolver
            .resolve(&ContentRef::new("video", "ghost"))
            .unwrap_err();
        assert!(matches!(err, DaybookError::ContentNotFound { ref id, .. } if id == "ghost"));
    }

    #[test]
    fn unknown_type_only_probes_unified() {
        let mut store = MemoryStore::new();
        store.put_content("content_videos", doc("x1", "VIDEO", "Hidden away"));
        let cfg = ContentConfig::default();
        let resolver = ContentResolver::new(&store, &cfg);
        assert!(resolver.resolve(&ContentRef::new("SKILL", "x1")).is_err());
    }
}
