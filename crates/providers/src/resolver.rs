//! Multimodal content resolver.
//!
//! Stored message text embeds attachments through inline tags. Two tag
//! families need a lookup against the attachment store:
//!
//! - `<image:GUID>`
//! - `<file:GUID:name>`
//!
//! and two carry their payload inline and resolve without any lookup:
//!
//! - `<image-base64:mime;base64,DATA>`
//! - `<file-base64:name:mime;base64,DATA>`
//!
//! The resolver slices the original text into [`ContentPart`]s interleaved
//! with the resolved attachments, preserving source order and merging
//! adjacent text. Attachments that cannot be resolved degrade to
//! descriptive placeholder text; they never abort the request.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sw_domain::content::{push_merged, ContentPart};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Attachment store collaborator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Processing status of a stored attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentStatus {
    Pending,
    Processing,
    Ready,
    Failed,
    #[serde(other)]
    Unknown,
}

/// An attachment record as seen by the resolver.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: Uuid,
    pub file_name: String,
    pub mime_type: String,
    pub status: AttachmentStatus,
    /// Set once processing succeeded; keys the cached base64 payload.
    pub cache_key: Option<String>,
}

/// Read-only view over attachment metadata and the payload cache.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Option<Attachment>;
    async fn cached_base64(&self, cache_key: &str) -> Option<String>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Resolver
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const GUID: &str = "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}";

/// Resolves inline attachment tags into typed content parts.
pub struct ContentResolver {
    image_tag: Regex,
    file_tag: Regex,
    image_b64_tag: Regex,
    file_b64_tag: Regex,
}

/// One tag match with its source span, before resolution.
enum TagMatch {
    Image { id: Uuid },
    File { id: Uuid, name: String },
    ImageB64 { mime: String, data: String },
    FileB64 { name: String, mime: String, data: String },
    /// Malformed embedded tag kept verbatim as text.
    Verbatim(String),
}

impl ContentResolver {
    pub fn new() -> Self {
        // The patterns are fixed string literals; compilation cannot fail.
        Self {
            image_tag: Regex::new(&format!("<image:({GUID})>")).expect("static regex"),
            file_tag: Regex::new(&format!("<file:({GUID}):([^>]+)>")).expect("static regex"),
            image_b64_tag: Regex::new("<image-base64:([^;>]+);base64,([^>]+)>")
                .expect("static regex"),
            file_b64_tag: Regex::new("<file-base64:([^:>]+):([^;>]+);base64,([^>]+)>")
                .expect("static regex"),
        }
    }

    /// Split `text` into content parts, resolving attachment tags through
    /// `store`. Pure transform: the only side effect is cache/store reads.
    pub async fn resolve(&self, text: &str, store: &dyn AttachmentStore) -> Vec<ContentPart> {
        let mut matches: Vec<(usize, usize, TagMatch)> = Vec::new();

        for cap in self.image_tag.captures_iter(text) {
            let m = cap.get(0).expect("whole match");
            if let Ok(id) = cap[1].parse::<Uuid>() {
                matches.push((m.start(), m.end(), TagMatch::Image { id }));
            }
        }
        for cap in self.file_tag.captures_iter(text) {
            let m = cap.get(0).expect("whole match");
            if let Ok(id) = cap[1].parse::<Uuid>() {
                matches.push((
                    m.start(),
                    m.end(),
                    TagMatch::File {
                        id,
                        name: cap[2].to_string(),
                    },
                ));
            }
        }
        for cap in self.image_b64_tag.captures_iter(text) {
            let m = cap.get(0).expect("whole match");
            let mime = cap[1].to_string();
            let tag = if mime.contains('/') {
                TagMatch::ImageB64 {
                    mime,
                    data: cap[2].to_string(),
                }
            } else {
                TagMatch::Verbatim(m.as_str().to_string())
            };
            matches.push((m.start(), m.end(), tag));
        }
        for cap in self.file_b64_tag.captures_iter(text) {
            let m = cap.get(0).expect("whole match");
            let mime = cap[2].to_string();
            let tag = if mime.contains('/') {
                TagMatch::FileB64 {
                    name: cap[1].to_string(),
                    mime,
                    data: cap[3].to_string(),
                }
            } else {
                TagMatch::Verbatim(m.as_str().to_string())
            };
            matches.push((m.start(), m.end(), tag));
        }

        if matches.is_empty() {
            if text.is_empty() {
                return Vec::new();
            }
            return vec![ContentPart::text(text)];
        }

        matches.sort_by_key(|(start, _, _)| *start);

        let mut parts: Vec<ContentPart> = Vec::new();
        let mut cursor = 0usize;
        for (start, end, tag) in matches {
            // Overlapping matches can only come from a tag family whose
            // pattern is a prefix of another; keep the first one.
            if start < cursor {
                continue;
            }
            if start > cursor {
                push_merged(&mut parts, ContentPart::text(&text[cursor..start]));
            }
            let part = match tag {
                TagMatch::Image { id } => self.resolve_stored(store, id, None, true).await,
                TagMatch::File { id, name } => {
                    self.resolve_stored(store, id, Some(name), false).await
                }
                TagMatch::ImageB64 { mime, data } => ContentPart::Image {
                    mime_type: mime,
                    data,
                    file_name: None,
                },
                TagMatch::FileB64 { name, mime, data } => ContentPart::File {
                    mime_type: mime,
                    data,
                    file_name: name,
                },
                TagMatch::Verbatim(raw) => ContentPart::text(raw),
            };
            push_merged(&mut parts, part);
            cursor = end;
        }
        if cursor < text.len() {
            push_merged(&mut parts, ContentPart::text(&text[cursor..]));
        }

        parts
    }

    /// Resolve a placeholder tag via the attachment store, degrading to
    /// descriptive text on every failure path.
    async fn resolve_stored(
        &self,
        store: &dyn AttachmentStore,
        id: Uuid,
        tag_name: Option<String>,
        is_image: bool,
    ) -> ContentPart {
        let kind = if is_image { "Image" } else { "File" };

        let Some(attachment) = store.get(id).await else {
            tracing::debug!(%id, "attachment referenced by tag not found");
            return ContentPart::text(format!(
                "[{kind} attachment {id} not found or not ready]"
            ));
        };

        let name = tag_name.unwrap_or_else(|| attachment.file_name.clone());
        match attachment.status {
            AttachmentStatus::Pending | AttachmentStatus::Processing => {
                ContentPart::text(format!("[{kind} '{name}' is still processing]"))
            }
            AttachmentStatus::Failed => {
                ContentPart::text(format!("[{kind} '{name}' could not be processed]"))
            }
            AttachmentStatus::Unknown => {
                tracing::warn!(%id, "attachment has unknown processing status");
                ContentPart::text(format!("[{kind} '{name}' has an unknown status]"))
            }
            AttachmentStatus::Ready => {
                let Some(cache_key) = attachment.cache_key.as_deref() else {
                    return ContentPart::text(format!(
                        "[{kind} '{name}' is unavailable, it may have expired]"
                    ));
                };
                match store.cached_base64(cache_key).await {
                    Some(data) if is_image => ContentPart::Image {
                        mime_type: attachment.mime_type,
                        data,
                        file_name: Some(name),
                    },
                    Some(data) => ContentPart::File {
                        mime_type: attachment.mime_type,
                        data,
                        file_name: name,
                    },
                    None => {
                        tracing::debug!(%id, cache_key, "attachment payload missing from cache");
                        ContentPart::text(format!(
                            "[{kind} '{name}' is unavailable, it may have expired]"
                        ))
                    }
                }
            }
        }
    }
}

impl Default for ContentResolver {
    fn default() -> Self {
        Self::new()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeStore {
        attachments: HashMap<Uuid, Attachment>,
        cache: HashMap<String, String>,
    }

    impl FakeStore {
        fn empty() -> Self {
            Self {
                attachments: HashMap::new(),
                cache: HashMap::new(),
            }
        }

        fn with(attachment: Attachment, cached: Option<(&str, &str)>) -> Self {
            let mut store = Self::empty();
            store.attachments.insert(attachment.id, attachment);
            if let Some((k, v)) = cached {
                store.cache.insert(k.into(), v.into());
            }
            store
        }
    }

    #[async_trait]
    impl AttachmentStore for FakeStore {
        async fn get(&self, id: Uuid) -> Option<Attachment> {
            self.attachments.get(&id).cloned()
        }
        async fn cached_base64(&self, cache_key: &str) -> Option<String> {
            self.cache.get(cache_key).cloned()
        }
    }

    fn ready_attachment(id: Uuid) -> Attachment {
        Attachment {
            id,
            file_name: "photo.png".into(),
            mime_type: "image/png".into(),
            status: AttachmentStatus::Ready,
            cache_key: Some("ck-1".into()),
        }
    }

    #[tokio::test]
    async fn plain_text_yields_single_part() {
        let r = ContentResolver::new();
        let parts = r.resolve("just words", &FakeStore::empty()).await;
        assert_eq!(parts, vec![ContentPart::text("just words")]);
    }

    #[tokio::test]
    async fn empty_text_yields_nothing() {
        let r = ContentResolver::new();
        let parts = r.resolve("", &FakeStore::empty()).await;
        assert!(parts.is_empty());
    }

    #[tokio::test]
    async fn missing_attachment_becomes_placeholder_between_text() {
        let r = ContentResolver::new();
        let parts = r
            .resolve(
                "before <image:00000000-0000-0000-0000-000000000001> after",
                &FakeStore::empty(),
            )
            .await;
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], ContentPart::text("before "));
        let ContentPart::Text { text } = &parts[1] else {
            panic!("expected text placeholder");
        };
        assert!(text.contains("not found or not ready"));
        assert_eq!(parts[2], ContentPart::text(" after"));
    }

    #[tokio::test]
    async fn ready_image_resolves_from_cache() {
        let id = Uuid::new_v4();
        let store = FakeStore::with(ready_attachment(id), Some(("ck-1", "BASE64DATA")));
        let r = ContentResolver::new();
        let parts = r.resolve(&format!("look: <image:{id}>"), &store).await;
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[1],
            ContentPart::Image {
                mime_type: "image/png".into(),
                data: "BASE64DATA".into(),
                file_name: Some("photo.png".into()),
            }
        );
    }

    #[tokio::test]
    async fn cache_miss_degrades_to_expired_text() {
        let id = Uuid::new_v4();
        let store = FakeStore::with(ready_attachment(id), None);
        let r = ContentResolver::new();
        let parts = r.resolve(&format!("<image:{id}>"), &store).await;
        let ContentPart::Text { text } = &parts[0] else {
            panic!("expected text");
        };
        assert!(text.contains("may have expired"));
    }

    #[tokio::test]
    async fn processing_attachment_degrades_to_status_text() {
        let id = Uuid::new_v4();
        let mut att = ready_attachment(id);
        att.status = AttachmentStatus::Processing;
        let store = FakeStore::with(att, None);
        let r = ContentResolver::new();
        let parts = r
            .resolve(&format!("<file:{id}:report.pdf>"), &store)
            .await;
        let ContentPart::Text { text } = &parts[0] else {
            panic!("expected text");
        };
        assert!(text.contains("still processing"));
        assert!(text.contains("report.pdf"));
    }

    #[tokio::test]
    async fn failed_attachment_degrades_to_failure_text() {
        let id = Uuid::new_v4();
        let mut att = ready_attachment(id);
        att.status = AttachmentStatus::Failed;
        let store = FakeStore::with(att, None);
        let r = ContentResolver::new();
        let parts = r.resolve(&format!("<image:{id}>"), &store).await;
        assert!(parts[0]
            .as_text()
            .is_some_and(|t| t.contains("could not be processed")));
    }

    #[tokio::test]
    async fn embedded_base64_needs_no_lookup() {
        let r = ContentResolver::new();
        let parts = r
            .resolve(
                "a <image-base64:image/jpeg;base64,QUJD> b",
                &FakeStore::empty(),
            )
            .await;
        assert_eq!(
            parts[1],
            ContentPart::Image {
                mime_type: "image/jpeg".into(),
                data: "QUJD".into(),
                file_name: None,
            }
        );
    }

    #[tokio::test]
    async fn embedded_file_base64_carries_name() {
        let r = ContentResolver::new();
        let parts = r
            .resolve(
                "<file-base64:notes.txt:text/plain;base64,QUJD>",
                &FakeStore::empty(),
            )
            .await;
        assert_eq!(
            parts[0],
            ContentPart::File {
                mime_type: "text/plain".into(),
                data: "QUJD".into(),
                file_name: "notes.txt".into(),
            }
        );
    }

    #[tokio::test]
    async fn malformed_mime_segment_is_preserved_verbatim() {
        let r = ContentResolver::new();
        let raw = "<image-base64:notamime;base64,QUJD>";
        let parts = r.resolve(raw, &FakeStore::empty()).await;
        assert_eq!(parts, vec![ContentPart::text(raw)]);
    }

    #[tokio::test]
    async fn mixed_tags_keep_source_order_and_merge_text() {
        let id = Uuid::new_v4();
        let store = FakeStore::with(ready_attachment(id), Some(("ck-1", "IMG")));
        let r = ContentResolver::new();
        let text = format!("x <image:{id}> y <image-base64:image/png;base64,Wlo> z");
        let parts = r.resolve(&text, &store).await;
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], ContentPart::text("x "));
        assert!(matches!(parts[1], ContentPart::Image { .. }));
        assert_eq!(parts[2], ContentPart::text(" y "));
        assert!(matches!(parts[3], ContentPart::Image { .. }));
        assert_eq!(parts[4], ContentPart::text(" z"));
    }
}
