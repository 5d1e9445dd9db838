use serde::{Deserialize, Serialize};

/// One resolved piece of multimodal message content.
///
/// Produced by the content resolver in the original text order; image and
/// file payloads carry base64 data ready for provider serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    Image {
        mime_type: String,
        data: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
    },
    File {
        mime_type: String,
        data: String,
        file_name: String,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Append a part, merging adjacent text parts into one.
pub fn push_merged(parts: &mut Vec<ContentPart>, part: ContentPart) {
    if let (Some(ContentPart::Text { text: prev }), ContentPart::Text { text }) =
        (parts.last_mut(), &part)
    {
        prev.push_str(text);
        return;
    }
    parts.push(part);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_text_parts_merge() {
        let mut parts = Vec::new();
        push_merged(&mut parts, ContentPart::text("hello "));
        push_merged(&mut parts, ContentPart::text("world"));
        assert_eq!(parts, vec![ContentPart::text("hello world")]);
    }

    #[test]
    fn image_breaks_the_merge() {
        let mut parts = Vec::new();
        push_merged(&mut parts, ContentPart::text("a"));
        push_merged(
            &mut parts,
            ContentPart::Image {
                mime_type: "image/png".into(),
                data: "AAAA".into(),
                file_name: None,
            },
        );
        push_merged(&mut parts, ContentPart::text("b"));
        assert_eq!(parts.len(), 3);
    }
}
