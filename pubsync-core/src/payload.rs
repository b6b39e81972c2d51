//! Request body for the remote article API.

use serde::Serialize;

use crate::contract::ArticleMetadata;
use crate::tags;

/// Top-level request document: `{"article": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticlePayload {
    pub article: ArticleFields,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleFields {
    pub title: String,
    pub body_markdown: String,
    pub tags: Vec<String>,
    /// Serialized as `null` when absent.
    pub description: Option<String>,
    /// Serialized as `null` when absent; the remote treats `""` differently from `null`.
    pub canonical_url: Option<String>,
    pub published: bool,
}

/// Maps extracted metadata to the API request. `published` is the already-resolved flag
/// (file draft flag combined with any run-level override).
pub fn build(metadata: &ArticleMetadata, published: bool) -> ArticlePayload {
    ArticlePayload {
        article: ArticleFields {
            title: metadata.title.trim().to_string(),
            body_markdown: metadata.body.clone(),
            tags: tags::normalize(&metadata.tags),
            description: non_blank(metadata.description.as_deref()),
            canonical_url: non_blank(metadata.canonical_url.as_deref()),
            published,
        },
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::RawTags;

    fn metadata(canonical_url: Option<&str>) -> ArticleMetadata {
        ArticleMetadata {
            title: " Hello ".into(),
            description: Some("".into()),
            tags: RawTags::Text("Rust, CLI".into()),
            canonical_url: canonical_url.map(str::to_string),
            draft: false,
            body: "# Hello\n".into(),
        }
    }

    #[test]
    fn empty_canonical_url_serializes_as_null() {
        let payload = build(&metadata(Some("")), true);
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["article"]["canonical_url"].is_null());
        assert!(json["article"]["description"].is_null());
        assert!(!serde_json::to_string(&payload).unwrap().contains("\"canonical_url\":\"\""));
    }

    #[test]
    fn maps_all_fields() {
        let payload = build(&metadata(Some("https://example.com/hello")), false);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["article"]["title"], "Hello");
        assert_eq!(json["article"]["body_markdown"], "# Hello\n");
        assert_eq!(json["article"]["tags"], serde_json::json!(["rust", "cli"]));
        assert_eq!(json["article"]["canonical_url"], "https://example.com/hello");
        assert_eq!(json["article"]["published"], false);
    }
}
