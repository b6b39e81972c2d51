//! Metadata extraction for the two supported content dialects.
//!
//! - Org: `#+KEYWORD: value` lines; body produced by the [`Converter`].
//! - Markdown: a YAML block between two `---` lines; body is everything after the block.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde_yaml::Value;
use tracing::{debug, error, info};

use crate::contract::{ArticleMetadata, ContentFile, Converter, Dialect, RawTags};
use crate::error::{io_err, PublishError};

const FRONT_MATTER_MARKER: &str = "---";

/// Org keywords consulted for tags, highest priority first.
const ORG_TAG_KEYWORDS: &[&str] = &["KEYWORDS", "FILETAGS", "TAGS"];

/// Reads `rel_path` (resolved against `root`) into a [`ContentFile`].
///
/// The dialect is checked before touching the disk so an unsupported file fails with
/// [`PublishError::UnsupportedFormat`] even if it does not exist.
pub fn load(root: &Path, rel_path: &str) -> Result<ContentFile, PublishError> {
    let dialect = Dialect::from_path(Path::new(rel_path))
        .ok_or_else(|| PublishError::UnsupportedFormat(PathBuf::from(rel_path)))?;
    let full_path = root.join(rel_path);
    let raw = std::fs::read(&full_path).map_err(|e| {
        error!(error = ?e, path = %full_path.display(), "Failed to read content file");
        io_err(&full_path, e)
    })?;
    debug!(path = rel_path, ?dialect, size = raw.len(), "Read content file");
    Ok(ContentFile {
        path: rel_path.to_string(),
        dialect,
        raw,
    })
}

/// Extracts title, description, tags, canonical URL, draft flag and body.
///
/// Fails with [`PublishError::MissingTitle`] when no non-blank title is found.
pub fn extract(
    file: &ContentFile,
    converter: &dyn Converter,
) -> Result<ArticleMetadata, PublishError> {
    let text = String::from_utf8_lossy(&file.raw);
    let path = Path::new(&file.path);
    let metadata = match file.dialect {
        Dialect::Org => extract_org(path, &text, converter)?,
        Dialect::Markdown => extract_markdown(path, &text)?,
    };
    if metadata.title.trim().is_empty() {
        error!(path = %file.path, "No title in content file");
        return Err(PublishError::MissingTitle(path.to_path_buf()));
    }
    info!(
        path = %file.path,
        title = %metadata.title,
        draft = metadata.draft,
        body_len = metadata.body.len(),
        "Extracted article metadata"
    );
    Ok(metadata)
}

fn org_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*#\+([A-Za-z_]+):[ \t]*(.*?)[ \t]*\r?$").expect("valid regex")
    })
}

/// First value of `#+KEY:` (case-insensitive), if present.
fn org_keyword(text: &str, key: &str) -> Option<String> {
    org_keyword_regex()
        .captures_iter(text)
        .find(|c| c[1].eq_ignore_ascii_case(key))
        .map(|c| c[2].to_string())
}

fn extract_org(
    path: &Path,
    text: &str,
    converter: &dyn Converter,
) -> Result<ArticleMetadata, PublishError> {
    let title = org_keyword(text, "TITLE").unwrap_or_default();
    let description = org_keyword(text, "DESCRIPTION").filter(|d| !d.is_empty());
    let canonical_url = org_keyword(text, "CANONICAL_URL").filter(|u| !u.is_empty());
    let draft = org_keyword(text, "DRAFT")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "t" | "true" | "yes" | "1"))
        .unwrap_or(false);

    let tags = ORG_TAG_KEYWORDS
        .iter()
        .filter_map(|key| org_keyword(text, key))
        .find(|v| !v.is_empty())
        .map(org_tags)
        .unwrap_or_default();

    // Checked here too so a titleless file never reaches the converter.
    if title.trim().is_empty() {
        return Err(PublishError::MissingTitle(path.to_path_buf()));
    }

    let body = converter.to_markdown(path, Dialect::Org, text)?;

    Ok(ArticleMetadata {
        title,
        description,
        tags,
        canonical_url,
        draft,
        body,
    })
}

/// `:a:b:` becomes a list; anything else is left for the generic splitter.
fn org_tags(value: String) -> RawTags {
    let trimmed = value.trim();
    if trimmed.len() > 1 && trimmed.starts_with(':') && trimmed.ends_with(':') {
        let spaced = trimmed.replace(':', " ");
        RawTags::List(spaced.split_whitespace().map(str::to_string).collect())
    } else {
        RawTags::Text(value)
    }
}

/// Splits a markdown document into (front matter, body).
///
/// Returns `None` for the front matter when the first line is not a marker or when no
/// closing marker follows; the whole text is then the body.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return (None, text);
    };
    if first.trim_end() != FRONT_MATTER_MARKER {
        return (None, text);
    }

    let block_start = first.len();
    let mut offset = block_start;
    for line in lines {
        let line_end = offset + line.len();
        if line.trim_end() == FRONT_MATTER_MARKER {
            return (Some(&text[block_start..offset]), &text[line_end..]);
        }
        offset = line_end;
    }
    (None, text)
}

fn extract_markdown(path: &Path, text: &str) -> Result<ArticleMetadata, PublishError> {
    let (block, body) = split_front_matter(text);

    let fields = match block {
        Some(block) if !block.trim().is_empty() => {
            let value: Value =
                serde_yaml::from_str(block).map_err(|e| PublishError::InvalidFrontMatter {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            match value {
                Value::Mapping(map) => map,
                Value::Null => Default::default(),
                _ => {
                    return Err(PublishError::InvalidFrontMatter {
                        path: path.to_path_buf(),
                        message: "front matter is not a key/value mapping".into(),
                    })
                }
            }
        }
        _ => Default::default(),
    };

    let field = |key: &str| fields.get(key);
    let text_field = |key: &str| field(key).and_then(scalar).filter(|s| !s.trim().is_empty());
    let bool_field = |key: &str| field(key).and_then(Value::as_bool);

    let draft = bool_field("draft").unwrap_or(false) || bool_field("published") == Some(false);

    Ok(ArticleMetadata {
        title: text_field("title").unwrap_or_default(),
        description: text_field("description"),
        tags: field("tags").map(yaml_tags).unwrap_or_default(),
        canonical_url: text_field("canonical_url"),
        draft,
        body: body.to_string(),
    })
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn yaml_tags(value: &Value) -> RawTags {
    match value {
        Value::Null => RawTags::Absent,
        Value::Sequence(items) => RawTags::List(items.iter().filter_map(scalar).collect()),
        other => scalar(other).map(RawTags::Text).unwrap_or_default(),
    }
}
