use std::fs;

use pubsync_core::contract::{ContentFile, Dialect, MockConverter, RawTags};
use pubsync_core::extract::{extract, load, split_front_matter};
use pubsync_core::PublishError;
use tempfile::tempdir;

fn markdown(text: &str) -> ContentFile {
    ContentFile {
        path: "post.md".into(),
        dialect: Dialect::Markdown,
        raw: text.as_bytes().to_vec(),
    }
}

fn org(text: &str) -> ContentFile {
    ContentFile {
        path: "post.org".into(),
        dialect: Dialect::Org,
        raw: text.as_bytes().to_vec(),
    }
}

#[test]
fn markdown_front_matter_fields_and_body() {
    let file = markdown(
        "---\ntitle: \"Hello, world\"\ndescription: A greeting\ntags: [rust, cli]\ncanonical_url: https://blog.example.com/hello\n---\n# Hello\n\nBody.\n",
    );
    let meta = extract(&file, &MockConverter::new()).unwrap();
    assert_eq!(meta.title, "Hello, world");
    assert_eq!(meta.description.as_deref(), Some("A greeting"));
    assert_eq!(
        meta.tags,
        RawTags::List(vec!["rust".into(), "cli".into()])
    );
    assert_eq!(
        meta.canonical_url.as_deref(),
        Some("https://blog.example.com/hello")
    );
    assert!(!meta.draft);
    assert_eq!(meta.body, "# Hello\n\nBody.\n");
}

#[test]
fn markdown_draft_and_published_false_both_mark_draft() {
    let meta = extract(
        &markdown("---\ntitle: T\ndraft: true\n---\nx"),
        &MockConverter::new(),
    )
    .unwrap();
    assert!(meta.draft);

    let meta = extract(
        &markdown("---\ntitle: T\npublished: false\n---\nx"),
        &MockConverter::new(),
    )
    .unwrap();
    assert!(meta.draft);
}

#[test]
fn markdown_without_front_matter_has_no_title() {
    let result = extract(&markdown("# Just a heading\n"), &MockConverter::new());
    assert!(matches!(result, Err(PublishError::MissingTitle(_))));
}

#[test]
fn markdown_invalid_yaml_is_reported() {
    let result = extract(
        &markdown("---\ntitle: [unclosed\n---\nbody"),
        &MockConverter::new(),
    );
    assert!(matches!(result, Err(PublishError::InvalidFrontMatter { .. })));
}

#[test]
fn front_matter_split_edge_cases() {
    assert_eq!(
        split_front_matter("---\na: 1\n---\nbody\n"),
        (Some("a: 1\n"), "body\n")
    );
    assert_eq!(
        split_front_matter("---\r\na: 1\r\n---\r\nbody"),
        (Some("a: 1\r\n"), "body")
    );
    // Unclosed block: everything is body.
    assert_eq!(split_front_matter("---\na: 1\n"), (None, "---\na: 1\n"));
    // Marker must be on the first line.
    assert_eq!(split_front_matter("\n---\na: 1\n---\n").0, None);
    assert_eq!(split_front_matter(""), (None, ""));
}

#[test]
fn org_keywords_and_converted_body() {
    let text = "#+TITLE: My Org Post\n#+description: About org\n#+KEYWORDS: rust, emacs\n#+FILETAGS: :ignored:\n#+CANONICAL_URL: https://example.com/org\n\n* Heading\nText\n";
    let mut converter = MockConverter::new();
    converter
        .expect_to_markdown()
        .times(1)
        .withf(|_, dialect, source| *dialect == Dialect::Org && source.contains("* Heading"))
        .returning(|_, _, _| Ok("# Heading\n\nText\n".into()));

    let meta = extract(&org(text), &converter).unwrap();
    assert_eq!(meta.title, "My Org Post");
    assert_eq!(meta.description.as_deref(), Some("About org"));
    assert_eq!(meta.tags, RawTags::Text("rust, emacs".into()));
    assert_eq!(meta.canonical_url.as_deref(), Some("https://example.com/org"));
    assert!(!meta.draft);
    assert_eq!(meta.body, "# Heading\n\nText\n");
}

#[test]
fn org_filetags_colon_form_becomes_list() {
    let mut converter = MockConverter::new();
    converter
        .expect_to_markdown()
        .returning(|_, _, _| Ok(String::new()));
    let meta = extract(
        &org("#+TITLE: T\n#+FILETAGS: :rust:cli:\n#+DRAFT: yes\n"),
        &converter,
    )
    .unwrap();
    assert_eq!(meta.tags, RawTags::List(vec!["rust".into(), "cli".into()]));
    assert!(meta.draft);
}

#[test]
fn org_without_title_skips_conversion() {
    let mut converter = MockConverter::new();
    converter.expect_to_markdown().never();
    let result = extract(&org("#+AUTHOR: someone\n* Heading\n"), &converter);
    assert!(matches!(result, Err(PublishError::MissingTitle(_))));
}

#[test]
fn org_conversion_failure_propagates() {
    let mut converter = MockConverter::new();
    converter.expect_to_markdown().returning(|path, _, _| {
        Err(PublishError::Conversion {
            path: path.to_path_buf(),
            message: "pandoc exited with 64".into(),
        })
    });
    let result = extract(&org("#+TITLE: T\n"), &converter);
    assert!(matches!(result, Err(PublishError::Conversion { .. })));
}

#[test]
fn load_rejects_unknown_extension_before_reading() {
    let dir = tempdir().unwrap();
    let result = load(dir.path(), "missing.txt");
    assert!(matches!(result, Err(PublishError::UnsupportedFormat(_))));
}

#[test]
fn load_reads_file_relative_to_root() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("posts")).unwrap();
    fs::write(dir.path().join("posts/a.markdown"), "hi").unwrap();

    let file = load(dir.path(), "posts/a.markdown").unwrap();
    assert_eq!(file.path, "posts/a.markdown");
    assert_eq!(file.dialect, Dialect::Markdown);
    assert_eq!(file.raw, b"hi");

    assert!(matches!(
        load(dir.path(), "posts/none.md"),
        Err(PublishError::Io { .. })
    ));
}
