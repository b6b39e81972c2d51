use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::process::Command;

use pubsync_core::config::Baseline;
use pubsync_core::contract::{ChangeSource, MockChangeSource};
use pubsync_core::detect::{load_index, match_changed, select, GitChangeSource, SelectionMode};
use pubsync_core::PublishError;
use tempfile::tempdir;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn changed(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn selection_is_changed_intersect_index_in_index_order() {
    let indexed = strings(&["posts/c.md", "posts/a.md", "posts/b.org", "posts/a.md"]);
    let set = changed(&["posts/b.org", "posts/a.md", "Cargo.toml"]);
    let mut source = MockChangeSource::new();
    source
        .expect_changed_paths()
        .returning(move |_| Some(set.clone()));

    let selected = select(&indexed, &SelectionMode::Auto(Baseline::WorkingTree), &source, true);
    assert_eq!(selected, strings(&["posts/a.md", "posts/b.org"]));
}

#[test]
fn no_baseline_selects_whole_index() {
    let mut source = MockChangeSource::new();
    source.expect_changed_paths().returning(|_| None);
    let indexed = strings(&["a.md", "./b.md"]);
    let selected = select(&indexed, &SelectionMode::Auto(Baseline::LastCommit), &source, false);
    assert_eq!(selected, strings(&["a.md", "b.md"]));
}

#[test]
fn force_and_explicit_modes_skip_change_detection() {
    let mut source = MockChangeSource::new();
    source.expect_changed_paths().never();
    let indexed = strings(&["a.md", "b.md"]);

    assert_eq!(select(&indexed, &SelectionMode::Force, &source, false), indexed);
    assert_eq!(
        select(
            &indexed,
            &SelectionMode::ExplicitFiles(strings(&["./x.md", "x.md", "y.org"])),
            &source,
            false
        ),
        strings(&["x.md", "y.org"])
    );
}

#[test]
fn basename_fallback_can_be_disabled() {
    let indexed = strings(&["content/posts/hello.md", "content/posts/other.md"]);
    let set = changed(&["blog/content/posts/hello.md"]);

    assert_eq!(
        match_changed(&indexed, &set, false),
        strings(&["content/posts/hello.md"])
    );
    assert!(match_changed(&indexed, &set, true).is_empty());
}

#[test]
fn index_accepts_list_and_mapping_forms() {
    let dir = tempdir().unwrap();
    let list = dir.path().join("list.yaml");
    fs::write(&list, "- posts/a.md\n- ./posts/b.org\n").unwrap();
    assert_eq!(load_index(&list).unwrap(), strings(&["posts/a.md", "posts/b.org"]));

    let mapping = dir.path().join("map.yaml");
    fs::write(&mapping, "files:\n  - posts/a.md\n").unwrap();
    assert_eq!(load_index(&mapping).unwrap(), strings(&["posts/a.md"]));

    let empty = dir.path().join("empty.yaml");
    fs::write(&empty, "").unwrap();
    assert!(load_index(&empty).unwrap().is_empty());
}

#[test]
fn index_errors() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        load_index(&dir.path().join("nope.yaml")),
        Err(PublishError::MissingIndex(_))
    ));

    let bad = dir.path().join("bad.yaml");
    fs::write(&bad, "files: 12\n").unwrap();
    assert!(matches!(
        load_index(&bad),
        Err(PublishError::InvalidIndex { .. })
    ));
}

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["-c", "user.name=test", "-c", "user.email=test@example.com", "-c", "commit.gpgsign=false"])
        .args(args)
        .status()
        .expect("git runs");
    assert!(status.success(), "git {args:?} failed");
}

#[test]
fn git_source_without_commits_has_no_baseline() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let dir = tempdir().unwrap();
    git(dir.path(), &["init", "-q"]);
    let source = GitChangeSource::new(dir.path());
    assert_eq!(source.changed_paths(Baseline::WorkingTree), None);
}

#[test]
fn git_source_reports_working_tree_and_last_commit_changes() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let dir = tempdir().unwrap();
    let root = dir.path();
    git(root, &["init", "-q"]);
    fs::write(root.join("a.md"), "one").unwrap();
    fs::write(root.join("b.md"), "one").unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "first"]);

    let source = GitChangeSource::new(root);
    // Single commit: every path it introduced.
    assert_eq!(
        source.changed_paths(Baseline::LastCommit),
        Some(changed(&["a.md", "b.md"]))
    );
    assert_eq!(source.changed_paths(Baseline::WorkingTree), Some(BTreeSet::new()));

    fs::write(root.join("b.md"), "two").unwrap();
    git(root, &["add", "b.md"]);
    git(root, &["commit", "-q", "-m", "second"]);
    assert_eq!(
        source.changed_paths(Baseline::LastCommit),
        Some(changed(&["b.md"]))
    );

    fs::write(root.join("a.md"), "staged").unwrap();
    git(root, &["add", "a.md"]);
    fs::write(root.join("b.md"), "unstaged").unwrap();
    assert_eq!(
        source.changed_paths(Baseline::WorkingTree),
        Some(changed(&["a.md", "b.md"]))
    );
}

#[test]
fn git_source_reports_non_ascii_paths_verbatim() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let dir = tempdir().unwrap();
    let root = dir.path();
    git(root, &["init", "-q"]);
    fs::create_dir_all(root.join("posts")).unwrap();
    fs::write(root.join("posts/café.md"), "one").unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "first"]);
    fs::write(root.join("posts/café.md"), "two").unwrap();

    let source = GitChangeSource::new(root);
    assert_eq!(
        source.changed_paths(Baseline::WorkingTree),
        Some(changed(&["posts/café.md"]))
    );
    assert_eq!(
        select(
            &strings(&["posts/café.md", "posts/other.md"]),
            &SelectionMode::Auto(Baseline::WorkingTree),
            &source,
            true
        ),
        strings(&["posts/café.md"])
    );
}
