//! Integration tests for the string-pointer document facade

use crate::fixtures::{write_file, write_json};
use jsoncompose::{DocumentBuilder, Error, JsonDocument, WrapperKind};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_builder_defaults() {
    let doc = DocumentBuilder::new().build().unwrap();
    assert_eq!(doc, json!({}));
    assert!(!doc.references_allowed());
    assert_eq!(doc.wrapper().kind(), WrapperKind::Direct);
}

#[test]
fn test_builder_rejects_scalar_content() {
    let err = DocumentBuilder::new().from_data(json!(5)).build().unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)), "{err}");
    assert!(JsonDocument::new(json!("text")).is_err());
}

#[test]
fn test_get_has_and_defaults() {
    let doc = JsonDocument::new(json!({"a": {"b": [10, 20]}})).unwrap();

    assert_eq!(doc.get("/a/b/1").unwrap(), &json!(20));
    assert!(doc.has("/a/b/0"));
    assert!(!doc.has("/a/b/2"));
    assert!(!doc.has("not a pointer"));
    assert!(matches!(doc.get("a/b"), Err(Error::Syntax { .. })));

    let fallback = json!("none");
    assert_eq!(doc.get_or_default("/zz", &fallback), &fallback);
    assert_eq!(doc.get_or_default("bad", &fallback), &fallback);
}

#[test]
fn test_update_and_delete_chain() {
    for kind in [WrapperKind::Direct, WrapperKind::Indexed] {
        let mut doc = DocumentBuilder::new()
            .from_data(json!({"a": 1, "list": [1, 2, 3]}))
            .set_wrapper(kind)
            .build()
            .unwrap();

        doc.update("/b", json!({"c": true}))
            .unwrap()
            .update("/list/-", json!(4))
            .unwrap();
        doc.delete(&["/a", "/list/0", "/missing", "bad pointer"]);

        assert_eq!(doc, json!({"b": {"c": true}, "list": [2, 3, 4]}), "{kind}");
        assert!(doc.has("/b/c"));
    }
}

#[test]
fn test_references_resolved_on_build_and_update() {
    let mut doc = DocumentBuilder::new()
        .from_data(json!({"a": {"b": 1}, "c": "!ref /a/b"}))
        .set_reference_policy(true, false)
        .set_wrapper(WrapperKind::Indexed)
        .build()
        .unwrap();

    assert!(doc.references_allowed());
    assert_eq!(doc.get("/c").unwrap(), &json!(1));

    doc.update("/d", json!({"copy": "!ref /a"})).unwrap();
    assert_eq!(doc.get("/d/copy/b").unwrap(), &json!(1));
}

#[test]
fn test_references_kept_when_not_allowed() {
    let mut doc = JsonDocument::new(json!({"a": 1, "c": "!ref /a"})).unwrap();
    doc.update("/d", json!("!ref /a")).unwrap();

    assert_eq!(doc.get("/c").unwrap(), &json!("!ref /a"));
    assert_eq!(doc.get("/d").unwrap(), &json!("!ref /a"));
}

#[test]
fn test_update_with_missing_reference_leaves_document_intact() {
    let mut doc = DocumentBuilder::new()
        .from_data(json!({"a": 1}))
        .set_reference_policy(true, true)
        .build()
        .unwrap();

    let err = doc.update("/b", json!("!ref /nope")).unwrap_err();
    assert!(matches!(err, Error::Resolution { .. }), "{err}");
    assert!(!doc.has("/b"));
}

#[test]
fn test_build_from_files() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_json(root, "user.json", &json!({"name": "Ann"})).unwrap();
    let doc_path = write_file(
        root,
        "doc.yaml",
        "user: '!file user.json'\nalias: '!ref /user/name'\n",
    )
    .unwrap();

    let doc = DocumentBuilder::new()
        .from_file(&doc_path)
        .set_reference_policy(true, true)
        .base_dir(root)
        .build()
        .unwrap();

    assert_eq!(doc.get("/user/name").unwrap(), &json!("Ann"));
    assert_eq!(doc.get("/alias").unwrap(), &json!("Ann"));
}

#[test]
fn test_build_from_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = DocumentBuilder::new()
        .from_file(temp_dir.path().join("absent.json"))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }), "{err}");
}

#[test]
fn test_leaves_and_display() {
    let doc = JsonDocument::new(json!({"a": {"b": 1}, "c": [true]})).unwrap();

    let leaves: Vec<String> = doc.leaves().map(|(pointer, _)| pointer.to_string()).collect();
    assert_eq!(leaves, vec!["/a/b", "/c/0"]);
    assert_eq!(doc.to_string(), r#"{"a":{"b":1},"c":[true]}"#);
    assert_eq!(doc.into_content(), json!({"a": {"b": 1}, "c": [true]}));
}
