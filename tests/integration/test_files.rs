//! Integration tests for `!file` and `!include` directives

use crate::fixtures::{compose_opts, p, write_file, write_json};
use jsoncompose::{
    ComposeOptions, Composer, Error, GeneratorRegistry, HandlerRegistry, MatcherRegistry,
    WrapperKind,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_file_reference_is_composed_against_document() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_json(
        root,
        "data/user.json",
        &json!({"name": "Ann", "id": {"!ref": "/meta/id"}}),
    )
    .unwrap();

    for kind in [WrapperKind::Direct, WrapperKind::Indexed] {
        let composed = jsoncompose::compose_value(
            json!({"meta": {"id": 7}, "user": {"!file": "data/user.json"}}),
            &compose_opts(root, kind),
        )
        .unwrap();

        assert_eq!(composed["user"], json!({"name": "Ann", "id": 7}), "{kind}");
    }
}

#[test]
fn test_file_reference_always_reads_json() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "user.yaml", "name: Ann\n").unwrap();

    let err = jsoncompose::compose_value(
        json!({"user": {"!file": "user.yaml"}}),
        &compose_opts(root, WrapperKind::Indexed),
    )
    .unwrap_err();
    assert!(matches!(err.root_cause(), Error::Parse { .. }), "{err}");
}

#[test]
fn test_missing_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = jsoncompose::compose_value(
        json!({"user": {"!file": "absent.json"}}),
        &compose_opts(temp_dir.path(), WrapperKind::Direct),
    )
    .unwrap_err();
    assert!(matches!(err.root_cause(), Error::Io { .. }), "{err}");
}

#[test]
fn test_include_infers_format() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "cfg.yaml", "retries: 3\nhosts:\n  - a\n  - b\n").unwrap();
    write_file(root, "note.txt", "plain text").unwrap();
    write_json(root, "body.json", &json!({"k": "v"})).unwrap();
    write_file(root, "raw.dat", "{\"forced\": true}").unwrap();

    let composed = jsoncompose::compose_value(
        json!({
            "cfg": {"!include": "cfg.yaml"},
            "note": {"!include": "note.txt"},
            "body": {"!include": "body.json"},
            "forced": {"!include": "raw.dat", "$format": "json"}
        }),
        &compose_opts(root, WrapperKind::Indexed),
    )
    .unwrap();

    assert_eq!(composed["cfg"], json!({"retries": 3, "hosts": ["a", "b"]}));
    assert_eq!(composed["note"], json!("plain text"));
    assert_eq!(composed["body"], json!({"k": "v"}));
    assert_eq!(composed["forced"], json!({"forced": true}));
}

#[test]
fn test_include_content_is_not_rescanned() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_json(root, "template.json", &json!({"x": {"!ref": "/a"}})).unwrap();

    let composed = jsoncompose::compose_value(
        json!({"a": 1, "t": {"!include": "template.json"}}),
        &compose_opts(root, WrapperKind::Direct),
    )
    .unwrap();

    assert_eq!(composed["t"], json!({"x": {"!ref": "/a"}}));
}

#[test]
fn test_include_with_compose_uses_own_context() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_json(root, "part.json", &json!({"a": 2, "b": {"!ref": "/a"}})).unwrap();

    for kind in [WrapperKind::Direct, WrapperKind::Indexed] {
        let composed = jsoncompose::compose_value(
            json!({"a": 1, "part": {"!include": "part.json", "$compose": true}}),
            &compose_opts(root, kind),
        )
        .unwrap();

        assert_eq!(composed["part"], json!({"a": 2, "b": 2}), "{kind}");
        assert_eq!(composed["a"], json!(1));
    }
}

#[test]
fn test_include_context_cannot_see_outer_document() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_json(root, "part.json", &json!({"b": {"!ref": "/outer"}})).unwrap();

    let err = jsoncompose::compose_value(
        json!({"outer": 1, "part": {"!include": "part.json", "!compose": true}}),
        &compose_opts(root, WrapperKind::Indexed),
    )
    .unwrap_err();
    assert!(matches!(err.root_cause(), Error::Unresolvable { .. }), "{err}");
}

#[test]
fn test_self_include_hits_depth_cap() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_json(
        root,
        "loop.json",
        &json!({"again": {"!include": "loop.json", "$compose": true}}),
    )
    .unwrap();

    let opts = ComposeOptions {
        max_context_depth: 3,
        ..compose_opts(root, WrapperKind::Direct)
    };
    let err = jsoncompose::compose_value(
        json!({"start": {"!include": "loop.json", "$compose": true}}),
        &opts,
    )
    .unwrap_err();

    let Error::InvalidOperation { reason, .. } = err.root_cause() else {
        panic!("expected depth error, got {err}");
    };
    assert!(reason.contains("deeper than 3"), "{reason}");
}

#[test]
fn test_include_option_types_are_checked() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_json(root, "a.json", &json!({})).unwrap();

    let err = jsoncompose::compose_value(
        json!({"x": {"!include": "a.json", "$compose": "yes"}}),
        &compose_opts(root, WrapperKind::Direct),
    )
    .unwrap_err();
    assert!(matches!(err.root_cause(), Error::InvalidInput(_)), "{err}");

    let err = jsoncompose::compose_value(
        json!({"x": {"!include": "a.json", "$format": "xml"}}),
        &compose_opts(root, WrapperKind::Direct),
    )
    .unwrap_err();
    assert!(matches!(err.root_cause(), Error::InvalidInput(_)), "{err}");
}

fn file_composer(root: &std::path::Path, cache: bool) -> Composer {
    let handlers = HandlerRegistry::standard(
        Arc::new(GeneratorRegistry::with_builtins()),
        Arc::new(MatcherRegistry::with_builtins()),
        cache,
        Some(root.to_path_buf()),
    );
    Composer::new(
        WrapperKind::Indexed.wrap(json!({
            "a": {"!file": "f.json"},
            "b": {"!file": "./sub/../f.json"},
            "c": {"!include": "f.json"}
        })),
        handlers,
    )
}

#[test]
fn test_file_cache_reuses_first_read() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_json(root, "f.json", &json!({"v": 1})).unwrap();

    let mut composer = file_composer(root, true);
    composer.compose_at(&p("/a")).unwrap();
    write_json(root, "f.json", &json!({"v": 2})).unwrap();
    composer.compose_at(&p("/b")).unwrap();

    assert_eq!(composer.content().get(&p("/b/v")).unwrap(), &json!(1));

    // Include caches separately and the cache can be dropped
    composer.invalidate_cache();
    composer.compose_at(&p("/c")).unwrap();
    assert_eq!(composer.content().get(&p("/c/v")).unwrap(), &json!(2));
}

#[test]
fn test_file_cache_disabled_rereads() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_json(root, "f.json", &json!({"v": 1})).unwrap();

    let mut composer = file_composer(root, false);
    composer.compose_at(&p("/a")).unwrap();
    write_json(root, "f.json", &json!({"v": 2})).unwrap();
    composer.compose().unwrap();

    let content = composer.into_content();
    assert_eq!(content["a"], json!({"v": 1}));
    assert_eq!(content["b"], json!({"v": 2}));
}

#[test]
fn test_compose_file_reads_yaml_document() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_json(root, "shared.json", &json!({"currency": "EUR"})).unwrap();
    let doc = write_file(
        root,
        "request.yaml",
        "price:\n  \"!ref\": /base\nbase: 10\nshared:\n  \"!file\": shared.json\n",
    )
    .unwrap();

    let composed =
        jsoncompose::compose_file(&doc, &compose_opts(root, WrapperKind::Indexed)).unwrap();
    assert_eq!(
        composed,
        json!({"price": 10, "base": 10, "shared": {"currency": "EUR"}})
    );
}

#[test]
fn test_compose_file_rejects_scalar_document() {
    let temp_dir = TempDir::new().unwrap();
    let doc = write_file(temp_dir.path(), "scalar.json", "42").unwrap();

    let err = jsoncompose::compose_file(&doc, &ComposeOptions::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)), "{err}");
}

#[test]
fn test_cached_file_content_is_copied_per_use() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_json(root, "f.json", &json!({"v": 1})).unwrap();

    let handlers = HandlerRegistry::standard(
        Arc::new(GeneratorRegistry::with_builtins()),
        Arc::new(MatcherRegistry::with_builtins()),
        true,
        Some(root.to_path_buf()),
    );
    let mut composer = Composer::new(
        WrapperKind::Direct.wrap(json!({
            "a": {"!file": "f.json"},
            "b": {"!xref": "/a", "$extend": {"/v": 2}},
            "c": {"!file": "f.json"}
        })),
        handlers,
    );
    composer.compose().unwrap();

    let content = composer.into_content();
    assert_eq!(content["a"], json!({"v": 1}));
    assert_eq!(content["b"], json!({"v": 2}));
    assert_eq!(content["c"], json!({"v": 1}));
}
