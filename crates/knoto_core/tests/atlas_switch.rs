use knoto_core::{AtlasConfig, AtlasRegistry, NodeService, SeededInference};
use std::sync::Arc;

fn service_for(registry: &Arc<AtlasRegistry>) -> NodeService {
    NodeService::new(registry.clone(), Arc::new(SeededInference::default()))
}

#[test]
fn atlases_are_fully_isolated_and_switching_back_restores_visibility() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let registry = Arc::new(AtlasRegistry::new());
    let service = service_for(&registry);

    registry
        .set_atlas(AtlasConfig::new(dir_a.path(), "atlas.db"))
        .unwrap();
    service.insert("first note", "notes/n1.md", "blue").unwrap();

    registry
        .set_atlas(AtlasConfig::new(dir_b.path(), "atlas.db"))
        .unwrap();
    assert!(service.get_all().unwrap().is_empty());

    // The same filepath is legal in another atlas; no cross-atlas keying.
    service.insert("other note", "notes/n1.md", "red").unwrap();
    assert_eq!(service.get_all().unwrap().len(), 1);

    registry
        .set_atlas(AtlasConfig::new(dir_a.path(), "atlas.db"))
        .unwrap();
    let all = service.get_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].filepath, "notes/n1.md");
    assert_eq!(all[0].color_tag, "blue");
}

#[test]
fn failed_switch_keeps_previous_atlas_active_and_usable() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(AtlasRegistry::new());
    let service = service_for(&registry);

    let previous = AtlasConfig::new(dir.path(), "atlas.db");
    registry.set_atlas(previous.clone()).unwrap();
    service.insert("kept note", "notes/kept.md", "blue").unwrap();

    // A root whose parent is a regular file cannot be created.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let err = registry
        .set_atlas(AtlasConfig::new(blocker.join("nested"), "atlas.db"))
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("atlas store unavailable"));
    assert!(message.contains("nested"));

    assert_eq!(registry.current(), Some(previous));
    assert_eq!(service.get_all().unwrap().len(), 1);
}

#[test]
fn registry_exposes_current_paths_for_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let registry = AtlasRegistry::new();

    assert!(registry.current().is_none());
    assert!(registry.current_store_path().is_none());

    let config = AtlasConfig::new(dir.path(), "atlas.db");
    registry.set_atlas(config.clone()).unwrap();

    assert_eq!(registry.current(), Some(config));
    assert_eq!(
        registry.current_store_path(),
        Some(dir.path().join("atlas.db"))
    );
}

#[test]
fn shutdown_clears_the_selection() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(AtlasRegistry::new());
    registry
        .set_atlas(AtlasConfig::new(dir.path(), "atlas.db"))
        .unwrap();

    registry.shutdown();
    assert!(registry.current().is_none());

    let service = service_for(&registry);
    assert!(service.get_all().unwrap().is_empty());
}

#[test]
fn set_atlas_creates_missing_root_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested_root = dir.path().join("a").join("b");
    let registry = AtlasRegistry::new();

    registry
        .set_atlas(AtlasConfig::new(&nested_root, "atlas.db"))
        .unwrap();
    assert!(nested_root.join("atlas.db").exists());
}
