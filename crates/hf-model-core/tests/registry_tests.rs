//! End-to-end registry behavior: registrations, caching, manifests, deletes.

use hf_model_core::{
    AssetKind, AssetRegistry, AssetRemover, DeclaredType, DeleteOutcome, FailureKind, FsRemover,
    JsonRegistrationStore, ListOptions, ManifestFieldUpdate, MemoryRegistrationStore,
    RegistrationSet, RegistrationStore, SortKey,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn isolated_registry() -> AssetRegistry {
    let set = RegistrationSet {
        include_default_cache: false,
        ..Default::default()
    };
    AssetRegistry::new(MemoryRegistrationStore::with_set(set)).unwrap()
}

fn custom_model(root: &Path, name: &str, weight_bytes: usize) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.json"), b"{}").unwrap();
    fs::write(dir.join("model.safetensors"), vec![0u8; weight_bytes]).unwrap();
    dir
}

fn lora(root: &Path, name: &str) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("adapter_config.json"), b"{}").unwrap();
    fs::write(dir.join("adapter_model.safetensors"), vec![0u8; 4]).unwrap();
    dir
}

#[cfg(unix)]
fn cache_repo(root: &Path, name: &str, blobs: &[(&str, usize)]) -> PathBuf {
    let repo = root.join(name);
    let snapshot = repo.join("snapshots").join("0123abcd");
    fs::create_dir_all(repo.join("blobs")).unwrap();
    fs::create_dir_all(&snapshot).unwrap();
    for (index, (blob, size)) in blobs.iter().enumerate() {
        fs::write(repo.join("blobs").join(blob), vec![0u8; *size]).unwrap();
        std::os::unix::fs::symlink(
            Path::new("../../blobs").join(blob),
            snapshot.join(format!("file-{}.safetensors", index)),
        )
        .unwrap();
    }
    repo
}

/// Refuses one path with a permission error; everything else is removed.
struct DenyOne {
    denied: PathBuf,
}

impl AssetRemover for DenyOne {
    fn remove(&self, path: &Path) -> io::Result<()> {
        if path == self.denied {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "operation not permitted",
            ));
        }
        FsRemover.remove(path)
    }
}

#[test]
fn test_batch_delete_continues_past_permission_failure() {
    let temp = TempDir::new().unwrap();
    let one = custom_model(temp.path(), "one", 10);
    let two = custom_model(temp.path(), "two", 20);
    let three = custom_model(temp.path(), "three", 30);

    let mut registry = isolated_registry().with_remover(DenyOne {
        denied: two.clone(),
    });
    registry
        .add_directory(temp.path(), DeclaredType::Auto)
        .unwrap();
    assert_eq!(registry.list(&ListOptions::default()).unwrap().len(), 3);

    let ids: Vec<String> = [&one, &two, &three]
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect();
    let summary = registry.delete_many(&ids, false).unwrap();

    assert_eq!(summary.succeeded.len(), 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].kind, FailureKind::PermissionDenied);
    assert_eq!(summary.failed[0].path.as_deref(), Some(two.as_path()));

    let remaining = registry.list(&ListOptions::default()).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].path, two);
    assert!(!one.exists());
    assert!(!three.exists());
}

#[cfg(unix)]
#[test]
fn test_delete_symlinked_model_keeps_link_target() {
    let temp = TempDir::new().unwrap();
    let custom = temp.path().join("custom");
    fs::create_dir(&custom).unwrap();
    let shared = custom_model(&temp.path().join("shared"), "base-model", 24);
    let link = custom.join("base-link");
    std::os::unix::fs::symlink(&shared, &link).unwrap();

    let mut registry = isolated_registry();
    registry.add_directory(&custom, DeclaredType::Auto).unwrap();

    let listed = registry.list(&ListOptions::default()).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].path, link);
    assert_eq!(listed[0].raw_name, "base-link");

    let id = listed[0].id.clone();
    match registry.delete(&id, false).unwrap() {
        DeleteOutcome::Deleted { paths, .. } => assert_eq!(paths, vec![link.clone()]),
        other => panic!("unexpected outcome: {:?}", other),
    }

    assert!(fs::symlink_metadata(&link).is_err());
    assert!(shared.join("config.json").is_file());
    assert!(shared.join("model.safetensors").is_file());
    assert!(registry.list(&ListOptions::default()).unwrap().is_empty());
}

#[cfg(unix)]
#[test]
fn test_symlink_alias_root_can_be_registered() {
    let temp = TempDir::new().unwrap();
    let hub = temp.path().join("hub");
    cache_repo(&hub, "models--org--foo", &[("aaa", 100), ("bbb", 50)]);
    let hub_link = temp.path().join("hub-link");
    std::os::unix::fs::symlink(&hub, &hub_link).unwrap();

    let mut registry = isolated_registry();
    registry
        .add_directory(&hub, DeclaredType::Huggingface)
        .unwrap();
    let alias = registry
        .add_directory(&hub_link, DeclaredType::Auto)
        .unwrap();
    assert_eq!(alias.path, hub_link);
    assert_eq!(registry.registrations().len(), 2);

    let again = registry.add_directory(hub_link.join("."), DeclaredType::Auto);
    assert!(again.unwrap_err().is_configuration_error());

    let listed = registry.list(&ListOptions::default()).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "hf:models/org/foo");
    assert_eq!(listed[0].size_bytes, 150);
    assert!(registry.secondary_records().unwrap().is_empty());

    assert!(registry.remove_directory(&hub_link).unwrap());
    assert_eq!(registry.registrations().len(), 1);
    assert_eq!(registry.registrations()[0].path, hub);
    assert_eq!(
        registry.registrations()[0].declared_type,
        DeclaredType::Huggingface
    );
}

#[test]
fn test_delete_unknown_identity() {
    let mut registry = isolated_registry();
    let outcome = registry.delete("hf:models/nobody/nothing", false).unwrap();
    assert_eq!(
        outcome,
        DeleteOutcome::NotFound {
            identity: "hf:models/nobody/nothing".to_string()
        }
    );
}

#[test]
fn test_delete_with_secondary_removes_duplicates() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a");
    let b = temp.path().join("b");
    custom_model(&a, "run", 8);
    custom_model(&b, "run", 8);
    for root in [&a, &b] {
        fs::write(
            root.join("models_manifest.json"),
            r#"{"models": [{"path": "run", "name": "Shared"}]}"#,
        )
        .unwrap();
    }

    let mut registry = isolated_registry();
    registry.add_directory(&a, DeclaredType::Auto).unwrap();
    registry.add_directory(&b, DeclaredType::Auto).unwrap();

    let listed = registry.list(&ListOptions::default()).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(registry.secondary_records().unwrap().len(), 1);

    let with_secondary = registry
        .list(&ListOptions {
            include_secondary: true,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(with_secondary.len(), 2);

    match registry.delete("name:Shared", true).unwrap() {
        DeleteOutcome::Deleted { paths, .. } => assert_eq!(paths.len(), 2),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(!a.join("run").exists());
    assert!(!b.join("run").exists());
    assert!(registry.list(&ListOptions::default()).unwrap().is_empty());
}

#[test]
fn test_kind_filter_and_sort() {
    let temp = TempDir::new().unwrap();
    custom_model(temp.path(), "zz-model", 100);
    lora(temp.path(), "aa-lora");

    let mut registry = isolated_registry();
    registry
        .add_directory(temp.path(), DeclaredType::Auto)
        .unwrap();

    let loras = registry
        .list(&ListOptions::default().with_kinds(vec![AssetKind::LoraAdapter]))
        .unwrap();
    assert_eq!(loras.len(), 1);
    assert_eq!(loras[0].raw_name, "aa-lora");

    let by_name = registry.list(&ListOptions::sorted_by(SortKey::Name)).unwrap();
    let names: Vec<&str> = by_name.iter().map(|r| r.display_name.as_str()).collect();
    assert_eq!(names, vec!["aa-lora", "zz-model"]);

    let by_size = registry.list(&ListOptions::default()).unwrap();
    assert_eq!(by_size[0].raw_name, "zz-model");
}

#[test]
fn test_manifest_update_invalidates_cache() {
    let temp = TempDir::new().unwrap();
    custom_model(temp.path(), "ckpt-500", 16);

    let mut registry = isolated_registry();
    registry
        .add_directory(temp.path(), DeclaredType::Custom)
        .unwrap();
    assert!(registry.get_models_with_manifest().unwrap().is_empty());

    let mut update = ManifestFieldUpdate::new("ckpt-500");
    update.name = Some("Prod v1".to_string());
    registry.update_manifest(temp.path(), &[update]).unwrap();

    let applied = registry.get_models_with_manifest().unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].display_name, "Prod v1");
    assert_eq!(applied[0].kind, AssetKind::CustomModel);
    assert!(registry.details("name:Prod v1").unwrap().is_some());
}

#[test]
fn test_generate_and_save_manifest() {
    let temp = TempDir::new().unwrap();
    custom_model(temp.path(), "base", 16);
    lora(temp.path(), "style");

    let mut registry = isolated_registry();
    let mut manifest = registry.generate_manifest(temp.path()).unwrap();
    assert_eq!(manifest.models.len(), 2);
    manifest.models[0].notes = Some("keep".to_string());

    let path = registry.save_manifest(temp.path(), &mut manifest).unwrap();
    assert!(path.ends_with("models_manifest.json"));

    registry
        .add_directory(temp.path(), DeclaredType::Auto)
        .unwrap();
    let records = registry.get_models_with_manifest().unwrap();
    assert_eq!(records.len(), 2);
    let base = records.iter().find(|r| r.raw_name == "base").unwrap();
    assert_eq!(base.notes.as_deref(), Some("keep"));
}

#[test]
fn test_generate_manifest_uses_registered_type() {
    let temp = TempDir::new().unwrap();
    let adapter = temp.path().join("weights-only");
    fs::create_dir_all(&adapter).unwrap();
    fs::write(adapter.join("pytorch_lora_weights.safetensors"), vec![0u8; 12]).unwrap();

    let mut registry = isolated_registry();
    assert!(registry
        .generate_manifest(temp.path())
        .unwrap()
        .models
        .is_empty());

    registry
        .add_directory(temp.path(), DeclaredType::Lora)
        .unwrap();
    let manifest = registry.generate_manifest(temp.path()).unwrap();
    assert_eq!(manifest.models.len(), 1);
    assert_eq!(manifest.models[0].path, "weights-only");
    assert_eq!(manifest.models[0].entry_type.as_deref(), Some("lora_adapter"));

    let mut update = ManifestFieldUpdate::new("weights-only");
    update.name = Some("Style".to_string());
    let updated = registry.update_manifest(temp.path(), &[update]).unwrap();
    assert_eq!(updated.models.len(), 1);
    assert_eq!(updated.models[0].name.as_deref(), Some("Style"));

    let records = registry.get_models_with_manifest().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, AssetKind::LoraAdapter);
    assert_eq!(records[0].display_name, "Style");
}

#[test]
fn test_last_report_tracks_failures() {
    let temp = TempDir::new().unwrap();
    let gone = temp.path().join("gone");
    fs::create_dir(&gone).unwrap();

    let mut registry = isolated_registry();
    assert!(registry.last_report().is_none());
    registry.add_directory(&gone, DeclaredType::Auto).unwrap();
    fs::remove_dir(&gone).unwrap();

    registry.list(&ListOptions::default()).unwrap();
    let report = registry.last_report().unwrap();
    assert_eq!(report.roots_scanned, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::RootUnreachable);
}

#[test]
fn test_registrations_persist_through_json_store() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config").join("config.json");
    let models = temp.path().join("models");
    fs::create_dir(&models).unwrap();

    {
        let mut registry = AssetRegistry::open(&config).unwrap();
        registry.add_directory(&models, DeclaredType::Lora).unwrap();
        registry.set_include_default_cache(false).unwrap();
    }

    let stored = JsonRegistrationStore::new(&config).load().unwrap();
    assert!(!stored.include_default_cache);
    assert_eq!(stored.custom_directories.len(), 1);
    assert_eq!(stored.custom_directories[0].declared_type, DeclaredType::Lora);
    assert!(stored.last_updated.is_some());

    let registry = AssetRegistry::open(&config).unwrap();
    assert_eq!(registry.registrations().len(), 1);
    assert_eq!(registry.effective_roots().len(), 1);
}

#[test]
fn test_legacy_config_is_readable() {
    let temp = TempDir::new().unwrap();
    let models = temp.path().join("models");
    custom_model(&models, "ckpt", 4);
    let config = temp.path().join("config.json");
    fs::write(
        &config,
        serde_json::json!({
            "custom_directories": [models.to_string_lossy()],
            "include_default_cache": false,
            "last_updated": "2024-05-01T12:00:00"
        })
        .to_string(),
    )
    .unwrap();

    let mut registry = AssetRegistry::open(&config).unwrap();
    assert_eq!(registry.registrations()[0].declared_type, DeclaredType::Auto);
    assert_eq!(registry.list(&ListOptions::default()).unwrap().len(), 1);
}
