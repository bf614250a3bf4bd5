//! Field-by-field manifest overlay.

use crate::inventory::manifest::ManifestEntry;
use crate::inventory::types::AssetRecord;
use tracing::debug;

/// A manifest value counts only when present and non-blank.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Overlay a manifest entry onto a detected record.
///
/// Returns whether the manifest supplied the display name.
pub fn apply(record: &mut AssetRecord, entry: &ManifestEntry) -> bool {
    let mut name_applied = false;

    if let Some(name) = present(&entry.name) {
        record.display_name = name.to_string();
        name_applied = true;
    }
    if let Some(publisher) = present(&entry.publisher) {
        record.publisher = publisher.to_string();
    }
    if let Some(notes) = present(&entry.notes) {
        record.notes = Some(notes.to_string());
    }
    match entry.kind() {
        Some(kind) if record.kind.is_local() => record.kind = kind,
        Some(_) => {}
        None => {
            if let Some(other) = present(&entry.entry_type) {
                debug!("Ignoring manifest type {:?} for {}", other, entry.path);
            }
        }
    }

    record.manifest_applied = true;
    name_applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::types::AssetKind;
    use chrono::Utc;
    use std::path::PathBuf;

    fn record() -> AssetRecord {
        AssetRecord {
            id: String::new(),
            path: PathBuf::from("/models/ckpt-500"),
            raw_name: "ckpt-500".into(),
            display_name: "ckpt-500".into(),
            publisher: "local".into(),
            kind: AssetKind::CustomModel,
            size_bytes: 1,
            size_display: "1 bytes".into(),
            modified_at: Utc::now(),
            source_root: PathBuf::from("/models"),
            notes: None,
            manifest_applied: false,
            duplicates: Vec::new(),
        }
    }

    #[test]
    fn test_present_fields_replace() {
        let mut rec = record();
        let entry = ManifestEntry {
            path: "ckpt-500".into(),
            name: Some("Prod v1".into()),
            publisher: Some("acme".into()),
            entry_type: Some("lora_adapter".into()),
            notes: Some("ship it".into()),
        };

        assert!(apply(&mut rec, &entry));
        assert_eq!(rec.display_name, "Prod v1");
        assert_eq!(rec.publisher, "acme");
        assert_eq!(rec.kind, AssetKind::LoraAdapter);
        assert_eq!(rec.notes.as_deref(), Some("ship it"));
        assert!(rec.manifest_applied);
    }

    #[test]
    fn test_absent_and_empty_fields_keep_detected_values() {
        let mut rec = record();
        let entry = ManifestEntry {
            path: "ckpt-500".into(),
            name: Some("   ".into()),
            publisher: None,
            entry_type: Some("checkpoint".into()),
            notes: Some(String::new()),
        };

        assert!(!apply(&mut rec, &entry));
        assert_eq!(rec.display_name, "ckpt-500");
        assert_eq!(rec.publisher, "local");
        assert_eq!(rec.kind, AssetKind::CustomModel);
        assert!(rec.notes.is_none());
        assert!(rec.manifest_applied);
    }
}
