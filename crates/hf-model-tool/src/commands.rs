//! Command handlers and plain-text rendering.

use anyhow::{bail, Context, Result};
use hf_model_core::inventory::looks_like_asset_root;
use hf_model_core::{
    AssetKind, AssetRecord, AssetRegistry, BuildReport, DeclaredType, DeleteOutcome,
    ListOptions, ManifestFieldUpdate, SortKey,
};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Optional entry fields from `manifest update`.
pub struct FieldValues {
    pub name: Option<String>,
    pub publisher: Option<String>,
    pub kind: Option<String>,
    pub notes: Option<String>,
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table(records: &[AssetRecord]) {
    if records.is_empty() {
        println!("No assets found.");
        return;
    }
    println!("{:>12}  {:<13}  {:<20}  NAME", "SIZE", "KIND", "PUBLISHER");
    for record in records {
        let marker = if record.duplicates.is_empty() { "" } else { " (+dup)" };
        println!(
            "{:>12}  {:<13}  {:<20}  {}{}",
            record.size_display,
            record.kind.as_str(),
            record.publisher,
            record.display_name,
            marker
        );
    }
    let total: u64 = records.iter().map(|r| r.size_bytes).sum();
    println!(
        "\n{} assets, {}",
        records.len(),
        hf_model_core::inventory::naming::format_size(total)
    );
}

fn print_failures(report: Option<&BuildReport>) {
    let Some(report) = report else {
        return;
    };
    for failure in &report.failures {
        eprintln!(
            "warning: {} ({:?}): {}",
            failure.path.display(),
            failure.kind,
            failure.message
        );
    }
}

pub fn list(
    registry: &mut AssetRegistry,
    sort: SortKey,
    kinds: Vec<AssetKind>,
    include_secondary: bool,
    refresh: bool,
    json: bool,
) -> Result<()> {
    let options = ListOptions {
        sort_by: sort,
        kinds: (!kinds.is_empty()).then_some(kinds),
        include_secondary,
        force_refresh: refresh,
    };
    let records = registry.list(&options)?;

    if json {
        return print_json(&records);
    }
    print_table(&records);
    print_failures(registry.last_report());
    Ok(())
}

pub fn details(registry: &mut AssetRegistry, identity: &str, json: bool) -> Result<()> {
    let Some(record) = registry.details(identity)? else {
        bail!("No asset matches {}", identity);
    };
    if json {
        return print_json(&record);
    }

    println!("Name:       {}", record.display_name);
    println!("Publisher:  {}", record.publisher);
    println!("Kind:       {}", record.kind);
    println!("Identity:   {}", record.id);
    println!("Path:       {}", record.path.display());
    println!("Root:       {}", record.source_root.display());
    println!("Size:       {} ({} bytes)", record.size_display, record.size_bytes);
    println!("Modified:   {}", record.modified_at.to_rfc3339());
    println!("Manifest:   {}", if record.manifest_applied { "yes" } else { "no" });
    if let Some(notes) = &record.notes {
        println!("Notes:      {}", notes);
    }
    for duplicate in &record.duplicates {
        println!("Duplicate:  {}", duplicate.display());
    }
    Ok(())
}

pub fn delete(
    registry: &mut AssetRegistry,
    identities: &[String],
    include_secondary: bool,
    yes: bool,
) -> Result<()> {
    if !yes {
        for identity in identities {
            match registry.details(identity)? {
                Some(record) => println!(
                    "would delete {} ({})",
                    record.path.display(),
                    record.size_display
                ),
                None => println!("no asset matches {}", identity),
            }
        }
        bail!("Refusing to delete without --yes");
    }

    if let [identity] = identities {
        return match registry.delete(identity, include_secondary)? {
            DeleteOutcome::Deleted { paths, .. } => {
                for path in paths {
                    println!("deleted {}", path.display());
                }
                Ok(())
            }
            DeleteOutcome::NotFound { identity } => bail!("No asset matches {}", identity),
            DeleteOutcome::Failed {
                path,
                message,
                removed,
                ..
            } => {
                for path in removed {
                    println!("deleted {}", path.display());
                }
                bail!("Failed to delete {}: {}", path.display(), message)
            }
        };
    }

    let summary = registry.delete_many(identities, include_secondary)?;
    for item in &summary.succeeded {
        for path in &item.paths {
            println!("deleted {}", path.display());
        }
    }
    for item in &summary.failed {
        eprintln!("failed {}: {}", item.identity, item.message);
    }
    if !summary.failed.is_empty() {
        bail!(
            "{} of {} deletions failed",
            summary.failed.len(),
            identities.len()
        );
    }
    Ok(())
}

pub fn dirs_list(registry: &AssetRegistry) -> Result<()> {
    let set = registry.registration_set();
    println!(
        "Default cache: {}",
        if set.include_default_cache { "included" } else { "excluded" }
    );
    if set.custom_directories.is_empty() {
        println!("No custom directories registered.");
    }
    for registration in &set.custom_directories {
        let missing = if registration.path.is_dir() { "" } else { " (missing)" };
        println!(
            "  [{}] {}{}",
            registration.declared_type.as_str(),
            registration.path.display(),
            missing
        );
    }

    println!("Effective roots:");
    for root in registry.effective_roots() {
        println!("  {}", root.path.display());
    }
    Ok(())
}

pub fn dirs_add(registry: &mut AssetRegistry, path: &Path, declared: DeclaredType) -> Result<()> {
    if path.is_dir() && !looks_like_asset_root(path) {
        warn!(
            "{} does not look like it contains models; registering anyway",
            path.display()
        );
    }
    let registration = registry.add_directory(path, declared)?;
    println!(
        "Added {} ({})",
        registration.path.display(),
        registration.declared_type.as_str()
    );
    Ok(())
}

pub fn dirs_remove(registry: &mut AssetRegistry, path: &Path) -> Result<()> {
    if !registry.remove_directory(path)? {
        bail!("{} is not registered", path.display());
    }
    println!("Removed {}", path.display());
    Ok(())
}

pub fn dirs_toggle(registry: &mut AssetRegistry) -> Result<()> {
    let included = registry.toggle_default_cache()?;
    println!(
        "Default cache {}",
        if included { "included" } else { "excluded" }
    );
    Ok(())
}

pub fn manifest_generate(registry: &mut AssetRegistry, root: &Path, save: bool) -> Result<()> {
    let mut manifest = registry
        .generate_manifest(root)
        .with_context(|| format!("Cannot generate manifest for {}", root.display()))?;
    if !save {
        return print_json(&manifest);
    }
    let path = registry.save_manifest(root, &mut manifest)?;
    println!(
        "Wrote {} entries to {}",
        manifest.models.len(),
        path.display()
    );
    Ok(())
}

pub fn manifest_update(
    registry: &mut AssetRegistry,
    root: &Path,
    path: PathBuf,
    values: FieldValues,
) -> Result<()> {
    let kind = match values.kind.as_deref() {
        Some(value) => match AssetKind::from_manifest_type(value) {
            Some(kind) => Some(kind),
            None => bail!("Unknown manifest type {:?}", value),
        },
        None => None,
    };
    if values.name.is_none() && values.publisher.is_none() && kind.is_none() && values.notes.is_none()
    {
        bail!("Nothing to update: pass --name, --publisher, --type or --notes");
    }

    let update = ManifestFieldUpdate {
        path,
        name: values.name,
        publisher: values.publisher,
        kind,
        notes: values.notes,
    };
    let manifest = registry.update_manifest(root, &[update])?;
    println!("Manifest for {} has {} entries", root.display(), manifest.models.len());
    Ok(())
}
