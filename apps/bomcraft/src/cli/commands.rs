//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::ExportFormat;
use crate::config::{Backend, Settings};
use crate::error::AppError;
use crate::report;
use bomcraft_core::formats::{snapshot_from_bytes, snapshot_to_bytes};
use bomcraft_core::{
    ItemGraphStore, ItemId, ResolveOptions, SeedRecord, SerializableCatalog, Session,
    catalog_to_bytes,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for seeding (100 MB).
const MAX_SEED_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum file size for import (256 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), AppError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| AppError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(AppError::Input(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path and ensure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, AppError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| AppError::Io(format!("Invalid file path '{}': {}", path.display(), e)))?;

    if !canonical.is_file() {
        return Err(AppError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, AppError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        AppError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(AppError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| AppError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &impl serde::Serialize) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Io(format!("JSON output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty catalog.
pub fn cmd_init(settings: &Settings, force: bool) -> Result<(), AppError> {
    let db_path = &settings.database;
    if db_path.exists() {
        if !force {
            return Err(AppError::Input(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| AppError::Io(format!("Remove existing database: {}", e)))?;
    }

    match settings.backend {
        Backend::Redb => {
            let _session = Session::with_redb(db_path)?;
            println!("Initialized new redb catalog at {:?}", db_path);
        }
        Backend::File => {
            save_session(&Session::new(), db_path)?;
            println!("Initialized new file catalog at {:?}", db_path);
        }
    }

    Ok(())
}

// =============================================================================
// SEED COMMAND
// =============================================================================

/// Seed the catalog from a JSON array of spreadsheet records.
pub fn cmd_seed(settings: &Settings, json_mode: bool, file: &Path) -> Result<(), AppError> {
    tracing::info!("Seeding from {:?}", file);

    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_SEED_FILE_SIZE)?;

    let contents = std::fs::read(&validated_path)
        .map_err(|e| AppError::Io(format!("Read file: {}", e)))?;
    let records: Vec<SeedRecord> = serde_json::from_slice(&contents)
        .map_err(|e| AppError::Input(format!("Invalid items file: {}", e)))?;

    let mut session = load_or_create_session(settings)?;
    let seed_report = session.seed(&records)?;
    save_session(&session, &settings.database)?;

    if json_mode {
        return print_json(&seed_report);
    }

    println!("Processed {} records", records.len());
    println!("  Items inserted:  {}", seed_report.items_inserted);
    println!("  Duplicates:      {}", seed_report.duplicates);
    println!("  Edges linked:    {}", seed_report.edges_linked);
    if !seed_report.warnings.is_empty() {
        println!("Warnings:");
        for warning in &seed_report.warnings {
            println!("  ! {}", warning);
        }
    }
    Ok(())
}

// =============================================================================
// LIST / ITEM COMMANDS
// =============================================================================

/// List items, optionally filtered by category.
pub fn cmd_list(
    settings: &Settings,
    json_mode: bool,
    category: Option<&str>,
) -> Result<(), AppError> {
    let session = load_or_create_session(settings)?;
    let items: Vec<_> = session
        .items()?
        .into_iter()
        .filter(|item| category.is_none_or(|c| item.category.as_deref() == Some(c)))
        .collect();

    if json_mode {
        return print_json(&items);
    }

    print!("{}", report::render_item_list(&items));
    Ok(())
}

/// Show one item with its direct components.
pub fn cmd_item(settings: &Settings, json_mode: bool, id: u64) -> Result<(), AppError> {
    let session = load_or_create_session(settings)?;
    let node = session
        .lookup(ItemId(id))?
        .ok_or(bomcraft_core::BomError::ItemNotFound(ItemId(id)))?;

    if json_mode {
        return print_json(&node);
    }

    print!("{}", report::render_item(&node));
    Ok(())
}

// =============================================================================
// RESOLVE COMMAND
// =============================================================================

/// Resolve the crafting requirements of one unit of an item.
pub fn cmd_resolve(
    settings: &Settings,
    json_mode: bool,
    id: u64,
    max_depth: Option<usize>,
) -> Result<(), AppError> {
    let options = ResolveOptions::with_max_depth(max_depth.unwrap_or(settings.max_depth));
    let session = load_or_create_session(settings)?.with_options(options);

    let root = ItemId(id);
    let result = session.resolve(root)?;
    tracing::debug!(
        item = %root,
        steps = result.steps.len(),
        anomalies = result.anomalies.len(),
        "resolved"
    );

    if json_mode {
        return print_json(&result);
    }

    let name = session
        .item(root)?
        .map(|item| item.name)
        .unwrap_or_else(|| root.to_string());
    print!("{}", report::render_result(&name, &result));
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show catalog status.
pub fn cmd_status(settings: &Settings, json_mode: bool) -> Result<(), AppError> {
    let session = load_or_create_session(settings)?;
    let item_count = session.item_count()?;
    let edge_count = session.edge_count()?;

    if json_mode {
        return print_json(&serde_json::json!({
            "database": settings.database.to_string_lossy(),
            "backend": settings.backend.as_str(),
            "item_count": item_count,
            "edge_count": edge_count,
            "max_depth": settings.max_depth
        }));
    }

    println!("bomcraft Catalog Status");
    println!("=======================");
    println!("Database:  {:?}", settings.database);
    println!("Backend:   {}", settings.backend.as_str());
    println!();
    println!("Items:     {}", item_count);
    println!("Edges:     {}", edge_count);
    println!("Max Depth: {}", settings.max_depth);

    Ok(())
}

// =============================================================================
// EXPORT / IMPORT COMMANDS
// =============================================================================

/// Export the catalog as a binary snapshot or JSON.
pub fn cmd_export(
    settings: &Settings,
    output: &Path,
    format: ExportFormat,
) -> Result<(), AppError> {
    let validated_output = validate_output_path(output)?;
    let session = load_or_create_session(settings)?;

    let data = match format {
        ExportFormat::Snapshot => snapshot_to_bytes(&session)?,
        ExportFormat::Json => serde_json::to_vec_pretty(&session.export_snapshot()?)
            .map_err(|e| AppError::Io(format!("JSON export: {}", e)))?,
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| AppError::Io(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

/// Replace the catalog from a snapshot or JSON export.
pub fn cmd_import(settings: &Settings, input: &Path) -> Result<(), AppError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| AppError::Io(format!("Read file: {}", e)))?;
    let snapshot = decode_catalog(&data)?;

    let mut session = load_or_create_session(settings)?;
    session.import_snapshot(snapshot)?;
    save_session(&session, &settings.database)?;

    println!(
        "Imported catalog: {} items, {} edges",
        session.item_count()?,
        session.edge_count()?
    );
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Decode a binary snapshot, falling back to the JSON export format.
fn decode_catalog(data: &[u8]) -> Result<SerializableCatalog, AppError> {
    match snapshot_from_bytes(data) {
        Ok(snapshot) => Ok(snapshot),
        Err(snapshot_err) => serde_json::from_slice::<SerializableCatalog>(data).map_err(|_| {
            AppError::Input(format!("Could not parse catalog file: {}", snapshot_err))
        }),
    }
}

/// Load or create a session for the configured backend.
pub fn load_or_create_session(settings: &Settings) -> Result<Session, AppError> {
    let db_path = &settings.database;
    let session = match settings.backend {
        Backend::Redb => Session::with_redb(db_path)?,
        Backend::File => {
            if db_path.exists() {
                let data =
                    std::fs::read(db_path).map_err(|e| AppError::Io(format!("Read db: {}", e)))?;
                let mut session = Session::new();
                session.import_snapshot(decode_catalog(&data)?)?;
                session
            } else {
                Session::new()
            }
        }
    };
    Ok(session.with_options(ResolveOptions::with_max_depth(settings.max_depth)))
}

/// Save a session to a database path.
///
/// Persistent sessions are already on disk; in-memory sessions are written
/// as a binary snapshot.
pub fn save_session(session: &Session, db_path: &Path) -> Result<(), AppError> {
    let Some(catalog) = session.catalog_opt() else {
        return Ok(());
    };
    let data = catalog_to_bytes(catalog)?;
    std::fs::write(db_path, &data).map_err(|e| AppError::Io(format!("Write db: {}", e)))?;
    Ok(())
}
