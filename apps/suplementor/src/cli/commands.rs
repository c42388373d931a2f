//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands. Every
//! command except `server` opens the redb database directly; `server` hands
//! a lazy connection to the API so the file is only opened on first request.

use crate::api;
use crate::config::ServerConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use suplementor_core::{
    GraphStore, HistoryFilter, HistoryRouter, HistoryStore, LazyConnection, RedbStore,
    SearchHistoryInput, SearchMode, SeedBundle, SharedStore, SuplementorError, TimelineInput,
    formats::MAX_SEED_BUNDLE_SIZE,
};

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), SuplementorError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| SuplementorError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(SuplementorError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path, following symlinks and "..", and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, SuplementorError> {
    let canonical = path.canonicalize().map_err(|e| {
        SuplementorError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(SuplementorError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path: the parent directory must already exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, SuplementorError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        SuplementorError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(SuplementorError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| SuplementorError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: ServerConfig) -> Result<(), SuplementorError> {
    println!("Suplementor Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:       {}", config.host);
    println!("  Port:       {}", config.port);
    println!("  Database:   {:?}", config.database);
    println!(
        "  Rate limit: {}",
        if config.rate_limit == 0 {
            "disabled".to_string()
        } else {
            format!("{}/s", config.rate_limit)
        }
    );
    println!();
    println!("Endpoints:");
    println!("  GET  /health               - Health check");
    println!("  GET  /status               - Content counts");
    println!("  POST /history/{{list,get,by-system,timeline,related,search}}");
    println!("  POST /knowledge/{{graph,node,related,search,path,filter}}");
    println!("  GET  /knowledge/statistics - Graph statistics");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let connection = lazy_redb_connection(config.database.clone());
    api::run_server(&config, connection).await
}

/// A connection that opens the redb database on first use.
pub fn lazy_redb_connection(db_path: PathBuf) -> LazyConnection {
    LazyConnection::new(move || {
        let store: SharedStore = Arc::new(RedbStore::open(&db_path)?);
        Ok(store)
    })
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show content counts.
pub fn cmd_status(db_path: &Path, json_mode: bool) -> Result<(), SuplementorError> {
    let store = RedbStore::open(db_path)?;
    let history = store.count_history(&HistoryFilter::default())?;
    let nodes = store.node_count()?;
    let relationships = store.relationship_count()?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": db_path.to_string_lossy(),
            "historyEntries": history,
            "nodes": nodes,
            "relationships": relationships,
        }));
        return Ok(());
    }

    println!("Suplementor Content Status");
    println!("==========================");
    println!("Database: {:?}", db_path);
    println!();
    println!("History entries: {}", history);
    println!("Nodes:           {}", nodes);
    println!("Relationships:   {}", relationships);

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty database.
pub fn cmd_init(db_path: &Path, force: bool) -> Result<(), SuplementorError> {
    if db_path.exists() {
        if !force {
            return Err(SuplementorError::IoError(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| SuplementorError::IoError(format!("Remove old database: {}", e)))?;
    }

    let _store = RedbStore::open(db_path)?;
    println!("Initialized new database at {:?}", db_path);
    Ok(())
}

// =============================================================================
// SEED COMMAND
// =============================================================================

/// Load a seed bundle into the database.
pub fn cmd_seed(db_path: &Path, json_mode: bool, file: &Path) -> Result<(), SuplementorError> {
    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_SEED_BUNDLE_SIZE as u64)?;

    let text = std::fs::read_to_string(&validated_path)
        .map_err(|e| SuplementorError::IoError(format!("Read file: {}", e)))?;
    let bundle = SeedBundle::from_json(&text)?;

    let mut store = RedbStore::open(db_path)?;
    let summary = bundle.apply_to(&mut store)?;
    store.compact()?;

    if json_mode {
        print_json(&summary);
        return Ok(());
    }

    println!(
        "Seeded {} nodes, {} relationships, {} history entries",
        summary.nodes, summary.relationships, summary.history
    );
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Write the whole database as a seed bundle.
pub fn cmd_export(db_path: &Path, output: &Path) -> Result<(), SuplementorError> {
    let validated_output = validate_output_path(output)?;

    let store = RedbStore::open(db_path)?;
    let bundle = SeedBundle::from_store(&store)?;
    let data = bundle.to_json()?;

    std::fs::write(&validated_output, data)
        .map_err(|e| SuplementorError::IoError(format!("Write file: {}", e)))?;

    println!(
        "Exported {} nodes, {} relationships, {} history entries to {:?}",
        bundle.nodes.len(),
        bundle.relationships.len(),
        bundle.history.len(),
        validated_output
    );
    Ok(())
}

// =============================================================================
// SEARCH COMMAND
// =============================================================================

/// Search history entries.
pub fn cmd_search(
    db_path: &Path,
    json_mode: bool,
    query: String,
    limit: Option<i64>,
) -> Result<(), SuplementorError> {
    let store = RedbStore::open(db_path)?;
    let result = HistoryRouter::new(&store).search(&SearchHistoryInput { query, limit })?;

    if json_mode {
        print_json(&result);
        return Ok(());
    }

    let mode = match result.mode {
        SearchMode::Ranked => "ranked",
        SearchMode::Fallback => "substring fallback",
    };
    println!("{} result(s) ({})", result.entries.len(), mode);
    for entry in &result.entries {
        println!(
            "  {:>6}  {:<12} {}  [{}]",
            entry.era_start_year,
            entry.medicine_system.as_str(),
            entry.title,
            entry.id
        );
    }
    Ok(())
}

// =============================================================================
// TIMELINE COMMAND
// =============================================================================

/// Print the timeline, optionally for one medicine system.
pub fn cmd_timeline(
    db_path: &Path,
    json_mode: bool,
    system: Option<String>,
) -> Result<(), SuplementorError> {
    let store = RedbStore::open(db_path)?;
    let timeline = HistoryRouter::new(&store).get_timeline(&TimelineInput { system })?;

    if json_mode {
        print_json(&timeline);
        return Ok(());
    }

    for entry in &timeline {
        println!(
            "  {:>6} - {:<6}  {:<12} {}",
            entry.era_start_year,
            entry.era_end_year,
            entry.medicine_system.as_str(),
            entry.title
        );
    }
    if timeline.is_empty() {
        println!("No history entries");
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BUNDLE: &str = r##"{
        "history": [{
            "id": "h-ginseng",
            "title": "Ginseng in the Shennong Bencao",
            "polishTitle": "Żeń-szeń w Shennong Bencao",
            "era": "Han Dynasty",
            "eraStartYear": -206,
            "eraEndYear": 220,
            "medicineSystem": "TCM",
            "description": "Ginseng listed as a superior herb",
            "polishDescription": "Żeń-szeń jako zioło najwyższej klasy"
        }]
    }"##;

    #[test]
    fn test_validate_file_path_rejects_directory() {
        let dir = TempDir::new().expect("tempdir");
        assert!(validate_file_path(dir.path()).is_err());
    }

    #[test]
    fn test_validate_file_size() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("seed.json");
        std::fs::write(&path, "0123456789").expect("write");
        assert!(validate_file_size(&path, 10).is_ok());
        assert!(validate_file_size(&path, 9).is_err());
    }

    #[test]
    fn test_validate_output_path_bare_filename() {
        let resolved = validate_output_path(Path::new("export.json")).expect("cwd parent");
        assert!(resolved.ends_with("export.json"));
        assert!(validate_output_path(Path::new("/nonexistent-dir/x.json")).is_err());
    }

    #[test]
    fn test_init_refuses_existing_without_force() {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("content.db");
        cmd_init(&db, false).expect("first init");
        assert!(cmd_init(&db, false).is_err());
        cmd_init(&db, true).expect("forced init");
    }

    #[test]
    fn test_seed_then_export() {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("content.db");
        let seed = dir.path().join("seed.json");
        let out = dir.path().join("export.json");
        std::fs::write(&seed, BUNDLE).expect("write seed");

        cmd_seed(&db, true, &seed).expect("seed");
        cmd_export(&db, &out).expect("export");

        let exported = std::fs::read_to_string(&out).expect("read export");
        let bundle = SeedBundle::from_json(&exported).expect("parse export");
        assert_eq!(bundle.history.len(), 1);
        assert_eq!(bundle.history[0].id, "h-ginseng");
    }

    #[test]
    fn test_invalid_seed_writes_nothing() {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("content.db");
        let seed = dir.path().join("seed.json");
        std::fs::write(&seed, BUNDLE.replace("-206", "500")).expect("write seed");

        let err = cmd_seed(&db, false, &seed).expect_err("era start after end");
        assert!(err.is_validation());

        let store = RedbStore::open(&db).expect("open");
        assert_eq!(store.count_history(&HistoryFilter::default()).expect("count"), 0);
    }

    #[test]
    fn test_lazy_connection_defers_open() {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("lazy.db");
        let connection = lazy_redb_connection(db.clone());
        assert!(!db.exists());
        assert!(!connection.is_connected());

        let store = connection.get().expect("open");
        assert_eq!(store.node_count().expect("count"), 0);
        assert!(db.exists());
    }
}
