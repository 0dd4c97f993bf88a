//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::shell::{run_shell, write_admission, write_lineage};
use crate::api::{self, AppState, ConceptJson, LineageResponse, StatusResponse};
use crate::config::LedgerConfig;
use crate::unix_timestamp;
use serde::Serialize;
use slp_core::{
    ConceptId, Ledger, LedgerMetrics, SlpError, Submission, records_from_bytes, records_to_bytes,
    run_synthetic_sequence,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum payload file size for synthetic runs (100 MB).
const MAX_SYNTHETIC_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum snapshot file size for import (500 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Maximum number of payloads in one synthetic run.
const MAX_SYNTHETIC_PAYLOADS: usize = 100_000;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), SlpError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| SlpError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(SlpError::InvalidInput(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, SlpError> {
    let canonical = path.canonicalize().map_err(|e| {
        SlpError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(SlpError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent of an output path and require it to be a directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, SlpError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        SlpError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(SlpError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| SlpError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &impl Serialize) -> Result<(), SlpError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| SlpError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

/// Open (or create) the redb ledger at `db_path`.
pub fn open_ledger(db_path: &Path) -> Result<Ledger, SlpError> {
    tracing::debug!(database = %db_path.display(), "Opening ledger");
    Ledger::with_redb(db_path)
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    db_path: &Path,
    config: &LedgerConfig,
    host: &str,
    port: u16,
) -> Result<(), SlpError> {
    let ledger = open_ledger(db_path)?;
    let concept_count = ledger.len();
    let state = AppState::from_config(ledger, config)?;

    println!("Semantic Ledger Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:      {}", host);
    println!("  Port:      {}", port);
    println!("  Database:  {:?}", db_path);
    println!("  Embedding: {}", config.params.embedding_version);
    println!("  Concepts:  {}", concept_count);
    println!();
    println!("Endpoints:");
    println!("  POST /concepts      - Submit a concept");
    println!("  GET  /concepts/{{id}} - Look up a concept");
    println!("  GET  /lineage/{{id}}  - Lineage chain");
    println!("  GET  /status        - Ledger metrics");
    println!("  GET  /export        - Snapshot export");
    println!("  GET  /health        - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show ledger metrics.
pub fn cmd_status(db_path: &Path, json_mode: bool) -> Result<(), SlpError> {
    let ledger = open_ledger(db_path)?;
    let metrics = LedgerMetrics::from_state(ledger.state());

    if json_mode {
        return print_json(&StatusResponse::from(metrics));
    }

    println!("Semantic Ledger Status");
    println!("======================");
    println!("Database: {:?}", db_path);
    println!();
    println!("Concepts:         {}", metrics.concept_count);
    for (version, count) in &metrics.per_version {
        println!("  {:<16}{}", version, count);
    }
    println!("Roots:            {}", metrics.root_count);
    println!("Near duplicates:  {}", metrics.near_duplicate_count);
    println!("Max lineage:      {}", metrics.max_lineage_depth);
    match metrics.mean_novelty {
        Some(mean) => println!("Mean novelty:     {:.4}", mean),
        None => println!("Mean novelty:     -"),
    }

    Ok(())
}

// =============================================================================
// SUBMIT COMMAND
// =============================================================================

/// Arguments of `slp submit`.
#[derive(Debug, Clone)]
pub struct SubmitArgs {
    pub text: String,
    pub authors: Vec<String>,
    pub references: Vec<String>,
    pub timestamp: Option<f64>,
}

/// Submit one concept to the persistent ledger.
pub fn cmd_submit(
    db_path: &Path,
    config: &LedgerConfig,
    json_mode: bool,
    verbose: bool,
    args: SubmitArgs,
) -> Result<(), SlpError> {
    let mut ledger = open_ledger(db_path)?;
    let embedder = config.build_embedder()?;

    let mut submission = Submission::new(
        args.text,
        args.authors,
        args.timestamp.unwrap_or_else(unix_timestamp),
    )?;
    if !args.references.is_empty() {
        submission = submission.with_references(args.references)?;
    }

    let result = ledger.submit(&submission, &config.params, &embedder)?;
    tracing::info!(
        concept_id = %result.concept.id(),
        novelty_score = result.concept.novelty_score(),
        near_duplicate = result.concept.is_near_duplicate(),
        "Concept admitted"
    );

    if json_mode {
        let output = serde_json::json!({
            "concept": ConceptJson::from_concept(&result.concept, Some(submission.payload().to_string())),
            "novelty": result.novelty,
        });
        return print_json(&output);
    }

    let lineage = ledger.lineage(result.concept.id());
    write_admission(&mut std::io::stdout().lock(), &result, &lineage, verbose)
}

// =============================================================================
// SHOW / LINEAGE COMMANDS
// =============================================================================

/// Show one concept with its stored payload.
pub fn cmd_show(db_path: &Path, json_mode: bool, id: &str) -> Result<(), SlpError> {
    let ledger = open_ledger(db_path)?;
    let id = ConceptId::new(id);
    let concept = ledger
        .get(&id)
        .ok_or_else(|| SlpError::ConceptNotFound(id.clone()))?;
    let json = ConceptJson::from_concept(concept, ledger.payload(&id)?);

    if json_mode {
        return print_json(&json);
    }

    println!("ID:               {}", json.id);
    println!("Embedding:        {}", json.embedding_version);
    println!("Authorship:       {}", json.authorship.join(", "));
    println!("Timestamp:        {}", json.timestamp);
    println!("Novelty score N:  {:.4}", json.novelty_score);
    println!("Near duplicate:   {}", json.is_near_duplicate);
    if let Some(dup) = &json.primary_duplicate_id {
        println!("Duplicate of:     {}", dup);
    }
    println!("Parents:          {:?}", json.parents);
    if !json.submission_references.is_empty() {
        println!("References:       {:?}", json.submission_references);
    }
    if let Some(payload) = &json.payload {
        println!();
        println!("{}", payload);
    }

    Ok(())
}

/// Show the lineage chain of a concept.
pub fn cmd_lineage(db_path: &Path, json_mode: bool, id: &str) -> Result<(), SlpError> {
    let ledger = open_ledger(db_path)?;
    let id = ConceptId::new(id);
    let chain = ledger.lineage(&id);
    if chain.is_empty() {
        return Err(SlpError::ConceptNotFound(id));
    }

    if json_mode {
        return print_json(&LineageResponse::with_chain(&chain));
    }
    write_lineage(&mut std::io::stdout().lock(), &chain)
}

// =============================================================================
// SHELL COMMAND
// =============================================================================

/// Run the interactive shell against the persistent ledger.
pub fn cmd_shell(db_path: &Path, config: &LedgerConfig, verbose: bool) -> Result<(), SlpError> {
    let mut ledger = open_ledger(db_path)?;
    let embedder = config.build_embedder()?;
    tracing::info!(concepts = ledger.len(), "Shell started");

    let stdin = std::io::stdin();
    let admitted = run_shell(
        &mut ledger,
        config,
        &embedder,
        stdin.lock(),
        &mut std::io::stdout().lock(),
        verbose,
    )?;

    tracing::info!(admitted, "Shell finished");
    Ok(())
}

// =============================================================================
// SYNTHETIC COMMAND
// =============================================================================

/// Run a payload file through a fresh in-memory ledger.
///
/// One payload per line; blank lines are skipped. Nothing is persisted.
pub fn cmd_synthetic(
    config: &LedgerConfig,
    json_mode: bool,
    file: &Path,
    authors: &[String],
) -> Result<(), SlpError> {
    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_SYNTHETIC_FILE_SIZE)?;

    let contents = std::fs::read_to_string(&validated_path)
        .map_err(|e| SlpError::IoError(format!("Read file: {}", e)))?;
    let payloads: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if payloads.len() > MAX_SYNTHETIC_PAYLOADS {
        return Err(SlpError::InvalidInput(format!(
            "Payload count {} exceeds maximum allowed {}",
            payloads.len(),
            MAX_SYNTHETIC_PAYLOADS
        )));
    }

    tracing::info!(file = %validated_path.display(), payloads = payloads.len(), "Synthetic run");

    let embedder = config.build_embedder()?;
    let result =
        run_synthetic_sequence(&payloads, authors, &config.params, &embedder, unix_timestamp())?;

    if json_mode {
        return print_json(&result);
    }

    println!("Synthetic run: {} concepts", result.concept_ids.len());
    for (i, (id, score)) in result
        .concept_ids
        .iter()
        .zip(&result.novelty_scores)
        .enumerate()
    {
        println!("{:>5}  {}  N={:.4}", i, id, score);
    }
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export the ledger as a snapshot file.
pub fn cmd_export(db_path: &Path, output: &Path) -> Result<(), SlpError> {
    let validated_output = validate_output_path(output)?;

    let ledger = open_ledger(db_path)?;
    let records = ledger.records()?;
    let data = records_to_bytes(&records)?;

    std::fs::write(&validated_output, &data)
        .map_err(|e| SlpError::IoError(format!("Write file: {}", e)))?;

    println!(
        "Exported {} concepts ({} bytes) to {:?}",
        records.len(),
        data.len(),
        validated_output
    );
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Import a snapshot file into the ledger.
pub fn cmd_import(db_path: &Path, input: &Path) -> Result<(), SlpError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| SlpError::IoError(format!("Read file: {}", e)))?;
    let records = records_from_bytes(&data)?;
    let total = records.len();

    let mut ledger = open_ledger(db_path)?;
    let imported = ledger.import(records)?;

    println!(
        "Imported {} of {} concepts ({} already present)",
        imported,
        total,
        total - imported
    );
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty database.
pub fn cmd_init(db_path: &Path, force: bool) -> Result<(), SlpError> {
    if db_path.exists() {
        if !force {
            return Err(SlpError::InvalidInput(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| SlpError::IoError(format!("Remove database: {}", e)))?;
    }

    let _ledger = open_ledger(db_path)?;
    println!("Initialized new redb database at {:?}", db_path);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
