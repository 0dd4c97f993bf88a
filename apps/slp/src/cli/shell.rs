//! # Interactive Shell
//!
//! Line-oriented loop: each non-empty line becomes a submission by
//! `shell-user`, is admitted (and persisted when the ledger is), and the
//! resulting concept is printed with its lineage.

use crate::config::LedgerConfig;
use slp_core::{Concept, Embedder, IntegrateResult, Ledger, SlpError, Submission};
use std::io::{BufRead, Write};

/// Authorship recorded for every shell submission.
pub const SHELL_AUTHOR: &str = "shell-user";

fn io_err(e: std::io::Error) -> SlpError {
    SlpError::IoError(e.to_string())
}

/// Print an admitted concept followed by its lineage chain.
pub fn write_admission(
    out: &mut impl Write,
    result: &IntegrateResult,
    lineage: &[&Concept],
    verbose: bool,
) -> Result<(), SlpError> {
    let concept = &result.concept;
    let metadata = concept.metadata();

    writeln!(out, "\n=== Concept Integrated ===").map_err(io_err)?;
    writeln!(out, "ID: {}", concept.id()).map_err(io_err)?;
    writeln!(out, "Novelty score N: {:.4}", concept.novelty_score()).map_err(io_err)?;
    writeln!(out, "Timestamp: {}", metadata.timestamp).map_err(io_err)?;
    writeln!(out, "Near duplicate: {}", metadata.is_near_duplicate).map_err(io_err)?;
    if let Some(dup) = &metadata.primary_duplicate_id {
        writeln!(out, "Primary duplicate ID: {}", dup).map_err(io_err)?;
    }
    let parents: Vec<&str> = concept.parents().iter().map(|p| p.as_str()).collect();
    writeln!(out, "Parents: {:?}", parents).map_err(io_err)?;

    if verbose {
        let n = &result.novelty;
        writeln!(
            out,
            "Components: d_min={:?} rho_r={} n_d={:.4} n_rho={:.4}",
            n.d_min, n.rho_r, n.n_d, n.n_rho
        )
        .map_err(io_err)?;
        for neighbor in &result.neighbors {
            writeln!(
                out,
                "  neighbor {} (d={:.4})",
                neighbor.concept.id(),
                neighbor.distance
            )
            .map_err(io_err)?;
        }
    }

    write_lineage(out, lineage)?;
    writeln!(out).map_err(io_err)
}

/// Print a lineage chain, newest first.
pub fn write_lineage(out: &mut impl Write, lineage: &[&Concept]) -> Result<(), SlpError> {
    writeln!(out, "\nLineage (from newest to root):").map_err(io_err)?;
    for (idx, c) in lineage.iter().enumerate() {
        let marker = if idx > 0 { "->" } else { "  " };
        writeln!(out, "{} {} (N={:.4})", marker, c.id(), c.novelty_score()).map_err(io_err)?;
    }
    Ok(())
}

/// Run the shell until `/quit`, `/exit` or end of input.
///
/// A failed submission is reported and the loop continues.
pub fn run_shell<E: Embedder + ?Sized>(
    ledger: &mut Ledger,
    config: &LedgerConfig,
    embedder: &E,
    input: impl BufRead,
    out: &mut impl Write,
    verbose: bool,
) -> Result<usize, SlpError> {
    writeln!(out, "Semantic Ledger - Concept Shell").map_err(io_err)?;
    writeln!(out, "Type text and press Enter to submit as a concept.").map_err(io_err)?;
    writeln!(out, "Commands: /quit or /exit to leave, /help for help.\n").map_err(io_err)?;

    let mut admitted = 0;
    for line in input.lines() {
        let line = line.map_err(io_err)?;
        let text = line.trim_end_matches(['\r', '\n']);
        if text.trim().is_empty() {
            continue;
        }
        match text {
            "/quit" | "/exit" => break,
            "/help" => {
                writeln!(out, "Enter any non-empty line to submit it as a new concept.")
                    .map_err(io_err)?;
                writeln!(out, "The system will output a novelty score and lineage chain.\n")
                    .map_err(io_err)?;
                continue;
            }
            _ => {}
        }

        let outcome = Submission::new(text, vec![SHELL_AUTHOR.to_string()], crate::unix_timestamp())
            .and_then(|s| ledger.submit(&s, &config.params, embedder));
        match outcome {
            Ok(result) => {
                admitted += 1;
                let lineage = ledger.lineage(result.concept.id());
                write_admission(out, &result, &lineage, verbose)?;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Shell submission rejected");
                writeln!(out, "Error: {}\n", e).map_err(io_err)?;
            }
        }
    }

    writeln!(out, "Exiting shell.").map_err(io_err)?;
    Ok(admitted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> (Ledger, usize, String) {
        let config = LedgerConfig::default();
        let embedder = config.build_embedder().expect("embedder");
        let mut ledger = Ledger::new();
        let mut out = Vec::new();
        let admitted = run_shell(
            &mut ledger,
            &config,
            &embedder,
            input.as_bytes(),
            &mut out,
            false,
        )
        .expect("shell");
        (ledger, admitted, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn submits_lines_until_quit() {
        let (ledger, admitted, out) = run("first idea\n\n   \nsecond idea\n/quit\nignored\n");

        assert_eq!(admitted, 2);
        assert_eq!(ledger.len(), 2);
        assert_eq!(out.matches("=== Concept Integrated ===").count(), 2);
        assert!(out.ends_with("Exiting shell.\n"));
    }

    #[test]
    fn help_does_not_submit() {
        let (ledger, admitted, out) = run("/help\n/exit\n");

        assert_eq!(admitted, 0);
        assert!(ledger.is_empty());
        assert!(out.contains("Enter any non-empty line"));
    }

    #[test]
    fn repeated_line_shows_duplicate_and_lineage() {
        let (ledger, _, out) = run("same words\nsame words\n");

        let last = ledger.state().iter().last().expect("concept");
        assert!(last.is_near_duplicate());
        assert_eq!(last.authorship(), [SHELL_AUTHOR.to_string()]);
        assert!(out.contains("Primary duplicate ID: c-"));
        assert!(out.contains("-> c-"));
    }
}
