//! orryc-driver - Compiler Driver
//!
//! ============================================================================
//! DRIVER OVERVIEW
//! ============================================================================
//!
//! The driver is the entry point and orchestrator for running a semantic
//! check over one or more source files. It is responsible for:
//!
//! 1. COMMAND LINE PARSING (see `main.rs`)
//!    - Parse the `check` subcommand and its global flags
//!    - Load `orryc.toml` if present
//!
//! 2. FILE MANAGEMENT
//!    - Read each source file named on the command line
//!
//! 3. PIPELINE ORCHESTRATION
//!    - Run lex -> parse -> semantic check over each file independently
//!    - A failure in one file does not stop the others from being checked
//!
//! 4. DIAGNOSTIC REPORTING
//!    - Render every diagnostic collected from a file to stderr
//!    - Track whether any error-level diagnostic was emitted, for the exit
//!      code
//!
//! ============================================================================
//! PIPELINE
//! ============================================================================
//!
//! ```text
//! Source file (.orr)
//!        |
//!        v
//!   [Lexer]  ──▶ Token stream
//!        |
//!        v
//!   [Parser] ──▶ AST
//!        |
//!        v
//!   [Semantic Analyzer] ──▶ HIR + Diagnostics
//! ```
//!
//! There is no MIR/LIR lowering or code generation here; this driver only
//! checks a program, it does not compile one to a binary. There is also no
//! persisted incremental cache, no wire protocol, and no IDE/LSP surface -
//! one process checks the files it was given and exits.
//!
//! ============================================================================
//! ERROR HANDLING
//! ============================================================================
//!
//! I/O and configuration failures (a source file that can't be read, a
//! malformed `orryc.toml`) are [`DriverError`]s and abort the run entirely.
//! Problems found *in* a checked program are [`orryc_util::Diagnostic`]s:
//! they are collected and rendered, and make the process exit nonzero, but
//! they never stop the other files in the batch from being checked.

pub mod config;
pub mod error;

use std::path::{Path, PathBuf};

use orryc_lex::{Lexer, Token};
use orryc_sem::SemanticAnalyzer;
use orryc_syntax::Parser;
use orryc_util::{
    DefIdGenerator, Diagnostic, Handler, Level, SourceMap,
};

pub use config::{Config, OutputFormat};
pub use error::{DriverError, Result};

/// Result of checking a single source file.
pub struct CheckOutcome {
    pub file: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
    pub source_map: SourceMap,
}

impl CheckOutcome {
    /// Whether this file has at least one error-level diagnostic.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level == Level::Error)
    }

    /// Whether this file has at least one warning-level diagnostic.
    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level == Level::Warning)
    }
}

/// Run lex -> parse -> semantic check over a single file.
pub fn check_file(path: &Path) -> Result<CheckOutcome> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| DriverError::SourceRead(path.to_path_buf(), e))?;

    tracing::debug!(file = %path.display(), "checking file");

    let mut source_map = SourceMap::new();
    source_map.add_file(path.display().to_string(), source.clone());

    let mut handler = Handler::new();

    let tokens = {
        let mut lexer = Lexer::new(&source, &mut handler);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            if token == Token::Eof {
                break;
            }
            tokens.push(token);
        }
        tokens
    };
    tracing::trace!(count = tokens.len(), "lexed tokens");

    let ast = {
        let mut parser = Parser::new(tokens, &mut handler);
        parser.parse()
    };
    tracing::trace!(count = ast.len(), "parsed items");

    let def_id_gen = DefIdGenerator::new();
    let mut type_context = orryc_sem::TypeContext::new(&def_id_gen);
    {
        let mut analyzer = SemanticAnalyzer::new(&mut type_context, &def_id_gen, &mut handler);
        analyzer.analyze_items(ast);
    }

    let diagnostics = handler.diagnostics();
    tracing::debug!(
        file = %path.display(),
        errors = handler.error_count(),
        warnings = handler.warning_count(),
        "finished checking file"
    );

    Ok(CheckOutcome {
        file: path.to_path_buf(),
        diagnostics,
        source_map,
    })
}

/// Check every file in `files`, rendering diagnostics to stderr as they are
/// produced. Returns whether the run should exit nonzero: any error-level
/// diagnostic, or any warning when `config.warnings_as_errors` is set.
pub fn run_check(files: &[PathBuf], config: &Config) -> Result<bool> {
    let mut any_failures = false;

    for path in files {
        let outcome = check_file(path)?;

        let fails_run = outcome.has_errors()
            || (config.warnings_as_errors && outcome.has_warnings());
        any_failures |= fails_run;

        for diagnostic in &outcome.diagnostics {
            eprintln!(
                "{}",
                render_diagnostic(diagnostic, &outcome.source_map, config.output_format)
            );
        }
    }

    Ok(any_failures)
}

/// Render one diagnostic as a string, in the configured format.
pub fn render_diagnostic(
    diagnostic: &Diagnostic,
    source_map: &SourceMap,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Short => render_short(diagnostic),
        OutputFormat::Human => render_human(diagnostic, source_map),
    }
}

fn render_short(diagnostic: &Diagnostic) -> String {
    match &diagnostic.code {
        Some(code) => format!(
            "{}[{}]: {}",
            diagnostic.level,
            code.as_str(),
            diagnostic.message
        ),
        None => format!("{}: {}", diagnostic.level, diagnostic.message),
    }
}

fn render_human(diagnostic: &Diagnostic, source_map: &SourceMap) -> String {
    let mut out = match &diagnostic.code {
        Some(code) => format!(
            "{}[{}]: {}\n",
            diagnostic.level,
            code.as_str(),
            diagnostic.message
        ),
        None => format!("{}: {}\n", diagnostic.level, diagnostic.message),
    };

    match source_map.format_span(diagnostic.span) {
        Some(located) => {
            for line in located.lines() {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
        }
        None => out.push_str("  (no source location)\n"),
    }

    for note in &diagnostic.notes {
        out.push_str(&format!("  note: {}\n", note));
    }
    for help in &diagnostic.helps {
        out.push_str(&format!("  help: {}\n", help));
    }

    out.pop(); // drop the trailing newline, eprintln! adds its own
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use std::io::Write;

    fn write_source(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn well_formed_program_has_no_diagnostics() {
        let file = write_source("fn main() -> int { 0 }");
        let outcome = check_file(file.path()).unwrap();
        assert!(!outcome.has_errors());
    }

    #[test]
    fn missing_file_is_a_driver_error() {
        let result = check_file(Path::new("/nonexistent/source.orr"));
        assert!(matches!(result, Err(DriverError::SourceRead(_, _))));
    }

    #[test]
    fn run_check_reports_failure_across_multiple_files() {
        let good = write_source("fn main() -> int { 0 }");
        let files = vec![good.path().to_path_buf()];
        let config = Config::default();
        let any_failures = run_check(&files, &config).unwrap();
        assert!(!any_failures);
    }

    #[test]
    fn short_format_includes_diagnostic_code_when_present() {
        use orryc_util::{DiagnosticCode, Span};
        let diag = Diagnostic::error("boom", Span::DUMMY).with_code(DiagnosticCode::E0001);
        let rendered = render_short(&diag);
        assert!(rendered.contains("E0001"));
        assert!(rendered.contains("boom"));
    }
}
