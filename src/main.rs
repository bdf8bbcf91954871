//! protodoc: extract documented entities and their prototypes from source files.
//!
//! Supports two modes:
//!
//! - **stdin mode**: `protodoc -l pascal < unit.pas`
//! - **file mode**: `protodoc -o docs/api src/*.c include/`

use anyhow::{Context, Result};
use clap::Parser;
use protodoc::cancel::{Cancellation, Deadline, Never};
use protodoc::config::Registry;
use protodoc::model::FileDoc;
use protodoc::pipeline::Pipeline;
use protodoc::profile::LanguageProfile;
use protodoc::render;
use protodoc::Outcome;
use rayon::prelude::*;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "protodoc",
    about = "Extract documented entities, prototypes and symbols from source files"
)]
struct Cli {
    /// Input files, directories or glob patterns. If omitted, reads from stdin.
    files: Vec<String>,

    /// Output directory (required when files are given)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Language to parse as. Defaults to detection by extension, or c for stdin.
    #[arg(short = 'l', long)]
    language: Option<String>,

    /// TOML file adding or replacing languages and entity kinds
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Output format: json (default), text
    #[arg(short = 'f', long, default_value = "json")]
    format: String,

    /// Give up on a file after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log progress to stderr
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = match &cli.config {
        Some(path) => Registry::load(path)
            .with_context(|| format!("failed to load config: {}", path.display()))?,
        None => Registry::default(),
    };

    if cli.files.is_empty() {
        return stdin_mode(&cli, &registry);
    }

    file_mode(&cli, &registry)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "protodoc=debug" } else { "protodoc=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// stdin mode: read one file from stdin and write the rendering to stdout.
fn stdin_mode(cli: &Cli, registry: &Registry) -> Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;

    let profile = registry.by_name(cli.language.as_deref().unwrap_or("c"))?;
    let renderer = render::create_renderer(&cli.format)?;
    match extract(registry, profile, "<stdin>", &input, cli.timeout_ms)? {
        Outcome::Completed(doc) => print!("{}", renderer.render(&doc)),
        Outcome::Cancelled => anyhow::bail!("timed out parsing stdin"),
    }
    Ok(())
}

/// file mode: process every input in parallel and write one output per file.
fn file_mode(cli: &Cli, registry: &Registry) -> Result<()> {
    let output_dir = cli
        .output
        .as_deref()
        .context("--output is required when files are given")?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory: {}", output_dir.display()))?;

    let renderer = render::create_renderer(&cli.format)?;
    let forced = cli
        .language
        .as_deref()
        .map(|name| registry.by_name(name))
        .transpose()?;

    let input_files = expand_globs(&cli.files, registry)?;

    let parsed: Vec<(PathBuf, FileDoc)> = input_files
        .par_iter()
        .map(|path| -> Result<Option<(PathBuf, FileDoc)>> {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let profile = match forced {
                Some(profile) => profile,
                None => match registry.for_path(path) {
                    Ok(profile) => profile,
                    Err(e) => {
                        warn!("skipping {}: {}", path.display(), e);
                        return Ok(None);
                    }
                },
            };
            let source = path.to_string_lossy();
            match extract(registry, profile, &source, &content, cli.timeout_ms) {
                Ok(Outcome::Completed(doc)) => Ok(Some((path.clone(), doc))),
                Ok(Outcome::Cancelled) => {
                    warn!("skipping {}: timed out", path.display());
                    Ok(None)
                }
                Err(e) => {
                    warn!("skipping {}: {}", path.display(), e);
                    Ok(None)
                }
            }
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect();

    let ext = renderer.file_extension();
    for (path, doc) in &parsed {
        let name = derive_output_name(&path.to_string_lossy());
        let out_path = output_dir.join(format!("{}.{}", name, ext));
        fs::write(&out_path, renderer.render(doc))
            .with_context(|| format!("failed to write {}", out_path.display()))?;
    }
    info!(files = parsed.len(), "done");

    Ok(())
}

/// Run the pipeline for one file under the optional time budget.
fn extract(
    registry: &Registry,
    profile: &LanguageProfile,
    path: &str,
    content: &str,
    timeout_ms: Option<u64>,
) -> Result<Outcome<FileDoc>> {
    let deadline = timeout_ms.map(|ms| Deadline::after(Duration::from_millis(ms)));
    let cancel: &dyn Cancellation = match &deadline {
        Some(deadline) => deadline,
        None => &Never,
    };
    let pipeline = Pipeline::new(profile, registry.kinds())?;
    Ok(pipeline.parse(path, content, cancel)?)
}

/// Expand glob patterns into a list of real file paths.
/// Bare directories are scanned (non-recursively) for extensions a language handles.
fn expand_globs(patterns: &[String], registry: &Registry) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            files.push(path.to_path_buf());
            continue;
        }
        if path.is_dir() {
            let entries = fs::read_dir(path)
                .with_context(|| format!("failed to read directory: {}", path.display()))?;
            for entry in entries.flatten() {
                let p = entry.path();
                if p.is_file() && registry.for_path(&p).is_ok() {
                    files.push(p);
                }
            }
            continue;
        }
        let matches: Vec<_> = glob::glob(pattern)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect();
        if matches.is_empty() {
            warn!("no files matched: {}", pattern);
        }
        files.extend(matches);
    }
    // Sort for deterministic output
    files.sort();
    files.dedup();
    Ok(files)
}

/// Derive the output file name (without the output extension) from a source path.
/// "src/stack.c" → "stack.c", keeping the source extension so `a.c` and `a.h` differ.
fn derive_output_name(source: &str) -> String {
    source
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_keeps_source_extension() {
        assert_eq!(derive_output_name("src/stack.c"), "stack.c");
        assert_eq!(derive_output_name("stack.h"), "stack.h");
        assert_eq!(derive_output_name("Makefile"), "Makefile");
    }

    #[test]
    fn directories_are_filtered_by_language() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.c"), "").unwrap();
        fs::write(dir.path().join("b.pas"), "").unwrap();
        fs::write(dir.path().join("notes.xyz"), "").unwrap();

        let files = expand_globs(&[dir.path().to_string_lossy().to_string()], &Registry::default()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.c", "b.pas"]);
    }

    #[test]
    fn globs_are_sorted_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.c"), "").unwrap();
        fs::write(dir.path().join("a.c"), "").unwrap();
        let pattern = format!("{}/*.c", dir.path().display());

        let files = expand_globs(&[pattern.clone(), pattern], &Registry::default()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0] < files[1]);
    }

    #[test]
    fn extract_honors_timeout() {
        let registry = Registry::default();
        let profile = registry.by_name("c").unwrap();
        let outcome = extract(&registry, profile, "x.c", "// Function: F\nint F ();\n", Some(0)).unwrap();
        assert!(outcome.is_cancelled());
    }
}
