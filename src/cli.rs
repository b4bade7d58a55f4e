//! Command line: manifests in, schema documents out.
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::Parser;
use colored::Colorize;

use crate::errors::ErrorSink;
use crate::generator::{Generation, Generator};
use crate::graph::TypeGraph;
use crate::graph::manifest::Manifest;
use crate::markers::MarkerRegistry;
use crate::output::write_documents;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate JSON schema documents from annotated type declarations
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct CommandLineInterface {
    /// One or more type-graph manifests. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required_unless_present = "list_markers")]
    roots: Vec<String>,

    /// output directory (created if missing)
    #[arg(long, short, required_unless_present = "list_markers")]
    output: Option<PathBuf>,

    /// allow float32/float64 fields, which map to `number`
    #[arg(long)]
    allow_dangerous_types: bool,

    /// print the supported markers and exit
    #[arg(long)]
    list_markers: bool,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Generate and write every document. Documents are written even when
    /// errors were recorded; the exit code reports them.
    pub fn run(&self) -> anyhow::Result<ExitCode> {
        // debug path
        if self.no_op {
            eprintln!("{self:#?}");
            return Ok(ExitCode::SUCCESS);
        }

        let registry = MarkerRegistry::with_defaults();
        if self.list_markers {
            print_markers(&registry);
            return Ok(ExitCode::SUCCESS);
        }
        let Some(output) = self.output.as_deref() else {
            bail!("--output is required");
        };

        // 1) load the type graph
        let mut errors = ErrorSink::new();
        let graph = self.load_graph(&registry, &mut errors)?;

        // 2) synthesize & assemble
        let Generation { documents, errors: generation_errors } =
            Generator::new(self.allow_dangerous_types).generate(&graph);
        errors.extend(generation_errors);

        // 3) write
        let written = write_documents(output, &documents)
            .with_context(|| format!("failed to write documents to {}", output.display()))?;

        for error in errors.iter() {
            eprintln!("{} {error}", "error:".red().bold());
        }
        if !errors.is_empty() {
            eprintln!(
                "{} {} error(s) recorded; {} document(s) written to {}",
                "failed:".red().bold(),
                errors.len(),
                written.len(),
                output.display()
            );
            return Ok(ExitCode::FAILURE);
        }
        eprintln!(
            "{} {} document(s) written to {}",
            "ok:".green().bold(),
            written.len(),
            output.display()
        );
        Ok(ExitCode::SUCCESS)
    }

    fn load_graph(&self, registry: &MarkerRegistry, errors: &mut ErrorSink) -> anyhow::Result<TypeGraph> {
        let source_paths = resolve_file_path_patterns(&self.roots).context("failed to resolve root paths")?;
        let mut manifests = Vec::with_capacity(source_paths.len());
        for source_path in &source_paths {
            tracing::debug!(path = %source_path.display(), "loading manifest");
            manifests.push(Manifest::from_file(source_path)?);
        }
        let graph = TypeGraph::build(Manifest::merge(manifests), registry, errors)
            .context("failed to assemble the type graph")?;
        Ok(graph)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn print_markers(registry: &MarkerRegistry) {
    for definition in registry.definitions() {
        let targets: Vec<String> = definition.targets.iter().map(ToString::to_string).collect();
        println!(
            "{} {:<16} {}",
            format!("{:<48}", definition.name).bold(),
            targets.join(","),
            definition.help
        );
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                matched_any = true;
                out.push(entry?);
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_paths_pass_through_and_globs_expand() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("b.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("c.txt"), "").unwrap();

        let pattern = format!("{}/*.json", tmp.path().display());
        let paths = resolve_file_path_patterns([pattern.as_str(), "missing.json"]).unwrap();
        assert_eq!(
            paths,
            vec![tmp.path().join("a.json"), tmp.path().join("b.json"), PathBuf::from("missing.json")]
        );
    }

    #[test]
    fn empty_globs_are_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.json", tmp.path().display());
        assert!(resolve_file_path_patterns([pattern]).is_err());
    }

    #[test]
    fn flags_parse() {
        let cli = CommandLineInterface::try_parse_from([
            "json-schema-generator",
            "-r",
            "a.json",
            "b/*.json",
            "-o",
            "out",
            "--allow-dangerous-types",
        ])
        .unwrap();
        assert_eq!(cli.roots, vec!["a.json", "b/*.json"]);
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert!(cli.allow_dangerous_types);
        assert!(!cli.no_op);

        assert!(CommandLineInterface::try_parse_from(["json-schema-generator", "-o", "out"]).is_err());
        assert!(CommandLineInterface::try_parse_from(["json-schema-generator", "-r", "a.json"]).is_err());
        assert!(CommandLineInterface::try_parse_from(["json-schema-generator", "--list-markers"]).is_ok());
    }

    #[test]
    fn run_writes_documents_and_reports_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = tmp.path().join("graph.json");
        std::fs::write(
            &manifest,
            r#"{ "packages": [ { "path": "p", "name": "p", "markers": ["fybrik:validation:schema"],
                 "types": [ { "name": "T", "spec": { "struct": { "fields": [
                     { "name": "F", "tag": "f", "type": { "ident": "float64" } } ] } } } ] } ] }"#,
        )
        .unwrap();
        let out = tmp.path().join("out");
        let args = |extra: &[&'static str]| {
            let mut args = vec!["json-schema-generator", "-r", manifest.to_str().unwrap(), "-o", out.to_str().unwrap()];
            args.extend_from_slice(extra);
            CommandLineInterface::try_parse_from(args).unwrap()
        };

        assert_eq!(args(&[]).run().unwrap(), ExitCode::FAILURE);
        assert!(out.join("p.json").exists());

        assert_eq!(args(&["--allow-dangerous-types"]).run().unwrap(), ExitCode::SUCCESS);
    }
}
