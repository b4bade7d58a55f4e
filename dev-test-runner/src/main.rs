//! Runs every case under `cases/`: generate documents from the case's
//! manifests, then check that `valid/*.json` instances pass and
//! `invalid/*.json` instances fail against the case's document.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, anyhow, bail};
use colored::Colorize;
use json_schema_generator::{ErrorSink, Generation, Generator, Manifest, MarkerRegistry, TypeGraph};
use jsonschema::{Draft, Retrieve, Uri, Validator};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Case {
    /// Manifest paths, relative to the case directory.
    manifests: Vec<PathBuf>,
    /// Document the instances are validated against.
    document: String,
    #[serde(default)]
    allow_dangerous_types: bool,
}

struct Documents(HashMap<String, Value>);

impl Retrieve for Documents {
    fn retrieve(&self, uri: &Uri<&str>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let name = uri.as_str().rsplit('/').next().unwrap_or_default();
        match self.0.get(name) {
            Some(doc) => Ok(doc.clone()),
            None => Err(format!("no generated document for {}", uri.as_str()).into()),
        }
    }
}

fn main() -> ExitCode {
    let cases_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("cases"));

    match run_all(&cases_dir) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            eprintln!("{} {failures} mismatch(es)", "FAILED".red().bold());
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run_all(cases_dir: &Path) -> anyhow::Result<usize> {
    let pattern = format!("{}/*/case.json", cases_dir.display());
    let mut failures = 0;
    let mut ran = 0;
    for entry in glob::glob(&pattern)? {
        let case_file = entry?;
        let case_dir = case_file.parent().ok_or_else(|| anyhow!("case file without directory"))?;
        failures += run_case(case_dir).with_context(|| format!("case {}", case_dir.display()))?;
        ran += 1;
    }
    if ran == 0 {
        bail!("no cases found under {}", cases_dir.display());
    }
    Ok(failures)
}

fn run_case(case_dir: &Path) -> anyhow::Result<usize> {
    let source = std::fs::read_to_string(case_dir.join("case.json"))?;
    let de = &mut serde_json::Deserializer::from_str(&source);
    let case: Case = serde_path_to_error::deserialize(de).context("invalid case.json")?;
    let name = case_dir.file_name().unwrap_or_default().to_string_lossy();
    println!("{} {name}", "case".cyan().bold());

    let generation = generate(case_dir, &case)?;
    let mut failures = 0;
    if generation.failed() {
        for error in generation.errors.iter() {
            println!("  {} {error}", "generation error:".red());
        }
        failures += generation.errors.len();
    }

    let validator = build_validator(&generation, &case.document)?;
    for (expect_valid, subdir) in [(true, "valid"), (false, "invalid")] {
        let pattern = format!("{}/{subdir}/*.json", case_dir.display());
        for entry in glob::glob(&pattern)? {
            let path = entry?;
            let instance: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)
                .with_context(|| format!("instance {}", path.display()))?;
            let errors: Vec<String> = validator.iter_errors(&instance).map(|e| e.to_string()).collect();
            let label = format!("{subdir}/{}", path.file_name().unwrap_or_default().to_string_lossy());
            if errors.is_empty() == expect_valid {
                println!("  {} {label}", "pass".green());
            } else {
                failures += 1;
                println!("  {} {label}", "FAIL".red().bold());
                if expect_valid {
                    for error in &errors {
                        println!("      {error}");
                    }
                } else {
                    println!("      expected a validation error");
                }
            }
        }
    }
    Ok(failures)
}

fn generate(case_dir: &Path, case: &Case) -> anyhow::Result<Generation> {
    let mut manifests = Vec::new();
    for path in &case.manifests {
        manifests.push(Manifest::from_file(&case_dir.join(path))?);
    }
    let mut sink = ErrorSink::new();
    let graph = TypeGraph::build(Manifest::merge(manifests), &MarkerRegistry::with_defaults(), &mut sink)?;
    let mut generation = Generator::new(case.allow_dangerous_types).generate(&graph);
    sink.extend(generation.errors);
    generation.errors = sink;
    Ok(generation)
}

fn build_validator(generation: &Generation, document: &str) -> anyhow::Result<Validator> {
    let documents: HashMap<String, Value> = generation
        .documents
        .iter()
        .map(|(name, doc)| Ok((name.to_string(), serde_json::to_value(doc)?)))
        .collect::<Result<_, serde_json::Error>>()?;
    let schema = documents
        .get(document)
        .cloned()
        .ok_or_else(|| anyhow!("no document named {document}"))?;
    jsonschema::options()
        .with_draft(Draft::Draft7)
        .with_retriever(Documents(documents))
        .build(&schema)
        .map_err(|error| anyhow!("invalid schema {document}: {error}"))
}
