//! Diabetes Risk CLI Module
//!
//! Command-line interface for serving, one-off predictions and registry
//! management.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;

use crate::features::{validate, vectorize, FEATURE_NAMES};
use crate::inference::{confidence, ServingConfig};
use crate::model::{ArtifactEncoding, FsModelRegistry, ModelArtifact, ModelLoader, ScoringFunction};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "diabetes-risk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Diabetes risk prediction service")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Artifact encoding accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EncodingArg {
    Json,
    Binary,
}

impl From<EncodingArg> for ArtifactEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Json => ArtifactEncoding::Json,
            EncodingArg::Binary => ArtifactEncoding::Binary,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the prediction server
    Serve {
        /// Server port
        #[arg(short, long, env = "API_PORT", default_value = "8000")]
        port: u16,

        /// Server host
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Registry root directory
        #[arg(long, env = "MODEL_REGISTRY_DIR")]
        registry: Option<PathBuf>,

        /// Registered model name
        #[arg(long, env = "MODEL_NAME")]
        model: Option<String>,

        /// Stage, `latest`, or a version number
        #[arg(long, env = "MODEL_STAGE")]
        stage: Option<String>,

        /// Load the model on the first prediction instead of at startup
        #[arg(long)]
        lazy_load: bool,
    },

    /// Score one patient record with a registered model
    Predict {
        /// JSON file holding the patient record (`-` for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Registry root directory
        #[arg(long, env = "MODEL_REGISTRY_DIR", default_value = "./models")]
        registry: PathBuf,

        /// Registered model name
        #[arg(long, env = "MODEL_NAME", default_value = "diabetes-predictor")]
        model: String,

        /// Stage, `latest`, or a version number
        #[arg(long, env = "MODEL_STAGE", default_value = "Production")]
        stage: String,
    },

    /// Add an artifact file to the registry as a new version
    Register {
        /// Artifact file (JSON or binary)
        #[arg(short, long)]
        artifact: PathBuf,

        /// Registry root directory
        #[arg(long, env = "MODEL_REGISTRY_DIR", default_value = "./models")]
        registry: PathBuf,

        /// Registered model name (defaults to the artifact's name)
        #[arg(long)]
        name: Option<String>,

        /// Storage encoding inside the registry
        #[arg(long, value_enum, default_value = "binary")]
        encoding: EncodingArg,

        /// Free-form description
        #[arg(long, default_value = "")]
        description: String,

        /// Move the new version to this stage
        #[arg(long)]
        stage: Option<String>,
    },

    /// Point a stage at a registered version
    Transition {
        /// Registered model name
        #[arg(long, default_value = "diabetes-predictor")]
        name: String,

        /// Version to promote
        #[arg(long)]
        version: u32,

        /// Target stage (Production, Staging, Archived, ...)
        #[arg(long)]
        stage: String,

        /// Registry root directory
        #[arg(long, env = "MODEL_REGISTRY_DIR", default_value = "./models")]
        registry: PathBuf,
    },

    /// List registered models, versions and stages
    List {
        /// Registry root directory
        #[arg(long, env = "MODEL_REGISTRY_DIR", default_value = "./models")]
        registry: PathBuf,
    },

    /// Show an artifact's metadata
    Inspect {
        /// Artifact file (JSON or binary)
        #[arg(short, long)]
        artifact: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    }
}

pub fn cmd_predict(input: &Path, registry: &Path, model: &str, stage: &str) -> anyhow::Result<()> {
    section("Predict");

    step_run(&format!("Loading {} ({})", model.cyan(), stage));
    let start = Instant::now();
    let loader = ModelLoader::new(Arc::new(FsModelRegistry::new(registry)));
    let loaded = loader.load(model, stage)?;
    step_done(&format!("v{} in {:?}", loaded.version, start.elapsed()));

    let raw: serde_json::Value = serde_json::from_str(&read_input(input)?).context("input is not valid JSON")?;
    let features = validate(&raw)?;
    let vector = vectorize(&features);
    let (class, probabilities) = loaded.score(&vector)?;

    println!();
    let verdict = if class == 1 { "at risk".red().bold() } else { "not at risk".green().bold() };
    println!("  {:<12} {} {}", muted("Prediction"), class, verdict);
    println!("  {:<12} {:.4}", muted("Probability"), probabilities.positive);
    println!("  {:<12} {:.4}", muted("Confidence"), confidence(&probabilities));
    println!();
    Ok(())
}

pub fn cmd_register(
    artifact_path: &Path,
    registry: &Path,
    name: Option<&str>,
    encoding: ArtifactEncoding,
    description: &str,
    stage: Option<&str>,
) -> anyhow::Result<()> {
    section("Register");

    let artifact = ModelArtifact::read_file(artifact_path)
        .with_context(|| format!("failed to read artifact {}", artifact_path.display()))?;
    let name = name.unwrap_or(&artifact.metadata.name).to_string();

    let registry = FsModelRegistry::create(registry)?;
    let version = registry.register(&name, &artifact, encoding, description)?;
    step_ok(&format!("Registered {} version {}", name.cyan(), version));

    if let Some(stage) = stage {
        let previous = registry.transition(&name, version, stage)?;
        match previous {
            Some(prev) => step_ok(&format!("{} moved from v{} to v{}", stage, prev, version)),
            None => step_ok(&format!("{} now points at v{}", stage, version)),
        }
    }
    println!();
    Ok(())
}

pub fn cmd_transition(registry: &Path, name: &str, version: u32, stage: &str) -> anyhow::Result<()> {
    section("Transition");
    let registry = FsModelRegistry::new(registry);
    match registry.transition(name, version, stage)? {
        Some(prev) => step_ok(&format!("{} {}: v{} → v{}", name.cyan(), stage, prev, version)),
        None => step_ok(&format!("{} {}: v{}", name.cyan(), stage, version)),
    }
    println!();
    Ok(())
}

pub fn cmd_list(registry: &Path) -> anyhow::Result<()> {
    section("Registry");
    let registry = FsModelRegistry::new(registry);
    let index = registry.index()?;

    if index.models.is_empty() {
        println!("  {}", muted("no models registered"));
    }

    for (name, model) in &index.models {
        println!("  {}", name.white().bold());
        println!(
            "  {:<8} {:<22} {:<14} {:<20} {}",
            muted("Version"), muted("Type"), muted("Stages"), muted("Registered"), muted("Metrics")
        );
        println!("  {}", dim(&"─".repeat(76)));
        for entry in &model.versions {
            let metrics: Vec<String> = entry.metrics.iter().map(|(k, v)| format!("{}={:.3}", k, v)).collect();
            println!(
                "  {:<8} {:<22} {:<14} {:<20} {}",
                format!("v{}", entry.version),
                entry.model_type,
                model.stages_of(entry.version).join(","),
                entry.registered_at.format("%Y-%m-%d %H:%M"),
                metrics.join(" ").truecolor(140, 140, 140)
            );
        }
        println!();
    }
    Ok(())
}

pub fn cmd_inspect(path: &Path) -> anyhow::Result<()> {
    section("Artifact");
    let artifact = ModelArtifact::read_file(path)?;
    let meta = &artifact.metadata;

    println!("  {:<14} {}", muted("File"), path.display());
    println!("  {:<14} {}", muted("Name"), meta.name);
    println!("  {:<14} {}", muted("Version"), meta.version);
    println!("  {:<14} {}", muted("Format"), artifact.format_version);
    println!("  {:<14} {}", muted("Family"), artifact.classifier.family());
    println!("  {:<14} {}", muted("Threshold"), artifact.threshold);
    if let Some(trained_at) = meta.trained_at {
        println!("  {:<14} {}", muted("Trained"), trained_at.to_rfc3339());
    }
    let schema_ok = meta.feature_names.iter().map(String::as_str).eq(FEATURE_NAMES.iter().copied());
    println!(
        "  {:<14} {} {}",
        muted("Features"),
        meta.feature_names.join(", "),
        if schema_ok { ok("(matches serving order)") } else { "(does not match serving order)".red() }
    );

    let mut metrics: Vec<_> = meta.metrics.iter().collect();
    metrics.sort_by(|a, b| a.0.cmp(b.0));
    for (k, v) in metrics {
        println!("  {:<14} {:.4}", muted(k), v);
    }
    println!();
    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(
    host: &str,
    port: u16,
    registry: Option<PathBuf>,
    model: Option<String>,
    stage: Option<String>,
    lazy_load: bool,
) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    let mut serving = ServingConfig::default();
    if let Some(dir) = registry {
        serving = serving.with_registry_dir(dir);
    }
    if model.is_some() || stage.is_some() {
        let name = model.unwrap_or_else(|| serving.model_name.clone());
        let stage = stage.unwrap_or_else(|| serving.model_stage.clone());
        serving = serving.with_model(name, stage);
    }
    if lazy_load {
        serving = serving.with_lazy_load(true);
    }

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Diabetes Risk".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Model  ", &format!("{} ({})", serving.model_name, serving.model_stage)));
    line_box(&kv("Predict", &format!("http://{}:{}/predict", host, port)));
    line_box(&kv("Health ", &format!("http://{}:{}/health", host, port)));
    line_box(&kv("Metrics", &format!("http://{}:{}/metrics", host, port)));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop · SIGHUP to reload")));
    line_box_empty();
    line_box_bottom();
    println!();

    let config = ServerConfig {
        host: host.to_string(),
        port,
        ..Default::default()
    };

    run_server(config, serving).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[1mbold\x1b[0m"), "bold");
    }

    #[test]
    fn test_parse_register() {
        let cli = Cli::try_parse_from([
            "diabetes-risk", "register", "--artifact", "model.json", "--encoding", "json", "--stage", "Production",
        ])
        .unwrap();
        match cli.command {
            Commands::Register { artifact, encoding, stage, .. } => {
                assert_eq!(artifact, PathBuf::from("model.json"));
                assert!(matches!(encoding, EncodingArg::Json));
                assert_eq!(stage.as_deref(), Some("Production"));
            }
            _ => panic!("expected register"),
        }
    }

    #[test]
    fn test_register_then_list() {
        use crate::model::{Classifier, LogisticModel};

        let dir = tempfile::tempdir().unwrap();
        let artifact_path = dir.path().join("artifact.json");
        ModelArtifact::new(
            "diabetes-predictor",
            Classifier::LogisticRegression(LogisticModel::new(vec![0.0; 8], 0.0)),
        )
        .write_file(&artifact_path, ArtifactEncoding::Json)
        .unwrap();

        let registry = dir.path().join("registry");
        cmd_register(&artifact_path, &registry, None, ArtifactEncoding::Binary, "", Some("Production")).unwrap();
        cmd_list(&registry).unwrap();

        let index = FsModelRegistry::new(&registry).index().unwrap();
        assert_eq!(index.models["diabetes-predictor"].stages["Production"], 1);
    }
}
