//! CLI subcommands: init, validate, synth, diff, tree, schema.

use crate::constructs::build_tree;
use crate::core::assembler::assemble;
use crate::core::manifest::{StackManifest, EXAMPLE_MANIFEST};
use crate::core::types::Template;
use crate::core::{differ, parser, SynthError};
use clap::{Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new stack manifest
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate stack.yaml without synthesizing
    Validate {
        /// Path to stack.yaml
        #[arg(short, long, default_value = "stack.yaml")]
        file: PathBuf,
    },

    /// Synthesize the template
    Synth {
        /// Path to stack.yaml
        #[arg(short, long, default_value = "stack.yaml")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Write the template here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare the synthesized template with a previous one
    Diff {
        /// Path to stack.yaml
        #[arg(short, long, default_value = "stack.yaml")]
        file: PathBuf,

        /// Previously synthesized template (JSON or YAML)
        previous: PathBuf,

        /// Exit non-zero when anything changed (for CI)
        #[arg(long)]
        fail_on_change: bool,
    },

    /// Print the construct tree
    Tree {
        /// Path to stack.yaml
        #[arg(short, long, default_value = "stack.yaml")]
        file: PathBuf,
    },

    /// Print the JSON schema of stack.yaml
    Schema,
}

/// Template output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Yaml,
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), SynthError> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Synth {
            file,
            format,
            output,
        } => cmd_synth(&file, format, output.as_deref()),
        Commands::Diff {
            file,
            previous,
            fail_on_change,
        } => cmd_diff(&file, &previous, fail_on_change),
        Commands::Tree { file } => cmd_tree(&file),
        Commands::Schema => cmd_schema(),
    }
}

fn cmd_init(path: &Path) -> Result<(), SynthError> {
    let manifest_path = path.join("stack.yaml");
    if manifest_path.exists() {
        return Err(SynthError::Io {
            path: manifest_path.display().to_string(),
            message: "already exists".to_string(),
        });
    }
    std::fs::create_dir_all(path).map_err(|e| SynthError::io(path, e))?;
    std::fs::write(&manifest_path, EXAMPLE_MANIFEST).map_err(|e| SynthError::io(&manifest_path, e))?;

    println!("Initialized synthform stack at {}", path.display());
    println!("  Created: {}", manifest_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), SynthError> {
    let manifest = parse_and_validate(file)?;
    println!(
        "OK: {} ({} constructs)",
        manifest.stack,
        manifest.constructs.len()
    );
    Ok(())
}

/// Parse and validate a manifest file, printing every validation error.
fn parse_and_validate(file: &Path) -> Result<StackManifest, SynthError> {
    let manifest = parser::parse_manifest_file(file)?;
    let errors = parser::validate_manifest(&manifest);
    if errors.is_empty() {
        return Ok(manifest);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err(SynthError::Manifest(format!(
        "{} validation error(s)",
        errors.len()
    )))
}

/// Parse, build and assemble a manifest file.
fn synthesize_file(file: &Path) -> Result<Template, SynthError> {
    let manifest = parse_and_validate(file)?;
    let tree = build_tree(&manifest)?;
    assemble(&tree)
}

fn render(template: &Template, format: Format) -> Result<String, SynthError> {
    match format {
        Format::Json => template.to_json_string().map(|mut s| {
            s.push('\n');
            s
        }),
        Format::Yaml => template.to_yaml_string(),
    }
}

fn cmd_synth(file: &Path, format: Format, output: Option<&Path>) -> Result<(), SynthError> {
    let template = synthesize_file(file)?;
    let rendered = render(&template, format)?;
    match output {
        Some(path) => {
            std::fs::write(path, &rendered).map_err(|e| SynthError::io(path, e))?;
            tracing::info!(
                path = %path.display(),
                resources = template.resources.len(),
                "template written"
            );
            eprintln!(
                "Synthesized {} resource(s), {} output(s) to {}",
                template.resources.len(),
                template.outputs.len(),
                path.display()
            );
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

/// Load a previously written template. YAML is converted through JSON.
fn load_template(path: &Path) -> Result<Template, SynthError> {
    let content = std::fs::read_to_string(path).map_err(|e| SynthError::io(path, e))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if !is_yaml {
        return Template::from_json_str(&content);
    }
    let doc: serde_json::Value = serde_yaml_ng::from_str(&content)
        .map_err(|e| SynthError::Manifest(format!("template parse error: {}", e)))?;
    let json = serde_json::to_string(&doc).map_err(|e| SynthError::Serialize(e.to_string()))?;
    Template::from_json_str(&json)
}

fn cmd_diff(file: &Path, previous: &Path, fail_on_change: bool) -> Result<(), SynthError> {
    let new = synthesize_file(file)?;
    let old = load_template(previous)?;
    let result = differ::diff(&old, &new)?;

    println!("Diff: {} against {}", file.display(), previous.display());
    println!();
    for change in &result.changes {
        if change.action != differ::ChangeAction::NoOp {
            println!("  {}", change);
        }
    }
    println!();
    println!(
        "Diff: {} to add, {} to change, {} to remove, {} unchanged.",
        result.to_add, result.to_update, result.to_remove, result.unchanged
    );

    if fail_on_change && !result.is_empty() {
        return Err(SynthError::Manifest(format!(
            "{} change(s) detected",
            result.to_add + result.to_update + result.to_remove
        )));
    }
    Ok(())
}

fn cmd_tree(file: &Path) -> Result<(), SynthError> {
    let manifest = parse_and_validate(file)?;
    let tree = build_tree(&manifest)?;
    print!("{}", tree.render());
    Ok(())
}

fn cmd_schema() -> Result<(), SynthError> {
    let schema = schemars::schema_for!(StackManifest);
    let json =
        serde_json::to_string_pretty(&schema).map_err(|e| SynthError::Serialize(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_dir() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        let file = dir.path().join("stack.yaml");
        (dir, file)
    }

    #[test]
    fn test_cli_init() {
        let (_dir, file) = init_dir();
        let content = std::fs::read_to_string(&file).unwrap();
        assert_eq!(content, EXAMPLE_MANIFEST);
    }

    #[test]
    fn test_cli_init_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stack.yaml"), "exists").unwrap();
        assert!(cmd_init(dir.path()).is_err());
    }

    #[test]
    fn test_cli_init_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("nested/project");
        cmd_init(&sub).unwrap();
        assert!(sub.join("stack.yaml").exists());
    }

    #[test]
    fn test_cli_validate_valid() {
        let (_dir, file) = init_dir();
        cmd_validate(&file).unwrap();
    }

    #[test]
    fn test_cli_validate_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("stack.yaml");
        std::fs::write(&file, "version: \"2.0\"\nstack: \"\"\n").unwrap();
        let err = cmd_validate(&file).unwrap_err();
        assert!(err.to_string().contains("2 validation error(s)"), "{}", err);
    }

    #[test]
    fn test_cli_validate_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_validate(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, SynthError::Io { .. }));
    }

    #[test]
    fn test_cli_synth_json_to_file() {
        let (dir, file) = init_dir();
        let out = dir.path().join("template.json");
        cmd_synth(&file, Format::Json, Some(&out)).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        let resources = doc["Resources"].as_object().unwrap();
        assert!(resources
            .values()
            .any(|r| r["Type"] == "AWS::ECS::Service"));
        assert!(doc["Outputs"]["LoadBalancerDNS"]["Value"]["Fn::GetAtt"].is_array());
    }

    #[test]
    fn test_cli_synth_yaml_to_file() {
        let (dir, file) = init_dir();
        let out = dir.path().join("template.yaml");
        cmd_synth(&file, Format::Yaml, Some(&out)).unwrap();
        let content = std::fs::read_to_string(&out).unwrap();
        assert!(content.contains("AWS::Redshift::ClusterSubnetGroup"));
    }

    #[test]
    fn test_cli_synth_stdout() {
        let (_dir, file) = init_dir();
        cmd_synth(&file, Format::Json, None).unwrap();
    }

    #[test]
    fn test_cli_diff_unchanged() {
        let (dir, file) = init_dir();
        let out = dir.path().join("template.json");
        cmd_synth(&file, Format::Json, Some(&out)).unwrap();
        cmd_diff(&file, &out, true).unwrap();
    }

    #[test]
    fn test_cli_diff_yaml_previous() {
        let (dir, file) = init_dir();
        let out = dir.path().join("template.yaml");
        cmd_synth(&file, Format::Yaml, Some(&out)).unwrap();
        cmd_diff(&file, &out, true).unwrap();
    }

    #[test]
    fn test_cli_diff_detects_change() {
        let (dir, file) = init_dir();
        let out = dir.path().join("template.json");
        cmd_synth(&file, Format::Json, Some(&out)).unwrap();

        let changed = EXAMPLE_MANIFEST.replace("desired_count: 2", "desired_count: 3");
        std::fs::write(&file, changed).unwrap();
        cmd_diff(&file, &out, false).unwrap();
        let err = cmd_diff(&file, &out, true).unwrap_err();
        assert!(err.to_string().contains("1 change(s) detected"), "{}", err);
    }

    #[test]
    fn test_cli_tree() {
        let (_dir, file) = init_dir();
        cmd_tree(&file).unwrap();
    }

    #[test]
    fn test_cli_schema() {
        cmd_schema().unwrap();
    }

    #[test]
    fn test_cli_dispatch_init_and_synth() {
        let dir = tempfile::tempdir().unwrap();
        dispatch(Commands::Init {
            path: dir.path().to_path_buf(),
        })
        .unwrap();
        dispatch(Commands::Synth {
            file: dir.path().join("stack.yaml"),
            format: Format::Yaml,
            output: Some(dir.path().join("out.yaml")),
        })
        .unwrap();
        assert!(dir.path().join("out.yaml").exists());
    }

    #[test]
    fn test_cli_dispatch_validate_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = dispatch(Commands::Validate {
            file: dir.path().join("missing.yaml"),
        });
        assert!(result.is_err());
    }
}
