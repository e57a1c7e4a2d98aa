use std::process;

use clap::Parser;
use rtmx::{CrossRepoReport, ValidationSummary, validate_all, validate_cross_repo_deps};
use serde_json::json;
use tracing::instrument;

use super::{Context, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Validate schema, cycles, reciprocity and cross-repo references")]
pub struct Validate {
    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Treat warnings as errors
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Validate {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let project = context.open()?;

        let summary = validate_all(&project.db);
        let cross_repo = validate_cross_repo_deps(&project.db, &project.config);

        match self.output {
            OutputFormat::Table => Self::output_table(&summary, &cross_repo),
            OutputFormat::Json => Self::output_json(&summary, &cross_repo)?,
        }

        let has_errors = !summary.errors.is_empty() || !cross_repo.errors.is_empty();
        let has_warnings = !summary.warnings.is_empty()
            || !summary.reciprocity.is_empty()
            || !cross_repo.warnings.is_empty();

        if has_errors || (self.strict && has_warnings) {
            process::exit(1);
        }

        Ok(())
    }

    fn output_json(summary: &ValidationSummary, cross_repo: &CrossRepoReport) -> anyhow::Result<()> {
        let output = json!({
            "errors": summary.errors,
            "warnings": summary.warnings,
            "reciprocity": summary.reciprocity,
            "cross_repo": cross_repo,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_table(summary: &ValidationSummary, cross_repo: &CrossRepoReport) {
        Self::section("Schema", &summary.errors, <str as Colorize>::error);
        Self::section("Cycles", &summary.warnings, <str as Colorize>::warning);
        Self::section("Reciprocity", &summary.reciprocity, <str as Colorize>::warning);
        Self::section("Cross-repo errors", &cross_repo.errors, <str as Colorize>::error);
        Self::section("Cross-repo warnings", &cross_repo.warnings, <str as Colorize>::warning);

        let errors = summary.errors.len() + cross_repo.errors.len();
        let warnings = summary.warnings.len() + summary.reciprocity.len() + cross_repo.warnings.len();

        if errors == 0 && warnings == 0 {
            println!("{}", "✅ Validation passed".success());
        } else if errors == 0 {
            println!(
                "{}",
                format!("⚠️  Validation passed with {warnings} warning(s)").warning()
            );
        } else {
            println!(
                "{}",
                format!("❌ Validation failed: {errors} error(s), {warnings} warning(s)").error()
            );
        }
    }

    fn section(title: &str, lines: &[String], paint: fn(&str) -> String) {
        if lines.is_empty() {
            return;
        }
        println!("{} ({})", title.bold(), lines.len());
        for line in lines {
            println!("  {}", paint(line));
        }
        println!();
    }
}
