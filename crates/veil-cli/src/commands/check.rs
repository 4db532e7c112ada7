//! `veil check` command implementation.
//!
//! Validates a catalog file before it is used for extraction: duplicate
//! databases, tables or columns, and table names the chosen dialect can never
//! resolve.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::warn;

use veil_core::{Catalog, CatalogFinding, DialectTag, FindingSeverity};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Catalog file (YAML or JSON) to validate.
    #[arg(long)]
    pub catalog: PathBuf,

    /// Dialect the catalog is written for; decides whether table names must be
    /// schema-qualified.
    #[arg(long, default_value_t = DialectTag::Snowflake)]
    pub dialect: DialectTag,
}

/// Results from checking one catalog.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CatalogFinding>,
}

impl CheckResults {
    /// Returns true if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn error_count(&self) -> usize {
        self.count(FindingSeverity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(FindingSeverity::Warning)
    }

    fn count(&self, severity: FindingSeverity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    /// Print human-readable summary, errors first.
    pub fn print_summary(&self) {
        let mut findings: Vec<_> = self.findings.iter().collect();
        findings.sort_by(|a, b| b.severity.cmp(&a.severity));

        for finding in findings {
            println!("  {finding}");
        }

        println!();
        if self.findings.is_empty() {
            println!("All checks passed!");
        } else {
            println!(
                "Summary: {} error(s), {} warning(s)",
                self.error_count(),
                self.warning_count()
            );
        }
    }
}

/// Run the catalog checks without printing anything.
pub fn run_quiet(catalog_path: &Path, dialect: DialectTag) -> Result<CheckResults> {
    let catalog = Catalog::from_file(catalog_path)
        .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?;

    let findings = catalog.validate(veil_mask::dialect::has_schemas(dialect));
    for finding in findings
        .iter()
        .filter(|f| f.severity == FindingSeverity::Warning)
    {
        warn!(location = %finding.location, "{}", finding.message);
    }

    Ok(CheckResults { findings })
}

/// Run `veil check`.
pub fn run(args: &CheckArgs) -> Result<()> {
    println!(
        "Checking catalog {} ({} dialect)...",
        args.catalog.display(),
        args.dialect
    );

    let results = run_quiet(&args.catalog, args.dialect)?;
    results.print_summary();

    if results.has_errors() {
        anyhow::bail!(
            "Catalog check failed with {} error(s)",
            results.error_count()
        );
    }

    Ok(())
}
