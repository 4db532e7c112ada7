//! `veil extract` command implementation.
//!
//! Loads a catalog, builds the session settings from an optional config file
//! plus command-line overrides, and prints the sensitivity of every column the
//! query returns as pretty JSON on stdout.

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use veil_core::{Catalog, DialectTag, ExtractionConfig, SensitiveField, UnsupportedPolicy};
use veil_mask::Extractor;

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Catalog file (YAML or JSON) listing databases, tables and columns.
    #[arg(long)]
    pub catalog: PathBuf,

    /// Extraction settings file (YAML). Flags below override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// SQL dialect: snowflake, postgres, mysql or generic.
    #[arg(long)]
    pub dialect: Option<DialectTag>,

    /// Database used for table references that do not name one.
    #[arg(long)]
    pub database: Option<String>,

    /// Fail instead of degrading when the query uses an unsupported construct.
    #[arg(long, default_value_t = false)]
    pub fail_closed: bool,

    /// SQL text to analyze.
    #[arg(long, conflicts_with = "file")]
    pub sql: Option<String>,

    /// File containing the SQL to analyze. Reads stdin when neither --sql
    /// nor --file is given.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl ExtractArgs {
    /// Build the session settings: config file first, then flag overrides.
    fn extraction_config(&self) -> Result<ExtractionConfig> {
        let mut config = match &self.config {
            Some(path) => ExtractionConfig::from_file(path).with_context(|| {
                format!("Failed to load extraction config {}", path.display())
            })?,
            None => ExtractionConfig::default(),
        };

        if let Some(dialect) = self.dialect {
            config.dialect = dialect;
        }
        if let Some(database) = &self.database {
            config.current_database = database.clone();
        }
        if self.fail_closed {
            config.unsupported = UnsupportedPolicy::FailClosed;
        }

        if config.current_database.is_empty() {
            warn!("no current database set; unqualified table references will not resolve");
        }
        Ok(config)
    }

    fn read_sql(&self) -> Result<String> {
        if let Some(sql) = &self.sql {
            return Ok(sql.clone());
        }
        if let Some(path) = &self.file {
            return fs::read_to_string(path)
                .with_context(|| format!("Failed to read SQL file {}", path.display()));
        }

        let mut sql = String::new();
        io::stdin()
            .read_to_string(&mut sql)
            .context("Failed to read SQL from stdin")?;
        Ok(sql)
    }
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    Catalog::from_file(path).with_context(|| format!("Failed to load catalog {}", path.display()))
}

/// Run one extraction and return the result without printing it.
pub fn extract(args: &ExtractArgs, sql: &str) -> Result<Vec<SensitiveField>> {
    let catalog = load_catalog(&args.catalog)?;
    let extractor = Extractor::new(&catalog, args.extraction_config()?);

    let fields = extractor
        .extract(sql)
        .context("Failed to extract sensitive fields")?;

    info!(
        dialect = %extractor.config().dialect,
        database = %extractor.config().current_database,
        fields = fields.len(),
        sensitive = fields.iter().filter(|f| f.sensitive).count(),
        "extraction finished"
    );
    Ok(fields)
}

/// Run `veil extract`.
pub fn run(args: &ExtractArgs) -> Result<()> {
    let sql = args.read_sql()?;
    let fields = extract(args, &sql)?;
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}
