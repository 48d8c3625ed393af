//! axsemantics-import CLI
//!
//! Maps spreadsheet rows (exported as a JSON array) and either writes them
//! out as JSON or uploads them as things of a content project.

use std::path::PathBuf;

use anyhow::{bail, Context};
use axsemantics_core::{ApiConfig, Client};
use axsemantics_import::{export, read_rows, upload, Mapping, RowFailure};
use clap::Parser;
use serde_json::Value;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "axsemantics-import", version, about)]
struct Cli {
    /// JSON array of rows, one object per spreadsheet row.
    file: PathBuf,

    /// Content project receiving the things.
    #[arg(long)]
    project: Option<String>,

    /// Column mapping file.
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Write the mapped rows to this file instead of uploading them.
    #[arg(long)]
    export: Option<PathBuf>,

    #[arg(long, env = "AXSEMANTICS_USER", requires = "password")]
    email: Option<String>,

    #[arg(long, env = "AXSEMANTICS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, env = "AXSEMANTICS_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long, env = "AXSEMANTICS_API_BASE")]
    api_base: Option<String>,
}

/// Numeric ids go out as JSON numbers, anything else as a string.
fn project_id(raw: &str) -> Value {
    raw.parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(raw))
}

fn print_failures(failures: &[RowFailure]) {
    for failure in failures {
        eprintln!("row {}: {}", failure.row, failure.message);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mapping = match &cli.mapping {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading mapping {}", path.display()))?;
            Mapping::from_json(&raw)?
        }
        None => Mapping::default(),
    };

    let rows = read_rows(&cli.file)?;
    let mapped = mapping.parse_rows(&rows);

    if let Some(out) = &cli.export {
        export(&mapped.rows, out)?;
        print_failures(&mapped.failures);
        println!(
            "exported {} rows to {}, {} rows failed",
            mapped.rows.len(),
            out.display(),
            mapped.failures.len()
        );
        if !mapped.failures.is_empty() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let Some(project) = cli.project.as_deref() else {
        bail!("--project is required unless --export is given");
    };

    let mut config = ApiConfig::from_env();
    if let Some(base) = &cli.api_base {
        config = config.with_api_base(base);
    }
    let mut client = Client::new(config);
    match (&cli.token, &cli.email, &cli.password) {
        (Some(token), _, _) => client = client.with_token(token.clone()),
        (None, Some(email), Some(password)) => {
            client.login(email, password).context("login failed")?;
            info!(email = %email, "logged in");
        }
        _ => bail!("either --token or --email and --password are required"),
    }

    let mut report = upload(&client, &project_id(project), &mapped.rows);
    report.failures.extend(mapped.failures);
    report.failures.sort_by_key(|failure| failure.row);
    print_failures(&report.failures);
    println!(
        "created {} things, {} rows failed",
        report.created.len(),
        report.failures.len()
    );
    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
