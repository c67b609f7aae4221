//! formrule CLI
//!
//! Validates a submitted payload against a form definition file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use formrule::{
    load_form, CallbackRegistry, FormConfig, FormError, MemorySubmissionStore, RuleKind,
    SubmittedData, ValidationErrors,
};

/// Rule-based validation of submitted HTML forms.
#[derive(Parser)]
#[command(name = "formrule")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding `<name>.form.json` definitions.
    #[arg(short, long, env = "FORMRULE_FORMS_DIR", default_value = "forms")]
    forms_dir: PathBuf,

    /// Expected CSRF token. Enables the CSRF field when set.
    #[arg(long, env = "FORMRULE_CSRF_TOKEN")]
    csrf_token: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a submitted payload and print a JSON report.
    Validate {
        /// Form name, looked up in the forms directory.
        #[arg(short = 'F', long)]
        form: String,

        /// File holding the submitted payload.
        #[arg(short, long)]
        data: PathBuf,

        /// Payload encoding.
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },

    /// List the available rules and their error codes.
    Rules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Urlencoded,
}

/// Outcome of one validation, printed as JSON.
#[derive(Debug, Serialize)]
struct Report {
    form: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<ValidationErrors>,
}

fn read_payload(path: &Path, format: Format) -> anyhow::Result<SubmittedData> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading payload {}", path.display()))?;
    let data = match format {
        Format::Json => {
            let value: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing JSON payload {}", path.display()))?;
            SubmittedData::from_json(&value)?
        }
        Format::Urlencoded => SubmittedData::from_urlencoded(text.trim_end()),
    };
    Ok(data)
}

fn validate(config: &FormConfig, form: &str, data: &Path, format: Format) -> anyhow::Result<Report> {
    let registry = CallbackRegistry::new();
    let mut form = load_form(form, &registry, config)?;
    let submitted = read_payload(data, format)?;
    let mut store = MemorySubmissionStore::new();

    let report = match form.validate(&submitted, Some(&mut store)) {
        Ok(values) => Report {
            form: form.name().to_string(),
            valid: true,
            data: Some(values.into_iter().collect()),
            errors: None,
        },
        Err(FormError::ValidationErrors(errors)) => Report {
            form: form.name().to_string(),
            valid: false,
            data: None,
            errors: Some(errors),
        },
        Err(err) => return Err(err.into()),
    };
    debug!(form = %report.form, valid = report.valid, "validation finished");
    Ok(report)
}

fn print_rules() {
    println!("{:<14} {:<18} DESCRIPTION", "RULE", "ERROR CODE");
    println!("{:-<72}", "");
    for kind in RuleKind::ALL {
        let code = kind
            .error_code()
            .map_or_else(|| "-".to_string(), |code| code.to_string());
        println!("{:<14} {:<18} {}", kind.as_str(), code, kind.description());
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging; stdout carries the report.
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = FormConfig::new().forms_dir(cli.forms_dir);
    if let Some(token) = cli.csrf_token {
        config = config.csrf_token(token);
    }

    match cli.command {
        Commands::Validate { form, data, format } => {
            let report = validate(&config, &form, &data, format)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(if report.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Rules => {
            print_rules();
            Ok(ExitCode::SUCCESS)
        }
    }
}
