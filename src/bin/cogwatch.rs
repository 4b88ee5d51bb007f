//! Cogwatch CLI - Command-line interface for the Cogwatch dashboard engine
//!
//! Commands:
//! - view: Render the full dashboard page for a CSV export
//! - predict: Classify one identity's history
//! - charts: Compute chart inputs for an identity and date
//! - selectors: List identity and date selector options
//! - validate: Check a CSV export against the dashboard's column contract
//! - doctor: Diagnose configuration (model command, artifact, input)

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cogwatch::{
    build_all_charts, build_model_input, classify, ChartData, ChartKind, CommandClassifier,
    DashboardError, DashboardSession, DateFilter, PageState, RecordTable, SequenceClassifier,
    StaticClassifier, ViewModel, CLASS_COUNT, COGWATCH_VERSION, MODEL_FEATURES, PRODUCER_NAME,
    SEQUENCE_LEN,
};
use cogwatch::{columns, CHART_SPECS};

/// Cogwatch - cognitive-risk dashboard for wearable wellness CSV exports
#[derive(Parser)]
#[command(name = "cogwatch")]
#[command(version = COGWATCH_VERSION)]
#[command(about = "Analyze wellness exports for cognitive risk", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the full dashboard page
    View {
        /// CSV export path (use - for stdin); omit to see the upload prompt
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Identity to analyze (defaults to the first one in the file)
        #[arg(long)]
        identity: Option<String>,

        /// Summary date for the charts: "전체"/"all" or YYYY-MM-DD
        #[arg(long, default_value = "전체")]
        date: String,

        /// External inference program invoked as `<program> <model>`
        #[arg(long)]
        model_cmd: Option<PathBuf>,

        /// Pretrained model artifact handed to the inference program
        #[arg(long, default_value = "best_model.h5")]
        model: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Classify one identity's history
    Predict {
        /// CSV export path (use - for stdin)
        #[arg(long)]
        csv: PathBuf,

        /// Identity to analyze (defaults to the first one in the file)
        #[arg(long)]
        identity: Option<String>,

        /// External inference program invoked as `<program> <model>`
        #[arg(long)]
        model_cmd: PathBuf,

        /// Pretrained model artifact handed to the inference program
        #[arg(long, default_value = "best_model.h5")]
        model: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Compute chart inputs for an identity and date
    Charts {
        /// CSV export path (use - for stdin)
        #[arg(long)]
        csv: PathBuf,

        /// Identity to analyze (defaults to the first one in the file)
        #[arg(long)]
        identity: Option<String>,

        /// Summary date: "전체"/"all" or YYYY-MM-DD
        #[arg(long, default_value = "전체")]
        date: String,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the identity and date selector options
    Selectors {
        /// CSV export path (use - for stdin)
        #[arg(long)]
        csv: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Check a CSV export against the dashboard's column contract
    Validate {
        /// CSV export path (use - for stdin)
        #[arg(long)]
        csv: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and input health
    Doctor {
        /// External inference program to check
        #[arg(long)]
        model_cmd: Option<PathBuf>,

        /// Pretrained model artifact to check
        #[arg(long, default_value = "best_model.h5")]
        model: PathBuf,

        /// CSV export to check
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable text
    Text,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<(), CogwatchCliError> {
    match cli.command {
        Commands::View {
            csv,
            identity,
            date,
            model_cmd,
            model,
            format,
        } => cmd_view(csv.as_deref(), identity, &date, model_cmd, model, format),

        Commands::Predict {
            csv,
            identity,
            model_cmd,
            model,
            format,
        } => cmd_predict(&csv, identity, model_cmd, model, format),

        Commands::Charts {
            csv,
            identity,
            date,
            format,
        } => cmd_charts(&csv, identity, &date, format),

        Commands::Selectors { csv, format } => cmd_selectors(&csv, format),

        Commands::Validate { csv, json } => cmd_validate(&csv, json),

        Commands::Doctor {
            model_cmd,
            model,
            csv,
            json,
        } => cmd_doctor(model_cmd.as_deref(), &model, csv.as_deref(), json),
    }
}

fn cmd_view(
    csv: Option<&Path>,
    identity: Option<String>,
    date: &str,
    model_cmd: Option<PathBuf>,
    model: PathBuf,
    format: OutputFormat,
) -> Result<(), CogwatchCliError> {
    let classifier: Box<dyn SequenceClassifier> = match model_cmd {
        Some(program) => Box::new(CommandClassifier::new(program, model)),
        None if csv.is_none() => {
            // The prompt page never reaches the classifier.
            Box::new(StaticClassifier::new(Vec::new()))
        }
        None => return Err(CogwatchCliError::MissingModel),
    };

    let mut session = DashboardSession::new(classifier);
    if let Some(path) = csv {
        let table = read_table(path)?;
        session.load_table(table);
    }
    if let Some(identity) = identity {
        session.select_identity(&identity)?;
    }
    session.select_date(DateFilter::parse(date)?);

    let view = session.view()?;
    match format {
        OutputFormat::Text => print!("{}", render_view(&view)),
        OutputFormat::Json => println!("{}", serde_json::to_string(&view)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&view)?),
    }
    Ok(())
}

fn cmd_predict(
    csv: &Path,
    identity: Option<String>,
    model_cmd: PathBuf,
    model: PathBuf,
    format: OutputFormat,
) -> Result<(), CogwatchCliError> {
    let table = read_table(csv)?;
    let identity = resolve_identity(&table, identity);
    let tensor = build_model_input(&table, &identity)?;
    let classifier = CommandClassifier::new(model_cmd, model);
    let prediction = classify(&classifier, &tensor)?;

    match format {
        OutputFormat::Text => {
            println!("{identity}");
            println!("{}", prediction.result_text());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&prediction)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&prediction)?),
    }
    Ok(())
}

fn cmd_charts(
    csv: &Path,
    identity: Option<String>,
    date: &str,
    format: OutputFormat,
) -> Result<(), CogwatchCliError> {
    let table = read_table(csv)?;
    let identity = resolve_identity(&table, identity);
    let slice = table.filter(&identity, DateFilter::parse(date)?);
    let charts = build_all_charts(&slice)?;

    match format {
        OutputFormat::Text => print!("{}", render_charts(&charts)),
        OutputFormat::Json => println!("{}", serde_json::to_string(&charts)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&charts)?),
    }
    Ok(())
}

fn cmd_selectors(csv: &Path, format: OutputFormat) -> Result<(), CogwatchCliError> {
    let table = read_table(csv)?;
    let report = SelectorReport {
        identities: table.identities().iter().map(|s| s.to_string()).collect(),
        dates: {
            let mut dates = vec![columns::DATE_ALL.to_string()];
            dates.extend(table.dates().iter().map(|d| d.format("%Y-%m-%d").to_string()));
            dates
        },
    };

    match format {
        OutputFormat::Text => {
            println!("이메일 주소: {}", report.identities.join(", "));
            println!("일자: {}", report.dates.join(", "));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn cmd_validate(csv: &Path, json: bool) -> Result<(), CogwatchCliError> {
    let report = match read_table(csv) {
        Ok(table) => {
            let missing_chart_columns: Vec<String> = CHART_SPECS
                .iter()
                .flat_map(|spec| spec.labels.iter().copied())
                .filter(|label| table.metric_index(label).is_err())
                .map(str::to_string)
                .collect();

            ValidationReport {
                parse_ok: true,
                parse_error: None,
                rows: table.len(),
                identities: table.identities().len(),
                metric_columns: table.metric_columns().len(),
                expected_metric_columns: MODEL_FEATURES,
                missing_chart_columns,
            }
        }
        Err(CogwatchCliError::Dashboard(e)) => ValidationReport {
            parse_ok: false,
            parse_error: Some(e.to_string()),
            rows: 0,
            identities: 0,
            metric_columns: 0,
            expected_metric_columns: MODEL_FEATURES,
            missing_chart_columns: Vec::new(),
        },
        Err(other) => return Err(other),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        match &report.parse_error {
            Some(error) => println!("Parse error:    {error}"),
            None => {
                println!("Rows:           {}", report.rows);
                println!("Identities:     {}", report.identities);
                println!(
                    "Metric columns: {} (model expects {})",
                    report.metric_columns, report.expected_metric_columns
                );
            }
        }
        if !report.missing_chart_columns.is_empty() {
            println!("\nMissing chart columns:");
            for column in &report.missing_chart_columns {
                println!("  - {column}");
            }
        }
    }

    let mut problems = report.missing_chart_columns.len();
    if !report.parse_ok {
        problems += 1;
    }
    if report.parse_ok && report.metric_columns != report.expected_metric_columns {
        problems += 1;
    }
    if problems > 0 {
        Err(CogwatchCliError::ValidationFailed(problems))
    } else {
        Ok(())
    }
}

fn cmd_doctor(
    model_cmd: Option<&Path>,
    model: &Path,
    csv: Option<&Path>,
    json: bool,
) -> Result<(), CogwatchCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "cogwatch_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Cogwatch version {COGWATCH_VERSION}"),
    });

    checks.push(DoctorCheck {
        name: "model_contract".to_string(),
        status: CheckStatus::Ok,
        message: format!(
            "Input tensor (1, {SEQUENCE_LEN}, {MODEL_FEATURES}), {CLASS_COUNT} classes"
        ),
    });

    if let Some(program) = model_cmd {
        if program.exists() {
            checks.push(DoctorCheck {
                name: "model_cmd".to_string(),
                status: CheckStatus::Ok,
                message: format!("Inference program found at {}", program.display()),
            });
        } else {
            checks.push(DoctorCheck {
                name: "model_cmd".to_string(),
                status: CheckStatus::Warning,
                message: format!(
                    "{} is not a local file; it must resolve on PATH",
                    program.display()
                ),
            });
        }
    }

    if model.exists() {
        checks.push(DoctorCheck {
            name: "model_artifact".to_string(),
            status: CheckStatus::Ok,
            message: format!("Model artifact found at {}", model.display()),
        });
    } else {
        checks.push(DoctorCheck {
            name: "model_artifact".to_string(),
            status: CheckStatus::Warning,
            message: format!("Model artifact {} does not exist", model.display()),
        });
    }

    if let Some(path) = csv {
        match read_table(path) {
            Ok(table) => checks.push(DoctorCheck {
                name: "csv".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "CSV parses: {} rows, {} identities, {} metric columns",
                    table.len(),
                    table.identities().len(),
                    table.metric_columns().len()
                ),
            }),
            Err(e) => checks.push(DoctorCheck {
                name: "csv".to_string(),
                status: CheckStatus::Error,
                message: format!("CSV does not parse: {}", CliError::from(e).message),
            }),
        }
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (use --csv - to read it)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: COGWATCH_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Cogwatch Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CogwatchCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_table(path: &Path) -> Result<RecordTable, CogwatchCliError> {
    if path.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            eprintln!("reading CSV from the terminal; pipe a file or end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(RecordTable::from_reader(buffer.as_bytes())?)
    } else {
        let file = fs::File::open(path)?;
        Ok(RecordTable::from_reader(file)?)
    }
}

fn resolve_identity(table: &RecordTable, identity: Option<String>) -> String {
    match identity {
        Some(identity) => identity,
        // The loader rejects empty tables, so a first identity always exists.
        None => table
            .identities()
            .first()
            .map(|s| s.to_string())
            .unwrap_or_default(),
    }
}

fn render_view(view: &ViewModel) -> String {
    match &view.page {
        PageState::NoFile { prompt } => format!("{prompt}\n"),
        PageState::Loaded(page) => {
            let mut out = String::new();
            out.push_str(&format!(
                "cogwatch {} (session {})\n",
                view.producer.version, view.producer.session_id
            ));
            out.push_str(&format!("이메일 주소: {}\n", page.identity));
            out.push_str(&format!("일자: {}\n", page.date));
            out.push_str(&format!("{}\n\n", page.result_text));

            out.push_str(&render_charts(&page.charts));

            out.push('\n');
            out.push_str(&page.table.columns.join(","));
            out.push('\n');
            for row in &page.table.rows {
                out.push_str(&row.identity);
                out.push(',');
                out.push_str(&row.date);
                for value in &row.values {
                    out.push_str(&format!(",{value}"));
                }
                out.push('\n');
            }
            out
        }
    }
}

fn render_charts(charts: &[ChartData]) -> String {
    let mut out = String::new();
    for chart in charts {
        let kind = match chart.kind {
            ChartKind::Pie => "pie",
            ChartKind::HorizontalBar => "bar",
            ChartKind::Radar => "radar",
        };
        match chart.axis_range {
            Some((low, high)) => {
                out.push_str(&format!("[{kind} {low}-{high}] {}\n", chart.id))
            }
            None => out.push_str(&format!("[{kind}] {}\n", chart.id)),
        }
        for point in &chart.points {
            match point.value {
                Some(value) => out.push_str(&format!("  {}  {value}\n", point.label)),
                None => out.push_str(&format!("  {}  -\n", point.label)),
            }
        }
        out.push('\n');
    }
    out
}

// Error types

#[derive(Debug)]
enum CogwatchCliError {
    Io(io::Error),
    Dashboard(DashboardError),
    Json(serde_json::Error),
    MissingModel,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for CogwatchCliError {
    fn from(e: io::Error) -> Self {
        CogwatchCliError::Io(e)
    }
}

impl From<DashboardError> for CogwatchCliError {
    fn from(e: DashboardError) -> Self {
        CogwatchCliError::Dashboard(e)
    }
}

impl From<serde_json::Error> for CogwatchCliError {
    fn from(e: serde_json::Error) -> Self {
        CogwatchCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CogwatchCliError> for CliError {
    fn from(e: CogwatchCliError) -> Self {
        match e {
            CogwatchCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CogwatchCliError::Dashboard(e) => CliError {
                code: "DATA_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'cogwatch validate' against the CSV export".to_string()),
            },
            CogwatchCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CogwatchCliError::MissingModel => CliError {
                code: "MISSING_MODEL".to_string(),
                message: "A loaded file needs a classifier; pass --model-cmd".to_string(),
                hint: Some("Point --model-cmd at the inference program".to_string()),
            },
            CogwatchCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{count} contract problems found"),
                hint: Some("Fix the export and retry".to_string()),
            },
            CogwatchCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct SelectorReport {
    identities: Vec<String>,
    dates: Vec<String>,
}

#[derive(serde::Serialize)]
struct ValidationReport {
    parse_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_error: Option<String>,
    rows: usize,
    identities: usize,
    metric_columns: usize,
    expected_metric_columns: usize,
    missing_chart_columns: Vec<String>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
