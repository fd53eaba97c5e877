//! Command-line front end: one dashboard action per invocation.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use zeroize::Zeroize;

use crate::config::{self, DashboardConfig};
use crate::dashboard::{ActionOutcome, DashboardController, DashboardError};
use crate::interaction::{Interaction, Notice, NoticeLevel};
use crate::models::{DraftField, PatientRecord, ReportStatus, PHONE_NUMBER_LEN};
use crate::service::HttpRecordService;
use crate::session::{
    CognitoSessionProvider, SessionProvider, StaticSessionProvider, TokenStore,
};

/// Pre-issued identity token; skips the identity provider entirely.
pub const ENV_ID_TOKEN: &str = "LABDASH_ID_TOKEN";
pub const ENV_PASSWORD: &str = "LABDASH_PASSWORD";

#[derive(Parser)]
#[command(name = "labdash")]
#[command(about = "Lab patient records and diagnostic reports", version)]
pub struct Cli {
    /// Config file to read instead of the per-user one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and keep the session for later commands.
    Login {
        #[arg(long)]
        username: String,
    },
    Logout,
    /// Show the signed-in lab.
    Whoami,
    List {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Register a patient.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: String,
        #[arg(long)]
        gender: String,
        /// Exactly 10 digits.
        #[arg(long, value_parser = parse_phone)]
        phone: String,
        #[arg(long)]
        language: String,
        #[arg(long)]
        report_url: Option<String>,
    },
    Delete {
        patient_id: String,
        /// Skip the confirmation prompt.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    Status {
        patient_id: String,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// Upload a report (pdf, jpg, jpeg, png) and mark the record Completed.
    Upload {
        patient_id: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Pending,
    Completed,
}

impl From<StatusArg> for ReportStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Pending => ReportStatus::Pending,
            StatusArg::Completed => ReportStatus::Completed,
        }
    }
}

/// Why a command failed. `Shown` means the user already saw a notice.
#[derive(Debug)]
enum Failure {
    Shown,
    Message(String),
}

impl From<DashboardError> for Failure {
    fn from(error: DashboardError) -> Self {
        match error {
            DashboardError::Auth(e) => Failure::Message(e.to_string()),
            other => {
                tracing::debug!(error = %other, "Command failed");
                Failure::Shown
            }
        }
    }
}

/// Input cap for `--phone`; the dashboard checks the exact length.
fn parse_phone(raw: &str) -> Result<String, String> {
    if raw.chars().count() > PHONE_NUMBER_LEN {
        return Err(format!("at most {PHONE_NUMBER_LEN} digits"));
    }
    Ok(raw.to_string())
}

fn message<E: std::fmt::Display>(error: E) -> Failure {
    Failure::Message(error.to_string())
}

/// Terminal prompts on stdin, notices on stderr.
pub struct TerminalInteraction {
    assume_yes: bool,
    file: Option<PathBuf>,
}

impl TerminalInteraction {
    pub fn new(assume_yes: bool, file: Option<PathBuf>) -> Self {
        Self { assume_yes, file }
    }
}

fn prompt_line(prompt: &str) -> Option<String> {
    let mut stderr = io::stderr();
    // A prompt that fails to print still reads the answer.
    write!(stderr, "{prompt}").ok();
    stderr.flush().ok();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

impl Interaction for TerminalInteraction {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        prompt_line(&format!("{prompt} [y/N] "))
            .is_some_and(|answer| matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    fn pick_report_file(&mut self, accepted_extensions: &[&str]) -> Option<PathBuf> {
        if let Some(file) = self.file.take() {
            return Some(file);
        }
        prompt_line(&format!("Report file ({}): ", accepted_extensions.join(", ")))
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
    }

    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => eprintln!("{}", notice.message),
            NoticeLevel::Error => eprintln!("error: {}", notice.message),
        }
    }
}

/// Parse arguments and run one command.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Shown) => ExitCode::FAILURE,
        Err(Failure::Message(message)) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<(), Failure> {
    let config = match &cli.config {
        Some(path) => DashboardConfig::load_from(path),
        None => DashboardConfig::load(),
    }
    .map_err(message)?;
    tracing::debug!(api = %config.api_base_url, region = %config.identity.region, "Configuration loaded");

    match cli.command {
        Commands::Login { username } => login(&config, &username),
        Commands::Logout => {
            session_provider(&config)?.sign_out().map_err(message)?;
            println!("Signed out");
            Ok(())
        }
        Commands::Whoami => {
            let session = session_provider(&config)?
                .current_session()
                .map_err(message)?;
            println!("{}", session.lab_id());
            Ok(())
        }
        Commands::List { json } => {
            let mut dashboard = open_dashboard(&config, TerminalInteraction::new(false, None))?;
            dashboard.fetch_records()?;
            if json {
                let rendered =
                    serde_json::to_string_pretty(dashboard.records()).map_err(message)?;
                println!("{rendered}");
            } else {
                print_records(dashboard.records());
            }
            Ok(())
        }
        Commands::Add {
            name,
            age,
            gender,
            phone,
            language,
            report_url,
        } => {
            let mut dashboard = open_dashboard(&config, TerminalInteraction::new(false, None))?;
            dashboard.update_draft_field(DraftField::Name, &name);
            dashboard.update_draft_field(DraftField::Age, &age);
            dashboard.update_draft_field(DraftField::Gender, &gender);
            dashboard.update_draft_field(DraftField::PhoneNumber, &phone);
            dashboard.update_draft_field(DraftField::Language, &language);
            if let Some(url) = report_url {
                dashboard.update_draft_field(DraftField::ReportUrl, &url);
            }
            let outcome = dashboard.submit_record()?;
            finish(outcome, dashboard.records())
        }
        Commands::Delete { patient_id, yes } => {
            let mut dashboard = open_dashboard(&config, TerminalInteraction::new(yes, None))?;
            let outcome = dashboard.delete_record(&patient_id)?;
            finish(outcome, dashboard.records())
        }
        Commands::Status { patient_id, status } => {
            let mut dashboard = open_dashboard(&config, TerminalInteraction::new(false, None))?;
            let outcome = dashboard.update_status(&patient_id, status.into())?;
            finish(outcome, dashboard.records())
        }
        Commands::Upload { patient_id, file } => {
            let mut dashboard = open_dashboard(&config, TerminalInteraction::new(false, file))?;
            let outcome = dashboard.upload_report(&patient_id)?;
            finish(outcome, dashboard.records())
        }
    }
}

fn login(config: &DashboardConfig, username: &str) -> Result<(), Failure> {
    let provider = cognito_provider(config)?;
    let mut password = match std::env::var(ENV_PASSWORD) {
        Ok(password) if !password.is_empty() => password,
        _ => prompt_line("Password: ")
            .ok_or_else(|| Failure::Message("No password given".into()))?,
    };

    let result = provider.sign_in(username, &password);
    password.zeroize();

    let session = result.map_err(message)?;
    println!("Signed in as {}", session.email);
    Ok(())
}

fn cognito_provider(config: &DashboardConfig) -> Result<CognitoSessionProvider, Failure> {
    let store = TokenStore::new(config::session_file().map_err(message)?);
    CognitoSessionProvider::new(&config.identity, store, config.request_timeout_secs)
        .map_err(message)
}

fn session_provider(config: &DashboardConfig) -> Result<Box<dyn SessionProvider>, Failure> {
    match std::env::var(ENV_ID_TOKEN) {
        Ok(token) if !token.trim().is_empty() => {
            tracing::debug!("Using identity token from environment");
            let provider = StaticSessionProvider::from_id_token(token.trim()).map_err(message)?;
            Ok(Box::new(provider))
        }
        _ => Ok(Box::new(cognito_provider(config)?)),
    }
}

type CliDashboard =
    DashboardController<Box<dyn SessionProvider>, HttpRecordService, TerminalInteraction>;

fn open_dashboard(config: &DashboardConfig, ui: TerminalInteraction) -> Result<CliDashboard, Failure> {
    let session = session_provider(config)?;
    let service = HttpRecordService::new(&config.api_base_url, config.request_timeout_secs)
        .map_err(message)?;
    Ok(DashboardController::new(session, service, ui))
}

fn finish(outcome: ActionOutcome, records: &[PatientRecord]) -> Result<(), Failure> {
    match outcome {
        ActionOutcome::Done => print_records(records),
        ActionOutcome::Cancelled => eprintln!("Cancelled"),
    }
    Ok(())
}

fn print_records(records: &[PatientRecord]) {
    if records.is_empty() {
        println!("No patients.");
        return;
    }
    for line in render_table(records) {
        println!("{line}");
    }
}

const HEADERS: [&str; 8] = [
    "ID", "NAME", "AGE", "GENDER", "PHONE", "LANGUAGE", "STATUS", "REPORT",
];

fn row(record: &PatientRecord) -> [String; 8] {
    [
        record.patient_id.clone(),
        record.name.clone(),
        record.age.clone(),
        record.gender.clone(),
        record.phone_number.clone().unwrap_or_default(),
        record.language.clone().unwrap_or_default(),
        record.status.to_string(),
        (if record.has_report() { "yes" } else { "-" }).to_string(),
    ]
}

/// Left-aligned columns, two spaces apart.
fn render_table(records: &[PatientRecord]) -> Vec<String> {
    let rows: Vec<[String; 8]> = records.iter().map(row).collect();
    let mut widths = HEADERS.map(|h| h.chars().count());
    for cells in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |cells: &[&str]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_line(&HEADERS[..])];
    for cells in &rows {
        let cells: Vec<&str> = cells.iter().map(String::as_str).collect();
        lines.push(format_line(&cells));
    }
    lines
}
