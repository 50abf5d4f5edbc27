//! Output formatting for CLI results
//!
//! Three output formats:
//! - Table: Human-readable tables (default)
//! - JSON: Structured JSON for scripting and automation
//! - Quiet: Minimal output, exit codes only

use std::path::Path;
use std::str::FromStr;

use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;
use sft_core::{Authenticity, TransferSession};

use crate::ExitCode;

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for scripting
    Json,
    /// Minimal output - exit codes only
    Quiet,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "quiet" => Ok(Self::Quiet),
            _ => Err(format!("Unknown output format: {s}")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Quiet => write!(f, "quiet"),
        }
    }
}

/// Standard JSON response wrapper
#[derive(Serialize)]
pub struct JsonResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// RFC 3339 timestamp
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            command: None,
        }
    }

    pub fn success_with_command(data: T, command: &str) -> Self {
        Self {
            command: Some(command.to_string()),
            ..Self::success(data)
        }
    }
}

impl JsonResponse<()> {
    pub fn error(message: &str) -> JsonResponse<()> {
        JsonResponse {
            success: false,
            data: None,
            error: Some(message.to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
            command: None,
        }
    }
}

/// Result of `keygen`.
#[derive(Debug, Clone, Serialize)]
pub struct KeygenReport {
    pub algorithm: String,
    pub fingerprint: String,
    pub public_key_path: String,
    pub private_key_path: String,
}

/// Result of `fingerprint`.
#[derive(Debug, Clone, Serialize)]
pub struct FingerprintReport {
    pub key_path: String,
    pub fingerprint: String,
    pub short_fingerprint: String,
}

/// Result of `seal` and `send`.
#[derive(Debug, Clone, Serialize)]
pub struct SealReport {
    pub file_name: String,
    pub media_type: String,
    pub size: usize,
    pub algorithm: String,
    pub fingerprint: String,
    /// Set when the envelope was written to disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envelope_path: Option<String>,
    /// Set when the envelope went through a relay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay: Option<String>,
    /// The key pair was generated for this transfer only.
    pub ephemeral_key: bool,
}

/// One opened or received file.
#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    pub file_name: String,
    pub media_type: String,
    pub size: usize,
    pub algorithm: String,
    pub sender_fingerprint: String,
    /// "verified", "unverified" or "rejected"
    pub authenticity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<String>,
}

impl TransferReport {
    pub fn new(session: &TransferSession, saved_to: Option<&Path>) -> Self {
        let reason = match session.authenticity() {
            Authenticity::Rejected(reason) => Some(reason.to_string()),
            _ => None,
        };
        Self {
            file_name: session.file_name().to_string(),
            media_type: session.media_type().to_string(),
            size: session.bytes().len(),
            algorithm: session.algorithm().to_string(),
            sender_fingerprint: session
                .sender_fingerprint()
                .unwrap_or_else(|_| "(malformed key)".to_string()),
            authenticity: session.authenticity().label().to_string(),
            reason,
            saved_to: saved_to.map(|p| p.display().to_string()),
        }
    }
}

#[derive(Serialize)]
struct TransfersOutput<'a> {
    transfers: &'a [TransferReport],
    count: usize,
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<&'a str>,
    timestamp: String,
}

/// Formats output for different modes
pub struct OutputFormatter {
    format: OutputFormat,
    verbose: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_quiet(&self) -> bool {
        self.format == OutputFormat::Quiet
    }

    pub fn format_keygen(&self, report: &KeygenReport) -> String {
        match self.format {
            OutputFormat::Table => property_table(&[
                ("Algorithm", report.algorithm.as_str()),
                ("Fingerprint", report.fingerprint.as_str()),
                ("Public Key", report.public_key_path.as_str()),
                ("Private Key", report.private_key_path.as_str()),
            ]),
            OutputFormat::Json => self.to_json_response(report, "keygen"),
            OutputFormat::Quiet => String::new(),
        }
    }

    pub fn format_fingerprint(&self, report: &FingerprintReport) -> String {
        match self.format {
            OutputFormat::Table => property_table(&[
                ("Key", report.key_path.as_str()),
                ("Fingerprint", report.fingerprint.as_str()),
                ("Short", report.short_fingerprint.as_str()),
            ]),
            OutputFormat::Json => self.to_json_response(report, "fingerprint"),
            OutputFormat::Quiet => String::new(),
        }
    }

    pub fn format_seal(&self, report: &SealReport, command: &str) -> String {
        match self.format {
            OutputFormat::Table => {
                let size = report.size.to_string();
                let mut rows = vec![
                    ("File", report.file_name.as_str()),
                    ("Media Type", display_media_type(&report.media_type)),
                    ("Size", size.as_str()),
                    ("Algorithm", report.algorithm.as_str()),
                    ("Sender Fingerprint", report.fingerprint.as_str()),
                ];
                if let Some(path) = &report.envelope_path {
                    rows.push(("Envelope", path.as_str()));
                }
                if let Some(relay) = &report.relay {
                    rows.push(("Relay", relay.as_str()));
                }
                if report.ephemeral_key {
                    rows.push(("Key", "ephemeral"));
                }
                property_table(&rows)
            }
            OutputFormat::Json => self.to_json_response(report, command),
            OutputFormat::Quiet => String::new(),
        }
    }

    pub fn format_transfers(&self, reports: &[TransferReport], command: &str) -> String {
        match self.format {
            OutputFormat::Table => transfers_table(reports),
            OutputFormat::Json => self.to_json_response(
                &TransfersOutput {
                    transfers: reports,
                    count: reports.len(),
                },
                command,
            ),
            OutputFormat::Quiet => String::new(),
        }
    }

    /// Format error with exit code context
    pub fn format_error_with_code(&self, error: &anyhow::Error, code: ExitCode) -> String {
        match self.format {
            OutputFormat::Table => format!("Error: {error:#}"),
            OutputFormat::Json => {
                let response = JsonResponse::<()>::error(&format!("{error:#}"));
                match serde_json::to_value(&response) {
                    Ok(mut output) => {
                        output["exit_code"] = serde_json::json!(code as i32);
                        output["exit_code_name"] = serde_json::json!(code.name());
                        self.to_json(&output)
                    }
                    Err(e) => format!("{{\"error\": \"{e}\"}}"),
                }
            }
            OutputFormat::Quiet => String::new(),
        }
    }

    /// Progress message, verbose table mode only
    pub fn progress(&self, message: &str) {
        if self.verbose && self.format == OutputFormat::Table {
            eprintln!("... {message}");
        }
    }

    pub fn success(&self, message: &str) {
        if self.format == OutputFormat::Table {
            println!("✓ {message}");
        }
    }

    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Table => eprintln!("✗ {message}"),
            OutputFormat::Json => println!(
                "{}",
                self.to_json(&MessageOutput {
                    error: Some(message),
                    warning: None,
                    timestamp: chrono::Utc::now().to_rfc3339(),
                })
            ),
            OutputFormat::Quiet => {}
        }
    }

    pub fn warning(&self, message: &str) {
        match self.format {
            OutputFormat::Table => eprintln!("⚠ {message}"),
            OutputFormat::Json => eprintln!(
                "{}",
                self.to_json(&MessageOutput {
                    error: None,
                    warning: Some(message),
                    timestamp: chrono::Utc::now().to_rfc3339(),
                })
            ),
            OutputFormat::Quiet => {}
        }
    }

    /// Print formatted output, skipping empty strings.
    pub fn print(&self, output: &str) {
        if !output.is_empty() {
            println!("{output}");
        }
    }

    fn to_json<T: Serialize>(&self, value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }

    fn to_json_response<T: Serialize>(&self, value: &T, command: &str) -> String {
        self.to_json(&JsonResponse::success_with_command(value, command))
    }
}

fn display_media_type(media_type: &str) -> &str {
    if media_type.is_empty() {
        "-"
    } else {
        media_type
    }
}

fn property_table(rows: &[(&str, &str)]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Property", "Value"]);
    for (property, value) in rows {
        table.add_row(vec![*property, *value]);
    }
    table.to_string()
}

fn transfers_table(reports: &[TransferReport]) -> String {
    if reports.is_empty() {
        return "No files received.".to_string();
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["File", "Type", "Size", "Algorithm", "Sender", "Status", "Saved To"]);
    for r in reports {
        let status = match &r.reason {
            Some(reason) => format!("{}: {reason}", r.authenticity),
            None => r.authenticity.clone(),
        };
        table.add_row(vec![
            r.file_name.clone(),
            display_media_type(&r.media_type).to_string(),
            r.size.to_string(),
            r.algorithm.clone(),
            r.sender_fingerprint.clone(),
            status,
            r.saved_to.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table.to_string()
}
