// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes plus listing and record rendering.

use serde::Serialize;
use std::fmt::Write as _;
use std::time::Instant;

use crate::store::{AppSummary, ApplicationRecord};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                println!("{message}");
            }
            OutputMode::Json => {
                print_json(&JsonEvent {
                    event: "success",
                    message,
                    kind: None,
                    duration_secs: self.duration(),
                });
            }
        }
    }

    /// Print a non-fatal warning to stderr (suppressed in quiet mode).
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => {
                eprint_json(&JsonEvent {
                    event: "warning",
                    message,
                    kind: None,
                    duration_secs: None,
                });
            }
        }
    }

    /// Print an error message. `kind` is included in JSON mode only.
    pub fn error(&self, kind: &str, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                eprint_json(&JsonEvent {
                    event: "error",
                    message,
                    kind: Some(kind),
                    duration_secs: self.duration(),
                });
            }
        }
    }

    /// Print the application listing.
    pub fn apps(&self, apps: &[AppSummary]) {
        match self.mode {
            OutputMode::Json => print_json(&DataEvent {
                event: "apps",
                data: apps,
            }),
            OutputMode::Normal | OutputMode::Quiet => {
                if apps.is_empty() {
                    if self.mode == OutputMode::Normal {
                        println!("No applications");
                    }
                } else {
                    print!("{}", apps_table(apps));
                }
            }
        }
    }

    /// Print one application record in full.
    pub fn record(&self, record: &ApplicationRecord) {
        match self.mode {
            OutputMode::Json => print_json(&DataEvent {
                event: "app",
                data: record,
            }),
            OutputMode::Normal | OutputMode::Quiet => print!("{}", record_details(record)),
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct DataEvent<'a, T: Serialize + ?Sized> {
    event: &'a str,
    data: &'a T,
}

fn print_json<T: Serialize>(value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        println!("{json}");
    }
}

fn eprint_json<T: Serialize>(value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        eprintln!("{json}");
    }
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

/// Render summaries as an aligned table with a header row.
pub fn apps_table(apps: &[AppSummary]) -> String {
    const HEADERS: [&str; 5] = ["NAME", "BUILD", "CONTAINER", "WEBHOOK", "FAILED STEP"];

    let rows: Vec<[String; 5]> = apps
        .iter()
        .map(|a| {
            [
                a.name.to_string(),
                or_dash(a.build_type.map(|b| b.to_string())),
                a.last_container_status.to_string(),
                a.webhook_status.to_string(),
                or_dash(a.last_failed_step.map(|s| s.to_string())),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: &[&str]| {
        let line: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        let _ = writeln!(out, "{}", line.join("  ").trim_end());
    };
    push_row(&HEADERS);
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        push_row(&cells);
    }
    out
}

/// Render a record as `key: value` lines.
pub fn record_details(record: &ApplicationRecord) -> String {
    let fields = [
        ("Name", record.name.to_string()),
        ("Source", record.source_url.to_string()),
        ("Branch", record.branch.to_string()),
        ("Description", record.description.clone()),
        ("Build type", or_dash(record.build_type.map(|b| b.to_string()))),
        ("Container", record.last_container_status.to_string()),
        ("Webhook", record.webhook_status.to_string()),
        (
            "Last completed step",
            or_dash(record.last_completed_step.map(|s| s.to_string())),
        ),
        (
            "Last failed step",
            or_dash(record.last_failed_step.map(|s| s.to_string())),
        ),
        ("Failure", or_dash(record.failure_reason.clone())),
        ("Created", record.created_at.to_rfc3339()),
        ("Updated", record.updated_at.to_rfc3339()),
    ];

    let mut out = String::new();
    for (label, value) in fields {
        let _ = writeln!(out, "{:<20} {}", format!("{label}:"), value);
    }
    out
}
