use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use indicatif::ProgressBar;
use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Raw,
    Json,
    Filtered,
}

impl OutputMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "raw" | "text" | "txt" => Some(Self::Raw),
            "json" => Some(Self::Json),
            "filtered" | "urls" => Some(Self::Filtered),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputMode::Raw => "raw",
            OutputMode::Json => "json",
            OutputMode::Filtered => "filtered",
        }
    }
}

// one finished task that produced parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    #[serde(rename = "Running_Command")]
    pub running_command: String,
    pub method: String,
    pub url: String,
    pub transformed_url: String,
    pub parameters: Vec<String>,
    #[serde(skip)]
    pub report_line: String,
}

pub fn render_raw(result: &ScanResult) -> String {
    format!(
        "{}\nTransformed URL [{}]: {}\n",
        result.report_line, result.method, result.transformed_url
    )
}

pub fn render_json(result: &ScanResult) -> String {
    let mut out = serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string());
    out.push('\n');
    out
}

pub fn render_filtered(result: &ScanResult) -> String {
    format!("{}\n", result.transformed_url)
}

pub fn render(result: &ScanResult, mode: OutputMode) -> String {
    match mode {
        OutputMode::Raw => render_raw(result),
        OutputMode::Json => render_json(result),
        OutputMode::Filtered => render_filtered(result),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileMode {
    Truncate,
    Append,
}

pub async fn open_output_file(path: &Path, mode: FileMode) -> std::io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.create(true);
    match mode {
        FileMode::Truncate => opts.write(true).truncate(true),
        FileMode::Append => opts.append(true),
    };
    opts.open(path).await
}

/// Writes rendered results to stdout and, optionally, a shared file.
///
/// Every result is rendered into one buffer first and written with a single
/// call per destination, so concurrent tasks never split each other's lines.
#[derive(Clone)]
pub struct ResultSink {
    mode: OutputMode,
    file: Option<Arc<Mutex<File>>>,
    stdout: bool,
    progress: ProgressBar,
}

impl ResultSink {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            file: None,
            stdout: true,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_file(mut self, file: File) -> Self {
        self.file = Some(Arc::new(Mutex::new(file)));
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Stops echoing to stdout; the file (if any) still receives results.
    #[cfg(test)]
    pub(crate) fn without_stdout(mut self) -> Self {
        self.stdout = false;
        self
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub async fn emit(&self, result: &ScanResult) {
        let block = render(result, self.mode);

        if self.stdout {
            self.progress.suspend(|| {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                if let Err(e) = handle
                    .write_all(block.as_bytes())
                    .and_then(|_| handle.flush())
                {
                    warn!("failed to write to stdout: {e}");
                }
            });
        }

        if let Some(file) = self.file.as_ref() {
            let mut file = file.lock().await;
            if let Err(e) = file.write_all(block.as_bytes()).await {
                warn!("failed to write to output file: {e}");
                return;
            }
            if let Err(e) = file.flush().await {
                warn!("failed to flush output file: {e}");
            }
        }
    }
}
