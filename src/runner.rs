use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressBar;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use crate::dispatcher::{DispatchSummary, Dispatcher, TaskOutcome, DEFAULT_CONCURRENCY};
use crate::invoker::{ArjunInvoker, CommandTemplate, Invoke, DEFAULT_COMMAND_TEMPLATE};
use crate::output::ResultSink;
use crate::output::ScanResult;
use crate::parser;
use crate::tasks::{self, Task, TaskSetError};
use crate::transform::{self, ValueMode};
use crate::wordlist::{self, WordlistError, DEFAULT_WORDLIST_URL};

#[derive(Clone, Debug)]
pub struct Options {
    pub command_template: String,
    pub methods: Option<String>,
    pub wordlist: Option<PathBuf>,
    pub wordlist_url: String,
    pub concurrency: usize,
    pub url_concurrency: Option<usize>,
    pub timeout: Option<Duration>,
    pub value_mode: ValueMode,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            command_template: DEFAULT_COMMAND_TEMPLATE.to_string(),
            methods: None,
            wordlist: None,
            wordlist_url: DEFAULT_WORDLIST_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            url_concurrency: None,
            timeout: None,
            value_mode: ValueMode::Random,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid command template: {message}")]
    InvalidTemplate { message: String },

    #[error("command template '{template}' has no {{urlStr}} placeholder")]
    MissingUrlPlaceholder { template: String },

    #[error("invalid concurrency {value}, expected a positive integer")]
    InvalidConcurrency { value: usize },

    #[error("invalid url concurrency {value}, expected a positive integer")]
    InvalidUrlConcurrency { value: usize },

    #[error("invalid timeout, expected a positive duration")]
    InvalidTimeout,

    #[error(transparent)]
    TaskSet(#[from] TaskSetError),

    #[error(transparent)]
    Wordlist(#[from] WordlistError),
}

#[derive(Clone, Debug)]
pub struct ScanSummary {
    pub elapsed: Duration,
    pub tasks: DispatchSummary,
}

/// A validated scan configuration.
///
/// `Runner<ArjunInvoker>` is what the binary uses; any `Invoke` can stand in
/// for the external tool.
pub struct Runner<I: Invoke = ArjunInvoker> {
    invoker: Arc<I>,
    methods: Vec<String>,
    wordlist: Option<(PathBuf, String)>,
    concurrency: usize,
    url_concurrency: Option<usize>,
    value_mode: ValueMode,
}

impl Runner<ArjunInvoker> {
    pub fn new(options: Options) -> Result<Self, RunnerError> {
        let template = CommandTemplate::parse(&options.command_template)
            .map_err(|message| RunnerError::InvalidTemplate { message })?;
        if !template.has_url_placeholder() {
            return Err(RunnerError::MissingUrlPlaceholder {
                template: template.template,
            });
        }
        if options.timeout.is_some_and(|t| t.is_zero()) {
            return Err(RunnerError::InvalidTimeout);
        }

        // an explicit method list wins over one embedded in the template
        let methods_raw = options
            .methods
            .clone()
            .or_else(|| template.inline_methods.clone())
            .unwrap_or_else(|| "GET".to_string());
        let methods = tasks::parse_methods_csv(&methods_raw)?;

        let invoker = ArjunInvoker::new(template)
            .with_wordlist(options.wordlist.clone())
            .with_timeout(options.timeout);
        let wordlist = options
            .wordlist
            .clone()
            .map(|path| (path, options.wordlist_url.clone()));

        Self::with_invoker(invoker, methods, &options).map(|mut runner| {
            runner.wordlist = wordlist;
            runner
        })
    }
}

impl<I: Invoke> Runner<I> {
    pub fn with_invoker(
        invoker: I,
        methods: Vec<String>,
        options: &Options,
    ) -> Result<Self, RunnerError> {
        if options.concurrency == 0 {
            return Err(RunnerError::InvalidConcurrency {
                value: options.concurrency,
            });
        }
        if let Some(value) = options.url_concurrency.filter(|v| *v == 0) {
            return Err(RunnerError::InvalidUrlConcurrency { value });
        }
        if methods.is_empty() {
            return Err(TaskSetError::NoMethods.into());
        }
        Ok(Self {
            invoker: Arc::new(invoker),
            methods,
            wordlist: None,
            concurrency: options.concurrency,
            url_concurrency: options.url_concurrency,
            value_mode: options.value_mode,
        })
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Fetches the wordlist if it is configured and not on disk yet.
    pub async fn prepare(&self) -> Result<(), RunnerError> {
        if let Some((path, url)) = self.wordlist.as_ref() {
            wordlist::ensure_wordlist(path, url).await?;
        }
        Ok(())
    }

    /// Builds the task set for `urls` and runs every task to completion.
    ///
    /// Only configuration problems are returned as errors; individual task
    /// failures are counted in the summary.
    pub async fn run(
        &self,
        urls: &[String],
        sink: ResultSink,
        progress: ProgressBar,
    ) -> Result<ScanSummary, RunnerError> {
        let started_at = Instant::now();
        let tasks = tasks::build_tasks(urls, &self.methods)?;
        self.prepare().await?;

        progress.set_length(tasks.len() as u64);
        let dispatcher = Dispatcher::new(self.concurrency, self.url_concurrency)
            .with_progress(progress.clone());

        let invoker = self.invoker.clone();
        let value_mode = self.value_mode;
        let summary = dispatcher
            .run(tasks, move |task| {
                let invoker = invoker.clone();
                let sink = sink.clone();
                async move { process_task(invoker.as_ref(), &task, value_mode, &sink).await }
            })
            .await;
        progress.finish_and_clear();

        Ok(ScanSummary {
            elapsed: started_at.elapsed(),
            tasks: summary,
        })
    }
}

/// Builds the result for one task from the tool's raw output, or `None`
/// when the output names no parameters.
pub fn build_result(
    task: &Task,
    command_text: &str,
    raw_output: &str,
    value_mode: ValueMode,
) -> Option<ScanResult> {
    let finding = parser::parse_output(raw_output);
    if finding.is_empty() {
        return None;
    }
    let mut values = value_mode.generator();
    let transformed_url =
        transform::transform_url(&task.url, &finding.parameter_names, values.as_mut());
    Some(ScanResult {
        running_command: command_text.to_string(),
        method: task.method.clone(),
        url: task.url.clone(),
        transformed_url,
        parameters: finding.parameter_names,
        report_line: finding.line,
    })
}

pub async fn process_task<I: Invoke>(
    invoker: &I,
    task: &Task,
    value_mode: ValueMode,
    sink: &ResultSink,
) -> TaskOutcome {
    let outcome = invoker.invoke(task).await;
    if !outcome.succeeded {
        debug!(
            url = %task.url,
            method = %task.method,
            command = %outcome.command_text,
            "command failed: {}",
            outcome.failure.as_deref().unwrap_or("unknown error")
        );
        return TaskOutcome::InvocationFailed;
    }

    match build_result(task, &outcome.command_text, &outcome.raw_output, value_mode) {
        Some(result) => {
            sink.emit(&result).await;
            TaskOutcome::Reported
        }
        None => {
            debug!(url = %task.url, method = %task.method, "no parameters found");
            TaskOutcome::NothingFound
        }
    }
}
