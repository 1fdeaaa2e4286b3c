use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::tasks::Task;

pub const URL_PLACEHOLDER: &str = "{urlStr}";
pub const DEFAULT_COMMAND_TEMPLATE: &str = "arjun -u {urlStr}";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationOutcome {
    pub command_text: String,
    pub raw_output: String,
    pub succeeded: bool,
    pub failure: Option<String>,
}

impl InvocationOutcome {
    fn failed(command_text: String, raw_output: String, failure: String) -> Self {
        Self {
            command_text,
            raw_output,
            succeeded: false,
            failure: Some(failure),
        }
    }
}

/// Runs the discovery tool for one task.
///
/// Implementations must not panic or error on tool failure; they report it
/// through `InvocationOutcome::succeeded`.
pub trait Invoke: Send + Sync + 'static {
    fn invoke(&self, task: &Task) -> impl Future<Output = InvocationOutcome> + Send;
}

/// A command template split from its optional inline method list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandTemplate {
    pub template: String,
    pub inline_methods: Option<String>,
}

impl CommandTemplate {
    /// Accepts both `arjun -u {urlStr}` and the older
    /// `arjun -u {urlStr} -m GET,POST` form, where the text after `-m` is
    /// the method list.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err("command template is empty".to_string());
        }
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        match tokens.iter().position(|t| *t == "-m") {
            Some(idx) => {
                let template = tokens[..idx].join(" ");
                let methods = tokens[idx + 1..].join("");
                if template.is_empty() {
                    return Err(format!("command template '{raw}' has no executable"));
                }
                Ok(Self {
                    template,
                    inline_methods: Some(methods),
                })
            }
            None => Ok(Self {
                template: tokens.join(" "),
                inline_methods: None,
            }),
        }
    }

    pub fn has_url_placeholder(&self) -> bool {
        self.template.contains(URL_PLACEHOLDER)
    }

    pub fn render(&self, url: &str) -> String {
        self.template.replace(URL_PLACEHOLDER, url)
    }
}

#[derive(Clone, Debug)]
pub struct ArjunInvoker {
    pub template: CommandTemplate,
    pub wordlist: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl ArjunInvoker {
    pub fn new(template: CommandTemplate) -> Self {
        Self {
            template,
            wordlist: None,
            timeout: None,
        }
    }

    pub fn with_wordlist(mut self, wordlist: Option<PathBuf>) -> Self {
        self.wordlist = wordlist;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build_args(&self, task: &Task) -> Vec<String> {
        let mut args: Vec<String> = self
            .template
            .render(&task.url)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        args.push("-m".to_string());
        args.push(task.method.clone());
        if let Some(wordlist) = self.wordlist.as_ref() {
            args.push("-w".to_string());
            args.push(wordlist.to_string_lossy().to_string());
        }
        args
    }

    async fn run(&self, task: &Task) -> InvocationOutcome {
        let args = self.build_args(task);
        let command_text = args.join(" ");
        let Some((program, rest)) = args.split_first() else {
            return InvocationOutcome::failed(command_text, String::new(), "empty command".into());
        };

        debug!(command = %command_text, "running command");

        let child = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(child) => child,
            Err(e) => {
                return InvocationOutcome::failed(
                    command_text,
                    String::new(),
                    format!("failed to launch '{program}': {e}"),
                )
            }
        };

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(res) => res,
                Err(_) => {
                    // dropping the future drops the child, which kills it
                    return InvocationOutcome::failed(
                        command_text,
                        String::new(),
                        format!("timed out after {}s", limit.as_secs_f32()),
                    );
                }
            },
            None => child.wait_with_output().await,
        };

        match output {
            Ok(output) => {
                let mut raw_output = String::from_utf8_lossy(&output.stdout).into_owned();
                // stderr starts on its own line even after an unterminated progress line
                if !raw_output.is_empty() && !raw_output.ends_with('\n') {
                    raw_output.push('\n');
                }
                raw_output.push_str(&String::from_utf8_lossy(&output.stderr));
                if output.status.success() {
                    InvocationOutcome {
                        command_text,
                        raw_output,
                        succeeded: true,
                        failure: None,
                    }
                } else {
                    InvocationOutcome::failed(
                        command_text,
                        raw_output,
                        format!("exited with {}", output.status),
                    )
                }
            }
            Err(e) => InvocationOutcome::failed(
                command_text,
                String::new(),
                format!("failed to wait for command: {e}"),
            ),
        }
    }
}

impl Invoke for ArjunInvoker {
    fn invoke(&self, task: &Task) -> impl Future<Output = InvocationOutcome> + Send {
        self.run(task)
    }
}
