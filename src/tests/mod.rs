use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::ProgressBar;

use crate::invoker::{InvocationOutcome, Invoke};
use crate::output::{self, FileMode, OutputMode, ResultSink};
use crate::runner::{self, Options, Runner, RunnerError};
use crate::tasks::{Task, TaskSetError};
use crate::transform::ValueMode;

// stands in for arjun: canned output per (url, method), empty output otherwise
#[derive(Default)]
struct ScriptedInvoker {
    outputs: HashMap<(String, String), (bool, String)>,
    calls: AtomicUsize,
}

impl ScriptedInvoker {
    fn reply(mut self, url: &str, method: &str, succeeded: bool, raw: &str) -> Self {
        self.outputs.insert(
            (url.to_string(), method.to_string()),
            (succeeded, raw.to_string()),
        );
        self
    }
}

impl Invoke for ScriptedInvoker {
    fn invoke(&self, task: &Task) -> impl Future<Output = InvocationOutcome> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (succeeded, raw_output) = self
            .outputs
            .get(&(task.url.clone(), task.method.clone()))
            .cloned()
            .unwrap_or((true, String::new()));
        let command_text = format!("arjun -u {} -m {}", task.url, task.method);
        async move {
            InvocationOutcome {
                command_text,
                raw_output,
                succeeded,
                failure: (!succeeded).then(|| "exited with exit status: 1".to_string()),
            }
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn sequential() -> Options {
    Options {
        value_mode: ValueMode::Sequential,
        ..Options::default()
    }
}

async fn file_sink(path: &Path, mode: OutputMode) -> ResultSink {
    let file = output::open_output_file(path, FileMode::Truncate)
        .await
        .unwrap();
    ResultSink::new(mode).with_file(file).without_stdout()
}

#[test]
fn found_parameters_build_the_expected_result() {
    let task = Task {
        url: "http://example.com".to_string(),
        method: "GET".to_string(),
    };
    let result = runner::build_result(
        &task,
        "arjun -u http://example.com -m GET",
        "[*] Probing the target\nParameters found: id, name\n",
        ValueMode::Sequential,
    )
    .unwrap();
    assert_eq!(result.parameters, vec!["id", "name"]);
    assert_eq!(
        result.transformed_url,
        "http://example.com?id=msarjun1&name=msarjun2"
    );
    assert_eq!(result.method, "GET");
    assert_eq!(result.running_command, "arjun -u http://example.com -m GET");
}

#[test]
fn no_report_line_builds_nothing() {
    let task = Task {
        url: "http://example.com".to_string(),
        method: "GET".to_string(),
    };
    assert!(runner::build_result(&task, "cmd", "[-] No parameters", ValueMode::Random).is_none());
}

#[tokio::test]
async fn end_to_end_json_result() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    let invoker =
        ScriptedInvoker::default().reply("http://example.com", "GET", true, "Parameters found: id, name\n");
    let runner = Runner::with_invoker(invoker, strings(&["GET"]), &sequential()).unwrap();

    let summary = runner
        .run(
            &strings(&["http://example.com"]),
            file_sink(&path, OutputMode::Json).await,
            ProgressBar::hidden(),
        )
        .await
        .unwrap();
    assert_eq!(summary.tasks.reported, 1);

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["parameters"], serde_json::json!(["id", "name"]));
    assert_eq!(
        value["transformed_url"],
        "http://example.com?id=msarjun1&name=msarjun2"
    );
    assert_eq!(value["Running_Command"], "arjun -u http://example.com -m GET");
}

#[tokio::test]
async fn end_to_end_nothing_found_emits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    let invoker = ScriptedInvoker::default().reply(
        "http://example.com",
        "GET",
        true,
        "[*] Scanning\n[-] No parameters were discovered.\n",
    );
    let runner = Runner::with_invoker(invoker, strings(&["GET"]), &sequential()).unwrap();

    let summary = runner
        .run(
            &strings(&["http://example.com"]),
            file_sink(&path, OutputMode::Raw).await,
            ProgressBar::hidden(),
        )
        .await
        .unwrap();
    assert_eq!(summary.tasks.nothing_found, 1);
    assert_eq!(summary.tasks.failed, 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn end_to_end_filtered_two_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("urls.txt");
    let invoker = ScriptedInvoker::default()
        .reply("http://a.test", "GET", true, "Parameters found: q\n")
        .reply("http://a.test", "POST", false, "Parameters found: ignored\n")
        .reply("http://b.test", "POST", true, "[+] Parameters found: id, page\n");
    let runner = Runner::with_invoker(invoker, strings(&["GET", "POST"]), &sequential()).unwrap();

    let summary = runner
        .run(
            &strings(&["http://a.test", "http://b.test"]),
            file_sink(&path, OutputMode::Filtered).await,
            ProgressBar::hidden(),
        )
        .await
        .unwrap();
    assert_eq!(summary.tasks.dispatched, 4);
    assert_eq!(summary.tasks.completed(), 4);
    assert_eq!(summary.tasks.reported, 2);
    assert_eq!(summary.tasks.failed, 1);
    assert_eq!(summary.tasks.nothing_found, 1);

    let contents = std::fs::read_to_string(&path).unwrap();
    let mut lines: Vec<&str> = contents.lines().collect();
    lines.sort();
    assert_eq!(
        lines,
        vec![
            "http://a.test?q=msarjun1",
            "http://b.test?id=msarjun1&page=msarjun2",
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_task_is_invoked_once() {
    let runner = Runner::with_invoker(
        ScriptedInvoker::default(),
        strings(&["GET", "POST", "JSON"]),
        &Options {
            concurrency: 2,
            url_concurrency: Some(1),
            ..sequential()
        },
    )
    .unwrap();
    let urls: Vec<String> = (0..7).map(|i| format!("http://h{i}.test")).collect();
    let summary = runner
        .run(
            &urls,
            ResultSink::new(OutputMode::Raw).without_stdout(),
            ProgressBar::hidden(),
        )
        .await
        .unwrap();
    assert_eq!(summary.tasks.completed(), 21);
    assert_eq!(runner.invoker().calls.load(Ordering::SeqCst), 21);
}

#[tokio::test]
async fn empty_url_list_is_a_configuration_error() {
    let runner =
        Runner::with_invoker(ScriptedInvoker::default(), strings(&["GET"]), &sequential()).unwrap();
    let err = runner
        .run(
            &strings(&["", "   "]),
            ResultSink::new(OutputMode::Raw).without_stdout(),
            ProgressBar::hidden(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::TaskSet(TaskSetError::NoUrls)));
}

#[test]
fn runner_rejects_bad_configuration() {
    let err = Runner::new(Options {
        command_template: "arjun -u".to_string(),
        ..Options::default()
    })
    .err()
    .unwrap();
    assert!(matches!(err, RunnerError::MissingUrlPlaceholder { .. }));

    let err = Runner::new(Options {
        concurrency: 0,
        ..Options::default()
    })
    .err()
    .unwrap();
    assert!(matches!(err, RunnerError::InvalidConcurrency { value: 0 }));

    let err = Runner::new(Options {
        methods: Some(" , ".to_string()),
        ..Options::default()
    })
    .err()
    .unwrap();
    assert!(matches!(err, RunnerError::TaskSet(TaskSetError::NoMethods)));
}

#[test]
fn runner_takes_methods_from_template_unless_overridden() {
    let runner = Runner::new(Options {
        command_template: "arjun -u {urlStr} -m get,POST".to_string(),
        ..Options::default()
    })
    .unwrap();
    assert_eq!(runner.methods(), ["GET", "POST"]);

    let runner = Runner::new(Options {
        command_template: "arjun -u {urlStr} -m GET,POST".to_string(),
        methods: Some("JSON".to_string()),
        ..Options::default()
    })
    .unwrap();
    assert_eq!(runner.methods(), ["JSON"]);

    let runner = Runner::new(Options::default()).unwrap();
    assert_eq!(runner.methods(), ["GET"]);
}
