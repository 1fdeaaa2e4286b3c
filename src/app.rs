use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing_subscriber::EnvFilter;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::dispatcher::DEFAULT_CONCURRENCY;
use crate::invoker::DEFAULT_COMMAND_TEMPLATE;
use crate::output::{self, FileMode, OutputMode, ResultSink};
use crate::runner::{Options, Runner};
use crate::transform::ValueMode;
use crate::wordlist::DEFAULT_WORDLIST_URL;

const BANNER: &str = r#"
                                  _
   ____ ___   _____ ____ _ _____ (_)__  __ ____
  / __  __ \ / ___// __  // ___// // / / // __ \
 / / / / / /(__  )/ /_/ // /   / // /_/ // / / /
/_/ /_/ /_//____/ \__,_//_/ __/ / \__,_//_/ /_/
                           /___/
"#;

fn print_banner(no_color: bool) {
    let version_line = format!("{:>60}", format!("msarjun v{}", env!("CARGO_PKG_VERSION")));
    // only color the banner for a terminal; piped stdout gets it on stderr instead
    if !no_color && std::io::stdout().is_terminal() {
        let _ = write!(&mut rainbowcoat::stdout(), "{BANNER}");
        println!("\n{}\n", version_line.bold());
    } else {
        eprintln!("{BANNER}\n{version_line}\n");
    }
}

fn format_kv_line(label: &str, value: &str) {
    eprintln!(":: {:<10}: {}", label, value);
}

fn format_opt<T: ToString>(value: Option<T>, default: &str) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| default.to_string())
}

#[derive(Clone, Debug)]
struct RunConfig {
    options: Options,
    urls: Vec<String>,
    input_file: Option<PathBuf>,
    output_mode: OutputMode,
    output_file: Option<(PathBuf, FileMode)>,
    verbose: bool,
    silent: bool,
    no_color: bool,
    no_progress: bool,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let command_template = args
        .arjun_cmd
        .or(cfg.arjun_cmd)
        .unwrap_or_else(|| DEFAULT_COMMAND_TEMPLATE.to_string());
    let methods = args.methods.or(cfg.methods);

    let no_wordlist = args.no_wordlist || cfg.no_wordlist.unwrap_or(false);
    let wordlist = if no_wordlist {
        None
    } else {
        match args.wordlist.or(cfg.wordlist) {
            Some(path) => Some(config::expand_tilde(&path)),
            None => Some(config::default_wordlist_path().ok_or_else(|| {
                "cannot locate a home directory for the default wordlist, pass --wordlist"
                    .to_string()
            })?),
        }
    };
    let wordlist_url = args
        .wordlist_url
        .or(cfg.wordlist_url)
        .unwrap_or_else(|| DEFAULT_WORDLIST_URL.to_string());

    let value_mode = match args.value_mode.or(cfg.value_mode) {
        Some(raw) => ValueMode::parse(&raw)
            .ok_or_else(|| format!("invalid value mode '{raw}', expected random or sequential"))?,
        None => ValueMode::Random,
    };

    let concurrency = args
        .concurrency
        .or(cfg.concurrency)
        .unwrap_or(DEFAULT_CONCURRENCY);
    if concurrency == 0 {
        return Err("invalid concurrency, expected positive integer".to_string());
    }
    let url_concurrency = args.url_concurrency.or(cfg.url_concurrency);
    let timeout = args.timeout.or(cfg.timeout);
    if timeout == Some(0) {
        return Err("invalid timeout, expected positive number of seconds".to_string());
    }
    let timeout = timeout.map(Duration::from_secs);

    let output_mode = if args.json {
        OutputMode::Json
    } else if args.filtered {
        OutputMode::Filtered
    } else {
        match cfg.output_mode {
            Some(raw) => OutputMode::parse(&raw)
                .ok_or_else(|| format!("invalid output mode '{raw}', expected raw, json or filtered"))?,
            None => OutputMode::Raw,
        }
    };

    let output_file = match (args.output, args.append_output) {
        (Some(path), _) => Some((config::expand_tilde(&path), FileMode::Truncate)),
        (None, Some(path)) => Some((config::expand_tilde(&path), FileMode::Append)),
        (None, None) => match (cfg.output, cfg.append_output) {
            (Some(_), Some(_)) => {
                return Err("config sets both output and append_output".to_string())
            }
            (Some(path), None) => Some((config::expand_tilde(&path), FileMode::Truncate)),
            (None, Some(path)) => Some((config::expand_tilde(&path), FileMode::Append)),
            (None, None) => None,
        },
    };

    let mut urls = args.url;
    urls.extend(cfg.urls.unwrap_or_default());
    let input_file = args
        .input_file
        .or(cfg.input_file)
        .map(|p| config::expand_tilde(&p));

    Ok(RunConfig {
        options: Options {
            command_template,
            methods,
            wordlist,
            wordlist_url,
            concurrency,
            url_concurrency,
            timeout,
            value_mode,
        },
        urls,
        input_file,
        output_mode,
        output_file,
        verbose: args.verbose || cfg.verbose.unwrap_or(false),
        silent: args.silent || cfg.silent.unwrap_or(false),
        no_color: args.no_color || cfg.no_color.unwrap_or(false),
        no_progress: args.no_progress || cfg.no_progress.unwrap_or(false),
    })
}

fn init_logging(verbose: bool) {
    let default = if verbose { "msarjun=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

async fn read_lines<R>(reader: R, source: &str) -> Result<Vec<String>, String>
where
    R: AsyncRead + Unpin,
{
    let mut out = Vec::new();
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| format!("failed to read {source}: {e}"))?
    {
        out.push(line);
    }
    Ok(out)
}

async fn read_urls(run: &RunConfig) -> Result<Vec<String>, String> {
    let mut urls = run.urls.clone();
    let mut lines = match run.input_file.as_ref() {
        Some(path) => {
            let handle = tokio::fs::File::open(path)
                .await
                .map_err(|e| format!("failed to open input file '{}': {e}", path.display()))?;
            read_lines(handle, "input file").await?
        }
        // -u on an interactive terminal: nothing is being piped in
        None if !run.urls.is_empty() && std::io::stdin().is_terminal() => Vec::new(),
        None => read_lines(tokio::io::stdin(), "stdin").await?,
    };
    urls.append(&mut lines);
    Ok(crate::tasks::clean_urls(urls))
}

fn build_progress(run: &RunConfig) -> Result<ProgressBar, String> {
    if run.silent || run.no_progress || run.output_mode == OutputMode::Filtered {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(0);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::with_template(
            ":: Progress: [{pos}/{len}] :: Duration: [{elapsed_precise}] :: {msg}",
        )
        .map_err(|e| format!("failed to build progress bar style: {e}"))?,
    );
    pb.enable_steady_tick(Duration::from_millis(200));
    Ok(pb)
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    let runner = Runner::new(run.options.clone()).map_err(|e| e.to_string())?;
    let urls = read_urls(&run).await?;
    if urls.is_empty() {
        return Err(crate::tasks::TaskSetError::NoUrls.to_string());
    }

    let mut sink = ResultSink::new(run.output_mode);
    if let Some((path, mode)) = run.output_file.as_ref() {
        let file = output::open_output_file(path, *mode)
            .await
            .map_err(|e| format!("failed to open output file '{}': {e}", path.display()))?;
        sink = sink.with_file(file);
    }

    if !run.silent {
        format_kv_line("Command", &run.options.command_template);
        format_kv_line(
            "Scan",
            &format!(
                "urls={} methods={} tasks={} values={}",
                urls.len(),
                runner.methods().join(","),
                urls.len() * runner.methods().len(),
                run.options.value_mode.label(),
            ),
        );
        format_kv_line(
            "Limits",
            &format!(
                "conc={} url-conc={} timeout={}",
                run.options.concurrency,
                format_opt(run.options.url_concurrency, "unlimited"),
                format_opt(run.options.timeout.map(|t| format!("{}s", t.as_secs())), "none"),
            ),
        );
        format_kv_line(
            "Wordlist",
            &format_opt(
                run.options.wordlist.as_ref().map(|p| p.display().to_string()),
                "arjun default",
            ),
        );
        format_kv_line(
            "Output",
            &format!(
                "mode={} file={}",
                run.output_mode.label(),
                format_opt(
                    run.output_file
                        .as_ref()
                        .map(|(p, _)| p.display().to_string()),
                    "none"
                )
            ),
        );
        eprintln!();
    }

    let progress = build_progress(&run)?;
    let sink = sink.with_progress(progress.clone());
    let summary = runner
        .run(&urls, sink, progress)
        .await
        .map_err(|e| e.to_string())?;

    if !run.silent {
        let t = summary.tasks;
        eprintln!();
        eprintln!(
            ":: Completed :: {} tasks in {}s :: {} with parameters, {} without, {} failed ::",
            t.completed(),
            summary.elapsed.as_secs(),
            t.reported.to_string().green(),
            t.nothing_found,
            if t.failed + t.panicked > 0 {
                (t.failed + t.panicked).to_string().red()
            } else {
                "0".normal()
            },
        );
    }
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", CliArgs::command().render_long_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                print_banner(false);
                print!("{}", CliArgs::command().render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    // an explicit --config must exist; the default location is optional
    let cfg = match args.config.as_ref() {
        Some(path) => config::load_config(&config::expand_tilde(path), false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;
    if run.no_color {
        colored::control::set_override(false);
    }
    init_logging(run.verbose);
    if !run.silent {
        print_banner(run.no_color);
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
