use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "msarjun",
    version,
    about = "Run Arjun across many URLs and HTTP methods",
    long_about = "msarjun reads URLs from stdin, runs Arjun once per URL and HTTP method, and prints a proof-of-concept URL carrying every parameter Arjun found.\n\nExamples:\n  cat urls.txt | msarjun -a \"arjun -u {urlStr}\" -m GET,POST\n  cat urls.txt | msarjun -a \"arjun -u {urlStr} -m GET,POST\" --json -o results.json\n  cat urls.txt | msarjun --filtered --value-mode sequential | httpx\n\nTip: Use --config to persist settings and keep invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'a',
        long = "arjun-cmd",
        visible_alias = "arjunCmd",
        value_name = "TEMPLATE",
        help_heading = "Discovery",
        help = "Command template for Arjun; {urlStr} is replaced by each URL (default: \"arjun -u {urlStr}\")."
    )]
    pub arjun_cmd: Option<String>,

    #[arg(
        short = 'm',
        long = "methods",
        value_name = "METHODS",
        help_heading = "Discovery",
        help = "HTTP methods to test, comma-separated (default: GET, or the -m list inside the template)."
    )]
    pub methods: Option<String>,

    #[arg(
        short = 'w',
        long = "wordlist",
        value_name = "FILE",
        help_heading = "Discovery",
        help = "Parameter wordlist passed to Arjun; downloaded when missing (default: ~/.msarjun/parameters.txt)."
    )]
    pub wordlist: Option<String>,

    #[arg(
        long = "wordlist-url",
        value_name = "URL",
        help_heading = "Discovery",
        help = "Where to download the wordlist from when it is missing."
    )]
    pub wordlist_url: Option<String>,

    #[arg(
        long = "no-wordlist",
        help_heading = "Discovery",
        help = "Do not pass -w to Arjun and skip the wordlist download."
    )]
    pub no_wordlist: bool,

    #[arg(
        long = "value-mode",
        value_name = "MODE",
        help_heading = "Discovery",
        help = "Placeholder values for found parameters: random (default) or sequential."
    )]
    pub value_mode: Option<String>,

    #[arg(
        short = 'c',
        long = "concurrency",
        value_name = "N",
        help_heading = "Performance",
        help = "Maximum Arjun processes running at once (default: 10)."
    )]
    pub concurrency: Option<usize>,

    #[arg(
        long = "url-concurrency",
        visible_alias = "method-concurrency",
        value_name = "N",
        help_heading = "Performance",
        help = "Maximum methods running at once for the same URL (default: unlimited)."
    )]
    pub url_concurrency: Option<usize>,

    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        help_heading = "Performance",
        help = "Kill an Arjun process after this many seconds (default: no limit)."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'u',
        long = "url",
        value_name = "URL",
        action = ArgAction::Append,
        help_heading = "Input",
        help = "Target URL (repeatable); added to the URLs read from stdin."
    )]
    pub url: Vec<String>,

    #[arg(
        short = 'i',
        long = "input-file",
        value_name = "FILE",
        help_heading = "Input",
        help = "Read target URLs from a file (one per line) instead of stdin."
    )]
    pub input_file: Option<String>,

    #[arg(
        short = 'C',
        long = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to a YAML config file."
    )]
    pub config: Option<String>,

    #[arg(
        short = 'j',
        long = "json",
        conflicts_with = "filtered",
        help_heading = "Output",
        help = "Print each result as an indented JSON document."
    )]
    pub json: bool,

    #[arg(
        short = 'f',
        long = "filtered",
        help_heading = "Output",
        help = "Print only the transformed URLs, for piping into other tools."
    )]
    pub filtered: bool,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        conflicts_with = "append_output",
        help_heading = "Output",
        help = "Also write results to FILE (truncated first)."
    )]
    pub output: Option<String>,

    #[arg(
        long = "ao",
        visible_alias = "append-output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Also append results to FILE."
    )]
    pub append_output: Option<String>,

    #[arg(
        short = 'v',
        long = "verbose",
        help_heading = "Output",
        help = "Show each command and why tasks failed."
    )]
    pub verbose: bool,

    #[arg(
        short = 's',
        long = "silent",
        help_heading = "Output",
        help = "Do not print the banner or progress."
    )]
    pub silent: bool,

    #[arg(
        long = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        long = "no-progress",
        help_heading = "Output",
        help = "Hide the progress bar."
    )]
    pub no_progress: bool,
}
