use std::sync::OnceLock;

use regex::Regex;

pub const PARAMETERS_MARKER: &str = "Parameters found:";

// Arjun prefixes its summary line with a status tag such as "[+] ", so the
// marker is anchored to the line start with that tag allowed in front of it.
const PARAMETERS_LINE: &str = r"(?m)^[ \t]*(?:\[[^\]\n]*\][ \t]*)?(Parameters found:.*)$";

// SGR color sequences, such as the green "\x1b[92m[+]\x1b[0m" tag Arjun prints
const ANSI_SGR: &str = r"\x1b\[[0-9;]*m";

fn parameters_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PARAMETERS_LINE).expect("parameters line regex is valid"))
}

fn ansi_sgr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ANSI_SGR).expect("ansi sgr regex is valid"))
}

/// Removes color escapes and turns every `\r` into a line break, so progress
/// lines rewritten in place end before the next report line starts.
fn normalize(raw: &str) -> String {
    ansi_sgr_regex()
        .replace_all(raw, "")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterFinding {
    /// The report line, starting at the marker.
    pub line: String,
    pub parameter_names: Vec<String>,
}

impl ParameterFinding {
    pub fn is_empty(&self) -> bool {
        self.parameter_names.is_empty()
    }
}

/// Extracts the parameter names from the discovery tool's report.
///
/// Only the first `Parameters found:` line counts. Its text after the first
/// `": "` is split on `", "` and each name is trimmed. This is a narrow
/// contract with the tool's summary format, not a general parser: a line
/// without the `": "` delimiter yields an empty finding.
pub fn parse_output(raw: &str) -> ParameterFinding {
    let cleaned = normalize(raw);
    let line = match parameters_line_regex()
        .captures(&cleaned)
        .and_then(|caps| caps.get(1))
    {
        Some(m) => m.as_str().trim_end().to_string(),
        None => return ParameterFinding::default(),
    };

    let parameter_names = match line.split_once(": ") {
        Some((_, rest)) => rest
            .split(", ")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };

    ParameterFinding {
        line,
        parameter_names,
    }
}
