use crate::cli::args::CliArgs;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(template) = args.arjun_cmd.as_deref() {
        if template.trim().is_empty() {
            return Err("invalid --arjun-cmd, the command template is empty".to_string());
        }
    }
    if let Some(raw) = args.methods.as_deref() {
        crate::tasks::parse_methods_csv(raw).map_err(|e| format!("invalid --methods '{raw}': {e}"))?;
    }
    if let Some(raw) = args.value_mode.as_deref() {
        if crate::transform::ValueMode::parse(raw).is_none() {
            return Err(format!(
                "invalid --value-mode '{raw}', expected random or sequential"
            ));
        }
    }
    if args.concurrency == Some(0) {
        return Err("invalid concurrency, expected positive integer".to_string());
    }
    if args.url_concurrency == Some(0) {
        return Err("invalid url-concurrency, expected positive integer".to_string());
    }
    if args.timeout == Some(0) {
        return Err("invalid timeout, expected positive number of seconds".to_string());
    }
    if args.no_wordlist && args.wordlist.is_some() {
        return Err("use either --wordlist or --no-wordlist, not both".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate;
    use crate::cli::args::CliArgs;
    use clap::Parser;

    fn parse(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["msarjun"];
        argv.extend_from_slice(extra);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&parse(&[])).is_ok());
    }

    #[test]
    fn rejects_zero_limits() {
        assert!(validate(&parse(&["-c", "0"])).is_err());
        assert!(validate(&parse(&["--url-concurrency", "0"])).is_err());
        assert!(validate(&parse(&["--timeout", "0"])).is_err());
    }

    #[test]
    fn rejects_empty_methods_and_unknown_value_mode() {
        assert!(validate(&parse(&["-m", " , "])).is_err());
        assert!(validate(&parse(&["--value-mode", "fixed"])).is_err());
        assert!(validate(&parse(&["--value-mode", "sequential"])).is_ok());
    }

    #[test]
    fn rejects_wordlist_with_no_wordlist() {
        assert!(validate(&parse(&["-w", "x.txt", "--no-wordlist"])).is_err());
    }
}
