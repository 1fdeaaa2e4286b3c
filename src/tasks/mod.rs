use std::collections::HashSet;

use itertools::iproduct;
use thiserror::Error;

// a single unit of work: run the discovery tool against one url with one method
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Task {
    pub url: String,
    pub method: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskSetError {
    #[error("no URLs provided (pipe them on stdin, or use --url / --input-file)")]
    NoUrls,

    #[error("methods list is empty")]
    NoMethods,
}

/// Parses a comma-separated method list such as `"get, POST,get"`.
///
/// Items are trimmed and upper-cased, blanks are skipped and duplicates keep
/// their first position.
pub fn parse_methods_csv(value: &str) -> Result<Vec<String>, TaskSetError> {
    let mut out: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for part in value.split(',') {
        let item = part.trim();
        if item.is_empty() {
            continue;
        }
        let canonical = item.to_ascii_uppercase();
        if seen.insert(canonical.clone()) {
            out.push(canonical);
        }
    }
    if out.is_empty() {
        return Err(TaskSetError::NoMethods);
    }
    Ok(out)
}

pub fn clean_urls<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|l| l.as_ref().trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Builds one task per (url, method) pair, url-major and method-minor.
pub fn build_tasks(urls: &[String], methods: &[String]) -> Result<Vec<Task>, TaskSetError> {
    if methods.is_empty() {
        return Err(TaskSetError::NoMethods);
    }
    let urls = clean_urls(urls);
    if urls.is_empty() {
        return Err(TaskSetError::NoUrls);
    }
    Ok(iproduct!(urls.iter(), methods.iter())
        .map(|(url, method)| Task {
            url: url.clone(),
            method: method.clone(),
        })
        .collect())
}
