use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(alias = "arjunCmd")]
    pub arjun_cmd: Option<String>,
    pub methods: Option<String>,
    pub wordlist: Option<String>,
    pub wordlist_url: Option<String>,
    pub no_wordlist: Option<bool>,
    pub value_mode: Option<String>,
    pub concurrency: Option<usize>,
    #[serde(alias = "method_concurrency")]
    pub url_concurrency: Option<usize>,
    pub timeout: Option<u64>,
    pub urls: Option<Vec<String>>,
    pub input_file: Option<String>,
    pub output_mode: Option<String>,
    pub output: Option<String>,
    pub append_output: Option<String>,
    pub verbose: Option<bool>,
    pub silent: Option<bool>,
    pub no_color: Option<bool>,
    pub no_progress: Option<bool>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
}

pub fn data_dir() -> Option<PathBuf> {
    Some(home_dir()?.join(".msarjun"))
}

pub fn default_wordlist_path() -> Option<PathBuf> {
    Some(data_dir()?.join("parameters.txt"))
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(data_dir()?.join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = home_dir() {
            return home;
        }
    }
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn load_config(path: &Path, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str::<ConfigFile>(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}
