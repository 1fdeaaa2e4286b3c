use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::info;

pub const DEFAULT_WORDLIST_URL: &str =
    "https://raw.githubusercontent.com/s0md3v/Arjun/master/arjun/db/large.txt";

#[derive(Debug, Error)]
pub enum WordlistError {
    #[error("failed to download wordlist from {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("wordlist download from {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("downloaded wordlist from {url} is empty")]
    Empty { url: String },

    #[error("failed to write wordlist {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provisioned {
    AlreadyPresent,
    Downloaded { bytes: usize },
}

/// Makes sure `path` exists, fetching the wordlist from `url` when it does not.
///
/// The body is written to a sibling temp file and renamed into place so a
/// failed download never leaves a truncated wordlist behind.
pub async fn ensure_wordlist(path: &Path, url: &str) -> Result<Provisioned, WordlistError> {
    if tokio::fs::metadata(path).await.is_ok() {
        return Ok(Provisioned::AlreadyPresent);
    }

    info!(url, path = %path.display(), "wordlist missing, downloading");
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| WordlistError::Download {
            url: url.to_string(),
            source: e,
        })?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| WordlistError::Download {
            url: url.to_string(),
            source: e,
        })?;
    if !response.status().is_success() {
        return Err(WordlistError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    let body = response
        .bytes()
        .await
        .map_err(|e| WordlistError::Download {
            url: url.to_string(),
            source: e,
        })?;
    if body.is_empty() {
        return Err(WordlistError::Empty {
            url: url.to_string(),
        });
    }

    store(path, &body).await?;
    Ok(Provisioned::Downloaded { bytes: body.len() })
}

async fn store(path: &Path, body: &[u8]) -> Result<(), WordlistError> {
    let write_err = |source: std::io::Error| WordlistError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, body).await.map_err(write_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_err)?;
    Ok(())
}
