//! PDF download collaborator.
//!
//! Plain HTTP GET against the resolved link with a realistic Chrome
//! user-agent. Filename comes from the `Content-Disposition` header
//! (percent-decoded) when present, otherwise `{ISO-date}_{ISIN}.pdf`.
//! Any non-200 status is a hard failure for that security — the link
//! itself already resolved, so other jurisdictions are not retried.

use chrono::{NaiveDate, Utc};
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Failure modes of a document download.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download returned HTTP {0}")]
    Status(u16),
    #[error("download request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Downloads resolved factsheet links to disk.
#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
    download_dir: PathBuf,
}

impl Downloader {
    /// Build a client with a standard Chrome user-agent. A builder failure
    /// propagates — falling back to a default client would silently lose
    /// the user-agent, timeout and redirect cap.
    pub fn new(download_dir: &Path, timeout_ms: u64) -> Result<Self, DownloadError> {
        let ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                  AppleWebKit/537.36 (KHTML, like Gecko) \
                  Chrome/131.0.0.0 Safari/537.36";

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(ua)
            .build()?;

        Ok(Self {
            client,
            download_dir: download_dir.to_path_buf(),
        })
    }

    /// Fetch the link and write the bytes under the download directory.
    /// Returns the filename (not the full path) the bytes were written to.
    pub async fn fetch(&self, link: &str, isin: &str) -> Result<String, DownloadError> {
        let response = self.client.get(link).send().await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(DownloadError::Status(status));
        }

        let disposition = response
            .headers()
            .get("content-disposition")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let filename = derive_filename(
            disposition.as_deref(),
            isin,
            Utc::now().date_naive(),
        );

        let bytes = response.bytes().await?;
        let path = self.download_dir.join(&filename);
        std::fs::write(&path, &bytes).map_err(|source| DownloadError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!("downloaded {} ({} bytes)", filename, bytes.len());
        Ok(filename)
    }

    /// Full path of a previously downloaded file.
    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.download_dir.join(filename)
    }
}

/// Derive the output filename for a download.
///
/// With a `Content-Disposition` header carrying a `filename=` parameter,
/// that name is used after percent-decoding. Without one, fall back to
/// `{date}_{isin}.pdf`.
pub fn derive_filename(content_disposition: Option<&str>, isin: &str, today: NaiveDate) -> String {
    if let Some(header) = content_disposition {
        if let Some(raw) = header.split("filename=").nth(1) {
            let trimmed = raw.trim().trim_matches('"');
            if !trimmed.is_empty() {
                return percent_decode_str(trimmed)
                    .decode_utf8_lossy()
                    .into_owned();
            }
        }
    }
    format!("{}_{}.pdf", today.format("%Y-%m-%d"), isin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_filename_from_content_disposition_is_percent_decoded() {
        let name = derive_filename(
            Some(r#"attachment; filename="Fund%20Report.pdf""#),
            "IE00B4L5Y983",
            date(2024, 1, 1),
        );
        assert_eq!(name, "Fund Report.pdf");
    }

    #[test]
    fn test_filename_fallback_is_date_and_isin() {
        let name = derive_filename(None, "IE00B4L5Y983", date(2024, 1, 1));
        assert_eq!(name, "2024-01-01_IE00B4L5Y983.pdf");
    }

    #[test]
    fn test_filename_unquoted_parameter() {
        let name = derive_filename(
            Some("attachment; filename=report.pdf"),
            "IE00B4L5Y983",
            date(2024, 1, 1),
        );
        assert_eq!(name, "report.pdf");
    }

    #[tokio::test]
    async fn test_fetch_writes_file_with_header_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/doc.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", r#"attachment; filename="Fund%20Report.pdf""#)
                    .set_body_bytes(b"%PDF-1.4 fake".to_vec()),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(dir.path(), 5_000).unwrap();
        let filename = downloader
            .fetch(&format!("{}/doc.pdf", server.uri()), "IE00B4L5Y983")
            .await
            .unwrap();

        assert_eq!(filename, "Fund Report.pdf");
        let written = std::fs::read(dir.path().join(&filename)).unwrap();
        assert_eq!(written, b"%PDF-1.4 fake");
    }

    #[tokio::test]
    async fn test_fetch_sends_chrome_user_agent() {
        // The mock only answers requests carrying the Chrome UA, so a
        // client built without it would get a 404 here.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ua.pdf"))
            .and(wiremock::matchers::header_regex(
                "user-agent",
                r"^Mozilla/5\.0 .*Chrome/",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(dir.path(), 5_000).unwrap();
        let filename = downloader
            .fetch(&format!("{}/ua.pdf", server.uri()), "IE00B4L5Y983")
            .await
            .unwrap();
        assert!(filename.ends_with("_IE00B4L5Y983.pdf"));
    }

    #[tokio::test]
    async fn test_fetch_non_200_is_hard_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.pdf"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(dir.path(), 5_000).unwrap();
        let err = downloader
            .fetch(&format!("{}/missing.pdf", server.uri()), "IE00B4L5Y983")
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Status(404)));
    }
}
