use chrono::Utc;
use futures::{Stream, StreamExt};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::video_extension;
use crate::cleanup;
use crate::config::Config;
use crate::error::PinError;
use crate::extractor::{DownloadResult, VideoDescriptor};
use crate::session::Session;

const MIB: u64 = 1024 * 1024;

pub struct StreamDownloader<'a> {
    session: &'a Session,
    output_dir: PathBuf,
    min_file_size: u64,
    chunk_size: usize,
}

impl<'a> StreamDownloader<'a> {
    pub fn new(session: &'a Session, config: &Config) -> Self {
        Self {
            session,
            output_dir: config.output_dir(),
            min_file_size: config.min_file_size,
            chunk_size: config.chunk_size.max(1),
        }
    }

    pub async fn download(
        &self,
        descriptor: &VideoDescriptor,
        pin_id: &str,
    ) -> Result<DownloadResult, PinError> {
        let url = descriptor.video_url.as_str();

        // Ensure output directory exists
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let filepath = self.output_dir.join(file_name(pin_id, url));

        tracing::info!("Downloading video: {}", url);

        let response = self.session.get_video(url).await?;
        let total = response.content_length();

        write_stream(response.bytes_stream(), &filepath, total, self.chunk_size, url).await?;

        let filesize = tokio::fs::metadata(&filepath).await?.len();
        if filesize < self.min_file_size {
            tracing::error!("Downloaded file too small: {} bytes", filesize);
            cleanup::remove_file(&filepath);
            return Err(PinError::download(
                url,
                format!("file too small ({} bytes)", filesize),
            ));
        }

        tracing::info!(
            "Downloaded {} ({:.2} MB)",
            filepath.display(),
            filesize as f64 / MIB as f64
        );

        Ok(DownloadResult {
            filepath,
            filesize,
            pin_id: pin_id.to_string(),
            descriptor: descriptor.clone(),
            downloaded_at: Utc::now(),
        })
    }
}

/// `pinterest_{pin}_{millis}_{suffix}.{ext}`. The suffix keeps concurrent
/// downloads of one pin apart.
fn file_name(pin_id: &str, url: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();

    format!(
        "pinterest_{}_{}_{}.{}",
        pin_id,
        Utc::now().timestamp_millis(),
        suffix,
        video_extension(url)
    )
}

/// Removes the file on drop unless `keep` was called. Covers stream errors and
/// callers dropping the download future mid-stream.
struct PartialFile<'a> {
    path: &'a Path,
    keep: bool,
}

impl<'a> PartialFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, keep: false }
    }

    fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for PartialFile<'_> {
    fn drop(&mut self) {
        if !self.keep && std::fs::remove_file(self.path).is_ok() {
            tracing::warn!("Removed partial download: {}", self.path.display());
        }
    }
}

/// Copy a byte stream to a new file at `path` through a `chunk_size` buffer.
/// Fails without touching an existing file. Returns the number of bytes written.
pub(crate) async fn write_stream<S, B, E>(
    stream: S,
    path: &Path,
    total: Option<u64>,
    chunk_size: usize,
    url: &str,
) -> Result<u64, PinError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    let mut guard = PartialFile::new(path);
    let mut writer = BufWriter::with_capacity(chunk_size, file);

    let mut stream = std::pin::pin!(stream);
    let mut downloaded: u64 = 0;
    let mut next_report = MIB;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| PinError::download(url, format!("Stream error: {}", e)))?;
        let bytes = chunk.as_ref();
        writer.write_all(bytes).await?;
        downloaded += bytes.len() as u64;

        if downloaded >= next_report {
            match total {
                Some(t) if t > 0 => tracing::info!(
                    "Download progress: {:.1}%",
                    downloaded as f64 / t as f64 * 100.0
                ),
                _ => tracing::info!("Download progress: {} MB", downloaded / MIB),
            }
            next_report = (downloaded / MIB + 1) * MIB;
        }
    }

    writer.flush().await?;
    guard.keep();
    Ok(downloaded)
}
