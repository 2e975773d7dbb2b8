//! Pinterest video extraction and download.
//!
//! ```no_run
//! # async fn demo() -> Result<(), pinget::PinError> {
//! let downloader = pinget::PinDownloader::new(pinget::config::get_config().unwrap_or_default());
//! let info = downloader.get_video_info("https://pin.it/3xAbCdE").await?;
//! if info.has_video {
//!     let result = downloader.download_video("https://pin.it/3xAbCdE").await?;
//!     println!("{}", result.filepath.display());
//!     downloader.remove_file(&result.filepath);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cleanup;
pub mod config;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod session;
pub mod shaping;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{PinError, Stage};
pub use extractor::{DownloadResult, PinReference, VideoDescriptor, VideoInfo};
pub use pipeline::PinDownloader;
pub use shaping::{BrowserProfile, Passthrough, RequestShaper};
