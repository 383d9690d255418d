//! One-shot user actions on a selected image: save it to the downloads
//! directory or install it as the wallpaper.
//!
//! Every action publishes `ActionStatus::Loading` followed by exactly one
//! `Success` or `Error` on the executor's event channel.

mod fetch;
mod store;

pub use fetch::{HttpImageFetcher, ImageFetcher};
pub use store::{DirectoryWallpaperSetter, DownloadsDir, MediaStore, WallpaperSetter};

use crate::source::RemoteError;
use crate::task::spawn_owned;
use image::codecs::jpeg::JpegEncoder;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

const JPEG_QUALITY: u8 = 95;
const EVENT_CAPACITY: usize = 32;

pub const MSG_DOWNLOADING: &str = "Downloading...";
pub const MSG_SETTING_WALLPAPER: &str = "Setting wallpaper...";
pub const MSG_WALLPAPER_SET: &str = "Wallpaper set successfully";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    Loading(String),
    Success(String),
    Error(String),
}

impl ActionStatus {
    pub fn message(&self) -> &str {
        match self {
            ActionStatus::Loading(m) | ActionStatus::Success(m) | ActionStatus::Error(m) => m,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ActionStatus::Loading(_))
    }
}

/// Which background slot(s) an apply targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WallpaperTarget {
    Home,
    Lock,
    #[default]
    Both,
}

impl WallpaperTarget {
    /// File stems written for this target.
    pub fn slots(self) -> &'static [&'static str] {
        match self {
            WallpaperTarget::Home => &["home"],
            WallpaperTarget::Lock => &["lock"],
            WallpaperTarget::Both => &["home", "lock"],
        }
    }
}

impl fmt::Display for WallpaperTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WallpaperTarget::Home => "home",
            WallpaperTarget::Lock => "lock",
            WallpaperTarget::Both => "both",
        };
        f.write_str(s)
    }
}

impl FromStr for WallpaperTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(WallpaperTarget::Home),
            "lock" => Ok(WallpaperTarget::Lock),
            "both" => Ok(WallpaperTarget::Both),
            other => Err(format!("unknown wallpaper target '{other}' (expected home, lock or both)")),
        }
    }
}

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("invalid image URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Fetch(#[from] RemoteError),

    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("{0}")]
    Apply(String),

    #[error("background task failed: {0}")]
    Task(String),
}

struct Collaborators<F, M, W> {
    fetcher: F,
    store: M,
    setter: W,
    events: broadcast::Sender<ActionStatus>,
}

/// Runs download and apply actions and reports their progress.
pub struct ActionExecutor<F, M, W> {
    inner: Arc<Collaborators<F, M, W>>,
    tasks: JoinSet<()>,
}

impl<F, M, W> ActionExecutor<F, M, W>
where
    F: ImageFetcher,
    M: MediaStore,
    W: WallpaperSetter,
{
    pub fn new(fetcher: F, store: M, setter: W) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Collaborators {
                fetcher,
                store,
                setter,
                events,
            }),
            tasks: JoinSet::new(),
        }
    }

    /// Status events from now on. Earlier events are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<ActionStatus> {
        self.inner.events.subscribe()
    }

    /// Downloads `image_url` into the media store and returns the final status.
    pub async fn download(&self, image_url: &str) -> ActionStatus {
        self.inner.download(image_url).await
    }

    /// Installs `image_url` as the wallpaper and returns the final status.
    pub async fn apply_wallpaper(&self, image_url: &str, target: WallpaperTarget) -> ActionStatus {
        self.inner.apply_wallpaper(image_url, target).await
    }

    /// Starts a download in the background; progress arrives via `subscribe()`.
    pub fn launch_download(&mut self, image_url: impl Into<String>) {
        let inner = Arc::clone(&self.inner);
        let image_url = image_url.into();
        spawn_owned(&mut self.tasks, "download", async move {
            inner.download(&image_url).await;
        });
    }

    /// Starts an apply in the background; progress arrives via `subscribe()`.
    pub fn launch_apply_wallpaper(&mut self, image_url: impl Into<String>, target: WallpaperTarget) {
        let inner = Arc::clone(&self.inner);
        let image_url = image_url.into();
        spawn_owned(&mut self.tasks, "apply_wallpaper", async move {
            inner.apply_wallpaper(&image_url, target).await;
        });
    }

    /// Waits for every launched action to finish.
    pub async fn settle(&mut self) {
        while self.tasks.join_next().await.is_some() {}
    }

    /// Aborts in-flight actions. No terminal status is emitted for them.
    pub fn close(&mut self) {
        self.tasks.abort_all();
    }
}

impl<F, M, W> Collaborators<F, M, W>
where
    F: ImageFetcher,
    M: MediaStore,
    W: WallpaperSetter,
{
    fn emit(&self, status: ActionStatus) -> ActionStatus {
        // No subscribers is fine; the caller still gets the return value.
        let _ = self.events.send(status.clone());
        status
    }

    async fn download(&self, image_url: &str) -> ActionStatus {
        self.emit(ActionStatus::Loading(MSG_DOWNLOADING.to_string()));
        let status = match self.try_download(image_url).await {
            Ok(path) => {
                tracing::info!(url = %image_url, path = %path.display(), "Download complete");
                ActionStatus::Success(format!("Wallpaper saved to {}", path.display()))
            }
            Err(e) => {
                tracing::warn!(url = %image_url, error = %e, "Download failed");
                ActionStatus::Error(format!("Download failed: {e}"))
            }
        };
        self.emit(status)
    }

    async fn try_download(&self, image_url: &str) -> Result<PathBuf, ActionError> {
        let bytes = self.fetcher.fetch(image_url).await?;
        let jpeg = reencode_jpeg(bytes).await?;
        let file_name = format!("wallpaper_{}.jpg", chrono::Utc::now().timestamp_millis());
        self.store.save(&file_name, &jpeg).await
    }

    async fn apply_wallpaper(&self, image_url: &str, target: WallpaperTarget) -> ActionStatus {
        self.emit(ActionStatus::Loading(MSG_SETTING_WALLPAPER.to_string()));
        let status = match self.try_apply(image_url, target).await {
            Ok(()) => {
                tracing::info!(url = %image_url, %target, "Wallpaper applied");
                ActionStatus::Success(MSG_WALLPAPER_SET.to_string())
            }
            Err(e) => {
                tracing::warn!(url = %image_url, %target, error = %e, "Applying wallpaper failed");
                ActionStatus::Error(format!("Failed to set wallpaper: {e}"))
            }
        };
        self.emit(status)
    }

    async fn try_apply(&self, image_url: &str, target: WallpaperTarget) -> Result<(), ActionError> {
        let bytes = self.fetcher.fetch(image_url).await?;
        let jpeg = reencode_jpeg(bytes).await?;
        self.setter.set(&jpeg, target).await
    }
}

/// Decodes any supported format and re-encodes it as JPEG off the runtime.
async fn reencode_jpeg(bytes: Vec<u8>) -> Result<Vec<u8>, ActionError> {
    tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ActionError> {
        let decoded = image::load_from_memory(&bytes)?;
        let rgb = decoded.to_rgb8();
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&rgb)?;
        Ok(out)
    })
    .await
    .map_err(|e| ActionError::Task(e.to_string()))?
}
