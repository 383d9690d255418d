use super::{ActionError, WallpaperTarget};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Persists downloaded images to user-visible storage.
pub trait MediaStore: Send + Sync + 'static {
    /// Saves `bytes` under `file_name` and returns where they ended up.
    fn save(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<PathBuf, ActionError>> + Send;
}

/// Installs an image as the system background.
pub trait WallpaperSetter: Send + Sync + 'static {
    fn set(
        &self,
        jpeg: &[u8],
        target: WallpaperTarget,
    ) -> impl Future<Output = Result<(), ActionError>> + Send;
}

/// Saves downloads into a directory (by default `~/Downloads`).
#[derive(Debug, Clone)]
pub struct DownloadsDir {
    dir: PathBuf,
}

impl DownloadsDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl MediaStore for DownloadsDir {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ActionError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let dst = unique_path(&self.dir, file_name).await;
        write_atomic(&dst, bytes).await?;
        tracing::info!(path = %dst.display(), bytes = bytes.len(), "Saved image");
        Ok(dst)
    }
}

/// Writes wallpapers into a directory as `home.jpg` / `lock.jpg` and
/// optionally hands each file to an external command.
///
/// Command arguments may contain `{path}` and `{target}` placeholders, e.g.
/// `["swww", "img", "{path}"]`.
#[derive(Debug, Clone)]
pub struct DirectoryWallpaperSetter {
    dir: PathBuf,
    command: Option<Vec<String>>,
}

impl DirectoryWallpaperSetter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            command: None,
        }
    }

    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = (!command.is_empty()).then_some(command);
        self
    }

    async fn run_command(&self, path: &Path, target: &str) -> Result<(), ActionError> {
        let Some(argv) = &self.command else {
            return Ok(());
        };
        let path_str = path.to_string_lossy();
        let args: Vec<String> = argv
            .iter()
            .map(|arg| arg.replace("{path}", &path_str).replace("{target}", target))
            .collect();

        tracing::debug!(command = ?args, "Running wallpaper command");
        let status = tokio::process::Command::new(&args[0])
            .args(&args[1..])
            .status()
            .await
            .map_err(|e| ActionError::Apply(format!("{}: {e}", args[0])))?;

        if !status.success() {
            return Err(ActionError::Apply(format!("{} exited with {status}", args[0])));
        }
        Ok(())
    }
}

impl WallpaperSetter for DirectoryWallpaperSetter {
    async fn set(&self, jpeg: &[u8], target: WallpaperTarget) -> Result<(), ActionError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        for slot in target.slots() {
            let dst = self.dir.join(format!("{slot}.jpg"));
            write_atomic(&dst, jpeg).await?;
            self.run_command(&dst, slot).await?;
            tracing::info!(path = %dst.display(), target = slot, "Installed wallpaper");
        }
        Ok(())
    }
}

/// Picks `dir/file_name`, adding `-1`, `-2`, ... before the extension if
/// the name is taken.
async fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
        return candidate;
    }
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (file_name, String::new()),
    };
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{stem}-{n}{ext}"));
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        n += 1;
    }
}

/// Writes `bytes` to `dst` via a temp file and rename, so `dst` is never
/// observed half-written.
async fn write_atomic(dst: &Path, bytes: &[u8]) -> Result<(), ActionError> {
    // Timestamped temp name; `create_new` refuses to reuse or follow an
    // existing file.
    let random_suffix = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();
    let temp_path = dst.with_extension(format!("tmp.{:016x}", random_suffix));

    let mut temp_file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .await?;

    let written = async {
        temp_file.write_all(bytes).await?;
        temp_file.sync_all().await
    }
    .await;
    drop(temp_file);

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }

    #[cfg(windows)]
    if tokio::fs::try_exists(dst).await.unwrap_or(false) {
        if let Err(e) = tokio::fs::remove_file(dst).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
    }

    if let Err(e) = tokio::fs::rename(&temp_path, dst).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("wallpapers_store_test_{name}"));
        std::fs::remove_dir_all(&dir).ok();
        dir
    }

    #[tokio::test]
    async fn test_downloads_dir_saves_file() {
        let dir = test_dir("save");
        let store = DownloadsDir::new(&dir);

        let path = store.save("wallpaper_1.jpg", b"jpeg-bytes").await.unwrap();
        assert_eq!(path, dir.join("wallpaper_1.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), b"jpeg-bytes");

        // No temp files left behind.
        let entries = std::fs::read_dir(&dir).unwrap().count();
        assert_eq!(entries, 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_downloads_dir_never_overwrites() {
        let dir = test_dir("unique");
        let store = DownloadsDir::new(&dir);

        let first = store.save("wallpaper_1.jpg", b"one").await.unwrap();
        let second = store.save("wallpaper_1.jpg", b"two").await.unwrap();
        assert_ne!(first, second);
        assert_eq!(second, dir.join("wallpaper_1-1.jpg"));
        assert_eq!(std::fs::read(&first).unwrap(), b"one");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_setter_writes_both_slots() {
        let dir = test_dir("setter_both");
        let setter = DirectoryWallpaperSetter::new(&dir);

        setter.set(b"img", WallpaperTarget::Both).await.unwrap();
        assert_eq!(std::fs::read(dir.join("home.jpg")).unwrap(), b"img");
        assert_eq!(std::fs::read(dir.join("lock.jpg")).unwrap(), b"img");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_setter_lock_only() {
        let dir = test_dir("setter_lock");
        let setter = DirectoryWallpaperSetter::new(&dir);

        setter.set(b"img", WallpaperTarget::Lock).await.unwrap();
        assert!(dir.join("lock.jpg").exists());
        assert!(!dir.join("home.jpg").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_setter_command_failure_is_reported() {
        let dir = test_dir("setter_cmd");
        let setter = DirectoryWallpaperSetter::new(&dir).with_command(vec!["false".into()]);

        let err = setter.set(b"img", WallpaperTarget::Home).await.unwrap_err();
        assert!(matches!(err, ActionError::Apply(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_setter_command_placeholders() {
        let dir = test_dir("setter_placeholders");
        let marker = dir.join("marker");
        let setter = DirectoryWallpaperSetter::new(&dir).with_command(vec![
            "cp".into(),
            "{path}".into(),
            format!("{}-{{target}}", marker.display()),
        ]);

        setter.set(b"img", WallpaperTarget::Home).await.unwrap();
        assert_eq!(
            std::fs::read(dir.join("marker-home")).unwrap(),
            b"img"
        );

        std::fs::remove_dir_all(&dir).ok();
    }
}
