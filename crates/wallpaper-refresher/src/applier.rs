//! Applying a cached image as the desktop wallpaper
//!
//! Setting the wallpaper is platform specific, so it sits behind
//! [`WallpaperApplier`]. The refresher only ever hands it a path that the
//! cache has fully written.

use crate::error::{RefresherError, Result};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How the image is fitted to the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WallpaperStyle {
    Center,
    Tile,
    Stretch,
    KeepAspect,
    Crop,
    Span,
    /// Same placement as `Crop`
    #[default]
    Fill,
}

impl WallpaperStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            WallpaperStyle::Center => "center",
            WallpaperStyle::Tile => "tile",
            WallpaperStyle::Stretch => "stretch",
            WallpaperStyle::KeepAspect => "keep_aspect",
            WallpaperStyle::Crop => "crop",
            WallpaperStyle::Span => "span",
            WallpaperStyle::Fill => "fill",
        }
    }

    /// Parse a style name, case-insensitively. Unknown names mean `Fill`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "center" => WallpaperStyle::Center,
            "tile" => WallpaperStyle::Tile,
            "stretch" => WallpaperStyle::Stretch,
            "keep_aspect" => WallpaperStyle::KeepAspect,
            "crop" => WallpaperStyle::Crop,
            "span" => WallpaperStyle::Span,
            _ => WallpaperStyle::Fill,
        }
    }
}

impl From<String> for WallpaperStyle {
    fn from(name: String) -> Self {
        WallpaperStyle::parse(&name)
    }
}

impl From<WallpaperStyle> for String {
    fn from(style: WallpaperStyle) -> Self {
        style.as_str().to_string()
    }
}

impl fmt::Display for WallpaperStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sets the desktop wallpaper from a local image file
pub trait WallpaperApplier: Send + Sync {
    fn apply<'a>(&'a self, path: &'a Path, style: WallpaperStyle) -> BoxFuture<'a, Result<()>>;
}

async fn ensure_exists(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(RefresherError::Apply(format!(
            "image not found: {}",
            path.display()
        ))),
    }
}

/// Records the wallpaper change in the log without touching the desktop
#[derive(Debug, Default)]
pub struct LogApplier;

impl WallpaperApplier for LogApplier {
    fn apply<'a>(&'a self, path: &'a Path, style: WallpaperStyle) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            ensure_exists(path).await?;
            info!(path = ?path, %style, "Wallpaper ready");
            Ok(())
        })
    }
}

/// Runs an external command with the image path appended as the last
/// argument. The style is passed in the `WALLPAPER_STYLE` environment variable.
#[derive(Debug, Clone)]
pub struct CommandApplier {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandApplier {
    /// Build from an argv prefix such as `["feh", "--bg-fill"]`
    pub fn new(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| RefresherError::Config("apply_command is empty".to_string()))?;
        Ok(Self {
            program: PathBuf::from(program),
            args: args.to_vec(),
        })
    }
}

impl WallpaperApplier for CommandApplier {
    fn apply<'a>(&'a self, path: &'a Path, style: WallpaperStyle) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            ensure_exists(path).await?;

            debug!(program = ?self.program, path = ?path, "Running wallpaper command");
            let status = tokio::process::Command::new(&self.program)
                .args(&self.args)
                .arg(path)
                .env("WALLPAPER_STYLE", style.as_str())
                .status()
                .await
                .map_err(|e| {
                    RefresherError::Apply(format!("failed to run {:?}: {}", self.program, e))
                })?;

            if !status.success() {
                return Err(RefresherError::Apply(format!(
                    "{:?} exited with {}",
                    self.program, status
                )));
            }

            info!(path = ?path, %style, "Wallpaper applied");
            Ok(())
        })
    }
}
