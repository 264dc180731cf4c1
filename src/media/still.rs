use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::models::Frame;

/// Decode an image file on the blocking pool.
pub async fn load_image_file(path: &Path) -> Result<Frame> {
    let path_buf = path.to_path_buf();
    let image = tokio::task::spawn_blocking(move || image::open(&path_buf))
        .await
        .context("image decode worker join failed")?
        .with_context(|| format!("failed to decode {}", path.display()))?
        .into_rgba8();

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} has no file name", path.display()))?;

    Ok(Frame::new(image).with_file_name(file_name))
}

/// Decode several files, preserving their order. Fails on the first bad file.
pub async fn load_image_files(paths: &[PathBuf]) -> Result<Vec<Frame>> {
    let mut frames = Vec::with_capacity(paths.len());
    for path in paths {
        frames.push(load_image_file(path).await?);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[tokio::test]
    async fn decodes_png_and_keeps_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_001.png");
        RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let frame = load_image_file(&path).await.unwrap();
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(frame.file_name.as_deref(), Some("frame_001.png"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_image_files(&[dir.path().join("nope.png")]).await;
        assert!(result.is_err());
    }
}
