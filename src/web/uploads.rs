use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::domain::TripImage;
use crate::error::{AppError, Result};

/// Accepted trip image extensions and the content type served for each.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
];

pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

const TRIP_IMAGE_DIR: &str = "trips";

pub fn content_type_for(extension: &str) -> Option<&'static str> {
    let extension = extension.to_ascii_lowercase();
    IMAGE_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, content_type)| *content_type)
}

fn extension_of(filename: &str) -> Result<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| AppError::Validation("Image filename has no extension".to_string()))
}

/// Validates an uploaded trip image and writes it under
/// `<uploads_dir>/trips/` with a fresh name.
pub async fn save_trip_image(uploads_dir: &str, filename: &str, data: &[u8]) -> Result<TripImage> {
    if data.is_empty() {
        return Err(AppError::Validation("Image file is empty".to_string()));
    }
    if data.len() > MAX_IMAGE_SIZE {
        return Err(AppError::Validation("Image too large (max 5 MB)".to_string()));
    }

    let extension = extension_of(filename)?;
    let content_type = content_type_for(&extension).ok_or_else(|| {
        AppError::Validation(format!(
            "Invalid image type. Allowed: {}",
            IMAGE_TYPES
                .iter()
                .map(|(ext, _)| *ext)
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })?;

    let dir = PathBuf::from(uploads_dir).join(TRIP_IMAGE_DIR);
    fs::create_dir_all(&dir).await.map_err(|e| {
        AppError::Internal(format!("Failed to create uploads directory: {}", e))
    })?;

    let name = format!("{}.{}", Uuid::new_v4(), extension);
    let mut file = fs::File::create(dir.join(&name)).await.map_err(|e| {
        AppError::Internal(format!("Failed to create file: {}", e))
    })?;
    file.write_all(data).await.map_err(|e| {
        AppError::Internal(format!("Failed to write file: {}", e))
    })?;
    file.flush().await.map_err(|e| {
        AppError::Internal(format!("Failed to write file: {}", e))
    })?;

    Ok(TripImage {
        path: format!("{}/{}", TRIP_IMAGE_DIR, name),
        content_type: content_type.to_string(),
    })
}

/// Filesystem location of a stored image. Rejects paths that would leave
/// the uploads directory.
pub fn resolve(uploads_dir: &str, relative: &str) -> Result<PathBuf> {
    let rel = Path::new(relative);
    if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
        return Err(AppError::NotFound("Image not found".to_string()));
    }
    Ok(PathBuf::from(uploads_dir).join(rel))
}

pub async fn delete_uploaded_file(uploads_dir: &str, relative: &str) -> Result<()> {
    let path = resolve(uploads_dir, relative)?;
    match fs::remove_file(&path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::Internal(format!("Failed to delete file: {}", e))),
    }
}
