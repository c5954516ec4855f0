use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;
use uuid::Uuid;

use blog_shared::clients::storage::ObjectStorage;
use blog_shared::errors::{AppError, AppResult, ErrorCode};

use crate::config::AppConfig;

pub const MAX_FILES_PER_REQUEST: usize = 5;
pub const MAX_IMAGE_WIDTH: u32 = 1600;
pub const JPEG_QUALITY: u8 = 75;

const MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    /// Map a MIME type onto the allow-list. Anything not listed is `None`.
    pub fn classify(mime: &str) -> Option<MediaKind> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/png" | "image/webp" => Some(MediaKind::Image),
            "audio/mpeg" | "audio/wav" => Some(MediaKind::Audio),
            "video/mp4" | "video/webm" => Some(MediaKind::Video),
            _ => None,
        }
    }

    /// Storage prefix, also the name of the blog column holding the URLs.
    pub fn dir(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Audio => "audios",
            MediaKind::Video => "videos",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "Image",
            MediaKind::Audio => "Audio",
            MediaKind::Video => "Video",
        }
    }
}

/// Per-category size ceilings in bytes.
#[derive(Debug, Clone, Copy)]
pub struct MediaLimits {
    pub image_mb: u64,
    pub audio_mb: u64,
    pub video_mb: u64,
}

impl MediaLimits {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            image_mb: config.image_max_size_mb,
            audio_mb: config.audio_max_size_mb,
            video_mb: config.video_max_size_mb,
        }
    }

    fn max_mb(&self, kind: MediaKind) -> u64 {
        match kind {
            MediaKind::Image => self.image_mb,
            MediaKind::Audio => self.audio_mb,
            MediaKind::Video => self.video_mb,
        }
    }

    /// Largest single file any category accepts.
    pub fn largest_bytes(&self) -> u64 {
        self.image_mb.max(self.audio_mb).max(self.video_mb) * MB
    }

    pub fn check(&self, kind: MediaKind, size: usize) -> Result<(), AppError> {
        let max_mb = self.max_mb(kind);
        if size as u64 > max_mb * MB {
            return Err(AppError::new(
                ErrorCode::MediaTooLarge,
                format!("{} exceeds {}MB", kind.label(), max_mb),
            ));
        }
        Ok(())
    }
}

/// A file pulled out of a multipart body that passed the allow-list.
#[derive(Debug)]
pub struct IncomingFile {
    pub kind: MediaKind,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(content_type: &str, bytes: Vec<u8>, limits: &MediaLimits) -> Result<Self, AppError> {
        let kind = MediaKind::classify(content_type).ok_or_else(|| {
            AppError::new(
                ErrorCode::UnsupportedMediaType,
                format!("Unsupported file type: {content_type}"),
            )
        })?;
        limits.check(kind, bytes.len())?;
        Ok(Self {
            kind,
            content_type: content_type.trim().to_ascii_lowercase(),
            bytes,
        })
    }
}

/// Bytes ready to be written to object storage.
#[derive(Debug)]
pub struct PreparedUpload {
    pub kind: MediaKind,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Public URLs grouped by media category.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MediaUrls {
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub audios: Vec<String>,
}

impl MediaUrls {
    pub fn push(&mut self, kind: MediaKind, url: String) {
        match kind {
            MediaKind::Image => self.images.push(url),
            MediaKind::Audio => self.audios.push(url),
            MediaKind::Video => self.videos.push(url),
        }
    }

    pub fn extend(&mut self, other: MediaUrls) {
        self.images.extend(other.images);
        self.videos.extend(other.videos);
        self.audios.extend(other.audios);
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.videos.is_empty() && self.audios.is_empty()
    }

    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.images
            .iter()
            .chain(&self.videos)
            .chain(&self.audios)
            .map(String::as_str)
    }
}

pub fn storage_key(kind: MediaKind, ext: &str) -> String {
    format!("{}/{}{}", kind.dir(), Uuid::new_v4(), ext)
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/webp" => ".webp",
        "audio/mpeg" => ".mp3",
        "audio/wav" => ".wav",
        "video/mp4" => ".mp4",
        "video/webm" => ".webm",
        _ => "",
    }
}

/// Downscale to at most [`MAX_IMAGE_WIDTH`] wide (never upscale) and
/// re-encode as JPEG.
pub fn optimize_image(bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let img = image::load_from_memory(bytes).map_err(|e| {
        AppError::new(ErrorCode::MediaProcessingFailed, format!("could not decode image: {e}"))
    })?;

    let (width, height) = img.dimensions();
    let img = if width > MAX_IMAGE_WIDTH {
        let new_height = ((u64::from(height) * u64::from(MAX_IMAGE_WIDTH)) / u64::from(width)).max(1) as u32;
        img.resize_exact(MAX_IMAGE_WIDTH, new_height, FilterType::Lanczos3)
    } else {
        img
    };

    let rgb = img.to_rgb8();
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| AppError::new(ErrorCode::MediaProcessingFailed, format!("could not encode image: {e}")))?;

    Ok(out.into_inner())
}

/// Turn an accepted file into storage bytes. Images are recompressed; audio
/// and video go through untouched.
pub fn prepare(file: IncomingFile) -> Result<PreparedUpload, AppError> {
    match file.kind {
        MediaKind::Image => Ok(PreparedUpload {
            kind: file.kind,
            key: storage_key(file.kind, ".jpg"),
            body: optimize_image(&file.bytes)?,
            content_type: "image/jpeg".to_string(),
        }),
        MediaKind::Audio | MediaKind::Video => Ok(PreparedUpload {
            kind: file.kind,
            key: storage_key(file.kind, extension_for(&file.content_type)),
            body: file.bytes,
            content_type: file.content_type,
        }),
    }
}

/// Prepare and upload every file. On failure, objects already written by
/// this call are removed again before the error is returned.
pub async fn upload_all(storage: &ObjectStorage, files: Vec<IncomingFile>) -> AppResult<MediaUrls> {
    let mut uploaded = MediaUrls::default();

    for file in files {
        let prepared = match tokio::task::spawn_blocking(move || prepare(file)).await {
            Ok(Ok(p)) => p,
            Ok(Err(e)) => {
                storage.delete_urls(uploaded.all()).await;
                return Err(e);
            }
            Err(e) => {
                storage.delete_urls(uploaded.all()).await;
                return Err(AppError::Internal(e.into()));
            }
        };

        match storage
            .upload(&prepared.key, prepared.body, &prepared.content_type)
            .await
        {
            Ok(url) => {
                tracing::debug!(key = %prepared.key, kind = prepared.kind.dir(), "media uploaded");
                uploaded.push(prepared.kind, url);
            }
            Err(e) => {
                tracing::error!(key = %prepared.key, error = %e, "media upload failed");
                storage.delete_urls(uploaded.all()).await;
                return Err(AppError::new(ErrorCode::MediaUploadFailed, "failed to upload media"));
            }
        }
    }

    Ok(uploaded)
}
