use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use blog_shared::clients::db;
use blog_shared::errors::{AppError, AppResult, ErrorCode};
use blog_shared::middleware::AdminUser;
use blog_shared::types::pagination::{CursorPage, CursorParams};
use blog_shared::types::{ApiResponse, NoData};

use super::{parse_id, validation_error, BlogBody, BlogPage};
use crate::middleware::JsonBody;
use crate::models::{AuthorSummary, Blog, BlogChanges, BlogStatus, BlogWithAuthor, ContentBlock, NewBlog};
use crate::schema::{blogs, profiles};
use crate::services::media_service::{
    self, IncomingFile, MediaKind, MediaLimits, MediaUrls, MAX_FILES_PER_REQUEST,
};
use crate::services::slug::slugify;
use crate::AppState;

// --- Multipart form ---

/// Parts that are always read as text, whatever content type the client
/// declared for them. Browsers send JSON blobs as `application/json`.
const TEXT_FIELDS: [&str; 7] = [
    "title",
    "description",
    "status",
    "content_blocks",
    "images",
    "videos",
    "audios",
];

/// Fields of a create/update form. Text fields keep their raw value; files
/// have already passed the allow-list and size ceilings.
#[derive(Debug, Default, Validate)]
pub struct BlogForm {
    #[validate(length(max = 255, message = "Title must be at most 255 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub content_blocks: Option<String>,
    pub urls: MediaUrls,
    pub files: Vec<IncomingFile>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::new(ErrorCode::PayloadTooLarge, "request body too large")
    } else {
        AppError::bad_request(format!("invalid multipart body: {}", e.body_text()))
    }
}

async fn read_file(mut field: Field<'_>, content_type: &str, limits: &MediaLimits) -> AppResult<IncomingFile> {
    let kind = MediaKind::classify(content_type).ok_or_else(|| {
        AppError::new(
            ErrorCode::UnsupportedMediaType,
            format!("Unsupported file type: {content_type}"),
        )
    })?;

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        bytes.extend_from_slice(&chunk);
        limits.check(kind, bytes.len())?;
    }

    IncomingFile::new(content_type, bytes, limits)
}

impl BlogForm {
    pub async fn read(mut multipart: Multipart, limits: &MediaLimits) -> AppResult<Self> {
        let mut form = BlogForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().trim_end_matches("[]").to_string();
            let content_type = field.content_type().map(str::to_string);

            // outside the known text fields, anything carrying a filename or a
            // non-text type is an upload
            let is_file = !TEXT_FIELDS.contains(&name.as_str())
                && (field.file_name().is_some()
                    || content_type.as_deref().is_some_and(|ct| !ct.starts_with("text/")));

            if is_file {
                if form.files.len() >= MAX_FILES_PER_REQUEST {
                    return Err(AppError::new(
                        ErrorCode::TooManyFiles,
                        format!("Maximum {MAX_FILES_PER_REQUEST} files per request"),
                    ));
                }
                let ct = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
                form.files.push(read_file(field, &ct, limits).await?);
                continue;
            }

            let value = field.text().await.map_err(multipart_error)?;
            match name.as_str() {
                "title" => form.title = Some(value),
                "description" => form.description = Some(value),
                "status" => form.status = Some(value),
                "content_blocks" => form.content_blocks = Some(value),
                "images" | "videos" | "audios" => {
                    let value = value.trim();
                    if !value.is_empty() {
                        let kind = match name.as_str() {
                            "images" => MediaKind::Image,
                            "videos" => MediaKind::Video,
                            _ => MediaKind::Audio,
                        };
                        form.urls.push(kind, value.to_string());
                    }
                }
                other => tracing::debug!(field = %other, "ignoring unknown form field"),
            }
        }

        Ok(form)
    }

    fn title(&self) -> Option<String> {
        non_blank(self.title.as_deref())
    }

    fn description(&self) -> Option<String> {
        non_blank(self.description.as_deref())
    }

    fn status(&self) -> AppResult<Option<BlogStatus>> {
        non_blank(self.status.as_deref()).map(|s| s.parse()).transpose()
    }

    fn blocks(&self) -> AppResult<Option<serde_json::Value>> {
        match non_blank(self.content_blocks.as_deref()) {
            None => Ok(None),
            Some(raw) => {
                let blocks = ContentBlock::parse_list(&raw)?;
                serde_json::to_value(blocks)
                    .map(Some)
                    .map_err(|e| AppError::Internal(e.into()))
            }
        }
    }

    /// Validated insert row, minus the URLs of files not yet uploaded.
    fn new_blog(&self, author_id: uuid::Uuid) -> AppResult<NewBlog> {
        self.validate().map_err(validation_error)?;
        let title = self
            .title()
            .ok_or_else(|| AppError::new(ErrorCode::ValidationError, "Title is required"))?;
        let status = self.status()?.unwrap_or(BlogStatus::Published);
        let description = self.description();
        let content_blocks = self.blocks()?;

        let has_blocks = content_blocks
            .as_ref()
            .and_then(|v| v.as_array())
            .is_some_and(|a| !a.is_empty());
        if description.is_none() && !has_blocks {
            return Err(AppError::new(
                ErrorCode::ValidationError,
                "Description or content blocks are required",
            ));
        }

        Ok(NewBlog {
            slug: slugify(&title),
            title,
            description,
            status: status.as_str().to_string(),
            images: self.urls.images.clone(),
            videos: self.urls.videos.clone(),
            audios: self.urls.audios.clone(),
            content_blocks,
            author_id: Some(author_id),
        })
    }

    /// Scalar part of an update. Media arrays are filled in once the current
    /// row and the uploads are known.
    fn changes(&self) -> AppResult<BlogChanges> {
        self.validate().map_err(validation_error)?;
        let title = self.title();
        Ok(BlogChanges {
            slug: title.as_deref().map(slugify),
            title,
            description: self.description(),
            status: self.status()?.map(|s| s.as_str().to_string()),
            content_blocks: self.blocks()?,
            updated_at: Some(Utc::now()),
            ..Default::default()
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn multipart_body(multipart: Result<Multipart, MultipartRejection>) -> AppResult<Multipart> {
    multipart.map_err(|e| {
        AppError::new(ErrorCode::ValidationError, format!("expected multipart/form-data: {}", e.body_text()))
    })
}

// --- Handlers ---

pub async fn create_blog(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<BlogBody<Blog>>>)> {
    let form = BlogForm::read(multipart_body(multipart)?, &state.media_limits()).await?;
    let mut new_blog = form.new_blog(admin.id)?;

    let uploaded = media_service::upload_all(&state.storage, form.files).await?;
    new_blog.images.extend(uploaded.images.iter().cloned());
    new_blog.videos.extend(uploaded.videos.iter().cloned());
    new_blog.audios.extend(uploaded.audios.iter().cloned());

    let inserted = db::run(&state.db, move |conn| {
        Ok(diesel::insert_into(blogs::table)
            .values(&new_blog)
            .returning(Blog::as_returning())
            .get_result(conn)?)
    })
    .await;

    let blog = match inserted {
        Ok(blog) => blog,
        Err(e) => {
            discard_uploads(&state, &uploaded).await;
            return Err(e);
        }
    };

    tracing::info!(blog_id = %blog.id, author_id = %admin.id, slug = %blog.slug, "blog created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(BlogBody { blog }, "Blog created successfully")),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct BlogListParams {
    pub limit: Option<String>,
    pub cursor: Option<String>,
    pub status: Option<String>,
}

impl BlogListParams {
    fn page(&self) -> CursorParams {
        CursorParams {
            limit: self.limit.clone(),
            cursor: self.cursor.clone(),
        }
    }
}

pub async fn list_blogs(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<BlogListParams>,
) -> AppResult<Json<ApiResponse<BlogPage<BlogWithAuthor>>>> {
    let page = params.page();
    let limit = page.limit();
    let fetch = page.fetch_limit();
    let cursor = page.cursor()?;
    let status = non_blank(params.status.as_deref())
        .map(|s| s.parse::<BlogStatus>())
        .transpose()?;

    let rows = db::run(&state.db, move |conn| {
        let mut query = blogs::table
            .left_join(profiles::table)
            .select((Blog::as_select(), Option::<AuthorSummary>::as_select()))
            .order(blogs::created_at.desc())
            .limit(fetch)
            .into_boxed();

        if let Some(before) = cursor {
            query = query.filter(blogs::created_at.lt(before));
        }
        if let Some(status) = status {
            query = query.filter(blogs::status.eq(status.as_str()));
        }

        Ok(query.load::<(Blog, Option<AuthorSummary>)>(conn)?)
    })
    .await?;

    let items = rows
        .into_iter()
        .map(|(blog, author)| BlogWithAuthor { blog, author })
        .collect();

    let page = CursorPage::from_overfetch(items, limit, |b| b.blog.created_at);
    Ok(Json(ApiResponse::ok(BlogPage::from(page))))
}

pub async fn update_blog(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ApiResponse<BlogBody<Blog>>>> {
    let id = parse_id(&id)?;
    let form = BlogForm::read(multipart_body(multipart)?, &state.media_limits()).await?;
    let mut changes = form.changes()?;

    let existing = find_blog(&state, id).await?;

    let uploaded = media_service::upload_all(&state.storage, form.files).await?;

    // new URLs are appended after the ones already on the post
    let mut added = form.urls;
    added.extend(uploaded.clone());
    changes.images = Some([existing.images, added.images].concat());
    changes.videos = Some([existing.videos, added.videos].concat());
    changes.audios = Some([existing.audios, added.audios].concat());

    let updated = db::run(&state.db, move |conn| {
        diesel::update(blogs::table.find(id))
            .set(&changes)
            .returning(Blog::as_returning())
            .get_result(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::BlogNotFound, "Blog not found"))
    })
    .await;

    let blog = match updated {
        Ok(blog) => blog,
        Err(e) => {
            discard_uploads(&state, &uploaded).await;
            return Err(e);
        }
    };

    tracing::info!(blog_id = %blog.id, admin_id = %admin.id, "blog updated");

    Ok(Json(ApiResponse::ok_with_message(BlogBody { blog }, "Blog updated successfully")))
}

#[derive(Debug, Deserialize)]
pub struct RemoveMediaRequest {
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub urls: Option<Vec<String>>,
}

impl RemoveMediaRequest {
    fn into_target(self) -> AppResult<(MediaKind, Vec<String>)> {
        let kind = match self.media_type.as_deref().map(str::trim) {
            Some("images") => MediaKind::Image,
            Some("videos") => MediaKind::Video,
            Some("audios") => MediaKind::Audio,
            _ => return Err(AppError::new(ErrorCode::ValidationError, "Invalid media type")),
        };
        let urls: Vec<String> = self
            .urls
            .unwrap_or_default()
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if urls.is_empty() {
            return Err(AppError::new(ErrorCode::ValidationError, "URLs are required"));
        }
        Ok((kind, urls))
    }
}

pub async fn remove_media(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<RemoveMediaRequest>,
) -> AppResult<Json<ApiResponse<BlogBody<Blog>>>> {
    let id = parse_id(&id)?;
    let (kind, urls) = req.into_target()?;

    let existing = find_blog(&state, id).await?;
    let current = match kind {
        MediaKind::Image => existing.images,
        MediaKind::Video => existing.videos,
        MediaKind::Audio => existing.audios,
    };
    let (removed, kept): (Vec<String>, Vec<String>) =
        current.into_iter().partition(|u| urls.contains(u));

    let mut changes = BlogChanges {
        updated_at: Some(Utc::now()),
        ..Default::default()
    };
    match kind {
        MediaKind::Image => changes.images = Some(kept),
        MediaKind::Video => changes.videos = Some(kept),
        MediaKind::Audio => changes.audios = Some(kept),
    }

    let blog = db::run(&state.db, move |conn| {
        diesel::update(blogs::table.find(id))
            .set(&changes)
            .returning(Blog::as_returning())
            .get_result(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::BlogNotFound, "Blog not found"))
    })
    .await?;

    let deleted = state.storage.delete_urls(removed.iter().map(String::as_str)).await;

    tracing::info!(
        blog_id = %blog.id,
        admin_id = %admin.id,
        kind = kind.dir(),
        removed = removed.len(),
        objects_deleted = deleted,
        "blog media removed"
    );

    Ok(Json(ApiResponse::ok_with_message(BlogBody { blog }, "Media removed successfully")))
}

pub async fn delete_blog(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<NoData>>> {
    let id = parse_id(&id)?;

    let blog = db::run(&state.db, move |conn| {
        diesel::delete(blogs::table.find(id))
            .returning(Blog::as_returning())
            .get_result(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::BlogNotFound, "Blog not found"))
    })
    .await?;

    let urls = blog.media_urls();
    let deleted = state.storage.delete_urls(urls.iter().map(String::as_str)).await;

    tracing::info!(blog_id = %id, admin_id = %admin.id, objects_deleted = deleted, "blog deleted");

    Ok(Json(ApiResponse::message("Blog deleted successfully")))
}

async fn find_blog(state: &AppState, id: uuid::Uuid) -> AppResult<Blog> {
    db::run(&state.db, move |conn| {
        blogs::table
            .find(id)
            .select(Blog::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::BlogNotFound, "Blog not found"))
    })
    .await
}

async fn discard_uploads(state: &AppState, uploaded: &MediaUrls) {
    if uploaded.is_empty() {
        return;
    }
    let removed = state.storage.delete_urls(uploaded.all()).await;
    tracing::warn!(removed, "discarded uploads of a failed blog write");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;
    use blog_shared::UserRole;
    use serde_json::json;
    use tower::ServiceExt;

    const BOUNDARY: &str = "XBLOGBOUNDARYX";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a str, Vec<u8>),
    }

    fn multipart_request(method: &str, uri: &str, token: Option<&str>, parts: Vec<Part<'_>>) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
                    );
                }
                Part::File(name, filename, content_type, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(&bytes);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", format!("multipart/form-data; boundary={BOUNDARY}"));
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn limits() -> MediaLimits {
        MediaLimits { image_mb: 5, audio_mb: 10, video_mb: 50 }
    }

    async fn read_form(parts: Vec<Part<'_>>) -> AppResult<BlogForm> {
        let req = multipart_request("POST", "/", None, parts);
        let multipart = Multipart::from_request(req, &()).await.unwrap();
        BlogForm::read(multipart, &limits()).await
    }

    #[tokio::test]
    async fn form_collects_text_urls_and_files() {
        let form = read_form(vec![
            Part::Text("title", "Hello World"),
            Part::Text("description", "Body"),
            Part::Text("images", "https://cdn.example.com/a.jpg"),
            Part::Text("videos[]", "https://cdn.example.com/v.mp4"),
            Part::Text("audios", "   "),
            Part::File("media", "clip.mp3", "audio/mpeg", vec![1, 2, 3]),
        ])
        .await
        .unwrap();

        assert_eq!(form.title.as_deref(), Some("Hello World"));
        assert_eq!(form.urls.images, vec!["https://cdn.example.com/a.jpg"]);
        assert_eq!(form.urls.videos, vec!["https://cdn.example.com/v.mp4"]);
        assert!(form.urls.audios.is_empty());
        assert_eq!(form.files.len(), 1);
        assert_eq!(form.files[0].kind, MediaKind::Audio);

        let new_blog = form.new_blog(uuid::Uuid::new_v4()).unwrap();
        assert_eq!(new_blog.slug, "hello-world");
        assert_eq!(new_blog.status, "published");
    }

    #[tokio::test]
    async fn form_rejects_disallowed_files() {
        let err = read_form(vec![Part::File("media", "a.gif", "image/gif", vec![0; 4])])
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("Unsupported file type"));
    }

    #[tokio::test]
    async fn form_caps_file_count() {
        let parts = (0..6)
            .map(|_| Part::File("media", "a.mp3", "audio/mpeg", vec![1]))
            .collect();
        let err = read_form(parts).await.unwrap_err();
        assert_eq!(err.to_string(), "Maximum 5 files per request");
    }

    #[tokio::test]
    async fn form_enforces_size_ceiling() {
        let tiny = MediaLimits { image_mb: 1, audio_mb: 1, video_mb: 1 };
        let req = multipart_request(
            "POST",
            "/",
            None,
            vec![Part::File("media", "a.mp4", "video/mp4", vec![0; 1024 * 1024 + 1])],
        );
        let multipart = Multipart::from_request(req, &()).await.unwrap();
        let err = BlogForm::read(multipart, &tiny).await.unwrap_err();
        assert_eq!(err.to_string(), "Video exceeds 1MB");
    }

    #[tokio::test]
    async fn create_requires_title_and_body() {
        let form = read_form(vec![Part::Text("description", "x")]).await.unwrap();
        assert_eq!(form.new_blog(uuid::Uuid::new_v4()).unwrap_err().to_string(), "Title is required");

        let form = read_form(vec![Part::Text("title", "T")]).await.unwrap();
        assert!(form.new_blog(uuid::Uuid::new_v4()).is_err());

        let form = read_form(vec![
            Part::Text("title", "T"),
            Part::Text("content_blocks", r#"[{"type":"paragraph","text":"hi"}]"#),
        ])
        .await
        .unwrap();
        let blog = form.new_blog(uuid::Uuid::new_v4()).unwrap();
        assert!(blog.description.is_none());
        assert_eq!(blog.content_blocks.unwrap()[0]["type"], "paragraph");
    }

    #[tokio::test]
    async fn create_rejects_unknown_status() {
        let form = read_form(vec![
            Part::Text("title", "T"),
            Part::Text("description", "d"),
            Part::Text("status", "archived"),
        ])
        .await
        .unwrap();
        assert!(form.new_blog(uuid::Uuid::new_v4()).is_err());
    }

    #[tokio::test]
    async fn update_changes_regenerate_slug() {
        let form = read_form(vec![Part::Text("title", "New Title"), Part::Text("status", "draft")])
            .await
            .unwrap();
        let changes = form.changes().unwrap();
        assert_eq!(changes.slug.as_deref(), Some("new-title"));
        assert_eq!(changes.status.as_deref(), Some("draft"));
        assert!(changes.description.is_none());
        assert!(changes.updated_at.is_some());
    }

    #[tokio::test]
    async fn json_typed_text_parts_stay_text() {
        let blocks = r#"[{"type":"heading","text":"Intro"}]"#;
        let form = read_form(vec![
            Part::Text("title", "T"),
            Part::File("content_blocks", "blob", "application/json", blocks.as_bytes().to_vec()),
            Part::File("images", "blob", "text/uri-list", b"https://cdn.example.com/a.jpg".to_vec()),
        ])
        .await
        .unwrap();

        assert!(form.files.is_empty());
        assert_eq!(form.content_blocks.as_deref(), Some(blocks));
        assert_eq!(form.urls.images, vec!["https://cdn.example.com/a.jpg"]);
        let blog = form.new_blog(uuid::Uuid::new_v4()).unwrap();
        assert_eq!(blog.content_blocks.unwrap()[0]["text"], "Intro");
    }

    #[tokio::test]
    async fn overlong_title_is_rejected_before_upload() {
        let long = "t".repeat(256);
        let form = read_form(vec![
            Part::Text("title", &long),
            Part::Text("description", "d"),
            Part::File("media", "clip.mp3", "audio/mpeg", vec![1, 2, 3]),
        ])
        .await
        .unwrap();
        let err = form.new_blog(uuid::Uuid::new_v4()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Title must be at most 255 characters");
        assert_eq!(form.changes().unwrap_err().to_string(), "Title must be at most 255 characters");

        let exact = "t".repeat(255);
        let form = read_form(vec![Part::Text("title", &exact), Part::Text("description", "d")])
            .await
            .unwrap();
        assert!(form.new_blog(uuid::Uuid::new_v4()).is_ok());
    }

    #[tokio::test]
    async fn overlong_title_over_http_is_400() {
        let long = "t".repeat(300);
        let response = app()
            .oneshot(multipart_request(
                "POST",
                "/api/blogs",
                Some(&token(UserRole::Admin)),
                vec![Part::Text("title", &long), Part::Text("description", "d")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Title must be at most 255 characters");
    }

    #[tokio::test]
    async fn multipart_routes_accept_media_sized_bodies() {
        // 2 MB of audio is far above the JSON cap but within the audio ceiling
        let response = app()
            .oneshot(multipart_request(
                "POST",
                "/api/blogs",
                Some(&token(UserRole::Admin)),
                vec![
                    Part::Text("description", "no title"),
                    Part::File("media", "clip.mp3", "audio/mpeg", vec![0; 2 * 1024 * 1024]),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Title is required");
    }

    #[test]
    fn remove_media_validation() {
        let bad_type = RemoveMediaRequest { media_type: Some("files".into()), urls: Some(vec!["u".into()]) };
        assert_eq!(bad_type.into_target().unwrap_err().to_string(), "Invalid media type");

        let no_urls = RemoveMediaRequest { media_type: Some("images".into()), urls: Some(vec![]) };
        assert_eq!(no_urls.into_target().unwrap_err().to_string(), "URLs are required");

        let ok = RemoveMediaRequest { media_type: Some("videos".into()), urls: Some(vec!["u".into()]) };
        assert_eq!(ok.into_target().unwrap().0, MediaKind::Video);
    }

    #[tokio::test]
    async fn create_validation_over_http() {
        let response = app()
            .oneshot(multipart_request(
                "POST",
                "/api/blogs",
                Some(&token(UserRole::Admin)),
                vec![Part::Text("description", "no title")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Title is required");
    }

    #[tokio::test]
    async fn create_requires_multipart() {
        let response = app()
            .oneshot(request("POST", "/api/blogs", Some(&token(UserRole::Admin)), Some(json!({ "title": "x" }))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_cursor_is_rejected() {
        let response = app()
            .oneshot(request("GET", "/api/blogs?cursor=yesterday", Some(&token(UserRole::Admin)), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn remove_media_validates_body_first() {
        let response = app()
            .oneshot(request(
                "PATCH",
                "/api/blogs/7d0e0a8c-0000-4000-8000-000000000001/media",
                Some(&token(UserRole::Admin)),
                Some(json!({ "type": "images", "urls": [] })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
