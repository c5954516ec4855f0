use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;

use blog_shared::clients::db;
use blog_shared::errors::{AppError, AppResult, ErrorCode};
use blog_shared::types::pagination::{CursorPage, CursorParams};
use blog_shared::types::ApiResponse;

use crate::models::{AuthorSummary, Blog, BlogStatus, PublicBlog};
use crate::schema::{blogs, profiles};
use crate::AppState;

use super::{BlogBody, BlogPage};

/// Published posts, newest first. No authentication.
pub async fn list_published(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CursorParams>,
) -> AppResult<Json<ApiResponse<BlogPage<PublicBlog>>>> {
    let limit = params.limit();
    let fetch = params.fetch_limit();
    let cursor = params.cursor()?;

    let rows = db::run(&state.db, move |conn| {
        let mut query = blogs::table
            .left_join(profiles::table)
            .filter(blogs::status.eq(BlogStatus::Published.as_str()))
            .select((Blog::as_select(), Option::<AuthorSummary>::as_select()))
            .order(blogs::created_at.desc())
            .limit(fetch)
            .into_boxed();

        if let Some(before) = cursor {
            query = query.filter(blogs::created_at.lt(before));
        }

        Ok(query.load::<(Blog, Option<AuthorSummary>)>(conn)?)
    })
    .await?;

    let items = rows
        .into_iter()
        .map(|(blog, author)| PublicBlog::from_row(blog, author))
        .collect();

    let page = CursorPage::from_overfetch(items, limit, |b| b.created_at);
    Ok(Json(ApiResponse::ok(BlogPage::from(page))))
}

/// Newest published post carrying `slug`. Slugs are not unique, so older
/// posts with the same title are shadowed.
pub async fn get_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<BlogBody<PublicBlog>>>> {
    let slug = slug.trim().to_lowercase();

    let row = db::run(&state.db, move |conn| {
        Ok(blogs::table
            .left_join(profiles::table)
            .filter(blogs::slug.eq(&slug))
            .filter(blogs::status.eq(BlogStatus::Published.as_str()))
            .select((Blog::as_select(), Option::<AuthorSummary>::as_select()))
            .order(blogs::created_at.desc())
            .first::<(Blog, Option<AuthorSummary>)>(conn)
            .optional()?)
    })
    .await?;

    let (blog, author) = row.ok_or_else(|| AppError::new(ErrorCode::BlogNotFound, "Blog not found"))?;

    Ok(Json(ApiResponse::ok(BlogBody {
        blog: PublicBlog::from_row(blog, author),
    })))
}
