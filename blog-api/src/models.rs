use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use blog_shared::{AppError, ErrorCode, UserRole};

use crate::schema::{blogs, email_otps, profiles, refresh_tokens};

// --- Profiles ---

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Stored role, `None` when the column holds something we no longer know.
    pub fn role(&self) -> Option<UserRole> {
        self.role.parse().ok()
    }

    pub fn can_login(&self) -> bool {
        self.role().is_some_and(|r| r.can_login())
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = profiles)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub role: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection of a profile used in auth responses and blog listings.
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = profiles)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<&Profile> for AuthorSummary {
    fn from(p: &Profile) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            email: p.email.clone(),
            role: p.role.clone(),
        }
    }
}

// --- Blogs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlogStatus {
    Draft,
    Published,
}

impl BlogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlogStatus::Draft => "draft",
            BlogStatus::Published => "published",
        }
    }
}

impl std::str::FromStr for BlogStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "draft" => Ok(BlogStatus::Draft),
            "published" => Ok(BlogStatus::Published),
            _ => Err(AppError::new(
                ErrorCode::InvalidStatus,
                "status must be either draft or published",
            )),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = blogs)]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub status: String,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub audios: Vec<String>,
    pub content_blocks: Option<serde_json::Value>,
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Blog {
    /// Every media URL the post references: the flat arrays plus media blocks.
    pub fn media_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .images
            .iter()
            .chain(&self.videos)
            .chain(&self.audios)
            .cloned()
            .collect();

        if let Some(blocks) = self
            .content_blocks
            .as_ref()
            .and_then(|v| serde_json::from_value::<Vec<ContentBlock>>(v.clone()).ok())
        {
            urls.extend(blocks.into_iter().filter_map(|b| match b {
                ContentBlock::Media { url, .. } => Some(url),
                _ => None,
            }));
        }

        urls.sort();
        urls.dedup();
        urls
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = blogs)]
pub struct NewBlog {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub status: String,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub audios: Vec<String>,
    pub content_blocks: Option<serde_json::Value>,
    pub author_id: Option<Uuid>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = blogs)]
pub struct BlogChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub images: Option<Vec<String>>,
    pub videos: Option<Vec<String>>,
    pub audios: Option<Vec<String>>,
    pub content_blocks: Option<serde_json::Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Admin listing row: the post with its author embedded.
#[derive(Debug, Serialize)]
pub struct BlogWithAuthor {
    #[serde(flatten)]
    pub blog: Blog,
    pub author: Option<AuthorSummary>,
}

/// Public listing row. Drafts never reach this shape and the author's
/// email and role stay private.
#[derive(Debug, Serialize)]
pub struct PublicBlog {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub audios: Vec<String>,
    pub content_blocks: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub author: Option<PublicAuthor>,
}

#[derive(Debug, Serialize)]
pub struct PublicAuthor {
    pub id: Uuid,
    pub name: String,
}

impl PublicBlog {
    pub fn from_row(blog: Blog, author: Option<AuthorSummary>) -> Self {
        Self {
            id: blog.id,
            title: blog.title,
            slug: blog.slug,
            status: blog.status,
            description: blog.description,
            images: blog.images,
            videos: blog.videos,
            audios: blog.audios,
            content_blocks: blog.content_blocks,
            created_at: blog.created_at,
            author: author.map(|a| PublicAuthor { id: a.id, name: a.name }),
        }
    }
}

// --- Content blocks ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockMediaType {
    Image,
    Audio,
    Video,
}

fn default_heading_level() -> u8 {
    2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Heading {
        text: String,
        #[serde(default = "default_heading_level")]
        level: u8,
    },
    Paragraph {
        text: String,
    },
    Media {
        url: String,
        media_type: BlockMediaType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

impl ContentBlock {
    /// Parse the `content_blocks` form field: a JSON array of typed blocks.
    pub fn parse_list(raw: &str) -> Result<Vec<ContentBlock>, AppError> {
        let blocks: Vec<ContentBlock> = serde_json::from_str(raw).map_err(|e| {
            AppError::new(
                ErrorCode::InvalidContentBlocks,
                format!("content_blocks must be a JSON array of blocks: {e}"),
            )
        })?;

        for (i, block) in blocks.iter().enumerate() {
            block.validate().map_err(|msg| {
                AppError::new(ErrorCode::InvalidContentBlocks, format!("content block {i}: {msg}"))
            })?;
        }

        Ok(blocks)
    }

    fn validate(&self) -> Result<(), &'static str> {
        match self {
            ContentBlock::Heading { text, level } => {
                if text.trim().is_empty() {
                    return Err("heading text is required");
                }
                if !(1..=6).contains(level) {
                    return Err("heading level must be between 1 and 6");
                }
            }
            ContentBlock::Paragraph { text } if text.trim().is_empty() => {
                return Err("paragraph text is required");
            }
            ContentBlock::Media { url, .. } if url.trim().is_empty() => {
                return Err("media url is required");
            }
            _ => {}
        }
        Ok(())
    }
}

// --- Email OTPs ---

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = email_otps)]
pub struct EmailOtp {
    pub email: String,
    pub otp_hash: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

/// Insert row for an OTP send; also the changeset of the upsert so a resend
/// replaces the code and resets the attempt counter.
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = email_otps)]
pub struct NewEmailOtp {
    pub email: String,
    pub otp_hash: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

// --- Refresh Tokens ---

#[derive(Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name = refresh_tokens)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blog(images: Vec<&str>, blocks: Option<serde_json::Value>) -> Blog {
        Blog {
            id: Uuid::new_v4(),
            title: "t".into(),
            slug: "t".into(),
            description: None,
            status: "published".into(),
            images: images.into_iter().map(String::from).collect(),
            videos: vec![],
            audios: vec!["https://cdn/a.mp3".into()],
            content_blocks: blocks,
            author_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn parses_tagged_blocks() {
        let raw = r#"[
            {"type":"heading","text":"Intro"},
            {"type":"paragraph","text":"Hello"},
            {"type":"media","url":"https://cdn/x.jpg","media_type":"image","caption":"x"}
        ]"#;
        let blocks = ContentBlock::parse_list(raw).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], ContentBlock::Heading { text: "Intro".into(), level: 2 });
    }

    #[test]
    fn rejects_bad_blocks() {
        assert!(ContentBlock::parse_list("not json").is_err());
        assert!(ContentBlock::parse_list(r#"{"type":"paragraph","text":"x"}"#).is_err());
        assert!(ContentBlock::parse_list(r#"[{"type":"quote","text":"x"}]"#).is_err());
        assert!(ContentBlock::parse_list(r#"[{"type":"heading","text":"x","level":9}]"#).is_err());
        assert!(ContentBlock::parse_list(r#"[{"type":"paragraph","text":"  "}]"#).is_err());

        let err = ContentBlock::parse_list(r#"[{"type":"media","url":"","media_type":"video"}]"#)
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn status_parsing() {
        assert_eq!("draft".parse::<BlogStatus>().unwrap(), BlogStatus::Draft);
        assert_eq!(" published ".parse::<BlogStatus>().unwrap(), BlogStatus::Published);
        assert!("archived".parse::<BlogStatus>().is_err());
    }

    #[test]
    fn media_urls_cover_arrays_and_blocks() {
        let b = blog(
            vec!["https://cdn/1.jpg"],
            Some(json!([
                {"type":"media","url":"https://cdn/2.mp4","media_type":"video"},
                {"type":"media","url":"https://cdn/1.jpg","media_type":"image"},
                {"type":"paragraph","text":"p"}
            ])),
        );
        assert_eq!(
            b.media_urls(),
            vec!["https://cdn/1.jpg", "https://cdn/2.mp4", "https://cdn/a.mp3"]
        );
    }

    #[test]
    fn public_view_hides_author_contact() {
        let b = blog(vec![], None);
        let author = AuthorSummary {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            role: "writer".into(),
        };
        let value = serde_json::to_value(PublicBlog::from_row(b, Some(author))).unwrap();
        assert_eq!(value["author"]["name"], "Ada");
        assert!(value["author"].get("email").is_none());
        assert!(value.get("author_id").is_none());
    }
}
