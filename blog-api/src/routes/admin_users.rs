use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use blog_shared::clients::db;
use blog_shared::errors::{AppError, AppResult, ErrorCode};
use blog_shared::middleware::AdminUser;
use blog_shared::types::{ApiResponse, NoData};
use blog_shared::UserRole;

use super::auth::require_email;
use super::{parse_id, validation_error};
use crate::middleware::JsonBody;
use crate::models::{NewProfile, Profile, ProfileChanges};
use crate::schema::profiles;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default)]
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[serde(default)]
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserBody {
    pub user: Profile,
}

#[derive(Debug, Serialize)]
pub struct UsersBody {
    pub users: Vec<Profile>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl CreateUserRequest {
    fn into_new_profile(self) -> AppResult<NewProfile> {
        self.validate().map_err(validation_error)?;
        let (name, email, role) = match (non_blank(self.name), self.email, non_blank(self.role)) {
            (Some(name), Some(email), Some(role)) if !email.trim().is_empty() => (name, email, role),
            _ => {
                return Err(AppError::new(
                    ErrorCode::ValidationError,
                    "Name, email and role are required",
                ));
            }
        };

        let role: UserRole = role
            .parse()
            .map_err(|_| AppError::new(ErrorCode::InvalidRole, "Role must be editor, writer or admin"))?;

        Ok(NewProfile {
            name,
            email: require_email(Some(email))?,
            role: role.as_str().to_string(),
        })
    }
}

impl UpdateUserRequest {
    fn into_changes(self) -> AppResult<ProfileChanges> {
        self.validate().map_err(validation_error)?;
        let name = non_blank(self.name);
        let role = non_blank(self.role);
        if name.is_none() && role.is_none() {
            return Err(AppError::new(ErrorCode::ValidationError, "Nothing to update"));
        }

        // promotion to admin is not possible through an update
        let role = match role.map(|r| r.parse::<UserRole>()) {
            None => None,
            Some(Ok(r @ (UserRole::Editor | UserRole::Writer))) => Some(r.as_str().to_string()),
            Some(_) => return Err(AppError::new(ErrorCode::InvalidRole, "Invalid role")),
        };

        Ok(ProfileChanges {
            name,
            role,
            updated_at: Utc::now(),
        })
    }
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserBody>>)> {
    let new_profile = req.into_new_profile()?;

    let profile = db::run(&state.db, move |conn| {
        diesel::insert_into(profiles::table)
            .values(&new_profile)
            .returning(Profile::as_returning())
            .get_result(conn)
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    AppError::new(ErrorCode::EmailAlreadyExists, "User already exists")
                }
                other => other.into(),
            })
    })
    .await?;

    tracing::info!(admin_id = %admin.id, user_id = %profile.id, role = %profile.role, "staff profile created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(UserBody { user: profile }, "User created successfully")),
    ))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<Json<ApiResponse<UsersBody>>> {
    let users = db::run(&state.db, |conn| {
        Ok(profiles::table
            .filter(profiles::role.eq_any(UserRole::LOGIN_ALLOWED.map(|r| r.as_str())))
            .order(profiles::created_at.desc())
            .select(Profile::as_select())
            .load(conn)?)
    })
    .await?;

    Ok(Json(ApiResponse::ok(UsersBody { users })))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<UserBody>>> {
    let id = parse_id(&id)?;
    let changes = req.into_changes()?;

    let profile = db::run(&state.db, move |conn| {
        diesel::update(profiles::table.find(id))
            .set(&changes)
            .returning(Profile::as_returning())
            .get_result(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "User not found"))
    })
    .await?;

    tracing::info!(admin_id = %admin.id, user_id = %profile.id, role = %profile.role, "staff profile updated");

    Ok(Json(ApiResponse::ok(UserBody { user: profile })))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<NoData>>> {
    let id = parse_id(&id)?;
    if id == admin.id {
        return Err(AppError::new(
            ErrorCode::CannotDeleteSelf,
            "Admins cannot delete their own account",
        ));
    }

    let deleted = db::run(&state.db, move |conn| {
        Ok(diesel::delete(profiles::table.find(id)).execute(conn)?)
    })
    .await?;

    if deleted == 0 {
        return Err(AppError::new(ErrorCode::ProfileNotFound, "User not found"));
    }

    tracing::info!(admin_id = %admin.id, user_id = %id, "staff profile deleted");

    Ok(Json(ApiResponse::message("User deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use serde_json::json;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn create(name: Option<&str>, email: Option<&str>, role: Option<&str>) -> CreateUserRequest {
        CreateUserRequest {
            name: name.map(String::from),
            email: email.map(String::from),
            role: role.map(String::from),
        }
    }

    #[test]
    fn create_requires_all_fields() {
        assert!(create(None, Some("a@example.com"), Some("writer")).into_new_profile().is_err());
        assert!(create(Some("Ada"), None, Some("writer")).into_new_profile().is_err());
        assert!(create(Some("Ada"), Some("a@example.com"), Some(" ")).into_new_profile().is_err());
    }

    #[test]
    fn create_checks_role_and_email() {
        let err = create(Some("Ada"), Some("a@example.com"), Some("owner")).into_new_profile().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(create(Some("Ada"), Some("nope"), Some("writer")).into_new_profile().is_err());

        let p = create(Some(" Ada "), Some("Ada@Example.com"), Some("Admin")).into_new_profile().unwrap();
        assert_eq!(p.name, "Ada");
        assert_eq!(p.email, "ada@example.com");
        assert_eq!(p.role, "admin");
    }

    #[test]
    fn update_rules() {
        let empty = UpdateUserRequest { name: None, role: Some("".into()) };
        assert_eq!(empty.into_changes().unwrap_err().to_string(), "Nothing to update");

        let to_admin = UpdateUserRequest { name: None, role: Some("admin".into()) };
        assert_eq!(to_admin.into_changes().unwrap_err().to_string(), "Invalid role");

        let ok = UpdateUserRequest { name: Some("New".into()), role: Some("editor".into()) }
            .into_changes()
            .unwrap();
        assert_eq!(ok.name.as_deref(), Some("New"));
        assert_eq!(ok.role.as_deref(), Some("editor"));
    }

    #[test]
    fn overlong_fields_are_rejected_before_insert() {
        let long = "n".repeat(256);
        let err = create(Some(long.as_str()), Some("a@example.com"), Some("writer"))
            .into_new_profile()
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Name must be at most 255 characters");

        let email = format!("a@{}.{}.{}.{}.com", "b".repeat(63), "c".repeat(63), "d".repeat(63), "e".repeat(63));
        let err = create(Some("Ada"), Some(email.as_str()), Some("writer")).into_new_profile().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let update = UpdateUserRequest { name: Some(long), role: None };
        assert_eq!(update.into_changes().unwrap_err().to_string(), "Name must be at most 255 characters");

        let name = "n".repeat(255);
        let exact = create(Some(name.as_str()), Some("a@example.com"), Some("writer"));
        assert!(exact.into_new_profile().is_ok());
    }

    #[test]
    fn user_payloads_are_top_level() {
        let now = chrono::Utc::now();
        let profile = Profile {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            role: "writer".into(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(ApiResponse::ok(UsersBody { users: vec![profile.clone()] })).unwrap();
        assert_eq!(json["users"][0]["email"], "ada@example.com");

        let json = serde_json::to_value(ApiResponse::ok_with_message(UserBody { user: profile }, "ok")).unwrap();
        assert_eq!(json["user"]["name"], "Ada");
        assert_eq!(json["message"], "ok");
    }

    #[tokio::test]
    async fn admin_cannot_delete_self() {
        let id = Uuid::new_v4();
        let token = crate::services::token_service::create_access_token(
            id,
            UserRole::Admin,
            JWT_SECRET,
            300,
        )
        .unwrap();
        let response = app()
            .oneshot(request("DELETE", &format!("/api/admin/users/{id}"), Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_validation_runs_for_admins() {
        let response = app()
            .oneshot(request(
                "POST",
                "/api/admin/users",
                Some(&token(UserRole::Admin)),
                Some(json!({ "name": "Ada", "email": "ada@example.com", "role": "owner" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_id_is_rejected() {
        let response = app()
            .oneshot(request(
                "PUT",
                "/api/admin/users/not-a-uuid",
                Some(&token(UserRole::Admin)),
                Some(json!({ "name": "x" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
