use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::models::{push_history, unique_sources, Article, Bookmark, NewUser, User};
use crate::news::{Category, NewsError, NewsFetcher, NewsPage};
use crate::session::{SessionUser, Sessions};
use crate::store::{StoreError, UserStore};

pub struct AppState {
    pub news: NewsFetcher,
    pub store: UserStore,
    pub sessions: Sessions,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/news", get(news))
        .route("/me", get(profile))
        .route(
            "/me/bookmarks",
            get(bookmarks).post(add_bookmark).delete(remove_bookmark),
        )
        .route("/me/history", get(history).post(add_history))
        .route("/me/password", put(change_password))
        .route("/me/stats", get(stats))
        .route("/health", get(health))
        .with_state(state)
}

// Error type returned to clients as a JSON body with a matching status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("not signed in")]
    Unauthorized,
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    News(#[from] NewsError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::EmailTaken => StatusCode::CONFLICT,
            ApiError::News(NewsError::MissingApiKey) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::News(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(%status, error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// The logged-in identity, extracted from the `Authorization: Bearer`
/// token of protected routes.
pub struct Identity {
    pub user: SessionUser,
    token: Uuid,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or(ApiError::Unauthorized)?;

        let user = state
            .sessions
            .get(token)
            .await
            .ok_or(ApiError::Unauthorized)?;

        Ok(Identity { user, token })
    }
}

// Auth handlers

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: Uuid,
    pub user: SessionUser,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let name = request.name.trim().to_string();
    let email = request.email.trim().to_lowercase();

    if name.is_empty() || email.is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest(
            "name, email and password are required".to_string(),
        ));
    }

    if state.store.find_by_email(&email).await?.is_some() {
        return Err(ApiError::EmailTaken);
    }

    let created = state
        .store
        .create(&NewUser {
            name,
            email,
            password: request.password,
            history: Vec::new(),
            bookmarks: Vec::new(),
        })
        .await?;

    let user = SessionUser::from(&created);
    let token = state.sessions.create(user.clone()).await;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let account = state
        .store
        .find_by_email(&request.email)
        .await?
        .filter(|user| user.password == request.password)
        .ok_or(ApiError::InvalidCredentials)?;

    let user = SessionUser::from(&account);
    let token = state.sessions.create(user.clone()).await;

    Ok(Json(AuthResponse { token, user }))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<StatusCode, ApiError> {
    state.sessions.revoke(identity.token).await;
    Ok(StatusCode::NO_CONTENT)
}

// News feed

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

pub async fn news(
    State(state): State<Arc<AppState>>,
    _identity: Identity,
    Query(query): Query<NewsQuery>,
) -> Result<Json<NewsPage>, ApiError> {
    let category = match query.category.as_deref() {
        None | Some("") => Category::General,
        Some(raw) => Category::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown category: {}", raw)))?,
    };

    let page = state.news.fetch(category, query.page.as_deref()).await?;
    Ok(Json(page))
}

// Profile

pub async fn profile(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<User>, ApiError> {
    let user = state.store.get(&identity.user.user_id).await?;
    Ok(Json(user))
}

#[derive(Debug, Serialize)]
pub struct ProfileStats {
    pub bookmark_count: usize,
    pub history_count: usize,
    pub total_activity: usize,
    pub reading_streak_days: usize,
    pub unique_sources: Vec<String>,
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<ProfileStats>, ApiError> {
    let user = state.store.get(&identity.user.user_id).await?;

    let bookmark_count = user.bookmarks.len();
    let history_count = user.history.len();

    Ok(Json(ProfileStats {
        bookmark_count,
        history_count,
        total_activity: bookmark_count + history_count,
        reading_streak_days: (history_count / 3).min(30),
        unique_sources: unique_sources(&user.bookmarks),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    #[serde(rename = "new")]
    pub new_password: String,
    #[serde(rename = "confirm")]
    pub confirm_password: String,
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(request): Json<PasswordRequest>,
) -> Result<StatusCode, ApiError> {
    if request.new_password != request.confirm_password {
        return Err(ApiError::BadRequest("passwords don't match".to_string()));
    }
    if request.new_password.len() < 6 {
        return Err(ApiError::BadRequest(
            "password must be at least 6 characters".to_string(),
        ));
    }

    state
        .store
        .update_password(&identity.user.user_id, &request.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// Bookmarks

pub async fn bookmarks(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<Bookmark>>, ApiError> {
    let user = state.store.get(&identity.user.user_id).await?;
    Ok(Json(user.bookmarks))
}

pub async fn add_bookmark(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(article): Json<Article>,
) -> Result<Json<Vec<Bookmark>>, ApiError> {
    if article.url.trim().is_empty() && article.title.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "bookmark needs a url or a title".to_string(),
        ));
    }

    let user = state.store.get(&identity.user.user_id).await?;

    // Membership is keyed by url, or title against legacy entries; adding
    // an existing bookmark is a no-op.
    if user
        .bookmarks
        .iter()
        .any(|bookmark| bookmark.matches_article(&article))
    {
        return Ok(Json(user.bookmarks));
    }

    let mut bookmarks = user.bookmarks;
    bookmarks.push(Bookmark::Saved(article));

    let updated = state.store.update_bookmarks(&user.id, &bookmarks).await?;
    Ok(Json(updated.bookmarks))
}

#[derive(Debug, Deserialize)]
pub struct RemoveBookmarkRequest {
    pub key: String,
}

pub async fn remove_bookmark(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(request): Json<RemoveBookmarkRequest>,
) -> Result<Json<Vec<Bookmark>>, ApiError> {
    let user = state.store.get(&identity.user.user_id).await?;

    let before = user.bookmarks.len();
    let bookmarks: Vec<Bookmark> = user
        .bookmarks
        .into_iter()
        .filter(|bookmark| !bookmark.matches_key(&request.key))
        .collect();

    if bookmarks.len() == before {
        return Ok(Json(bookmarks));
    }

    let updated = state.store.update_bookmarks(&user.id, &bookmarks).await?;
    Ok(Json(updated.bookmarks))
}

// Reading history

pub async fn history(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<String>>, ApiError> {
    let user = state.store.get(&identity.user.user_id).await?;
    Ok(Json(user.history))
}

#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    pub entry: String,
}

pub async fn add_history(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(request): Json<HistoryRequest>,
) -> Result<Json<Vec<String>>, ApiError> {
    let entry = request.entry.trim();
    if entry.is_empty() {
        return Err(ApiError::BadRequest(
            "history entry must not be empty".to_string(),
        ));
    }

    let mut user = state.store.get(&identity.user.user_id).await?;

    // A duplicate at the tail is dropped rather than written back.
    if !push_history(&mut user.history, entry) {
        return Ok(Json(user.history));
    }

    let updated = state.store.update_history(&user.id, &user.history).await?;
    Ok(Json(updated.history))
}

pub async fn health() -> impl IntoResponse {
    "OK"
}
