use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;

use crate::models::{Bookmark, NewUser, User, UserId};

/// Client for the external user resource store: a generic CRUD API that
/// owns every user record this service reads or writes.
pub struct UserStore {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user record not found")]
    NotFound,
    #[error("user store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("user store returned HTTP {0}")]
    Status(StatusCode),
}

impl UserStore {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Newsdeck/0.1")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn users_url(&self) -> String {
        format!("{}/users", self.base_url)
    }

    fn user_url(&self, id: &UserId) -> String {
        format!("{}/users/{}", self.base_url, id)
    }

    /// Look a user up by email. The store's query match is exact, so the
    /// final comparison is repeated here case-insensitively.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.trim().to_lowercase();
        let response = self
            .client
            .get(self.users_url())
            .query(&[("email", email.as_str())])
            .send()
            .await?;

        let users: Vec<User> = checked(response)?.json().await?;
        Ok(users
            .into_iter()
            .find(|user| user.email.eq_ignore_ascii_case(&email)))
    }

    pub async fn get(&self, id: &UserId) -> Result<User, StoreError> {
        let response = self.client.get(self.user_url(id)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound);
        }
        Ok(checked(response)?.json().await?)
    }

    pub async fn create(&self, user: &NewUser) -> Result<User, StoreError> {
        let response = self.client.post(self.users_url()).json(user).send().await?;
        Ok(checked(response)?.json().await?)
    }

    pub async fn update_bookmarks(
        &self,
        id: &UserId,
        bookmarks: &[Bookmark],
    ) -> Result<User, StoreError> {
        self.patch(id, json!({ "bookmarks": bookmarks })).await
    }

    pub async fn update_history(&self, id: &UserId, history: &[String]) -> Result<User, StoreError> {
        self.patch(id, json!({ "history": history })).await
    }

    pub async fn update_password(&self, id: &UserId, password: &str) -> Result<User, StoreError> {
        self.patch(id, json!({ "password": password })).await
    }

    /// Partial update; the store merges the given fields into the record
    /// and returns the updated user.
    async fn patch(&self, id: &UserId, body: serde_json::Value) -> Result<User, StoreError> {
        let response = self
            .client
            .patch(self.user_url(id))
            .json(&body)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound);
        }
        Ok(checked(response)?.json().await?)
    }
}

fn checked(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(StoreError::Status(status))
    }
}
