//! HTTP client for a Mealie server.
//!
//! Thin typed wrapper over the REST endpoints the sync engine and CLI use.
//! All calls except login carry the bearer token.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::types::{
    CreateRecipe, LoginForm, Paginated, RatingsResponse, RecipeOutput, RecipeSummaryOutput,
    RecipeUpdate, ScrapeRecipe, TokenResponse, UserOut,
};
use crate::models::{FavoriteRating, Recipe, RecipeSummary, User};
use crate::sync::{FavoritesSource, RemoteCatalog};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default page size when walking the recipe catalog.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Tunables for [`MealieClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub page_size: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MealieClient {
    server_url: String,
    token: Option<String>,
    page_size: u32,
    http: reqwest::Client,
}

impl MealieClient {
    /// Creates a client for `server_url` with default options.
    pub fn new(server_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        Self::with_options(server_url, token, ClientOptions::default())
    }

    pub fn with_options(
        server_url: &str,
        token: Option<String>,
        options: ClientOptions,
    ) -> Result<Self, ApiError> {
        let server_url = normalize_server_url(server_url)?;
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;

        Ok(Self {
            server_url,
            token,
            page_size: options.page_size.max(1),
            http,
        })
    }

    /// Returns the normalized server URL (no trailing slash).
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Exchanges credentials for an access token and keeps it on the client.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<String, ApiError> {
        let form = LoginForm {
            username,
            password,
            remember_me: true,
        };
        let response = self
            .http
            .post(self.url("/api/auth/token"))
            .form(&form)
            .send()
            .await?;
        let body: TokenResponse = decode(check(response).await?).await?;

        let token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Decode("No access_token in response".to_string()))?;
        self.token = Some(token.clone());
        Ok(token)
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        let user: UserOut = self.get_json("/api/users/self").await?;
        Ok(user.into())
    }

    pub async fn favorites(&self) -> Result<Vec<FavoriteRating>, ApiError> {
        let response: RatingsResponse = self.get_json("/api/users/self/favorites").await?;
        Ok(response.ratings.into_iter().map(Into::into).collect())
    }

    pub async fn add_favorite(&self, slug: &str) -> Result<(), ApiError> {
        let user = self.current_user().await?;
        let path = format!(
            "/api/users/{}/favorites/{}",
            urlencoding::encode(&user.id),
            urlencoding::encode(slug)
        );
        let response = self.authorized(self.http.post(self.url(&path))).send().await?;
        check(response).await?;
        Ok(())
    }

    pub async fn remove_favorite(&self, slug: &str) -> Result<(), ApiError> {
        let user = self.current_user().await?;
        let path = format!(
            "/api/users/{}/favorites/{}",
            urlencoding::encode(&user.id),
            urlencoding::encode(slug)
        );
        let response = self
            .authorized(self.http.delete(self.url(&path)))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Fetches one page of the recipe catalog (pages are 1-based).
    pub async fn list_summaries_page(
        &self,
        page: u32,
    ) -> Result<Paginated<RecipeSummaryOutput>, ApiError> {
        let response = self
            .authorized(self.http.get(self.url("/api/recipes")))
            .query(&[("page", page), ("perPage", self.page_size)])
            .send()
            .await?;
        decode(check(response).await?).await
    }

    /// Fetches the full recipe for `slug`.
    pub async fn recipe(&self, slug: &str) -> Result<Recipe, ApiError> {
        let path = format!("/api/recipes/{}", urlencoding::encode(slug));
        let out: RecipeOutput = self.get_json(&path).await?;
        Ok(out.into())
    }

    /// Creates an empty recipe and returns its slug.
    pub async fn create_recipe(&self, name: &str) -> Result<String, ApiError> {
        let response = self
            .authorized(self.http.post(self.url("/api/recipes")))
            .json(&CreateRecipe { name })
            .send()
            .await?;
        decode(check(response).await?).await
    }

    /// Asks the server to scrape `url` into a new recipe; returns its slug.
    pub async fn create_recipe_from_url(&self, url: &str) -> Result<String, ApiError> {
        let response = self
            .authorized(self.http.post(self.url("/api/recipes/create/url")))
            .json(&ScrapeRecipe {
                url,
                include_tags: false,
            })
            .send()
            .await?;
        decode(check(response).await?).await
    }

    pub async fn update_recipe(&self, slug: &str, update: &RecipeUpdate) -> Result<(), ApiError> {
        let path = format!("/api/recipes/{}", urlencoding::encode(slug));
        let response = self
            .authorized(self.http.put(self.url(&path)))
            .json(update)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .authorized(self.http.get(self.url(path)))
            .send()
            .await?;
        decode(check(response).await?).await
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }
}

#[async_trait]
impl RemoteCatalog for MealieClient {
    async fn list_summaries(&self) -> Result<Vec<RecipeSummary>, ApiError> {
        let items = collect_pages(|page| self.list_summaries_page(page)).await?;
        Ok(items.into_iter().map(RecipeSummary::from).collect())
    }

    async fn fetch_detail(&self, slug: &str) -> Result<Recipe, ApiError> {
        self.recipe(slug).await
    }
}

#[async_trait]
impl FavoritesSource for MealieClient {
    async fn favorites(&self) -> Result<Vec<FavoriteRating>, ApiError> {
        MealieClient::favorites(self).await
    }
}

/// Walks catalog pages from 1 until an empty page or the last reported page.
async fn collect_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, ApiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Paginated<T>, ApiError>>,
{
    let mut items = Vec::new();
    let mut page = 1;
    loop {
        let batch = fetch_page(page).await?;
        tracing::debug!(
            "Listed catalog page {}/{} ({} items)",
            batch.page,
            batch.total_pages,
            batch.items.len()
        );
        let done = batch.items.is_empty() || page >= batch.total_pages;
        items.extend(batch.items);
        if done {
            return Ok(items);
        }
        page += 1;
    }
}

/// Maps non-success statuses onto [`ApiError`].
async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let message = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
        StatusCode::NOT_FOUND => ApiError::NotFound(url),
        StatusCode::UNPROCESSABLE_ENTITY => ApiError::Validation(message),
        _ => ApiError::Status {
            status: status.as_u16(),
            message,
        },
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Validates the server URL and strips trailing slashes. Bare hosts get `https://`.
pub fn normalize_server_url(server_url: &str) -> Result<String, ApiError> {
    let trimmed = server_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ApiError::NotConfigured);
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    reqwest::Url::parse(&with_scheme).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", server_url, e)))?;
    Ok(with_scheme)
}
