//! Mealie REST API client.
//!
//! ## Endpoints used
//!
//! - `POST /api/auth/token` - login (form encoded)
//! - `GET /api/users/self`, `GET /api/users/self/favorites`
//! - `POST|DELETE /api/users/{id}/favorites/{slug}`
//! - `GET /api/recipes` (paginated), `GET|PUT /api/recipes/{slug}`
//! - `POST /api/recipes`, `POST /api/recipes/create/url`

mod client;
mod error;
pub mod types;

pub use client::{normalize_server_url, ClientOptions, MealieClient, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT};
pub use error::ApiError;
pub use types::RecipeUpdate;
