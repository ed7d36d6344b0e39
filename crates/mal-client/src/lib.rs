//! MyAnimeList API client.
//!
//! - [`auth`]: browser-driven OAuth2 login, token persistence and refresh
//! - [`api`]: search, details, user list and suggestion requests
//! - [`related`]: walk of the related-anime graph

pub mod api;
pub mod auth;
pub mod error;
pub mod related;

pub use api::{AnimeEntry, ClientSettings, Fields, MalClient, Page, PageEntry, RelatedAnime};
pub use auth::{Authenticator, AuthorizeSettings, ChromeLauncher, CredentialOverrides, TokenEndpoint, TokenPair};
pub use error::{Error, Result};
