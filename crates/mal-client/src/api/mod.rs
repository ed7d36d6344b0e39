//! MyAnimeList v2 resource API.

pub mod client;
pub mod query;
pub mod types;

pub use client::{ClientSettings, MalClient};
pub use query::{Fields, ListStatus, QueryParams, SortOption, QUERY_FIELDS};
pub use types::{AnimeEntry, ListStatusInfo, Page, PageEntry, Paging, Picture, RelatedAnime};
