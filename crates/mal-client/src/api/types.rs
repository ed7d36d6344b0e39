//! MyAnimeList v2 response types.
//!
//! Only the fields this client reasons about are typed. Any other key a
//! response carries (whatever `fields` asked for) is kept verbatim in the
//! flattened `extra` map, so nothing is lost when results are re-serialized.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Relation type whose edges point at cast links, not related titles.
pub const CHARACTER_RELATION: &str = "character";

/// Paginated list wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
}

/// Pagination links, passed through untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Cover image URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Picture {
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
}

/// One anime as returned by search, list, suggestion or details requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeEntry {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_picture: Option<Picture>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_anime: Vec<RelatedAnime>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnimeEntry {
    /// An entry known only by id, e.g. the starting point of a related walk.
    pub fn from_id(id: u64) -> Self {
        Self {
            id,
            title: String::new(),
            main_picture: None,
            related_anime: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// An edge of the related-anime graph: the target node and how it relates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedAnime {
    pub node: AnimeEntry,
    #[serde(default)]
    pub relation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_type_formatted: Option<String>,
}

impl RelatedAnime {
    /// Wrap an entry with no relation, as for the root of a traversal.
    pub fn root(node: AnimeEntry) -> Self {
        Self {
            node,
            relation_type: None,
            relation_type_formatted: None,
        }
    }

    pub fn is_character_relation(&self) -> bool {
        self.relation_type.as_deref() == Some(CHARACTER_RELATION)
    }
}

/// The user's list state for one anime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListStatusInfo {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub num_episodes_watched: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One item of a `data` array.
///
/// The API wraps each anime in a `node` key (list entries also carry
/// `list_status` beside it); a bare anime object is accepted as well.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "PageEntryRepr")]
pub struct PageEntry {
    pub node: AnimeEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_status: Option<ListStatusInfo>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageEntryRepr {
    Wrapped {
        node: AnimeEntry,
        #[serde(default)]
        list_status: Option<ListStatusInfo>,
    },
    Bare(AnimeEntry),
}

impl From<PageEntryRepr> for PageEntry {
    fn from(repr: PageEntryRepr) -> Self {
        match repr {
            PageEntryRepr::Wrapped { node, list_status } => Self { node, list_status },
            PageEntryRepr::Bare(node) => Self {
                node,
                list_status: None,
            },
        }
    }
}

impl Page<PageEntry> {
    /// Drop the wrappers and keep the anime entries.
    pub fn into_entries(self) -> Vec<AnimeEntry> {
        self.data.into_iter().map(|entry| entry.node).collect()
    }
}
