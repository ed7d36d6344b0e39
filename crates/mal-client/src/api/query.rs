//! Query parameter assembly and validation.
//!
//! Everything here runs before a request is built, so an invalid status,
//! sort option or field never reaches the network.

use std::str::FromStr;

use crate::error::{Error, Result};

/// Anime list membership states accepted by `/users/{user}/animelist`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListStatus {
    Watching,
    Completed,
    OnHold,
    Dropped,
    PlanToWatch,
}

impl ListStatus {
    pub const ALL: [ListStatus; 5] = [
        ListStatus::Watching,
        ListStatus::Completed,
        ListStatus::OnHold,
        ListStatus::Dropped,
        ListStatus::PlanToWatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListStatus::Watching => "watching",
            ListStatus::Completed => "completed",
            ListStatus::OnHold => "on_hold",
            ListStatus::Dropped => "dropped",
            ListStatus::PlanToWatch => "plan_to_watch",
        }
    }

    /// Comma-separated list of accepted values, for error messages.
    pub fn valid_values() -> String {
        Self::ALL.map(|s| s.as_str()).join(", ")
    }
}

impl FromStr for ListStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidAnimeStatus(s.to_string()))
    }
}

impl std::fmt::Display for ListStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort keys accepted by the list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOption {
    ListScore,
    ListUpdatedAt,
    AnimeTitle,
    AnimeStartDate,
}

impl SortOption {
    pub const ALL: [SortOption; 4] = [
        SortOption::ListScore,
        SortOption::ListUpdatedAt,
        SortOption::AnimeTitle,
        SortOption::AnimeStartDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::ListScore => "list_score",
            SortOption::ListUpdatedAt => "list_updated_at",
            SortOption::AnimeTitle => "anime_title",
            SortOption::AnimeStartDate => "anime_start_date",
        }
    }

    /// Comma-separated list of accepted values, for error messages.
    pub fn valid_values() -> String {
        Self::ALL.map(|s| s.as_str()).join(", ")
    }
}

impl FromStr for SortOption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s)
            .ok_or_else(|| Error::InvalidSortOption(s.to_string()))
    }
}

impl std::fmt::Display for SortOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field names the v2 API understands in `fields`.
pub const QUERY_FIELDS: &[&str] = &[
    "id",
    "title",
    "main_picture",
    "alternative_titles",
    "start_date",
    "end_date",
    "synopsis",
    "mean",
    "rank",
    "popularity",
    "num_list_users",
    "num_scoring_users",
    "nsfw",
    "created_at",
    "updated_at",
    "media_type",
    "status",
    "genres",
    "my_list_status",
    "list_status",
    "num_episodes",
    "start_season",
    "broadcast",
    "source",
    "average_episode_duration",
    "rating",
    "pictures",
    "background",
    "related_anime",
    "related_manga",
    "recommendations",
    "studios",
    "statistics",
];

/// The `fields` parameter: one raw string or a sequence joined with commas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fields {
    One(String),
    Many(Vec<String>),
}

impl Fields {
    /// Value sent on the wire.
    pub fn to_param(&self) -> String {
        match self {
            Fields::One(field) => field.clone(),
            Fields::Many(fields) => fields
                .iter()
                .filter(|field| !field.trim().is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Whether `name` is requested, looking at top-level names only.
    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|field| field == name)
    }

    /// Return a copy that also requests `name`.
    pub fn with(&self, name: &str) -> Fields {
        if self.contains(name) {
            return self.clone();
        }
        let mut fields: Vec<String> = match self {
            Fields::One(field) => vec![field.clone()],
            Fields::Many(fields) => fields.clone(),
        };
        fields.retain(|field| !field.trim().is_empty());
        fields.push(name.to_string());
        Fields::Many(fields)
    }

    /// Reject names outside [`QUERY_FIELDS`].
    ///
    /// Nested selectors such as `list_status{score}` are checked by their
    /// leading name.
    pub fn validate(&self) -> Result<()> {
        match self
            .names()
            .find(|name| !QUERY_FIELDS.iter().any(|known| known == name))
        {
            Some(unknown) => Err(Error::InvalidQueryField(unknown.to_string())),
            None => Ok(()),
        }
    }

    /// Top-level field names, ignoring `{...}` sub-selections.
    fn names(&self) -> impl Iterator<Item = &str> {
        let parts: Vec<&str> = match self {
            Fields::One(field) => split_top_level(field),
            Fields::Many(fields) => fields.iter().flat_map(|f| split_top_level(f)).collect(),
        };
        parts.into_iter().map(|part| {
            let part = part.trim();
            part.split('{').next().unwrap_or(part).trim()
        })
    }
}

/// Split on commas that are not inside braces.
fn split_top_level(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

impl From<&str> for Fields {
    fn from(value: &str) -> Self {
        Fields::One(value.to_string())
    }
}

impl From<String> for Fields {
    fn from(value: String) -> Self {
        Fields::One(value)
    }
}

impl From<Vec<String>> for Fields {
    fn from(values: Vec<String>) -> Self {
        Fields::Many(values)
    }
}

impl From<Vec<&str>> for Fields {
    fn from(values: Vec<&str>) -> Self {
        Fields::Many(values.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Fields {
    fn from(values: [&str; N]) -> Self {
        Fields::Many(values.into_iter().map(String::from).collect())
    }
}

/// Assembled query parameters for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    /// Validate the optional parts and assemble the parameter list.
    ///
    /// Starts from `limit` and `offset`; `sort`, `status` and `fields` are
    /// added only when given.
    pub fn build(
        limit: u32,
        offset: u32,
        fields: Option<&Fields>,
        status: Option<&str>,
        sort: Option<&str>,
        strict_fields: bool,
    ) -> Result<Self> {
        let status = status.map(ListStatus::from_str).transpose()?;
        let sort = sort.map(SortOption::from_str).transpose()?;
        if strict_fields {
            if let Some(fields) = fields {
                fields.validate()?;
            }
        }

        let mut pairs = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        if let Some(sort) = sort {
            pairs.push(("sort", sort.as_str().to_string()));
        }
        if let Some(status) = status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(fields) = fields {
            pairs.push(("fields", fields.to_param()));
        }
        Ok(Self { pairs })
    }

    /// Add the search term.
    pub fn with_query(mut self, q: &str) -> Self {
        self.pairs.push(("q", q.to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_every_known_value() {
        for status in ListStatus::ALL {
            assert_eq!(status.as_str().parse::<ListStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected_with_valid_set() {
        for bad in ["", "Watching", "on-hold", "finished", "plan to watch"] {
            let err = bad.parse::<ListStatus>().unwrap_err();
            assert!(matches!(err, Error::InvalidAnimeStatus(ref v) if v == bad));
            assert!(err.to_string().contains("plan_to_watch"));
        }
    }

    #[test]
    fn unknown_sort_is_rejected_with_valid_set() {
        for bad in ["score", "LIST_SCORE", "anime_end_date"] {
            let err = bad.parse::<SortOption>().unwrap_err();
            assert!(matches!(err, Error::InvalidSortOption(ref v) if v == bad));
            assert!(err.to_string().contains("anime_start_date"));
        }
    }

    #[test]
    fn fields_sequence_is_joined_with_commas() {
        assert_eq!(Fields::from(["a", "b", "c"]).to_param(), "a,b,c");
        assert_eq!(Fields::from("a").to_param(), "a");
        assert_eq!(Fields::from("a,b").to_param(), "a,b");
    }

    #[test]
    fn build_starts_from_limit_and_offset() {
        let params = QueryParams::build(10, 0, None, None, None, false).unwrap();
        assert_eq!(
            params.pairs(),
            &[("limit", "10".to_string()), ("offset", "0".to_string())]
        );
    }

    #[test]
    fn build_adds_optional_parts_in_order() {
        let fields = Fields::from(["list_status", "num_episodes"]);
        let params = QueryParams::build(
            5,
            20,
            Some(&fields),
            Some("completed"),
            Some("anime_title"),
            false,
        )
        .unwrap();
        assert_eq!(
            params.pairs(),
            &[
                ("limit", "5".to_string()),
                ("offset", "20".to_string()),
                ("sort", "anime_title".to_string()),
                ("status", "completed".to_string()),
                ("fields", "list_status,num_episodes".to_string()),
            ]
        );
    }

    #[test]
    fn build_rejects_invalid_status_and_sort() {
        assert!(matches!(
            QueryParams::build(10, 0, None, Some("binging"), None, false),
            Err(Error::InvalidAnimeStatus(_))
        ));
        assert!(matches!(
            QueryParams::build(10, 0, None, None, Some("random"), false),
            Err(Error::InvalidSortOption(_))
        ));
    }

    #[test]
    fn strict_fields_checks_top_level_names() {
        let nested = Fields::from("list_status{score,status},title");
        assert!(nested.validate().is_ok());
        assert!(QueryParams::build(1, 0, Some(&nested), None, None, true).is_ok());

        let unknown = Fields::from(["title", "power_level"]);
        assert!(matches!(
            QueryParams::build(1, 0, Some(&unknown), None, None, true),
            Err(Error::InvalidQueryField(ref f)) if f == "power_level"
        ));
        // Lenient mode passes anything through
        assert!(QueryParams::build(1, 0, Some(&unknown), None, None, false).is_ok());
    }

    #[test]
    fn with_adds_missing_field_once() {
        let fields = Fields::from("title");
        let extended = fields.with("related_anime");
        assert_eq!(extended.to_param(), "title,related_anime");
        assert_eq!(extended.with("related_anime"), extended);
        assert!(Fields::from("related_anime{relation_type}").contains("related_anime"));
    }

    #[test]
    fn blank_fields_leave_no_stray_commas() {
        assert_eq!(Fields::from("").with("related_anime").to_param(), "related_anime");
        assert_eq!(
            Fields::from(vec!["", "title", " "]).with("related_anime").to_param(),
            "title,related_anime"
        );
        assert_eq!(Fields::from(vec!["mean", ""]).to_param(), "mean");
    }

    #[test]
    fn with_query_appends_q() {
        let params = QueryParams::build(10, 0, None, None, None, false)
            .unwrap()
            .with_query("one piece");
        assert_eq!(params.get("q"), Some("one piece"));
    }
}
