//! Related-anime graph walk.
//!
//! The graph is implied by the `related_anime` field of each details
//! response. The walk is depth-first over an explicit stack and expands every
//! reachable id exactly once. Character edges point at cast links rather than
//! titles and are never followed.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::api::query::Fields;
use crate::api::types::{AnimeEntry, RelatedAnime};
use crate::api::MalClient;
use crate::error::Result;

const RELATED_FIELD: &str = "related_anime";

impl MalClient {
    /// Collect every anime reachable from `root` through related edges.
    ///
    /// The root itself is part of the result with no relation type. `fields`
    /// always gains `related_anime`, since the walk cannot proceed without it.
    pub async fn get_all_related_anime(
        &self,
        root: &AnimeEntry,
        fields: Option<&Fields>,
    ) -> Result<Vec<RelatedAnime>> {
        let fields = match fields {
            Some(fields) => fields.with(RELATED_FIELD),
            None => Fields::from(RELATED_FIELD),
        };

        let mut open = vec![RelatedAnime::root(root.clone())];
        let mut closed: HashSet<u64> = HashSet::new();
        let mut related = Vec::new();

        while let Some(edge) = open.pop() {
            let id = edge.node.id;
            if closed.contains(&id) || edge.is_character_relation() {
                continue;
            }

            debug!(anime_id = id, relation = ?edge.relation_type, "Expanding related anime");
            let details = self.get_anime_details(id, Some(&fields), 1, 0).await?;
            closed.insert(id);
            open.extend(details.related_anime.iter().cloned());

            related.push(RelatedAnime {
                node: details,
                relation_type: edge.relation_type,
                relation_type_formatted: edge.relation_type_formatted,
            });
        }

        info!(root_id = root.id, count = related.len(), "Related anime collected");
        Ok(related)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClientSettings;
    use crate::auth::{Authenticator, TokenEndpoint, TokenPair};
    use serde_json::json;
    use std::collections::BTreeSet;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> MalClient {
        let auth = Authenticator::from_tokens(
            TokenPair {
                access_token: "at".to_string(),
                refresh_token: "rt".to_string(),
            },
            TokenEndpoint::new(reqwest::Client::new(), "http://127.0.0.1:1/token"),
        );
        let settings = ClientSettings {
            base_url: base_url.to_string(),
            user_agent: "mal-client-test".to_string(),
            timeout: None,
            strict_fields: false,
        };
        MalClient::new(&settings, auth).unwrap()
    }

    fn root() -> AnimeEntry {
        AnimeEntry::from_id(1)
    }

    /// 1 -> {2: sequel, 3: character}, 2 -> {1: prequel}
    async fn mount_graph(server: &MockServer, expected_hits: u64) {
        Mock::given(method("GET"))
            .and(path("/anime/1"))
            .and(query_param("fields", "related_anime"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1,
                "title": "Root",
                "related_anime": [
                    {"node": {"id": 2, "title": "Sequel"}, "relation_type": "sequel"},
                    {"node": {"id": 3, "title": "Cast"}, "relation_type": "character"}
                ]
            })))
            .expect(expected_hits)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/anime/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 2,
                "title": "Sequel",
                "related_anime": [
                    {"node": {"id": 1, "title": "Root"}, "relation_type": "prequel"}
                ]
            })))
            .expect(expected_hits)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/anime/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3})))
            .expect(0)
            .mount(server)
            .await;
    }

    fn ids(related: &[RelatedAnime]) -> BTreeSet<u64> {
        related.iter().map(|r| r.node.id).collect()
    }

    #[tokio::test]
    async fn walk_skips_character_edges_and_revisits() {
        let server = MockServer::start().await;
        mount_graph(&server, 1).await;

        let related = client(&server.uri())
            .get_all_related_anime(&root(), None)
            .await
            .unwrap();

        assert_eq!(related.len(), 2);
        assert_eq!(ids(&related), BTreeSet::from([1, 2]));
        let sequel = related.iter().find(|r| r.node.id == 2).unwrap();
        assert_eq!(sequel.relation_type.as_deref(), Some("sequel"));
        let root = related.iter().find(|r| r.node.id == 1).unwrap();
        assert_eq!(root.relation_type, None);
        // An id-only root is filled in by its single details fetch
        assert_eq!(root.node.title, "Root");
    }

    #[tokio::test]
    async fn repeated_walks_agree() {
        let server = MockServer::start().await;
        mount_graph(&server, 2).await;

        let client = client(&server.uri());
        let first = client.get_all_related_anime(&root(), None).await.unwrap();
        let second = client.get_all_related_anime(&root(), None).await.unwrap();
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(first.len(), second.len());
    }

    #[tokio::test]
    async fn requested_fields_gain_related_anime() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/anime/1"))
            .and(query_param("fields", "title,mean,related_anime"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1,
                "title": "Root",
                "mean": 7.1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fields = Fields::from("title,mean");
        let related = client(&server.uri())
            .get_all_related_anime(&root(), Some(&fields))
            .await
            .unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].node.extra["mean"], json!(7.1));
    }
}
