use axum::{
    extract::{Query, State},
    Json,
};
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    config::Config,
    error::{AppError, Result},
    models::PinnedRepo,
};

const USER_AGENT: &str = "portfolio-api";

/// Path of the per-repository override file, resolved against the default
/// branch head.
const DESCRIPTION_EXPRESSION: &str = "HEAD:.portfolio-description";

const FALLBACK_DESCRIPTION: &str = "No description available";

// ---------------------------------------------------------------------------
// GraphQL wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct GraphQlData<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct PinnedQueryData {
    user: Option<UserNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserNode {
    pinned_items: PinnedItems,
}

#[derive(Deserialize)]
struct PinnedItems {
    nodes: Vec<RepoNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoNode {
    name: String,
    description: Option<String>,
    url: String,
    homepage_url: Option<String>,
    owner: OwnerNode,
    repository_topics: TopicConnection,
    languages: LanguageConnection,
}

#[derive(Deserialize)]
struct OwnerNode {
    login: String,
}

#[derive(Deserialize)]
struct TopicConnection {
    nodes: Vec<TopicNode>,
}

#[derive(Deserialize)]
struct TopicNode {
    topic: NamedNode,
}

#[derive(Deserialize)]
struct LanguageConnection {
    nodes: Vec<NamedNode>,
}

#[derive(Deserialize)]
struct NamedNode {
    name: String,
}

#[derive(Deserialize)]
struct OverrideQueryData {
    repository: Option<RepositoryNode>,
}

#[derive(Deserialize)]
struct RepositoryNode {
    object: Option<BlobNode>,
}

#[derive(Deserialize)]
struct BlobNode {
    text: Option<String>,
}

// ---------------------------------------------------------------------------
// GithubService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct GithubService {
    http: Client,
    token: Option<String>,
    graphql_url: String,
}

impl GithubService {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            token: config.github_token.clone(),
            graphql_url: config.github_graphql_url.clone(),
        }
    }

    /// Resolve a user's pinned repositories, merging in the per-repository
    /// description overrides.
    ///
    /// The pinned-items query failing fails the whole request; the override
    /// lookups run concurrently and each failure is isolated to its own
    /// repository.
    pub async fn pinned(&self, username: &str) -> Result<Vec<PinnedRepo>> {
        let token = self.token.clone().ok_or(AppError::GithubTokenMissing)?;

        let repos = self.fetch_pinned(username, &token).await?;

        let overrides = join_all(
            repos
                .iter()
                .map(|repo| self.override_description(&repo.owner.login, &repo.name, &token)),
        )
        .await;

        Ok(repos
            .into_iter()
            .zip(overrides)
            .map(|(repo, override_text)| {
                let RepoNode {
                    name,
                    description,
                    url,
                    homepage_url,
                    repository_topics,
                    languages,
                    ..
                } = repo;

                let description = override_text
                    .or_else(|| description.filter(|d| !d.is_empty()))
                    .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string());

                PinnedRepo {
                    name,
                    description,
                    html_url: url,
                    homepage: homepage_url,
                    topics: repository_topics
                        .nodes
                        .into_iter()
                        .map(|node| node.topic.name)
                        .collect(),
                    languages: languages.nodes.into_iter().map(|node| node.name).collect(),
                }
            })
            .collect())
    }

    async fn fetch_pinned(&self, username: &str, token: &str) -> Result<Vec<RepoNode>> {
        let query = format!(
            r#"query {{
              user(login: "{username}") {{
                pinnedItems(first: 6, types: REPOSITORY) {{
                  nodes {{
                    ... on Repository {{
                      name
                      description
                      url
                      homepageUrl
                      owner {{ login }}
                      repositoryTopics(first: 10) {{ nodes {{ topic {{ name }} }} }}
                      languages(first: 3, orderBy: {{field: SIZE, direction: DESC}}) {{ nodes {{ name }} }}
                    }}
                  }}
                }}
              }}
            }}"#
        );

        let response = self.graphql(&query, token).await?;

        if !response.status().is_success() {
            warn!(
                "GitHub API responded with status {} for pinned items",
                response.status()
            );
            return Err(AppError::PinnedFetchFailed);
        }

        let body: GraphQlData<PinnedQueryData> = response.json().await?;

        // A null user node means the username doesn't resolve; the contract
        // treats that the same as any other upstream failure.
        let user = body
            .data
            .and_then(|data| data.user)
            .ok_or(AppError::PinnedFetchFailed)?;

        Ok(user.pinned_items.nodes)
    }

    /// Best-effort lookup of the override file; any failure reads as
    /// "no override".
    async fn override_description(&self, owner: &str, repo: &str, token: &str) -> Option<String> {
        let query = format!(
            r#"query {{
              repository(owner: "{owner}", name: "{repo}") {{
                object(expression: "{DESCRIPTION_EXPRESSION}") {{
                  ... on Blob {{ text }}
                }}
              }}
            }}"#
        );

        let response = match self.graphql(&query, token).await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(
                    "description override for {owner}/{repo} returned status {}",
                    response.status()
                );
                return None;
            }
            Err(e) => {
                debug!("description override for {owner}/{repo} failed: {e}");
                return None;
            }
        };

        let body: GraphQlData<OverrideQueryData> = response.json().await.ok()?;
        let text = body.data?.repository?.object?.text?;

        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    async fn graphql(&self, query: &str, token: &str) -> reqwest::Result<reqwest::Response> {
        self.http
            .post(&self.graphql_url)
            .header("Authorization", format!("Bearer {token}"))
            .header("User-Agent", USER_AGENT)
            .json(&json!({ "query": query }))
            .send()
            .await
    }
}

// ---------------------------------------------------------------------------
// Route handler
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PinnedQuery {
    username: Option<String>,
}

pub async fn pinned_repos(
    State(state): State<crate::AppState>,
    Query(params): Query<PinnedQuery>,
) -> Result<Json<Vec<PinnedRepo>>> {
    let username = params
        .username
        .filter(|u| !u.is_empty())
        .ok_or(AppError::MissingUsername)?;

    let repos = state.github.pinned(&username).await?;
    Ok(Json(repos))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
