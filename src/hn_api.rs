//! Calls against the item-feed API: the ranked list of story ids and the
//! per-item detail records.

const ID_PLACEHOLDERS: [&str; 3] = ["{id}", "{0}", "{}"];

#[derive(Debug, thiserror::Error)]
pub(crate) enum UpstreamError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "Failed to fetch the story IDs due to an error. Please verify the source or try again later."
    )]
    EmptyIdList,

    #[error("item {0} does not exist upstream")]
    MissingItem(i64),

    #[error("upstream did not answer within {0:?}")]
    DeadlineExceeded(std::time::Duration),

    #[error("fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl UpstreamError {
    /// Whether trying the same call again may succeed.
    fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Request { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            UpstreamError::Status { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

/// Shared handle for talking to the upstream feed. Cheap to clone into tasks.
#[derive(Debug, Clone)]
pub(crate) struct HnClient {
    client: reqwest::Client,
    stories_url: std::sync::Arc<str>,
    item_url: std::sync::Arc<str>,
    retry_max_elapsed: std::time::Duration,
}

impl HnClient {
    pub(crate) fn new(client: reqwest::Client, upstream: &crate::config::Upstream) -> Self {
        Self {
            client,
            stories_url: upstream.stories_url.as_str().into(),
            item_url: upstream.item_url.as_str().into(),
            retry_max_elapsed: upstream.retry_max_elapsed,
        }
    }

    /// Ranked story ids. An empty or `null` list is an error.
    pub(crate) async fn get_story_ids(&self) -> Result<Vec<i64>, UpstreamError> {
        let ids: Option<Vec<i64>> = self.get_json(&self.stories_url).await?;

        match ids {
            Some(ids) if !ids.is_empty() => Ok(ids),
            _ => Err(UpstreamError::EmptyIdList),
        }
    }

    pub(crate) async fn get_story(&self, id: i64) -> Result<crate::stories::Story, UpstreamError> {
        let url = item_url(&self.item_url, id);
        let story: Option<crate::stories::Story> = self.get_json(&url).await?;

        let mut story = story.ok_or(UpstreamError::MissingItem(id))?;
        story.id = id;
        Ok(story)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, UpstreamError> {
        let Some(backoff) = crate::backoff::backoff_bounded(self.retry_max_elapsed) else {
            return self.get_json_once(url).await;
        };

        backoff::future::retry_notify(
            backoff,
            move || async move {
                self.get_json_once(url).await.map_err(|e| {
                    if e.is_transient() {
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            },
            |e: UpstreamError, wait: std::time::Duration| {
                tracing::warn!(url, error = %e, retry_in =? wait, "Retrying upstream call");
            },
        )
        .await
    }

    async fn get_json_once<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, UpstreamError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| UpstreamError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: url.to_string(),
                status,
            });
        }

        // Read the body first so malformed JSON surfaces as a decode error
        // rather than a generic transport error.
        let body = response
            .bytes()
            .await
            .map_err(|source| UpstreamError::Request {
                url: url.to_string(),
                source,
            })?;

        serde_json::from_slice(&body).map_err(|source| UpstreamError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

pub(crate) fn has_id_placeholder(template: &str) -> bool {
    ID_PLACEHOLDERS.iter().any(|p| template.contains(p))
}

/// Fills the first placeholder kind found in `template` with `id`.
pub(crate) fn item_url(template: &str, id: i64) -> String {
    ID_PLACEHOLDERS
        .iter()
        .find(|p| template.contains(*p))
        .map(|p| template.replace(p, &id.to_string()))
        .unwrap_or_else(|| template.to_string())
}
