pub(crate) type Stories = std::sync::Arc<[Story]>;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub(crate) struct Story {
    // Filled from the id used for the detail fetch, not trusted from the body.
    #[serde(default)]
    pub(crate) id: i64,

    #[serde(default)]
    pub(crate) title: String,

    pub(crate) url: Option<String>,

    #[serde(default)]
    pub(crate) by: String,

    #[serde(default)]
    pub(crate) time: i64,

    #[serde(default)]
    pub(crate) score: u64,

    #[serde(default)]
    pub(crate) descendants: u64,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum StoriesError {
    #[error("{0}")]
    InvalidArgument(String),

    // Shared because every caller waiting on the same cache miss gets the error.
    #[error(transparent)]
    UpstreamUnavailable(#[from] std::sync::Arc<crate::hn_api::UpstreamError>),
}

pub(crate) fn cache_key(n: i64) -> String {
    format!("BestStories_{n}")
}

/// Fetches, ranks and caches the best stories.
#[derive(Debug)]
pub(crate) struct Aggregator {
    hn: crate::hn_api::HnClient,
    cache: crate::cache::StoriesCache,
    settings: crate::config::Aggregator,
}

impl Aggregator {
    pub(crate) fn new(
        hn: crate::hn_api::HnClient,
        cache: crate::cache::StoriesCache,
        settings: crate::config::Aggregator,
    ) -> Self {
        Self {
            hn,
            cache,
            settings,
        }
    }

    /// The `n` best stories ordered by score, highest first.
    pub(crate) async fn top_stories(&self, n: i64) -> Result<Stories, StoriesError> {
        if n <= 0 {
            return Err(StoriesError::InvalidArgument(
                "The number of stories must be greater than 0.".to_string(),
            ));
        }
        if n > self.settings.max_stories {
            return Err(StoriesError::InvalidArgument(format!(
                "The number of stories must be at most {}.",
                self.settings.max_stories
            )));
        }

        let key = cache_key(n);
        if let Some(stories) = self.cache.get(&key).await {
            tracing::info!(n, cache_key = %key, "Serving stories from cache");
            return Ok(stories);
        }

        // Callers missing on the same key while this runs wait for its result.
        let stories = self
            .cache
            .try_get_with(key.clone(), async {
                let deadline = self.settings.deadline;
                let stories = tokio::time::timeout(deadline, self.fetch_ranked(n))
                    .await
                    .map_err(|_| crate::hn_api::UpstreamError::DeadlineExceeded(deadline))??;

                tracing::info!(
                    n,
                    cache_key = %key,
                    num_stories = stories.len(),
                    ttl =? self.settings.cache_ttl,
                    "Cached best stories"
                );
                Ok::<_, crate::hn_api::UpstreamError>(stories)
            })
            .await?;

        Ok(stories)
    }

    async fn fetch_ranked(&self, n: i64) -> Result<Stories, crate::hn_api::UpstreamError> {
        let mut ids = self.hn.get_story_ids().await?;
        tracing::info!(num_ids = ids.len(), "Got best story ids");

        // n is positive and bounded by max_stories here.
        ids.truncate(usize::try_from(n).unwrap_or(usize::MAX));

        let mut queries_set: tokio::task::JoinSet<
            Result<(usize, Story), crate::hn_api::UpstreamError>,
        > = tokio::task::JoinSet::new();

        for (rank, id) in ids.into_iter().enumerate() {
            let hn = self.hn.clone();
            queries_set.spawn(async move { Ok((rank, hn.get_story(id).await?)) });
        }

        let mut ranked = Vec::with_capacity(queries_set.len());
        // Returning early drops the set, which aborts the fetches still in flight.
        while let Some(res) = queries_set.join_next().await {
            match res? {
                Ok(story) => ranked.push(story),
                Err(e) => {
                    tracing::error!(error = %e, "Error getting story");
                    return Err(e);
                }
            }
        }

        sort_stories(&mut ranked);

        Ok(ranked.into_iter().map(|(_, story)| story).collect())
    }
}

/// Highest score first. Equal scores keep the upstream ranking.
fn sort_stories(stories: &mut [(usize, Story)]) {
    stories.sort_by(|(a_rank, a), (b_rank, b)| b.score.cmp(&a.score).then(a_rank.cmp(b_rank)));
}
