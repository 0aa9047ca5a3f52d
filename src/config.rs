const DEFAULT_STORIES_URL: &str = "https://hacker-news.firebaseio.com/v0/beststories.json";
const DEFAULT_ITEM_URL: &str = "https://hacker-news.firebaseio.com/v0/item/{id}.json";

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) upstream: Upstream,
    pub(crate) aggregator: Aggregator,

    pub(crate) listen_addr: std::net::SocketAddr,
    pub(crate) log_to_console: bool,
}

pub(crate) static CONFIG: std::sync::LazyLock<anyhow::Result<Config>> =
    std::sync::LazyLock::new(|| {
        env_file_loaded(dotenvy::dotenv())?;
        Config::from_env()
    });

/// A missing `.env` is fine, the environment may already be populated. Any
/// other failure (unreadable or malformed file) is reported.
fn env_file_loaded<T>(res: Result<T, dotenvy::Error>) -> anyhow::Result<()> {
    match res {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(anyhow::anyhow!("Failed to load .env file: {e}")),
    }
}

pub(crate) fn config() -> anyhow::Result<&'static Config> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e:#}"))
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            upstream: Upstream::new()?,
            aggregator: Aggregator::new()?,
            listen_addr: env_or(
                "LISTEN_ADDR",
                std::net::SocketAddr::from(([0, 0, 0, 0], 8080)),
            )?,
            log_to_console: env_or("LOG_TO_CONSOLE", false)?,
        })
    }
}

/// Where and how the item feed is reached.
#[derive(Debug, Clone)]
pub(crate) struct Upstream {
    pub(crate) stories_url: String,
    pub(crate) item_url: String,
    pub(crate) request_timeout: std::time::Duration,
    pub(crate) retry_max_elapsed: std::time::Duration,
}

impl Upstream {
    fn new() -> anyhow::Result<Self> {
        let item_url = env_or("ITEM_URL", DEFAULT_ITEM_URL.to_string())?;
        if !crate::hn_api::has_id_placeholder(&item_url) {
            anyhow::bail!("ITEM_URL must contain an id placeholder ({{id}}, {{0}} or {{}}): {item_url}");
        }

        Ok(Self {
            stories_url: env_or("STORIES_URL", DEFAULT_STORIES_URL.to_string())?,
            item_url,
            request_timeout: secs_or("UPSTREAM_REQUEST_TIMEOUT_SECS", 10)?,
            retry_max_elapsed: secs_or("RETRY_MAX_ELAPSED_SECS", 10)?,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Aggregator {
    pub(crate) cache_ttl: std::time::Duration,
    pub(crate) max_stories: i64,
    pub(crate) deadline: std::time::Duration,
}

impl Aggregator {
    fn new() -> anyhow::Result<Self> {
        let max_stories = env_or("MAX_STORIES", 200)?;
        if max_stories <= 0 {
            anyhow::bail!("MAX_STORIES must be greater than 0, got {max_stories}");
        }

        let cache_ttl = secs_or("CACHE_TTL_SECS", 5 * 60)?;
        if cache_ttl.is_zero() {
            anyhow::bail!("CACHE_TTL_SECS must be greater than 0");
        }

        Ok(Self {
            cache_ttl,
            max_stories,
            deadline: secs_or("AGGREGATE_TIMEOUT_SECS", 30)?,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} has invalid value {raw:?}: {e}")),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(anyhow::anyhow!("{key} could not be read: {e}")),
    }
}

fn secs_or(key: &str, default: u64) -> anyhow::Result<std::time::Duration> {
    env_or(key, default).map(std::time::Duration::from_secs)
}
