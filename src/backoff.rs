const MAX_INTERVAL_BETWEEN_TRIES: std::time::Duration = std::time::Duration::from_secs(5);

/// Exponential backoff for upstream calls. `None` when retries are disabled.
pub(crate) fn backoff_bounded(
    max_elapsed: std::time::Duration,
) -> Option<backoff::ExponentialBackoff> {
    if max_elapsed.is_zero() {
        return None;
    }

    Some(
        backoff::ExponentialBackoffBuilder::new()
            .with_max_interval(MAX_INTERVAL_BETWEEN_TRIES.min(max_elapsed))
            .with_max_elapsed_time(Some(max_elapsed))
            .build(),
    )
}
