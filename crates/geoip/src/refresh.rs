use {
    crate::{
        source::{AcquisitionError, Source},
        DatabaseManager,
        ParseError,
        SnapshotParser,
    },
    std::{sync::Arc, time::Duration},
    tokio::task::{JoinError, JoinHandle},
    tokio_util::sync::CancellationToken,
    tracing::{error, info},
};


#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Time between the end of one refresh cycle and the start of the next.
    ///
    /// Default is 24 hours.
    pub interval: Duration,

    /// Upper bound for a single acquisition, so that a hung source can't
    /// stall later cycles.
    ///
    /// Default is 60 seconds.
    pub fetch_timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60 * 24),
            fetch_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("parsing failed: {0}")]
    Parse(#[from] ParseError),

    #[error("parser task failed: {0}")]
    Task(#[from] JoinError),
}

/// Periodically re-acquires the database and swaps it into the
/// [`DatabaseManager`].
pub struct Refresher<S, P>
where
    P: SnapshotParser,
{
    source: S,
    parser: Arc<P>,
    manager: Arc<DatabaseManager<P::Snapshot>>,
    config: RefreshConfig,
}

impl<S, P> Refresher<S, P>
where
    S: Source,
    P: SnapshotParser,
{
    pub fn new(
        source: S,
        parser: P,
        manager: Arc<DatabaseManager<P::Snapshot>>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            source,
            parser: Arc::new(parser),
            manager,
            config,
        }
    }

    /// Runs a single acquire-parse-swap cycle and returns the version of the
    /// installed snapshot. On failure the current snapshot is left untouched.
    pub async fn refresh(&self) -> Result<u64, RefreshError> {
        let data = tokio::time::timeout(self.config.fetch_timeout, self.source.fetch())
            .await
            .map_err(|_| AcquisitionError::Timeout)??;

        // Building the search tree may be a CPU-heavy operation, so run it in a
        // separate thread.
        let parser = self.parser.clone();
        let snapshot = tokio::task::spawn_blocking(move || parser.parse(data)).await??;

        Ok(self.manager.swap(snapshot))
    }

    /// Refreshes the database every [`RefreshConfig::interval`] until `token`
    /// is canceled. Failed cycles are logged and the next one is attempted on
    /// schedule.
    pub async fn run(self, token: CancellationToken) {
        let interval = self.config.interval;

        info!(?interval, "geoip database refresh started");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {},
            }

            tokio::select! {
                _ = token.cancelled() => break,
                result = self.refresh() => match result {
                    Ok(version) => info!(version, "geoip database refreshed"),
                    Err(error) => error!(%error, "geoip database refresh failed"),
                },
            }
        }

        info!("geoip database refresh stopped");
    }

    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(token))
    }
}
