use {
    crate::{GeoData, LookupError, MaxMindSnapshot, Snapshot},
    arc_swap::ArcSwapOption,
    parking_lot::Mutex,
    std::{
        fmt,
        net::IpAddr,
        sync::{
            atomic::{AtomicU64, Ordering},
            Arc,
        },
    },
    tracing::info,
};

/// Owns the currently active database snapshot.
///
/// Lookups load the snapshot through [`ArcSwapOption`] and never wait on
/// writers. A lookup keeps the snapshot it has loaded alive until it returns,
/// so a concurrent [`DatabaseManager::swap()`] can never free data that is
/// still being read. Writers are serialized among themselves.
pub struct DatabaseManager<S = MaxMindSnapshot> {
    current: ArcSwapOption<S>,
    mutex: Mutex<()>,
    version: AtomicU64,
}

impl<S> DatabaseManager<S>
where
    S: Snapshot,
{
    /// Creates an empty manager. Lookups fail with [`LookupError::NotReady`]
    /// until the first swap.
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            mutex: Mutex::new(()),
            version: AtomicU64::new(0),
        }
    }

    pub fn with_snapshot(snapshot: impl Into<Arc<S>>) -> Self {
        let manager = Self::new();
        manager.swap(snapshot);
        manager
    }

    pub fn is_ready(&self) -> bool {
        self.current.load().is_some()
    }

    /// Number of swaps applied so far. Zero means no snapshot has been
    /// installed yet.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Returns an owned handle to the current snapshot.
    pub fn snapshot(&self) -> Option<Arc<S>> {
        self.current.load_full()
    }

    /// Looks up `addr` against exactly one snapshot: the one current at the
    /// moment of the call.
    pub fn query(&self, addr: IpAddr) -> Result<GeoData, LookupError> {
        let guard = self.current.load();
        let snapshot = guard.as_deref().ok_or(LookupError::NotReady)?;
        snapshot.lookup_geo_data(addr)
    }

    /// Installs `snapshot` as the current one and returns the new version.
    ///
    /// The previous snapshot is released once the last in-flight lookup that
    /// loaded it has finished.
    pub fn swap(&self, snapshot: impl Into<Arc<S>>) -> u64 {
        let snapshot = snapshot.into();
        let build_epoch = snapshot.build_epoch();
        let database_type = snapshot.database_type().map(str::to_owned);

        let _guard = self.mutex.lock();

        let prev = self.current.swap(Some(snapshot));
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;

        info!(
            version,
            build_epoch,
            database_type = database_type.as_deref(),
            replaced = prev.is_some(),
            "geoip database swapped"
        );

        version
    }
}

impl<S> Default for DatabaseManager<S>
where
    S: Snapshot,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for DatabaseManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseManager")
            .field("ready", &self.current.load().is_some())
            .field("version", &self.version.load(Ordering::Relaxed))
            .finish()
    }
}
