//! Types used to configure attribute derivation
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Thread pool to use for the parallel derivation pass
///
/// Most users will use the global Rayon pool, but it's possible to provide your
/// own as well.
pub enum ThreadPool {
    /// User-provided pool
    Custom(rayon::ThreadPool),
    /// Global Rayon pool
    Global,
}

impl ThreadPool {
    /// Runs a function across the thread pool
    pub fn run<F: FnOnce() -> V + Send, V: Send>(&self, f: F) -> V {
        match self {
            ThreadPool::Custom(p) => p.install(f),
            ThreadPool::Global => f(),
        }
    }

    /// Returns the number of threads in the pool
    pub fn thread_count(&self) -> usize {
        match self {
            ThreadPool::Custom(p) => p.current_num_threads(),
            ThreadPool::Global => rayon::current_num_threads(),
        }
    }
}

/// Token to cancel an in-progress derivation
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Build a new token, initialized as "not cancelled"
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark this token as cancelled
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check if the token is cancelled
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Settings for the eigen-attribute derivation pass
pub struct DeriveConfig<'a> {
    /// Thread pool to use for derivation
    ///
    /// If this is `None`, then derivation runs on the calling thread;
    /// otherwise, voxels are distributed across the provided pool.
    pub threads: Option<&'a ThreadPool>,

    /// Token to cancel derivation
    ///
    /// A cancelled pass publishes no metadata at all.
    pub cancel: CancelToken,
}

impl Default for DeriveConfig<'_> {
    fn default() -> Self {
        Self {
            threads: Some(&ThreadPool::Global),
            cancel: CancelToken::new(),
        }
    }
}

impl DeriveConfig<'_> {
    /// Builds a configuration which runs on the calling thread
    pub fn single_threaded() -> Self {
        Self {
            threads: None,
            cancel: CancelToken::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cancel_is_shared() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn custom_pool() {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(3)
            .build()
            .unwrap();
        let pool = ThreadPool::Custom(pool);
        assert_eq!(pool.thread_count(), 3);
        assert_eq!(pool.run(rayon::current_num_threads), 3);
    }
}
