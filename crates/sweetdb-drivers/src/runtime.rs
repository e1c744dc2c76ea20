//! Tokio runtime behind the blocking API
//!
//! Sessions are async; the public `Connection` is not. Every blocking call
//! drives its future to completion on this shared runtime.

use std::sync::OnceLock;
use tokio::runtime::Runtime;

static TOKIO_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Get or create the shared Tokio runtime.
///
/// # Panics
///
/// Panics if the runtime cannot be created.
pub fn get_tokio_runtime() -> &'static Runtime {
    TOKIO_RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .thread_name("sweetdb-runtime")
            .build()
            .expect("Failed to create Tokio runtime for SweetDB")
    })
}

/// Run a future on the shared Tokio runtime, blocking the current thread
/// until it completes.
///
/// Must not be called from inside an async context: Tokio panics when asked
/// to block within a runtime.
pub fn block_on_tokio<F, T>(future: F) -> T
where
    F: std::future::Future<Output = T>,
{
    get_tokio_runtime().block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_futures_to_completion() {
        let value = block_on_tokio(async {
            tokio::task::yield_now().await;
            21 * 2
        });
        assert_eq!(value, 42);
    }

    #[test]
    fn runtime_is_shared() {
        assert!(std::ptr::eq(get_tokio_runtime(), get_tokio_runtime()));
    }
}
