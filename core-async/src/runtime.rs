//! Runtime utilities that abstract over the underlying async executor.
//!
//! Downstream crates never build a Tokio runtime themselves; they go through
//! [`block_on`] or the `#[core_async::main]` / `#[core_async::test]` macros.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a fresh current-thread runtime.
///
/// Panics if the runtime cannot be created, which only happens when the
/// process is out of OS resources (threads, file descriptors).
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}

/// Returns `true` when called from inside a running runtime.
pub fn in_runtime() -> bool {
    Handle::try_current().is_ok()
}
