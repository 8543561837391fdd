//! Runtime abstraction layer for the scan pipeline core.
//!
//! Every `core-*` and `bridge-*` crate depends on this crate instead of
//! reaching for Tokio directly. The upload and sync pipelines are written
//! against cooperative scheduling: suspension happens only at `.await`
//! points on remote calls and timers, so the same code runs unchanged on a
//! current-thread runtime (tests, embedded hosts) or a multi-thread one.
//!
//! # Modules
//!
//! - `task`: Task spawning
//! - `time`: Sleep, timeouts, durations and instants
//! - `sync`: Async-aware locks and channels
//! - `runtime`: Runtime construction and `block_on`
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use futures::future::join_all;
pub use task::spawn;
pub use time::{sleep, Duration, Instant};
