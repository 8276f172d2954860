//! Resilience primitives shared across services
//!
//! Every external call the matching pipeline makes (embedding service,
//! place-search provider, storage) is I/O-bound and must treat slowness as a
//! recoverable failure. This library provides the two primitives used for
//! that:
//! - **Timeout**: wrap a fallible future with an explicit deadline
//! - **Limiter**: semaphore-bounded concurrency for fan-out against rate-limited providers
//!
//! # Example: external call with deadline
//!
//! ```rust,no_run
//! use resilience::with_timeout;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let result = with_timeout(Duration::from_secs(10), async {
//!         // Your provider call here
//!         Ok::<_, String>(())
//!     })
//!     .await;
//!     assert!(result.is_ok());
//! }
//! ```

pub mod limiter;
pub mod timeout;

pub use limiter::Limiter;
pub use timeout::{with_timeout, TimeoutError};
