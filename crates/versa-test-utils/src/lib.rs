//! Testing utilities, fixtures, and fault injection for versa.
//!
//! - **Faults**: [`FaultyStorage`] wraps in-memory storage and fails chosen
//!   operations on demand
//! - **Fixtures**: [`Harness`] wires the core services over faulty storage
//!   and a manual clock
//! - **Assertions**: helpers for results, strings and API responses
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use versa_test_utils::{Fault, Harness};
//!
//! #[tokio::test]
//! async fn restore_survives_live_write_failure() {
//!     let h = Harness::new();
//!     let v1 = h.seed_version(1, "original").await;
//!     h.set_live(1, "edited").await;
//!
//!     h.storage.fail(Fault::LiveSet);
//!     assert!(!h.rollback.restore_version(v1, 1).await);
//!     assert_eq!(h.live(1).await, "edited");
//! }
//! ```

pub mod assertions;
pub mod faulty;
pub mod fixtures;

pub use faulty::{Fault, FaultyStorage};
pub use fixtures::{start_time, Harness};
