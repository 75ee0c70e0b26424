//! Tollgate Test - Shared test utilities.
//!
//! This crate provides mock decision sources and fixtures that can be used
//! across Tollgate crates as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! tollgate-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use tollgate_core::ApprovalDecision;
//! use tollgate_test::{ScriptedDecisions, shell_input};
//!
//! #[tokio::test]
//! async fn test_prompted_once() {
//!     let decisions = ScriptedDecisions::new([ApprovalDecision::Task]);
//!     let outcome = gate
//!         .authorize("shell_exec", &shell_input("curl x"), "conv", &decisions)
//!         .await;
//!     assert!(outcome.allowed);
//!     assert_eq!(decisions.calls(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
