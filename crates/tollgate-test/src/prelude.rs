//! Prelude module - commonly used test utilities.
//!
//! Use `use tollgate_test::prelude::*;` to import all essential helpers.

pub use crate::fixtures::{TestWorkspace, browser_input, init_test_logging, shell_input};
pub use crate::mocks::{RecordingDecisions, ScriptedDecisions};
