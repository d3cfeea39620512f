//! Generated configuration cleanup
//!
//! `terraform plan -generate-config-out` emits configuration that usually
//! cannot be applied as-is: it is full of `null` placeholders, zero values
//! that conflict with provider validation, encoded values and blanked-out
//! credentials. This module rewrites such a file in place with three passes:
//!
//! 1. [`GlobalRedactor`] drops noise lines anywhere in the file
//! 2. [`BlockTracker`] applies per-resource-type rules inside each
//!    `resource "<type>" "<name>" { ... }` block
//! 3. [`MultilineEraser`] removes leftover multi-line structures such as
//!    empty nested blocks
//!
//! All behavior comes from a [`RuleTable`]; see `rules/azurerm.yaml` for the
//! built-in one.

pub mod classifier;
pub mod cleaner;
pub mod error;
pub mod global;
pub mod multiline;
pub mod pattern;
pub mod rules;
pub mod tracker;

pub use cleaner::{CleanupReport, ConfigCleaner};
pub use error::{CleanupError, CleanupResult};
pub use global::GlobalRedactor;
pub use multiline::MultilineEraser;
pub use rules::{CompiledRules, RuleTable};
pub use tracker::BlockTracker;
