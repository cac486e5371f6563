//! Fundscan Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities for the fundscan workspace members:
//!
//! - **Logging**: tracing subscriber setup driven by [`logging::LogConfig`]
//! - **Text**: whitespace cleaning and list splitting used by adapters and the
//!   normalizer
//!
//! # Example
//!
//! ```
//! use fundscan_common::text::{clean_text, split_list};
//!
//! assert_eq!(clean_text("  Scale   AI ").as_deref(), Some("Scale AI"));
//! assert_eq!(split_list("Accel, Tiger Global"), vec!["Accel", "Tiger Global"]);
//! ```

pub mod logging;
pub mod text;
