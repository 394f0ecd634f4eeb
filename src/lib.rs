//! Reflected-character probing for lists of URLs
//!
//! Each target is resolved through its redirects, split into origin and
//! path, and probed for a marker echoed back unescaped together with a set
//! of special characters. Probes run on a bounded worker pool.

pub mod reflection;
pub mod report;
pub mod scan;
pub mod url_crawler;
pub mod url_parser;
pub mod utils;

pub use reflection::{Reflection, ReflectionProber, DEFAULT_MARKER, SPECIAL_CHARS};
pub use report::Renderer;
pub use scan::config::ScanConfig;
pub use scan::models::{ProbeOutcome, ProbeTask};
pub use scan::{ScanSummary, Scanner};
pub use url_crawler::{RedirectResolver, RedirectResult};
