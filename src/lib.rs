//! # Pagesnap
//!
//! Captures screenshots of web pages at multiple resolutions and saves them
//! as uniquely-named image files. A good way to make sure websites are
//! responsive: register pages with `<width>x<height>` sizes, device keywords
//! (`iphone5s`, `nexus7`, ...) or the `w3counter` popular-resolutions token,
//! and the engine resolves every specifier to concrete pixel sizes, drives
//! concurrent captures through a headless browser, and publishes the results
//! atomically.
//!
//! ## Guarantees
//!
//! - **Deterministic filenames** from a fixed-placeholder template
//!   (`<%= url %>-<%= size %><%= crop %>` by default), with optional
//!   ` (N)` collision avoidance.
//! - **Fail-fast runs**: one failed capture aborts the whole run and nothing
//!   is persisted, so a produced file set is always complete.
//! - **Crash-safe writes**: temp-file-then-rename publishing plus an
//!   interrupt handler that rolls back in-flight writes, never published
//!   files.
//! - **Bounded concurrency**: one semaphore across all sources and sizes,
//!   sized at twice the logical CPU count by default.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use pagesnap::{CaptureOptions, Pagesnap};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut pagesnap = Pagesnap::new(CaptureOptions::default()).await?;
//!
//!     pagesnap
//!         .add_source("https://sindresorhus.com", vec!["1280x1024".to_string()], None)?
//!         .set_destination("screenshots")?;
//!
//!     let screenshots = pagesnap.run().await?;
//!     println!("captured {} screenshots", screenshots.len());
//!     Ok(())
//! }
//! ```
//!
//! ## CLI usage
//!
//! ```bash
//! pagesnap https://example.com -s 1024x768 -s iphone5s --dest screenshots
//! ```

/// Capture options, sources and result types
pub mod config;

/// Error types and error handling utilities
pub mod error;

/// Size-token classification and resolution
pub mod size;

/// External size-data providers and memoization
pub mod providers;

/// Filename slugging, templating and collision avoidance
pub mod filename;

/// Renderer abstraction and the headless-Chrome capture backend
pub mod capture;

/// The top-level orchestration engine
pub mod orchestrator;

/// Crash-safe persistence with interrupt rollback
pub mod persist;

/// Run counters and timing instrumentation
pub mod metrics;

/// Command-line interface implementation
pub mod cli;


pub use capture::*;
pub use cli::*;
pub use config::*;
pub use error::*;
pub use filename::*;
pub use metrics::*;
pub use orchestrator::*;
pub use persist::*;
pub use providers::*;
pub use size::*;
