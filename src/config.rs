//! Capture options, sources and result types.
//!
//! Options follow a two-layer model: every field is optional so that a
//! per-source override can be merged over the constructor-level defaults
//! field by field, and accessors apply the documented default when a field
//! was never set. Merging always produces a new value; options are never
//! mutated in place, so concurrent captures of different sources cannot
//! observe each other's overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default filename template applied when the caller supplies none.
pub const DEFAULT_FILENAME_TEMPLATE: &str = "<%= url %>-<%= size %><%= crop %>";

/// Options for a capture run, settable globally and per source.
///
/// Per-source options take precedence key by key over the ones given at
/// construction time.
///
/// # Examples
///
/// ```rust
/// use pagesnap::CaptureOptions;
///
/// let defaults = CaptureOptions {
///     delay: Some(2),
///     crop: Some(true),
///     ..Default::default()
/// };
///
/// let per_source = CaptureOptions {
///     crop: Some(false),
///     ..Default::default()
/// };
///
/// let merged = defaults.merge(&per_source);
/// assert_eq!(merged.delay, Some(2));
/// assert!(!merged.crop());
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureOptions {
    /// Seconds to wait after load before capturing (default: 0).
    ///
    /// Useful when the site does things after load that should be captured.
    pub delay: Option<u64>,

    /// Seconds after which a capture is aborted (default: 60).
    pub timeout: Option<u64>,

    /// Crop to the set height instead of capturing the full page
    /// (default: false).
    pub crop: Option<bool>,

    /// Custom CSS injected into the page before capture.
    pub css: Option<String>,

    /// Custom JavaScript evaluated on the page before capture.
    pub script: Option<String>,

    /// Cookies in `name=value` form, applied before navigation (default: none).
    pub cookies: Option<Vec<String>>,

    /// Filename template; see [`crate::filename`] for the available fields
    /// (default: `<%= url %>-<%= size %><%= crop %>`).
    pub filename: Option<String>,

    /// When a file of the computed name exists, append an incrementing
    /// ` (N)` counter instead of overwriting (default: false).
    pub incremental_name: Option<bool>,

    /// Capture only the DOM element matching this CSS selector.
    pub selector: Option<String>,

    /// CSS selectors of elements to hide before capture (default: none).
    pub hide: Option<Vec<String>>,

    /// Username for HTTP basic auth. Only applied together with `password`.
    pub username: Option<String>,

    /// Password for HTTP basic auth. Only applied together with `username`.
    pub password: Option<String>,

    /// Device scale factor (default: 1.0).
    pub scale: Option<f64>,

    /// Output image format (default: png).
    pub format: Option<OutputFormat>,

    /// Custom user agent.
    pub user_agent: Option<String>,

    /// Custom HTTP request headers (default: none).
    pub headers: Option<HashMap<String, String>>,

    /// Render the default background as transparent instead of white
    /// (default: false).
    pub transparent: Option<bool>,

    /// Emulate a dark color-scheme preference (default: false).
    pub dark_mode: Option<bool>,
}

impl CaptureOptions {
    /// Merge per-source overrides over these defaults, field by field.
    /// Returns a new value; neither input is modified.
    pub fn merge(&self, overrides: &CaptureOptions) -> CaptureOptions {
        CaptureOptions {
            delay: overrides.delay.or(self.delay),
            timeout: overrides.timeout.or(self.timeout),
            crop: overrides.crop.or(self.crop),
            css: overrides.css.clone().or_else(|| self.css.clone()),
            script: overrides.script.clone().or_else(|| self.script.clone()),
            cookies: overrides.cookies.clone().or_else(|| self.cookies.clone()),
            filename: overrides.filename.clone().or_else(|| self.filename.clone()),
            incremental_name: overrides.incremental_name.or(self.incremental_name),
            selector: overrides.selector.clone().or_else(|| self.selector.clone()),
            hide: overrides.hide.clone().or_else(|| self.hide.clone()),
            username: overrides.username.clone().or_else(|| self.username.clone()),
            password: overrides.password.clone().or_else(|| self.password.clone()),
            scale: overrides.scale.or(self.scale),
            format: overrides.format.or(self.format),
            user_agent: overrides
                .user_agent
                .clone()
                .or_else(|| self.user_agent.clone()),
            headers: overrides.headers.clone().or_else(|| self.headers.clone()),
            transparent: overrides.transparent.or(self.transparent),
            dark_mode: overrides.dark_mode.or(self.dark_mode),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay.unwrap_or(0))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(60))
    }

    pub fn crop(&self) -> bool {
        self.crop.unwrap_or(false)
    }

    pub fn incremental_name(&self) -> bool {
        self.incremental_name.unwrap_or(false)
    }

    pub fn scale(&self) -> f64 {
        self.scale.unwrap_or(1.0)
    }

    pub fn format(&self) -> OutputFormat {
        self.format.unwrap_or(OutputFormat::Png)
    }

    pub fn transparent(&self) -> bool {
        self.transparent.unwrap_or(false)
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode.unwrap_or(false)
    }

    pub fn filename_template(&self) -> &str {
        self.filename.as_deref().unwrap_or(DEFAULT_FILENAME_TEMPLATE)
    }

    /// Basic-auth credentials, present only when both halves are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }
}

/// Supported output image formats.
///
/// The renderer always captures PNG; JPEG output is converted afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Filename extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            other => Err(format!("unsupported format: {other}")),
        }
    }
}

/// One registered capture request: a page plus the sizes to capture it at.
///
/// Immutable once added; owned exclusively by the orchestrator's source list.
#[derive(Debug, Clone)]
pub struct Source {
    /// URL, local path or data URI of the page to capture.
    pub url: String,
    /// Raw size tokens: `<width>x<height>` notation, device keywords, or the
    /// `w3counter` popular-resolutions token.
    pub sizes: Vec<String>,
    /// Options taking precedence over the constructor-level defaults.
    pub options: Option<CaptureOptions>,
}

/// A captured screenshot: raw image bytes plus the filename computed once at
/// creation time.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub data: Vec<u8>,
    pub filename: String,
}

/// Aggregate counters for one run, computed once at the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Count of distinct source URLs seen.
    pub urls: usize,
    /// Count of distinct resolved size strings across all sources.
    pub sizes: usize,
    /// Total number of screenshots produced.
    pub screenshots: usize,
}

/// Optional destination directory. When set, results are persisted; when
/// absent they are returned in memory.
pub type Destination = PathBuf;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = CaptureOptions::default();
        assert_eq!(options.delay(), Duration::from_secs(0));
        assert_eq!(options.timeout(), Duration::from_secs(60));
        assert!(!options.crop());
        assert!(!options.incremental_name());
        assert_eq!(options.scale(), 1.0);
        assert_eq!(options.format(), OutputFormat::Png);
        assert_eq!(options.filename_template(), DEFAULT_FILENAME_TEMPLATE);
    }

    #[test]
    fn merge_prefers_overrides_per_field() {
        let defaults = CaptureOptions {
            delay: Some(3),
            timeout: Some(30),
            css: Some("body { margin: 0 }".to_string()),
            ..Default::default()
        };
        let overrides = CaptureOptions {
            timeout: Some(10),
            crop: Some(true),
            ..Default::default()
        };

        let merged = defaults.merge(&overrides);
        assert_eq!(merged.delay, Some(3));
        assert_eq!(merged.timeout, Some(10));
        assert!(merged.crop());
        assert_eq!(merged.css.as_deref(), Some("body { margin: 0 }"));
    }

    #[test]
    fn merge_does_not_mutate_inputs() {
        let defaults = CaptureOptions {
            delay: Some(1),
            ..Default::default()
        };
        let overrides = CaptureOptions {
            delay: Some(9),
            ..Default::default()
        };
        let _ = defaults.merge(&overrides);
        assert_eq!(defaults.delay, Some(1));
        assert_eq!(overrides.delay, Some(9));
    }

    #[test]
    fn credentials_require_both_halves() {
        let mut options = CaptureOptions {
            username: Some("admin".to_string()),
            ..Default::default()
        };
        assert!(options.credentials().is_none());

        options.password = Some("hunter2".to_string());
        assert_eq!(options.credentials(), Some(("admin", "hunter2")));
    }

    #[test]
    fn format_parsing() {
        assert_eq!("png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("JPEG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert!("webp".parse::<OutputFormat>().is_err());
    }
}
