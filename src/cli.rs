//! Command-line interface implementation.

use crate::{CaptureOptions, OutputFormat, Pagesnap, PagesnapError};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pagesnap")]
#[command(about = "Capture screenshots of websites in various resolutions")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// URLs or local paths of the pages to capture
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Size to capture: <width>x<height>, a device keyword, or `w3counter`
    #[arg(short = 's', long = "size", required = true)]
    pub sizes: Vec<String>,

    /// Directory to save the screenshots in (omit to keep them in memory)
    #[arg(short = 'd', long = "dest")]
    pub dest: Option<PathBuf>,

    #[arg(long, help = "Seconds to wait after load before capturing")]
    pub delay: Option<u64>,

    #[arg(long, help = "Seconds after which a capture is aborted")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Crop to the set height instead of the full page")]
    pub crop: bool,

    #[arg(long, help = "Custom CSS to apply to the page")]
    pub css: Option<String>,

    #[arg(long, help = "Custom JavaScript to run on the page")]
    pub script: Option<String>,

    #[arg(long = "cookie", help = "Cookie in name=value form (repeatable)")]
    pub cookies: Vec<String>,

    #[arg(long = "header", help = "HTTP header in name=value form (repeatable)")]
    pub headers: Vec<String>,

    #[arg(long, help = "Custom filename template")]
    pub filename: Option<String>,

    #[arg(long, help = "Overwrite existing files instead of incrementing the name")]
    pub overwrite: bool,

    #[arg(long, help = "Capture only the element matching this CSS selector")]
    pub selector: Option<String>,

    #[arg(long = "hide", help = "CSS selector of elements to hide (repeatable)")]
    pub hide: Vec<String>,

    #[arg(long, help = "Username for HTTP basic auth")]
    pub username: Option<String>,

    #[arg(long, help = "Password for HTTP basic auth")]
    pub password: Option<String>,

    #[arg(long, help = "Device scale factor")]
    pub scale: Option<f64>,

    #[arg(long, help = "Image format (png, jpg)")]
    pub format: Option<String>,

    #[arg(long = "user-agent", help = "Custom user agent")]
    pub user_agent: Option<String>,

    #[arg(long, help = "Transparent background instead of white")]
    pub transparent: bool,

    #[arg(long = "dark-mode", help = "Emulate a dark color-scheme preference")]
    pub dark_mode: bool,

    #[arg(long, help = "Maximum concurrent captures")]
    pub concurrency: Option<usize>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,
}

impl Cli {
    /// Translate flags into the constructor-level capture options.
    pub fn capture_options(&self) -> Result<CaptureOptions, PagesnapError> {
        let format = match &self.format {
            Some(value) => Some(
                value
                    .parse::<OutputFormat>()
                    .map_err(PagesnapError::Internal)?,
            ),
            None => None,
        };

        let headers = if self.headers.is_empty() {
            None
        } else {
            let mut map = HashMap::new();
            for header in &self.headers {
                let (name, value) = header.split_once('=').ok_or_else(|| {
                    PagesnapError::Internal(format!("malformed header: {header}"))
                })?;
                map.insert(name.trim().to_string(), value.trim().to_string());
            }
            Some(map)
        };

        Ok(CaptureOptions {
            delay: self.delay,
            timeout: self.timeout,
            crop: self.crop.then_some(true),
            css: self.css.clone(),
            script: self.script.clone(),
            cookies: (!self.cookies.is_empty()).then(|| self.cookies.clone()),
            filename: self.filename.clone(),
            incremental_name: Some(!self.overwrite),
            selector: self.selector.clone(),
            hide: (!self.hide.is_empty()).then(|| self.hide.clone()),
            username: self.username.clone(),
            password: self.password.clone(),
            scale: self.scale,
            format,
            user_agent: self.user_agent.clone(),
            headers,
            transparent: self.transparent.then_some(true),
            dark_mode: self.dark_mode.then_some(true),
        })
    }

    /// Build and configure the engine from the parsed arguments.
    pub async fn build_engine(&self) -> Result<Pagesnap, PagesnapError> {
        let mut pagesnap = Pagesnap::new(self.capture_options()?).await?;

        if let Some(dest) = &self.dest {
            pagesnap.set_destination(dest.clone())?;
        }
        if let Some(concurrency) = self.concurrency {
            pagesnap.with_concurrency(concurrency);
        }
        for url in &self.urls {
            pagesnap.add_source(url.clone(), self.sizes.clone(), None)?;
        }

        Ok(pagesnap)
    }
}

pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}
