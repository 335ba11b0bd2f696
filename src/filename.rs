//! Filename slugging, template rendering and collision avoidance.
//!
//! Filenames come from a small fixed-placeholder template rather than a
//! general template engine: `<%= field %>` markers are substituted from a
//! [`TemplateContext`] and anything else is copied through verbatim. The
//! `url` field is a filesystem-safe slug of the source reference, and
//! collision avoidance appends a ` (N)` counter when enabled.

use crate::{CaptureOptions, PagesnapError};
use chrono::Local;
use dashmap::DashSet;
use std::path::Path;

/// Characters unsafe in filenames, replaced by `!` during slugging.
fn is_unsafe_char(c: char) -> bool {
    matches!(c, '/' | '\\' | '|' | '?' | ':' | '*' | '"' | '<' | '>') || c.is_control()
}

fn replace_unsafe(value: &str) -> String {
    value
        .chars()
        .map(|c| if is_unsafe_char(c) { '!' } else { c })
        .collect()
}

/// Whether a fragment is one of the no-op forms `#`, `#!`, `#/`, `#!/`.
fn is_noop_fragment(fragment: &str) -> bool {
    matches!(fragment, "#" | "#!" | "#/" | "#!/")
}

/// Slugify a source reference for use in a filename.
///
/// Local paths that exist on disk reduce to their base name. Remote URLs
/// lose their scheme and any leading `www.`; unsafe characters become `!`.
/// A non-empty, non-no-op fragment is appended to the slug.
pub fn slugify_url(reference: &str) -> String {
    if Path::new(reference).exists() {
        let basename = Path::new(reference)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| reference.to_string());
        return replace_unsafe(&basename);
    }

    let (base, fragment) = match reference.find('#') {
        Some(index) => (&reference[..index], &reference[index..]),
        None => (reference, ""),
    };

    let mut slug = base;
    for scheme in ["https://", "http://", "file://"] {
        if let Some(stripped) = slug.strip_prefix(scheme) {
            slug = stripped;
            break;
        }
    }
    slug = slug.strip_prefix("www.").unwrap_or(slug);
    slug = slug.trim_end_matches('/');

    let mut result = replace_unsafe(slug);
    if !fragment.is_empty() && !is_noop_fragment(fragment) {
        result.push_str(&replace_unsafe(fragment));
    }
    result
}

/// Values available to the filename template, computed once per screenshot
/// at creation time.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub url: String,
    pub size: String,
    pub width: String,
    pub height: String,
    pub crop: String,
    pub date: String,
    pub time: String,
}

impl TemplateContext {
    /// Build the context for one (source, size) pair. `date` and `time` are
    /// the current wall clock, so a batch spanning midnight may legitimately
    /// mix dates.
    pub fn new(url: &str, size: &str, width: u32, height: u32, crop: bool) -> Self {
        let now = Local::now();
        Self {
            url: slugify_url(url),
            size: size.to_string(),
            width: width.to_string(),
            height: height.to_string(),
            crop: if crop { "-cropped".to_string() } else { String::new() },
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H-%M-%S").to_string(),
        }
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "url" => Some(&self.url),
            "size" => Some(&self.size),
            "width" => Some(&self.width),
            "height" => Some(&self.height),
            "crop" => Some(&self.crop),
            "date" => Some(&self.date),
            "time" => Some(&self.time),
            _ => None,
        }
    }
}

/// Render a `<%= field %>` template against a context.
///
/// Unknown fields and unterminated markers are template errors; they abort
/// the source's capture rather than producing a half-rendered name.
pub fn render_template(template: &str, context: &TemplateContext) -> Result<String, PagesnapError> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("<%=") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 3..];
        let end = after.find("%>").ok_or_else(|| {
            PagesnapError::Template(format!("unterminated placeholder in `{template}`"))
        })?;

        let name = after[..end].trim();
        let value = context.field(name).ok_or_else(|| {
            PagesnapError::Template(format!("unknown template field `{name}`"))
        })?;
        output.push_str(value);

        rest = &after[end + 2..];
    }

    output.push_str(rest);
    Ok(output)
}

/// Pick the first unused variant of `filename`, appending ` (N)` before the
/// extension: `name.png`, `name (1).png`, `name (2).png`, ...
///
/// A name is "used" if it exists in the destination directory or was already
/// claimed by another screenshot in the same batch. The claim set insert is
/// atomic, so two captures finalizing concurrently can never pick the same
/// increment.
pub fn unused_filename(
    destination: Option<&Path>,
    filename: &str,
    claimed: &DashSet<String>,
) -> String {
    let (stem, extension) = match filename.rsplit_once('.') {
        Some((stem, extension)) => (stem, Some(extension)),
        None => (filename, None),
    };

    let mut counter = 0usize;
    loop {
        let candidate = if counter == 0 {
            filename.to_string()
        } else {
            match extension {
                Some(extension) => format!("{stem} ({counter}).{extension}"),
                None => format!("{stem} ({counter})"),
            }
        };

        let on_disk = destination
            .map(|dir| dir.join(&candidate).exists())
            .unwrap_or(false);

        if !on_disk && claimed.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Compute the final filename for one screenshot from its merged options.
pub fn build_filename(
    url: &str,
    size: &str,
    width: u32,
    height: u32,
    options: &CaptureOptions,
    destination: Option<&Path>,
    claimed: &DashSet<String>,
) -> Result<String, PagesnapError> {
    let context = TemplateContext::new(url, size, width, height, options.crop());
    let template = format!(
        "{}.{}",
        options.filename_template(),
        options.format().extension()
    );
    let mut filename = render_template(&template, &context)?;

    if options.incremental_name() {
        filename = unused_filename(destination, &filename, claimed);
    } else {
        claimed.insert(filename.clone());
    }

    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OutputFormat;

    fn context(url: &str, size: &str) -> TemplateContext {
        TemplateContext::new(url, size, 1024, 768, false)
    }

    #[test]
    fn slug_strips_scheme_and_www() {
        assert_eq!(slugify_url("https://example.com"), "example.com");
        assert_eq!(slugify_url("http://www.example.com/"), "example.com");
        assert_eq!(slugify_url("http://yeoman.io/blog/"), "yeoman.io!blog");
    }

    #[test]
    fn slug_strips_noop_fragments() {
        assert_eq!(slugify_url("https://example.com/#/"), "example.com");
        assert_eq!(slugify_url("https://example.com#"), "example.com");
        assert_eq!(slugify_url("https://example.com/#!/"), "example.com");
    }

    #[test]
    fn slug_keeps_meaningful_fragments() {
        assert_eq!(slugify_url("https://example.com/#/@user"), "example.com#!@user");
    }

    #[test]
    fn slug_replaces_unsafe_characters() {
        assert_eq!(slugify_url("example.com/a?b=c"), "example.com!a!b=c");
    }

    #[test]
    fn template_renders_fields() {
        let rendered = render_template(
            "<%= url %>-<%= size %><%= crop %>",
            &context("https://example.com", "1024x768"),
        )
        .unwrap();
        assert_eq!(rendered, "example.com-1024x768");
    }

    #[test]
    fn template_renders_crop_suffix() {
        let context = TemplateContext::new("https://example.com", "1024x768", 1024, 768, true);
        let rendered = render_template("<%= url %>-<%= size %><%= crop %>", &context).unwrap();
        assert_eq!(rendered, "example.com-1024x768-cropped");
    }

    #[test]
    fn template_width_height() {
        let rendered = render_template(
            "<%= width %>by<%= height %>",
            &context("https://example.com", "1024x768"),
        )
        .unwrap();
        assert_eq!(rendered, "1024by768");
    }

    #[test]
    fn template_rejects_unknown_field() {
        let result = render_template("<%= nope %>", &context("https://example.com", "1x1"));
        assert!(matches!(result, Err(PagesnapError::Template(_))));
    }

    #[test]
    fn template_rejects_unterminated_marker() {
        let result = render_template("<%= url", &context("https://example.com", "1x1"));
        assert!(matches!(result, Err(PagesnapError::Template(_))));
    }

    #[test]
    fn unused_filename_increments_within_batch() {
        let claimed = DashSet::new();
        assert_eq!(unused_filename(None, "shot.png", &claimed), "shot.png");
        assert_eq!(unused_filename(None, "shot.png", &claimed), "shot (1).png");
        assert_eq!(unused_filename(None, "shot.png", &claimed), "shot (2).png");
    }

    #[test]
    fn unused_filename_checks_destination() {
        let dir = std::env::temp_dir().join(format!("pagesnap-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("shot.png"), b"x").unwrap();

        let claimed = DashSet::new();
        assert_eq!(
            unused_filename(Some(&dir), "shot.png", &claimed),
            "shot (1).png"
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn build_filename_uses_default_template_and_extension() {
        let claimed = DashSet::new();
        let options = CaptureOptions::default();
        let filename = build_filename(
            "https://example.com",
            "1024x768",
            1024,
            768,
            &options,
            None,
            &claimed,
        )
        .unwrap();
        assert_eq!(filename, "example.com-1024x768.png");
    }

    #[test]
    fn build_filename_respects_jpeg_format() {
        let claimed = DashSet::new();
        let options = CaptureOptions {
            format: Some(OutputFormat::Jpeg),
            ..Default::default()
        };
        let filename = build_filename(
            "https://example.com",
            "320x480",
            320,
            480,
            &options,
            None,
            &claimed,
        )
        .unwrap();
        assert_eq!(filename, "example.com-320x480.jpg");
    }
}
