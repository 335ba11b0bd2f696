//! Size-token classification and resolution.
//!
//! A source's raw size tokens fall into three disjoint categories: explicit
//! `<width>x<height>` dimensions, named device keywords, and the literal
//! `w3counter` popular-resolutions token. Explicit tokens are used as-is
//! (case-normalized); keywords expand through the device-viewport provider;
//! the popular-resolutions fallback only triggers when a source carries no
//! explicit sizes at all.

use crate::{PagesnapError, ProviderCache};

/// The popular-resolutions trigger token.
pub const RESOLUTION_FALLBACK_TOKEN: &str = "w3counter";

fn is_dimension(part: &str) -> bool {
    (2..=4).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit())
}

/// Whether a token matches the explicit `\d{2,4}x\d{2,4}` size pattern,
/// case-insensitively.
pub fn is_explicit_size(token: &str) -> bool {
    match token.split_once(['x', 'X']) {
        Some((width, height)) => is_dimension(width) && is_dimension(height),
        None => false,
    }
}

/// Split an explicit size string into numeric width and height.
pub fn split_size(size: &str) -> Result<(u32, u32), PagesnapError> {
    let (width, height) = size
        .split_once(['x', 'X'])
        .ok_or_else(|| PagesnapError::InvalidSize(size.to_string()))?;

    let width = width
        .parse()
        .map_err(|_| PagesnapError::InvalidSize(size.to_string()))?;
    let height = height
        .parse()
        .map_err(|_| PagesnapError::InvalidSize(size.to_string()))?;

    Ok((width, height))
}

fn dedup_preserving_order(tokens: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for token in tokens {
        if !seen.contains(token) {
            seen.push(token.clone());
        }
    }
    seen
}

/// Raw tokens classified into explicit sizes and keyword candidates.
///
/// Explicit sizes are lowercased and deduplicated preserving first
/// occurrence; keywords are the set difference between the deduplicated
/// token list and the explicit subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedSizes {
    pub explicit: Vec<String>,
    pub keywords: Vec<String>,
}

pub fn classify_sizes(tokens: &[String]) -> ClassifiedSizes {
    let deduped = dedup_preserving_order(tokens);

    let mut explicit = Vec::new();
    let mut keywords = Vec::new();
    for token in deduped {
        if is_explicit_size(&token) {
            let normalized = token.to_ascii_lowercase();
            if !explicit.contains(&normalized) {
                explicit.push(normalized);
            }
        } else {
            keywords.push(token);
        }
    }

    ClassifiedSizes { explicit, keywords }
}

/// Resolve a source's raw size tokens to concrete sizes.
///
/// Resolution order: the popular-resolutions fallback when no explicit sizes
/// were given and the `w3counter` token is present, otherwise the keyword
/// path when any keywords remain, otherwise the explicit sizes directly.
/// Lookup failures propagate; the caller aborts the whole run on any of them.
pub async fn resolve_sizes(
    tokens: &[String],
    cache: &ProviderCache,
) -> Result<Vec<String>, PagesnapError> {
    let ClassifiedSizes {
        explicit,
        mut keywords,
    } = classify_sizes(tokens);

    if explicit.is_empty()
        && keywords
            .iter()
            .any(|keyword| keyword == RESOLUTION_FALLBACK_TOKEN)
    {
        let resolutions = cache.top_resolutions().await?;
        return Ok(dedup_preserving_order(
            &resolutions
                .iter()
                .map(|size| size.to_ascii_lowercase())
                .collect::<Vec<_>>(),
        ));
    }

    // With explicit sizes present the fallback token expands to nothing; it
    // is not a device keyword either.
    keywords.retain(|keyword| keyword != RESOLUTION_FALLBACK_TOKEN);

    if !keywords.is_empty() {
        let mut sizes = explicit;
        for size in cache.viewports(&keywords).await? {
            let normalized = size.to_ascii_lowercase();
            if !sizes.contains(&normalized) {
                sizes.push(normalized);
            }
        }
        return Ok(sizes);
    }

    Ok(explicit)
}
