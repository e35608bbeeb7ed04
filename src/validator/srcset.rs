//! `srcset` micro-grammar
//!
//! A srcset is a comma-separated list of image candidates, each a URL
//! followed by at most one descriptor: a width (`300w`, integer, at least
//! 1) or a pixel density (`1.5x`, positive). A candidate without a
//! descriptor means `1x`.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

use crate::layout::format_number;

static WIDTH_DESCRIPTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)w$").expect("BUG: hardcoded width descriptor regex is invalid")
});

static DENSITY_DESCRIPTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?|\.\d+)x$").expect("BUG: hardcoded density descriptor regex is invalid")
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Descriptor {
    Width(u32),
    Density(f64),
}

impl Descriptor {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim().to_ascii_lowercase();
        if text.is_empty() {
            return Some(Descriptor::Density(1.0));
        }
        if let Some(caps) = WIDTH_DESCRIPTOR.captures(&text) {
            return caps[1]
                .parse::<u32>()
                .ok()
                .filter(|width| *width >= 1)
                .map(Descriptor::Width);
        }
        if let Some(caps) = DENSITY_DESCRIPTOR.captures(&text) {
            return caps[1]
                .parse::<f64>()
                .ok()
                .filter(|density| *density > 0.0)
                .map(Descriptor::Density);
        }
        None
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Width(width) => write!(f, "{width}w"),
            Descriptor::Density(density) => write!(f, "{}x", format_number(*density)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub url: String,
    pub descriptor: Descriptor,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.url, self.descriptor)
    }
}

/// Parsed and de-duplicated srcset
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Srcset {
    pub candidates: Vec<Candidate>,
    /// Candidates whose descriptor was already used by a different URL.
    /// They are also kept in `candidates`.
    pub duplicates: Vec<Candidate>,
}

impl Srcset {
    /// First candidate URL, the one used when `src` is missing.
    #[must_use]
    pub fn first_url(&self) -> Option<&str> {
        self.candidates.first().map(|c| c.url.as_str())
    }
}

impl fmt::Display for Srcset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, candidate) in self.candidates.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{candidate}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SrcsetError {
    #[error("srcset has no image candidates")]
    Empty,
    #[error("invalid descriptor '{descriptor}' for {url}")]
    InvalidDescriptor { url: String, descriptor: String },
}

/// Parse a srcset value.
///
/// Exact duplicates (same URL and descriptor) are dropped. A descriptor
/// reused by a different URL keeps both candidates and is reported in
/// [`Srcset::duplicates`].
///
/// # Errors
///
/// Fails on an empty value or on any candidate with an invalid
/// descriptor.
pub fn parse(value: &str) -> Result<Srcset, SrcsetError> {
    let mut srcset = Srcset::default();

    for (url, descriptor) in split_candidates(value) {
        let descriptor = Descriptor::parse(descriptor).ok_or_else(|| {
            SrcsetError::InvalidDescriptor {
                url: url.to_string(),
                descriptor: descriptor.trim().to_string(),
            }
        })?;
        let candidate = Candidate {
            url: url.to_string(),
            descriptor,
        };

        let mut same_descriptor = srcset
            .candidates
            .iter()
            .filter(|existing| existing.descriptor == descriptor);
        if same_descriptor.clone().any(|existing| existing.url == candidate.url) {
            continue;
        }
        if same_descriptor.next().is_some() {
            srcset.duplicates.push(candidate.clone());
        }
        srcset.candidates.push(candidate);
    }

    if srcset.candidates.is_empty() {
        return Err(SrcsetError::Empty);
    }
    Ok(srcset)
}

/// Split into (url, descriptor text) pairs. URLs run to the next
/// whitespace; a comma glued to the end of a URL ends the candidate.
fn split_candidates(value: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    let mut rest = value;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }
        let url_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let raw_url = &rest[..url_end];
        let url = raw_url.trim_end_matches(',');
        if url.len() != raw_url.len() {
            pairs.push((url, ""));
            rest = &rest[url_end..];
            continue;
        }
        rest = &rest[url_end..];
        let descriptor_end = rest.find(',').unwrap_or(rest.len());
        pairs.push((url, &rest[..descriptor_end]));
        rest = &rest[descriptor_end..];
    }
    pairs
}
