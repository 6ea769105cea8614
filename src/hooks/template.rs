//! Single-placeholder URL templates.
//!
//! A hook URL carries exactly one `%v` marker where the record identifier is
//! spliced in.  The template is split once at load time so rendering can
//! never fail and never sees a second marker.

use std::fmt;
use std::str::FromStr;

use memchr::memmem;

/// Marker substituted with the record identifier.
pub const PLACEHOLDER: &str = "%v";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("url template has no %v placeholder")]
    MissingPlaceholder,
    #[error("url template has {0} %v placeholders, expected exactly one")]
    TooManyPlaceholders(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    prefix: String,
    suffix: String,
}

impl UrlTemplate {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let mut hits = memmem::find_iter(raw.as_bytes(), PLACEHOLDER.as_bytes());
        let at = hits.next().ok_or(TemplateError::MissingPlaceholder)?;
        let extra = hits.count();
        if extra > 0 {
            return Err(TemplateError::TooManyPlaceholders(extra + 1));
        }
        Ok(Self {
            prefix: raw[..at].to_string(),
            suffix: raw[at + PLACEHOLDER.len()..].to_string(),
        })
    }

    /// Insert `record_id` verbatim.  No escaping is applied; callers supply
    /// identifiers that are already safe for the target URL.
    pub fn render(&self, record_id: &str) -> String {
        let mut url = String::with_capacity(self.prefix.len() + record_id.len() + self.suffix.len());
        url.push_str(&self.prefix);
        url.push_str(record_id);
        url.push_str(&self.suffix);
        url
    }
}

impl FromStr for UrlTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prefix, PLACEHOLDER, self.suffix)
    }
}
