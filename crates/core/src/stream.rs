use std::fmt;

use crate::types::DbId;

/// Identity of a processed video stream.
///
/// Registered cameras are keyed by their database id. Ad-hoc streams opened
/// by URL have no camera record and are keyed by the URL itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamKey {
    Camera(DbId),
    Url(String),
}

/// Longest URL-derived slug used in evidence object keys.
const MAX_URL_SLUG_LEN: usize = 48;

impl StreamKey {
    pub fn camera_id(&self) -> Option<DbId> {
        match self {
            Self::Camera(id) => Some(*id),
            Self::Url(_) => None,
        }
    }

    /// Filesystem and object-key safe identifier for this stream.
    pub fn slug(&self) -> String {
        match self {
            Self::Camera(id) => id.to_string(),
            Self::Url(url) => {
                let body = url.split_once("://").map_or(url.as_str(), |(_, rest)| rest);
                let cleaned: String = body
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
                    .take(MAX_URL_SLUG_LEN)
                    .collect();
                format!("url-{}", cleaned.trim_matches('-'))
            }
        }
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera(id) => write!(f, "camera:{id}"),
            Self::Url(url) => write!(f, "url:{url}"),
        }
    }
}
