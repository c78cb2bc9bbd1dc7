//! Release-name parsing capability consumed by grouping and quality
//! ranking. Treated as an opaque external collaborator per the design
//! notes: the core depends only on the shape of [`ParsedRelease`].

/// Structured fields extracted from a torrent's release name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRelease {
    /// Canonical title, normalized for grouping.
    pub title: String,
    /// Release year, if present.
    pub year: Option<i32>,
    /// Series name, for episodic content.
    pub series: Option<String>,
    /// Episode identifier (e.g. `S01E02`), for episodic content.
    pub episode: Option<String>,
    /// Resolution tag (e.g. `1080p`).
    pub resolution: Option<String>,
    /// Source tag (e.g. `BluRay`, `WEB-DL`).
    pub source: Option<String>,
    /// Video codec tag (e.g. `x265`, `HEVC`).
    pub codec: Option<String>,
    /// HDR format tag, if any.
    pub hdr: Option<String>,
    /// Audio codec tag.
    pub audio: Option<String>,
    /// Channel layout tag (e.g. `5.1`).
    pub channels: Option<String>,
    /// Release group tag.
    pub group: Option<String>,
    /// Platform tag, for streaming-service releases.
    pub platform: Option<String>,
    /// Collection or box-set tag.
    pub collection: Option<String>,
}

/// Capability for turning a torrent name into structured release fields.
pub trait ReleaseParser: Send + Sync {
    /// Parse `name`, returning `None` if it cannot be confidently parsed.
    fn parse(&self, name: &str) -> Option<ParsedRelease>;
}
