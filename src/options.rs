use serde::{Deserialize, Serialize};

/// Default cap on the summary scratch buffer: 256 MiB.
pub const DEFAULT_MAX_SUMMARY_SIZE: u32 = 256 * 1024 * 1024;

/// What the dispatcher does with a block type it has no decoder for
/// (ARRAY, RUN_INFO, SOURCE, NULL, unrecognised tags).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownBlockPolicy {
    /// Fail with `UnknownBlockType`; the node stays header-decoded.
    #[default]
    Error,
    /// Mark the node `Skipped` so every later dispatch returns at once.
    Skip,
}

/// Configuration for [`Session::with_options`](crate::session::Session::with_options).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    pub unknown_blocks:   UnknownBlockPolicy,
    /// Summary regions declared larger than this are treated as corrupt.
    pub max_summary_size: u32,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            unknown_blocks:   UnknownBlockPolicy::Error,
            max_summary_size: DEFAULT_MAX_SUMMARY_SIZE,
        }
    }
}

impl ReaderOptions {
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
