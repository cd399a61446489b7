use serde::{Deserialize, Serialize};

pub const DEFAULT_GC_THRESHOLD: usize = 10_000;
pub const MIN_GC_THRESHOLD: usize = 1024;

/// Tunables for a [`Core`](crate::runtime::core::Core) instance.
///
/// Missing fields fall back to their defaults, so an embedder can supply a
/// partial JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Allocations between cooperative collection points.
    pub gc_threshold: usize,
    pub gc_enabled: bool,
    /// Spaces per nesting level when molding contexts.
    pub render_indent: usize,
    /// Whether generic `select`/`find` on contexts compare names exactly.
    pub case_sensitive_lookup: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            gc_threshold: DEFAULT_GC_THRESHOLD,
            gc_enabled: true,
            render_indent: 4,
            case_sensitive_lookup: false,
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// Threshold actually handed to the heap; low values are clamped.
    pub fn effective_gc_threshold(&self) -> usize {
        self.gc_threshold.max(MIN_GC_THRESHOLD)
    }
}
