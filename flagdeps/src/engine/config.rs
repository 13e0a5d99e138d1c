use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Configuration for an [`Engine`](super::Engine).
///
/// Deserializes from any serde format; missing fields take their defaults.
///
/// ```
/// use flagdeps::engine::EngineConfig;
///
/// let config = EngineConfig::default().with_max_traversal_steps(10_000);
/// assert_eq!(config.max_traversal_steps, Some(10_000));
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on nodes visited by one operation's graph walks.
    /// `None` means unbounded.
    pub max_traversal_steps: Option<usize>,

    /// Token that aborts in-flight graph walks when cancelled.
    #[serde(skip)]
    pub cancellation: Option<CancellationToken>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON configuration document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_max_traversal_steps(mut self, max_steps: usize) -> Self {
        self.max_traversal_steps = Some(max_steps);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}
