//! Root configuration.

/// Settings for a mounted root.
#[derive(Debug, Clone)]
pub struct RootConfig {
    /// Name recorded on the tracing span of every render pass.
    pub label: String,
    /// How many extra passes a single render may run when continuations
    /// fire during a pass. Exceeding it fails with
    /// [`RenderError::RenderLoop`](crate::error::RenderError::RenderLoop).
    pub max_deferred_passes: usize,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            label: String::from("root"),
            max_deferred_passes: 16,
        }
    }
}

impl RootConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn set_max_deferred_passes(mut self, passes: usize) -> Self {
        self.max_deferred_passes = passes;
        self
    }
}
