//! Configuration for font subsetting.

/// Font subsetting configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubsetConfig {
    /// The font is symbolic: select the Windows Symbol (3,0) cmap sub-table
    /// instead of Windows Unicode (3,1).
    pub symbolic: bool,
}

impl SubsetConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the font as symbolic.
    pub fn with_symbolic(mut self, enable: bool) -> Self {
        self.symbolic = enable;
        self
    }

    /// The cmap encoding ID searched for during sub-table selection.
    pub fn cmap_encoding_id(&self) -> u16 {
        if self.symbolic {
            0
        } else {
            1
        }
    }
}
