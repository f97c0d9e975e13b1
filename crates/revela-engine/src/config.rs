//! Engine configuration.

use revela_compute::DispatchConfig;

/// Default L1 preview-cache byte budget: 50 MB.
pub const DEFAULT_L1_BUDGET: usize = 50 * 1024 * 1024;

/// Default L2 stage-cache entry count.
pub const DEFAULT_L2_SLOTS: usize = 3;

/// Default edit-coalescing window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Default preview resolution ladder, longest-side pixels. Memory
/// pressure steps down the ladder.
pub const DEFAULT_PREVIEW_LADDER: [u32; 3] = [1200, 800, 600];

/// Engine configuration: cache budgets, dispatch policy, debounce.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Master switch for the whole cache hierarchy.
    pub cache_enabled: bool,
    /// L1 preview byte budget.
    pub l1_budget_bytes: usize,
    /// L2 stage-output entry count.
    pub l2_slots: usize,
    /// Edit-coalescing window.
    pub debounce_ms: u64,
    /// Preview resolution ladder, longest side, descending.
    pub preview_ladder: Vec<u32>,
    /// Bilateral dispatch policy (fast/GPU thresholds, result cache).
    pub dispatch: DispatchConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            l1_budget_bytes: DEFAULT_L1_BUDGET,
            l2_slots: DEFAULT_L2_SLOTS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            preview_ladder: DEFAULT_PREVIEW_LADDER.to_vec(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Starts a builder from the defaults.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }
}

/// Builder with clamped setters.
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Enable or disable the cache hierarchy.
    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.config.cache_enabled = enabled;
        self
    }

    /// Set the L1 preview byte budget. Clamped to at least 1 MB.
    pub fn l1_budget_bytes(mut self, bytes: usize) -> Self {
        self.config.l1_budget_bytes = bytes.max(1024 * 1024);
        self
    }

    /// Set the L2 stage-output slot count. Clamped to at least 1.
    pub fn l2_slots(mut self, slots: usize) -> Self {
        self.config.l2_slots = slots.max(1);
        self
    }

    /// Set the edit-coalescing window in milliseconds.
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.debounce_ms = ms;
        self
    }

    /// Set the preview resolution ladder. Must be non-empty; entries are
    /// sorted descending so pressure always steps downward.
    pub fn preview_ladder(mut self, mut ladder: Vec<u32>) -> Self {
        if !ladder.is_empty() {
            ladder.sort_unstable_by(|a, b| b.cmp(a));
            self.config.preview_ladder = ladder;
        }
        self
    }

    /// Enable or disable the fast bilateral path.
    pub fn fast_bilateral(mut self, enabled: bool) -> Self {
        self.config.dispatch.fast_enabled = enabled;
        self
    }

    /// Set the fast-path sigma threshold.
    pub fn fast_sigma_threshold(mut self, sigma: f32) -> Self {
        self.config.dispatch.fast_sigma_threshold = sigma.max(0.0);
        self
    }

    /// Enable or disable the GPU bilateral path.
    pub fn gpu(mut self, enabled: bool) -> Self {
        self.config.dispatch.gpu_enabled = enabled;
        self
    }

    /// Set the GPU pixel-count threshold.
    pub fn gpu_pixel_threshold(mut self, pixels: usize) -> Self {
        self.config.dispatch.gpu_pixel_threshold = pixels;
        self
    }

    /// Finish the builder.
    pub fn build(mut self) -> EngineConfig {
        // A disabled hierarchy implies no dispatcher result cache either.
        if !self.config.cache_enabled {
            self.config.dispatch.cache_enabled = false;
        }
        self.config
    }
}
