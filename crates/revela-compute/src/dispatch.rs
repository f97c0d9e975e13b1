//! Bilateral kernel dispatch.
//!
//! Picks one of three implementations per call: the exact CPU filter,
//! the fast downsample path, or the GPU compute path. The GPU path is
//! opportunistic — any initialization or dispatch failure falls back to
//! the CPU transparently, at most once per call. Usage statistics per
//! path feed threshold tuning.

use std::hash::Hasher;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use revela_core::LinearImage;
use revela_ops::{bilateral_fast, bilateral_standard};
use siphasher::sip128::{Hasher128, SipHasher13};
#[cfg(feature = "wgpu")]
use tracing::{debug, warn};

#[cfg(feature = "wgpu")]
use crate::gpu::GpuBilateral;

/// Dispatch policy.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    /// Keep recent results and reuse them on identical calls.
    pub cache_enabled: bool,
    /// Allow the fast downsample path.
    pub fast_enabled: bool,
    /// Spatial sigma at or above which the fast path engages.
    pub fast_sigma_threshold: f32,
    /// Allow the GPU path.
    pub gpu_enabled: bool,
    /// Pixel count at or above which the GPU path engages.
    pub gpu_pixel_threshold: usize,
    /// Bounded result-cache entry count.
    pub cache_entries: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            fast_enabled: true,
            fast_sigma_threshold: 4.5,
            gpu_enabled: true,
            gpu_pixel_threshold: 1_500_000,
            cache_entries: 4,
        }
    }
}

/// Which implementation served a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BilateralPath {
    /// Exact CPU filter.
    Standard,
    /// Downsample/filter/upsample CPU filter.
    Fast,
    /// wgpu compute dispatch.
    Gpu,
}

/// Counters for one path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathStats {
    /// Calls served by this path.
    pub calls: u64,
    /// Total time spent, for the average.
    pub total: Duration,
}

impl PathStats {
    /// Average duration per call, zero when unused.
    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total / self.calls as u32
        }
    }
}

/// Aggregate usage statistics, cheap to snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageStats {
    /// Exact CPU path.
    pub standard: PathStats,
    /// Fast CPU path.
    pub fast: PathStats,
    /// GPU path (successful dispatches only).
    pub gpu: PathStats,
    /// GPU attempts that fell back to the CPU.
    pub gpu_fallbacks: u64,
    /// Result-cache hits.
    pub cache_hits: u64,
    /// Result-cache misses.
    pub cache_misses: u64,
}

/// Cache key: exact call identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CallKey {
    content: u128,
    spatial_bits: u32,
    range_bits: u32,
}

struct CacheEntry {
    key: CallKey,
    image: LinearImage,
}

/// Strategy-selecting bilateral filter front end.
///
/// Owns the lazily initialized GPU backend, the bounded result cache,
/// and the usage counters. Reads (stats snapshots) are safe concurrent
/// with a render thread dispatching filters.
pub struct BilateralDispatcher {
    config: DispatchConfig,
    stats: Mutex<UsageStats>,
    cache: RwLock<Vec<CacheEntry>>,
    #[cfg(feature = "wgpu")]
    gpu: Mutex<GpuState>,
}

#[cfg(feature = "wgpu")]
enum GpuState {
    /// Not yet attempted.
    Untried,
    /// Device and pipeline live.
    Ready(GpuBilateral),
    /// Initialization failed; do not retry every call.
    Failed,
}

impl BilateralDispatcher {
    /// Creates a dispatcher with the given policy.
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            stats: Mutex::new(UsageStats::default()),
            cache: RwLock::new(Vec::new()),
            #[cfg(feature = "wgpu")]
            gpu: Mutex::new(GpuState::Untried),
        }
    }

    /// The active policy.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Snapshot of the usage counters.
    pub fn stats(&self) -> UsageStats {
        *self.stats.lock()
    }

    /// Clears the result cache.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// Runs the bilateral filter, choosing a path per the policy.
    pub fn filter(&self, src: &LinearImage, spatial_sigma: f32, range_sigma: f32) -> LinearImage {
        let key = self.config.cache_enabled.then(|| CallKey {
            content: content_hash(src),
            spatial_bits: spatial_sigma.to_bits(),
            range_bits: range_sigma.to_bits(),
        });

        if let Some(key) = key {
            if let Some(hit) = self.cache_lookup(&key) {
                self.stats.lock().cache_hits += 1;
                return hit;
            }
            self.stats.lock().cache_misses += 1;
        }

        let started = Instant::now();
        let (out, path) = self.run(src, spatial_sigma, range_sigma);
        let elapsed = started.elapsed();

        {
            let mut stats = self.stats.lock();
            let slot = match path {
                BilateralPath::Standard => &mut stats.standard,
                BilateralPath::Fast => &mut stats.fast,
                BilateralPath::Gpu => &mut stats.gpu,
            };
            slot.calls += 1;
            slot.total += elapsed;
        }

        if let Some(key) = key {
            self.cache_insert(key, out.clone());
        }
        out
    }

    /// Path selection: GPU for large images, fast for large sigmas,
    /// standard otherwise.
    fn run(&self, src: &LinearImage, ss: f32, rs: f32) -> (LinearImage, BilateralPath) {
        if self.config.gpu_enabled && src.pixel_count() >= self.config.gpu_pixel_threshold {
            match self.try_gpu(src, ss, rs) {
                Some(out) => return (out, BilateralPath::Gpu),
                None => self.stats.lock().gpu_fallbacks += 1,
            }
        }

        if self.config.fast_enabled && ss >= self.config.fast_sigma_threshold {
            (bilateral_fast(src, ss, rs), BilateralPath::Fast)
        } else {
            (bilateral_standard(src, ss, rs), BilateralPath::Standard)
        }
    }

    #[cfg(feature = "wgpu")]
    fn try_gpu(&self, src: &LinearImage, ss: f32, rs: f32) -> Option<LinearImage> {
        let mut state = self.gpu.lock();
        if matches!(*state, GpuState::Untried) {
            *state = match GpuBilateral::new() {
                Ok(gpu) => {
                    debug!("GPU bilateral backend initialized");
                    GpuState::Ready(gpu)
                }
                Err(e) => {
                    warn!(error = %e, "GPU bilateral unavailable, using CPU paths");
                    GpuState::Failed
                }
            };
        }

        match &*state {
            GpuState::Ready(gpu) => match gpu.filter(src, ss, rs) {
                Ok(out) => Some(out),
                Err(e) => {
                    // Dispatch failures (device loss) poison the backend;
                    // every later call goes straight to the CPU.
                    warn!(error = %e, "GPU bilateral dispatch failed, falling back to CPU");
                    *state = GpuState::Failed;
                    None
                }
            },
            _ => None,
        }
    }

    #[cfg(not(feature = "wgpu"))]
    fn try_gpu(&self, _src: &LinearImage, _ss: f32, _rs: f32) -> Option<LinearImage> {
        None
    }

    fn cache_lookup(&self, key: &CallKey) -> Option<LinearImage> {
        let cache = self.cache.read();
        cache
            .iter()
            .find(|e| e.key == *key)
            .map(|e| e.image.clone())
    }

    fn cache_insert(&self, key: CallKey, image: LinearImage) {
        let mut cache = self.cache.write();
        if let Some(pos) = cache.iter().position(|e| e.key == key) {
            cache.remove(pos);
        }
        cache.push(CacheEntry { key, image });
        // Oldest-first eviction under the bounded entry count.
        while cache.len() > self.config.cache_entries.max(1) {
            cache.remove(0);
        }
    }
}

impl Default for BilateralDispatcher {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

/// 128-bit digest of the image content and dimensions.
fn content_hash(img: &LinearImage) -> u128 {
    let mut h = SipHasher13::new_with_keys(0x6269_6c61_7465_7261, 0x6c2d_6361_6368_6521);
    let (w, hgt) = img.dimensions();
    h.write_u32(w);
    h.write_u32(hgt);
    let (r, g, b) = img.planes();
    for plane in [r, g, b] {
        for &v in plane {
            h.write_u32(v.to_bits());
        }
    }
    h.finish128().as_u128()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_only(cache: bool) -> BilateralDispatcher {
        BilateralDispatcher::new(DispatchConfig {
            cache_enabled: cache,
            gpu_enabled: false,
            ..DispatchConfig::default()
        })
    }

    fn noisy(w: u32, h: u32) -> LinearImage {
        let mut img = LinearImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = 0.4 + ((x * 13 + y * 7) % 9) as f32 * 0.02;
                img.set_pixel(x, y, [v, v, v]);
            }
        }
        img
    }

    #[test]
    fn test_small_sigma_uses_standard_path() {
        let d = cpu_only(false);
        let img = noisy(16, 16);
        let out = d.filter(&img, 2.0, 0.3);
        assert_eq!(out, bilateral_standard(&img, 2.0, 0.3));

        let stats = d.stats();
        assert_eq!(stats.standard.calls, 1);
        assert_eq!(stats.fast.calls, 0);
        assert_eq!(stats.gpu.calls, 0);
    }

    #[test]
    fn test_large_sigma_uses_fast_path() {
        let d = cpu_only(false);
        let img = noisy(32, 32);
        let out = d.filter(&img, 6.0, 0.3);
        assert_eq!(out, bilateral_fast(&img, 6.0, 0.3));
        assert_eq!(d.stats().fast.calls, 1);
    }

    #[test]
    fn test_fast_disabled_forces_standard() {
        let d = BilateralDispatcher::new(DispatchConfig {
            cache_enabled: false,
            fast_enabled: false,
            gpu_enabled: false,
            ..DispatchConfig::default()
        });
        let img = noisy(16, 16);
        d.filter(&img, 10.0, 0.3);
        assert_eq!(d.stats().standard.calls, 1);
        assert_eq!(d.stats().fast.calls, 0);
    }

    #[test]
    fn test_cache_hit_on_identical_call() {
        let d = cpu_only(true);
        let img = noisy(16, 16);
        let a = d.filter(&img, 2.0, 0.3);
        let b = d.filter(&img, 2.0, 0.3);
        assert_eq!(a, b);

        let stats = d.stats();
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cache_hits, 1);
        // Only the first call actually computed.
        assert_eq!(stats.standard.calls, 1);
    }

    #[test]
    fn test_cache_misses_on_different_sigma() {
        let d = cpu_only(true);
        let img = noisy(16, 16);
        d.filter(&img, 2.0, 0.3);
        d.filter(&img, 2.5, 0.3);
        let stats = d.stats();
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.cache_misses, 2);
    }

    #[test]
    fn test_cache_misses_on_different_content() {
        let d = cpu_only(true);
        let a = noisy(16, 16);
        let mut b = a.clone();
        b.set_pixel(3, 3, [0.9, 0.9, 0.9]);
        d.filter(&a, 2.0, 0.3);
        d.filter(&b, 2.0, 0.3);
        assert_eq!(d.stats().cache_hits, 0);
    }

    #[test]
    fn test_cache_bounded() {
        let d = BilateralDispatcher::new(DispatchConfig {
            cache_enabled: true,
            cache_entries: 2,
            gpu_enabled: false,
            ..DispatchConfig::default()
        });
        let img = noisy(12, 12);
        d.filter(&img, 1.0, 0.3);
        d.filter(&img, 2.0, 0.3);
        d.filter(&img, 3.0, 0.3); // evicts the sigma=1 entry

        d.filter(&img, 1.0, 0.3);
        let stats = d.stats();
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.cache_misses, 4);

        // The two newest entries are still hot.
        d.filter(&img, 3.0, 0.3);
        assert_eq!(d.stats().cache_hits, 1);
    }

    #[test]
    fn test_clear_cache() {
        let d = cpu_only(true);
        let img = noisy(12, 12);
        d.filter(&img, 2.0, 0.3);
        d.clear_cache();
        d.filter(&img, 2.0, 0.3);
        assert_eq!(d.stats().cache_hits, 0);
        assert_eq!(d.stats().cache_misses, 2);
    }

    #[test]
    fn test_average_duration() {
        let mut stats = PathStats::default();
        assert_eq!(stats.average(), Duration::ZERO);
        stats.calls = 2;
        stats.total = Duration::from_millis(10);
        assert_eq!(stats.average(), Duration::from_millis(5));
    }

    #[test]
    fn test_gpu_disabled_never_counts_fallback() {
        let d = cpu_only(false);
        let img = noisy(16, 16);
        d.filter(&img, 2.0, 0.3);
        assert_eq!(d.stats().gpu_fallbacks, 0);
    }
}
