//! The three-level cache hierarchy.
//!
//! - **L1** - encoded preview buffers keyed by render identity, evicted
//!   by byte-budget LRU
//! - **L2** - per-stage `LinearImage` outputs keyed by
//!   `(stage, parameter hash, upstream identity)`, bounded entry count
//! - **L3** - the single decoded source image, replaced wholesale;
//!   replacement cascades a full L1/L2 clear
//!
//! Validity is checked on every read: an entry serves a hit only when
//! its stored parameter hash matches the hash of the current parameters
//! for that stage *and* its upstream identity matches the image that
//! would feed the stage right now. Anything else is a miss — including
//! corruption, which is indistinguishable from staleness by design and
//! silently recomputed.
//!
//! Reads vastly outnumber writes (UI-thread stats and preview queries
//! against a background render), so every level sits behind its own
//! `RwLock` and writes replace whole entries atomically.

use std::collections::VecDeque;

use parking_lot::RwLock;
use revela_core::{LinearImage, Rgba8Buffer, SourceMetadata};
use revela_params::{OutputId, ParameterHash, ProcessingStage};
use tracing::{debug, trace};

/// Identity of one finished render, keying the L1 preview cache.
///
/// The final output id already chains the source, every stage hash, and
/// the stage order, so it is the render request identity; the encode
/// flags distinguish dithered from plain encodes of the same pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderKey {
    /// Output identity of the final stage.
    pub output: OutputId,
    /// Whether the encode was dithered.
    pub dithered: bool,
}

/// One L2 entry: a stage output plus its validity key.
struct StageEntry {
    stage: ProcessingStage,
    params: ParameterHash,
    upstream: OutputId,
    image: LinearImage,
}

struct PreviewEntry {
    key: RenderKey,
    buffer: Rgba8Buffer,
}

/// The decoded source and its identity.
struct SourceSlot {
    id: OutputId,
    image: LinearImage,
    metadata: SourceMetadata,
    /// Downscaled preview bases, one per ladder level, built lazily.
    preview_bases: Vec<Option<(OutputId, LinearImage)>>,
}

/// Counters shared across levels, readable from any thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// L1 preview hits.
    pub l1_hits: u64,
    /// L1 preview misses.
    pub l1_misses: u64,
    /// L2 stage hits.
    pub l2_hits: u64,
    /// L2 stage misses (including validity failures).
    pub l2_misses: u64,
    /// Entries evicted from any level.
    pub evictions: u64,
}

/// The session-owned cache hierarchy.
pub struct CacheHierarchy {
    enabled: bool,
    l1_budget: usize,
    l2_slots: usize,
    l1: RwLock<VecDeque<PreviewEntry>>,
    l2: RwLock<VecDeque<StageEntry>>,
    l3: RwLock<Option<SourceSlot>>,
    stats: RwLock<CacheStats>,
}

impl CacheHierarchy {
    /// Creates an empty hierarchy.
    ///
    /// With `enabled` false every lookup misses and every store is a
    /// no-op; the L3 source slot still works, since the engine cannot
    /// render without a source.
    pub fn new(enabled: bool, l1_budget: usize, l2_slots: usize) -> Self {
        Self {
            enabled,
            l1_budget,
            l2_slots: l2_slots.max(1),
            l1: RwLock::new(VecDeque::new()),
            l2: RwLock::new(VecDeque::new()),
            l3: RwLock::new(None),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        *self.stats.read()
    }

    // --- L3: source ---

    /// Replaces the source image, cascading a full L1/L2 clear.
    pub fn set_source(
        &self,
        id: OutputId,
        image: LinearImage,
        metadata: SourceMetadata,
        ladder_levels: usize,
    ) {
        debug!(%id, "replacing source image, clearing derived caches");
        *self.l3.write() = Some(SourceSlot {
            id,
            image,
            metadata,
            preview_bases: vec![None; ladder_levels],
        });
        self.clear_derived();
    }

    /// The current source identity, if a source is loaded.
    pub fn source_id(&self) -> Option<OutputId> {
        self.l3.read().as_ref().map(|s| s.id)
    }

    /// Clones the current source image.
    pub fn source_image(&self) -> Option<LinearImage> {
        self.l3.read().as_ref().map(|s| s.image.clone())
    }

    /// The current source metadata.
    pub fn source_metadata(&self) -> Option<SourceMetadata> {
        self.l3.read().as_ref().map(|s| s.metadata.clone())
    }

    /// The cached preview base for a ladder level, if built.
    pub fn preview_base(&self, level: usize) -> Option<(OutputId, LinearImage)> {
        let l3 = self.l3.read();
        let slot = l3.as_ref()?;
        slot.preview_bases
            .get(level)?
            .as_ref()
            .map(|(id, img)| (*id, img.clone()))
    }

    /// Stores the preview base for a ladder level.
    pub fn store_preview_base(&self, level: usize, id: OutputId, image: LinearImage) {
        if let Some(slot) = self.l3.write().as_mut() {
            if let Some(base) = slot.preview_bases.get_mut(level) {
                *base = Some((id, image));
            }
        }
    }

    /// Clears everything derived from the source (L1, L2, preview
    /// bases), keeping the source itself.
    pub fn clear_derived(&self) {
        self.l1.write().clear();
        self.l2.write().clear();
        if let Some(slot) = self.l3.write().as_mut() {
            for base in &mut slot.preview_bases {
                *base = None;
            }
        }
    }

    // --- L2: stage outputs ---

    /// Looks up a stage output. A hit requires the exact parameter hash
    /// and upstream identity.
    pub fn get_stage(
        &self,
        stage: ProcessingStage,
        params: ParameterHash,
        upstream: OutputId,
    ) -> Option<LinearImage> {
        if !self.enabled {
            return None;
        }
        let l2 = self.l2.read();
        let hit = l2
            .iter()
            .find(|e| e.stage == stage && e.params == params && e.upstream == upstream)
            .map(|e| e.image.clone());
        drop(l2);

        let mut stats = self.stats.write();
        if hit.is_some() {
            stats.l2_hits += 1;
            trace!(%stage, "stage cache hit");
        } else {
            stats.l2_misses += 1;
        }
        hit
    }

    /// Stores a stage output, evicting the oldest entry past the slot
    /// bound. An existing entry for the same stage is replaced — only
    /// the newest output per stage is ever useful.
    pub fn put_stage(
        &self,
        stage: ProcessingStage,
        params: ParameterHash,
        upstream: OutputId,
        image: LinearImage,
    ) {
        if !self.enabled {
            return;
        }
        let mut l2 = self.l2.write();
        if let Some(pos) = l2.iter().position(|e| e.stage == stage) {
            l2.remove(pos);
        }
        l2.push_back(StageEntry {
            stage,
            params,
            upstream,
            image,
        });
        let mut evicted = 0u64;
        while l2.len() > self.l2_slots {
            l2.pop_front();
            evicted += 1;
        }
        drop(l2);
        if evicted > 0 {
            self.stats.write().evictions += evicted;
        }
    }

    /// Drops the oldest L2 entry, freeing its buffer. Used by the
    /// memory-pressure path.
    pub fn evict_oldest_stage(&self) -> bool {
        let mut l2 = self.l2.write();
        let dropped = l2.pop_front().is_some();
        drop(l2);
        if dropped {
            self.stats.write().evictions += 1;
        }
        dropped
    }

    // --- L1: encoded previews ---

    /// Looks up an encoded preview by render identity.
    pub fn get_preview(&self, key: RenderKey) -> Option<Rgba8Buffer> {
        if !self.enabled {
            return None;
        }
        let mut l1 = self.l1.write();
        let hit = if let Some(pos) = l1.iter().position(|e| e.key == key) {
            // LRU touch: move to the back.
            let entry = l1.remove(pos).expect("position just found");
            let buffer = entry.buffer.clone();
            l1.push_back(entry);
            Some(buffer)
        } else {
            None
        };
        drop(l1);

        let mut stats = self.stats.write();
        if hit.is_some() {
            stats.l1_hits += 1;
        } else {
            stats.l1_misses += 1;
        }
        hit
    }

    /// Stores an encoded preview, evicting least-recently-used entries
    /// past the byte budget.
    pub fn put_preview(&self, key: RenderKey, buffer: Rgba8Buffer) {
        if !self.enabled {
            return;
        }
        let mut l1 = self.l1.write();
        if let Some(pos) = l1.iter().position(|e| e.key == key) {
            l1.remove(pos);
        }
        l1.push_back(PreviewEntry { key, buffer });

        let mut total: usize = l1.iter().map(|e| e.buffer.byte_size()).sum();
        let mut evicted = 0u64;
        while total > self.l1_budget && l1.len() > 1 {
            if let Some(old) = l1.pop_front() {
                total -= old.buffer.byte_size();
                evicted += 1;
            }
        }
        drop(l1);
        if evicted > 0 {
            self.stats.write().evictions += evicted;
        }
    }

    /// Current L1 footprint in bytes.
    pub fn l1_bytes(&self) -> usize {
        self.l1.read().iter().map(|e| e.buffer.byte_size()).sum()
    }

    /// Current L2 entry count.
    pub fn l2_len(&self) -> usize {
        self.l2.read().len()
    }
}
