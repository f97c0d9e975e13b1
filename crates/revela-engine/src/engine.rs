//! The incremental render orchestrator.
//!
//! One engine owns one editing session: its source image, its cache
//! hierarchy, its bilateral dispatcher, and its bounded worker pool.
//! Engines are constructed explicitly and passed by ownership — two
//! sessions are two engines, torn down independently.
//!
//! A render request walks the state machine `Idle → PlanBuilt →
//! Executing(stage) → Done | Failed`:
//!
//! 1. diff the new snapshot against the last rendered one
//! 2. empty plan → serve the cached preview unchanged
//! 3. seed from the cached output of the stage before the start stage,
//!    or from the (ladder-scaled) source for a full run
//! 4. run the planned stages in order, caching cacheable outputs
//! 5. encode to 8-bit, optionally dithered
//! 6. report what ran, what was skipped, and what the caches did
//!
//! A failed or cancelled stage aborts the chain without touching the
//! caches, so the hierarchy only ever holds outputs of completed stages
//! for the exact parameters that produced them.

use std::time::{Duration, Instant};

use parking_lot::RwLock;
use revela_compute::{BilateralDispatcher, UsageStats};
use revela_core::{LinearImage, Rgba8Buffer, SourceMetadata};
use revela_ops::{
    bilateral_fast,
    color::{ColorParams, apply_color},
    curves::apply_curves,
    details::{DetailsParams, apply_details_with},
    effects::{EffectsParams, apply_effects_with},
    geometry::apply_orientation,
    parallel::build_worker_pool,
    resize::fit_to,
    tone::{ToneParams, apply_tone},
};
use revela_params::{
    AdjustmentParameters, Orientation, OutputId, ParameterHash, ProcessingStage, detect_changes,
    stage_hash,
};
use revela_transfer::{dither::encode_dithered, srgb::encode_image};
use tracing::{debug, info, warn};

use crate::cache::{CacheHierarchy, CacheStats, RenderKey};
use crate::coalesce::CancelToken;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::plan::ProcessingPlan;
use crate::source::SourceProvider;

/// Where a render request currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// No render in flight.
    Idle,
    /// The plan is built, execution not yet started.
    PlanBuilt,
    /// The given stage is running.
    Executing(ProcessingStage),
    /// The last render completed.
    Done,
    /// The last render failed or was cancelled.
    Failed,
}

/// What one render did, alongside its output.
#[derive(Debug, Clone)]
pub struct RenderReport {
    /// Stages that actually ran, in order.
    pub stages_executed: Vec<ProcessingStage>,
    /// Stages served from cache or not needed.
    pub stages_skipped: Vec<ProcessingStage>,
    /// Cache hits (all levels) during this render.
    pub cache_hits: u64,
    /// Cache misses (all levels) during this render.
    pub cache_misses: u64,
    /// Wall-clock duration.
    pub elapsed: Duration,
    /// Plan cost estimate, for comparing against `elapsed`.
    pub estimated_ms: u32,
    /// The encoded output.
    pub image: Rgba8Buffer,
}

/// Combined engine statistics snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineStats {
    /// Cache hierarchy counters.
    pub cache: CacheStats,
    /// Bilateral dispatch counters.
    pub bilateral: UsageStats,
}

/// Per-stage hashes and chained identities for one parameter snapshot.
struct StageChain {
    entries: [(ParameterHash, OutputId, OutputId); 5],
}

impl StageChain {
    /// Builds the chain `base → ToneBase → ... → Details`.
    fn new(params: &AdjustmentParameters, base: OutputId) -> Self {
        let mut upstream = base;
        let entries = ProcessingStage::ALL.map(|stage| {
            let hash = stage_hash(params, stage);
            let output = OutputId::for_stage(stage, hash, upstream);
            let entry = (hash, upstream, output);
            upstream = output;
            entry
        });
        Self { entries }
    }

    fn hash(&self, stage: ProcessingStage) -> ParameterHash {
        self.entries[stage.order()].0
    }

    fn upstream(&self, stage: ProcessingStage) -> OutputId {
        self.entries[stage.order()].1
    }

    fn output(&self, stage: ProcessingStage) -> OutputId {
        self.entries[stage.order()].2
    }

    fn final_output(&self) -> OutputId {
        self.output(ProcessingStage::Details)
    }
}

/// A session-owned incremental render engine.
pub struct RenderEngine {
    config: EngineConfig,
    cache: CacheHierarchy,
    dispatcher: BilateralDispatcher,
    pool: Option<rayon::ThreadPool>,
    state: RwLock<RenderState>,
    last_params: Option<AdjustmentParameters>,
    last_preview: Option<Rgba8Buffer>,
    generation: u64,
    ladder_level: usize,
}

impl RenderEngine {
    /// Creates an engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        let pool = match build_worker_pool() {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!(error = %e, "worker pool unavailable, using global pool");
                None
            }
        };
        let cache = CacheHierarchy::new(
            config.cache_enabled,
            config.l1_budget_bytes,
            config.l2_slots,
        );
        let dispatcher = BilateralDispatcher::new(config.dispatch.clone());
        Self {
            config,
            cache,
            dispatcher,
            pool,
            state: RwLock::new(RenderState::Idle),
            last_params: None,
            last_preview: None,
            generation: 0,
            ladder_level: 0,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current state of the render state machine. Safe to poll from
    /// another thread while a render runs.
    pub fn state(&self) -> RenderState {
        *self.state.read()
    }

    /// Combined cache and dispatch statistics.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            cache: self.cache.stats(),
            bilateral: self.dispatcher.stats(),
        }
    }

    /// The last successfully rendered preview, retained across failures.
    pub fn last_preview(&self) -> Option<&Rgba8Buffer> {
        self.last_preview.as_ref()
    }

    /// The active preview-ladder level (0 = full ladder resolution).
    pub fn ladder_level(&self) -> usize {
        self.ladder_level
    }

    /// Loads a new source through a provider, replacing the session
    /// state. All caches derived from the previous source are cleared.
    pub fn load_source(&mut self, provider: &dyn SourceProvider) -> EngineResult<SourceMetadata> {
        let (image, metadata) = provider.decode()?;
        self.generation += 1;
        let id = OutputId::source(self.generation);
        info!(width = metadata.width, height = metadata.height, %id, "source loaded");
        self.cache
            .set_source(id, image, metadata.clone(), self.config.preview_ladder.len());
        self.last_params = None;
        self.last_preview = None;
        self.ladder_level = 0;
        self.dispatcher.clear_cache();
        *self.state.write() = RenderState::Idle;
        Ok(metadata)
    }

    /// Signals that working memory is tight.
    ///
    /// Steps the preview ladder down one level and drops the oldest
    /// cached stage output, returning `true` if anything could still be
    /// freed. Callers retry the render after a `true`; a `false` means
    /// the engine is already at minimum footprint.
    pub fn memory_pressure(&mut self) -> bool {
        let evicted = self.cache.evict_oldest_stage();
        if self.ladder_level + 1 < self.config.preview_ladder.len() {
            self.ladder_level += 1;
            warn!(
                level = self.ladder_level,
                longest_side = self.config.preview_ladder[self.ladder_level],
                "memory pressure: preview resolution downgraded"
            );
            // The ladder level is part of every chained identity, so the
            // old level's entries can never hit again.
            self.cache.clear_derived();
            true
        } else {
            evicted
        }
    }

    /// Renders a preview incrementally.
    ///
    /// `dither` selects error-diffusion encoding for the output. Pass a
    /// token to let a newer edit cancel mid-chain; a cancelled render
    /// returns [`EngineError::Cancelled`] having written nothing.
    pub fn render_preview(
        &mut self,
        params: &AdjustmentParameters,
        dither: bool,
        token: Option<&CancelToken>,
    ) -> EngineResult<RenderReport> {
        let started = Instant::now();
        let stats_before = self.cache.stats();

        let result = self.render_preview_inner(params, dither, token);
        match result {
            Ok((image, plan)) => {
                *self.state.write() = RenderState::Done;
                self.last_params = Some(params.clone());
                self.last_preview = Some(image.clone());
                let stats_after = self.cache.stats();
                Ok(RenderReport {
                    stages_skipped: plan.skipped_stages(),
                    estimated_ms: plan.estimated_total_ms,
                    stages_executed: plan.stages_to_execute,
                    cache_hits: (stats_after.l1_hits - stats_before.l1_hits)
                        + (stats_after.l2_hits - stats_before.l2_hits),
                    cache_misses: (stats_after.l1_misses - stats_before.l1_misses)
                        + (stats_after.l2_misses - stats_before.l2_misses),
                    elapsed: started.elapsed(),
                    image,
                })
            }
            Err(e) => {
                *self.state.write() = RenderState::Failed;
                Err(e)
            }
        }
    }

    fn render_preview_inner(
        &mut self,
        params: &AdjustmentParameters,
        dither: bool,
        token: Option<&CancelToken>,
    ) -> EngineResult<(Rgba8Buffer, ProcessingPlan)> {
        if self.cache.source_id().is_none() {
            return Err(EngineError::NoSource);
        }
        let (base_id, base) = self.preview_base()?;
        let chain = StageChain::new(params, base_id);

        let delta = detect_changes(self.last_params.as_ref(), params);
        let mut plan = ProcessingPlan::incremental(&delta);
        *self.state.write() = RenderState::PlanBuilt;

        // No-op fast path: identical parameters, preview already encoded.
        if plan.is_empty() {
            let key = RenderKey {
                output: chain.final_output(),
                dithered: dither,
            };
            if let Some(buffer) = self.cache.get_preview(key) {
                debug!("no-op render served from preview cache");
                return Ok((buffer, plan));
            }
            // Nothing changed but nothing is cached either (cold cache or
            // caching disabled): run everything.
            plan = ProcessingPlan::full();
        }

        // Seed the working image. An incremental plan starts from the
        // cached output of the stage before its start stage; a missing or
        // stale entry falls back to a full run from the source.
        let mut working = base;
        if let Some(pred) = plan.start_stage.and_then(ProcessingStage::predecessor) {
            match self
                .cache
                .get_stage(pred, chain.hash(pred), chain.upstream(pred))
            {
                Some(seed) => working = seed,
                None => {
                    debug!(%pred, "seed missing, widening to a full render");
                    plan = ProcessingPlan::full();
                }
            }
        }

        for &stage in &plan.stages_to_execute {
            if token.is_some_and(CancelToken::is_cancelled) {
                debug!(%stage, "render cancelled before stage");
                return Err(EngineError::Cancelled);
            }
            *self.state.write() = RenderState::Executing(stage);
            working = self.apply_stage(working, stage, params)?;

            if stage.should_cache() && !token.is_some_and(CancelToken::is_cancelled) {
                self.cache
                    .put_stage(stage, chain.hash(stage), chain.upstream(stage), working.clone());
            }
        }

        if token.is_some_and(CancelToken::is_cancelled) {
            return Err(EngineError::Cancelled);
        }

        let buffer = if dither {
            encode_dithered(&working, true)
        } else {
            encode_image(&working)
        };
        self.cache.put_preview(
            RenderKey {
                output: chain.final_output(),
                dithered: dither,
            },
            buffer.clone(),
        );
        Ok((buffer, plan))
    }

    /// Renders at full resolution, bypassing the preview caches.
    ///
    /// Export runs every stage from the full-size source, never reads or
    /// writes L1/L2, and filters without the dispatcher's result cache —
    /// an export must not evict state the interactive path relies on.
    pub fn render_export(
        &self,
        params: &AdjustmentParameters,
        dither: bool,
    ) -> EngineResult<Rgba8Buffer> {
        let mut working = self.cache.source_image().ok_or(EngineError::NoSource)?;
        info!(
            width = working.width(),
            height = working.height(),
            "export render started"
        );

        for stage in ProcessingStage::ALL {
            working = self.apply_stage_with(working, stage, params, &|src, ss, rs| {
                bilateral_fast(src, ss, rs)
            })?;
        }

        Ok(if dither {
            encode_dithered(&working, true)
        } else {
            encode_image(&working)
        })
    }

    /// The scaled working base for the current ladder level, built and
    /// cached on first use.
    fn preview_base(&mut self) -> EngineResult<(OutputId, LinearImage)> {
        let level = self.ladder_level;
        if let Some(hit) = self.cache.preview_base(level) {
            return Ok(hit);
        }
        let source_id = self.cache.source_id().ok_or(EngineError::NoSource)?;
        let source = self.cache.source_image().ok_or(EngineError::NoSource)?;
        let max_dim = self
            .config
            .preview_ladder
            .get(level)
            .copied()
            .unwrap_or(*self.config.preview_ladder.last().expect("non-empty ladder"));
        let base = self.install(|| fit_to(&source, max_dim));
        let base_id = source_id.derive(level as u64);
        self.cache.store_preview_base(level, base_id, base.clone());
        Ok((base_id, base))
    }

    /// Runs one stage's kernels through the configured dispatcher.
    fn apply_stage(
        &self,
        img: LinearImage,
        stage: ProcessingStage,
        params: &AdjustmentParameters,
    ) -> EngineResult<LinearImage> {
        self.apply_stage_with(img, stage, params, &|src, ss, rs| {
            self.dispatcher.filter(src, ss, rs)
        })
    }

    /// Runs one stage's kernels with an explicit bilateral path.
    fn apply_stage_with(
        &self,
        mut img: LinearImage,
        stage: ProcessingStage,
        params: &AdjustmentParameters,
        bilateral: &(dyn Fn(&LinearImage, f32, f32) -> LinearImage + Sync),
    ) -> EngineResult<LinearImage> {
        if img.is_empty() {
            return Err(EngineError::Kernel {
                stage,
                message: "empty working image".into(),
            });
        }
        let stage_started = Instant::now();
        self.install(|| match stage {
            ProcessingStage::ToneBase => {
                if params.orientation != Orientation::Normal {
                    img = apply_orientation(&img, params.orientation);
                }
                apply_tone(&mut img, &ToneParams::from_snapshot(params));
            }
            ProcessingStage::Curves => apply_curves(&mut img, &params.curves),
            ProcessingStage::Color => apply_color(&mut img, &ColorParams::from_snapshot(params)),
            ProcessingStage::Effects => {
                apply_effects_with(&mut img, &EffectsParams::from_snapshot(params), bilateral)
            }
            ProcessingStage::Details => {
                apply_details_with(&mut img, &DetailsParams::from_snapshot(params), bilateral)
            }
        });
        debug!(%stage, elapsed_ms = stage_started.elapsed().as_millis() as u64, "stage done");
        Ok(img)
    }

    /// Runs a closure inside the bounded worker pool when one exists.
    fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}

impl std::fmt::Debug for RenderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderEngine")
            .field("state", &self.state())
            .field("ladder_level", &self.ladder_level)
            .field("generation", &self.generation)
            .finish()
    }
}
