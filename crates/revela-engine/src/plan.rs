//! Processing plan construction.
//!
//! A plan turns a parameter delta into the render's execution order: the
//! contiguous stage suffix to run, which of those outputs to cache, and
//! a cost estimate for progress display. Plans are computed fresh per
//! render request and never persisted.

use revela_params::{ParameterDelta, ProcessingStage};

/// The execution order for one render request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingPlan {
    /// First stage to run; `None` for an empty (no-op) plan.
    pub start_stage: Option<ProcessingStage>,
    /// Stages to run, strictly increasing by stage order, contiguous
    /// from `start_stage` through the final stage.
    pub stages_to_execute: Vec<ProcessingStage>,
    /// Stages whose output goes to the stage cache. Subset of
    /// `stages_to_execute` with `should_cache` set.
    pub stages_to_cache: Vec<ProcessingStage>,
    /// Sum of the per-stage cost estimates, for progress/ETA only.
    pub estimated_total_ms: u32,
}

impl ProcessingPlan {
    /// A full cold render: every stage, from the first.
    pub fn full() -> Self {
        Self::from_start(Some(ProcessingStage::ToneBase))
    }

    /// An incremental render derived from a change delta.
    ///
    /// An empty delta produces an empty plan (the no-op fast path).
    pub fn incremental(delta: &ParameterDelta) -> Self {
        Self::from_start(delta.start_stage)
    }

    fn from_start(start: Option<ProcessingStage>) -> Self {
        let stages_to_execute: Vec<ProcessingStage> = match start {
            Some(s) => s.suffix().to_vec(),
            None => Vec::new(),
        };
        let stages_to_cache = stages_to_execute
            .iter()
            .copied()
            .filter(|s| s.should_cache())
            .collect();
        let estimated_total_ms = stages_to_execute.iter().map(|s| s.estimated_ms()).sum();
        Self {
            start_stage: start,
            stages_to_execute,
            stages_to_cache,
            estimated_total_ms,
        }
    }

    /// True when nothing needs to run.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stages_to_execute.is_empty()
    }

    /// The stages this plan skips, in order.
    pub fn skipped_stages(&self) -> Vec<ProcessingStage> {
        ProcessingStage::ALL
            .into_iter()
            .filter(|s| !self.stages_to_execute.contains(s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revela_params::{AdjustmentParameters, detect_changes};

    #[test]
    fn test_full_plan_runs_everything() {
        let plan = ProcessingPlan::full();
        assert_eq!(plan.start_stage, Some(ProcessingStage::ToneBase));
        assert_eq!(plan.stages_to_execute, ProcessingStage::ALL.to_vec());
        assert!(plan.skipped_stages().is_empty());
        assert_eq!(
            plan.estimated_total_ms,
            ProcessingStage::ALL.iter().map(|s| s.estimated_ms()).sum()
        );
    }

    #[test]
    fn test_empty_delta_empty_plan() {
        let params = AdjustmentParameters::default();
        let delta = detect_changes(Some(&params), &params.clone());
        let plan = ProcessingPlan::incremental(&delta);
        assert!(plan.is_empty());
        assert_eq!(plan.start_stage, None);
        assert_eq!(plan.estimated_total_ms, 0);
        assert_eq!(plan.skipped_stages(), ProcessingStage::ALL.to_vec());
    }

    #[test]
    fn test_details_only_plan() {
        let old = AdjustmentParameters::default();
        let mut new = old.clone();
        new.sharpening = 0.5;
        let plan = ProcessingPlan::incremental(&detect_changes(Some(&old), &new));

        assert_eq!(plan.start_stage, Some(ProcessingStage::Details));
        assert_eq!(plan.stages_to_execute, vec![ProcessingStage::Details]);
        // Details is never cached; its output becomes the L1 preview.
        assert!(plan.stages_to_cache.is_empty());
        assert_eq!(
            plan.skipped_stages(),
            vec![
                ProcessingStage::ToneBase,
                ProcessingStage::Curves,
                ProcessingStage::Color,
                ProcessingStage::Effects
            ]
        );
    }

    #[test]
    fn test_executed_and_skipped_partition_all_stages() {
        let old = AdjustmentParameters::default();
        for stage in ProcessingStage::ALL {
            let mut new = old.clone();
            match stage {
                ProcessingStage::ToneBase => new.exposure = 0.5,
                ProcessingStage::Curves => new.curves.enabled = true,
                ProcessingStage::Color => new.saturation = 0.5,
                ProcessingStage::Effects => new.clarity = 0.5,
                ProcessingStage::Details => new.sharpening = 0.5,
            }
            let plan = ProcessingPlan::incremental(&detect_changes(Some(&old), &new));

            let executed = plan.stages_to_execute.clone();
            let skipped = plan.skipped_stages();
            assert!(executed.iter().all(|s| !skipped.contains(s)));
            let mut union: Vec<ProcessingStage> =
                skipped.iter().chain(executed.iter()).copied().collect();
            union.sort();
            assert_eq!(union, ProcessingStage::ALL.to_vec());

            // Strictly increasing by order.
            assert!(executed.windows(2).all(|w| w[0] < w[1]));
            // Contiguous from the start stage to the end.
            assert_eq!(executed, stage.suffix().to_vec());
        }
    }

    #[test]
    fn test_cacheable_subset() {
        let plan = ProcessingPlan::full();
        for s in &plan.stages_to_cache {
            assert!(plan.stages_to_execute.contains(s));
            assert!(s.should_cache());
        }
        assert!(!plan.stages_to_cache.contains(&ProcessingStage::Details));
    }
}
