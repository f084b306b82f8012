// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stitchers: reconciling a new display order with a backbone's blocks.
//!
//! A stitch consumes the order committed by the previous stitch (walked
//! through the `old_*` links), the new order (walked through the current
//! links), and the caller's [`ChangeInterval`]s, and leaves the backbone
//! with one block per maximal same-renderer run of the new order.
//!
//! Every pass moves through the same states:
//!
//! ```text
//!   Initialized ─► BoundariesRecorded ─► OldBlocksRemoved ─►
//!   NewBlocksConstructed ─► IntervalsNotified ─► Reindexed ─► Cleaned
//! ```
//!
//! Membership changes are *pending* until the pass is cleaned: walking the
//! old order only flags drawables for removal, and walking the new order
//! only records the block each drawable should join. Cleaning applies all
//! removals, then all additions, so backend hooks always see a drawable
//! leave its old block before it joins a new one.
//!
//! # Run rule
//!
//! A new block starts whenever the renderer changes or no block is open.
//! After a DOM block is opened the current renderer folds back to neutral,
//! so DOM blocks always hold exactly one drawable:
//!
//! ```text
//!   canvas canvas dom dom svg svg
//!   [ canvas    ] [d] [d] [ svg ]
//! ```
//!
//! Two implementations share this contract. [`RebuildStitcher`] replaces
//! every block on every pass; [`IncrementalStitcher`] only touches blocks
//! around the change intervals and reuses blocks where it can. Both produce
//! the same partition of the new order into blocks.

mod incremental;
mod interval;
mod rebuild;

pub use incremental::IncrementalStitcher;
pub use interval::ChangeInterval;
pub use rebuild::RebuildStitcher;

use alloc::vec::Vec;

use crate::display::Display;
use crate::drawable::{DrawableList, Links, slot};
use crate::id::{BackboneId, DrawableId, INVALID};
use crate::renderer::Renderer;
use crate::trace::{StitchEvent, StitchKind, Tracer};

/// Progress of a stitch pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StitchPhase {
    /// No pass has run, or one is starting.
    Initialized,
    /// The backbone's previous block list has been captured.
    BoundariesRecorded,
    /// Affected blocks are detached from the backbone and their members
    /// flagged for removal.
    OldBlocksRemoved,
    /// Runs of the new order have been assigned blocks.
    NewBlocksConstructed,
    /// Every run's block has its range set and is queued for fit and repaint.
    IntervalsNotified,
    /// Block positions have been refreshed.
    Reindexed,
    /// Pending membership has been applied. Terminal.
    Cleaned,
}

/// Work done by one stitch pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StitchStats {
    /// Blocks created.
    pub blocks_created: u32,
    /// Existing blocks kept for a run of the new order.
    pub blocks_reused: u32,
    /// Blocks disposed because no run used them.
    pub blocks_disposed: u32,
    /// Drawables that joined a block without having one.
    pub drawables_added: u32,
    /// Drawables that left their block without joining another.
    pub drawables_removed: u32,
    /// Drawables that moved from one block to another.
    pub drawables_moved: u32,
    /// Whether the pass was skipped as a no-op.
    pub fast_path: bool,
}

/// Inputs to one stitch pass.
#[derive(Clone, Copy, Debug)]
pub struct StitchRequest<'a> {
    /// Backbone whose blocks are reconciled.
    pub backbone: BackboneId,
    /// First drawable of the new order.
    pub first: Option<DrawableId>,
    /// Last drawable of the new order.
    pub last: Option<DrawableId>,
    /// First drawable of the order committed by the previous stitch.
    pub old_first: Option<DrawableId>,
    /// Last drawable of the order committed by the previous stitch.
    pub old_last: Option<DrawableId>,
    /// Changed regions, in display order.
    pub intervals: &'a [ChangeInterval],
}

impl StitchRequest<'_> {
    /// Whether the request describes no change at all.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.intervals.is_empty() && self.first == self.old_first && self.last == self.old_last
    }
}

/// Reconciles a backbone's blocks with a new display order.
pub trait Stitcher {
    /// Runs one pass and returns what it did.
    ///
    /// # Panics
    ///
    /// Panics if the backbone handle is stale. Inconsistent inputs (an old
    /// drawable without a block, intervals bounded by drawables outside the
    /// backbone) trip debug assertions.
    fn stitch(
        &mut self,
        display: &mut Display,
        request: &StitchRequest<'_>,
        tracer: &mut Tracer<'_>,
    ) -> StitchStats;

    /// Returns the phase the most recent pass reached.
    fn phase(&self) -> StitchPhase;
}

/// A maximal same-renderer run of the new order.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Run {
    pub(crate) renderer: Renderer,
    pub(crate) first: u32,
    pub(crate) last: u32,
}

/// Splits the new order `first ..= last` into runs.
pub(crate) fn collect_runs(display: &Display, first: u32, last: u32) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    let mut current: Option<Renderer> = None;
    for id in DrawableList::new(&display.drawables, first, last, Links::New) {
        let renderer = display.drawables.renderer[id.idx as usize];
        match runs.last_mut() {
            Some(run) if current == Some(renderer) => run.last = id.idx,
            _ => {
                runs.push(Run {
                    renderer,
                    first: id.idx,
                    last: id.idx,
                });
                current = if renderer.is_dom() { None } else { Some(renderer) };
            }
        }
    }
    runs
}

/// Bookkeeping shared by both stitchers for one pass.
#[derive(Debug)]
pub(crate) struct StitchPass {
    pub(crate) phase: StitchPhase,
    pub(crate) backbone: u32,
    /// Drawables flagged for removal.
    removals: Vec<u32>,
    /// Drawables with a pending block.
    additions: Vec<u32>,
    /// Blocks detached from the backbone, disposed when cleaned unless a run
    /// reclaimed them.
    candidates: Vec<u32>,
    reclaimed: Vec<bool>,
    /// Blocks each run ended up with, with the run's range.
    assigned: Vec<(u32, Run)>,
    /// New-order ranges whose links are committed when cleaned.
    commits: Vec<(u32, u32)>,
    pub(crate) stats: StitchStats,
}

impl StitchPass {
    pub(crate) fn begin(display: &Display, request: &StitchRequest<'_>) -> Self {
        display.backbones.validate(request.backbone);
        let backbone = request.backbone.idx;
        debug_assert_eq!(
            slot(request.old_first),
            display.backbones.previous_first[backbone as usize],
            "old range does not start where the previous stitch ended"
        );
        debug_assert_eq!(
            slot(request.old_last),
            display.backbones.previous_last[backbone as usize],
            "old range does not end where the previous stitch ended"
        );
        Self {
            phase: StitchPhase::Initialized,
            backbone,
            removals: Vec::new(),
            additions: Vec::new(),
            candidates: Vec::new(),
            reclaimed: Vec::new(),
            assigned: Vec::new(),
            commits: Vec::new(),
            stats: StitchStats::default(),
        }
    }

    pub(crate) fn advance(&mut self, next: StitchPhase) {
        debug_assert!(
            next > self.phase,
            "stitch phase went from {:?} to {next:?}",
            self.phase
        );
        self.phase = next;
    }

    /// Finishes a pass that had nothing to do.
    pub(crate) fn skip(
        mut self,
        display: &Display,
        request: &StitchRequest<'_>,
        kind: StitchKind,
        tracer: &mut Tracer<'_>,
    ) -> (StitchPhase, StitchStats) {
        self.stats.fast_path = true;
        self.phase = StitchPhase::Cleaned;
        self.emit(display, request, kind, tracer);
        (self.phase, self.stats)
    }

    /// Flags a drawable of the old order for removal.
    pub(crate) fn note_removal(&mut self, display: &mut Display, drawable: u32) {
        let d = drawable as usize;
        debug_assert_ne!(
            display.drawables.block[d], INVALID,
            "old drawable {drawable} has no block"
        );
        if !display.drawables.pending_removal[d] {
            display.drawables.pending_removal[d] = true;
            self.removals.push(drawable);
        }
    }

    /// Flags every member of block slot `block` for removal.
    pub(crate) fn note_block_members(&mut self, display: &mut Display, block: u32) {
        let members: Vec<u32> = display.member_slots(block).collect();
        for member in members {
            self.note_removal(display, member);
        }
    }

    /// Records a block detached from the backbone.
    pub(crate) fn add_candidate(&mut self, block: u32) {
        self.candidates.push(block);
        self.reclaimed.push(false);
    }

    /// Finds an unclaimed candidate in `range` for `run`.
    ///
    /// The block currently owning the run's first drawable wins; otherwise a
    /// non-DOM run takes the first compatible candidate. Failed blocks are
    /// never reused.
    pub(crate) fn reclaim(
        &mut self,
        display: &Display,
        range: core::ops::Range<usize>,
        run: &Run,
    ) -> Option<u32> {
        let compatible = |pass: &Self, position: usize| {
            let block = pass.candidates[position] as usize;
            !pass.reclaimed[position]
                && display.blocks.renderer[block] == run.renderer
                && !display.blocks.failed[block]
        };
        let owner = display.drawables.block[run.first as usize];
        let position = range
            .clone()
            .find(|&p| self.candidates[p] == owner && compatible(self, p))
            .or_else(|| {
                if run.renderer.is_dom() {
                    None
                } else {
                    range.clone().find(|&p| compatible(self, p))
                }
            })?;
        self.reclaimed[position] = true;
        self.stats.blocks_reused += 1;
        Some(self.candidates[position])
    }

    /// Returns the number of candidates recorded so far.
    pub(crate) fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Creates a fresh block for `run`.
    pub(crate) fn create(&mut self, display: &mut Display, run: &Run, tracer: &mut Tracer<'_>) -> u32 {
        self.stats.blocks_created += 1;
        display.create_block(run.renderer, self.backbone, tracer)
    }

    /// Assigns `run` to `block`: every drawable in the run becomes pending
    /// for the block.
    pub(crate) fn assign(&mut self, display: &mut Display, run: Run, block: u32) {
        let members: Vec<u32> =
            DrawableList::new(&display.drawables, run.first, run.last, Links::New)
                .map(DrawableId::index)
                .collect();
        for member in members {
            display.drawables.pending_block[member as usize] = block;
            self.additions.push(member);
        }
        self.assigned.push((block, run));
    }

    /// Records a new-order range whose links are committed when cleaned.
    pub(crate) fn commit_range(&mut self, first: u32, last: u32) {
        if first != INVALID {
            self.commits.push((first, last));
        }
    }

    /// Sets each assigned block's range and queues it for fit and repaint.
    pub(crate) fn notify_intervals(&mut self, display: &mut Display) {
        for &(block, run) in &self.assigned {
            let b = block as usize;
            display.blocks.first[b] = run.first;
            display.blocks.last[b] = run.last;
            display.mark_block(block);
        }
        self.advance(StitchPhase::IntervalsNotified);
    }

    pub(crate) fn reindex(&mut self, display: &mut Display, tracer: &mut Tracer<'_>) {
        display.reindex(self.backbone, tracer);
        self.advance(StitchPhase::Reindexed);
    }

    /// Applies pending membership and releases unused blocks.
    pub(crate) fn clean(
        mut self,
        display: &mut Display,
        request: &StitchRequest<'_>,
        kind: StitchKind,
        tracer: &mut Tracer<'_>,
    ) -> (StitchPhase, StitchStats) {
        // Removals first, so a moving drawable leaves before it joins.
        for &drawable in &self.removals {
            let d = drawable as usize;
            let current = display.drawables.block[d];
            let target = display.drawables.pending_block[d];
            if current == INVALID || current == target {
                continue;
            }
            display.detach(drawable, false);
            if target == INVALID {
                self.stats.drawables_removed += 1;
                display.drawables.old_previous[d] = INVALID;
                display.drawables.old_next[d] = INVALID;
            }
        }
        for &drawable in &self.additions {
            let d = drawable as usize;
            let target = display.drawables.pending_block[d];
            display.drawables.pending_block[d] = INVALID;
            if display.drawables.block[d] == target {
                continue;
            }
            if display.drawables.pending_removal[d] {
                self.stats.drawables_moved += 1;
            } else {
                self.stats.drawables_added += 1;
            }
            display.attach(drawable, target, tracer);
        }
        for &drawable in &self.removals {
            display.drawables.pending_removal[drawable as usize] = false;
        }

        for (&block, &reclaimed) in self.candidates.iter().zip(&self.reclaimed) {
            if !reclaimed {
                display.dispose_block(block, tracer);
                self.stats.blocks_disposed += 1;
            }
        }

        for &(first, last) in &self.commits {
            let range: Vec<u32> = DrawableList::new(&display.drawables, first, last, Links::New)
                .map(DrawableId::index)
                .collect();
            for drawable in range {
                let d = drawable as usize;
                display.drawables.old_previous[d] = display.drawables.previous[d];
                display.drawables.old_next[d] = display.drawables.next[d];
            }
        }
        let b = self.backbone as usize;
        display.backbones.previous_first[b] = slot(request.first);
        display.backbones.previous_last[b] = slot(request.last);

        self.advance(StitchPhase::Cleaned);
        self.emit(display, request, kind, tracer);
        (self.phase, self.stats)
    }

    fn emit(
        &self,
        display: &Display,
        request: &StitchRequest<'_>,
        kind: StitchKind,
        tracer: &mut Tracer<'_>,
    ) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "interval counts are bounded by the drawable count"
        )]
        let intervals = request.intervals.len() as u32;
        tracer.stitch(&StitchEvent {
            frame_index: display.frame_index,
            backbone: request.backbone,
            kind,
            intervals,
            stats: self.stats,
        });
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;
    use crate::id::{BlockId, InstanceId};
    use crate::testing::{Call, RecordingStrategy, SharedLog, frame};

    /// Splits a backbone into `(renderer, members)` per block.
    fn partition(display: &Display, backbone: BackboneId) -> Vec<(Renderer, Vec<InstanceId>)> {
        display
            .blocks(backbone)
            .map(|block| {
                let members = display
                    .block_members(block)
                    .map(|d| display.drawables.instance(d))
                    .collect();
                (display.block_renderer(block), members)
            })
            .collect()
    }

    fn run_stitcher(
        stitcher: &mut dyn Stitcher,
        display: &mut Display,
        backbone: BackboneId,
        order: &[DrawableId],
        intervals: &[ChangeInterval],
    ) -> StitchStats {
        display.relink(order);
        let (old_first, old_last) = display.stitched_range(backbone);
        let request = StitchRequest {
            backbone,
            first: order.first().copied(),
            last: order.last().copied(),
            old_first,
            old_last,
            intervals,
        };
        stitcher.stitch(display, &request, &mut Tracer::none())
    }

    fn spawn(display: &mut Display, renderers: &[Renderer]) -> Vec<DrawableId> {
        renderers
            .iter()
            .enumerate()
            .map(|(i, &r)| display.create_drawable(r, InstanceId(u32::try_from(i).unwrap())))
            .collect()
    }

    fn block_events(log: &SharedLog) -> (usize, usize) {
        let log = log.borrow();
        let created = log
            .iter()
            .filter(|call| matches!(call, Call::CreateBlock(..)))
            .count();
        let disposed = log
            .iter()
            .filter(|call| matches!(call, Call::DisposeBlock(_)))
            .count();
        (created, disposed)
    }

    #[test]
    fn runs_merge_same_renderer_and_split_dom() {
        use Renderer::{Canvas, Dom, Svg};
        let (mut display, _log) = RecordingStrategy::display();
        let root = display.create_backbone();
        let order = spawn(&mut display, &[Canvas, Canvas, Dom, Dom, Svg, Svg]);
        frame(&mut display, root, &order);
        display.check_invariants(root);

        let renderers: Vec<Renderer> = partition(&display, root).iter().map(|(r, _)| *r).collect();
        assert_eq!(renderers, vec![Canvas, Dom, Dom, Svg]);
        let lens: Vec<u32> = display.blocks(root).map(|b| display.block_len(b)).collect();
        assert_eq!(lens, vec![2, 1, 1, 2]);
    }

    #[test]
    fn renderer_change_splits_block() {
        use Renderer::{Canvas, Svg};
        let (mut display, _log) = RecordingStrategy::display();
        let root = display.create_backbone();
        let a = display.create_drawable(Canvas, InstanceId(0));
        let b = display.create_drawable(Canvas, InstanceId(1));
        frame(&mut display, root, &[a, b]);
        assert_eq!(display.blocks(root).count(), 1);

        display.dispose_drawable(b);
        let b2 = display.create_drawable(Svg, InstanceId(1));
        display.relink(&[a, b2]);
        let stats = display.stitch(
            root,
            Some(a),
            Some(b2),
            &[ChangeInterval::new(Some(a), None)],
            &mut Tracer::none(),
        );
        display.check_invariants(root);
        assert_eq!(
            partition(&display, root),
            vec![(Canvas, vec![InstanceId(0)]), (Svg, vec![InstanceId(1)])]
        );
        assert_eq!(stats.blocks_created, 1);
        assert_eq!(stats.blocks_reused, 1);
        assert_eq!(stats.blocks_disposed, 0);
    }

    /// Inserting a DOM drawable after a DOM drawable keeps the first block
    /// and opens a second one: the renderer folds to neutral after every
    /// DOM block, so DOM siblings never merge.
    #[test]
    fn dom_siblings_get_their_own_blocks() {
        let (mut display, log) = RecordingStrategy::display();
        let root = display.create_backbone();
        let a = display.create_drawable(Renderer::Dom, InstanceId(0));
        frame(&mut display, root, &[a]);
        let first = display.blocks(root).next().unwrap();
        log.borrow_mut().clear();

        let b = display.create_drawable(Renderer::Dom, InstanceId(1));
        display.relink(&[a, b]);
        display.stitch(
            root,
            Some(a),
            Some(b),
            &[ChangeInterval::new(Some(a), None)],
            &mut Tracer::none(),
        );
        display.check_invariants(root);
        let blocks: Vec<BlockId> = display.blocks(root).collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], first, "A keeps its block");
        assert_eq!(display.block_members(blocks[0]).collect::<Vec<_>>(), vec![a]);
        assert_eq!(display.block_members(blocks[1]).collect::<Vec<_>>(), vec![b]);
        assert!(blocks.iter().all(|&block| display.block_renderer(block) == Renderer::Dom));
        assert_eq!(block_events(&log), (1, 0));
    }

    #[test]
    fn unchanged_request_takes_fast_path() {
        use Renderer::{Canvas, Svg};
        let (mut display, log) = RecordingStrategy::display();
        let root = display.create_backbone();
        let order = spawn(&mut display, &[Canvas, Svg, Canvas]);
        frame(&mut display, root, &order);
        display.update(&mut Tracer::none());
        let before: Vec<BlockId> = display.blocks(root).collect();
        log.borrow_mut().clear();

        let mut stitcher = IncrementalStitcher::new();
        let stats = run_stitcher(&mut stitcher, &mut display, root, &order, &[]);
        assert!(stats.fast_path);
        assert_eq!(stitcher.phase(), StitchPhase::Cleaned);
        assert_eq!(stats.blocks_created + stats.blocks_disposed, 0);
        assert!(log.borrow().is_empty(), "no backend work on a no-op stitch");
        assert_eq!(display.blocks(root).collect::<Vec<_>>(), before);

        let summary = display.update(&mut Tracer::none());
        assert_eq!(summary.blocks_fitted + summary.blocks_repainted, 0);
    }

    #[test]
    fn empty_order_clears_backbone() {
        use Renderer::{Canvas, Dom};
        let (mut display, _log) = RecordingStrategy::display();
        let root = display.create_backbone();
        let order = spawn(&mut display, &[Canvas, Dom]);
        frame(&mut display, root, &order);

        let stats = frame(&mut display, root, &[]);
        assert_eq!(stats.blocks_disposed, 2);
        assert_eq!(stats.drawables_removed, 2);
        assert_eq!(display.blocks(root).count(), 0);
        assert_eq!(display.stitched_range(root), (None, None));
        for id in order {
            assert_eq!(display.drawable_block(id), None);
        }
        display.check_invariants(root);
    }

    #[test]
    fn rebuild_replaces_every_block() {
        use Renderer::{Canvas, Svg};
        let (mut display, _log) = RecordingStrategy::display();
        let root = display.create_backbone();
        let order = spawn(&mut display, &[Canvas, Svg]);
        let mut stitcher = RebuildStitcher::new();
        run_stitcher(&mut stitcher, &mut display, root, &order, &[ChangeInterval::FULL]);
        let first: Vec<BlockId> = display.blocks(root).collect();

        let stats = run_stitcher(&mut stitcher, &mut display, root, &order, &[ChangeInterval::FULL]);
        assert_eq!(stitcher.phase(), StitchPhase::Cleaned);
        assert_eq!(stats.blocks_created, 2);
        assert_eq!(stats.blocks_disposed, 2);
        assert_eq!(stats.drawables_moved, 2);
        for block in first {
            assert!(!display.block_store().is_alive(block));
        }
        display.check_invariants(root);
    }

    #[test]
    fn incremental_leaves_distant_blocks_alone() {
        use Renderer::{Canvas, Svg};
        let (mut display, log) = RecordingStrategy::display();
        let root = display.create_backbone();
        let order = spawn(&mut display, &[Canvas, Svg, Canvas, Svg, Canvas]);
        frame(&mut display, root, &order);
        let before: Vec<BlockId> = display.blocks(root).collect();
        log.borrow_mut().clear();

        // Replace the second drawable with another SVG drawable.
        display.dispose_drawable(order[1]);
        let replacement = display.create_drawable(Svg, InstanceId(10));
        let mut next = order.clone();
        next[1] = replacement;
        display.relink(&next);
        let stats = display.stitch(
            root,
            next.first().copied(),
            next.last().copied(),
            &[ChangeInterval::new(Some(next[0]), Some(next[2]))],
            &mut Tracer::none(),
        );
        display.check_invariants(root);

        let after: Vec<BlockId> = display.blocks(root).collect();
        assert_eq!(after.len(), 5);
        assert_eq!(after[0], before[0]);
        assert_eq!(after[2], before[2]);
        assert_eq!(after[3..], before[3..]);
        assert_eq!(stats.drawables_added, 1);
        let touched: Vec<BlockId> = log
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::AddToBlock(block, _) | Call::RemoveFromBlock(block, _) => Some(*block),
                _ => None,
            })
            .collect();
        assert!(
            touched.iter().all(|block| !before[3..].contains(block)),
            "blocks past the interval are untouched"
        );
    }

    #[test]
    fn moving_drawable_leaves_before_it_joins() {
        use Renderer::{Canvas, Svg};
        let (mut display, log) = RecordingStrategy::display();
        let root = display.create_backbone();
        let a = display.create_drawable(Canvas, InstanceId(0));
        let b = display.create_drawable(Canvas, InstanceId(1));
        frame(&mut display, root, &[a, b]);
        log.borrow_mut().clear();

        let x = display.create_drawable(Svg, InstanceId(2));
        display.relink(&[a, x, b]);
        let stats = display.stitch(
            root,
            Some(a),
            Some(b),
            &[ChangeInterval::new(Some(a), Some(b))],
            &mut Tracer::none(),
        );
        display.check_invariants(root);
        assert_eq!(stats.drawables_moved, 1);
        assert_eq!(stats.drawables_added, 1);

        let calls = log.borrow();
        let left = calls
            .iter()
            .position(|call| matches!(call, Call::RemoveFromBlock(_, d) if *d == b));
        let joined = calls
            .iter()
            .position(|call| matches!(call, Call::AddToBlock(_, d) if *d == b));
        assert!(left.is_some() && joined.is_some());
        assert!(left < joined, "removal hook precedes addition hook");
    }

    #[test]
    fn removal_merges_neighbors() {
        use Renderer::{Canvas, Svg};
        let (mut display, _log) = RecordingStrategy::display();
        let root = display.create_backbone();
        let order = spawn(&mut display, &[Canvas, Svg, Canvas]);
        frame(&mut display, root, &order);
        assert_eq!(display.blocks(root).count(), 3);

        display.dispose_drawable(order[1]);
        let next = [order[0], order[2]];
        display.relink(&next);
        display.stitch(
            root,
            Some(next[0]),
            Some(next[1]),
            &[ChangeInterval::new(Some(next[0]), Some(next[1]))],
            &mut Tracer::none(),
        );
        display.check_invariants(root);
        assert_eq!(
            partition(&display, root),
            vec![(Canvas, vec![InstanceId(0), InstanceId(2)])]
        );
    }

    #[test]
    fn failed_blocks_are_replaced() {
        let (mut display, log) = RecordingStrategy::display();
        let root = display.create_backbone();
        RecordingStrategy::fail_create(&log, Renderer::Canvas);
        let a = display.create_drawable(Renderer::Canvas, InstanceId(0));
        frame(&mut display, root, &[a]);
        let failed = display.blocks(root).next().unwrap();
        assert!(display.block_failed(failed));

        RecordingStrategy::heal(&log);
        let b = display.create_drawable(Renderer::Canvas, InstanceId(1));
        frame(&mut display, root, &[a, b]);
        display.check_invariants(root);
        let block = display.blocks(root).next().unwrap();
        assert_ne!(block, failed);
        assert!(!display.block_failed(block));
        assert!(!display.block_store().is_alive(failed));
    }

    #[test]
    fn attach_failure_is_isolated_to_its_block() {
        use Renderer::{Canvas, Svg};
        let (mut display, log) = RecordingStrategy::display();
        let root = display.create_backbone();
        RecordingStrategy::fail_attach(&log, Canvas);
        let c = display.create_drawable(Canvas, InstanceId(0));
        let s = display.create_drawable(Svg, InstanceId(1));
        let stats = frame(&mut display, root, &[c, s]);
        assert_eq!(stats.blocks_created, 2, "the stitch runs to completion");
        display.check_invariants(root);

        let blocks: Vec<BlockId> = display.blocks(root).collect();
        let (failed, svg) = (blocks[0], blocks[1]);
        assert!(display.block_failed(failed));
        assert!(!display.block_failed(svg));
        assert!(log.borrow().contains(&Call::AddToBlock(svg, s)));

        let summary = display.update(&mut Tracer::none());
        assert_eq!(summary.failed_blocks, 1);
        assert_eq!(summary.blocks_repainted, 0);
        assert_eq!(summary.blocks_arranged, 1);
        assert_eq!(summary.drawables_updated, 1);
        {
            let log = log.borrow();
            assert!(log.contains(&Call::UpdateDrawable(s)));
            assert!(log.contains(&Call::ArrangeBlock(svg, 1)));
            assert!(!log.iter().any(|call| matches!(call, Call::Draw(..))));
        }

        RecordingStrategy::heal(&log);
        log.borrow_mut().clear();
        let c2 = display.create_drawable(Canvas, InstanceId(2));
        frame(&mut display, root, &[c, c2, s]);
        display.check_invariants(root);

        let blocks: Vec<BlockId> = display.blocks(root).collect();
        assert_eq!(blocks.len(), 2);
        assert_ne!(blocks[0], failed);
        assert!(!display.block_failed(blocks[0]));
        assert_eq!(display.block_members(blocks[0]).collect::<Vec<_>>(), vec![c, c2]);
        assert_eq!(blocks[1], svg, "the healthy block is reclaimed");
        assert!(!display.block_store().is_alive(failed));
        let log = log.borrow();
        assert!(
            log.contains(&Call::RemoveFromBlock(failed, c)),
            "members leave a failed block through the removal hook"
        );
        assert!(log.contains(&Call::DisposeBlock(failed)));
    }

    #[test]
    fn shared_bounds_between_intervals() {
        use Renderer::{Canvas, Svg};
        let renderers = [Canvas, Svg, Canvas, Svg, Canvas, Svg, Canvas];
        let (mut incremental, _) = RecordingStrategy::display();
        let (mut rebuild, _) = RecordingStrategy::display();
        let mut stitcher = RebuildStitcher::new();
        let a = incremental.create_backbone();
        let b = rebuild.create_backbone();
        let mut order_a = spawn(&mut incremental, &renderers);
        let mut order_b = spawn(&mut rebuild, &renderers);
        frame(&mut incremental, a, &order_a);
        run_stitcher(&mut stitcher, &mut rebuild, b, &order_b, &[ChangeInterval::FULL]);

        // Swap the renderer of positions 1 and 3; the intervals share bound 2.
        for (display, order) in [(&mut incremental, &mut order_a), (&mut rebuild, &mut order_b)] {
            for position in [1, 3] {
                display.dispose_drawable(order[position]);
                order[position] = display.create_drawable(Canvas, InstanceId(100 + u32::try_from(position).unwrap()));
            }
        }
        let intervals_a = [
            ChangeInterval::new(Some(order_a[0]), Some(order_a[2])),
            ChangeInterval::new(Some(order_a[2]), Some(order_a[4])),
        ];
        incremental.relink(&order_a);
        incremental.stitch(
            a,
            order_a.first().copied(),
            order_a.last().copied(),
            &intervals_a,
            &mut Tracer::none(),
        );
        let intervals_b = [
            ChangeInterval::new(Some(order_b[0]), Some(order_b[2])),
            ChangeInterval::new(Some(order_b[2]), Some(order_b[4])),
        ];
        run_stitcher(&mut stitcher, &mut rebuild, b, &order_b, &intervals_b);

        incremental.check_invariants(a);
        rebuild.check_invariants(b);
        assert_eq!(partition(&incremental, a), partition(&rebuild, b));
        assert_eq!(incremental.blocks(a).count(), 3);
    }

    /// Linear congruential generator, enough to shuffle edits deterministically.
    struct Lcg(u64);

    impl Lcg {
        fn below(&mut self, n: usize) -> usize {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            usize::try_from(self.0 >> 33).unwrap() % n
        }

        fn renderer(&mut self) -> Renderer {
            Renderer::ALL[self.below(Renderer::COUNT)]
        }
    }

    #[derive(Clone, Copy, Debug)]
    enum Edit {
        Insert(usize, Renderer),
        Remove(usize),
        Replace(usize, Renderer),
        Move(usize, usize),
    }

    /// A display plus the order its root backbone should show.
    struct Scene {
        display: Display,
        root: BackboneId,
        order: Vec<DrawableId>,
        next_instance: u32,
    }

    impl Scene {
        fn new() -> Self {
            let (mut display, _log) = RecordingStrategy::display();
            let root = display.create_backbone();
            Self {
                display,
                root,
                order: Vec::new(),
                next_instance: 0,
            }
        }

        fn spawn(&mut self, renderer: Renderer) -> DrawableId {
            self.next_instance += 1;
            self.display
                .create_drawable(renderer, InstanceId(self.next_instance))
        }

        fn apply(&mut self, edit: Edit) {
            match edit {
                Edit::Insert(at, renderer) => {
                    let id = self.spawn(renderer);
                    self.order.insert(at, id);
                }
                Edit::Remove(at) => {
                    let id = self.order.remove(at);
                    self.display.dispose_drawable(id);
                }
                Edit::Replace(at, renderer) => {
                    self.display.dispose_drawable(self.order[at]);
                    self.order[at] = self.spawn(renderer);
                }
                Edit::Move(from, to) => {
                    let id = self.order.remove(from);
                    self.order.insert(to, id);
                }
            }
        }
    }

    /// One interval bounded by the common prefix and suffix of two orders.
    fn diff(old: &[DrawableId], new: &[DrawableId]) -> Vec<ChangeInterval> {
        if old == new {
            return Vec::new();
        }
        let limit = old.len().min(new.len());
        let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
        let suffix = old
            .iter()
            .rev()
            .zip(new.iter().rev())
            .take(limit - prefix)
            .take_while(|(a, b)| a == b)
            .count();
        let before = prefix.checked_sub(1).map(|i| new[i]);
        let after = (suffix > 0).then(|| new[new.len() - suffix]);
        vec![ChangeInterval::new(before, after)]
    }

    #[test]
    fn incremental_matches_rebuild() {
        let mut rng = Lcg(0x5eed);
        let mut incremental = Scene::new();
        let mut rebuild = Scene::new();
        let mut rebuilder = RebuildStitcher::new();
        let mut stitcher = IncrementalStitcher::new();

        for frame_number in 0..200 {
            let old = incremental.order.clone();
            for _ in 0..=rng.below(3) {
                let len = incremental.order.len();
                let edit = match rng.below(if len == 0 { 1 } else { 4 }) {
                    0 => Edit::Insert(rng.below(len + 1), rng.renderer()),
                    1 => Edit::Remove(rng.below(len)),
                    2 => Edit::Replace(rng.below(len), rng.renderer()),
                    _ => Edit::Move(rng.below(len), rng.below(len)),
                };
                incremental.apply(edit);
                rebuild.apply(edit);
            }

            let intervals = if rng.below(10) == 0 {
                vec![ChangeInterval::FULL]
            } else {
                diff(&old, &incremental.order)
            };
            let stats = run_stitcher(
                &mut stitcher,
                &mut incremental.display,
                incremental.root,
                &incremental.order,
                &intervals,
            );
            assert_eq!(stitcher.phase(), StitchPhase::Cleaned);
            assert_eq!(stats.fast_path, intervals.is_empty() && old == incremental.order);
            run_stitcher(
                &mut rebuilder,
                &mut rebuild.display,
                rebuild.root,
                &rebuild.order,
                &[ChangeInterval::FULL],
            );

            for scene in [&incremental, &rebuild] {
                scene.display.check_invariants(scene.root);
                assert_eq!(
                    scene.display.flatten(scene.root),
                    scene.order,
                    "order lost in frame {frame_number}"
                );
            }
            assert_eq!(
                partition(&incremental.display, incremental.root),
                partition(&rebuild.display, rebuild.root),
                "partitions diverged in frame {frame_number}"
            );
            incremental.display.update(&mut Tracer::none());
            rebuild.display.update(&mut Tracer::none());
        }
    }

    #[test]
    fn appended_drawable_joins_tail_block() {
        use Renderer::{Canvas, Dom, Svg, WebGl};
        let renderers = [Canvas, Canvas, Dom, Svg, Svg, Canvas, Dom, WebGl];

        let (mut display, log) = RecordingStrategy::display();
        let root = display.create_backbone();
        let mut order = spawn(&mut display, &renderers);
        frame(&mut display, root, &order);
        log.borrow_mut().clear();

        let tail = display.create_drawable(WebGl, InstanceId(50));
        let before = *order.last().unwrap();
        order.push(tail);
        display.relink(&order);
        display.stitch(
            root,
            order.first().copied(),
            order.last().copied(),
            &[ChangeInterval::new(Some(before), None)],
            &mut Tracer::none(),
        );
        display.check_invariants(root);
        assert_eq!(block_events(&log), (0, 0), "the tail block absorbs the new drawable");
    }
}
