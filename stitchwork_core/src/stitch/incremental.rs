// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;
use core::ops::Range;

use super::{
    ChangeInterval, StitchPass, StitchPhase, StitchRequest, StitchStats, Stitcher, collect_runs,
};
use crate::display::Display;
use crate::drawable::slot;
use crate::id::{DrawableId, INVALID};
use crate::trace::{StitchKind, Tracer};

/// Touches only the blocks around the change intervals.
///
/// Each interval is widened to the blocks owning its bounding drawables, so
/// the rebuilt region always starts and ends on an existing block boundary;
/// widened regions that overlap are merged. Blocks inside a region are
/// reclaimed for new runs of the same renderer before any new block is
/// created. Blocks outside every region are not visited at all.
///
/// A request with no intervals and an unchanged range is skipped entirely.
/// A request with no intervals but a changed range is treated as one
/// interval covering the whole list.
#[derive(Debug)]
pub struct IncrementalStitcher {
    phase: StitchPhase,
}

impl Default for IncrementalStitcher {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalStitcher {
    /// Creates a stitcher in the [`Initialized`](StitchPhase::Initialized)
    /// phase.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: StitchPhase::Initialized,
        }
    }
}

/// A run of the backbone's block list to rebuild.
#[derive(Clone, Copy, Debug)]
struct Region {
    /// Block positions `start..end` in the previous block list.
    start: usize,
    end: usize,
    /// New-order range covered by the rebuilt blocks.
    first: u32,
    last: u32,
}

/// Returns the block owning `drawable` in `backbone`, if any.
fn owner(display: &Display, backbone: u32, drawable: DrawableId) -> Option<u32> {
    debug_assert!(
        display.drawables.is_alive(drawable),
        "interval bounded by stale drawable {drawable:?}"
    );
    if !display.drawables.is_alive(drawable) {
        return None;
    }
    let block = display.drawables.block[drawable.idx as usize];
    debug_assert!(
        block != INVALID && display.blocks.backbone[block as usize] == backbone,
        "interval bound {drawable:?} is not placed in this backbone"
    );
    (block != INVALID && display.blocks.backbone[block as usize] == backbone).then_some(block)
}

fn regions(
    display: &Display,
    backbone: u32,
    previous: &[u32],
    intervals: &[ChangeInterval],
    request: &StitchRequest<'_>,
) -> Vec<Region> {
    let mut regions: Vec<Region> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        let (start, first) = match interval.before.and_then(|d| owner(display, backbone, d)) {
            Some(block) => (
                display.blocks.index[block as usize] as usize,
                display.blocks.first[block as usize],
            ),
            None => (0, slot(request.first)),
        };
        let (end, last) = match interval.after.and_then(|d| owner(display, backbone, d)) {
            Some(block) => (
                display.blocks.index[block as usize] as usize + 1,
                display.blocks.last[block as usize],
            ),
            None => (previous.len(), slot(request.last)),
        };
        debug_assert!(start <= end, "change intervals out of order");

        if let Some(region) = regions.last_mut()
            && start < region.end
        {
            if end >= region.end {
                region.end = end;
                region.last = last;
            }
            continue;
        }
        regions.push(Region {
            start,
            end,
            first,
            last,
        });
    }
    regions
}

impl Stitcher for IncrementalStitcher {
    fn stitch(
        &mut self,
        display: &mut Display,
        request: &StitchRequest<'_>,
        tracer: &mut Tracer<'_>,
    ) -> StitchStats {
        self.phase = StitchPhase::Initialized;
        let mut pass = StitchPass::begin(display, request);
        if request.is_unchanged() {
            let (phase, stats) = pass.skip(display, request, StitchKind::Incremental, tracer);
            self.phase = phase;
            return stats;
        }
        let full = [ChangeInterval::FULL];
        let intervals = if request.intervals.is_empty() {
            &full[..]
        } else {
            request.intervals
        };
        let backbone = pass.backbone;

        let previous = display.backbones.blocks[backbone as usize].clone();
        pass.advance(StitchPhase::BoundariesRecorded);

        let regions = regions(display, backbone, &previous, intervals, request);
        let mut candidates: Vec<Range<usize>> = Vec::with_capacity(regions.len());
        for region in &regions {
            let start = pass.candidate_count();
            for &block in &previous[region.start..region.end] {
                pass.note_block_members(display, block);
                pass.add_candidate(block);
            }
            candidates.push(start..pass.candidate_count());
        }
        pass.advance(StitchPhase::OldBlocksRemoved);

        let mut replacements: Vec<Vec<u32>> = Vec::with_capacity(regions.len());
        for (region, candidates) in regions.iter().zip(candidates) {
            let mut blocks = Vec::new();
            for run in collect_runs(display, region.first, region.last) {
                let block = match pass.reclaim(display, candidates.clone(), &run) {
                    Some(block) => block,
                    None => pass.create(display, &run, tracer),
                };
                pass.assign(display, run, block);
                blocks.push(block);
            }
            pass.commit_range(region.first, region.last);
            replacements.push(blocks);
        }
        // Back to front, so earlier positions stay valid.
        let list = &mut display.backbones.blocks[backbone as usize];
        for (region, blocks) in regions.iter().zip(replacements).rev() {
            _ = list.splice(region.start..region.end, blocks);
        }
        pass.advance(StitchPhase::NewBlocksConstructed);

        pass.notify_intervals(display);
        pass.reindex(display, tracer);
        let (phase, stats) = pass.clean(display, request, StitchKind::Incremental, tracer);
        self.phase = phase;
        stats
    }

    fn phase(&self) -> StitchPhase {
        self.phase
    }
}
