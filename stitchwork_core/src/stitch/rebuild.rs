// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;

use super::{StitchPass, StitchPhase, StitchRequest, StitchStats, Stitcher, collect_runs};
use crate::display::Display;
use crate::drawable::{DrawableList, Links, slot};
use crate::trace::{StitchKind, Tracer};

/// Replaces every block of the backbone on every pass.
///
/// Walks the whole old order, detaches all blocks, and builds a fresh block
/// per run of the new order. It does strictly more backend work than
/// [`IncrementalStitcher`](super::IncrementalStitcher) and serves as its
/// reference.
#[derive(Debug)]
pub struct RebuildStitcher {
    phase: StitchPhase,
}

impl Default for RebuildStitcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RebuildStitcher {
    /// Creates a stitcher in the [`Initialized`](StitchPhase::Initialized)
    /// phase.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: StitchPhase::Initialized,
        }
    }
}

impl Stitcher for RebuildStitcher {
    fn stitch(
        &mut self,
        display: &mut Display,
        request: &StitchRequest<'_>,
        tracer: &mut Tracer<'_>,
    ) -> StitchStats {
        self.phase = StitchPhase::Initialized;
        let mut pass = StitchPass::begin(display, request);
        if request.is_unchanged() {
            let (phase, stats) = pass.skip(display, request, StitchKind::Rebuild, tracer);
            self.phase = phase;
            return stats;
        }
        let backbone = pass.backbone as usize;

        let previous = core::mem::take(&mut display.backbones.blocks[backbone]);
        pass.advance(StitchPhase::BoundariesRecorded);

        let old: Vec<u32> = DrawableList::new(
            &display.drawables,
            slot(request.old_first),
            slot(request.old_last),
            Links::Old,
        )
        .map(|id| id.index())
        .collect();
        for drawable in old {
            pass.note_removal(display, drawable);
        }
        for block in previous {
            pass.add_candidate(block);
        }
        pass.advance(StitchPhase::OldBlocksRemoved);

        let mut blocks = Vec::new();
        for run in collect_runs(display, slot(request.first), slot(request.last)) {
            let block = pass.create(display, &run, tracer);
            pass.assign(display, run, block);
            blocks.push(block);
        }
        display.backbones.blocks[backbone] = blocks;
        pass.commit_range(slot(request.first), slot(request.last));
        pass.advance(StitchPhase::NewBlocksConstructed);

        pass.notify_intervals(display);
        pass.reindex(display, tracer);
        let (phase, stats) = pass.clean(display, request, StitchKind::Rebuild, tracer);
        self.phase = phase;
        stats
    }

    fn phase(&self) -> StitchPhase {
        self.phase
    }
}
