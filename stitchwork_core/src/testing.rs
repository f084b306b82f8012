// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A recording render strategy for unit tests.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::ops::{Deref, DerefMut};

use kurbo::Rect;

use crate::backend::{
    BackboneView, BackendError, BlockView, DrawableView, PaintOutcome, RenderStrategy,
};
use crate::display::Display;
use crate::id::{BackboneId, BlockId, DrawableId, InstanceId, PaintKey, ResourceKey};
use crate::renderer::Renderer;
use crate::stitch::{ChangeInterval, StitchStats};
use crate::trace::Tracer;

/// One strategy hook invocation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Call {
    InitializeDrawable(DrawableId, InstanceId),
    ReleaseDrawable(DrawableId),
    UpdateDrawable(DrawableId),
    Draw(BlockId, DrawableId),
    CreateBlock(BlockId, Renderer),
    DisposeBlock(BlockId),
    OrderBlock(BlockId, u32),
    FitBlock(BlockId, Rect),
    ClearBlock(BlockId),
    FinishBlockPaint(BlockId),
    ArrangeBlock(BlockId, usize),
    AddToBlock(BlockId, DrawableId),
    RemoveFromBlock(BlockId, DrawableId),
    CreatePaint(BlockId, PaintKey),
    DestroyPaint(BlockId, PaintKey),
    UpdateBackbone(BackboneId),
}

/// Calls recorded by every strategy of a display, plus injected failures.
#[derive(Debug, Default)]
pub(crate) struct Log {
    calls: Vec<Call>,
    fail_create: [bool; Renderer::COUNT],
    fail_attach: [bool; Renderer::COUNT],
    fail_draw: [bool; Renderer::COUNT],
    defer_updates: bool,
}

impl Deref for Log {
    type Target = Vec<Call>;

    fn deref(&self) -> &Vec<Call> {
        &self.calls
    }
}

impl DerefMut for Log {
    fn deref_mut(&mut self) -> &mut Vec<Call> {
        &mut self.calls
    }
}

pub(crate) type SharedLog = Rc<RefCell<Log>>;

/// Records every hook into a shared [`Log`].
pub(crate) struct RecordingStrategy {
    renderer: Renderer,
    log: SharedLog,
}

impl RecordingStrategy {
    pub(crate) fn new(renderer: Renderer, log: &SharedLog) -> Self {
        Self {
            renderer,
            log: Rc::clone(log),
        }
    }

    /// A display with a recording strategy for every renderer.
    pub(crate) fn display() -> (Display, SharedLog) {
        let log = SharedLog::default();
        let mut display = Display::new();
        for renderer in Renderer::ALL {
            display.register_strategy(Box::new(Self::new(renderer, &log)));
        }
        (display, log)
    }

    pub(crate) fn fail_create(log: &SharedLog, renderer: Renderer) {
        log.borrow_mut().fail_create[renderer.index()] = true;
    }

    pub(crate) fn fail_attach(log: &SharedLog, renderer: Renderer) {
        log.borrow_mut().fail_attach[renderer.index()] = true;
    }

    pub(crate) fn fail_draw(log: &SharedLog, renderer: Renderer) {
        log.borrow_mut().fail_draw[renderer.index()] = true;
    }

    pub(crate) fn defer_updates(log: &SharedLog, defer: bool) {
        log.borrow_mut().defer_updates = defer;
    }

    /// Clears every injected failure.
    pub(crate) fn heal(log: &SharedLog) {
        let mut log = log.borrow_mut();
        log.fail_create = [false; Renderer::COUNT];
        log.fail_attach = [false; Renderer::COUNT];
        log.fail_draw = [false; Renderer::COUNT];
    }

    fn push(&self, call: Call) {
        self.log.borrow_mut().calls.push(call);
    }
}

impl RenderStrategy for RecordingStrategy {
    fn renderer(&self) -> Renderer {
        self.renderer
    }

    fn initialize_drawable(&mut self, drawable: &DrawableView) {
        self.push(Call::InitializeDrawable(drawable.id, drawable.instance));
    }

    fn release_drawable(&mut self, drawable: DrawableId) {
        self.push(Call::ReleaseDrawable(drawable));
    }

    fn update_drawable(&mut self, drawable: &DrawableView) -> bool {
        if self.log.borrow().defer_updates {
            return false;
        }
        self.push(Call::UpdateDrawable(drawable.id));
        true
    }

    fn draw(&mut self, block: &BlockView, drawable: &DrawableView) -> PaintOutcome {
        if self.log.borrow().fail_draw[self.renderer.index()] {
            return PaintOutcome::Unavailable;
        }
        self.push(Call::Draw(block.id, drawable.id));
        if drawable.visible {
            PaintOutcome::Painted
        } else {
            PaintOutcome::Empty
        }
    }

    fn create_block(&mut self, block: &BlockView) -> Result<(), BackendError> {
        self.push(Call::CreateBlock(block.id, block.renderer));
        if self.log.borrow().fail_create[self.renderer.index()] {
            return Err(BackendError::ContextLost);
        }
        Ok(())
    }

    fn dispose_block(&mut self, block: BlockId) {
        self.push(Call::DisposeBlock(block));
    }

    fn order_block(&mut self, block: &BlockView) {
        self.push(Call::OrderBlock(block.id, block.index));
    }

    fn fit_block(&mut self, block: &BlockView) {
        self.push(Call::FitBlock(block.id, block.fit_bounds));
    }

    fn clear_block(&mut self, block: &BlockView) {
        self.push(Call::ClearBlock(block.id));
    }

    fn finish_block_paint(&mut self, block: &BlockView) {
        self.push(Call::FinishBlockPaint(block.id));
    }

    fn arrange_block(&mut self, block: &BlockView, members: &[DrawableId]) {
        self.push(Call::ArrangeBlock(block.id, members.len()));
    }

    fn on_add_to_block(
        &mut self,
        block: &BlockView,
        drawable: &DrawableView,
    ) -> Result<(), BackendError> {
        self.push(Call::AddToBlock(block.id, drawable.id));
        if self.log.borrow().fail_attach[self.renderer.index()] {
            return Err(BackendError::CreateFailed("test surface"));
        }
        Ok(())
    }

    fn on_remove_from_block(&mut self, block: BlockId, drawable: DrawableId) {
        self.push(Call::RemoveFromBlock(block, drawable));
    }

    fn create_paint(&mut self, block: BlockId, paint: PaintKey) -> Option<ResourceKey> {
        self.push(Call::CreatePaint(block, paint));
        Some(ResourceKey(
            (u64::from(block.index()) << 32) | u64::from(paint.0),
        ))
    }

    fn destroy_paint(&mut self, block: BlockId, paint: PaintKey, resource: Option<ResourceKey>) {
        _ = resource;
        self.push(Call::DestroyPaint(block, paint));
    }

    fn update_backbone(&mut self, backbone: &BackboneView) {
        self.push(Call::UpdateBackbone(backbone.id));
    }
}

/// Relinks `order` and stitches it into `backbone` as one full change.
pub(crate) fn frame(display: &mut Display, backbone: BackboneId, order: &[DrawableId]) -> StitchStats {
    display.relink(order);
    display.stitch(
        backbone,
        order.first().copied(),
        order.last().copied(),
        &[ChangeInterval::FULL],
        &mut Tracer::none(),
    )
}
