// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for renderer implementations.
//!
//! Each [`Renderer`] is served by one [`RenderStrategy`] registered on the
//! [`Display`](crate::display::Display). The strategy is selected by a single
//! match on the drawable's renderer tag when the drawable is created, and all
//! later backend work for that drawable and the blocks it joins goes through
//! the same strategy. The stitchers never see backend types.
//!
//! Strategies keep their per-drawable and per-block state keyed by raw slot
//! index ([`DrawableId::index`], [`BlockId::index`]). Slots are pooled per
//! renderer, so a strategy may keep a released drawable's element around and
//! reuse it when the slot is initialized again.
//!
//! # Hook order
//!
//! For one drawable over its life:
//!
//! ```text
//!   initialize_drawable ─► (on_add_to_block ─► update_drawable* / draw*
//!                           ─► on_remove_from_block)* ─► release_drawable
//! ```
//!
//! For one block:
//!
//! ```text
//!   create_block ─► order_block ─► (fit_block | arrange_block |
//!       clear_block ─► draw* ─► finish_block_paint)* ─► dispose_block
//! ```
//!
//! # Failures
//!
//! A strategy that cannot acquire a native resource (lost WebGL context,
//! failed element creation) reports it from [`create_block`] or
//! [`on_add_to_block`], or returns [`PaintOutcome::Unavailable`] from
//! [`draw`]. The affected block is marked failed and skipped; the rest of the
//! frame keeps rendering. [`update_drawable`] has no error channel.
//!
//! [`create_block`]: RenderStrategy::create_block
//! [`on_add_to_block`]: RenderStrategy::on_add_to_block
//! [`draw`]: RenderStrategy::draw
//! [`update_drawable`]: RenderStrategy::update_drawable

use core::fmt;

use kurbo::{Affine, Rect};

use crate::id::{BackboneId, BlockId, DrawableId, InstanceId, PaintKey, ResourceKey};
use crate::renderer::Renderer;

/// Read-only snapshot of a drawable handed to strategy hooks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawableView {
    /// The drawable.
    pub id: DrawableId,
    /// Node instance the drawable renders.
    pub instance: InstanceId,
    /// Renderer tag.
    pub renderer: Renderer,
    /// Bounds in the owning backbone's coordinate frame.
    pub bounds: Rect,
    /// Whether the instance is currently visible.
    pub visible: bool,
    /// Owning block, if any.
    pub block: Option<BlockId>,
    /// Nested backbone this drawable backs, if any.
    pub backbone: Option<BackboneId>,
}

/// Read-only snapshot of a block handed to strategy hooks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockView {
    /// The block.
    pub id: BlockId,
    /// Renderer tag.
    pub renderer: Renderer,
    /// Backbone whose block list holds this block.
    pub backbone: BackboneId,
    /// Backing drawable of that backbone (`None` for a root backbone).
    pub backbone_drawable: Option<DrawableId>,
    /// Position in the backbone's block list (paint order, back to front).
    pub index: u32,
    /// Current fit bounds (empty when the block has no visible content).
    pub fit_bounds: Rect,
}

/// Read-only snapshot of a backbone handed to
/// [`RenderStrategy::update_backbone`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackboneView {
    /// The backbone.
    pub id: BackboneId,
    /// Backing drawable (`None` for a root backbone).
    pub drawable: Option<DrawableId>,
    /// Transform applied to everything inside the backbone.
    pub transform: Affine,
    /// Clip applied to everything inside the backbone, in its local frame.
    pub clip: Option<Rect>,
}

/// Result of asking a strategy to draw one drawable into its block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaintOutcome {
    /// Something was drawn; the surface must be cleared before the next
    /// repaint.
    Painted,
    /// Nothing was drawn (hidden, empty geometry).
    Empty,
    /// The native surface is not usable right now; the block is marked
    /// failed and keeps its last contents.
    Unavailable,
}

/// A backend resource failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendError {
    /// The rendering context was lost (e.g. a WebGL context-loss event).
    ContextLost,
    /// A native object could not be created.
    CreateFailed(&'static str),
    /// No strategy handles the renderer, or it cannot host the request.
    Unsupported(Renderer),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContextLost => write!(f, "rendering context lost"),
            Self::CreateFailed(what) => write!(f, "failed to create {what}"),
            Self::Unsupported(renderer) => write!(f, "renderer {renderer} unsupported"),
        }
    }
}

impl core::error::Error for BackendError {}

/// Renderer-specific behavior for drawables and the blocks that host them.
///
/// Every method except [`renderer`](Self::renderer) has a no-op default so a
/// strategy only implements the hooks its backend needs. Retained renderers
/// (DOM, SVG) do their work in [`update_drawable`](Self::update_drawable);
/// immediate renderers (Canvas, WebGL) in [`draw`](Self::draw).
pub trait RenderStrategy {
    /// The renderer this strategy serves.
    fn renderer(&self) -> Renderer;

    /// A pooled drawable slot was bound to `drawable.instance`.
    fn initialize_drawable(&mut self, drawable: &DrawableView) {
        _ = drawable;
    }

    /// The drawable slot was returned to the pool.
    fn release_drawable(&mut self, drawable: DrawableId) {
        _ = drawable;
    }

    /// Applies the drawable's accumulated dirty state to its backend object.
    ///
    /// Returns whether the base bookkeeping (clearing the dirty flag) should
    /// continue. Return `false` to leave the drawable dirty, e.g. when it was
    /// detached while updating.
    fn update_drawable(&mut self, drawable: &DrawableView) -> bool {
        _ = drawable;
        true
    }

    /// Draws one member of an immediate-mode block.
    fn draw(&mut self, block: &BlockView, drawable: &DrawableView) -> PaintOutcome {
        _ = (block, drawable);
        PaintOutcome::Empty
    }

    /// Creates the native surface for a new block.
    fn create_block(&mut self, block: &BlockView) -> Result<(), BackendError> {
        _ = block;
        Ok(())
    }

    /// Destroys the native surface of a block.
    fn dispose_block(&mut self, block: BlockId) {
        _ = block;
    }

    /// The block's position in its backbone changed.
    fn order_block(&mut self, block: &BlockView) {
        _ = block;
    }

    /// The block's fit bounds changed.
    fn fit_block(&mut self, block: &BlockView) {
        _ = block;
    }

    /// Clears an immediate-mode block before it is repainted.
    fn clear_block(&mut self, block: &BlockView) {
        _ = block;
    }

    /// All members of an immediate-mode block have been drawn.
    fn finish_block_paint(&mut self, block: &BlockView) {
        _ = block;
    }

    /// The membership of a retained-mode block changed.
    ///
    /// `members` lists the block's drawables in display order, so backends
    /// that keep one element per drawable can fix their sibling order.
    fn arrange_block(&mut self, block: &BlockView, members: &[DrawableId]) {
        _ = (block, members);
    }

    /// The drawable joined the block.
    fn on_add_to_block(
        &mut self,
        block: &BlockView,
        drawable: &DrawableView,
    ) -> Result<(), BackendError> {
        _ = (block, drawable);
        Ok(())
    }

    /// The drawable left the block.
    ///
    /// Infallible: only [`on_add_to_block`](Self::on_add_to_block) reports
    /// resource failures. Runs for members of failed blocks too, so partial
    /// attach state can be released.
    fn on_remove_from_block(&mut self, block: BlockId, drawable: DrawableId) {
        _ = (block, drawable);
    }

    /// Creates a shared paint resource inside a block.
    fn create_paint(&mut self, block: BlockId, paint: PaintKey) -> Option<ResourceKey> {
        _ = (block, paint);
        None
    }

    /// Destroys a shared paint resource.
    fn destroy_paint(&mut self, block: BlockId, paint: PaintKey, resource: Option<ResourceKey>) {
        _ = (block, paint, resource);
    }

    /// Applies a backbone's transform and clip.
    fn update_backbone(&mut self, backbone: &BackboneView) {
        _ = backbone;
    }
}

/// The registered strategies, one slot per renderer.
#[derive(Default)]
pub struct Strategies {
    slots: [Option<alloc::boxed::Box<dyn RenderStrategy>>; Renderer::COUNT],
}

impl fmt::Debug for Strategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for renderer in Renderer::ALL {
            if self.slots[renderer.index()].is_some() {
                list.entry(&renderer);
            }
        }
        list.finish()
    }
}

impl Strategies {
    /// Installs `strategy` for its renderer, returning the one it replaces.
    pub fn insert(
        &mut self,
        strategy: alloc::boxed::Box<dyn RenderStrategy>,
    ) -> Option<alloc::boxed::Box<dyn RenderStrategy>> {
        let slot = strategy.renderer().index();
        self.slots[slot].replace(strategy)
    }

    /// Returns the strategy for `renderer`, if one is registered.
    #[must_use]
    pub fn get(&self, renderer: Renderer) -> Option<&dyn RenderStrategy> {
        self.slots[renderer.index()].as_deref()
    }

    /// Returns the strategy for `renderer` mutably, if one is registered.
    pub fn get_mut(&mut self, renderer: Renderer) -> Option<&mut (dyn RenderStrategy + 'static)> {
        self.slots[renderer.index()].as_deref_mut()
    }

    /// Whether a strategy is registered for `renderer`.
    #[must_use]
    pub fn contains(&self, renderer: Renderer) -> bool {
        self.slots[renderer.index()].is_some()
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::ToString;

    use super::*;

    struct Nothing(Renderer);

    impl RenderStrategy for Nothing {
        fn renderer(&self) -> Renderer {
            self.0
        }
    }

    #[test]
    fn insert_replaces_per_renderer() {
        let mut strategies = Strategies::default();
        assert!(strategies.insert(Box::new(Nothing(Renderer::Svg))).is_none());
        assert!(strategies.insert(Box::new(Nothing(Renderer::Canvas))).is_none());
        assert!(strategies.insert(Box::new(Nothing(Renderer::Svg))).is_some());
        assert!(strategies.contains(Renderer::Svg));
        assert!(!strategies.contains(Renderer::Dom));
        assert_eq!(
            strategies.get(Renderer::Canvas).map(|s| s.renderer()),
            Some(Renderer::Canvas)
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            BackendError::ContextLost.to_string(),
            "rendering context lost"
        );
        assert_eq!(
            BackendError::Unsupported(Renderer::WebGl).to_string(),
            "renderer webgl unsupported"
        );
    }
}
