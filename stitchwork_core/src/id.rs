// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handle and key types.
//!
//! Drawables, blocks, and backbones live in arena stores owned by a
//! [`Display`](crate::display::Display). Each is addressed by a generational
//! handle: a slot index plus a generation counter that is bumped whenever the
//! slot is returned to its pool, so handles held across a dispose are
//! detected as stale instead of silently aliasing a recycled object.

use core::fmt;

use crate::renderer::Renderer;

/// Sentinel value indicating "no drawable", "no block", or "no backbone" in
/// index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a drawable in a [`DrawableStore`](crate::drawable::DrawableStore).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawableId {
    /// Slot index into the store's arrays.
    pub(crate) idx: u32,
    /// Generation counter; must match the store's generation for this slot.
    pub(crate) generation: u32,
}

impl DrawableId {
    /// Returns the raw slot index.
    ///
    /// Slot indices are stable for the lifetime of the drawable, which makes
    /// them suitable as keys for per-drawable backend state.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for DrawableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DrawableId({}@gen{})", self.idx, self.generation)
    }
}

/// A handle to a block in a [`BlockStore`](crate::block::BlockStore).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl BlockId {
    /// Returns the raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({}@gen{})", self.idx, self.generation)
    }
}

/// A handle to a backbone in a [`BackboneStore`](crate::backbone::BackboneStore).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackboneId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl BackboneId {
    /// Returns the raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for BackboneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BackboneId({}@gen{})", self.idx, self.generation)
    }
}

/// An opaque reference to the node instance a drawable renders.
///
/// Instances belong to the external node layer. The core never interprets
/// the value; it is handed back to render strategies so they can ask the node
/// layer to update the instance's appearance.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub u32);

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", self.0)
    }
}

/// An opaque reference to a shared paint (gradient, pattern, filter).
///
/// Many drawables may reference the same paint; blocks keep one backend
/// resource per distinct paint used by their members.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaintKey(pub u32);

impl fmt::Debug for PaintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaintKey({})", self.0)
    }
}

/// An opaque handle to a backend-managed resource (gradient element, buffer,
/// texture).
///
/// Resource keys are assigned by render strategies and passed back to them
/// without interpretation by the core.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey(pub u64);

impl fmt::Debug for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceKey({})", self.0)
    }
}

/// Key of one shared paint resource inside one block.
///
/// Used as the [`CountMap`](crate::count_map::CountMap) key for per-block
/// paint reference counting; carries enough context for the factory to reach
/// the right render strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockPaint {
    /// The block holding the resource.
    pub block: BlockId,
    /// Renderer of the block.
    pub renderer: Renderer,
    /// The shared paint.
    pub paint: PaintKey,
}
