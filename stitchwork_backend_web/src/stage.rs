// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element registry shared by the web strategies.

use alloc::vec::Vec;

use stitchwork_core::backend::{BackendError, BlockView};
use stitchwork_core::id::DrawableId;
use web_sys::{Document, Element, HtmlElement};

/// The container and DOM drawable elements every strategy places into.
///
/// DOM drawables own their `<div>`s here rather than inside
/// [`DomStrategy`](crate::DomStrategy) because a DOM drawable may back a
/// nested backbone, and the other strategies place their block surfaces
/// inside it.
pub struct Stage {
    document: Document,
    root: HtmlElement,
    elements: Vec<Option<HtmlElement>>,
}

impl core::fmt::Debug for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stage")
            .field("root", &"HtmlElement")
            .field("elements_len", &self.elements.len())
            .finish_non_exhaustive()
    }
}

impl Stage {
    /// Creates a stage rendering into `root`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::CreateFailed`] if `root` has no owner
    /// document.
    pub fn new(root: HtmlElement) -> Result<Self, BackendError> {
        let document = root
            .owner_document()
            .ok_or(BackendError::CreateFailed("owner document"))?;
        Ok(Self {
            document,
            root,
            elements: Vec::new(),
        })
    }

    /// Returns the document elements are created in.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Returns the root backbone's host element.
    #[must_use]
    pub fn root(&self) -> &HtmlElement {
        &self.root
    }

    /// Returns the element of the DOM drawable in slot `idx`, if any.
    #[must_use]
    pub fn element(&self, idx: u32) -> Option<&HtmlElement> {
        self.elements.get(idx as usize).and_then(|slot| slot.as_ref())
    }

    /// Stores an element at the given slot index, growing the vec if needed.
    pub(crate) fn put_element(&mut self, idx: u32, el: HtmlElement) {
        let slot = idx as usize;
        if self.elements.len() <= slot {
            self.elements.resize_with(slot + 1, || None);
        }
        self.elements[slot] = Some(el);
    }

    /// Returns the element hosting the blocks of the backbone backed by
    /// `drawable` (`None` for the root backbone).
    #[must_use]
    pub fn host(&self, drawable: Option<DrawableId>) -> Option<&HtmlElement> {
        match drawable {
            None => Some(&self.root),
            Some(id) => self.element(id.index()),
        }
    }

    /// Appends a block surface to its backbone's host.
    pub(crate) fn place(&self, surface: &Element, block: &BlockView) -> Result<(), BackendError> {
        let host = self
            .host(block.backbone_drawable)
            .ok_or(BackendError::CreateFailed("backbone host"))?;
        host.append_child(surface)
            .map_err(|_| BackendError::CreateFailed("block surface"))?;
        Ok(())
    }
}
