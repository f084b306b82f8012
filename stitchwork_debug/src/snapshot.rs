// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON snapshots of a display's block layout.
//!
//! [`backbone_json`] describes what a backbone last committed: its blocks in
//! paint order, each block's renderer, fit bounds and failed flag, and its
//! members in display order. Members that back a nested backbone carry that
//! backbone's snapshot inline, so a root snapshot covers the whole tree.

use std::io::{self, Write};

use kurbo::Rect;
use serde_json::{Value, json};

use stitchwork_core::Display;
use stitchwork_core::id::{BackboneId, BlockId, DrawableId};

fn rect_json(rect: Rect) -> Value {
    json!([rect.x0, rect.y0, rect.x1, rect.y1])
}

fn drawable_json(display: &Display, id: DrawableId) -> Value {
    let store = display.drawables();
    let mut value = json!({
        "index": id.index(),
        "generation": id.generation(),
        "instance": store.instance(id).0,
        "renderer": store.renderer(id).name(),
        "bounds": rect_json(store.bounds(id)),
        "visible": store.visible(id),
    });
    if let Some(nested) = display.nested_backbone(id) {
        value["backbone"] = backbone_json(display, nested);
    }
    value
}

fn block_json(display: &Display, id: BlockId) -> Value {
    let members: Vec<Value> = display
        .block_members(id)
        .map(|member| drawable_json(display, member))
        .collect();
    json!({
        "index": id.index(),
        "generation": id.generation(),
        "position": display.block_index(id),
        "renderer": display.block_renderer(id).name(),
        "fit_bounds": rect_json(display.block_fit_bounds(id)),
        "failed": display.block_failed(id),
        "members": members,
    })
}

/// Describes a backbone's committed blocks and members as JSON.
///
/// # Panics
///
/// Panics if `backbone` is stale.
#[must_use]
pub fn backbone_json(display: &Display, backbone: BackboneId) -> Value {
    let blocks: Vec<Value> = display
        .blocks(backbone)
        .map(|block| block_json(display, block))
        .collect();
    let transform = display.backbone_transform(backbone).as_coeffs();
    json!({
        "index": backbone.index(),
        "generation": backbone.generation(),
        "transform": transform,
        "clip": display.backbone_clip(backbone).map(rect_json),
        "blocks": blocks,
    })
}

/// Writes [`backbone_json`] for `backbone` as indented JSON.
pub fn write_pretty(
    display: &Display,
    backbone: BackboneId,
    writer: &mut dyn Write,
) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &backbone_json(display, backbone))?;
    writeln!(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitchwork_core::stitch::ChangeInterval;
    use stitchwork_core::trace::Tracer;
    use stitchwork_core::{InstanceId, Renderer};

    fn stitch(display: &mut Display, backbone: BackboneId, order: &[DrawableId]) {
        display.relink(order);
        display.stitch(
            backbone,
            order.first().copied(),
            order.last().copied(),
            &[ChangeInterval::FULL],
            &mut Tracer::none(),
        );
    }

    #[test]
    fn blocks_and_members_in_paint_order() {
        let mut display = Display::new();
        let root = display.create_backbone();
        let a = display.create_drawable(Renderer::Canvas, InstanceId(10));
        let b = display.create_drawable(Renderer::Canvas, InstanceId(11));
        let c = display.create_drawable(Renderer::Svg, InstanceId(12));
        display.set_bounds(a, Rect::new(0.0, 0.0, 4.0, 4.0));
        stitch(&mut display, root, &[a, b, c]);

        let json = backbone_json(&display, root);
        let blocks = json["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 2, "canvas run then svg run");
        assert_eq!(blocks[0]["renderer"], "canvas");
        assert_eq!(blocks[0]["position"], 0);
        assert_eq!(blocks[1]["renderer"], "svg");
        assert_eq!(blocks[1]["position"], 1);

        let members = blocks[0]["members"].as_array().unwrap();
        let instances: Vec<_> = members.iter().map(|m| m["instance"].clone()).collect();
        assert_eq!(instances, [json!(10), json!(11)]);
        assert_eq!(members[0]["bounds"], json!([0.0, 0.0, 4.0, 4.0]));
        assert_eq!(json["clip"], Value::Null);
    }

    #[test]
    fn nested_backbone_is_inlined_under_its_drawable() {
        let mut display = Display::new();
        let root = display.create_backbone();
        let (inner, host) = display.create_nested_backbone(root, InstanceId(1));
        let leaf = display.create_drawable(Renderer::WebGl, InstanceId(2));
        display.set_backbone_clip(inner, Some(Rect::new(0.0, 0.0, 8.0, 8.0)));

        stitch(&mut display, root, &[host]);
        stitch(&mut display, inner, &[leaf]);

        let json = backbone_json(&display, root);
        let host_json = &json["blocks"][0]["members"][0];
        assert_eq!(host_json["renderer"], "dom");
        let nested = &host_json["backbone"];
        assert_eq!(nested["index"], inner.index());
        assert_eq!(nested["clip"], json!([0.0, 0.0, 8.0, 8.0]));
        assert_eq!(nested["blocks"][0]["renderer"], "webgl");
        assert_eq!(nested["blocks"][0]["members"][0]["instance"], 2);
    }

    #[test]
    fn write_pretty_emits_parseable_json() {
        let mut display = Display::new();
        let root = display.create_backbone();
        let mut out = Vec::new();
        write_pretty(&display, root, &mut out).unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["blocks"], json!([]));
        assert_eq!(parsed["transform"], json!([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]));
    }
}
