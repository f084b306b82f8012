// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! WebGL blocks: members batched into one vertex buffer per block.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use bytemuck::{Pod, Zeroable};
use kurbo::Rect;
use stitchwork_core::backend::{BackendError, BlockView, DrawableView, PaintOutcome, RenderStrategy};
use stitchwork_core::id::BlockId;
use stitchwork_core::renderer::Renderer;
use wasm_bindgen::JsCast as _;
use web_sys::{
    HtmlCanvasElement, WebGlBuffer, WebGlProgram, WebGlRenderingContext as Gl, WebGlShader,
    WebGlUniformLocation,
};

use crate::style::{init_surface, pixel_size, place_rect, set_z_index};
use crate::{NodePainter, Stage};

/// One vertex of a WebGL drawable's triangles.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in backbone coordinates.
    pub position: [f32; 2],
    /// Straight (non-premultiplied) RGBA color.
    pub color: [f32; 4],
}

const VERTEX_SHADER: &str = r#"
attribute vec2 a_position;
attribute vec4 a_color;
uniform vec2 u_origin;
uniform vec2 u_size;
varying vec4 v_color;
void main() {
    vec2 unit = (a_position - u_origin) / u_size;
    gl_Position = vec4(unit.x * 2.0 - 1.0, 1.0 - unit.y * 2.0, 0.0, 1.0);
    v_color = a_color;
}
"#;

const FRAGMENT_SHADER: &str = r#"
precision mediump float;
varying vec4 v_color;
void main() {
    gl_FragColor = v_color;
}
"#;

/// Byte size of [`Vertex`].
const STRIDE: i32 = 24;
/// Byte offset of [`Vertex::color`].
const COLOR_OFFSET: i32 = 8;

struct GlBlock {
    canvas: HtmlCanvasElement,
    gl: Gl,
    program: WebGlProgram,
    buffer: WebGlBuffer,
    origin: Option<WebGlUniformLocation>,
    size: Option<WebGlUniformLocation>,
    bounds: Rect,
    vertices: Vec<Vertex>,
}

/// Renders each WebGL block into its own WebGL `<canvas>`.
///
/// Members append triangles through [`NodePainter::webgl_vertices`]; the
/// whole block is uploaded and drawn with a single call when the repaint
/// finishes. A lost context makes attach fail and every draw report
/// [`PaintOutcome::Unavailable`], so the block is marked failed until it is
/// replaced.
pub struct WebGlStrategy {
    stage: Rc<RefCell<Stage>>,
    painter: Rc<dyn NodePainter>,
    blocks: Vec<Option<GlBlock>>,
}

impl core::fmt::Debug for WebGlStrategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebGlStrategy")
            .field("stage", &self.stage)
            .field("blocks_len", &self.blocks.len())
            .finish_non_exhaustive()
    }
}

impl WebGlStrategy {
    /// Creates a strategy placing canvases on `stage`.
    #[must_use]
    pub fn new(stage: &Rc<RefCell<Stage>>, painter: &Rc<dyn NodePainter>) -> Self {
        Self {
            stage: Rc::clone(stage),
            painter: Rc::clone(painter),
            blocks: Vec::new(),
        }
    }

    fn block(&self, block: BlockId) -> Option<&GlBlock> {
        self.blocks.get(block.index() as usize)?.as_ref()
    }

    fn block_mut(&mut self, block: BlockId) -> Option<&mut GlBlock> {
        self.blocks.get_mut(block.index() as usize)?.as_mut()
    }

    fn create_surface(&self, block: &BlockView) -> Result<GlBlock, BackendError> {
        let stage = self.stage.borrow();
        let canvas: HtmlCanvasElement = stage
            .document()
            .create_element("canvas")
            .map_err(|_| BackendError::CreateFailed("canvas"))?
            .unchecked_into();
        let gl: Gl = canvas
            .get_context("webgl")
            .ok()
            .flatten()
            .ok_or(BackendError::CreateFailed("webgl context"))?
            .dyn_into()
            .map_err(|_| BackendError::CreateFailed("webgl context"))?;

        let vs = compile_shader(&gl, Gl::VERTEX_SHADER, VERTEX_SHADER)?;
        let fs = compile_shader(&gl, Gl::FRAGMENT_SHADER, FRAGMENT_SHADER)?;
        let program = gl
            .create_program()
            .ok_or(BackendError::CreateFailed("webgl program"))?;
        gl.attach_shader(&program, &vs);
        gl.attach_shader(&program, &fs);
        gl.bind_attrib_location(&program, 0, "a_position");
        gl.bind_attrib_location(&program, 1, "a_color");
        gl.link_program(&program);
        if !gl
            .get_program_parameter(&program, Gl::LINK_STATUS)
            .as_bool()
            .unwrap_or(false)
        {
            return Err(if gl.is_context_lost() {
                BackendError::ContextLost
            } else {
                BackendError::CreateFailed("webgl program")
            });
        }
        let buffer = gl
            .create_buffer()
            .ok_or(BackendError::CreateFailed("webgl buffer"))?;
        gl.enable(Gl::BLEND);
        gl.blend_func(Gl::SRC_ALPHA, Gl::ONE_MINUS_SRC_ALPHA);

        let style = canvas.style();
        init_surface(&style);
        let _ = style.set_property("pointer-events", "none");
        set_z_index(&style, block.index);
        stage.place(&canvas, block)?;

        Ok(GlBlock {
            origin: gl.get_uniform_location(&program, "u_origin"),
            size: gl.get_uniform_location(&program, "u_size"),
            canvas,
            gl,
            program,
            buffer,
            bounds: Rect::ZERO,
            vertices: Vec::new(),
        })
    }
}

fn compile_shader(gl: &Gl, kind: u32, source: &str) -> Result<WebGlShader, BackendError> {
    let shader = gl
        .create_shader(kind)
        .ok_or(BackendError::CreateFailed("webgl shader"))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);
    if gl
        .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(shader)
    } else if gl.is_context_lost() {
        Err(BackendError::ContextLost)
    } else {
        Err(BackendError::CreateFailed("webgl shader"))
    }
}

impl RenderStrategy for WebGlStrategy {
    fn renderer(&self) -> Renderer {
        Renderer::WebGl
    }

    fn create_block(&mut self, block: &BlockView) -> Result<(), BackendError> {
        let created = self.create_surface(block)?;
        let slot = block.id.index() as usize;
        if self.blocks.len() <= slot {
            self.blocks.resize_with(slot + 1, || None);
        }
        self.blocks[slot] = Some(created);
        Ok(())
    }

    fn dispose_block(&mut self, block: BlockId) {
        if let Some(surface) = self
            .blocks
            .get_mut(block.index() as usize)
            .and_then(Option::take)
        {
            surface.gl.delete_buffer(Some(&surface.buffer));
            surface.gl.delete_program(Some(&surface.program));
            surface.canvas.remove();
        }
    }

    fn order_block(&mut self, block: &BlockView) {
        if let Some(surface) = self.block(block.id) {
            set_z_index(&surface.canvas.style(), block.index);
        }
    }

    fn fit_block(&mut self, block: &BlockView) {
        let Some(surface) = self.block_mut(block.id) else {
            return;
        };
        let rect = block.fit_bounds;
        place_rect(&surface.canvas.style(), rect);
        let (width, height) = pixel_size(rect);
        surface.canvas.set_width(width);
        surface.canvas.set_height(height);
        surface.bounds = rect;
    }

    fn clear_block(&mut self, block: &BlockView) {
        if let Some(surface) = self.block_mut(block.id) {
            surface.vertices.clear();
        }
    }

    fn draw(&mut self, block: &BlockView, drawable: &DrawableView) -> PaintOutcome {
        let painter = Rc::clone(&self.painter);
        let Some(surface) = self.block_mut(block.id) else {
            return PaintOutcome::Unavailable;
        };
        if surface.gl.is_context_lost() {
            return PaintOutcome::Unavailable;
        }
        if !drawable.visible {
            return PaintOutcome::Empty;
        }
        let before = surface.vertices.len();
        painter.webgl_vertices(drawable, &mut surface.vertices);
        if surface.vertices.len() > before {
            PaintOutcome::Painted
        } else {
            PaintOutcome::Empty
        }
    }

    fn finish_block_paint(&mut self, block: &BlockView) {
        let Some(surface) = self.block_mut(block.id) else {
            return;
        };
        let gl = &surface.gl;
        let clamp = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
        let width = clamp(surface.canvas.width());
        let height = clamp(surface.canvas.height());
        let count = i32::try_from(surface.vertices.len()).unwrap_or(i32::MAX);
        gl.viewport(0, 0, width, height);
        gl.clear_color(0.0, 0.0, 0.0, 0.0);
        gl.clear(Gl::COLOR_BUFFER_BIT);
        if count > 0 && width > 0 && height > 0 {
            gl.use_program(Some(&surface.program));
            gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&surface.buffer));
            gl.buffer_data_with_u8_array(
                Gl::ARRAY_BUFFER,
                bytemuck::cast_slice(&surface.vertices),
                Gl::DYNAMIC_DRAW,
            );
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_with_i32(0, 2, Gl::FLOAT, false, STRIDE, 0);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_with_i32(1, 4, Gl::FLOAT, false, STRIDE, COLOR_OFFSET);
            #[expect(
                clippy::cast_possible_truncation,
                reason = "shader uniforms are single precision"
            )]
            let (x, y, w, h) = (
                surface.bounds.x0 as f32,
                surface.bounds.y0 as f32,
                surface.bounds.width() as f32,
                surface.bounds.height() as f32,
            );
            gl.uniform2f(surface.origin.as_ref(), x, y);
            gl.uniform2f(surface.size.as_ref(), w, h);
            gl.draw_arrays(Gl::TRIANGLES, 0, count);
        }
        surface.vertices.clear();
    }

    fn on_add_to_block(
        &mut self,
        block: &BlockView,
        drawable: &DrawableView,
    ) -> Result<(), BackendError> {
        _ = drawable;
        let surface = self
            .block(block.id)
            .ok_or(BackendError::CreateFailed("webgl surface"))?;
        if surface.gl.is_context_lost() {
            return Err(BackendError::ContextLost);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_attribute_pointers() {
        assert_eq!(size_of::<Vertex>(), 24);
        assert_eq!(usize::try_from(STRIDE).unwrap(), size_of::<Vertex>());
        assert_eq!(
            usize::try_from(COLOR_OFFSET).unwrap(),
            core::mem::offset_of!(Vertex, color)
        );
    }

    #[test]
    fn vertices_cast_to_bytes() {
        let vertices = [Vertex {
            position: [1.0, 2.0],
            color: [0.0, 0.0, 0.0, 1.0],
        }];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[..4], &1.0_f32.to_ne_bytes());
    }
}
