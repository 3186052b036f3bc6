use crate::device::FrameBuffer;

use super::commands::CommandBuffer;

/// Viewport rectangle in physical pixels plus depth range.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn covering(frame_buffer: &FrameBuffer) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: frame_buffer.width as f32,
            height: frame_buffer.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Scissor rectangle in physical pixels.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    pub fn covering(frame_buffer: &FrameBuffer) -> Self {
        Self {
            x: 0,
            y: 0,
            width: frame_buffer.width,
            height: frame_buffer.height,
        }
    }
}

/// Values the color/depth/stencil targets are cleared to at pass begin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearValue {
    pub color: wgpu::Color,
    pub depth: f32,
    pub stencil: u32,
}

impl Default for ClearValue {
    fn default() -> Self {
        Self {
            color: wgpu::Color::BLACK,
            depth: 1.0,
            stencil: 0,
        }
    }
}

/// Target and load behavior of a render pass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderPassDescription {
    pub frame_buffer: FrameBuffer,
    pub clear: ClearValue,
}

impl RenderPassDescription {
    #[cfg(test)]
    pub(crate) fn for_test(width: u32, height: u32) -> Self {
        Self {
            frame_buffer: FrameBuffer {
                width,
                height,
                output: crate::device::OutputDescription {
                    color_format: wgpu::TextureFormat::Rgba8Unorm,
                    depth_stencil_format: None,
                    sample_count: 1,
                },
            },
            clear: ClearValue::default(),
        }
    }
}

/// The pass every frame's content is recorded into.
///
/// Holds the description, viewport and scissor derived from the current
/// frame-buffer. They are only recomputed through `on_frame_buffer_changed`.
#[derive(Debug, Clone, PartialEq)]
pub struct MainRenderPass {
    description: RenderPassDescription,
    viewport: Viewport,
    scissor: ScissorRect,
}

impl MainRenderPass {
    pub fn new(frame_buffer: &FrameBuffer, clear: ClearValue) -> Self {
        Self {
            description: RenderPassDescription {
                frame_buffer: *frame_buffer,
                clear,
            },
            viewport: Viewport::covering(frame_buffer),
            scissor: ScissorRect::covering(frame_buffer),
        }
    }

    pub fn on_frame_buffer_changed(&mut self, frame_buffer: &FrameBuffer) {
        *self = Self::new(frame_buffer, self.description.clear);
    }

    /// Opens the pass and sets viewport and scissor.
    pub fn begin(&self, commands: &mut CommandBuffer) {
        commands.begin_render_pass(&self.description);
        commands.set_viewport(self.viewport);
        commands.set_scissor(self.scissor);
    }

    pub fn end(&self, commands: &mut CommandBuffer) {
        commands.end_render_pass();
    }

    pub fn description(&self) -> &RenderPassDescription {
        &self.description
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scissor(&self) -> ScissorRect {
        self.scissor
    }
}
