use std::ops::Range;

use anyhow::{Context, Result};

use super::pass::{RenderPassDescription, ScissorRect, Viewport};
use super::resource::{BufferHandle, PipelineHandle};

/// A single recorded GPU command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginRenderPass(RenderPassDescription),
    SetViewport(Viewport),
    SetScissor(ScissorRect),
    SetPipeline(PipelineHandle),
    SetVertexBuffer {
        slot: u32,
        buffer: BufferHandle,
        offset: u64,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
    },
    EndRenderPass,
}

/// Vertex range covered by a draw. Fails if it runs past `u32::MAX`.
pub(crate) fn draw_range(first_vertex: u32, vertex_count: u32) -> Result<Range<u32>> {
    let end = first_vertex
        .checked_add(vertex_count)
        .with_context(|| format!("draw of {vertex_count} vertices from {first_vertex} overflows"))?;
    Ok(first_vertex..end)
}

/// Backend-neutral command recording for one frame.
///
/// The driver owns a single buffer and reuses it every frame; `begin` clears
/// the previous recording but keeps its allocation.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
    in_render_pass: bool,
    recording: bool,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) {
        self.commands.clear();
        self.in_render_pass = false;
        self.recording = true;
    }

    /// Closes the recording. Fails if a render pass is still open.
    pub fn end(&mut self) -> Result<()> {
        anyhow::ensure!(self.recording, "command buffer ended without begin");
        anyhow::ensure!(
            !self.in_render_pass,
            "command buffer ended inside a render pass"
        );
        self.recording = false;
        Ok(())
    }

    pub fn begin_render_pass(&mut self, description: &RenderPassDescription) {
        debug_assert!(!self.in_render_pass, "render passes cannot nest");
        self.in_render_pass = true;
        self.push(Command::BeginRenderPass(*description));
    }

    pub fn end_render_pass(&mut self) {
        debug_assert!(self.in_render_pass, "no render pass to end");
        self.in_render_pass = false;
        self.push(Command::EndRenderPass);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.push(Command::SetViewport(viewport));
    }

    pub fn set_scissor(&mut self, scissor: ScissorRect) {
        self.push(Command::SetScissor(scissor));
    }

    pub fn set_pipeline(&mut self, pipeline: PipelineHandle) {
        self.push(Command::SetPipeline(pipeline));
    }

    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64) {
        self.push(Command::SetVertexBuffer {
            slot,
            buffer,
            offset,
        });
    }

    /// Non-indexed, single-instance draw.
    pub fn draw(&mut self, vertex_count: u32) {
        self.draw_instanced(vertex_count, 1, 0);
    }

    pub fn draw_instanced(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32) {
        debug_assert!(self.in_render_pass, "draw recorded outside a render pass");
        self.push(Command::Draw {
            vertex_count,
            instance_count,
            first_vertex,
        });
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn push(&mut self, command: Command) {
        debug_assert!(self.recording, "command recorded outside begin/end");
        self.commands.push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass() -> RenderPassDescription {
        RenderPassDescription::for_test(64, 32)
    }

    #[test]
    fn draw_range_rejects_overflow() {
        assert_eq!(draw_range(4, 3).unwrap(), 4..7);
        assert_eq!(draw_range(u32::MAX, 0).unwrap(), u32::MAX..u32::MAX);
        assert!(draw_range(u32::MAX - 1, 3).is_err());
    }

    #[test]
    fn begin_clears_previous_recording() {
        let mut cb = CommandBuffer::new();
        cb.begin();
        cb.begin_render_pass(&pass());
        cb.draw(3);
        cb.end_render_pass();
        cb.end().unwrap();
        assert_eq!(cb.commands().len(), 3);

        cb.begin();
        assert!(cb.is_empty());
    }

    #[test]
    fn end_inside_render_pass_fails() {
        let mut cb = CommandBuffer::new();
        cb.begin();
        cb.begin_render_pass(&pass());
        assert!(cb.end().is_err());
    }

    #[test]
    fn end_without_begin_fails() {
        let mut cb = CommandBuffer::new();
        assert!(cb.end().is_err());
    }

    #[test]
    fn draw_records_a_single_instance() {
        let mut cb = CommandBuffer::new();
        cb.begin();
        cb.begin_render_pass(&pass());
        cb.draw(3);
        assert_eq!(
            cb.commands()[1],
            Command::Draw {
                vertex_count: 3,
                instance_count: 1,
                first_vertex: 0,
            }
        );
    }
}
