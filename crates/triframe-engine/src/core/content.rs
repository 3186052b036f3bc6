use anyhow::Result;
use winit::dpi::PhysicalSize;

use crate::device::{FrameBuffer, OutputDescription, ResourceFactory};
use crate::render::CommandBuffer;

/// A scene the [`FrameDriver`](super::FrameDriver) renders every frame.
///
/// Call order guaranteed by the driver:
/// 1. `initialize` once, after the device exists
/// 2. `on_frame_buffer_changed` once at startup and once per applied resize
/// 3. `record` once per presented frame, inside the main render pass
/// 4. `dispose` on shutdown (possibly more than once)
pub trait FrameContent {
    /// Creates every GPU resource this content will ever use.
    fn initialize(
        &mut self,
        factory: &mut dyn ResourceFactory,
        output: &OutputDescription,
    ) -> Result<()>;

    /// Records this frame's commands. Must not create or release resources.
    fn record(&self, commands: &mut CommandBuffer);

    /// Recomputes anything tied to the frame-buffer's size or formats.
    fn on_frame_buffer_changed(&mut self, frame_buffer: &FrameBuffer);

    /// The swap-chain was resized to `size`; runs before `on_frame_buffer_changed`.
    fn on_resize(&mut self, size: PhysicalSize<u32>) {
        let _ = size;
    }

    /// Releases owned resources. Must be idempotent.
    fn dispose(&mut self, factory: &mut dyn ResourceFactory);
}
