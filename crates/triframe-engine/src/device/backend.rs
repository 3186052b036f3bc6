use anyhow::Result;
use winit::dpi::PhysicalSize;

use crate::render::{
    BufferHandle, CommandBuffer, PipelineDescription, PipelineHandle, Resource,
    ShaderDescription, ShaderHandle, VertexBufferDescription,
};

use super::{DeviceConfig, FrameAcquire, FrameBuffer, SwapChainDescription};

/// Creates and releases immutable GPU resources.
///
/// Handed to content only during initialization and disposal.
pub trait ResourceFactory {
    fn create_vertex_buffer(&mut self, desc: &VertexBufferDescription<'_>) -> Result<BufferHandle>;

    fn create_shader(&mut self, desc: &ShaderDescription<'_>) -> Result<ShaderHandle>;

    fn create_pipeline(&mut self, desc: &PipelineDescription<'_>) -> Result<PipelineHandle>;

    /// Releases `resource`. Returns `false` if it was unknown or already released.
    fn release(&mut self, resource: Resource) -> bool;
}

/// Device, swap-chain and submission queue behind one owner.
///
/// Implementations are driven exclusively by [`FrameDriver`](crate::core::FrameDriver),
/// one frame at a time: `init_frame`, `submit`, `wait_idle`, `present`.
pub trait Backend: ResourceFactory + Sized {
    /// What the swap-chain presents to.
    type Target;

    /// Creates the device, a swap-chain bound to `target`, and the queue.
    fn create(
        target: &Self::Target,
        desc: &SwapChainDescription,
        config: &DeviceConfig,
    ) -> Result<Self>;

    /// Rebinds the swap-chain after the platform replaced the surface.
    fn refresh_surface(&mut self, target: &Self::Target) -> Result<()>;

    fn frame_buffer(&self) -> FrameBuffer;

    /// Resizes the swap-chain and its depth target in place.
    fn resize_swap_chain(&mut self, size: PhysicalSize<u32>);

    /// Acquires the next presentable target.
    fn init_frame(&mut self) -> Result<FrameAcquire>;

    fn submit(&mut self, commands: &CommandBuffer) -> Result<()>;

    /// Blocks until all submitted work has retired.
    fn wait_idle(&mut self) -> Result<()>;

    fn present(&mut self);

    /// Releases the queue, the swap-chain and the device, in that order.
    fn dispose(self);
}
