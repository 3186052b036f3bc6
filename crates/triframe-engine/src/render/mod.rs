//! Backend-neutral rendering vocabulary.
//!
//! Content records [`Command`]s into a [`CommandBuffer`]; backends replay
//! them. Resources are referenced through opaque handles so recording never
//! touches the device.

mod commands;
mod pass;
mod pipeline;
mod resource;

pub use commands::{Command, CommandBuffer};
pub(crate) use commands::draw_range;
pub use pass::{ClearValue, MainRenderPass, RenderPassDescription, ScissorRect, Viewport};
pub use pipeline::{
    BlendMode, DepthStencilMode, InputLayout, PipelineDescription, RasterizerState,
    VertexPosition,
};
pub use resource::{
    BufferHandle, PipelineHandle, Resource, ShaderDescription, ShaderHandle, ShaderSource,
    ShaderStage, VertexBufferDescription,
};
