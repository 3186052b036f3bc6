use bytemuck::{Pod, Zeroable};

use crate::device::OutputDescription;

use super::resource::ShaderHandle;

/// Position-only vertex (`Float32x3` at location 0).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct VertexPosition {
    pub position: [f32; 3],
}

impl VertexPosition {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { position: [x, y, z] }
    }

    pub fn layout() -> InputLayout {
        InputLayout {
            array_stride: std::mem::size_of::<VertexPosition>() as u64,
            attributes: &Self::ATTRS,
        }
    }
}

/// Per-vertex buffer layout for slot 0.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct InputLayout {
    pub array_stride: u64,
    pub attributes: &'static [wgpu::VertexAttribute],
}

impl InputLayout {
    pub(crate) fn to_wgpu(self) -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: self.attributes,
        }
    }
}

/// Rasterizer presets.
///
/// Front faces wind clockwise, matching vertex data authored for a
/// y-up, left-handed clip space.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RasterizerState {
    CullBack,
    CullFront,
    CullNone,
}

impl RasterizerState {
    pub(crate) fn to_wgpu(self, topology: wgpu::PrimitiveTopology) -> wgpu::PrimitiveState {
        let cull_mode = match self {
            RasterizerState::CullBack => Some(wgpu::Face::Back),
            RasterizerState::CullFront => Some(wgpu::Face::Front),
            RasterizerState::CullNone => None,
        };

        wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Cw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlendMode {
    /// Source replaces destination.
    Opaque,
    /// Straight (non-premultiplied) alpha.
    AlphaBlend,
}

impl BlendMode {
    pub(crate) fn to_wgpu(self) -> Option<wgpu::BlendState> {
        match self {
            BlendMode::Opaque => None,
            BlendMode::AlphaBlend => Some(wgpu::BlendState::ALPHA_BLENDING),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DepthStencilMode {
    None,
    Read,
    ReadWrite,
}

impl DepthStencilMode {
    /// Returns `None` when the mode or the frame-buffer has no depth.
    pub(crate) fn to_wgpu(
        self,
        format: Option<wgpu::TextureFormat>,
    ) -> Option<wgpu::DepthStencilState> {
        let format = format?;
        let depth_write_enabled = match self {
            DepthStencilMode::None => return None,
            DepthStencilMode::Read => false,
            DepthStencilMode::ReadWrite => true,
        };

        Some(wgpu::DepthStencilState {
            format,
            depth_write_enabled,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        })
    }
}

/// Everything needed to build an immutable graphics pipeline.
#[derive(Debug, Clone)]
pub struct PipelineDescription<'a> {
    pub label: &'a str,
    pub topology: wgpu::PrimitiveTopology,
    pub input_layout: InputLayout,
    pub vertex_shader: ShaderHandle,
    pub pixel_shader: ShaderHandle,
    pub rasterizer: RasterizerState,
    pub blend: BlendMode,
    pub depth_stencil: DepthStencilMode,
    pub outputs: OutputDescription,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_position_is_three_packed_floats() {
        let layout = VertexPosition::layout();
        assert_eq!(layout.array_stride, 12);
        assert_eq!(layout.attributes.len(), 1);
        assert_eq!(layout.attributes[0].format, wgpu::VertexFormat::Float32x3);
        assert_eq!(layout.attributes[0].shader_location, 0);
    }

    #[test]
    fn cull_back_keeps_clockwise_faces() {
        let state = RasterizerState::CullBack.to_wgpu(wgpu::PrimitiveTopology::TriangleList);
        assert_eq!(state.cull_mode, Some(wgpu::Face::Back));
        assert_eq!(state.front_face, wgpu::FrontFace::Cw);
    }

    #[test]
    fn opaque_blend_disables_blending() {
        assert_eq!(BlendMode::Opaque.to_wgpu(), None);
        assert_eq!(
            BlendMode::AlphaBlend.to_wgpu(),
            Some(wgpu::BlendState::ALPHA_BLENDING)
        );
    }

    #[test]
    fn read_write_depth_requires_a_depth_target() {
        let format = Some(wgpu::TextureFormat::Depth24PlusStencil8);

        let state = DepthStencilMode::ReadWrite.to_wgpu(format).unwrap();
        assert!(state.depth_write_enabled);
        assert_eq!(state.format, wgpu::TextureFormat::Depth24PlusStencil8);

        assert!(!DepthStencilMode::Read.to_wgpu(format).unwrap().depth_write_enabled);
        assert!(DepthStencilMode::ReadWrite.to_wgpu(None).is_none());
        assert!(DepthStencilMode::None.to_wgpu(format).is_none());
    }
}
