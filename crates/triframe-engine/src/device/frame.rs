use winit::dpi::PhysicalSize;

/// Swap-chain creation parameters derived from the surface at init time.
///
/// The swap-chain always presents to a window; there is no exclusive fullscreen mode.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapChainDescription {
    pub size: PhysicalSize<u32>,

    /// Depth-stencil target format. `None` disables the depth attachment.
    pub depth_stencil_format: Option<wgpu::TextureFormat>,

    pub vertical_sync: bool,
}

impl SwapChainDescription {
    pub fn new(size: PhysicalSize<u32>) -> Self {
        Self {
            size,
            depth_stencil_format: Some(wgpu::TextureFormat::Depth24PlusStencil8),
            vertical_sync: false,
        }
    }
}

/// Formats a pipeline must target to render into the frame-buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct OutputDescription {
    pub color_format: wgpu::TextureFormat,
    pub depth_stencil_format: Option<wgpu::TextureFormat>,
    pub sample_count: u32,
}

/// The color/depth target set the swap-chain currently presents.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub output: OutputDescription,
}

impl FrameBuffer {
    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.width, self.height)
    }
}

/// Result of trying to start a swap-chain frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameAcquire {
    /// A target was acquired; recording may proceed.
    Ready,
    /// Transient condition; this frame is dropped without submitting.
    Skip,
}
