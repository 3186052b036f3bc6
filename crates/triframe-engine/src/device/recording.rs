use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;

use crate::render::{
    draw_range, BufferHandle, Command, CommandBuffer, PipelineDescription, PipelineHandle, Resource,
    ShaderDescription, ShaderHandle, ShaderStage, VertexBufferDescription,
};

use super::resources::ResourceTable;
use super::{
    Backend, DeviceConfig, FrameAcquire, FrameBuffer, OutputDescription, ResourceFactory,
    SwapChainDescription,
};

/// One observable interaction with a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Create {
        size: PhysicalSize<u32>,
        vertical_sync: bool,
    },
    RefreshSurface {
        surface_id: u32,
    },
    ResizeSwapChain(PhysicalSize<u32>),
    InitFrame,
    Submit(Vec<Command>),
    WaitIdle,
    Present,
    Release(Resource),
    /// `leaked` counts resources still live when the backend was disposed.
    Dispose {
        leaked: usize,
    },
}

#[derive(Debug, Default)]
struct Journal {
    calls: Vec<BackendCall>,
    fail_create: Option<String>,
    fail_refresh: Option<String>,
    skip_frames: u32,
    live: usize,
}

/// Surface stand-in for [`RecordingBackend`].
///
/// Clones share one journal, so a test keeps a clone and inspects what the
/// backend did after handing the other to a driver.
#[derive(Debug, Clone, Default)]
pub struct RecordingTarget {
    surface_id: u32,
    journal: Rc<RefCell<Journal>>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new surface sharing this journal, as after a platform surface swap.
    pub fn replaced(&self) -> Self {
        Self {
            surface_id: self.surface_id + 1,
            journal: Rc::clone(&self.journal),
        }
    }

    pub fn surface_id(&self) -> u32 {
        self.surface_id
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.journal.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.journal.borrow_mut().calls.clear();
    }

    /// Command lists in submission order.
    pub fn submissions(&self) -> Vec<Vec<Command>> {
        self.journal
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Submit(cmds) => Some(cmds.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.journal.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    /// Resources created and not yet released.
    pub fn live_resources(&self) -> usize {
        self.journal.borrow().live
    }

    /// Makes the next `create` fail with `message`.
    pub fn fail_next_create(&self, message: &str) {
        self.journal.borrow_mut().fail_create = Some(message.to_owned());
    }

    /// Makes the next `refresh_surface` fail with `message`.
    pub fn fail_next_refresh(&self, message: &str) {
        self.journal.borrow_mut().fail_refresh = Some(message.to_owned());
    }

    /// Makes the next `n` frame acquisitions report [`FrameAcquire::Skip`].
    pub fn skip_next_frames(&self, n: u32) {
        self.journal.borrow_mut().skip_frames = n;
    }
}

/// GPU-less [`Backend`] that validates and journals every call.
///
/// Handles are checked the way a real device would: pipelines need live
/// shaders of the right stage, submitted commands need live resources.
pub struct RecordingBackend {
    journal: Rc<RefCell<Journal>>,
    frame_buffer: FrameBuffer,
    frame_acquired: bool,
    buffers: ResourceTable<usize>,
    shaders: ResourceTable<ShaderStage>,
    pipelines: ResourceTable<OutputDescription>,
}

impl RecordingBackend {
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    fn record(&self, call: BackendCall) {
        self.journal.borrow_mut().calls.push(call);
    }

    fn created(&self) {
        self.journal.borrow_mut().live += 1;
    }

    fn live_total(&self) -> usize {
        self.buffers.live() + self.shaders.live() + self.pipelines.live()
    }

    fn validate(&self, commands: &CommandBuffer) -> Result<()> {
        for command in commands.commands() {
            match command {
                Command::SetPipeline(h) => {
                    self.pipelines
                        .get(h.id())
                        .with_context(|| format!("unknown pipeline {h:?}"))?;
                }
                Command::SetVertexBuffer { buffer, .. } => {
                    self.buffers
                        .get(buffer.id())
                        .with_context(|| format!("unknown vertex buffer {buffer:?}"))?;
                }
                Command::Draw {
                    vertex_count,
                    first_vertex,
                    ..
                } => {
                    draw_range(*first_vertex, *vertex_count)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl ResourceFactory for RecordingBackend {
    fn create_vertex_buffer(&mut self, desc: &VertexBufferDescription<'_>) -> Result<BufferHandle> {
        anyhow::ensure!(!desc.contents.is_empty(), "vertex buffer '{}' is empty", desc.label);
        let id = self.buffers.insert(desc.contents.len());
        self.created();
        Ok(BufferHandle(id))
    }

    fn create_shader(&mut self, desc: &ShaderDescription<'_>) -> Result<ShaderHandle> {
        anyhow::ensure!(
            desc.source.declares_entry_point(desc.entry_point),
            "entry point '{}' not found in {}",
            desc.entry_point,
            desc.source.id
        );
        let id = self.shaders.insert(desc.stage);
        self.created();
        Ok(ShaderHandle(id))
    }

    fn create_pipeline(&mut self, desc: &PipelineDescription<'_>) -> Result<PipelineHandle> {
        let vs = self
            .shaders
            .get(desc.vertex_shader.id())
            .with_context(|| format!("unknown vertex shader {:?}", desc.vertex_shader))?;
        let ps = self
            .shaders
            .get(desc.pixel_shader.id())
            .with_context(|| format!("unknown pixel shader {:?}", desc.pixel_shader))?;
        anyhow::ensure!(*vs == ShaderStage::Vertex, "vertex slot holds a {vs:?} shader");
        anyhow::ensure!(*ps == ShaderStage::Pixel, "pixel slot holds a {ps:?} shader");
        anyhow::ensure!(
            desc.outputs == self.frame_buffer.output,
            "pipeline '{}' targets {:?}, frame-buffer is {:?}",
            desc.label,
            desc.outputs,
            self.frame_buffer.output
        );

        let id = self.pipelines.insert(desc.outputs);
        self.created();
        Ok(PipelineHandle(id))
    }

    fn release(&mut self, resource: Resource) -> bool {
        let released = match resource {
            Resource::Buffer(h) => self.buffers.remove(h.id()).is_some(),
            Resource::Shader(h) => self.shaders.remove(h.id()).is_some(),
            Resource::Pipeline(h) => self.pipelines.remove(h.id()).is_some(),
        };
        if released {
            let mut journal = self.journal.borrow_mut();
            journal.live -= 1;
            journal.calls.push(BackendCall::Release(resource));
        }
        released
    }
}

impl Backend for RecordingBackend {
    type Target = RecordingTarget;

    fn create(
        target: &RecordingTarget,
        desc: &SwapChainDescription,
        _config: &DeviceConfig,
    ) -> Result<Self> {
        if let Some(message) = target.journal.borrow_mut().fail_create.take() {
            anyhow::bail!(message);
        }

        let backend = Self {
            journal: Rc::clone(&target.journal),
            frame_buffer: FrameBuffer {
                width: desc.size.width,
                height: desc.size.height,
                output: OutputDescription {
                    color_format: Self::COLOR_FORMAT,
                    depth_stencil_format: desc.depth_stencil_format,
                    sample_count: 1,
                },
            },
            frame_acquired: false,
            buffers: ResourceTable::default(),
            shaders: ResourceTable::default(),
            pipelines: ResourceTable::default(),
        };
        backend.record(BackendCall::Create {
            size: desc.size,
            vertical_sync: desc.vertical_sync,
        });
        Ok(backend)
    }

    fn refresh_surface(&mut self, target: &RecordingTarget) -> Result<()> {
        self.frame_acquired = false;
        if let Some(message) = self.journal.borrow_mut().fail_refresh.take() {
            anyhow::bail!(message);
        }
        self.record(BackendCall::RefreshSurface {
            surface_id: target.surface_id,
        });
        Ok(())
    }

    fn frame_buffer(&self) -> FrameBuffer {
        self.frame_buffer
    }

    fn resize_swap_chain(&mut self, size: PhysicalSize<u32>) {
        self.frame_buffer.width = size.width;
        self.frame_buffer.height = size.height;
        self.record(BackendCall::ResizeSwapChain(size));
    }

    fn init_frame(&mut self) -> Result<FrameAcquire> {
        self.record(BackendCall::InitFrame);
        let mut journal = self.journal.borrow_mut();
        if journal.skip_frames > 0 {
            journal.skip_frames -= 1;
            return Ok(FrameAcquire::Skip);
        }
        self.frame_acquired = true;
        Ok(FrameAcquire::Ready)
    }

    fn submit(&mut self, commands: &CommandBuffer) -> Result<()> {
        anyhow::ensure!(self.frame_acquired, "submit without an acquired frame");
        self.validate(commands)?;
        self.record(BackendCall::Submit(commands.commands().to_vec()));
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.record(BackendCall::WaitIdle);
        Ok(())
    }

    fn present(&mut self) {
        if std::mem::take(&mut self.frame_acquired) {
            self.record(BackendCall::Present);
        }
    }

    fn dispose(self) {
        let leaked = self.live_total();
        let mut journal = self.journal.borrow_mut();
        journal.live = 0;
        journal.calls.push(BackendCall::Dispose { leaked });
    }
}
