use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;

use crate::render::{
    draw_range, BufferHandle, Command, CommandBuffer, PipelineDescription, PipelineHandle, Resource,
    ShaderDescription, ShaderHandle, ShaderStage, VertexBufferDescription,
};
use crate::window::SurfaceInfo;

use super::resources::ResourceTable;
use super::surface;
use super::{
    Backend, DeviceConfig, FrameAcquire, FrameBuffer, OutputDescription, ResourceFactory,
    SurfaceErrorAction, SwapChainDescription,
};

/// wgpu implementation of [`Backend`].
///
/// - creates and stores Instance/Adapter/Device/Queue
/// - creates and configures the Surface (swap-chain) plus its depth target
/// - replays recorded [`CommandBuffer`]s into wgpu render passes
pub struct WgpuBackend {
    /// Kept alive for surface re-creation.
    instance: wgpu::Instance,

    /// Platform window the surface was created from.
    target: SurfaceInfo,

    surface: wgpu::Surface<'static>,

    device: wgpu::Device,

    queue: wgpu::Queue,

    /// Active surface configuration.
    config: wgpu::SurfaceConfiguration,

    /// Last requested drawable size in physical pixels; may be zero while minimized.
    size: PhysicalSize<u32>,

    depth: Option<DepthTarget>,

    /// Surface texture acquired by `init_frame`, consumed by `present`.
    frame: Option<AcquiredFrame>,

    buffers: ResourceTable<wgpu::Buffer>,
    shaders: ResourceTable<CompiledShader>,
    pipelines: ResourceTable<wgpu::RenderPipeline>,
}

struct DepthTarget {
    format: wgpu::TextureFormat,
    // Owns the allocation `view` points into.
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct AcquiredFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

struct CompiledShader {
    module: wgpu::ShaderModule,
    stage: ShaderStage,
    entry_point: String,
}

impl WgpuBackend {
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(
        target: &SurfaceInfo,
        desc: &SwapChainDescription,
        config: &DeviceConfig,
    ) -> Result<Self> {
        anyhow::ensure!(surface::is_drawable(desc.size), "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backend.backends(),
            flags: config.instance_flags(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(target.clone())
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .with_context(|| format!("no {:?} adapter can present to this window", config.backend))?;

        let info = adapter.get_info();
        log::info!(
            "using adapter '{}' ({:?}, validation {})",
            info.name,
            info.backend,
            if config.validation { "on" } else { "off" }
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("triframe device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps, config.prefer_srgb)
            .context("no supported surface formats")?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: desc.size.width,
            height: desc.size.height,
            present_mode: surface::present_mode(desc.vertical_sync),
            alpha_mode: surface::choose_alpha_mode(&caps),
            view_formats: vec![],
            desired_maximum_frame_latency: config.desired_maximum_frame_latency,
        };

        surface.configure(&device, &surface_config);

        let depth = desc
            .depth_stencil_format
            .map(|format| DepthTarget::new(&device, format, desc.size));

        log::debug!(
            "swap-chain {}x{} {:?} depth {:?}",
            desc.size.width,
            desc.size.height,
            format,
            desc.depth_stencil_format
        );

        Ok(Self {
            instance,
            target: target.clone(),
            surface,
            device,
            queue,
            config: surface_config,
            size: desc.size,
            depth,
            frame: None,
            buffers: ResourceTable::default(),
            shaders: ResourceTable::default(),
            pipelines: ResourceTable::default(),
        })
    }

    fn depth_format(&self) -> Option<wgpu::TextureFormat> {
        self.depth.as_ref().map(|d| d.format)
    }

    fn encode(&self, frame: &AcquiredFrame, commands: &CommandBuffer) -> Result<wgpu::CommandBuffer> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("triframe frame encoder"),
            });

        let mut pass: Option<wgpu::RenderPass<'static>> = None;

        for command in commands.commands() {
            match command {
                Command::BeginRenderPass(desc) => {
                    let clear = desc.clear;
                    let depth_stencil_attachment =
                        self.depth
                            .as_ref()
                            .map(|depth| wgpu::RenderPassDepthStencilAttachment {
                                view: &depth.view,
                                depth_ops: Some(wgpu::Operations {
                                    load: wgpu::LoadOp::Clear(clear.depth),
                                    store: wgpu::StoreOp::Store,
                                }),
                                stencil_ops: Some(wgpu::Operations {
                                    load: wgpu::LoadOp::Clear(clear.stencil),
                                    store: wgpu::StoreOp::Store,
                                }),
                            });

                    let rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("triframe main pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &frame.view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(clear.color),
                                store: wgpu::StoreOp::Store,
                            },
                            depth_slice: None,
                        })],
                        depth_stencil_attachment,
                        timestamp_writes: None,
                        occlusion_query_set: None,
                        multiview_mask: None,
                    });
                    pass = Some(rpass.forget_lifetime());
                }
                Command::EndRenderPass => {
                    pass = None;
                }
                other => {
                    let rpass = pass
                        .as_mut()
                        .with_context(|| format!("{other:?} recorded outside a render pass"))?;
                    self.replay(rpass, other)?;
                }
            }
        }

        anyhow::ensure!(pass.is_none(), "render pass left open at end of frame");
        Ok(encoder.finish())
    }

    fn replay(&self, rpass: &mut wgpu::RenderPass<'_>, command: &Command) -> Result<()> {
        match *command {
            Command::SetViewport(v) => {
                rpass.set_viewport(v.x, v.y, v.width, v.height, v.min_depth, v.max_depth);
            }
            Command::SetScissor(s) => rpass.set_scissor_rect(s.x, s.y, s.width, s.height),
            Command::SetPipeline(handle) => {
                let pipeline = self
                    .pipelines
                    .get(handle.id())
                    .with_context(|| format!("unknown pipeline {handle:?}"))?;
                rpass.set_pipeline(pipeline);
            }
            Command::SetVertexBuffer {
                slot,
                buffer,
                offset,
            } => {
                let vbo = self
                    .buffers
                    .get(buffer.id())
                    .with_context(|| format!("unknown vertex buffer {buffer:?}"))?;
                rpass.set_vertex_buffer(slot, vbo.slice(offset..));
            }
            Command::Draw {
                vertex_count,
                instance_count,
                first_vertex,
            } => rpass.draw(draw_range(first_vertex, vertex_count)?, 0..instance_count),
            Command::BeginRenderPass(_) | Command::EndRenderPass => {}
        }
        Ok(())
    }
}

impl DepthTarget {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat, size: PhysicalSize<u32>) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("triframe depth target"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            format,
            _texture: texture,
            view,
        }
    }
}

impl ResourceFactory for WgpuBackend {
    fn create_vertex_buffer(&mut self, desc: &VertexBufferDescription<'_>) -> Result<BufferHandle> {
        use wgpu::util::DeviceExt;

        anyhow::ensure!(!desc.contents.is_empty(), "vertex buffer '{}' is empty", desc.label);

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(desc.label),
                contents: desc.contents,
                usage: wgpu::BufferUsages::VERTEX,
            });

        Ok(BufferHandle(self.buffers.insert(buffer)))
    }

    fn create_shader(&mut self, desc: &ShaderDescription<'_>) -> Result<ShaderHandle> {
        anyhow::ensure!(
            desc.source.declares_entry_point(desc.entry_point),
            "entry point '{}' not found in {}",
            desc.entry_point,
            desc.source.id
        );

        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.source.id),
                source: wgpu::ShaderSource::Wgsl(desc.source.code.into()),
            });

        let id = self.shaders.insert(CompiledShader {
            module,
            stage: desc.stage,
            entry_point: desc.entry_point.to_owned(),
        });
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
        anyhow::ensure!(vs.stage == ShaderStage::Vertex, "{} is not a vertex shader", vs.entry_point);
        anyhow::ensure!(ps.stage == ShaderStage::Pixel, "{} is not a pixel shader", ps.entry_point);

        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts: &[],
                immediate_size: 0,
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&layout),

                vertex: wgpu::VertexState {
                    module: &vs.module,
                    entry_point: Some(vs.entry_point.as_str()),
                    compilation_options: Default::default(),
                    buffers: &[desc.input_layout.to_wgpu()],
                },

                fragment: Some(wgpu::FragmentState {
                    module: &ps.module,
                    entry_point: Some(ps.entry_point.as_str()),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: desc.outputs.color_format,
                        blend: desc.blend.to_wgpu(),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: desc.rasterizer.to_wgpu(desc.topology),
                depth_stencil: desc.depth_stencil.to_wgpu(desc.outputs.depth_stencil_format),
                multisample: wgpu::MultisampleState {
                    count: desc.outputs.sample_count,
                    ..Default::default()
                },
                multiview_mask: None,
                cache: None,
            });

        Ok(PipelineHandle(self.pipelines.insert(pipeline)))
    }

    fn release(&mut self, resource: Resource) -> bool {
        match resource {
            Resource::Buffer(h) => self.buffers.remove(h.id()).map(|b| b.destroy()).is_some(),
            Resource::Shader(h) => self.shaders.remove(h.id()).is_some(),
            Resource::Pipeline(h) => self.pipelines.remove(h.id()).is_some(),
        }
    }
}

impl Backend for WgpuBackend {
    type Target = SurfaceInfo;

    fn create(target: &SurfaceInfo, desc: &SwapChainDescription, config: &DeviceConfig) -> Result<Self> {
        pollster::block_on(Self::new(target, desc, config))
    }

    fn refresh_surface(&mut self, target: &SurfaceInfo) -> Result<()> {
        self.frame = None;
        self.surface = self
            .instance
            .create_surface(target.clone())
            .context("failed to recreate wgpu surface")?;
        self.target = target.clone();

        if surface::is_drawable(self.size) {
            self.surface.configure(&self.device, &self.config);
        }
        log::debug!("surface recreated for {:?}", target.size());
        Ok(())
    }

    fn frame_buffer(&self) -> FrameBuffer {
        FrameBuffer {
            width: self.config.width,
            height: self.config.height,
            output: OutputDescription {
                color_format: self.config.format,
                depth_stencil_format: self.depth_format(),
                sample_count: 1,
            },
        }
    }

    /// wgpu does not support configuring a surface with a 0x0 size; in that
    /// case only the recorded size changes.
    fn resize_swap_chain(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
        if !surface::is_drawable(size) {
            return;
        }

        self.frame = None;
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);

        if let Some(format) = self.depth_format() {
            self.depth = Some(DepthTarget::new(&self.device, format, size));
        }
    }

    fn init_frame(&mut self) -> Result<FrameAcquire> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(err) => {
                return match surface::map_surface_error(&err) {
                    SurfaceErrorAction::Reconfigured => {
                        log::warn!("surface {err}; reconfiguring");
                        if surface::is_drawable(self.size) {
                            self.surface.configure(&self.device, &self.config);
                        }
                        Ok(FrameAcquire::Skip)
                    }
                    SurfaceErrorAction::SkipFrame => {
                        log::warn!("surface {err}; skipping frame");
                        Ok(FrameAcquire::Skip)
                    }
                    SurfaceErrorAction::Fatal => {
                        Err(err).context("failed to acquire swap-chain texture")
                    }
                };
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.frame = Some(AcquiredFrame {
            surface_texture,
            view,
        });
        Ok(FrameAcquire::Ready)
    }

    fn submit(&mut self, commands: &CommandBuffer) -> Result<()> {
        let frame = self
            .frame
            .as_ref()
            .context("submit without an acquired frame")?;
        let encoded = self.encode(frame, commands)?;
        self.queue.submit(std::iter::once(encoded));
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .context("failed waiting for the queue to go idle")?;
        Ok(())
    }

    fn present(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.target.window().pre_present_notify();
            drop(frame.view);
            frame.surface_texture.present();
        }
    }

    fn dispose(mut self) {
        self.frame = None;

        // Queue first, then swap-chain targets, then device-owned objects.
        let Self {
            queue,
            surface,
            depth,
            device,
            mut buffers,
            mut shaders,
            mut pipelines,
            ..
        } = self;

        let leaked = buffers.live() + shaders.live() + pipelines.live();
        if leaked > 0 {
            log::warn!("{leaked} GPU resources still live at dispose");
        }

        drop(queue);
        drop(depth);
        drop(surface);
        pipelines.drain().for_each(drop);
        shaders.drain().for_each(drop);
        buffers.drain().for_each(|b| b.destroy());
        device.destroy();
        log::debug!("wgpu backend released");
    }
}
