use anyhow::{Context, Result};

use triframe_engine::core::FrameContent;
use triframe_engine::device::{FrameBuffer, OutputDescription, ResourceFactory};
use triframe_engine::render::{
    BlendMode, BufferHandle, CommandBuffer, DepthStencilMode, PipelineDescription,
    PipelineHandle, RasterizerState, ShaderDescription, ShaderHandle, ShaderSource,
    VertexBufferDescription, VertexPosition,
};

pub const TRIANGLE_SHADER: ShaderSource = ShaderSource {
    id: "triframe.triangle.wgsl",
    code: include_str!("shaders/triangle.wgsl"),
};

const VERTICES: [VertexPosition; 3] = [
    VertexPosition::new(0.0, 0.75, 0.0),
    VertexPosition::new(0.75, -0.75, 0.0),
    VertexPosition::new(-0.75, -0.75, 0.0),
];

/// A single solid triangle drawn from a position-only vertex buffer.
#[derive(Debug, Default)]
pub struct Triangle {
    vertex_buffer: Option<BufferHandle>,
    vertex_shader: Option<ShaderHandle>,
    pixel_shader: Option<ShaderHandle>,
    pipeline: Option<PipelineHandle>,
    /// Frame-buffer outputs the pipeline was built for.
    outputs: Option<OutputDescription>,
}

impl Triangle {
    pub const NAME: &'static str = "Triangle";

    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameContent for Triangle {
    fn initialize(
        &mut self,
        factory: &mut dyn ResourceFactory,
        output: &OutputDescription,
    ) -> Result<()> {
        let vertex_buffer = factory.create_vertex_buffer(&VertexBufferDescription {
            label: "triangle vertices",
            contents: bytemuck::cast_slice(&VERTICES),
        })?;
        self.vertex_buffer = Some(vertex_buffer);

        let vertex_shader = factory
            .create_shader(&ShaderDescription::vertex(&TRIANGLE_SHADER, "VSMain"))
            .context("failed to compile triangle vertex shader")?;
        self.vertex_shader = Some(vertex_shader);

        let pixel_shader = factory
            .create_shader(&ShaderDescription::pixel(&TRIANGLE_SHADER, "PSMain"))
            .context("failed to compile triangle pixel shader")?;
        self.pixel_shader = Some(pixel_shader);

        let pipeline = factory.create_pipeline(&PipelineDescription {
            label: "triangle pipeline",
            topology: wgpu::PrimitiveTopology::TriangleList,
            input_layout: VertexPosition::layout(),
            vertex_shader,
            pixel_shader,
            rasterizer: RasterizerState::CullBack,
            blend: BlendMode::Opaque,
            depth_stencil: DepthStencilMode::ReadWrite,
            outputs: *output,
        })?;
        self.pipeline = Some(pipeline);
        self.outputs = Some(*output);

        log::debug!("triangle resources created for {:?}", output.color_format);
        Ok(())
    }

    fn record(&self, commands: &mut CommandBuffer) {
        let (Some(pipeline), Some(vertex_buffer)) = (self.pipeline, self.vertex_buffer) else {
            return;
        };

        commands.set_pipeline(pipeline);
        commands.set_vertex_buffer(0, vertex_buffer, 0);
        commands.draw(VERTICES.len() as u32);
    }

    fn on_frame_buffer_changed(&mut self, frame_buffer: &FrameBuffer) {
        // Positions are in clip space; only the output formats matter here.
        if let Some(outputs) = self.outputs {
            if outputs != frame_buffer.output {
                log::warn!(
                    "frame-buffer outputs changed from {outputs:?} to {:?}; triangle pipeline is stale",
                    frame_buffer.output
                );
            }
        }
    }

    fn dispose(&mut self, factory: &mut dyn ResourceFactory) {
        if let Some(pipeline) = self.pipeline.take() {
            factory.release(pipeline.into());
        }
        if let Some(shader) = self.pixel_shader.take() {
            factory.release(shader.into());
        }
        if let Some(shader) = self.vertex_shader.take() {
            factory.release(shader.into());
        }
        if let Some(buffer) = self.vertex_buffer.take() {
            factory.release(buffer.into());
        }
        self.outputs = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triframe_engine::core::{FrameDriver, FrameOutcome};
    use triframe_engine::device::{BackendCall, DeviceConfig, RecordingBackend, RecordingTarget};
    use triframe_engine::render::{Command, ScissorRect, Viewport};
    use triframe_engine::window::SurfaceEvent;
    use winit::dpi::PhysicalSize;

    fn driver(target: &RecordingTarget) -> FrameDriver<RecordingBackend, Triangle> {
        let mut d = FrameDriver::new(
            target.clone(),
            PhysicalSize::new(1280, 720),
            DeviceConfig::default(),
            Triangle::new(),
        );
        d.initialize().unwrap();
        d
    }

    fn bounds(cmds: &[Command]) -> (Viewport, ScissorRect) {
        let viewport = cmds.iter().find_map(|c| match c {
            Command::SetViewport(v) => Some(*v),
            _ => None,
        });
        let scissor = cmds.iter().find_map(|c| match c {
            Command::SetScissor(s) => Some(*s),
            _ => None,
        });
        (viewport.unwrap(), scissor.unwrap())
    }

    fn draws(cmds: &[Command]) -> Vec<&Command> {
        cmds.iter()
            .filter(|c| matches!(c, Command::Draw { .. }))
            .collect()
    }

    #[test]
    fn shader_source_has_both_entry_points() {
        assert!(TRIANGLE_SHADER.declares_entry_point("VSMain"));
        assert!(TRIANGLE_SHADER.declares_entry_point("PSMain"));
    }

    #[test]
    fn vertices_wind_clockwise() {
        let [a, b, c] = VERTICES.map(|v| v.position);
        let signed_area = (b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1]);
        assert!(signed_area < 0.0);
    }

    #[test]
    fn first_frame_draws_three_vertices_over_the_whole_window() {
        let target = RecordingTarget::new();
        let mut d = driver(&target);

        assert_eq!(d.render_frame().unwrap(), FrameOutcome::Presented);

        let cmds = &target.submissions()[0];
        let (viewport, scissor) = bounds(cmds);
        assert_eq!((viewport.width, viewport.height), (1280.0, 720.0));
        assert_eq!(
            scissor,
            ScissorRect { x: 0, y: 0, width: 1280, height: 720 }
        );
        assert_eq!(
            draws(cmds),
            vec![&Command::Draw {
                vertex_count: 3,
                instance_count: 1,
                first_vertex: 0,
            }]
        );
        assert!(cmds.iter().any(|c| matches!(c, Command::SetVertexBuffer { slot: 0, .. })));
        assert_eq!(target.live_resources(), 4);
    }

    #[test]
    fn frame_after_resize_resizes_first_then_draws_at_the_new_size() {
        let target = RecordingTarget::new();
        let mut d = driver(&target);
        d.render_frame().unwrap();
        target.clear_calls();

        d.on_surface_event(SurfaceEvent::ScreenSizeChanged { width: 800, height: 600 });
        d.render_frame().unwrap();

        let calls = target.calls();
        assert_eq!(calls[0], BackendCall::ResizeSwapChain(PhysicalSize::new(800, 600)));
        let (viewport, scissor) = bounds(&target.submissions()[0]);
        assert_eq!((viewport.width, viewport.height), (800.0, 600.0));
        assert_eq!(scissor, ScissorRect { x: 0, y: 0, width: 800, height: 600 });
        assert_eq!(draws(&target.submissions()[0]).len(), 1);
    }

    #[test]
    fn shutdown_releases_every_resource() {
        let target = RecordingTarget::new();
        let mut d = driver(&target);
        d.render_frame().unwrap();
        d.dispose();
        d.dispose();

        assert_eq!(target.count(|c| matches!(c, BackendCall::Release(_))), 4);
        assert_eq!(target.calls().last(), Some(&BackendCall::Dispose { leaked: 0 }));
        assert_eq!(target.live_resources(), 0);
    }

    #[test]
    fn record_before_initialize_emits_nothing() {
        let mut commands = CommandBuffer::new();
        commands.begin();
        Triangle::new().record(&mut commands);
        assert!(commands.is_empty());
    }
}
