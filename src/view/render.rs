use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use crate::assets::LoadProgress;
use crate::frame_loop::FrameRenderer;
use crate::model::{Camera, Material, NodeId, ObjectGraph, Scene};
use crate::view::gpu_init::GpuContext;
use crate::view::mesh::{interleave, MeshBuffer, Vertex};
use crate::view::ui;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Camera and lights, bound once per frame at group 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub sky_color: [f32; 4],
    pub ground_color: [f32; 4],
    pub light_position: [f32; 4],
    pub light_color: [f32; 4],
}

impl FrameUniform {
    pub fn new(scene: &Scene, camera: &Camera) -> Self {
        let hemi = &scene.hemisphere;
        let light = &scene.point_light;
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            camera_pos: camera.eye.extend(1.0).to_array(),
            sky_color: [hemi.sky_color[0], hemi.sky_color[1], hemi.sky_color[2], hemi.intensity],
            ground_color: [hemi.ground_color[0], hemi.ground_color[1], hemi.ground_color[2], 0.0],
            light_position: light.position.extend(light.range).to_array(),
            light_color: [light.color[0], light.color[1], light.color[2], light.intensity],
        }
    }
}

/// Per-mesh model matrix and material, group 1.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    pub params: [f32; 4],
}

impl ObjectUniform {
    pub fn new(model: Mat4, material: &Material) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            base_color: material.base_color,
            params: [material.shininess, 0.0, 0.0, 0.0],
        }
    }
}

pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn create_scene_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    cull_mode: Option<wgpu::Face>,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

/// One uploaded mesh node.
struct DrawItem {
    node: NodeId,
    mesh: MeshBuffer,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    double_sided: bool,
    /// Vertices are rewritten in world space every frame.
    skinned: bool,
}

/// Draws the scene and the preloader overlay onto the window surface.
pub struct SceneRenderer {
    gpu: GpuContext,
    depth_view: wgpu::TextureView,
    pipeline: wgpu::RenderPipeline,
    double_sided_pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    environment: Option<Vec<DrawItem>>,
    character: Option<Vec<DrawItem>>,

    egui_ctx: egui::Context,
    egui_renderer: egui_wgpu::Renderer,
    egui_input: Option<egui::RawInput>,
    pixels_per_point: f32,
}

impl SceneRenderer {
    pub fn new(gpu: GpuContext) -> Self {
        let device = gpu.device.as_ref();
        let (_, depth_view) = create_depth_texture(device, gpu.config.width, gpu.config.height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        let frame_layout = uniform_layout(device, "frame_bind_group_layout");
        let object_layout = uniform_layout(device, "object_bind_group_layout");

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_buffer"),
            size: std::mem::size_of::<FrameUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: frame_buffer.as_entire_binding() }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let pipeline = create_scene_pipeline(
            device,
            gpu.format,
            &pipeline_layout,
            &shader,
            Some(wgpu::Face::Back),
            "scene_pipeline",
        );
        let double_sided_pipeline =
            create_scene_pipeline(device, gpu.format, &pipeline_layout, &shader, None, "double_sided_pipeline");

        let egui_renderer = egui_wgpu::Renderer::new(device, gpu.format, egui_wgpu::RendererOptions::default());

        Self {
            depth_view,
            pipeline,
            double_sided_pipeline,
            frame_buffer,
            frame_bind_group,
            object_layout,
            environment: None,
            character: None,
            egui_ctx: egui::Context::default(),
            egui_renderer,
            egui_input: None,
            pixels_per_point: 1.0,
            gpu,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.gpu.config.width, self.gpu.config.height)
    }

    pub fn egui_ctx(&self) -> &egui::Context {
        &self.egui_ctx
    }

    pub fn set_pixels_per_point(&mut self, pixels_per_point: f32) {
        self.pixels_per_point = pixels_per_point.max(0.1);
        self.egui_ctx.set_pixels_per_point(self.pixels_per_point);
    }

    /// Input for the next overlay frame. Without it the overlay gets an
    /// empty input covering the whole surface.
    pub fn queue_egui_input(&mut self, raw_input: egui::RawInput) {
        self.egui_input = Some(raw_input);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.reconfigure(width, height);
        let (w, h) = self.size();
        let (_, depth_view) = create_depth_texture(&self.gpu.device, w, h);
        self.depth_view = depth_view;
        debug!(width = w, height = h, "surface resized");
    }

    fn take_egui_input(&mut self) -> egui::RawInput {
        let mut raw_input = self.egui_input.take().unwrap_or_default();
        if raw_input.screen_rect.is_none() {
            let (w, h) = self.size();
            raw_input.screen_rect = Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(w as f32 / self.pixels_per_point, h as f32 / self.pixels_per_point),
            ));
        }
        raw_input
    }

    fn acquire_frame(&mut self) -> Option<wgpu::SurfaceTexture> {
        match self.gpu.surface.get_current_texture() {
            Ok(frame) => Some(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (w, h) = self.size();
                self.gpu.reconfigure(w, h);
                match self.gpu.surface.get_current_texture() {
                    Ok(frame) => Some(frame),
                    Err(err) => {
                        warn!(error = %err, "no frame after reconfigure");
                        None
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "skipping frame");
                None
            }
        }
    }

    fn upload_object(&self, graph: &ObjectGraph) -> Vec<DrawItem> {
        let device = self.gpu.device.as_ref();
        let world = graph.world_matrices();
        let mut items = Vec::new();

        for (id, node) in graph.nodes.iter().enumerate() {
            let Some(mesh) = node.mesh() else { continue };
            if mesh.indices.is_empty() {
                continue;
            }
            let skinned = node.skin.is_some() && mesh.skin_weights.is_some();
            let vertices = match graph.skinned_vertices(id, &world) {
                Some((positions, normals)) if skinned => interleave(&positions, &normals),
                _ => interleave(&mesh.positions, &mesh.normals),
            };
            let model = if skinned { Mat4::IDENTITY } else { world[id] };

            let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("object_buffer"),
                contents: bytemuck::bytes_of(&ObjectUniform::new(model, &mesh.material)),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("object_bind_group"),
                layout: &self.object_layout,
                entries: &[wgpu::BindGroupEntry { binding: 0, resource: uniform.as_entire_binding() }],
            });

            items.push(DrawItem {
                node: id,
                mesh: MeshBuffer::upload(device, &vertices, &mesh.indices, skinned),
                uniform,
                bind_group,
                double_sided: mesh.material.double_sided,
                skinned,
            });
        }

        debug!(object = %graph.name, meshes = items.len(), "uploaded object");
        items
    }

    fn sync_uploads(&mut self, scene: &Scene) {
        if self.environment.is_none() {
            if let Some(environment) = &scene.environment {
                self.environment = Some(self.upload_object(environment));
            }
        }
        if self.character.is_none() {
            if let Some(character) = &scene.character {
                self.character = Some(self.upload_object(character));
            }
        }
    }

    fn write_object(queue: &wgpu::Queue, items: &[DrawItem], graph: &ObjectGraph) {
        let world = graph.world_matrices();
        for item in items {
            let Some(mesh) = graph.nodes.get(item.node).and_then(|n| n.mesh()) else { continue };
            let model = if item.skinned {
                if let Some((positions, normals)) = graph.skinned_vertices(item.node, &world) {
                    let vertices = interleave(&positions, &normals);
                    queue.write_buffer(&item.mesh.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
                }
                Mat4::IDENTITY
            } else {
                world[item.node]
            };
            queue.write_buffer(&item.uniform, 0, bytemuck::bytes_of(&ObjectUniform::new(model, &mesh.material)));
        }
    }

    fn encode_overlay(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        mut full_output: egui::FullOutput,
    ) {
        let device = self.gpu.device.as_ref();
        let queue = self.gpu.queue.as_ref();
        let pixels_per_point = full_output.pixels_per_point;
        let primitives = self.egui_ctx.tessellate(std::mem::take(&mut full_output.shapes), pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.config.width, self.gpu.config.height],
            pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(device, queue, *id, image_delta);
        }
        self.egui_renderer
            .update_buffers(device, queue, encoder, &primitives, &screen_descriptor);

        {
            let egui_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.egui_renderer
                .render(&mut egui_pass.forget_lifetime(), &primitives, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

fn clear_color(rgba: [f32; 4]) -> wgpu::Color {
    wgpu::Color { r: rgba[0] as f64, g: rgba[1] as f64, b: rgba[2] as f64, a: rgba[3] as f64 }
}

impl FrameRenderer for SceneRenderer {
    fn render_loading(&mut self, progress: LoadProgress) {
        let Some(frame) = self.acquire_frame() else { return };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("loading_encoder"),
        });

        {
            let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("loading_clear_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Clear(wgpu::Color::BLACK), store: wgpu::StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }

        let raw_input = self.take_egui_input();
        let full_output = ui::build_loading_overlay(&self.egui_ctx, raw_input, progress);
        self.encode_overlay(&mut encoder, &view, full_output);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }

    fn render_scene(&mut self, scene: &Scene, camera: &Camera) {
        // overlay input is only consumed while loading
        self.egui_input = None;
        self.sync_uploads(scene);

        let queue = self.gpu.queue.as_ref();
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&FrameUniform::new(scene, camera)));
        if let (Some(items), Some(graph)) = (&self.environment, &scene.environment) {
            Self::write_object(queue, items, graph);
        }
        if let (Some(items), Some(graph)) = (&self.character, &scene.character) {
            Self::write_object(queue, items, graph);
        }

        let Some(frame) = self.acquire_frame() else { return };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scene_encoder"),
        });

        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(scene.background)),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_bind_group(0, &self.frame_bind_group, &[]);
            let items = self.environment.iter().chain(self.character.iter()).flatten();
            for item in items {
                if item.mesh.index_count == 0 {
                    continue;
                }
                rp.set_pipeline(if item.double_sided { &self.double_sided_pipeline } else { &self.pipeline });
                rp.set_bind_group(1, &item.bind_group, &[]);
                rp.set_vertex_buffer(0, item.mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(item.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                rp.draw_indexed(0..item.mesh.index_count, 0, 0..1);
            }
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}
