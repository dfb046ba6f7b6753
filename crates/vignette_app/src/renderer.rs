// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene renderer.
//!
//! Draws every cube in the scene graph with one pipeline. Each object gets a
//! slot in a dynamic-offset uniform buffer holding its model matrix and color;
//! the camera's view-projection lives in a separate uniform.

use crate::camera::Camera;
use crate::config::RendererConfig;
use crate::drawing::DrawingContext;
use crate::math::{self, Mat4};
use crate::scene::{Mesh, SceneGraph};
use egui_wgpu::wgpu;
use std::num::NonZeroU64;
use wgpu::util::DeviceExt as _;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Sample count used when anti-aliasing is enabled
pub const MSAA_SAMPLES: u32 = 4;

/// Cube vertex
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniform {
    view_proj: Mat4,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniform {
    model: Mat4,
    color: [f32; 4],
}

/// Unit cube centered on the origin, two triangles per face, face normals per vertex
fn cube_vertices() -> Vec<Vertex> {
    // (normal, tangent u, tangent v) with u x v = normal so faces wind counter-clockwise
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    const CORNERS: [(f32, f32); 6] = [
        (-0.5, -0.5),
        (0.5, -0.5),
        (0.5, 0.5),
        (-0.5, -0.5),
        (0.5, 0.5),
        (-0.5, 0.5),
    ];

    let mut vertices = Vec::with_capacity(FACES.len() * CORNERS.len());
    for (normal, u, v) in FACES {
        for (a, b) in CORNERS {
            let position = std::array::from_fn(|i| normal[i] * 0.5 + u[i] * a + v[i] * b);
            vertices.push(Vertex { position, normal });
        }
    }
    vertices
}

fn align_to(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Background color for the scene pass, or `None` to keep the previous frame
pub fn clear_color(config: &RendererConfig, srgb_target: bool, premultiplied: bool) -> Option<wgpu::Color> {
    if !config.auto_clear {
        return None;
    }
    let [r, g, b] = if srgb_target {
        config.clear_color.linear_rgb()
    } else {
        config.clear_color.rgb()
    };
    let a = config.clear_alpha;
    let scale = if premultiplied { a } else { 1.0 };
    Some(wgpu::Color {
        r: f64::from(r * scale),
        g: f64::from(g * scale),
        b: f64::from(b * scale),
        a: f64::from(a),
    })
}

/// Renders the scene graph into a surface texture
pub struct SceneRenderer {
    pipeline: wgpu::RenderPipeline,
    sample_count: u32,
    format: wgpu::TextureFormat,
    size: [u32; 2],
    depth_view: wgpu::TextureView,
    msaa_view: Option<wgpu::TextureView>,
    cube_vertex_buffer: wgpu::Buffer,
    cube_vertex_count: u32,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    object_stride: u64,
    object_capacity: usize,
    srgb_target: bool,
}

impl SceneRenderer {
    /// Create a renderer for a target of `format` and physical `size`
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, size: [u32; 2], sample_count: u32) -> Self {
        let size = [size[0].max(1), size[1].max(1)];

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
        });

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform {
                view_proj: math::IDENTITY,
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(size_of::<ObjectUniform>() as u64),
                },
                count: None,
            }],
        });

        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let object_stride = align_to(size_of::<ObjectUniform>() as u64, alignment);
        let object_capacity = 4;
        let (object_buffer, object_bind_group) =
            Self::create_object_buffer(device, &object_layout, object_stride, object_capacity);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &object_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
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
            multisample: wgpu::MultisampleState {
                count: sample_count,
                ..Default::default()
            },
            multiview: None,
            cache: None,
        });

        let vertices = cube_vertices();
        let cube_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cube Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let depth_view = Self::create_attachment(device, DEPTH_FORMAT, size, sample_count, "Scene Depth Texture");
        let msaa_view = (sample_count > 1)
            .then(|| Self::create_attachment(device, format, size, sample_count, "Scene MSAA Texture"));

        Self {
            pipeline,
            sample_count,
            format,
            size,
            depth_view,
            msaa_view,
            cube_vertex_buffer,
            cube_vertex_count: vertices.len() as u32,
            camera_buffer,
            camera_bind_group,
            object_layout,
            object_buffer,
            object_bind_group,
            object_stride,
            object_capacity,
            srgb_target: format.is_srgb(),
        }
    }

    fn create_attachment(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: [u32; 2],
        sample_count: u32,
        label: &str,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size[0],
                height: size[1],
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_object_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object Buffer"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(size_of::<ObjectUniform>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Whether the target format is sRGB encoded
    pub fn is_srgb(&self) -> bool {
        self.srgb_target
    }

    /// Recreate size-dependent attachments
    pub fn resize(&mut self, device: &wgpu::Device, new_size: [u32; 2]) {
        let new_size = [new_size[0].max(1), new_size[1].max(1)];
        if new_size == self.size {
            return;
        }
        self.size = new_size;
        self.depth_view =
            Self::create_attachment(device, DEPTH_FORMAT, new_size, self.sample_count, "Scene Depth Texture");
        if self.sample_count > 1 {
            self.msaa_view = Some(Self::create_attachment(
                device,
                self.format,
                new_size,
                self.sample_count,
                "Scene MSAA Texture",
            ));
        }
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &SceneGraph, camera: &Camera) -> usize {
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[CameraUniform {
                view_proj: camera.view_projection(),
            }]),
        );

        let count = scene.len();
        if count > self.object_capacity {
            self.object_capacity = count.next_power_of_two();
            let (buffer, bind_group) =
                Self::create_object_buffer(device, &self.object_layout, self.object_stride, self.object_capacity);
            self.object_buffer = buffer;
            self.object_bind_group = bind_group;
            tracing::debug!("Object buffer grown to {} slots", self.object_capacity);
        }

        let stride = self.object_stride as usize;
        let mut data = vec![0u8; stride * count];
        for (slot, (_, object)) in scene.objects().enumerate() {
            let Mesh::Cube { size, color } = object.mesh;
            let model = math::mul(&object.model_matrix(), &math::scale([size; 3]));
            let [r, g, b] = if self.srgb_target { color.linear_rgb() } else { color.rgb() };
            let uniform = ObjectUniform {
                model,
                color: [r, g, b, 1.0],
            };
            let offset = slot * stride;
            data[offset..offset + size_of::<ObjectUniform>()].copy_from_slice(bytemuck::bytes_of(&uniform));
        }
        if !data.is_empty() {
            queue.write_buffer(&self.object_buffer, 0, &data);
        }
        count
    }

    /// Record the scene pass into `encoder`, resolving to `target` when multisampled
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        ctx: &DrawingContext,
        clear: Option<wgpu::Color>,
    ) {
        let count = self.upload(device, queue, &ctx.scene, &ctx.camera);

        let (view, resolve_target) = match &self.msaa_view {
            Some(msaa) => (msaa, Some(target)),
            None => (target, None),
        };
        let load = clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear);

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.cube_vertex_buffer.slice(..));
        for slot in 0..count {
            let offset = (slot as u64 * self.object_stride) as wgpu::DynamicOffset;
            render_pass.set_bind_group(1, &self.object_bind_group, &[offset]);
            render_pass.draw(0..self.cube_vertex_count, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Color;

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    #[test]
    fn test_cube_vertices() {
        let vertices = cube_vertices();
        assert_eq!(vertices.len(), 36);
        for vertex in &vertices {
            assert!(vertex.position.iter().all(|c| c.abs() == 0.5));
        }
    }

    #[test]
    fn test_cube_faces_wind_outward() {
        for triangle in cube_vertices().chunks(3) {
            let [a, b, c] = [triangle[0].position, triangle[1].position, triangle[2].position];
            let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            let n = cross(ab, ac);
            let facing: f32 = n.iter().zip(triangle[0].normal.iter()).map(|(x, y)| x * y).sum();
            assert!(facing > 0.0, "triangle {triangle:?} winds inward");
        }
    }

    #[test]
    fn test_align_to() {
        assert_eq!(align_to(80, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
    }

    #[test]
    fn test_clear_color() {
        let mut config = RendererConfig {
            clear_color: Color(0xff0000),
            clear_alpha: 0.5,
            ..Default::default()
        };
        let color = clear_color(&config, false, true).unwrap();
        assert_eq!((color.r, color.g, color.a), (0.5, 0.0, 0.5));

        let color = clear_color(&config, false, false).unwrap();
        assert_eq!(color.r, 1.0);

        config.auto_clear = false;
        assert!(clear_color(&config, true, false).is_none());
    }
}
