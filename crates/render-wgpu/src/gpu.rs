use crate::camera::OrbitCamera;
use crate::mesh::{self, Vertex};
use crate::scene::GpuScene;
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use tumble_common::Visual;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct InstanceData {
    model_0: [f32; 4],
    model_1: [f32; 4],
    model_2: [f32; 4],
    model_3: [f32; 4],
    color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct FloorVertex {
    position: [f32; 3],
    color: [f32; 4],
}

const SPHERE_COLOR: [f32; 4] = [0.35, 0.65, 0.95, 1.0];
const BOX_COLOR: [f32; 4] = [0.95, 0.6, 0.3, 1.0];
const GROUND_COLOR: [f32; 4] = [0.16, 0.17, 0.20, 1.0];

// The quad sits a hair below the grid lines so the two never z-fight.
const GROUND_OFFSET: f32 = -0.003;

/// Solid 10x10 ground plane at y = 0, two triangles.
fn floor_quad(half_extent: f32) -> Vec<FloorVertex> {
    let corner = |x: f32, z: f32| FloorVertex {
        position: [x * half_extent, GROUND_OFFSET, z * half_extent],
        color: GROUND_COLOR,
    };
    vec![
        corner(-1.0, -1.0),
        corner(1.0, -1.0),
        corner(1.0, 1.0),
        corner(1.0, 1.0),
        corner(-1.0, 1.0),
        corner(-1.0, -1.0),
    ]
}

/// Grid lines drawn over the ground plane.
fn floor_grid(half_extent: i32, spacing: f32) -> Vec<FloorVertex> {
    let color = [0.45, 0.45, 0.45, 1.0];
    let extent = half_extent as f32 * spacing;
    let mut verts = Vec::new();
    for i in -half_extent..=half_extent {
        let offset = i as f32 * spacing;
        verts.push(FloorVertex {
            position: [-extent, 0.0, offset],
            color,
        });
        verts.push(FloorVertex {
            position: [extent, 0.0, offset],
            color,
        });
        verts.push(FloorVertex {
            position: [offset, 0.0, -extent],
            color,
        });
        verts.push(FloorVertex {
            position: [offset, 0.0, extent],
            color,
        });
    }
    verts
}

struct InstancedMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    instance_buffer: wgpu::Buffer,
}

impl InstancedMesh {
    fn new(
        device: &wgpu::Device,
        label: &str,
        vertices: &[Vertex],
        indices: &[u16],
        max_instances: u32,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (max_instances as u64) * std::mem::size_of::<InstanceData>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            instance_buffer,
        }
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, instances: u32) {
        if instances == 0 {
            return;
        }
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..self.index_count, 0, 0..instances);
    }
}

/// wgpu renderer for the sandbox scene.
pub struct SandboxRenderer {
    object_pipeline: wgpu::RenderPipeline,
    ground_pipeline: wgpu::RenderPipeline,
    grid_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    sphere: InstancedMesh,
    cube: InstancedMesh,
    ground_vertex_buffer: wgpu::Buffer,
    ground_vertex_count: u32,
    grid_vertex_buffer: wgpu::Buffer,
    grid_vertex_count: u32,
    max_instances: u32,
    depth_texture: wgpu::TextureView,
}

impl SandboxRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        max_instances: u32,
    ) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform_buffer"),
            contents: bytemuck::bytes_of(&Uniforms {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
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

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let object_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("object_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::OBJECT_SHADER.into()),
        });

        let object_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("object_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &object_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3,
                            1 => Float32x3,
                        ],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<InstanceData>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            2 => Float32x4,
                            3 => Float32x4,
                            4 => Float32x4,
                            5 => Float32x4,
                            6 => Float32x4,
                        ],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &object_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let floor_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("floor_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::FLOOR_SHADER.into()),
        });

        let floor_pipeline = |label: &str, topology: wgpu::PrimitiveTopology| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &floor_shader,
                    entry_point: Some("vs_floor"),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<FloorVertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3,
                            1 => Float32x4,
                        ],
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &floor_shader,
                    entry_point: Some("fs_floor"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: wgpu::TextureFormat::Depth32Float,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
        };
        let ground_pipeline =
            floor_pipeline("ground_pipeline", wgpu::PrimitiveTopology::TriangleList);
        let grid_pipeline = floor_pipeline("grid_pipeline", wgpu::PrimitiveTopology::LineList);

        let (sphere_verts, sphere_indices) = mesh::uv_sphere(16, 24);
        let sphere = InstancedMesh::new(
            device,
            "sphere_mesh",
            &sphere_verts,
            &sphere_indices,
            max_instances,
        );

        let (cube_verts, cube_indices) = mesh::cube();
        let cube = InstancedMesh::new(device, "cube_mesh", &cube_verts, &cube_indices, max_instances);

        let ground_verts = floor_quad(5.0);
        let ground_vertex_count = ground_verts.len() as u32;
        let ground_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("ground_vertex_buffer"),
            contents: bytemuck::cast_slice(&ground_verts),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let grid_verts = floor_grid(5, 1.0);
        let grid_vertex_count = grid_verts.len() as u32;
        let grid_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("grid_vertex_buffer"),
            contents: bytemuck::cast_slice(&grid_verts),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let depth_texture = Self::create_depth_texture(device, width, height);

        Self {
            object_pipeline,
            ground_pipeline,
            grid_pipeline,
            uniform_buffer,
            uniform_bind_group,
            sphere,
            cube,
            ground_vertex_buffer,
            ground_vertex_count,
            grid_vertex_buffer,
            grid_vertex_count,
            max_instances,
            depth_texture,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    /// Render one frame: ground plane, grid lines, then every scene object.
    pub fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        camera: &OrbitCamera,
        scene: &GpuScene,
    ) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&Uniforms {
                view_proj: camera.view_projection().to_cols_array_2d(),
            }),
        );

        let mut spheres: Vec<InstanceData> = Vec::new();
        let mut boxes: Vec<InstanceData> = Vec::new();
        for (visual, pose) in scene.objects() {
            let model = Mat4::from_scale_rotation_translation(
                visual.mesh_scale(),
                pose.rotation,
                pose.position,
            );
            let cols = model.to_cols_array_2d();
            let (bucket, color) = match visual {
                Visual::Sphere { .. } => (&mut spheres, SPHERE_COLOR),
                Visual::Box { .. } => (&mut boxes, BOX_COLOR),
            };
            if bucket.len() < self.max_instances as usize {
                bucket.push(InstanceData {
                    model_0: cols[0],
                    model_1: cols[1],
                    model_2: cols[2],
                    model_3: cols[3],
                    color,
                });
            }
        }

        if !spheres.is_empty() {
            queue.write_buffer(&self.sphere.instance_buffer, 0, bytemuck::cast_slice(&spheres));
        }
        if !boxes.is_empty() {
            queue.write_buffer(&self.cube.instance_buffer, 0, bytemuck::cast_slice(&boxes));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.08,
                            g: 0.09,
                            b: 0.12,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_pipeline(&self.ground_pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_vertex_buffer(0, self.ground_vertex_buffer.slice(..));
            pass.draw(0..self.ground_vertex_count, 0..1);

            pass.set_pipeline(&self.grid_pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_vertex_buffer(0, self.grid_vertex_buffer.slice(..));
            pass.draw(0..self.grid_vertex_count, 0..1);

            pass.set_pipeline(&self.object_pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            self.sphere.draw(&mut pass, spheres.len() as u32);
            self.cube.draw(&mut pass, boxes.len() as u32);
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_quad_spans_the_full_plane() {
        let verts = floor_quad(5.0);
        assert_eq!(verts.len(), 6);
        let xs: Vec<f32> = verts.iter().map(|v| v.position[0]).collect();
        let zs: Vec<f32> = verts.iter().map(|v| v.position[2]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), -5.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 5.0);
        assert_eq!(zs.iter().cloned().fold(f32::MAX, f32::min), -5.0);
        assert_eq!(zs.iter().cloned().fold(f32::MIN, f32::max), 5.0);
    }

    #[test]
    fn ground_quad_sits_below_the_grid() {
        for v in floor_quad(5.0) {
            assert!(v.position[1] < 0.0);
        }
        for v in floor_grid(5, 1.0) {
            assert_eq!(v.position[1], 0.0);
        }
    }

    #[test]
    fn grid_has_a_line_pair_per_division() {
        // 11 lines each way, 2 vertices per line.
        let verts = floor_grid(5, 1.0);
        assert_eq!(verts.len(), 11 * 2 * 2);
    }

    #[test]
    fn shaders_declare_their_entry_points() {
        assert!(crate::shaders::OBJECT_SHADER.contains("fn vs_main"));
        assert!(crate::shaders::OBJECT_SHADER.contains("fn fs_main"));
        assert!(crate::shaders::FLOOR_SHADER.contains("fn vs_floor"));
        assert!(crate::shaders::FLOOR_SHADER.contains("fn fs_floor"));
    }
}
