use super::gpu::{
    check_entry_points, uniform_offsets, BufferId, BufferKind, BufferUsage, GpuBackend, ProgramId, UniformDecl,
    UniformValue, VertexAttr, VertexLayout,
};
use crate::error::GpuError;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::any::Any;
use wgpu::util::DeviceExt;

/// Interleaved position, normal and texcoord.
const VERTEX_STRIDE: u64 = 8 * 4;
const COLOR_STRIDE: u64 = 4 * 4;
const MIN_BUFFER_SIZE: u64 = 64;

#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct WhiteColor {
    rgba: [f32; 4],
}

struct WgpuProgram {
    name: SmolStr,
    uniforms: Vec<UniformDecl>,
    offsets: Vec<usize>,
    block: Vec<f32>,
    bind_group_layout: wgpu::BindGroupLayout,
    /// Per-vertex color read from the vectors buffer.
    colored: wgpu::RenderPipeline,
    /// Color slot fed one constant white value per instance.
    plain: wgpu::RenderPipeline,
}

struct WgpuBuffer {
    kind: BufferKind,
    usage: BufferUsage,
    buffer: Option<wgpu::Buffer>,
    capacity: u64,
    /// Byte offset of the color block, when the layout has one.
    color_offset: Option<u64>,
    count: usize,
}

struct RecordedDraw {
    program: ProgramId,
    vectors: BufferId,
    indexes: BufferId,
    bind_group: wgpu::BindGroup,
    range: std::ops::Range<u32>,
}

/// GPU backend on a wgpu device. Draw calls are recorded with a snapshot of
/// the program's uniforms and replayed into a render pass the caller opens
/// on a color target of `format`, without depth.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    programs: Vec<WgpuProgram>,
    buffers: FxHashMap<BufferId, WgpuBuffer>,
    next_buffer: u32,
    current: Option<ProgramId>,
    bound: Option<(BufferId, BufferId)>,
    white: wgpu::Buffer,
    draws: Vec<RecordedDraw>,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let white = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh White Color"),
            contents: bytemuck::bytes_of(&WhiteColor { rgba: [1.0; 4] }),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            device,
            queue,
            format,
            programs: Vec::new(),
            buffers: FxHashMap::default(),
            next_buffer: 0,
            current: None,
            bound: None,
            white,
            draws: Vec::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn pending_draws(&self) -> usize {
        self.draws.len()
    }

    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }

    /// Issues every recorded draw into `pass` in recording order. Draws whose
    /// buffers were deleted since are skipped.
    pub fn replay(&self, pass: &mut wgpu::RenderPass<'_>) {
        for draw in &self.draws {
            let Some(program) = self.programs.get(draw.program.0 as usize) else {
                continue;
            };
            let (Some(vectors), Some(indexes)) = (self.buffers.get(&draw.vectors), self.buffers.get(&draw.indexes))
            else {
                continue;
            };
            let (Some(vbuf), Some(ibuf)) = (vectors.buffer.as_ref(), indexes.buffer.as_ref()) else {
                continue;
            };
            match vectors.color_offset {
                Some(offset) => {
                    pass.set_pipeline(&program.colored);
                    pass.set_vertex_buffer(1, vbuf.slice(offset..));
                }
                None => {
                    pass.set_pipeline(&program.plain);
                    pass.set_vertex_buffer(1, self.white.slice(..));
                }
            }
            pass.set_bind_group(0, &draw.bind_group, &[]);
            pass.set_vertex_buffer(0, vbuf.slice(..));
            pass.set_index_buffer(ibuf.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(draw.range.clone(), 0, 0..1);
        }
    }

    /// Static buffers are sized to fit; dynamic ones get power-of-two headroom
    /// so per-frame uploads rarely reallocate.
    fn write(&mut self, id: BufferId, kind: BufferKind, bytes: &[u8]) -> Result<(), GpuError> {
        let buf = self
            .buffers
            .get_mut(&id)
            .filter(|b| b.kind == kind)
            .ok_or(GpuError::UnknownBuffer)?;
        let needed = (bytes.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        if needed == 0 {
            return Ok(());
        }
        if buf.buffer.is_none() || needed > buf.capacity {
            let size = match buf.usage {
                BufferUsage::Static => needed,
                BufferUsage::Dynamic => needed.next_power_of_two(),
            }
            .max(MIN_BUFFER_SIZE);
            let usage = match kind {
                BufferKind::Vectors => wgpu::BufferUsages::VERTEX,
                BufferKind::Indexes => wgpu::BufferUsages::INDEX,
            } | wgpu::BufferUsages::COPY_DST;
            log::debug!(target: "trellis::gpu", "buffer {:?}: grow {} -> {} bytes", id, buf.capacity, size);
            buf.buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Mesh Buffer"),
                size,
                usage,
                mapped_at_creation: false,
            }));
            buf.capacity = size;
        }
        if let Some(buffer) = buf.buffer.as_ref() {
            self.queue.write_buffer(buffer, 0, bytes);
        }
        Ok(())
    }
}

fn create_mesh_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    color_step: wgpu::VertexStepMode,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[
                wgpu::VertexBufferLayout {
                    array_stride: VERTEX_STRIDE,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x3,
                        2 => Float32x2
                    ],
                },
                wgpu::VertexBufferLayout {
                    array_stride: COLOR_STRIDE,
                    step_mode: color_step,
                    attributes: &wgpu::vertex_attr_array![3 => Float32x4],
                },
            ],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

impl GpuBackend for WgpuBackend {
    /// Every uniform starts on a 16 byte boundary; the WGSL struct has to be
    /// declared to match.
    fn compile_program(&mut self, name: &str, wgsl: &str, uniforms: &[UniformDecl]) -> Result<ProgramId, GpuError> {
        check_entry_points(name, wgsl)?;
        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(wgsl.into()),
        });
        let (offsets, size) = uniform_offsets(uniforms);
        let entries: Vec<wgpu::BindGroupLayoutEntry> = if uniforms.is_empty() {
            Vec::new()
        } else {
            vec![wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }]
        };
        let bind_group_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Mesh Bind Group Layout"),
            entries: &entries,
        });
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[Some(&bind_group_layout)],
            immediate_size: 0,
        });
        let colored = create_mesh_pipeline(
            &self.device,
            &pipeline_layout,
            &shader,
            self.format,
            wgpu::VertexStepMode::Vertex,
            "Mesh Pipeline (vertex color)",
        );
        let plain = create_mesh_pipeline(
            &self.device,
            &pipeline_layout,
            &shader,
            self.format,
            wgpu::VertexStepMode::Instance,
            "Mesh Pipeline",
        );

        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(WgpuProgram {
            name: SmolStr::new(name),
            uniforms: uniforms.to_vec(),
            offsets,
            block: vec![0.0; size / 4],
            bind_group_layout,
            colored,
            plain,
        });
        log::debug!(target: "trellis::gpu", "compiled program `{name}` ({size} uniform bytes)");
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) -> Result<(), GpuError> {
        if self.programs.get(program.0 as usize).is_none() {
            return Err(GpuError::UnknownProgram);
        }
        self.current = Some(program);
        Ok(())
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) -> Result<(), GpuError> {
        let prog = self
            .programs
            .get_mut(program.0 as usize)
            .ok_or(GpuError::UnknownProgram)?;
        let Some(i) = prog.uniforms.iter().position(|u| u.name == name) else {
            return Err(GpuError::UnknownUniform {
                program: prog.name.clone(),
                uniform: SmolStr::new(name),
            });
        };
        let decl = &prog.uniforms[i];
        if decl.ty != value.ty() {
            return Err(GpuError::UniformType {
                uniform: decl.name.clone(),
                expected: decl.ty.name(),
            });
        }
        let at = prog.offsets[i] / 4;
        let end = at + decl.ty.block_size() / 4;
        value.write_to(&mut prog.block[at..end]);
        Ok(())
    }

    fn create_buffer(&mut self, kind: BufferKind, usage: BufferUsage) -> BufferId {
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(
            id,
            WgpuBuffer {
                kind,
                usage,
                buffer: None,
                capacity: 0,
                color_offset: None,
                count: 0,
            },
        );
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(buf) = self.buffers.remove(&buffer)
            && let Some(b) = buf.buffer
        {
            b.destroy();
        }
        if self.bound.is_some_and(|(v, i)| v == buffer || i == buffer) {
            self.bound = None;
        }
    }

    fn upload_vectors(&mut self, buffer: BufferId, layout: &VertexLayout, data: &[f32]) -> Result<(), GpuError> {
        self.write(buffer, BufferKind::Vectors, bytemuck::cast_slice(data))?;
        if let Some(buf) = self.buffers.get_mut(&buffer) {
            buf.count = layout.len;
            buf.color_offset = layout.placement(VertexAttr::Color).map(|p| p.start as u64 * 4);
        }
        Ok(())
    }

    fn upload_indexes(&mut self, buffer: BufferId, data: &[u32]) -> Result<(), GpuError> {
        self.write(buffer, BufferKind::Indexes, bytemuck::cast_slice(data))?;
        if let Some(buf) = self.buffers.get_mut(&buffer) {
            buf.count = data.len();
        }
        Ok(())
    }

    fn bind(&mut self, vectors: BufferId, indexes: BufferId) -> Result<(), GpuError> {
        let kind_of = |id: BufferId| self.buffers.get(&id).map(|b: &WgpuBuffer| b.kind);
        if kind_of(vectors) != Some(BufferKind::Vectors) || kind_of(indexes) != Some(BufferKind::Indexes) {
            return Err(GpuError::UnknownBuffer);
        }
        self.bound = Some((vectors, indexes));
        Ok(())
    }

    fn draw_triangles_indexed(&mut self, start: u32, count: u32) -> Result<(), GpuError> {
        let (vectors, indexes) = self.bound.ok_or(GpuError::NothingBound)?;
        let program_id = self.current.ok_or(GpuError::UnknownProgram)?;
        let program = self
            .programs
            .get(program_id.0 as usize)
            .ok_or(GpuError::UnknownProgram)?;
        let uploaded = self.buffers.get(&indexes).map_or(0, |b| b.count) as u32;
        let end = start.saturating_add(count).min(uploaded);
        if end <= start {
            return Ok(());
        }

        let uniform_buffer = (!program.block.is_empty()).then(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Uniform Buffer"),
                contents: bytemuck::cast_slice(&program.block),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        });
        let entries: Vec<wgpu::BindGroupEntry> = uniform_buffer
            .iter()
            .map(|buffer| wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            })
            .collect();
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Bind Group"),
            layout: &program.bind_group_layout,
            entries: &entries,
        });
        self.draws.push(RecordedDraw {
            program: program_id,
            vectors,
            indexes,
            bind_group,
            range: start..end,
        });
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
