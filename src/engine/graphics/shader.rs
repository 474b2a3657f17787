//! Vertex + fragment program: compilation, interface checks and named uniforms.
//!
//! Programs follow a fixed binding convention: matrix uniforms live in
//! [`UNIFORM_GROUP`], textures and their samplers in [`TEXTURE_GROUP`]. A
//! texture named `foo` is sampled through a sampler named `fooSampler`.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use glam::Mat4;
use log::{debug, info};
use wgpu::util::DeviceExt;

use crate::engine::error::{ShaderError, Stage};
use crate::engine::graphics::vertex::Vertex;

pub const UNIFORM_GROUP: u32 = 0;
pub const TEXTURE_GROUP: u32 = 1;

const MATRIX4_SIZE: u64 = std::mem::size_of::<[[f32; 4]; 4]>() as u64;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UniformKind {
    Matrix4,
    Texture,
    Sampler,
}

impl UniformKind {
    fn name(self) -> &'static str {
        match self {
            UniformKind::Matrix4 => "mat4x4<f32>",
            UniformKind::Texture => "texture_2d<f32>",
            UniformKind::Sampler => "sampler",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    pub group: u32,
    pub binding: u32,
    pub kind: UniformKind,
}

/// Name of the sampler paired with texture `name`.
pub fn companion_sampler(name: &str) -> String {
    format!("{name}Sampler")
}

/// Both stages parsed, validated and checked against each other.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    vertex_source: String,
    fragment_source: String,
    vertex_entry: String,
    fragment_entry: String,
    uniforms: BTreeMap<String, UniformSlot>,
}

impl CompiledProgram {
    pub fn uniform(&self, name: &str) -> Option<UniformSlot> {
        self.uniforms.get(name).copied()
    }

    pub fn uniforms(&self) -> impl Iterator<Item = (&str, UniformSlot)> {
        self.uniforms.iter().map(|(name, slot)| (name.as_str(), *slot))
    }

    pub fn vertex_entry(&self) -> &str {
        &self.vertex_entry
    }

    pub fn fragment_entry(&self) -> &str {
        &self.fragment_entry
    }
}

/// Compiles both stages and links them into a program description.
pub fn compile(vertex_source: &str, fragment_source: &str) -> Result<CompiledProgram, ShaderError> {
    let vertex = compile_stage(Stage::Vertex, vertex_source)?;
    let fragment = compile_stage(Stage::Fragment, fragment_source)?;
    link(vertex_source, &vertex, fragment_source, &fragment)
}

fn compile_stage(stage: Stage, source: &str) -> Result<naga::Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        stage,
        diagnostic: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    )
    .validate(&module)
    .map_err(|e| ShaderError::Compile {
        stage,
        diagnostic: e.emit_to_string(source),
    })?;

    Ok(module)
}

fn link(
    vertex_source: &str,
    vertex: &naga::Module,
    fragment_source: &str,
    fragment: &naga::Module,
) -> Result<CompiledProgram, ShaderError> {
    let vs = entry_point(vertex, naga::ShaderStage::Vertex, Stage::Vertex)?;
    let fs = entry_point(fragment, naga::ShaderStage::Fragment, Stage::Fragment)?;

    let provided = Vertex::locations();
    for location in inputs(vertex, vs) {
        if !provided.contains(&location) {
            return Err(link_error(format!(
                "vertex input at location {location} is not provided by the geometry (provides {provided:?})"
            )));
        }
    }

    let written = outputs(vertex, vs);
    for location in inputs(fragment, fs) {
        if !written.contains(&location) {
            return Err(link_error(format!(
                "fragment input at location {location} is not written by the vertex stage"
            )));
        }
    }

    let mut uniforms = reflect_uniforms(vertex)?;
    for (name, slot) in reflect_uniforms(fragment)? {
        match uniforms.get(&name) {
            Some(existing) if *existing != slot => {
                return Err(link_error(format!(
                    "uniform `{name}` is declared differently in the vertex and fragment stages"
                )));
            }
            _ => {
                uniforms.insert(name, slot);
            }
        }
    }
    check_bindings(&uniforms)?;

    Ok(CompiledProgram {
        vertex_source: vertex_source.to_string(),
        fragment_source: fragment_source.to_string(),
        vertex_entry: vs.name.clone(),
        fragment_entry: fs.name.clone(),
        uniforms,
    })
}

fn link_error(diagnostic: String) -> ShaderError {
    ShaderError::Link { diagnostic }
}

fn entry_point<'m>(
    module: &'m naga::Module,
    kind: naga::ShaderStage,
    stage: Stage,
) -> Result<&'m naga::EntryPoint, ShaderError> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == kind)
        .ok_or_else(|| link_error(format!("{stage} source has no {stage} entry point")))
}

fn inputs(module: &naga::Module, ep: &naga::EntryPoint) -> Vec<u32> {
    ep.function
        .arguments
        .iter()
        .flat_map(|arg| locations(module, arg.ty, arg.binding.as_ref()))
        .collect()
}

fn outputs(module: &naga::Module, ep: &naga::EntryPoint) -> Vec<u32> {
    ep.function
        .result
        .as_ref()
        .map(|result| locations(module, result.ty, result.binding.as_ref()))
        .unwrap_or_default()
}

/// User locations carried by a value, looking through one level of struct.
fn locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
) -> Vec<u32> {
    match binding {
        Some(naga::Binding::Location { location, .. }) => vec![*location],
        Some(naga::Binding::BuiltIn(_)) => Vec::new(),
        None => match &module.types[ty].inner {
            naga::TypeInner::Struct { members, .. } => members
                .iter()
                .filter_map(|member| match member.binding {
                    Some(naga::Binding::Location { location, .. }) => Some(location),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        },
    }
}

fn reflect_uniforms(module: &naga::Module) -> Result<BTreeMap<String, UniformSlot>, ShaderError> {
    let mut uniforms = BTreeMap::new();
    for (_, global) in module.global_variables.iter() {
        let (Some(name), Some(binding)) = (&global.name, &global.binding) else {
            continue;
        };
        let kind = match &module.types[global.ty].inner {
            naga::TypeInner::Matrix {
                columns: naga::VectorSize::Quad,
                rows: naga::VectorSize::Quad,
                ..
            } if global.space == naga::AddressSpace::Uniform => UniformKind::Matrix4,
            naga::TypeInner::Image {
                dim: naga::ImageDimension::D2,
                arrayed: false,
                class: naga::ImageClass::Sampled { kind: naga::ScalarKind::Float, multi: false },
            } => UniformKind::Texture,
            naga::TypeInner::Sampler { comparison: false } => UniformKind::Sampler,
            _ => {
                return Err(link_error(format!(
                    "uniform `{name}` has a type this program cannot bind"
                )));
            }
        };
        uniforms.insert(
            name.clone(),
            UniformSlot {
                group: binding.group,
                binding: binding.binding,
                kind,
            },
        );
    }
    Ok(uniforms)
}

fn check_bindings(uniforms: &BTreeMap<String, UniformSlot>) -> Result<(), ShaderError> {
    for (name, slot) in uniforms {
        let expected = match slot.kind {
            UniformKind::Matrix4 => UNIFORM_GROUP,
            UniformKind::Texture | UniformKind::Sampler => TEXTURE_GROUP,
        };
        if slot.group != expected {
            return Err(link_error(format!(
                "uniform `{name}` must be in group {expected}, found group {}",
                slot.group
            )));
        }
        if slot.kind == UniformKind::Texture {
            let sampler = companion_sampler(name);
            match uniforms.get(&sampler) {
                Some(s) if s.kind == UniformKind::Sampler => {}
                _ => {
                    return Err(link_error(format!(
                        "texture `{name}` has no companion sampler `{sampler}`"
                    )));
                }
            }
        }
        if slot.kind == UniformKind::Sampler {
            let paired = uniforms
                .iter()
                .any(|(other, s)| s.kind == UniformKind::Texture && companion_sampler(other) == *name);
            if !paired {
                return Err(link_error(format!(
                    "sampler `{name}` does not belong to any texture"
                )));
            }
        }
    }
    Ok(())
}

fn layout_entries(program: &CompiledProgram, group: u32) -> Vec<wgpu::BindGroupLayoutEntry> {
    program
        .uniforms()
        .filter(|(_, slot)| slot.group == group)
        .map(|(_, slot)| wgpu::BindGroupLayoutEntry {
            binding: slot.binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: match slot.kind {
                UniformKind::Matrix4 => wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(MATRIX4_SIZE),
                },
                UniformKind::Texture => wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                UniformKind::Sampler => {
                    wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
                }
            },
            count: None,
        })
        .collect()
}

/// A linked program living on the GPU.
pub struct ShaderProgram {
    program: CompiledProgram,
    pipeline: wgpu::RenderPipeline,
    uniform_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    matrix_buffers: HashMap<String, wgpu::Buffer>,
    texture_units: BTreeMap<String, u32>,
}

impl ShaderProgram {
    /// Reads, compiles and links the two stages, then builds the pipeline.
    pub fn from_files(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        vertex_path: &Path,
        fragment_path: &Path,
    ) -> Result<Self, ShaderError> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|source| ShaderError::Read {
                path: path.to_path_buf(),
                source,
            })
        };
        let vertex_source = read(vertex_path)?;
        let fragment_source = read(fragment_path)?;

        let program = compile(&vertex_source, &fragment_source)?;
        info!(
            "[shader] Compiled {} + {}",
            vertex_path.display(),
            fragment_path.display()
        );
        Self::create(device, target_format, program)
    }

    pub fn create(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        program: CompiledProgram,
    ) -> Result<Self, ShaderError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Quad Vertex Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(program.vertex_source.clone())),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Quad Fragment Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(program.fragment_source.clone())),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &layout_entries(&program, UNIFORM_GROUP),
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &layout_entries(&program, TEXTURE_GROUP),
        });

        let mut matrix_buffers = HashMap::new();
        for (name, slot) in program.uniforms() {
            if slot.kind != UniformKind::Matrix4 {
                continue;
            }
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(name),
                contents: bytemuck::cast_slice(&Mat4::IDENTITY.to_cols_array()),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            matrix_buffers.insert(name.to_string(), buffer);
        }

        let uniform_entries: Vec<wgpu::BindGroupEntry> = program
            .uniforms()
            .filter_map(|(name, slot)| {
                matrix_buffers.get(name).map(|buffer| wgpu::BindGroupEntry {
                    binding: slot.binding,
                    resource: buffer.as_entire_binding(),
                })
            })
            .collect();
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &uniform_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Quad Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Quad Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: program.vertex_entry(),
                buffers: &[Vertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: program.fragment_entry(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(link_error(err.to_string()));
        }

        Ok(Self {
            program,
            pipeline,
            uniform_bind_group,
            texture_layout,
            matrix_buffers,
            texture_units: BTreeMap::new(),
        })
    }

    /// Makes this program current for the pass.
    pub fn bind<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(UNIFORM_GROUP, &self.uniform_bind_group, &[]);
    }

    fn slot(&self, name: &str, expected: UniformKind) -> Result<UniformSlot, ShaderError> {
        let slot = self
            .program
            .uniform(name)
            .ok_or_else(|| ShaderError::UnknownUniform(name.to_string()))?;
        if slot.kind != expected {
            return Err(ShaderError::UniformKind {
                name: name.to_string(),
                expected: expected.name(),
                actual: slot.kind.name(),
            });
        }
        Ok(slot)
    }

    /// Points the texture uniform `name` at texture unit `value`.
    pub fn set_int(&mut self, name: &str, value: i32) -> Result<(), ShaderError> {
        self.slot(name, UniformKind::Texture)?;
        let unit = u32::try_from(value).map_err(|_| ShaderError::UniformKind {
            name: name.to_string(),
            expected: "non-negative texture unit",
            actual: "negative integer",
        })?;
        debug!("[shader] {} -> texture unit {}", name, unit);
        self.texture_units.insert(name.to_string(), unit);
        Ok(())
    }

    pub fn set_matrix4(&self, queue: &wgpu::Queue, name: &str, matrix: &Mat4) -> Result<(), ShaderError> {
        self.slot(name, UniformKind::Matrix4)?;
        let buffer = self
            .matrix_buffers
            .get(name)
            .ok_or_else(|| ShaderError::UnknownUniform(name.to_string()))?;
        queue.write_buffer(buffer, 0, bytemuck::cast_slice(&matrix.to_cols_array()));
        Ok(())
    }

    /// Every texture uniform with the unit it samples; unassigned ones read unit 0.
    pub fn texture_bindings(&self) -> Vec<TextureBinding> {
        self.program
            .uniforms()
            .filter(|(_, slot)| slot.kind == UniformKind::Texture)
            .filter_map(|(name, slot)| {
                let sampler = self.program.uniform(&companion_sampler(name))?;
                Some(TextureBinding {
                    texture_binding: slot.binding,
                    sampler_binding: sampler.binding,
                    unit: self.texture_units.get(name).copied().unwrap_or(0),
                })
            })
            .collect()
    }

    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }
}

/// Where one texture unit is wired into the texture bind group.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureBinding {
    pub texture_binding: u32,
    pub sampler_binding: u32,
    pub unit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = include_str!("../../../shaders/quad.vert.wgsl");
    const FRAGMENT: &str = include_str!("../../../shaders/quad.frag.wgsl");

    #[test]
    fn shipped_shaders_compile_and_expose_the_uniform_contract() {
        let program = compile(VERTEX, FRAGMENT).expect("shipped shaders compile");
        assert_eq!(program.vertex_entry(), "vs_main");
        assert_eq!(program.fragment_entry(), "fs_main");

        let trans = program.uniform("transMat").expect("transMat");
        assert_eq!(trans.kind, UniformKind::Matrix4);
        assert_eq!(trans.group, UNIFORM_GROUP);

        for name in ["myTexture", "myTexture2"] {
            let slot = program.uniform(name).expect(name);
            assert_eq!(slot.kind, UniformKind::Texture);
            assert_eq!(slot.group, TEXTURE_GROUP);
            let sampler = program.uniform(&companion_sampler(name)).expect("sampler");
            assert_eq!(sampler.kind, UniformKind::Sampler);
        }
    }

    #[test]
    fn syntax_error_yields_compile_diagnostic() {
        let broken = VERTEX.replace("var out: VertexOutput;", "var out VertexOutput");
        let err = compile(&broken, FRAGMENT).unwrap_err();
        match &err {
            ShaderError::Compile { stage, diagnostic } => {
                assert_eq!(*stage, Stage::Vertex);
                assert!(!diagnostic.trim().is_empty());
            }
            other => panic!("expected compile error, got {other:?}"),
        }
        assert!(err.diagnostic().is_some());
    }

    #[test]
    fn fragment_errors_are_attributed_to_the_fragment_stage() {
        let broken = FRAGMENT.replace("textureSample(myTexture,", "textureSample(noSuchTexture,");
        match compile(VERTEX, &broken) {
            Err(ShaderError::Compile { stage, diagnostic }) => {
                assert_eq!(stage, Stage::Fragment);
                assert!(!diagnostic.is_empty());
            }
            other => panic!("expected fragment compile error, got {other:?}"),
        }
    }

    #[test]
    fn fragment_input_must_be_written_by_vertex_stage() {
        let fragment = FRAGMENT.replace("@location(1) tex_coord", "@location(4) tex_coord");
        match compile(VERTEX, &fragment) {
            Err(ShaderError::Link { diagnostic }) => assert!(diagnostic.contains("location 4")),
            other => panic!("expected link error, got {other:?}"),
        }
    }

    #[test]
    fn vertex_input_must_be_provided_by_geometry() {
        let vertex = VERTEX.replace("@location(2) tex_coord", "@location(7) tex_coord");
        match compile(&vertex, FRAGMENT) {
            Err(ShaderError::Link { diagnostic }) => assert!(diagnostic.contains("location 7")),
            other => panic!("expected link error, got {other:?}"),
        }
    }

    #[test]
    fn texture_without_sampler_fails_to_link() {
        let fragment = r#"
@group(1) @binding(0)
var lonely: texture_2d<f32>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return textureLoad(lonely, vec2<i32>(0, 0), 0);
}
"#;
        match compile(VERTEX, fragment) {
            Err(ShaderError::Link { diagnostic }) => assert!(diagnostic.contains("lonelySampler")),
            other => panic!("expected link error, got {other:?}"),
        }
    }

    #[test]
    fn stray_sampler_fails_to_link() {
        let fragment = format!("{FRAGMENT}\n@group(1) @binding(4)\nvar strayFilter: sampler;\n");
        match compile(VERTEX, &fragment) {
            Err(ShaderError::Link { diagnostic }) => assert!(diagnostic.contains("strayFilter")),
            other => panic!("expected link error, got {other:?}"),
        }
    }

    #[test]
    fn swapped_stages_have_no_matching_entry_point() {
        assert!(matches!(compile(FRAGMENT, VERTEX), Err(ShaderError::Link { .. })));
    }
}
