use wgpu;

/// Attribute locations shared with the vertex shader.
pub const POSITION_LOCATION: u32 = 0;
pub const COLOR_LOCATION: u32 = 1;
pub const TEX_COORD_LOCATION: u32 = 2;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: &[wgpu::VertexAttribute] = &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: POSITION_LOCATION,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                shader_location: COLOR_LOCATION,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: (2 * std::mem::size_of::<[f32; 3]>()) as wgpu::BufferAddress,
                shader_location: TEX_COORD_LOCATION,
                format: wgpu::VertexFormat::Float32x2,
            },
        ];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: ATTRIBUTES,
        }
    }

    /// Locations the geometry feeds; a vertex shader may consume no others.
    pub fn locations() -> [u32; 3] {
        [POSITION_LOCATION, COLOR_LOCATION, TEX_COORD_LOCATION]
    }
}

pub const QUAD_VERTICES: &[Vertex] = &[
    // top right
    Vertex { position: [ 0.5,  0.5, 0.0], color: [1.0, 0.0, 0.0], tex_coords: [1.0, 1.0] },
    // bottom right
    Vertex { position: [ 0.5, -0.5, 0.0], color: [0.0, 1.0, 0.0], tex_coords: [1.0, 0.0] },
    // bottom left
    Vertex { position: [-0.5, -0.5, 0.0], color: [0.0, 0.0, 1.0], tex_coords: [0.0, 0.0] },
    // top left
    Vertex { position: [-0.5,  0.5, 0.0], color: [1.0, 1.0, 0.0], tex_coords: [0.0, 1.0] },
];

pub const QUAD_INDICES: &[u32] = &[
    0, 1, 3, // first triangle
    1, 2, 3, // second triangle
];
