use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Shape parameters for one terrain generation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub width: u32,
    pub height: u32,
    /// World-space spacing between neighbouring grid points.
    pub scale: f32,
    pub frequency: f32,
    pub amplitude: f32,
}

impl GenerationParams {
    pub const fn new(width: u32, height: u32, scale: f32, frequency: f32, amplitude: f32) -> Self {
        Self {
            width,
            height,
            scale,
            frequency,
            amplitude,
        }
    }

    pub fn expected_vertex_count(&self) -> usize {
        if self.width < 2 || self.height < 2 {
            return 0;
        }
        (self.width as usize - 1) * (self.height as usize - 1) * 6
    }

    pub fn is_finite(&self) -> bool {
        self.scale.is_finite() && self.frequency.is_finite() && self.amplitude.is_finite()
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::new(128, 128, 1.0, 0.1, 4.0)
    }
}

/// Interleaved position + normal, 6 floats.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

const _: () = assert!(std::mem::size_of::<Vertex>() == Vertex::FLOATS * 4);

impl Vertex {
    pub const FLOATS: usize = 6;

    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = [
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
    ];

    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Non-indexed triangle soup. The vertex count is always a multiple of 3.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TerrainMesh {
    vertices: Vec<Vertex>,
}

impl TerrainMesh {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(vertices: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
        }
    }

    pub(crate) fn push_triangle(&mut self, triangle: [Vertex; 3]) {
        self.vertices.extend_from_slice(&triangle);
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn triangles(&self) -> impl Iterator<Item = &[Vertex]> {
        self.vertices.chunks_exact(3)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Lowest and highest Y over all vertices, `None` when empty.
    pub fn height_range(&self) -> Option<(f32, f32)> {
        self.vertices.iter().fold(None, |range, v| {
            let y = v.position[1];
            Some(match range {
                None => (y, y),
                Some((lo, hi)) => (lo.min(y), hi.max(y)),
            })
        })
    }
}
