use glam::{Mat4, Vec3};

use crate::error::RenderResult;
use crate::renderer::uniforms::UniformSlot;
use crate::terrain::Vertex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderProgram {
    Terrain,
    Marker,
}

impl ShaderProgram {
    pub const ALL: [ShaderProgram; 2] = [ShaderProgram::Terrain, ShaderProgram::Marker];

    pub fn index(self) -> usize {
        match self {
            ShaderProgram::Terrain => 0,
            ShaderProgram::Marker => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderProgram::Terrain => "terrain",
            ShaderProgram::Marker => "marker",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
    Point,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub program: ShaderProgram,
    pub slot: UniformSlot,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Vec3(Vec3),
    Int(i32),
}

/// Dropping a `Buffer` releases its allocation.
pub trait RenderDevice {
    type Buffer;

    /// On failure nothing is allocated.
    fn create_vertex_buffer(&mut self, label: &str, vertices: &[Vertex]) -> RenderResult<Self::Buffer>;

    fn uniform_location(&self, program: ShaderProgram, name: &str) -> Option<UniformLocation>;

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    fn set_polygon_mode(&mut self, mode: PolygonMode);

    fn polygon_mode(&self) -> PolygonMode;

    fn draw(&mut self, program: ShaderProgram, buffer: &Self::Buffer, vertex_count: u32);
}
