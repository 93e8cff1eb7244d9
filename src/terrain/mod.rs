pub mod generator;
pub mod mesh;
pub mod presets;

pub use generator::{face_normal, generate, height_at};
pub use mesh::{GenerationParams, TerrainMesh, Vertex};
pub use presets::{TERRAIN_PRESETS, TerrainPreset};
