pub mod buffers;
pub mod camera;
pub mod device;
pub mod frame;
pub mod gpu;
pub mod headless;
pub mod lighting;
pub mod uniforms;

pub use buffers::{MeshBuffers, TerrainBuffer, marker_cube};
pub use camera::{Camera, CameraMode};
pub use device::{PolygonMode, RenderDevice, ShaderProgram, UniformLocation, UniformValue};
pub use frame::{CameraView, DrawOutcome, Projection, RenderMode, TerrainRenderer};
pub use gpu::{GpuState, WgpuBuffer, WgpuDevice};
pub use headless::{DeviceEvent, DrawCall, HeadlessBuffer, HeadlessDevice};
pub use lighting::{Light, LightUpload, LightingUploader, MAX_LIGHTS, default_lights};
pub use uniforms::{UniformBinder, UniformSlot};
