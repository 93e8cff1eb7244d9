use glam::Vec3;

use crate::error::{RenderError, RenderResult};
use crate::renderer::device::RenderDevice;
use crate::terrain::{TerrainMesh, Vertex};

const TERRAIN_LABEL: &str = "Terrain Vertex Buffer";
const MARKER_LABEL: &str = "Light Marker Vertex Buffer";

#[derive(Debug)]
pub struct TerrainBuffer<B> {
    buffer: B,
    vertex_count: u32,
    revision: u64,
}

impl<B> TerrainBuffer<B> {
    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Increments with every successful upload.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Owns the terrain vertex buffer and the light-marker cube. The terrain
/// slot only ever holds a fully uploaded buffer.
#[derive(Debug)]
pub struct MeshBuffers<B> {
    terrain: Option<TerrainBuffer<B>>,
    marker: B,
    marker_vertex_count: u32,
    uploads: u64,
}

impl<B> MeshBuffers<B> {
    pub fn new<D>(device: &mut D) -> RenderResult<Self>
    where
        D: RenderDevice<Buffer = B>,
    {
        let cube = marker_cube();
        let marker = device.create_vertex_buffer(MARKER_LABEL, &cube)?;
        tracing::debug!(vertices = cube.len(), "light marker geometry uploaded");

        Ok(Self {
            terrain: None,
            marker,
            marker_vertex_count: cube.len() as u32,
            uploads: 0,
        })
    }

    /// An empty mesh releases the current terrain. On error the previous
    /// terrain stays in place.
    pub fn upload_terrain<D>(&mut self, device: &mut D, mesh: &TerrainMesh) -> RenderResult<u32>
    where
        D: RenderDevice<Buffer = B>,
    {
        if mesh.is_empty() {
            if self.release_terrain() {
                tracing::debug!("empty terrain mesh, previous terrain released");
            }
            return Ok(0);
        }

        let vertex_count = u32::try_from(mesh.vertex_count()).map_err(|_| RenderError::BufferTooLarge {
            label: TERRAIN_LABEL.to_string(),
            size: mesh.as_bytes().len() as u64,
            limit: u32::MAX as u64 * std::mem::size_of::<Vertex>() as u64,
        })?;

        let buffer = device.create_vertex_buffer(TERRAIN_LABEL, mesh.vertices())?;
        self.uploads += 1;
        let previous = self.terrain.replace(TerrainBuffer {
            buffer,
            vertex_count,
            revision: self.uploads,
        });
        drop(previous);

        tracing::debug!(vertex_count, revision = self.uploads, "terrain buffer replaced");
        Ok(vertex_count)
    }

    pub fn release_terrain(&mut self) -> bool {
        self.terrain.take().is_some()
    }

    pub fn terrain(&self) -> Option<&TerrainBuffer<B>> {
        self.terrain.as_ref()
    }

    pub fn is_terrain_ready(&self) -> bool {
        self.terrain.as_ref().is_some_and(|t| t.vertex_count > 0)
    }

    pub fn terrain_vertex_count(&self) -> u32 {
        self.terrain.as_ref().map_or(0, |t| t.vertex_count)
    }

    pub fn marker(&self) -> &B {
        &self.marker
    }

    pub fn marker_vertex_count(&self) -> u32 {
        self.marker_vertex_count
    }
}

/// Unit cube centred on the origin, 12 outward-facing triangles.
pub fn marker_cube() -> Vec<Vertex> {
    // (normal, u, v) with u x v == normal.
    const FACES: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];

    let mut vertices = Vec::with_capacity(36);
    for (normal, u, v) in FACES {
        let corner = |su: f32, sv: f32| (normal + u * su + v * sv) * 0.5;
        let (a, b, c, d) = (
            corner(-1.0, -1.0),
            corner(1.0, -1.0),
            corner(1.0, 1.0),
            corner(-1.0, 1.0),
        );
        for p in [a, b, c, a, c, d] {
            vertices.push(Vertex::new(p, normal));
        }
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::headless::{DeviceEvent, HeadlessDevice};
    use crate::terrain::{GenerationParams, generate};

    fn mesh(width: u32) -> TerrainMesh {
        generate(&GenerationParams::new(width, 4, 1.0, 0.1, 2.0))
    }

    #[test]
    fn marker_is_uploaded_once_at_construction() {
        let mut device = HeadlessDevice::new();
        let buffers = MeshBuffers::new(&mut device).unwrap();

        assert_eq!(buffers.marker_vertex_count(), 36);
        assert!(!buffers.is_terrain_ready());
        assert_eq!(device.live_buffers(), vec![buffers.marker().id()]);
    }

    #[test]
    fn upload_makes_terrain_ready() {
        let mut device = HeadlessDevice::new();
        let mut buffers = MeshBuffers::new(&mut device).unwrap();

        let count = buffers.upload_terrain(&mut device, &mesh(4)).unwrap();
        assert_eq!(count, 54);
        assert!(buffers.is_terrain_ready());
        assert_eq!(buffers.terrain().unwrap().revision(), 1);
    }

    #[test]
    fn reupload_releases_the_previous_buffer() {
        let mut device = HeadlessDevice::new();
        let mut buffers = MeshBuffers::new(&mut device).unwrap();

        buffers.upload_terrain(&mut device, &mesh(4)).unwrap();
        let first = buffers.terrain().unwrap().buffer().id();
        buffers.upload_terrain(&mut device, &mesh(6)).unwrap();
        let second = buffers.terrain().unwrap().buffer().id();

        assert_ne!(first, second);
        assert!(device.events().contains(&DeviceEvent::BufferReleased { id: first }));
        assert_eq!(device.live_buffers(), vec![buffers.marker().id(), second]);
        assert_eq!(buffers.terrain_vertex_count(), 5 * 3 * 6);
    }

    #[test]
    fn failed_upload_keeps_previous_terrain() {
        let mut device = HeadlessDevice::new();
        let mut buffers = MeshBuffers::new(&mut device).unwrap();
        buffers.upload_terrain(&mut device, &mesh(4)).unwrap();
        let before = buffers.terrain().unwrap().buffer().id();

        device.fail_next_allocation();
        let result = buffers.upload_terrain(&mut device, &mesh(8));

        assert!(matches!(result, Err(RenderError::Allocation { .. })));
        assert!(buffers.is_terrain_ready());
        assert_eq!(buffers.terrain().unwrap().buffer().id(), before);
        assert_eq!(buffers.terrain_vertex_count(), 54);
        assert_eq!(buffers.terrain().unwrap().revision(), 1);
    }

    #[test]
    fn failed_first_upload_stays_not_ready() {
        let mut device = HeadlessDevice::new();
        let mut buffers = MeshBuffers::new(&mut device).unwrap();

        device.fail_next_allocation();
        assert!(buffers.upload_terrain(&mut device, &mesh(4)).is_err());
        assert!(!buffers.is_terrain_ready());
    }

    #[test]
    fn empty_mesh_clears_terrain() {
        let mut device = HeadlessDevice::new();
        let mut buffers = MeshBuffers::new(&mut device).unwrap();
        buffers.upload_terrain(&mut device, &mesh(4)).unwrap();

        assert_eq!(buffers.upload_terrain(&mut device, &TerrainMesh::empty()).unwrap(), 0);
        assert!(!buffers.is_terrain_ready());
        assert_eq!(device.live_buffers(), vec![buffers.marker().id()]);
    }

    #[test]
    fn dropping_the_manager_releases_everything() {
        let mut device = HeadlessDevice::new();
        let mut buffers = MeshBuffers::new(&mut device).unwrap();
        buffers.upload_terrain(&mut device, &mesh(4)).unwrap();

        drop(buffers);
        assert!(device.live_buffers().is_empty());
    }

    #[test]
    fn marker_cube_faces_point_outward() {
        let cube = marker_cube();
        assert_eq!(cube.len(), 36);
        for tri in cube.chunks_exact(3) {
            let (a, b, c) = (tri[0].position(), tri[1].position(), tri[2].position());
            let winding = (b - a).cross(c - a).normalize();
            let centroid = (a + b + c) / 3.0;
            assert!((winding - tri[0].normal()).length() < 1e-6);
            assert!(centroid.dot(tri[0].normal()) > 0.0);
            for v in tri {
                assert!(v.position().abs().max_element() <= 0.5 + 1e-6);
            }
        }
    }
}
