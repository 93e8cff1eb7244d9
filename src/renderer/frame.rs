use std::time::Instant;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::RenderResult;
use crate::renderer::buffers::MeshBuffers;
use crate::renderer::device::{PolygonMode, RenderDevice, ShaderProgram, UniformValue};
use crate::renderer::lighting::{Light, LightingUploader};
use crate::renderer::uniforms::{U_MODEL, U_MVP, U_OBJECT_COLOR, UniformBinder};
use crate::terrain::{GenerationParams, generate};

/// Base colour of the terrain surface.
pub const TERRAIN_COLOR: Vec3 = Vec3::splat(0.5);
pub const MARKER_SIZE: f32 = 0.2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderMode {
    WireFrame,
    #[default]
    Fill,
    Points,
}

impl RenderMode {
    pub const ALL: [RenderMode; 3] = [RenderMode::WireFrame, RenderMode::Fill, RenderMode::Points];

    pub fn polygon_mode(self) -> PolygonMode {
        match self {
            RenderMode::WireFrame => PolygonMode::Line,
            RenderMode::Fill => PolygonMode::Fill,
            RenderMode::Points => PolygonMode::Point,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RenderMode::WireFrame => "Wireframe",
            RenderMode::Fill => "Fill",
            RenderMode::Points => "Points",
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown render mode {0}, expected 0 (wireframe), 1 (fill) or 2 (points)")]
pub struct UnknownRenderMode(pub u32);

impl TryFrom<u32> for RenderMode {
    type Error = UnknownRenderMode;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RenderMode::WireFrame),
            1 => Ok(RenderMode::Fill),
            2 => Ok(RenderMode::Points),
            other => Err(UnknownRenderMode(other)),
        }
    }
}

impl From<RenderMode> for u32 {
    fn from(mode: RenderMode) -> u32 {
        match mode {
            RenderMode::WireFrame => 0,
            RenderMode::Fill => 1,
            RenderMode::Points => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraView {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub fov_radians: f32,
}

impl CameraView {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward, self.up)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            aspect: 16.0 / 9.0,
            near: 0.01,
            far: 2000.0,
        }
    }
}

impl Projection {
    pub fn matrix(&self, fov_radians: f32) -> Mat4 {
        Mat4::perspective_rh(fov_radians, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self, camera: &CameraView) -> Mat4 {
        self.matrix(camera.fov_radians) * camera.view_matrix()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawOutcome {
    /// No terrain has been uploaded; nothing was issued.
    NotReady,
    Drawn { vertex_count: u32, lights: usize },
}

pub struct TerrainRenderer<B> {
    buffers: MeshBuffers<B>,
    binder: UniformBinder,
    lighting: LightingUploader,
    projection: Projection,
    last_params: Option<GenerationParams>,
    height_range: Option<(f32, f32)>,
}

impl<B> TerrainRenderer<B> {
    pub fn new<D>(device: &mut D, projection: Projection) -> RenderResult<Self>
    where
        D: RenderDevice<Buffer = B>,
    {
        Ok(Self {
            buffers: MeshBuffers::new(device)?,
            binder: UniformBinder::new(),
            lighting: LightingUploader::default(),
            projection,
            last_params: None,
            height_range: None,
        })
    }

    /// Returns the drawable vertex count. On an upload error the previous
    /// terrain is kept.
    #[tracing::instrument(skip(self, device))]
    pub fn generate<D>(&mut self, device: &mut D, params: &GenerationParams) -> RenderResult<u32>
    where
        D: RenderDevice<Buffer = B>,
    {
        let started = Instant::now();
        let mesh = generate(params);
        let vertex_count = self.buffers.upload_terrain(device, &mesh)?;
        self.last_params = Some(*params);
        self.height_range = mesh.height_range();

        tracing::info!(
            vertex_count,
            triangles = mesh.triangle_count(),
            elapsed_ms = started.elapsed().as_secs_f32() * 1000.0,
            "terrain generated"
        );
        Ok(vertex_count)
    }

    pub fn is_ready(&self) -> bool {
        self.buffers.is_terrain_ready()
    }

    pub fn vertex_count(&self) -> u32 {
        self.buffers.terrain_vertex_count()
    }

    pub fn last_params(&self) -> Option<&GenerationParams> {
        self.last_params.as_ref()
    }

    pub fn height_range(&self) -> Option<(f32, f32)> {
        self.height_range
    }

    pub fn buffers(&self) -> &MeshBuffers<B> {
        &self.buffers
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Ignores degenerate aspect ratios, e.g. from a minimised window.
    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.projection.aspect = aspect;
        }
    }

    pub fn set_lighting(&mut self, lighting: LightingUploader) {
        self.lighting = lighting;
    }

    pub fn light_limit(&self) -> usize {
        self.lighting.max_lights()
    }

    /// Issues nothing before the first successful generation. Leaves the
    /// polygon mode at [`PolygonMode::Fill`].
    pub fn draw_terrain<D>(
        &mut self,
        device: &mut D,
        mode: RenderMode,
        camera: &CameraView,
        lights: &[Light],
    ) -> DrawOutcome
    where
        D: RenderDevice<Buffer = B>,
    {
        let Some(terrain) = self.buffers.terrain().filter(|t| t.vertex_count() > 0) else {
            return DrawOutcome::NotReady;
        };

        device.set_polygon_mode(mode.polygon_mode());

        let model = Mat4::IDENTITY;
        let mvp = self.projection.view_projection(camera) * model;
        let program = ShaderProgram::Terrain;
        self.binder.bind(device, program, U_MVP, UniformValue::Mat4(mvp));
        self.binder.bind(device, program, U_MODEL, UniformValue::Mat4(model));
        let upload = self.lighting.upload(device, &mut self.binder, program, lights);
        self.binder.bind(device, program, U_OBJECT_COLOR, UniformValue::Vec3(TERRAIN_COLOR));

        let vertex_count = terrain.vertex_count();
        device.draw(program, terrain.buffer(), vertex_count);

        device.set_polygon_mode(PolygonMode::Fill);

        DrawOutcome::Drawn {
            vertex_count,
            lights: upload.uploaded,
        }
    }

    /// Returns the number of markers drawn.
    pub fn draw_markers<D>(&mut self, device: &mut D, camera: &CameraView, lights: &[Light]) -> usize
    where
        D: RenderDevice<Buffer = B>,
    {
        if lights.is_empty() {
            return 0;
        }
        if device.polygon_mode() != PolygonMode::Fill {
            device.set_polygon_mode(PolygonMode::Fill);
        }

        let view_projection = self.projection.view_projection(camera);
        let program = ShaderProgram::Marker;
        let count = lights.len().min(self.lighting.max_lights());
        for light in &lights[..count] {
            let model = Mat4::from_translation(light.position) * Mat4::from_scale(Vec3::splat(MARKER_SIZE));
            self.binder
                .bind(device, program, U_MVP, UniformValue::Mat4(view_projection * model));
            self.binder.bind(device, program, U_MODEL, UniformValue::Mat4(model));
            self.binder
                .bind(device, program, U_OBJECT_COLOR, UniformValue::Vec3(light.color));
            device.draw(program, self.buffers.marker(), self.buffers.marker_vertex_count());
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::headless::{DeviceEvent, HeadlessDevice};
    use crate::renderer::lighting::default_lights;
    use crate::renderer::uniforms::UniformSlot;

    fn camera() -> CameraView {
        CameraView {
            position: Vec3::new(0.0, 10.0, 20.0),
            forward: Vec3::new(0.0, -0.5, -1.0).normalize(),
            up: Vec3::Y,
            fov_radians: 45f32.to_radians(),
        }
    }

    fn renderer(device: &mut HeadlessDevice) -> TerrainRenderer<crate::renderer::headless::HeadlessBuffer> {
        TerrainRenderer::new(device, Projection::default()).unwrap()
    }

    #[test]
    fn render_mode_selector_maps_small_integers() {
        assert_eq!(RenderMode::try_from(0), Ok(RenderMode::WireFrame));
        assert_eq!(RenderMode::try_from(1), Ok(RenderMode::Fill));
        assert_eq!(RenderMode::try_from(2), Ok(RenderMode::Points));
        assert_eq!(RenderMode::try_from(3), Err(UnknownRenderMode(3)));
        for mode in RenderMode::ALL {
            assert_eq!(RenderMode::try_from(u32::from(mode)), Ok(mode));
        }
    }

    #[test]
    fn drawing_before_generation_is_a_no_op() {
        let mut device = HeadlessDevice::new();
        let mut renderer = renderer(&mut device);
        device.clear_events();

        let outcome = renderer.draw_terrain(&mut device, RenderMode::Fill, &camera(), &default_lights());
        assert_eq!(outcome, DrawOutcome::NotReady);
        assert!(!renderer.is_ready());
        assert!(device.events().is_empty());
    }

    #[test]
    fn wireframe_is_reset_to_fill_after_the_draw() {
        let mut device = HeadlessDevice::new();
        let mut renderer = renderer(&mut device);
        renderer
            .generate(&mut device, &GenerationParams::new(8, 8, 1.0, 0.2, 1.0))
            .unwrap();
        device.clear_events();

        renderer.draw_terrain(&mut device, RenderMode::WireFrame, &camera(), &[]);

        let draws = device.draw_calls();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].polygon_mode, PolygonMode::Line);
        assert_eq!(device.polygon_mode(), PolygonMode::Fill);
        assert_eq!(
            device.events().last(),
            Some(&DeviceEvent::PolygonMode(PolygonMode::Fill))
        );
    }

    #[test]
    fn points_mode_draws_with_point_polygons() {
        let mut device = HeadlessDevice::new();
        let mut renderer = renderer(&mut device);
        renderer
            .generate(&mut device, &GenerationParams::new(3, 3, 1.0, 0.2, 1.0))
            .unwrap();

        renderer.draw_terrain(&mut device, RenderMode::Points, &camera(), &[]);
        assert_eq!(device.draw_calls()[0].polygon_mode, PolygonMode::Point);
    }

    #[test]
    fn terrain_uniforms_use_identity_model_and_camera_mvp() {
        let mut device = HeadlessDevice::new();
        let mut renderer = renderer(&mut device);
        renderer
            .generate(&mut device, &GenerationParams::new(4, 4, 1.0, 0.1, 2.0))
            .unwrap();
        device.clear_events();

        let cam = camera();
        renderer.draw_terrain(&mut device, RenderMode::Fill, &cam, &[]);

        let expected_mvp = Mat4::perspective_rh(cam.fov_radians, 16.0 / 9.0, 0.01, 2000.0)
            * Mat4::look_at_rh(cam.position, cam.position + cam.forward, cam.up);
        let writes = device.uniform_writes();
        assert!(writes.contains(&(ShaderProgram::Terrain, UniformSlot::Mvp, UniformValue::Mat4(expected_mvp))));
        assert!(writes.contains(&(ShaderProgram::Terrain, UniformSlot::Model, UniformValue::Mat4(Mat4::IDENTITY))));
        assert!(writes.contains(&(
            ShaderProgram::Terrain,
            UniformSlot::ObjectColor,
            UniformValue::Vec3(TERRAIN_COLOR)
        )));
    }

    #[test]
    fn injected_aspect_reaches_the_projection() {
        let mut device = HeadlessDevice::new();
        let mut renderer = TerrainRenderer::new(
            &mut device,
            Projection {
                aspect: 1.0,
                ..Projection::default()
            },
        )
        .unwrap();
        assert_eq!(renderer.projection().aspect, 1.0);

        renderer.set_aspect(4.0 / 3.0);
        assert_eq!(renderer.projection().aspect, 4.0 / 3.0);
        renderer.set_aspect(0.0);
        renderer.set_aspect(f32::NAN);
        assert_eq!(renderer.projection().aspect, 4.0 / 3.0);
    }

    #[test]
    fn markers_are_drawn_per_light_at_its_position() {
        let mut device = HeadlessDevice::new();
        let mut renderer = renderer(&mut device);
        device.clear_events();
        let lights = default_lights();

        let drawn = renderer.draw_markers(&mut device, &camera(), &lights);
        assert_eq!(drawn, 3);

        let draws = device.draw_calls();
        assert_eq!(draws.len(), 3);
        assert!(draws.iter().all(|d| d.program == ShaderProgram::Marker && d.vertex_count == 36));
        assert!(draws.iter().all(|d| d.polygon_mode == PolygonMode::Fill));

        let models: Vec<Mat4> = device
            .uniform_writes()
            .into_iter()
            .filter_map(|(program, slot, value)| match (program, slot, value) {
                (ShaderProgram::Marker, UniformSlot::Model, UniformValue::Mat4(m)) => Some(m),
                _ => None,
            })
            .collect();
        for (model, light) in models.iter().zip(&lights) {
            assert_eq!(model.w_axis.truncate(), light.position);
        }

        let colors: Vec<(ShaderProgram, UniformSlot, UniformValue)> = device
            .uniform_writes()
            .into_iter()
            .filter(|(_, slot, _)| *slot == UniformSlot::ObjectColor)
            .collect();
        assert_eq!(colors[1].2, UniformValue::Vec3(lights[1].color));
    }

    #[test]
    fn lowered_light_limit_truncates_upload_and_markers() {
        let mut device = HeadlessDevice::new();
        let mut renderer = renderer(&mut device);
        renderer.set_lighting(LightingUploader::with_max_lights(4));
        assert_eq!(renderer.light_limit(), 4);
        renderer
            .generate(&mut device, &GenerationParams::new(4, 4, 1.0, 0.1, 2.0))
            .unwrap();
        device.clear_events();

        let lights: Vec<Light> = (0..6)
            .map(|i| Light::new(Vec3::new(i as f32, 3.0, 0.0), Vec3::ONE))
            .collect();
        let outcome = renderer.draw_terrain(&mut device, RenderMode::Fill, &camera(), &lights);
        assert_eq!(
            outcome,
            DrawOutcome::Drawn {
                vertex_count: 54,
                lights: 4
            }
        );

        let writes = device.uniform_writes();
        assert!(writes.contains(&(ShaderProgram::Terrain, UniformSlot::NumLights, UniformValue::Int(4))));
        assert!(!writes.iter().any(|(_, slot, _)| *slot == UniformSlot::LightPosition(4)));

        assert_eq!(renderer.draw_markers(&mut device, &camera(), &lights), 4);
    }

    #[test]
    fn markers_follow_a_wireframe_terrain_in_fill_mode() {
        let mut device = HeadlessDevice::new();
        let mut renderer = renderer(&mut device);
        renderer
            .generate(&mut device, &GenerationParams::new(4, 4, 1.0, 0.1, 2.0))
            .unwrap();

        renderer.draw_terrain(&mut device, RenderMode::WireFrame, &camera(), &default_lights());
        renderer.draw_markers(&mut device, &camera(), &default_lights());

        let draws = device.draw_calls();
        assert_eq!(draws[0].polygon_mode, PolygonMode::Line);
        assert!(draws[1..].iter().all(|d| d.polygon_mode == PolygonMode::Fill));
    }

    #[test]
    fn invalid_parameters_leave_nothing_to_draw() {
        let mut device = HeadlessDevice::new();
        let mut renderer = renderer(&mut device);
        renderer
            .generate(&mut device, &GenerationParams::new(4, 4, 1.0, 0.1, 2.0))
            .unwrap();

        let count = renderer
            .generate(&mut device, &GenerationParams::new(1, 4, 1.0, 0.1, 2.0))
            .unwrap();
        assert_eq!(count, 0);
        assert!(!renderer.is_ready());
        assert_eq!(renderer.height_range(), None);

        device.clear_events();
        let outcome = renderer.draw_terrain(&mut device, RenderMode::Fill, &camera(), &[]);
        assert_eq!(outcome, DrawOutcome::NotReady);
        assert!(device.draw_calls().is_empty());
    }
}
