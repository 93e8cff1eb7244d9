use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::renderer::device::{RenderDevice, ShaderProgram, UniformValue};
use crate::renderer::uniforms::{U_NUM_LIGHTS, UniformBinder, light_color_name, light_position_name};

pub const MAX_LIGHTS: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec3,
    pub color: Vec3,
}

impl Light {
    pub const fn new(position: Vec3, color: Vec3) -> Self {
        Self { position, color }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 10.0, 0.0), Vec3::ONE)
    }
}

/// Red, green and blue lights hovering over the middle of the terrain.
pub fn default_lights() -> Vec<Light> {
    vec![
        Light::new(Vec3::new(2.0, 4.0, 2.0), Vec3::new(1.0, 0.0, 0.0)),
        Light::new(Vec3::new(-2.0, 3.0, -1.0), Vec3::new(0.0, 1.0, 0.0)),
        Light::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
    ]
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightUpload {
    pub uploaded: usize,
    pub dropped: usize,
}

/// Light `i` lands in slot `i`. Lights past `max_lights` are dropped.
#[derive(Clone, Copy, Debug)]
pub struct LightingUploader {
    max_lights: usize,
}

impl Default for LightingUploader {
    fn default() -> Self {
        Self {
            max_lights: MAX_LIGHTS,
        }
    }
}

impl LightingUploader {
    /// Clamped to [`MAX_LIGHTS`].
    pub fn with_max_lights(max_lights: usize) -> Self {
        Self {
            max_lights: max_lights.min(MAX_LIGHTS),
        }
    }

    pub fn max_lights(&self) -> usize {
        self.max_lights
    }

    pub fn upload<D: RenderDevice>(
        &self,
        device: &mut D,
        binder: &mut UniformBinder,
        program: ShaderProgram,
        lights: &[Light],
    ) -> LightUpload {
        let count = lights.len().min(self.max_lights);
        let dropped = lights.len() - count;
        if dropped > 0 {
            tracing::trace!(dropped, limit = self.max_lights, "lights past the limit ignored");
        }

        binder.bind(device, program, U_NUM_LIGHTS, UniformValue::Int(count as i32));
        for (i, light) in lights.iter().take(count).enumerate() {
            binder.bind(
                device,
                program,
                &light_position_name(i),
                UniformValue::Vec3(light.position),
            );
            binder.bind(
                device,
                program,
                &light_color_name(i),
                UniformValue::Vec3(light.color),
            );
        }

        LightUpload {
            uploaded: count,
            dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::headless::HeadlessDevice;
    use crate::renderer::uniforms::UniformSlot;

    fn numbered_lights(n: usize) -> Vec<Light> {
        (0..n)
            .map(|i| Light::new(Vec3::new(i as f32, 1.0, 0.0), Vec3::splat(i as f32 / n as f32)))
            .collect()
    }

    #[test]
    fn twenty_lights_truncate_to_sixteen_in_order() {
        let mut device = HeadlessDevice::new();
        let mut binder = UniformBinder::new();
        let lights = numbered_lights(20);

        let result = LightingUploader::default().upload(&mut device, &mut binder, ShaderProgram::Terrain, &lights);
        assert_eq!(result, LightUpload { uploaded: 16, dropped: 4 });

        let writes = device.uniform_writes();
        assert_eq!(
            writes[0],
            (ShaderProgram::Terrain, UniformSlot::NumLights, UniformValue::Int(16))
        );

        let positions: Vec<(u8, Vec3)> = writes
            .iter()
            .filter_map(|(_, slot, value)| match (slot, value) {
                (UniformSlot::LightPosition(i), UniformValue::Vec3(v)) => Some((*i, *v)),
                _ => None,
            })
            .collect();
        assert_eq!(positions.len(), 16);
        for (i, (slot, position)) in positions.iter().enumerate() {
            assert_eq!(*slot as usize, i);
            assert_eq!(*position, lights[i].position);
        }

        let colors = writes
            .iter()
            .filter(|(_, slot, _)| matches!(slot, UniformSlot::LightColor(_)))
            .count();
        assert_eq!(colors, 16);

        assert!(positions.iter().all(|(_, p)| p.x < 16.0));
    }

    #[test]
    fn no_lights_writes_only_the_count() {
        let mut device = HeadlessDevice::new();
        let mut binder = UniformBinder::new();

        let result = LightingUploader::default().upload(&mut device, &mut binder, ShaderProgram::Terrain, &[]);
        assert_eq!(result.uploaded, 0);
        assert_eq!(
            device.uniform_writes(),
            vec![(ShaderProgram::Terrain, UniformSlot::NumLights, UniformValue::Int(0))]
        );
    }

    #[test]
    fn custom_limit_is_clamped_to_shader_arrays() {
        assert_eq!(LightingUploader::with_max_lights(4).max_lights(), 4);
        assert_eq!(LightingUploader::with_max_lights(64).max_lights(), MAX_LIGHTS);

        let mut device = HeadlessDevice::new();
        let mut binder = UniformBinder::new();
        let result = LightingUploader::with_max_lights(4).upload(
            &mut device,
            &mut binder,
            ShaderProgram::Terrain,
            &numbered_lights(6),
        );
        assert_eq!(result, LightUpload { uploaded: 4, dropped: 2 });
    }

    #[test]
    fn unlit_program_degrades_without_failing() {
        let mut device = HeadlessDevice::new().without_lighting();
        let mut binder = UniformBinder::new();

        let result = LightingUploader::default().upload(
            &mut device,
            &mut binder,
            ShaderProgram::Terrain,
            &default_lights(),
        );
        assert_eq!(result.uploaded, 3);
        assert!(device.uniform_writes().is_empty());
        assert_eq!(binder.missing_count(), 1 + 3 * 2);
    }
}
