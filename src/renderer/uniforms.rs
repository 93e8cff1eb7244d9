use std::borrow::Cow;
use std::collections::HashSet;

use crate::renderer::device::{RenderDevice, ShaderProgram, UniformValue};
use crate::renderer::lighting::MAX_LIGHTS;

pub const U_MVP: &str = "u_MVP";
pub const U_MODEL: &str = "u_Model";
pub const U_NUM_LIGHTS: &str = "numLights";
pub const U_OBJECT_COLOR: &str = "objectColor";
pub const U_LIGHT_POSITIONS: &str = "lightPositions";
pub const U_LIGHT_COLORS: &str = "lightColors";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformSlot {
    Mvp,
    Model,
    NumLights,
    ObjectColor,
    LightPosition(u8),
    LightColor(u8),
}

impl UniformSlot {
    /// Parses a uniform name such as `u_MVP` or `lightColors[3]`.
    ///
    /// Array indices at or past [`MAX_LIGHTS`] do not name a slot.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            U_MVP => return Some(UniformSlot::Mvp),
            U_MODEL => return Some(UniformSlot::Model),
            U_NUM_LIGHTS => return Some(UniformSlot::NumLights),
            U_OBJECT_COLOR => return Some(UniformSlot::ObjectColor),
            _ => {}
        }

        let (base, rest) = name.split_once('[')?;
        let index: usize = rest.strip_suffix(']')?.parse().ok()?;
        if index >= MAX_LIGHTS {
            return None;
        }
        let index = index as u8;
        match base {
            U_LIGHT_POSITIONS => Some(UniformSlot::LightPosition(index)),
            U_LIGHT_COLORS => Some(UniformSlot::LightColor(index)),
            _ => None,
        }
    }

    pub fn name(&self) -> Cow<'static, str> {
        match self {
            UniformSlot::Mvp => Cow::Borrowed(U_MVP),
            UniformSlot::Model => Cow::Borrowed(U_MODEL),
            UniformSlot::NumLights => Cow::Borrowed(U_NUM_LIGHTS),
            UniformSlot::ObjectColor => Cow::Borrowed(U_OBJECT_COLOR),
            UniformSlot::LightPosition(i) => Cow::Owned(light_position_name(*i as usize)),
            UniformSlot::LightColor(i) => Cow::Owned(light_color_name(*i as usize)),
        }
    }

    pub fn declared_by(program: ShaderProgram) -> Vec<UniformSlot> {
        let mut slots = vec![UniformSlot::Mvp, UniformSlot::Model, UniformSlot::ObjectColor];
        if program == ShaderProgram::Terrain {
            slots.push(UniformSlot::NumLights);
            for i in 0..MAX_LIGHTS as u8 {
                slots.push(UniformSlot::LightPosition(i));
                slots.push(UniformSlot::LightColor(i));
            }
        }
        slots
    }
}

pub fn light_position_name(index: usize) -> String {
    format!("{U_LIGHT_POSITIONS}[{index}]")
}

pub fn light_color_name(index: usize) -> String {
    format!("{U_LIGHT_COLORS}[{index}]")
}

/// Missing uniforms are skipped, reported at `warn` once per program and
/// name, then at `trace`.
#[derive(Debug, Default)]
pub struct UniformBinder {
    reported: HashSet<(ShaderProgram, String)>,
}

impl UniformBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the value was written.
    pub fn bind<D: RenderDevice>(
        &mut self,
        device: &mut D,
        program: ShaderProgram,
        name: &str,
        value: UniformValue,
    ) -> bool {
        match device.uniform_location(program, name) {
            Some(location) => {
                device.set_uniform(location, value);
                true
            }
            None => {
                self.report_missing(program, name);
                false
            }
        }
    }

    pub fn missing_count(&self) -> usize {
        self.reported.len()
    }

    fn report_missing(&mut self, program: ShaderProgram, name: &str) {
        if self.reported.insert((program, name.to_owned())) {
            tracing::warn!(program = program.name(), uniform = name, "uniform not found in shader");
        } else {
            tracing::trace!(program = program.name(), uniform = name, "uniform not found in shader");
        }
    }
}
