use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::error::{RenderError, RenderResult};
use crate::renderer::device::{
    PolygonMode, RenderDevice, ShaderProgram, UniformLocation, UniformValue,
};
use crate::renderer::lighting::MAX_LIGHTS;
use crate::renderer::uniforms::UniformSlot;
use crate::terrain::Vertex;

#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub program: ShaderProgram,
    pub buffer: u64,
    pub vertex_count: u32,
    pub polygon_mode: PolygonMode,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeviceEvent {
    BufferCreated {
        id: u64,
        label: String,
        vertex_count: u32,
    },
    BufferReleased {
        id: u64,
    },
    PolygonMode(PolygonMode),
    Uniform {
        program: ShaderProgram,
        slot: UniformSlot,
        value: UniformValue,
    },
    Draw(DrawCall),
}

type EventLog = Rc<RefCell<Vec<DeviceEvent>>>;

/// Records its release when dropped.
#[derive(Debug)]
pub struct HeadlessBuffer {
    id: u64,
    vertices: Vec<Vertex>,
    log: EventLog,
}

impl HeadlessBuffer {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }
}

impl Drop for HeadlessBuffer {
    fn drop(&mut self) {
        self.log
            .borrow_mut()
            .push(DeviceEvent::BufferReleased { id: self.id });
    }
}

#[derive(Debug, Default)]
pub struct HeadlessDevice {
    log: EventLog,
    next_id: u64,
    polygon_mode: PolygonMode,
    missing: HashSet<(ShaderProgram, UniformSlot)>,
    failing_allocations: u32,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_uniform(mut self, program: ShaderProgram, name: &str) -> Self {
        if let Some(slot) = UniformSlot::parse(name) {
            self.missing.insert((program, slot));
        }
        self
    }

    /// Behaves as if the terrain shader were an unlit variant.
    pub fn without_lighting(mut self) -> Self {
        self.missing.insert((ShaderProgram::Terrain, UniformSlot::NumLights));
        for i in 0..MAX_LIGHTS as u8 {
            self.missing
                .insert((ShaderProgram::Terrain, UniformSlot::LightPosition(i)));
            self.missing
                .insert((ShaderProgram::Terrain, UniformSlot::LightColor(i)));
        }
        self
    }

    /// Makes the next buffer creation fail as an out-of-memory would.
    pub fn fail_next_allocation(&mut self) {
        self.failing_allocations += 1;
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.log.borrow().clone()
    }

    pub fn clear_events(&mut self) {
        self.log.borrow_mut().clear();
    }

    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.log
            .borrow()
            .iter()
            .filter_map(|event| match event {
                DeviceEvent::Draw(call) => Some(call.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn uniform_writes(&self) -> Vec<(ShaderProgram, UniformSlot, UniformValue)> {
        self.log
            .borrow()
            .iter()
            .filter_map(|event| match event {
                DeviceEvent::Uniform {
                    program,
                    slot,
                    value,
                } => Some((*program, *slot, *value)),
                _ => None,
            })
            .collect()
    }

    /// In creation order.
    pub fn live_buffers(&self) -> Vec<u64> {
        let log = self.log.borrow();
        let released: HashSet<u64> = log
            .iter()
            .filter_map(|event| match event {
                DeviceEvent::BufferReleased { id } => Some(*id),
                _ => None,
            })
            .collect();
        log.iter()
            .filter_map(|event| match event {
                DeviceEvent::BufferCreated { id, .. } if !released.contains(id) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl RenderDevice for HeadlessDevice {
    type Buffer = HeadlessBuffer;

    fn create_vertex_buffer(&mut self, label: &str, vertices: &[Vertex]) -> RenderResult<HeadlessBuffer> {
        if self.failing_allocations > 0 {
            self.failing_allocations -= 1;
            return Err(RenderError::allocation(label, "simulated out of memory"));
        }

        self.next_id += 1;
        let id = self.next_id;
        self.log.borrow_mut().push(DeviceEvent::BufferCreated {
            id,
            label: label.to_string(),
            vertex_count: vertices.len() as u32,
        });

        Ok(HeadlessBuffer {
            id,
            vertices: vertices.to_vec(),
            log: Rc::clone(&self.log),
        })
    }

    fn uniform_location(&self, program: ShaderProgram, name: &str) -> Option<UniformLocation> {
        let slot = UniformSlot::parse(name)?;
        let declared = UniformSlot::declared_by(program).contains(&slot);
        if !declared || self.missing.contains(&(program, slot)) {
            return None;
        }
        Some(UniformLocation { program, slot })
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.log.borrow_mut().push(DeviceEvent::Uniform {
            program: location.program,
            slot: location.slot,
            value,
        });
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.polygon_mode = mode;
        self.log.borrow_mut().push(DeviceEvent::PolygonMode(mode));
    }

    fn polygon_mode(&self) -> PolygonMode {
        self.polygon_mode
    }

    fn draw(&mut self, program: ShaderProgram, buffer: &HeadlessBuffer, vertex_count: u32) {
        self.log.borrow_mut().push(DeviceEvent::Draw(DrawCall {
            program,
            buffer: buffer.id,
            vertex_count,
            polygon_mode: self.polygon_mode,
        }));
    }
}
