use crate::config::AppConfig;
use crate::renderer::{CameraMode, Light, RenderMode};
use crate::terrain::{GenerationParams, TERRAIN_PRESETS};

pub struct UiState {
    /// Parameters edited by the sliders; applied on regenerate.
    pub params: GenerationParams,
    pub selected_preset: Option<usize>,

    pub render_mode: RenderMode,
    pub camera_mode: CameraMode,
    pub vsync_enabled: bool,
    pub show_markers: bool,
    pub show_stats: bool,

    pub lights: Vec<Light>,

    regenerate_requested: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl UiState {
    /// Starts from `config` with one regeneration pending, so the first
    /// frame builds the initial terrain.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            params: config.terrain,
            selected_preset: None,

            render_mode: config.render.render_mode(),
            camera_mode: CameraMode::Free,
            vsync_enabled: config.render.vsync,
            show_markers: true,
            show_stats: true,

            lights: config.lights.clone(),

            regenerate_requested: true,
        }
    }

    pub fn request_regenerate(&mut self) {
        self.regenerate_requested = true;
    }

    pub fn regenerate_pending(&self) -> bool {
        self.regenerate_requested
    }

    /// Consumes the pending request. Yields the parameters once per request.
    pub fn take_regenerate_request(&mut self) -> Option<GenerationParams> {
        std::mem::take(&mut self.regenerate_requested).then_some(self.params)
    }

    /// Copies a preset's parameters into the sliders and requests a rebuild.
    pub fn apply_preset(&mut self, index: usize) {
        if let Some(preset) = TERRAIN_PRESETS.get(index) {
            self.selected_preset = Some(index);
            self.params = preset.params;
            self.request_regenerate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_generates_once() {
        let mut state = UiState::default();
        assert_eq!(state.take_regenerate_request(), Some(GenerationParams::default()));
        assert_eq!(state.take_regenerate_request(), None);
    }

    #[test]
    fn slider_edits_wait_for_the_button() {
        let mut state = UiState::default();
        state.take_regenerate_request();

        state.params.amplitude = 9.0;
        assert_eq!(state.take_regenerate_request(), None);

        state.request_regenerate();
        state.request_regenerate();
        let params = state.take_regenerate_request().unwrap();
        assert_eq!(params.amplitude, 9.0);
        assert!(!state.regenerate_pending());
    }

    #[test]
    fn preset_selection_requests_its_parameters() {
        let mut state = UiState::default();
        state.take_regenerate_request();

        state.apply_preset(1);
        assert_eq!(state.selected_preset, Some(1));
        assert_eq!(state.take_regenerate_request(), Some(TERRAIN_PRESETS[1].params));

        state.apply_preset(TERRAIN_PRESETS.len());
        assert_eq!(state.selected_preset, Some(1));
        assert_eq!(state.take_regenerate_request(), None);
    }

    #[test]
    fn config_seeds_render_state() {
        let mut config = AppConfig::default();
        config.render.mode = 2;
        config.render.vsync = false;
        config.lights.truncate(1);

        let state = UiState::from_config(&config);
        assert_eq!(state.render_mode, RenderMode::Points);
        assert!(!state.vsync_enabled);
        assert_eq!(state.lights.len(), 1);
    }
}
