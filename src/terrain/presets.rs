use crate::terrain::mesh::GenerationParams;

pub struct TerrainPreset {
    pub name: &'static str,
    pub description: &'static str,
    pub params: GenerationParams,
}

pub const TERRAIN_PRESETS: &[TerrainPreset] = &[
    TerrainPreset {
        name: "Gentle Hills",
        description: "Long, low swells",
        params: GenerationParams::new(128, 128, 1.0, 0.1, 4.0),
    },
    TerrainPreset {
        name: "Ridges",
        description: "Tight, tall ridgelines",
        params: GenerationParams::new(160, 160, 0.5, 0.45, 6.0),
    },
    TerrainPreset {
        name: "Dunes",
        description: "Wide and shallow",
        params: GenerationParams::new(200, 120, 1.5, 0.06, 2.5),
    },
    TerrainPreset {
        name: "Egg Crate",
        description: "Dense bumps, good for wireframe",
        params: GenerationParams::new(64, 64, 1.0, 0.8, 1.5),
    },
    TerrainPreset {
        name: "Flat Plain",
        description: "Zero amplitude",
        params: GenerationParams::new(32, 32, 2.0, 0.1, 0.0),
    },
];
