//! # Biome Classification
//!
//! Classifies tiles into one of nine biomes from layered noise fields, per
//! spec.md §4.1. Adapted from `oroboros_procedural::biome`'s classifier
//! shape (independent noise channels feeding a decision tree); the biome
//! set, cutoffs and octave counts are rewritten to match spec.md's 2D tile
//! world exactly rather than the teacher's 14-biome 3D-terrain classifier.

use lodestone_catalog::Catalog;

use crate::noise::{SimplexNoise, WorldSeed};

/// Radius, in tiles, around the origin within which elevation is boosted so
/// spawn is guaranteed walkable (spec.md §4.1).
const SPAWN_BOOST_RADIUS: f64 = 250.0;

/// Frequency scale applied to both the detail-noise and shape-noise
/// channels before sampling (spec.md §4.1: "detail, 1 octave, high
/// frequency").
const FINE_NOISE_FREQUENCY: f64 = 0.3;

/// One of the nine biomes spec.md §4.1 names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Biome {
    /// Deep water, not walkable.
    Ocean,
    /// Shallow inland water, not walkable.
    Lake,
    /// Narrow strip between water and dry land.
    Beach,
    /// Temperate grassland.
    Plains,
    /// Wooded temperate land.
    Forest,
    /// Hot, dry, sparse land.
    Desert,
    /// Wet lowland.
    Swamp,
    /// High elevation, rocky.
    Mountains,
    /// Cold, high-latitude/high-elevation land.
    Tundra,
}

impl Biome {
    /// The catalog tile name a bare tile in this biome takes, before
    /// resource-patch placement is considered. Used only as a fallback when
    /// the catalog's `biomes` table has no entry for this biome.
    #[must_use]
    pub const fn base_tile(self) -> &'static str {
        match self {
            Self::Ocean | Self::Lake => "water",
            Self::Beach => "sand",
            Self::Plains | Self::Forest => "grass",
            Self::Desert => "sand",
            Self::Swamp => "swamp_mud",
            Self::Mountains => "stone",
            Self::Tundra => "snow",
        }
    }

    /// The name this biome is keyed by in the catalog's `biomes` table.
    #[must_use]
    pub const fn catalog_name(self) -> &'static str {
        match self {
            Self::Ocean => "ocean",
            Self::Lake => "lake",
            Self::Beach => "beach",
            Self::Plains => "plains",
            Self::Forest => "forest",
            Self::Desert => "desert",
            Self::Swamp => "swamp",
            Self::Mountains => "mountains",
            Self::Tundra => "tundra",
        }
    }
}

/// Layered-noise sample at one `(x, y)` tile, before biome classification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClimateSample {
    /// Elevation in roughly `[-1, 1]`, boosted near spawn.
    pub elevation: f64,
    /// Moisture in roughly `[-1, 1]`.
    pub moisture: f64,
    /// Temperature in roughly `[-1, 1]`, reduced by elevation.
    pub temperature: f64,
    /// High-frequency detail noise in `[-1, 1]`, used for patch placement.
    pub detail: f64,
}

/// Tunable cutoffs for the biome decision tree (spec.md §4.1). Defaults
/// mirror the catalog's `constants` table; callers typically build this from
/// `lodestone_catalog::Catalog::constant_f64`.
#[derive(Clone, Copy, Debug)]
pub struct BiomeThresholds {
    /// Elevation at which water gives way to dry land.
    pub sea_level: f64,
    /// Elevation band above `sea_level` still rendered as beach.
    pub beach_threshold: f64,
    /// Elevation above which terrain becomes mountains/tundra.
    pub mountain_threshold: f64,
}

impl Default for BiomeThresholds {
    fn default() -> Self {
        Self {
            sea_level: 0.0,
            beach_threshold: 0.05,
            mountain_threshold: 0.6,
        }
    }
}

/// Classifies tiles into biomes from five independent noise channels.
pub struct BiomeClassifier {
    elevation_noise: SimplexNoise,
    moisture_noise: SimplexNoise,
    temperature_noise: SimplexNoise,
    detail_noise: SimplexNoise,
    shape_noise: SimplexNoise,
    thresholds: BiomeThresholds,
    secondary_tile_seed: WorldSeed,
}

impl BiomeClassifier {
    /// Creates a classifier whose noise channels are derived from `seed`
    /// via `WorldSeed::derive`, each channel getting an independent
    /// permutation table.
    #[must_use]
    pub fn new(seed: WorldSeed, thresholds: BiomeThresholds) -> Self {
        Self {
            elevation_noise: SimplexNoise::new(seed.derive(1)),
            moisture_noise: SimplexNoise::new(seed.derive(2)),
            temperature_noise: SimplexNoise::new(seed.derive(3)),
            detail_noise: SimplexNoise::new(seed.derive(4)),
            shape_noise: SimplexNoise::new(seed.derive(5)),
            thresholds,
            secondary_tile_seed: seed.derive(6),
        }
    }

    /// Samples the climate fields at world tile `(x, y)`.
    ///
    /// Elevation mixes 6 octaves of terrain noise with a quadratic boost
    /// inside `SPAWN_BOOST_RADIUS` of the origin so spawn is walkable.
    /// Moisture uses 4 octaves, temperature 3, detail a single high-frequency
    /// octave — the octave counts spec.md §4.1 specifies.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> ClimateSample {
        let mut elevation = self.elevation_noise.octaved(x * 0.01, y * 0.01, 6, 0.5, 2.0);

        let dist_from_origin = x.hypot(y);
        if dist_from_origin < SPAWN_BOOST_RADIUS {
            let falloff = 1.0 - dist_from_origin / SPAWN_BOOST_RADIUS;
            elevation += falloff * falloff * 0.5;
        }

        let moisture = self.moisture_noise.octaved(x * 0.015, y * 0.015, 4, 0.5, 2.0);
        let temperature = self
            .temperature_noise
            .octaved(x * 0.008, y * 0.008, 3, 0.5, 2.0)
            - elevation.max(0.0) * 0.4;
        let detail = self.detail_noise.sample(x * FINE_NOISE_FREQUENCY, y * FINE_NOISE_FREQUENCY);

        ClimateSample {
            elevation,
            moisture,
            temperature: temperature.clamp(-1.0, 1.0),
            detail,
        }
    }

    /// Classifies a climate sample into a biome, per spec.md §4.1's decision
    /// tree: elevation selects water/beach/mountains first, then
    /// temperature/moisture pick among the remaining land biomes.
    #[must_use]
    pub fn classify(&self, sample: ClimateSample) -> Biome {
        let t = &self.thresholds;

        if sample.elevation < t.sea_level - 0.15 {
            return Biome::Ocean;
        }
        if sample.elevation < t.sea_level {
            return Biome::Lake;
        }
        if sample.elevation < t.sea_level + t.beach_threshold {
            return Biome::Beach;
        }
        if sample.elevation > t.mountain_threshold {
            return if sample.temperature < -0.2 {
                Biome::Tundra
            } else {
                Biome::Mountains
            };
        }

        if sample.temperature > 0.3 && sample.moisture < -0.1 {
            return Biome::Desert;
        }
        if sample.moisture > 0.4 {
            return Biome::Swamp;
        }
        if sample.moisture > 0.1 {
            return Biome::Forest;
        }
        Biome::Plains
    }

    /// Convenience: samples and classifies in one call.
    #[must_use]
    pub fn classify_at(&self, x: f64, y: f64) -> Biome {
        self.classify(self.sample(x, y))
    }

    /// Samples the same detail-noise channel [`Self::sample`] folds into
    /// [`ClimateSample::detail`], for resource-patch placement probability
    /// (`lodestone_world::resource`, spec.md §4.1's `0.85 + 0.15 x
    /// detail_noise` term).
    #[must_use]
    pub fn detail_at(&self, x: f64, y: f64) -> f64 {
        self.detail_noise.sample(x * FINE_NOISE_FREQUENCY, y * FINE_NOISE_FREQUENCY)
    }

    /// Samples a noise channel independent of `detail_at`, used only to
    /// perturb a resource patch's effective radius (spec.md §4.1's
    /// `patch.radius x (1 + shape_noise(x,y) x noise_strength)` term).
    #[must_use]
    pub fn shape_noise_at(&self, x: f64, y: f64) -> f64 {
        self.shape_noise.sample(x * FINE_NOISE_FREQUENCY, y * FINE_NOISE_FREQUENCY)
    }

    /// Resolves the terrain tile name for `biome` at world tile `(x, y)`,
    /// before any resource patch is considered: the catalog's declared base
    /// tile, or its secondary tile if one is declared and a per-tile hash
    /// roll lands inside `secondary_probability`. Falls back to
    /// [`Biome::base_tile`] if the catalog has no entry for this biome.
    #[must_use]
    pub fn terrain_tile_name<'a>(&self, biome: Biome, catalog: &'a Catalog, x: i64, y: i64) -> &'a str {
        let Some(def) = catalog.biome_def(biome.catalog_name()) else {
            return biome.base_tile();
        };
        if let Some(secondary) = &def.secondary_tile {
            if def.secondary_probability > 0.0 {
                let roll = hash_unit_interval(self.secondary_tile_seed.value(), x, y);
                if roll < def.secondary_probability {
                    return secondary;
                }
            }
        }
        &def.base_tile
    }
}

/// Hash-seeded roll in `[0, 1)` for one `(seed, x, y)` triple, used wherever
/// generation needs a per-tile Bernoulli draw without a stateful RNG
/// (determinism requires the result to depend only on its inputs).
pub(crate) fn hash_unit_interval(seed: u64, x: i64, y: i64) -> f64 {
    let mut h = seed;
    h ^= (x as u64).wrapping_mul(0x2545_F491_4F6C_DD1D);
    h ^= (y as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    (h >> 11) as f64 / (1u64 << 53) as f64
}
