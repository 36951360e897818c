//! # Resource Patch Placement
//!
//! Places ore patches (iron, copper, coal) across the world (spec.md §4.1).
//! The world is split into `REGION_SIZE`-tile square regions; each region
//! gets its own `ChaCha8Rng` stream, seeded independently via
//! `WorldSeed::derive`. For each resource kind the catalog's per-kind
//! `frequency` sets the expected patch count over one region
//! (`frequency * region_area`), with the fractional remainder resolved as a
//! single Bernoulli draw. A tile under more than one patch's effective
//! radius resolves to whichever patch it has the highest normalized
//! proximity to; within the winning patch, placement is a per-tile
//! Bernoulli draw weighted by richness, distance decay, and detail noise.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use lodestone_catalog::Catalog;

use crate::biome::hash_unit_interval;
use crate::noise::WorldSeed;

/// Region width/height, in tiles, used to seed patch placement
/// independently across the world (spec.md §4.1).
pub const REGION_SIZE: i64 = 128;

/// How much a patch's effective radius can grow or shrink from
/// `shape_noise(x, y)` (spec.md §4.1's `noise_strength`).
const NOISE_STRENGTH: f64 = 0.25;

/// Fallback radius/richness range used only for a resource kind the
/// catalog's `resource_patches` table has no entry for.
const DEFAULT_MIN_RADIUS: f64 = 4.0;
const DEFAULT_MAX_RADIUS: f64 = 12.0;
const DEFAULT_MIN_RICHNESS: f64 = 0.35;
const DEFAULT_MAX_RICHNESS: f64 = 1.0;
/// Fallback frequency: about one patch per region, matching the
/// pre-catalog-driven default this crate shipped with.
const DEFAULT_FREQUENCY: f64 = 1.0 / ((REGION_SIZE * REGION_SIZE) as f64);

/// Resource kinds a patch can produce, matched against catalog tile names
/// via [`ResourceKind::ore_tile_name`] and against the catalog's
/// `resource_patches`/`biomes` tables via [`ResourceKind::catalog_key`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// Iron ore patches.
    Iron,
    /// Copper ore patches.
    Copper,
    /// Coal patches.
    Coal,
}

impl ResourceKind {
    const ALL: [Self; 3] = [Self::Iron, Self::Copper, Self::Coal];

    /// Catalog tile name this resource places, e.g. `"iron_ore"`.
    #[must_use]
    pub const fn ore_tile_name(self) -> &'static str {
        match self {
            Self::Iron => "iron_ore",
            Self::Copper => "copper_ore",
            Self::Coal => "coal_ore",
        }
    }

    /// Name this kind is keyed by in the catalog's `resource_patches` and
    /// `biomes.*.candidate_resources` tables, e.g. `"iron"`.
    #[must_use]
    pub const fn catalog_key(self) -> &'static str {
        match self {
            Self::Iron => "iron",
            Self::Copper => "copper",
            Self::Coal => "coal",
        }
    }
}

/// One circular resource deposit.
#[derive(Clone, Copy, Debug)]
pub struct ResourcePatch {
    /// World tile X of the patch center.
    pub center_x: i64,
    /// World tile Y of the patch center.
    pub center_y: i64,
    /// Patch radius, in tiles, before shape-noise perturbation.
    pub radius: f64,
    /// Resource kind this patch deposits.
    pub kind: ResourceKind,
    /// Density in `[0, 1]`: higher richness means more tiles within the
    /// patch actually carry ore rather than bare terrain.
    pub richness: f64,
    /// Per-patch seed mixed into the per-tile Bernoulli draw, so two
    /// patches of the same kind/radius still place ore differently.
    pub shape_seed: u64,
}

impl ResourcePatch {
    fn distance_to(&self, x: i64, y: i64) -> f64 {
        let dx = (x - self.center_x) as f64;
        let dy = (y - self.center_y) as f64;
        dx.hypot(dy)
    }

    /// This patch's radius at `(x, y)` after the shape-noise perturbation
    /// spec.md §4.1 describes: `radius x (1 + shape_noise(x,y) x
    /// noise_strength)`.
    fn effective_radius(&self, shape_noise: f64) -> f64 {
        self.radius * (1.0 + shape_noise * NOISE_STRENGTH)
    }
}

/// Builds a per-region `ChaCha8Rng`, seeded from the derived region seed, so
/// patch placement is reproducible independent of generation order.
fn region_rng(region_seed: WorldSeed) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(region_seed.value())
}

/// Region coordinate, analogous to [`crate::chunk::ChunkCoord`] but at
/// `REGION_SIZE` granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegionCoord {
    /// X coordinate, in regions.
    pub rx: i32,
    /// Y coordinate, in regions.
    pub ry: i32,
}

impl RegionCoord {
    /// Resolves the region containing world tile `(x, y)`.
    #[must_use]
    pub const fn from_tile_pos(x: i64, y: i64) -> Self {
        Self {
            rx: x.div_euclid(REGION_SIZE) as i32,
            ry: y.div_euclid(REGION_SIZE) as i32,
        }
    }
}

/// A resource kind's radius/richness range, read from the catalog's
/// `resource_patches` table or, for a kind the catalog doesn't list,
/// this module's fallback defaults.
struct PatchRange {
    frequency: f64,
    min_radius: f64,
    max_radius: f64,
    min_richness: f64,
    max_richness: f64,
}

impl PatchRange {
    fn for_kind(catalog: &Catalog, kind: ResourceKind) -> Self {
        catalog.resource_patch_def(kind.catalog_key()).map_or(
            Self {
                frequency: DEFAULT_FREQUENCY,
                min_radius: DEFAULT_MIN_RADIUS,
                max_radius: DEFAULT_MAX_RADIUS,
                min_richness: DEFAULT_MIN_RICHNESS,
                max_richness: DEFAULT_MAX_RICHNESS,
            },
            |def| Self {
                frequency: def.frequency,
                min_radius: def.min_radius,
                max_radius: def.max_radius,
                min_richness: def.min_richness,
                max_richness: def.max_richness,
            },
        )
    }
}

/// Generates the list of patches placed within one region.
///
/// Deterministic: the same `seed`, `region` and `catalog` always produce the
/// same patch list, independent of generation order or any other region.
#[must_use]
pub fn region_patches(seed: WorldSeed, region: RegionCoord, catalog: &Catalog) -> Vec<ResourcePatch> {
    let region_hash = (region.rx as i64 as u64)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (region.ry as i64 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    let region_seed = seed.derive(region_hash);
    let mut rng = region_rng(region_seed);

    let origin_x = i64::from(region.rx) * REGION_SIZE;
    let origin_y = i64::from(region.ry) * REGION_SIZE;
    let region_area = (REGION_SIZE * REGION_SIZE) as f64;

    let mut patches = Vec::new();
    for kind in ResourceKind::ALL {
        let range = PatchRange::for_kind(catalog, kind);
        let expected = range.frequency * region_area;
        let mut count = expected.floor();
        let fraction = expected - count;
        if fraction > 0.0 && rng.gen::<f64>() < fraction {
            count += 1.0;
        }

        for _ in 0..count as u32 {
            let center_x = origin_x + rng.gen_range(0.0..REGION_SIZE as f64) as i64;
            let center_y = origin_y + rng.gen_range(0.0..REGION_SIZE as f64) as i64;
            let radius = rng.gen_range(range.min_radius..range.max_radius);
            let richness = rng.gen_range(range.min_richness..range.max_richness);
            let shape_seed = rng.gen::<u64>();
            patches.push(ResourcePatch {
                center_x,
                center_y,
                radius,
                kind,
                richness,
                shape_seed,
            });
        }
    }
    patches
}

/// Hash-seeded per-tile Bernoulli draw: `true` if this tile, under this
/// patch, should actually carry ore rather than bare terrain, at the given
/// placement `probability`.
fn tile_is_ore(patch: &ResourcePatch, x: i64, y: i64, probability: f64) -> bool {
    hash_unit_interval(patch.shape_seed, x, y) < probability
}

/// Resolves the resource (if any) placed at world tile `(x, y)`, given the
/// patches of the 3x3 regions surrounding it (a patch's radius can cross a
/// region boundary, so callers must pass patches from neighboring regions
/// too, not just the tile's own region), the shape-noise and detail-noise
/// samples at `(x, y)` (`BiomeClassifier::shape_noise_at`/`detail_at`), and
/// a predicate selecting which resource kinds this tile's biome allows
/// (`lodestone_catalog::BiomeDef::candidate_resources`).
///
/// Among patches whose effective radius covers `(x, y)`, the winner is the
/// one with the highest normalized proximity `1 - distance/effective_radius`
/// (spec.md §4.1). Placement inside the winner is then a Bernoulli draw at
/// `richness x (1 - 0.7 x normalized_distance) x (0.85 + 0.15 x
/// detail_noise)`.
#[must_use]
pub fn resource_at_tile(
    patches: &[ResourcePatch],
    x: i64,
    y: i64,
    shape_noise: f64,
    detail_noise: f64,
    is_candidate: impl Fn(ResourceKind) -> bool,
) -> Option<ResourceKind> {
    let (winner, normalized_distance) = patches
        .iter()
        .filter(|p| is_candidate(p.kind))
        .filter_map(|p| {
            let effective_radius = p.effective_radius(shape_noise);
            let distance = p.distance_to(x, y);
            (distance <= effective_radius).then_some((p, distance / effective_radius.max(0.001)))
        })
        .max_by(|(_, a), (_, b)| (1.0 - a).partial_cmp(&(1.0 - b)).expect("distances are always finite"))?;

    let probability = winner.richness * (1.0 - 0.7 * normalized_distance) * (0.85 + 0.15 * detail_noise);
    if tile_is_ore(winner, x, y, probability) {
        Some(winner.kind)
    } else {
        None
    }
}

/// Gathers patches from `region` and its 8 neighbors, which together cover
/// every patch whose radius can possibly reach into `region`.
#[must_use]
pub fn patches_near_region(seed: WorldSeed, region: RegionCoord, catalog: &Catalog) -> Vec<ResourcePatch> {
    let mut patches = Vec::new();
    for dy in -1..=1 {
        for dx in -1..=1 {
            let neighbor = RegionCoord {
                rx: region.rx + dx,
                ry: region.ry + dy,
            };
            patches.extend(region_patches(seed, neighbor, catalog));
        }
    }
    patches
}
