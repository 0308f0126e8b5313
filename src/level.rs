//! Level definitions: static layout data consumed by the round controller.
//!
//! Levels arrive as TOML (`assets/levels.toml`) or come from the built-in
//! catalog.  The raw serde types reference materials, target sizes and bird
//! kinds by name; [`RawLevel::validate`] resolves every name and range once
//! at load time so a bad file fails before any round starts.
//!
//! ## Coordinates
//!
//! Placement positions and sizes are normalized: `x` and widths are fractions
//! of the world width, `y` and heights fractions of the world height, with
//! `y = 0` at the ground line and growing upward.  Positions are body
//! centres.
//!
//! ```toml
//! [[levels]]
//! name = "Lean-To"
//! roster = ["red", "blue"]
//! star_thresholds = [6000, 12000, 18000]
//!
//! [[levels.obstacles]]
//! x = 0.7
//! y = 0.05
//! width = 0.012
//! height = 0.1
//! material = "wood"
//!
//! [[levels.targets]]
//! x = 0.75
//! y = 0.016
//! size = "small"
//! ```

use crate::bird::BirdKind;
use crate::config::{GameConfig, TargetTable};
use crate::constants::{WORLD_HEIGHT, WORLD_WIDTH};
use crate::destructible::{Material, TargetSize};
use crate::error::{SlingshotError, SlingshotResult};
use bevy::prelude::*;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LevelFile {
    pub levels: Vec<RawLevel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLevel {
    pub name: String,
    pub roster: Vec<String>,
    pub star_thresholds: [u32; 3],
    #[serde(default)]
    pub obstacles: Vec<RawObstacle>,
    #[serde(default)]
    pub targets: Vec<RawTarget>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawObstacle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub material: String,
    /// Degrees, counter-clockwise.
    #[serde(default)]
    pub angle: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTarget {
    pub x: f32,
    pub y: f32,
    pub size: String,
}

/// A validated obstacle, still in normalized units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstaclePlacement {
    pub position: Vec2,
    pub size: Vec2,
    pub material: Material,
    /// Radians.
    pub angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPlacement {
    pub position: Vec2,
    pub size: TargetSize,
}

/// A validated level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelDefinition {
    pub name: String,
    pub roster: Vec<BirdKind>,
    pub obstacles: Vec<ObstaclePlacement>,
    pub targets: Vec<TargetPlacement>,
    pub star_thresholds: [u32; 3],
}

fn world_scale(config: &GameConfig) -> Vec2 {
    Vec2::new(config.world_width, config.world_height)
}

impl ObstaclePlacement {
    pub fn world_center(&self, config: &GameConfig) -> Vec2 {
        self.position * world_scale(config)
    }

    pub fn world_size(&self, config: &GameConfig) -> Vec2 {
        self.size * world_scale(config)
    }
}

impl TargetPlacement {
    pub fn world_center(&self, config: &GameConfig) -> Vec2 {
        self.position * world_scale(config)
    }
}

fn check_unit(
    level: &str,
    placement: String,
    value: f32,
    reason: &'static str,
) -> SlingshotResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SlingshotError::InvalidPlacement {
            level: level.to_string(),
            placement,
            reason,
        })
    }
}

impl RawLevel {
    pub fn validate(&self) -> SlingshotResult<LevelDefinition> {
        let level = self.name.as_str();

        if self.roster.is_empty() {
            return Err(SlingshotError::EmptyRoster {
                level: level.to_string(),
            });
        }
        let roster = self
            .roster
            .iter()
            .map(|name| {
                BirdKind::from_name(name).ok_or_else(|| SlingshotError::UnknownBirdKind {
                    level: level.to_string(),
                    name: name.clone(),
                })
            })
            .collect::<SlingshotResult<Vec<_>>>()?;

        let [one, two, three] = self.star_thresholds;
        if !(one < two && two < three) {
            return Err(SlingshotError::ThresholdsNotAscending {
                level: level.to_string(),
                thresholds: self.star_thresholds,
            });
        }

        let mut obstacles = Vec::with_capacity(self.obstacles.len());
        for (i, raw) in self.obstacles.iter().enumerate() {
            let material =
                Material::from_name(&raw.material).ok_or_else(|| SlingshotError::UnknownMaterial {
                    level: level.to_string(),
                    name: raw.material.clone(),
                })?;
            let tag = || format!("obstacles[{i}]");
            check_unit(level, tag(), raw.x, "x outside [0, 1]")?;
            check_unit(level, tag(), raw.y, "y outside [0, 1]")?;
            if !(raw.width > 0.0 && raw.width <= 1.0 && raw.height > 0.0 && raw.height <= 1.0) {
                return Err(SlingshotError::InvalidPlacement {
                    level: level.to_string(),
                    placement: tag(),
                    reason: "size must be in (0, 1]",
                });
            }
            obstacles.push(ObstaclePlacement {
                position: Vec2::new(raw.x, raw.y),
                size: Vec2::new(raw.width, raw.height),
                material,
                angle: raw.angle.to_radians(),
            });
        }

        let mut targets = Vec::with_capacity(self.targets.len());
        for (i, raw) in self.targets.iter().enumerate() {
            let size =
                TargetSize::from_name(&raw.size).ok_or_else(|| SlingshotError::UnknownTargetSize {
                    level: level.to_string(),
                    name: raw.size.clone(),
                })?;
            check_unit(level, format!("targets[{i}]"), raw.x, "x outside [0, 1]")?;
            check_unit(level, format!("targets[{i}]"), raw.y, "y outside [0, 1]")?;
            targets.push(TargetPlacement {
                position: Vec2::new(raw.x, raw.y),
                size,
            });
        }

        Ok(LevelDefinition {
            name: self.name.clone(),
            roster,
            obstacles,
            targets,
            star_thresholds: self.star_thresholds,
        })
    }
}

/// 0 to 3 stars: one per threshold reached.
pub fn star_rating(score: u32, thresholds: [u32; 3]) -> u8 {
    thresholds.iter().filter(|t| score >= **t).count() as u8
}

/// Ordered list of playable levels.
#[derive(Resource, Debug, Clone)]
pub struct LevelCatalog {
    levels: Vec<LevelDefinition>,
}

impl Default for LevelCatalog {
    fn default() -> Self {
        Self {
            levels: built_in_levels(),
        }
    }
}

impl LevelCatalog {
    pub fn new(levels: Vec<LevelDefinition>) -> Self {
        Self { levels }
    }

    pub fn from_toml(contents: &str) -> SlingshotResult<Self> {
        let file: LevelFile = toml::from_str(contents)?;
        let levels = file
            .levels
            .iter()
            .map(RawLevel::validate)
            .collect::<SlingshotResult<Vec<_>>>()?;
        Ok(Self { levels })
    }

    pub fn get(&self, index: usize) -> SlingshotResult<&LevelDefinition> {
        self.levels.get(index).ok_or(SlingshotError::LevelNotFound {
            index,
            available: self.levels.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelDefinition> {
        self.levels.iter()
    }
}

/// Startup system: replace the built-in catalog with `assets/levels.toml`
/// when the file exists and validates.
pub fn load_level_catalog(mut catalog: ResMut<LevelCatalog>) {
    let path = "assets/levels.toml";
    match std::fs::read_to_string(path) {
        Ok(contents) => match LevelCatalog::from_toml(&contents) {
            Ok(loaded) if !loaded.is_empty() => {
                info!("Loaded {} levels from {path}", loaded.len());
                *catalog = loaded;
            }
            Ok(_) => warn!("{path} has no levels; keeping built-ins"),
            Err(e) => error!("Rejected {path}: {e}; keeping built-ins"),
        },
        Err(_) => debug!("No {path} found; using {} built-in levels", catalog.len()),
    }
}

// ── Built-in levels ───────────────────────────────────────────────────────────
//
// Authored in world units against the default world size, then normalized.

fn block(x: f32, y: f32, w: f32, h: f32, material: Material) -> ObstaclePlacement {
    ObstaclePlacement {
        position: Vec2::new(x / WORLD_WIDTH, y / WORLD_HEIGHT),
        size: Vec2::new(w / WORLD_WIDTH, h / WORLD_HEIGHT),
        material,
        angle: 0.0,
    }
}

/// A post of height `h` standing on `base`.
fn post(x: f32, base: f32, h: f32, material: Material) -> ObstaclePlacement {
    block(x, base + h / 2.0, 20.0, h, material)
}

/// A plank of width `w` lying on `base`.
fn plank(x: f32, base: f32, w: f32, material: Material) -> ObstaclePlacement {
    block(x, base + 10.0, w, 20.0, material)
}

/// A target of default radius resting on `base`.
fn target(x: f32, base: f32, size: TargetSize) -> TargetPlacement {
    let radius = TargetTable::default().get(size).radius;
    TargetPlacement {
        position: Vec2::new(x / WORLD_WIDTH, (base + radius) / WORLD_HEIGHT),
        size,
    }
}

fn built_in_levels() -> Vec<LevelDefinition> {
    use BirdKind::*;
    use Material::*;
    use TargetSize::*;

    vec![
        LevelDefinition {
            name: "First Flight".into(),
            roster: vec![Red, Blue, Yellow],
            obstacles: vec![
                post(1080.0, 0.0, 100.0, Wood),
                post(1180.0, 0.0, 100.0, Wood),
                plank(1130.0, 100.0, 140.0, Wood),
            ],
            targets: vec![target(1130.0, 0.0, Small)],
            star_thresholds: [8_000, 20_000, 32_000],
        },
        LevelDefinition {
            name: "Stone Keep".into(),
            roster: vec![Red, Black, White, Yellow],
            obstacles: vec![
                post(1000.0, 0.0, 140.0, Stone),
                post(1160.0, 0.0, 140.0, Stone),
                plank(1080.0, 140.0, 200.0, Stone),
                post(1040.0, 160.0, 80.0, Wood),
                post(1120.0, 160.0, 80.0, Wood),
                plank(1080.0, 240.0, 120.0, Wood),
                post(1300.0, 0.0, 90.0, Wood),
                plank(1300.0, 90.0, 80.0, Wood),
            ],
            targets: vec![
                target(1080.0, 0.0, Medium),
                target(1080.0, 160.0, Small),
                target(1300.0, 110.0, Small),
            ],
            star_thresholds: [18_000, 34_000, 48_000],
        },
        LevelDefinition {
            name: "Glass Tower".into(),
            roster: vec![Blue, Yellow, White, Black, Red],
            obstacles: vec![
                post(1200.0, 0.0, 120.0, Ice),
                post(1300.0, 0.0, 120.0, Ice),
                plank(1250.0, 120.0, 140.0, Ice),
                post(1215.0, 140.0, 120.0, Ice),
                post(1285.0, 140.0, 120.0, Ice),
                plank(1250.0, 260.0, 110.0, Stone),
                post(950.0, 0.0, 60.0, Stone),
                plank(950.0, 60.0, 100.0, Wood),
            ],
            targets: vec![
                target(1250.0, 0.0, Large),
                target(1250.0, 140.0, Medium),
                target(1250.0, 280.0, Small),
                target(950.0, 80.0, Small),
            ],
            star_thresholds: [25_000, 45_000, 65_000],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEAN_TO: &str = r#"
        [[levels]]
        name = "Lean-To"
        roster = ["red", "Blue"]
        star_thresholds = [6000, 12000, 18000]

        [[levels.obstacles]]
        x = 0.7
        y = 0.05
        width = 0.012
        height = 0.1
        material = "wood"
        angle = 90.0

        [[levels.targets]]
        x = 0.75
        y = 0.016
        size = "small"
    "#;

    #[test]
    fn parses_and_resolves_names() {
        let catalog = LevelCatalog::from_toml(LEAN_TO).expect("valid level file");
        let level = catalog.get(0).unwrap();
        assert_eq!(level.roster, vec![BirdKind::Red, BirdKind::Blue]);
        assert_eq!(level.obstacles[0].material, Material::Wood);
        assert!((level.obstacles[0].angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(level.targets[0].size, TargetSize::Small);
    }

    #[test]
    fn unknown_material_fails_fast() {
        let bad = LEAN_TO.replace("\"wood\"", "\"glass\"");
        let err = LevelCatalog::from_toml(&bad).unwrap_err();
        assert!(
            matches!(&err, SlingshotError::UnknownMaterial { name, .. } if name == "glass"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn unknown_target_size_fails_fast() {
        let bad = LEAN_TO.replace("\"small\"", "\"tiny\"");
        assert!(matches!(
            LevelCatalog::from_toml(&bad),
            Err(SlingshotError::UnknownTargetSize { .. })
        ));
    }

    #[test]
    fn thresholds_must_ascend() {
        let bad = LEAN_TO.replace("[6000, 12000, 18000]", "[6000, 6000, 18000]");
        assert!(matches!(
            LevelCatalog::from_toml(&bad),
            Err(SlingshotError::ThresholdsNotAscending { .. })
        ));
    }

    #[test]
    fn out_of_range_placement_is_rejected() {
        let bad = LEAN_TO.replace("x = 0.75", "x = 1.75");
        let err = LevelCatalog::from_toml(&bad).unwrap_err();
        let placement = match &err {
            SlingshotError::InvalidPlacement { placement, .. } => placement.as_str(),
            other => panic!("unexpected error: {other}"),
        };
        assert_eq!(placement, "targets[0]");
    }

    #[test]
    fn empty_roster_is_rejected() {
        let bad = LEAN_TO.replace("[\"red\", \"Blue\"]", "[]");
        assert!(matches!(
            LevelCatalog::from_toml(&bad),
            Err(SlingshotError::EmptyRoster { .. })
        ));
    }

    #[test]
    fn stars_count_reached_thresholds() {
        let t = [100, 200, 300];
        assert_eq!(star_rating(0, t), 0);
        assert_eq!(star_rating(100, t), 1);
        assert_eq!(star_rating(299, t), 2);
        assert_eq!(star_rating(1_000_000, t), 3);
    }

    #[test]
    fn built_ins_are_well_formed() {
        let catalog = LevelCatalog::default();
        assert!(!catalog.is_empty());
        for level in catalog.iter() {
            assert!(!level.roster.is_empty(), "{}", level.name);
            assert!(!level.targets.is_empty(), "{}", level.name);
            let [a, b, c] = level.star_thresholds;
            assert!(a < b && b < c, "{}", level.name);
            for o in &level.obstacles {
                assert!((0.0..=1.0).contains(&o.position.x) && (0.0..=1.0).contains(&o.position.y));
            }
        }
        assert!(matches!(
            catalog.get(catalog.len()),
            Err(SlingshotError::LevelNotFound { .. })
        ));
    }
}
