#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Overlay analytics derived from the current tick's snapshots.
//!
//! The system never feeds back into rule evaluation; it only summarises what
//! the rotation saw so adapters can print or draw it.

use std::{collections::BTreeSet, fmt};

use glam::Vec2;
use rotation_assist_core::{
    contains_ignore_case, desktop_position, CameraProjection, EntityId, EntitySnapshot,
    EntityView, Rarity, WindowState,
};
use serde::{Deserialize, Serialize};

/// Named group of ground effects reported on the overlay.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectTracker {
    /// Label shown on the overlay.
    pub name: String,
    /// Path fragments identifying the effect, matched ignoring case.
    pub path_contains: Vec<String>,
    /// Report whether the cursor sits within this many pixels of the first match.
    pub cursor_radius: Option<f32>,
}

impl EffectTracker {
    /// Creates a tracker for the provided path fragments.
    #[must_use]
    pub fn new(name: impl Into<String>, path_contains: &[&str]) -> Self {
        Self {
            name: name.into(),
            path_contains: path_contains.iter().map(|&fragment| fragment.to_owned()).collect(),
            cursor_radius: None,
        }
    }

    /// Enables the cursor proximity check.
    #[must_use]
    pub fn with_cursor_radius(mut self, radius: f32) -> Self {
        self.cursor_radius = Some(radius);
        self
    }

    fn matches(&self, entity: &EntitySnapshot) -> bool {
        if entity.path_contains_any(&self.path_contains) {
            return true;
        }
        entity.base_path().map_or(false, |path| {
            self.path_contains
                .iter()
                .any(|fragment| contains_ignore_case(path, fragment))
        })
    }
}

/// Trackers for the poison arrow effects shown by default.
#[must_use]
pub fn default_trackers() -> Vec<EffectTracker> {
    vec![
        EffectTracker::new(
            "Vine Arrow",
            &[
                "Metadata/Effects/Spells/bow_poison_bloom/PoisonBloom.ao",
                "poison_bloom",
                "VineArrowBloom",
            ],
        ),
        EffectTracker::new(
            "Gas Arrow",
            &[
                "Metadata/Effects/Spells/crossbow_toxic_grenade/toxic_cloud.ao",
                "PoisonbloomArrow/ToxicCloud",
                "toxic_grenade",
                "toxic_cloud",
            ],
        )
        .with_cursor_radius(120.0),
        EffectTracker::new(
            "Toxic growths",
            &[
                "PoisonbloomArrow/Poisonbloom",
                "bow_toxic_pustule/pustule_01.ao",
                "toxic_pustule",
                "pustule_01",
            ],
        ),
    ]
}

/// Cursor placement used by trackers with a cursor radius.
#[derive(Clone, Copy)]
pub struct CursorProbe<'a> {
    /// Camera projection, when the host has one.
    pub camera: Option<&'a dyn CameraProjection>,
    /// Host window placement.
    pub window: WindowState,
    /// Cursor position in desktop coordinates.
    pub cursor: Vec2,
}

impl fmt::Debug for CursorProbe<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorProbe")
            .field("camera", &self.camera.is_some())
            .field("window", &self.window)
            .field("cursor", &self.cursor)
            .finish()
    }
}

/// What a tracker found during the last tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectReport {
    /// Tracker label.
    pub name: String,
    /// First matching entity in host order.
    pub first: Option<EntityId>,
    /// Path of the first matching entity.
    pub first_path: Option<String>,
    /// Number of distinct matching entities.
    pub count: usize,
    /// The cursor sits within the tracker radius of the first match.
    pub cursor_inside: bool,
}

impl fmt::Display for EffectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.first_path.as_deref().unwrap_or("none");
        write!(f, "{}: {path} ({})", self.name, self.count)?;
        if self.cursor_inside {
            f.write_str(" [cursor inside]")?;
        }
        Ok(())
    }
}

/// Monster statistics shown on the overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OverlayStats {
    /// Monsters in scan range.
    pub monster_count: usize,
    /// Distance to the nearest monster in scan range; zero when there is none.
    pub nearest_distance: f32,
    /// Rarity of the current aim target.
    pub aim_target_rarity: Option<Rarity>,
}

impl fmt::Display for OverlayStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Monsters: {} | Nearest: {:.1}",
            self.monster_count, self.nearest_distance
        )?;
        match self.aim_target_rarity {
            Some(rarity) => write!(f, " | Target rarity: {rarity}"),
            None => f.write_str(" | Target rarity: n/a"),
        }
    }
}

/// Analytics system caching the latest overlay statistics and effect reports.
#[derive(Debug, Default)]
pub struct Analytics {
    stats: OverlayStats,
    reports: Vec<EffectReport>,
    seen: BTreeSet<EntityId>,
}

impl Analytics {
    /// Creates a new analytics system with empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics recorded during the last tick.
    #[must_use]
    pub const fn stats(&self) -> OverlayStats {
        self.stats
    }

    /// Effect reports recorded during the last tick, in tracker order.
    #[must_use]
    pub fn reports(&self) -> &[EffectReport] {
        &self.reports
    }

    /// Forgets everything, e.g. after an area change.
    pub fn clear(&mut self) {
        self.stats = OverlayStats::default();
        self.reports.clear();
        self.seen.clear();
    }

    /// Records monster statistics for the tick.
    pub fn record_monsters(
        &mut self,
        monsters: &[&EntitySnapshot],
        aim_target: Option<&EntitySnapshot>,
    ) {
        self.stats = OverlayStats {
            monster_count: monsters.len(),
            nearest_distance: monsters
                .iter()
                .map(|monster| monster.distance)
                .reduce(f32::min)
                .unwrap_or(0.0),
            aim_target_rarity: aim_target.and_then(|target| target.rarity),
        };
    }

    /// Scans the entity view for every tracker's effects.
    pub fn track_effects(
        &mut self,
        entities: &EntityView,
        trackers: &[EffectTracker],
        probe: &CursorProbe<'_>,
    ) {
        self.reports.clear();
        self.reports.reserve(trackers.len());

        for tracker in trackers {
            self.seen.clear();
            let mut first: Option<&EntitySnapshot> = None;

            for entity in entities.iter().filter(|entity| tracker.matches(entity)) {
                if first.is_none() {
                    first = Some(entity);
                }
                let _ = self.seen.insert(entity.id);
            }

            let cursor_inside = match (first, tracker.cursor_radius, probe.camera) {
                (Some(entity), Some(radius), Some(camera)) => {
                    desktop_position(camera, &probe.window, entity.world)
                        .map_or(false, |screen| screen.distance(probe.cursor) <= radius)
                }
                _ => false,
            };

            self.reports.push(EffectReport {
                name: tracker.name.clone(),
                first: first.map(|entity| entity.id),
                first_path: first.and_then(|entity| entity.base_path().map(str::to_owned)),
                count: self.seen.len(),
                cursor_inside,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use rotation_assist_core::{EntityFlags, EntityKind, ScreenRect};

    struct FlatCamera;

    impl CameraProjection for FlatCamera {
        fn world_to_screen(&self, world: Vec3) -> Option<Vec2> {
            Some(Vec2::new(world.x, world.y))
        }
    }

    fn entity(id: u32, kind: EntityKind, path: &str, world: Vec3) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId::new(id),
            kind,
            world,
            grid: Vec2::ZERO,
            distance: world.length(),
            flags: EntityFlags::HOSTILE,
            rarity: None,
            stats: None,
            path: Some(path.to_owned()),
            animated_base_path: None,
        }
    }

    fn probe(cursor: Vec2) -> CursorProbe<'static> {
        CursorProbe {
            camera: Some(&FlatCamera),
            window: WindowState {
                rect: ScreenRect::from_origin_and_size(
                    Vec2::new(100.0, 0.0),
                    Vec2::new(800.0, 600.0),
                ),
                focused: true,
            },
            cursor,
        }
    }

    #[test]
    fn monster_stats_track_count_nearest_and_target() {
        let mut far = entity(1, EntityKind::Monster, "Metadata/Monsters/A", Vec3::ZERO);
        far.distance = 70.0;
        let mut near = entity(2, EntityKind::Monster, "Metadata/Monsters/B", Vec3::ZERO);
        near.distance = 12.5;
        near.rarity = Some(Rarity::Rare);

        let mut analytics = Analytics::new();
        analytics.record_monsters(&[&far, &near], Some(&near));

        let stats = analytics.stats();
        assert_eq!(stats.monster_count, 2);
        assert!((stats.nearest_distance - 12.5).abs() < f32::EPSILON);
        assert_eq!(stats.aim_target_rarity, Some(Rarity::Rare));
        assert_eq!(
            stats.to_string(),
            "Monsters: 2 | Nearest: 12.5 | Target rarity: Rare"
        );

        analytics.record_monsters(&[], None);
        assert_eq!(analytics.stats(), OverlayStats::default());
    }

    #[test]
    fn trackers_report_first_match_and_distinct_count() {
        let mut animated = entity(5, EntityKind::Other, "Metadata/Effects/Generic", Vec3::ZERO);
        animated.animated_base_path =
            Some("Metadata/MiscellaneousObjects/PoisonbloomArrow/Poisonbloom".to_owned());
        let entities = EntityView::from_snapshots(vec![
            entity(
                3,
                EntityKind::Effect,
                "Metadata/Effects/Spells/bow_toxic_pustule/PUSTULE_01.ao",
                Vec3::ZERO,
            ),
            animated,
            entity(
                3,
                EntityKind::Effect,
                "Metadata/Effects/Spells/bow_toxic_pustule/pustule_01.ao",
                Vec3::ZERO,
            ),
        ]);

        let mut analytics = Analytics::new();
        analytics.track_effects(&entities, &default_trackers(), &probe(Vec2::ZERO));

        let reports = analytics.reports();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].first, None);
        assert_eq!(reports[0].to_string(), "Vine Arrow: none (0)");

        let growths = &reports[2];
        assert_eq!(growths.first, Some(EntityId::new(3)));
        assert_eq!(growths.count, 2, "duplicate ids count once");
    }

    #[test]
    fn cursor_inside_uses_window_offset() {
        let entities = EntityView::from_snapshots(vec![entity(
            9,
            EntityKind::Effect,
            "Metadata/Effects/Spells/crossbow_toxic_grenade/toxic_cloud.ao",
            Vec3::new(200.0, 100.0, 0.0),
        )]);
        let trackers = default_trackers();
        let mut analytics = Analytics::new();

        analytics.track_effects(&entities, &trackers, &probe(Vec2::new(300.0, 150.0)));
        assert!(analytics.reports()[1].cursor_inside);

        analytics.track_effects(&entities, &trackers, &probe(Vec2::new(100.0, 100.0)));
        assert!(!analytics.reports()[1].cursor_inside);

        let blind = CursorProbe {
            camera: None,
            ..probe(Vec2::new(300.0, 150.0))
        };
        analytics.track_effects(&entities, &trackers, &blind);
        assert!(!analytics.reports()[1].cursor_inside);
    }

    #[test]
    fn clear_forgets_previous_tick() {
        let monster = entity(1, EntityKind::Monster, "Metadata/Monsters/A", Vec3::ZERO);
        let mut analytics = Analytics::new();
        analytics.record_monsters(&[&monster], None);
        analytics.track_effects(
            &EntityView::default(),
            &default_trackers(),
            &probe(Vec2::ZERO),
        );

        analytics.clear();
        assert_eq!(analytics.stats().monster_count, 0);
        assert!(analytics.reports().is_empty());
    }
}
