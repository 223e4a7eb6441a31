use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use glam::{Vec2, Vec3};
use rotation_assist_core::{
    ActorSkill, BoundAction, CameraProjection, Command, DeployedObject, EntityFlags, EntityId,
    EntityKind, EntitySnapshot, EntityView, KeyBinding, PlayerSnapshot, Rarity, RarityFilter,
    ScreenRect, SkillCondition, SkillRule, VirtualKey, Vitals, WindowState,
};
use rotation_assist_pilot::{
    HostState, InputState, Pilot, PilotConfig, TickInput, TickOutcome, TickStatus,
};
use rotation_assist_system_line_of_sight::{GridDimensions, TerrainSource};

const GROWTH_KEY: u16 = 0x45;
const ARROW_KEY: u16 = 0x51;

#[test]
fn deterministic_replay_of_scripted_session() {
    let first = replay();
    let second = replay();

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(fingerprint(&first), fingerprint(&second));

    let fired: Vec<_> = first
        .iter()
        .map(|outcome| outcome.fired.as_ref().map(|fired| fired.action))
        .collect();
    let growth = Some(BoundAction::Key(VirtualKey::new(GROWTH_KEY)));
    let arrow = Some(BoundAction::Key(VirtualKey::new(ARROW_KEY)));

    assert_eq!(fired[0], None, "global cooldown has not elapsed on the first tick");
    assert_eq!(fired[1], growth, "rare pack in range triggers the growth rule");
    assert_eq!(fired[2], arrow, "growth waits for its own cooldown");
    assert_eq!(fired[3], None, "growth deployed nearby and arrow cooling down");
    assert!(first[4].is_paused(), "loading screen pauses the pilot");
    assert_eq!(first[5].stats.monster_count, 0, "new area starts empty");
    assert_eq!(fired[5], None);
}

#[test]
fn walls_hide_monsters_from_aim_assist() {
    let outcomes = replay();
    let aimed = &outcomes[2];

    assert_eq!(aimed.status, TickStatus::Ran);
    assert_eq!(
        aimed.aim_target,
        Some(EntityId::new(11)),
        "closer monster behind the wall is skipped"
    );
    assert!(aimed
        .commands()
        .iter()
        .any(|command| matches!(command, Command::MoveCursor { .. })));
}

struct Area {
    rows: Vec<Vec<i32>>,
}

impl TerrainSource for Area {
    fn dimensions(&self) -> Option<GridDimensions> {
        Some(GridDimensions::new(
            u32::try_from(self.rows.first()?.len()).ok()?,
            u32::try_from(self.rows.len()).ok()?,
        ))
    }

    fn targeting_rows(&self) -> Option<&[Vec<i32>]> {
        Some(&self.rows)
    }
}

struct TopDownCamera;

impl CameraProjection for TopDownCamera {
    fn world_to_screen(&self, world: Vec3) -> Option<Vec2> {
        Some(Vec2::new(400.0 + world.x * 2.0, 300.0 + world.y * 2.0))
    }
}

fn walled_area() -> Area {
    let mut rows = vec![vec![5; 16]; 16];
    for row in rows.iter_mut().take(8) {
        row[6] = 1;
    }
    Area { rows }
}

fn open_area() -> Area {
    Area {
        rows: vec![vec![5; 16]; 16],
    }
}

fn config() -> PilotConfig {
    let mut config = PilotConfig::default();
    config.aim_assist_mode = true;
    config.aim_assist.engage_range = 100;
    config.skill_rules.global_cooldown_ms = 300;

    let _ = config.skill_rules.rules.push(SkillRule {
        skill_id: "21".to_owned(),
        skill_name: "Toxic Growth".to_owned(),
        key: KeyBinding::bound(BoundAction::Key(VirtualKey::new(GROWTH_KEY))),
        condition: SkillCondition {
            min_monsters_in_range: 2,
            range: 80,
            min_cooldown_ms: 1_000,
            rarity_filter: RarityFilter::RareOrHigher,
            skip_if_deployed_object_nearby: true,
            deployed_object_range: 60,
            ..SkillCondition::default()
        },
    });
    let _ = config.skill_rules.rules.push(SkillRule {
        skill_id: "22".to_owned(),
        skill_name: "Poisonburst Arrow".to_owned(),
        key: KeyBinding::bound(BoundAction::Key(VirtualKey::new(ARROW_KEY))),
        condition: SkillCondition {
            min_monsters_in_range: 1,
            range: 80,
            min_cooldown_ms: 1_500,
            ..SkillCondition::default()
        },
    });
    config
}

fn monster(id: u32, grid: (f32, f32), distance: f32, rarity: Rarity) -> EntitySnapshot {
    EntitySnapshot {
        id: EntityId::new(id),
        kind: EntityKind::Monster,
        world: Vec3::new(grid.0 * 10.0, grid.1 * 10.0, 0.0),
        grid: Vec2::new(grid.0, grid.1),
        distance,
        flags: EntityFlags::HOSTILE,
        rarity: Some(rarity),
        stats: None,
        path: None,
        animated_base_path: None,
    }
}

struct Frame {
    dt: u64,
    host: HostState,
    input: InputState,
    player: PlayerSnapshot,
    entities: EntityView,
    area_change: Option<Area>,
}

fn player(deployed: Vec<DeployedObject>) -> PlayerSnapshot {
    PlayerSnapshot {
        grid: Vec2::new(2.0, 2.0),
        world: Vec3::new(20.0, 20.0, 0.0),
        vitals: Some(Vitals {
            life: 80,
            max_life: 100,
            mana: 50,
            max_mana: 100,
            ..Vitals::default()
        }),
        skills: vec![ActorSkill {
            id: 21,
            name: Some("Toxic Growth".to_owned()),
            internal_name: None,
            deployed,
        }],
    }
}

fn script() -> Vec<Frame> {
    let in_game = HostState {
        in_game: true,
        ..HostState::default()
    };
    let rare_pack = EntityView::from_snapshots(vec![
        monster(10, (9.0, 2.0), 30.0, Rarity::Rare),
        monster(11, (2.0, 6.0), 40.0, Rarity::Unique),
        monster(12, (3.0, 9.0), 95.0, Rarity::Normal),
    ]);

    vec![
        Frame {
            dt: 100,
            host: in_game,
            input: InputState::default(),
            player: player(Vec::new()),
            entities: rare_pack.clone(),
            area_change: None,
        },
        Frame {
            dt: 400,
            host: in_game,
            input: InputState::default(),
            player: player(Vec::new()),
            entities: rare_pack.clone(),
            area_change: None,
        },
        Frame {
            dt: 400,
            host: in_game,
            input: InputState {
                aim_hold: true,
                ..InputState::default()
            },
            player: player(vec![DeployedObject {
                world: Vec3::new(40.0, 20.0, 0.0),
                distance: 20.0,
            }]),
            entities: rare_pack,
            area_change: None,
        },
        Frame {
            dt: 700,
            host: in_game,
            input: InputState::default(),
            player: player(vec![DeployedObject {
                world: Vec3::new(40.0, 20.0, 0.0),
                distance: 20.0,
            }]),
            entities: EntityView::from_snapshots(vec![
                monster(13, (4.0, 3.0), 50.0, Rarity::Rare),
                monster(14, (4.0, 4.0), 55.0, Rarity::Rare),
            ]),
            area_change: None,
        },
        Frame {
            dt: 400,
            host: HostState {
                loading: true,
                ..in_game
            },
            input: InputState::default(),
            player: player(Vec::new()),
            entities: EntityView::default(),
            area_change: Some(open_area()),
        },
        Frame {
            dt: 400,
            host: in_game,
            input: InputState::default(),
            player: player(Vec::new()),
            entities: EntityView::default(),
            area_change: None,
        },
    ]
}

fn replay() -> Vec<TickOutcome> {
    let window = WindowState {
        rect: ScreenRect::from_origin_and_size(Vec2::new(0.0, 0.0), Vec2::new(800.0, 600.0)),
        focused: true,
    };
    let mut pilot = Pilot::new(config(), walled_area());
    let mut outcomes = Vec::new();

    for frame in script() {
        if let Some(area) = frame.area_change {
            *pilot.terrain_mut() = area;
            pilot.on_area_changed();
        }

        let input = TickInput {
            dt: Duration::from_millis(frame.dt),
            host: frame.host,
            input: frame.input,
            window,
            cursor: Vec2::new(400.0, 300.0),
            player: Some(&frame.player),
            entities: &frame.entities,
            skill_bar: &[],
            camera: Some(&TopDownCamera),
        };
        outcomes.push(pilot.on_tick(&input));
    }

    outcomes
}

fn fingerprint(outcomes: &[TickOutcome]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for outcome in outcomes {
        format!("{:?}", outcome.commands()).hash(&mut hasher);
        outcome.fired.hash(&mut hasher);
        outcome.aim_target.hash(&mut hasher);
    }
    hasher.finish()
}
