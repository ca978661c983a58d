use hamlet_core::{
    BuildingCatalog, BuildingConfig, BuildingId, BuildingKind, CellCoord, Command, ConfigId,
    EmploymentPlan, Event, Faction, HousingSettlement, JobSlots, LevelStep, ProviderOccupancy,
    Ring, UpgradeProfile, XpMode,
};
use hamlet_system_leveling::Leveling;
use hamlet_world::{apply, grid::GridLayers, query, World};

fn ladder(xp_mode: XpMode, gain: u32, top: LevelStep) -> UpgradeProfile {
    UpgradeProfile {
        xp_mode,
        xp_gain_min: gain,
        xp_gain_max: gain,
        levels: vec![LevelStep::new(1, 20), top],
    }
}

fn catalog() -> BuildingCatalog {
    let shrine_top = LevelStep {
        replace_config: Some(ConfigId::new("temple")),
        ..LevelStep::new(2, 0)
    };
    let mut shrine = BuildingConfig::new("shrine", BuildingKind::Service);
    shrine.build_turns = 0;
    shrine.upgrade = Some(ladder(XpMode::AlwaysPerTurn, 10, shrine_top.clone()));

    let mut temple = BuildingConfig::new("temple", BuildingKind::Service);
    temple.build_turns = 0;
    temple.beauty_rings = vec![Ring { radius: 3, level: 4 }];
    temple.upgrade = Some(ladder(XpMode::AlwaysPerTurn, 10, shrine_top));

    let mut workshop = BuildingConfig::new("workshop", BuildingKind::Service);
    workshop.build_turns = 0;
    workshop.jobs = Some(JobSlots {
        slots: 3,
        ..JobSlots::default()
    });
    workshop.upgrade = Some(ladder(
        XpMode::PerTurnWhenEmployees,
        20,
        LevelStep {
            job_slots: Some(6),
            ..LevelStep::new(2, 0)
        },
    ));

    let mut hut = BuildingConfig::new("hut", BuildingKind::House);
    hut.build_turns = 0;
    hut.upgrade = Some(ladder(
        XpMode::PerTurnWhenHouseFull,
        20,
        LevelStep {
            max_population: Some(12),
            ..LevelStep::new(2, 0)
        },
    ));

    let mut monument = BuildingConfig::new("monument", BuildingKind::Civic);
    monument.build_turns = 0;
    monument.upgrade = Some(ladder(XpMode::ManualOnly, 20, LevelStep::new(2, 0)));

    let mut scaffold = BuildingConfig::new("scaffold", BuildingKind::Service);
    scaffold.build_turns = 4;
    scaffold.upgrade = Some(ladder(XpMode::AlwaysPerTurn, 20, LevelStep::new(2, 0)));

    BuildingCatalog::from_configs([shrine, temple, workshop, hut, monument, scaffold])
        .expect("valid catalogue")
}

fn world() -> World {
    let map = vec![".".repeat(10); 10].join("\n");
    World::new(catalog(), &GridLayers::from_ascii(&map))
}

fn place(world: &mut World, config: &str, x: i32, y: i32) -> BuildingId {
    let mut events = Vec::new();
    apply(
        world,
        Command::PlaceBuilding {
            config: ConfigId::new(config),
            origin: CellCoord::new(x, y),
            faction: Faction::Player,
        },
        &mut events,
    );
    events
        .iter()
        .find_map(|event| match event {
            Event::BuildingPlaced { building, .. } => Some(*building),
            _ => None,
        })
        .expect("placement succeeds")
}

fn run(world: &mut World, leveling: &mut Leveling) -> (Vec<Command>, Vec<Event>) {
    let mut commands = Vec::new();
    leveling.handle(world, &mut commands);
    let mut events = Vec::new();
    for command in commands.clone() {
        apply(world, command, &mut events);
    }
    (commands, events)
}

fn level(world: &World, building: BuildingId) -> (u32, u32) {
    query::building(world, building)
        .map(|snapshot| (snapshot.level, snapshot.experience))
        .expect("building exists")
}

#[test]
fn always_mode_levels_up_and_swaps_the_definition() {
    let mut world = world();
    let shrine = place(&mut world, "shrine", 4, 4);
    let mut leveling = Leveling::seeded(7);

    let _ = run(&mut world, &mut leveling);
    assert_eq!(level(&world, shrine), (1, 10));
    assert_eq!(
        query::service_levels(&world, CellCoord::new(4, 4)).map(|levels| levels.beauty),
        Some(0)
    );

    let (_, events) = run(&mut world, &mut leveling);
    assert_eq!(level(&world, shrine), (2, 0));
    assert!(events.contains(&Event::BuildingLeveledUp {
        building: shrine,
        level: 2,
    }));
    assert!(events.contains(&Event::ConfigReplaced {
        building: shrine,
        from: ConfigId::new("shrine"),
        to: ConfigId::new("temple"),
    }));
    assert_eq!(events.last(), Some(&Event::AreaEffectsRebuilt));
    assert_eq!(
        query::service_levels(&world, CellCoord::new(6, 5)).map(|levels| levels.beauty),
        Some(4),
        "the replacement's rings apply at once"
    );

    let (commands, _) = run(&mut world, &mut leveling);
    assert_eq!(
        commands,
        vec![Command::SettleLeveling {
            building: shrine,
            level: 2,
            experience: 10,
        }],
        "the top rung keeps accumulating without further swaps"
    );
}

#[test]
fn employee_mode_waits_for_a_filled_slot() {
    let mut world = world();
    let workshop = place(&mut world, "workshop", 0, 0);
    let mut leveling = Leveling::seeded(7);

    let (commands, _) = run(&mut world, &mut leveling);
    assert!(commands.is_empty(), "an empty workshop gains nothing");

    let mut events = Vec::new();
    apply(
        &mut world,
        Command::ApplyEmployment {
            plan: EmploymentPlan {
                housing: Vec::new(),
                providers: vec![ProviderOccupancy {
                    building: workshop,
                    occupied: 2,
                }],
            },
        },
        &mut events,
    );

    let (_, events) = run(&mut world, &mut leveling);
    assert_eq!(level(&world, workshop), (2, 0));
    assert!(events.contains(&Event::CapacityOverridden {
        building: workshop,
        job_slots: Some(6),
        max_population: None,
    }));
    let jobs = query::job_provider(&world, workshop).expect("workshop offers jobs");
    assert_eq!((jobs.slots, jobs.occupied), (6, 2));
}

#[test]
fn house_full_mode_raises_the_population_ceiling() {
    let mut world = world();
    let hut = place(&mut world, "hut", 2, 2);
    let mut leveling = Leveling::seeded(7);

    let (commands, _) = run(&mut world, &mut leveling);
    assert!(commands.is_empty(), "an empty hut gains nothing");

    let state = query::housing(&world, hut).expect("hut is a house");
    let mut events = Vec::new();
    apply(
        &mut world,
        Command::SettleHousing(HousingSettlement {
            building: hut,
            population: state.max_population,
            level: state.level,
            max_population: state.max_population,
            experience: state.experience,
            experience_to_next: state.experience_to_next,
        }),
        &mut events,
    );

    let _ = run(&mut world, &mut leveling);
    assert_eq!(level(&world, hut), (2, 0));
    let state = query::housing(&world, hut).expect("hut is a house");
    assert_eq!(state.max_population, 12);
    assert_eq!(state.level, 1, "residential levels advance separately");
}

#[test]
fn manual_mode_only_moves_through_grants() {
    let mut world = world();
    let monument = place(&mut world, "monument", 6, 0);
    let shrine = place(&mut world, "shrine", 0, 6);
    let mut leveling = Leveling::seeded(7);

    let (commands, _) = run(&mut world, &mut leveling);
    assert!(
        commands.iter().all(|command| !matches!(
            command,
            Command::SettleLeveling { building, .. } if *building == monument
        )),
        "manual ladders ignore the turn"
    );

    let mut commands = Vec::new();
    assert!(leveling.grant(&world, monument, 25, &mut commands));
    let mut events = Vec::new();
    for command in commands {
        apply(&mut world, command, &mut events);
    }
    assert_eq!(level(&world, monument), (2, 5));
    assert!(!leveling.grant(&world, BuildingId::new(99), 25, &mut Vec::new()));
    assert_eq!(level(&world, shrine), (1, 10));
}

#[test]
fn unfinished_buildings_do_not_gain_experience() {
    let mut world = world();
    let scaffold = place(&mut world, "scaffold", 8, 8);
    let mut leveling = Leveling::seeded(7);
    let (commands, _) = run(&mut world, &mut leveling);
    assert!(commands.is_empty());
    assert_eq!(level(&world, scaffold), (1, 0));
}

#[test]
fn identical_seeds_grant_identical_experience() {
    let mut varied = BuildingConfig::new("well", BuildingKind::Service);
    varied.build_turns = 0;
    varied.upgrade = Some(UpgradeProfile {
        levels: vec![LevelStep::new(1, 0)],
        ..UpgradeProfile::default()
    });
    let catalog = BuildingCatalog::from_configs([varied]).expect("valid catalogue");
    let run_with = |seed: u64| {
        let mut world = World::new(catalog.clone(), &GridLayers::from_ascii("...\n..."));
        let well = place(&mut world, "well", 1, 0);
        let mut leveling = Leveling::seeded(seed);
        for _ in 0..5 {
            let _ = run(&mut world, &mut leveling);
        }
        let (_, experience) = level(&world, well);
        assert!((15..=30).contains(&experience), "five turns of 3..=6 each");
        (experience, leveling.stream_position())
    };
    assert_eq!(run_with(11), run_with(11));

    let mut resumed = Leveling::seeded(11);
    let mut reference = Leveling::seeded(11);
    let mut world = World::new(catalog.clone(), &GridLayers::from_ascii("...\n..."));
    let _ = place(&mut world, "well", 1, 0);
    let _ = run(&mut world, &mut reference);
    resumed.seek(reference.stream_position());
    let mut left = Vec::new();
    let mut right = Vec::new();
    reference.handle(&world, &mut left);
    resumed.handle(&world, &mut right);
    assert_eq!(left, right, "seeking resumes the stream");
}
