use hamlet_core::{
    BuildingCatalog, BuildingConfig, BuildingId, BuildingKind, CellCoord, Command, ConfigId,
    Event, Faction, HousingEmployment, HousingParams, HousingSettlement, JobSlots,
    ProviderOccupancy,
};
use hamlet_system_employment::{
    employable_workers, employment_rate, Employment, EmploymentTuning,
};
use hamlet_world::{apply, grid::GridLayers, query, World};

fn provider(id: &str, slots: u32, priority: u32, commute_max_cost: f32) -> BuildingConfig {
    let mut config = BuildingConfig::new(id, BuildingKind::Service);
    config.build_turns = 0;
    config.jobs = Some(JobSlots {
        slots,
        priority,
        commute_max_cost,
    });
    config
}

fn world() -> World {
    let mut hut = BuildingConfig::new("hut", BuildingKind::House);
    hut.build_turns = 0;
    hut.housing = Some(HousingParams {
        employment_percent: 50,
        commute_move_points: 10.0,
        ..HousingParams::default()
    });
    let catalog = BuildingCatalog::from_configs([
        hut,
        provider("workshop", 2, 1, 10.0),
        provider("farm", 5, 3, 10.0),
        provider("quarry", 5, 9, 1.5),
    ])
    .expect("valid catalogue");
    World::new(catalog, &GridLayers::from_ascii(&vec![".........."; 5].join("\n")))
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

fn populate(world: &mut World, house: BuildingId, population: u32) {
    let mut events = Vec::new();
    apply(
        world,
        Command::SettleHousing(HousingSettlement {
            building: house,
            population,
            level: 1,
            max_population: 8,
            experience: 0,
            experience_to_next: 60,
        }),
        &mut events,
    );
}

#[test]
fn employable_share_rounds_down() {
    assert_eq!(employable_workers(8, 50), 4);
    assert_eq!(employable_workers(7, 50), 3);
    assert_eq!(employable_workers(1, 60), 0);
}

#[test]
fn higher_priority_wins_among_equally_distant_providers() {
    let mut world = world();
    let hut = place(&mut world, "hut", 0, 2);
    let workshop = place(&mut world, "workshop", 3, 2);
    let farm = place(&mut world, "farm", 3, 0);
    populate(&mut world, hut, 8);

    let mut employment = Employment::seeded(EmploymentTuning::default(), 7);
    let plan = employment.plan(&world);

    assert_eq!(
        plan.housing,
        vec![HousingEmployment {
            building: hut,
            employable: 4,
            employed: 4,
        }]
    );
    assert!(plan.providers.contains(&ProviderOccupancy {
        building: farm,
        occupied: 4,
    }));
    assert!(plan.providers.contains(&ProviderOccupancy {
        building: workshop,
        occupied: 0,
    }));
}

#[test]
fn providers_beyond_their_commute_limit_are_skipped() {
    let mut world = world();
    let hut = place(&mut world, "hut", 0, 2);
    let quarry = place(&mut world, "quarry", 3, 2);
    populate(&mut world, hut, 8);

    let mut employment = Employment::seeded(EmploymentTuning::default(), 7);
    let plan = employment.plan(&world);
    assert_eq!(plan.housing[0].employed, 0);
    assert_eq!(
        plan.providers,
        vec![ProviderOccupancy {
            building: quarry,
            occupied: 0,
        }]
    );
}

#[test]
fn earlier_houses_fill_scarce_slots_first() {
    let mut world = world();
    let first = place(&mut world, "hut", 0, 0);
    let second = place(&mut world, "hut", 0, 4);
    let _ = place(&mut world, "workshop", 2, 2);
    populate(&mut world, first, 8);
    populate(&mut world, second, 8);

    let mut employment = Employment::seeded(EmploymentTuning::default(), 1);
    let mut commands = Vec::new();
    employment.assign(&world, &mut commands);
    let mut events = Vec::new();
    for command in commands {
        apply(&mut world, command, &mut events);
    }

    assert_eq!(
        events,
        vec![Event::EmploymentAssigned {
            employable: 8,
            employed: 2,
        }]
    );
    let first_housing = query::housing(&world, first).expect("house exists");
    let second_housing = query::housing(&world, second).expect("house exists");
    assert_eq!((first_housing.employed, first_housing.unemployed), (2, 2));
    assert_eq!((second_housing.employed, second_housing.unemployed), (0, 4));
    assert!((employment_rate(&world) - 0.25).abs() < f32::EPSILON);
}

#[test]
fn plans_are_reproducible_for_a_seed() {
    let mut world = world();
    let hut = place(&mut world, "hut", 4, 2);
    let _ = place(&mut world, "workshop", 2, 2);
    let _ = place(&mut world, "workshop", 6, 2);
    populate(&mut world, hut, 6);

    let first = Employment::seeded(EmploymentTuning::default(), 99).plan(&world);
    let second = Employment::seeded(EmploymentTuning::default(), 99).plan(&world);
    assert_eq!(first, second);
    assert_eq!(first.housing[0].employed, 3);
}

#[test]
fn settle_maps_the_rate_onto_happiness() {
    let mut world = world();
    let hut = place(&mut world, "hut", 0, 2);
    populate(&mut world, hut, 8);

    let mut employment = Employment::seeded(EmploymentTuning::default(), 3);
    let mut commands = Vec::new();
    employment.assign(&world, &mut commands);
    let mut events = Vec::new();
    for command in commands.drain(..) {
        apply(&mut world, command, &mut events);
    }

    employment.settle(&world, &mut commands);
    assert_eq!(
        commands,
        vec![Command::AdjustHappiness { delta: -8 }],
        "nobody employed maps onto the bottom of the curve"
    );
    apply(&mut world, commands.remove(0), &mut events);
    assert_eq!(query::treasury(&world).happiness, 42);
}
