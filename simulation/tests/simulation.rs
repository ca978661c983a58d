use hamlet_core::{
    BuildingConfig, BuildingId, BuildingKind, CellCoord, Command, ConfigId, Event, Faction,
    ResourceType, RouteId, Stage, TurnBlocker, UpgradeProfile,
};
use hamlet_simulation::{
    EndTurnOutcome, PlacementSpec, RouteSpec, Simulation, SimulationConfig, SimulationSnapshot,
    TurnPipeline,
};
use hamlet_world::{query, snapshot::StockRecord, Treasury};

fn open_map(width: usize, height: usize) -> String {
    vec![".".repeat(width); height].join("\n")
}

fn placement(config: &str, x: i32, y: i32) -> PlacementSpec {
    PlacementSpec {
        config: ConfigId::new(config),
        origin: CellCoord::new(x, y),
        faction: Faction::Player,
        constructed: true,
        inventory: Vec::new(),
        population: None,
    }
}

fn farmstead() -> SimulationConfig {
    let hut = BuildingConfig::new("hut", BuildingKind::House);
    let granary = BuildingConfig::new("granary", BuildingKind::Granary);
    let mut granary_spec = placement("granary", 0, 0);
    granary_spec.inventory = vec![StockRecord {
        resource: ResourceType::Barley,
        quantity: 100,
    }];
    let mut hut_spec = placement("hut", 2, 2);
    hut_spec.population = Some(8);

    SimulationConfig {
        seed: 42,
        map: open_map(6, 6),
        buildings: vec![hut, granary],
        placements: vec![granary_spec, hut_spec],
        ..SimulationConfig::default()
    }
}

fn barley(simulation: &Simulation, storage: BuildingId) -> u32 {
    query::inventory(simulation.world(), storage)
        .map(|inventory| inventory.quantity(ResourceType::Barley))
        .unwrap_or_default()
}

#[test]
fn first_turn_begins_with_employment_assignment() {
    let mut simulation = Simulation::new(&farmstead()).expect("scenario builds");
    assert_eq!(simulation.turn(), 1);
    let events = simulation.drain_events();
    assert!(events.contains(&Event::TurnBegan { turn: 1 }));
    assert!(events.contains(&Event::EmploymentAssigned {
        employable: 4,
        employed: 0,
    }));
}

#[test]
fn a_fed_house_draws_four_units_from_the_granary() {
    let mut simulation = Simulation::new(&farmstead()).expect("scenario builds");
    let granary = BuildingId::new(1);
    assert_eq!(barley(&simulation, granary), 100);

    let outcome = simulation.request_end_turn();
    assert_eq!(
        outcome,
        EndTurnOutcome::Advanced {
            finished: 1,
            turn: 2,
        }
    );
    assert_eq!(barley(&simulation, granary), 96);

    let events = simulation.drain_events();
    let order: Vec<&Event> = events
        .iter()
        .filter(|event| {
            matches!(
                event,
                Event::BeforeTurnEnd { .. } | Event::TurnEnded { .. } | Event::TurnBegan { .. }
            )
        })
        .collect();
    assert_eq!(
        order,
        vec![
            &Event::TurnBegan { turn: 1 },
            &Event::BeforeTurnEnd { turn: 1 },
            &Event::TurnEnded { turn: 1 },
            &Event::TurnBegan { turn: 2 },
        ]
    );
}

#[test]
fn blockers_refuse_the_end_of_turn_without_side_effects() {
    let mut simulation = Simulation::new(&farmstead()).expect("scenario builds");
    simulation.add_blocker("dialog", "a decree awaits");
    assert!(simulation.is_blocked());

    let outcome = simulation.request_end_turn();
    assert_eq!(
        outcome,
        EndTurnOutcome::Refused {
            turn: 1,
            blockers: vec![TurnBlocker {
                owner: "dialog".to_owned(),
                reason: "a decree awaits".to_owned(),
            }],
        }
    );
    assert_eq!(simulation.turn(), 1);
    assert_eq!(barley(&simulation, BuildingId::new(1)), 100);

    simulation.remove_blocker("dialog");
    assert!(matches!(
        simulation.request_end_turn(),
        EndTurnOutcome::Advanced { finished: 1, .. }
    ));
}

#[test]
fn distant_warehouses_move_one_unit_for_five_gold() {
    let mut store = BuildingConfig::new("store", BuildingKind::Warehouse);
    store.level = 2;
    let mut source = placement("store", 0, 0);
    source.inventory = vec![StockRecord {
        resource: ResourceType::Plank,
        quantity: 30,
    }];
    let config = SimulationConfig {
        map: open_map(14, 3),
        treasury: Treasury {
            gold: 100,
            ..Treasury::default()
        },
        buildings: vec![store],
        placements: vec![source, placement("store", 12, 0)],
        routes: vec![RouteSpec {
            source: 0,
            target: 1,
            whitelist: Vec::new(),
        }],
        ..SimulationConfig::default()
    };
    let mut simulation = Simulation::new(&config).expect("scenario builds");
    let route = RouteId::new(1);

    let prediction = simulation.predict_route(route).expect("storages are connected");
    assert_eq!((prediction.cost, prediction.quantity, prediction.maintenance), (10.0, 1, 5));

    let _ = simulation.request_end_turn();
    assert_eq!(query::treasury(simulation.world()).gold, 95);
    let target = query::inventory(simulation.world(), BuildingId::new(2)).expect("storage");
    assert_eq!(target.quantity(ResourceType::Plank), 1);
}

#[test]
fn handlers_outside_the_pipeline_do_not_run() {
    let config = SimulationConfig {
        pipeline: TurnPipeline {
            turn_began: Vec::new(),
            before_turn_end: Vec::new(),
        },
        ..farmstead()
    };
    let mut simulation = Simulation::new(&config).expect("scenario builds");
    let _ = simulation.request_end_turn();
    assert_eq!(barley(&simulation, BuildingId::new(1)), 100);
    assert_eq!(query::treasury(simulation.world()).happiness, 50);
}

#[test]
fn clearing_the_enemy_camp_reaches_the_chiefdom() {
    let mut camp = placement("camp", 10, 10);
    camp.faction = Faction::Enemy;
    let config = SimulationConfig {
        placements: vec![camp, placement("plaza", 2, 2)],
        ..SimulationConfig::default()
    };
    let mut simulation = Simulation::new(&config).expect("scenario builds");
    assert_eq!(simulation.stage(), Stage::Tribe);

    let events = simulation.submit(Command::DemolishBuilding {
        building: BuildingId::new(1),
    });
    assert!(events.contains(&Event::StageAdvanced {
        stage: Stage::Chiefdom,
    }));
    assert_eq!(simulation.stage(), Stage::Chiefdom);
}

#[test]
fn identical_seeds_replay_identically() {
    let run = || {
        let mut simulation = Simulation::new(&farmstead()).expect("scenario builds");
        for _ in 0..6 {
            let _ = simulation.request_end_turn();
        }
        simulation.export()
    };
    assert_eq!(run(), run());
}

#[test]
fn exported_simulations_restore_through_json() {
    let mut simulation = Simulation::new(&farmstead()).expect("scenario builds");
    let _ = simulation.request_end_turn();
    let _ = simulation.request_end_turn();
    let saved = simulation.export();

    let encoded = serde_json::to_string(&saved).expect("snapshot encodes");
    let decoded: SimulationSnapshot = serde_json::from_str(&encoded).expect("snapshot decodes");
    let (restored, remap) = Simulation::restore(&farmstead(), &decoded).expect("snapshot fits");

    assert_eq!(remap.len(), 2);
    assert_eq!(restored.turn(), 3);
    assert_eq!(restored.export(), saved);
}

#[test]
fn invalid_placements_report_their_index() {
    let config = SimulationConfig {
        placements: vec![placement("hut", 0, 0), placement("hut", 0, 0)],
        ..SimulationConfig::default()
    };
    let error = Simulation::new(&config).err().expect("overlapping huts are rejected");
    assert!(
        format!("{error:#}").contains("placement #1 of `hut` failed"),
        "unexpected error: {error:#}"
    );
}

#[test]
fn bundled_village_scenario_runs() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/village.toml");
    let config = SimulationConfig::load(&path).expect("demo scenario loads");
    let mut simulation = Simulation::new(&config).expect("demo scenario builds");
    let route = RouteId::new(1);
    assert!(simulation.predict_route(route).is_some(), "warehouses are connected");

    for turn in 1..=4 {
        assert_eq!(
            simulation.request_end_turn(),
            EndTurnOutcome::Advanced {
                finished: turn,
                turn: turn + 1,
            }
        );
    }
    let plaza = query::buildings(simulation.world())
        .into_iter()
        .find(|building| building.config.id == ConfigId::new("plaza"))
        .expect("plaza stands");
    assert!(plaza.constructed, "three turns of work complete the plaza");
    assert_eq!(simulation.stage(), Stage::Chiefdom);
}

#[test]
fn restored_runs_continue_the_random_streams() {
    let scenario = || {
        let mut depot = BuildingConfig::new("depot", BuildingKind::Warehouse);
        depot.upgrade = Some(UpgradeProfile::default());
        let mut config = farmstead();
        config.buildings.push(depot);
        config.placements.push(placement("depot", 4, 0));
        config
    };
    let mut uninterrupted = Simulation::new(&scenario()).expect("scenario builds");
    for _ in 0..2 {
        let _ = uninterrupted.request_end_turn();
    }
    let saved = uninterrupted.export();
    assert!(saved.streams.leveling > 0, "the depot drew experience");

    let (mut resumed, _) = Simulation::restore(&scenario(), &saved).expect("snapshot fits");
    for _ in 0..4 {
        let _ = uninterrupted.request_end_turn();
        let _ = resumed.request_end_turn();
    }
    assert_eq!(resumed.export(), uninterrupted.export());
}

#[test]
fn granted_experience_turns_a_clinic_into_an_infirmary() {
    let config = SimulationConfig {
        placements: vec![placement("clinic", 2, 2), placement("hut", 6, 6)],
        ..SimulationConfig::default()
    };
    let mut simulation = Simulation::new(&config).expect("scenario builds");
    let clinic = BuildingId::new(1);

    assert!(simulation.grant_experience(clinic, 45));
    let snapshot = query::building(simulation.world(), clinic).expect("clinic stands");
    assert_eq!(snapshot.config.id, ConfigId::new("infirmary"));
    assert_eq!((snapshot.level, snapshot.experience), (2, 5));
    assert_eq!(
        query::job_provider(simulation.world(), clinic).map(|jobs| jobs.slots),
        Some(4)
    );
    assert!(simulation.drain_events().contains(&Event::BuildingLeveledUp {
        building: clinic,
        level: 2,
    }));

    assert!(
        !simulation.grant_experience(BuildingId::new(2), 45),
        "huts have no upgrade ladder"
    );
}

#[test]
fn demolished_route_endpoints_do_not_break_saves() {
    let mut store = BuildingConfig::new("store", BuildingKind::Warehouse);
    store.build_turns = 0;
    let config = SimulationConfig {
        map: open_map(10, 3),
        buildings: vec![store],
        placements: vec![placement("store", 0, 0), placement("store", 6, 0)],
        routes: vec![RouteSpec {
            source: 0,
            target: 1,
            whitelist: Vec::new(),
        }],
        ..SimulationConfig::default()
    };
    let mut simulation = Simulation::new(&config).expect("scenario builds");
    let events = simulation.submit(Command::DemolishBuilding {
        building: BuildingId::new(2),
    });
    assert!(events.contains(&Event::RouteRemoved {
        route: RouteId::new(1),
    }));

    let saved = simulation.export();
    let encoded = serde_json::to_string(&saved).expect("snapshot encodes");
    let decoded: SimulationSnapshot = serde_json::from_str(&encoded).expect("snapshot decodes");
    let (restored, _) = Simulation::restore(&config, &decoded).expect("snapshot fits");
    assert!(query::routes(restored.world()).is_empty());
}
