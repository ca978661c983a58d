use hamlet_core::{
    BuildingCatalog, BuildingConfig, BuildingId, BuildingKind, CellCoord, Command, ConfigId,
    Event, Faction, ResourceType, RouteId, SpendReason,
};
use hamlet_system_transport::{route_cost, RoutePrediction, Transport, TransportTuning};
use hamlet_world::{apply, grid::GridLayers, query, Treasury, World};

fn storage(id: &str, level: u32) -> BuildingConfig {
    let mut config = BuildingConfig::new(id, BuildingKind::Warehouse);
    config.build_turns = 0;
    config.level = level;
    config
}

fn world(map: &str, gold: u32) -> World {
    let catalog = BuildingCatalog::from_configs([
        storage("warehouse", 1),
        storage("store", 2),
        storage("depot", 5),
    ])
    .expect("valid catalogue");
    World::new(catalog, &GridLayers::from_ascii(map)).with_treasury(Treasury {
        gold,
        ..Treasury::default()
    })
}

fn open_map(width: usize, height: usize) -> String {
    vec![".".repeat(width); height].join("\n")
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

fn declare(
    world: &mut World,
    source: BuildingId,
    target: BuildingId,
    whitelist: Vec<ResourceType>,
) -> RouteId {
    let mut events = Vec::new();
    apply(
        world,
        Command::DeclareRoute {
            source,
            target,
            whitelist,
        },
        &mut events,
    );
    events
        .iter()
        .find_map(|event| match event {
            Event::RouteDeclared { route, .. } => Some(*route),
            _ => None,
        })
        .expect("route is accepted")
}

fn stock(world: &mut World, building: BuildingId, resource: ResourceType, quantity: u32) {
    let mut events = Vec::new();
    apply(
        world,
        Command::DepositGoods {
            building,
            resource,
            quantity,
        },
        &mut events,
    );
}

fn run(world: &mut World, transport: &mut Transport) -> (Vec<Command>, Vec<Event>) {
    let mut commands = Vec::new();
    transport.handle(world, &mut commands);
    let mut events = Vec::new();
    for command in commands.clone() {
        apply(world, command, &mut events);
    }
    (commands, events)
}

fn quantity(world: &World, building: BuildingId, resource: ResourceType) -> u32 {
    query::inventory(world, building)
        .map(|inventory| inventory.quantity(resource))
        .unwrap_or_default()
}

#[test]
fn distant_storages_move_one_unit_for_five_gold() {
    let mut world = world(&open_map(14, 3), 100);
    let source = place(&mut world, "store", 0, 0);
    let target = place(&mut world, "store", 12, 0);
    stock(&mut world, source, ResourceType::Plank, 30);
    let route = declare(&mut world, source, target, Vec::new());

    let mut transport = Transport::default();
    assert_eq!(
        transport.predict(&world, route),
        Some(RoutePrediction {
            cost: 10.0,
            quantity: 1,
            maintenance: 5,
        })
    );

    let (commands, events) = run(&mut world, &mut transport);
    assert_eq!(
        commands[0],
        Command::SpendGold {
            amount: 5,
            reason: SpendReason::RouteUpkeep { route },
        }
    );
    assert!(events.contains(&Event::RouteSettled {
        route,
        cost: 10.0,
        moved: 1,
    }));
    assert_eq!(query::treasury(&world).gold, 95);
    assert_eq!(quantity(&world, source, ResourceType::Plank), 29);
    assert_eq!(quantity(&world, target, ResourceType::Plank), 1);

    let snapshot = query::routes(&world);
    assert_eq!(snapshot[0].last_cost, Some(10.0));
    assert_eq!(snapshot[0].last_moved, 1);
}

#[test]
fn neighbouring_storages_share_approach_cells() {
    let mut world = world(&open_map(6, 3), 0);
    let source = place(&mut world, "depot", 0, 0);
    let target = place(&mut world, "depot", 2, 0);
    stock(&mut world, source, ResourceType::Log, 40);
    stock(&mut world, source, ResourceType::Stone, 40);
    let _ = declare(&mut world, source, target, Vec::new());

    let grid = query::grid(&world);
    let source_region = query::building(&world, source).expect("source exists").region;
    let target_region = query::building(&world, target).expect("target exists").region;
    assert_eq!(route_cost(grid, source_region, target_region), Some(0.0));

    let mut transport = Transport::default();
    let (commands, _) = run(&mut world, &mut transport);
    assert!(
        !commands
            .iter()
            .any(|command| matches!(command, Command::SpendGold { .. })),
        "a zero-length route costs nothing"
    );
    assert_eq!(quantity(&world, target, ResourceType::Log), 40);
    assert_eq!(quantity(&world, target, ResourceType::Stone), 24, "quota of 64 is reached");
    assert_eq!(quantity(&world, source, ResourceType::Stone), 16);
}

#[test]
fn whitelist_limits_the_goods_moved() {
    let mut world = world(&open_map(6, 3), 0);
    let source = place(&mut world, "depot", 0, 0);
    let target = place(&mut world, "depot", 2, 0);
    stock(&mut world, source, ResourceType::Log, 10);
    stock(&mut world, source, ResourceType::Clay, 10);
    let _ = declare(&mut world, source, target, vec![ResourceType::Clay]);

    let _ = run(&mut world, &mut Transport::default());
    assert_eq!(quantity(&world, target, ResourceType::Clay), 10);
    assert_eq!(quantity(&world, target, ResourceType::Log), 0);
    assert_eq!(quantity(&world, source, ResourceType::Log), 10);
}

#[test]
fn routes_sharing_a_source_never_overdraw_it() {
    let mut world = world(&open_map(6, 3), 0);
    let west = place(&mut world, "depot", 0, 0);
    let source = place(&mut world, "depot", 2, 0);
    let east = place(&mut world, "depot", 4, 0);
    stock(&mut world, source, ResourceType::Wool, 5);
    let first = declare(&mut world, source, west, Vec::new());
    let second = declare(&mut world, source, east, Vec::new());

    let (_, events) = run(&mut world, &mut Transport::default());
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::WithdrawalRejected { .. })));
    assert!(events.contains(&Event::RouteSettled {
        route: first,
        cost: 0.0,
        moved: 5,
    }));
    assert!(events.contains(&Event::RouteSettled {
        route: second,
        cost: 0.0,
        moved: 0,
    }));
    assert_eq!(quantity(&world, west, ResourceType::Wool), 5);
    assert_eq!(quantity(&world, east, ResourceType::Wool), 0);
}

#[test]
fn prediction_raises_throughput_to_the_minimum() {
    let mut world = world(&open_map(30, 2), 0);
    let source = place(&mut world, "warehouse", 0, 0);
    let target = place(&mut world, "warehouse", 28, 0);
    stock(&mut world, source, ResourceType::Flax, 3);
    let route = declare(&mut world, source, target, Vec::new());

    let transport = Transport::new(TransportTuning::default());
    let prediction = transport.predict(&world, route).expect("storages are connected");
    assert_eq!(prediction.cost, 26.0);
    assert_eq!(prediction.quantity, 1);
    assert_eq!(prediction.maintenance, 13);

    let mut transport = transport;
    let (_, events) = run(&mut world, &mut transport);
    assert!(
        events.contains(&Event::RouteSettled {
            route,
            cost: 26.0,
            moved: 0,
        }),
        "execution does not apply the predicted minimum"
    );
    assert_eq!(quantity(&world, source, ResourceType::Flax), 3);
}

#[test]
fn walled_off_storages_are_skipped() {
    let map = ["..#..", "..#..", "..#.."].join("\n");
    let mut world = world(&map, 50);
    let source = place(&mut world, "depot", 0, 0);
    let target = place(&mut world, "depot", 4, 0);
    stock(&mut world, source, ResourceType::Gems, 2);
    let route = declare(&mut world, source, target, Vec::new());

    let mut transport = Transport::default();
    assert_eq!(transport.predict(&world, route), None);
    let (commands, _) = run(&mut world, &mut transport);
    assert!(commands.is_empty(), "no upkeep and no transfer without a path");
    assert_eq!(query::treasury(&world).gold, 50);
}

#[test]
fn levelled_storages_raise_the_quota() {
    let mut world = world(&open_map(14, 3), 100);
    let source = place(&mut world, "store", 0, 0);
    let target = place(&mut world, "store", 12, 0);
    let route = declare(&mut world, source, target, Vec::new());
    let transport = Transport::default();
    assert_eq!(transport.predict(&world, route).map(|p| p.quantity), Some(1));

    let mut events = Vec::new();
    for building in [source, target] {
        apply(
            &mut world,
            Command::SettleLeveling {
                building,
                level: 5,
                experience: 0,
            },
            &mut events,
        );
    }
    assert_eq!(
        transport.predict(&world, route).map(|p| p.quantity),
        Some(5),
        "64 units over a path cost of 10"
    );
}
