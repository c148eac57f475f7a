use qnet::prelude::*;
use qnet::station::Destination;
use rand::{rngs::StdRng, SeedableRng};

const A: StationId = StationId(1);
const B: StationId = StationId(2);

fn fan_out() -> RoutingPolicy {
    RoutingPolicy::new(vec![
        Destination::new("A", 0.5, Some(A)),
        Destination::new("B", 0.3, Some(B)),
        Destination::exit(0.2),
    ])
    .unwrap()
}

#[test]
fn fan_out_proportions() {
    let policy = fan_out();
    let mut rng = StdRng::seed_from_u64(123);

    let n = 10_000;
    let (mut a, mut b, mut exit) = (0u32, 0u32, 0u32);
    for _ in 0..n {
        match policy.next(&mut rng) {
            Some(A) => a += 1,
            Some(B) => b += 1,
            None => exit += 1,
            Some(other) => panic!("drew unknown destination {other}"),
        }
    }

    let freq = |count: u32| f64::from(count) / f64::from(n);
    assert!((freq(a) - 0.5).abs() < 0.02, "A: {}", freq(a));
    assert!((freq(b) - 0.3).abs() < 0.02, "B: {}", freq(b));
    assert!((freq(exit) - 0.2).abs() < 0.02, "exit: {}", freq(exit));
}

#[test]
fn seeded_draws_are_reproducible() {
    let policy = fan_out();
    let draw = |seed| {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..256).map(|_| policy.next(&mut rng)).collect::<Vec<_>>()
    };
    assert_eq!(draw(77), draw(77));
}

#[test]
fn normalization() {
    assert!(RoutingPolicy::new(vec![
        Destination::new("A", 0.5 + 5e-7, Some(A)),
        Destination::exit(0.5),
    ])
    .is_ok());

    for sum_off in [2e-6, -2e-6, 0.1, -0.5] {
        let result = RoutingPolicy::new(vec![
            Destination::new("A", 0.5 + sum_off, Some(A)),
            Destination::exit(0.5),
        ]);
        assert!(
            matches!(result, Err(RoutingError::InvalidRoutingTable { .. })),
            "offset {sum_off} accepted"
        );
    }
}

#[test]
fn network_routes_follow_the_table() {
    let network = Network::builder()
        .station(
            StationSpec::new("split", 50, 1000, 1.0)
                .fixed_service(Duration::from_secs(1))
                .to("left", 0.7)
                .to("right", 0.3),
        )
        .station(StationSpec::new("left", 50, 1000, 1.0).fixed_service(Duration::from_secs(1)))
        .station(StationSpec::new("right", 50, 1000, 1.0).fixed_service(Duration::from_secs(1)))
        .sample_interval(None)
        .build()
        .unwrap();

    let mut rt = Builder::seeded(31).quiet().build(network);
    let split = rt.app.station_id("split").unwrap();
    for _ in 0..1_000 {
        let entity = rt.app.create_entity(SimTime::ZERO);
        rt.add_event(
            NetworkEvent::Inject {
                station: split,
                entity,
            },
            SimTime::ZERO,
        );
    }

    let (network, _, _) = rt.run().unwrap();
    assert_eq!(network.exited(), 1_000);
    assert_eq!(network.lost(), 0);

    let left = network.station_by_name("left").unwrap().stats().served_count();
    let right = network.station_by_name("right").unwrap().stats().served_count();
    assert_eq!(left + right, 1_000);
    assert!((left as f64 / 1_000.0 - 0.7).abs() < 0.05, "left: {left}");
}
