use qnet::prelude::*;

fn desk(servers: usize, queue: usize, service: u64) -> Network {
    Network::builder()
        .station(
            StationSpec::new("desk", servers, queue, service as f64)
                .fixed_service(Duration::from_secs(service)),
        )
        .keep_exited(true)
        .build()
        .unwrap()
}

fn admit(rt: &mut Runtime<Network>, station: StationId) -> Result<(), QueueError> {
    let (network, mut sched) = rt.split();
    let entity = network.create_entity(sched.now());
    network
        .station_mut(station)
        .add_entity::<NetworkEvent, _>(entity, &mut sched)
}

#[test]
fn single_station_throughput() {
    let mut rt = Builder::seeded(1)
        .quiet()
        .max_time(SimTime::from(20.0))
        .build(desk(1, 5, 3));
    let id = rt.app.station_id("desk").unwrap();
    let entity = rt.app.create_entity(SimTime::ZERO);
    rt.add_event(NetworkEvent::Inject { station: id, entity }, SimTime::ZERO);

    rt.start();
    rt.dispatch_events_until(SimTime::from(3.0));
    assert_eq!(rt.sim_time(), SimTime::from(3.0));
    assert_eq!(rt.app.exited(), 1);
    assert_eq!(rt.app.station(id).in_use(), 0);

    let (network, time, _) = rt.finish().unwrap();
    assert_eq!(time, SimTime::from(3.0));

    let stats = network.station(id).stats();
    assert_eq!(stats.served_count(), 1);
    assert_eq!(stats.in_queue_at_end(), 0);
    assert_eq!(stats.total_service_requests(), 1);
    assert_eq!(stats.avg_service_time(), 3.0);
    assert_eq!(stats.avg_wait_time(), 0.0);

    let visitor = &network.exited_entities()[0];
    assert_eq!(visitor.visit_log().len(), 1);
    assert_eq!(visitor.visit_log()[0].station(), "desk");
    assert_eq!(visitor.visit_log()[0].wait_time(), Some(Duration::ZERO));
}

#[test]
fn overflow_while_server_is_busy() {
    let mut rt = Builder::seeded(1)
        .quiet()
        .max_time(SimTime::from(5000.0))
        .build(desk(1, 2, 1000));
    let id = rt.app.station_id("desk").unwrap();

    rt.start();
    // a long running prior entity occupies the only server
    admit(&mut rt, id).unwrap();
    rt.dispatch_events_until(SimTime::ZERO);
    assert_eq!(rt.app.station(id).in_use(), 1);
    assert_eq!(rt.app.station(id).state(), StationState::Active);

    admit(&mut rt, id).unwrap();
    admit(&mut rt, id).unwrap();
    let err = admit(&mut rt, id).unwrap_err();
    assert!(matches!(err, QueueError::Full { capacity: 2, .. }));
    assert_eq!(rt.app.station(id).queue_len(), 2);
    assert_eq!(rt.app.station(id).stats().rejected(), 1);

    rt.dispatch_events_until(SimTime::from(10.0));
    let (network, time, _) = rt.finish().unwrap();
    assert_eq!(time, SimTime::from(10.0));

    let stats = network.station(id).stats();
    assert_eq!(stats.served_count(), 1);
    assert_eq!(stats.in_queue_at_end(), 2);
    // both queued entities waited from 0 to 10
    assert_eq!(stats.total_wait_time(), Duration::from_secs(20));
    assert!((stats.avg_wait_time() - 20.0 / 3.0).abs() < 1e-9);
}

#[test]
fn generator_overflow_is_counted() {
    let network = Network::builder()
        .station(StationSpec::new("tiny", 1, 0, 50.0))
        .generator("flood", "tiny", 0.5)
        .build()
        .unwrap();
    let (network, _, _) = Builder::seeded(9)
        .quiet()
        .max_time(SimTime::from(100.0))
        .build(network)
        .run()
        .unwrap();

    let generator = &network.generators()[0];
    assert!(generator.generated() > 100);
    // a zero capacity queue admits nothing
    assert_eq!(generator.overflow(), generator.generated());
    assert_eq!(network.station(StationId(0)).stats().served_count(), 0);
}

#[test]
fn revisits_append_visit_records() {
    let network = Network::builder()
        .station(
            StationSpec::new("loop", 1, 100, 1.0)
                .fixed_service(Duration::from_secs(1))
                .to("loop", 0.5)
                .exit(0.5),
        )
        .keep_exited(true)
        .build()
        .unwrap();
    let mut rt = Builder::seeded(5)
        .quiet()
        .max_time(SimTime::from(1000.0))
        .build(network);
    for _ in 0..20 {
        let entity = rt.app.create_entity(SimTime::ZERO);
        rt.add_event(
            NetworkEvent::Inject {
                station: StationId(0),
                entity,
            },
            SimTime::ZERO,
        );
    }

    let (network, _, _) = rt.run().unwrap();
    assert_eq!(network.exited(), 20);
    let visits = network
        .exited_entities()
        .iter()
        .map(|e| e.visit_log().len())
        .collect::<Vec<_>>();
    assert!(visits.iter().all(|&n| n >= 1));
    assert!(visits.iter().any(|&n| n > 1));

    let total = visits.iter().sum::<usize>() as u64;
    assert_eq!(network.station(StationId(0)).stats().served_count(), total);
}
