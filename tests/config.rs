use qnet::prelude::*;
use std::path::PathBuf;

fn demo(name: &str) -> SimulationConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join(name);
    SimulationConfig::from_path(path).unwrap()
}

#[test]
fn museum_demo() {
    let config = demo("museum.yml");
    assert_eq!(config.stations.len(), 5);

    let report = simulate(&config).unwrap();
    assert_eq!(report.end_time, config.duration);
    assert_eq!(report.stations.len(), 5);
    assert!(report.events > 0);

    let reception = report.station("reception").unwrap();
    assert!(reception.served_count > 0);
    assert!(reception.utilization > 0.0 && reception.utilization <= 100.0);
    assert!(report.exited > 0);

    let visitors = report.generator("visitors").unwrap();
    assert_eq!(visitors.target, "reception");
    assert!(visitors.generated >= reception.served_count);
}

#[test]
fn factory_demo() {
    let config = demo("factory.yml");
    assert_eq!(config.utilization, UtilizationMode::Analytic);

    let report = Simulation::new(config).quiet().run().unwrap();
    for name in ["dispatcher", "production_line_a", "production_line_b", "qa_check"] {
        let row = report.station(name).unwrap();
        assert!(row.served_count > 0, "{name} served nothing");
        assert!(row.avg_service_time >= 1.0, "{name}: {}", row.avg_service_time);
    }
    assert!(report.to_string().contains("qa_check"));
}

#[test]
fn seeded_simulations_are_reproducible() {
    let config = demo("museum.yml");
    assert!(config.seed.is_some());
    assert_eq!(simulate(&config).unwrap(), simulate(&config).unwrap());
}

#[test]
fn setup_errors_abort_the_run() {
    let mut config = demo("factory.yml");
    config.stations[3].go_to.pop();

    let err = simulate(&config).unwrap_err();
    assert!(matches!(
        err,
        SimulationError::Config(ConfigError::Routing { ref station, .. }) if station == "qa_check"
    ));

    let mut config = demo("factory.yml");
    config.generators[0].target = "warehouse".to_string();
    let err = simulate(&config).unwrap_err();
    assert!(err.to_string().contains("warehouse"));
}

#[test]
fn unrepresentable_times_fail_at_setup() {
    let mut config = demo("museum.yml");
    config.duration = 1.0e30;
    let err = simulate(&config).unwrap_err();
    assert!(matches!(
        err,
        SimulationError::Config(ConfigError::InvalidDuration(_))
    ));

    for (sample_interval, timer_horizon) in [(Some(1e-10), None), (Some(0.25), Some(1e-10))] {
        let mut config = demo("museum.yml");
        config.duration = 5.0;
        config.sample_interval = sample_interval;
        config.timer_horizon = timer_horizon;
        assert!(matches!(
            simulate(&config),
            Err(SimulationError::Config(ConfigError::InvalidInterval { .. }))
        ));
    }
}
