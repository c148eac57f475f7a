#![allow(clippy::needless_doctest_main)]
//!
//! Discrete event simulation of queue-server networks.
//!
//! qnet models networks of stations, each a bounded FIFO queue in front
//! of a pool of identical servers. Entities enter the network through
//! generators, wait for a free server, get served for a random amount
//! of time and are then routed to the next station by a weighted random
//! draw, until they leave through an exit.
//!
//! # Running a simulation
//!
//! The simplest way is to describe the network in a document and hand it
//! to the driver.
//!
//! ```
//! use qnet::config::SimulationConfig;
//!
//! let config = SimulationConfig::from_yaml("
//! duration: 60
//! seed: 42
//! generators:
//!   - { name: visitors, target: reception, mean_interarrival_time: 2.0 }
//! stations:
//!   - name: reception
//!     max_servers: 2
//!     max_queue_size: 10
//!     mean_service_time: 3.0
//!     go_to:
//!       - { name: hallway, probability: 0.8 }
//!       - { name: exit, probability: 0.2 }
//!   - name: hallway
//!     max_servers: 5
//!     max_queue_size: 30
//!     mean_service_time: 4.0
//! ").unwrap();
//!
//! let report = qnet::simulate(&config).unwrap();
//! for row in &report.stations {
//!     println!("{row}");
//! }
//! ```
//!
//! # Building a network by hand
//!
//! A [`Network`](network::Network) is an [`Application`](runtime::Application)
//! of the event [`Runtime`](runtime::Runtime). It can be assembled with a
//! [`NetworkBuilder`](network::NetworkBuilder) and run with a seeded runtime,
//! which allows injecting entities and stepping through events manually.
//!
//! ```
//! use qnet::prelude::*;
//!
//! fn main() {
//!     let network = Network::builder()
//!         .station(StationSpec::new("desk", 1, 5, 3.0).fixed_service(Duration::from_secs(3)))
//!         .build()
//!         .unwrap();
//!
//!     let mut rt = Builder::seeded(7).quiet().max_time(SimTime::from(10.0)).build(network);
//!     let desk = rt.app.station_id("desk").unwrap();
//!     let entity = rt.app.create_entity(SimTime::ZERO);
//!     rt.add_event(NetworkEvent::Inject { station: desk, entity }, SimTime::ZERO);
//!
//!     let (network, end, _) = rt.run().unwrap();
//!     assert_eq!(end, SimTime::from(10.0));
//!     assert_eq!(network.exited(), 1);
//! }
//! ```
//!
//! # Logging
//!
//! All components log through [`tracing`](::tracing). Call
//! [`init`](crate::tracing::init) to install a subscriber that prefixes each message
//! with the simulation time.
//!

pub mod config;
pub mod network;
pub mod prelude;
pub mod runtime;
pub mod station;
pub mod stats;
pub mod time;
pub mod tracing;

mod driver;
pub use self::driver::*;
