//!
//! Convenience re-export of common members.
//!

//
// # Runtime
//

pub use crate::runtime::Application;
pub use crate::runtime::Builder;
pub use crate::runtime::Event;
pub use crate::runtime::EventHandle;
pub use crate::runtime::EventLifecycle;
pub use crate::runtime::EventSink;
pub use crate::runtime::Runtime;
pub use crate::runtime::RuntimeError;
pub use crate::runtime::RuntimeLimit;

pub use crate::time::Duration;
pub use crate::time::SimTime;

pub use crate::stats::Statistic;
pub use crate::stats::StdDev;

//
// # Stations
//

pub use crate::station::Entity;
pub use crate::station::EntityId;
pub use crate::station::QueueError;
pub use crate::station::RoutingError;
pub use crate::station::RoutingPolicy;
pub use crate::station::ServiceProfile;
pub use crate::station::Station;
pub use crate::station::StationEvent;
pub use crate::station::StationId;
pub use crate::station::StationState;
pub use crate::station::UtilizationMode;

//
// # Networks
//

pub use crate::network::Network;
pub use crate::network::NetworkBuilder;
pub use crate::network::NetworkEvent;
pub use crate::network::Report;
pub use crate::network::StationSpec;

pub use crate::config::ConfigError;
pub use crate::config::SimulationConfig;

pub use crate::simulate;
pub use crate::Simulation;
pub use crate::SimulationError;
