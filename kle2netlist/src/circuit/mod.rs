//! In-memory circuit: parts instantiated from symbols, named nets and the
//! pin connections between them.

pub mod graph;
pub mod schema;

pub use graph::{Circuit, CircuitError, CircuitStats, NetId, PartId};
pub use schema::{
    CircuitMetadata, ComponentType, ElectricalType, Net, NetConnection, Part, Pin,
};
