//! Circuit Graph Implementation
//!
//! Parts and nets are nodes of a petgraph graph; every pin connection is an
//! edge from the part to the net carrying the pin number. The graph owns
//! reference numbering and guarantees that a pin sits on at most one net.

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use super::schema::*;
use crate::symbols::Symbol;

#[derive(Debug, Error)]
pub enum CircuitError {
    #[error("Duplicate reference designator: {0}")]
    DuplicateReference(String),
    #[error("Part {reference} has no pin '{pin}'")]
    PinNotFound { reference: String, pin: String },
}

/// Handle to a part inside a [`Circuit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartId(NodeIndex);

/// Handle to a net inside a [`Circuit`]; stays valid when the net is merged
/// into another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetId(NodeIndex);

/// Node type in the circuit graph
#[derive(Debug, Clone)]
pub enum CircuitNode {
    Part(Part),
    Net(Net),
}

impl CircuitNode {
    pub fn as_part(&self) -> Option<&Part> {
        match self {
            CircuitNode::Part(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_net(&self) -> Option<&Net> {
        match self {
            CircuitNode::Net(n) => Some(n),
            _ => None,
        }
    }

    fn as_part_mut(&mut self) -> Option<&mut Part> {
        match self {
            CircuitNode::Part(p) => Some(p),
            _ => None,
        }
    }

    fn as_net_mut(&mut self) -> Option<&mut Net> {
        match self {
            CircuitNode::Net(n) => Some(n),
            _ => None,
        }
    }
}

/// Edge type in the circuit graph - represents a pin connection
#[derive(Debug, Clone)]
pub struct CircuitEdge {
    pub pin_number: String,
}

/// Parts and nets plus the connections between them
#[derive(Debug, Clone)]
pub struct Circuit {
    graph: StableDiGraph<CircuitNode, CircuitEdge>,

    /// reference -> node index
    part_indices: HashMap<String, NodeIndex>,

    /// net name -> node index
    net_indices: HashMap<String, NodeIndex>,

    /// (part node, pin number) -> net node
    pin_nets: HashMap<(NodeIndex, String), NodeIndex>,

    /// Nets removed by a merge, pointing at the net that absorbed them
    merged: HashMap<NodeIndex, NodeIndex>,

    /// Last number handed out per reference prefix
    ref_counters: HashMap<String, u32>,

    pub metadata: CircuitMetadata,
}

impl Circuit {
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            part_indices: HashMap::new(),
            net_indices: HashMap::new(),
            pin_nets: HashMap::new(),
            merged: HashMap::new(),
            ref_counters: HashMap::new(),
            metadata: CircuitMetadata::default(),
        }
    }

    /// Instantiate `symbol` with the next free reference for its prefix.
    pub fn add_part(&mut self, symbol: &Symbol, footprint: Option<&str>) -> PartId {
        let reference = self.next_reference(&symbol.reference_prefix);
        let mut part = Part::from_symbol(symbol, reference.clone());
        part.footprint = footprint.map(str::to_string);
        let idx = self.graph.add_node(CircuitNode::Part(part));
        self.part_indices.insert(reference, idx);
        PartId(idx)
    }

    /// Instantiate `symbol` under an explicit reference designator.
    pub fn add_part_with_ref(
        &mut self,
        symbol: &Symbol,
        footprint: Option<&str>,
        reference: &str,
    ) -> Result<PartId, CircuitError> {
        let mut part = Part::from_symbol(symbol, reference);
        part.footprint = footprint.map(str::to_string);
        self.insert_part(part)
    }

    /// Insert a fully built part; its reference must be unused.
    pub fn insert_part(&mut self, part: Part) -> Result<PartId, CircuitError> {
        if self.part_indices.contains_key(&part.reference) {
            return Err(CircuitError::DuplicateReference(part.reference));
        }
        let reference = part.reference.clone();
        let idx = self.graph.add_node(CircuitNode::Part(part));
        self.part_indices.insert(reference, idx);
        Ok(PartId(idx))
    }

    fn next_reference(&mut self, prefix: &str) -> String {
        let counter = self.ref_counters.entry(prefix.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{}{}", prefix, counter);
            if !self.part_indices.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    pub fn part(&self, id: PartId) -> &Part {
        self.graph
            .node_weight(id.0)
            .and_then(CircuitNode::as_part)
            .expect("PartId always refers to a part node")
    }

    /// Reference designator of a part, e.g. `SW3`.
    pub fn reference(&self, id: PartId) -> &str {
        &self.part(id).reference
    }

    pub fn set_value(&mut self, id: PartId, value: impl Into<String>) {
        if let Some(part) = self.graph.node_weight_mut(id.0).and_then(CircuitNode::as_part_mut) {
            part.value = value.into();
        }
    }

    /// Get or create the explicitly named net `name`.
    pub fn net(&mut self, name: &str) -> NetId {
        if let Some(&idx) = self.net_indices.get(name) {
            if let Some(net) = self.graph.node_weight_mut(idx).and_then(CircuitNode::as_net_mut) {
                net.implicit = false;
            }
            return NetId(idx);
        }
        NetId(self.add_net_node(Net::new(name)))
    }

    fn add_net_node(&mut self, net: Net) -> NodeIndex {
        let name = net.name.clone();
        let idx = self.graph.add_node(CircuitNode::Net(net));
        self.net_indices.insert(name, idx);
        idx
    }

    fn resolve_net(&self, id: NetId) -> NodeIndex {
        let mut idx = id.0;
        while let Some(&next) = self.merged.get(&idx) {
            idx = next;
        }
        idx
    }

    /// Current name of a net.
    pub fn net_name(&self, id: NetId) -> &str {
        self.graph
            .node_weight(self.resolve_net(id))
            .and_then(CircuitNode::as_net)
            .map(|n| n.name.as_str())
            .unwrap_or_default()
    }

    fn pin_numbers(&self, part: PartId, selector: &str) -> Result<Vec<String>, CircuitError> {
        let p = self.part(part);
        let numbers: Vec<String> = p
            .resolve_pins(selector)
            .into_iter()
            .map(|pin| pin.number.clone())
            .collect();
        if numbers.is_empty() {
            return Err(CircuitError::PinNotFound {
                reference: p.reference.clone(),
                pin: selector.to_string(),
            });
        }
        Ok(numbers)
    }

    /// Connect the pin(s) selected by number or name to `net`.
    pub fn connect(&mut self, net: NetId, part: PartId, selector: &str) -> Result<(), CircuitError> {
        for number in self.pin_numbers(part, selector)? {
            let net_idx = self.resolve_net(net);
            self.attach(net_idx, part.0, number);
        }
        Ok(())
    }

    /// Connect several pin selectors of one part to `net`.
    pub fn connect_all(
        &mut self,
        net: NetId,
        part: PartId,
        selectors: &[&str],
    ) -> Result<(), CircuitError> {
        for selector in selectors {
            self.connect(net, part, selector)?;
        }
        Ok(())
    }

    /// Wire two pins together. Reuses a net either pin is already on,
    /// otherwise creates an implicit `Net-(<ref>-Pad<pin>)` net.
    pub fn join(
        &mut self,
        a: (PartId, &str),
        b: (PartId, &str),
    ) -> Result<NetId, CircuitError> {
        let a_pin = self.pin_numbers(a.0, a.1)?.remove(0);
        let b_pin = self.pin_numbers(b.0, b.1)?.remove(0);

        let existing = self
            .pin_nets
            .get(&(a.0 .0, a_pin.clone()))
            .or_else(|| self.pin_nets.get(&(b.0 .0, b_pin.clone())))
            .copied();

        let net_idx = match existing {
            Some(idx) => idx,
            None => {
                let name = self.unique_net_name(format!("Net-({}-Pad{})", self.reference(a.0), a_pin));
                self.add_net_node(Net::implicit(name))
            }
        };

        self.attach(net_idx, a.0 .0, a_pin);
        let net_idx = self.resolve_net(NetId(net_idx));
        self.attach(net_idx, b.0 .0, b_pin);
        Ok(NetId(self.resolve_net(NetId(net_idx))))
    }

    fn unique_net_name(&self, base: String) -> String {
        if !self.net_indices.contains_key(&base) {
            return base;
        }
        (1..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !self.net_indices.contains_key(candidate))
            .unwrap_or(base)
    }

    fn attach(&mut self, net_idx: NodeIndex, part_idx: NodeIndex, pin_number: String) {
        let key = (part_idx, pin_number.clone());
        match self.pin_nets.get(&key).copied() {
            Some(current) if current == net_idx => {}
            Some(current) => {
                self.merge(net_idx, current);
            }
            None => {
                self.graph.add_edge(part_idx, net_idx, CircuitEdge { pin_number });
                self.pin_nets.insert(key, net_idx);
            }
        }
    }

    /// Merge two nets. An explicit name survives over an implicit one; with
    /// two explicit names `target` survives.
    fn merge(&mut self, target: NodeIndex, other: NodeIndex) -> NodeIndex {
        let is_implicit = |graph: &StableDiGraph<CircuitNode, CircuitEdge>, idx: NodeIndex| {
            graph
                .node_weight(idx)
                .and_then(CircuitNode::as_net)
                .map(|n| n.implicit)
                .unwrap_or(true)
        };
        let target_implicit = is_implicit(&self.graph, target);
        let other_implicit = is_implicit(&self.graph, other);
        let (keep, drop) = if target_implicit && !other_implicit {
            (other, target)
        } else {
            (target, other)
        };

        let mut moved: Vec<(EdgeIndex, NodeIndex, String)> = self
            .graph
            .edges_directed(drop, Direction::Incoming)
            .map(|e| (e.id(), e.source(), e.weight().pin_number.clone()))
            .collect();
        moved.reverse();

        // The dropped node stays in the graph without edges so that its index
        // is never handed out again; `merged` redirects old handles.
        let dropped_name = self.graph[drop].as_net().map(|n| n.name.clone()).unwrap_or_default();
        if !target_implicit && !other_implicit {
            tracing::warn!(
                "Merging net {} into {}, the name {} is dropped",
                dropped_name,
                self.net_name(NetId(keep)),
                dropped_name
            );
        }
        self.net_indices.remove(&dropped_name);
        self.merged.insert(drop, keep);

        for (edge, part_idx, pin_number) in moved {
            self.graph.remove_edge(edge);
            self.graph.add_edge(part_idx, keep, CircuitEdge { pin_number: pin_number.clone() });
            self.pin_nets.insert((part_idx, pin_number), keep);
        }
        keep
    }

    /// Get a part by reference designator
    pub fn get_part(&self, reference: &str) -> Option<&Part> {
        self.part_indices
            .get(reference)
            .and_then(|&idx| self.graph.node_weight(idx))
            .and_then(CircuitNode::as_part)
    }

    /// Get a net by name
    pub fn get_net(&self, name: &str) -> Option<&Net> {
        self.net_indices
            .get(name)
            .and_then(|&idx| self.graph.node_weight(idx))
            .and_then(CircuitNode::as_net)
    }

    /// All parts, in creation order
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.graph.node_weights().filter_map(CircuitNode::as_part)
    }

    /// All nets, including ones nothing is connected to yet
    pub fn nets(&self) -> impl Iterator<Item = &Net> {
        self.graph
            .node_indices()
            .filter(|idx| !self.merged.contains_key(idx))
            .filter_map(|idx| self.graph[idx].as_net())
    }

    /// Connections of a net, in connection order
    pub fn connections(&self, net_name: &str) -> Vec<NetConnection> {
        let Some(&net_idx) = self.net_indices.get(net_name) else {
            return Vec::new();
        };

        let mut connections: Vec<NetConnection> = self
            .graph
            .edges_directed(net_idx, Direction::Incoming)
            .filter_map(|edge| {
                self.graph
                    .node_weight(edge.source())
                    .and_then(CircuitNode::as_part)
                    .map(|p| NetConnection::new(&p.reference, &edge.weight().pin_number))
            })
            .collect();
        // petgraph walks incoming edges newest first
        connections.reverse();
        connections
    }

    /// Parts and pins attached to a net
    pub fn pins_on_net(&self, net_name: &str) -> Vec<(&Part, &Pin)> {
        self.connections(net_name)
            .into_iter()
            .filter_map(|c| {
                let part = self.get_part(&c.reference)?;
                let pin = part.get_pin(&c.pin_number)?;
                Some((part, pin))
            })
            .collect()
    }

    /// Net a pin is connected to, if any
    pub fn net_of_pin(&self, reference: &str, pin_number: &str) -> Option<&Net> {
        let part_idx = self.part_indices.get(reference)?;
        let net_idx = self.pin_nets.get(&(*part_idx, pin_number.to_string()))?;
        self.graph.node_weight(*net_idx).and_then(CircuitNode::as_net)
    }

    /// Get statistics about the circuit
    pub fn stats(&self) -> CircuitStats {
        let count = |kind: ComponentType| self.parts().filter(|p| p.component_type() == kind).count();
        let connected_nets = self
            .net_indices
            .values()
            .filter(|&&idx| self.graph.edges_directed(idx, Direction::Incoming).next().is_some())
            .count();

        CircuitStats {
            part_count: self.part_indices.len(),
            net_count: connected_nets,
            connection_count: self.graph.edge_count(),
            switch_count: count(ComponentType::Switch),
            diode_count: count(ComponentType::Diode),
            stabilizer_count: count(ComponentType::Stabilizer),
        }
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about a circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitStats {
    pub part_count: usize,
    /// Nets with at least one connection
    pub net_count: usize,
    pub connection_count: usize,
    pub switch_count: usize,
    pub diode_count: usize,
    pub stabilizer_count: usize,
}
