//! The placed design handed to the router.
//!
//! Nets arrive already bound to fabric nodes: each has a driver pin node and
//! one or more sink pin nodes. Clock and static nets are routed by other
//! algorithms; the router only reserves their pins.

use serde::{Deserialize, Serialize};
use strand_fabric::NodeId;

/// What kind of signal a net carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NetClass {
    /// A regular signal, routed by this router.
    #[default]
    Signal,
    /// A clock net, routed by the clock-tree router.
    Clock,
    /// A constant (VCC/GND) net.
    Static,
}

/// One net of the placed design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignNet {
    /// Net name, used in diagnostics.
    pub name: String,
    /// Signal class.
    #[serde(default)]
    pub class: NetClass,
    /// The driver pin node.
    pub driver: NodeId,
    /// A second pin that can drive the same signal when `driver` is taken.
    #[serde(default)]
    pub alternate_driver: Option<NodeId>,
    /// The sink pin nodes.
    pub sinks: Vec<NodeId>,
}

impl DesignNet {
    /// Creates a signal net.
    pub fn signal(name: impl Into<String>, driver: NodeId, sinks: Vec<NodeId>) -> Self {
        Self {
            name: name.into(),
            class: NetClass::Signal,
            driver,
            alternate_driver: None,
            sinks,
        }
    }

    /// Sets the alternate driver.
    pub fn with_alternate_driver(mut self, node: NodeId) -> Self {
        self.alternate_driver = Some(node);
        self
    }

    /// Sets the net class.
    pub fn with_class(mut self, class: NetClass) -> Self {
        self.class = class;
        self
    }

    /// Every pin node of the net.
    pub fn pins(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(self.driver)
            .chain(self.alternate_driver)
            .chain(self.sinks.iter().copied())
    }
}

/// The routing input: nets plus fabric nodes already consumed elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteDesign {
    /// All nets, routed or not.
    pub nets: Vec<DesignNet>,
    /// Nodes no routed net may use.
    #[serde(default)]
    pub reserved: Vec<NodeId>,
}

impl RouteDesign {
    /// Creates an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a net and returns its index.
    pub fn add_net(&mut self, net: DesignNet) -> usize {
        self.nets.push(net);
        self.nets.len() - 1
    }

    /// Marks a node as consumed.
    pub fn reserve(&mut self, node: NodeId) {
        self.reserved.push(node);
    }

    /// Every reserved node: the explicit list plus the pins of excluded nets.
    pub fn reserved_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.reserved.iter().copied().chain(
            self.nets
                .iter()
                .filter(|n| n.class != NetClass::Signal)
                .flat_map(DesignNet::pins),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excluded_net_pins_are_reserved() {
        let mut design = RouteDesign::new();
        design.add_net(DesignNet::signal(
            "data",
            NodeId::from_raw(0),
            vec![NodeId::from_raw(1)],
        ));
        design.add_net(
            DesignNet::signal("clk", NodeId::from_raw(5), vec![NodeId::from_raw(6)])
                .with_class(NetClass::Clock),
        );
        design.reserve(NodeId::from_raw(9));

        let reserved: Vec<u32> = design.reserved_nodes().map(NodeId::as_raw).collect();
        assert_eq!(reserved, vec![9, 5, 6]);
    }

    #[test]
    fn pins_include_alternate() {
        let net = DesignNet::signal("n", NodeId::from_raw(0), vec![NodeId::from_raw(2)])
            .with_alternate_driver(NodeId::from_raw(1));
        let pins: Vec<u32> = net.pins().map(NodeId::as_raw).collect();
        assert_eq!(pins, vec![0, 1, 2]);
    }

    #[test]
    fn serde_defaults_class_and_alternate() {
        let json = r#"{"name":"n","driver":0,"sinks":[1,2]}"#;
        let net: DesignNet = serde_json::from_str(json).unwrap();
        assert_eq!(net.class, NetClass::Signal);
        assert_eq!(net.alternate_driver, None);
        assert_eq!(net.sinks.len(), 2);
    }
}
