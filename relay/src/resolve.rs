//! Recipient resolution and the delivery seam.
//!
//! The resolver maps a [`RoutingTag`] onto the ordered target list
//! discovered at startup: channel 1 is position 0 ("Left"), channel 2 is
//! position 1 ("Right"), and everything else degrades to broadcast with a
//! warning label. Out-of-range routing never drops a message.
//!
//! Delivery itself is a consumed capability behind the [`Delivery`]
//! trait. The orchestrator only ever sees opaque [`DeliveryTarget`]
//! handles and this trait, never the mechanism behind them.

use std::fmt;

use crate::routing::RoutingTag;

/// Opaque handle to one delivery destination. An ordered collection of
/// these is resolved once at startup; position 0 is the primary ("Left")
/// recipient, position 1 the secondary ("Right").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTarget(String);

impl DeliveryTarget {
    /// Wraps a discovered destination address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The destination address as understood by the delivery layer.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fire-and-forget notification capability.
///
/// Implementations must return immediately: the poll loop dispatches and
/// moves on, and its cadence may not be held hostage by slow typing.
/// Failures are the implementation's to log; there is no delivery
/// confirmation.
pub trait Delivery {
    /// Queues `text` for delivery to each of `targets`, in order.
    fn dispatch(&self, targets: &[DeliveryTarget], text: &str);
}

/// Outcome of resolving one routing tag: the targets to deliver to and a
/// human-readable description of the decision for the log.
#[derive(Debug, PartialEq, Eq)]
pub struct Resolution<'a> {
    /// Targets to deliver to, in position order.
    pub targets: &'a [DeliveryTarget],

    /// Description of the routing decision.
    pub label: String,
}

/// Maps `tag` onto the ordered target list.
///
/// Channels beyond the second (`c3`..`c5`) are grammatical but have no
/// assigned position; they broadcast with a warning, as does any channel
/// whose position is not available. Resolution never fails.
#[must_use]
pub fn resolve<'a>(tag: RoutingTag, targets: &'a [DeliveryTarget]) -> Resolution<'a> {
    match tag {
        RoutingTag::All => Resolution {
            targets,
            label: "broadcasting to all".to_string(),
        },
        RoutingTag::Channel(1) if !targets.is_empty() => Resolution {
            targets: std::slice::from_ref(&targets[0]),
            label: format!("sending to {tag} (Left)"),
        },
        RoutingTag::Channel(2) if targets.len() >= 2 => Resolution {
            targets: std::slice::from_ref(&targets[1]),
            label: format!("sending to {tag} (Right)"),
        },
        RoutingTag::Channel(_) => Resolution {
            targets,
            label: format!("warning: {tag} not found, broadcasting"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(n: usize) -> Vec<DeliveryTarget> {
        (0..n)
            .map(|i| DeliveryTarget::new(format!("dev:0.{i}")))
            .collect()
    }

    #[test]
    fn test_all_selects_every_target() {
        let t = targets(3);
        let res = resolve(RoutingTag::All, &t);
        assert_eq!(res.targets, t.as_slice());
        assert_eq!(res.label, "broadcasting to all");
    }

    #[test]
    fn test_c1_selects_position_zero() {
        let t = targets(2);
        let res = resolve(RoutingTag::Channel(1), &t);
        assert_eq!(res.targets, &t[0..1]);
        assert_eq!(res.label, "sending to c1 (Left)");
    }

    #[test]
    fn test_c2_selects_position_one() {
        let t = targets(2);
        let res = resolve(RoutingTag::Channel(2), &t);
        assert_eq!(res.targets, &t[1..2]);
        assert_eq!(res.label, "sending to c2 (Right)");
    }

    #[test]
    fn test_c2_with_single_target_falls_back_to_broadcast() {
        let t = targets(1);
        let res = resolve(RoutingTag::Channel(2), &t);
        assert_eq!(res.targets, t.as_slice());
        assert_eq!(res.label, "warning: c2 not found, broadcasting");
    }

    #[test]
    fn test_high_channels_always_broadcast() {
        // c3-c5 are grammatical but never position-mapped, even when
        // enough targets exist.
        let t = targets(5);
        for n in 3..=5 {
            let res = resolve(RoutingTag::Channel(n), &t);
            assert_eq!(res.targets, t.as_slice());
            assert_eq!(res.label, format!("warning: c{n} not found, broadcasting"));
        }
    }

    #[test]
    fn test_c1_with_no_targets_degrades_to_empty_broadcast() {
        let t = targets(0);
        let res = resolve(RoutingTag::Channel(1), &t);
        assert!(res.targets.is_empty());
        assert_eq!(res.label, "warning: c1 not found, broadcasting");
    }

    #[test]
    fn test_target_address_round_trip() {
        let target = DeliveryTarget::new("main:2.1");
        assert_eq!(target.address(), "main:2.1");
        assert_eq!(target.to_string(), "main:2.1");
    }
}
