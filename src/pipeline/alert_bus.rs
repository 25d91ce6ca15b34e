// src/pipeline/alert_bus.rs
//
// Decoupled alert queue. The dispatcher publishes fire-and-forget; the
// external sink drains on its own schedule and its timing never gates
// frame processing.

use crate::types::Alert;
use std::collections::VecDeque;
use tracing::warn;

pub struct AlertBus {
    alerts: VecDeque<Alert>,
    max_pending: usize,
}

impl AlertBus {
    pub fn new(max_pending: usize) -> Self {
        Self {
            alerts: VecDeque::with_capacity(max_pending),
            max_pending,
        }
    }

    pub fn publish(&mut self, alert: Alert) {
        if self.alerts.len() >= self.max_pending {
            warn!(
                "alert bus full ({} pending), dropping oldest",
                self.max_pending
            );
            self.alerts.pop_front();
        }
        self.alerts.push_back(alert);
    }

    pub fn drain(&mut self) -> Vec<Alert> {
        self.alerts.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.alerts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModuleKind;

    fn alert(t: f64) -> Alert {
        Alert::new("cam", ModuleKind::Intrusion, 1, t)
    }

    #[test]
    fn test_publish_and_drain_in_order() {
        let mut bus = AlertBus::new(8);
        bus.publish(alert(1.0));
        bus.publish(alert(2.0));
        assert_eq!(bus.pending_count(), 2);

        let drained = bus.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].detected_time, 1.0);
        assert_eq!(drained[1].detected_time, 2.0);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut bus = AlertBus::new(2);
        bus.publish(alert(1.0));
        bus.publish(alert(2.0));
        bus.publish(alert(3.0));

        let drained = bus.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].detected_time, 2.0);
        assert_eq!(drained[1].detected_time, 3.0);
    }
}
