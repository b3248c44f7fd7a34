//! ---
//! trellis_section: "07-resilience-fault-tolerance"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Master election and failover for management nodes."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use std::time::{Duration, Instant};

use trellis_common::HaConfig;

/// Grace added to the heartbeat interval before a heartbeat counts as late.
const LATE_GRACE: Duration = Duration::from_millis(50);

/// Identity and timing parameters of one management node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContext {
    pub node_id: String,
    /// Lower values are preferred when electing a master.
    pub priority: u32,
    pub heartbeat_interval: Duration,
    pub watchdog_timeout: Duration,
}

impl NodeContext {
    pub fn from_config(node_id: &str, config: &HaConfig) -> Self {
        Self {
            node_id: node_id.to_owned(),
            priority: config.priority,
            heartbeat_interval: config.heartbeat_interval,
            watchdog_timeout: config.watchdog_timeout,
        }
    }
}

/// Liveness bookkeeping kept by the supervisor for each node.
#[derive(Debug, Clone)]
pub struct NodeRuntimeState {
    pub context: NodeContext,
    last_heartbeat: Option<Instant>,
    pub is_master: bool,
    missed: u32,
}

impl NodeRuntimeState {
    pub fn new(context: NodeContext) -> Self {
        Self {
            context,
            last_heartbeat: None,
            is_master: false,
            missed: 0,
        }
    }

    pub fn record_heartbeat(&mut self, now: Instant) -> HeartbeatStatus {
        let status = match self.last_heartbeat {
            Some(previous) => {
                let delta = now.saturating_duration_since(previous);
                if delta <= self.context.heartbeat_interval + LATE_GRACE {
                    HeartbeatStatus::OnTime
                } else {
                    HeartbeatStatus::Late(delta - self.context.heartbeat_interval)
                }
            }
            None => HeartbeatStatus::OnTime,
        };
        self.last_heartbeat = Some(now);
        self.missed = 0;
        status
    }

    /// Check the watchdog; a node that never sent a heartbeat is missing.
    pub fn evaluate(&mut self, now: Instant) -> HeartbeatStatus {
        match self.last_heartbeat {
            Some(previous) => {
                let delta = now.saturating_duration_since(previous);
                if delta > self.context.watchdog_timeout {
                    self.missed += 1;
                    HeartbeatStatus::Missing(delta - self.context.watchdog_timeout)
                } else {
                    HeartbeatStatus::OnTime
                }
            }
            None => {
                self.missed += 1;
                HeartbeatStatus::Missing(self.context.watchdog_timeout)
            }
        }
    }

    /// Whether the node has heartbeated within its watchdog timeout.
    pub fn is_alive(&self, now: Instant) -> bool {
        self.last_heartbeat
            .is_some_and(|previous| now.saturating_duration_since(previous) <= self.context.watchdog_timeout)
    }

    pub fn missed_evaluations(&self) -> u32 {
        self.missed
    }
}

/// Result of a heartbeat evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatStatus {
    OnTime,
    Late(Duration),
    Missing(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> NodeContext {
        NodeContext {
            node_id: "n1".into(),
            priority: 0,
            heartbeat_interval: Duration::from_millis(10),
            watchdog_timeout: Duration::from_millis(40),
        }
    }

    #[test]
    fn late_and_missing_heartbeats() {
        let mut state = NodeRuntimeState::new(context());
        let start = Instant::now();
        assert_eq!(state.record_heartbeat(start), HeartbeatStatus::OnTime);
        assert!(matches!(
            state.record_heartbeat(start + Duration::from_millis(100)),
            HeartbeatStatus::Late(_)
        ));
        assert!(matches!(
            state.evaluate(start + Duration::from_millis(200)),
            HeartbeatStatus::Missing(_)
        ));
        assert_eq!(state.missed_evaluations(), 1);
        assert!(!state.is_alive(start + Duration::from_millis(200)));
    }

    #[test]
    fn silent_node_is_missing() {
        let mut state = NodeRuntimeState::new(context());
        assert!(matches!(
            state.evaluate(Instant::now()),
            HeartbeatStatus::Missing(_)
        ));
    }
}
