//! ---
//! trellis_section: "07-resilience-fault-tolerance"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Master election and failover for management nodes."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use std::cmp::Ordering;
use std::time::Instant;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};
use trellis_common::ManagementMode;

use crate::node::{HeartbeatStatus, NodeContext, NodeRuntimeState};

#[derive(Debug, Default)]
struct SupervisorInner {
    master: Option<String>,
    nodes: IndexMap<String, NodeRuntimeState>,
}

/// Tracks node liveness within a management cluster and elects the master.
#[derive(Debug)]
pub struct HaSupervisor {
    cluster: String,
    inner: Mutex<SupervisorInner>,
}

impl HaSupervisor {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            inner: Mutex::new(SupervisorInner::default()),
        }
    }

    /// Add or refresh a node. Registration never changes the master.
    pub fn register(&self, context: NodeContext) {
        let mut inner = self.inner.lock();
        let node_id = context.node_id.clone();
        match inner.nodes.get_mut(&node_id) {
            Some(state) => state.context = context,
            None => {
                inner
                    .nodes
                    .insert(node_id.clone(), NodeRuntimeState::new(context));
            }
        }
        debug!(cluster = %self.cluster, node = %node_id, "registered node");
    }

    pub fn heartbeat(&self, node_id: &str, now: Instant) -> HeartbeatStatus {
        let mut inner = self.inner.lock();
        let is_master = inner.master.as_deref() == Some(node_id);
        let Some(state) = inner.nodes.get_mut(node_id) else {
            warn!(cluster = %self.cluster, node_id, "heartbeat from unknown node");
            return HeartbeatStatus::Missing(Default::default());
        };
        let status = state.record_heartbeat(now);
        if !is_master {
            debug!(cluster = %self.cluster, node = node_id, "heartbeat from standby");
        }
        status
    }

    pub fn is_master(&self, node_id: &str) -> bool {
        self.inner.lock().master.as_deref() == Some(node_id)
    }

    pub fn master(&self) -> Option<String> {
        self.inner.lock().master.clone()
    }

    /// Management mode a node should rebind in given the current election.
    pub fn mode_of(&self, node_id: &str) -> ManagementMode {
        if self.is_master(node_id) {
            ManagementMode::Master
        } else {
            ManagementMode::HotStandby
        }
    }

    /// Check the master's watchdog and elect a replacement when needed.
    pub fn evaluate(&self, now: Instant) -> Option<FailoverEvent> {
        let mut inner = self.inner.lock();
        let Some(master_id) = inner.master.clone() else {
            return self.promote_next_locked(&mut inner, now, FailoverReason::Startup, None);
        };

        let Some(master) = inner.nodes.get_mut(&master_id) else {
            return self.promote_next_locked(
                &mut inner,
                now,
                FailoverReason::Missing,
                Some(master_id.as_str()),
            );
        };

        match master.evaluate(now) {
            HeartbeatStatus::Missing(_) => {
                warn!(cluster = %self.cluster, node = %master_id, "master heartbeat missing; initiating failover");
                master.is_master = false;
                self.promote_next_locked(
                    &mut inner,
                    now,
                    FailoverReason::HeartbeatTimeout,
                    Some(master_id.as_str()),
                )
            }
            HeartbeatStatus::Late(delay) => {
                debug!(cluster = %self.cluster, node = %master_id, delay_us = delay.as_micros(), "late master heartbeat");
                None
            }
            HeartbeatStatus::OnTime => None,
        }
    }

    /// Operator-requested promotion of a specific node.
    pub fn promote(&self, node_id: &str) -> Option<FailoverEvent> {
        let mut inner = self.inner.lock();
        if !inner.nodes.contains_key(node_id) {
            warn!(cluster = %self.cluster, node_id, "cannot promote unknown node");
            return None;
        }
        Some(self.activate_locked(&mut inner, node_id, FailoverReason::Manual))
    }

    fn promote_next_locked(
        &self,
        inner: &mut SupervisorInner,
        now: Instant,
        reason: FailoverReason,
        exclude: Option<&str>,
    ) -> Option<FailoverEvent> {
        let Some(next_id) = inner
            .nodes
            .values()
            .filter(|state| {
                !state.is_master
                    && exclude.map_or(true, |ex| state.context.node_id != ex)
                    && state.is_alive(now)
            })
            .min_by(|a, b| priority_cmp(&a.context, &b.context))
            .map(|state| state.context.node_id.clone())
        else {
            warn!(cluster = %self.cluster, "no live standby available for promotion");
            inner.master = None;
            return None;
        };
        Some(self.activate_locked(inner, &next_id, reason))
    }

    fn activate_locked(
        &self,
        inner: &mut SupervisorInner,
        node_id: &str,
        reason: FailoverReason,
    ) -> FailoverEvent {
        let previous = inner.master.replace(node_id.to_owned());
        if let Some(previous_id) = previous.as_deref() {
            if let Some(state) = inner.nodes.get_mut(previous_id) {
                state.is_master = false;
            }
        }
        if let Some(state) = inner.nodes.get_mut(node_id) {
            state.is_master = true;
        }
        let event = FailoverEvent {
            cluster: self.cluster.clone(),
            promoted: node_id.to_owned(),
            previous,
            triggered_at: Utc::now(),
            reason,
        };
        info!(cluster = %event.cluster, node = %event.promoted, previous = ?event.previous, ?reason, "node promoted to master");
        event
    }
}

fn priority_cmp(a: &NodeContext, b: &NodeContext) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| a.node_id.cmp(&b.node_id))
}

/// Emitted whenever mastership moves to a node.
#[derive(Debug, Clone, Serialize)]
pub struct FailoverEvent {
    pub cluster: String,
    pub promoted: String,
    pub previous: Option<String>,
    pub triggered_at: DateTime<Utc>,
    pub reason: FailoverReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailoverReason {
    Startup,
    Manual,
    HeartbeatTimeout,
    Missing,
}
