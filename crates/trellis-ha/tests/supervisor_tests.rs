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

use trellis_common::{HaConfig, ManagementMode};
use trellis_ha::{FailoverReason, HaSupervisor, NodeContext};

fn node(id: &str, priority: u32) -> NodeContext {
    let config = HaConfig {
        priority,
        heartbeat_interval: Duration::from_millis(10),
        watchdog_timeout: Duration::from_millis(20),
    };
    NodeContext::from_config(id, &config)
}

#[test]
fn startup_elects_highest_priority_live_node() {
    let supervisor = HaSupervisor::new("cluster-a");
    supervisor.register(node("beta", 1));
    supervisor.register(node("alpha", 0));

    let now = Instant::now();
    supervisor.heartbeat("alpha", now);
    supervisor.heartbeat("beta", now);

    let event = supervisor.evaluate(now).expect("startup election");
    assert_eq!(event.promoted, "alpha");
    assert_eq!(event.reason, FailoverReason::Startup);
    assert_eq!(supervisor.mode_of("alpha"), ManagementMode::Master);
    assert_eq!(supervisor.mode_of("beta"), ManagementMode::HotStandby);
    assert!(supervisor.evaluate(now).is_none());
}

#[test]
fn standby_is_promoted_when_master_goes_silent() {
    let supervisor = HaSupervisor::new("cluster-a");
    supervisor.register(node("primary", 0));
    supervisor.register(node("standby", 1));

    let now = Instant::now();
    supervisor.heartbeat("primary", now);
    supervisor.heartbeat("standby", now);
    supervisor.evaluate(now);

    let later = now + Duration::from_millis(50);
    supervisor.heartbeat("standby", later);
    let event = supervisor
        .evaluate(later)
        .expect("promotion when master heartbeat missing");
    assert_eq!(event.promoted, "standby");
    assert_eq!(event.previous.as_deref(), Some("primary"));
    assert_eq!(event.reason, FailoverReason::HeartbeatTimeout);
    assert!(supervisor.is_master("standby"));
    assert_eq!(supervisor.mode_of("primary"), ManagementMode::HotStandby);
}

#[test]
fn no_promotion_without_live_standby() {
    let supervisor = HaSupervisor::new("cluster-a");
    supervisor.register(node("only", 0));
    assert!(supervisor.evaluate(Instant::now()).is_none());
    assert!(supervisor.master().is_none());
}

#[test]
fn manual_promotion_replaces_master() {
    let supervisor = HaSupervisor::new("cluster-a");
    supervisor.register(node("a", 0));
    supervisor.register(node("b", 5));
    let now = Instant::now();
    supervisor.heartbeat("a", now);
    supervisor.evaluate(now);

    let event = supervisor.promote("b").unwrap();
    assert_eq!(event.reason, FailoverReason::Manual);
    assert!(supervisor.is_master("b"));
    assert!(!supervisor.is_master("a"));
    assert!(supervisor.promote("missing").is_none());

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["reason"], "manual");
}
