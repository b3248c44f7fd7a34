//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Rebind engine for the managed-object graph."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;
use trellis_persistence::ObjectKind;

/// How an object enters or leaves the live manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManagementTransitionMode {
    /// Created in this process outside of any rebind.
    Creating,
    /// First seen in a master rebind.
    RebindingCreating,
    /// Loaded for inspection on a hot proxy.
    RebindingReadOnly,
    /// Previously read-only (or already master) and now owned by this node.
    RebindingBecomingPrimary,
    /// Previously owned by this node and now read-only.
    RebindingNoLongerPrimary,
    /// Previously known, absent from the persisted state.
    RebindingDestroyed,
}

impl ManagementTransitionMode {
    /// True when the object ends up read-only.
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            ManagementTransitionMode::RebindingReadOnly
                | ManagementTransitionMode::RebindingNoLongerPrimary
        )
    }

    pub fn is_destroying(self) -> bool {
        self == ManagementTransitionMode::RebindingDestroyed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ManagementTransitionMode::Creating => "creating",
            ManagementTransitionMode::RebindingCreating => "rebinding-creating",
            ManagementTransitionMode::RebindingReadOnly => "rebinding-read-only",
            ManagementTransitionMode::RebindingBecomingPrimary => "rebinding-becoming-primary",
            ManagementTransitionMode::RebindingNoLongerPrimary => "rebinding-no-longer-primary",
            ManagementTransitionMode::RebindingDestroyed => "rebinding-destroyed",
        }
    }
}

impl fmt::Display for ManagementTransitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chooses the transition applied to each location and entity in the final phase.
pub trait TransitionModeStrategy: Send + Sync {
    fn compute(
        &self,
        kind: ObjectKind,
        id: &str,
        previous: Option<ManagementTransitionMode>,
        is_read_only: bool,
    ) -> ManagementTransitionMode;
}

/// Standard transition table.
#[derive(Debug, Clone)]
pub struct DefaultTransitionModes {
    node_id: String,
}

impl DefaultTransitionModes {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
        }
    }
}

impl TransitionModeStrategy for DefaultTransitionModes {
    fn compute(
        &self,
        kind: ObjectKind,
        id: &str,
        previous: Option<ManagementTransitionMode>,
        is_read_only: bool,
    ) -> ManagementTransitionMode {
        let Some(previous) = previous.filter(|mode| !mode.is_destroying()) else {
            return if is_read_only {
                ManagementTransitionMode::RebindingReadOnly
            } else {
                ManagementTransitionMode::RebindingCreating
            };
        };
        match (previous.is_read_only(), is_read_only) {
            (true, true) => ManagementTransitionMode::RebindingReadOnly,
            (true, false) => ManagementTransitionMode::RebindingBecomingPrimary,
            (false, true) => ManagementTransitionMode::RebindingNoLongerPrimary,
            (false, false) => {
                warn!(
                    node = %self.node_id,
                    %kind,
                    id,
                    "rebinding as master when already master (discouraged); may have stale references"
                );
                ManagementTransitionMode::RebindingBecomingPrimary
            }
        }
    }
}
