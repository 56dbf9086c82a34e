//! Sub-level arbitration
//!
//! A sub-level is a region with its own origin. At most one region is ever
//! fully active: switching to a new target always deactivates the old
//! current first, and only once the host confirms it hidden does the new
//! region claim the georeference origin and begin loading. Host load/unload
//! is asynchronous and may take several ticks; every transition step is
//! guarded by idempotent state checks rather than queuing.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::core::coordinates::georeference::Georeference;
use crate::core::ellipsoid::Cartographic;

/// Identifier of a registered sub-level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubLevelId(pub u32);

/// A registered region: its own origin, a load radius, and an enabled flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubLevel {
    pub id: SubLevelId,
    pub name: String,
    pub origin: Cartographic,
    /// Meters from the origin within which this region wants to be active.
    pub load_radius: f64,
    pub enabled: bool,
}

/// Lifecycle state of a registered region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubLevelState {
    Inactive,
    /// Becoming active: origin claimed, load/show issued, completion pending.
    Target,
    /// Fully active.
    Current,
}

/// Host seam for level streaming.
///
/// `set_level_visible` begins an asynchronous load/show or unload/hide;
/// `is_level_shown` reports the host's currently observed state. A host may
/// take any number of ticks between the two.
pub trait LevelStreaming {
    fn set_level_visible(&mut self, id: SubLevelId, visible: bool);
    fn is_level_shown(&self, id: SubLevelId) -> bool;
}

/// A streaming host whose loads and unloads complete immediately.
/// Useful for tools and tests; real hosts stream over multiple ticks.
#[derive(Debug, Default)]
pub struct InstantLevelStreaming {
    shown: HashSet<SubLevelId>,
}

impl InstantLevelStreaming {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LevelStreaming for InstantLevelStreaming {
    fn set_level_visible(&mut self, id: SubLevelId, visible: bool) {
        debug!(?id, visible, "instant level visibility change");
        if visible {
            self.shown.insert(id);
        } else {
            self.shown.remove(&id);
        }
    }

    fn is_level_shown(&self, id: SubLevelId) -> bool {
        self.shown.contains(&id)
    }
}

/// One observable step of a region transition, recorded for diagnostics and
/// ordering assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStep {
    /// Unload/hide issued for a region.
    Deactivate(SubLevelId),
    /// The georeference origin was moved to a region's origin.
    SetOrigin(SubLevelId),
    /// Load/show issued for a region.
    Activate(SubLevelId),
}

const TRANSITION_LOG_LIMIT: usize = 100;

/// Arbitrates which registered sub-level is active.
#[derive(Debug, Default)]
pub struct SubLevelSwitcher {
    levels: Vec<SubLevel>,
    current: Option<SubLevelId>,
    target: Option<SubLevelId>,
    /// Region whose activation (origin claim + show) has been issued but
    /// not yet observed complete.
    activating: Option<SubLevelId>,
    /// Region whose deactivation has been issued but not yet observed
    /// complete; prevents re-issuing the hide every tick.
    deactivation_issued: Option<SubLevelId>,
    transition_log: Vec<TransitionStep>,
}

impl SubLevelSwitcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered regions, in registration order.
    pub fn levels(&self) -> &[SubLevel] {
        &self.levels
    }

    pub fn level(&self, id: SubLevelId) -> Option<&SubLevel> {
        self.levels.iter().find(|level| level.id == id)
    }

    pub fn is_registered(&self, id: SubLevelId) -> bool {
        self.level(id).is_some()
    }

    /// The fully active region, if any.
    pub fn current(&self) -> Option<SubLevelId> {
        self.current
    }

    /// The region that should become active, if any.
    pub fn target(&self) -> Option<SubLevelId> {
        self.target
    }

    /// Lifecycle state of a region.
    pub fn state_of(&self, id: SubLevelId) -> SubLevelState {
        if self.current == Some(id) {
            SubLevelState::Current
        } else if self.target == Some(id) || self.activating == Some(id) {
            SubLevelState::Target
        } else {
            SubLevelState::Inactive
        }
    }

    /// Recorded transition steps (bounded history, oldest dropped first).
    pub fn transition_log(&self) -> &[TransitionStep] {
        &self.transition_log
    }

    pub fn clear_transition_log(&mut self) {
        self.transition_log.clear();
    }

    /// Add a region to the registered set.
    ///
    /// When nothing is current or targeted and the host already shows the
    /// region (out-of-band visibility, e.g. an editor toggle), it is adopted
    /// as the target.
    pub fn register_sub_level(&mut self, level: SubLevel, host: &dyn LevelStreaming) {
        if let Some(existing) = self.levels.iter_mut().find(|l| l.id == level.id) {
            warn!(id = ?level.id, "sub-level re-registered, replacing entry");
            *existing = level;
            return;
        }

        if self.current.is_none()
            && self.target.is_none()
            && level.enabled
            && host.is_level_shown(level.id)
        {
            debug!(id = ?level.id, "adopting already-shown sub-level as target");
            self.target = Some(level.id);
        }

        self.levels.push(level);
    }

    /// Remove a region. A current or in-flight region is implicitly
    /// deactivated first.
    pub fn unregister_sub_level(
        &mut self,
        id: SubLevelId,
        georeference: &mut Georeference,
        host: &mut dyn LevelStreaming,
    ) {
        if !self.is_registered(id) {
            warn!(?id, "unregister for unknown sub-level");
            return;
        }

        if self.target == Some(id) {
            self.target = None;
        }
        if self.activating == Some(id) || self.current == Some(id) {
            host.set_level_visible(id, false);
            self.log(TransitionStep::Deactivate(id));
            self.activating = None;
            self.current = None;
        }
        if self.deactivation_issued == Some(id) {
            self.deactivation_issued = None;
        }

        self.levels.retain(|level| level.id != id);
        self.update(georeference, host);
    }

    /// Request that `target` (or nothing) be the active region.
    ///
    /// Idempotent: requesting the already-targeted region only re-drives
    /// any in-flight transition. Unknown ids are rejected with no state
    /// change.
    pub fn set_target_sub_level(
        &mut self,
        target: Option<SubLevelId>,
        georeference: &mut Georeference,
        host: &mut dyn LevelStreaming,
    ) {
        if let Some(id) = target {
            if !self.is_registered(id) {
                error!(?id, "cannot target an unregistered sub-level");
                return;
            }
        }

        self.target = target;
        self.update(georeference, host);
    }

    /// Per-tick driver: advances in-flight transitions, then runs the
    /// defensive visibility sweep.
    pub fn tick(&mut self, georeference: &mut Georeference, host: &mut dyn LevelStreaming) {
        self.update(georeference, host);
        self.enforce_single_visible(host);
    }

    /// Defensive invariant pass: any region the host shows that is neither
    /// current nor mid-activation is forcibly hidden. Covers out-of-band
    /// visibility toggles; returns the number of corrections issued.
    pub fn enforce_single_visible(&mut self, host: &mut dyn LevelStreaming) -> usize {
        let allowed = self.current.or(self.activating);
        let mut corrected = 0;
        for level in &self.levels {
            if Some(level.id) != allowed && host.is_level_shown(level.id) {
                warn!(id = ?level.id, "sub-level visible outside arbitration, hiding");
                host.set_level_visible(level.id, false);
                corrected += 1;
            }
        }
        corrected
    }

    /// Flip a region's enabled flag. Disabling the current or targeted
    /// region retires it.
    pub fn set_level_enabled(
        &mut self,
        id: SubLevelId,
        enabled: bool,
        georeference: &mut Georeference,
        host: &mut dyn LevelStreaming,
    ) {
        let Some(level) = self.levels.iter_mut().find(|level| level.id == id) else {
            warn!(?id, "enable toggle for unknown sub-level");
            return;
        };
        level.enabled = enabled;

        if !enabled && (self.target == Some(id) || self.current == Some(id)) {
            self.target = None;
        }
        self.update(georeference, host);
    }

    /// Advance the state machine one step. Deactivation of the outgoing
    /// region always completes before the incoming region claims the
    /// origin.
    fn update(&mut self, georeference: &mut Georeference, host: &mut dyn LevelStreaming) {
        // Retire a current that is no longer the target.
        if let Some(current) = self.current {
            if self.target != Some(current) {
                if host.is_level_shown(current) {
                    if self.deactivation_issued != Some(current) {
                        host.set_level_visible(current, false);
                        self.log(TransitionStep::Deactivate(current));
                        self.deactivation_issued = Some(current);
                    }
                    if host.is_level_shown(current) {
                        // Unload still in flight; nothing may activate yet.
                        return;
                    }
                }
                self.current = None;
                self.deactivation_issued = None;
            }
        }

        // A current region the host no longer shows (a stale hide completing
        // after a retarget back, or an out-of-band toggle) must go through
        // activation again.
        if let Some(current) = self.current {
            if self.target == Some(current) && !host.is_level_shown(current) {
                self.current = None;
                self.deactivation_issued = None;
            }
        }

        // Retire a stale in-flight activation whose target moved on.
        if let Some(stale) = self.activating {
            if self.target != Some(stale) {
                if host.is_level_shown(stale) {
                    if self.deactivation_issued != Some(stale) {
                        host.set_level_visible(stale, false);
                        self.log(TransitionStep::Deactivate(stale));
                        self.deactivation_issued = Some(stale);
                    }
                    if host.is_level_shown(stale) {
                        return;
                    }
                }
                self.activating = None;
                self.deactivation_issued = None;
            }
        }

        // Begin or complete activating the target.
        if self.current.is_none() {
            if let Some(target) = self.target {
                let (enabled, origin) = match self.level(target) {
                    Some(level) => (level.enabled, level.origin),
                    None => {
                        error!(?target, "targeted sub-level disappeared from registry");
                        self.target = None;
                        return;
                    }
                };
                if !enabled {
                    warn!(?target, "targeted sub-level is disabled, clearing target");
                    self.target = None;
                    return;
                }

                if self.activating != Some(target) {
                    georeference.set_origin_cartographic(origin);
                    self.log(TransitionStep::SetOrigin(target));
                    host.set_level_visible(target, true);
                    self.log(TransitionStep::Activate(target));
                    self.activating = Some(target);
                }

                if host.is_level_shown(target) {
                    self.current = Some(target);
                    self.activating = None;
                }
            }
        }
    }

    fn log(&mut self, step: TransitionStep) {
        self.transition_log.push(step);
        if self.transition_log.len() > TRANSITION_LOG_LIMIT {
            self.transition_log.drain(..TRANSITION_LOG_LIMIT / 2);
        }
    }
}
