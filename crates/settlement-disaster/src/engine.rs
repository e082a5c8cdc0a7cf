//! The DisasterEvent state machine: SCHEDULED -> WARNING -> IMPACT
//! -> AFTERMATH -> RESOLVED.
//!
//! Each `advance_*` function is a pure state transition: given the
//! current event and the clock, it returns what changed. The caller
//! persists the result and emits the named outbound event.

use chrono::{DateTime, Duration, Utc};
use settlement_types::{DisasterEvent, DisasterStatus};

use crate::error::DisasterError;

/// The emergency-repair window AFTERMATH opens.
pub const AFTERMATH_REPAIR_WINDOW: Duration = Duration::hours(48);
/// How long AFTERMATH lasts before the disaster resolves.
pub const AFTERMATH_TO_RESOLVED: Duration = Duration::days(30);
/// How long before `scheduled_at` the one-time `disaster-imminent` event
/// fires.
pub const IMMINENT_LEAD_TIME: Duration = Duration::minutes(30);

/// What an `advance_*` call found needs to happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No transition is due yet.
    None,
    /// Move to WARNING; emit `disaster-warning`.
    EnterWarning,
    /// Still in WARNING, but the one-time imminent threshold was
    /// crossed; emit `disaster-imminent`.
    ImminentWarning,
    /// Move to IMPACT; emit `disaster-impact-start`.
    EnterImpact,
    /// Move to AFTERMATH; emit `disaster-impact-end` then
    /// `disaster-aftermath`.
    EnterAftermath,
    /// Move to RESOLVED; emit `disaster-resolved`.
    EnterResolved,
}

/// Evaluate `event` against `now` and return the transition due, if any.
///
/// Does not mutate `event` -- the caller applies the transition (setting
/// timestamps and status) atomically with its own persistence.
pub fn evaluate(event: &DisasterEvent, now: DateTime<Utc>) -> Transition {
    match event.status {
        DisasterStatus::Scheduled => {
            let warning_opens = event.scheduled_at
                - Duration::seconds(i64::from(event.warning_time_seconds));
            if now >= warning_opens {
                Transition::EnterWarning
            } else {
                Transition::None
            }
        }
        DisasterStatus::Warning => {
            if now >= event.scheduled_at {
                Transition::EnterImpact
            } else if !event.imminent_warning_issued && now >= event.scheduled_at - IMMINENT_LEAD_TIME {
                Transition::ImminentWarning
            } else {
                Transition::None
            }
        }
        DisasterStatus::Impact => {
            let Some(started) = event.impact_started_at else {
                return Transition::None;
            };
            let ends = started + Duration::seconds(i64::from(event.impact_duration_seconds));
            if now >= ends {
                Transition::EnterAftermath
            } else {
                Transition::None
            }
        }
        DisasterStatus::Aftermath => {
            let Some(ended) = event.impact_ended_at else {
                return Transition::None;
            };
            if now >= ended + AFTERMATH_TO_RESOLVED {
                Transition::EnterResolved
            } else {
                Transition::None
            }
        }
        DisasterStatus::Resolved => Transition::None,
    }
}

/// Apply a transition to `event` in place.
///
/// # Errors
///
/// Returns [`DisasterError::IllegalTransition`] if the transition's
/// target status does not legally follow the event's current one
/// (defense-in-depth; [`evaluate`] should never produce an illegal one).
pub fn apply(event: &mut DisasterEvent, transition: Transition, now: DateTime<Utc>) -> Result<(), DisasterError> {
    let target = match transition {
        Transition::None => return Ok(()),
        Transition::EnterWarning => DisasterStatus::Warning,
        Transition::ImminentWarning => {
            event.imminent_warning_issued = true;
            return Ok(());
        }
        Transition::EnterImpact => DisasterStatus::Impact,
        Transition::EnterAftermath => DisasterStatus::Aftermath,
        Transition::EnterResolved => DisasterStatus::Resolved,
    };

    if !event.status.can_advance_to(target) {
        return Err(DisasterError::IllegalTransition {
            from: event.status,
            to: target,
        });
    }

    match transition {
        Transition::EnterWarning => event.warning_started_at = Some(now),
        Transition::EnterImpact => event.impact_started_at = Some(now),
        Transition::EnterAftermath => event.impact_ended_at = Some(now),
        Transition::EnterResolved | Transition::None | Transition::ImminentWarning => {}
    }
    event.status = target;
    Ok(())
}

/// Resilience points gained by a settlement that survives a disaster to
/// RESOLVED, scaled by severity -- worse disasters survived are worth
/// more.
pub const fn resilience_gain(severity: settlement_types::SeverityLevel) -> u8 {
    use settlement_types::SeverityLevel::{Catastrophic, Major, Mild, Moderate};
    match severity {
        Mild => 1,
        Moderate => 3,
        Major => 6,
        Catastrophic => 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlement_types::{BiomeKind, DisasterType, SeverityLevel, WorldId};

    fn event(status: DisasterStatus, scheduled_at: DateTime<Utc>) -> DisasterEvent {
        DisasterEvent {
            id: settlement_types::DisasterId::new(),
            world_id: WorldId::new(),
            disaster_type: DisasterType::Drought,
            severity: 60,
            severity_level: SeverityLevel::Major,
            affected_region: None,
            affected_biomes: vec![BiomeKind::Grassland],
            scheduled_at,
            warning_time_seconds: 7200,
            impact_duration_seconds: 3600,
            status,
            warning_started_at: None,
            impact_started_at: None,
            impact_ended_at: None,
            imminent_warning_issued: false,
        }
    }

    #[test]
    fn scheduled_enters_warning_at_the_window_open() {
        let now = Utc::now();
        let ev = event(DisasterStatus::Scheduled, now + Duration::seconds(7200));
        assert_eq!(evaluate(&ev, now), Transition::EnterWarning);
    }

    #[test]
    fn warning_fires_imminent_once_then_enters_impact() {
        let now = Utc::now();
        let mut ev = event(DisasterStatus::Warning, now + Duration::minutes(20));
        assert_eq!(evaluate(&ev, now), Transition::ImminentWarning);
        apply(&mut ev, Transition::ImminentWarning, now).unwrap();
        assert!(ev.imminent_warning_issued);

        let later = now + Duration::minutes(20);
        assert_eq!(evaluate(&ev, later), Transition::EnterImpact);
    }

    #[test]
    fn impact_enters_aftermath_after_the_duration_elapses() {
        let now = Utc::now();
        let mut ev = event(DisasterStatus::Impact, now);
        ev.impact_started_at = Some(now);
        assert_eq!(evaluate(&ev, now + Duration::seconds(3600)), Transition::EnterAftermath);
    }

    #[test]
    fn apply_rejects_illegal_transition() {
        let now = Utc::now();
        let mut ev = event(DisasterStatus::Scheduled, now);
        assert!(apply(&mut ev, Transition::EnterImpact, now).is_err());
    }

    #[test]
    fn resilience_scales_with_severity() {
        assert!(resilience_gain(SeverityLevel::Catastrophic) > resilience_gain(SeverityLevel::Mild));
    }
}
