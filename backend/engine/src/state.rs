//! The single live call attempt and the guards applied to it.
//!
//! `CallState` is plain data owned by the engine loop. Every method takes the
//! instant the deciding signal arrived, so decisions are reproducible from a
//! recorded signal sequence.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use redial_core::{CaptureSource, DialedNumber, Verdict};

/// Where an attempt is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing pending. A finished attempt keeps its dispatch markers here.
    Idle,
    Dialed,
    Connected,
    /// Triggered; termination and number resolution are running.
    Terminating,
    /// Number resolved; dispatch is running.
    Redirected,
}

#[derive(Debug, Clone)]
pub struct CallAttempt {
    pub id: u64,
    /// `None` for an attempt opened by an outcome with no prior capture, and
    /// after the attempt's dispatch has finished.
    pub number: Option<DialedNumber>,
    pub source: Option<CaptureSource>,
    pub captured_at: Instant,
    pub dispatched: bool,
    pub last_dispatch_at: Option<Instant>,
    pub went_offhook: bool,
    pub phase: Phase,
    /// Number the attempt was last redirected to.
    pub redirected_to: Option<DialedNumber>,
}

impl CallAttempt {
    fn new(id: u64, number: Option<DialedNumber>, source: Option<CaptureSource>, at: Instant) -> Self {
        Self {
            id,
            number,
            source,
            captured_at: at,
            dispatched: false,
            last_dispatch_at: None,
            went_offhook: false,
            phase: Phase::Dialed,
            redirected_to: None,
        }
    }

    fn in_cooldown(&self, at: Instant, cooldown: Duration) -> bool {
        self.dispatched
            && self
                .last_dispatch_at
                .map(|last| at.saturating_duration_since(last) < cooldown)
                .unwrap_or(false)
    }

    fn in_flight(&self) -> bool {
        matches!(self.phase, Phase::Terminating | Phase::Redirected)
    }

    fn is_number(&self, number: &DialedNumber) -> bool {
        self.number.as_ref() == Some(number) || self.redirected_to.as_ref() == Some(number)
    }
}

/// Tunables for the guards.
#[derive(Debug, Clone)]
pub struct Guards {
    pub cooldown: Duration,
    pub staleness: Duration,
    pub suppress_after_pickup: bool,
}

impl Default for Guards {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(3000),
            staleness: Duration::from_millis(30_000),
            suppress_after_pickup: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    Opened { id: u64, superseded: Option<u64> },
    /// Same number as the fresh, undispatched current attempt.
    Coalesced { id: u64 },
    /// Same number as the current attempt while it is cooling down or in flight.
    IgnoredEcho { id: u64, reason: SuppressReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    Cooldown,
    InFlight,
    PickedUp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    NotQualifying { id: Option<u64> },
    Suppressed { id: u64, reason: SuppressReason },
    /// The attempt was older than the staleness window and has been dropped.
    Stale { id: u64, age: Duration },
    Trigger {
        id: u64,
        number: Option<DialedNumber>,
        requires_termination: bool,
        anonymous: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hangup {
    /// The remote party had picked up; the attempt is gone.
    ClearedAfterPickup { id: u64 },
    /// The attempt was still ringing out; treat as an outcome.
    Unanswered { id: u64 },
    Ignored,
}

/// What is left of an attempt dropped as stale. Outcomes that keep arriving
/// for it within the cooldown are reported against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StaleMark {
    id: u64,
    captured_at: Instant,
    last_seen: Instant,
}

#[derive(Debug, Default)]
pub struct CallState {
    current: Option<CallAttempt>,
    stale: Option<StaleMark>,
    next_id: u64,
    guards: Guards,
}

impl CallState {
    pub fn new(guards: Guards) -> Self {
        Self {
            current: None,
            stale: None,
            next_id: 0,
            guards,
        }
    }

    pub fn current(&self) -> Option<&CallAttempt> {
        self.current.as_ref()
    }

    pub fn is_current(&self, id: u64) -> bool {
        self.current.as_ref().map(|a| a.id == id).unwrap_or(false)
    }

    fn open(&mut self, number: Option<DialedNumber>, source: Option<CaptureSource>, at: Instant) -> u64 {
        self.next_id += 1;
        self.stale = None;
        self.current = Some(CallAttempt::new(self.next_id, number, source, at));
        self.next_id
    }

    /// A number was captured.
    pub fn on_dialed(&mut self, number: DialedNumber, via: CaptureSource, at: Instant) -> Capture {
        if let Some(attempt) = &self.current {
            if attempt.is_number(&number) {
                if attempt.in_cooldown(at, self.guards.cooldown) {
                    return Capture::IgnoredEcho {
                        id: attempt.id,
                        reason: SuppressReason::Cooldown,
                    };
                }
                if attempt.in_flight() {
                    return Capture::IgnoredEcho {
                        id: attempt.id,
                        reason: SuppressReason::InFlight,
                    };
                }
                let fresh = at.saturating_duration_since(attempt.captured_at) <= self.guards.staleness;
                if !attempt.dispatched && attempt.phase == Phase::Dialed && fresh {
                    return Capture::Coalesced { id: attempt.id };
                }
            }
        }

        let superseded = self.current.as_ref().map(|a| a.id);
        let id = self.open(Some(number), Some(via), at);
        Capture::Opened { id, superseded }
    }

    /// The remote party picked up. Returns the attempt marked.
    pub fn on_pickup(&mut self) -> Option<u64> {
        let attempt = self.current.as_mut()?;
        if attempt.phase != Phase::Dialed {
            return None;
        }
        attempt.went_offhook = true;
        attempt.phase = Phase::Connected;
        Some(attempt.id)
    }

    /// The line went idle.
    pub fn on_hangup(&mut self) -> Hangup {
        let Some(attempt) = self.current.as_ref() else {
            return Hangup::Ignored;
        };
        match attempt.phase {
            Phase::Connected => {
                let id = attempt.id;
                self.current = None;
                Hangup::ClearedAfterPickup { id }
            }
            Phase::Dialed if attempt.number.is_some() => Hangup::Unanswered { id: attempt.id },
            _ => Hangup::Ignored,
        }
    }

    /// Apply the guards to a classified outcome observed at `at`.
    ///
    /// A trigger reserves the attempt (`dispatched`, `last_dispatch_at`) before
    /// any work is started, so racing duplicates are suppressed.
    ///
    /// With no live attempt, an outcome opens an anonymous one whose number
    /// comes from call history. A finished attempt counts as no live attempt
    /// once its cooldown has run out.
    pub fn on_outcome(&mut self, verdict: &Verdict, at: Instant) -> Decision {
        if !verdict.qualifies() {
            return Decision::NotQualifying {
                id: self.current.as_ref().map(|a| a.id),
            };
        }

        if self.current.is_none() {
            if let Some(mark) = self.stale.as_mut() {
                if at.saturating_duration_since(mark.last_seen) < self.guards.cooldown {
                    mark.last_seen = at;
                    return Decision::Stale {
                        id: mark.id,
                        age: at.saturating_duration_since(mark.captured_at),
                    };
                }
            }
        }

        let anonymous = match self.current.as_ref() {
            None => true,
            Some(attempt) => {
                attempt.phase == Phase::Idle && !attempt.in_cooldown(at, self.guards.cooldown)
            }
        };
        if anonymous {
            self.open(None, None, at);
        }
        let guards = self.guards.clone();
        let Some(attempt) = self.current.as_mut() else {
            return Decision::NotQualifying { id: None };
        };

        if attempt.in_cooldown(at, guards.cooldown) {
            return Decision::Suppressed {
                id: attempt.id,
                reason: SuppressReason::Cooldown,
            };
        }
        if attempt.in_flight() {
            return Decision::Suppressed {
                id: attempt.id,
                reason: SuppressReason::InFlight,
            };
        }
        if attempt.went_offhook && guards.suppress_after_pickup {
            return Decision::Suppressed {
                id: attempt.id,
                reason: SuppressReason::PickedUp,
            };
        }

        let age = at.saturating_duration_since(attempt.captured_at);
        if age > guards.staleness {
            let id = attempt.id;
            self.stale = Some(StaleMark {
                id,
                captured_at: attempt.captured_at,
                last_seen: at,
            });
            self.current = None;
            return Decision::Stale { id, age };
        }

        attempt.dispatched = true;
        attempt.last_dispatch_at = Some(at);
        attempt.phase = Phase::Terminating;
        Decision::Trigger {
            id: attempt.id,
            number: attempt.number.clone(),
            requires_termination: verdict.policy.requires_termination,
            anonymous,
        }
    }

    /// Termination and resolution finished for `id`. False if superseded.
    pub fn on_resolved(&mut self, id: u64, number: &DialedNumber) -> bool {
        match self.current.as_mut() {
            Some(attempt) if attempt.id == id && attempt.phase == Phase::Terminating => {
                attempt.phase = Phase::Redirected;
                attempt.redirected_to = Some(number.clone());
                true
            }
            _ => false,
        }
    }

    /// No number could be found for `id`. The reservation is kept.
    pub fn on_resolution_failed(&mut self, id: u64) -> bool {
        self.finish(id)
    }

    /// Dispatch finished (issued or exhausted) for `id`.
    pub fn on_dispatched(&mut self, id: u64) -> bool {
        self.finish(id)
    }

    fn finish(&mut self, id: u64) -> bool {
        match self.current.as_mut() {
            Some(attempt) if attempt.id == id => {
                attempt.number = None;
                attempt.phase = Phase::Idle;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redial_core::{CallOutcome, MatchKind, NumberPlan};

    fn number(raw: &str) -> DialedNumber {
        DialedNumber::parse(raw, &NumberPlan::default()).unwrap()
    }

    fn busy() -> Verdict {
        Verdict::new(CallOutcome::Busy, true, MatchKind::Structured)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn dialed_opens_attempt_and_busy_triggers() {
        let t0 = Instant::now();
        let mut state = CallState::default();
        let capture = state.on_dialed(number("89161234567"), CaptureSource::CallIntent, t0);
        assert_eq!(capture, Capture::Opened { id: 1, superseded: None });

        let decision = state.on_outcome(&busy(), t0 + ms(500));
        assert_eq!(
            decision,
            Decision::Trigger {
                id: 1,
                number: Some(number("79161234567")),
                requires_termination: true,
                anonymous: false,
            }
        );
        let attempt = state.current().unwrap();
        assert!(attempt.dispatched);
        assert_eq!(attempt.last_dispatch_at, Some(t0 + ms(500)));
        assert_eq!(attempt.phase, Phase::Terminating);
    }

    #[test]
    fn duplicate_outcome_is_suppressed() {
        let t0 = Instant::now();
        let mut state = CallState::default();
        state.on_dialed(number("15550100"), CaptureSource::OutgoingNumber, t0);
        assert!(matches!(state.on_outcome(&busy(), t0 + ms(100)), Decision::Trigger { .. }));
        assert_eq!(
            state.on_outcome(&busy(), t0 + ms(300)),
            Decision::Suppressed { id: 1, reason: SuppressReason::Cooldown }
        );
    }

    #[test]
    fn in_flight_attempt_is_not_retriggered_after_cooldown() {
        let t0 = Instant::now();
        let mut state = CallState::default();
        state.on_dialed(number("15550100"), CaptureSource::OutgoingNumber, t0);
        state.on_outcome(&busy(), t0);
        assert_eq!(
            state.on_outcome(&busy(), t0 + ms(5000)),
            Decision::Suppressed { id: 1, reason: SuppressReason::InFlight }
        );
    }

    #[test]
    fn stale_attempt_is_discarded() {
        let t0 = Instant::now();
        let mut state = CallState::default();
        state.on_dialed(number("15550100"), CaptureSource::OutgoingNumber, t0);
        let decision = state.on_outcome(&busy(), t0 + ms(30_001));
        assert!(matches!(decision, Decision::Stale { id: 1, .. }));
        assert!(state.current().is_none());
    }

    #[test]
    fn repeated_outcomes_for_stale_attempt_stay_stale() {
        let t0 = Instant::now();
        let mut state = CallState::default();
        state.on_dialed(number("15550100"), CaptureSource::OutgoingNumber, t0);
        state.on_outcome(&busy(), t0 + ms(30_001));

        assert_eq!(
            state.on_outcome(&busy(), t0 + ms(30_201)),
            Decision::Stale { id: 1, age: ms(30_201) }
        );
        // Each repeat extends the window.
        assert_eq!(
            state.on_outcome(&busy(), t0 + ms(33_000)),
            Decision::Stale { id: 1, age: ms(33_000) }
        );
        assert!(state.current().is_none());

        // A quiet cooldown later an outcome is a new call.
        assert!(matches!(
            state.on_outcome(&busy(), t0 + ms(36_500)),
            Decision::Trigger { id: 2, anonymous: true, .. }
        ));
    }

    #[test]
    fn capture_after_stale_attempt_opens_normally() {
        let t0 = Instant::now();
        let mut state = CallState::default();
        state.on_dialed(number("15550100"), CaptureSource::OutgoingNumber, t0);
        state.on_outcome(&busy(), t0 + ms(30_001));

        state.on_dialed(number("15550199"), CaptureSource::CallIntent, t0 + ms(30_100));
        assert!(matches!(
            state.on_outcome(&busy(), t0 + ms(30_300)),
            Decision::Trigger { id: 2, anonymous: false, .. }
        ));
    }

    #[test]
    fn pickup_suppresses_and_hangup_clears() {
        let t0 = Instant::now();
        let mut state = CallState::default();
        state.on_dialed(number("15550100"), CaptureSource::OutgoingNumber, t0);
        assert_eq!(state.on_pickup(), Some(1));
        assert_eq!(
            state.on_outcome(&busy(), t0 + ms(800)),
            Decision::Suppressed { id: 1, reason: SuppressReason::PickedUp }
        );
        assert_eq!(state.on_hangup(), Hangup::ClearedAfterPickup { id: 1 });
        assert!(state.current().is_none());
    }

    #[test]
    fn pickup_suppression_can_be_disabled() {
        let t0 = Instant::now();
        let mut state = CallState::new(Guards {
            suppress_after_pickup: false,
            ..Guards::default()
        });
        state.on_dialed(number("15550100"), CaptureSource::OutgoingNumber, t0);
        state.on_pickup();
        assert!(matches!(state.on_outcome(&busy(), t0 + ms(800)), Decision::Trigger { .. }));
    }

    #[test]
    fn hangup_without_pickup_is_unanswered() {
        let t0 = Instant::now();
        let mut state = CallState::default();
        assert_eq!(state.on_hangup(), Hangup::Ignored);
        state.on_dialed(number("15550100"), CaptureSource::OutgoingNumber, t0);
        assert_eq!(state.on_hangup(), Hangup::Unanswered { id: 1 });
    }

    #[test]
    fn echo_capture_is_coalesced() {
        let t0 = Instant::now();
        let mut state = CallState::default();
        state.on_dialed(number("15550100"), CaptureSource::CallIntent, t0);
        assert_eq!(
            state.on_dialed(number("1 555 0100"), CaptureSource::OutgoingNumber, t0 + ms(50)),
            Capture::Coalesced { id: 1 }
        );
        assert_eq!(
            state.on_dialed(number("15550199"), CaptureSource::OutgoingNumber, t0 + ms(60)),
            Capture::Opened { id: 2, superseded: Some(1) }
        );
    }

    #[test]
    fn echo_after_dispatch_does_not_rearm() {
        let t0 = Instant::now();
        let mut state = CallState::default();
        let n = number("15550100");
        state.on_dialed(n.clone(), CaptureSource::CallIntent, t0);
        state.on_outcome(&busy(), t0 + ms(100));
        assert!(state.on_resolved(1, &n));
        assert!(state.on_dispatched(1));

        assert_eq!(
            state.on_dialed(n.clone(), CaptureSource::OutgoingNumber, t0 + ms(900)),
            Capture::IgnoredEcho { id: 1, reason: SuppressReason::Cooldown }
        );
        assert_eq!(
            state.on_outcome(&busy(), t0 + ms(1200)),
            Decision::Suppressed { id: 1, reason: SuppressReason::Cooldown }
        );

        // Once the cooldown has run out the same number is a new call.
        assert!(matches!(
            state.on_dialed(n, CaptureSource::CallIntent, t0 + ms(4000)),
            Capture::Opened { id: 2, .. }
        ));
    }

    #[test]
    fn echo_while_in_flight_is_ignored() {
        let t0 = Instant::now();
        let mut state = CallState::default();
        let n = number("15550100");
        state.on_dialed(n.clone(), CaptureSource::CallIntent, t0);
        state.on_outcome(&busy(), t0);
        assert_eq!(
            state.on_dialed(n, CaptureSource::OutgoingNumber, t0 + ms(5000)),
            Capture::IgnoredEcho { id: 1, reason: SuppressReason::InFlight }
        );
    }

    #[test]
    fn outcome_after_finished_attempt_opens_fresh_one() {
        let t0 = Instant::now();
        let mut state = CallState::default();
        let n = number("15550100");
        state.on_dialed(n.clone(), CaptureSource::CallIntent, t0);
        state.on_outcome(&busy(), t0 + ms(100));
        state.on_resolved(1, &n);
        state.on_dispatched(1);

        assert_eq!(
            state.on_outcome(&busy(), t0 + ms(40_000)),
            Decision::Trigger {
                id: 2,
                number: None,
                requires_termination: true,
                anonymous: true,
            }
        );
        assert_eq!(state.current().unwrap().captured_at, t0 + ms(40_000));
    }

    #[test]
    fn outcome_without_capture_opens_anonymous_attempt() {
        let t0 = Instant::now();
        let mut state = CallState::default();
        let decision = state.on_outcome(&busy(), t0);
        assert_eq!(
            decision,
            Decision::Trigger {
                id: 1,
                number: None,
                requires_termination: true,
                anonymous: true,
            }
        );
        assert_eq!(
            state.on_outcome(&busy(), t0 + ms(200)),
            Decision::Suppressed { id: 1, reason: SuppressReason::Cooldown }
        );
    }

    #[test]
    fn superseded_results_are_rejected() {
        let t0 = Instant::now();
        let mut state = CallState::default();
        state.on_outcome(&busy(), t0);
        state.on_dialed(number("15550100"), CaptureSource::CallIntent, t0 + ms(10));
        assert!(!state.on_resolved(1, &number("15550199")));
        assert!(!state.on_dispatched(1));
        assert!(state.is_current(2));
    }

    #[test]
    fn non_failure_outcome_does_not_qualify() {
        let mut state = CallState::default();
        let verdict = Verdict::new(CallOutcome::Unknown, false, MatchKind::Structured);
        assert_eq!(state.on_outcome(&verdict, Instant::now()), Decision::NotQualifying { id: None });
        assert!(state.current().is_none());
    }
}
