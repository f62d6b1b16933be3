use crate::core::tireset::Compound;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    OnTrack,
    PitRequested,
    PitStandstill,
}

/// StateHandler tracks the pit stop state machine of a car:
/// `OnTrack -> PitRequested -> PitStandstill -> OnTrack`.
///
/// Requested and standstill are two states of one enum, hence a car can never be both in the pit
/// and waiting for it. The compound to fit is staged on request and handed out when the
/// standstill ends.
#[derive(Debug, Clone)]
pub struct StateHandler {
    state: State,
    next_compound: Option<Compound>,
    t_standstill: f64,
    t_standstill_target: f64,
}

impl Default for StateHandler {
    fn default() -> Self {
        StateHandler {
            state: State::OnTrack,
            next_compound: None,
            t_standstill: 0.0,
            t_standstill_target: 0.0,
        }
    }
}

impl StateHandler {
    pub fn state(&self) -> State {
        self.state
    }

    pub fn in_pit(&self) -> bool {
        self.state == State::PitStandstill
    }

    pub fn pit_requested(&self) -> bool {
        self.state == State::PitRequested
    }

    /// pit_timer returns the time spent in the current standstill, 0.0 outside the pit.
    pub fn pit_timer(&self) -> f64 {
        self.t_standstill
    }

    pub fn next_compound(&self) -> Option<Compound> {
        self.next_compound
    }

    /// request_pit stages a tire change. Only possible while on track.
    pub fn request_pit(&mut self, compound: Compound) -> bool {
        if self.state != State::OnTrack {
            return false;
        }

        self.state = State::PitRequested;
        self.next_compound = Some(compound);
        true
    }

    /// cancel_pit withdraws a pending request. Not possible once the car stands in the pit.
    pub fn cancel_pit(&mut self) -> bool {
        if self.state != State::PitRequested {
            return false;
        }

        self.state = State::OnTrack;
        self.next_compound = None;
        true
    }

    /// act_pit_standstill turns a pending request into a standstill of the given duration.
    /// Returns false if no pit stop was requested.
    pub fn act_pit_standstill(&mut self, t_standstill_target: f64) -> bool {
        if self.state != State::PitRequested {
            return false;
        }

        self.state = State::PitStandstill;
        self.t_standstill = 0.0;
        self.t_standstill_target = t_standstill_target;
        true
    }

    /// increment_t_standstill adds the time step to the standstill timer and returns true once
    /// the target duration is reached.
    pub fn increment_t_standstill(&mut self, timestep_size: f64) -> bool {
        if self.state != State::PitStandstill {
            return false;
        }

        self.t_standstill += timestep_size;
        self.t_standstill >= self.t_standstill_target
    }

    /// deact_pit_standstill ends the standstill and returns the staged compound.
    pub fn deact_pit_standstill(&mut self) -> Option<Compound> {
        if self.state != State::PitStandstill {
            return None;
        }

        self.state = State::OnTrack;
        self.t_standstill = 0.0;
        self.t_standstill_target = 0.0;
        self.next_compound.take()
    }

    /// reset clears any pit state, e.g. after jumping through the race.
    pub fn reset(&mut self) {
        *self = StateHandler::default();
    }
}
