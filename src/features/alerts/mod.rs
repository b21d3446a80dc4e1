//! Edge-triggered up/down alerting.
//!
//! Each target carries a single [`AlertState`]. Availability below the threshold
//! takes an `Up` target `Down`; availability at or above it brings a `Down`
//! target back `Up`. Anything else leaves the state alone and emits nothing, so a
//! target that stays down produces exactly one alert.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    #[default]
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Transition {
    WentDown,
    Recovered,
}

impl AlertState {
    pub fn is_down(self) -> bool {
        self == AlertState::Down
    }

    pub fn step(self, availability: f64, threshold: f64) -> (AlertState, Option<Transition>) {
        match self {
            AlertState::Up if availability < threshold => {
                (AlertState::Down, Some(Transition::WentDown))
            }
            AlertState::Down if availability >= threshold => {
                (AlertState::Up, Some(Transition::Recovered))
            }
            state => (state, None),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub target: String,
    pub availability: f64,
    pub is_down: bool,
    pub timeframe_end: SystemTime,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_down { "down" } else { "up" };
        write!(
            f,
            "{} is {status}. availability={:.3}",
            self.target, self.availability
        )
    }
}

/// Runs one transition for `target`. A window without data (`None`) leaves the
/// state untouched.
pub fn evaluate(
    state: &mut AlertState,
    target: &str,
    availability: Option<f64>,
    threshold: f64,
    now: SystemTime,
) -> Option<Alert> {
    let availability = availability?;
    let (next, transition) = state.step(availability, threshold);
    *state = next;
    transition.map(|transition| Alert {
        target: target.to_string(),
        availability,
        is_down: transition == Transition::WentDown,
        timeframe_end: now,
    })
}
