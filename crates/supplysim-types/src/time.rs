//! Simulated time: [`GameTime`], [`TickInstant`], and the game [`Stage`].
//!
//! Game time is a `(day, time, is_working)` triple. `time` counts ticks
//! within the working day, `is_working` flips to `false` once the day's
//! last tick has fired, and `day` only moves when the clock is explicitly
//! advanced. The clock itself lives in `supplysim-core`; these are the
//! plain value types every component records.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A simulated timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct GameTime {
    /// Day number. Day 0 is the pre-game state; play starts on day 1.
    pub day: u32,
    /// Tick within the working day, `0..day_length`.
    pub time: u32,
    /// Whether the working day is still running.
    pub is_working: bool,
}

impl GameTime {
    /// The game time before the first day has started.
    pub const INITIAL: Self = Self {
        day: 0,
        time: 0,
        is_working: false,
    };

    /// Build a working-day game time.
    pub const fn working(day: u32, time: u32) -> Self {
        Self {
            day,
            time,
            is_working: true,
        }
    }

    /// The addressable instant (`day D time T`) of this game time.
    pub const fn instant(self) -> TickInstant {
        TickInstant {
            day: self.day,
            time: self.time,
        }
    }
}

impl Default for GameTime {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl core::fmt::Display for GameTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_working {
            write!(f, "day {} time {}", self.day, self.time)
        } else {
            write!(f, "day {} time {} (off work)", self.day, self.time)
        }
    }
}

/// A uniquely addressable tick: the key for one-shot scheduled effects.
///
/// Ordered by day, then by time within the day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct TickInstant {
    /// Day number.
    pub day: u32,
    /// Tick within the day.
    pub time: u32,
}

impl core::fmt::Display for TickInstant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "day {} time {}", self.day, self.time)
    }
}

/// The stage of a game. Stages only move forward and `End` is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum Stage {
    /// Components built from configuration, nothing prepared yet.
    Constructed,
    /// Players are preparing (seeding balances, registering goods).
    Prepare,
    /// Everything is ready; waiting for the game to start.
    Ready,
    /// Days are being played.
    Start,
    /// The last day is over; results are final.
    Final,
    /// The game is closed.
    End,
}

impl Stage {
    /// The fixed successor table. Returns `None` for the terminal stage.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Constructed => Some(Self::Prepare),
            Self::Prepare => Some(Self::Ready),
            Self::Ready => Some(Self::Start),
            Self::Start => Some(Self::Final),
            Self::Final => Some(Self::End),
            Self::End => None,
        }
    }
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Constructed => "CONSTRUCTED",
            Self::Prepare => "PREPARE",
            Self::Ready => "READY",
            Self::Start => "START",
            Self::Final => "FINAL",
            Self::End => "END",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_table_is_linear_and_terminal() {
        let mut stage = Stage::Constructed;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            seen.push(next);
            stage = next;
        }
        assert_eq!(stage, Stage::End);
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn instants_order_by_day_then_time() {
        let a = GameTime::working(1, 9).instant();
        let b = GameTime::working(2, 0).instant();
        assert!(a < b);
        assert_eq!(a.to_string(), "day 1 time 9");
    }

    #[test]
    fn game_time_uses_camel_case_on_the_wire() {
        let json = serde_json::to_value(GameTime::working(1, 2)).unwrap_or_default();
        assert_eq!(json["isWorking"], serde_json::Value::Bool(true));
    }

    #[test]
    fn stage_serializes_screaming() {
        let json = serde_json::to_string(&Stage::Start).unwrap_or_default();
        assert_eq!(json, "\"START\"");
    }
}
