//! The simulated game clock and stage machine.
//!
//! The clock is the single source of truth for [`GameTime`] and [`Stage`]
//! of one game. It never sleeps: the engine's tick loop decides *when* to
//! call [`GameClock::tick`], the clock decides *what* a tick means.
//!
//! # Rules
//!
//! - Stages only move forward through the fixed table and `End` is terminal.
//! - Entering `Start` starts day 1 immediately.
//! - Within a working day `time` runs `0..day_length`. The tick after
//!   `day_length - 1` ends the day (`is_working` flips to false) instead of
//!   advancing `time`.
//! - `day` only moves via [`GameClock::next_day`] and never exceeds
//!   `game_days`. Ending the last day moves the stage to `Final`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use supplysim_types::{GameTime, Stage};

/// Errors that can occur during clock operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// Invalid clock configuration (e.g. zero-length day).
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },

    /// The stage table has no successor for the current stage.
    #[error("stage {stage} is terminal")]
    TerminalStage {
        /// The current stage.
        stage: Stage,
    },

    /// A day can only be started while the game is in `Start`.
    #[error("cannot start a day in stage {stage}")]
    NotStarted {
        /// The current stage.
        stage: Stage,
    },

    /// The current day is still running.
    #[error("day {day} is still in progress")]
    DayInProgress {
        /// The running day.
        day: u32,
    },

    /// All configured days have been played.
    #[error("day {day} is the last of {game_days} game days")]
    NoDaysLeft {
        /// The current day.
        day: u32,
        /// Configured number of game days.
        game_days: u32,
    },

    /// Ticks only fire during a working day.
    #[error("clock is not running at {game_time}")]
    NotWorking {
        /// The current game time.
        game_time: GameTime,
    },
}

/// Result of [`GameClock::next_stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageChange {
    /// Stage before the transition.
    pub from: Stage,
    /// Stage after the transition.
    pub to: Stage,
    /// Game time of the day started by entering `Start`, if any.
    pub day_started: Option<GameTime>,
}

/// Result of [`GameClock::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// `time` advanced by one within the working day.
    Ticked(GameTime),
    /// The working day ended; `time` is unchanged.
    DayEnded {
        /// Game time after the day ended (`is_working == false`).
        game_time: GameTime,
        /// Whether this was the last configured day. The stage is now
        /// `Final` when true.
        final_day: bool,
    },
}

/// Game time and stage of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameClock {
    stage: Stage,
    game_time: GameTime,
    game_days: u32,
    day_length: u32,
}

impl GameClock {
    /// Create a clock in `Constructed` at day 0.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if either bound is zero.
    pub fn new(game_days: u32, day_length: u32) -> Result<Self, ClockError> {
        if game_days == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "game_days must be at least 1".to_owned(),
            });
        }
        if day_length == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "day_length must be at least 1".to_owned(),
            });
        }
        Ok(Self {
            stage: Stage::Constructed,
            game_time: GameTime::INITIAL,
            game_days,
            day_length,
        })
    }

    /// Current stage.
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Current game time.
    pub const fn game_time(&self) -> GameTime {
        self.game_time
    }

    /// Configured number of game days.
    pub const fn game_days(&self) -> u32 {
        self.game_days
    }

    /// Configured ticks per working day.
    pub const fn day_length(&self) -> u32 {
        self.day_length
    }

    /// Advance the stage by the fixed table.
    ///
    /// Entering `Start` also starts day 1. The whole transition either
    /// happens or fails without changing the clock.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TerminalStage`] from `End`, or any error of
    /// [`GameClock::next_day`] when entering `Start`.
    pub fn next_stage(&mut self) -> Result<StageChange, ClockError> {
        let from = self.stage;
        let to = from.next().ok_or(ClockError::TerminalStage { stage: from })?;

        let mut next = self.clone();
        next.stage = to;
        let day_started = if to == Stage::Start {
            Some(next.next_day()?)
        } else {
            None
        };
        *self = next;

        info!(from = %from, to = %to, "Stage changed");
        Ok(StageChange {
            from,
            to,
            day_started,
        })
    }

    /// Start the next working day at `time` 0.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::NotStarted`] outside `Start`,
    /// [`ClockError::DayInProgress`] while the current day is working, and
    /// [`ClockError::NoDaysLeft`] once `game_days` have been played.
    pub fn next_day(&mut self) -> Result<GameTime, ClockError> {
        if self.stage != Stage::Start {
            return Err(ClockError::NotStarted { stage: self.stage });
        }
        if self.game_time.is_working {
            return Err(ClockError::DayInProgress {
                day: self.game_time.day,
            });
        }
        if self.game_time.day >= self.game_days {
            return Err(ClockError::NoDaysLeft {
                day: self.game_time.day,
                game_days: self.game_days,
            });
        }

        let day = self
            .game_time
            .day
            .checked_add(1)
            .ok_or(ClockError::NoDaysLeft {
                day: self.game_time.day,
                game_days: self.game_days,
            })?;
        self.game_time = GameTime::working(day, 0);
        info!(day, "Day started");
        Ok(self.game_time)
    }

    /// Fire one tick of the working day.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::NotWorking`] outside a working day in `Start`.
    pub fn tick(&mut self) -> Result<TickOutcome, ClockError> {
        if self.stage != Stage::Start || !self.game_time.is_working {
            return Err(ClockError::NotWorking {
                game_time: self.game_time,
            });
        }

        let last_tick = self.day_length.saturating_sub(1);
        if self.game_time.time >= last_tick {
            self.game_time.is_working = false;
            let final_day = self.game_time.day >= self.game_days;
            if final_day {
                self.stage = Stage::Final;
            }
            info!(
                day = self.game_time.day,
                final_day,
                stage = %self.stage,
                "Day ended"
            );
            return Ok(TickOutcome::DayEnded {
                game_time: self.game_time,
                final_day,
            });
        }

        self.game_time.time = self.game_time.time.saturating_add(1);
        debug!(day = self.game_time.day, time = self.game_time.time, "Tick");
        Ok(TickOutcome::Ticked(self.game_time))
    }

    /// Project `time` forward by `delta` ticks, carrying into later days.
    ///
    /// Pure: the clock is not changed. A projection past the last game day
    /// clamps to the last tick of the last day with `is_working == false`.
    pub fn game_time_add(&self, time: GameTime, delta: u32) -> GameTime {
        let clamped = GameTime {
            day: self.game_days,
            time: self.day_length.saturating_sub(1),
            is_working: false,
        };

        let Some(total) = time.time.checked_add(delta) else {
            return clamped;
        };
        let (Some(carry), Some(tick)) = (
            total.checked_div(self.day_length),
            total.checked_rem(self.day_length),
        ) else {
            return clamped;
        };
        match time.day.checked_add(carry) {
            Some(day) if day <= self.game_days => GameTime::working(day, tick),
            _ => clamped,
        }
    }
}
