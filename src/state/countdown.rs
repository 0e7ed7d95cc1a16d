use serde::Serialize;

use crate::state::stage_machine::Stage;

/// Values shown before any tick arrives for a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownDefaults {
    /// Seconds to answer a question.
    pub question: u32,
    /// Seconds of a category announcement.
    pub category: u32,
    /// Seconds between results and the next round.
    pub next_round: u32,
}

impl Default for CountdownDefaults {
    fn default() -> Self {
        Self {
            question: 30,
            category: 10,
            next_round: 5,
        }
    }
}

/// Displayed countdown values, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdowns {
    /// Time left to answer the current question.
    pub question: u32,
    /// Time left in the category announcement.
    pub category: u32,
    /// Time until the next round starts.
    pub next_round: u32,
}

/// What happened to an incoming tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick updated the displayed value.
    Applied,
    /// The tick belonged to a stage already left; the value was pinned to zero.
    Pinned,
    /// The tick does not apply to the current stage.
    Ignored,
}

/// Filters authority ticks against the current stage.
///
/// Ticks are not buffered or reordered: a tick that arrives too late is
/// dropped, never replayed.
#[derive(Debug, Clone)]
pub struct CountdownReconciler {
    defaults: CountdownDefaults,
    values: Countdowns,
}

impl CountdownReconciler {
    /// Start with every countdown at its default.
    pub fn new(defaults: CountdownDefaults) -> Self {
        Self {
            defaults,
            values: Countdowns {
                question: defaults.question,
                category: defaults.category,
                next_round: defaults.next_round,
            },
        }
    }

    /// Current displayed values.
    pub fn values(&self) -> Countdowns {
        self.values
    }

    /// Question countdown tick. A tick arriving during `Results` is stale.
    pub fn question_tick(&mut self, stage: Stage, seconds: u32) -> TickOutcome {
        match stage {
            Stage::Results => {
                self.values.question = 0;
                TickOutcome::Pinned
            }
            Stage::GameOver => TickOutcome::Ignored,
            _ => {
                self.values.question = seconds;
                TickOutcome::Applied
            }
        }
    }

    /// Category countdown tick; always applies.
    pub fn category_tick(&mut self, seconds: u32) -> TickOutcome {
        self.values.category = seconds;
        TickOutcome::Applied
    }

    /// Post-round countdown tick; only meaningful while results are shown.
    pub fn next_round_tick(&mut self, stage: Stage, seconds: u32) -> TickOutcome {
        if stage != Stage::Results {
            return TickOutcome::Ignored;
        }
        self.values.next_round = seconds;
        TickOutcome::Applied
    }

    /// A new question started.
    pub fn round_started(&mut self) {
        self.values.question = self.defaults.question;
    }

    /// Results are shown: the question timer is over.
    pub fn results_shown(&mut self) {
        self.values.question = 0;
        self.values.next_round = self.defaults.next_round;
    }

    /// A category announcement started.
    pub fn category_announced(&mut self) {
        self.values.category = self.defaults.category;
    }
}
