//! Analysis configuration from environment variables

use std::env;
use std::ops::Range;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AnalysisError;

#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    /// Engine budget for evaluation calls
    pub eval_time: Duration,

    /// Engine budget when the engine chooses a move to play
    pub move_time: Duration,

    /// Advantage delta below which a move is a blunder
    pub blunder_threshold: f64,

    /// Advantage delta at or below which a blunder is critical
    pub critical_blunder_threshold: f64,

    /// Advantage delta above which a move is good
    pub good_move_threshold: f64,

    /// Advantage delta at or above which a move is fantastic
    pub fantastic_move_threshold: f64,

    /// Mate distances worth narrating (exclusive upper bound)
    pub mate_window: Range<u32>,

    /// Plies of history required before advantage deltas are computed
    pub min_delta_history: usize,

    /// Better moves suggested after a blunder (1-3)
    pub suggestion_count: usize,

    /// Steepness of the centipawn-to-score logistic transform
    pub logistic_k: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            eval_time: Duration::from_millis(100),
            move_time: Duration::from_millis(500),
            blunder_threshold: -0.3,
            critical_blunder_threshold: -0.6,
            good_move_threshold: 0.1,
            fantastic_move_threshold: 0.2,
            mate_window: 1..5,
            min_delta_history: 5,
            suggestion_count: 2,
            logistic_k: 0.004,
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from environment variables, defaulting anything unset.
    pub fn from_env() -> Result<Self, AnalysisError> {
        let defaults = Self::default();

        let config = Self {
            eval_time: Duration::from_millis(env_or(
                "EVAL_TIME_MS",
                defaults.eval_time.as_millis() as u64,
            )),
            move_time: Duration::from_millis(env_or(
                "MOVE_TIME_MS",
                defaults.move_time.as_millis() as u64,
            )),
            blunder_threshold: env_or("BLUNDER_THRESHOLD", defaults.blunder_threshold),
            critical_blunder_threshold: env_or(
                "CRITICAL_BLUNDER_THRESHOLD",
                defaults.critical_blunder_threshold,
            ),
            good_move_threshold: env_or("GOOD_MOVE_THRESHOLD", defaults.good_move_threshold),
            fantastic_move_threshold: env_or(
                "FANTASTIC_MOVE_THRESHOLD",
                defaults.fantastic_move_threshold,
            ),
            mate_window: env_or("MATE_WINDOW_MIN", defaults.mate_window.start)
                ..env_or("MATE_WINDOW_MAX", defaults.mate_window.end),
            min_delta_history: env_or("MIN_DELTA_HISTORY", defaults.min_delta_history),
            suggestion_count: env_or("SUGGESTION_COUNT", defaults.suggestion_count).clamp(1, 3),
            logistic_k: defaults.logistic_k,
        };

        config.validate()
    }

    /// Reject threshold orderings that would make classification ambiguous.
    pub fn validate(self) -> Result<Self, AnalysisError> {
        if !(self.critical_blunder_threshold <= self.blunder_threshold
            && self.blunder_threshold < 0.0
            && 0.0 < self.good_move_threshold
            && self.good_move_threshold < self.fantastic_move_threshold)
        {
            return Err(AnalysisError::Config(format!(
                "Thresholds must satisfy critical <= blunder < 0 < good < fantastic, got {} / {} / {} / {}",
                self.critical_blunder_threshold,
                self.blunder_threshold,
                self.good_move_threshold,
                self.fantastic_move_threshold
            )));
        }
        if self.mate_window.is_empty() {
            return Err(AnalysisError::Config(format!(
                "Mate window {:?} is empty",
                self.mate_window
            )));
        }
        if self.min_delta_history < 2 {
            return Err(AnalysisError::Config(
                "MIN_DELTA_HISTORY must be at least 2".into(),
            ));
        }
        if self.eval_time.is_zero() || self.move_time.is_zero() {
            return Err(AnalysisError::Config("Engine time budgets must be positive".into()));
        }
        Ok(self)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
