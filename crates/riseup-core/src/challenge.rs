//! Dismissal challenges.
//!
//! A ringing alarm is dismissed only after its challenge completes. The
//! challenge is chosen from the alarm's [`Difficulty`]; inputs that do not
//! apply to the current challenge are ignored.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::alarm::Difficulty;

/// Share of the track a swipe has to cover.
pub const SWIPE_THRESHOLD: f64 = 0.7;

pub const SHAKE_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathProblem {
    pub question: String,
    pub answer: i64,
}

impl MathProblem {
    /// Addition or subtraction of two-digit numbers, or a times-table
    /// product. Subtraction never goes negative.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.gen_range(0..3) {
            0 => {
                let a: i64 = rng.gen_range(10..=99);
                let b: i64 = rng.gen_range(10..=99);
                Self {
                    question: format!("{a} + {b} = ?"),
                    answer: a + b,
                }
            }
            1 => {
                let a: i64 = rng.gen_range(10..=99);
                let b: i64 = rng.gen_range(10..=a);
                Self {
                    question: format!("{a} - {b} = ?"),
                    answer: a - b,
                }
            }
            _ => {
                let a: i64 = rng.gen_range(2..=12);
                let b: i64 = rng.gen_range(2..=12);
                Self {
                    question: format!("{a} × {b} = ?"),
                    answer: a * b,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChallengeKind {
    Tap,
    Swipe { threshold: f64 },
    Arithmetic(MathProblem),
    ShakeCount { threshold: u32 },
}

impl ChallengeKind {
    pub fn for_difficulty<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> Self {
        match difficulty {
            Difficulty::Easy => ChallengeKind::Tap,
            Difficulty::Medium => ChallengeKind::Swipe {
                threshold: SWIPE_THRESHOLD,
            },
            Difficulty::Hard => ChallengeKind::Arithmetic(MathProblem::generate(rng)),
        }
    }

    pub fn shake() -> Self {
        ChallengeKind::ShakeCount {
            threshold: SHAKE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChallengeInput {
    Tap,
    /// Horizontal drag distance and the width of the track, in the same
    /// unit. Direction does not matter.
    Swipe { translation: f64, track_width: f64 },
    Answer(i64),
    Shake,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Progress {
    Completed,
    InProgress { fraction: f64 },
}

impl Progress {
    pub fn is_completed(&self) -> bool {
        matches!(self, Progress::Completed)
    }
}

#[derive(Debug, Clone)]
pub struct Challenge {
    kind: ChallengeKind,
    shakes: u32,
    completed: bool,
}

impl Challenge {
    pub fn new(kind: ChallengeKind) -> Self {
        Self {
            kind,
            shakes: 0,
            completed: false,
        }
    }

    pub fn for_difficulty<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> Self {
        Self::new(ChallengeKind::for_difficulty(difficulty, rng))
    }

    pub fn kind(&self) -> &ChallengeKind {
        &self.kind
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// What to show the user.
    pub fn prompt(&self) -> String {
        match &self.kind {
            ChallengeKind::Tap => "Ready to start your day? Tap to dismiss.".to_string(),
            ChallengeKind::Swipe { .. } => "Swipe to prove you're awake!".to_string(),
            ChallengeKind::Arithmetic(problem) => format!("Solve to dismiss: {}", problem.question),
            ChallengeKind::ShakeCount { threshold } => {
                format!("Shake to wake up! {}/{threshold}", self.shakes)
            }
        }
    }

    /// Feed one input. A wrong arithmetic answer swaps in a new problem.
    pub fn evaluate<R: Rng + ?Sized>(&mut self, input: ChallengeInput, rng: &mut R) -> Progress {
        if self.completed {
            return Progress::Completed;
        }

        let unchanged = self.current_progress();
        let progress = match (&mut self.kind, input) {
            (ChallengeKind::Tap, ChallengeInput::Tap) => Progress::Completed,
            (
                ChallengeKind::Swipe { threshold },
                ChallengeInput::Swipe {
                    translation,
                    track_width,
                },
            ) => {
                let needed = track_width * *threshold;
                let fraction = if needed > 0.0 {
                    translation.abs() / needed
                } else {
                    0.0
                };
                if fraction >= 1.0 {
                    Progress::Completed
                } else {
                    Progress::InProgress { fraction }
                }
            }
            (ChallengeKind::Arithmetic(problem), ChallengeInput::Answer(answer)) => {
                if answer == problem.answer {
                    Progress::Completed
                } else {
                    *problem = MathProblem::generate(rng);
                    Progress::InProgress { fraction: 0.0 }
                }
            }
            (ChallengeKind::ShakeCount { threshold }, ChallengeInput::Shake) => {
                self.shakes += 1;
                if self.shakes >= *threshold {
                    Progress::Completed
                } else {
                    Progress::InProgress {
                        fraction: f64::from(self.shakes) / f64::from(*threshold),
                    }
                }
            }
            _ => unchanged,
        };

        self.completed = progress.is_completed();
        progress
    }

    fn current_progress(&self) -> Progress {
        let fraction = match &self.kind {
            ChallengeKind::ShakeCount { threshold } if *threshold > 0 => {
                f64::from(self.shakes) / f64::from(*threshold)
            }
            _ => 0.0,
        };
        Progress::InProgress { fraction }
    }
}
