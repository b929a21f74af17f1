//! Repetition counter.
//!
//! A FSM following the postures of the subject. It remembers the last
//! two distinct postures and counts a repetition when the subject
//! reaches the top coming from the bottom. A single noisy `mid`
//! between the bottom and the top does not hide the repetition, and
//! staying at the top, or flickering between `mid` and `up`, never
//! counts twice.

use pushup_common::PostureState;

/// The two most recent distinct postures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostureHistory {
    pub current: PostureState,
    pub previous: PostureState,
}

impl Default for PostureHistory {
    /// The subject is assumed to start at the top
    fn default() -> Self {
        Self {
            current: PostureState::Up,
            previous: PostureState::Mid,
        }
    }
}

impl PostureHistory {
    /// True if the subject is coming back from the bottom
    fn was_down(&self) -> bool {
        match self.current {
            PostureState::Down => true,
            PostureState::Mid => self.previous == PostureState::Down,
            PostureState::Up => false,
        }
    }

    /// Remember `state` if it differs from the current posture
    fn push(&mut self, state: PostureState) {
        if state != self.current {
            self.previous = self.current;
            self.current = state;
        }
    }
}

/// Output of the counter for a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Total repetitions so far
    pub repetitions: u32,
    /// True if this frame completed a repetition
    pub repetition_complete: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RepetitionCounter {
    history: PostureHistory,
    count: u32,
}

impl RepetitionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known history instead of the top of the push-up
    pub fn with_history(current: PostureState, previous: PostureState) -> Self {
        Self {
            history: PostureHistory { current, previous },
            count: 0,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn history(&self) -> PostureHistory {
        self.history
    }

    /// Forget everything, used when a new video starts
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feed the posture of the next frame, None if the frame was not classified
    pub fn update(&mut self, state: Option<PostureState>) -> Progress {
        let Some(state) = state else {
            return Progress {
                repetitions: self.count,
                repetition_complete: false,
            };
        };

        let repetition_complete = state == PostureState::Up && self.history.was_down();
        if repetition_complete {
            self.count += 1;
        }
        self.history.push(state);

        Progress {
            repetitions: self.count,
            repetition_complete,
        }
    }
}
