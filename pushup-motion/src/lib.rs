//! Push-up motion analysis.
//!
//! Every frame of a video goes through two stages: the classifier
//! turns the joints of the subject into a discrete posture (up, down
//! or mid), then the counter follows the sequence of postures and
//! counts a repetition every time the subject comes back up from
//! the bottom of the movement.

pub mod classifier;
pub mod counter;
pub mod geometry;

pub use classifier::{
    ArmTorsoClassifier,
    Classify,
    ClassifierConfig,
    ClassifierKind,
    ElbowClassifier,
    PostureFeatures,
};
pub use counter::{PostureHistory, Progress, RepetitionCounter};
pub use pushup_common::PostureState;
