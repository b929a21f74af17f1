use serde::{Deserialize, Serialize};

use pushup_common::{FrameObservation, Landmark, PostureState};
use crate::geometry::{angle, angular_distance, vertical_separation};

/// Types that implement this trait turn the joints seen in a
/// single frame into a posture. Returns None when the landmarks
/// needed by the classifier are not in the frame.
pub trait Classify {
    fn classify(&self, observation: &FrameObservation) -> Option<PostureState>;
}

/// Which classifier a session runs with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// Both elbows plus the drop of the torso
    #[default]
    ArmTorso,
    /// Left elbow only, with fixed thresholds
    Elbow,
}

/// Thresholds of the posture classifier, fixed for the whole session.
///
/// Angles are the ones returned by [`angle`] (shoulder, elbow, wrist), so
/// the two arms seen from the front are mirror images of each other: a left
/// arm bent at 90 degrees reads 90, the same bend on the right arm reads 270.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub kind: ClassifierKind,
    /// Left elbow angle at the bottom of the push-up
    pub down_reference_angle_left: f32,
    /// Right elbow angle at the bottom of the push-up
    pub down_reference_angle_right: f32,
    /// Elbow angle, for both arms, with arms extended
    pub up_reference_angle: f32,
    /// Maximum distance in degrees from the down references
    pub down_tolerance: f32,
    /// Maximum distance in degrees from the up reference
    pub up_tolerance: f32,
    /// Torso drop below which the chest is close to the ground
    pub torso_drop_threshold: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::ArmTorso,
            down_reference_angle_left: 90.0,
            down_reference_angle_right: 270.0,
            up_reference_angle: 180.0,
            down_tolerance: 30.0,
            up_tolerance: 25.0,
            torso_drop_threshold: 0.05,
        }
    }
}

impl ClassifierConfig {
    /// Create the classifier selected by `kind`
    pub fn build(&self) -> Box<dyn Classify + Send + Sync> {
        match self.kind {
            ClassifierKind::ArmTorso => Box::new(ArmTorsoClassifier::new(*self)),
            ClassifierKind::Elbow => Box::new(ElbowClassifier::default()),
        }
    }
}

/// Interesting characteristics of the pose for a push-up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostureFeatures {
    /// Angle at the left elbow, degrees
    pub left_angle: f32,
    /// Angle at the right elbow, degrees
    pub right_angle: f32,
    /// Separation between the shoulders line and the hips line
    pub torso_drop: f32,
}

impl PostureFeatures {
    /// Extract the features, requires shoulders, elbows, wrists and hips
    pub fn from_observation(observation: &FrameObservation) -> Option<Self> {
        let joint = |landmark| observation.landmark(landmark);

        let ls = joint(Landmark::LeftShoulder)?;
        let le = joint(Landmark::LeftElbow)?;
        let lw = joint(Landmark::LeftWrist)?;
        let rs = joint(Landmark::RightShoulder)?;
        let re = joint(Landmark::RightElbow)?;
        let rw = joint(Landmark::RightWrist)?;
        let lh = joint(Landmark::LeftHip)?;
        let rh = joint(Landmark::RightHip)?;

        Some(Self {
            left_angle: angle(ls, le, lw),
            right_angle: angle(rs, re, rw),
            torso_drop: vertical_separation(ls, rs, lh, rh),
        })
    }
}

/// Classify using the bend of both arms and how low the torso is
#[derive(Debug, Clone)]
pub struct ArmTorsoClassifier {
    config: ClassifierConfig,
}

impl ArmTorsoClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn classify_features(&self, features: &PostureFeatures) -> PostureState {
        let c = &self.config;

        let arms_down = angular_distance(features.left_angle, c.down_reference_angle_left) <= c.down_tolerance
            && angular_distance(features.right_angle, c.down_reference_angle_right) <= c.down_tolerance;
        if arms_down && features.torso_drop < c.torso_drop_threshold {
            return PostureState::Down;
        }

        let arms_up = angular_distance(features.left_angle, c.up_reference_angle) <= c.up_tolerance
            && angular_distance(features.right_angle, c.up_reference_angle) <= c.up_tolerance;
        if arms_up {
            return PostureState::Up;
        }

        PostureState::Mid
    }
}

impl Classify for ArmTorsoClassifier {
    fn classify(&self, observation: &FrameObservation) -> Option<PostureState> {
        PostureFeatures::from_observation(observation)
            .map(|features| self.classify_features(&features))
    }
}

/// Single arm classifier: only looks at the left elbow
#[derive(Debug, Clone)]
pub struct ElbowClassifier {
    /// Below this angle the chest is close to the ground
    pub down_below: f32,
    /// Above this angle the arm is extended
    pub up_above: f32,
}

impl Default for ElbowClassifier {
    fn default() -> Self {
        Self {
            down_below: 90.0,
            up_above: 160.0,
        }
    }
}

impl Classify for ElbowClassifier {
    fn classify(&self, observation: &FrameObservation) -> Option<PostureState> {
        let shoulder = observation.landmark(Landmark::LeftShoulder)?;
        let elbow = observation.landmark(Landmark::LeftElbow)?;
        let wrist = observation.landmark(Landmark::LeftWrist)?;

        let angle = angle(shoulder, elbow, wrist);
        Some(if angle < self.down_below {
            PostureState::Down
        } else if angle > self.up_above {
            PostureState::Up
        } else {
            PostureState::Mid
        })
    }
}
