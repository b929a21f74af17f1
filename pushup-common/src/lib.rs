use serde::{Serialize, Deserialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Keypoints of the COCO17 body, in the order used by the pose estimators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Landmark {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

/// Keypoints of the COCO17 body, indexed by keypoint id
pub const COCO17: [Landmark; 17] = [
    Landmark::Nose,
    Landmark::LeftEye,
    Landmark::RightEye,
    Landmark::LeftEar,
    Landmark::RightEar,
    Landmark::LeftShoulder,
    Landmark::RightShoulder,
    Landmark::LeftElbow,
    Landmark::RightElbow,
    Landmark::LeftWrist,
    Landmark::RightWrist,
    Landmark::LeftHip,
    Landmark::RightHip,
    Landmark::LeftKnee,
    Landmark::RightKnee,
    Landmark::LeftAnkle,
    Landmark::RightAnkle,
];

impl Landmark {
    /// Name of the keypoint as it appears in landmark streams
    pub fn name(&self) -> &'static str {
        match self {
            Landmark::Nose => "nose",
            Landmark::LeftEye => "left_eye",
            Landmark::RightEye => "right_eye",
            Landmark::LeftEar => "left_ear",
            Landmark::RightEar => "right_ear",
            Landmark::LeftShoulder => "left_shoulder",
            Landmark::RightShoulder => "right_shoulder",
            Landmark::LeftElbow => "left_elbow",
            Landmark::RightElbow => "right_elbow",
            Landmark::LeftWrist => "left_wrist",
            Landmark::RightWrist => "right_wrist",
            Landmark::LeftHip => "left_hip",
            Landmark::RightHip => "right_hip",
            Landmark::LeftKnee => "left_knee",
            Landmark::RightKnee => "right_knee",
            Landmark::LeftAnkle => "left_ankle",
            Landmark::RightAnkle => "right_ankle",
        }
    }

    /// Index of the keypoint in the COCO17 skeleton
    pub fn coco_index(&self) -> usize {
        *self as usize
    }

    pub fn from_coco_index(index: usize) -> Option<Self> {
        COCO17.get(index).copied()
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLandmark(pub String);

impl std::error::Error for UnknownLandmark { }
impl fmt::Display for UnknownLandmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown landmark: {}", self.0)
    }
}

impl FromStr for Landmark {
    type Err = UnknownLandmark;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        COCO17
            .iter()
            .find(|l| l.name() == s)
            .copied()
            .ok_or_else(|| UnknownLandmark(s.to_string()))
    }
}

pub type SkeletonMap<T> = HashMap<Landmark, T>;
pub type Skeleton<T> = Vec<T>;

/// Assign keypoints names to a skeleton using a reference body,
/// extra keypoints past the COCO17 body are dropped
pub fn skeleton_map_body_coco17<T: Clone>(skeleton: &Skeleton<T>) -> SkeletonMap<T> {
    skeleton
        .iter()
        .zip(COCO17.iter())
        .map(|(pos, landmark)| (*landmark, pos.clone()))
        .collect()
}

/// Screen-space coordinates normalized to [0, 1] x [0, 1]
pub type SkeletonMap2D = SkeletonMap<glam::Vec2>;
pub type Skeleton2D = Skeleton<glam::Vec2>;

/// Joints seen by the pose estimator in a single frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameObservation {
    /// Index of the frame in the video, monotonically increasing
    pub frame: u64,
    /// Detected keypoints, None if the estimator found nobody
    pub landmarks: Option<SkeletonMap2D>,
}

impl FrameObservation {
    pub fn detected(frame: u64, landmarks: SkeletonMap2D) -> Self {
        Self { frame, landmarks: Some(landmarks) }
    }

    pub fn undetected(frame: u64) -> Self {
        Self { frame, landmarks: None }
    }

    pub fn is_detected(&self) -> bool {
        self.landmarks.is_some()
    }

    pub fn landmark(&self, landmark: Landmark) -> Option<glam::Vec2> {
        self.landmarks.as_ref()?.get(&landmark).copied()
    }
}

/// Discrete position of the body during a push-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostureState {
    /// Arms extended
    Up,
    /// Arms bent and chest close to the ground
    Down,
    /// Anything in between
    Mid,
}

impl fmt::Display for PostureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PostureState::Up => "up",
            PostureState::Down => "down",
            PostureState::Mid => "mid",
        })
    }
}

/// Result of the analysis of a single frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub frame: u64,
    /// None when the frame had no usable landmarks
    pub state: Option<PostureState>,
    /// Repetitions completed up to and including this frame
    pub repetitions: u32,
}

impl fmt::Display for FrameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            Some(state) => write!(f, "frame {}: {} (push-ups: {})", self.frame, state, self.repetitions),
            None => write!(f, "frame {}: undetected (push-ups: {})", self.frame, self.repetitions),
        }
    }
}
