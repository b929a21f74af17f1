//! Landmark stream recorded from a pose estimator.
//!
//! One JSON object per line, either with named landmarks
//! `{"frame": 0, "landmarks": {"left_shoulder": [0.41, 0.37], ...}}`
//! or with COCO17 ordered keypoints `{"frame": 0, "keypoints": [[x, y], ...]}`.
//! A frame where nobody was found has `"landmarks": null` or no joints at all.

use serde::Deserialize;
use std::path::Path;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use pushup_common::{skeleton_map_body_coco17, FrameObservation, Skeleton2D, SkeletonMap2D};
use crate::error::{EngineError, Result};

#[derive(Debug, Deserialize)]
struct StreamLine {
    frame: u64,
    #[serde(default)]
    landmarks: Option<SkeletonMap2D>,
    #[serde(default)]
    keypoints: Option<Skeleton2D>,
}

impl From<StreamLine> for FrameObservation {
    fn from(item: StreamLine) -> Self {
        let landmarks = item
            .landmarks
            .or_else(|| item.keypoints.map(|k| skeleton_map_body_coco17(&k)))
            .filter(|l| !l.is_empty());

        FrameObservation {
            frame: item.frame,
            landmarks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamProperties {
    /// Frames in the recording
    pub frames_total: usize,
    /// Frames with at least one landmark
    pub frames_detected: usize,
}

/// All the frames of a recorded video, in order
#[derive(Debug, Clone)]
pub struct LandmarkStream {
    frames: Vec<FrameObservation>,
}

impl LandmarkStream {
    pub fn from_file<P: AsRef<Path>>(filepath: P) -> Result<Self> {
        let path = filepath.as_ref();
        let string = std::fs::read_to_string(path)
            .map_err(|e| EngineError::io(path, e))?;
        Self::from_str(&string)
    }

    pub fn from_str(string: &str) -> Result<Self> {
        let mut frames: Vec<FrameObservation> = vec![];
        for (i, text) in string.lines().enumerate() {
            let line = i + 1;
            if text.trim().is_empty() {
                continue;
            }

            let parsed: StreamLine = serde_json::from_str(text)
                .map_err(|source| EngineError::Parse { line, source })?;

            if let Some(previous) = frames.last() {
                if parsed.frame <= previous.frame {
                    return Err(EngineError::OutOfOrder {
                        line,
                        frame: parsed.frame,
                        previous: previous.frame,
                    });
                }
            }
            frames.push(parsed.into());
        }
        Ok(Self { frames })
    }

    pub fn properties(&self) -> StreamProperties {
        StreamProperties {
            frames_total: self.frames.len(),
            frames_detected: self.frames.iter().filter(|f| f.is_detected()).count(),
        }
    }

    pub fn frames(&self) -> &[FrameObservation] {
        &self.frames
    }

    /// Skip the first `percentage` of the recording, returns the number of frames skipped
    pub fn fast_forward(&mut self, percentage: f32) -> Result<usize> {
        if !(0.0..100.0).contains(&percentage) {
            return Err(EngineError::StartOffset(percentage));
        }

        let target = (self.frames.len() as f64 * percentage as f64 / 100.0) as usize;
        self.frames.drain(..target);
        Ok(target)
    }
}

/// Feed the frames of the stream, in order, to a single consumer.
/// The channel is closed once the last frame has been sent.
#[tracing::instrument(skip_all, fields(frames = stream.frames.len()))]
pub fn run_landmark_source(
    stream: LandmarkStream,
    capacity: usize,
) -> (JoinHandle<Result<()>>, mpsc::Receiver<FrameObservation>) {
    let (data_sender, data_receiver) = mpsc::channel(capacity.max(1));

    let handle = tokio::task::spawn_blocking(move || {
        for frame in stream.frames {
            tracing::trace!(frame = frame.frame, "send frame");
            data_sender
                .blocking_send(frame)
                .map_err(|_| EngineError::ChannelClosed("frame"))?;
        }
        tracing::debug!("end of stream");
        Ok(())
    });

    (handle, data_receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use pushup_common::Landmark;
    use std::io::Write;

    const STREAM: &str = r#"
{"frame": 0, "landmarks": {"left_shoulder": [0.7, 0.5], "right_hip": [0.35, 0.52]}}
{"frame": 1, "landmarks": null}

{"frame": 3, "keypoints": [[0.0, 0.0], [0.1, 0.1], [0.2, 0.2], [0.3, 0.3], [0.4, 0.4], [0.5, 0.5]]}
{"frame": 4}
"#;

    #[test]
    fn parse_stream() {
        let stream = LandmarkStream::from_str(STREAM).unwrap();
        let frames = stream.frames();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0].landmark(Landmark::LeftShoulder), Some(Vec2::new(0.7, 0.5)));
        assert!(!frames[1].is_detected());
        assert_eq!(frames[2].frame, 3);
        assert_eq!(frames[2].landmark(Landmark::LeftShoulder), Some(Vec2::new(0.5, 0.5)));
        assert_eq!(frames[2].landmark(Landmark::RightShoulder), None);
        assert!(!frames[3].is_detected());

        assert_eq!(stream.properties(), StreamProperties { frames_total: 4, frames_detected: 2 });
    }

    #[test]
    fn empty_landmarks_are_undetected() {
        let stream = LandmarkStream::from_str(r#"{"frame": 0, "landmarks": {}}"#).unwrap();
        assert!(!stream.frames()[0].is_detected());
    }

    #[test]
    fn parse_error_reports_line() {
        let text = "{\"frame\": 0}\n{\"frame\": 1, \"landmarks\": {\"neck\": [0.1, 0.1]}}\n";
        let err = LandmarkStream::from_str(text).unwrap_err();
        assert!(matches!(err, EngineError::Parse { line: 2, .. }), "{err}");
    }

    #[test]
    fn frames_must_increase() {
        let text = "{\"frame\": 5}\n{\"frame\": 5}\n";
        let err = LandmarkStream::from_str(text).unwrap_err();
        assert!(
            matches!(err, EngineError::OutOfOrder { line: 2, frame: 5, previous: 5 }),
            "{err}"
        );
    }

    #[test]
    fn fast_forward_skips_percentage() {
        let text: String = (0..10).map(|i| format!("{{\"frame\": {i}}}\n")).collect();
        let mut stream = LandmarkStream::from_str(&text).unwrap();

        assert_eq!(stream.fast_forward(25.0).unwrap(), 2);
        assert_eq!(stream.frames()[0].frame, 2);
        assert_eq!(stream.frames().len(), 8);

        assert!(matches!(stream.fast_forward(100.0), Err(EngineError::StartOffset(_))));
        assert_eq!(stream.fast_forward(0.0).unwrap(), 0);
    }

    #[test]
    fn read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(STREAM.as_bytes()).unwrap();
        let stream = LandmarkStream::from_file(file.path()).unwrap();
        assert_eq!(stream.properties().frames_total, 4);
    }

    #[tokio::test]
    async fn source_sends_frames_in_order() {
        let text: String = (0..50).map(|i| format!("{{\"frame\": {i}}}\n")).collect();
        let stream = LandmarkStream::from_str(&text).unwrap();

        let (handle, mut receiver) = run_landmark_source(stream, 4);
        let mut received = vec![];
        while let Some(frame) = receiver.recv().await {
            received.push(frame.frame);
        }
        handle.await.unwrap().unwrap();
        assert_eq!(received, (0..50).collect::<Vec<u64>>());
    }
}
