use serde::{Deserialize, Serialize};
use std::path::Path;

use pushup_motion::ClassifierConfig;
use crate::error::{EngineError, Result};

/// Settings of a single analysis session, every field is optional in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Posture classifier thresholds
    pub classifier: ClassifierConfig,
    /// Percentage of the video to skip before counting
    pub start_offset_percent: f32,
    /// Capacity of the channels between source, session and report
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            start_offset_percent: 0.0,
            channel_capacity: 100,
        }
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(filepath: P) -> Result<Self> {
        let path = filepath.as_ref();
        let string = std::fs::read_to_string(path)
            .map_err(|e| EngineError::io(path, e))?;

        serde_json::from_str::<Self>(&string)
            .map_err(|source| EngineError::Config { path: path.to_path_buf(), source })
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..100.0).contains(&self.start_offset_percent) {
            return Err(EngineError::StartOffset(self.start_offset_percent));
        }
        Ok(())
    }
}
