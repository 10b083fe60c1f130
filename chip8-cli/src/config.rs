//! Run configuration file.
use chip8_cpu::prelude::*;
use serde::Deserialize;

use crate::error::AppError;

/// Settings loaded from a YAML file.
///
/// ```yaml
/// vm:
///   speed: 15
///   seed: 7
/// frames: 600
/// keys:
///   - { frame: 30, key: 5 }
///   - { frame: 32, key: 5, pressed: false }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub vm: Chip8Conf,
    /// Number of frames to run before stopping.
    pub frames: Option<u64>,
    /// Scripted keyboard input, since there is no interactive keyboard.
    pub keys: Vec<KeyEvent>,
}

/// Key going down or up at the start of the given frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyEvent {
    pub frame: u64,
    pub key: KeyCode,
    #[serde(default = "KeyEvent::default_pressed")]
    pub pressed: bool,
}

impl KeyEvent {
    fn default_pressed() -> bool {
        true
    }
}

impl RunConfig {
    pub fn from_yaml(source: &str) -> Result<Self, AppError> {
        let mut conf: RunConfig = serde_yaml::from_str(source)?;
        conf.keys.sort_by_key(|event| event.frame);
        Ok(conf)
    }

    pub fn from_file(filepath: &str) -> Result<Self, AppError> {
        let source = std::fs::read_to_string(filepath)?;
        let conf = Self::from_yaml(&source)?;
        log::debug!("loaded config from {filepath}: {conf:?}");
        Ok(conf)
    }
}
