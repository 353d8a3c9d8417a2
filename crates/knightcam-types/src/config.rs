use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    region::{MIN_FRAME_HEIGHT, MIN_FRAME_WIDTH, REGION_COUNT},
    KnightcamError, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraSource {
    Synthetic,
    Directory,
}

/// Scripted player movement for the synthetic camera.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MotionPattern {
    /// Nobody moves.
    #[default]
    Still,
    /// The occluder visits each region in turn.
    Wander { dwell_frames: u32 },
    /// The occluder keeps waving over one region.
    Fixed { region: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub source: CameraSource,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub frames_dir: Option<String>,
    #[serde(default)]
    pub pattern: MotionPattern,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VisionConfig {
    /// Directory receiving a PNG of the motion mask whenever a round ends.
    pub capture_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    pub seed: Option<u64>,
    pub max_ticks: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsConfig {
    pub log_level: String,
    pub telemetry_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnightcamConfig {
    pub camera: CameraConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub network: NetworkConfig,
    pub ops: OpsConfig,
}

impl Default for KnightcamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                source: CameraSource::Synthetic,
                width: 640,
                height: 480,
                fps: 30,
                frames_dir: None,
                pattern: MotionPattern::Wander { dwell_frames: 45 },
            },
            vision: VisionConfig::default(),
            session: SessionConfig::default(),
            network: NetworkConfig {
                channel_capacity: 256,
            },
            ops: OpsConfig {
                log_level: "info".into(),
                telemetry_dir: "telemetry".into(),
            },
        }
    }
}

impl KnightcamConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            KnightcamError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            KnightcamError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera.width < MIN_FRAME_WIDTH || self.camera.height < MIN_FRAME_HEIGHT {
            return Err(KnightcamError::Configuration(format!(
                "camera resolution must be at least {MIN_FRAME_WIDTH}x{MIN_FRAME_HEIGHT}"
            )));
        }
        if !(1..=240).contains(&self.camera.fps) {
            return Err(KnightcamError::Configuration(
                "camera.fps must be between 1 and 240".into(),
            ));
        }
        if self.camera.source == CameraSource::Directory && self.camera.frames_dir.is_none() {
            return Err(KnightcamError::Configuration(
                "camera.frames_dir is required for the directory source".into(),
            ));
        }
        match self.camera.pattern {
            MotionPattern::Fixed { region } if region >= REGION_COUNT => {
                return Err(KnightcamError::Configuration(format!(
                    "camera.pattern.region must be below {REGION_COUNT}"
                )));
            }
            MotionPattern::Wander { dwell_frames: 0 } => {
                return Err(KnightcamError::Configuration(
                    "camera.pattern.dwell_frames must be greater than zero".into(),
                ));
            }
            _ => {}
        }
        if self.network.channel_capacity == 0 {
            return Err(KnightcamError::Configuration(
                "network.channel_capacity must be greater than zero".into(),
            ));
        }
        if self.session.max_ticks == Some(0) {
            return Err(KnightcamError::Configuration(
                "session.max_ticks must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_knightcam_config_from_file() {
        let temp_path = std::env::temp_dir().join("knightcam-config-test.toml");
        let config = KnightcamConfig {
            camera: CameraConfig {
                source: CameraSource::Directory,
                width: 1280,
                height: 720,
                fps: 60,
                frames_dir: Some("fixtures/frames".into()),
                pattern: MotionPattern::Fixed { region: 2 },
            },
            vision: VisionConfig {
                capture_dir: Some("captures".into()),
            },
            session: SessionConfig {
                seed: Some(7),
                max_ticks: Some(900),
            },
            network: NetworkConfig {
                channel_capacity: 32,
            },
            ops: OpsConfig {
                log_level: "debug".into(),
                telemetry_dir: "telemetry".into(),
            },
        };

        let doc = toml::to_string(&config).expect("serialize config");
        fs::write(&temp_path, doc).expect("write temp config");

        let loaded = KnightcamConfig::from_file(&temp_path).expect("load config");
        assert_eq!(loaded.camera.source, CameraSource::Directory);
        assert_eq!(loaded.camera.pattern, config.camera.pattern);
        assert_eq!(loaded.session.seed, Some(7));
        assert_eq!(loaded.vision.capture_dir.as_deref(), Some("captures"));
        fs::remove_file(&temp_path).expect("cleanup temp config");
    }

    #[test]
    fn optional_sections_default() {
        let doc = r#"
            [camera]
            source = "synthetic"
            width = 320
            height = 240
            fps = 30

            [network]
            channel_capacity = 8

            [ops]
            log_level = "info"
            telemetry_dir = "telemetry"
        "#;
        let config: KnightcamConfig = toml::from_str(doc).expect("parse");
        assert_eq!(config.camera.pattern, MotionPattern::Still);
        assert!(config.session.seed.is_none());
        assert!(config.vision.capture_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let err = KnightcamConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, KnightcamError::Configuration(_)));
    }

    #[test]
    fn validate_configuration_rules() {
        let mut config = KnightcamConfig::default();
        assert!(config.validate().is_ok());

        config.camera.width = 100;
        assert!(config.validate().is_err());
        config.camera.width = 640;
        config.camera.fps = 0;
        assert!(config.validate().is_err());
        config.camera.fps = 30;
        config.camera.source = CameraSource::Directory;
        assert!(config.validate().is_err());
        config.camera.frames_dir = Some("frames".into());
        assert!(config.validate().is_ok());
        config.camera.pattern = MotionPattern::Fixed { region: 3 };
        assert!(config.validate().is_err());
        config.camera.pattern = MotionPattern::Wander { dwell_frames: 0 };
        assert!(config.validate().is_err());
        config.camera.pattern = MotionPattern::Still;
        config.network.channel_capacity = 0;
        assert!(config.validate().is_err());
        config.network.channel_capacity = 4;
        config.session.max_ticks = Some(0);
        assert!(config.validate().is_err());
        config.session.max_ticks = None;
        assert!(config.validate().is_ok());
    }
}
