use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, ReframeError};
use crate::temporal::MAX_OUTPUT_FRAMES;

/// Which transformation a request selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    Interpolate,
    SpeedChange,
    LowLight,
    SuperResolutionSim,
    DetailEnhanceSim,
    DeepfakeScore,
}

impl TransformKind {
    /// Prefix used for output artifact names
    pub fn label(&self) -> &'static str {
        match self {
            TransformKind::Interpolate => "interpolate",
            TransformKind::SpeedChange => "speed",
            TransformKind::LowLight => "low_light",
            TransformKind::SuperResolutionSim => "super_resolution",
            TransformKind::DetailEnhanceSim => "detail_enhance",
            TransformKind::DeepfakeScore => "deepfake",
        }
    }

    /// Kinds that map one frame to one frame and so also apply to stills
    pub fn is_per_frame(&self) -> bool {
        matches!(
            self,
            TransformKind::LowLight | TransformKind::SuperResolutionSim | TransformKind::DetailEnhanceSim
        )
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TransformKind {
    type Err = ReframeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "interpolate" | "interpolation" => Ok(TransformKind::Interpolate),
            "speed" | "speed_change" => Ok(TransformKind::SpeedChange),
            "low_light" | "lowlight" => Ok(TransformKind::LowLight),
            "super_resolution" | "superres" | "super_resolution_sim" => Ok(TransformKind::SuperResolutionSim),
            "detail_enhance" | "detail" | "detail_enhance_sim" => Ok(TransformKind::DetailEnhanceSim),
            "deepfake" | "deepfake_score" => Ok(TransformKind::DeepfakeScore),
            _ => Err(ReframeError::InvalidParameter(format!(
                "Unknown transform '{}'. Valid transforms: interpolate, speed, low_light, super_resolution, detail_enhance, deepfake",
                s
            ))),
        }
    }
}

/// A transformation plus its kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformRequest {
    Interpolate { intermediate_frames: usize },
    SpeedChange { factor: f64 },
    LowLight,
    SuperResolutionSim,
    DetailEnhanceSim,
    DeepfakeScore,
}

impl TransformRequest {
    /// Build a request from a kind and the optional CLI/HTTP parameters.
    pub fn from_kind(kind: TransformKind, intermediate_frames: Option<usize>, factor: Option<f64>) -> Result<Self> {
        let request = match kind {
            TransformKind::Interpolate => TransformRequest::Interpolate {
                intermediate_frames: intermediate_frames.unwrap_or(1),
            },
            TransformKind::SpeedChange => TransformRequest::SpeedChange {
                factor: factor.ok_or_else(|| {
                    ReframeError::InvalidParameter("speed change requires a speed factor".to_string())
                })?,
            },
            TransformKind::LowLight => TransformRequest::LowLight,
            TransformKind::SuperResolutionSim => TransformRequest::SuperResolutionSim,
            TransformKind::DetailEnhanceSim => TransformRequest::DetailEnhanceSim,
            TransformKind::DeepfakeScore => TransformRequest::DeepfakeScore,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn kind(&self) -> TransformKind {
        match self {
            TransformRequest::Interpolate { .. } => TransformKind::Interpolate,
            TransformRequest::SpeedChange { .. } => TransformKind::SpeedChange,
            TransformRequest::LowLight => TransformKind::LowLight,
            TransformRequest::SuperResolutionSim => TransformKind::SuperResolutionSim,
            TransformRequest::DetailEnhanceSim => TransformKind::DetailEnhanceSim,
            TransformRequest::DeepfakeScore => TransformKind::DeepfakeScore,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            TransformRequest::SpeedChange { factor } if !(factor.is_finite() && *factor > 0.0) => {
                Err(ReframeError::InvalidParameter(format!(
                    "speed factor must be a positive number, got {}",
                    factor
                )))
            }
            TransformRequest::Interpolate { intermediate_frames } if *intermediate_frames >= MAX_OUTPUT_FRAMES => {
                Err(ReframeError::InvalidParameter(format!(
                    "intermediate frames must be below {}, got {}",
                    MAX_OUTPUT_FRAMES, intermediate_frames
                )))
            }
            _ => Ok(()),
        }
    }

    /// Output file name for a source, e.g. `speed_2_clip.mp4`.
    pub fn output_name(&self, source: &Path) -> Result<String> {
        let basename = source
            .file_name()
            .ok_or_else(|| ReframeError::InvalidParameter(format!("'{}' has no file name", source.display())))?
            .to_string_lossy();

        Ok(match self {
            TransformRequest::Interpolate { intermediate_frames } => {
                format!("{}_{}_{}", self.kind().label(), intermediate_frames, basename)
            }
            TransformRequest::SpeedChange { factor } => {
                format!("{}_{}_{}", self.kind().label(), factor, basename)
            }
            _ => format!("{}_{}", self.kind().label(), basename),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("low-light".parse::<TransformKind>().unwrap(), TransformKind::LowLight);
        assert_eq!("SPEED".parse::<TransformKind>().unwrap(), TransformKind::SpeedChange);
        for kind in [
            TransformKind::Interpolate,
            TransformKind::SpeedChange,
            TransformKind::LowLight,
            TransformKind::SuperResolutionSim,
            TransformKind::DetailEnhanceSim,
            TransformKind::DeepfakeScore,
        ] {
            assert_eq!(kind.label().parse::<TransformKind>().unwrap(), kind);
        }
        assert!(matches!("sharpen".parse::<TransformKind>(), Err(ReframeError::InvalidParameter(_))));
    }

    #[test]
    fn test_from_kind_validates() {
        assert!(TransformRequest::from_kind(TransformKind::SpeedChange, None, None).is_err());
        assert!(TransformRequest::from_kind(TransformKind::SpeedChange, None, Some(0.0)).is_err());
        assert!(TransformRequest::from_kind(TransformKind::SpeedChange, None, Some(-2.0)).is_err());
        assert_eq!(
            TransformRequest::from_kind(TransformKind::Interpolate, None, None).unwrap(),
            TransformRequest::Interpolate { intermediate_frames: 1 }
        );
    }

    #[test]
    fn test_intermediate_frames_are_bounded() {
        assert!(TransformRequest::from_kind(TransformKind::Interpolate, Some(usize::MAX), None).is_err());
        assert!(TransformRequest::Interpolate { intermediate_frames: MAX_OUTPUT_FRAMES }
            .validate()
            .is_err());
        assert!(TransformRequest::Interpolate { intermediate_frames: 24 }.validate().is_ok());
    }

    #[test]
    fn test_output_names_differ_per_transform() {
        let source = Path::new("uploads/clip.mp4");
        let names: Vec<String> = [
            TransformRequest::Interpolate { intermediate_frames: 3 },
            TransformRequest::SpeedChange { factor: 2.0 },
            TransformRequest::SpeedChange { factor: 0.5 },
            TransformRequest::LowLight,
            TransformRequest::SuperResolutionSim,
            TransformRequest::DetailEnhanceSim,
        ]
        .iter()
        .map(|r| r.output_name(source).unwrap())
        .collect();

        assert_eq!(
            names,
            vec![
                "interpolate_3_clip.mp4",
                "speed_2_clip.mp4",
                "speed_0.5_clip.mp4",
                "low_light_clip.mp4",
                "super_resolution_clip.mp4",
                "detail_enhance_clip.mp4",
            ]
        );
    }

    #[test]
    fn test_request_json_shape() {
        let json = serde_json::to_string(&TransformRequest::SpeedChange { factor: 2.0 }).unwrap();
        assert_eq!(json, r#"{"kind":"speed_change","factor":2.0}"#);
    }
}
