use serde::{Deserialize, Serialize};

use crate::error::{Result, ReframeError};

/// What the codec needs to know about a source before decoding it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Container-reported frame count, when the container stores one
    pub frame_count_hint: Option<u64>,
}

// Structs for parsing ffprobe JSON output
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Parse `ffprobe -of json` stream output. Missing streams or dimensions mean
/// the source has no decodable video.
pub fn parse_probe_output(json: &str, fallback_fps: f64) -> Result<VideoInfo> {
    let output: ProbeOutput = serde_json::from_str(json)?;
    let stream = output
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| ReframeError::SourceUnreadable("no video stream found".to_string()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(ReframeError::SourceUnreadable(
                "video stream has no frame dimensions".to_string(),
            ));
        }
    };

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_rate))
        .unwrap_or(fallback_fps);

    Ok(VideoInfo {
        width,
        height,
        fps,
        frame_count_hint: stream.nb_frames.as_deref().and_then(|n| n.parse().ok()),
    })
}

/// Parse an ffprobe rate such as `30000/1001` or `25`. Zero or malformed
/// rates yield `None`.
pub fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("30/1"), Some(30.0));
        assert_eq!(parse_rate("25"), Some(25.0));
        assert!((parse_rate("30000/1001").unwrap() - 29.97).abs() < 0.001);
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("abc"), None);
    }

    #[test]
    fn test_parse_probe_output() {
        let json = r#"{
            "programs": [],
            "streams": [
                {"width": 1280, "height": 720, "r_frame_rate": "0/0", "avg_frame_rate": "24/1", "nb_frames": "48"}
            ]
        }"#;
        let info = parse_probe_output(json, 30.0).unwrap();
        assert_eq!((info.width, info.height), (1280, 720));
        assert_eq!(info.fps, 24.0);
        assert_eq!(info.frame_count_hint, Some(48));
    }

    #[test]
    fn test_parse_probe_falls_back_to_default_fps() {
        let json = r#"{"streams": [{"width": 4, "height": 2}]}"#;
        let info = parse_probe_output(json, 30.0).unwrap();
        assert_eq!(info.fps, 30.0);
        assert_eq!(info.frame_count_hint, None);
    }

    #[test]
    fn test_no_stream_is_unreadable() {
        assert!(matches!(
            parse_probe_output(r#"{"streams": []}"#, 30.0),
            Err(ReframeError::SourceUnreadable(_))
        ));
        assert!(matches!(
            parse_probe_output("{}", 30.0),
            Err(ReframeError::SourceUnreadable(_))
        ));
    }
}
