//! Snapshot extraction
//!
//! Grabs a single still frame from the composed video source at finalize
//! time and encodes it as an in-memory PNG thumbnail, so the host gets a
//! preview image without decoding the full artifact.

use crate::capture::session::CaptureSession;
use crate::capture::traits::VideoFrame;
use crate::utils::error::{PipelineError, PipelineResult};

/// A single still-image preview of a recording
#[derive(Debug, Clone)]
pub struct Thumbnail {
    /// Encoded PNG bytes
    pub data: Vec<u8>,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,
}

impl Thumbnail {
    /// Media type of the encoded bytes.
    pub const MEDIA_TYPE: &'static str = "image/png";
}

/// Capture one frame from the session's video track as a PNG thumbnail.
///
/// Returns `NoFrameAvailable` when the track has produced no frame yet
/// (acquisition raced with an immediate stop); callers treat a missing
/// thumbnail as optional, never fatal.
pub fn capture(session: &CaptureSession) -> PipelineResult<Thumbnail> {
    let frame = session
        .video_track()
        .latest_frame()
        .ok_or(PipelineError::NoFrameAvailable)?;
    encode_png(&frame)
}

fn encode_png(frame: &VideoFrame) -> PipelineResult<Thumbnail> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.width == 0 || frame.height == 0 || frame.rgba.len() != expected {
        return Err(PipelineError::NoFrameAvailable);
    }

    let mut data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut data, frame.width, frame.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| PipelineError::Io(std::io::Error::other(e)))?;
        writer
            .write_image_data(&frame.rgba)
            .map_err(|e| PipelineError::Io(std::io::Error::other(e)))?;
    }

    Ok(Thumbnail {
        data,
        width: frame.width,
        height: frame.height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_a_frame_to_png() {
        let frame = VideoFrame {
            width: 4,
            height: 2,
            rgba: vec![0x7f; 4 * 2 * 4],
        };
        let thumbnail = encode_png(&frame).unwrap();
        assert_eq!(thumbnail.width, 4);
        assert_eq!(thumbnail.height, 2);
        // PNG signature.
        assert_eq!(
            &thumbnail.data[..8],
            &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]
        );
    }

    #[test]
    fn rejects_malformed_frames() {
        let truncated = VideoFrame {
            width: 4,
            height: 4,
            rgba: vec![0; 7],
        };
        assert!(matches!(
            encode_png(&truncated),
            Err(PipelineError::NoFrameAvailable)
        ));

        let empty = VideoFrame {
            width: 0,
            height: 0,
            rgba: vec![],
        };
        assert!(matches!(
            encode_png(&empty),
            Err(PipelineError::NoFrameAvailable)
        ));
    }
}
