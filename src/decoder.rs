//! Decoder adapter: frame in, optional payload text out
//!
//! Most camera frames contain no readable code. That is the normal case, so
//! decoders report it as `None` and never as an error.

use crate::frame::Frame;
use tracing::debug;

/// Turns a captured frame into the text of a visible QR code
pub trait Decoder: Send + Sync {
    /// Best-effort decode. `None` when no code is found or decoding fails.
    fn decode(&self, frame: &Frame) -> Option<String>;
}

/// QR decoder backed by `rqrr`
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

impl QrDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for QrDecoder {
    fn decode(&self, frame: &Frame) -> Option<String> {
        if frame.width() == 0 || frame.height() == 0 {
            return None;
        }

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(frame.width(), frame.height(), |x, y| {
                frame.luma_at(x, y)
            });
        let grids = prepared.detect_grids();
        debug!(
            grids = grids.len(),
            width = frame.width(),
            height = frame.height(),
            "detected QR grids"
        );

        // First grid that decodes to non-empty text wins
        for (idx, grid) in grids.iter().enumerate() {
            match grid.decode() {
                Ok((_, content)) if !content.is_empty() => return Some(content),
                Ok(_) => debug!(grid = idx, "grid decoded to empty text"),
                Err(err) => debug!(grid = idx, error = ?err, "grid failed to decode"),
            }
        }

        None
    }
}

impl<F> Decoder for F
where
    F: Fn(&Frame) -> Option<String> + Send + Sync,
{
    fn decode(&self, frame: &Frame) -> Option<String> {
        self(frame)
    }
}
