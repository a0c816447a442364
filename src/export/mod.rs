//! PNG encoding of rendered frames and the object-storage sink boundary.

use std::io::Cursor;

use anyhow::Context;

use crate::foundation::error::{PlacardError, PlacardResult};
use crate::render::backend::FrameRGBA;

/// Encode a rendered frame as a lossless, alpha-capable PNG.
///
/// Frames are premultiplied; PNG stores straight alpha, so channels are
/// un-premultiplied first.
pub fn encode_png(frame: &FrameRGBA) -> PlacardResult<Vec<u8>> {
    let expected = (frame.width as usize)
        .checked_mul(frame.height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| PlacardError::render("frame buffer size overflow"))?;
    if frame.data.len() != expected {
        return Err(PlacardError::render(
            "frame data must match width*height*4",
        ));
    }

    let mut rgba = frame.data.clone();
    if frame.premultiplied {
        unpremultiply_rgba8_in_place(&mut rgba);
    }

    let img = image::RgbaImage::from_raw(frame.width, frame.height, rgba)
        .ok_or_else(|| PlacardError::render("frame dimensions mismatch"))?;
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        for c in &mut px[..3] {
            let v = (u16::from(*c) * 255 + a / 2) / a;
            *c = v.min(255) as u8;
        }
    }
}

/// Object-storage boundary: accepts bytes, returns a retrievable public URL.
///
/// Used for background template images, uploaded participant photos and the
/// final generated bitmap.
pub trait ObjectSink {
    /// Upload a blob and return its public URL.
    fn upload(&mut self, bytes: &[u8], content_type: &str) -> PlacardResult<String>;
}

/// In-memory sink for tests and the CLI.
#[derive(Debug, Default)]
pub struct MemorySink {
    uploads: Vec<(String, String, Vec<u8>)>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploaded blobs as `(url, content_type, bytes)` in upload order.
    pub fn uploads(&self) -> &[(String, String, Vec<u8>)] {
        &self.uploads
    }
}

impl ObjectSink for MemorySink {
    fn upload(&mut self, bytes: &[u8], content_type: &str) -> PlacardResult<String> {
        let url = format!("mem://uploads/{}", self.uploads.len());
        self.uploads
            .push((url.clone(), content_type.to_string(), bytes.to_vec()));
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, px: [u8; 4]) -> FrameRGBA {
        FrameRGBA {
            width,
            height,
            data: px.repeat((width * height) as usize),
            premultiplied: true,
        }
    }

    #[test]
    fn png_round_trip_is_lossless_for_opaque_pixels() {
        let frame = solid_frame(3, 2, [10, 200, 30, 255]);
        let png = encode_png(&frame).unwrap();

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(2, 1).0, [10, 200, 30, 255]);
    }

    #[test]
    fn premultiplied_input_is_unpremultiplied() {
        // 50% alpha, channels stored premultiplied.
        let frame = solid_frame(1, 1, [64, 64, 64, 128]);
        let png = encode_png(&frame).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        let [r, g, b, a] = decoded.get_pixel(0, 0).0;
        assert_eq!(a, 128);
        for c in [r, g, b] {
            assert!((c as i32 - 128).abs() <= 1);
        }
    }

    #[test]
    fn encode_rejects_mismatched_buffers() {
        let bad = FrameRGBA {
            width: 2,
            height: 2,
            data: vec![0u8; 7],
            premultiplied: true,
        };
        assert!(encode_png(&bad).is_err());
    }

    #[test]
    fn memory_sink_hands_back_distinct_urls() {
        let mut sink = MemorySink::new();
        let a = sink.upload(b"one", "image/png").unwrap();
        let b = sink.upload(b"two", "image/png").unwrap();
        assert_ne!(a, b);
        assert_eq!(sink.uploads().len(), 2);
        assert_eq!(sink.uploads()[0].1, "image/png");
    }
}
