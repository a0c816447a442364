//! Decoding and preparing image assets into premultiplied RGBA8 for compositing.

use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::{PlacardError, PlacardResult};

/// Uploaded participant photos are capped at 5 MiB at the intake boundary.
pub const MAX_PHOTO_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Prepared raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    /// Build directly from premultiplied pixels (tests, synthetic images).
    pub fn from_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> PlacardResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| PlacardError::render("image buffer size overflow"))?;
        if rgba8_premul.len() != expected {
            return Err(PlacardError::render(
                "image bytes must match width*height*4",
            ));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// width / height as an aspect ratio.
    pub fn aspect(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height.max(1))
    }
}

/// Decode an encoded image (PNG, JPEG, ...) into premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> PlacardResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Decode a participant photo upload, enforcing the intake size cap.
pub fn decode_photo_upload(bytes: &[u8]) -> PlacardResult<PreparedImage> {
    if bytes.len() > MAX_PHOTO_UPLOAD_BYTES {
        return Err(PlacardError::validation(format!(
            "photo exceeds {} byte limit",
            MAX_PHOTO_UPLOAD_BYTES
        )));
    }
    decode_image(bytes)
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
        let img = image::RgbaImage::from_raw(width, height, rgba.to_vec()).unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decode_image_premultiplies() {
        let buf = png_bytes(1, 1, &[100, 50, 200, 128]);
        let prepared = decode_image(&buf).unwrap();
        assert_eq!((prepared.width, prepared.height), (1, 1));
        assert_eq!(
            prepared.rgba8_premul.as_slice(),
            &[
                ((100u16 * 128 + 127) / 255) as u8,
                ((50u16 * 128 + 127) / 255) as u8,
                ((200u16 * 128 + 127) / 255) as u8,
                128
            ]
        );
    }

    #[test]
    fn photo_upload_cap_is_enforced() {
        let big = vec![0u8; MAX_PHOTO_UPLOAD_BYTES + 1];
        assert!(matches!(
            decode_photo_upload(&big),
            Err(PlacardError::Validation(_))
        ));
    }

    #[test]
    fn from_premul_rejects_bad_lengths() {
        assert!(PreparedImage::from_premul(2, 2, vec![0u8; 15]).is_err());
        assert!(PreparedImage::from_premul(2, 2, vec![0u8; 16]).is_ok());
    }
}
