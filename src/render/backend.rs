//! The rendered-frame type produced by the compositor backend.

/// A rendered card as RGBA8 pixels.
///
/// Pixel data is **premultiplied alpha**; the `premultiplied` flag makes this
/// explicit at API boundaries (PNG export un-premultiplies).
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}
