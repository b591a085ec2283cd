use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use image::{DynamicImage, ImageBuffer, ImageFormat};
use plotters::prelude::*;
use crate::drivers::error::MonitorError;
use crate::types::Rgb;
/// Landscape ST7735-class panel.
pub const PANEL_WIDTH: u32 = 160;
pub const PANEL_HEIGHT: u32 = 128;
#[derive(Clone, Debug)]
pub struct PanelStyle {
    pub width: u32,
    pub height: u32,
    pub background: Rgb,
    pub font_family: String,
    pub font_size: u32,
    pub left: i32,
    pub top: i32,
    pub line_pitch: i32,
}
impl Default for PanelStyle {
    fn default() -> Self {
        Self {
            width: PANEL_WIDTH,
            height: PANEL_HEIGHT,
            background: Rgb::BLACK,
            font_family: "sans-serif".to_owned(),
            font_size: 32,
            left: 10,
            top: 20,
            line_pitch: 30,
        }
    }
}
/// Packed RGB888 image, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}
impl Frame {
    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        Some(Rgb(self.rgb[idx], self.rgb[idx + 1], self.rgb[idx + 2]))
    }
    /// Big-endian RGB565, the panel's 16-bit pixel format.
    pub fn to_rgb565(&self) -> Vec<u8> {
        self.rgb
            .chunks_exact(3)
            .flat_map(|px| {
                let (r, g, b) = (px[0] as u16, px[1] as u16, px[2] as u16);
                let color = ((r & 0xF8) << 8) | ((g & 0xFC) << 3) | (b >> 3);
                color.to_be_bytes()
            })
            .collect()
    }
    pub fn encode_png(&self) -> Result<Vec<u8>, MonitorError> {
        let image = ImageBuffer::<image::Rgb<u8>, _>::from_raw(self.width, self.height, self.rgb.clone())
            .ok_or_else(|| MonitorError::Render("frame size does not match its pixels".into()))?;
        let mut output = Vec::new();
        DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
        Ok(output)
    }
}
fn rgb_color(c: Rgb) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}
/// Draw `text` one line per `\n`, left aligned, on a plain background.
pub fn render_text_frame(text: &str, color: Rgb, style: &PanelStyle) -> Result<Frame, MonitorError> {
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&rgb_color(style.background))?;
        let font = (style.font_family.as_str(), style.font_size)
            .into_font()
            .color(&rgb_color(color));
        for (row, line) in text.split('\n').enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let y = style.top + row as i32 * style.line_pitch;
            root.draw(&Text::new(line, (style.left, y), font.clone()))?;
        }
        root.present()?;
    }
    Ok(Frame {
        width: style.width,
        height: style.height,
        rgb: buffer,
    })
}
/// Whatever moves a finished frame to the glass (SPI driver, file, ...).
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), MonitorError>;
}
impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), MonitorError> {
        (**self).write_frame(frame)
    }
}
/// PNG for `*.png` paths; raw big-endian RGB565 (the panel's wire format)
/// for anything else, e.g. a framebuffer device.
pub fn sink_for_path(path: impl Into<PathBuf>) -> Box<dyn FrameSink> {
    let path = path.into();
    let is_png = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("png"));
    if is_png {
        Box::new(PngFrameSink::new(path))
    } else {
        Box::new(Rgb565FrameSink::new(path))
    }
}
/// Keeps the latest frame as a PNG on disk, for running without a panel.
pub struct PngFrameSink {
    path: PathBuf,
}
impl PngFrameSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}
impl FrameSink for PngFrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), MonitorError> {
        fs::write(&self.path, frame.encode_png()?)?;
        Ok(())
    }
}
/// Writes each frame as raw panel pixels, overwriting the previous one.
pub struct Rgb565FrameSink {
    path: PathBuf,
}
impl Rgb565FrameSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}
impl FrameSink for Rgb565FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), MonitorError> {
        fs::write(&self.path, frame.to_rgb565())?;
        Ok(())
    }
}
