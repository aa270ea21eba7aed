// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Where finished rasters go.  The renderer only knows about the
//! `RasterSink` trait; the file sink encodes through the `image`
//! crate.
use error::FractalError;
use image::jpeg::JPEGEncoder;
use image::pnm::PNMEncoder;
use image::pnm::{PNMSubtype, SampleEncoding};
use image::{ColorType, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Receives the completed raster as the last step of a render.
pub trait RasterSink {
    /// Consume the raster.
    fn write(&self, raster: &RgbaImage) -> Result<(), FractalError>;
}

/// Encodings the file sink can produce.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Baseline JPEG.
    Jpeg,
    /// Binary PNM pixmap (P6).
    Pnm,
}

impl OutputFormat {
    /// Guess the format from a file extension: PNM-family extensions
    /// give Pnm, anything else Jpeg.
    pub fn from_path<P: AsRef<Path>>(path: P) -> OutputFormat {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_ref().map(|ext| ext.as_str()) {
            Some("pnm") | Some("ppm") => OutputFormat::Pnm,
            _ => OutputFormat::Jpeg,
        }
    }
}

/// Default file name for a render.
pub const DEFAULT_OUTPUT: &str = "fractal.jpg";

/// Writes the raster to a file.  Neither format carries alpha, so the
/// alpha channel is dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct FileSink {
    path: PathBuf,
    format: OutputFormat,
}

impl Default for FileSink {
    fn default() -> FileSink {
        FileSink::new(DEFAULT_OUTPUT, OutputFormat::Jpeg)
    }
}

impl FileSink {
    /// A sink writing `format` to `path`.
    pub fn new<P: AsRef<Path>>(path: P, format: OutputFormat) -> FileSink {
        FileSink {
            path: path.as_ref().to_path_buf(),
            format,
        }
    }

    /// A sink whose format follows the path's extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> FileSink {
        let format = OutputFormat::from_path(&path);
        FileSink::new(path, format)
    }

    /// The destination.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The encoding.
    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

fn rgb_bytes(raster: &RgbaImage) -> Vec<u8> {
    raster
        .chunks(4)
        .flat_map(|pixel| pixel[..3].iter().cloned())
        .collect()
}

impl RasterSink for FileSink {
    fn write(&self, raster: &RgbaImage) -> Result<(), FractalError> {
        let (width, height) = raster.dimensions();
        let pixels = rgb_bytes(raster);
        let mut output = BufWriter::new(File::create(&self.path)?);
        match self.format {
            OutputFormat::Jpeg => {
                let mut encoder = JPEGEncoder::new(&mut output);
                encoder.encode(&pixels, width, height, ColorType::RGB(8))?;
            }
            OutputFormat::Pnm => {
                let mut encoder = PNMEncoder::new(&mut output)
                    .with_subtype(PNMSubtype::Pixmap(SampleEncoding::Binary));
                encoder.encode(&pixels[..], width, height, ColorType::RGB(8))?;
            }
        }
        info!(
            "wrote {}x{} {:?} image to {}",
            width,
            height,
            self.format,
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn formats_follow_extensions() {
        assert_eq!(OutputFormat::from_path("out.jpg"), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_path("out.PPM"), OutputFormat::Pnm);
        assert_eq!(OutputFormat::from_path("out.pnm"), OutputFormat::Pnm);
        assert_eq!(OutputFormat::from_path("out"), OutputFormat::Jpeg);
    }

    #[test]
    fn default_sink_is_fractal_jpg() {
        let sink = FileSink::default();
        assert_eq!(sink.path(), Path::new("fractal.jpg"));
        assert_eq!(sink.format(), OutputFormat::Jpeg);
    }

    #[test]
    fn alpha_is_dropped() {
        let raster = RgbaImage::from_pixel(2, 1, Rgba([1, 2, 3, 4]));
        assert_eq!(rgb_bytes(&raster), vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn unwritable_paths_are_io_errors() {
        let sink = FileSink::new("/nonexistent-directory/fractal.jpg", OutputFormat::Jpeg);
        let raster = RgbaImage::new(1, 1);
        match sink.write(&raster) {
            Err(FractalError::Io(_)) => {}
            other => panic!("expected an Io error, got {:?}", other),
        }
    }
}
