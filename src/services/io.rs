//! Image I/O operations service
//!
//! Loading the caller's input image from disk and writing decoded stage
//! results back out. Kept apart from the orchestrator so the core never
//! touches the filesystem.

use crate::{
    error::{EnhanceError, Result},
    types::{DecodedImage, InputImage, PipelineResult, StageLabel},
};
use image::ImageFormat;
use std::path::{Path, PathBuf};

/// Extensions the uploader accepts without complaint
pub const PREFERRED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Basic facts about the input, decoded locally for preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPreview {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Service for loading input images
pub struct InputLoader;

impl InputLoader {
    /// Load an input image from a file path
    ///
    /// The mime type is derived from the extension. PNG and JPEG are the
    /// expected inputs; any other format the `image` crate recognises is
    /// accepted with a warning.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use imgly_enhance::services::InputLoader;
    ///
    /// let input = InputLoader::load("photo.jpg")?;
    /// assert_eq!(input.mime_type(), "image/jpeg");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<InputImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(EnhanceError::file_io_error(
                "read input image",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        let mime_type = Self::mime_type_for(path_ref)?;
        let bytes = std::fs::read(path_ref)
            .map_err(|e| EnhanceError::file_io_error("read input image", path_ref, &e))?;

        let filename = path_ref
            .file_name()
            .map_or_else(|| "image.png".to_string(), |name| name.to_string_lossy().into_owned());

        log::debug!(
            "Loaded input {} ({} bytes, {})",
            path_ref.display(),
            bytes.len(),
            mime_type
        );

        Ok(InputImage::new(bytes, filename, mime_type))
    }

    /// Wrap in-memory bytes, sniffing the mime type from the content
    pub fn from_bytes<F: Into<String>>(bytes: Vec<u8>, filename: F) -> Result<InputImage> {
        let format = image::guess_format(&bytes).map_err(|e| {
            EnhanceError::unsupported_format(format!("Unrecognised input image data: {}", e))
        })?;
        Ok(InputImage::new(bytes, filename, format.to_mime_type()))
    }

    /// Decode the input locally to report its format and dimensions
    pub fn preview(input: &InputImage) -> Result<InputPreview> {
        let format = image::guess_format(input.bytes())?;
        let image = image::load_from_memory_with_format(input.bytes(), format)?;
        Ok(InputPreview {
            format,
            width: image.width(),
            height: image.height(),
        })
    }

    fn mime_type_for(path: &Path) -> Result<String> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let format = ImageFormat::from_extension(&extension).ok_or_else(|| {
            EnhanceError::unsupported_format(format!(
                "'{}' has no recognised image extension (expected one of: {})",
                path.display(),
                PREFERRED_EXTENSIONS.join(", ")
            ))
        })?;

        if !PREFERRED_EXTENSIONS.contains(&extension.as_str()) {
            log::warn!(
                "Input extension '{}' is not one of {}; uploading anyway",
                extension,
                PREFERRED_EXTENSIONS.join(", ")
            );
        }

        Ok(format.to_mime_type().to_string())
    }
}

/// Service for writing decoded stage results
pub struct OutputWriter {
    output_dir: PathBuf,
}

impl OutputWriter {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// File path a stage result for `input_name` is written to
    ///
    /// `photo.jpg` with a PNG enhance result becomes `photo_enhance.png`.
    #[must_use]
    pub fn output_path(
        &self,
        input_name: &str,
        label: StageLabel,
        image: &DecodedImage,
    ) -> PathBuf {
        let stem = Path::new(input_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("image");
        self.output_dir
            .join(format!("{}_{}.{}", stem, label.as_str(), image.extension()))
    }

    /// Write one decoded image, byte-for-byte as received
    pub fn write_image<P: AsRef<Path>>(image: &DecodedImage, path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EnhanceError::file_io_error("create output directory", parent, &e)
            })?;
        }

        std::fs::write(path_ref, &image.bytes)
            .map_err(|e| EnhanceError::file_io_error("write result image", path_ref, &e))
    }

    /// Write every decoded stage of `result`, returning the written paths
    ///
    /// Failed stages are skipped.
    pub fn write_result(
        &self,
        input_name: &str,
        result: &PipelineResult,
    ) -> Result<Vec<(StageLabel, PathBuf)>> {
        let mut written = Vec::new();
        for (label, outcome) in result.stages() {
            if let Some(image) = outcome.decoded() {
                let path = self.output_path(input_name, label, image);
                Self::write_image(image, &path)?;
                log::info!("Saved {} result to {}", label, path.display());
                written.push((label, path));
            }
        }
        Ok(written)
    }
}
