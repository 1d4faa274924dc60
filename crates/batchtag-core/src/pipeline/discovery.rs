//! Folder loading: find images in one directory and decode them to RGB.

use std::path::{Path, PathBuf};

use image::RgbImage;
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::{PipelineError, PipelineResult};

/// A decoded image ready for tagging.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Full path to the source file
    pub path: PathBuf,
    /// Just the filename portion
    pub filename: String,
    /// Decoded RGB8 pixels
    pub pixels: RgbImage,
}

/// Loads the supported images of a single folder (non-recursive).
pub struct FolderLoader {
    config: ProcessingConfig,
}

impl FolderLoader {
    /// Create a new folder loader.
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Supported image files directly inside `folder`, sorted by path.
    ///
    /// A missing or unreadable folder yields an empty list.
    pub fn scan(&self, folder: &Path) -> Vec<PathBuf> {
        if !folder.is_dir() {
            tracing::error!("Not a folder: {:?}", folder);
            return vec![];
        }

        let mut files: Vec<PathBuf> = WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.is_supported(e.path()))
            .map(|e| e.into_path())
            .collect();

        // Sort by path for deterministic ordering
        files.sort();
        files
    }

    /// Scan and decode every supported image in `folder`.
    ///
    /// Files that fail to decode or have zero area are logged and skipped.
    pub fn load(&self, folder: &Path) -> Vec<LoadedImage> {
        let paths = self.scan(folder);
        let mut images = Vec::with_capacity(paths.len());

        for path in paths {
            match Self::decode(&path) {
                Ok(image) => images.push(image),
                Err(e) => tracing::warn!("Skipping {:?}: {e}", path),
            }
        }

        tracing::debug!("Loaded {} images from {:?}", images.len(), folder);
        images
    }

    /// Decode one file into RGB8.
    pub fn decode(path: &Path) -> PipelineResult<LoadedImage> {
        let pixels = image::open(path)
            .map_err(|e| PipelineError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .to_rgb8();

        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::EmptyImage { width, height });
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(LoadedImage {
            path: path.to_path_buf(),
            filename,
            pixels,
        })
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn write_png(path: &Path, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, Rgb([10, 20, 30]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_is_supported() {
        let loader = FolderLoader::new(ProcessingConfig::default());

        assert!(loader.is_supported(Path::new("test.jpg")));
        assert!(loader.is_supported(Path::new("test.JPG")));
        assert!(loader.is_supported(Path::new("test.jpeg")));
        assert!(loader.is_supported(Path::new("test.png")));
        assert!(loader.is_supported(Path::new("test.webp")));
        assert!(!loader.is_supported(Path::new("test.txt")));
        assert!(!loader.is_supported(Path::new("test")));
    }

    #[test]
    fn test_scan_is_sorted_and_non_recursive() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("b.png"), 2, 2);
        write_png(&dir.path().join("a.png"), 2, 2);
        std::fs::write(dir.path().join("a.txt"), "blue sky").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        write_png(&dir.path().join("nested/c.png"), 2, 2);

        let loader = FolderLoader::new(ProcessingConfig::default());
        let files = loader.scan(dir.path());

        assert_eq!(
            files,
            vec![dir.path().join("a.png"), dir.path().join("b.png")]
        );
    }

    #[test]
    fn test_load_skips_undecodable_files() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("good.png"), 3, 2);
        std::fs::write(dir.path().join("broken.jpg"), b"not a jpeg").unwrap();

        let loader = FolderLoader::new(ProcessingConfig::default());
        let images = loader.load(dir.path());

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].filename, "good.png");
        assert_eq!(images[0].pixels.dimensions(), (3, 2));
        assert_eq!(images[0].pixels.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_missing_folder_is_empty() {
        let loader = FolderLoader::new(ProcessingConfig::default());
        assert!(loader.load(Path::new("/nonexistent/folder")).is_empty());
    }
}
