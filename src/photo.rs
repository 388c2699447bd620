use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Encoding of captured photo bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    /// Compressed JPEG still
    Jpeg,
    /// Compressed HEIC still
    Heic,
    /// Uncompressed RGB24 pixels
    Rgb24,
}

impl ImageFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ImageFormat::Jpeg | ImageFormat::Heic => 0, // Variable size, compressed
            ImageFormat::Rgb24 => 3,
        }
    }

    /// Check if format is compressed
    pub fn is_compressed(&self) -> bool {
        !matches!(self, ImageFormat::Rgb24)
    }
}

/// A single still photo handed from the capture device to the classifier
#[derive(Debug, Clone)]
pub struct Image {
    /// Sequence number assigned by the capture session
    pub id: u64,
    /// Timestamp when the photo was taken
    pub timestamp: SystemTime,
    /// Encoded bytes (shared so the classifier can borrow without copying)
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

impl Image {
    pub fn new(id: u64, data: Vec<u8>, width: u32, height: u32, format: ImageFormat) -> Self {
        Self {
            id,
            timestamp: SystemTime::now(),
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Get the expected size for uncompressed formats
    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    /// Validate data size against expected size
    pub fn validate_size(&self) -> bool {
        match self.expected_size() {
            Some(expected) => self.data.len() == expected,
            None => !self.data.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_size_validation() {
        let photo = Image::new(1, vec![0xFF, 0xD8, 0xFF, 0xD9], 640, 480, ImageFormat::Jpeg);
        assert_eq!(photo.expected_size(), None);
        assert!(photo.validate_size());

        let empty = Image::new(2, Vec::new(), 640, 480, ImageFormat::Jpeg);
        assert!(!empty.validate_size());
    }

    #[test]
    fn test_uncompressed_size_validation() {
        let photo = Image::new(1, vec![0u8; 2 * 2 * 3], 2, 2, ImageFormat::Rgb24);
        assert_eq!(photo.expected_size(), Some(12));
        assert!(photo.validate_size());

        let truncated = Image::new(2, vec![0u8; 5], 2, 2, ImageFormat::Rgb24);
        assert!(!truncated.validate_size());
    }
}
