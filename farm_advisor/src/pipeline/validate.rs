//! Checks run before anything leaves the machine.

use farm_data_ingestor::models::image::{ImageFormat, ImageUpload};

use super::AnalysisError;

const MIB: u64 = 1024 * 1024;

pub const UNSUPPORTED_FORMAT: &str = "Only JPEG and PNG images are supported";
pub const EMPTY_FILE: &str = "Please select an image to analyze";

/// Returns the image format, or the validation message to show.
///
/// Size is checked before type; a file of exactly `max_bytes` passes.
pub fn validate_image(image: &ImageUpload, max_bytes: u64) -> Result<ImageFormat, AnalysisError> {
    if image.bytes.is_empty() {
        return Err(AnalysisError::Validation(EMPTY_FILE.to_string()));
    }
    if image.size() > max_bytes {
        return Err(AnalysisError::Validation(too_large_message(max_bytes)));
    }
    image
        .format()
        .ok_or_else(|| AnalysisError::Validation(UNSUPPORTED_FORMAT.to_string()))
}

fn too_large_message(max_bytes: u64) -> String {
    if max_bytes % MIB == 0 {
        format!("File size must be less than {}MB", max_bytes / MIB)
    } else {
        format!("File size must be less than {max_bytes} bytes")
    }
}

#[cfg(test)]
mod tests {
    use farm_data_ingestor::models::image::MAX_IMAGE_BYTES;

    use super::*;

    fn image(len: usize, mime: &str) -> ImageUpload {
        ImageUpload::new("leaf.jpg", mime, vec![0u8; len])
    }

    #[test]
    fn size_limit_is_inclusive() {
        let at_limit = image(MAX_IMAGE_BYTES as usize, "image/jpeg");
        assert_eq!(validate_image(&at_limit, MAX_IMAGE_BYTES).unwrap(), ImageFormat::Jpeg);

        let over = image(MAX_IMAGE_BYTES as usize + 1, "image/jpeg");
        let err = validate_image(&over, MAX_IMAGE_BYTES).unwrap_err();
        assert_eq!(err.to_string(), "File size must be less than 5MB");
    }

    #[test]
    fn only_jpeg_and_png() {
        assert_eq!(validate_image(&image(10, "image/png"), MAX_IMAGE_BYTES).unwrap(), ImageFormat::Png);
        for mime in ["image/gif", "image/webp", "application/octet-stream", ""] {
            let err = validate_image(&image(10, mime), MAX_IMAGE_BYTES).unwrap_err();
            assert_eq!(err.to_string(), UNSUPPORTED_FORMAT, "{mime}");
        }
    }

    #[test]
    fn empty_file_is_rejected() {
        let err = validate_image(&image(0, "image/png"), MAX_IMAGE_BYTES).unwrap_err();
        assert_eq!(err.to_string(), EMPTY_FILE);
    }

    #[test]
    fn odd_limits_are_spelled_in_bytes() {
        let err = validate_image(&image(11, "image/png"), 10).unwrap_err();
        assert_eq!(err.to_string(), "File size must be less than 10 bytes");
    }
}
