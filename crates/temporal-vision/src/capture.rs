//! Image loading and format handling.

use std::path::Path;

use image::ImageFormat;

use crate::types::{ChangeError, ChangeResult, SceneImage};

/// Load an image from a file path.
pub fn load_from_file(path: &str) -> ChangeResult<SceneImage> {
    let img = image::open(path)
        .map_err(|e| ChangeError::UnreadableImage(format!("{path}: {e}")))?;
    Ok(SceneImage::new(img))
}

/// Load an image from raw encoded bytes (PNG, JPEG, ...).
pub fn load_from_memory(bytes: &[u8]) -> ChangeResult<SceneImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| ChangeError::UnreadableImage(e.to_string()))?;
    Ok(SceneImage::new(img))
}

/// Load an image from base64-encoded data.
pub fn load_from_base64(data: &str, mime: &str) -> ChangeResult<SceneImage> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| ChangeError::UnreadableImage(format!("invalid base64: {e}")))?;

    let format = match mime {
        "image/png" => Some(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/webp" => Some(ImageFormat::WebP),
        "image/gif" => Some(ImageFormat::Gif),
        _ => None,
    };

    let img = if let Some(fmt) = format {
        image::load_from_memory_with_format(&bytes, fmt)
    } else {
        image::load_from_memory(&bytes)
    }
    .map_err(|e| ChangeError::UnreadableImage(e.to_string()))?;

    Ok(SceneImage::new(img))
}

/// Check if a file path points to a supported image format.
pub fn is_supported_format(path: &str) -> bool {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    matches!(
        ext.as_str(),
        "png" | "jpg" | "jpeg" | "webp" | "gif" | "bmp" | "tiff" | "tif" | "ico"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use image::DynamicImage;

    fn encode_png(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        img.write_with_encoder(encoder).unwrap();
        buf
    }

    #[test]
    fn test_load_from_memory() {
        let bytes = encode_png(&DynamicImage::new_rgb8(8, 4));
        let scene = load_from_memory(&bytes).unwrap();
        assert_eq!(scene.width(), 8);
        assert_eq!(scene.height(), 4);
    }

    #[test]
    fn test_load_from_memory_garbage() {
        let err = load_from_memory(b"not an image").unwrap_err();
        assert!(matches!(err, ChangeError::UnreadableImage(_)));
    }

    #[test]
    fn test_load_from_base64() {
        let bytes = encode_png(&DynamicImage::new_rgb8(3, 3));
        let data = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let scene = load_from_base64(&data, "image/png").unwrap();
        assert_eq!(scene.width(), 3);
    }

    #[test]
    fn test_load_from_base64_invalid() {
        let err = load_from_base64("???", "image/png").unwrap_err();
        assert!(matches!(err, ChangeError::UnreadableImage(_)));
    }

    #[test]
    fn test_supported_formats() {
        assert!(is_supported_format("scene.png"));
        assert!(is_supported_format("scene.JPG"));
        assert!(is_supported_format("scene.tiff"));
        assert!(!is_supported_format("scene.txt"));
        assert!(!is_supported_format("scene"));
    }
}
