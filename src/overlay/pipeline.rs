/// Per-pair pipeline: read dump, extract leaf bounds, decode screenshot,
/// render the overlay.
use crate::errors::{HighlightError, HighlightResult};
use crate::layout::extract_leaf_bounds;
use crate::overlay::annotator::{render, AnnotatedImage, OverlayStyle};
use crate::upload::UploadedFile;

pub async fn generate_highlights(
    layout_dump: &dyn UploadedFile,
    screenshot: &dyn UploadedFile,
    style: &OverlayStyle,
) -> HighlightResult<AnnotatedImage> {
    let text = layout_dump.read_text().await?;
    let extraction = extract_leaf_bounds(&text);
    if !extraction.diagnostics.is_empty() {
        tracing::info!(
            file = %layout_dump.name(),
            skipped = extraction.diagnostics.len(),
            "some layout nodes were skipped"
        );
    }

    let bytes = screenshot.read_bytes().await?;
    let name = screenshot.name().to_string();
    let boxes = extraction.boxes;
    let style = *style;
    // Decoding, stroking and PNG encoding are CPU-bound; keep them off the async workers.
    tokio::task::spawn_blocking(move || {
        let img = image::load_from_memory(&bytes)
            .map_err(|e| HighlightError::Decode(format!("{name}: {e}")))?;
        render(&img, &boxes, &style)
    })
    .await
    .map_err(|e| HighlightError::Join(format!("render task: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::MemoryFile;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn png(w: u32, h: u32) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255])))
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[tokio::test]
    async fn produces_annotated_png_of_source_size() {
        let dump = MemoryFile::new("x.xml", r#"<node bounds="[0,0][10,10]"/>"#);
        let shot = MemoryFile::new("x.png", png(32, 16));
        let out = generate_highlights(&dump, &shot, &OverlayStyle::default())
            .await
            .unwrap();
        assert_eq!((out.width, out.height), (32, 16));
        let decoded = out.decode().unwrap().to_rgba8();
        assert_eq!(*decoded.get_pixel(0, 0), Rgba([255, 255, 0, 255]));
    }

    #[tokio::test]
    async fn large_screenshot_renders_on_the_blocking_pool() {
        let dump = MemoryFile::new("big.xml", r#"<node bounds="[0,0][1999,1999]"/>"#);
        let shot = MemoryFile::new("big.png", png(2000, 2000));
        let out = generate_highlights(&dump, &shot, &OverlayStyle::default())
            .await
            .unwrap();
        assert_eq!((out.width, out.height), (2000, 2000));
        let decoded = out.decode().unwrap().to_rgba8();
        assert_eq!(*decoded.get_pixel(0, 0), Rgba([255, 255, 0, 255]));
    }

    #[tokio::test]
    async fn undecodable_screenshot_is_an_error() {
        let dump = MemoryFile::new("x.xml", "<hierarchy/>");
        let shot = MemoryFile::new("x.png", b"not an image".to_vec());
        let err = generate_highlights(&dump, &shot, &OverlayStyle::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HighlightError::Decode(_)));
    }
}
