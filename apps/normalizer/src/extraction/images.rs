//! Page images for OCR: the image XObjects embedded in each page.

use std::io::Read;

use flate2::read::ZlibDecoder;
use lopdf::xobject::PdfImage;
use lopdf::Document;
use tracing::{debug, warn};

const MAX_IMAGES: usize = 100;
const MAX_TOTAL_BYTES: usize = 50 * 1024 * 1024;
/// Icons and rules below this size carry no text worth recognizing.
const MIN_DIMENSION: i64 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 1-based page number.
    pub page: u32,
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Images in page order. Blocking; an unreadable PDF yields no images.
pub fn page_images(pdf: &[u8]) -> Vec<PageImage> {
    let doc = match Document::load_mem(pdf) {
        Ok(d) => d,
        Err(e) => {
            warn!("Failed to load PDF for image extraction: {}", e);
            return vec![];
        }
    };

    let mut images = Vec::new();
    let mut total_bytes = 0usize;

    for (page_num, page_id) in doc.get_pages() {
        if images.len() >= MAX_IMAGES || total_bytes >= MAX_TOTAL_BYTES {
            debug!("Image budget reached at page {}", page_num);
            break;
        }
        let page_images = match doc.get_page_images(page_id) {
            Ok(found) => found,
            Err(e) => {
                debug!("Failed to get images from page {}: {}", page_num, e);
                continue;
            }
        };
        for pdf_image in page_images {
            if images.len() >= MAX_IMAGES || total_bytes >= MAX_TOTAL_BYTES {
                break;
            }
            if pdf_image.width < MIN_DIMENSION || pdf_image.height < MIN_DIMENSION {
                debug!("Skipping small image: {}x{}", pdf_image.width, pdf_image.height);
                continue;
            }
            if let Some(image) = decode(&pdf_image, page_num) {
                total_bytes += image.data.len();
                images.push(image);
            }
        }
    }

    debug!("Collected {} page images ({} bytes)", images.len(), total_bytes);
    images
}

fn decode(pdf_image: &PdfImage, page: u32) -> Option<PageImage> {
    let filters = pdf_image.filters.as_ref()?;

    let (data, mime_type) = if filters.iter().any(|f| f == "DCTDecode") {
        (pdf_image.content.to_vec(), "image/jpeg")
    } else if filters.iter().any(|f| f == "JPXDecode") {
        (pdf_image.content.to_vec(), "image/jp2")
    } else if filters.iter().any(|f| f == "FlateDecode") {
        match flate_to_png(pdf_image) {
            Ok(png) => (png, "image/png"),
            Err(e) => {
                debug!("Failed to decode FlateDecode image on page {}: {}", page, e);
                return None;
            }
        }
    } else {
        debug!("Unsupported image filter on page {}: {:?}", page, filters);
        return None;
    };

    Some(PageImage {
        page,
        data,
        mime_type: mime_type.to_string(),
    })
}

fn flate_to_png(pdf_image: &PdfImage) -> Result<Vec<u8>, String> {
    let mut decompressed = Vec::new();
    ZlibDecoder::new(pdf_image.content)
        .read_to_end(&mut decompressed)
        .map_err(|e| format!("decompression failed: {e}"))?;

    let width = u32::try_from(pdf_image.width).map_err(|e| e.to_string())?;
    let height = u32::try_from(pdf_image.height).map_err(|e| e.to_string())?;
    let img = match pdf_image.color_space.as_deref().unwrap_or("DeviceRGB") {
        "DeviceGray" | "Gray" => image::GrayImage::from_raw(width, height, decompressed)
            .map(image::DynamicImage::ImageLuma8),
        "DeviceCMYK" | "CMYK" => image::RgbImage::from_raw(width, height, cmyk_to_rgb(&decompressed))
            .map(image::DynamicImage::ImageRgb8),
        _ => image::RgbImage::from_raw(width, height, decompressed)
            .map(image::DynamicImage::ImageRgb8),
    }
    .ok_or_else(|| "pixel data does not match image size".to_string())?;

    let mut png = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| format!("PNG encoding failed: {e}"))?;
    Ok(png)
}

fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(cmyk.len() / 4 * 3);
    for px in cmyk.chunks_exact(4) {
        let k = 1.0 - f32::from(px[3]) / 255.0;
        for &channel in &px[..3] {
            rgb.push((255.0 * (1.0 - f32::from(channel) / 255.0) * k) as u8);
        }
    }
    rgb
}


#[cfg(test)]
mod tests {
    use super::fixtures::scanned_pdf;
    use super::*;

    #[test]
    fn test_jpeg_images_are_passed_through() {
        let images = page_images(&scanned_pdf(100, 100));
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].page, 1);
        assert_eq!(images[0].mime_type, "image/jpeg");
        assert!(images[0].data.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn test_small_images_are_skipped() {
        assert!(page_images(&scanned_pdf(20, 200)).is_empty());
    }

    #[test]
    fn test_unreadable_pdf_has_no_images() {
        assert!(page_images(b"not a pdf").is_empty());
    }

    #[test]
    fn test_cmyk_conversion() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0, 255, 255, 255, 255]), vec![255, 255, 255, 0, 0, 0]);
    }
}
