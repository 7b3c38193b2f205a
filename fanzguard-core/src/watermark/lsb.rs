//! Least-significant-bit steganography for images.
//!
//! The envelope JSON is framed with a magic tag and a big-endian length,
//! then spread MSB-first across the least significant bit of each color
//! channel (alpha is left untouched). The marked image is re-encoded as
//! PNG: the embedding only survives lossless storage, which is exactly the
//! assurance level this method claims. Lossy re-compression destroys the
//! bit plane and extraction falls through to the metadata strategy.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::{ProvenanceError, Result};
use crate::watermark::{EmbeddingMethod, WatermarkEnvelope, WatermarkStrategy};

/// Marks the start of an embedded frame.
const LSB_MAGIC: &[u8; 4] = b"FZW1";

/// Magic tag plus the 4-byte body length.
const HEADER_LEN: usize = LSB_MAGIC.len() + 4;

/// Bits usable per pixel (one per color channel, alpha skipped).
const BITS_PER_PIXEL: usize = 3;

/// Embeds envelopes into the LSB plane of decodable images.
pub struct LsbStrategy;

impl LsbStrategy {
    /// Payload capacity of an image in bytes.
    fn capacity_bytes(width: u32, height: u32) -> usize {
        (width as usize * height as usize * BITS_PER_PIXEL) / 8
    }
}

impl WatermarkStrategy for LsbStrategy {
    fn method(&self) -> EmbeddingMethod {
        EmbeddingMethod::Lsb
    }

    fn supports(&self, data: &[u8]) -> bool {
        image::guess_format(data).is_ok()
    }

    fn embed(&self, data: &[u8], envelope: &WatermarkEnvelope) -> Result<Vec<u8>> {
        let img = image::load_from_memory(data).map_err(|e| ProvenanceError::Embedding {
            method: "lsb".to_string(),
            reason: format!("cannot decode carrier image: {e}"),
        })?;
        let mut rgba = img.to_rgba8();

        let body = envelope.to_json()?;
        let mut framed = Vec::with_capacity(HEADER_LEN + body.len());
        framed.extend_from_slice(LSB_MAGIC);
        framed.extend_from_slice(&(body.len() as u32).to_be_bytes());
        framed.extend_from_slice(&body);

        let capacity = Self::capacity_bytes(rgba.width(), rgba.height());
        if framed.len() > capacity {
            return Err(ProvenanceError::Embedding {
                method: "lsb".to_string(),
                reason: format!(
                    "carrier holds {capacity} bytes, watermark needs {}",
                    framed.len()
                ),
            });
        }

        write_bits(&mut rgba, &framed);

        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| ProvenanceError::Embedding {
                method: "lsb".to_string(),
                reason: format!("png encode failed: {e}"),
            })?;
        Ok(out.into_inner())
    }

    fn try_extract(&self, data: &[u8]) -> Result<Option<WatermarkEnvelope>> {
        let Ok(img) = image::load_from_memory(data) else {
            return Ok(None);
        };
        let rgba = img.to_rgba8();

        let capacity = Self::capacity_bytes(rgba.width(), rgba.height());
        if capacity < HEADER_LEN {
            return Ok(None);
        }

        let header = read_bytes(&rgba, 0, HEADER_LEN);
        if &header[..LSB_MAGIC.len()] != LSB_MAGIC {
            return Ok(None);
        }

        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&header[LSB_MAGIC.len()..HEADER_LEN]);
        let body_len = u32::from_be_bytes(len_bytes) as usize;

        // A matching magic with an impossible length is noise, not a mark.
        if body_len == 0 || HEADER_LEN + body_len > capacity {
            return Ok(None);
        }

        let body = read_bytes(&rgba, HEADER_LEN, body_len);
        let envelope = WatermarkEnvelope::from_json(&body).map_err(|e| {
            ProvenanceError::Extraction(format!("lsb frame present but undecodable: {e}"))
        })?;

        Ok(Some(envelope))
    }
}

/// Spread the bytes MSB-first over the color-channel LSBs.
fn write_bits(rgba: &mut RgbaImage, bytes: &[u8]) {
    let total_bits = bytes.len() * 8;
    let mut bit_index = 0;

    'pixels: for pixel in rgba.pixels_mut() {
        for channel in 0..BITS_PER_PIXEL {
            if bit_index >= total_bits {
                break 'pixels;
            }
            let bit = (bytes[bit_index / 8] >> (7 - (bit_index % 8))) & 1;
            pixel[channel] = (pixel[channel] & 0xFE) | bit;
            bit_index += 1;
        }
    }
}

/// Read `byte_count` bytes starting `byte_offset` bytes into the bit stream.
///
/// Callers must check capacity first; short reads return what was gathered
/// and fail the magic or JSON check downstream.
fn read_bytes(rgba: &RgbaImage, byte_offset: usize, byte_count: usize) -> Vec<u8> {
    let skip_bits = byte_offset * 8;
    let want_bits = byte_count * 8;

    let mut bytes = vec![0u8; byte_count];
    let mut seen = 0usize;
    let mut taken = 0usize;

    'pixels: for pixel in rgba.pixels() {
        for channel in 0..BITS_PER_PIXEL {
            if taken >= want_bits {
                break 'pixels;
            }
            if seen < skip_bits {
                seen += 1;
                continue;
            }
            let bit = pixel[channel] & 1;
            bytes[taken / 8] |= bit << (7 - (taken % 8));
            taken += 1;
        }
    }

    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::ForensicPayload;
    use crate::signature::SignatureGenerator;
    use crate::watermark::metadata::MetadataStrategy;

    fn sample_envelope() -> WatermarkEnvelope {
        let payload = ForensicPayload::new("creator-1", "platform-1", "asset-1")
            .with_timestamp(1_700_000_000_000);
        WatermarkEnvelope::new(SignatureGenerator::generate(), payload).unwrap()
    }

    fn test_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([
                (x % 256) as u8,
                (y % 256) as u8,
                ((x + y) % 256) as u8,
                255,
            ])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_supports_images_only() {
        assert!(LsbStrategy.supports(&test_png(16, 16)));
        assert!(!LsbStrategy.supports(b"plain text"));
        assert!(!LsbStrategy.supports(&[]));
    }

    #[test]
    fn test_roundtrip() {
        let envelope = sample_envelope();
        let carrier = test_png(128, 128);

        let marked = LsbStrategy.embed(&carrier, &envelope).unwrap();
        let recovered = LsbStrategy.try_extract(&marked).unwrap().unwrap();

        assert_eq!(recovered, envelope);
        assert!(recovered.verify_integrity().unwrap());
    }

    #[test]
    fn test_marked_image_still_decodes() {
        let marked = LsbStrategy.embed(&test_png(128, 128), &sample_envelope()).unwrap();
        let img = image::load_from_memory(&marked).unwrap();
        assert_eq!(img.width(), 128);
        assert_eq!(img.height(), 128);
    }

    #[test]
    fn test_pixel_deltas_stay_in_lsb() {
        let carrier = test_png(64, 64);
        let marked = LsbStrategy.embed(&carrier, &sample_envelope()).unwrap();

        let before = image::load_from_memory(&carrier).unwrap().to_rgba8();
        let after = image::load_from_memory(&marked).unwrap().to_rgba8();

        for (a, b) in before.pixels().zip(after.pixels()) {
            for channel in 0..4 {
                let delta = a[channel].abs_diff(b[channel]);
                assert!(delta <= 1, "channel changed by more than the LSB");
            }
        }
    }

    #[test]
    fn test_capacity_exceeded_errors() {
        // 4x4 RGBA holds 6 payload bytes; the envelope cannot fit.
        let err = LsbStrategy
            .embed(&test_png(4, 4), &sample_envelope())
            .unwrap_err();
        match err {
            ProvenanceError::Embedding { method, reason } => {
                assert_eq!(method, "lsb");
                assert!(reason.contains("capacity") || reason.contains("holds"));
            }
            other => panic!("expected embedding error, got {other:?}"),
        }
    }

    #[test]
    fn test_undecodable_carrier_errors_on_embed() {
        let err = LsbStrategy.embed(b"not an image", &sample_envelope()).unwrap_err();
        assert!(matches!(err, ProvenanceError::Embedding { .. }));
    }

    #[test]
    fn test_unmarked_image_is_none() {
        assert!(LsbStrategy.try_extract(&test_png(64, 64)).unwrap().is_none());
    }

    #[test]
    fn test_non_image_is_none() {
        assert!(LsbStrategy.try_extract(b"plain bytes").unwrap().is_none());
    }

    #[test]
    fn test_metadata_block_does_not_trigger_lsb() {
        // A metadata-marked image has no LSB frame.
        let carrier = test_png(64, 64);
        let marked = MetadataStrategy.embed(&carrier, &sample_envelope()).unwrap();
        assert!(LsbStrategy.try_extract(&marked).unwrap().is_none());
    }

    #[test]
    fn test_capacity_math() {
        assert_eq!(LsbStrategy::capacity_bytes(4, 4), 6);
        assert_eq!(LsbStrategy::capacity_bytes(128, 128), 6144);
    }
}
