//! Shared fixtures for unit tests.

use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;

use crate::models::image::{CapturedImage, ImageKind};
use crate::models::label::{ClientValidationResult, LabelMetadata};
use crate::models::verification::{Verdict, VerificationVerdict};

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([180, 40, 40])))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode png fixture");
    buf
}

pub fn captured(kind: ImageKind) -> CapturedImage {
    CapturedImage::from_bytes(png_bytes(16, 12), kind).expect("png fixture is a valid image")
}

pub fn validation(is_valid: bool, shipping_number: &str) -> ClientValidationResult {
    ClientValidationResult {
        is_valid,
        missing_fields: Vec::new(),
        detected_data: LabelMetadata {
            shipping_number: shipping_number.to_string(),
            ean: "E1".to_string(),
            ql: "QL-7".to_string(),
            brand: "Vero Moda".to_string(),
            color: "Black".to_string(),
            size: "M".to_string(),
            vendor_size: "38".to_string(),
            description: "Knitted midi dress".to_string(),
        },
    }
}

pub fn verdict(ean: Verdict, visual: Verdict, damage: Verdict) -> VerificationVerdict {
    VerificationVerdict {
        ean_match: ean,
        visual_match: visual,
        damage_detected: damage,
        ean_details: "EAN on the hang tag matches the label.".to_string(),
        client_ean: "E1".to_string(),
        return_ean: "E1".to_string(),
        shipping_number: "X1".to_string(),
        visual_details: "Brand logo and color are consistent with the label.".to_string(),
        damage_details: "No stains, tears or signs of use.".to_string(),
        summary: "Returned garment corresponds to the order.".to_string(),
    }
}
