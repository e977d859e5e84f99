//! Test fixtures: generated garment stills and canned AI / dashboard payloads

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use std::io::Cursor;

pub const SHIPPING_NUMBER: &str = "ABC123";

fn encode(width: u32, height: u32, color: [u8; 3], format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
        .write_to(&mut Cursor::new(&mut buf), format)
        .expect("encode fixture image");
    buf
}

/// Photo of the shipping label.
pub fn label_png() -> Vec<u8> {
    encode(32, 24, [240, 240, 230], ImageFormat::Png)
}

/// Photo of the returned garment.
pub fn garment_jpeg(shade: u8) -> Vec<u8> {
    encode(40, 30, [shade, 30, 60], ImageFormat::Jpeg)
}

/// Bytes that no image codec recognises.
pub fn not_an_image() -> Vec<u8> {
    b"%PDF-1.4 definitely not a photo".to_vec()
}

/// Label extraction answer as the model would return it.
pub fn extraction_json(is_valid: bool) -> Value {
    json!({
        "isValid": is_valid,
        "missingFields": if is_valid { json!(["vendorSize"]) } else { json!(["shippingNumber"]) },
        "detectedData": {
            "shippingNumber": if is_valid { SHIPPING_NUMBER } else { "" },
            "ean": "8445678901234",
            "ql": "QL-7",
            "brand": "Vero Moda",
            "color": "Black",
            "size": "M",
            "vendorSize": "",
            "description": "Knitted midi dress"
        }
    })
}

/// Verdict with the appearance axis flagged.
pub fn verdict_json(visual: &str) -> Value {
    json!({
        "eanMatch": "OK",
        "visualMatch": visual,
        "damageDetected": "OK",
        "eanDetails": "Hang tag EAN matches the label.",
        "clientEan": "8445678901234",
        "returnEan": "8445678901234",
        "shippingNumber": SHIPPING_NUMBER,
        "visualDetails": "Color differs slightly from the catalogue photo.",
        "damageDetails": "No stains, tears or signs of use.",
        "summary": "Garment returned in good condition."
    })
}

/// Records as served by the spreadsheet backend.
pub fn dashboard_records() -> Value {
    json!([
        {
            "date": "2024-03-05T14:07:09Z",
            "shippingNumber": "ABC123",
            "ean": "8445678901234",
            "ql": "QL-7",
            "description": "Knitted midi dress",
            "status": "Warning",
            "link": "https://drive.example/abc123"
        },
        {
            "date": "2024-03-06T09:00:00Z",
            "shippingNumber": "abc777",
            "status": "OK",
            "link": "https://drive.example/abc777"
        },
        {
            "date": "",
            "shippingNumber": "XYZ001",
            "status": "ok"
        }
    ])
}
