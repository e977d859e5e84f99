//! Audit report assembly.
//!
//! A report is planned first as a list of pages holding positioned elements
//! (A4, millimetres measured from the top-left corner) and then rendered
//! to PDF. Pagination decisions live entirely in the plan.

use chrono::NaiveDateTime;
use printpdf::image_crate;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfLayerReference, Rect, Rgb,
};

use crate::models::image::CapturedImage;
use crate::models::label::{is_detected, ClientValidationResult, LabelMetadata, NOT_DETECTED};
use crate::models::report::{GeneratedReport, ReportMetadata};
use crate::models::verification::{AuditStatus, Verdict, VerificationVerdict};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;

/// Cursor position past which an analysis item starts on a new page.
const ANALYSIS_BREAK_Y: f32 = 260.0;
/// Lowest baseline a wrapped text line may use.
const BOTTOM_LIMIT_Y: f32 = 285.0;
const CONTINUATION_Y: f32 = 20.0;
const LINE_HEIGHT: f32 = 5.0;

const GRID_TOP: f32 = 70.0;
const CELL_WIDTH: f32 = 90.0;
const CELL_HEIGHT: f32 = 12.0;
const CELL_GAP: f32 = 4.0;
const CELL_VALUE_MAX_CHARS: usize = 40;

const EVIDENCE_PER_PAGE: usize = 4;
const EVIDENCE_WIDTH: f32 = 85.0;
const EVIDENCE_HEIGHT: f32 = 65.0;
const EVIDENCE_ROW_PITCH: f32 = 75.0;

/// DPI images are embedded at before scaling into their frame.
const IMAGE_DPI: f32 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb8(pub u8, pub u8, pub u8);

const BRAND: Rgb8 = Rgb8(79, 70, 229);
const WHITE: Rgb8 = Rgb8(255, 255, 255);
const BLACK: Rgb8 = Rgb8(0, 0, 0);
const MUTED: Rgb8 = Rgb8(100, 116, 139);
const INK: Rgb8 = Rgb8(15, 23, 42);
const BODY: Rgb8 = Rgb8(51, 65, 85);
const CELL_FILL: Rgb8 = Rgb8(248, 250, 252);
const CELL_BORDER: Rgb8 = Rgb8(226, 232, 240);
const SUMMARY_FILL: Rgb8 = Rgb8(241, 245, 249);
const PASS_GREEN: Rgb8 = Rgb8(16, 185, 129);
const WARN_RED: Rgb8 = Rgb8(225, 29, 72);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
    Italic,
}

/// Which captured image an image frame shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Reference,
    Evidence(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Rgb8,
        stroke: Option<Rgb8>,
    },
    /// Text with its baseline at `y`.
    Text {
        x: f32,
        y: f32,
        size_pt: f32,
        face: FontFace,
        color: Rgb8,
        text: String,
    },
    Image {
        slot: ImageSlot,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutPage {
    pub elements: Vec<Element>,
}

impl LayoutPage {
    /// All text on the page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub pages: Vec<LayoutPage>,
}

/// Everything a report is derived from.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub verdict: &'a VerificationVerdict,
    pub validation: Option<&'a ClientValidationResult>,
    pub reference: &'a CapturedImage,
    pub evidence: &'a [CapturedImage],
    pub generated_at: NaiveDateTime,
}

impl ReportInput<'_> {
    fn metadata(&self) -> LabelMetadata {
        self.validation
            .map(|v| v.detected_data.clone())
            .unwrap_or_default()
    }
}

/// Build the PDF, filename and storage metadata for a finished audit.
///
/// The overall status is computed once and feeds both the filename suffix
/// and the metadata record.
pub fn build_report(input: &ReportInput<'_>) -> Result<GeneratedReport, ReportError> {
    let status = input.verdict.overall_status();
    let metadata = input.metadata();
    let shipping_number = resolve_shipping_number(&metadata, input.verdict);

    let layout = plan_layout(input);
    let file_name = report_file_name(&shipping_number, input.generated_at, status);
    let pdf = render_pdf(&layout, &file_name, input.reference, input.evidence)?;

    tracing::info!(
        file_name = %file_name,
        status = %status,
        page_count = layout.pages.len(),
        size_bytes = pdf.len(),
        "Audit report generated"
    );

    Ok(GeneratedReport {
        pdf,
        file_name,
        page_count: layout.pages.len(),
        metadata: ReportMetadata {
            shipping_number,
            ean: metadata.ean,
            ql: metadata.ql,
            description: metadata.description,
            status,
        },
    })
}

/// `{shipping}_{ddMMyyyy}_{HHmm}_{S|N}.pdf`
pub fn report_file_name(shipping_number: &str, at: NaiveDateTime, status: AuditStatus) -> String {
    format!(
        "{}_{}_{}.pdf",
        file_token(shipping_number),
        at.format("%d%m%Y_%H%M"),
        status.file_suffix()
    )
}

/// Label shipping number, else the one echoed by the audit, else the sentinel.
pub fn resolve_shipping_number(metadata: &LabelMetadata, verdict: &VerificationVerdict) -> String {
    [&metadata.shipping_number, &verdict.shipping_number]
        .into_iter()
        .find(|s| is_detected(s))
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| NOT_DETECTED.to_string())
}

/// Filename-safe form of a label value: ASCII letters, digits, `-`, `_`
/// and `.` survive, slashes become `-`, anything else becomes `_`.
fn file_token(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') => c,
            _ => '_',
        })
        .collect()
}

struct Planner {
    pages: Vec<LayoutPage>,
}

impl Planner {
    fn new() -> Self {
        Self {
            pages: vec![LayoutPage::default()],
        }
    }

    fn push(&mut self, element: Element) {
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    fn new_page(&mut self) {
        self.pages.push(LayoutPage::default());
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, fill: Rgb8, stroke: Option<Rgb8>) {
        self.push(Element::Rect {
            x,
            y,
            width,
            height,
            fill,
            stroke,
        });
    }

    fn text(&mut self, x: f32, y: f32, size_pt: f32, face: FontFace, color: Rgb8, text: impl Into<String>) {
        self.push(Element::Text {
            x,
            y,
            size_pt,
            face,
            color,
            text: text.into(),
        });
    }

    /// Emit wrapped lines from `y`, continuing on a fresh page when a line
    /// would fall below the bottom limit. Returns the cursor after the block.
    fn lines(&mut self, lines: &[String], x: f32, mut y: f32, size_pt: f32, face: FontFace, color: Rgb8) -> f32 {
        for line in lines {
            if y > BOTTOM_LIMIT_Y {
                self.new_page();
                y = CONTINUATION_Y;
            }
            self.text(x, y, size_pt, face, color, line.clone());
            y += LINE_HEIGHT;
        }
        y
    }

    fn banner(&mut self, height: f32, title_y: f32, title_pt: f32, title: &str) {
        self.rect(0.0, 0.0, PAGE_WIDTH_MM, height, BRAND, None);
        self.text(15.0, title_y, title_pt, FontFace::Bold, WHITE, title);
    }
}

/// Lay out the report pages without rendering anything.
pub fn plan_layout(input: &ReportInput<'_>) -> ReportLayout {
    let mut plan = Planner::new();
    let metadata = input.metadata();

    // Header
    plan.banner(45.0, 25.0, 28.0, "AI VERIFICATION REPORT");
    plan.text(
        15.0,
        33.0,
        11.0,
        FontFace::Regular,
        WHITE,
        format!("Date: {}", input.generated_at.format("%d/%m/%Y %H:%M:%S")),
    );

    // Detected label data
    plan.text(15.0, 60.0, 16.0, FontFace::Bold, BLACK, "AI DETECTED DATA");
    let fields = metadata.labelled_fields();
    for (index, (label, value)) in fields.iter().enumerate() {
        let x = if index % 2 == 0 { 15.0 } else { 110.0 };
        let y = GRID_TOP + (index / 2) as f32 * (CELL_HEIGHT + CELL_GAP);
        plan.rect(x, y, CELL_WIDTH, CELL_HEIGHT, CELL_FILL, Some(CELL_BORDER));
        plan.text(x + 4.0, y + 4.5, 8.0, FontFace::Bold, MUTED, label.to_uppercase());
        plan.text(x + 4.0, y + 9.5, 10.0, FontFace::Bold, INK, truncate_cell(value));
    }
    let rows = fields.len().div_ceil(2) as f32;
    let mut y = GRID_TOP + rows * (CELL_HEIGHT + CELL_GAP) + 10.0;

    // Summary box
    let summary = wrap_text(&input.verdict.summary, 175.0, 10.0);
    let box_height = (summary.len() as f32 * LINE_HEIGHT + 14.0).min(PAGE_HEIGHT_MM - 10.0 - y);
    plan.rect(12.0, y, 186.0, box_height, SUMMARY_FILL, None);
    plan.text(15.0, y + 8.0, 10.0, FontFace::Bold, BLACK, "AUDIT SUMMARY:");
    let pages_before = plan.pages.len();
    let after = plan.lines(&summary, 15.0, y + 14.0, 10.0, FontFace::Italic, BLACK);
    let summary_end = if plan.pages.len() == pages_before {
        (y + box_height).max(after)
    } else {
        after
    };
    y = summary_end + 15.0;

    // Three-axis analysis
    if y > ANALYSIS_BREAK_Y {
        plan.new_page();
        y = CONTINUATION_Y;
    }
    plan.text(15.0, y, 16.0, FontFace::Bold, BLACK, "DETAILED ANALYSIS:");
    y += 10.0;

    for (number, axis) in input.verdict.axes().iter().enumerate() {
        if y > ANALYSIS_BREAK_Y {
            plan.new_page();
            y = CONTINUATION_Y;
        }
        plan.text(15.0, y, 11.0, FontFace::Bold, BLACK, format!("{}. {}:", number + 1, axis.title));
        let tag_color = match axis.verdict {
            Verdict::Ok => PASS_GREEN,
            Verdict::Warning => WARN_RED,
        };
        plan.text(100.0, y, 11.0, FontFace::Bold, tag_color, format!("[{}]", axis.verdict));
        y += 6.0;

        let details = wrap_text(axis.details, 180.0, 10.0);
        y = plan.lines(&details, 15.0, y, 10.0, FontFace::Regular, BODY) + 8.0;
    }

    // Reference photo
    plan.new_page();
    plan.banner(25.0, 17.0, 16.0, "CLIENT REFERENCE PHOTO");
    plan.push(Element::Image {
        slot: ImageSlot::Reference,
        x: 15.0,
        y: 35.0,
        width: 180.0,
        height: 130.0,
    });

    // Evidence photos, two per row, four per page
    plan.new_page();
    plan.banner(25.0, 17.0, 16.0, "RETURNED PRODUCT PHOTOS");
    for index in 0..input.evidence.len() {
        if index > 0 && index % EVIDENCE_PER_PAGE == 0 {
            plan.new_page();
            plan.banner(25.0, 17.0, 16.0, "RETURNED PRODUCT PHOTOS (CONT.)");
        }
        let slot_on_page = index % EVIDENCE_PER_PAGE;
        let x = if slot_on_page % 2 == 0 { 15.0 } else { 110.0 };
        let y = 35.0 + (slot_on_page / 2) as f32 * EVIDENCE_ROW_PITCH;
        plan.push(Element::Image {
            slot: ImageSlot::Evidence(index),
            x,
            y,
            width: EVIDENCE_WIDTH,
            height: EVIDENCE_HEIGHT,
        });
    }

    ReportLayout { pages: plan.pages }
}

fn truncate_cell(value: &str) -> String {
    if value.chars().count() > CELL_VALUE_MAX_CHARS {
        let head: String = value.chars().take(CELL_VALUE_MAX_CHARS - 3).collect();
        format!("{head}...")
    } else {
        value.to_string()
    }
}

/// Greedy word wrap using the average Helvetica glyph width.
pub fn wrap_text(text: &str, width_mm: f32, size_pt: f32) -> Vec<String> {
    const PT_TO_MM: f32 = 0.3528;
    const AVG_GLYPH_EM: f32 = 0.52;
    let max_chars = ((width_mm / (size_pt * PT_TO_MM * AVG_GLYPH_EM)) as usize).max(1);

    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word = word.to_string();
            while word.chars().count() > max_chars {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let split_at = word
                    .char_indices()
                    .nth(max_chars)
                    .map(|(i, _)| i)
                    .unwrap_or(word.len());
                let rest = word.split_off(split_at);
                lines.push(word);
                word = rest;
            }

            let needed = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn face(&self, face: FontFace) -> &IndirectFontRef {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
            FontFace::Italic => &self.italic,
        }
    }
}

/// Render a planned layout to PDF bytes.
pub fn render_pdf(
    layout: &ReportLayout,
    title: &str,
    reference: &CapturedImage,
    evidence: &[CapturedImage],
) -> Result<Vec<u8>, ReportError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");

    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
        italic: doc.add_builtin_font(BuiltinFont::HelveticaOblique)?,
    };

    for (index, page) in layout.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
            doc.get_page(page_index).get_layer(layer_index)
        };

        for element in &page.elements {
            match element {
                Element::Rect {
                    x,
                    y,
                    width,
                    height,
                    fill,
                    stroke,
                } => draw_rect(&layer, *x, *y, *width, *height, *fill, *stroke),
                Element::Text {
                    x,
                    y,
                    size_pt,
                    face,
                    color,
                    text,
                } => {
                    layer.set_fill_color(pdf_color(*color));
                    layer.use_text(text.as_str(), *size_pt, Mm(*x), Mm(PAGE_HEIGHT_MM - *y), fonts.face(*face));
                }
                Element::Image {
                    slot,
                    x,
                    y,
                    width,
                    height,
                } => {
                    let source = match slot {
                        ImageSlot::Reference => Some(reference),
                        ImageSlot::Evidence(i) => evidence.get(*i),
                    };
                    let placed = source
                        .map(|image| draw_image(&layer, image, *x, *y, *width, *height))
                        .unwrap_or(false);
                    if !placed {
                        draw_rect(&layer, *x, *y, *width, *height, CELL_FILL, Some(CELL_BORDER));
                        layer.set_fill_color(pdf_color(MUTED));
                        layer.use_text(
                            "Image unavailable",
                            10.0,
                            Mm(*x + 4.0),
                            Mm(PAGE_HEIGHT_MM - (*y + *height / 2.0)),
                            &fonts.regular,
                        );
                    }
                }
            }
        }
    }

    Ok(doc.save_to_bytes()?)
}

fn pdf_color(color: Rgb8) -> Color {
    Color::Rgb(Rgb::new(
        color.0 as f32 / 255.0,
        color.1 as f32 / 255.0,
        color.2 as f32 / 255.0,
        None,
    ))
}

fn draw_rect(layer: &PdfLayerReference, x: f32, y: f32, width: f32, height: f32, fill: Rgb8, stroke: Option<Rgb8>) {
    layer.set_fill_color(pdf_color(fill));
    let rect = Rect::new(
        Mm(x),
        Mm(PAGE_HEIGHT_MM - (y + height)),
        Mm(x + width),
        Mm(PAGE_HEIGHT_MM - y),
    );
    match stroke {
        Some(outline) => {
            layer.set_outline_color(pdf_color(outline));
            layer.set_outline_thickness(0.5);
            layer.add_rect(rect.with_mode(PaintMode::FillStroke));
        }
        None => layer.add_rect(rect),
    }
}

/// Fit an image into its frame, keeping the aspect ratio. Returns false
/// when the bytes could not be decoded.
fn draw_image(layer: &PdfLayerReference, image: &CapturedImage, x: f32, y: f32, width: f32, height: f32) -> bool {
    let decoded = match decode_for_pdf(image) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!(image_id = %image.id, error = %e, "Skipping undecodable image in report");
            return false;
        }
    };

    let natural_w = decoded.width() as f32 / IMAGE_DPI * 25.4;
    let natural_h = decoded.height() as f32 / IMAGE_DPI * 25.4;
    if natural_w <= 0.0 || natural_h <= 0.0 {
        return false;
    }
    let scale = (width / natural_w).min(height / natural_h);
    let drawn_w = natural_w * scale;
    let drawn_h = natural_h * scale;

    Image::from_dynamic_image(&decoded).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x + (width - drawn_w) / 2.0)),
            translate_y: Some(Mm(PAGE_HEIGHT_MM - y - drawn_h)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
    true
}

/// Decode with the PDF backend's image codec. WebP stills are transcoded
/// to PNG first; the backend only reads JPEG and PNG.
fn decode_for_pdf(image: &CapturedImage) -> Result<image_crate::DynamicImage, String> {
    if image.mime_type != "image/webp" {
        return image_crate::load_from_memory(&image.bytes).map_err(|e| e.to_string());
    }

    let mut png = Vec::new();
    image::load_from_memory(&image.bytes)
        .and_then(|decoded| {
            decoded.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        })
        .map_err(|e| e.to_string())?;
    image_crate::load_from_memory(&png).map_err(|e| e.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("PDF rendering failed: {0}")]
    Pdf(#[from] printpdf::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::image::ImageKind;
    use crate::test_support::{captured, validation, verdict};
    use chrono::NaiveDate;
    use crate::models::verification::Verdict::{Ok as Pass, Warning as Warn};

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .unwrap()
    }

    fn evidence(count: usize) -> Vec<CapturedImage> {
        (0..count).map(|_| captured(ImageKind::Evidence)).collect()
    }

    #[test]
    fn test_file_name_format() {
        assert_eq!(
            report_file_name("ABC123", at(5, 14, 7), AuditStatus::Ok),
            "ABC123_05032024_1407_N.pdf"
        );
        assert_eq!(
            report_file_name(NOT_DETECTED, at(5, 9, 0), AuditStatus::Warning),
            "Not_detected_05032024_0900_S.pdf"
        );
    }

    #[test]
    fn test_file_name_strips_header_unsafe_characters() {
        assert_eq!(
            report_file_name("AB\"1; x:y", at(5, 14, 7), AuditStatus::Ok),
            "AB_1__x_y_05032024_1407_N.pdf"
        );
        assert_eq!(
            report_file_name("Nº 12/3", at(5, 14, 7), AuditStatus::Warning),
            "N__12-3_05032024_1407_S.pdf"
        );
    }

    #[test]
    fn test_shipping_number_fallback_order() {
        let v = verdict(Pass, Pass, Pass);
        let label = validation(true, "LBL-1").detected_data;
        assert_eq!(resolve_shipping_number(&label, &v), "LBL-1");

        let blank = LabelMetadata::default();
        assert_eq!(resolve_shipping_number(&blank, &v), "X1");

        let mut none = v.clone();
        none.shipping_number = NOT_DETECTED.to_string();
        assert_eq!(resolve_shipping_number(&blank, &none), NOT_DETECTED);
    }

    #[test]
    fn test_warning_scenario_three_pages() {
        let v = verdict(Pass, Warn, Pass);
        let val = validation(true, "X1");
        let reference = captured(ImageKind::Reference);
        let ev = evidence(2);
        let input = ReportInput {
            verdict: &v,
            validation: Some(&val),
            reference: &reference,
            evidence: &ev,
            generated_at: at(5, 14, 7),
        };

        let report = build_report(&input).unwrap();
        assert_eq!(report.page_count, 3);
        assert_eq!(report.metadata.status, AuditStatus::Warning);
        assert_eq!(report.file_name, "X1_05032024_1407_S.pdf");
        assert_eq!(report.metadata.shipping_number, "X1");
        assert_eq!(report.metadata.ean, "E1");
        assert!(report.pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn test_suffix_agrees_with_metadata_status() {
        let reference = captured(ImageKind::Reference);
        let ev = evidence(1);
        for (ean, visual, damage) in [(Pass, Pass, Pass), (Warn, Pass, Pass), (Pass, Pass, Warn)] {
            let v = verdict(ean, visual, damage);
            let report = build_report(&ReportInput {
                verdict: &v,
                validation: None,
                reference: &reference,
                evidence: &ev,
                generated_at: at(1, 0, 0),
            })
            .unwrap();
            let suffix = report.metadata.status.file_suffix();
            assert!(report.file_name.ends_with(&format!("_{suffix}.pdf")));
        }
    }

    #[test]
    fn test_evidence_pagination() {
        let v = verdict(Pass, Pass, Pass);
        let reference = captured(ImageKind::Reference);
        for (count, pages) in [(1, 3), (4, 3), (5, 4), (8, 4), (9, 5)] {
            let ev = evidence(count);
            let layout = plan_layout(&ReportInput {
                verdict: &v,
                validation: None,
                reference: &reference,
                evidence: &ev,
                generated_at: at(1, 0, 0),
            });
            assert_eq!(layout.pages.len(), pages, "{count} evidence images");
        }
    }

    #[test]
    fn test_fifth_evidence_image_starts_continuation_page() {
        let v = verdict(Pass, Pass, Pass);
        let reference = captured(ImageKind::Reference);
        let ev = evidence(5);
        let layout = plan_layout(&ReportInput {
            verdict: &v,
            validation: None,
            reference: &reference,
            evidence: &ev,
            generated_at: at(1, 0, 0),
        });
        let last = layout.pages.last().unwrap();
        assert!(last.texts().any(|t| t == "RETURNED PRODUCT PHOTOS (CONT.)"));
        assert!(last.elements.contains(&Element::Image {
            slot: ImageSlot::Evidence(4),
            x: 15.0,
            y: 35.0,
            width: EVIDENCE_WIDTH,
            height: EVIDENCE_HEIGHT,
        }));
    }

    #[test]
    fn test_long_analysis_spills_onto_new_page() {
        let mut v = verdict(Pass, Pass, Warn);
        v.damage_details = "Visible stain near the hem. ".repeat(60);
        let reference = captured(ImageKind::Reference);
        let ev = evidence(1);
        let layout = plan_layout(&ReportInput {
            verdict: &v,
            validation: None,
            reference: &reference,
            evidence: &ev,
            generated_at: at(1, 0, 0),
        });
        assert_eq!(layout.pages.len(), 4);
        for page in &layout.pages {
            for element in &page.elements {
                if let Element::Text { y, .. } = element {
                    assert!(*y <= BOTTOM_LIMIT_Y + LINE_HEIGHT);
                }
            }
        }
    }

    #[test]
    fn test_missing_validation_renders_sentinels() {
        let v = verdict(Pass, Pass, Pass);
        let reference = captured(ImageKind::Reference);
        let layout = plan_layout(&ReportInput {
            verdict: &v,
            validation: None,
            reference: &reference,
            evidence: &[],
            generated_at: at(1, 0, 0),
        });
        let sentinels = layout.pages[0].texts().filter(|t| *t == NOT_DETECTED).count();
        assert_eq!(sentinels, 8);
        assert!(layout.pages[0].texts().all(|t| !t.is_empty()));
    }

    #[test]
    fn test_cell_values_truncated() {
        let long = "x".repeat(50);
        let cut = truncate_cell(&long);
        assert_eq!(cut.chars().count(), 40);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_cell("short"), "short");
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let text = "lorem ipsum dolor sit amet ".repeat(20);
        let lines = wrap_text(&text, 50.0, 10.0);
        assert!(lines.len() > 1);
        let max = lines.iter().map(|l| l.chars().count()).max().unwrap();
        assert!(max <= 27);
        assert_eq!(lines.join(" ").split_whitespace().count(), 100);

        let unbroken = wrap_text(&"a".repeat(120), 50.0, 10.0);
        assert!(unbroken.iter().all(|l| l.chars().count() <= 27));
    }

    #[test]
    fn test_undecodable_image_does_not_fail_render() {
        let v = verdict(Pass, Pass, Pass);
        let mut reference = captured(ImageKind::Reference);
        reference.bytes = b"\x89PNG\r\n\x1a\ncorrupt".to_vec();
        let report = build_report(&ReportInput {
            verdict: &v,
            validation: None,
            reference: &reference,
            evidence: &[],
            generated_at: at(1, 0, 0),
        })
        .unwrap();
        assert!(report.pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn test_webp_evidence_is_transcoded_for_pdf() {
        let mut webp = Vec::new();
        image::DynamicImage::ImageRgb8(image::RgbImage::new(8, 6))
            .write_to(&mut std::io::Cursor::new(&mut webp), image::ImageFormat::WebP)
            .unwrap();
        let still = CapturedImage::from_bytes(webp, ImageKind::Evidence).unwrap();
        assert_eq!(still.mime_type, "image/webp");

        let decoded = decode_for_pdf(&still).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn test_renders_accented_narrative() {
        let mut v = verdict(Pass, Warn, Pass);
        v.summary = "Prenda devuelta sin daños. Código y Nº de envío coinciden 👕".to_string();
        v.visual_details = "Ligera diferencia de color respecto a la etiqueta.".to_string();
        let val = validation(true, "X1");
        let reference = captured(ImageKind::Reference);
        let ev = evidence(2);
        let report = build_report(&ReportInput {
            verdict: &v,
            validation: Some(&val),
            reference: &reference,
            evidence: &ev,
            generated_at: at(5, 14, 7),
        })
        .unwrap();
        assert!(report.pdf.starts_with(b"%PDF"));
        assert_eq!(report.metadata.status, AuditStatus::Warning);
    }
}
