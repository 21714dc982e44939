//! Prescription document rendering via `printpdf`.
//!
//! Consumes the read-only [`PrescriptionView`] projection; all access checks
//! and invariants were enforced before the view was built. Output is a
//! [`RenderedDocument`] the caller can hand to a transport or write to disk.

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use printpdf::*;
use uuid::Uuid;

use crate::error::CoreError;
use crate::prescriptions::PrescriptionView;

/// Finished render: raw bytes plus the metadata a download endpoint needs.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

/// Canonical download name for a rendered prescription.
pub fn pdf_filename(prescription_id: &Uuid) -> String {
    format!("prescription_{prescription_id}.pdf")
}

/// Renders an A4 prescription document. Returns the PDF bytes with
/// content type and filename attached.
pub fn render_prescription_pdf(view: &PrescriptionView) -> Result<RenderedDocument, CoreError> {
    let title = format!("Prescription — {}", view.patient_name);
    let (doc, page1, layer1) = PdfDocument::new(&title, Mm(210.0), Mm(297.0), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| CoreError::Unavailable(format!("PDF font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| CoreError::Unavailable(format!("PDF font error: {e}")))?;

    let mut y = Mm(280.0);

    // Header
    layer.use_text("PRESCRIPTION", 14.0, Mm(20.0), y, &bold);
    y -= Mm(6.0);
    layer.use_text(
        format!("Date: {}", view.created_at.format("%Y-%m-%d")),
        9.0,
        Mm(20.0),
        y,
        &font,
    );
    y -= Mm(4.5);
    layer.use_text(
        format!("Patient: {}", view.patient_name),
        9.0,
        Mm(20.0),
        y,
        &font,
    );
    y -= Mm(4.5);
    layer.use_text(
        format!(
            "Doctor: {} ({})",
            view.doctor_name, view.doctor_specialization
        ),
        9.0,
        Mm(20.0),
        y,
        &font,
    );
    y -= Mm(10.0);

    // Diagnosis
    layer.use_text("DIAGNOSIS:", 11.0, Mm(20.0), y, &bold);
    y -= Mm(6.0);
    for line in wrap_text(&view.diagnosis, 80) {
        layer.use_text(&line, 9.0, Mm(25.0), y, &font);
        y -= Mm(4.5);
    }
    y -= Mm(4.0);

    // Medications
    layer.use_text("MEDICATIONS:", 11.0, Mm(20.0), y, &bold);
    y -= Mm(6.0);
    for (i, med) in view.medications.iter().enumerate() {
        let text = format!(
            "  {}. {} — {} — {} — {}",
            i + 1,
            med.name,
            med.dosage,
            med.frequency,
            med.duration
        );
        for line in wrap_text(&text, 80) {
            layer.use_text(&line, 9.0, Mm(25.0), y, &font);
            y -= Mm(4.5);
        }
        if let Some(instructions) = &med.instructions {
            for line in wrap_text(&format!("     {instructions}"), 80) {
                layer.use_text(&line, 8.0, Mm(25.0), y, &font);
                y -= Mm(4.0);
            }
        }
        y -= Mm(2.0);
    }

    // Notes
    if let Some(notes) = &view.additional_notes {
        y -= Mm(4.0);
        layer.use_text("NOTES:", 11.0, Mm(20.0), y, &bold);
        y -= Mm(6.0);
        for line in wrap_text(notes, 80) {
            layer.use_text(&line, 9.0, Mm(25.0), y, &font);
            y -= Mm(4.5);
        }
    }

    // Follow-up
    if let Some(date) = view.follow_up_date {
        y -= Mm(8.0);
        layer.use_text(
            format!("Follow-up: {}", date.format("%Y-%m-%d")),
            10.0,
            Mm(20.0),
            y,
            &bold,
        );
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| CoreError::Unavailable(format!("PDF save error: {e}")))?;
    let bytes = buf
        .into_inner()
        .map_err(|e| CoreError::Unavailable(format!("PDF buffer error: {e}")))?;

    Ok(RenderedDocument {
        bytes,
        content_type: "application/pdf",
        filename: pdf_filename(&view.prescription_id),
    })
}

/// Writes a rendered document under `exports_dir`, creating it if needed.
pub fn export_to_file(
    document: &RenderedDocument,
    exports_dir: &Path,
) -> Result<PathBuf, CoreError> {
    std::fs::create_dir_all(exports_dir)
        .map_err(|e| CoreError::Unavailable(format!("Cannot create exports dir: {e}")))?;
    let path = exports_dir.join(&document.filename);
    std::fs::write(&path, &document.bytes)
        .map_err(|e| CoreError::Unavailable(format!("Cannot write PDF: {e}")))?;
    Ok(path)
}

/// Simple word-wrap helper for PDF text rendering.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.len() + word.len() + 1 > max_chars && !current.is_empty() {
            lines.push(current.clone());
            current.clear();
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::models::{Medication, Specialization};

    fn sample_view() -> PrescriptionView {
        PrescriptionView {
            prescription_id: Uuid::new_v4(),
            patient_name: "Alice Martin".into(),
            doctor_name: "Bob Nguyen".into(),
            doctor_specialization: Specialization::GeneralMedicine,
            diagnosis: "Seasonal influenza with mild dehydration".into(),
            medications: vec![
                Medication {
                    name: "Oseltamivir".into(),
                    dosage: "75mg".into(),
                    frequency: "2x daily".into(),
                    duration: "5 days".into(),
                    instructions: Some("Take with food".into()),
                },
                Medication {
                    name: "Paracetamol".into(),
                    dosage: "500mg".into(),
                    frequency: "as needed".into(),
                    duration: "5 days".into(),
                    instructions: None,
                },
            ],
            additional_notes: Some("Rest and plenty of fluids.".into()),
            follow_up_date: NaiveDate::from_ymd_opt(2024, 6, 15),
            created_at: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
        }
    }

    #[test]
    fn renders_valid_pdf() {
        let doc = render_prescription_pdf(&sample_view()).unwrap();
        assert!(!doc.bytes.is_empty());
        // PDF magic bytes: %PDF
        assert_eq!(&doc.bytes[0..4], b"%PDF");
        assert_eq!(doc.content_type, "application/pdf");
    }

    #[test]
    fn filename_follows_convention() {
        let view = sample_view();
        let doc = render_prescription_pdf(&view).unwrap();
        assert_eq!(
            doc.filename,
            format!("prescription_{}.pdf", view.prescription_id)
        );
        assert!(doc.filename.ends_with(".pdf"));
    }

    #[test]
    fn export_writes_under_exports_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = RenderedDocument {
            bytes: b"%PDF-1.4 test content".to_vec(),
            content_type: "application/pdf",
            filename: "prescription_test.pdf".into(),
        };
        let path = export_to_file(&doc, &tmp.path().join("exports")).unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), doc.bytes);
        assert!(path.to_str().unwrap().contains("exports"));
    }

    #[test]
    fn wrap_text_splits_long_lines() {
        let text = "This is a fairly long sentence that should be wrapped across lines";
        let lines = wrap_text(text, 20);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= 20));
    }

    #[test]
    fn wrap_text_short_and_empty() {
        assert_eq!(wrap_text("Short", 40), vec!["Short".to_string()]);
        assert_eq!(wrap_text("", 40), vec![String::new()]);
    }
}
