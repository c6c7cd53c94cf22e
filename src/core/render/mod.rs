//! Handout document rendering: title band, intro, one card per service,
//! closing line, paginated with a "Page N of TOTAL" footer.

pub mod glyph;
pub mod layout;
pub mod pdf;

use crate::domain::model::{HandoutText, ServiceRecord};
use chrono::NaiveDateTime;
use glyph::CategoryGlyph;

pub const DEFAULT_TITLE: &str = "Service Handout";

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCard {
    pub service: ServiceRecord,
    pub glyph: CategoryGlyph,
}

impl ServiceCard {
    pub fn new(service: ServiceRecord) -> Self {
        let glyph = CategoryGlyph::for_category(&service.category);
        Self { service, glyph }
    }
}

/// Everything the renderer needs, derived once per handout.
#[derive(Debug, Clone, PartialEq)]
pub struct HandoutDocument {
    pub intro: String,
    pub cards: Vec<ServiceCard>,
    pub closing: String,
    pub generated_at: NaiveDateTime,
}

impl HandoutDocument {
    pub fn assemble(text: HandoutText, services: &[ServiceRecord], generated_at: NaiveDateTime) -> Self {
        Self {
            intro: text.intro,
            cards: services.iter().cloned().map(ServiceCard::new).collect(),
            closing: text.closing,
            generated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub title: String,
    /// Organisation shown in the footer and used for the file name.
    pub org: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            org: "NFCM".to_string(),
        }
    }
}

impl RenderOptions {
    pub fn file_name(&self) -> String {
        handout_file_name(&self.org)
    }
}

/// `<org>_handout.pdf`, with anything unsafe for a file name replaced.
pub fn handout_file_name(org: &str) -> String {
    let cleaned: String = org
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let stem = if cleaned.is_empty() { "service" } else { cleaned.as_str() };
    format!("{}_handout.pdf", stem)
}

pub fn render(document: &HandoutDocument, options: &RenderOptions) -> Vec<u8> {
    let footer_label = format!("{} handout", options.org);
    let layout = layout::layout_document(document, &options.title, &footer_label);

    tracing::debug!(
        "Rendered {} cards over {} pages",
        layout.cards.len(),
        layout.pages.len()
    );

    let info = pdf::DocumentInfo {
        title: options.title.clone(),
        producer: concat!("service-handout ", env!("CARGO_PKG_VERSION")).to_string(),
        creation_date: document.generated_at.format("D:%Y%m%d%H%M%S").to_string(),
    };
    pdf::write_document(&layout.pages, &info)
}

/// Intro, closing and services straight to PDF bytes with default options.
pub fn render_handout(
    intro: &str,
    closing: &str,
    services: &[ServiceRecord],
    generated_at: NaiveDateTime,
) -> Vec<u8> {
    let document = HandoutDocument::assemble(
        HandoutText {
            intro: intro.to_string(),
            closing: closing.to_string(),
        },
        services,
        generated_at,
    );
    render(&document, &RenderOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TargetAge;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap()
    }

    fn service(description: &str, address: &str) -> ServiceRecord {
        ServiceRecord {
            id: 3,
            name: "Drop-in Centre 🌿".to_string(),
            description: description.to_string(),
            category: "culture".to_string(),
            languages: vec!["Cree".to_string()],
            target_age: TargetAge::All,
            hours_today: "10:00–16:00".to_string(),
            address: address.to_string(),
            eligibility: String::new(),
        }
    }

    #[test]
    fn test_render_accepts_arbitrary_unicode() {
        let services = vec![service(
            "ᑕᑯᓐᓇᖅᑐᖅ 👨‍👩‍👧 café\u{0}\u{202e} 漢字 \u{10FFFF}",
            "ᐃᓄᒃᑎᑐᑦ Street 🏠",
        )];
        let bytes = render_handout("Welcome 😊 to the centre.", "Come back 🙏", &services, at());

        assert!(!bytes.is_empty());
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_without_services() {
        let bytes = render_handout("⚠️ Error generating handout: quota", "", &[], at());
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("(? Error generating handout: quota) Tj"));
        assert!(!text.contains("Services that may help you"));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(RenderOptions::default().file_name(), "NFCM_handout.pdf");
        assert_eq!(handout_file_name("Centre d'amitié"), "Centre_d_amiti__handout.pdf");
        assert_eq!(handout_file_name("  "), "service_handout.pdf");
    }
}
