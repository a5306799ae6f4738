// In many cases, we need to do a let binding to satisfy the borrow checker
// and for some reason, clippy identifies those as unnecessary. Maybe there
// are and clippy knows more than me, maybe not.
#![allow(clippy::let_and_return)]

use super::{
    form::{self, FormField},
    models::{self, PropertyRecord, SectionKey, ValueColumn},
};
use ammonia::{clean, clean_text};
use axum::http::StatusCode;
use std::fmt::Write;

/// Spreadsheet look: green section headers over label/value cell rows.
const STYLE: &str = r#"
    body { font-family: Arial, sans-serif; margin: 20px; background: #f5f5f5; }
    .container { max-width: 1600px; margin: 0 auto; background: white; padding: 20px; border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
    h1 { color: #333; text-align: center; margin-bottom: 8px; }
    .subtitle { text-align: center; color: #666; margin-bottom: 24px; }
    .sheet-layout { display: grid; grid-template-columns: 1fr 1fr 1fr; gap: 20px; }
    .full-width { grid-column: 1 / -1; }
    .section { border: 1px solid #ccc; border-radius: 5px; overflow: hidden; margin-bottom: 20px; }
    .section-header { background: #70ad47; color: white; font-weight: bold; padding: 8px 12px; text-align: center; font-size: 13px; }
    .field-row { display: grid; grid-template-columns: 180px 1fr; border-bottom: 1px solid #e0e0e0; min-height: 32px; align-items: center; }
    .offer-row { grid-template-columns: 180px 1fr 1fr; }
    .field-row:last-child { border-bottom: none; }
    .field-label { padding: 6px 10px; background: #f8f9fa; border-right: 1px solid #e0e0e0; font-weight: 500; font-size: 12px; }
    .field-row input, .field-row textarea { width: 100%; border: none; padding: 6px 10px; font-size: 12px; background: transparent; outline: none; box-sizing: border-box; }
    .field-row input:focus, .field-row textarea:focus { background: #fff3cd; }
    .field-row textarea { height: 50px; resize: vertical; }
    .questions textarea { height: 120px; }
    .offer-row input + input { border-left: 1px solid #e0e0e0; }
    .filled { background: #d4edda !important; }
    .filled-placeholder { background: #fff3cd !important; }
    .button-row { margin: 30px 0; text-align: center; }
    .btn { color: white; padding: 12px 30px; border: none; border-radius: 5px; font-size: 16px; cursor: pointer; text-decoration: none; display: inline-block; margin: 0 8px; }
    .save { background: #28a745; }
    .back { background: #6c757d; }
    .populate { background: #007bff; padding: 4px 10px; font-size: 11px; float: right; }
    .populate:disabled { background: #ccc; cursor: not-allowed; }
    .message { padding: 15px; margin: 20px 0; border-radius: 5px; }
    .success { background: #d4edda; color: #155724; border: 1px solid #c3e6cb; }
    .warning { background: #fff3cd; color: #856404; border: 1px solid #ffeeba; }
    .error { background: #f8d7da; color: #721c24; border: 1px solid #f5c6cb; }
    .property-list a { display: block; padding: 12px; border-bottom: 1px solid #e0e0e0; color: #0056b3; text-decoration: none; }
    .property-list code { color: #666; font-size: 12px; margin-left: 12px; }
    @media (max-width: 1200px) { .sheet-layout { grid-template-columns: 1fr 1fr; } }
    @media (max-width: 768px) { .sheet-layout { grid-template-columns: 1fr; } .field-row { grid-template-columns: 1fr; } }
"#;

/// Posts the lot number and borough from the form to `/scrape` and writes
/// the result into every primary input carrying the same `data-label`.
/// Placeholder values get a yellow highlight instead of green.
const AUTO_POPULATE_SCRIPT: &str = r#"<script>
    async function autoPopulate() {
        const btn = document.getElementById('auto-populate');
        const banner = document.getElementById('scrape-message');
        const byLabel = (label) => document.querySelectorAll(
            `[data-column="primary"][data-label="${CSS.escape(label)}"]`
        );
        const lot = [...byLabel('Lot Number')].map((el) => el.value.trim()).find(Boolean);
        if (!lot) {
            banner.className = 'message error';
            banner.innerText = 'Enter a Lot Number before auto-populating.';
            byLabel('Lot Number')[0]?.focus();
            return;
        }
        const borough = [...byLabel('Borough')].map((el) => el.value.trim()).find(Boolean);
        const original = btn.innerText;
        btn.disabled = true;
        btn.innerText = 'Looking up...';
        try {
            const response = await fetch('/scrape', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ lot_number: lot, borough: borough || undefined }),
            });
            const result = await response.json();
            if (!result.property) {
                throw new Error(result.error || 'lookup failed');
            }
            const highlight = result.success ? 'filled' : 'filled-placeholder';
            let count = 0;
            for (const [label, value] of Object.entries(result.property)) {
                for (const el of byLabel(label)) {
                    el.value = value;
                    el.classList.remove('filled', 'filled-placeholder');
                    el.classList.add(highlight);
                    count++;
                }
            }
            if (result.success) {
                banner.className = 'message success';
                banner.innerText = `Filled ${count} fields. Review them, then save.`;
            } else {
                banner.className = 'message warning';
                banner.innerText = `Lookup failed (${result.error}). ${count} fields were filled with placeholder values that are not real property data.`;
            }
        } catch (e) {
            banner.className = 'message error';
            banner.innerText = `Auto-populate failed: ${e.message}`;
        } finally {
            btn.disabled = false;
            btn.innerText = original;
        }
    }
</script>"#;

pub trait Component {
    /// Render the component to a HTML string. By convention, the
    /// implementation should sanitize all string properties at render-time
    fn render(&self) -> String;
}

pub struct Page<'a> {
    pub title: String,
    pub children: Box<dyn Component + 'a>,
}

impl Component for Page<'_> {
    fn render(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
            <html>
                <head>
                    <meta name="viewport" content="width=device-width, initial-scale=1.0"></meta>
                    <title>{title}</title>
                    <style>
                        {STYLE}
                    </style>
                </head>
                <body>
                    <div class="container">
                        {body_html}
                    </div>
                </body>
            </html>
            "#,
            title = clean(&self.title),
            body_html = self.children.render()
        )
    }
}

/// Percent-encode an id for use as a single path segment.
fn path_segment(id: &str) -> String {
    id.bytes().fold(String::new(), |mut out, b| {
        if b.is_ascii_alphanumeric() || b"-_.~".contains(&b) {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{b:02X}");
        }
        out
    })
}

pub fn property_href(id: &str) -> String {
    format!("/property/{}", path_segment(id))
}

pub struct PropertyList<'a> {
    pub ids: &'a [String],
}
impl Component for PropertyList<'_> {
    fn render(&self) -> String {
        if self.ids.is_empty() {
            return r#"
                <h1>Property Info Sheets</h1>
                <p class="message warning">
                    No property files found. Add <code>.xlsx</code> files to
                    the property directory and reload.
                </p>
            "#
            .to_string();
        }
        let items = self.ids.iter().fold(String::new(), |mut str, id| {
            let href = property_href(id);
            let _ = write!(
                str,
                r#"<a href="{href}">{name}<code>{href}</code></a>"#,
                name = clean(&models::display_name(id)),
            );
            str
        });
        format!(
            r#"
            <h1>Property Info Sheets</h1>
            <p class="subtitle">Select a property to edit. Each property has a
            direct link that can be used from the CRM.</p>
            <div class="property-list">{items}</div>
            "#
        )
    }
}

/// Confirmation banner shown above the form after a save.
pub struct Message {
    pub text: String,
}
impl Component for Message {
    fn render(&self) -> String {
        format!(
            r#"<div class="message success">{text}</div>"#,
            text = clean(&self.text)
        )
    }
}

struct Input<'a> {
    field: &'a FormField,
}
impl Component for Input<'_> {
    fn render(&self) -> String {
        let f = self.field;
        let column = match f.column {
            ValueColumn::Primary => "primary",
            ValueColumn::Vendor => "vendor",
        };
        let attrs = format!(
            r#"name="{name}" data-label="{label}" data-section="{section}" data-column="{column}""#,
            name = clean_text(&f.name),
            label = clean_text(&f.label),
            section = f.section,
        );
        if f.multiline {
            format!(
                r#"<textarea {attrs}>{value}</textarea>"#,
                value = clean_text(&f.value)
            )
        } else {
            format!(
                r#"<input type="text" {attrs} value="{value}" />"#,
                value = clean_text(&f.value)
            )
        }
    }
}

struct FieldRows<'a> {
    fields: Vec<&'a FormField>,
}
impl Component for FieldRows<'_> {
    fn render(&self) -> String {
        self.fields.iter().fold(String::new(), |mut str, field| {
            let _ = write!(
                str,
                r#"
                <div class="field-row">
                    <div class="field-label">{label}</div>
                    {input}
                </div>"#,
                label = clean(&field.label),
                input = Input { field }.render()
            );
            str
        })
    }
}

/// The offer section pairs each row's primary and vendor inputs.
struct OfferRows<'a> {
    fields: Vec<&'a FormField>,
}
impl Component for OfferRows<'_> {
    fn render(&self) -> String {
        let primaries = self
            .fields
            .iter()
            .filter(|f| f.column == ValueColumn::Primary);
        primaries.fold(String::new(), |mut str, primary| {
            let vendor_name = primary.name.clone() + ".vendor";
            let vendor = self
                .fields
                .iter()
                .find(|f| f.name == vendor_name)
                .map(|field| Input { field }.render())
                .unwrap_or_default();
            let _ = write!(
                str,
                r#"
                <div class="field-row offer-row">
                    <div class="field-label">{label}</div>
                    {primary}
                    {vendor}
                </div>"#,
                label = clean(&primary.label),
                primary = Input { field: primary }.render(),
            );
            str
        })
    }
}

struct SectionBox<'a> {
    key: SectionKey,
    title: &'a str,
    fields: &'a [FormField],
    header_extra: &'a str,
}
impl Component for SectionBox<'_> {
    fn render(&self) -> String {
        let fields: Vec<&FormField> =
            self.fields.iter().filter(|f| f.section == self.key).collect();
        let rows = if self.key == SectionKey::OurOffer {
            let head = r#"
                <div class="field-row offer-row">
                    <div class="field-label"></div>
                    <div class="field-label">Our Offer</div>
                    <div class="field-label">Vendor's Asking</div>
                </div>"#;
            format!("{head}{}", OfferRows { fields }.render())
        } else {
            FieldRows { fields }.render()
        };
        format!(
            r#"
            <div class="section {key}">
                <div class="section-header">{title}{extra}</div>
                <div class="section-content">{rows}</div>
            </div>
            "#,
            key = self.key,
            title = clean(self.title),
            extra = self.header_extra,
        )
    }
}

pub struct PropertyForm<'a> {
    pub record: &'a PropertyRecord,
    pub message: Option<Message>,
}
impl Component for PropertyForm<'_> {
    fn render(&self) -> String {
        let fields = form::form_fields(self.record);
        let section = |key: SectionKey, header_extra: &str| {
            match self.record.section(key) {
                Some(s) if !s.fields.is_empty() => SectionBox {
                    key,
                    title: s.title,
                    fields: &fields,
                    header_extra,
                }
                .render(),
                _ => String::new(),
            }
        };
        let populate = r#"<button type="button" id="auto-populate" class="btn populate" onclick="autoPopulate()">Auto-populate</button>"#;

        let column_1 = [
            section(SectionKey::PropertyInfo, populate),
            section(SectionKey::BuildingBreakdown, ""),
        ]
        .join("");
        let column_2 = [
            section(SectionKey::OwnerInfo, ""),
            section(SectionKey::TitleInfo, ""),
            section(SectionKey::ImportantInfo, ""),
        ]
        .join("");
        let column_3 = [
            section(SectionKey::Income, ""),
            section(SectionKey::Questions, ""),
        ]
        .join("");
        let offer = section(SectionKey::OurOffer, "");

        let name = clean(&models::display_name(&self.record.id));
        let subtitle = self
            .record
            .value(SectionKey::PropertyInfo, "Address")
            .filter(|a| !a.is_empty())
            .map(|a| format!(r#"<p class="subtitle">{}</p>"#, clean(a)))
            .unwrap_or_default();
        let message = self
            .message
            .as_ref()
            .map(|m| m.render())
            .unwrap_or_default();
        let action = property_href(&self.record.id);

        format!(
            r#"
            <h1>{name}</h1>
            {subtitle}
            {message}
            <div id="scrape-message"></div>
            <form method="POST" action="{action}">
                <div class="sheet-layout">
                    <div>{column_1}</div>
                    <div>{column_2}</div>
                    <div>{column_3}</div>
                    <div class="full-width">{offer}</div>
                </div>
                <div class="button-row">
                    <button type="submit" class="btn save">Save Changes</button>
                    <a href="/properties" class="btn back">Back to Properties</a>
                </div>
            </form>
            {AUTO_POPULATE_SCRIPT}
            "#
        )
    }
}

pub struct ErrorPage {
    pub status: StatusCode,
    pub message: String,
}
impl Component for ErrorPage {
    fn render(&self) -> String {
        format!(
            r#"
            <h1>{code}</h1>
            <p class="message error">{message}</p>
            <div class="button-row">
                <a href="/properties" class="btn back">Back to Properties</a>
            </div>
            "#,
            code = self.status,
            message = clean(&self.message),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{layout::extract_record, store::sample};

    fn sample_record() -> PropertyRecord {
        extract_record("Sample_Property", &sample::sample_sheet("Property Info"))
    }

    #[test]
    fn test_path_segment() {
        assert_eq!(property_href("Sample_Property"), "/property/Sample_Property");
        assert_eq!(property_href("12 Rue & Co"), "/property/12%20Rue%20%26%20Co");
    }

    #[test]
    fn test_property_list() {
        let ids = vec!["Sample_Property".to_string(), "warehouse".to_string()];
        let html = PropertyList { ids: &ids }.render();
        assert!(html.contains(r#"href="/property/Sample_Property""#));
        assert!(html.contains("Sample Property"));
        assert!(html.contains(r#"href="/property/warehouse""#));

        let empty = PropertyList { ids: &[] }.render();
        assert!(empty.contains("No property files found"));
    }

    #[test]
    fn test_property_form_renders_every_field() {
        let record = sample_record();
        let html = PropertyForm {
            record: &record,
            message: None,
        }
        .render();

        for field in form::form_fields(&record) {
            let name = format!(r#"name="{}""#, field.name);
            assert!(html.contains(&name), "missing input {}", field.name);
        }
        assert!(html.contains(r#"action="/property/Sample_Property""#));
        assert!(html.contains("Vendor's Asking"));
        assert!(html.contains(r#"id="auto-populate""#));
        assert!(html.contains("fetch('/scrape'"));
        assert!(!html.contains(r#"class="message"#));
    }

    #[test]
    fn test_multiline_fields_use_textarea() {
        let record = sample_record();
        let html = PropertyForm {
            record: &record,
            message: None,
        }
        .render();
        assert!(html.contains(r#"<textarea name="property_info.2""#));
        assert!(html.contains(r#"<input type="text" name="property_info.3""#));
    }

    #[test]
    fn test_values_are_escaped() {
        let field = FormField {
            name: "property_info.1".into(),
            label: "Address".into(),
            value: r#""><script>alert(1)</script>"#.into(),
            section: SectionKey::PropertyInfo,
            column: ValueColumn::Primary,
            multiline: false,
        };
        let html = Input { field: &field }.render();
        assert!(!html.contains("<script>"));
        assert!(!html.contains(r#""><"#));
    }

    #[test]
    fn test_message_banner() {
        let record = sample_record();
        let html = PropertyForm {
            record: &record,
            message: Some(Message {
                text: "Changes saved. Backup created: Sample_Property_20240101_120000.xlsx".into(),
            }),
        }
        .render();
        assert!(html.contains(r#"<div class="message success">"#));
        assert!(html.contains("Sample_Property_20240101_120000.xlsx"));
    }

    #[test]
    fn test_error_page() {
        let html = ErrorPage {
            status: StatusCode::NOT_FOUND,
            message: "property \"x\" not found".into(),
        }
        .render();
        assert!(html.contains("404 Not Found"));
    }
}
