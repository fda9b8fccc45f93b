//! Section extraction from statute page HTML.
//!
//! Walks the substantive container for provision (`div.provN`) and, on
//! subsidiary instruments, schedule (`div.schedule`) nodes in document
//! order, composes titles with a normalized numbering token, and cleans
//! the body text. The output is re-sorted by parsed numbering; titles
//! that carry no parsable number keep document order at the end.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use merlion_core::model::{DocumentKind, NewSection};
use merlion_core::section_sort_key;

use crate::text::{clean_content, element_text, element_text_with};

static DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").expect("static selector"));
static HEADER_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, div").expect("static selector"));
static SCHEDULE_HEADER_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, div, p").expect("static selector"));
static STRONG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("strong").expect("static selector"));

static PROV_DIV: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^prov\d+$").expect("static regex"));
static PROV_HDR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^prov\d+Hdr$").expect("static regex"));
static PROV_TXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^prov\d+Txt$").expect("static regex"));
static SCHEDULE_HDR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(sHdr|scHdr)$").expect("static regex"));
/// A bolded numbering token such as `2.` or `14A.`
static NUMBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[A-Z]?\.?$").expect("static regex"));
/// Structured header id carrying the provision number, e.g. `pr14A-`.
static HEADER_ID_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^pr(\d+[A-Z]?)").expect("static regex"));

const UNTITLED: &str = "Untitled Section/Schedule";

/// Result of one extraction pass: sections in final order plus any
/// structural warnings encountered along the way.
#[derive(Debug, Default)]
pub struct ParsedSections {
    pub sections: Vec<NewSection>,
    pub warnings: Vec<String>,
}

/// Extract the ordered sections of one statute page.
///
/// Never fails: absent containers degrade to scanning the whole tree and
/// a warning, and individual malformed nodes are dropped or given the
/// fallback title rather than aborting the pass.
pub fn extract_sections(html: &str, kind: DocumentKind, jurisdiction: &str) -> ParsedSections {
    let mut out = ParsedSections::default();
    if html.trim().is_empty() {
        out.warnings.push("empty document".to_string());
        return out;
    }

    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let container = find_container(&doc, kind).unwrap_or_else(|| {
        out.warnings
            .push("substantive container not found, scanning whole document".to_string());
        root
    });

    let mut saw_candidate = false;
    for el in container.select(&DIV) {
        let classes: Vec<String> = el.value().classes().map(str::to_string).collect();

        if classes.iter().any(|c| PROV_DIV.is_match(c)) {
            saw_candidate = true;
            extract_provision(el, &classes, kind, jurisdiction, &mut out);
        } else if kind == DocumentKind::Subsidiary && classes.iter().any(|c| c == "schedule") {
            saw_candidate = true;
            extract_schedule(el, &classes, jurisdiction, &mut out);
        }
    }

    if !saw_candidate {
        out.warnings
            .push("no provision or schedule elements found".to_string());
    }

    // Stable sort: unparsable titles keep document order among themselves.
    out.sections
        .sort_by_key(|s| section_sort_key(&s.title));
    out
}

fn find_container<'a>(doc: &'a Html, kind: DocumentKind) -> Option<ElementRef<'a>> {
    let candidates: &[&str] = match kind {
        DocumentKind::Act => &["div.body"],
        DocumentKind::Subsidiary => &["div#legisContent", "div.body-content"],
    };
    for css in candidates {
        let sel = Selector::parse(css).expect("static selector");
        if let Some(el) = doc.select(&sel).next() {
            return Some(el);
        }
    }
    None
}

fn extract_provision(
    el: ElementRef<'_>,
    classes: &[String],
    kind: DocumentKind,
    jurisdiction: &str,
    out: &mut ParsedSections,
) {
    let header = el
        .select(&HEADER_CELL)
        .find(|c| c.value().classes().any(|cls| PROV_HDR.is_match(cls)));
    let header_text = header.map(|h| element_text_with(h, " ")).unwrap_or_default();
    let header_id = header.and_then(|h| h.value().attr("id")).map(str::to_string);

    let Some(content_el) = el
        .select(&HEADER_CELL)
        .find(|c| c.value().classes().any(|cls| PROV_TXT.is_match(cls)))
    else {
        out.warnings.push(format!(
            "provision without content cell dropped: {}",
            snippet(&header_text)
        ));
        return;
    };

    // Numbering token: bolded leading token, else the structured header id.
    let number = content_el
        .select(&STRONG)
        .next()
        .map(|s| element_text_with(s, " ").trim().to_string())
        .filter(|t| NUMBER_TOKEN.is_match(t))
        .or_else(|| {
            header_id
                .as_deref()
                .and_then(|id| HEADER_ID_NUMBER.captures(id))
                .map(|caps| format!("{}.", &caps[1]))
        });

    let title = compose_title(kind, number.as_deref(), &header_text);
    let content = clean_content(&element_text(content_el), number.as_deref());

    out.sections.push(NewSection {
        title,
        content,
        jurisdiction: jurisdiction.to_string(),
        questions: None,
        derived_pairs: None,
        additional: Some(additional_json(header_id.as_deref(), classes)),
    });
}

fn extract_schedule(
    el: ElementRef<'_>,
    classes: &[String],
    jurisdiction: &str,
    out: &mut ParsedSections,
) {
    let header = el
        .select(&SCHEDULE_HEADER_CELL)
        .find(|c| c.value().classes().any(|cls| SCHEDULE_HDR.is_match(cls)));
    let header_text = header
        .map(|h| element_text_with(h, " "))
        .unwrap_or_default()
        .trim()
        .to_string();
    let header_id = header.and_then(|h| h.value().attr("id")).map(str::to_string);

    // Schedules keep their own heading, prefixed when the source omits it.
    let title = if header_text.is_empty() {
        UNTITLED.to_string()
    } else if header_text.to_ascii_lowercase().contains("schedule") {
        header_text
    } else {
        format!("SCHEDULE {header_text}")
    };

    let content = clean_content(&element_text(el), None);

    out.sections.push(NewSection {
        title,
        content,
        jurisdiction: jurisdiction.to_string(),
        questions: None,
        derived_pairs: None,
        additional: Some(additional_json(header_id.as_deref(), classes)),
    });
}

fn compose_title(kind: DocumentKind, number: Option<&str>, header_text: &str) -> String {
    let header = header_text.trim();
    let title = match number {
        Some(num) => {
            // Avoid doubling a number the header already leads with.
            let cleaned = header.strip_prefix(num).unwrap_or(header).trim_start();
            format!("{} {} {}", kind.provision_label(), num, cleaned)
        }
        None => header.to_string(),
    };
    let title = title.trim().to_string();
    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}

fn additional_json(header_id: Option<&str>, classes: &[String]) -> String {
    serde_json::json!({
        "header_id": header_id,
        "source_element_class": classes,
    })
    .to_string()
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "<no header>".to_string()
    } else {
        trimmed.chars().take(50).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JURISDICTION: &str = "SINGAPORE";

    fn act_fixture() -> &'static str {
        r#"<html><body><div class="body">
            <div class="prov1"><table><tr>
                <td class="prov1Hdr" id="pr2">Application</td></tr><tr>
                <td class="prov1Txt"><strong>2.</strong><p>This Act applies to every licensee.</p>
                    <div class="amendNote">[Act 10 of 2021 wef 01/02/2022]</div>
                </td></tr></table></div>
            <div class="prov1"><table><tr>
                <td class="prov1Hdr" id="pr1">Short title</td></tr><tr>
                <td class="prov1Txt"><strong>1.</strong><p>This Act is the Fisheries Act.</p>
                </td></tr></table></div>
        </div></body></html>"#
    }

    #[test]
    fn extracts_and_orders_act_sections() {
        let parsed = extract_sections(act_fixture(), DocumentKind::Act, JURISDICTION);
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        assert_eq!(parsed.sections.len(), 2);
        // Input order is 2 then 1; output is re-sorted.
        assert_eq!(parsed.sections[0].title, "Section 1. Short title");
        assert_eq!(parsed.sections[1].title, "Section 2. Application");
    }

    #[test]
    fn folds_number_and_strips_amendment_notes() {
        let parsed = extract_sections(act_fixture(), DocumentKind::Act, JURISDICTION);
        let applies = &parsed.sections[1];
        assert_eq!(applies.content, "2. This Act applies to every licensee.");
        assert!(!applies.content.contains("wef"));
    }

    #[test]
    fn parse_is_deterministic() {
        let a = extract_sections(act_fixture(), DocumentKind::Act, JURISDICTION);
        let b = extract_sections(act_fixture(), DocumentKind::Act, JURISDICTION);
        let titles_a: Vec<&str> = a.sections.iter().map(|s| s.title.as_str()).collect();
        let titles_b: Vec<&str> = b.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles_a, titles_b);
        let contents_a: Vec<&str> = a.sections.iter().map(|s| s.content.as_str()).collect();
        let contents_b: Vec<&str> = b.sections.iter().map(|s| s.content.as_str()).collect();
        assert_eq!(contents_a, contents_b);
    }

    #[test]
    fn missing_container_falls_back_with_warning() {
        let html = r#"<html><body>
            <div class="prov1">
                <div class="prov1Hdr" id="pr3">Licensing</div>
                <div class="prov1Txt"><strong>3.</strong>No person shall operate unlicensed.</div>
            </div></body></html>"#;
        let parsed = extract_sections(html, DocumentKind::Act, JURISDICTION);
        assert_eq!(parsed.sections.len(), 1);
        assert!(
            parsed
                .warnings
                .iter()
                .any(|w| w.contains("container not found"))
        );
        assert_eq!(parsed.sections[0].title, "Section 3. Licensing");
    }

    #[test]
    fn provision_without_content_cell_is_dropped_with_warning() {
        let html = r#"<div class="body">
            <div class="prov1"><div class="prov1Hdr">Orphan heading</div></div>
            <div class="prov1">
                <div class="prov1Hdr" id="pr1">Kept</div>
                <div class="prov1Txt"><strong>1.</strong>kept text</div>
            </div></div>"#;
        let parsed = extract_sections(html, DocumentKind::Act, JURISDICTION);
        assert_eq!(parsed.sections.len(), 1);
        assert!(
            parsed
                .warnings
                .iter()
                .any(|w| w.contains("without content cell"))
        );
    }

    #[test]
    fn header_id_supplies_number_when_no_bold_token() {
        let html = r#"<div class="body">
            <div class="prov1">
                <div class="prov1Hdr" id="pr14A-">Appeals</div>
                <div class="prov1Txt">An appeal lies to the Minister.</div>
            </div></div>"#;
        let parsed = extract_sections(html, DocumentKind::Act, JURISDICTION);
        assert_eq!(parsed.sections[0].title, "Section 14A. Appeals");
    }

    #[test]
    fn untitled_section_gets_fallback_title() {
        let html = r#"<div class="body">
            <div class="prov1">
                <div class="prov1Txt">stray text with no header at all</div>
            </div></div>"#;
        let parsed = extract_sections(html, DocumentKind::Act, JURISDICTION);
        assert_eq!(parsed.sections.len(), 1);
        assert_eq!(parsed.sections[0].title, "Untitled Section/Schedule");
        assert_eq!(
            parsed.sections[0].content,
            "stray text with no header at all"
        );
    }

    #[test]
    fn subsidiary_uses_rule_titles_and_schedules() {
        let html = r#"<div id="legisContent">
            <div class="prov1">
                <div class="prov1Hdr" id="pr1-">Citation</div>
                <div class="prov1Txt"><strong>1.</strong>These Rules are the Fisheries Rules.</div>
            </div>
            <div class="schedule">
                <p class="sHdr">FIRST SCHEDULE</p>
                <p>Prescribed forms</p>
            </div>
            <div class="prov2">
                <div class="prov2Hdr" id="pr2-">Fees</div>
                <div class="prov2Txt"><strong>2.</strong>The fee is $10.</div>
            </div>
        </div>"#;
        let parsed = extract_sections(html, DocumentKind::Subsidiary, JURISDICTION);
        let titles: Vec<&str> = parsed.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Rule 1. Citation",
                "Rule 2. Fees",
                // Schedule titles are kept, and sort after numbered rules.
                "FIRST SCHEDULE",
            ]
        );
    }

    #[test]
    fn schedule_title_prefixed_when_heading_omits_it() {
        let html = r#"<div id="legisContent">
            <div class="schedule"><p class="scHdr">Prescribed diseases</p><p>Anthrax</p></div>
        </div>"#;
        let parsed = extract_sections(html, DocumentKind::Subsidiary, JURISDICTION);
        assert_eq!(parsed.sections[0].title, "SCHEDULE Prescribed diseases");
        assert!(parsed.sections[0].content.contains("Anthrax"));
    }

    #[test]
    fn schedules_ignored_for_primary_acts() {
        let html = r#"<div class="body">
            <div class="schedule"><p class="sHdr">SCHEDULE</p><p>ignored</p></div>
        </div>"#;
        let parsed = extract_sections(html, DocumentKind::Act, JURISDICTION);
        assert!(parsed.sections.is_empty());
        assert!(
            parsed
                .warnings
                .iter()
                .any(|w| w.contains("no provision or schedule"))
        );
    }

    #[test]
    fn empty_input_warns_and_yields_nothing() {
        let parsed = extract_sections("   ", DocumentKind::Act, JURISDICTION);
        assert!(parsed.sections.is_empty());
        assert_eq!(parsed.warnings, vec!["empty document".to_string()]);
    }

    #[test]
    fn additional_metadata_records_source_element() {
        let parsed = extract_sections(act_fixture(), DocumentKind::Act, JURISDICTION);
        let extra: serde_json::Value =
            serde_json::from_str(parsed.sections[1].additional.as_deref().unwrap()).unwrap();
        assert_eq!(extra["header_id"], "pr2");
        assert_eq!(extra["source_element_class"][0], "prov1");
    }
}
