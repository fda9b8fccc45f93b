//! Document metadata extraction from statute pages.
//!
//! Acts expose their substantive text behind a lazy-load endpoint whose
//! parameters (`tocSysId`, the first `fragments` key) are embedded in a
//! `div.global-vars data-json` blob on the initial page. Subsidiary
//! instruments carry everything on the first page, plus an anchor to
//! their authorising act.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use merlion_core::model::NewDocument;

use crate::text::element_text_with;

static ACT_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.actHd").expect("static selector"));
static LONG_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.longTitle").expect("static selector"));
static SL_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.slTitle").expect("static selector"));
static LEGIS_TITLE_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.legis-title span").expect("static selector"));
static GLOBAL_VARS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.global-vars").expect("static selector"));
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));

/// Parameters for the whole-document lazy-load fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LazyLoadConfig {
    pub toc_sys_id: String,
    pub series_id: String,
}

/// Metadata parsed from an act's initial page.
#[derive(Debug)]
pub struct ActPage {
    pub document: NewDocument,
    /// Absent when the page carries no usable global-vars config; the
    /// caller treats that as a per-document failure.
    pub lazy_load: Option<LazyLoadConfig>,
    pub warnings: Vec<String>,
}

/// Metadata parsed from a subsidiary-legislation page.
#[derive(Debug)]
pub struct SlPage {
    pub document: NewDocument,
    pub warnings: Vec<String>,
}

/// Parse act metadata and the lazy-load parameters from the initial page.
pub fn parse_act_page(
    html: &str,
    source_id: &str,
    jurisdiction: &str,
    source_label: &str,
) -> ActPage {
    let doc = Html::parse_document(html);
    let mut warnings = Vec::new();

    let name = match doc.select(&ACT_TITLE).next() {
        Some(el) => element_text_with(el, " ").trim().to_string(),
        None => {
            warnings.push("act title cell not found".to_string());
            format!("UNKNOWN ACT ({source_id})")
        }
    };
    let description = doc
        .select(&LONG_TITLE)
        .next()
        .map(|el| element_text_with(el, " ").trim().to_string())
        .unwrap_or_default();

    let lazy_load = extract_lazy_load(&doc, &mut warnings);

    ActPage {
        document: NewDocument {
            name,
            description,
            jurisdiction: jurisdiction.to_string(),
            source: source_label.to_string(),
            source_id: source_id.to_string(),
            parent_source_id: None,
        },
        lazy_load,
        warnings,
    }
}

fn extract_lazy_load(doc: &Html, warnings: &mut Vec<String>) -> Option<LazyLoadConfig> {
    for el in doc.select(&GLOBAL_VARS) {
        let Some(raw) = el.value().attr("data-json") else {
            continue;
        };
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(err) => {
                warnings.push(format!("unparsable global-vars JSON: {err}"));
                continue;
            }
        };

        let Some(toc_sys_id) = value.get("tocSysId").map(json_scalar) else {
            continue;
        };
        let Some(fragments) = value.get("fragments").and_then(|f| f.as_object()) else {
            continue;
        };
        // The first fragment key, in page order, addresses the whole document.
        match fragments.keys().next() {
            Some(series_id) => {
                return Some(LazyLoadConfig {
                    toc_sys_id,
                    series_id: series_id.clone(),
                });
            }
            None => warnings.push("fragments map is empty".to_string()),
        }
    }
    warnings.push("lazy-load config not found in global-vars".to_string());
    None
}

/// tocSysId appears as either a JSON string or a bare number.
fn json_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse subsidiary-legislation metadata, including the authorising-act
/// back-reference when the page links one.
pub fn parse_sl_page(
    html: &str,
    source_id: &str,
    jurisdiction: &str,
    source_label: &str,
) -> SlPage {
    let doc = Html::parse_document(html);
    let mut warnings = Vec::new();

    let name = doc
        .select(&SL_TITLE)
        .next()
        .or_else(|| doc.select(&LEGIS_TITLE_SPAN).next())
        .map(|el| element_text_with(el, " ").trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| {
            warnings.push("subsidiary-legislation title not found".to_string());
            format!("UNKNOWN SL ({source_id})")
        });

    let parent_source_id = find_authorising_act(&doc, &mut warnings);

    SlPage {
        document: NewDocument {
            name,
            description: String::new(),
            jurisdiction: jurisdiction.to_string(),
            source: source_label.to_string(),
            source_id: source_id.to_string(),
            parent_source_id,
        },
        warnings,
    }
}

fn find_authorising_act(doc: &Html, warnings: &mut Vec<String>) -> Option<String> {
    let anchor = doc.select(&ANCHOR).find(|a| {
        element_text_with(*a, " ")
            .to_ascii_lowercase()
            .contains("authorising act")
    });
    let Some(anchor) = anchor else {
        warnings.push("authorising-act link not found, parent left unset".to_string());
        return None;
    };

    let href = anchor.value().attr("href").unwrap_or_default();
    if !href.starts_with("/Act/") {
        warnings.push(format!(
            "authorising-act link has unexpected href {href:?}, parent left unset"
        ));
        return None;
    }
    Some(last_path_segment(href))
}

/// Last path segment with any query string stripped: `/Act/ASA2007?x=1` → `ASA2007`.
pub fn last_path_segment(path: &str) -> String {
    let clean = path.split('?').next().unwrap_or_default();
    clean
        .trim_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Collect unique document paths from a browse-listing page, in page order.
pub fn extract_listing_paths(html: &str, prefix: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut seen = std::collections::HashSet::new();
    let mut paths = Vec::new();
    for a in doc.select(&ANCHOR) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        if !href.starts_with(prefix) {
            continue;
        }
        let clean = href.split('?').next().unwrap_or_default().to_string();
        if seen.insert(clean.clone()) {
            paths.push(clean);
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn act_page_full_extraction() {
        let html = r#"<html><body>
            <table><tr><td class="actHd">Fisheries Act 1966</td></tr>
            <tr><td class="longTitle">An Act relating to <em>fishing</em> and fisheries.</td></tr></table>
            <div class="global-vars" data-json='{"other":1}'></div>
            <div class="global-vars" data-json='{"tocSysId":"190","fragments":{"F-100":{},"F-200":{}}}'></div>
        </body></html>"#;
        let page = parse_act_page(html, "FA1966", "SINGAPORE", "Singapore Statutes Online");
        assert_eq!(page.document.name, "Fisheries Act 1966");
        assert_eq!(
            page.document.description,
            "An Act relating to fishing and fisheries."
        );
        assert_eq!(page.document.source_id, "FA1966");
        assert_eq!(
            page.lazy_load,
            Some(LazyLoadConfig {
                toc_sys_id: "190".to_string(),
                series_id: "F-100".to_string(),
            })
        );
    }

    #[test]
    fn act_page_numeric_toc_sys_id() {
        let html = r#"<div class="global-vars"
            data-json='{"tocSysId":190,"fragments":{"F-1":{}}}'></div>"#;
        let page = parse_act_page(html, "X", "SINGAPORE", "src");
        assert_eq!(page.lazy_load.unwrap().toc_sys_id, "190");
    }

    #[test]
    fn act_page_missing_config_degrades() {
        let page = parse_act_page("<html></html>", "GONE1999", "SINGAPORE", "src");
        assert_eq!(page.document.name, "UNKNOWN ACT (GONE1999)");
        assert!(page.lazy_load.is_none());
        assert!(page.warnings.iter().any(|w| w.contains("lazy-load")));
    }

    #[test]
    fn sl_page_with_authorising_act() {
        let html = r#"<html><body>
            <table><tr><td class="slTitle">Fisheries (Fishing Gear) Rules</td></tr></table>
            <a href="/Act/FA1966?ProvIds=pr28-">Authorising Act</a>
        </body></html>"#;
        let page = parse_sl_page(html, "FA1966-R3", "SINGAPORE", "src");
        assert_eq!(page.document.name, "Fisheries (Fishing Gear) Rules");
        assert_eq!(page.document.parent_source_id.as_deref(), Some("FA1966"));
    }

    #[test]
    fn sl_page_title_fallback_and_missing_parent() {
        let html = r#"<div class="legis-title"><span>Control of Plants Rules</span></div>"#;
        let page = parse_sl_page(html, "CPA1993-R4", "SINGAPORE", "src");
        assert_eq!(page.document.name, "Control of Plants Rules");
        assert!(page.document.parent_source_id.is_none());
        assert!(
            page.warnings
                .iter()
                .any(|w| w.contains("authorising-act link not found"))
        );
    }

    #[test]
    fn sl_page_rejects_non_act_parent_href() {
        let html = r#"<td class="slTitle">X Rules</td><a href="/SL/other">Authorising Act</a>"#;
        let page = parse_sl_page(html, "X-R1", "SINGAPORE", "src");
        assert!(page.document.parent_source_id.is_none());
        assert!(page.warnings.iter().any(|w| w.contains("unexpected href")));
    }

    #[test]
    fn listing_paths_deduplicated_without_queries() {
        let html = r#"<html><body>
            <a href="/Act/ASA2007">Act A</a>
            <a href="/Act/ASA2007?WholeDoc=1">Act A again</a>
            <a href="/Act/FA1966">Act B</a>
            <a href="/Browse/Act/Current">pager</a>
        </body></html>"#;
        assert_eq!(
            extract_listing_paths(html, "/Act/"),
            vec!["/Act/ASA2007".to_string(), "/Act/FA1966".to_string()]
        );
    }

    #[test]
    fn last_segment_handles_queries_and_slashes() {
        assert_eq!(last_path_segment("/Act/ASA2007"), "ASA2007");
        assert_eq!(last_path_segment("/SL/AA2004-R5/"), "AA2004-R5");
        assert_eq!(last_path_segment("/Act/FA1966?ProvIds=pr1-"), "FA1966");
    }
}
