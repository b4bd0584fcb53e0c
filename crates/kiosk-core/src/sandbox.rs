//! Extraction sandbox: runs user-authored scripts against fetched content.
//!
//! Scripts are rhai. The fetched document is bound to an implicit `data`
//! constant and the script's result value is coerced into a [`NewsItem`]
//! list. The engine is capability-limited: no filesystem, no network, no
//! ambient state — the only host functions are the pure document helpers
//! `select(html, css)` and `parse_feed(xml)`. A per-call operation budget
//! terminates runaway scripts instead of letting them wedge a cycle.

use rhai::{Dynamic, Engine, EvalAltResult, Map, Position, Scope};

use crate::error::AppError;
use crate::feed;
use crate::models::NewsItem;
use crate::traits::Extractor;

/// Default operation budget per script run. Generous for parsing a feed,
/// far below anything that could stall the scheduler.
const DEFAULT_MAX_OPERATIONS: u64 = 1_000_000;

/// Rhai-backed [`Extractor`]. A fresh engine is built per call, so the
/// sandbox itself is just configuration and is cheap to clone.
#[derive(Debug, Clone)]
pub struct ScriptSandbox {
    max_operations: u64,
}

impl ScriptSandbox {
    pub fn new() -> Self {
        Self {
            max_operations: DEFAULT_MAX_OPERATIONS,
        }
    }

    /// Override the operation budget (mainly for tests).
    pub fn with_max_operations(max_operations: u64) -> Self {
        Self { max_operations }
    }

    fn build_engine(&self) -> Engine {
        let mut engine = Engine::new();
        engine.set_max_operations(self.max_operations);
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(64);
        engine.set_max_array_size(100_000);
        engine.set_max_map_size(10_000);

        engine.register_fn("select", select);
        engine.register_fn("parse_feed", parse_feed);

        engine
    }
}

impl Default for ScriptSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for ScriptSandbox {
    fn extract(&self, script: &str, raw: &str) -> Result<Vec<NewsItem>, AppError> {
        let engine = self.build_engine();
        let mut scope = Scope::new();
        scope.push_constant("data", raw.to_string());

        let value: Dynamic = engine
            .eval_with_scope(&mut scope, script)
            .map_err(|e| AppError::ExtractionError(e.to_string()))?;

        coerce_items(value)
    }
}

/// Coerce a script's result value into a validated item list. Any element
/// that fails coercion collapses the whole call — no partial lists.
fn coerce_items(value: Dynamic) -> Result<Vec<NewsItem>, AppError> {
    let type_name = value.type_name();
    let array = value.try_cast::<rhai::Array>().ok_or_else(|| {
        AppError::ExtractionError(format!(
            "script must return an array of items, got {type_name}"
        ))
    })?;

    array
        .into_iter()
        .enumerate()
        .map(|(i, element)| {
            coerce_item(element)
                .map_err(|reason| AppError::ExtractionError(format!("item {i}: {reason}")))
        })
        .collect()
}

fn coerce_item(value: Dynamic) -> Result<NewsItem, String> {
    let type_name = value.type_name();
    let map = value
        .try_cast::<Map>()
        .ok_or_else(|| format!("expected a map, got {type_name}"))?;

    // The original seed scripts emit `title`; accept it as an alias.
    let name = string_field(&map, "name")
        .or_else(|| string_field(&map, "title"))
        .ok_or("missing string field `name`")?;
    let link = string_field(&map, "link").ok_or("missing string field `link`")?;

    Ok(NewsItem {
        name,
        link,
        description: string_field(&map, "description").unwrap_or_default(),
        image: string_field(&map, "image"),
    })
}

/// Read a string-valued field; non-string values (including unit/"null")
/// count as absent.
fn string_field(map: &Map, key: &str) -> Option<String> {
    map.get(key).and_then(|v| v.clone().into_string().ok())
}

fn runtime_err(message: String) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(message.into(), Position::NONE))
}

// ---------------------------------------------------------------------------
// Host functions
// ---------------------------------------------------------------------------

/// `select(html, css)` — query a document with a CSS selector. Each match
/// becomes a map holding every attribute of the element plus `text` (joined
/// text content, trimmed) and `html` (inner HTML).
fn select(html: &str, selector: &str) -> Result<rhai::Array, Box<EvalAltResult>> {
    let parsed = scraper::Selector::parse(selector)
        .map_err(|e| runtime_err(format!("invalid CSS selector `{selector}`: {e}")))?;
    let document = scraper::Html::parse_document(html);

    let mut out = rhai::Array::new();
    for element in document.select(&parsed) {
        let mut map = Map::new();
        for (attr, attr_value) in element.value().attrs() {
            map.insert(attr.into(), attr_value.to_string().into());
        }
        // Reserved keys win over same-named attributes.
        map.insert(
            "text".into(),
            element.text().collect::<String>().trim().to_string().into(),
        );
        map.insert("html".into(), element.inner_html().into());
        out.push(Dynamic::from_map(map));
    }
    Ok(out)
}

/// `parse_feed(xml)` — parse an RSS 2.0/Atom document into item maps with
/// the same field names the coercion step expects.
fn parse_feed(xml: &str) -> Result<rhai::Array, Box<EvalAltResult>> {
    let items = feed::parse_feed(xml).map_err(|e| runtime_err(e.to_string()))?;

    Ok(items
        .into_iter()
        .map(|item| {
            let mut map = Map::new();
            map.insert("name".into(), item.name.into());
            map.insert("link".into(), item.link.into());
            map.insert("description".into(), item.description.into());
            if let Some(image) = item.image {
                map.insert("image".into(), image.into());
            }
            Dynamic::from_map(map)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> ScriptSandbox {
        ScriptSandbox::new()
    }

    #[test]
    fn test_literal_items() {
        let items = sandbox()
            .extract(
                r#"return [#{name: "A", link: "http://x", description: "d"}];"#,
                "unused",
            )
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "A");
        assert_eq!(items[0].link, "http://x");
        assert_eq!(items[0].description, "d");
        assert!(items[0].image.is_none());
    }

    #[test]
    fn test_title_accepted_as_name_alias() {
        let items = sandbox()
            .extract(r#"[#{title: "T", link: "http://l"}]"#, "")
            .unwrap();
        assert_eq!(items[0].name, "T");
        assert_eq!(items[0].description, "");
    }

    #[test]
    fn test_data_is_bound_to_raw_content() {
        let items = sandbox()
            .extract(r#"[#{name: data, link: "http://l"}]"#, "from-the-wire")
            .unwrap();
        assert_eq!(items[0].name, "from-the-wire");
    }

    #[test]
    fn test_non_array_result_is_an_error() {
        let err = sandbox().extract("return 42;", "").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("must return an array"), "{msg}");
    }

    #[test]
    fn test_thrown_error_is_reported() {
        let err = sandbox().extract(r#"throw "boom";"#, "").unwrap_err();
        assert!(matches!(err, AppError::ExtractionError(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_element_failing_coercion_collapses_call() {
        // Second element is missing `link` — the whole call fails, no
        // partial list.
        let err = sandbox()
            .extract(
                r#"[#{name: "ok", link: "http://l"}, #{name: "bad"}]"#,
                "",
            )
            .unwrap_err();
        assert!(err.to_string().contains("item 1"));
    }

    #[test]
    fn test_non_string_image_treated_as_absent() {
        let items = sandbox()
            .extract(r#"[#{name: "A", link: "http://l", image: ()}]"#, "")
            .unwrap();
        assert!(items[0].image.is_none());
    }

    #[test]
    fn test_runaway_script_hits_operation_budget() {
        let sandbox = ScriptSandbox::with_max_operations(10_000);
        let err = sandbox
            .extract("let x = 0; loop { x += 1; }", "")
            .unwrap_err();
        assert!(matches!(err, AppError::ExtractionError(_)));
    }

    #[test]
    fn test_select_helper_extracts_attributes_and_text() {
        let html = r#"<html><body>
            <article class="post"><h2><a href="http://example.com/p1">Post one</a></h2></article>
            <article class="post"><h2><a href="http://example.com/p2">Post two</a></h2></article>
        </body></html>"#;

        let script = r#"
            let results = [];
            for header in select(data, "article.post h2 > a") {
                results.push(#{name: header.text, link: header.href});
            }
            return results;
        "#;

        let items = sandbox().extract(script, html).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Post one");
        assert_eq!(items[1].link, "http://example.com/p2");
    }

    #[test]
    fn test_invalid_selector_is_an_extraction_error() {
        let err = sandbox()
            .extract(r#"select(data, "article..")"#, "<html></html>")
            .unwrap_err();
        assert!(err.to_string().contains("invalid CSS selector"));
    }

    #[test]
    fn test_parse_feed_helper_roundtrips_rss() {
        let rss = r#"<rss version="2.0"><channel>
            <item><title>Hello</title><link>http://example.com/h</link>
            <description>world</description></item>
        </channel></rss>"#;

        let items = sandbox().extract("return parse_feed(data);", rss).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Hello");
        assert_eq!(items[0].link, "http://example.com/h");
        assert_eq!(items[0].description, "world");
    }

    #[test]
    fn test_scripts_can_filter_helper_output() {
        let rss = r#"<rss version="2.0"><channel>
            <item><title>Keep</title><link>http://example.com/1</link></item>
            <item><title>Drop me</title><link>http://example.com/2</link></item>
        </channel></rss>"#;

        let script = r#"
            let all = parse_feed(data);
            all.filter(|item| !item.name.contains("Drop"))
        "#;

        let items = sandbox().extract(script, rss).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Keep");
    }
}
