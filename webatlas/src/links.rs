use scraper::{Html, Selector};
use url::Url;

pub struct ExtractedLink {
    pub href: String,
    pub text: String,
}

pub struct PageMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub favicon_url: Option<String>,
    pub keywords: Vec<String>,
}

/// Parses an HTML document, returning every anchor (href, text) pair plus
/// page-level metadata. Tolerant of malformed markup; a non-HTML body just
/// yields an empty link set (scraper never errors on garbage input).
pub fn extract_links(base: &Url, body: &str) -> Vec<ExtractedLink> {
    let doc = Html::parse_document(body);
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    doc.select(&selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let text: String = el.text().collect::<Vec<_>>().join(" ");
            let resolved = resolve(base, href)?;
            Some(ExtractedLink {
                href: resolved,
                text: text.trim().to_string(),
            })
        })
        .collect()
}

pub fn extract_meta(base: &Url, body: &str) -> PageMeta {
    let doc = Html::parse_document(body);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .filter(|s| !s.is_empty());

    let description = meta_content(&doc, "description")
        .or_else(|| meta_property(&doc, "og:description"));

    let keywords = meta_content(&doc, "keywords")
        .map(|raw| {
            raw.split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let favicon_url = favicon(&doc).and_then(|href| resolve(base, &href));

    PageMeta {
        title,
        description,
        favicon_url,
        keywords,
    }
}

fn meta_content(doc: &Html, name: &str) -> Option<String> {
    let sel = Selector::parse(&format!("meta[name=\"{name}\" i]")).ok()?;
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn meta_property(doc: &Html, property: &str) -> Option<String> {
    let sel = Selector::parse(&format!("meta[property=\"{property}\" i]")).ok()?;
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn favicon(doc: &Html) -> Option<String> {
    let sel = Selector::parse(r#"link[rel="icon" i], link[rel="shortcut icon" i]"#).ok()?;
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(|s| s.to_string())
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_anchor_hrefs_and_text() {
        let base = Url::parse("http://example.com/page").unwrap();
        let html = r#"<html><body><a href="/about">About us</a><a href="http://other.com">Other</a></body></html>"#;
        let links = extract_links(&base, html);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].href, "http://example.com/about");
        assert_eq!(links[0].text, "About us");
        assert_eq!(links[1].href, "http://other.com/");
    }

    #[test]
    fn extracts_title_description_favicon_keywords() {
        let base = Url::parse("http://example.com/").unwrap();
        let html = r#"<html><head>
            <title>  Example Site  </title>
            <meta name="description" content="A sample page">
            <meta name="keywords" content="alpha, beta , gamma">
            <link rel="icon" href="/favicon.png">
        </head><body></body></html>"#;
        let meta = extract_meta(&base, html);
        assert_eq!(meta.title.as_deref(), Some("Example Site"));
        assert_eq!(meta.description.as_deref(), Some("A sample page"));
        assert_eq!(meta.favicon_url.as_deref(), Some("http://example.com/favicon.png"));
        assert_eq!(meta.keywords, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn falls_back_to_og_description() {
        let base = Url::parse("http://example.com/").unwrap();
        let html = r#"<meta property="og:description" content="OG desc">"#;
        let meta = extract_meta(&base, html);
        assert_eq!(meta.description.as_deref(), Some("OG desc"));
    }

    #[test]
    fn malformed_html_yields_no_error() {
        let base = Url::parse("http://example.com/").unwrap();
        let links = extract_links(&base, "<a href=broken<<>not html at all");
        assert!(links.len() <= 1);
    }
}
