use once_cell::sync::Lazy;
use regex::RegexSet;
use url::Url;

const EXCLUDED_EXTENSIONS: &[&str] = &[
    // images
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".svg", ".webp", ".ico",
    // documents
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".txt", ".rtf",
    // archives
    ".zip", ".rar", ".7z", ".tar", ".gz", ".bz2",
    // media
    ".mp3", ".mp4", ".avi", ".mov", ".wmv", ".flv", ".wav", ".ogg",
    // executables
    ".exe", ".msi", ".dmg", ".pkg", ".deb", ".rpm",
    // code / data
    ".js", ".css", ".xml", ".json", ".csv", ".sql",
    // misc
    ".log", ".tmp", ".bak", ".old", ".cache",
];

const TRACKING_PARAM_PREFIXES: &[&str] =
    &["utm_", "fbclid", "gclid", "ref", "source", "campaign"];

const FIRST_SEGMENT_BLOCKLIST: &[&str] =
    &["api", "admin", "assets", "static", "cdn", "images", "img", "css", "js"];

const BOILERPLATE_LINK_TEXT: &[&str] = &[
    "click here",
    "read more",
    "learn more",
    "continue",
    "next",
    "previous",
];

// Generic analytics/tracking tokens plus literal path prefixes to reject,
// in addition to the UGC subdomain patterns.
static REJECT_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)analytics",
        r"(?i)tracking",
        r"(?i)pixel",
        r"(?i)beacon",
        r"(?i)/api/",
        r"(?i)/rest/",
        r"(?i)/graphql",
        r"(?i)/swagger",
        r"(?i)/docs",
        r"(?i)/admin",
        r"(?i)/wp-admin",
        r"(?i)/phpmyadmin",
        r"(?i)/cpanel",
        r"(?i)/sitemap",
        r"(?i)/robots\.txt",
        r"(?i)/favicon\.ico",
        r"(?i)/cart",
        r"(?i)/checkout",
        r"(?i)/payment",
        r"(?i)/order",
        r"(?i)/login",
        r"(?i)/logout",
        r"(?i)/register",
        r"(?i)/signup",
        r"(?i)/profile",
        r"(?i)/search",
        r"(?i)/filter",
        r"(?i)/sort",
        r"(?i)/page",
        r"(?i)/contact",
        r"(?i)/about",
        r"(?i)/privacy",
        r"(?i)/terms",
        r"(?i)/help",
        r"(?i)^[^.]+\.itch\.io$",
        r"(?i)^[^.]+\.github\.io$",
        r"(?i)^[^.]+\.wordpress\.com$",
    ])
    .expect("reject patterns compile")
});

static VALID_DOMAIN: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(
        r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("domain regex compiles")
});

/// Lowercases the host, strips a leading `www.`, drops query and fragment,
/// and strips a trailing `/` unless the path is exactly `/`.
pub fn canonicalize(url: &Url) -> Option<Url> {
    let mut u = url.clone();
    u.set_fragment(None);
    u.set_query(None);

    let host = u.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    u.set_host(Some(&host)).ok()?;

    let path = u.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        u.set_path(trimmed);
    }

    Some(u)
}

pub fn is_valid_domain(host: &str) -> bool {
    VALID_DOMAIN.is_match(host)
}

/// Mirrors `_should_exclude_url`: returns true when the (url, link_text)
/// pair should be dropped before it ever reaches the classifier.
pub fn should_exclude(url: &Url, link_text: &str) -> bool {
    if url.host_str().is_none() {
        return true;
    }
    if !matches!(url.scheme(), "http" | "https") {
        return true;
    }

    let path_lower = url.path().to_ascii_lowercase();
    if EXCLUDED_EXTENSIONS.iter().any(|ext| path_lower.ends_with(ext)) {
        return true;
    }

    let full = url.as_str().to_ascii_lowercase();
    let host_only = url.host_str().unwrap_or_default().to_ascii_lowercase();
    if REJECT_PATTERNS.is_match(&full) || REJECT_PATTERNS.is_match(&host_only) {
        return true;
    }

    let query_count = url.query_pairs().count();
    if query_count > 10 {
        return true;
    }
    for (k, _) in url.query_pairs() {
        let kl = k.to_ascii_lowercase();
        if TRACKING_PARAM_PREFIXES.iter().any(|p| kl.contains(p)) {
            return true;
        }
    }

    if url.as_str().len() > 500 {
        return true;
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    if segments.len() > 8 {
        return true;
    }
    if let Some(first) = segments.first() {
        if FIRST_SEGMENT_BLOCKLIST.contains(&first.to_ascii_lowercase().as_str()) {
            return true;
        }
    }

    let trimmed_text = link_text.trim();
    if trimmed_text.chars().count() < 2 {
        return true;
    }
    if BOILERPLATE_LINK_TEXT.contains(&trimmed_text.to_ascii_lowercase().as_str()) {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let cases = [
            "http://WWW.Example.com/foo/?utm_source=x#frag",
            "https://example.com/",
            "http://example.com",
        ];
        for c in cases {
            let once = canonicalize(&u(c)).unwrap();
            let twice = canonicalize(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {c}");
        }
    }

    #[test]
    fn strips_www_and_trailing_slash() {
        let c = canonicalize(&u("http://www.example.com/path/")).unwrap();
        assert_eq!(c.host_str(), Some("example.com"));
        assert_eq!(c.path(), "/path");
    }

    #[test]
    fn root_path_keeps_single_slash() {
        let c = canonicalize(&u("http://example.com/")).unwrap();
        assert_eq!(c.path(), "/");
    }

    #[test]
    fn excludes_by_extension_and_pattern() {
        assert!(should_exclude(&u("http://example.com/image.png"), "a photo"));
        assert!(should_exclude(&u("http://example.com/api/v1/users"), "api"));
        assert!(should_exclude(&u("http://example.com/wp-admin/"), "admin"));
        assert!(!should_exclude(&u("http://example.com/article/1"), "read the article"));
    }

    #[test]
    fn excludes_boilerplate_link_text() {
        assert!(should_exclude(&u("http://example.com/x"), "click here"));
        assert!(should_exclude(&u("http://example.com/x"), "n"));
    }

    #[test]
    fn excludes_tracking_params_and_deep_paths() {
        assert!(should_exclude(&u("http://example.com/x?utm_campaign=y"), "text here"));
        assert!(should_exclude(
            &u("http://example.com/a/b/c/d/e/f/g/h/i"),
            "deep"
        ));
    }

    #[test]
    fn blocks_ugc_subdomains_but_not_main_domain() {
        assert!(REJECT_PATTERNS.is_match("someuser.itch.io"));
        assert!(!REJECT_PATTERNS.is_match("itch.io"));
    }

    #[test]
    fn valid_domain_regex() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("sub.example.co.uk"));
        assert!(!is_valid_domain("-bad.com"));
        assert!(!is_valid_domain(""));
    }
}
