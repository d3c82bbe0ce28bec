//! Best-effort topical categorization from an inline keyword heuristic.
//! Order is the observable behavior: the first
//! matching bucket wins, so this is not sorted alphabetically and should
//! not be "cleaned up" into one.

use crate::classify::registrable_domain;

/// (category, keywords) in match-priority order. First hit wins.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("blog", &["blog", "weblog", "journal"]),
    ("ecommerce", &["shop", "store", "buy", "cart", "checkout", "product"]),
    ("news", &["news", "press", "journalism", "headlines"]),
    ("forum", &["forum", "discussion", "community board", "thread"]),
    ("education", &["university", "college", "school", "education", "course", "learning"]),
    ("government", &["government", ".gov", "ministry", "municipal", "city council"]),
    ("reference", &["wiki", "encyclopedia", "reference", "dictionary"]),
    ("personal", &["personal page", "my site", "portfolio"]),
    ("software", &["software", "app", "download", "open source", "github", "developer"]),
    ("health", &["health", "medical", "clinic", "hospital", "doctor", "wellness"]),
    ("finance", &["finance", "bank", "investment", "insurance", "loan", "trading"]),
    ("travel", &["travel", "hotel", "flight", "vacation", "tourism"]),
    ("food", &["food", "recipe", "restaurant", "cooking", "cuisine"]),
    ("sports", &["sports", "football", "basketball", "soccer", "athletics"]),
    ("arts", &["art", "gallery", "museum", "painting", "sculpture"]),
    ("science", &["science", "research", "physics", "chemistry", "biology"]),
    ("real_estate", &["real estate", "property", "realtor", "housing"]),
    ("jobs", &["jobs", "career", "employment", "recruiting", "hiring"]),
    ("automotive", &["car", "automotive", "vehicle", "auto parts"]),
    ("fashion", &["fashion", "clothing", "apparel", "style"]),
    ("kids", &["kids", "children", "toys", "parenting"]),
    ("environment", &["environment", "climate", "sustainability", "ecology"]),
    ("religion", &["church", "religion", "faith", "ministry worship", "mosque", "temple"]),
    ("adult", &["adult content", "xxx"]),
    ("security", &["security", "cybersecurity", "antivirus", "firewall"]),
    ("logistics", &["logistics", "shipping", "freight", "supply chain"]),
    ("construction", &["construction", "building", "contractor", "renovation"]),
    ("energy", &["energy", "solar", "oil and gas", "renewable", "power plant"]),
    ("legal", &["law firm", "legal", "attorney", "lawyer"]),
    ("consulting", &["consulting", "consultancy", "advisory"]),
    ("events", &["events", "conference", "festival", "concert"]),
    ("pets", &["pets", "veterinary", "animal shelter", "pet care"]),
    ("photography", &["photography", "photographer", "photo studio"]),
    ("language", &["language learning", "translation", "linguistics"]),
    ("hardware", &["hardware store", "electronics", "computer parts"]),
    ("hosting", &["web hosting", "domain registration", "vps", "cloud hosting"]),
    ("printing", &["printing", "print shop", "print services"]),
    ("auction", &["auction", "bidding", "marketplace"]),
    ("charity", &["charity", "nonprofit", "ngo", "donation"]),
    ("agriculture", &["agriculture", "farming", "farm", "crops"]),
    ("mining", &["mining", "minerals", "extraction"]),
    ("space", &["space", "astronomy", "aerospace", "satellite"]),
    ("military", &["military", "defense", "armed forces"]),
    ("transport", &["transport", "transit", "railway", "airline"]),
];

const DEFAULT_CATEGORY: &str = "miscellaneous";

/// Matches `title`/`description`/`domain_name` against the ordered
/// keyword table; returns the first hit, or `miscellaneous`.
pub fn categorize(title: Option<&str>, description: Option<&str>, domain_name: &str) -> String {
    let mut haystack = String::new();
    if let Some(t) = title {
        haystack.push_str(&t.to_ascii_lowercase());
        haystack.push(' ');
    }
    if let Some(d) = description {
        haystack.push_str(&d.to_ascii_lowercase());
        haystack.push(' ');
    }
    haystack.push_str(&domain_name.to_ascii_lowercase());

    for (category, keywords) in CATEGORIES {
        if keywords.iter().any(|kw| haystack.contains(kw)) {
            return category.to_string();
        }
    }
    DEFAULT_CATEGORY.to_string()
}

/// Assembles free-text tags from the subdomain label (if any), the eTLD+1
/// label, the TLD, the chosen category, and meta-keyword tokens.
pub fn build_tags(domain_name: &str, category: &str, meta_keywords: &[String]) -> Vec<String> {
    let registrable = registrable_domain(domain_name);
    let mut tags: Vec<String> = Vec::new();

    if domain_name != registrable {
        if let Some(sub) = domain_name.strip_suffix(&format!(".{registrable}")) {
            if !sub.is_empty() {
                tags.push(sub.to_string());
            }
        }
    }

    let mut reg_parts = registrable.splitn(2, '.');
    if let Some(label) = reg_parts.next() {
        tags.push(label.to_string());
    }
    if let Some(tld) = registrable.rsplit('.').next() {
        tags.push(tld.to_string());
    }

    tags.push(category.to_string());
    tags.extend(meta_keywords.iter().map(|k| k.to_ascii_lowercase()));

    tags.sort();
    tags.dedup();
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_wins_over_later_categories() {
        // "news blog" mentions both news-ish and blog-ish words; blog is
        // earlier in the table and must win.
        let cat = categorize(Some("My Blog"), Some("news and commentary"), "example.com");
        assert_eq!(cat, "blog");
    }

    #[test]
    fn falls_back_to_miscellaneous() {
        let cat = categorize(None, None, "xyz123.example");
        assert_eq!(cat, "miscellaneous");
    }

    #[test]
    fn tags_are_deduped_and_sorted() {
        let tags = build_tags("blog.example.com", "blog", &["Example".to_string(), "blog".to_string()]);
        let mut expected = tags.clone();
        expected.sort();
        expected.dedup();
        assert_eq!(tags, expected);
        assert!(tags.contains(&"blog".to_string()));
        assert!(tags.contains(&"com".to_string()));
    }
}
