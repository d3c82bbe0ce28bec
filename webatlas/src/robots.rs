use std::cmp::Ordering;
use std::time::Duration;

/// Parsed robots.txt rules for a single domain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotsTxt {
    /// Rules grouped by user-agent token (lowercased). `*` is the wildcard group.
    groups: Vec<AgentGroup>,
}

#[derive(Debug, Clone, PartialEq)]
struct AgentGroup {
    agent: String, // lowercased agent token, e.g., "*" or "gurtbot"
    allow: Vec<String>,
    disallow: Vec<String>,
    crawl_delay: Option<Duration>,
}

impl RobotsTxt {
    /// Parse a robots.txt document with basic HTTP-like semantics.
    /// - Supports User-agent, Allow, Disallow, Crawl-delay.
    /// - Path matching is prefix-based. Longest rule wins; ties prefer Allow.
    /// - User-agent matches are case-insensitive exact token matches; the
    ///   applicable ruleset is the union of the matching group and `*`.
    pub fn parse(input: &str) -> Self {
        let mut groups: Vec<AgentGroup> = Vec::new();
        let mut current_agents: Vec<String> = Vec::new();
        // True once a rule line has been applied to `current_agents`; the next
        // `User-agent` line then starts a fresh group instead of joining it
        // (consecutive `User-agent` lines still accumulate into one group).
        let mut group_closed = false;

        for raw_line in input.lines() {
            let line = raw_line.trim();
            if line.is_empty() { continue; }
            if line.starts_with('#') { continue; }
            let Some((k, v)) = line.split_once(':') else { continue }; // ignore invalid lines
            let key = k.trim().to_ascii_lowercase();
            let val = v.trim();
            match key.as_str() {
                "user-agent" => {
                    let agent = val.to_ascii_lowercase();
                    if group_closed {
                        current_agents.clear();
                        group_closed = false;
                    }
                    current_agents.push(agent);
                    // ensure groups exist
                    for a in &current_agents {
                        get_or_create_group_index(&mut groups, a);
                    }
                }
                "allow" => {
                    if current_agents.is_empty() {
                        current_agents.push("*".to_string());
                    }
                    for a in &current_agents {
                        let idx = get_or_create_group_index(&mut groups, a);
                        groups[idx].allow.push(val.to_string());
                    }
                    group_closed = true;
                }
                "disallow" => {
                    if current_agents.is_empty() {
                        current_agents.push("*".to_string());
                    }
                    for a in &current_agents {
                        let idx = get_or_create_group_index(&mut groups, a);
                        groups[idx].disallow.push(val.to_string());
                    }
                    group_closed = true;
                }
                "crawl-delay" => {
                    let delay = parse_crawl_delay(val);
                    if current_agents.is_empty() {
                        current_agents.push("*".to_string());
                    }
                    for a in &current_agents {
                        let idx = get_or_create_group_index(&mut groups, a);
                        groups[idx].crawl_delay = delay;
                    }
                    group_closed = true;
                }
                _ => {}
            }
        }

        // If no groups defined at all, create a default wildcard
        if groups.is_empty() {
            groups.push(AgentGroup { agent: "*".to_string(), allow: vec![], disallow: vec![], crawl_delay: None });
        }
        Self { groups }
    }

    /// The applicable ruleset for UA `u` is the union of the rules listed
    /// under exactly `u` plus the rules listed under `*` (§4.3 step 2) — not
    /// a single "most specific group" choice. UA matching is exact token
    /// equality, not substring containment.
    fn applicable_groups(&self, user_agent: &str) -> Vec<&AgentGroup> {
        let ua = user_agent.to_ascii_lowercase();
        self.groups
            .iter()
            .filter(|g| g.agent == ua || g.agent == "*")
            .collect()
    }

    /// Determine whether a path is allowed for the given user-agent token.
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        match longest_match(&self.applicable_groups(user_agent), path) {
            None => true, // default allow
            Some(Rule::Allow(_)) => true,
            Some(Rule::Disallow(_)) => false,
        }
    }

    /// Get crawl-delay directive for the given user-agent, if any. Prefers
    /// the exact-UA group's value over the wildcard group's.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        let ua = user_agent.to_ascii_lowercase();
        let groups = self.applicable_groups(user_agent);
        groups
            .iter()
            .find(|g| g.agent == ua)
            .and_then(|g| g.crawl_delay)
            .or_else(|| groups.iter().find(|g| g.agent == "*").and_then(|g| g.crawl_delay))
    }
}

fn parse_crawl_delay(s: &str) -> Option<Duration> {
    // supports integer or float seconds
    let sv = s.trim();
    if sv.is_empty() { return None; }
    if let Ok(n) = sv.parse::<u64>() { return Some(Duration::from_secs(n)); }
    if let Ok(f) = sv.parse::<f64>() { return Some(Duration::from_secs_f64(f.max(0.0))); }
    None
}

#[derive(Debug, Clone, PartialEq)]
enum Rule {
    Allow(String),
    Disallow(String),
}

/// Longest-prefix-match over the union of `groups`' rules (§4.3 step 3).
/// An empty `Disallow` value means block all and is normalized to `/`
/// before matching; an empty `Allow` value matches every path as-is (the
/// empty-string prefix already matches everything).
fn longest_match(groups: &[&AgentGroup], path: &str) -> Option<Rule> {
    let mut best: Option<Rule> = None;
    let mut test = |pattern: &str, kind: fn(String) -> Rule| {
        // Basic prefix match. Standard allows wildcards; out of scope for v1.
        if path.starts_with(pattern) {
            match &best {
                None => { best = Some(kind(pattern.to_string())); }
                Some(prev) => {
                    let prev_len = match prev { Rule::Allow(s) | Rule::Disallow(s) => s.len() };
                    match pattern.len().cmp(&prev_len) {
                        Ordering::Greater => best = Some(kind(pattern.to_string())),
                        Ordering::Equal => {
                            // tie-breaker: Allow wins over Disallow
                            if matches!(prev, Rule::Disallow(_)) && matches!(kind(String::new()), Rule::Allow(_)) {
                                best = Some(kind(pattern.to_string()));
                            }
                        }
                        Ordering::Less => {}
                    }
                }
            }
        }
    };

    for group in groups {
        for a in &group.allow {
            test(a, Rule::Allow);
        }
        for d in &group.disallow {
            let normalized = if d.is_empty() { "/" } else { d.as_str() };
            test(normalized, Rule::Disallow);
        }
    }
    best
}

fn get_or_create_group_index(groups: &mut Vec<AgentGroup>, agent: &str) -> usize {
    if let Some((i, _)) = groups.iter().enumerate().find(|(_, g)| g.agent == agent) {
        return i;
    }
    groups.push(AgentGroup { agent: agent.to_string(), allow: vec![], disallow: vec![], crawl_delay: None });
    groups.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_match_basic_rules() {
        let txt = "\
User-agent: *\n\
Disallow: /private\n\
Allow: /private/open\n\
Crawl-delay: 2.5\n\
";
        let r = RobotsTxt::parse(txt);
        assert!(r.is_allowed("gurtbot", "/"));
        assert!(!r.is_allowed("gurtbot", "/private/index.html"));
        assert!(r.is_allowed("gurtbot", "/private/open/file"));
        let d = r.crawl_delay("gurtbot").unwrap();
        assert!(d.as_secs_f64() > 2.4 && d.as_secs_f64() < 2.6);
    }

    #[test]
    fn agent_specificity() {
        let txt = "\
User-agent: gurt\n\
Disallow: /blocked\n\
\n\
User-agent: *\n\
Allow: /\n\
";
        let r = RobotsTxt::parse(txt);
        assert!(!r.is_allowed("gurtbot", "/blocked/page"));
        assert!(r.is_allowed("otherbot", "/blocked/page"));
    }

    #[test]
    fn rules_do_not_leak_between_consecutive_groups() {
        let txt = "\
User-agent: gurt\n\
Disallow: /private\n\
\n\
User-agent: *\n\
Disallow: /\n\
";
        let r = RobotsTxt::parse(txt);
        // The wildcard group's blanket disallow must not have been applied
        // to the `gurt` group, nor vice versa.
        assert!(r.is_allowed("gurtbot", "/public/page"));
        assert!(!r.is_allowed("otherbot", "/public/page"));
    }

    #[test]
    fn wildcard_rules_still_apply_alongside_a_specific_section() {
        // A UA-specific section does not shadow `*`: the applicable ruleset
        // is the union of both (spec §4.3 step 2), so the wildcard's
        // `/private` disallow must still bind gurtbot even though gurtbot
        // has its own section.
        let txt = "\
User-agent: gurtbot\n\
Allow: /public\n\
\n\
User-agent: *\n\
Disallow: /private\n\
";
        let r = RobotsTxt::parse(txt);
        assert!(r.is_allowed("gurtbot", "/public/page"));
        assert!(!r.is_allowed("gurtbot", "/private/page"));
    }

    #[test]
    fn bare_disallow_blocks_everything() {
        // An empty Disallow value means "block all" and must normalize to
        // `/`, not be skipped (spec §4.3 step 3).
        let txt = "\
User-agent: *\n\
Disallow:\n\
";
        let r = RobotsTxt::parse(txt);
        assert!(!r.is_allowed("gurtbot", "/"));
        assert!(!r.is_allowed("gurtbot", "/anything"));
    }
}

impl RobotsTxt {
    /// Fetch and parse robots.txt for a domain. Non-200 responses and any
    /// network error are treated as "no robots.txt" — the caller's default
    /// is to allow, never to deny on error.
    pub async fn fetch_for_domain(client: &reqwest::Client, domain: &str) -> Option<Self> {
        let url = format!("http://{}/robots.txt", domain);
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let body = resp.text().await.unwrap_or_default();
                Some(Self::parse(&body))
            }
            _ => None,
        }
    }
}

/// Determine if a URL path is allowed for a given domain and user-agent.
/// - If robots is None (missing/unfetchable), default allow per requirements.
pub fn is_allowed_with_robots(robots: Option<&RobotsTxt>, user_agent: &str, path: &str) -> bool {
    match robots { Some(r) => r.is_allowed(user_agent, path), None => true }
}
