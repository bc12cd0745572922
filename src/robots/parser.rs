//! Robots.txt parsing and rule evaluation
//!
//! Rule selection: exact user-agent match > substring match > `*` wildcard
//! > no rule (allow all). Path matching supports `*` wildcards and a
//! trailing `$` anchor; among matching Allow/Disallow patterns the longest
//! pattern wins, ties in favor of Allow.

use std::time::Duration;

/// One User-Agent block from a robots.txt file
#[derive(Debug, Clone, Default)]
pub struct RobotsRule {
    /// Lowercased user-agent token; `*` is the fallback rule
    pub user_agent: String,

    pub allow: Vec<String>,
    pub disallow: Vec<String>,

    /// Crawl-delay directive, converted from seconds
    pub crawl_delay: Option<Duration>,
}

/// A parsed robots.txt file
#[derive(Debug, Clone, Default)]
pub struct RobotsTxt {
    rules: Vec<RobotsRule>,
}

impl RobotsTxt {
    /// Parses raw robots.txt content
    ///
    /// Consecutive `User-agent` lines open one shared group; `Allow`,
    /// `Disallow`, and `Crawl-delay` directives apply to every agent in
    /// the current group. Unknown directives and comments are ignored.
    pub fn parse(content: &str) -> Self {
        let mut rules: Vec<RobotsRule> = Vec::new();
        // Indices into `rules` for the group currently receiving directives
        let mut current_group: Vec<usize> = Vec::new();
        let mut group_open = false;

        for line in content.lines() {
            let line = match line.split_once('#') {
                Some((before, _)) => before.trim(),
                None => line.trim(),
            };
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if !group_open {
                        current_group.clear();
                    }
                    group_open = true;
                    rules.push(RobotsRule {
                        user_agent: value.to_lowercase(),
                        ..Default::default()
                    });
                    current_group.push(rules.len() - 1);
                }
                "allow" => {
                    group_open = false;
                    for &idx in &current_group {
                        if !value.is_empty() {
                            rules[idx].allow.push(value.to_string());
                        }
                    }
                }
                "disallow" => {
                    group_open = false;
                    for &idx in &current_group {
                        // An empty Disallow means allow-all and adds no pattern
                        if !value.is_empty() {
                            rules[idx].disallow.push(value.to_string());
                        }
                    }
                }
                "crawl-delay" => {
                    group_open = false;
                    if let Ok(seconds) = value.parse::<f64>() {
                        if seconds >= 0.0 {
                            for &idx in &current_group {
                                rules[idx].crawl_delay = Some(Duration::from_secs_f64(seconds));
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        Self { rules }
    }

    /// An empty rule set that allows everything (used on fetch failure)
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Selects the most specific rule for a user agent
    ///
    /// Specificity: exact match > substring match (longest token wins) >
    /// `*` wildcard. Returns None when no rule applies.
    pub fn rule_for(&self, user_agent: &str) -> Option<&RobotsRule> {
        let agent = user_agent.to_lowercase();

        if let Some(rule) = self.rules.iter().find(|r| r.user_agent == agent) {
            return Some(rule);
        }

        let substring = self
            .rules
            .iter()
            .filter(|r| r.user_agent != "*" && agent.contains(&r.user_agent))
            .max_by_key(|r| r.user_agent.len());
        if substring.is_some() {
            return substring;
        }

        self.rules.iter().find(|r| r.user_agent == "*")
    }

    /// Checks whether the given path is allowed for a user agent
    pub fn is_allowed(&self, path: &str, user_agent: &str) -> bool {
        let Some(rule) = self.rule_for(user_agent) else {
            return true;
        };

        let longest_match = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|p| path_matches(p, path))
                .map(|p| p.len())
                .max()
        };

        let allow = longest_match(&rule.allow);
        let disallow = longest_match(&rule.disallow);

        match (allow, disallow) {
            (None, None) => true,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            // Longest pattern wins; ties break in favor of Allow
            (Some(a), Some(d)) => a >= d,
        }
    }

    /// Crawl delay for a user agent, if any rule specifies one
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        self.rule_for(user_agent).and_then(|r| r.crawl_delay)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Matches a robots.txt path pattern against a URL path
///
/// Patterns are prefix matches with `*` matching any substring and a
/// trailing `$` anchoring the end of the path.
fn path_matches(pattern: &str, path: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(p) => (p, true),
        None => (pattern, false),
    };

    let segments: Vec<&str> = pattern.split('*').collect();

    // Fast path: a plain prefix pattern
    if segments.len() == 1 {
        return if anchored {
            path == pattern
        } else {
            path.starts_with(pattern)
        };
    }

    let mut pos = 0;
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if i == 0 {
            if !path.starts_with(segment) {
                return false;
            }
            pos = segment.len();
        } else if i == segments.len() - 1 && anchored {
            // Final literal segment with an anchor must end the path
            return path.len() >= pos + segment.len() && path.ends_with(segment);
        } else {
            match path[pos..].find(segment) {
                Some(offset) => pos = pos + offset + segment.len(),
                None => return false,
            }
        }
    }

    // Anchored pattern ending in `*` matches any tail
    true
}
