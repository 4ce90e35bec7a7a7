//! User agent selection.

pub const USER_AGENT: &str = "harvest/0.3 (+https://github.com/monokrome/harvest)";

/// Browser user agents used when a site rejects obvious crawlers.
pub const IMPERSONATE_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
];

fn pick_impersonated() -> &'static str {
    let seed = chrono::Utc::now().timestamp_subsec_nanos() as usize;
    IMPERSONATE_USER_AGENTS[seed % IMPERSONATE_USER_AGENTS.len()]
}

/// Resolve the user agent from a config value.
/// - None or blank => default harvest user agent
/// - "impersonate" => one of the browser user agents
/// - other => used verbatim
pub fn resolve_user_agent(config: Option<&str>) -> String {
    match config.map(str::trim) {
        None | Some("") => USER_AGENT.to_string(),
        Some(value) if value.eq_ignore_ascii_case("impersonate") => {
            pick_impersonated().to_string()
        }
        Some(custom) => custom.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_user_agent() {
        assert_eq!(resolve_user_agent(None), USER_AGENT);
        assert_eq!(resolve_user_agent(Some("  ")), USER_AGENT);
    }

    #[test]
    fn test_impersonate_picks_browser_agent() {
        let ua = resolve_user_agent(Some("Impersonate"));
        assert!(IMPERSONATE_USER_AGENTS.contains(&ua.as_str()));
    }

    #[test]
    fn test_custom_user_agent() {
        assert_eq!(resolve_user_agent(Some("MyBot/1.0")), "MyBot/1.0");
    }
}
