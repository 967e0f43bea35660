//! Turns free-form competitor/baseline input into fully schemed URLs.

use std::collections::HashSet;

pub trait UrlNormalizer: Send + Sync {
    /// Returns `""` for blank input, otherwise a URL with a scheme.
    fn normalize(&self, raw: &str) -> String;
}

/// Prefixes a default scheme and guesses `.com` for bare, dotless hosts.
#[derive(Debug, Clone)]
pub struct GuessComNormalizer {
    pub default_scheme: String,
    pub guess_com_if_no_dot: bool,
    /// Lower-cased hosts that never get `.com` appended.
    pub no_guess_hosts: HashSet<String>,
}

impl Default for GuessComNormalizer {
    fn default() -> Self {
        Self {
            default_scheme: "https".to_string(),
            guess_com_if_no_dot: true,
            no_guess_hosts: HashSet::from(["localhost".to_string()]),
        }
    }
}

fn has_http_scheme(s: &str) -> bool {
    let lower = |n: usize| s.get(..n).map(str::to_ascii_lowercase);
    lower(7).as_deref() == Some("http://") || lower(8).as_deref() == Some("https://")
}

impl UrlNormalizer for GuessComNormalizer {
    fn normalize(&self, raw: &str) -> String {
        let s = raw.trim();
        if s.is_empty() {
            return String::new();
        }
        if has_http_scheme(s) {
            return s.to_string();
        }

        let (host, rest) = match s.split_once('/') {
            Some((host, path)) => (host.trim(), Some(path)),
            None => (s, None),
        };

        let mut host = host.to_string();
        if self.guess_com_if_no_dot
            && !host.contains('.')
            && !self.no_guess_hosts.contains(&host.to_lowercase())
        {
            host.push_str(".com");
        }

        match rest {
            Some(path) => format!("{}://{host}/{path}", self.default_scheme),
            None => format!("{}://{host}", self.default_scheme),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm() -> GuessComNormalizer {
        GuessComNormalizer::default()
    }

    #[test]
    fn schemed_input_is_unchanged() {
        let n = norm();
        for input in [
            "http://example",
            "https://example.com/a/b",
            "HTTPS://Example.COM",
            "Http://localhost:8080/x",
        ] {
            assert_eq!(n.normalize(input), input);
        }
    }

    #[test]
    fn dotted_host_only_gets_scheme() {
        assert_eq!(norm().normalize("example.com/path"), "https://example.com/path");
        assert_eq!(norm().normalize("sub.example.org"), "https://sub.example.org");
    }

    #[test]
    fn dotless_host_gets_com_before_path() {
        assert_eq!(norm().normalize("example"), "https://example.com");
        assert_eq!(norm().normalize("example/path"), "https://example.com/path");
        assert_eq!(norm().normalize("  acme  "), "https://acme.com");
    }

    #[test]
    fn excluded_hosts_are_case_insensitive() {
        assert_eq!(norm().normalize("localhost"), "https://localhost");
        assert_eq!(norm().normalize("LocalHost/admin"), "https://LocalHost/admin");
    }

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(norm().normalize(""), "");
        assert_eq!(norm().normalize(" \t\n"), "");
    }

    #[test]
    fn guessing_can_be_disabled_and_scheme_configured() {
        let n = GuessComNormalizer {
            default_scheme: "http".into(),
            guess_com_if_no_dot: false,
            no_guess_hosts: HashSet::new(),
        };
        assert_eq!(n.normalize("intranet/wiki"), "http://intranet/wiki");
    }

    #[test]
    fn trailing_slash_keeps_empty_path() {
        assert_eq!(norm().normalize("acme/"), "https://acme.com/");
    }
}
