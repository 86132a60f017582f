use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// `path:L<n>` or `L<n>`, addressing a 1-based line. Without a path the
/// currently open file is implied. Parsing is the exact inverse of `Display`;
/// a URL fragment's leading `#` is stripped by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeepLink {
    pub path: Option<String>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLinkParseError(pub String);

impl fmt::Display for DeepLinkParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed deep link: {}", self.0)
    }
}

impl std::error::Error for DeepLinkParseError {}

fn link_regex() -> &'static Regex {
    static LINK: OnceLock<Regex> = OnceLock::new();
    LINK.get_or_init(|| {
        Regex::new(r"^(?:(?P<path>.+):)?L(?P<line>[1-9]\d*)$").expect("deep link pattern is valid")
    })
}

impl DeepLink {
    pub fn new(path: &str, line: u32) -> Self {
        DeepLink {
            path: Some(path.to_string()),
            line,
        }
    }

    pub fn line_only(line: u32) -> Self {
        DeepLink { path: None, line }
    }

    /// The path this link points into, falling back to the open file
    pub fn resolve_path<'a>(&'a self, current: Option<&'a str>) -> Option<&'a str> {
        self.path.as_deref().or(current)
    }
}

impl FromStr for DeepLink {
    type Err = DeepLinkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = link_regex()
            .captures(s)
            .ok_or_else(|| DeepLinkParseError(s.to_string()))?;
        let line = caps["line"]
            .parse::<u32>()
            .map_err(|_| DeepLinkParseError(s.to_string()))?;
        Ok(DeepLink {
            path: caps.name("path").map(|m| m.as_str().to_string()),
            line,
        })
    }
}

impl fmt::Display for DeepLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}:L{}", path, self.line),
            None => write!(f, "L{}", self.line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_path() {
        let link: DeepLink = "src/main.rs:L42".parse().unwrap();
        assert_eq!(link, DeepLink::new("src/main.rs", 42));
    }

    #[test]
    fn test_parse_line_only() {
        assert_eq!("L7".parse::<DeepLink>().unwrap(), DeepLink::line_only(7));
        assert!("#L7".parse::<DeepLink>().is_err());
    }

    #[test]
    fn test_hash_and_whitespace_belong_to_the_path() {
        assert_eq!(
            "#notes.md:L3".parse::<DeepLink>().unwrap(),
            DeepLink::new("#notes.md", 3)
        );
        assert_eq!(
            " a.rs :L3".parse::<DeepLink>().unwrap(),
            DeepLink::new(" a.rs ", 3)
        );
        assert!(" L3".parse::<DeepLink>().is_err());
    }

    #[test]
    fn test_path_may_contain_colons() {
        let link: DeepLink = "C:/work/a.rs:L9".parse().unwrap();
        assert_eq!(link.path.as_deref(), Some("C:/work/a.rs"));
        assert_eq!(link.line, 9);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "L0", "L", "a.rs", "a.rs:", "a.rs:L-1", "a.rs:L1x", ":L3", "L99999999999"] {
            assert!(bad.parse::<DeepLink>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_display_round_trip() {
        for link in [
            DeepLink::new("dir/x y.rs", 12),
            DeepLink::new("#notes.md", 3),
            DeepLink::new("##a.rs", 1),
            DeepLink::new(" padded.rs ", 4),
            DeepLink::line_only(1),
        ] {
            assert_eq!(link.to_string().parse::<DeepLink>().unwrap(), link);
        }
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(DeepLink::line_only(1).resolve_path(Some("a.rs")), Some("a.rs"));
        assert_eq!(DeepLink::new("b.rs", 1).resolve_path(Some("a.rs")), Some("b.rs"));
        assert_eq!(DeepLink::line_only(1).resolve_path(None), None);
    }
}
