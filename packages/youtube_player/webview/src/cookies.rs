//! Cookies injected into a player's webview before it loads.

/// Domains every cookie is set for.
pub const COOKIE_DOMAINS: [&str; 2] = [".youtube.com", "youtube.com"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    /// `Set-Cookie` style string for the webview cookie store.
    #[must_use]
    pub fn to_set_cookie(&self) -> String {
        format!("{}={}; path=/; secure", self.name, self.value)
    }
}

/// Splits a `Cookie` header string into its pairs.
///
/// Blank segments and segments without `=` are skipped.
#[must_use]
pub fn parse_cookie_header(header: &str) -> Vec<Cookie> {
    header
        .split(';')
        .map(str::trim)
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                log::debug!("parse_cookie_header: skipping nameless pair");
                return None;
            }
            Some(Cookie {
                name: name.to_string(),
                value: value.trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn splits_and_trims_pairs() {
        let cookies = parse_cookie_header(" SID=abc; HSID = def ;;PREF=f6=8&hl=en ");

        assert_eq!(
            cookies
                .iter()
                .map(Cookie::to_set_cookie)
                .collect::<Vec<_>>(),
            vec![
                "SID=abc; path=/; secure",
                "HSID=def; path=/; secure",
                "PREF=f6=8&hl=en; path=/; secure",
            ]
        );
    }

    #[test_log::test]
    fn skips_malformed_segments() {
        assert_eq!(parse_cookie_header(""), vec![]);
        assert_eq!(parse_cookie_header("flag; =orphan"), vec![]);
    }
}
