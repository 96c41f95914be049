//! Outbound client identities.
//!
//! Each profile is a fixed, ordered header set that makes a request look like
//! it came from a particular kind of client. The tables are process-wide
//! constants; only the referer of the browser profile depends on the target.

use url::Url;

/// Default search engine host used for the browser profile's referer.
pub const DEFAULT_SEARCH_HOST: &str = "www.google.com";

/// How a profile fills in the `Referer` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefererPolicy {
    /// No referer is sent.
    None,
    /// Always the same referer.
    Static(&'static str),
    /// `https://<search host>/search?q=site:<target host>`.
    SiteSearch,
}

/// A canned set of request headers simulating one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityProfile {
    pub name: &'static str,
    headers: &'static [(&'static str, &'static str)],
    referer: RefererPolicy,
}

impl IdentityProfile {
    /// User agent this profile announces.
    pub fn user_agent(&self) -> &'static str {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
            .map(|(_, value)| *value)
            .unwrap_or_default()
    }

    /// Ordered headers for a request to `target`.
    pub fn headers_for(&self, target: &Url, search_host: &str) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();

        match self.referer {
            RefererPolicy::None => {}
            RefererPolicy::Static(referer) => {
                headers.push(("Referer".to_string(), referer.to_string()));
            }
            RefererPolicy::SiteSearch => {
                if let Some(host) = target.host_str() {
                    headers.push((
                        "Referer".to_string(),
                        format!("https://{}/search?q=site:{}", search_host, host),
                    ));
                }
            }
        }

        headers
    }
}

// Accept-Encoding is left to the HTTP client so it can decode what it asked for.

/// Ordinary desktop Chrome on Windows.
pub const BROWSER: IdentityProfile = IdentityProfile {
    name: "browser",
    headers: &[
        ("User-Agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"),
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8"),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Cache-Control", "no-cache"),
        ("Pragma", "no-cache"),
        ("Sec-Ch-Ua", "\"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\""),
        ("Sec-Ch-Ua-Mobile", "?0"),
        ("Sec-Ch-Ua-Platform", "\"Windows\""),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
        ("Sec-Fetch-User", "?1"),
        ("Upgrade-Insecure-Requests", "1"),
    ],
    referer: RefererPolicy::SiteSearch,
};

/// Declared Googlebot smartphone crawler.
pub const CRAWLER: IdentityProfile = IdentityProfile {
    name: "googlebot",
    headers: &[
        ("User-Agent", "Mozilla/5.0 (Linux; Android 6.0.1; Nexus 5X Build/MMB29P) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"),
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        ("Accept-Language", "en-US,en;q=0.5"),
    ],
    referer: RefererPolicy::Static("https://www.google.com/"),
};

/// Link-preview fetchers, tried last since many sites serve them full markup.
pub const SOCIAL_PREVIEW: &[IdentityProfile] = &[
    IdentityProfile {
        name: "facebookexternalhit",
        headers: &[
            ("User-Agent", "facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)"),
            ("Accept", "text/html,application/xhtml+xml,*/*;q=0.8"),
        ],
        referer: RefererPolicy::None,
    },
    IdentityProfile {
        name: "twitterbot",
        headers: &[
            ("User-Agent", "Twitterbot/1.0"),
            ("Accept", "text/html,application/xhtml+xml,*/*;q=0.8"),
        ],
        referer: RefererPolicy::None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn browser_referer_is_site_search() {
        let url = Url::parse("https://news.example.com/2024/story").unwrap();
        let headers = BROWSER.headers_for(&url, DEFAULT_SEARCH_HOST);
        assert_eq!(
            header(&headers, "Referer"),
            Some("https://www.google.com/search?q=site:news.example.com")
        );
        assert!(BROWSER.user_agent().contains("Chrome/131"));
    }

    #[test]
    fn browser_headers_keep_their_order() {
        let url = Url::parse("https://example.com").unwrap();
        let headers = BROWSER.headers_for(&url, "duckduckgo.com");
        assert_eq!(headers[0].0, "User-Agent");
        assert_eq!(headers[1].0, "Accept");
        assert_eq!(headers.last().map(|(k, _)| k.as_str()), Some("Referer"));
        assert_eq!(
            header(&headers, "Referer"),
            Some("https://duckduckgo.com/search?q=site:example.com")
        );
    }

    #[test]
    fn crawler_referer_is_static() {
        let a = CRAWLER.headers_for(&Url::parse("https://a.com").unwrap(), DEFAULT_SEARCH_HOST);
        let b = CRAWLER.headers_for(&Url::parse("https://b.org/x").unwrap(), DEFAULT_SEARCH_HOST);
        assert_eq!(a, b);
        assert_eq!(header(&a, "Referer"), Some("https://www.google.com/"));
        assert!(CRAWLER.user_agent().contains("Googlebot"));
    }

    #[test]
    fn social_profiles_send_no_referer() {
        let url = Url::parse("https://example.com").unwrap();
        for profile in SOCIAL_PREVIEW {
            let headers = profile.headers_for(&url, DEFAULT_SEARCH_HOST);
            assert!(header(&headers, "Referer").is_none(), "{}", profile.name);
            assert!(!profile.user_agent().is_empty());
        }
    }

    #[test]
    fn no_profile_negotiates_encoding_itself() {
        let url = Url::parse("https://example.com").unwrap();
        for profile in [BROWSER, CRAWLER].iter().chain(SOCIAL_PREVIEW) {
            let headers = profile.headers_for(&url, DEFAULT_SEARCH_HOST);
            assert!(header(&headers, "Accept-Encoding").is_none());
        }
    }
}
