// src/crawl/classify.rs
// =============================================================================
// Decides whether a URL belongs to the site we are auditing.
//
// Internal pages are rendered and mined for more links. External links only
// get a status check. A host counts as internal when it:
// - equals the seed's host
// - is a subdomain of it (shop.example.com for example.com)
// - is a parent of it (example.com when we were seeded on www.example.com)
//
// Anything we can't parse is external, so we never try to discover links on
// a target we don't understand.
// =============================================================================

use url::Url;

use crate::report::LinkType;

#[derive(Debug, Clone)]
pub struct Classifier {
    base_host: String,
}

impl Classifier {
    // Builds a classifier from the seed URL
    //
    // A seed without a host leaves the base empty, which makes every URL
    // external. The crawl then degrades to "nothing internal to visit".
    pub fn new(seed: &str) -> Self {
        let base_host = Url::parse(seed)
            .ok()
            .and_then(|url| url.host_str().map(|host| host.to_ascii_lowercase()))
            .unwrap_or_default();
        Self { base_host }
    }

    pub fn base_host(&self) -> &str {
        &self.base_host
    }

    pub fn has_base(&self) -> bool {
        !self.base_host.is_empty()
    }

    pub fn is_internal(&self, url: &str) -> bool {
        if self.base_host.is_empty() {
            return false;
        }
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let base = self.base_host.as_str();

        if host == base || host.ends_with(&format!(".{}", base)) {
            return true;
        }

        // Parent-domain match needs a dot so a bare TLD like "com" never
        // swallows the whole internet
        host.contains('.') && base.ends_with(&format!(".{}", host))
    }

    pub fn link_type(&self, url: &str) -> LinkType {
        if self.is_internal(url) {
            LinkType::Internal
        } else {
            LinkType::External
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_host_and_subdomains_are_internal() {
        let classifier = Classifier::new("https://example.com/");
        assert_eq!(classifier.base_host(), "example.com");
        assert!(classifier.is_internal("https://example.com/about"));
        assert!(classifier.is_internal("https://shop.example.com/cart"));
        assert!(classifier.is_internal("https://www.example.com/"));
        assert!(!classifier.is_internal("https://other.com/"));
    }

    #[test]
    fn test_parent_of_www_seed_is_internal() {
        let classifier = Classifier::new("https://www.example.com/start");
        assert!(classifier.is_internal("https://example.com/pricing"));
        assert!(classifier.is_internal("https://WWW.EXAMPLE.COM/Contact"));
        assert!(!classifier.is_internal("https://com/"));
    }

    #[test]
    fn test_lookalike_domains_are_external() {
        let classifier = Classifier::new("https://example.com/");
        assert!(!classifier.is_internal("https://notexample.com/"));
        assert!(!classifier.is_internal("https://example.com.evil.net/"));
    }

    #[test]
    fn test_malformed_urls_are_external() {
        let classifier = Classifier::new("https://example.com/");
        assert!(!classifier.is_internal("not a url"));
        assert!(!classifier.is_internal("mailto:someone@example.com"));
        assert_eq!(classifier.link_type("::::"), LinkType::External);
    }

    #[test]
    fn test_malformed_seed_classifies_everything_external() {
        let classifier = Classifier::new("definitely not a url");
        assert!(!classifier.has_base());
        assert!(!classifier.is_internal("https://example.com/"));
    }
}
