/// Case-sensitive substring matching against the configured keyword set.
///
/// Keywords are tried in configuration order and the first hit wins; which
/// keyword matched never changes what gets extracted afterwards.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
    ignored_sites: Vec<String>,
}

impl KeywordMatcher {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords,
            ignored_sites: Vec::new(),
        }
    }

    /// Frames mentioning one of `sites` are never reported.
    pub fn with_ignored_sites(mut self, sites: Vec<String>) -> Self {
        self.ignored_sites = sites;
        self
    }

    /// Returns the first configured keyword contained in `text`.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|keyword| text.contains(keyword.as_str()))
            .map(String::as_str)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }

    pub fn is_ignored(&self, text: &str) -> bool {
        self.ignored_sites.iter().any(|site| text.contains(site.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}
