//! Textual extraction of the request path, Host and Referer values.
//!
//! Each rule looks for a fixed marker anywhere in the rendered text and takes
//! what follows it: up to the next whitespace for the GET marker (the
//! request target), up to the end of the line for the header markers. No
//! HTTP parsing or validation happens here; a missing marker simply yields
//! an absent field.

use regex::Regex;

use super::types::ExtractedFields;

#[derive(Debug, Clone)]
pub struct FieldExtractor {
    get_line: Regex,
    host: Regex,
    referer: Regex,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor {
    pub fn new() -> Self {
        // literal patterns, compilation cannot fail
        // GET carries no word boundary: in a raw frame it follows arbitrary header bytes
        Self {
            get_line: Regex::new(r"GET[ \t]+(\S+)").unwrap(),
            host: Regex::new(r"\bHost:[ \t]*([^\r\n]*)").unwrap(),
            referer: Regex::new(r"\bReferer:[ \t]*([^\r\n]*)").unwrap(),
        }
    }

    pub fn extract(&self, text: &str) -> ExtractedFields {
        ExtractedFields {
            request_path: capture_value(&self.get_line, text),
            host: capture_value(&self.host, text),
            referer: capture_value(&self.referer, text),
        }
    }
}

fn capture_value(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
