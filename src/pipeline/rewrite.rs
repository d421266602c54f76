//! Endpoint rewriting
//!
//! Normalizes raw API paths into canonical endpoints using a
//! configured segment map. Matching is per `/`-separated segment:
//! exact match first, then a plural-aware singular match that
//! re-pluralizes the replacement.

use std::collections::HashMap;

/// Segment-level path rewriter. An empty map is the identity.
#[derive(Debug, Clone, Default)]
pub struct EndpointRewriter {
    map: HashMap<String, String>,
}

impl EndpointRewriter {
    pub fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    /// Rewrite each segment of `endpoint`; unmatched segments pass
    /// through unchanged.
    pub fn rewrite(&self, endpoint: &str) -> String {
        if self.map.is_empty() {
            return endpoint.to_string();
        }

        endpoint
            .split('/')
            .map(|segment| self.rewrite_segment(segment))
            .collect::<Vec<_>>()
            .join("/")
    }

    fn rewrite_segment(&self, segment: &str) -> String {
        if let Some(replacement) = self.map.get(segment) {
            return replacement.clone();
        }

        // Plural form: match on the singular, re-pluralize the result
        if let Some(base) = segment.strip_suffix('s') {
            if let Some(replacement) = self.map.get(base) {
                return format!("{replacement}s");
            }
        }

        segment.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter(pairs: &[(&str, &str)]) -> EndpointRewriter {
        EndpointRewriter::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_exact_segment_match() {
        let r = rewriter(&[("message", "sms")]);
        assert_eq!(r.rewrite("api/message/send"), "api/sms/send");
    }

    #[test]
    fn test_plural_segment_match() {
        let r = rewriter(&[("message", "sms")]);
        assert_eq!(r.rewrite("api/messages/send"), "api/smss/send");
    }

    #[test]
    fn test_unmatched_passthrough() {
        let r = rewriter(&[("message", "sms")]);
        assert_eq!(r.rewrite("api/orders/list"), "api/orders/list");
    }

    #[test]
    fn test_exact_match_wins_over_plural() {
        // "statuses" maps directly; the singular rule must not fire
        let r = rewriter(&[("statuses", "states"), ("statuse", "wrong")]);
        assert_eq!(r.rewrite("api/statuses"), "api/states");
    }

    #[test]
    fn test_empty_map_is_identity() {
        let r = EndpointRewriter::default();
        assert_eq!(r.rewrite("api/messages/send"), "api/messages/send");
    }
}
