//! Tracking link redirect
//!
//! Looks up the link (cached), records the click in the background and
//! builds the destination URL tagged with `ref_code=<short_code>`.

use std::sync::Arc;

use tracing::debug;
use url::Url;

use super::attribution::REF_CODE_PARAM;
use crate::analytics::{ClickDetail, ClickRecorder};
use crate::storage::SeaOrmStorage;

/// Request metadata captured for the click log
#[derive(Debug, Clone, Default)]
pub struct ClickMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

/// Set `ref_code=<short_code>` on the destination URL.
///
/// An existing `ref_code` pair is replaced, other pairs and the fragment are
/// kept. Destinations that do not parse get the pair appended textually.
pub fn append_ref_code(destination: &str, short_code: &str) -> String {
    match Url::parse(destination) {
        Ok(mut url) => {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| key != REF_CODE_PARAM)
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
            {
                let mut pairs = url.query_pairs_mut();
                pairs.clear();
                for (key, value) in &kept {
                    pairs.append_pair(key, value);
                }
                pairs.append_pair(REF_CODE_PARAM, short_code);
            }
            url.to_string()
        }
        Err(_) => {
            let (base, fragment) = match destination.split_once('#') {
                Some((base, fragment)) => (base, Some(fragment)),
                None => (destination, None),
            };
            let separator = if !base.contains('?') {
                "?"
            } else if base.ends_with('?') || base.ends_with('&') {
                ""
            } else {
                "&"
            };
            let mut target = format!(
                "{}{}{}={}",
                base,
                separator,
                REF_CODE_PARAM,
                urlencoding::encode(short_code)
            );
            if let Some(fragment) = fragment {
                target.push('#');
                target.push_str(fragment);
            }
            target
        }
    }
}

pub struct RedirectService {
    storage: Arc<SeaOrmStorage>,
    recorder: ClickRecorder,
}

impl RedirectService {
    pub fn new(storage: Arc<SeaOrmStorage>, recorder: ClickRecorder) -> Self {
        Self { storage, recorder }
    }

    /// Resolve a short code to its redirect target; `None` for unknown codes.
    pub async fn resolve(&self, short_code: &str, meta: ClickMeta) -> Option<String> {
        let Some(link) = self.storage.find_link_cached(short_code).await else {
            debug!("Redirect link not found: {}", short_code);
            return None;
        };

        self.recorder.record(ClickDetail::new(link.id).with_request_info(
            meta.ip_address,
            meta.user_agent,
            meta.referer,
        ));

        Some(append_ref_code(&link.destination_url, &link.short_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_to_plain_url() {
        assert_eq!(
            append_ref_code("https://shop.example.com/p", "abc123"),
            "https://shop.example.com/p?ref_code=abc123"
        );
    }

    #[test]
    fn test_existing_pair_is_replaced() {
        assert_eq!(
            append_ref_code("https://shop.example.com/p?a=1&ref_code=old#top", "abc123"),
            "https://shop.example.com/p?a=1&ref_code=abc123#top"
        );
    }

    #[test]
    fn test_unparsable_destination_gets_textual_pair() {
        assert_eq!(append_ref_code("/landing", "abc"), "/landing?ref_code=abc");
        assert_eq!(
            append_ref_code("/landing?x=1#frag", "abc"),
            "/landing?x=1&ref_code=abc#frag"
        );
        assert_eq!(append_ref_code("/landing?", "abc"), "/landing?ref_code=abc");
    }
}
