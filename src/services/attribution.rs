//! Attribution resolver
//!
//! Waterfall credit assignment for a single conversion event:
//! coupon code first, then an explicit ref code, then a ref code lazily
//! extracted from the landing URL. Lookup failures never fail the event,
//! they degrade to "no match".

use std::sync::Arc;

use tracing::{debug, error};
use url::Url;

use crate::storage::{Attribution, AttributionLookup};

/// Base used to resolve relative landing URLs such as `/p?ref_code=x`
const RELATIVE_URL_BASE: &str = "http://localhost/";

/// Query parameter carrying the tracking link short code
pub const REF_CODE_PARAM: &str = "ref_code";

/// Extract a non-empty `ref_code` query parameter from a landing URL.
///
/// Blank occurrences are skipped and the first non-empty value wins.
/// Malformed URLs yield `None`.
pub fn extract_ref_code(landing_url: &str) -> Option<String> {
    let parsed = match Url::parse(landing_url) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(RELATIVE_URL_BASE)
            .and_then(|base| base.join(landing_url))
            .ok()?,
        Err(_) => return None,
    };

    parsed
        .query_pairs()
        .find(|(key, value)| key == REF_CODE_PARAM && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

pub struct AttributionResolver {
    lookup: Arc<dyn AttributionLookup>,
}

impl AttributionResolver {
    pub fn new(lookup: Arc<dyn AttributionLookup>) -> Self {
        Self { lookup }
    }

    /// Resolve the credited (influencer, campaign, tracking link) triple.
    ///
    /// `advertiser_id` is accepted for logging only; codes are matched
    /// globally.
    pub async fn resolve(
        &self,
        coupon_code: Option<&str>,
        ref_code: Option<&str>,
        landing_url: Option<&str>,
        advertiser_id: i64,
    ) -> Attribution {
        // 1. 优惠码
        if let Some(code) = non_empty(coupon_code) {
            match self.lookup.find_coupon_by_code(code).await {
                Ok(Some(coupon)) => {
                    debug!(
                        "Attribution: coupon '{}' matched for advertiser {}",
                        code, advertiser_id
                    );
                    return Attribution {
                        influencer_id: coupon.influencer_id,
                        campaign_id: Some(coupon.campaign_id),
                        tracking_link_id: None,
                    };
                }
                Ok(None) => debug!("Attribution: coupon '{}' not found", code),
                Err(e) => error!("Attribution: coupon lookup failed for '{}': {}", code, e),
            }
        }

        // 2. 显式 ref_code，未提供时从落地页 URL 中提取
        let effective_ref = match non_empty(ref_code) {
            Some(code) => Some(code.to_string()),
            None => non_empty(landing_url).and_then(extract_ref_code),
        };

        let Some(code) = effective_ref else {
            return Attribution::unattributed();
        };

        match self.lookup.find_link_by_short_code(&code).await {
            Ok(Some(link)) => match link.influencer_id {
                Some(influencer_id) => {
                    debug!(
                        "Attribution: ref code '{}' matched link {} for advertiser {}",
                        code, link.id, advertiser_id
                    );
                    Attribution {
                        influencer_id: Some(influencer_id),
                        campaign_id: Some(link.campaign_id),
                        tracking_link_id: Some(link.id),
                    }
                }
                None => {
                    debug!("Attribution: link '{}' has no influencer", code);
                    Attribution::unattributed()
                }
            },
            Ok(None) => {
                debug!("Attribution: ref code '{}' not found", code);
                Attribution::unattributed()
            }
            Err(e) => {
                error!("Attribution: link lookup failed for '{}': {}", code, e);
                Attribution::unattributed()
            }
        }
    }
}
