//! Coupon and tracking link issuance
//!
//! Candidates are inserted directly under the store's unique index. A unique
//! violation is the only retry trigger; after `max_attempts` the caller gets
//! a `Conflict` and may try again later.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{CodegenConfig, get_config};
use crate::errors::{AttributorError, Result};
use crate::storage::{
    CodeRegistry, Coupon, InsertOutcome, NewCoupon, NewTrackingLink, TrackingLink,
};
use crate::utils::url_validator::validate_destination_url;
use crate::utils::{COUPON_CHARSET, SHORT_CODE_CHARSET, generate_random_code};

/// Longest random part accepted for a coupon code
const MAX_CODE_LENGTH: usize = 32;
/// Prefix plus random part must fit the 50-char `coupons.code` column
const MAX_PREFIX_LENGTH: usize = 16;

/// Coupon generation parameters, stored with the coupon as JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// Free-form extras passed through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

pub struct CodeIssuer {
    registry: Arc<dyn CodeRegistry>,
    config: CodegenConfig,
}

impl CodeIssuer {
    pub fn new(registry: Arc<dyn CodeRegistry>) -> Self {
        Self::with_config(registry, get_config().codegen.clone())
    }

    pub fn with_config(registry: Arc<dyn CodeRegistry>, config: CodegenConfig) -> Self {
        Self { registry, config }
    }

    async fn ensure_targets_exist(&self, campaign_id: i64, influencer_id: Option<i64>) -> Result<()> {
        if !self.registry.campaign_exists(campaign_id).await? {
            return Err(AttributorError::not_found(format!(
                "Campaign {} not found",
                campaign_id
            )));
        }
        if let Some(influencer_id) = influencer_id
            && !self.registry.influencer_exists(influencer_id).await?
        {
            return Err(AttributorError::not_found(format!(
                "Influencer {} not found",
                influencer_id
            )));
        }
        Ok(())
    }

    fn coupon_candidate(&self, settings: &CodeSettings) -> Result<String> {
        let length = settings.length.unwrap_or(self.config.coupon_length);
        if length == 0 || length > MAX_CODE_LENGTH {
            return Err(AttributorError::validation(format!(
                "Coupon length must be between 1 and {}",
                MAX_CODE_LENGTH
            )));
        }

        let prefix = settings
            .prefix
            .as_deref()
            .map(|p| p.trim().to_uppercase())
            .unwrap_or_default();
        if prefix.len() > MAX_PREFIX_LENGTH
            || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(AttributorError::validation(format!(
                "Coupon prefix must be at most {} ASCII letters or digits",
                MAX_PREFIX_LENGTH
            )));
        }

        Ok(format!(
            "{}{}",
            prefix,
            generate_random_code(COUPON_CHARSET, length)
        ))
    }

    /// Issue a coupon with a fresh uppercase code
    pub async fn issue_coupon(
        &self,
        campaign_id: i64,
        influencer_id: Option<i64>,
        settings: CodeSettings,
    ) -> Result<Coupon> {
        self.ensure_targets_exist(campaign_id, influencer_id).await?;

        let settings_json = serde_json::to_string(&settings)?;
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            let code = self.coupon_candidate(&settings)?;
            let candidate = NewCoupon {
                code: code.clone(),
                campaign_id,
                influencer_id,
                settings: Some(settings_json.clone()),
            };

            match self.registry.try_insert_coupon(candidate).await? {
                InsertOutcome::Inserted(coupon) => {
                    info!(
                        "CodeIssuer: coupon '{}' issued for campaign {} (attempt {})",
                        coupon.code, campaign_id, attempt
                    );
                    return Ok(coupon);
                }
                InsertOutcome::Duplicate => {
                    warn!(
                        "CodeIssuer: coupon code '{}' collided (attempt {}/{})",
                        code, attempt, attempts
                    );
                }
            }
        }

        Err(AttributorError::conflict(format!(
            "Could not generate a unique coupon code after {} attempts, try again",
            attempts
        )))
    }

    /// Issue a tracking link with a fresh mixed-case short code
    pub async fn issue_tracking_link(
        &self,
        campaign_id: i64,
        influencer_id: Option<i64>,
        destination_url: &str,
    ) -> Result<TrackingLink> {
        let destination = validate_destination_url(destination_url)
            .map_err(|e| AttributorError::validation(e.to_string()))?;
        self.ensure_targets_exist(campaign_id, influencer_id).await?;

        let length = self.config.short_code_length.max(1);
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            let short_code = generate_random_code(SHORT_CODE_CHARSET, length);
            let candidate = NewTrackingLink {
                short_code: short_code.clone(),
                destination_url: destination.to_string(),
                campaign_id,
                influencer_id,
            };

            match self.registry.try_insert_tracking_link(candidate).await? {
                InsertOutcome::Inserted(link) => {
                    info!(
                        "CodeIssuer: tracking link '{}' -> '{}' issued (attempt {})",
                        link.short_code, link.destination_url, attempt
                    );
                    return Ok(link);
                }
                InsertOutcome::Duplicate => {
                    warn!(
                        "CodeIssuer: short code '{}' collided (attempt {}/{})",
                        short_code, attempt, attempts
                    );
                }
            }
        }

        Err(AttributorError::conflict(format!(
            "Could not generate a unique short code after {} attempts, try again",
            attempts
        )))
    }
}
