//! Revenue share calculator
//!
//! Single source of payout math, used both per event and over aggregated
//! purchase groups.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::errors::Result;
use crate::storage::backend::PurchaseGroupRow;
use crate::storage::{EventType, RevenueShare, RevenueShareStore, ShareType};

/// Payout of one qualifying event under a contract.
///
/// No contract ⇒ 0. Null revenue counts as 0.
pub fn compute_payout(share: Option<&RevenueShare>, revenue: Option<f64>) -> f64 {
    match share {
        Some(RevenueShare {
            share_type: ShareType::Percentage,
            value,
        }) => revenue.unwrap_or(0.0) * value / 100.0,
        Some(RevenueShare {
            share_type: ShareType::Flat,
            value,
        }) => *value,
        None => 0.0,
    }
}

/// Payout of `purchase_count` purchases totalling `revenue_sum`.
///
/// Equal to summing `compute_payout` per event: percentage is linear in
/// revenue and flat is paid per event.
pub fn group_payout(share: &RevenueShare, purchase_count: i64, revenue_sum: f64) -> f64 {
    match share.share_type {
        ShareType::Percentage => revenue_sum * share.value / 100.0,
        ShareType::Flat => purchase_count as f64 * share.value,
    }
}

pub struct RevenueShareCalculator {
    store: Arc<dyn RevenueShareStore>,
}

impl RevenueShareCalculator {
    pub fn new(store: Arc<dyn RevenueShareStore>) -> Self {
        Self { store }
    }

    /// Payout for a single event. Only purchases with a credited
    /// (campaign, influencer) pair qualify.
    pub async fn payout_for_event(
        &self,
        event_type: EventType,
        campaign_id: Option<i64>,
        influencer_id: Option<i64>,
        revenue: Option<f64>,
    ) -> Result<f64> {
        if !event_type.is_purchase() {
            return Ok(0.0);
        }
        let (Some(campaign_id), Some(influencer_id)) = (campaign_id, influencer_id) else {
            return Ok(0.0);
        };

        let share = self
            .store
            .find_revenue_share(campaign_id, influencer_id)
            .await?;
        Ok(compute_payout(share.as_ref(), revenue))
    }

    /// Payout per (campaign_id, influencer_id) group; contracts are fetched
    /// once for all pairs.
    pub async fn payouts_for_groups(
        &self,
        groups: &[PurchaseGroupRow],
    ) -> Result<HashMap<(i64, i64), f64>> {
        if groups.is_empty() {
            return Ok(HashMap::new());
        }

        let pairs: Vec<(i64, i64)> = groups
            .iter()
            .map(|g| (g.campaign_id, g.influencer_id))
            .collect();
        let shares = self.store.find_revenue_shares(&pairs).await?;

        let payouts: HashMap<(i64, i64), f64> = groups
            .iter()
            .map(|g| {
                let key = (g.campaign_id, g.influencer_id);
                let payout = shares
                    .get(&key)
                    .map(|share| {
                        group_payout(share, g.purchase_count, g.total_revenue.unwrap_or(0.0))
                    })
                    .unwrap_or(0.0);
                (key, payout)
            })
            .collect();

        debug!(
            "Computed payouts for {} groups ({} with contracts)",
            groups.len(),
            shares.len()
        );
        Ok(payouts)
    }

    /// Total payout over all groups
    pub async fn total_payout(&self, groups: &[PurchaseGroupRow]) -> Result<f64> {
        Ok(self.payouts_for_groups(groups).await?.values().sum())
    }
}
