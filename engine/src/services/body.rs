//! Body measurement service

use fitlog_shared::{classify_bmi, BmiCategory, BodyStats};
use serde::Serialize;

/// The most recent measurement with its BMI category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestBodyStats {
    pub stats: BodyStats,
    pub bmi_category: Option<BmiCategory>,
}

pub struct BodyService;

impl BodyService {
    pub fn compute_bmi_category(bmi: f64) -> BmiCategory {
        classify_bmi(bmi)
    }

    /// Latest dated entry; undated entries are only used when nothing is dated
    pub fn latest(stats: &[BodyStats]) -> Option<LatestBodyStats> {
        let latest = stats
            .iter()
            .filter(|s| s.date.is_some())
            .max_by_key(|s| s.date)
            .or_else(|| stats.last())?;

        Some(LatestBodyStats {
            stats: latest.clone(),
            bmi_category: latest.bmi.map(Self::compute_bmi_category),
        })
    }
}
