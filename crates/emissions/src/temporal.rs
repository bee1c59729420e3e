//! Choosing source time steps for required output times.
//!
//! Emission archives often hold a short representative sample (a week of
//! hourly files, say) that is reused cyclically, so a required time with
//! no exact source is served by a source time a whole number of periods
//! away.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{EmissionsError, Result};

fn default_period_days() -> u32 {
    7
}

/// Fallback rules for [`TemporalPolicy::match_time`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalPolicy {
    /// Length of the reuse cycle in days.
    #[serde(default = "default_period_days")]
    pub period_days: u32,
    /// Use the nearest available time, with a warning, when neither an
    /// exact nor a periodic match exists.
    #[serde(default)]
    pub allow_nearest_fallback: bool,
}

impl Default for TemporalPolicy {
    fn default() -> Self {
        Self {
            period_days: default_period_days(),
            allow_nearest_fallback: false,
        }
    }
}

impl TemporalPolicy {
    fn period(&self) -> Duration {
        Duration::days(i64::from(self.period_days))
    }

    /// Index of the source time to use for `required`.
    ///
    /// 1. an exact match;
    /// 2. otherwise the candidate whose offset from `required` is a whole
    ///    number of periods, smallest absolute offset first (earliest on a
    ///    tie);
    /// 3. otherwise the nearest time if `allow_nearest_fallback`, else
    ///    [`EmissionsError::NoTemporalMatch`].
    pub fn match_time(&self, required: DateTime<Utc>, available: &[DateTime<Utc>]) -> Result<usize> {
        if let Some(idx) = available.iter().position(|&t| t == required) {
            return Ok(idx);
        }

        let period = self.period().num_seconds();
        let periodic = available
            .iter()
            .enumerate()
            .filter(|(_, &t)| period > 0 && (required - t).num_seconds() % period == 0)
            .min_by_key(|(_, &t)| (required - t).num_seconds().abs())
            .map(|(i, _)| i);
        if let Some(idx) = periodic {
            warn!(
                requested = %required,
                substituted = %available[idx],
                period_days = self.period_days,
                "No exact source time; using a periodic match"
            );
            return Ok(idx);
        }

        if self.allow_nearest_fallback {
            if let Some(idx) = nearest(required, available) {
                warn!(
                    requested = %required,
                    substituted = %available[idx],
                    "No exact or periodic source time; using the nearest available"
                );
                return Ok(idx);
            }
        }

        Err(EmissionsError::NoTemporalMatch {
            requested: required,
            available: available.len(),
        })
    }

    /// [`match_time`](Self::match_time) for every required time.
    pub fn match_hourly(
        &self,
        required: &[DateTime<Utc>],
        available: &[DateTime<Utc>],
    ) -> Result<Vec<usize>> {
        let indices = required
            .iter()
            .map(|&t| self.match_time(t, available))
            .collect::<Result<Vec<_>>>()?;
        debug!(required = required.len(), available = available.len(), "Matched source times");
        Ok(indices)
    }
}

fn nearest(required: DateTime<Utc>, available: &[DateTime<Utc>]) -> Option<usize> {
    available
        .iter()
        .enumerate()
        .min_by_key(|(_, &t)| (required - t).num_seconds().abs())
        .map(|(i, _)| i)
}

/// Index of the last available time at or before `required`.
///
/// When every available time lies after `required`, the nearest one is
/// used with a warning.
pub fn match_nearest_before(required: DateTime<Utc>, available: &[DateTime<Utc>]) -> Result<usize> {
    if let Some(idx) = available.iter().rposition(|&t| t <= required) {
        return Ok(idx);
    }
    let idx = nearest(required, available).ok_or(EmissionsError::NoTemporalMatch {
        requested: required,
        available: 0,
    })?;
    warn!(
        requested = %required,
        substituted = %available[idx],
        "All source times are after the requested time; using the nearest"
    );
    Ok(idx)
}
