//! Statistics Tracker — running aggregates and temporal patterns
//!
//! Counters increment monotonically as interventions are recorded; derived
//! values (percentages, success rate) are computed at read time so a
//! snapshot is always consistent with the counters. Daily summaries and
//! peak-hour heuristics are recomputed on demand over the history buffer —
//! a deterministic, table-driven rule set, not a learned model.

use chrono::{DateTime, Datelike, Local, Timelike};
use serde::{Deserialize, Serialize};

use crate::coordinator::Intervention;
use crate::policy::Tier;

/// Round to one decimal place, the resolution the dashboard displays.
fn pct(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((count as f64 / total as f64) * 1000.0).round() / 10.0
}

/// Derived view of the running counters, recomputed on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub total_interventions: u64,
    pub ai_only_count: u64,
    pub notify_count: u64,
    pub emergency_count: u64,
    pub successful_redirections: u64,
    /// All caregiver notices actually sent, including AI_ONLY opt-ins.
    pub notifications_sent: u64,
    pub average_response_ms: f64,
    pub ai_only_percentage: f64,
    pub notify_percentage: f64,
    pub emergency_percentage: f64,
    pub success_rate: f64,
}

/// Scenario tag with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioCount {
    pub kind: String,
    pub count: u64,
}

/// One hour-of-day bucket in the peak-confusion ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyPeak {
    pub hour: u32,
    pub count: u64,
}

/// Per-tier counts within a daily summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierCounts {
    pub ai_only: u64,
    pub notify: u64,
    pub emergency: u64,
}

/// Summary of today's interventions, derived from history on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySummary {
    /// Local calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub total_interventions: u64,
    pub by_tier: TierCounts,
    /// Top 5 scenario tags, count descending, first-seen order on ties.
    pub top_scenarios: Vec<ScenarioCount>,
    /// Top 3 hour-of-day buckets by intervention count.
    pub peak_confusion_hours: Vec<HourlyPeak>,
    pub recommendations: Vec<String>,
}

/// Running aggregate state. Owned by the coordinator; mutations are
/// serialized under its lock.
#[derive(Debug, Clone, Default)]
pub struct StatisticsTracker {
    total: u64,
    ai_only: u64,
    notify: u64,
    emergency: u64,
    successful_redirections: u64,
    notifications_sent: u64,
    average_response_ms: f64,
}

impl StatisticsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one completed intervention into the aggregates.
    ///
    /// Failed interventions still count — undercounting failures would hide
    /// system degradation.
    pub fn record(&mut self, intervention: &Intervention, elapsed_ms: f64) {
        self.total += 1;
        match intervention.tier {
            Tier::AiOnly => self.ai_only += 1,
            Tier::Notify => self.notify += 1,
            Tier::Emergency => self.emergency += 1,
        }

        // Incremental arithmetic mean: avg' = (avg*(n-1) + sample)/n
        let n = self.total as f64;
        self.average_response_ms = (self.average_response_ms * (n - 1.0) + elapsed_ms) / n;

        if intervention.decision.intervention_needed && intervention.error.is_none() {
            self.successful_redirections += 1;
        }

        self.notifications_sent += intervention.notifications.len() as u64;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            total_interventions: self.total,
            ai_only_count: self.ai_only,
            notify_count: self.notify,
            emergency_count: self.emergency,
            successful_redirections: self.successful_redirections,
            notifications_sent: self.notifications_sent,
            average_response_ms: self.average_response_ms,
            ai_only_percentage: pct(self.ai_only, self.total),
            notify_percentage: pct(self.notify, self.total),
            emergency_percentage: pct(self.emergency, self.total),
            success_rate: pct(self.successful_redirections, self.total),
        }
    }
}

/// Build the daily summary from a history slice, using `now` as the
/// reference date (injected for testability).
pub fn daily_summary<'a, I>(history: I, now: DateTime<Local>) -> DailySummary
where
    I: IntoIterator<Item = &'a Intervention>,
{
    let today: Vec<&Intervention> = history
        .into_iter()
        .filter(|i| {
            let local = i.timestamp.with_timezone(&Local);
            local.year() == now.year() && local.ordinal() == now.ordinal()
        })
        .collect();

    let mut by_tier = TierCounts::default();
    for intervention in &today {
        match intervention.tier {
            Tier::AiOnly => by_tier.ai_only += 1,
            Tier::Notify => by_tier.notify += 1,
            Tier::Emergency => by_tier.emergency += 1,
        }
    }

    let peaks = peak_hours(&today);
    let recommendations = recommend(&peaks);

    DailySummary {
        date: now.format("%Y-%m-%d").to_string(),
        total_interventions: today.len() as u64,
        by_tier,
        top_scenarios: top_scenarios(&today),
        peak_confusion_hours: peaks,
        recommendations,
    }
}

/// Top 5 scenario tags: count descending, ties broken by first-seen order.
fn top_scenarios(interventions: &[&Intervention]) -> Vec<ScenarioCount> {
    // (kind, count, first_seen_index)
    let mut counts: Vec<(String, u64, usize)> = Vec::new();

    for intervention in interventions {
        for scenario in &intervention.situation.scenarios {
            match counts.iter_mut().find(|(kind, _, _)| kind == &scenario.kind) {
                Some((_, count, _)) => *count += 1,
                None => counts.push((scenario.kind.clone(), 1, counts.len())),
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    counts
        .into_iter()
        .take(5)
        .map(|(kind, count, _)| ScenarioCount { kind, count })
        .collect()
}

/// Top 3 hour-of-day buckets by count (local time), count descending with
/// earlier hours first on ties.
fn peak_hours(interventions: &[&Intervention]) -> Vec<HourlyPeak> {
    let mut by_hour = [0u64; 24];
    for intervention in interventions {
        let hour = intervention.timestamp.with_timezone(&Local).hour() as usize;
        by_hour[hour] += 1;
    }

    let mut peaks: Vec<HourlyPeak> = by_hour
        .iter()
        .enumerate()
        .filter(|(_, &count)| count > 0)
        .map(|(hour, &count)| HourlyPeak {
            hour: hour as u32,
            count,
        })
        .collect();

    peaks.sort_by(|a, b| b.count.cmp(&a.count).then(a.hour.cmp(&b.hour)));
    peaks.truncate(3);
    peaks
}

/// Fixed recommendation rules over the peak-hour ranking.
fn recommend(peaks: &[HourlyPeak]) -> Vec<String> {
    let mut recommendations = Vec::new();

    for peak in peaks {
        if (14..=15).contains(&peak.hour) {
            recommendations.push(
                "Schedule engaging activities during 2-3 PM to reduce post-lunch confusion"
                    .to_string(),
            );
        }
        if peak.count > 3 {
            recommendations.push(format!(
                "High intervention frequency at {}:00 - consider proactive engagement 30 minutes prior",
                peak.hour
            ));
        }
    }

    recommendations
}
