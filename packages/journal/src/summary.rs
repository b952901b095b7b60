use serde::Serialize;

use crate::model::{Dataset, ProgressEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub day_id: String,
    pub title: String,
    pub exercises: usize,
    pub done: usize,
}

/// Per-day exercise counts, days in creation order.
pub fn day_summaries(dataset: &Dataset) -> Vec<DaySummary> {
    let mut days: Vec<_> = dataset.days.iter().collect();
    days.sort_by_key(|d| d.created_at);
    days.into_iter()
        .map(|day| {
            let (exercises, done) = dataset
                .exercises_of(&day.id)
                .fold((0, 0), |(n, done), e| (n + 1, done + usize::from(e.done)));
            DaySummary {
                day_id: day.id.clone(),
                title: day.title.clone(),
                exercises,
                done,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightSummary {
    pub initial: f64,
    pub current: f64,
    pub difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    /// Entries oldest first.
    pub entries: Vec<ProgressEntry>,
    /// Absent until at least one entry has a weight.
    pub weight: Option<WeightSummary>,
}

/// Progress history sorted by date with first and last recorded weight.
///
/// Dates compare as `YYYY-MM-DD` text; entries without a weight are listed
/// but do not count toward the summary.
pub fn progress_summary(dataset: &Dataset) -> ProgressSummary {
    let mut entries = dataset.progress.clone();
    entries.sort_by(|a, b| a.date.cmp(&b.date));

    let mut weights = entries.iter().filter_map(|e| e.weight.filter(|w| w.is_finite()));
    let weight = weights.next().map(|initial| {
        let current = weights.last().unwrap_or(initial);
        WeightSummary {
            initial,
            current,
            difference: current - initial,
        }
    });

    ProgressSummary { entries, weight }
}
