//! Drawing statistics (`GET /api/v1/stats`)

use super::Arcana;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_readings: u64,
    pub total_cards_drawn: u64,
    pub arcana_stats: Vec<ArcanaStats>,
    pub never_drawn: Vec<Arcana>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcanaStats {
    pub arcana: Arcana,
    pub drawn_flipped_count: u64,
    pub drawn_count: u64,
    pub total_count: u64,
    pub percent_flipped: f64,
    pub percent_drawn: f64,
    pub percent_total: f64,
}

impl Stats {
    /// Most drawn cards first, ties broken by deck order
    pub fn top_drawn(&self, limit: usize) -> Vec<&ArcanaStats> {
        let order = Arcana::all();
        let position = |a: &Arcana| order.iter().position(|o| o == a).unwrap_or(usize::MAX);

        let mut sorted: Vec<&ArcanaStats> = self.arcana_stats.iter().collect();
        sorted.sort_by(|a, b| {
            b.drawn_count
                .cmp(&a.drawn_count)
                .then_with(|| position(&a.arcana).cmp(&position(&b.arcana)))
        });
        sorted.truncate(limit);
        sorted
    }
}
