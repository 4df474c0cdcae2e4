pub mod feed;
pub mod index;
pub mod matrix;

use std::collections::HashMap;

use crate::config::WeightConfig;
use crate::models::{InteractionRow, ItemId, UserId, WeightedInteraction};

/// Clean raw feed rows into the canonical interaction table: drop rows with
/// blank identifiers, clamp counts to non-negative, default absent ratings
/// to the base value and clip to [1, 5], and pre-aggregate duplicate
/// (user, item) pairs by summing counts and averaging ratings.
pub fn normalize(rows: Vec<InteractionRow>, weights: &WeightConfig) -> Vec<InteractionRow> {
    struct Acc {
        views: f32,
        buys: f32,
        rating_sum: f32,
        rating_count: u32,
        order: usize,
    }

    let mut merged: HashMap<(UserId, ItemId), Acc> = HashMap::new();
    let mut next_order = 0usize;

    for row in rows {
        let user_id = row.user_id.trim().to_string();
        if user_id.is_empty() {
            continue;
        }

        let entry = merged.entry((user_id, row.item_id)).or_insert_with(|| {
            let acc = Acc {
                views: 0.0,
                buys: 0.0,
                rating_sum: 0.0,
                rating_count: 0,
                order: next_order,
            };
            next_order += 1;
            acc
        });
        entry.views += row.view_count.max(0.0);
        entry.buys += row.buy_count.max(0.0);
        if let Some(r) = row.rating {
            if r.is_finite() {
                entry.rating_sum += r;
                entry.rating_count += 1;
            }
        }
    }

    let mut out: Vec<(usize, InteractionRow)> = merged
        .into_iter()
        .map(|((user_id, item_id), acc)| {
            let rating = if acc.rating_count > 0 {
                acc.rating_sum / acc.rating_count as f32
            } else {
                weights.base_rating
            };
            let row = InteractionRow {
                user_id,
                item_id,
                view_count: acc.views,
                buy_count: acc.buys,
                rating: Some(rating.clamp(1.0, 5.0)),
            };
            (acc.order, row)
        })
        .collect();

    // First-seen order keeps index assignment stable across identical feeds.
    out.sort_by_key(|(order, _)| *order);
    out.into_iter().map(|(_, row)| row).collect()
}

/// Collapse each normalized row into one scalar implicit-feedback weight.
///
/// Purchases dominate (linear in quantity), views are log-damped so repeat
/// viewers cannot drown out buyers, and a clearly positive rating adds a
/// fixed bonus rather than a magnitude-scaled one. Rows with no signal are
/// dropped.
pub fn build_weights(rows: &[InteractionRow], config: &WeightConfig) -> Vec<WeightedInteraction> {
    rows.iter()
        .filter_map(|row| {
            let rating = row.rating.unwrap_or(config.base_rating);
            let rating_bonus = if rating >= config.rating_threshold {
                config.rating_bonus
            } else {
                0.0
            };
            let weight = config.view * row.view_count.ln_1p()
                + config.buy * row.buy_count
                + rating_bonus;
            (weight > 0.0).then(|| WeightedInteraction {
                user_id: row.user_id.clone(),
                item_id: row.item_id,
                weight,
            })
        })
        .collect()
}
