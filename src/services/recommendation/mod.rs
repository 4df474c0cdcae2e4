use std::sync::Arc;

use crate::models::{ItemId, RankedItem, TrainedModel};
use crate::utils::{cosine_similarity, top_k_indices};
use crate::EngineContext;

/// Top-N recommendations for one user, most relevant first.
///
/// Unknown users and dimension-skewed models recover to an empty list; the
/// caller supplies its own fallback for those. Items the user has already
/// interacted with are filtered explicitly and can never appear. Output is
/// deterministic: score descending, ties by ascending item index.
pub fn recommend(model: &TrainedModel, user_id: &str, n: usize) -> Vec<ItemId> {
    top_ranked(model, user_id, n)
        .into_iter()
        .map(|r| r.item_id)
        .collect()
}

/// As `recommend`, but keeping scores. Used by the batch export sink.
pub fn top_ranked(model: &TrainedModel, user_id: &str, n: usize) -> Vec<RankedItem> {
    if n == 0 || model.check_consistent().is_err() {
        return Vec::new();
    }
    let Some(u) = model.mapping.user_index(user_id) else {
        return Vec::new();
    };

    let scores: Vec<f32> = (0..model.mapping.num_items() as u32)
        .map(|i| {
            // NaN marks already-seen items; the top-k pass drops non-finite
            // scores, so seen items are structurally excluded.
            if model.interactions.user_has_item(u, i) {
                f32::NAN
            } else {
                model.factors.score(u as usize, i as usize)
            }
        })
        .collect();

    top_k_indices(&scores, n)
        .into_iter()
        .filter_map(|i| {
            let item_id = model.mapping.item_id(i as u32)?;
            Some(RankedItem {
                item_id,
                score: scores[i],
            })
        })
        .collect()
}

/// Top-N items most similar to `item_id` by cosine proximity of latent
/// vectors, excluding the item itself. Unknown items recover to empty;
/// indices that no longer map back to an external id are silently dropped.
pub fn similar(model: &TrainedModel, item_id: ItemId, n: usize) -> Vec<ItemId> {
    if n == 0 || model.check_consistent().is_err() {
        return Vec::new();
    }
    let Some(query_index) = model.mapping.item_index(item_id) else {
        return Vec::new();
    };
    let query = &model.factors.item_factors[query_index as usize];

    let scores: Vec<f32> = model
        .factors
        .item_factors
        .iter()
        .enumerate()
        .map(|(j, factors)| {
            if j == query_index as usize {
                f32::NAN
            } else {
                cosine_similarity(query, factors)
            }
        })
        .collect();

    top_k_indices(&scores, n)
        .into_iter()
        .filter_map(|j| model.mapping.item_id(j as u32))
        .collect()
}

/// Serving facade over an [`EngineContext`]: always answers with a
/// (possibly empty) list, never an error, and falls back to a
/// caller-supplied popularity list for guests.
pub struct RecommendationService {
    context: Arc<EngineContext>,
    fallback: Vec<ItemId>,
}

impl RecommendationService {
    pub fn new(context: Arc<EngineContext>) -> Self {
        Self {
            context,
            fallback: Vec::new(),
        }
    }

    /// Static popularity list served to guests and, if non-empty, to users
    /// the current mapping does not know.
    pub fn with_fallback(mut self, fallback: Vec<ItemId>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn recommend(&self, user_id: &str, n: usize) -> Vec<ItemId> {
        let Some(model) = self.context.current() else {
            return self.guest(n);
        };
        // The fallback is for users the mapping does not know. A known user
        // with nothing left unseen gets an empty list, never items from the
        // popularity list they may already have interacted with.
        if model.mapping.user_index(user_id).is_none() {
            return self.guest(n);
        }
        recommend(&model, user_id, n)
    }

    pub fn similar(&self, item_id: ItemId, n: usize) -> Vec<ItemId> {
        match self.context.current() {
            Some(model) => similar(&model, item_id, n),
            None => Vec::new(),
        }
    }

    /// The guest path: no known user, just the fallback list.
    pub fn guest(&self, n: usize) -> Vec<ItemId> {
        self.fallback.iter().take(n).copied().collect()
    }
}
