use serde::{Deserialize, Serialize};

use crate::dataset::index::IndexMapping;
use crate::models::WeightedInteraction;

/// Sparse user × item weight matrix in compressed row form. Built once per
/// training run from the pre-aggregated weighted set, so no coordinate
/// appears twice. Rows double as the per-user seen-item filter at serving
/// time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionMatrix {
    num_items: usize,
    row_offsets: Vec<usize>,
    item_indices: Vec<u32>,
    weights: Vec<f32>,
}

impl InteractionMatrix {
    pub fn build(interactions: &[WeightedInteraction], mapping: &IndexMapping) -> Self {
        let num_users = mapping.num_users();
        let mut rows: Vec<Vec<(u32, f32)>> = vec![Vec::new(); num_users];

        for interaction in interactions {
            // Mapping was built from this same set, so both lookups hit.
            let (Some(u), Some(i)) = (
                mapping.user_index(&interaction.user_id),
                mapping.item_index(interaction.item_id),
            ) else {
                continue;
            };
            rows[u as usize].push((i, interaction.weight));
        }

        let mut row_offsets = Vec::with_capacity(num_users + 1);
        let mut item_indices = Vec::with_capacity(interactions.len());
        let mut weights = Vec::with_capacity(interactions.len());

        row_offsets.push(0);
        for mut row in rows {
            row.sort_unstable_by_key(|(i, _)| *i);
            for (i, w) in row {
                item_indices.push(i);
                weights.push(w);
            }
            row_offsets.push(item_indices.len());
        }

        Self {
            num_items: mapping.num_items(),
            row_offsets,
            item_indices,
            weights,
        }
    }

    pub fn num_users(&self) -> usize {
        self.row_offsets.len() - 1
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    pub fn nnz(&self) -> usize {
        self.item_indices.len()
    }

    /// The (item_index, weight) entries of one user's row.
    pub fn user_row(&self, user: u32) -> impl Iterator<Item = (u32, f32)> + '_ {
        let start = self.row_offsets[user as usize];
        let end = self.row_offsets[user as usize + 1];
        self.item_indices[start..end]
            .iter()
            .copied()
            .zip(self.weights[start..end].iter().copied())
    }

    pub fn user_has_item(&self, user: u32, item: u32) -> bool {
        let start = self.row_offsets[user as usize];
        let end = self.row_offsets[user as usize + 1];
        self.item_indices[start..end].binary_search(&item).is_ok()
    }

    /// All (user_index, item_index, weight) triples in row order.
    pub fn triples(&self) -> Vec<(u32, u32, f32)> {
        let mut out = Vec::with_capacity(self.nnz());
        for u in 0..self.num_users() as u32 {
            for (i, w) in self.user_row(u) {
                out.push((u, i, w));
            }
        }
        out
    }

    /// Transposed view: for each item, its (user_index, weight) entries.
    /// Used by the ALS item-side solves.
    pub fn transposed_rows(&self) -> Vec<Vec<(u32, f32)>> {
        let mut cols: Vec<Vec<(u32, f32)>> = vec![Vec::new(); self.num_items];
        for u in 0..self.num_users() as u32 {
            for (i, w) in self.user_row(u) {
                cols[i as usize].push((u, w));
            }
        }
        cols
    }
}
