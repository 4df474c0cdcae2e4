use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::models::{ItemId, UserId, WeightedInteraction};

/// Dense zero-based index assignment for the distinct users and items of one
/// weighted interaction set, in first-seen order. Immutable for the lifetime
/// of the model trained against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMapping {
    user_to_index: HashMap<UserId, u32>,
    item_to_index: HashMap<ItemId, u32>,
    index_to_user: Vec<UserId>,
    index_to_item: Vec<ItemId>,
}

impl IndexMapping {
    pub fn build(interactions: &[WeightedInteraction]) -> Result<Self> {
        let mut mapping = Self {
            user_to_index: HashMap::new(),
            item_to_index: HashMap::new(),
            index_to_user: Vec::new(),
            index_to_item: Vec::new(),
        };

        for interaction in interactions {
            if !mapping.user_to_index.contains_key(&interaction.user_id) {
                mapping
                    .user_to_index
                    .insert(interaction.user_id.clone(), mapping.index_to_user.len() as u32);
                mapping.index_to_user.push(interaction.user_id.clone());
            }
            if !mapping.item_to_index.contains_key(&interaction.item_id) {
                mapping
                    .item_to_index
                    .insert(interaction.item_id, mapping.index_to_item.len() as u32);
                mapping.index_to_item.push(interaction.item_id);
            }
        }

        if mapping.index_to_user.is_empty() {
            return Err(EngineError::EmptyDataset("no users after weighting"));
        }
        if mapping.index_to_item.is_empty() {
            return Err(EngineError::EmptyDataset("no items after weighting"));
        }

        Ok(mapping)
    }

    pub fn num_users(&self) -> usize {
        self.index_to_user.len()
    }

    pub fn num_items(&self) -> usize {
        self.index_to_item.len()
    }

    pub fn user_index(&self, user_id: &str) -> Option<u32> {
        self.user_to_index.get(user_id).copied()
    }

    pub fn item_index(&self, item_id: ItemId) -> Option<u32> {
        self.item_to_index.get(&item_id).copied()
    }

    pub fn user_id(&self, index: u32) -> Option<&UserId> {
        self.index_to_user.get(index as usize)
    }

    pub fn item_id(&self, index: u32) -> Option<ItemId> {
        self.index_to_item.get(index as usize).copied()
    }

    pub fn user_ids(&self) -> &[UserId] {
        &self.index_to_user
    }

    pub fn item_ids(&self) -> &[ItemId] {
        &self.index_to_item
    }
}
