use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::estimate::Dimensions;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Electronics,
    Clothing,
    Books,
    Documents,
    Food,
    Furniture,
    #[default]
    Other,
}

impl ItemCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemCategory::Electronics => "electronics",
            ItemCategory::Clothing => "clothing",
            ItemCategory::Books => "books",
            ItemCategory::Documents => "documents",
            ItemCategory::Food => "food",
            ItemCategory::Furniture => "furniture",
            ItemCategory::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "electronics" => Some(ItemCategory::Electronics),
            "clothing" => Some(ItemCategory::Clothing),
            "books" => Some(ItemCategory::Books),
            "documents" => Some(ItemCategory::Documents),
            "food" => Some(ItemCategory::Food),
            "furniture" => Some(ItemCategory::Furniture),
            "other" => Some(ItemCategory::Other),
            _ => None,
        }
    }
}

/// A cargo line travelling inside a shipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: ItemCategory,
    pub weight: f64,
    pub dimensions: Option<Dimensions>,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub currency: String,
    pub fragile: bool,
    pub hazardous: bool,
    pub requires_special_handling: bool,
    pub special_handling_instructions: Option<String>,
    pub shipment_id: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub description: Option<String>,
    pub category: ItemCategory,
    pub weight: f64,
    pub dimensions: Option<Dimensions>,
    pub value: Decimal,
    pub currency: String,
    pub fragile: bool,
    pub hazardous: bool,
    pub requires_special_handling: bool,
    pub special_handling_instructions: Option<String>,
    pub shipment_id: Uuid,
}

impl Item {
    pub fn create(input: NewItem, created_by: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            category: input.category,
            weight: input.weight,
            dimensions: input.dimensions,
            value: input.value,
            currency: input.currency,
            fragile: input.fragile,
            hazardous: input.hazardous,
            requires_special_handling: input.requires_special_handling,
            special_handling_instructions: input.special_handling_instructions,
            shipment_id: input.shipment_id,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn volume(&self) -> f64 {
        self.dimensions
            .as_ref()
            .and_then(Dimensions::volume)
            .unwrap_or(0.0)
    }
}

/// Per-category totals for the cargo statistics view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub category: ItemCategory,
    pub count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
    pub average_weight: f64,
}

/// Groups items by category, ordered by category name.
pub fn summarize_by_category<'a>(items: impl IntoIterator<Item = &'a Item>) -> Vec<CategoryStats> {
    let mut stats: Vec<(CategoryStats, f64)> = Vec::new();
    for item in items {
        let index = match stats.iter().position(|(entry, _)| entry.category == item.category) {
            Some(index) => index,
            None => {
                stats.push((
                    CategoryStats {
                        category: item.category,
                        count: 0,
                        total_value: Decimal::ZERO,
                        average_weight: 0.0,
                    },
                    0.0,
                ));
                stats.len() - 1
            }
        };
        let (entry, weight_sum) = &mut stats[index];
        entry.count += 1;
        entry.total_value += item.value;
        *weight_sum += item.weight;
    }

    let mut summary: Vec<CategoryStats> = stats
        .into_iter()
        .map(|(mut entry, weight_sum)| {
            entry.average_weight = weight_sum / entry.count as f64;
            entry
        })
        .collect();
    summary.sort_by_key(|entry| entry.category.as_str());
    summary
}
