use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;

use super::file::FileStatus;
use super::product::ExtractedProduct;

/// Totals shown for a processed file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Default)]
pub struct ProcessingSummary {
    pub total_products: usize,
    pub unique_categories: usize,
    pub unique_brands: usize,
}

impl ProcessingSummary {
    pub fn from_products(products: &[ExtractedProduct]) -> Self {
        let categories: HashSet<&str> = products.iter().map(|p| p.category.as_str()).collect();
        let brands: HashSet<&str> = products.iter().map(|p| p.brand.as_str()).collect();
        Self {
            total_products: products.len(),
            unique_categories: categories.len(),
            unique_brands: brands.len(),
        }
    }
}

/// Count of tracked files per status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Default)]
pub struct RegistrySummary {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub done: usize,
    pub error: usize,
}

impl RegistrySummary {
    pub fn record(&mut self, status: FileStatus) {
        self.total += 1;
        match status {
            FileStatus::Pending => self.pending += 1,
            FileStatus::Processing => self.processing += 1,
            FileStatus::Done => self.done += 1,
            FileStatus::Error => self.error += 1,
        }
    }
}

impl FromIterator<FileStatus> for RegistrySummary {
    fn from_iter<I: IntoIterator<Item = FileStatus>>(iter: I) -> Self {
        let mut summary = RegistrySummary::default();
        for status in iter {
            summary.record(status);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(brand: &str, category: &str) -> ExtractedProduct {
        ExtractedProduct {
            provider_code: "P1".to_string(),
            product_code: "1".to_string(),
            description: "Item".to_string(),
            brand: brand.to_string(),
            category: category.to_string(),
            discount_description: String::new(),
            minimum_purchase_quantity: None,
            offer_conditions: None,
        }
    }

    #[test]
    fn test_counts_unique_brands_and_categories() {
        let products = vec![
            product("Dove", "Hygiene"),
            product("Dove", "Hair"),
            product("Veet", "Hygiene"),
        ];
        let summary = ProcessingSummary::from_products(&products);
        assert_eq!(summary.total_products, 3);
        assert_eq!(summary.unique_brands, 2);
        assert_eq!(summary.unique_categories, 2);
    }

    #[test]
    fn test_registry_summary_collects_statuses() {
        let summary: RegistrySummary = [
            FileStatus::Pending,
            FileStatus::Pending,
            FileStatus::Done,
            FileStatus::Error,
        ]
        .into_iter()
        .collect();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.pending, 2);
        assert_eq!(summary.processing, 0);
        assert_eq!(summary.done, 1);
        assert_eq!(summary.error, 1);
    }
}
