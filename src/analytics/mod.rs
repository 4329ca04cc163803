//! Sales Aggregation
//!
//! Totals, group-bys and rankings over loosely typed rows. Unparseable
//! values default to zero (or the fallback month) and are kept as warnings;
//! aggregation itself never fails.

pub mod buckets;

pub use buckets::{BucketMap, BucketStats};

use crate::error::ParseError;
use crate::parse::{month_key, UNKNOWN_MONTH};
use crate::record::{RowRecord, SaleRecord, SheetCollection};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

pub const TOP_CATEGORIES: usize = 3;
pub const TOP_REGIONS: usize = 3;
pub const TOP_PRODUCTS: usize = 5;
pub const TOP_SELLERS: usize = 3;

/// Window used for the per-day averages
pub const DAYS_PER_PERIOD: f64 = 30.0;
/// Growth target used for goal projections
pub const GOAL_GROWTH: f64 = 1.2;

/// A value that could not be parsed and was defaulted
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWarning {
    /// Zero-based position of the row in the aggregated input
    pub row: usize,
    pub field: &'static str,
    pub error: ParseError,
}

#[derive(Debug, Clone, Default)]
pub struct SalesAggregation {
    pub total_records: usize,
    pub total_revenue: f64,
    pub total_quantity: i64,
    pub by_category: BucketMap,
    pub by_region: BucketMap,
    pub by_product: BucketMap,
    pub by_month: BucketMap,
    pub by_seller: BucketMap,
    pub distinct_customers: usize,
    pub first_sale: Option<NaiveDate>,
    pub last_sale: Option<NaiveDate>,
    pub warnings: Vec<FieldWarning>,
}

impl SalesAggregation {
    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }

    /// Total revenue over record count; zero with no records
    pub fn average_ticket(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            self.total_revenue / self.total_records as f64
        }
    }

    /// Percentage of total revenue; zero when total revenue is zero
    pub fn revenue_share(&self, revenue: f64) -> f64 {
        if self.total_revenue == 0.0 {
            0.0
        } else {
            revenue / self.total_revenue * 100.0
        }
    }

    pub fn top_categories(&self) -> Vec<BucketStats> {
        self.by_category.top_n(TOP_CATEGORIES)
    }

    pub fn top_regions(&self) -> Vec<BucketStats> {
        self.by_region.top_n(TOP_REGIONS)
    }

    pub fn top_products(&self, n: usize) -> Vec<BucketStats> {
        self.by_product.top_n(n)
    }

    pub fn top_sellers(&self) -> Vec<BucketStats> {
        self.by_seller.top_n(TOP_SELLERS)
    }

    /// Months with a parsed date, oldest first
    pub fn dated_months(&self) -> Vec<BucketStats> {
        self.by_month
            .sorted_by_key()
            .into_iter()
            .filter(|b| b.key != UNKNOWN_MONTH)
            .collect()
    }

    /// The last `n` dated months, oldest first
    pub fn recent_months(&self, n: usize) -> Vec<BucketStats> {
        let months = self.dated_months();
        let skip = months.len().saturating_sub(n);
        months.into_iter().skip(skip).collect()
    }

    pub fn sales_per_day(&self) -> f64 {
        self.total_records as f64 / DAYS_PER_PERIOD
    }

    pub fn revenue_per_day(&self) -> f64 {
        self.total_revenue / DAYS_PER_PERIOD
    }

    /// Average revenue per region if revenue were spread evenly; zero
    /// without regions
    pub fn revenue_per_region(&self) -> f64 {
        if self.by_region.is_empty() {
            0.0
        } else {
            self.total_revenue / self.by_region.len() as f64
        }
    }

    pub fn revenue_goal(&self) -> f64 {
        self.total_revenue * GOAL_GROWTH
    }

    pub fn sales_goal(&self) -> f64 {
        self.total_records as f64 * GOAL_GROWTH
    }

    pub fn summary(&self) -> SalesSummary {
        SalesSummary {
            total_records: self.total_records,
            total_revenue: self.total_revenue,
            total_quantity: self.total_quantity,
            average_ticket: self.average_ticket(),
            top_categories: self.top_categories(),
            top_regions: self.top_regions(),
            top_products: self.top_products(TOP_PRODUCTS),
            months: self.dated_months(),
            first_sale: self.first_sale,
            last_sale: self.last_sale,
            warnings: self.warnings.len(),
        }
    }
}

/// Serializable digest of an aggregation for the JSON endpoints
#[derive(Debug, Clone, Serialize)]
pub struct SalesSummary {
    pub total_records: usize,
    pub total_revenue: f64,
    pub total_quantity: i64,
    pub average_ticket: f64,
    pub top_categories: Vec<BucketStats>,
    pub top_regions: Vec<BucketStats>,
    pub top_products: Vec<BucketStats>,
    pub months: Vec<BucketStats>,
    pub first_sale: Option<NaiveDate>,
    pub last_sale: Option<NaiveDate>,
    pub warnings: usize,
}

/// Aggregate rows in input order
pub fn aggregate<'a, I>(records: I) -> SalesAggregation
where
    I: IntoIterator<Item = &'a RowRecord>,
{
    let mut agg = SalesAggregation::default();
    let mut customers: HashSet<String> = HashSet::new();

    for (idx, row) in records.into_iter().enumerate() {
        let sale = SaleRecord::from_row(row);

        let revenue = resolve(sale.revenue(), idx, "revenue", &mut agg.warnings, 0.0);
        let quantity = resolve(sale.quantity(), idx, "quantity", &mut agg.warnings, 0);
        let month = match sale.sale_date() {
            Ok(date) => {
                agg.first_sale = Some(agg.first_sale.map_or(date, |d| d.min(date)));
                agg.last_sale = Some(agg.last_sale.map_or(date, |d| d.max(date)));
                month_key(date)
            }
            Err(error) => {
                if error != ParseError::Empty {
                    agg.warnings.push(FieldWarning { row: idx, field: "date", error });
                }
                UNKNOWN_MONTH.to_string()
            }
        };

        agg.total_records += 1;
        agg.total_revenue += revenue;
        agg.total_quantity = agg.total_quantity.saturating_add(quantity);

        agg.by_category.record(sale.category_or_default(), revenue, quantity);
        agg.by_region.record(sale.region_or_default(), revenue, quantity);
        agg.by_product.record(sale.product_or_default(), revenue, quantity);
        agg.by_seller.record(sale.seller_or_default(), revenue, quantity);
        agg.by_month.record(&month, revenue, quantity);

        if let Some(customer) = sale.customer {
            customers.insert(customer);
        }
    }

    agg.distinct_customers = customers.len();

    if !agg.warnings.is_empty() {
        for w in &agg.warnings {
            debug!(row = w.row, field = w.field, error = %w.error, "Defaulted field");
        }
        warn!(
            warnings = agg.warnings.len(),
            records = agg.total_records,
            "Some fields could not be parsed and were defaulted"
        );
    }

    agg
}

/// Aggregate every row of a cached collection
pub fn aggregate_collection(collection: &SheetCollection) -> SalesAggregation {
    aggregate(collection.records())
}

/// Take the parsed value, or record a warning for malformed (not missing)
/// input and fall back to `default`.
fn resolve<T>(
    parsed: Result<T, ParseError>,
    row: usize,
    field: &'static str,
    warnings: &mut Vec<FieldWarning>,
    default: T,
) -> T {
    match parsed {
        Ok(value) => value,
        Err(ParseError::Empty) => default,
        Err(error) => {
            warnings.push(FieldWarning { row, field, error });
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{COL_CATEGORY, COL_CUSTOMER, COL_DATE, COL_PRODUCT, COL_QUANTITY, COL_REGION, COL_REVENUE};

    fn sale(product: &str, category: &str, region: &str, revenue: &str, date: &str) -> RowRecord {
        RowRecord::new()
            .with(COL_PRODUCT, product)
            .with(COL_CATEGORY, category)
            .with(COL_REGION, region)
            .with(COL_REVENUE, revenue)
            .with(COL_DATE, date)
            .with(COL_QUANTITY, 1i64)
    }

    #[test]
    fn test_mixed_revenue_scenario() {
        let rows = vec![
            RowRecord::new().with(COL_REVENUE, "R$ 100,00"),
            RowRecord::new().with(COL_REVENUE, "abc"),
            RowRecord::new().with(COL_REVENUE, "50"),
        ];
        let agg = aggregate(&rows);

        assert_eq!(agg.total_records, 3);
        assert_eq!(agg.total_revenue, 150.0);
        assert_eq!(agg.average_ticket(), 50.0);
        assert_eq!(agg.warnings.len(), 1);
        assert_eq!(agg.warnings[0].row, 1);
        assert_eq!(agg.warnings[0].field, "revenue");
    }

    #[test]
    fn test_empty_input_has_zero_average() {
        let agg = aggregate(&Vec::<RowRecord>::new());
        assert!(agg.is_empty());
        assert_eq!(agg.average_ticket(), 0.0);
        assert_eq!(agg.revenue_share(10.0), 0.0);
        assert_eq!(agg.revenue_per_region(), 0.0);
    }

    #[test]
    fn test_missing_dimensions_bucket_as_default() {
        let rows = vec![RowRecord::new().with(COL_REVENUE, 10.0)];
        let agg = aggregate(&rows);
        assert_eq!(agg.by_category.get("Outros").map(|b| b.count), Some(1));
        assert_eq!(agg.by_month.get(UNKNOWN_MONTH).map(|b| b.revenue), Some(10.0));
        assert!(agg.dated_months().is_empty());
        assert!(agg.warnings.is_empty());
    }

    #[test]
    fn test_group_by_and_rankings() {
        let rows = vec![
            sale("Notebook", "Eletrônicos", "Sudeste", "3000", "2025-01-10"),
            sale("Mouse", "Acessórios", "Sul", "50", "2025-01-20"),
            sale("Monitor", "Eletrônicos", "Sul", "1000", "2025-02-03"),
            sale("Cadeira", "Móveis", "Nordeste", "1000", "15/03/2025"),
            sale("Mesa", "Móveis", "Norte", "1000", "data ruim"),
        ];
        let agg = aggregate(&rows);

        let categories = agg.top_categories();
        assert_eq!(categories[0].key, "Eletrônicos");
        assert_eq!(categories[0].revenue, 4000.0);
        assert_eq!(categories[1].key, "Móveis");

        // Equal revenue: encounter order
        let products: Vec<String> = agg.top_products(5).into_iter().map(|b| b.key).collect();
        assert_eq!(products, vec!["Notebook", "Monitor", "Cadeira", "Mesa", "Mouse"]);

        let months: Vec<String> = agg.dated_months().into_iter().map(|b| b.key).collect();
        assert_eq!(months, vec!["2025-01", "2025-02", "2025-03"]);
        assert_eq!(agg.recent_months(2)[0].key, "2025-02");
        assert_eq!(agg.by_month.get(UNKNOWN_MONTH).map(|b| b.count), Some(1));

        assert_eq!(agg.first_sale, NaiveDate::from_ymd_opt(2025, 1, 10));
        assert_eq!(agg.last_sale, NaiveDate::from_ymd_opt(2025, 3, 15));
        let summary = serde_json::to_value(agg.summary()).unwrap();
        assert_eq!(summary["first_sale"], "2025-01-10");
        assert_eq!(summary["last_sale"], "2025-03-15");
        assert_eq!(agg.total_quantity, 5);
        assert!((agg.revenue_share(4000.0) - 4000.0 / 6050.0 * 100.0).abs() < 1e-9);
        assert_eq!(agg.warnings.len(), 1);
        assert_eq!(agg.warnings[0].field, "date");
    }

    #[test]
    fn test_distinct_customers() {
        let rows = vec![
            RowRecord::new().with(COL_CUSTOMER, "Ana"),
            RowRecord::new().with(COL_CUSTOMER, "Bruno"),
            RowRecord::new().with(COL_CUSTOMER, "Ana"),
            RowRecord::new(),
        ];
        assert_eq!(aggregate(&rows).distinct_customers, 2);
    }
}
