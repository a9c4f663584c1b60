//! Run configuration shared by the binaries
//! Column names of the source tables, dimension candidates and output layout

use std::path::{Path, PathBuf};

pub const CASE_KEY: &str = "CASE_KEY";
pub const ORDERED_QUANTITY: &str = "ORDERED_QUANTITY";
pub const DELIVERED_QUANTITY: &str = "DELIVERED_QUANTITY";
pub const MIN_ORDER_TOLERANCE: &str = "MIN_ORDER_TOLERANCE";
pub const MAX_ORDER_TOLERANCE: &str = "MAX_ORDER_TOLERANCE";
pub const ORDER_VALUE: &str = "ORDER_VALUE";
pub const UNIT_PRICE: &str = "UNIT_PRICE";
pub const PROMISED_DATE: &str = "PROMISED_DATE";
pub const DELIVERED_DATE: &str = "DELIVERED_DATE";

/// Numeric columns of the case table, normalized on load
pub const NUMERIC_COLUMNS: [&str; 6] = [
    ORDERED_QUANTITY,
    DELIVERED_QUANTITY,
    MIN_ORDER_TOLERANCE,
    MAX_ORDER_TOLERANCE,
    ORDER_VALUE,
    UNIT_PRICE,
];

pub const ACTIVITY: &str = "ACTIVITY_EN";
pub const EVENT_TIME: &str = "EVENTTIME";

pub const DEFAULT_TOP_N: usize = 15;
pub const DEFAULT_MIN_CASES: usize = 200;
pub const DEFAULT_REL_ERR_THRESHOLD: f64 = 0.10;
pub const DEFAULT_LABEL_COUNT: usize = 8;

/// A grouping column together with its file slug and display label
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub column: String,
    pub slug: String,
    pub label: String,
}

impl Dimension {
    pub fn new(column: &str, slug: &str, label: &str) -> Self {
        Self {
            column: column.to_string(),
            slug: slug.to_string(),
            label: label.to_string(),
        }
    }

    /// Dimension for an arbitrary column: slug is the lowercased column name
    pub fn from_column(column: &str) -> Self {
        DIMENSION_CANDIDATES
            .iter()
            .find(|(c, _, _)| *c == column)
            .map(|(c, slug, label)| Dimension::new(c, slug, label))
            .unwrap_or_else(|| Dimension::new(column, &column.to_lowercase(), column))
    }
}

/// Known business dimensions: (column, slug, label)
pub const DIMENSION_CANDIDATES: [(&str, &str, &str); 7] = [
    ("DELIVERY_COMPANY", "supplier", "Delivery Company"),
    ("FACTORY", "factory", "Factory"),
    ("PRODUCT_TYPE", "product_type", "Product Type"),
    ("FACTORY_TYPE", "factory_type", "Factory Type"),
    ("WAREHOUSE_TYPE", "warehouse_type", "Warehouse Type"),
    ("CUST_MARKET", "cust_market", "Customer Market"),
    ("CUST_COUNTRY", "cust_country", "Customer Country"),
];

/// Configuration of one OTIF run
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub case_csv: PathBuf,
    pub output_dir: PathBuf,
    pub top_n: usize,
    pub min_cases: usize,
    pub rel_err_threshold: f64,
    pub label_count: usize,
    /// Explicit grouping columns; `None` means every known candidate present in the source
    pub dimensions: Option<Vec<String>>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            case_csv: PathBuf::from("data/case_table.csv"),
            output_dir: PathBuf::from("assets/woodcorp-otif-rootcause"),
            top_n: DEFAULT_TOP_N,
            min_cases: DEFAULT_MIN_CASES,
            rel_err_threshold: DEFAULT_REL_ERR_THRESHOLD,
            label_count: DEFAULT_LABEL_COUNT,
            dimensions: None,
        }
    }
}

impl AnalysisConfig {
    pub fn tables_dir(&self) -> PathBuf {
        self.output_dir.join("tables")
    }

    pub fn flags_dir(&self) -> PathBuf {
        self.output_dir.join("flags")
    }

    /// Resolve the dimensions to aggregate by, given the source header
    pub fn resolve_dimensions(&self, headers: &[String]) -> Vec<Dimension> {
        let present = |c: &str| headers.iter().any(|h| h == c);
        match &self.dimensions {
            Some(columns) => columns
                .iter()
                .filter(|c| present(c))
                .map(|c| Dimension::from_column(c))
                .collect(),
            None => DIMENSION_CANDIDATES
                .iter()
                .filter(|(c, _, _)| present(c))
                .map(|(c, slug, label)| Dimension::new(c, slug, label))
                .collect(),
        }
    }
}

/// Configuration of one sequence-check run
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    pub event_csv: PathBuf,
    pub output_dir: PathBuf,
    pub top_n: usize,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            event_csv: PathBuf::from("data/activity_table.csv"),
            output_dir: PathBuf::from("data_checkup"),
            top_n: 10,
        }
    }
}

impl SequenceConfig {
    pub fn case_level_path(&self) -> PathBuf {
        self.output_dir.join("out_core_sequence_check_case_level.csv")
    }

    pub fn distribution_path(&self) -> PathBuf {
        self.output_dir.join("out_core_sequence_check_violation_distribution.csv")
    }

    pub fn kpi_path(&self) -> PathBuf {
        self.output_dir.join("kpi_first_violation_summary.txt")
    }
}

/// Absolute form of a path for operator-facing messages
pub fn resolved(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_candidates_filtered_by_header() {
        let config = AnalysisConfig::default();
        let dims = config.resolve_dimensions(&headers(&["CASE_KEY", "FACTORY", "CUST_COUNTRY"]));
        let slugs: Vec<&str> = dims.iter().map(|d| d.slug.as_str()).collect();
        assert_eq!(slugs, vec!["factory", "cust_country"]);
    }

    #[test]
    fn test_explicit_dimensions() {
        let config = AnalysisConfig {
            dimensions: Some(vec!["REGION".to_string(), "FACTORY".to_string(), "NOPE".to_string()]),
            ..AnalysisConfig::default()
        };
        let dims = config.resolve_dimensions(&headers(&["REGION", "FACTORY"]));
        assert_eq!(dims.len(), 2);
        assert_eq!(dims[0], Dimension::new("REGION", "region", "REGION"));
        assert_eq!(dims[1].label, "Factory");
    }
}
