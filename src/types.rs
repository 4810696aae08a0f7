use std::collections::HashSet;

use serde::Serialize;

use crate::constants::{CUSTOMER_ID_COLUMN, QUANTITY_COLUMN, REVENUE_COLUMN, UNIT_PRICE_COLUMN};
use crate::error::{CleanerError, Result};

/// What a source column means to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnRole {
    Quantity,
    UnitPrice,
    CustomerId,
    /// Carried through untouched; the index points into `Transaction::fields`
    Passthrough(usize),
}

/// Source header in original order, each column tagged with its role
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<(String, ColumnRole)>,
    passthrough_count: usize,
    has_customer_id: bool,
}

impl Schema {
    /// Build a schema from a header row.
    ///
    /// `Quantity` and `UnitPrice` are required. A repeated name only takes
    /// its role the first time; later copies are passthrough columns.
    pub fn from_header<S: AsRef<str>>(header: &[S]) -> Result<Self> {
        let mut columns = Vec::with_capacity(header.len());
        let mut passthrough_count = 0;
        let (mut has_quantity, mut has_price, mut has_customer_id) = (false, false, false);

        for name in header {
            let name = name.as_ref().trim().to_string();
            let role = match name.as_str() {
                QUANTITY_COLUMN if !has_quantity => {
                    has_quantity = true;
                    ColumnRole::Quantity
                }
                UNIT_PRICE_COLUMN if !has_price => {
                    has_price = true;
                    ColumnRole::UnitPrice
                }
                CUSTOMER_ID_COLUMN if !has_customer_id => {
                    has_customer_id = true;
                    ColumnRole::CustomerId
                }
                _ => {
                    passthrough_count += 1;
                    ColumnRole::Passthrough(passthrough_count - 1)
                }
            };
            columns.push((name, role));
        }

        if !has_quantity {
            return Err(CleanerError::MissingColumn(QUANTITY_COLUMN.to_string()));
        }
        if !has_price {
            return Err(CleanerError::MissingColumn(UNIT_PRICE_COLUMN.to_string()));
        }

        Ok(Self {
            columns,
            passthrough_count,
            has_customer_id,
        })
    }

    pub fn columns(&self) -> &[(String, ColumnRole)] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn passthrough_count(&self) -> usize {
        self.passthrough_count
    }

    pub fn has_customer_id(&self) -> bool {
        self.has_customer_id
    }

    /// Header written by the persister: source columns, then `Revenue`
    pub fn output_headers(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|(name, _)| name.clone())
            .chain(std::iter::once(REVENUE_COLUMN.to_string()))
            .collect()
    }
}

/// A single retail transaction row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transaction {
    pub quantity: Option<i32>,
    pub unit_price: Option<f32>,
    pub customer_id: Option<f64>,
    /// Passthrough cells in source order
    pub fields: Vec<String>,
    pub revenue: Option<f64>,
}

impl Transaction {
    pub fn new(quantity: Option<i32>, unit_price: Option<f32>) -> Self {
        Self {
            quantity,
            unit_price,
            ..Self::default()
        }
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_customer_id(mut self, customer_id: Option<f64>) -> Self {
        self.customer_id = customer_id;
        self
    }

    /// Quantity at least one and price at least zero (or above zero when
    /// `require_positive_price`). Missing values are never valid.
    pub fn is_valid(&self, require_positive_price: bool) -> bool {
        match (self.quantity, self.unit_price) {
            (Some(quantity), Some(price)) => {
                quantity >= 1 && if require_positive_price { price > 0.0 } else { price >= 0.0 }
            }
            _ => false,
        }
    }

    pub(crate) fn row_key(&self) -> RowKey<'_> {
        RowKey {
            quantity: self.quantity,
            unit_price: self.unit_price.map(|v| float_bits(f64::from(v))),
            customer_id: self.customer_id.map(float_bits),
            revenue: self.revenue.map(float_bits),
            fields: &self.fields,
        }
    }
}

/// Hashable view of a full row; floats compare by bit pattern
#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) struct RowKey<'a> {
    quantity: Option<i32>,
    unit_price: Option<u64>,
    customer_id: Option<u64>,
    revenue: Option<u64>,
    fields: &'a [String],
}

fn float_bits(value: f64) -> u64 {
    // Fold -0.0 into 0.0 so the two compare equal
    if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

/// Immutable snapshot of the dataset at one pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub struct RecordCollection {
    schema: Schema,
    records: Vec<Transaction>,
    has_revenue: bool,
}

impl RecordCollection {
    pub fn new(schema: Schema, records: Vec<Transaction>) -> Self {
        Self {
            schema,
            records,
            has_revenue: false,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Transaction] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the revenue stage has produced the `Revenue` column
    pub fn has_revenue(&self) -> bool {
        self.has_revenue
    }

    /// (rows, columns), counting `Revenue` once it exists
    pub fn shape(&self) -> (usize, usize) {
        let cols = self.schema.column_count() + usize::from(self.has_revenue);
        (self.records.len(), cols)
    }

    /// Next snapshot with the same schema, records rebuilt by `f`
    pub fn map_records<F>(self, f: F) -> Self
    where
        F: FnOnce(Vec<Transaction>) -> Vec<Transaction>,
    {
        Self {
            records: f(self.records),
            ..self
        }
    }

    /// Next snapshot keeping only the records matching `keep`
    pub fn filter<P>(self, mut keep: P) -> Self
    where
        P: FnMut(&Transaction) -> bool,
    {
        self.map_records(|records| records.into_iter().filter(|r| keep(r)).collect())
    }

    /// Same snapshot, now exposing the derived `Revenue` column
    pub(crate) fn with_revenue_column(self) -> Self {
        Self {
            has_revenue: true,
            ..self
        }
    }

    /// Rows that repeat an earlier row
    pub fn duplicate_count(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.records.len());
        self.records
            .iter()
            .filter(|record| !seen.insert(record.row_key()))
            .count()
    }
}
