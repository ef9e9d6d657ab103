//! Catalog types

use serde::Serialize;

/// Role a table plays in the star schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Unconstrained landing table filled by bulk copy
    Staging,
    /// Entity table referenced by the fact table
    Dimension,
    /// Event table with references into the dimensions
    Fact,
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableKind::Staging => write!(f, "staging"),
            TableKind::Dimension => write!(f, "dimension"),
            TableKind::Fact => write!(f, "fact"),
        }
    }
}

/// Logical column type, rendered per dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Varchar,
    Integer,
    BigInt,
    /// Fixed point with the given precision and scale
    Decimal(u8, u8),
    Double,
    Timestamp,
    /// Auto-incrementing surrogate key
    Identity,
}

/// Row distribution hint (honoured by Redshift only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistStyle {
    #[default]
    Auto,
    /// Full copy on every node, for small dimensions
    All,
    Even,
}

/// Foreign key reference `table(column)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub table: &'static str,
    pub column: &'static str,
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub primary_key: bool,
    pub not_null: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Reference>,
}

impl ColumnDef {
    /// Create a nullable column without constraints
    pub fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            primary_key: false,
            not_null: false,
            references: None,
        }
    }

    /// Mark as primary key
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as NOT NULL
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Add a foreign key reference
    #[must_use]
    pub fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some(Reference { table, column });
        self
    }
}

/// Table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDef {
    pub name: &'static str,
    pub kind: TableKind,
    pub columns: Vec<ColumnDef>,
    pub dist_style: DistStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<&'static str>,
}

impl TableDef {
    /// Create a table with the default distribution
    pub fn new(name: &'static str, kind: TableKind, columns: Vec<ColumnDef>) -> Self {
        Self {
            name,
            kind,
            columns,
            dist_style: DistStyle::default(),
            sort_key: None,
        }
    }

    /// Set distribution style
    #[must_use]
    pub fn with_dist_style(mut self, dist_style: DistStyle) -> Self {
        self.dist_style = dist_style;
        self
    }

    /// Set sort key column
    #[must_use]
    pub fn with_sort_key(mut self, column: &'static str) -> Self {
        self.sort_key = Some(column);
        self
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Primary key column, if any
    pub fn primary_key(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// Tables this table references
    pub fn dependencies(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns
            .iter()
            .filter_map(|c| c.references.as_ref().map(|r| r.table))
    }
}
