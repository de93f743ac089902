//! Column definitions shared by table and column operations.

use serde::Serialize;
use sqlshift_core::Value;

/// A provider-independent column type.
///
/// Each renderer maps these onto its own type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnType {
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    BigInt,
    /// Boolean.
    Bool,
    /// Exact decimal.
    Decimal {
        /// Total number of digits.
        precision: u8,
        /// Digits after the decimal point.
        scale: u8,
    },
    /// Single-precision float.
    Float,
    /// Double-precision float.
    Double,
    /// Variable-length string with an optional maximum length.
    String {
        /// Maximum length in characters.
        max_length: Option<u32>,
    },
    /// Unbounded text.
    Text,
    /// Binary data with an optional maximum length.
    Binary {
        /// Maximum length in bytes.
        max_length: Option<u32>,
    },
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Timestamp without time zone.
    DateTime,
    /// Timestamp with time zone.
    DateTimeTz,
    /// UUID.
    Uuid,
    /// JSON document.
    Json,
}

/// What happens to dependent rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    /// Fail at the end of the statement.
    #[default]
    NoAction,
    /// Fail immediately.
    Restrict,
    /// Delete the dependent rows too.
    Cascade,
    /// Set the referencing columns to NULL.
    SetNull,
    /// Set the referencing columns to their defaults.
    SetDefault,
}

impl ReferentialAction {
    /// Returns the SQL keyword(s) for this action.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// The definition of one column.
///
/// Columns are nullable unless [`not_null`](Self::not_null) is called. A
/// column may carry a literal default ([`default_value`](Self::default_value))
/// or a raw SQL default expression ([`default_sql`](Self::default_sql)); the
/// last one set wins.
///
/// # Examples
///
/// ```
/// use sqlshift_migrations::operations::{ColumnModel, ColumnType};
///
/// let email = ColumnModel::new("email", ColumnType::String { max_length: Some(254) })
///     .not_null();
/// assert_eq!(email.name(), "email");
/// assert!(!email.is_nullable());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnModel {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_sql: Option<String>,
    identity: bool,
}

impl ColumnModel {
    /// Creates a nullable column with no default.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: None,
            default_sql: None,
            identity: false,
        }
    }

    /// Marks the column `NOT NULL`.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets a literal default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.default_sql = None;
        self
    }

    /// Sets a raw SQL default expression, such as `CURRENT_TIMESTAMP`.
    #[must_use]
    pub fn default_sql(mut self, expression: impl Into<String>) -> Self {
        self.default_sql = Some(expression.into());
        self.default = None;
        self
    }

    /// Marks the column as database-generated (auto-increment / identity).
    /// Identity columns are always `NOT NULL`.
    #[must_use]
    pub const fn identity(mut self) -> Self {
        self.identity = true;
        self.nullable = false;
        self
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column type.
    pub const fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Returns whether the column accepts NULL.
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns the literal default, if any.
    pub const fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns the SQL default expression, if any.
    pub fn default_expression(&self) -> Option<&str> {
        self.default_sql.as_deref()
    }

    /// Returns whether the column is database-generated.
    pub const fn is_identity(&self) -> bool {
        self.identity
    }
}
