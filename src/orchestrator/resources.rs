//! Orchestrator resources and their storage mapping

use crate::database::Resource;
use crate::error::{Error, Result};
use crate::pagination::SliceSource;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use duckdb::types::Type;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// ID of the target of evaluation created on first start
pub const DEFAULT_TARGET_OF_EVALUATION_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Name of the default target of evaluation
pub const DEFAULT_TARGET_OF_EVALUATION_NAME: &str = "default";

/// Current time at the precision the store keeps
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> duckdb::Error {
    duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn timestamp_at(row: &duckdb::Row<'_>, idx: usize) -> duckdb::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

// ============================================================================
// Target of Evaluation
// ============================================================================

/// What kind of thing is being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    #[default]
    Cloud,
    Product,
    Organization,
}

impl TargetType {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetType::Cloud => "cloud",
            TargetType::Product => "product",
            TargetType::Organization => "organization",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cloud" => Ok(TargetType::Cloud),
            "product" => Ok(TargetType::Product),
            "organization" => Ok(TargetType::Organization),
            other => Err(Error::invalid_argument(format!(
                "unknown target type: {other}"
            ))),
        }
    }
}

/// A cloud service, product or organization under certification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOfEvaluation {
    pub id: String,
    pub name: String,
    pub description: String,
    pub target_type: TargetType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TargetOfEvaluation {
    /// The target created when the store is empty
    pub fn default_target() -> Self {
        let ts = now();
        Self {
            id: DEFAULT_TARGET_OF_EVALUATION_ID.to_string(),
            name: DEFAULT_TARGET_OF_EVALUATION_NAME.to_string(),
            description: "The default target of evaluation".to_string(),
            target_type: TargetType::Cloud,
            created_at: ts,
            updated_at: ts,
        }
    }
}

impl Resource for TargetOfEvaluation {
    const TABLE: &'static str = "targets_of_evaluation";
    const NAME: &'static str = "target of evaluation";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "description",
        "target_type",
        "created_at",
        "updated_at",
    ];
    const ORDER_COLUMNS: &'static [&'static str] = &["id", "name", "created_at", "updated_at"];
    const DEFAULT_ORDER: &'static str = "id";
    const SCOPE_COLUMN: &'static str = "id";

    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.description.clone(),
            self.target_type.as_str().to_string(),
            format_timestamp(&self.created_at),
            format_timestamp(&self.updated_at),
        ]
    }

    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        let target_type: String = row.get(3)?;
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            target_type: target_type.parse().map_err(|e| conversion_error(3, e))?,
            created_at: timestamp_at(row, 4)?,
            updated_at: timestamp_at(row, 5)?,
        })
    }
}

/// Client supplied fields of a target of evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOfEvaluationRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_type: TargetType,
}

impl TargetOfEvaluationRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_argument("name must not be empty"));
        }
        Ok(())
    }
}

// ============================================================================
// Certificate
// ============================================================================

/// A certificate issued for a target of evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: String,
    pub name: String,
    pub target_of_evaluation_id: String,
    pub description: String,
    pub issue_date: String,
    pub expiration_date: String,
    pub standard: String,
    pub assurance_level: String,
    pub cab: String,
}

impl Resource for Certificate {
    const TABLE: &'static str = "certificates";
    const NAME: &'static str = "certificate";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "target_of_evaluation_id",
        "description",
        "issue_date",
        "expiration_date",
        "standard",
        "assurance_level",
        "cab",
    ];
    const ORDER_COLUMNS: &'static [&'static str] = &["id", "name", "issue_date", "expiration_date"];
    const DEFAULT_ORDER: &'static str = "id";
    const SCOPE_COLUMN: &'static str = "target_of_evaluation_id";

    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.target_of_evaluation_id.clone(),
            self.description.clone(),
            self.issue_date.clone(),
            self.expiration_date.clone(),
            self.standard.clone(),
            self.assurance_level.clone(),
            self.cab.clone(),
        ]
    }

    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            target_of_evaluation_id: row.get(2)?,
            description: row.get(3)?,
            issue_date: row.get(4)?,
            expiration_date: row.get(5)?,
            standard: row.get(6)?,
            assurance_level: row.get(7)?,
            cab: row.get(8)?,
        })
    }
}

/// Client supplied fields of a certificate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateRequest {
    pub name: String,
    pub description: String,
    pub issue_date: String,
    pub expiration_date: String,
    pub standard: String,
    pub assurance_level: String,
    pub cab: String,
}

impl CertificateRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_argument("name must not be empty"));
        }
        Ok(())
    }

    pub(crate) fn into_certificate(self, id: String, target_of_evaluation_id: String) -> Certificate {
        Certificate {
            id,
            name: self.name,
            target_of_evaluation_id,
            description: self.description,
            issue_date: self.issue_date,
            expiration_date: self.expiration_date,
            standard: self.standard,
            assurance_level: self.assurance_level,
            cab: self.cab,
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// A catalog of security controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Catalog {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
        }
    }
}

/// In-memory catalogs, fixed at construction
#[derive(Debug, Clone, Default)]
pub struct CatalogRegistry {
    catalogs: HashMap<String, Catalog>,
}

impl CatalogRegistry {
    /// Build a registry; later entries replace earlier ones with the same ID
    pub fn new(catalogs: impl IntoIterator<Item = Catalog>) -> Self {
        Self {
            catalogs: catalogs.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Catalog> {
        self.catalogs.get(id)
    }

    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }

    /// Sorted snapshot for pagination
    ///
    /// Orders by `id` (default) or `name`; names tie-break on `id`.
    pub fn source(&self, order_by: &str, asc: bool) -> Result<SliceSource<Catalog>> {
        let source = match order_by {
            "" | "id" => SliceSource::from_map_values(&self.catalogs, |a: &Catalog, b: &Catalog| {
                directed(a.id.cmp(&b.id), asc)
            }),
            "name" => SliceSource::from_map_values(&self.catalogs, |a: &Catalog, b: &Catalog| {
                directed(a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)), asc)
            }),
            other => return Err(Error::invalid_order_column(other)),
        };
        Ok(source)
    }
}

fn directed(ordering: std::cmp::Ordering, asc: bool) -> std::cmp::Ordering {
    if asc {
        ordering
    } else {
        ordering.reverse()
    }
}
