// crates/dremio-module-core/src/dataset.rs
// ============================================================================
// Module: Dataset Identifiers
// Description: Asset identifiers and Dremio catalog path helpers.
// Purpose: Keep identifier parsing and catalog encodings in one place.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Datasets are addressed by `<namespace>/<asset>` identifiers. Once a bucket
//! folder is registered in Dremio it is addressed by a [`CatalogPath`], which
//! renders the catalog id and a quoted SQL reference. URL encoding of catalog
//! paths is left to the HTTP client.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::transform::quote_identifier;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while parsing dataset identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    /// Identifier is not of the form `<namespace>/<asset>`.
    #[error("invalid dataset id {0:?}: expected <namespace>/<asset>")]
    InvalidId(String),
    /// Data format is not supported.
    #[error("unsupported data format: {0}")]
    UnsupportedFormat(String),
}

// ============================================================================
// SECTION: Dataset Identifier
// ============================================================================

/// Asset identifier of the form `<namespace>/<asset>`.
///
/// # Invariants
/// - Both parts are non-empty and contain no `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetId {
    /// Namespace part.
    namespace: String,
    /// Asset part.
    asset: String,
}

impl DatasetId {
    /// Parses a dataset identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidId`] when the identifier is malformed.
    pub fn parse(raw: &str) -> Result<Self, DatasetError> {
        let mut parts = raw.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(namespace), Some(asset), None)
                if !namespace.trim().is_empty() && !asset.trim().is_empty() =>
            {
                Ok(Self {
                    namespace: namespace.to_string(),
                    asset: asset.to_string(),
                })
            }
            _ => Err(DatasetError::InvalidId(raw.to_string())),
        }
    }

    /// Returns the namespace part.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the asset part.
    #[must_use]
    pub fn asset(&self) -> &str {
        &self.asset
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.asset)
    }
}

// ============================================================================
// SECTION: Data Format
// ============================================================================

/// Storage format of a dataset folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// Apache Iceberg table.
    Iceberg,
    /// Parquet files.
    Parquet,
    /// Delta Lake table.
    Delta,
    /// JSON files.
    Json,
    /// Delimited text files.
    Csv,
}

impl DataFormat {
    /// Returns the configuration label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Iceberg => "iceberg",
            Self::Parquet => "parquet",
            Self::Delta => "delta",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    /// Returns the format type Dremio expects when promoting a folder.
    #[must_use]
    pub const fn dremio_format_type(self) -> &'static str {
        match self {
            Self::Iceberg => "Iceberg",
            Self::Parquet => "Parquet",
            Self::Delta => "Delta",
            Self::Json => "JSON",
            Self::Csv => "Text",
        }
    }
}

impl FromStr for DataFormat {
    type Err = DatasetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "iceberg" => Ok(Self::Iceberg),
            "parquet" => Ok(Self::Parquet),
            "delta" => Ok(Self::Delta),
            "json" => Ok(Self::Json),
            "csv" | "text" => Ok(Self::Csv),
            _ => Err(DatasetError::UnsupportedFormat(value.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Catalog Path
// ============================================================================

/// Ordered Dremio catalog path (`[source, folder, ..., table]`).
///
/// # Invariants
/// - Segments are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPath {
    /// Path segments, source first.
    segments: Vec<String>,
}

impl CatalogPath {
    /// Builds a path from a source name and a `/`-separated folder path.
    #[must_use]
    pub fn from_source_and_path(source: &str, path: &str) -> Self {
        let segments = std::iter::once(source)
            .chain(path.split('/'))
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            segments,
        }
    }

    /// Builds a path from explicit segments, dropping empty ones.
    #[must_use]
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments
                .into_iter()
                .map(Into::into)
                .filter(|segment: &String| !segment.is_empty())
                .collect(),
        }
    }

    /// Returns the path segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the catalog identifier (`dremio:/source/a/b`).
    #[must_use]
    pub fn catalog_id(&self) -> String {
        format!("dremio:/{}", self.segments.join("/"))
    }

    /// Returns the quoted SQL table reference (`"source"."a"."b"`).
    #[must_use]
    pub fn sql_reference(&self) -> String {
        self.segments.iter().map(|s| quote_identifier(s)).collect::<Vec<_>>().join(".")
    }
}
