//! Attribute identity: the `cs/domain/family/member/attr` 5-tuple and the
//! fixed set of per-type data tables it can resolve to.

use crate::error::ArchiveError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The storage table variant selected by an attribute's value kind and
/// read/write semantics, mirroring `HDBPP_DATA_TYPES` in the original HDB++
/// viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    ScalarDevBooleanRo,
    ScalarDevBooleanRw,
    ScalarDevDoubleRo,
    ScalarDevDoubleRw,
    ScalarDevEncodedRo,
    ScalarDevEncodedRw,
    ScalarDevFloatRo,
    ScalarDevFloatRw,
    ScalarDevLong64Ro,
    ScalarDevLong64Rw,
    ScalarDevLongRo,
    ScalarDevLongRw,
    ScalarDevShortRo,
    ScalarDevShortRw,
    ScalarDevStateRo,
    ScalarDevStateRw,
    ScalarDevStringRo,
    ScalarDevStringRw,
    ScalarDevUCharRo,
    ScalarDevUCharRw,
    ScalarDevULong64Ro,
    ScalarDevULong64Rw,
    ScalarDevULongRo,
    ScalarDevULongRw,
    ScalarDevUShortRo,
    ScalarDevUShortRw,
}

impl DataType {
    /// All data types the registry tries to prepare statements for, in the
    /// same order as the original `HDBPP_DATA_TYPES` list.
    pub const ALL: [DataType; 26] = [
        DataType::ScalarDevBooleanRo,
        DataType::ScalarDevBooleanRw,
        DataType::ScalarDevDoubleRo,
        DataType::ScalarDevDoubleRw,
        DataType::ScalarDevEncodedRo,
        DataType::ScalarDevEncodedRw,
        DataType::ScalarDevFloatRo,
        DataType::ScalarDevFloatRw,
        DataType::ScalarDevLong64Ro,
        DataType::ScalarDevLong64Rw,
        DataType::ScalarDevLongRo,
        DataType::ScalarDevLongRw,
        DataType::ScalarDevShortRo,
        DataType::ScalarDevShortRw,
        DataType::ScalarDevStateRo,
        DataType::ScalarDevStateRw,
        DataType::ScalarDevStringRo,
        DataType::ScalarDevStringRw,
        DataType::ScalarDevUCharRo,
        DataType::ScalarDevUCharRw,
        DataType::ScalarDevULong64Ro,
        DataType::ScalarDevULong64Rw,
        DataType::ScalarDevULongRo,
        DataType::ScalarDevULongRw,
        DataType::ScalarDevUShortRo,
        DataType::ScalarDevUShortRw,
    ];

    /// Parse a data type from its table name, e.g. `scalar_devdouble_ro`.
    pub fn from_table_name(name: &str) -> Option<DataType> {
        DataType::ALL.into_iter().find(|dt| dt.table_name() == name)
    }

    /// The table name this data type reads from, e.g. `scalar_devdouble_ro`.
    pub fn table_name(&self) -> &'static str {
        match self {
            DataType::ScalarDevBooleanRo => "scalar_devboolean_ro",
            DataType::ScalarDevBooleanRw => "scalar_devboolean_rw",
            DataType::ScalarDevDoubleRo => "scalar_devdouble_ro",
            DataType::ScalarDevDoubleRw => "scalar_devdouble_rw",
            DataType::ScalarDevEncodedRo => "scalar_devencoded_ro",
            DataType::ScalarDevEncodedRw => "scalar_devencoded_rw",
            DataType::ScalarDevFloatRo => "scalar_devfloat_ro",
            DataType::ScalarDevFloatRw => "scalar_devfloat_rw",
            DataType::ScalarDevLong64Ro => "scalar_devlong64_ro",
            DataType::ScalarDevLong64Rw => "scalar_devlong64_rw",
            DataType::ScalarDevLongRo => "scalar_devlong_ro",
            DataType::ScalarDevLongRw => "scalar_devlong_rw",
            DataType::ScalarDevShortRo => "scalar_devshort_ro",
            DataType::ScalarDevShortRw => "scalar_devshort_rw",
            DataType::ScalarDevStateRo => "scalar_devstate_ro",
            DataType::ScalarDevStateRw => "scalar_devstate_rw",
            DataType::ScalarDevStringRo => "scalar_devstring_ro",
            DataType::ScalarDevStringRw => "scalar_devstring_rw",
            DataType::ScalarDevUCharRo => "scalar_devuchar_ro",
            DataType::ScalarDevUCharRw => "scalar_devuchar_rw",
            DataType::ScalarDevULong64Ro => "scalar_devulong64_ro",
            DataType::ScalarDevULong64Rw => "scalar_devulong64_rw",
            DataType::ScalarDevULongRo => "scalar_devulong_ro",
            DataType::ScalarDevULongRw => "scalar_devulong_rw",
            DataType::ScalarDevUShortRo => "scalar_devushort_ro",
            DataType::ScalarDevUShortRw => "scalar_devushort_rw",
        }
    }
}

/// A parsed, validated `cs/domain/family/member/attr` attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeName {
    pub control_system: String,
    pub domain: String,
    pub family: String,
    pub member: String,
    pub attr: String,
}

impl AttributeName {
    /// The `domain/family/member/attr` tail, as used for attribute listings.
    pub fn name(&self) -> String {
        format!("{}/{}/{}/{}", self.domain, self.family, self.member, self.attr)
    }

    pub fn full(&self) -> String {
        format!("{}/{}", self.control_system, self.name())
    }
}

/// Split a fully-qualified attribute name into `(control_system, name)` by
/// splitting on the last four `/`.
pub fn split_attr(full: &str) -> Result<AttributeName, ArchiveError> {
    let parts: Vec<&str> = full.rsplitn(5, '/').collect();
    if parts.len() != 5 {
        return Err(ArchiveError::NotFound {
            attribute: full.to_string(),
        });
    }
    // rsplitn yields parts in reverse order: attr, member, family, domain, cs
    Ok(AttributeName {
        control_system: parts[4].to_string(),
        domain: parts[3].to_string(),
        family: parts[2].to_string(),
        member: parts[1].to_string(),
        attr: parts[0].to_string(),
    })
}

/// The resolved configuration for one attribute: its opaque id and data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeConfig {
    pub id: Uuid,
    pub data_type: DataType,
}
