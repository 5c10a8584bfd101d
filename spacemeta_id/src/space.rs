use std::{fmt::Display, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const SPACE_UID_SEPARATOR: &str = "__";

/// The kind of tenant a space represents.
///
/// The string forms are the identifiers stored in the catalog and embedded in space uids, so
/// they must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpaceType {
    /// A business, the unit of ownership in the host inventory.
    #[serde(rename = "bkcc")]
    Business,
    /// A project group, linked to at most one business and any number of container clusters.
    #[serde(rename = "bkci")]
    ProjectGroup,
    /// A SaaS application bound to its own cluster resources.
    #[serde(rename = "bksaas")]
    SaasBound,
    /// Container cluster resources. Only used as a resource type.
    #[serde(rename = "bcs")]
    Cluster,
    /// Platform scope marker for data sources visible to every space.
    #[serde(rename = "all")]
    All,
}

impl SpaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Business => "bkcc",
            Self::ProjectGroup => "bkci",
            Self::SaasBound => "bksaas",
            Self::Cluster => "bcs",
            Self::All => "all",
        }
    }
}

impl FromStr for SpaceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bkcc" => Ok(Self::Business),
            "bkci" => Ok(Self::ProjectGroup),
            "bksaas" => Ok(Self::SaasBound),
            "bcs" => Ok(Self::Cluster),
            "all" => Ok(Self::All),
            other => Err(Error::UnknownSpaceType(other.to_string())),
        }
    }
}

impl Display for SpaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a space: `(space_type, space_id)`.
///
/// Rendered as the space uid `<space_type>__<space_id>`, which is also the key under which the
/// resolved routes of the space are published.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpaceKey {
    pub space_type: SpaceType,
    pub space_id: Arc<str>,
}

impl SpaceKey {
    pub fn new(space_type: SpaceType, space_id: impl AsRef<str>) -> Self {
        Self {
            space_type,
            space_id: Arc::from(space_id.as_ref()),
        }
    }

    /// Build a key from the raw catalog identifiers, rejecting empty values.
    pub fn try_new(space_type: &str, space_id: &str) -> Result<Self> {
        if space_type.is_empty() || space_id.is_empty() {
            return Err(Error::EmptySpace);
        }
        Ok(Self::new(space_type.parse()?, space_id))
    }

    pub fn business(space_id: impl AsRef<str>) -> Self {
        Self::new(SpaceType::Business, space_id)
    }

    pub fn project(space_id: impl AsRef<str>) -> Self {
        Self::new(SpaceType::ProjectGroup, space_id)
    }

    pub fn saas(space_id: impl AsRef<str>) -> Self {
        Self::new(SpaceType::SaasBound, space_id)
    }

    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    pub fn uid(&self) -> String {
        format!(
            "{}{SPACE_UID_SEPARATOR}{}",
            self.space_type.as_str(),
            self.space_id
        )
    }
}

impl FromStr for SpaceKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (space_type, space_id) = s
            .split_once(SPACE_UID_SEPARATOR)
            .ok_or_else(|| Error::InvalidSpaceUid(s.to_string()))?;
        Self::try_new(space_type, space_id).map_err(|e| match e {
            Error::EmptySpace => Error::InvalidSpaceUid(s.to_string()),
            other => other,
        })
    }
}

impl Display for SpaceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{SPACE_UID_SEPARATOR}{}",
            self.space_type.as_str(),
            self.space_id
        )
    }
}
