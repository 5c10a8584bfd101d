use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

mod space;
pub use space::{SpaceKey, SpaceType};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("space type [{0}] not found")]
    UnknownSpaceType(String),

    #[error("invalid space uid [{0}], expected `<space_type>__<space_id>`")]
    InvalidSpaceUid(String),

    #[error("space type and space id can not be empty")]
    EmptySpace,

    #[error("invalid data id [{0}]")]
    InvalidDataId(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Identifier of an ingestion pipeline instance (a data source).
#[derive(Debug, Copy, Clone, Eq, PartialOrd, Ord, PartialEq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct DataId(u32);

impl DataId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for DataId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl FromStr for DataId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|_| Error::InvalidDataId(s.to_string()))
    }
}

impl Display for DataId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Eq, PartialOrd, Ord, PartialEq, Serialize, Deserialize, Hash)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(id: impl AsRef<str>) -> Self {
                Self(Arc::from(id.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(Arc::from(value))
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(Arc::from(value))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a result table, e.g. `system.cpu_summary`.
    TableId
);

string_id!(
    /// Identifier of a registered container cluster, e.g. `BCS-K8S-00000`.
    ClusterId
);

impl TableId {
    /// Result tables are addressed as `<database>.<measurement>`; anything else is a legacy or
    /// malformed identifier that the query layer can not route to.
    pub fn is_qualified(&self) -> bool {
        self.0.contains('.')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_id_parse() {
        assert_eq!(DataId::new(1001), "1001".parse().unwrap());
        assert_eq!(DataId::new(7), " 7 ".parse().unwrap());
        assert!(matches!(
            "abc".parse::<DataId>(),
            Err(Error::InvalidDataId(s)) if s == "abc"
        ));
    }

    #[test]
    fn string_ids_serialize_transparently() {
        let table = TableId::from("system.cpu_summary");
        assert_eq!(
            serde_json::to_string(&table).unwrap(),
            r#""system.cpu_summary""#
        );
        let cluster: ClusterId = serde_json::from_str(r#""BCS-K8S-00000""#).unwrap();
        assert_eq!(cluster.as_str(), "BCS-K8S-00000");
        assert_eq!(serde_json::to_string(&DataId::new(50010)).unwrap(), "50010");
    }

    #[test]
    fn qualified_table_ids() {
        assert!(TableId::from("system.cpu_summary").is_qualified());
        assert!(TableId::from("2_bkmonitor_time_series_1573194.__default__").is_qualified());
        assert!(!TableId::from("cpu_summary").is_qualified());
    }
}
