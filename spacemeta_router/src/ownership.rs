//! Relationship between a space and a data source.

use hashbrown::HashSet;
use spacemeta_catalog::model::DataSource;
use spacemeta_id::{DataId, SpaceKey};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ownership {
    /// The data source was created by the requesting space.
    pub owned_by_space: bool,
    /// The data source is shared by the platform.
    pub is_platform: bool,
    /// The requesting space holds a grant on the data source that does not stem from a
    /// cross-space authorization.
    pub explicit_grant: bool,
}

/// `explicit_grants` holds the non-authorization grants of `space`.
pub fn analyze(
    space: &SpaceKey,
    data_source: &DataSource,
    explicit_grants: &HashSet<DataId>,
) -> Ownership {
    Ownership {
        owned_by_space: data_source.space_uid.as_ref() == Some(space),
        is_platform: data_source.is_platform_data_id,
        explicit_grant: explicit_grants.contains(&data_source.data_id),
    }
}

#[cfg(test)]
mod tests {
    use spacemeta_catalog::model::EtlConfig;

    use super::*;

    #[test]
    fn owned_platform_granted() {
        let space = SpaceKey::business("2");
        let ds = DataSource {
            space_uid: Some(space.clone()),
            is_platform_data_id: true,
            ..DataSource::new(DataId::new(50010), EtlConfig::StandardV2TimeSeries)
        };

        let grants = HashSet::from([DataId::new(50010)]);
        assert_eq!(
            analyze(&space, &ds, &grants),
            Ownership {
                owned_by_space: true,
                is_platform: true,
                explicit_grant: true,
            }
        );
        assert_eq!(
            analyze(&SpaceKey::business("3"), &ds, &HashSet::new()),
            Ownership {
                owned_by_space: false,
                is_platform: true,
                explicit_grant: false,
            }
        );
    }
}
