// ABOUTME: Partition and region metadata deciding where a service family is offered.
// ABOUTME: StaticRegionCatalog ships the partition tables; unknown regions are errors.

use crate::manifest::ServiceFamily;
use std::collections::HashSet;

/// Errors from region lookups.
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("unknown region: {0}")]
    UnknownRegion(String),
}

/// Answers whether a service family is offered in a region.
pub trait RegionCatalog: Send + Sync {
    fn is_available_in_region(
        &self,
        family: ServiceFamily,
        region: &str,
    ) -> Result<bool, RegionError>;
}

const AWS_REGIONS: &[&str] = &[
    "af-south-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ca-central-1",
    "ca-west-1",
    "eu-central-1",
    "eu-central-2",
    "eu-north-1",
    "eu-south-1",
    "eu-south-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "il-central-1",
    "me-central-1",
    "me-south-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
];

const AWS_CN_REGIONS: &[&str] = &["cn-north-1", "cn-northwest-1"];

const AWS_US_GOV_REGIONS: &[&str] = &["us-gov-east-1", "us-gov-west-1"];

/// A partition and the regions it contains.
#[derive(Debug, Clone)]
pub struct Partition {
    pub id: &'static str,
    pub regions: &'static [&'static str],
}

/// Region catalog backed by built-in partition tables.
#[derive(Debug, Clone)]
pub struct StaticRegionCatalog {
    partitions: Vec<Partition>,
    unavailable: HashSet<(&'static str, String)>,
}

impl Default for StaticRegionCatalog {
    fn default() -> Self {
        Self {
            partitions: vec![
                Partition {
                    id: "aws",
                    regions: AWS_REGIONS,
                },
                Partition {
                    id: "aws-cn",
                    regions: AWS_CN_REGIONS,
                },
                Partition {
                    id: "aws-us-gov",
                    regions: AWS_US_GOV_REGIONS,
                },
            ],
            unavailable: HashSet::new(),
        }
    }
}

impl StaticRegionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a service family as not offered in a region.
    pub fn without(mut self, family: ServiceFamily, region: impl Into<String>) -> Self {
        self.unavailable
            .insert((family.endpoints_id(), region.into()));
        self
    }

    /// The partition containing `region`.
    pub fn partition_of(&self, region: &str) -> Option<&Partition> {
        self.partitions
            .iter()
            .find(|partition| partition.regions.contains(&region))
    }
}

impl RegionCatalog for StaticRegionCatalog {
    fn is_available_in_region(
        &self,
        family: ServiceFamily,
        region: &str,
    ) -> Result<bool, RegionError> {
        if self.partition_of(region).is_none() {
            return Err(RegionError::UnknownRegion(region.to_string()));
        }
        Ok(!self
            .unavailable
            .contains(&(family.endpoints_id(), region.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_regions_resolve_to_partitions() {
        let catalog = StaticRegionCatalog::new();
        assert_eq!(catalog.partition_of("us-west-2").unwrap().id, "aws");
        assert_eq!(catalog.partition_of("cn-north-1").unwrap().id, "aws-cn");
        assert_eq!(
            catalog.partition_of("us-gov-west-1").unwrap().id,
            "aws-us-gov"
        );
    }

    #[test]
    fn unknown_region_is_an_error() {
        let catalog = StaticRegionCatalog::new();
        assert!(matches!(
            catalog.is_available_in_region(ServiceFamily::Ecs, "moon-east-1"),
            Err(RegionError::UnknownRegion(_))
        ));
    }

    #[test]
    fn exclusions_apply_per_family() {
        let catalog =
            StaticRegionCatalog::new().without(ServiceFamily::StepFunctions, "il-central-1");
        assert!(
            !catalog
                .is_available_in_region(ServiceFamily::StepFunctions, "il-central-1")
                .unwrap()
        );
        assert!(
            catalog
                .is_available_in_region(ServiceFamily::Ecs, "il-central-1")
                .unwrap()
        );
    }
}
