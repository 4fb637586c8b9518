//! Genesys Cloud region parsing and host resolution
//!
//! Regions are identified by their AWS-style name (e.g. `us-east-1`) and map
//! to a login host (token endpoint) and an API host.

use std::fmt;
use std::str::FromStr;

/// A Genesys Cloud deployment region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// US East (Virginia) - mypurecloud.com
    UsEast1,
    /// US West (Oregon) - usw2.pure.cloud
    UsWest2,
    /// Canada (Central) - cac1.pure.cloud
    CaCentral1,
    /// EU (Ireland) - mypurecloud.ie
    EuWest1,
    /// EU (London) - euw2.pure.cloud
    EuWest2,
    /// EU (Frankfurt) - mypurecloud.de
    EuCentral1,
    /// Asia Pacific (Sydney) - mypurecloud.com.au
    ApSoutheast2,
    /// Asia Pacific (Tokyo) - mypurecloud.jp
    ApNortheast1,
    /// Asia Pacific (Seoul) - apne2.pure.cloud
    ApNortheast2,
}

impl Region {
    /// Base domain for this region (e.g. "mypurecloud.com")
    pub fn domain(&self) -> &'static str {
        match self {
            Region::UsEast1 => "mypurecloud.com",
            Region::UsWest2 => "usw2.pure.cloud",
            Region::CaCentral1 => "cac1.pure.cloud",
            Region::EuWest1 => "mypurecloud.ie",
            Region::EuWest2 => "euw2.pure.cloud",
            Region::EuCentral1 => "mypurecloud.de",
            Region::ApSoutheast2 => "mypurecloud.com.au",
            Region::ApNortheast1 => "mypurecloud.jp",
            Region::ApNortheast2 => "apne2.pure.cloud",
        }
    }

    /// Full base URL of the Platform API for this region
    pub fn api_base(&self) -> String {
        format!("https://api.{}", self.domain())
    }

    /// Full base URL of the OAuth login service for this region
    pub fn login_base(&self) -> String {
        format!("https://login.{}", self.domain())
    }

    /// AWS-style region name (lowercase, dash-separated)
    pub fn name(&self) -> &'static str {
        match self {
            Region::UsEast1 => "us-east-1",
            Region::UsWest2 => "us-west-2",
            Region::CaCentral1 => "ca-central-1",
            Region::EuWest1 => "eu-west-1",
            Region::EuWest2 => "eu-west-2",
            Region::EuCentral1 => "eu-central-1",
            Region::ApSoutheast2 => "ap-southeast-2",
            Region::ApNortheast1 => "ap-northeast-1",
            Region::ApNortheast2 => "ap-northeast-2",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Region {
    type Err = RegionError;

    /// Parse an AWS-style region name. Input is case-insensitive and accepts
    /// underscores in place of dashes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "us-east-1" => Ok(Region::UsEast1),
            "us-west-2" => Ok(Region::UsWest2),
            "ca-central-1" => Ok(Region::CaCentral1),
            "eu-west-1" => Ok(Region::EuWest1),
            "eu-west-2" => Ok(Region::EuWest2),
            "eu-central-1" => Ok(Region::EuCentral1),
            "ap-southeast-2" => Ok(Region::ApSoutheast2),
            "ap-northeast-1" => Ok(Region::ApNortheast1),
            "ap-northeast-2" => Ok(Region::ApNortheast2),
            _ => Err(RegionError::Unknown(s.to_string())),
        }
    }
}

/// Region parsing errors
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    /// The string does not name a supported region
    #[error("unknown region: {0:?}")]
    Unknown(String),
}

impl From<RegionError> for crate::error::Error {
    fn from(e: RegionError) -> Self {
        crate::error::Error::InvalidArgument {
            name: "region",
            reason: e.to_string(),
        }
    }
}
