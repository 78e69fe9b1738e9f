use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Deployment region. Selects both the routing node and the REST host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Cn,
    Us,
}

impl Region {
    pub fn as_str(self) -> &'static str {
        match self {
            Region::Cn => "cn",
            Region::Us => "us",
        }
    }

    /// Routing node name used in `router-{node}-push`.
    pub fn router_node(self) -> &'static str {
        match self {
            Region::Cn => "g0",
            Region::Us => "a0",
        }
    }

    /// Default REST API host for the region.
    pub fn api_host(self) -> &'static str {
        match self {
            Region::Cn => "leancloud.cn",
            Region::Us => "us-api.leancloud.cn",
        }
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cn" => Ok(Region::Cn),
            "us" => Ok(Region::Us),
            other => Err(Error::Config(format!(
                "unknown region `{other}` (expected `cn` or `us`)"
            ))),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_regions_parse() {
        assert_eq!("cn".parse::<Region>().unwrap(), Region::Cn);
        assert_eq!("US".parse::<Region>().unwrap(), Region::Us);
    }

    #[test]
    fn unknown_region_is_config_error() {
        let err = "eu".parse::<Region>().unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
    }

    #[test]
    fn routing_nodes() {
        assert_eq!(Region::Cn.router_node(), "g0");
        assert_eq!(Region::Us.router_node(), "a0");
        assert_eq!(Region::Us.api_host(), "us-api.leancloud.cn");
    }
}
