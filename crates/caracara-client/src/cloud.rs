//! Falcon cloud regions and base URL resolution

use std::fmt;
use std::str::FromStr;

use crate::error::{CaracaraError, Result};

/// A Falcon cloud region
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CloudRegion {
    Us1,
    Us2,
    Eu1,
    UsGov1,
}

impl CloudRegion {
    pub const ALL: [CloudRegion; 4] = [
        CloudRegion::Us1,
        CloudRegion::Us2,
        CloudRegion::Eu1,
        CloudRegion::UsGov1,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CloudRegion::Us1 => "us-1",
            CloudRegion::Us2 => "us-2",
            CloudRegion::Eu1 => "eu-1",
            CloudRegion::UsGov1 => "us-gov-1",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            CloudRegion::Us1 => "https://api.crowdstrike.com",
            CloudRegion::Us2 => "https://api.us-2.crowdstrike.com",
            CloudRegion::Eu1 => "https://api.eu-1.crowdstrike.com",
            CloudRegion::UsGov1 => "https://api.laggar.gcw.crowdstrike.com",
        }
    }
}

impl fmt::Display for CloudRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CloudRegion {
    type Err = CaracaraError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        CloudRegion::ALL
            .into_iter()
            .find(|region| region.name() == name)
            .ok_or_else(|| CaracaraError::UnknownCloud(s.to_string()))
    }
}

/// Where API requests are sent
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloudTarget {
    /// Start on us-1 and follow the region reported by the token endpoint
    Auto,
    Region(CloudRegion),
    /// A full base URL such as `https://falcon.example.com`
    Custom(String),
}

impl CloudTarget {
    /// Parse a configured cloud name
    pub fn parse(cloud_name: &str) -> Result<Self> {
        let trimmed = cloud_name.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            return Ok(CloudTarget::Auto);
        }
        if trimmed.starts_with("http") {
            return Ok(CloudTarget::Custom(trimmed.trim_end_matches('/').to_string()));
        }
        trimmed.parse().map(CloudTarget::Region)
    }

    /// Base URL used before any region redirect
    pub fn initial_base_url(&self) -> String {
        match self {
            CloudTarget::Auto => CloudRegion::Us1.base_url().to_string(),
            CloudTarget::Region(region) => region.base_url().to_string(),
            CloudTarget::Custom(url) => url.clone(),
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, CloudTarget::Auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_urls() {
        assert_eq!(CloudRegion::Us1.base_url(), "https://api.crowdstrike.com");
        assert_eq!(
            CloudRegion::UsGov1.base_url(),
            "https://api.laggar.gcw.crowdstrike.com"
        );
    }

    #[test]
    fn test_parse_region() {
        assert_eq!("EU-1".parse::<CloudRegion>().unwrap(), CloudRegion::Eu1);
        assert!(matches!(
            "mars-1".parse::<CloudRegion>(),
            Err(CaracaraError::UnknownCloud(_))
        ));
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(CloudTarget::parse("auto").unwrap(), CloudTarget::Auto);
        assert_eq!(CloudTarget::parse("").unwrap(), CloudTarget::Auto);
        assert_eq!(
            CloudTarget::parse("us-2").unwrap(),
            CloudTarget::Region(CloudRegion::Us2)
        );
        assert_eq!(
            CloudTarget::parse("http://127.0.0.1:8080/").unwrap(),
            CloudTarget::Custom("http://127.0.0.1:8080".to_string())
        );
        assert!(CloudTarget::parse("nowhere").is_err());
    }

    #[test]
    fn test_initial_base_url() {
        assert_eq!(
            CloudTarget::Auto.initial_base_url(),
            "https://api.crowdstrike.com"
        );
        assert_eq!(
            CloudTarget::Region(CloudRegion::Eu1).initial_base_url(),
            "https://api.eu-1.crowdstrike.com"
        );
    }
}
