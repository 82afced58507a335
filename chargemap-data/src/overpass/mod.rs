//! Overpass API feature source.
//!
//! [`OverpassClient`] downloads every charging station and charge point from
//! an Overpass endpoint in a single query, and [`parse_response`] decodes the
//! JSON answer into a [`chargemap_core::RawFeatureSet`].
//!
//! # Example
//!
//! ```no_run
//! use chargemap_data::{OverpassClient, OverpassClientConfig, OverpassEndpoint, parse_response};
//!
//! let endpoint: OverpassEndpoint = "switzerland".parse()?;
//! let client = OverpassClient::with_config(OverpassClientConfig::new(endpoint))?;
//! let body = client.download()?;
//! let features = parse_response(&body)?.into_feature_set();
//! let snapshot = chargemap_core::aggregate(&features)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod client;
mod response;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use client::{DEFAULT_USER_AGENT, OverpassClient, OverpassClientConfig};
pub use response::{LatLon, Member, OverpassElement, OverpassResponse, parse_response};

/// Overpass instance covering Switzerland only.
pub const SWITZERLAND_URL: &str = "https://overpass.osm.ch/api/interpreter";
/// Main public Overpass instance.
pub const WORLD_URL: &str = "https://overpass-api.de/api/interpreter";

/// Where to send the Overpass query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverpassEndpoint {
    /// <https://overpass.osm.ch>
    Switzerland,
    /// <https://overpass-api.de>
    World,
    /// Any other interpreter URL.
    Custom(String),
}

impl OverpassEndpoint {
    /// Interpreter URL the query is posted to.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Switzerland => SWITZERLAND_URL,
            Self::World => WORLD_URL,
            Self::Custom(url) => url,
        }
    }
}

impl fmt::Display for OverpassEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url())
    }
}

/// Rejected endpoint name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Invalid value '{0}'. Expected 'switzerland', 'world', or a URL starting with http:// or https://"
)]
pub struct ParseEndpointError(pub String);

impl FromStr for OverpassEndpoint {
    type Err = ParseEndpointError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "switzerland" => Ok(Self::Switzerland),
            "world" => Ok(Self::World),
            url if url.starts_with("http://") || url.starts_with("https://") => {
                Ok(Self::Custom(url.to_owned()))
            }
            other => Err(ParseEndpointError(other.to_owned())),
        }
    }
}

/// Overpass QL query selecting charging stations and charge points.
///
/// Stations may be mapped as nodes, closed ways, or multipolygon relations;
/// charge points are always nodes. `out meta geom` inlines way and relation
/// member positions and adds edit metadata.
#[must_use]
pub fn build_query(timeout_seconds: u64) -> String {
    format!(
        "[out:json][timeout:{timeout_seconds}];\n\
         (\n  \
           node[\"amenity\"=\"charging_station\"];\n  \
           way[\"amenity\"=\"charging_station\"];\n  \
           relation[\"amenity\"=\"charging_station\"];\n  \
           node[\"man_made\"=\"charge_point\"];\n\
         );\n\
         out meta geom qt;\n"
    )
}

/// Errors raised while downloading or decoding Overpass data.
#[derive(Debug, Error)]
pub enum OverpassError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    /// The Tokio runtime could not be built.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The request did not finish in time.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Endpoint URL.
        url: String,
        /// Effective HTTP timeout.
        timeout_secs: u64,
    },
    /// The server answered with a non-success status.
    #[error("request to {url} failed with HTTP {status}: {message}")]
    Http {
        /// Endpoint URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error detail.
        message: String,
    },
    /// Connection or transfer failure.
    #[error("request to {url} failed: {message}")]
    Network {
        /// Endpoint URL.
        url: String,
        /// Error detail.
        message: String,
    },
    /// The body is not a valid Overpass JSON document.
    #[error("failed to decode Overpass response: {source}")]
    Decode {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The response holds no elements.
    #[error("Overpass returned no elements{}", remark.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    Empty {
        /// Server remark, e.g. a timeout notice.
        remark: Option<String>,
    },
}
