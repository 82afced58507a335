//! Edit metadata carried by PBF elements.

use osmpbf::{DenseNodeInfo, Info};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Last-modified instant, version, and editor of an element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct EditMeta {
    pub(super) timestamp: String,
    pub(super) version: u32,
    pub(super) user: Option<String>,
}

impl EditMeta {
    pub(super) fn from_info(info: &Info<'_>) -> Self {
        Self {
            timestamp: info
                .milli_timestamp()
                .map(format_timestamp)
                .unwrap_or_default(),
            version: info
                .version()
                .and_then(|version| u32::try_from(version).ok())
                .unwrap_or_default(),
            user: info
                .user()
                .and_then(Result::ok)
                .filter(|user| !user.is_empty())
                .map(str::to_owned),
        }
    }

    pub(super) fn from_dense(info: Option<&DenseNodeInfo<'_>>) -> Self {
        info.map_or_else(Self::default, |info| Self {
            timestamp: format_timestamp(info.milli_timestamp()),
            version: u32::try_from(info.version()).unwrap_or_default(),
            user: info
                .user()
                .ok()
                .filter(|user| !user.is_empty())
                .map(str::to_owned),
        })
    }
}

/// Render milliseconds since the Unix epoch as RFC 3339 UTC with second
/// precision. Out-of-range instants render as an empty string.
pub(super) fn format_timestamp(milliseconds: i64) -> String {
    OffsetDateTime::from_unix_timestamp(milliseconds.div_euclid(1000))
        .ok()
        .and_then(|instant| instant.format(&Rfc3339).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "1970-01-01T00:00:00Z")]
    #[case(1_704_164_645_000, "2024-01-02T03:04:05Z")]
    #[case(1_704_164_645_999, "2024-01-02T03:04:05Z")]
    #[case(i64::MAX, "")]
    fn formats_timestamps(#[case] milliseconds: i64, #[case] expected: &str) {
        assert_eq!(format_timestamp(milliseconds), expected);
    }
}
