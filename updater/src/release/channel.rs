//! Release channel preference.

use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;

/// Which releases a caller is willing to install.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, ValueEnum)]
pub enum Channel {
    /// Only releases without a prerelease marker.
    #[default]
    #[serde(rename = "stable")]
    #[value(name = "stable")]
    PreferStable,
    /// The newest release on the first listing page, prerelease or not.
    #[serde(rename = "prerelease")]
    #[value(name = "prerelease")]
    PreferPrerelease,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreferStable => f.write_str("stable"),
            Self::PreferPrerelease => f.write_str("prerelease"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Deserialize)]
    struct Wrapper {
        channel: Channel,
    }

    #[rstest]
    #[case("channel = \"stable\"", Channel::PreferStable)]
    #[case("channel = \"prerelease\"", Channel::PreferPrerelease)]
    fn deserialises_lowercase_names(#[case] source: &str, #[case] expected: Channel) {
        let parsed: Wrapper = toml::from_str(source).expect("valid channel");
        assert_eq!(parsed.channel, expected);
    }

    #[test]
    fn display_matches_configuration_names() {
        assert_eq!(Channel::PreferStable.to_string(), "stable");
        assert_eq!(Channel::PreferPrerelease.to_string(), "prerelease");
    }
}
