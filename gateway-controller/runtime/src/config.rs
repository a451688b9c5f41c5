use crate::{core::GATEWAY_CONTROLLER_NAME, state::MeshNamespaces};
use anyhow::{bail, Result};
use std::time::Duration;

/// Controller configuration.
///
/// Every option may be set by flag or environment variable. The struct is
/// meant to be flattened into a binary's own arguments.
#[derive(Clone, Debug, PartialEq, Eq, clap::Args)]
pub struct Config {
    /// The controller name written into route parent statuses.
    #[clap(
        long,
        env = "GATEWAY_CONTROLLER_NAME",
        default_value = GATEWAY_CONTROLLER_NAME
    )]
    pub controller_name: String,

    /// Publishes each Kubernetes namespace into its own mesh namespace.
    #[clap(long, env = "GATEWAY_MIRROR_NAMESPACES")]
    pub mirror_namespaces: bool,

    /// Prefix of mirrored mesh namespace names.
    #[clap(long, env = "GATEWAY_MIRROR_NAMESPACE_PREFIX", default_value = "")]
    pub mirror_namespace_prefix: String,

    /// The mesh namespace used when namespaces are not mirrored.
    #[clap(long, env = "GATEWAY_DESTINATION_NAMESPACE", default_value = "default")]
    pub destination_namespace: String,

    /// Bounds each catalog and secret store lookup.
    #[clap(
        long,
        env = "GATEWAY_LOOKUP_TIMEOUT",
        default_value = "5s",
        value_parser = parse_duration
    )]
    pub lookup_timeout: Duration,

    /// Secret store field holding a listener's certificate chain.
    #[clap(long, env = "GATEWAY_CERTIFICATE_FIELD", default_value = "certificate")]
    pub certificate_field: String,

    /// Secret store field holding a listener's private key.
    #[clap(long, env = "GATEWAY_PRIVATE_KEY_FIELD", default_value = "private_key")]
    pub private_key_field: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            controller_name: GATEWAY_CONTROLLER_NAME.to_string(),
            mirror_namespaces: false,
            mirror_namespace_prefix: String::new(),
            destination_namespace: MeshNamespaces::DEFAULT_NAMESPACE.to_string(),
            lookup_timeout: Duration::from_secs(5),
            certificate_field: "certificate".to_string(),
            private_key_field: "private_key".to_string(),
        }
    }
}

impl Config {
    pub fn mesh_namespaces(&self) -> MeshNamespaces {
        if self.mirror_namespaces {
            MeshNamespaces::mirror(self.mirror_namespace_prefix.clone())
        } else {
            MeshNamespaces::Single(self.destination_namespace.clone())
        }
    }
}

pub(crate) fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let offset = s
        .rfind(|c: char| c.is_ascii_digit())
        .ok_or_else(|| anyhow::anyhow!("{s} does not contain a duration value"))?;
    let (magnitude, unit) = s.split_at(offset + 1);
    let magnitude = magnitude.parse::<u64>()?;

    let mul = match unit {
        "" if magnitude == 0 => 0,
        "ms" => 1,
        "s" => 1000,
        "m" => 1000 * 60,
        _ => bail!("invalid duration unit {unit} (expected one of 'ms', 's' or 'm')"),
    };

    let ms = magnitude
        .checked_mul(mul)
        .ok_or_else(|| anyhow::anyhow!("duration {s} overflows when converted to 'ms'"))?;
    Ok(Duration::from_millis(ms))
}
