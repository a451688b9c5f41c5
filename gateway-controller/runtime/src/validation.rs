use crate::state::{
    ListenerError, ListenerTls, ResolutionError, ResolutionErrorKind, RouteResource, RuleIndex,
};
use std::str::FromStr;

/// Cipher suites that may be configured on a TLS 1.2 (or earlier) listener.
pub(crate) const SUPPORTED_CIPHER_SUITES: &[&str] = &[
    "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305",
    "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA",
    "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA",
    "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305",
    "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
    "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
    "TLS_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_RSA_WITH_AES_128_CBC_SHA",
    "TLS_RSA_WITH_AES_256_CBC_SHA",
];

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum TlsVersion {
    Auto,
    V1_0,
    V1_1,
    V1_2,
    V1_3,
}

// === impl TlsVersion ===

impl FromStr for TlsVersion {
    type Err = ListenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TLS_AUTO" => Ok(Self::Auto),
            "TLSv1_0" => Ok(Self::V1_0),
            "TLSv1_1" => Ok(Self::V1_1),
            "TLSv1_2" => Ok(Self::V1_2),
            "TLSv1_3" => Ok(Self::V1_3),
            _ => Err(ListenerError::InvalidTlsVersion(s.to_string())),
        }
    }
}

/// Checks a listener's TLS versions and cipher suites.
///
/// Certificate references are checked separately since they may require a
/// secret store lookup.
pub(crate) fn validate_tls_parameters(tls: &ListenerTls) -> Vec<ListenerError> {
    let mut errors = Vec::new();

    let min = match tls.min_version.as_deref().map(TlsVersion::from_str) {
        Some(Ok(version)) => Some(version),
        Some(Err(error)) => {
            errors.push(error);
            None
        }
        None => None,
    };
    if let Some(Err(error)) = tls.max_version.as_deref().map(TlsVersion::from_str) {
        errors.push(error);
    }

    if !tls.cipher_suites.is_empty() {
        if matches!(min, Some(TlsVersion::V1_3)) {
            errors.push(ListenerError::CipherSuitesUnsupported);
        }
        errors.extend(
            tls.cipher_suites
                .iter()
                .filter(|suite| !SUPPORTED_CIPHER_SUITES.contains(&suite.as_str()))
                .map(|suite| ListenerError::UnknownCipherSuite(suite.clone())),
        );
    }

    errors
}

/// A TCP route forwards to exactly one service, so it must declare exactly
/// one rule with exactly one backend.
pub(crate) fn validate_route_shape(route: &RouteResource) -> Result<(), ResolutionError> {
    let RouteResource::Tcp(tcp) = route else {
        return Ok(());
    };

    let rules = &tcp.spec.rules;
    if rules.len() != 1 {
        return Err(ResolutionError::for_rule(
            RuleIndex(0),
            ResolutionErrorKind::InvalidRule(format!(
                "TCP routes must have exactly one rule, found {}",
                rules.len()
            )),
        ));
    }
    let backends = rules[0].backend_refs.as_deref().unwrap_or_default().len();
    if backends != 1 {
        return Err(ResolutionError::for_rule(
            RuleIndex(0),
            ResolutionErrorKind::InvalidRule(format!(
                "TCP routes must have exactly one backend, found {backends}"
            )),
        ));
    }
    Ok(())
}
