//! Implementation-specific keys recognized in a listener's TLS `options` and
//! in certificate references.

/// The group of certificate references that name a path in the external
/// secret store rather than a Kubernetes `Secret`.
pub const SECRET_STORE_GROUP: &str = "api-gateway.mesh.io";

pub const TLS_MIN_VERSION: &str = "api-gateway.mesh.io/tls_min_version";
pub const TLS_MAX_VERSION: &str = "api-gateway.mesh.io/tls_max_version";

/// A comma-separated list of cipher suite names.
pub const TLS_CIPHER_SUITES: &str = "api-gateway.mesh.io/tls_cipher_suites";

/// Overrides the secret-store field holding the certificate chain.
pub const CERTIFICATE_FIELD: &str = "api-gateway.mesh.io/certificate_field";

/// Overrides the secret-store field holding the private key.
pub const PRIVATE_KEY_FIELD: &str = "api-gateway.mesh.io/private_key_field";
