/// Maps Kubernetes namespaces onto mesh namespaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeshNamespaces {
    /// Each Kubernetes namespace maps onto a mesh namespace of the same name,
    /// with an optional prefix.
    Mirror { prefix: String },

    /// Every Kubernetes namespace maps onto a single mesh namespace.
    Single(String),
}

impl Default for MeshNamespaces {
    fn default() -> Self {
        Self::Single(Self::DEFAULT_NAMESPACE.to_string())
    }
}

impl MeshNamespaces {
    pub const DEFAULT_NAMESPACE: &'static str = "default";

    pub fn mirror(prefix: impl Into<String>) -> Self {
        Self::Mirror {
            prefix: prefix.into(),
        }
    }

    /// Returns the mesh namespace that holds resources from the Kubernetes
    /// namespace `ns`.
    pub fn mesh_namespace(&self, ns: &str) -> String {
        match self {
            Self::Mirror { prefix } => format!("{prefix}{ns}"),
            Self::Single(ns) if ns.is_empty() => Self::DEFAULT_NAMESPACE.to_string(),
            Self::Single(ns) => ns.clone(),
        }
    }
}
