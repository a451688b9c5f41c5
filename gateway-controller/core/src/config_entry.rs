//! Low-level configuration entries emitted for the data plane.
//!
//! Entries are identified by kind and name. A [`ConfigEntrySet`] holds at
//! most one entry per identity; merging two sets is commutative, associative
//! and idempotent.

use serde::{Deserialize, Serialize};
use std::collections::{btree_map, BTreeMap};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfigEntryKind {
    #[serde(rename = "ingress-gateway")]
    IngressGateway,
    #[serde(rename = "service-router")]
    ServiceRouter,
    #[serde(rename = "service-splitter")]
    ServiceSplitter,
    #[serde(rename = "service-defaults")]
    ServiceDefaults,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigEntryKey {
    pub kind: ConfigEntryKind,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "Kind")]
pub enum ConfigEntry {
    #[serde(rename = "ingress-gateway")]
    IngressGateway(IngressGateway),
    #[serde(rename = "service-router")]
    ServiceRouter(Router),
    #[serde(rename = "service-splitter")]
    ServiceSplitter(Splitter),
    #[serde(rename = "service-defaults")]
    ServiceDefaults(Defaults),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IngressGateway {
    pub name: String,
    pub namespace: String,
    pub meta: BTreeMap<String, String>,
    pub listeners: Vec<IngressListener>,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IngressListener {
    pub port: u16,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<IngressTls>,
    pub services: Vec<IngressService>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IngressTls {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cipher_suites: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IngressService {
    pub name: String,
    pub namespace: String,
    pub hosts: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Router {
    pub name: String,
    pub namespace: String,
    pub meta: BTreeMap<String, String>,
    pub routes: Vec<RouterRoute>,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouterRoute {
    #[serde(rename = "Match")]
    pub route_match: HttpMatch,
    pub destination: RouterDestination,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_exact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header: Vec<HttpValueMatch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_param: Vec<HttpValueMatch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
}

/// Matches a named header or query parameter.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpValueMatch {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouterDestination {
    pub service: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<HeaderModifiers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Redirect>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HeaderModifiers {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub add: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Redirect {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Splitter {
    pub name: String,
    pub namespace: String,
    pub meta: BTreeMap<String, String>,
    pub splits: Vec<Split>,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Split {
    pub weight: u32,
    pub service: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<HeaderModifiers>,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Defaults {
    pub name: String,
    pub namespace: String,
    pub protocol: String,
}

/// A deduplicated collection of config entries, ordered by kind and name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigEntrySet {
    entries: BTreeMap<ConfigEntryKey, ConfigEntry>,
}

/// Describes what happened when an entry was inserted into a set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Insert {
    /// No entry with this identity existed.
    Added,

    /// An identical entry already existed.
    Unchanged,

    /// An entry with the same identity but different content existed. The
    /// greater of the two entries is retained and the other is returned.
    Conflict { discarded: ConfigEntry },
}

// === impl ConfigEntryKind ===

impl ConfigEntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IngressGateway => "ingress-gateway",
            Self::ServiceRouter => "service-router",
            Self::ServiceSplitter => "service-splitter",
            Self::ServiceDefaults => "service-defaults",
        }
    }
}

impl std::fmt::Display for ConfigEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// === impl ConfigEntryKey ===

impl ConfigEntryKey {
    pub fn new(kind: ConfigEntryKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ConfigEntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

// === impl ConfigEntry ===

impl ConfigEntry {
    pub fn kind(&self) -> ConfigEntryKind {
        match self {
            Self::IngressGateway(_) => ConfigEntryKind::IngressGateway,
            Self::ServiceRouter(_) => ConfigEntryKind::ServiceRouter,
            Self::ServiceSplitter(_) => ConfigEntryKind::ServiceSplitter,
            Self::ServiceDefaults(_) => ConfigEntryKind::ServiceDefaults,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::IngressGateway(e) => &e.name,
            Self::ServiceRouter(e) => &e.name,
            Self::ServiceSplitter(e) => &e.name,
            Self::ServiceDefaults(e) => &e.name,
        }
    }

    pub fn key(&self) -> ConfigEntryKey {
        ConfigEntryKey::new(self.kind(), self.name())
    }
}

impl From<IngressGateway> for ConfigEntry {
    fn from(entry: IngressGateway) -> Self {
        Self::IngressGateway(entry)
    }
}

impl From<Router> for ConfigEntry {
    fn from(entry: Router) -> Self {
        Self::ServiceRouter(entry)
    }
}

impl From<Splitter> for ConfigEntry {
    fn from(entry: Splitter) -> Self {
        Self::ServiceSplitter(entry)
    }
}

impl From<Defaults> for ConfigEntry {
    fn from(entry: Defaults) -> Self {
        Self::ServiceDefaults(entry)
    }
}

// === impl ConfigEntrySet ===

impl ConfigEntrySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, kind: ConfigEntryKind, name: &str) -> Option<&ConfigEntry> {
        self.entries.get(&ConfigEntryKey::new(kind, name))
    }

    pub fn contains(&self, kind: ConfigEntryKind, name: &str) -> bool {
        self.get(kind, name).is_some()
    }

    /// Inserts an entry, keeping at most one entry per kind and name.
    ///
    /// When an entry with the same identity but different content is already
    /// present, the greater entry wins so that the outcome does not depend on
    /// insertion order.
    pub fn insert(&mut self, entry: impl Into<ConfigEntry>) -> Insert {
        let entry = entry.into();
        match self.entries.entry(entry.key()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                Insert::Added
            }
            btree_map::Entry::Occupied(mut slot) => {
                if *slot.get() == entry {
                    return Insert::Unchanged;
                }
                if entry > *slot.get() {
                    let discarded = slot.insert(entry);
                    Insert::Conflict { discarded }
                } else {
                    Insert::Conflict { discarded: entry }
                }
            }
        }
    }

    /// Merges another set into this one, returning the conflicts that were
    /// resolved along the way.
    pub fn merge(&mut self, other: ConfigEntrySet) -> Vec<ConfigEntry> {
        other
            .entries
            .into_values()
            .filter_map(|entry| match self.insert(entry) {
                Insert::Conflict { discarded } => Some(discarded),
                Insert::Added | Insert::Unchanged => None,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigEntry> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ConfigEntryKey> {
        self.entries.keys()
    }

    pub fn count(&self, kind: ConfigEntryKind) -> usize {
        self.entries.keys().filter(|k| k.kind == kind).count()
    }

    pub fn ingress_gateways(&self) -> impl Iterator<Item = &IngressGateway> {
        self.iter().filter_map(|e| match e {
            ConfigEntry::IngressGateway(e) => Some(e),
            _ => None,
        })
    }

    pub fn routers(&self) -> impl Iterator<Item = &Router> {
        self.iter().filter_map(|e| match e {
            ConfigEntry::ServiceRouter(e) => Some(e),
            _ => None,
        })
    }

    pub fn splitters(&self) -> impl Iterator<Item = &Splitter> {
        self.iter().filter_map(|e| match e {
            ConfigEntry::ServiceSplitter(e) => Some(e),
            _ => None,
        })
    }

    pub fn defaults(&self) -> impl Iterator<Item = &Defaults> {
        self.iter().filter_map(|e| match e {
            ConfigEntry::ServiceDefaults(e) => Some(e),
            _ => None,
        })
    }
}

impl Serialize for ConfigEntrySet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.values())
    }
}

impl FromIterator<ConfigEntry> for ConfigEntrySet {
    fn from_iter<I: IntoIterator<Item = ConfigEntry>>(iter: I) -> Self {
        let mut set = Self::default();
        for entry in iter {
            set.insert(entry);
        }
        set
    }
}

impl IntoIterator for ConfigEntrySet {
    type Item = ConfigEntry;
    type IntoIter = btree_map::IntoValues<ConfigEntryKey, ConfigEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn defaults(name: &str, protocol: &str) -> Defaults {
        Defaults {
            name: name.to_string(),
            namespace: "default".to_string(),
            protocol: protocol.to_string(),
        }
    }

    #[test]
    fn insert_deduplicates_by_kind_and_name() {
        let mut set = ConfigEntrySet::new();
        assert_eq!(set.insert(defaults("svc-a", "http")), Insert::Added);
        assert_eq!(set.insert(defaults("svc-a", "http")), Insert::Unchanged);
        assert_eq!(
            set.insert(Router {
                name: "svc-a".to_string(),
                ..Default::default()
            }),
            Insert::Added
        );
        assert_eq!(set.len(), 2);
        assert_eq!(set.count(ConfigEntryKind::ServiceDefaults), 1);
        assert_eq!(set.count(ConfigEntryKind::ServiceRouter), 1);
    }

    #[test]
    fn conflicts_resolve_independently_of_order() {
        let mut ab = ConfigEntrySet::new();
        ab.insert(defaults("svc", "http"));
        ab.insert(defaults("svc", "tcp"));

        let mut ba = ConfigEntrySet::new();
        ba.insert(defaults("svc", "tcp"));
        let outcome = ba.insert(defaults("svc", "http"));

        assert_eq!(ab, ba);
        assert_eq!(
            outcome,
            Insert::Conflict {
                discarded: defaults("svc", "http").into()
            }
        );
    }

    #[test]
    fn merge_is_idempotent() {
        let set: ConfigEntrySet = vec![
            ConfigEntry::from(defaults("svc-a", "http")),
            ConfigEntry::from(defaults("svc-b", "http")),
        ]
        .into_iter()
        .collect();

        let mut merged = set.clone();
        let conflicts = merged.merge(set.clone());
        assert!(conflicts.is_empty());
        assert_eq!(merged, set);
    }

    #[test]
    fn serializes_entries_in_key_order_with_kind_tags() {
        let mut set = ConfigEntrySet::new();
        set.insert(defaults("svc-b", "http"));
        set.insert(defaults("svc-a", "tcp"));

        let json = serde_json::to_value(&set).expect("set must serialize");
        assert_eq!(
            json,
            serde_json::json!([
                {"Kind": "service-defaults", "Name": "svc-a", "Namespace": "default", "Protocol": "tcp"},
                {"Kind": "service-defaults", "Name": "svc-b", "Namespace": "default", "Protocol": "http"},
            ])
        );
    }

    #[test]
    fn typed_iterators_filter_by_kind() {
        let mut set = ConfigEntrySet::new();
        set.insert(defaults("svc-a", "http"));
        set.insert(Splitter {
            name: "split".to_string(),
            ..Default::default()
        });
        set.insert(IngressGateway {
            name: "gw".to_string(),
            meta: maplit::btreemap! {"k".to_string() => "v".to_string()},
            ..Default::default()
        });
        assert_eq!(set.defaults().count(), 1);
        assert_eq!(set.splitters().count(), 1);
        assert_eq!(set.routers().count(), 0);
        assert_eq!(set.ingress_gateways().next().map(|g| g.name.as_str()), Some("gw"));
        assert!(set.contains(ConfigEntryKind::ServiceSplitter, "split"));
    }
}
