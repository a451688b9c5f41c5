use crate::core::{ConfigEntryKind, ConfigEntrySet};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

#[derive(Clone, Debug, Default)]
pub struct ReconcileMetrics {
    passes: Family<PassLabels, Counter>,
    status_updates: Family<StatusLabels, Counter>,
    entries: Family<EntryLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct PassLabels {
    outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct StatusLabels {
    kind: String,
    result: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct EntryLabels {
    kind: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    Published,
    PublishFailed,
    Rejected,
    Cancelled,
    LookupFailed,
}

// === impl ReconcileMetrics ===

impl ReconcileMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let passes = Family::default();
        prom.register(
            "reconcile_passes",
            "Count of gateway reconcile passes by outcome",
            passes.clone(),
        );

        let status_updates = Family::default();
        prom.register(
            "status_updates",
            "Count of computed statuses, by whether they were sent for writing",
            status_updates.clone(),
        );

        let entries = Family::default();
        prom.register(
            "config_entries",
            "Count of config entries published, by kind",
            entries.clone(),
        );

        Self {
            passes,
            status_updates,
            entries,
        }
    }

    pub(crate) fn pass(&self, outcome: PassOutcome) {
        let outcome = match outcome {
            PassOutcome::Published => "published",
            PassOutcome::PublishFailed => "publish_failed",
            PassOutcome::Rejected => "rejected",
            PassOutcome::Cancelled => "cancelled",
            PassOutcome::LookupFailed => "lookup_failed",
        };
        self.passes
            .get_or_create(&PassLabels {
                outcome: outcome.to_string(),
            })
            .inc();
    }

    pub(crate) fn status_update(&self, kind: &str, sent: bool) {
        self.status_updates
            .get_or_create(&StatusLabels {
                kind: kind.to_string(),
                result: if sent { "sent" } else { "skipped" }.to_string(),
            })
            .inc();
    }

    pub(crate) fn published(&self, entries: &ConfigEntrySet) {
        for kind in [
            ConfigEntryKind::IngressGateway,
            ConfigEntryKind::ServiceRouter,
            ConfigEntryKind::ServiceSplitter,
            ConfigEntryKind::ServiceDefaults,
        ] {
            let count = entries.count(kind);
            if count > 0 {
                self.entries
                    .get_or_create(&EntryLabels {
                        kind: kind.to_string(),
                    })
                    .inc_by(count as u64);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn passes(&self, outcome: &str) -> u64 {
        self.passes
            .get_or_create(&PassLabels {
                outcome: outcome.to_string(),
            })
            .get()
    }

    #[cfg(test)]
    pub(crate) fn status_updates(&self, kind: &str, result: &str) -> u64 {
        self.status_updates
            .get_or_create(&StatusLabels {
                kind: kind.to_string(),
                result: result.to_string(),
            })
            .get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config_entry::Defaults;

    #[test]
    fn encodes_registered_metrics() {
        let mut prom = Registry::default();
        let metrics = ReconcileMetrics::register(&mut prom);
        metrics.pass(PassOutcome::Published);
        metrics.status_update("Gateway", false);

        let mut entries = ConfigEntrySet::new();
        entries.insert(Defaults {
            name: "web".to_string(),
            namespace: "default".to_string(),
            protocol: "http".to_string(),
        });
        metrics.published(&entries);

        let mut text = String::new();
        prometheus_client::encoding::text::encode(&mut text, &prom).expect("metrics must encode");
        assert!(text.contains(r#"reconcile_passes_total{outcome="published"} 1"#), "{text}");
        assert!(
            text.contains(r#"status_updates_total{kind="Gateway",result="skipped"} 1"#),
            "{text}"
        );
        assert!(
            text.contains(r#"config_entries_total{kind="service-defaults"} 1"#),
            "{text}"
        );
    }
}
