use gateway_controller_core::config_entry::{IngressListener, IngressService, IngressTls};
use gateway_controller_k8s_state::{ListenerProtocol, ListenerState, TlsMode};

/// Describes an edge listener, or `None` when no services are bound to it.
pub(crate) fn listener(
    listener: &ListenerState,
    mut services: Vec<IngressService>,
) -> Option<IngressListener> {
    if services.is_empty() {
        return None;
    }
    services.sort();
    services.dedup();

    let protocol = match listener.protocol {
        ListenerProtocol::Http | ListenerProtocol::Https => crate::http::PROTOCOL,
        ListenerProtocol::Tcp | ListenerProtocol::Tls => crate::tcp::PROTOCOL,
        ListenerProtocol::Unsupported(_) => return None,
    };

    Some(IngressListener {
        port: listener.port,
        protocol: protocol.to_string(),
        tls: tls(listener),
        services,
    })
}

fn tls(listener: &ListenerState) -> Option<IngressTls> {
    if !listener.protocol.requires_tls() {
        return None;
    }
    let tls = listener.tls.as_ref()?;
    if tls.mode != TlsMode::Terminate {
        return None;
    }
    Some(IngressTls {
        enabled: true,
        min_version: tls.min_version.clone(),
        max_version: tls.max_version.clone(),
        cipher_suites: tls.cipher_suites.clone(),
        certificates: tls.certificates.iter().map(ToString::to_string).collect(),
    })
}
