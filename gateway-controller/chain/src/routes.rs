use gateway_controller_core::{
    config_entry::{HeaderModifiers, HttpMatch, HttpValueMatch, Redirect},
    routes::{
        Filter, HeaderMatch, HeaderModifierFilter, HeaderValue, HttpRouteMatch, PathMatch,
        QueryParamMatch, RequestRedirectFilter,
    },
};

pub(crate) fn convert_match(
    HttpRouteMatch {
        path,
        headers,
        query_params,
        method,
    }: &HttpRouteMatch,
) -> HttpMatch {
    let mut out = HttpMatch::default();
    match path {
        Some(PathMatch::Exact(path)) => out.path_exact = Some(path.clone()),
        Some(PathMatch::Prefix(prefix)) => out.path_prefix = Some(prefix.clone()),
        Some(PathMatch::Regex(regex)) => out.path_regex = Some(regex.to_string()),
        None => {}
    }

    out.header = headers
        .iter()
        .map(|hm| match hm {
            HeaderMatch::Exact(name, value) => HttpValueMatch {
                name: name.to_string(),
                exact: Some(header_value(value)),
                regex: None,
            },
            HeaderMatch::Regex(name, re) => HttpValueMatch {
                name: name.to_string(),
                exact: None,
                regex: Some(re.to_string()),
            },
        })
        .collect();

    out.query_param = query_params
        .iter()
        .map(|qpm| match qpm {
            QueryParamMatch::Exact(name, value) => HttpValueMatch {
                name: name.clone(),
                exact: Some(value.clone()),
                regex: None,
            },
            QueryParamMatch::Regex(name, re) => HttpValueMatch {
                name: name.clone(),
                exact: None,
                regex: Some(re.to_string()),
            },
        })
        .collect();

    out.methods = method.iter().map(ToString::to_string).collect();
    out
}

/// Folds every header modifier in `filters` into a single modifier, in
/// order. Later operations on the same header replace earlier ones.
pub(crate) fn convert_header_modifiers<'f>(
    filters: impl IntoIterator<Item = &'f Filter>,
) -> Option<HeaderModifiers> {
    let mut merged = HeaderModifierFilter::default();
    for filter in filters {
        if let Filter::RequestHeaderModifier(modifier) = filter {
            merged.extend(modifier);
        }
    }
    if merged.is_empty() {
        return None;
    }

    let HeaderModifierFilter { add, set, remove } = merged;
    let mut out = HeaderModifiers {
        add: add
            .into_iter()
            .map(|(n, v)| (n.to_string(), header_value(&v)))
            .collect(),
        set: set
            .into_iter()
            .map(|(n, v)| (n.to_string(), header_value(&v)))
            .collect(),
        remove: remove.into_iter().map(|n| n.to_string()).collect(),
    };
    out.remove.sort();
    out.remove.dedup();
    Some(out)
}

/// Returns the last redirect declared in `filters`.
pub(crate) fn convert_redirect<'f>(
    filters: impl IntoIterator<Item = &'f Filter>,
) -> Option<Redirect> {
    filters
        .into_iter()
        .filter_map(|filter| match filter {
            Filter::RequestRedirect(redirect) => Some(redirect),
            Filter::RequestHeaderModifier(_) => None,
        })
        .last()
        .map(
            |RequestRedirectFilter {
                 scheme,
                 host,
                 port,
                 status,
             }| Redirect {
                scheme: scheme.as_ref().map(ToString::to_string),
                hostname: host.clone(),
                port: port.map(u16::from),
                status_code: status.map(|s| s.as_u16()),
            },
        )
}

fn header_value(value: &HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}
