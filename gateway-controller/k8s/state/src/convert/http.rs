use crate::{
    refs::BackendReference,
    route::{ResolvedReference, RouteState, RuleIndex},
};
use anyhow::{anyhow, bail, Result};
use gateway_controller_core::{
    resolved::{HttpRouteRule, WeightedService},
    routes,
};
use gateway_controller_k8s_api::gateway as api;
use std::num::NonZeroU16;

/// Converts every routable rule of a route, in declaration order.
pub fn rules(route: &api::HTTPRoute, state: &RouteState) -> Vec<HttpRouteRule> {
    route
        .spec
        .rules
        .iter()
        .flatten()
        .enumerate()
        .filter_map(|(i, rule)| {
            let refs = state.references.get(RuleIndex(i))?;
            if state.errors.get(RuleIndex(i)).is_some() {
                return None;
            }
            match convert_rule(rule, refs) {
                Ok(rule) => Some(rule),
                Err(error) => {
                    tracing::warn!(%error, rule = i, "Skipping unconvertible rule");
                    None
                }
            }
        })
        .collect()
}

/// Checks that a rule's matches and filters can be converted.
pub(crate) fn check_rule(route: &api::HTTPRoute, rule: RuleIndex) -> Result<()> {
    let rule = match route.spec.rules.iter().flatten().nth(rule.0) {
        Some(rule) => rule,
        None => bail!("rule {} does not exist", rule.0),
    };
    rule_matches(rule)?;
    filters(rule.filters.iter().flatten())?;
    for backend in rule.backend_refs.iter().flatten() {
        backend_filters(backend)?;
    }
    Ok(())
}

fn convert_rule(rule: &api::HTTPRouteRules, refs: &[ResolvedReference]) -> Result<HttpRouteRule> {
    let backend_refs = rule.backend_refs.as_deref().unwrap_or_default();
    let backends = refs
        .iter()
        .map(|reference| {
            let ResolvedReference::MeshService(svc) = reference;
            let backend = backend_refs.get(svc.backend.backend).ok_or_else(|| {
                anyhow!("backend {} of rule {} does not exist", svc.backend.backend, svc.backend.rule)
            })?;
            Ok(WeightedService {
                name: svc.service.clone(),
                namespace: svc.namespace.clone(),
                weight: BackendReference::from(backend).weight(),
                filters: backend_filters(backend)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(HttpRouteRule {
        matches: rule_matches(rule)?,
        filters: filters(rule.filters.iter().flatten())?,
        backends,
    })
}

fn rule_matches(rule: &api::HTTPRouteRules) -> Result<Vec<routes::HttpRouteMatch>> {
    rule.matches
        .iter()
        .flatten()
        .cloned()
        .map(try_match)
        .collect()
}

fn filters<'a>(
    filters: impl IntoIterator<Item = &'a api::HTTPRouteRulesFilters>,
) -> Result<Vec<routes::Filter>> {
    filters.into_iter().cloned().map(filter).collect()
}

/// Backend filters share the rule filters' schema but are generated as a
/// distinct type, so they are re-read as rule filters.
fn backend_filters(backend: &api::HTTPRouteRulesBackendRefs) -> Result<Vec<routes::Filter>> {
    backend
        .filters
        .iter()
        .flatten()
        .map(|f| {
            let f = serde_json::to_value(f)?;
            filter(serde_json::from_value(f)?)
        })
        .collect()
}

/// Returns the API spelling of a generated enum value.
fn wire_name<T: serde::Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(name) => Ok(name),
        other => bail!("expected an enum name, found {other}"),
    }
}

pub fn try_match(
    api::HTTPRouteRulesMatches {
        headers,
        method,
        path,
        query_params,
    }: api::HTTPRouteRulesMatches,
) -> Result<routes::HttpRouteMatch> {
    let path = path.map(path_match).transpose()?;

    let headers = headers
        .into_iter()
        .flatten()
        .map(header_match)
        .collect::<Result<_>>()?;

    let query_params = query_params
        .into_iter()
        .flatten()
        .map(query_param_match)
        .collect::<Result<_>>()?;

    let method = method
        .as_ref()
        .map(|m| -> Result<_> { Ok(routes::Method::try_from(wire_name(m)?.as_str())?) })
        .transpose()?;

    Ok(routes::HttpRouteMatch {
        path,
        headers,
        query_params,
        method,
    })
}

/// An absent type is a prefix match and an absent value matches `/`.
pub fn path_match(path_match: api::HTTPRouteRulesMatchesPath) -> Result<routes::PathMatch> {
    use api::HTTPRouteRulesMatchesPathType as Type;

    let value = path_match.value.unwrap_or_else(|| "/".to_string());
    match path_match.r#type.unwrap_or(Type::PathPrefix) {
        Type::Exact | Type::PathPrefix if !value.starts_with('/') => Err(anyhow!(
            "path matches must be absolute (begin with `/`); {value:?} is not an absolute path"
        )),
        Type::Exact => Ok(routes::PathMatch::Exact(value)),
        Type::PathPrefix => Ok(routes::PathMatch::Prefix(value)),
        Type::RegularExpression => routes::PathMatch::regex(&value).map_err(Into::into),
    }
}

pub fn header_match(header_match: api::HTTPRouteRulesMatchesHeaders) -> Result<routes::HeaderMatch> {
    use api::HTTPRouteRulesMatchesHeadersType as Type;

    let api::HTTPRouteRulesMatchesHeaders {
        name,
        r#type,
        value,
    } = header_match;
    match r#type.unwrap_or(Type::Exact) {
        Type::Exact => Ok(routes::HeaderMatch::Exact(name.parse()?, value.parse()?)),
        Type::RegularExpression => Ok(routes::HeaderMatch::Regex(name.parse()?, value.parse()?)),
    }
}

pub fn query_param_match(
    query_match: api::HTTPRouteRulesMatchesQueryParams,
) -> Result<routes::QueryParamMatch> {
    use api::HTTPRouteRulesMatchesQueryParamsType as Type;

    let api::HTTPRouteRulesMatchesQueryParams {
        name,
        r#type,
        value,
    } = query_match;
    match r#type.unwrap_or(Type::Exact) {
        Type::Exact => Ok(routes::QueryParamMatch::Exact(name, value)),
        Type::RegularExpression => Ok(routes::QueryParamMatch::Regex(name, value.parse()?)),
    }
}

/// Only request header modifiers and request redirects are supported.
pub fn filter(filter: api::HTTPRouteRulesFilters) -> Result<routes::Filter> {
    if let Some(modifier) = filter.request_header_modifier {
        return header_modifier(modifier).map(routes::Filter::RequestHeaderModifier);
    }
    if let Some(redirect) = filter.request_redirect {
        return req_redirect(redirect).map(routes::Filter::RequestRedirect);
    }
    bail!("unsupported filter type {}", wire_name(&filter.r#type)?)
}

pub fn header_modifier(
    modifier: api::HTTPRouteRulesFiltersRequestHeaderModifier,
) -> Result<routes::HeaderModifierFilter> {
    let api::HTTPRouteRulesFiltersRequestHeaderModifier { add, remove, set } = modifier;
    Ok(routes::HeaderModifierFilter {
        add: add
            .into_iter()
            .flatten()
            .map(|header| Ok((header.name.parse()?, header.value.parse()?)))
            .collect::<Result<Vec<_>>>()?,
        set: set
            .into_iter()
            .flatten()
            .map(|header| Ok((header.name.parse()?, header.value.parse()?)))
            .collect::<Result<Vec<_>>>()?,
        remove: remove
            .into_iter()
            .flatten()
            .map(routes::HeaderName::try_from)
            .collect::<Result<_, _>>()?,
    })
}

pub fn req_redirect(
    redirect: api::HTTPRouteRulesFiltersRequestRedirect,
) -> Result<routes::RequestRedirectFilter> {
    if redirect.path.is_some() {
        bail!("redirect path modifiers are not supported");
    }

    let status = redirect
        .status_code
        .map(|code| -> Result<_> { Ok(routes::StatusCode::from_u16(u16::try_from(code)?)?) })
        .transpose()?;

    Ok(routes::RequestRedirectFilter {
        scheme: redirect
            .scheme
            .as_ref()
            .map(|s| -> Result<_> { Ok(routes::Scheme::try_from(wire_name(s)?.as_str())?) })
            .transpose()?,
        host: redirect.hostname,
        port: redirect
            .port
            .and_then(|p| u16::try_from(p).ok())
            .and_then(NonZeroU16::new),
        status,
    })
}
