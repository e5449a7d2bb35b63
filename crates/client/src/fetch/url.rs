//! URL helpers shared by the site adapters.

use fora_core::Error;

/// Remove every `name=...` pair from the query string of `input`.
///
/// Pairs may be separated by `&` or by `;` (SMF writes both). The remaining
/// pairs keep their order and raw encoding; an emptied query is dropped
/// entirely and the fragment is preserved. Input that does not parse as an
/// absolute URL is returned unchanged.
pub fn strip_query_param(input: &str, name: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(input) else {
        return input.to_string();
    };

    let Some(query) = parsed.query() else {
        return parsed.to_string();
    };

    let kept: String = query
        .split_inclusive(['&', ';'])
        .filter(|pair| pair.trim_end_matches(['&', ';']).split('=').next() != Some(name))
        .collect();
    let kept = kept.trim_end_matches(['&', ';']).to_string();

    parsed.set_query(if kept.is_empty() { None } else { Some(&kept) });
    parsed.to_string()
}

/// Whether `a` and `b` belong to the same site: hosts compared without
/// scheme and without a leading `www.` or `m.` label. Input without a scheme
/// is read as `https://`.
pub fn same_site(a: &str, b: &str) -> bool {
    site_of(a) == site_of(b)
}

fn site_of(input: &str) -> Option<String> {
    let parsed = url::Url::parse(input).or_else(|_| url::Url::parse(&format!("https://{input}"))).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").or_else(|| host.strip_prefix("m.")).unwrap_or(host);
    Some(host.to_ascii_lowercase())
}

/// Resolve `href` against `base`, the way a browser follows a link.
pub fn join(base: &str, href: &str) -> Result<String, Error> {
    let base = url::Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{}: {}", base, e)))?;
    let joined = base.join(href.trim()).map_err(|e| Error::InvalidUrl(format!("{}: {}", href, e)))?;
    Ok(joined.to_string())
}
