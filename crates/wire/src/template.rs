//! Placeholder substitution for the baked-in SOAP message templates.
//!
//! Templates carry `{name}` markers; [`render`] replaces every occurrence
//! of each named marker with its value. Unknown markers are left in place
//! so a missing binding is visible in the rendered message rather than
//! silently dropped.

/// Render `template` by substituting each `{name}` marker from `vars`.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        let marker = format!("{{{name}}}");
        out = out.replace(&marker, value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::render;

    #[test]
    fn substitutes_each_marker() {
        let out = render("<id root=\"{oid}\" extension=\"{id}\"/>", &[("oid", "1.2.3"), ("id", "9999")]);
        assert_eq!(out, "<id root=\"1.2.3\" extension=\"9999\"/>");
    }

    #[test]
    fn repeated_markers_all_replaced() {
        let out = render("{a}-{a}-{a}", &[("a", "x")]);
        assert_eq!(out, "x-x-x");
    }

    #[test]
    fn unknown_markers_survive() {
        let out = render("{known} {unknown}", &[("known", "v")]);
        assert_eq!(out, "v {unknown}");
    }
}
