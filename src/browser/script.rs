//! JavaScript snippets evaluated in the page by the Chromium backend.
//!
//! Every snippet is an IIFE returning JSON-serializable data. Values coming
//! from Rust are embedded as JSON literals so selectors and user input never
//! need manual escaping.

use super::{ClickMethod, Target};

/// Attribute used to hand a resolved element over to a CDP element handle.
pub const MARKER_ATTR: &str = "data-edel-target";

fn literal(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn optional_literal(value: Option<&str>) -> String {
    value.map(literal).unwrap_or_else(|| "null".to_string())
}

/// Wraps `body` with target resolution. `body` sees `found` (filtered
/// matches, document order) and `el` (the `nth` match or `null`).
pub fn with_target(target: &Target, body: &str) -> String {
    let (scope_css, scope_index) = match &target.scope {
        Some(scope) => (literal(&scope.css), scope.index),
        None => ("null".to_string(), 0),
    };

    format!(
        r#"(() => {{
    const scopeCss = {scope_css};
    const scopeIndex = {scope_index};
    const css = {css};
    const text = {text};
    let root = document;
    if (scopeCss !== null) {{
        root = document.querySelectorAll(scopeCss)[scopeIndex];
        if (!root) return null;
    }}
    const all = Array.from(root.querySelectorAll(css));
    const found = text === null
        ? all
        : all.filter(e => (e.innerText || e.textContent || '').includes(text));
    const el = found[{nth}] || null;
    {body}
}})()"#,
        css = literal(&target.css),
        text = optional_literal(target.text.as_deref()),
        nth = target.nth,
    )
}

pub fn count(target: &Target) -> String {
    with_target(target, "return found.length;")
}

pub fn is_enabled(target: &Target) -> String {
    with_target(target, "return el !== null && !el.disabled && el.getAttribute('aria-disabled') !== 'true';")
}

pub fn outer_html(target: &Target) -> String {
    with_target(target, "return el ? el.outerHTML : null;")
}

pub fn texts(css: &str, visible_only: bool) -> String {
    format!(
        r#"(() => {{
    const visible = e => !!(e.offsetWidth || e.offsetHeight || e.getClientRects().length);
    return Array.from(document.querySelectorAll({css}))
        .filter(e => !{visible_only} || visible(e))
        .map(e => e.textContent || '');
}})()"#,
        css = literal(css),
    )
}

/// Sets an input's value through the native setter so framework-managed
/// inputs observe the change.
pub fn fill(target: &Target, value: &str) -> String {
    let body = format!(
        r#"if (!el) return false;
    el.focus();
    const proto = Object.getPrototypeOf(el);
    const descriptor = Object.getOwnPropertyDescriptor(proto, 'value');
    if (descriptor && descriptor.set) {{ descriptor.set.call(el, {value}); }} else {{ el.value = {value}; }}
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
    return true;"#,
        value = literal(value)
    );
    with_target(target, &body)
}

/// Tags the resolved element with `token` so it can be fetched as a handle.
pub fn mark(target: &Target, token: &str) -> String {
    let body = format!(
        r#"if (!el) return false;
    el.scrollIntoView({{ block: 'center', inline: 'center' }});
    el.setAttribute('{MARKER_ATTR}', {token});
    return true;"#,
        token = literal(token)
    );
    with_target(target, &body)
}

pub fn unmark(token: &str) -> String {
    format!(
        "(() => {{ document.querySelectorAll({selector}).forEach(e => e.removeAttribute('{MARKER_ATTR}')); return true; }})()",
        selector = literal(&marker_selector(token))
    )
}

pub fn marker_selector(token: &str) -> String {
    format!("[{MARKER_ATTR}=\"{token}\"]")
}

/// Script-side click for the non-direct activation methods.
pub fn click(target: &Target, method: ClickMethod) -> String {
    let body = match method {
        ClickMethod::Direct | ClickMethod::Script => "if (!el) return false; el.click(); return true;",
        ClickMethod::Dispatch => {
            r#"if (!el) return false;
    el.dispatchEvent(new MouseEvent('click', { view: window, bubbles: true, cancelable: true }));
    return true;"#
        }
    };
    with_target(target, body)
}

/// Resolves once the document is complete and no new resources have been
/// requested for one second, or after `timeout_ms`.
pub fn network_idle(timeout_ms: u64) -> String {
    format!(
        r#"(async () => {{
    const timeoutMs = {timeout_ms};
    const idleMs = 1000;
    const interval = 250;
    const start = Date.now();
    const resources = () => {{
        try {{ return performance.getEntriesByType('resource').length; }} catch (_) {{ return 0; }}
    }};
    let last = resources();
    let stable = 0;
    while (Date.now() - start < timeoutMs) {{
        await new Promise(r => setTimeout(r, interval));
        const current = resources();
        if (document.readyState === 'complete' && current === last) {{
            stable += interval;
            if (stable >= idleMs) return true;
        }} else {{
            stable = 0;
        }}
        last = current;
    }}
    return false;
}})()"#
    )
}
