//! Escaping for text placed into the generated document.

/// Escapes `&`, `<`, `>`, `"` and `'` for HTML text and attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Makes serialized JSON safe to embed inside a `<script>` element.
///
/// `</` becomes `<\/`, which is the same string to a JSON parser but cannot
/// close the script block. `<!--` becomes `\u003c!--` for the same reason.
/// `<` only ever occurs inside JSON strings, so both rewrites are lossless.
#[must_use]
pub fn escape_script_json(json: &str) -> String {
    json.replace("</", "<\\/").replace("<!--", "\\u003c!--")
}
