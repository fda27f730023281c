//! HTML output escaping.
//!
//! User-authored text is stored exactly as submitted and escaped when it leaves
//! the API, so the front end can drop it into `innerHTML` without it turning
//! into markup.

/// Escape the five HTML-significant characters.
///
/// `&` becomes `&amp;`, `<` becomes `&lt;`, `>` becomes `&gt;`, `"` becomes
/// `&quot;` and `'` becomes `&#039;`. Each input character is visited once, so
/// the entities produced here are never escaped a second time.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 8);
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// A response model whose user-authored text fields can be escaped.
///
/// Implementors escape only free text (titles, bodies, usernames); ids,
/// timestamps and server-generated paths pass through unchanged.
pub trait HtmlEscape {
    fn html_escaped(self) -> Self;
}

impl<T: HtmlEscape> HtmlEscape for Vec<T> {
    fn html_escaped(self) -> Self {
        self.into_iter().map(HtmlEscape::html_escaped).collect()
    }
}
