//! Typographic punctuation the PDF base fonts cannot show.

/// Replacements applied to every rendered string.
const SUBSTITUTIONS: &[(char, &str)] = &[
    ('\u{2013}', "-"),   // en dash
    ('\u{2014}', "-"),   // em dash
    ('\u{201C}', "\""),  // left double quote
    ('\u{201D}', "\""),  // right double quote
    ('\u{2022}', "-"),   // bullet
    ('\u{2019}', "'"),   // right single quote
    ('\u{2018}', "'"),   // left single quote
    ('\u{2026}', "..."), // ellipsis
];

/// Replace typographic punctuation with plain ASCII equivalents.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match SUBSTITUTIONS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}
