//! Chord symbol formatting.
//!
//! Turns chord text such as `F#min11` or `1/b2min7` into display form,
//! either as HTML or as plain Unicode for the terminal preview.

use once_cell::sync::Lazy;
use regex::Regex;

/// Letter root with optional accidental, or a scale degree with an
/// optional leading accidental.
static ROOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[A-G][#b]?|[#b]?[1-7])").expect("chord root pattern"));

/// Output flavour for [`format_chord_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordMarkup {
    Html,
    Plain,
}

/// Quality tokens, longest first so `halfdim` wins over `dim` and `maj`/`min` over `m`.
const QUALITIES: &[(&str, &str, &str)] = &[
    ("halfdim", "<sup>ø</sup>", "ø"),
    ("maj", "△", "△"),
    ("min", "<small>m</small>", "m"),
    ("dim", "<sup>o</sup>", "°"),
    ("aug", "+", "+"),
    ("sus", "ˢᵘˢ", "ˢᵘˢ"),
    ("m", "<small>m</small>", "m"),
];

/// Format a chord for HTML.
pub fn format_chord(chord: &str) -> String {
    format_chord_with(chord, ChordMarkup::Html)
}

/// Format a chord for the terminal.
pub fn format_chord_plain(chord: &str) -> String {
    format_chord_with(chord, ChordMarkup::Plain)
}

pub fn format_chord_with(chord: &str, markup: ChordMarkup) -> String {
    let mut out = String::with_capacity(chord.len() * 2);
    let (main, bass) = match chord.split_once('/') {
        Some((main, bass)) => (main, Some(bass)),
        None => (chord, None),
    };
    push_part(&mut out, main, markup, true);
    if let Some(bass) = bass {
        match markup {
            ChordMarkup::Html => {
                out.push_str("<span class=\"over\">/");
                push_part(&mut out, bass, markup, false);
                out.push_str("</span>");
            }
            ChordMarkup::Plain => {
                out.push('/');
                push_part(&mut out, bass, markup, false);
            }
        }
    }
    out
}

fn push_part(out: &mut String, part: &str, markup: ChordMarkup, superscript: bool) {
    let root_len = ROOT.find(part).map_or(0, |m| m.end());
    for ch in part[..root_len].chars() {
        out.push(accidental(ch));
    }
    push_quality(out, &part[root_len..], markup, superscript);
}

fn push_quality(out: &mut String, mut rest: &str, markup: ChordMarkup, superscript: bool) {
    while let Some(ch) = rest.chars().next() {
        if ch == '('
            && let Some(close) = rest.find(')')
        {
            let inner = &rest[1..close];
            match markup {
                ChordMarkup::Html => {
                    out.push_str("<small>(");
                    push_quality(out, inner, markup, superscript);
                    out.push_str(")</small>");
                }
                ChordMarkup::Plain => {
                    out.push('(');
                    push_quality(out, inner, markup, superscript);
                    out.push(')');
                }
            }
            rest = &rest[close + 1..];
            continue;
        }

        if let Some((token, html, plain)) = QUALITIES
            .iter()
            .find(|(token, _, _)| starts_with_ignore_case(rest, token))
        {
            out.push_str(match markup {
                ChordMarkup::Html => html,
                ChordMarkup::Plain => plain,
            });
            rest = &rest[token.len()..];
            continue;
        }

        match ch {
            '0'..='9' if superscript => out.push(superscript_digit(ch)),
            '#' | 'b' => out.push(accidental(ch)),
            '<' if markup == ChordMarkup::Html => out.push_str("&lt;"),
            '>' if markup == ChordMarkup::Html => out.push_str("&gt;"),
            '&' if markup == ChordMarkup::Html => out.push_str("&amp;"),
            '"' if markup == ChordMarkup::Html => out.push_str("&quot;"),
            _ => out.push(ch),
        }
        rest = &rest[ch.len_utf8()..];
    }
}

/// Word tokens match case-insensitively; a bare `m` does not, so `M7` stays major.
fn starts_with_ignore_case(haystack: &str, token: &str) -> bool {
    if token.len() == 1 {
        return haystack.starts_with(token);
    }
    haystack
        .get(..token.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(token))
}

const fn accidental(ch: char) -> char {
    match ch {
        '#' => '♯',
        'b' => '♭',
        other => other,
    }
}

const fn superscript_digit(ch: char) -> char {
    match ch {
        '0' => '⁰',
        '1' => '¹',
        '2' => '²',
        '3' => '³',
        '4' => '⁴',
        '5' => '⁵',
        '6' => '⁶',
        '7' => '⁷',
        '8' => '⁸',
        '9' => '⁹',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_chord_table() {
        let cases = [
            ("A", "A"),
            ("Bb", "B♭"),
            ("F#", "F♯"),
            ("Cmaj7", "C△⁷"),
            ("Bbmaj7", "B♭△⁷"),
            ("Cm", "C<small>m</small>"),
            ("F#min11", "F♯<small>m</small>¹¹"),
            ("Ehalfdim7", "E<sup>ø</sup>⁷"),
            ("Bdim", "B<sup>o</sup>"),
            ("Gaug", "G+"),
            ("Dsus4", "Dˢᵘˢ⁴"),
            ("1sus4", "1ˢᵘˢ⁴"),
            ("b3", "♭3"),
            ("#4m7", "♯4<small>m</small>⁷"),
            ("G7b9", "G⁷♭⁹"),
            ("Amaj7(#11)", "A△⁷<small>(♯¹¹)</small>"),
            ("1/2maj7", "1<span class=\"over\">/2△7</span>"),
            ("1/b2min7", "1<span class=\"over\">/♭2<small>m</small>7</span>"),
            ("C/E", "C<span class=\"over\">/E</span>"),
        ];
        for (input, expected) in cases {
            assert_eq!(format_chord(input), expected, "formatting {input}");
        }
    }

    #[test]
    fn test_capital_m_is_not_minor() {
        assert_eq!(format_chord("CM7"), "CM⁷");
        assert_eq!(format_chord("CMaj7"), "C△⁷");
    }

    #[test]
    fn test_empty_chord_formats_to_empty() {
        assert_eq!(format_chord(""), "");
    }

    #[test]
    fn test_plain_markup_has_no_tags() {
        assert_eq!(format_chord_plain("F#min11"), "F♯m¹¹");
        assert_eq!(format_chord_plain("Bdim7"), "B°⁷");
        assert_eq!(format_chord_plain("1/b2min7"), "1/♭2m7");
        assert_eq!(format_chord_plain("Amaj7(#11)"), "A△⁷(♯¹¹)");
    }

    #[test]
    fn test_html_special_characters_are_escaped() {
        assert_eq!(format_chord("A<b>"), "A&lt;♭&gt;");
    }

    #[test]
    fn test_unclosed_parenthesis_is_kept_literally() {
        assert_eq!(format_chord("C7(b9"), "C⁷(♭⁹");
    }
}
