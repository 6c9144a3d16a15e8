//! Prints a [`Song`] back to canonical lesheet source.

use std::fmt::Write;

use super::types::{Bar, Chord, Line, Song};

pub fn print_song(song: &Song) -> String {
    let mut out = String::new();
    if !song.front_matter.is_empty() {
        out.push_str("---\n");
        for (key, value) in song.front_matter.iter() {
            let _ = writeln!(out, "{key}: {value}");
        }
        out.push_str("---\n");
    }

    // The first section is the implicit one and has no header.
    for (index, section) in song.sections.iter().enumerate() {
        if index > 0 {
            let marker = if section.page_break { "#-" } else { "#" };
            let _ = write!(out, "\n{marker} {}\n\n", section.name);
        }
        for line in &section.lines {
            print_line(&mut out, line);
            out.push('\n');
        }
    }
    out
}

fn print_line(out: &mut String, line: &Line) {
    if line.is_multiline() {
        out.push_str("```\n");
        out.push_str(&line.multiline_backtick.value);
        out.push_str("```\n");
        return;
    }
    for (index, bar) in line.bars.iter().enumerate() {
        let next = line.bars.get(index + 1);
        print_bar(out, bar);
        if bar.repeat_end {
            out.push_str(" :||");
        } else if bar.double_bar_end {
            out.push_str(" ||");
        } else if next.is_some_and(|next| !next.repeat_start) {
            out.push_str(" |");
        }
        if next.is_some() {
            out.push(' ');
        }
    }
}

fn print_bar(out: &mut String, bar: &Bar) {
    // An annotation on an empty chord binds to the next chord when reparsed
    // unless a non-chord token sits between them. A bar note serves as that
    // token: the real note fills the last such gap and `""` fills the others.
    let gaps: Vec<usize> = bar
        .chords
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| is_dangling(&pair[0]) && pair[1].annotation.is_none())
        .map(|(index, _)| index)
        .collect();

    let mut parts = Vec::new();
    if bar.repeat_start {
        parts.push("||:".to_string());
    }
    if !bar.bar_note.is_empty() && gaps.is_empty() {
        parts.push(format!("\"{}\"", bar.bar_note));
    }
    for (index, chord) in bar.chords.iter().enumerate() {
        match &chord.annotation {
            Some(annotation) => parts.push(format!("!{}!{}", annotation.value, chord.value)),
            None => parts.push(chord.value.clone()),
        }
        if gaps.last() == Some(&index) {
            parts.push(format!("\"{}\"", bar.bar_note));
        } else if gaps.contains(&index) {
            parts.push("\"\"".to_string());
        }
    }
    if !bar.backtick.value.is_empty() {
        parts.push(format!("`{}`", bar.backtick.value));
    }
    out.push_str(&parts.join(" "));
}

fn is_dangling(chord: &Chord) -> bool {
    chord.value.is_empty() && chord.annotation.is_some()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::sheet::parse;

    fn reprint(input: &str) -> String {
        print_song(&parse(input).unwrap())
    }

    #[test]
    fn test_front_matter_prints_as_written() {
        let input = "---\nsome: value\nsome other: diffvalue\n---\n";
        assert_eq!(reprint(input), input);
    }

    #[test]
    fn test_section_header() {
        assert_eq!(reprint("\n# section\n\n"), "\n# section\n\n");
        assert_eq!(reprint("#- bridge\nA"), "\n#- bridge\n\nA\n");
    }

    #[test]
    fn test_single_line() {
        assert_eq!(reprint("A | Bmaj7\n"), "A | Bmaj7\n");
    }

    #[test]
    fn test_two_lines_with_annotation() {
        let input = "A | Bmaj7\nD7(b13) | !annotation!F\n";
        assert_eq!(reprint(input), input);
    }

    #[test]
    fn test_backtick_bar() {
        assert_eq!(reprint("A | `backtick`\n"), "A | `backtick`\n");
    }

    #[test]
    fn test_multiline_backtick() {
        let input = "```\nsomething\n```\n\n";
        assert_eq!(reprint(input), input);
    }

    #[test]
    fn test_repeats_and_double_bars() {
        assert_eq!(reprint("||: A :|| B |"), "||: A :|| B\n");
        assert_eq!(reprint("A ||: B | C ||"), "A ||: B | C ||\n");
    }

    #[test]
    fn test_bar_note_and_chords_share_a_bar() {
        assert_eq!(reprint("\"fill\" A  G | B"), "\"fill\" A G | B\n");
    }

    #[test]
    fn test_dangling_annotation_before_note_stays_on_empty_chord() {
        let song = parse("!fermata! \"note\" C").unwrap();
        let printed = print_song(&song);
        assert_eq!(printed, "!fermata! \"note\" C\n");
        assert_eq!(parse(&printed).unwrap(), song);
    }

    #[test]
    fn test_dangling_annotation_before_backtick_stays_on_empty_chord() {
        let song = parse("!fermata! `abc` C").unwrap();
        let printed = print_song(&song);
        assert_eq!(printed, "!fermata! \"\" C `abc`\n");
        assert_eq!(parse(&printed).unwrap(), song);
    }

    #[test]
    fn test_two_dangling_annotations_keep_the_real_note_last() {
        let song = parse("!a! \"x\" C !b! \"y\" D").unwrap();
        assert_eq!(song.sections[0].lines[0].bars[0].bar_note, "y");
        let printed = print_song(&song);
        assert_eq!(printed, "!a! \"\" C !b! \"y\" D\n");
        assert_eq!(parse(&printed).unwrap(), song);
    }

    #[test]
    fn test_reparse_of_printed_song_is_identical() {
        let input = "---\ntitle: Song\nL: 1/8\n---\n\
                     # Intro\n||: !push!C G/B \"x\" | Am `ab` :||\n\
                     #- Out\n```\nX:1\nCDE|\n```\nF || G\n";
        let song = parse(input).unwrap();
        let printed = print_song(&song);
        assert_eq!(parse(&printed).unwrap(), song);
    }

    #[derive(Debug, Clone)]
    enum BarPart {
        Chord(Option<&'static str>, &'static str),
        Dangling(&'static str),
        Note(String),
        Backtick(String),
    }

    fn bar_part() -> impl Strategy<Value = BarPart> {
        let chord = prop::sample::select(vec!["A", "Bbmaj7", "C#m7", "1/3", "G7(b9)", "Dsus4"]);
        let annotation = prop::sample::select(vec!["push", "hold", "fermata"]);
        prop_oneof![
            3 => (prop::option::of(annotation.clone()), chord)
                .prop_map(|(annotation, chord)| BarPart::Chord(annotation, chord)),
            1 => annotation.prop_map(BarPart::Dangling),
            1 => "[a-z]{1,6}".prop_map(BarPart::Note),
            1 => "[a-g]{1,6}".prop_map(BarPart::Backtick),
        ]
    }

    fn bar_source() -> impl Strategy<Value = String> {
        prop::collection::vec(bar_part(), 0..5).prop_map(|parts| {
            // Each backtick takes a fresh id, so a bar keeps at most one.
            let mut seen_backtick = false;
            parts
                .into_iter()
                .filter(|part| match part {
                    BarPart::Backtick(_) => !std::mem::replace(&mut seen_backtick, true),
                    _ => true,
                })
                .map(|part| match part {
                    BarPart::Chord(Some(a), chord) => format!("!{a}!{chord}"),
                    BarPart::Chord(None, chord) => chord.to_string(),
                    BarPart::Dangling(a) => format!("!{a}!"),
                    BarPart::Note(note) => format!("\"{note}\""),
                    BarPart::Backtick(abc) => format!("`{abc}`"),
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
    }

    fn line_source() -> impl Strategy<Value = String> {
        let separator = prop::sample::select(vec![" | ", " || ", " :|| ", " ||: "]);
        prop::collection::vec((bar_source(), separator), 1..5).prop_map(|bars| {
            bars.into_iter()
                .map(|(bar, sep)| format!("{bar}{sep}"))
                .collect::<String>()
        })
    }

    proptest! {
        #[test]
        fn prop_print_then_parse_is_identity(
            lines in prop::collection::vec(line_source(), 0..4),
            header in prop::option::of("[A-Za-z]{1,8}"),
        ) {
            let mut source = lines.join("\n");
            if let Some(header) = header {
                source = format!("{source}\n# {header}\n{source}");
            }
            let song = parse(&source).unwrap();
            let printed = print_song(&song);
            prop_assert_eq!(parse(&printed).unwrap(), song);
        }
    }
}
