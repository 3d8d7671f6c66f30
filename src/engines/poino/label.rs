//! Parser for full-context label lines.
//!
//! Each line carries the center phoneme and three accent fields:
//! `prev^prev-center+next=next2/A:pos+asc+desc/...`, with `xx` meaning
//! "unavailable". Lines are grouped into accent phrases and every phoneme
//! receives a high/low accent.

use once_cell::sync::Lazy;
use regex::Regex;

use super::codec::PhoneticUnit;
use super::model::PoinoError;
use super::tables::{Accent, Phoneme};

static LABEL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?mi)^[a-z]+\^[a-z]+-(?P<phoneme>[a-z]+)\+[a-z]+=[a-z]+/A:(?P<pos>-*[0-9|a-z]+)\+(?P<asc>[0-9|a-z]+)\+(?P<desc>[0-9|a-z]+)",
    )
    .expect("label pattern is valid")
});

/// Minimum number of matched lines, including the leading and trailing
/// silence the analyzer always emits.
const MIN_MATCHED_LINES: usize = 3;

/// Running ascending/descending counts assumed before the first line.
const SEED_ACCENT_ASC: i32 = 2;
const SEED_ACCENT_DESC: i32 = 1;

#[derive(Debug, Clone, PartialEq)]
struct LabelLine {
    symbol: String,
    accent_pos: Option<i32>,
    accent_asc: Option<i32>,
    accent_desc: Option<i32>,
}

/// Parse label text into accented phonemes (lengths unset).
pub fn parse_labels(label: &str) -> Result<Vec<PhoneticUnit>, PoinoError> {
    let lines = match_lines(label)?;
    let groups = group_accent_phrases(&lines[1..lines.len() - 1]);

    Ok(groups.iter().flat_map(|group| accent_group(group)).collect())
}

fn match_lines(label: &str) -> Result<Vec<LabelLine>, PoinoError> {
    let lines = LABEL_PATTERN
        .captures_iter(label)
        .map(|caps| {
            Ok(LabelLine {
                symbol: caps["phoneme"].to_string(),
                accent_pos: parse_field(&caps["pos"])?,
                accent_asc: parse_field(&caps["asc"])?,
                accent_desc: parse_field(&caps["desc"])?,
            })
        })
        .collect::<Result<Vec<_>, PoinoError>>()?;

    if lines.len() < MIN_MATCHED_LINES {
        return Err(PoinoError::MalformedLabel(format!(
            "expected at least {MIN_MATCHED_LINES} label lines, matched {}",
            lines.len()
        )));
    }

    Ok(lines)
}

fn parse_field(raw: &str) -> Result<Option<i32>, PoinoError> {
    if raw == "xx" {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| PoinoError::MalformedLabel(format!("invalid accent field {raw:?}")))
}

/// Split lines into accent phrases. A phrase starts whenever the counts are
/// unavailable, the ascending count drops, or the descending count rises.
fn group_accent_phrases(lines: &[LabelLine]) -> Vec<Vec<&LabelLine>> {
    let mut groups: Vec<Vec<&LabelLine>> = Vec::new();
    let mut prev_asc = SEED_ACCENT_ASC;
    let mut prev_desc = SEED_ACCENT_DESC;

    for line in lines {
        let boundary = match (line.accent_asc, line.accent_desc) {
            (Some(asc), Some(desc)) => prev_asc > asc || prev_desc < desc,
            _ => true,
        };

        match groups.last_mut() {
            Some(group) if !boundary => group.push(line),
            _ => groups.push(vec![line]),
        }

        prev_asc = line.accent_asc.unwrap_or(SEED_ACCENT_ASC);
        prev_desc = line.accent_desc.unwrap_or(SEED_ACCENT_DESC);
    }

    groups
}

/// Accent per distinct accent position of a phrase, in encounter order.
pub fn resolve_accents(distinct: &[Option<i32>]) -> Vec<Accent> {
    let n = distinct.len();

    if distinct.contains(&None) {
        return vec![Accent::Low; n];
    }

    match distinct.iter().position(|&p| p == Some(0)) {
        Some(0) => std::iter::once(Accent::High)
            .chain(std::iter::repeat(Accent::Low).take(n - 1))
            .collect(),
        Some(index) => std::iter::once(Accent::Low)
            .chain(std::iter::repeat(Accent::High).take(index))
            .chain(std::iter::repeat(Accent::Low).take(n - index - 1))
            .collect(),
        None => vec![Accent::Low; n],
    }
}

fn accent_group(group: &[&LabelLine]) -> Vec<PhoneticUnit> {
    let mut distinct = Vec::new();
    for line in group {
        if !distinct.contains(&line.accent_pos) {
            distinct.push(line.accent_pos);
        }
    }

    let mut accents = resolve_accents(&distinct).into_iter();
    let mut current = Accent::Low;
    let mut prev_pos: Option<Option<i32>> = None;

    group
        .iter()
        .map(|line| {
            let changed = match prev_pos {
                Some(prev) => prev != line.accent_pos || line.accent_pos.is_none(),
                None => true,
            };
            if changed {
                current = accents.next().unwrap_or(Accent::Low);
            }
            prev_pos = Some(line.accent_pos);

            PhoneticUnit::new(Phoneme::from_label_symbol(&line.symbol), current)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(symbol: &str, fields: (&str, &str, &str)) -> String {
        format!(
            "xx^xx-{symbol}+xx=xx/A:{}+{}+{}/B:xx-xx_xx/C:xx_xx+xx",
            fields.0, fields.1, fields.2
        )
    }

    fn label(body: &[(&str, (&str, &str, &str))]) -> String {
        let mut lines = vec![line("sil", ("xx", "xx", "xx"))];
        lines.extend(body.iter().map(|(s, f)| line(s, *f)));
        lines.push(line("sil", ("xx", "xx", "xx")));
        lines.join("\n")
    }

    fn accents(units: &[PhoneticUnit]) -> Vec<Accent> {
        units.iter().map(|u| u.accent).collect()
    }

    #[test]
    fn single_mora_type_zero_is_high() {
        assert_eq!(resolve_accents(&[Some(0)]), vec![Accent::High]);
    }

    #[test]
    fn nucleus_at_index_two_rises_then_falls() {
        assert_eq!(
            resolve_accents(&[Some(-2), Some(-1), Some(0), Some(1)]),
            vec![Accent::Low, Accent::High, Accent::High, Accent::Low]
        );
    }

    #[test]
    fn unavailable_or_missing_nucleus_is_all_low() {
        assert_eq!(resolve_accents(&[None, Some(0)]), vec![Accent::Low; 2]);
        assert_eq!(resolve_accents(&[Some(1), Some(2)]), vec![Accent::Low; 2]);
    }

    #[test]
    fn parses_single_vowel() {
        let units = parse_labels(&label(&[("a", ("0", "1", "1"))])).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].phoneme, Phoneme::A);
        assert_eq!(units[0].accent, Accent::High);
        assert_eq!(units[0].length, None);
    }

    #[test]
    fn phonemes_of_one_mora_share_its_accent() {
        // "hashi" with the nucleus on the first mora.
        let units = parse_labels(&label(&[
            ("h", ("0", "1", "2")),
            ("a", ("0", "1", "2")),
            ("sh", ("1", "2", "1")),
            ("i", ("1", "2", "1")),
        ]))
        .unwrap();
        assert_eq!(
            accents(&units),
            vec![Accent::High, Accent::High, Accent::Low, Accent::Low]
        );
    }

    #[test]
    fn ascending_drop_starts_a_new_phrase() {
        // One phrase: positions [2, -1, 0] put the nucleus at index 2.
        let units = parse_labels(&label(&[
            ("a", ("2", "1", "3")),
            ("i", ("-1", "2", "2")),
            ("u", ("0", "3", "1")),
        ]))
        .unwrap();
        assert_eq!(
            accents(&units),
            vec![Accent::Low, Accent::High, Accent::High]
        );

        // The ascending count restarts at "i", so "i u" form their own phrase.
        let units = parse_labels(&label(&[
            ("a", ("2", "2", "3")),
            ("i", ("-1", "1", "2")),
            ("u", ("0", "2", "1")),
        ]))
        .unwrap();
        assert_eq!(
            accents(&units),
            vec![Accent::Low, Accent::Low, Accent::High]
        );
    }

    #[test]
    fn pause_is_low_and_splits_phrases() {
        let units = parse_labels(&label(&[
            ("a", ("0", "1", "1")),
            ("pau", ("xx", "xx", "xx")),
            ("o", ("0", "1", "1")),
        ]))
        .unwrap();
        assert_eq!(units[1].phoneme, Phoneme::Pau);
        assert_eq!(
            accents(&units),
            vec![Accent::High, Accent::Low, Accent::High]
        );
    }

    #[test]
    fn keeps_moraic_nasal_and_lowercases_devoiced_vowels() {
        let units = parse_labels(&label(&[
            ("N", ("0", "1", "2")),
            ("U", ("1", "2", "1")),
        ]))
        .unwrap();
        assert_eq!(units[0].phoneme, Phoneme::MoraicN);
        assert_eq!(units[1].phoneme, Phoneme::U);
    }

    #[test]
    fn unknown_symbols_become_silence() {
        let units = parse_labels(&label(&[("qq", ("0", "1", "1"))])).unwrap();
        assert_eq!(units[0].phoneme, Phoneme::Sil);
    }

    #[test]
    fn too_few_lines_is_malformed() {
        let text = [line("sil", ("xx", "xx", "xx")), line("sil", ("xx", "xx", "xx"))].join("\n");
        assert!(matches!(
            parse_labels(&text),
            Err(PoinoError::MalformedLabel(_))
        ));
        assert!(matches!(
            parse_labels("not a label"),
            Err(PoinoError::MalformedLabel(_))
        ));
    }

    #[test]
    fn invalid_numeric_field_is_malformed() {
        let text = label(&[("a", ("1a", "1", "1"))]);
        assert!(matches!(
            parse_labels(&text),
            Err(PoinoError::MalformedLabel(_))
        ));
    }
}
