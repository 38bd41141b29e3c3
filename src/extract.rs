// Vacancy extraction from AFPESP reservation pages
// Turns the raw search capture into per-hotel room records

use std::collections::HashSet;

// Message the reservation site shows when nothing is bookable
pub const NO_ROOM_SENTINEL: &str = "No período escolhido não há nenhum quarto disponível";

pub const UNKNOWN_HOTEL: &str = "Unknown Hotel";

// Each hotel block on the page opens with this title div
const SECTION_MARKER: &str = "<div class=\"cc_tit\">";

// Cleaned fragments shorter than this are markup noise, not rooms
const MIN_MATCH_LEN: usize = 10;

// One bookable room: its hotel, the room description, and the combined line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VacancyRecord {
    pub hotel: String,
    pub description: String,
    pub full_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub records: Vec<VacancyRecord>,
    pub saw_sentinel: bool,
}

// Known room labels, with their optional qualifier word
struct RoomPattern {
    words: &'static [&'static str],
    qualifier: Option<&'static str>,
}

const ROOM_PATTERNS: &[RoomPattern] = &[
    RoomPattern { words: &["BLUES", "Luxo"], qualifier: None },
    RoomPattern { words: &["Triplo"], qualifier: Some("Luxo") },
    RoomPattern { words: &["Duplo"], qualifier: None },
    RoomPattern { words: &["Apartamento"], qualifier: Some("PcD") },
    RoomPattern { words: &["Chalé"], qualifier: None },
    RoomPattern { words: &["Homem", "de", "Melo"], qualifier: None },
    RoomPattern { words: &["Perdizes"], qualifier: None },
    RoomPattern { words: &["Sumaré"], qualifier: None },
];

// Words that may close an unlisted room name, after its lowercase run
const GENERAL_SUFFIXES: &[&str] = &["Luxo", "PcD", "Melo"];

#[derive(Debug, Clone, Copy, Default)]
pub struct VacancyExtractor;

impl VacancyExtractor {
    pub fn new() -> Self {
        Self
    }

    // Scans the capture section by section. Sections carrying the no-room
    // message are skipped; duplicated room lines are reported once.
    pub fn extract(&self, content: &str) -> Extraction {
        let saw_sentinel = contains_sentinel(content);
        let mut records = Vec::new();
        let mut seen = HashSet::new();

        for section in split_sections(content) {
            if contains_sentinel(section) {
                continue;
            }
            let hotel = section_hotel_name(section);
            for (start, end) in section_candidates(section) {
                let description = clean_fragment(&section[start..end]);
                if description.len() < MIN_MATCH_LEN {
                    continue;
                }
                let full_text = format!("{}: {}", hotel, description);
                if seen.insert(full_text.clone()) {
                    records.push(VacancyRecord {
                        hotel: hotel.clone(),
                        description,
                        full_text,
                    });
                }
            }
        }

        Extraction { records, saw_sentinel }
    }
}

fn contains_sentinel(text: &str) -> bool {
    text.to_lowercase().contains(&NO_ROOM_SENTINEL.to_lowercase())
}

// Byte offsets of every section marker, matched case-insensitively
fn section_starts(content: &str) -> Vec<usize> {
    let lowered = content.to_ascii_lowercase();
    let mut starts = Vec::new();
    let mut from = 0;
    while let Some(found) = lowered[from..].find(SECTION_MARKER) {
        let at = from + found;
        starts.push(at);
        from = at + SECTION_MARKER.len();
    }
    starts
}

// Section text runs from just after a marker to the next marker
fn split_sections(content: &str) -> Vec<&str> {
    let starts = section_starts(content);
    let mut sections = Vec::with_capacity(starts.len());
    for (i, &at) in starts.iter().enumerate() {
        let begin = at + SECTION_MARKER.len();
        let end = starts.get(i + 1).copied().unwrap_or(content.len());
        sections.push(&content[begin..end]);
    }
    sections
}

// The hotel name is the section text up to the first tag
fn section_hotel_name(section: &str) -> String {
    let name = section
        .find('<')
        .map(|at| section[..at].trim())
        .filter(|name| !name.is_empty());
    match name {
        Some(name) => name.to_string(),
        None => UNKNOWN_HOTEL.to_string(),
    }
}

// Strips markup, collapses whitespace runs and trims
fn clean_fragment(raw: &str) -> String {
    let mut no_tags = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(open) = rest.find('<') {
        match rest[open..].find('>') {
            Some(close) => {
                no_tags.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    no_tags.push_str(rest);

    let mut cleaned = String::with_capacity(no_tags.len());
    let mut prev_space = false;
    for ch in no_tags.chars() {
        if ch.is_whitespace() {
            if !prev_space && !cleaned.is_empty() {
                cleaned.push(' ');
            }
            prev_space = true;
        } else {
            cleaned.push(ch);
            prev_space = false;
        }
    }
    if cleaned.ends_with(' ') {
        cleaned.pop();
    }
    cleaned
}

// All pattern matches in a section, longest kept when spans nest
fn section_candidates(section: &str) -> Vec<(usize, usize)> {
    let mut candidates = Vec::new();
    for pattern in ROOM_PATTERNS {
        candidates.extend(pattern_spans(section, |text, at| {
            match_room_at(text, at, pattern)
        }));
    }
    candidates.extend(pattern_spans(section, match_general_at));

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
    let mut kept: Vec<(usize, usize)> = Vec::new();
    for span in candidates {
        let contained = kept.iter().any(|outer| outer.0 <= span.0 && span.1 <= outer.1);
        if !contained {
            kept.push(span);
        }
    }
    kept
}

// Non-overlapping matches of one matcher, scanning left to right
fn pattern_spans<F>(section: &str, matcher: F) -> Vec<(usize, usize)>
where
    F: Fn(&str, usize) -> Option<usize>,
{
    let mut spans = Vec::new();
    let mut at = 0;
    while at < section.len() {
        match matcher(section, at) {
            Some(end) if end > at => {
                spans.push((at, end));
                at = end;
            }
            _ => {
                at += char_at(section, at).map(char::len_utf8).unwrap_or(1);
            }
        }
    }
    spans
}

// Label words, optional qualifier, capacity, then any date lines
fn match_room_at(text: &str, pos: usize, pattern: &RoomPattern) -> Option<usize> {
    let mut at = pos;
    for (i, word) in pattern.words.iter().enumerate() {
        if i > 0 {
            at = eat_ws1(text, at)?;
        }
        at = eat_literal_ci(text, at, word)?;
    }
    if let Some(qualifier) = pattern.qualifier {
        if let Some(after) = eat_ws1(text, at).and_then(|at| eat_literal_ci(text, at, qualifier)) {
            at = after;
        }
    }
    let at = eat_ws(text, at);
    let at = eat_capacity(text, at)?;
    Some(eat_date_lines(text, at))
}

// Capitalized word run, optional suffix, capacity, then at least one date line
fn match_general_at(text: &str, pos: usize) -> Option<usize> {
    let first = char_at(text, pos).filter(|ch| is_upper_start(*ch))?;
    let mut at = pos + first.len_utf8();
    let body = at;
    while let Some(ch) = char_at(text, at) {
        if !is_name_body(ch) {
            break;
        }
        at += ch.len_utf8();
    }
    if at == body {
        return None;
    }
    let at = GENERAL_SUFFIXES
        .iter()
        .find_map(|suffix| eat_literal_ci(text, at, suffix))
        .unwrap_or(at);
    let at = eat_ws(text, at);
    let at = eat_capacity(text, at)?;
    let first_line = eat_ws(text, at);
    let end = eat_date_line(text, first_line)?;
    Some(eat_date_lines(text, end))
}

fn is_upper_start(ch: char) -> bool {
    ch.is_ascii_uppercase() || "ÀÁÂÃÄÇÉÊËÍÎÏÑÓÔÕÖÚÛÜÝ".contains(ch)
}

fn is_name_body(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_whitespace() || "àáâãäçéêëíîïñóôõöúûüý".contains(ch)
}

// "(até N pessoas)"
fn eat_capacity(text: &str, pos: usize) -> Option<usize> {
    let at = eat_literal_ci(text, pos, "(até")?;
    let at = eat_ws1(text, at)?;
    let at = eat_digits(text, at, usize::MAX)?;
    let at = eat_ws1(text, at)?;
    let at = eat_literal_ci(text, at, "pessoa")?;
    let at = eat_literal_ci(text, at, "s").unwrap_or(at);
    eat_literal_ci(text, at, ")")
}

// "D/M - D/M (N dias livres) - N Quarto(s)" with an optional adapted-room tail
fn eat_date_line(text: &str, pos: usize) -> Option<usize> {
    let at = eat_day_month(text, pos)?;
    let at = eat_ws(text, at);
    let at = eat_literal_ci(text, at, "-")?;
    let at = eat_ws(text, at);
    let at = eat_day_month(text, at)?;
    let at = eat_ws(text, at);
    let at = eat_literal_ci(text, at, "(")?;
    let at = eat_digits(text, at, usize::MAX)?;
    let at = eat_ws1(text, at)?;
    let at = eat_literal_ci(text, at, "dia")?;
    let at = eat_literal_ci(text, at, "s").unwrap_or(at);
    let at = eat_ws1(text, at)?;
    let at = eat_literal_ci(text, at, "livre")?;
    let at = eat_literal_ci(text, at, "s").unwrap_or(at);
    let at = eat_literal_ci(text, at, ")")?;
    let at = eat_ws(text, at);
    let at = eat_literal_ci(text, at, "-")?;
    let at = eat_ws(text, at);
    let at = eat_digits(text, at, usize::MAX)?;
    let at = eat_ws1(text, at)?;
    let at = eat_literal_ci(text, at, "Quarto(s)")?;
    Some(eat_adaptado(text, at).unwrap_or(at))
}

fn eat_adaptado(text: &str, pos: usize) -> Option<usize> {
    let at = eat_ws(text, pos);
    let at = eat_literal_ci(text, at, "-")?;
    let at = eat_ws(text, at);
    eat_literal_ci(text, at, "adaptado")
}

// Greedily absorbs consecutive date lines separated by whitespace
fn eat_date_lines(text: &str, pos: usize) -> usize {
    let mut at = pos;
    loop {
        let from = eat_ws(text, at);
        match eat_date_line(text, from) {
            Some(end) => at = end,
            None => break,
        }
    }
    at
}

fn eat_day_month(text: &str, pos: usize) -> Option<usize> {
    let at = eat_digits(text, pos, 2)?;
    let at = eat_literal_ci(text, at, "/")?;
    eat_digits(text, at, 2)
}

fn char_at(text: &str, pos: usize) -> Option<char> {
    text.get(pos..).and_then(|rest| rest.chars().next())
}

fn eq_ci(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn eat_literal_ci(text: &str, pos: usize, literal: &str) -> Option<usize> {
    let mut at = pos;
    for expected in literal.chars() {
        let got = char_at(text, at)?;
        if !eq_ci(got, expected) {
            return None;
        }
        at += got.len_utf8();
    }
    Some(at)
}

fn eat_ws(text: &str, pos: usize) -> usize {
    let mut at = pos;
    while let Some(ch) = char_at(text, at) {
        if !ch.is_whitespace() {
            break;
        }
        at += ch.len_utf8();
    }
    at
}

fn eat_ws1(text: &str, pos: usize) -> Option<usize> {
    let next = eat_ws(text, pos);
    (next > pos).then_some(next)
}

fn eat_digits(text: &str, pos: usize, max: usize) -> Option<usize> {
    let mut at = pos;
    let mut seen = 0;
    while seen < max {
        match char_at(text, at) {
            Some(ch) if ch.is_ascii_digit() => {
                at += 1;
                seen += 1;
            }
            _ => break,
        }
    }
    (seen > 0).then_some(at)
}
