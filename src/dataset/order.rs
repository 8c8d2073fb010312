//! Natural ordering for task ids ("task_2" sorts before "task_10").

use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Number(&'a str),
    Text(String),
}

fn segments(id: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;

    for (i, c) in id.char_indices() {
        let is_digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != is_digit => {
                out.push(make_segment(&id[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(is_digit);
    }
    if let Some(prev) = in_digits {
        out.push(make_segment(&id[start..], prev));
    }
    out
}

fn make_segment(s: &str, digits: bool) -> Segment<'_> {
    if digits {
        let trimmed = s.trim_start_matches('0');
        Segment::Number(if trimmed.is_empty() { "0" } else { trimmed })
    } else {
        Segment::Text(s.to_lowercase())
    }
}

fn compare_segment(a: &Segment<'_>, b: &Segment<'_>) -> Ordering {
    match (a, b) {
        // Digit runs of any length compare by magnitude without parsing.
        (Segment::Number(x), Segment::Number(y)) => {
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        }
        (Segment::Number(_), Segment::Text(_)) => Ordering::Less,
        (Segment::Text(_), Segment::Number(_)) => Ordering::Greater,
        (Segment::Text(x), Segment::Text(y)) => x.cmp(y),
    }
}

/// Compares two ids, treating digit runs as numbers and text case-insensitively.
///
/// Ids that compare equal that way ("a01" and "a1") fall back to byte order,
/// so the result is a total order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let sa = segments(a);
    let sb = segments(b);
    for (x, y) in sa.iter().zip(sb.iter()) {
        let ord = compare_segment(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    sa.len().cmp(&sb.len()).then_with(|| a.cmp(b))
}
