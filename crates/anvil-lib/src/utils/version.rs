use std::cmp::Ordering;

/// One run of digits or non-digits inside a version id.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Token<'a> {
    Number(u64),
    Text(&'a str),
}

fn tokenize(s: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    for chunk in s.split(['.', '-', '_', '+']).filter(|c| !c.is_empty()) {
        let mut start = 0;
        let bytes = chunk.as_bytes();
        for i in 1..=bytes.len() {
            let boundary = i == bytes.len() || bytes[i].is_ascii_digit() != bytes[start].is_ascii_digit();
            if !boundary {
                continue;
            }
            let run = &chunk[start..i];
            if bytes[start].is_ascii_digit() {
                tokens.push(Token::Number(run.parse().unwrap_or(u64::MAX)));
            } else {
                tokens.push(Token::Text(run));
            }
            start = i;
        }
    }
    tokens
}

fn compare_tokens(a: &[Token<'_>], b: &[Token<'_>]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    a.len().cmp(&b.len())
}

/// Orders game and loader version ids.
///
/// Everything after the first `-` is a tag: `1.20.1-pre1 < 1.20.1`, and two
/// tagged ids with the same base compare by their tags, so
/// `1.20.1-forge-47.1.0 < 1.20.1-forge-47.2.0`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a_base, a_tag) = split_tag(a);
    let (b_base, b_tag) = split_tag(b);

    match compare_tokens(&tokenize(a_base), &tokenize(b_base)) {
        Ordering::Equal => {}
        ord => return ord,
    }

    match (a_tag, b_tag) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(at), Some(bt)) => compare_tokens(&tokenize(at), &tokenize(bt)),
    }
}

fn split_tag(v: &str) -> (&str, Option<&str>) {
    match v.split_once('-') {
        Some((base, tag)) => (base, Some(tag)),
        None => (v, None),
    }
}
