//! Core pattern matching.
//!
//! A pattern is a core template such as `set [] to []`. Placeholders only
//! constrain the *kind* of input at their position:
//!
//! | Placeholder | Accepts |
//! |---|---|
//! | `[]` | `[...]`, `(...)`, `{...}` |
//! | `()` | `(...)` |
//! | `{}` | `{...}`, `(...)` |
//!
//! A placeholder followed by `>>` accepts any number of further inputs of a
//! kind it accepts (`join []>>`).

use crate::lexer::BracketKind;

/// Words that vocabulary cannot claim in user definitions.
pub const RESERVED_WORDS: &[&str] = &["end", "define", "with", "as", "for", "new"];

/// Marker that makes the preceding placeholder variadic.
pub const VARIADIC_MARKER: &str = ">>";

/// Trim and collapse whitespace runs to single spaces.
pub fn normalize_core(core: &str) -> String {
    core.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First reserved word appearing as a whole word in `core`, if any.
pub fn reserved_word(core: &str) -> Option<&'static str> {
    core.split(' ')
        .find_map(|word| RESERVED_WORDS.iter().copied().find(|r| *r == word))
}

fn accepts(slot: BracketKind, arg: BracketKind) -> bool {
    match slot {
        BracketKind::Text => true,
        BracketKind::Object => arg == BracketKind::Object,
        BracketKind::Statement => matches!(arg, BracketKind::Statement | BracketKind::Object),
    }
}

/// Index just past the group opened at `start`. Unclosed groups run to the end.
fn skip_group(chars: &[char], start: usize) -> usize {
    let mut stack: Vec<BracketKind> = Vec::new();
    for (i, &c) in chars.iter().enumerate().skip(start) {
        if stack.last() == Some(&BracketKind::Text) {
            if c == ']' {
                stack.pop();
            }
        } else if let Some(kind) = BracketKind::from_open(c) {
            stack.push(kind);
        } else if BracketKind::from_close(c).is_some() {
            stack.pop();
        }
        if stack.is_empty() {
            return i + 1;
        }
    }
    chars.len()
}

fn variadic_tail(slot: BracketKind, rest: &[char]) -> bool {
    let mut i = 0;
    while i < rest.len() {
        let c = rest[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match BracketKind::from_open(c) {
            Some(arg) if accepts(slot, arg) => i = skip_group(rest, i),
            _ => return false,
        }
    }
    true
}

/// Whether the concrete `candidate` core fits `pattern`. Pure and total.
pub fn matches(pattern: &str, candidate: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let c: Vec<char> = candidate.chars().collect();
    let (mut pi, mut ci) = (0, 0);

    while pi < p.len() && ci < c.len() {
        match BracketKind::from_open(p[pi]) {
            Some(slot) => {
                match BracketKind::from_open(c[ci]) {
                    Some(arg) if accepts(slot, arg) => {}
                    _ => return false,
                }
                pi = skip_group(&p, pi);
                ci = skip_group(&c, ci);
                let marker: Vec<char> = VARIADIC_MARKER.chars().collect();
                if p[pi..].starts_with(&marker) {
                    return variadic_tail(slot, &c[ci..]);
                }
            }
            None => {
                if p[pi] != c[ci] {
                    return false;
                }
                pi += 1;
                ci += 1;
            }
        }
    }

    pi == p.len() && ci == c.len()
}
