//! Arithmetic and logic expressions.
//!
//! Evaluation works on a flat token list. Parenthesized groups are
//! evaluated recursively while tokenizing, then operators are reduced tier
//! by tier, leftmost first:
//!
//! | Tier | Operators |
//! |---|---|
//! | 0 | `^` |
//! | 1 | `*` `/` |
//! | 2 | `+` `-` |
//! | 3 | `=` `<` `>` `<=` `>=` |
//! | 4 | `&` `\|` |
//!
//! Values computed before evaluation (embedded reporters, variables and
//! text) are spliced into the text as slots, so they are never re-read as
//! identifiers.

use crate::error::{Result, RuntimeError, SourceRange};
use crate::object::Object;

/// Characters that are operators wherever they appear in an expression.
pub const OPERATOR_CHARS: &[char] = &['+', '-', '*', '/', '^', '=', '<', '>', '&', '|'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Pow,
    Mul,
    Div,
    Add,
    Sub,
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl Op {
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            '^' => Op::Pow,
            '*' => Op::Mul,
            '/' => Op::Div,
            '+' => Op::Add,
            '-' => Op::Sub,
            '=' => Op::Eq,
            '<' => Op::Lt,
            '>' => Op::Gt,
            '&' => Op::And,
            '|' => Op::Or,
            _ => return None,
        })
    }

    fn tier(self) -> u8 {
        match self {
            Op::Pow => 0,
            Op::Mul | Op::Div => 1,
            Op::Add | Op::Sub => 2,
            Op::Eq | Op::Lt | Op::Gt | Op::Le | Op::Ge => 3,
            Op::And | Op::Or => 4,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Op::Pow => "^",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Eq => "=",
            Op::Lt => "<",
            Op::Gt => ">",
            Op::Le => "<=",
            Op::Ge => ">=",
            Op::And => "&",
            Op::Or => "|",
        }
    }
}

#[derive(Debug, Clone)]
enum Token {
    Value(Object),
    Op(Op),
}

/// Variable resolution used for bare identifiers.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<Object>;

const SLOT_OPEN: char = '\u{E000}';
const SLOT_CLOSE: char = '\u{E001}';

/// Placeholder standing for `values[index]` in the text handed to
/// [`evaluate`].
pub fn slot(index: usize) -> String {
    format!("{}{}{}", SLOT_OPEN, index, SLOT_CLOSE)
}

fn slot_index(text: &str) -> Option<usize> {
    text.strip_prefix(SLOT_OPEN)?
        .strip_suffix(SLOT_CLOSE)?
        .parse()
        .ok()
}

/// `text` with every slot replaced by its value, for messages.
fn readable(text: &str, values: &[Object]) -> String {
    let mut out = String::new();
    let mut rest = text;
    while let Some(start) = rest.find(SLOT_OPEN) {
        let Some(len) = rest[start..].find(SLOT_CLOSE) else {
            break;
        };
        out.push_str(&rest[..start]);
        let slot = &rest[start..start + len + SLOT_CLOSE.len_utf8()];
        match slot_index(slot).and_then(|i| values.get(i)) {
            Some(value) => out.push_str(&value.to_string()),
            None => out.push_str(slot),
        }
        rest = &rest[start + slot.len()..];
    }
    out.push_str(rest);
    out
}

/// Evaluate `text`, attributing failures to `range`.
///
/// Slots in `text` (see [`slot`]) resolve to `values`; any other word that
/// is neither a number nor `true`/`false` must be a variable.
pub fn evaluate(
    text: &str,
    values: &[Object],
    lookup: Lookup<'_>,
    range: &SourceRange,
) -> Result<Object> {
    let context = Context {
        text,
        values,
        lookup,
        range,
    };
    let mut tokens = tokenize(text, &context)?;
    fix_up(&mut tokens, range)?;
    reduce(tokens, &context)
}

struct Context<'a> {
    text: &'a str,
    values: &'a [Object],
    lookup: Lookup<'a>,
    range: &'a SourceRange,
}

impl Context<'_> {
    fn error(&self, message: String) -> RuntimeError {
        RuntimeError::new(message, self.range)
    }

    fn shown(&self) -> String {
        readable(self.text, self.values)
    }
}

// ---------------------------------------------------------------------------
// Tokenizing
// ---------------------------------------------------------------------------

fn tokenize(text: &str, cx: &Context<'_>) -> Result<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if let Some(op) = Op::from_char(c) {
            flush(&mut word, &mut tokens, cx)?;
            tokens.push(Token::Op(op));
        } else if c == '(' {
            flush(&mut word, &mut tokens, cx)?;
            let close = matching_paren(&chars, i).ok_or_else(|| imbalance(cx))?;
            let inner: String = chars[i + 1..close].iter().collect();
            tokens.push(Token::Value(evaluate(&inner, cx.values, cx.lookup, cx.range)?));
            i = close;
        } else if c == ')' {
            return Err(imbalance(cx));
        } else {
            word.push(c);
        }
        i += 1;
    }
    flush(&mut word, &mut tokens, cx)?;

    Ok(tokens)
}

fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0;
    for (i, &c) in chars.iter().enumerate().skip(open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn flush(word: &mut String, tokens: &mut Vec<Token>, cx: &Context<'_>) -> Result<()> {
    let text = word.trim();
    if !text.is_empty() {
        tokens.push(Token::Value(operand(text, cx)?));
    }
    word.clear();
    Ok(())
}

/// Slots, then numbers, then `true`/`false`, then variables.
fn operand(text: &str, cx: &Context<'_>) -> Result<Object> {
    if let Some(value) = slot_index(text).and_then(|i| cx.values.get(i)) {
        return Ok(value.clone());
    }
    if text.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        if let Ok(n) = text.parse::<f64>() {
            return Ok(Object::Number(n));
        }
    }
    match text {
        "true" => Ok(Object::Bool(true)),
        "false" => Ok(Object::Bool(false)),
        _ => (cx.lookup)(text).ok_or_else(|| {
            cx.error(format!(
                "Variable '{}' could not be found!",
                readable(text, cx.values)
            ))
        }),
    }
}

fn imbalance(cx: &Context<'_>) -> RuntimeError {
    cx.error(format!("Parentheses are not balanced in '{}'", cx.shown()))
}

// ---------------------------------------------------------------------------
// Fix-up
// ---------------------------------------------------------------------------

/// Merge `<=`/`>=` and fold unary signs into the following operand.
fn fix_up(tokens: &mut Vec<Token>, range: &SourceRange) -> Result<()> {
    let mut i = 0;
    while i + 1 < tokens.len() {
        let merged = match (&tokens[i], &tokens[i + 1]) {
            (Token::Op(Op::Lt), Token::Op(Op::Eq)) => Some(Op::Le),
            (Token::Op(Op::Gt), Token::Op(Op::Eq)) => Some(Op::Ge),
            _ => None,
        };
        if let Some(op) = merged {
            tokens.splice(i..i + 2, [Token::Op(op)]);
        }
        i += 1;
    }

    let mut i = 0;
    while i < tokens.len() {
        let sign = match tokens[i] {
            Token::Op(op @ (Op::Add | Op::Sub)) => op,
            _ => {
                i += 1;
                continue;
            }
        };
        let unary = i == 0 || matches!(tokens[i - 1], Token::Op(_));
        if unary {
            if let Some(Token::Value(value)) = tokens.get(i + 1) {
                let n = number(value, range)?;
                let signed = if sign == Op::Sub { -n } else { n };
                tokens.splice(i..i + 2, [Token::Value(Object::Number(signed))]);
            }
        }
        i += 1;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Reduction
// ---------------------------------------------------------------------------

fn reduce(mut tokens: Vec<Token>, cx: &Context<'_>) -> Result<Object> {
    loop {
        let next = tokens
            .iter()
            .enumerate()
            .filter_map(|(i, t)| match t {
                Token::Op(op) => Some((i, *op)),
                Token::Value(_) => None,
            })
            .min_by_key(|(i, op)| (op.tier(), *i));

        let Some((i, op)) = next else {
            return match tokens.len() {
                1 => match tokens.pop() {
                    Some(Token::Value(v)) => Ok(v),
                    _ => Err(cx.error(format!("'{}' has no value", cx.shown()))),
                },
                0 => Err(cx.error("Empty expression".to_string())),
                _ => Err(cx.error(format!("Missing operator in '{}'", cx.shown()))),
            };
        };

        let operands = match (i.checked_sub(1).map(|l| &tokens[l]), tokens.get(i + 1)) {
            (Some(Token::Value(l)), Some(Token::Value(r))) => (l, r),
            _ => {
                return Err(cx.error(format!(
                    "'{}' is missing an operand in '{}'",
                    op.symbol(),
                    cx.shown()
                )))
            }
        };
        let result = apply(op, operands.0, operands.1, cx.range)?;
        tokens.splice(i - 1..i + 2, [Token::Value(result)]);
    }
}

fn apply(op: Op, left: &Object, right: &Object, range: &SourceRange) -> Result<Object> {
    let value = match op {
        Op::Pow => Object::Number(number(left, range)?.powf(number(right, range)?)),
        Op::Mul => Object::Number(number(left, range)? * number(right, range)?),
        Op::Div => {
            let divisor = number(right, range)?;
            if divisor == 0.0 {
                return Err(RuntimeError::new("Division by zero", range));
            }
            Object::Number(number(left, range)? / divisor)
        }
        Op::Add => Object::Number(number(left, range)? + number(right, range)?),
        Op::Sub => Object::Number(number(left, range)? - number(right, range)?),
        Op::Eq => Object::Bool(left.same_as(right)),
        Op::Lt => Object::Bool(number(left, range)? < number(right, range)?),
        Op::Gt => Object::Bool(number(left, range)? > number(right, range)?),
        Op::Le => Object::Bool(number(left, range)? <= number(right, range)?),
        Op::Ge => Object::Bool(number(left, range)? >= number(right, range)?),
        Op::And => Object::Bool(boolean(left, range)? && boolean(right, range)?),
        Op::Or => Object::Bool(boolean(left, range)? || boolean(right, range)?),
    };
    Ok(value)
}

fn number(value: &Object, range: &SourceRange) -> Result<f64> {
    value
        .as_number()
        .ok_or_else(|| RuntimeError::new(format!("'{}' is not a number", value), range))
}

fn boolean(value: &Object, range: &SourceRange) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| RuntimeError::new(format!("'{}' is not a boolean", value), range))
}
