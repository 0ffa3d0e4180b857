//! Message templates and their owned arguments
//!
//! Log calls hand the formatter a template plus a list of owned [`LogArg`]
//! values, so rendering can run on the formatter thread instead of the
//! caller's. Templates use `format!` placeholder syntax:
//!
//! - `{}` takes the next argument
//! - `{{` and `}}` are literal braces
//! - `{:spec}` accepts `[[fill]align][0][width][.precision][type]`, where
//!   align is one of `<`, `>`, `^` and type one of `x`, `X`, `b`, `o`, `e`, `?`
//!
//! A placeholder without a matching argument is copied verbatim, and
//! surplus arguments are ignored.

use super::buffer::{BoundedBuffer, RenderStats};
use std::fmt;

/// One owned argument of a log message
#[derive(Debug, Clone, PartialEq)]
pub enum LogArg {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Char(char),
}

impl LogArg {
    /// Capture any displayable value as text
    pub fn display(value: impl fmt::Display) -> Self {
        LogArg::Str(value.to_string())
    }

    fn is_numeric(&self) -> bool {
        matches!(self, LogArg::Int(_) | LogArg::UInt(_) | LogArg::Float(_))
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for LogArg {
            fn from(v: $t) -> Self {
                LogArg::Int(v as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for LogArg {
            fn from(v: $t) -> Self {
                LogArg::UInt(v as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for LogArg {
    fn from(v: f32) -> Self {
        LogArg::Float(f64::from(v))
    }
}

impl From<f64> for LogArg {
    fn from(v: f64) -> Self {
        LogArg::Float(v)
    }
}

impl From<bool> for LogArg {
    fn from(v: bool) -> Self {
        LogArg::Bool(v)
    }
}

impl From<char> for LogArg {
    fn from(v: char) -> Self {
        LogArg::Char(v)
    }
}

impl From<&str> for LogArg {
    fn from(v: &str) -> Self {
        LogArg::Str(v.to_string())
    }
}

impl From<String> for LogArg {
    fn from(v: String) -> Self {
        LogArg::Str(v)
    }
}

impl From<&String> for LogArg {
    fn from(v: &String) -> Self {
        LogArg::Str(v.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Plain,
    LowerHex,
    UpperHex,
    Binary,
    Octal,
    Exp,
    Debug,
}

#[derive(Debug, Clone, Copy)]
struct Spec {
    fill: char,
    align: Option<Align>,
    zero: bool,
    width: usize,
    precision: Option<usize>,
    kind: Kind,
}

impl Default for Spec {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            zero: false,
            width: 0,
            precision: None,
            kind: Kind::Plain,
        }
    }
}

fn align_of(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        _ => None,
    }
}

fn take_number(chars: &[char], pos: &mut usize) -> Option<usize> {
    let start = *pos;
    while *pos < chars.len() && chars[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if *pos == start {
        return None;
    }
    chars[start..*pos].iter().collect::<String>().parse().ok()
}

/// Parse the text between `{:` and `}`
fn parse_spec(raw: &str) -> Option<Spec> {
    let chars: Vec<char> = raw.chars().collect();
    let mut spec = Spec::default();
    let mut pos = 0;

    if chars.len() >= 2 && align_of(chars[1]).is_some() {
        spec.fill = chars[0];
        spec.align = align_of(chars[1]);
        pos = 2;
    } else if let Some(align) = chars.first().and_then(|c| align_of(*c)) {
        spec.align = Some(align);
        pos = 1;
    }

    if chars.get(pos) == Some(&'0') {
        spec.zero = true;
        pos += 1;
    }
    if let Some(width) = take_number(&chars, &mut pos) {
        spec.width = width;
    }
    if chars.get(pos) == Some(&'.') {
        pos += 1;
        spec.precision = Some(take_number(&chars, &mut pos)?);
    }

    let kind: String = chars[pos..].iter().collect();
    spec.kind = match kind.as_str() {
        "" => Kind::Plain,
        "x" => Kind::LowerHex,
        "X" => Kind::UpperHex,
        "b" => Kind::Binary,
        "o" => Kind::Octal,
        "e" => Kind::Exp,
        "?" => Kind::Debug,
        _ => return None,
    };
    Some(spec)
}

fn body(arg: &LogArg, spec: &Spec) -> String {
    match (arg, spec.kind) {
        (LogArg::Int(v), Kind::LowerHex) => format!("{:x}", v),
        (LogArg::Int(v), Kind::UpperHex) => format!("{:X}", v),
        (LogArg::Int(v), Kind::Binary) => format!("{:b}", v),
        (LogArg::Int(v), Kind::Octal) => format!("{:o}", v),
        (LogArg::Int(v), Kind::Exp) => format!("{:e}", v),
        (LogArg::Int(v), _) => v.to_string(),
        (LogArg::UInt(v), Kind::LowerHex) => format!("{:x}", v),
        (LogArg::UInt(v), Kind::UpperHex) => format!("{:X}", v),
        (LogArg::UInt(v), Kind::Binary) => format!("{:b}", v),
        (LogArg::UInt(v), Kind::Octal) => format!("{:o}", v),
        (LogArg::UInt(v), Kind::Exp) => format!("{:e}", v),
        (LogArg::UInt(v), _) => v.to_string(),
        (LogArg::Float(v), Kind::Exp) => match spec.precision {
            Some(p) => format!("{:.*e}", p, v),
            None => format!("{:e}", v),
        },
        (LogArg::Float(v), _) => match spec.precision {
            Some(p) => format!("{:.*}", p, v),
            None => v.to_string(),
        },
        (LogArg::Str(s), Kind::Debug) => format!("{:?}", s),
        (LogArg::Str(s), _) => match spec.precision {
            Some(p) => s.chars().take(p).collect(),
            None => s.clone(),
        },
        (LogArg::Char(c), Kind::Debug) => format!("{:?}", c),
        (LogArg::Char(c), _) => c.to_string(),
        (LogArg::Bool(b), _) => b.to_string(),
    }
}

fn write_padded(out: &mut BoundedBuffer, arg: &LogArg, spec: &Spec) {
    // nothing past the capacity is ever shown
    let spec = &Spec {
        width: spec.width.min(out.capacity()),
        precision: spec.precision.map(|p| p.min(out.capacity())),
        ..*spec
    };
    let text = body(arg, spec);
    let len = text.chars().count();
    if len >= spec.width {
        out.push_str(&text);
        return;
    }
    let pad = spec.width - len;

    if spec.zero && spec.align.is_none() && arg.is_numeric() {
        let (sign, digits) = match text.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", text.as_str()),
        };
        out.push_str(sign);
        for _ in 0..pad {
            if !out.push('0') {
                return;
            }
        }
        out.push_str(digits);
        return;
    }

    let default_align = if arg.is_numeric() { Align::Right } else { Align::Left };
    let (before, after) = match spec.align.unwrap_or(default_align) {
        Align::Left => (0, pad),
        Align::Right => (pad, 0),
        Align::Center => (pad / 2, pad - pad / 2),
    };
    for _ in 0..before {
        if !out.push(spec.fill) {
            return;
        }
    }
    out.push_str(&text);
    for _ in 0..after {
        if !out.push(spec.fill) {
            return;
        }
    }
}

/// Render `template` with `args` into `out`
///
/// The buffer is appended to, not cleared. Rendering stops once the buffer
/// is full.
pub fn render(template: &str, args: &[LogArg], out: &mut BoundedBuffer) -> RenderStats {
    let mut next_arg = args.iter();
    let mut rest = template;

    while !rest.is_empty() && !out.is_truncated() {
        let Some(idx) = rest.find(|c| c == '{' || c == '}') else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
            continue;
        }

        let Some(close) = tail.find('}') else {
            // unterminated placeholder
            out.push_str(tail);
            break;
        };
        let placeholder = &tail[..=close];
        let inner = &tail[1..close];
        rest = &tail[close + 1..];

        let spec = if inner.is_empty() {
            Some(Spec::default())
        } else {
            inner.strip_prefix(':').and_then(parse_spec)
        };

        match spec {
            Some(spec) => match next_arg.next() {
                Some(arg) => write_padded(out, arg, &spec),
                None => {
                    out.push_str(placeholder);
                }
            },
            None => {
                out.push_str(placeholder);
            }
        }
    }

    out.stats()
}
