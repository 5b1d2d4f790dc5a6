//! Slice entry name templates
//!
//! SVX manifests name their slices with a printf-style template such as
//! `density/slice%04d.png`. The template must hold exactly one integer
//! conversion, which is replaced by the zero-based slice number. Flags
//! (`-`, `+`, space, `0`, `#`), a field width, a precision and the usual
//! length modifiers are honored for `d`, `i`, `u`, `o`, `x` and `X`.

use crate::error::{Result, SvxError};
use std::fmt;

/// Largest field width or precision accepted in a template
pub const MAX_FIELD_WIDTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Radix {
    Decimal { signed: bool },
    Octal,
    Hex { upper: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Conversion {
    left_align: bool,
    plus_sign: bool,
    space_sign: bool,
    alternate: bool,
    zero_pad: bool,
    width: usize,
    precision: Option<usize>,
    radix: Radix,
}

impl Conversion {
    fn render(&self, index: usize, out: &mut String) {
        let mut digits = match self.radix {
            Radix::Decimal { .. } => index.to_string(),
            Radix::Octal => format!("{:o}", index),
            Radix::Hex { upper: false } => format!("{:x}", index),
            Radix::Hex { upper: true } => format!("{:X}", index),
        };

        match self.precision {
            Some(0) if index == 0 => digits.clear(),
            Some(p) if digits.len() < p => {
                digits.insert_str(0, &"0".repeat(p - digits.len()));
            }
            _ => {}
        }
        if self.alternate && self.radix == Radix::Octal && !digits.starts_with('0') {
            digits.insert(0, '0');
        }

        let prefix = match self.radix {
            Radix::Decimal { signed: true } if self.plus_sign => "+",
            Radix::Decimal { signed: true } if self.space_sign => " ",
            Radix::Hex { upper: false } if self.alternate && index != 0 => "0x",
            Radix::Hex { upper: true } if self.alternate && index != 0 => "0X",
            _ => "",
        };

        let pad = self.width.saturating_sub(prefix.len() + digits.len());
        if self.left_align {
            out.push_str(prefix);
            out.push_str(&digits);
            out.extend(std::iter::repeat(' ').take(pad));
        } else if self.zero_pad && self.precision.is_none() {
            out.push_str(prefix);
            out.extend(std::iter::repeat('0').take(pad));
            out.push_str(&digits);
        } else {
            out.extend(std::iter::repeat(' ').take(pad));
            out.push_str(prefix);
            out.push_str(&digits);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Index(Conversion),
}

/// Parsed slice name template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePattern {
    source: String,
    segments: Vec<Segment>,
}

fn read_number<I>(chars: &mut std::iter::Peekable<I>) -> Option<usize>
where
    I: Iterator<Item = char>,
{
    let mut value = 0usize;
    while let Some(d) = chars.next_if(char::is_ascii_digit) {
        let digit = d.to_digit(10).unwrap_or(0) as usize;
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit))
            .filter(|v| *v <= MAX_FIELD_WIDTH)?;
    }
    Some(value)
}

impl SlicePattern {
    /// Parse a template with exactly one integer conversion
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason: &str| SvxError::InvalidSlicePattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut conversions = 0;
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            if chars.peek() == Some(&'%') {
                chars.next();
                literal.push('%');
                continue;
            }

            let mut conversion = Conversion {
                left_align: false,
                plus_sign: false,
                space_sign: false,
                alternate: false,
                zero_pad: false,
                width: 0,
                precision: None,
                radix: Radix::Decimal { signed: true },
            };

            while let Some(flag) = chars.next_if(|&c| matches!(c, '-' | '+' | ' ' | '0' | '#')) {
                match flag {
                    '-' => conversion.left_align = true,
                    '+' => conversion.plus_sign = true,
                    ' ' => conversion.space_sign = true,
                    '0' => conversion.zero_pad = true,
                    _ => conversion.alternate = true,
                }
            }

            let too_wide = || invalid("field width or precision too large");
            if chars.peek() == Some(&'*') {
                return Err(invalid("variable field width is not supported"));
            }
            conversion.width = read_number(&mut chars).ok_or_else(too_wide)?;
            if chars.next_if_eq(&'.').is_some() {
                if chars.peek() == Some(&'*') {
                    return Err(invalid("variable precision is not supported"));
                }
                conversion.precision = Some(read_number(&mut chars).ok_or_else(too_wide)?);
            }

            // Length modifiers do not change how a slice number is rendered
            let modifier = chars.next_if(|&c| matches!(c, 'h' | 'l' | 'z' | 'j' | 't'));
            if let Some(m @ ('h' | 'l')) = modifier {
                chars.next_if_eq(&m);
            }

            conversion.radix = match chars.next() {
                Some('d') | Some('i') => Radix::Decimal { signed: true },
                Some('u') => Radix::Decimal { signed: false },
                Some('o') => Radix::Octal,
                Some('x') => Radix::Hex { upper: false },
                Some('X') => Radix::Hex { upper: true },
                Some(_) => return Err(invalid("only integer conversions are supported")),
                None => return Err(invalid("dangling '%'")),
            };

            conversions += 1;
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Index(conversion));
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        match conversions {
            1 => Ok(Self {
                source: pattern.to_string(),
                segments,
            }),
            0 => Err(invalid("no integer placeholder")),
            _ => Err(invalid("more than one integer placeholder")),
        }
    }

    /// Entry name for slice `index`
    pub fn format(&self, index: usize) -> String {
        let mut name = String::with_capacity(self.source.len() + 8);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => name.push_str(text),
                Segment::Index(conversion) => conversion.render(index, &mut name),
            }
        }
        name
    }

    /// The template as written in the manifest
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for SlicePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
