//! Parser and renderer for the format-spec mini-language
//!
//! `[[fill]align][sign][z][#][0][width][grouping][.precision][type]`

use super::FormatError;
use crate::expr::MAX_SEQUENCE_LEN;
use crate::value::float_repr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
    /// `=`: padding goes between the sign and the digits
    AfterSign,
}

impl Align {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Align::Left),
            '>' => Some(Align::Right),
            '^' => Some(Align::Center),
            '=' => Some(Align::AfterSign),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sign {
    Plus,
    #[default]
    Minus,
    Space,
}

/// A parsed format specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    raw: String,
    pub fill: Option<char>,
    pub align: Option<Align>,
    pub sign: Sign,
    explicit_sign: bool,
    /// `z`: negative zero is printed without its sign
    pub no_negative_zero: bool,
    pub alternate: bool,
    pub zero: bool,
    pub width: usize,
    pub grouping: Option<char>,
    pub precision: Option<usize>,
    pub kind: Option<char>,
}

impl FormatSpec {
    pub fn parse(spec: &str) -> Result<Self, FormatError> {
        let chars: Vec<char> = spec.chars().collect();
        let invalid = |reason: &str| FormatError::InvalidSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };
        let mut parsed = FormatSpec {
            raw: spec.to_string(),
            fill: None,
            align: None,
            sign: Sign::Minus,
            explicit_sign: false,
            no_negative_zero: false,
            alternate: false,
            zero: false,
            width: 0,
            grouping: None,
            precision: None,
            kind: None,
        };

        let mut i = 0;
        if let Some(align) = chars.get(1).copied().and_then(Align::from_char) {
            parsed.fill = Some(chars[0]);
            parsed.align = Some(align);
            i = 2;
        } else if let Some(align) = chars.first().copied().and_then(Align::from_char) {
            parsed.align = Some(align);
            i = 1;
        }

        let sign = match chars.get(i) {
            Some('+') => Some(Sign::Plus),
            Some('-') => Some(Sign::Minus),
            Some(' ') => Some(Sign::Space),
            _ => None,
        };
        if let Some(sign) = sign {
            parsed.sign = sign;
            parsed.explicit_sign = true;
            i += 1;
        }
        if chars.get(i) == Some(&'z') {
            parsed.no_negative_zero = true;
            i += 1;
        }
        if chars.get(i) == Some(&'#') {
            parsed.alternate = true;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            parsed.zero = true;
            i += 1;
        }

        let (width, next) = digits(&chars, i);
        if let Some(width) = width {
            parsed.width = width
                .filter(|w| *w <= MAX_SEQUENCE_LEN)
                .ok_or_else(|| invalid("width too large"))?;
        }
        i = next;

        if let Some(&sep @ (',' | '_')) = chars.get(i) {
            parsed.grouping = Some(sep);
            i += 1;
            if matches!(chars.get(i), Some(',' | '_')) {
                return Err(invalid("cannot specify both ',' and '_'"));
            }
        }

        if chars.get(i) == Some(&'.') {
            let (precision, next) = digits(&chars, i + 1);
            match precision {
                Some(Some(precision)) if precision <= MAX_SEQUENCE_LEN => {
                    parsed.precision = Some(precision)
                }
                Some(_) => return Err(invalid("precision too large")),
                None => return Err(invalid("format specifier missing precision")),
            }
            i = next;
        }

        match &chars[i..] {
            [] => {}
            [kind] => parsed.kind = Some(*kind),
            _ => return Err(invalid("invalid format specifier")),
        }
        Ok(parsed)
    }

    fn invalid(&self, reason: impl Into<String>) -> FormatError {
        FormatError::InvalidSpec {
            spec: self.raw.clone(),
            reason: reason.into(),
        }
    }

    fn fill_char(&self) -> char {
        self.fill.unwrap_or(if self.zero { '0' } else { ' ' })
    }

    /// Zero padding with no explicit fill or alignment pads between sign and digits
    fn zero_padded(&self) -> bool {
        self.zero && self.fill.is_none() && self.align.is_none()
    }

    fn pad(&self, prefix: &str, body: &str, default: Align) -> String {
        let len = prefix.chars().count() + body.chars().count();
        if len >= self.width {
            return format!("{}{}", prefix, body);
        }
        let padding = |n: usize| self.fill_char().to_string().repeat(n);
        let pad = self.width - len;
        let align = match self.align {
            Some(align) => align,
            None if self.zero && default == Align::Right => Align::AfterSign,
            None => default,
        };
        match align {
            Align::Left => format!("{}{}{}", prefix, body, padding(pad)),
            Align::Right => format!("{}{}{}", padding(pad), prefix, body),
            Align::Center => format!(
                "{}{}{}{}",
                padding(pad / 2),
                prefix,
                body,
                padding(pad - pad / 2)
            ),
            Align::AfterSign => format!("{}{}{}", prefix, padding(pad), body),
        }
    }

    fn sign_prefix(&self, negative: bool) -> &'static str {
        match (negative, self.sign) {
            (true, _) => "-",
            (false, Sign::Plus) => "+",
            (false, Sign::Space) => " ",
            (false, Sign::Minus) => "",
        }
    }

    /// Assemble sign, prefix, grouped integer digits and the remainder
    fn finish_number(
        &self,
        negative: bool,
        radix_prefix: &str,
        mut int_digits: String,
        rest: &str,
        group_every: usize,
    ) -> String {
        let prefix = format!("{}{}", self.sign_prefix(negative), radix_prefix);
        let body = match self.grouping {
            Some(sep) => {
                let mut grouped = group(&int_digits, sep, group_every);
                if self.zero_padded() {
                    let target = self
                        .width
                        .saturating_sub(prefix.chars().count() + rest.chars().count());
                    while grouped.chars().count() < target {
                        int_digits.insert(0, '0');
                        grouped = group(&int_digits, sep, group_every);
                    }
                }
                format!("{}{}", grouped, rest)
            }
            None => format!("{}{}", int_digits, rest),
        };
        self.pad(&prefix, &body, Align::Right)
    }

    /// Format a string value
    pub fn format_str(&self, s: &str) -> Result<String, FormatError> {
        match self.kind {
            None | Some('s') => {}
            Some(code) => {
                return Err(FormatError::UnknownCode {
                    code,
                    type_name: "str",
                })
            }
        }
        if self.explicit_sign {
            return Err(self.invalid("sign not allowed in string format specifier"));
        }
        if self.alternate {
            return Err(self.invalid("alternate form (#) not allowed in string format specifier"));
        }
        if let Some(sep) = self.grouping {
            return Err(self.invalid(format!("cannot specify '{}' with 's'", sep)));
        }
        if self.align == Some(Align::AfterSign) {
            return Err(self.invalid("'=' alignment not allowed in string format specifier"));
        }
        let body: String = match self.precision {
            Some(precision) => s.chars().take(precision).collect(),
            None => s.to_string(),
        };
        Ok(self.pad("", &body, Align::Left))
    }

    /// Format an integer (or a bool given a non-empty spec)
    pub fn format_int(&self, n: i64, type_name: &'static str) -> Result<String, FormatError> {
        let kind = self.kind.unwrap_or('d');
        let (radix, radix_prefix) = match kind {
            'd' | 'n' => (10, ""),
            'b' => (2, "0b"),
            'o' => (8, "0o"),
            'x' => (16, "0x"),
            'X' => (16, "0X"),
            'c' => return self.format_char(n),
            'e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%' => return self.format_float(n as f64),
            code => return Err(FormatError::UnknownCode { code, type_name }),
        };
        if self.precision.is_some() {
            return Err(self.invalid("precision not allowed in integer format specifier"));
        }
        if let Some(sep) = self.grouping {
            if kind == 'n' || (sep == ',' && radix != 10) {
                return Err(self.invalid(format!("cannot specify '{}' with '{}'", sep, kind)));
            }
        }

        let magnitude = n.unsigned_abs();
        let digits = match radix {
            2 => format!("{:b}", magnitude),
            8 => format!("{:o}", magnitude),
            16 if kind == 'X' => format!("{:X}", magnitude),
            16 => format!("{:x}", magnitude),
            _ => magnitude.to_string(),
        };
        let radix_prefix = if self.alternate { radix_prefix } else { "" };
        let group_every = if radix == 10 { 3 } else { 4 };
        Ok(self.finish_number(n < 0, radix_prefix, digits, "", group_every))
    }

    fn format_char(&self, n: i64) -> Result<String, FormatError> {
        if self.explicit_sign {
            return Err(self.invalid("sign not allowed with integer format specifier 'c'"));
        }
        if self.alternate {
            return Err(self.invalid("alternate form (#) not allowed with integer format specifier 'c'"));
        }
        let ch = u32::try_from(n)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.invalid("%c arg not in range(0x110000)"))?;
        Ok(self.pad("", &ch.to_string(), Align::Right))
    }

    /// Format a float
    pub fn format_float(&self, x: f64) -> Result<String, FormatError> {
        let kind = self.kind;
        match kind {
            None | Some('e' | 'E' | 'f' | 'F' | 'g' | 'G' | 'n' | '%') => {}
            Some(code) => {
                return Err(FormatError::UnknownCode {
                    code,
                    type_name: "float",
                })
            }
        }
        if let (Some(sep), Some('n')) = (self.grouping, kind) {
            return Err(self.invalid(format!("cannot specify '{}' with 'n'", sep)));
        }

        let magnitude = x.abs();
        let mut text = if !x.is_finite() {
            let word = if x.is_nan() { "nan" } else { "inf" };
            word.to_string()
        } else {
            match kind {
                None => match self.precision {
                    None => float_repr(magnitude),
                    Some(p) => general(magnitude, p, self.alternate, true),
                },
                Some('e' | 'E') => scientific(magnitude, self.precision.unwrap_or(6), self.alternate),
                Some('f' | 'F') => fixed(magnitude, self.precision.unwrap_or(6), self.alternate),
                Some('%') => format!(
                    "{}%",
                    fixed(magnitude * 100.0, self.precision.unwrap_or(6), self.alternate)
                ),
                _ => general(magnitude, self.precision.unwrap_or(6), self.alternate, false),
            }
        };
        if matches!(kind, Some('E' | 'F' | 'G')) {
            text = text.to_uppercase();
        }

        let mut negative = x.is_sign_negative() && !x.is_nan();
        if negative && self.no_negative_zero && text.chars().all(|c| !c.is_ascii_digit() || c == '0')
        {
            negative = false;
        }

        let split = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        let (int_digits, rest) = text.split_at(split);
        Ok(self.finish_number(negative, "", int_digits.to_string(), rest, 3))
    }
}

/// Parse a run of decimal digits starting at `start`
///
/// Returns `None` when there are no digits, `Some(None)` on overflow.
fn digits(chars: &[char], start: usize) -> (Option<Option<usize>>, usize) {
    let end = chars[start.min(chars.len())..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map_or(chars.len(), |p| start + p);
    if end <= start {
        return (None, start);
    }
    let text: String = chars[start..end].iter().collect();
    (Some(text.parse().ok()), end)
}

fn group(digits: &str, sep: char, every: usize) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(chars.len() + chars.len() / every);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % every == 0 {
            out.push(sep);
        }
        out.push(*c);
    }
    out
}

/// Rewrite Rust's `1.5e3` exponent into the `1.5e+03` spelling
fn normalize_exponent(text: &str) -> String {
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => text.to_string(),
    }
}

fn fixed(x: f64, precision: usize, alternate: bool) -> String {
    let text = format!("{:.*}", precision, x);
    if alternate && precision == 0 {
        format!("{}.", text)
    } else {
        text
    }
}

fn scientific(x: f64, precision: usize, alternate: bool) -> String {
    let text = normalize_exponent(&format!("{:.*e}", precision, x));
    if alternate && precision == 0 {
        text.replacen('e', ".e", 1)
    } else {
        text
    }
}

fn strip_trailing_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// General format (`g`); with `repr_style` this is the presentation used
/// when a precision is given without a type
fn general(x: f64, precision: usize, alternate: bool, repr_style: bool) -> String {
    let p = precision.max(1);
    let rounded = format!("{:.*e}", p - 1, x);
    let exp: i32 = rounded
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);
    let p = i32::try_from(p).unwrap_or(i32::MAX);
    let upper = if repr_style { p - 1 } else { p };

    if exp < -4 || exp >= upper {
        let text = normalize_exponent(&rounded);
        if alternate {
            return text;
        }
        match text.split_once('e') {
            Some((mantissa, exponent)) => {
                format!("{}e{}", strip_trailing_zeros(mantissa), exponent)
            }
            None => text,
        }
    } else {
        let decimals = usize::try_from(p - 1 - exp).unwrap_or(0);
        let text = format!("{:.*}", decimals, x);
        let mut text = if alternate {
            text
        } else {
            strip_trailing_zeros(&text).to_string()
        };
        if repr_style && !text.contains('.') {
            text.push_str(".0");
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::format_value;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn fmt(value: impl Into<Value>, spec: &str) -> String {
        format_value(&value.into(), spec).unwrap()
    }

    #[test]
    fn test_parse_full_spec() {
        let spec = FormatSpec::parse("*^+#012,.3f").unwrap();
        assert_eq!(spec.fill, Some('*'));
        assert_eq!(spec.align, Some(Align::Center));
        assert_eq!(spec.sign, Sign::Plus);
        assert!(spec.alternate);
        assert!(spec.zero);
        assert_eq!(spec.width, 12);
        assert_eq!(spec.grouping, Some(','));
        assert_eq!(spec.precision, Some(3));
        assert_eq!(spec.kind, Some('f'));
    }

    #[test]
    fn test_parse_errors() {
        assert!(FormatSpec::parse(".").is_err());
        assert!(FormatSpec::parse("10xx").is_err());
        assert!(FormatSpec::parse(",_").is_err());
    }

    #[test]
    fn test_oversized_width_and_precision_are_rejected() {
        assert!(matches!(
            FormatSpec::parse(">1000000000000"),
            Err(FormatError::InvalidSpec { reason, .. }) if reason == "width too large"
        ));
        assert!(matches!(
            FormatSpec::parse(".1000000000000f"),
            Err(FormatError::InvalidSpec { reason, .. }) if reason == "precision too large"
        ));
        assert!(matches!(
            FormatSpec::parse("99999999999999999999999"),
            Err(FormatError::InvalidSpec { .. })
        ));
        assert!(format_value(&Value::Int(1), ">1000000000000").is_err());
    }

    #[test]
    fn test_strings() {
        assert_eq!(fmt("ab", ">5"), "   ab");
        assert_eq!(fmt("ab", "5"), "ab   ");
        assert_eq!(fmt("ab", "*^6"), "**ab**");
        assert_eq!(fmt("abcdef", ".3"), "abc");
        assert_eq!(fmt("ab", "05"), "ab000");
        assert!(format_value(&Value::from("ab"), "+").is_err());
        assert!(format_value(&Value::from("ab"), "d").is_err());
        assert!(format_value(&Value::from("ab"), "=5").is_err());
    }

    #[test]
    fn test_integers() {
        assert_eq!(fmt(23, "x"), "17");
        assert_eq!(fmt(255, "#X"), "0XFF");
        assert_eq!(fmt(5, "b"), "101");
        assert_eq!(fmt(8, "#o"), "0o10");
        assert_eq!(fmt(42, "5"), "   42");
        assert_eq!(fmt(-42, "05"), "-0042");
        assert_eq!(fmt(42, "+"), "+42");
        assert_eq!(fmt(42, " "), " 42");
        assert_eq!(fmt(1234567, ","), "1,234,567");
        assert_eq!(fmt(0xdeadbeef_i64, "_x"), "dead_beef");
        assert_eq!(fmt(1234, "08,"), "0,001,234");
        assert_eq!(fmt(65, "c"), "A");
        assert_eq!(fmt(3, "<4"), "3   ");
        assert_eq!(fmt(3, "=+4"), "+  3");
        assert_eq!(fmt(true, ">3"), "  1");
    }

    #[test]
    fn test_integer_errors() {
        assert!(format_value(&Value::Int(1), ".2").is_err());
        assert!(format_value(&Value::Int(1), "s").is_err());
        assert!(format_value(&Value::Int(1), ",x").is_err());
    }

    #[test]
    fn test_integers_promote_to_float_types() {
        assert_eq!(fmt(3, ".2f"), "3.00");
        assert_eq!(fmt(1, "%"), "100.000000%");
    }

    #[test]
    fn test_floats() {
        assert_eq!(fmt(3.14159, ".2f"), "3.14");
        assert_eq!(fmt(3.14159, "8.3f"), "   3.142");
        assert_eq!(fmt(-3.5, "010.2f"), "-000003.50");
        assert_eq!(fmt(1234.5, ",.1f"), "1,234.5");
        assert_eq!(fmt(0.25, ".1%"), "25.0%");
        assert_eq!(fmt(12345.678, "e"), "1.234568e+04");
        assert_eq!(fmt(12345.678, ".2E"), "1.23E+04");
        assert_eq!(fmt(0.0001234, "g"), "0.0001234");
        assert_eq!(fmt(1234567.0, "g"), "1.23457e+06");
        assert_eq!(fmt(100.0, "g"), "100");
        assert_eq!(fmt(2.0, ""), "2.0");
        assert_eq!(fmt(2.0, ">6"), "   2.0");
    }

    #[test]
    fn test_float_general_without_type() {
        assert_eq!(fmt(12.0, ".3"), "12.0");
        assert_eq!(fmt(123.0, ".3"), "1.23e+02");
        assert_eq!(fmt(0.5, ".3"), "0.5");
    }

    #[test]
    fn test_special_floats() {
        assert_eq!(fmt(f64::INFINITY, "f"), "inf");
        assert_eq!(fmt(f64::NEG_INFINITY, ">6"), "  -inf");
        assert_eq!(fmt(f64::NAN, "F"), "NAN");
        assert_eq!(fmt(-0.0001, "z.2f"), "0.00");
        assert_eq!(fmt(-0.0001, ".2f"), "-0.00");
    }
}
