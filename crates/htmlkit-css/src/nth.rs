//! The `an+b` expression language used by `:nth-child` and friends.

use std::fmt;

/// A parsed `an+b` expression. `odd` is `2n+1`, `even` is `2n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NthExpr {
    pub a: i64,
    pub b: i64,
}

impl NthExpr {
    pub const ODD: NthExpr = NthExpr { a: 2, b: 1 };
    pub const EVEN: NthExpr = NthExpr { a: 2, b: 0 };

    /// Parse an nth expression: `odd`, `even`, an integer, or
    /// `an+b` with optional signs and whitespace (`2n + 1`, `-n+3`, `n`).
    pub fn parse(input: &str) -> Option<NthExpr> {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        if compact.is_empty() {
            return None;
        }
        match compact.as_str() {
            "odd" => return Some(Self::ODD),
            "even" => return Some(Self::EVEN),
            _ => {}
        }

        match compact.find('n') {
            None => {
                // Bare integer: matches exactly that index.
                let b = parse_int(&compact)?;
                Some(NthExpr { a: 0, b })
            }
            Some(n_pos) => {
                let coeff = &compact[..n_pos];
                let a = match coeff {
                    "" | "+" => 1,
                    "-" => -1,
                    _ => parse_int(coeff)?,
                };
                let rest = &compact[n_pos + 1..];
                let b = if rest.is_empty() {
                    0
                } else if let Some(pos) = rest.strip_prefix('+') {
                    parse_unsigned(pos)?
                } else if let Some(neg) = rest.strip_prefix('-') {
                    -parse_unsigned(neg)?
                } else {
                    return None;
                };
                Some(NthExpr { a, b })
            }
        }
    }

    /// Whether a 1-based index matches this expression.
    pub fn matches(self, index: usize) -> bool {
        let i = index as i64;
        if self.a == 0 {
            i == self.b
        } else if self.a > 0 {
            i >= self.b && (i - self.b) % self.a == 0
        } else {
            i <= self.b && (self.b - i) % (-self.a) == 0
        }
    }
}

fn parse_int(s: &str) -> Option<i64> {
    if let Some(rest) = s.strip_prefix('+') {
        parse_unsigned(rest)
    } else if let Some(rest) = s.strip_prefix('-') {
        Some(-parse_unsigned(rest)?)
    } else {
        parse_unsigned(s)
    }
}

fn parse_unsigned(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for NthExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 0 {
            return write!(f, "{}", self.b);
        }
        match self.a {
            1 => write!(f, "n")?,
            -1 => write!(f, "-n")?,
            a => write!(f, "{a}n")?,
        }
        match self.b.cmp(&0) {
            std::cmp::Ordering::Greater => write!(f, "+{}", self.b),
            std::cmp::Ordering::Less => write!(f, "{}", self.b),
            std::cmp::Ordering::Equal => Ok(()),
        }
    }
}
