//! Parameter constraints.
//!
//! A constraint bounds either a numeric value or the length of a string or
//! list. Records may write constraints as explicit fields or as a small
//! expression language:
//!
//! ```text
//! 1 <= value <= 50
//! value >= 10, value <= 1000
//! len >= 1
//! 0 < length <= 64
//! min = 1; max = 50
//! ```
//!
//! `value` (also `x`, `v`) names the parameter itself; `len` (also `length`,
//! `size`, `count`) names its length. `≤` and `≥` are accepted. Strict
//! comparisons are only meaningful for lengths, which are integers.

use std::fmt;

use super::record::{ConstraintBounds, RawConstraint};

/// Bounds on a parameter value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Constraint {
    /// Inclusive numeric minimum.
    pub min: Option<f64>,

    /// Inclusive numeric maximum. Values above it are clamped, not rejected.
    pub max: Option<f64>,

    /// Inclusive minimum length of a string or list.
    pub min_length: Option<usize>,

    /// Inclusive maximum length of a string or list.
    pub max_length: Option<usize>,
}

/// Outcome of checking a number against a constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericCheck {
    Within,
    AboveMax(f64),
    BelowMin(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Le,
    Ge,
    Lt,
    Gt,
    Eq,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Op(Op),
    Term(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subject {
    Value,
    Length,
}

impl Constraint {
    /// Build a constraint from its stored form.
    pub fn from_raw(raw: &RawConstraint) -> Result<Self, String> {
        let constraint = match raw {
            RawConstraint::Expression(expr) => Self::parse(expr)?,
            RawConstraint::Bounds(bounds) => Self::from_bounds(bounds),
        };
        constraint.check_consistent()?;
        Ok(constraint)
    }

    fn from_bounds(bounds: &ConstraintBounds) -> Self {
        Self {
            min: bounds.min,
            max: bounds.max,
            min_length: bounds.min_length,
            max_length: bounds.max_length,
        }
    }

    /// Parse a constraint expression.
    pub fn parse(expr: &str) -> Result<Self, String> {
        let normalized = expr.replace('≤', "<=").replace('≥', ">=");
        let mut constraint = Self::default();

        for clause in normalized
            .split([',', ';'])
            .flat_map(|part| part.split(" and "))
        {
            let clause = clause.trim();
            if clause.is_empty() {
                continue;
            }
            constraint.apply_clause(clause)?;
        }

        if constraint.is_empty() {
            return Err(format!("constraint '{}' sets no bounds", expr));
        }
        Ok(constraint)
    }

    /// Whether no bound is set.
    pub fn is_empty(&self) -> bool {
        self.min.is_none()
            && self.max.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
    }

    /// Whether a numeric bound is set.
    pub fn has_numeric_bounds(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    /// Whether a length bound is set.
    pub fn has_length_bounds(&self) -> bool {
        self.min_length.is_some() || self.max_length.is_some()
    }

    /// Check a number against the numeric bounds.
    pub fn check_number(&self, value: f64) -> NumericCheck {
        if let Some(min) = self.min {
            if value < min {
                return NumericCheck::BelowMin(min);
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return NumericCheck::AboveMax(max);
            }
        }
        NumericCheck::Within
    }

    /// Check a length against the length bounds.
    pub fn check_length(&self, len: usize) -> Result<(), String> {
        if let Some(min) = self.min_length {
            if len < min {
                return Err(format!("length {} is below minimum length {}", len, min));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(format!("length {} exceeds maximum length {}", len, max));
            }
        }
        Ok(())
    }

    fn check_consistent(&self) -> Result<(), String> {
        for bound in [self.min, self.max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(format!("bound {} is not a finite number", bound));
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(format!("minimum {} is greater than maximum {}", min, max));
            }
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(format!(
                    "minimum length {} is greater than maximum length {}",
                    min, max
                ));
            }
        }
        Ok(())
    }

    fn apply_clause(&mut self, clause: &str) -> Result<(), String> {
        let tokens = tokenize(clause);

        // A clause alternates terms and operators: term (op term)+
        if tokens.len() < 3 || tokens.len() % 2 == 0 {
            return Err(format!("cannot parse constraint clause '{}'", clause));
        }

        for window in tokens.windows(3).step_by(2) {
            match window {
                [Token::Term(left), Token::Op(op), Token::Term(right)] => {
                    self.apply_relation(left, *op, right)?
                }
                _ => return Err(format!("cannot parse constraint clause '{}'", clause)),
            }
        }
        Ok(())
    }

    fn apply_relation(&mut self, left: &str, op: Op, right: &str) -> Result<(), String> {
        if op == Op::Eq {
            if let Some(applied) = self.apply_named_bound(left, right)? {
                return Ok(applied);
            }
        }

        if let (Some(subject), Some(number)) = (subject(left), parse_number(right)) {
            return self.apply_bound(subject, op, number);
        }
        if let (Some(number), Some(subject)) = (parse_number(left), subject(right)) {
            return self.apply_bound(subject, flip(op), number);
        }

        Err(format!(
            "cannot interpret '{}' and '{}' as a bound on value or len",
            left, right
        ))
    }

    fn apply_named_bound(&mut self, key: &str, value: &str) -> Result<Option<()>, String> {
        let key = key.trim().to_ascii_lowercase();
        let (subject, op) = match key.as_str() {
            "min" | "minimum" | "ge" => (Subject::Value, Op::Ge),
            "max" | "maximum" | "le" => (Subject::Value, Op::Le),
            "min_length" | "min_len" | "minlength" => (Subject::Length, Op::Ge),
            "max_length" | "max_len" | "maxlength" => (Subject::Length, Op::Le),
            _ => return Ok(None),
        };
        let number =
            parse_number(value).ok_or_else(|| format!("'{}' is not a number", value.trim()))?;
        self.apply_bound(subject, op, number).map(Some)
    }

    fn apply_bound(&mut self, subject: Subject, op: Op, number: f64) -> Result<(), String> {
        match subject {
            Subject::Value => match op {
                Op::Ge => self.min = Some(number),
                Op::Le => self.max = Some(number),
                Op::Eq => {
                    self.min = Some(number);
                    self.max = Some(number);
                }
                Op::Lt | Op::Gt => {
                    return Err("strict bounds on a value are not supported; use <= or >=".into());
                }
            },
            Subject::Length => {
                if number < 0.0 || number.fract() != 0.0 {
                    return Err(format!("length bound {} is not a whole number", number));
                }
                let n = number as usize;
                match op {
                    Op::Ge => self.min_length = Some(n),
                    Op::Gt => self.min_length = Some(n.saturating_add(1)),
                    Op::Le => self.max_length = Some(n),
                    Op::Lt => {
                        if n == 0 {
                            return Err("length cannot be below 0".into());
                        }
                        self.max_length = Some(n - 1);
                    }
                    Op::Eq => {
                        self.min_length = Some(n);
                        self.max_length = Some(n);
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        match (self.min, self.max) {
            (Some(min), Some(max)) => parts.push(format!("{} <= value <= {}", min, max)),
            (Some(min), None) => parts.push(format!("value >= {}", min)),
            (None, Some(max)) => parts.push(format!("value <= {}", max)),
            (None, None) => {}
        }
        match (self.min_length, self.max_length) {
            (Some(min), Some(max)) => parts.push(format!("{} <= len <= {}", min, max)),
            (Some(min), None) => parts.push(format!("len >= {}", min)),
            (None, Some(max)) => parts.push(format!("len <= {}", max)),
            (None, None) => {}
        }
        write!(f, "{}", parts.join(", "))
    }
}

fn tokenize(clause: &str) -> Vec<Token> {
    let chars: Vec<char> = clause.chars().collect();
    let mut tokens = Vec::new();
    let mut term = String::new();
    let mut i = 0;

    while i < chars.len() {
        let op = match (chars[i], chars.get(i + 1).copied()) {
            ('<', Some('=')) => Some((Op::Le, 2)),
            ('>', Some('=')) => Some((Op::Ge, 2)),
            ('=', Some('=')) => Some((Op::Eq, 2)),
            ('<', _) => Some((Op::Lt, 1)),
            ('>', _) => Some((Op::Gt, 1)),
            ('=', _) | (':', _) => Some((Op::Eq, 1)),
            _ => None,
        };

        match op {
            Some((op, width)) => {
                push_term(&mut tokens, &mut term);
                tokens.push(Token::Op(op));
                i += width;
            }
            None => {
                term.push(chars[i]);
                i += 1;
            }
        }
    }
    push_term(&mut tokens, &mut term);
    tokens
}

fn push_term(tokens: &mut Vec<Token>, term: &mut String) {
    let trimmed = term.trim();
    if !trimmed.is_empty() {
        tokens.push(Token::Term(trimmed.to_string()));
    }
    term.clear();
}

fn subject(term: &str) -> Option<Subject> {
    match term.trim().to_ascii_lowercase().as_str() {
        "value" | "val" | "x" | "v" => Some(Subject::Value),
        "len" | "length" | "size" | "count" | "len(value)" | "len(x)" => Some(Subject::Length),
        _ => None,
    }
}

fn parse_number(term: &str) -> Option<f64> {
    term.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn flip(op: Op) -> Op {
    match op {
        Op::Le => Op::Ge,
        Op::Ge => Op::Le,
        Op::Lt => Op::Gt,
        Op::Gt => Op::Lt,
        Op::Eq => Op::Eq,
    }
}
