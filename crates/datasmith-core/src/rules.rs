//! `if`/`then` rule language over a row's own columns.
//!
//! An expression is a disjunction of conjunctions of comparisons of the form
//! `table.column <op> literal`. Comparisons are typed and three-valued: a
//! comparison whose left side cannot be resolved, or whose operands are of
//! different kinds, is `Unavailable` rather than silently false.

use regex::Regex;
use serde::Serialize;

use crate::schema::Rule;
use crate::value::{Row, Value};

/// Three-valued truth used during rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unavailable,
}

impl Truth {
    fn from_bool(value: bool) -> Self {
        if value { Truth::True } else { Truth::False }
    }

    fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unavailable,
        }
    }

    fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unavailable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
}

impl Operator {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "==" => Some(Operator::Eq),
            "!=" => Some(Operator::Ne),
            "<=" => Some(Operator::Le),
            ">=" => Some(Operator::Ge),
            "<" => Some(Operator::Lt),
            ">" => Some(Operator::Gt),
            _ => None,
        }
    }

    fn is_ordering(self) -> bool {
        !matches!(self, Operator::Eq | Operator::Ne)
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Quoted text, quotes removed.
    Text(String),
    Number(f64),
    /// Unquoted token that is not a number, such as `true`.
    Raw(String),
}

impl Literal {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        for quote in ['\'', '"'] {
            if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
                return Literal::Text(raw[1..raw.len() - 1].to_string());
            }
        }
        match raw.parse::<f64>() {
            Ok(number) if number.is_finite() => Literal::Number(number),
            _ => Literal::Raw(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub table: String,
    pub column: String,
    pub operator: Operator,
    pub literal: Literal,
}

impl Comparison {
    fn evaluate(&self, table: &str, row: &Row) -> Truth {
        if self.table != table {
            return Truth::Unavailable;
        }
        match row.get(&self.column) {
            None | Some(Value::Null) => Truth::Unavailable,
            Some(value) => compare(value, self.operator, &self.literal),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Term {
    Comparison(Comparison),
    Malformed,
}

/// Compiled expression: OR of AND clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    clauses: Vec<Vec<Term>>,
}

impl Expression {
    pub fn parse(source: &str) -> Self {
        let clauses = if source.trim().is_empty() {
            Vec::new()
        } else {
            split_keyword(source, "or")
                .into_iter()
                .map(|clause| {
                    split_keyword(clause, "and")
                        .into_iter()
                        .map(parse_term)
                        .collect()
                })
                .collect()
        };
        Self {
            source: source.to_string(),
            clauses,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against one row of `table`. An empty expression is false.
    pub fn evaluate(&self, table: &str, row: &Row) -> Truth {
        self.clauses.iter().fold(Truth::False, |acc, clause| {
            let conjunction = clause.iter().fold(Truth::True, |acc, term| {
                let value = match term {
                    Term::Comparison(comparison) => comparison.evaluate(table, row),
                    Term::Malformed => Truth::False,
                };
                acc.and(value)
            });
            acc.or(conjunction)
        })
    }
}

/// Result of checking one row against all rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleVerdict {
    Passed,
    Violated,
    /// No rule was violated, but some fired consequence could not be decided.
    NotEvaluated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub condition: Expression,
    pub then: Vec<Expression>,
}

/// Rules compiled once per run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn compile(rules: &[Rule]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|rule| CompiledRule {
                    condition: Expression::parse(&rule.condition),
                    then: rule.then.iter().map(|expr| Expression::parse(expr)).collect(),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Check a row of `table`. A rule fires only when its condition is
    /// definitely true; a fired rule is violated when a consequence is false.
    pub fn evaluate_row(&self, table: &str, row: &Row) -> RuleVerdict {
        let mut undecided = false;
        for rule in &self.rules {
            if rule.condition.evaluate(table, row) != Truth::True {
                continue;
            }
            for consequence in &rule.then {
                match consequence.evaluate(table, row) {
                    Truth::False => return RuleVerdict::Violated,
                    Truth::Unavailable => undecided = true,
                    Truth::True => {}
                }
            }
        }
        if undecided {
            RuleVerdict::NotEvaluated
        } else {
            RuleVerdict::Passed
        }
    }
}

fn split_keyword<'a>(source: &'a str, keyword: &str) -> Vec<&'a str> {
    match Regex::new(&format!(r"(?i)\s+{keyword}\s+")) {
        Ok(re) => re.split(source).collect(),
        Err(_) => vec![source],
    }
}

fn parse_term(raw: &str) -> Term {
    parse_comparison(raw.trim())
        .map(Term::Comparison)
        .unwrap_or(Term::Malformed)
}

fn parse_comparison(raw: &str) -> Option<Comparison> {
    let re = Regex::new(r"^(\w+)\.(\w+)\s*(==|!=|<=|>=|<|>)\s*(.+)$").ok()?;
    let caps = re.captures(raw)?;
    Some(Comparison {
        table: caps.get(1)?.as_str().to_string(),
        column: caps.get(2)?.as_str().to_string(),
        operator: Operator::parse(caps.get(3)?.as_str())?,
        literal: Literal::parse(caps.get(4)?.as_str()),
    })
}

fn compare(value: &Value, operator: Operator, literal: &Literal) -> Truth {
    if operator.is_ordering() {
        let left = value.numeric().or_else(|| match value {
            Value::Text(_) => value.coerce_number(),
            _ => None,
        });
        let right = match literal {
            Literal::Number(number) => Some(*number),
            Literal::Text(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Literal::Raw(_) => None,
        };
        let (Some(left), Some(right)) = (left, right) else {
            return Truth::Unavailable;
        };
        return Truth::from_bool(match operator {
            Operator::Le => left <= right,
            Operator::Ge => left >= right,
            Operator::Lt => left < right,
            _ => left > right,
        });
    }

    let equal = match (value, literal) {
        (Value::Bool(flag), Literal::Raw(token)) => match token.to_lowercase().as_str() {
            "true" => Some(*flag),
            "false" => Some(!*flag),
            _ => None,
        },
        (Value::Bool(_), _) => None,
        (_, Literal::Number(number)) => value.numeric().map(|left| left == *number),
        (Value::Int(_) | Value::Float(_) | Value::Decimal(_), _) => None,
        (_, Literal::Text(text) | Literal::Raw(text)) => Some(value.render() == *text),
    };

    match equal {
        Some(equal) => Truth::from_bool(equal == (operator == Operator::Eq)),
        None => Truth::Unavailable,
    }
}
