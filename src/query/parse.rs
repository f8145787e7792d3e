use super::ops::{CompareOp, EltwiseOp, MaskCombine, QueryOp, ReductionOp};
use super::tokens::{tokenize, QueryOperator, Token};
use crate::errors::{DafError, DafResult};

/// A parsed query: a pipeline of operations over a reader.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    text: String,
    ops: Vec<QueryOp>,
}

impl Query {
    pub fn parse(text: &str) -> DafResult<Query> {
        let tokens = tokenize(text)?;
        let ops = Parser::new(text, tokens).run()?;
        Ok(Query {
            text: text.to_string(),
            ops,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn ops(&self) -> &[QueryOp] {
        &self.ops
    }
}

impl std::str::FromStr for Query {
    type Err = DafError;

    fn from_str(text: &str) -> DafResult<Query> {
        Query::parse(text)
    }
}

struct Parser {
    query: String,
    tokens: Vec<Token>,
    position: usize,
    ops: Vec<QueryOp>,
    /// Whether a `?` here means "default for the preceding lookup" rather
    /// than "names of the current scope".
    after_lookup: bool,
}

impl Parser {
    fn new(query: &str, tokens: Vec<Token>) -> Self {
        Self {
            query: query.to_string(),
            tokens,
            position: 0,
            ops: Vec::new(),
            after_lookup: false,
        }
    }

    fn error(&self, reason: impl Into<String>) -> DafError {
        let position = self
            .tokens
            .get(self.position.min(self.tokens.len().saturating_sub(1)))
            .map(|token| token.position())
            .unwrap_or(self.query.len());
        DafError::QuerySyntaxError {
            query: self.query.clone(),
            position,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next_operator(&mut self) -> Option<QueryOperator> {
        match self.peek() {
            Some(Token::Operator { operator, .. }) => {
                let operator = *operator;
                self.position += 1;
                Some(operator)
            }
            _ => None,
        }
    }

    fn expect_value(&mut self, what: &str) -> DafResult<String> {
        match self.peek() {
            Some(Token::Value { text, .. }) => {
                let text = text.clone();
                self.position += 1;
                Ok(text)
            }
            _ => Err(self.error(format!("expected {}", what))),
        }
    }

    fn maybe_value(&mut self) -> Option<String> {
        match self.peek() {
            Some(Token::Value { text, .. }) => {
                let text = text.clone();
                self.position += 1;
                Some(text)
            }
            _ => None,
        }
    }

    /// Consume trailing `name value` parameter pairs of an operation name.
    fn parameter_pairs(&mut self) -> DafResult<Vec<(String, String)>> {
        let mut params = Vec::new();
        while let Some(name) = self.maybe_value() {
            let value = self.expect_value("a parameter value")?;
            params.push((name, value));
        }
        Ok(params)
    }

    fn compare_op(operator: QueryOperator) -> Option<CompareOp> {
        match operator {
            QueryOperator::Eq => Some(CompareOp::Equal),
            QueryOperator::Ne => Some(CompareOp::NotEqual),
            QueryOperator::Lt => Some(CompareOp::Less),
            QueryOperator::Le => Some(CompareOp::LessOrEqual),
            QueryOperator::Gt => Some(CompareOp::Greater),
            QueryOperator::Ge => Some(CompareOp::GreaterOrEqual),
            QueryOperator::Match => Some(CompareOp::Match),
            QueryOperator::NotMatch => Some(CompareOp::NotMatch),
            _ => None,
        }
    }

    fn run(mut self) -> DafResult<Vec<QueryOp>> {
        while self.position < self.tokens.len() {
            let operator = match self.next_operator() {
                Some(operator) => operator,
                None => return Err(self.error("expected an operator")),
            };
            if let Some(compare) = Self::compare_op(operator) {
                let value = self.expect_value("a comparison value")?;
                self.ops.push(QueryOp::Compare(compare, value));
                continue;
            }
            match operator {
                QueryOperator::Axis => {
                    let axis = self.expect_value("an axis name")?;
                    self.ops.push(QueryOp::Axis(axis));
                    self.after_lookup = false;
                }
                QueryOperator::Lookup => {
                    let name = self.expect_value("a property name")?;
                    self.ops.push(QueryOp::Lookup(name));
                    self.after_lookup = true;
                }
                QueryOperator::Fetch => {
                    let name = self.expect_value("a property name")?;
                    self.ops.push(QueryOp::Fetch(name));
                    self.after_lookup = true;
                }
                QueryOperator::AsAxis => {
                    let axis = self.expect_value("an axis name")?;
                    self.ops.push(QueryOp::AsAxis(axis));
                }
                QueryOperator::IfMissing => {
                    if self.after_lookup {
                        let value = self.expect_value("a default value")?;
                        self.ops.push(QueryOp::IfMissing(value));
                    } else if self.maybe_value().is_some() {
                        return Err(self.error("names query takes no operand"));
                    } else {
                        self.ops.push(QueryOp::Names);
                    }
                }
                QueryOperator::IfNot => {
                    let value = self.expect_value("a substitute value")?;
                    self.ops.push(QueryOp::IfNot(value));
                }
                QueryOperator::And
                | QueryOperator::AndNot
                | QueryOperator::Or
                | QueryOperator::OrNot
                | QueryOperator::Xor
                | QueryOperator::XorNot => {
                    let name = self.expect_value("a mask property name")?;
                    let (combine, negate) = match operator {
                        QueryOperator::And => (MaskCombine::And, false),
                        QueryOperator::AndNot => (MaskCombine::And, true),
                        QueryOperator::Or => (MaskCombine::Or, false),
                        QueryOperator::OrNot => (MaskCombine::Or, true),
                        QueryOperator::Xor => (MaskCombine::Xor, false),
                        _ => (MaskCombine::Xor, true),
                    };
                    self.ops.push(QueryOp::Mask {
                        combine,
                        negate,
                        name,
                    });
                    self.after_lookup = false;
                }
                QueryOperator::SquareRow | QueryOperator::SquareColumn => {
                    let name = self.expect_value("a matrix name")?;
                    match self.next_operator() {
                        Some(QueryOperator::Eq) => {}
                        _ => return Err(self.error("expected = and an entry after a square mask")),
                    }
                    let entry = self.expect_value("an axis entry")?;
                    self.ops.push(QueryOp::SquareMask {
                        name,
                        entry,
                        row: operator == QueryOperator::SquareRow,
                    });
                    self.after_lookup = false;
                }
                QueryOperator::GroupBy => {
                    let name = self.expect_value("a group property name")?;
                    self.ops.push(QueryOp::GroupBy(name));
                    self.after_lookup = false;
                }
                QueryOperator::CountBy => {
                    let name = self.expect_value("a property name")?;
                    self.ops.push(QueryOp::CountBy(name));
                    self.after_lookup = false;
                }
                QueryOperator::Eltwise => {
                    let name = self.expect_value("an operation name")?;
                    let params = self.parameter_pairs()?;
                    self.ops.push(QueryOp::Eltwise(EltwiseOp::from_name(
                        &name, &params,
                    )?));
                    self.after_lookup = false;
                }
                QueryOperator::Reduce => {
                    let name = self.expect_value("an operation name")?;
                    let params = self.parameter_pairs()?;
                    self.ops.push(QueryOp::Reduce(ReductionOp::from_name(
                        &name, &params,
                    )?));
                    self.after_lookup = true;
                }
                _ => return Err(self.error(format!("unexpected operator: {}", operator))),
            }
        }
        if self.ops.is_empty() {
            return Err(self.error("empty query"));
        }
        Ok(self.ops)
    }
}
