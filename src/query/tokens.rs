use std::fmt;

use crate::errors::{DafError, DafResult};

/// The operator sigils of the query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOperator {
    /// `/` select an axis (vector axis first, matrix columns axis second).
    Axis,
    /// `\` square-matrix column mask.
    SquareColumn,
    /// `:` look up a property in the current context.
    Lookup,
    /// `=>` fetch through a string vector into another axis's property.
    Fetch,
    /// `#` reinterpret a string vector as entries of a named axis.
    AsAxis,
    /// `?` default for a missing property (or an empty group after `%>`).
    IfMissing,
    /// `!` substitute for empty strings.
    IfNot,
    /// `&` restrict the axis by a mask clause.
    And,
    /// `&!` restrict by a negated mask clause.
    AndNot,
    /// `|` widen the axis mask.
    Or,
    /// `|!` widen by a negated mask clause.
    OrNot,
    /// `^` symmetric-difference mask clause.
    Xor,
    /// `^!` negated symmetric-difference mask clause.
    XorNot,
    /// `;` square-matrix row mask.
    SquareRow,
    /// `@` group the current vector by a string vector.
    GroupBy,
    /// `%` element-wise operation.
    Eltwise,
    /// `%>` reduction operation.
    Reduce,
    /// `%#` count-by (cross tabulation) of two string vectors.
    CountBy,
    /// `=` equality comparison.
    Eq,
    /// `!=` inequality comparison.
    Ne,
    /// `<` less-than comparison.
    Lt,
    /// `<=` less-or-equal comparison.
    Le,
    /// `>` greater-than comparison.
    Gt,
    /// `>=` greater-or-equal comparison.
    Ge,
    /// `~` regular-expression match.
    Match,
    /// `!~` negated regular-expression match.
    NotMatch,
}

impl QueryOperator {
    pub fn sigil(self) -> &'static str {
        match self {
            QueryOperator::Axis => "/",
            QueryOperator::SquareColumn => "\\",
            QueryOperator::Lookup => ":",
            QueryOperator::Fetch => "=>",
            QueryOperator::AsAxis => "#",
            QueryOperator::IfMissing => "?",
            QueryOperator::IfNot => "!",
            QueryOperator::And => "&",
            QueryOperator::AndNot => "&!",
            QueryOperator::Or => "|",
            QueryOperator::OrNot => "|!",
            QueryOperator::Xor => "^",
            QueryOperator::XorNot => "^!",
            QueryOperator::SquareRow => ";",
            QueryOperator::GroupBy => "@",
            QueryOperator::Eltwise => "%",
            QueryOperator::Reduce => "%>",
            QueryOperator::CountBy => "%#",
            QueryOperator::Eq => "=",
            QueryOperator::Ne => "!=",
            QueryOperator::Lt => "<",
            QueryOperator::Le => "<=",
            QueryOperator::Gt => ">",
            QueryOperator::Ge => ">=",
            QueryOperator::Match => "~",
            QueryOperator::NotMatch => "!~",
        }
    }
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sigil())
    }
}

/// Two-character operators, matched before the single-character ones.
const TWO_CHAR_OPERATORS: [(&str, QueryOperator); 10] = [
    ("=>", QueryOperator::Fetch),
    ("&!", QueryOperator::AndNot),
    ("|!", QueryOperator::OrNot),
    ("^!", QueryOperator::XorNot),
    ("%>", QueryOperator::Reduce),
    ("%#", QueryOperator::CountBy),
    ("!=", QueryOperator::Ne),
    ("!~", QueryOperator::NotMatch),
    ("<=", QueryOperator::Le),
    (">=", QueryOperator::Ge),
];

const ONE_CHAR_OPERATORS: [(char, QueryOperator); 16] = [
    ('/', QueryOperator::Axis),
    ('\\', QueryOperator::SquareColumn),
    (':', QueryOperator::Lookup),
    ('#', QueryOperator::AsAxis),
    ('?', QueryOperator::IfMissing),
    ('!', QueryOperator::IfNot),
    ('&', QueryOperator::And),
    ('|', QueryOperator::Or),
    ('^', QueryOperator::Xor),
    (';', QueryOperator::SquareRow),
    ('@', QueryOperator::GroupBy),
    ('%', QueryOperator::Eltwise),
    ('=', QueryOperator::Eq),
    ('<', QueryOperator::Lt),
    ('>', QueryOperator::Gt),
    ('~', QueryOperator::Match),
];

/// A lexical unit of a query string.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Operator { operator: QueryOperator, position: usize },
    Value { text: String, position: usize },
}

impl Token {
    pub fn position(&self) -> usize {
        match self {
            Token::Operator { position, .. } | Token::Value { position, .. } => *position,
        }
    }
}

/// Characters legal in an unescaped value token.
pub fn is_value_char(character: char) -> bool {
    character.is_alphanumeric() || matches!(character, '_' | '.' | '+' | '-')
}

/// Escape a value so it round-trips through the tokenizer unchanged.
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        if !is_value_char(character) {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    escaped
}

/// Strip the backslash escapes introduced by [`escape_value`].
pub fn unescape_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut characters = value.chars();
    while let Some(character) = characters.next() {
        if character == '\\' {
            if let Some(escaped) = characters.next() {
                unescaped.push(escaped);
            }
        } else {
            unescaped.push(character);
        }
    }
    unescaped
}

fn syntax_error(query: &str, position: usize, reason: impl Into<String>) -> DafError {
    DafError::QuerySyntaxError {
        query: query.to_string(),
        position,
        reason: reason.into(),
    }
}

/// Split a query string into operator and value tokens.
///
/// Operators match longest-first; values are bare runs of value characters
/// (with backslash escapes) or quoted with `'` or `"`.
pub fn tokenize(query: &str) -> DafResult<Vec<Token>> {
    let characters: Vec<char> = query.chars().collect();
    let mut tokens = Vec::new();
    let mut position = 0usize;

    while position < characters.len() {
        let character = characters[position];
        if character.is_whitespace() {
            position += 1;
            continue;
        }

        let rest: String = characters[position..].iter().collect();
        if let Some((sigil, operator)) = TWO_CHAR_OPERATORS
            .iter()
            .find(|(sigil, _)| rest.starts_with(*sigil))
        {
            tokens.push(Token::Operator {
                operator: *operator,
                position,
            });
            position += sigil.len();
            continue;
        }
        if let Some((_, operator)) = ONE_CHAR_OPERATORS
            .iter()
            .find(|(sigil, _)| *sigil == character)
        {
            tokens.push(Token::Operator {
                operator: *operator,
                position,
            });
            position += 1;
            continue;
        }

        if character == '\'' || character == '"' {
            let quote = character;
            let start = position;
            position += 1;
            let mut text = String::new();
            loop {
                match characters.get(position) {
                    None => return Err(syntax_error(query, start, "unterminated quoted value")),
                    Some(&c) if c == quote => {
                        position += 1;
                        break;
                    }
                    Some('\\') => {
                        position += 1;
                        match characters.get(position) {
                            None => {
                                return Err(syntax_error(query, start, "dangling escape"));
                            }
                            Some(&escaped) => {
                                text.push(escaped);
                                position += 1;
                            }
                        }
                    }
                    Some(&c) => {
                        text.push(c);
                        position += 1;
                    }
                }
            }
            tokens.push(Token::Value {
                text,
                position: start,
            });
            continue;
        }

        if is_value_char(character) || character == '\\' {
            let start = position;
            let mut text = String::new();
            while let Some(&c) = characters.get(position) {
                if c == '\\' {
                    position += 1;
                    match characters.get(position) {
                        None => return Err(syntax_error(query, start, "dangling escape")),
                        Some(&escaped) => {
                            text.push(escaped);
                            position += 1;
                        }
                    }
                } else if is_value_char(c) {
                    text.push(c);
                    position += 1;
                } else {
                    break;
                }
            }
            tokens.push(Token::Value {
                text,
                position: start,
            });
            continue;
        }

        return Err(syntax_error(
            query,
            position,
            format!("unexpected character: {}", character),
        ));
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operators_of(query: &str) -> Vec<QueryOperator> {
        tokenize(query)
            .unwrap()
            .into_iter()
            .filter_map(|token| match token {
                Token::Operator { operator, .. } => Some(operator),
                Token::Value { .. } => None,
            })
            .collect()
    }

    fn values_of(query: &str) -> Vec<String> {
        tokenize(query)
            .unwrap()
            .into_iter()
            .filter_map(|token| match token {
                Token::Value { text, .. } => Some(text),
                Token::Operator { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_tokenize_vector_query() {
        assert_eq!(
            operators_of("/ cell : age"),
            vec![QueryOperator::Axis, QueryOperator::Lookup]
        );
        assert_eq!(values_of("/ cell : age"), vec!["cell", "age"]);
    }

    #[test]
    fn test_longest_match_wins() {
        assert_eq!(
            operators_of("/ cell : age %> Sum"),
            vec![
                QueryOperator::Axis,
                QueryOperator::Lookup,
                QueryOperator::Reduce
            ]
        );
        assert_eq!(operators_of("!= x")[0], QueryOperator::Ne);
        assert_eq!(operators_of("! x")[0], QueryOperator::IfNot);
        assert_eq!(operators_of("=> x")[0], QueryOperator::Fetch);
        assert_eq!(operators_of("= x")[0], QueryOperator::Eq);
    }

    #[test]
    fn test_escape_round_trip() {
        let ugly = "a b/c:d";
        let escaped = escape_value(ugly);
        assert_eq!(escaped, "a\\ b\\/c\\:d");
        assert_eq!(unescape_value(&escaped), ugly);
        assert_eq!(values_of(&format!(": {}", escaped)), vec![ugly.to_string()]);
    }

    #[test]
    fn test_quoted_values() {
        assert_eq!(values_of(": 'a b c'"), vec!["a b c"]);
        assert_eq!(values_of(": \"x 'y' z\""), vec!["x 'y' z"]);
    }

    #[test]
    fn test_unterminated_quote_is_an_error() {
        assert!(matches!(
            tokenize(": 'oops"),
            Err(DafError::QuerySyntaxError { .. })
        ));
    }

    #[test]
    fn test_positions_are_reported() {
        let tokens = tokenize("/ cell").unwrap();
        assert_eq!(tokens[0].position(), 0);
        assert_eq!(tokens[1].position(), 2);
    }
}
