use crate::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOpType {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

/// A where-clause tree built at runtime from condition maps.
///
/// This is a structured document, never SQL text: rendering into a concrete
/// dialect is the job of the connection collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(Value),
    Binary {
        op: BinaryOpType,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Between {
        subject: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    InList {
        subject: Box<Expr>,
        values: Vec<Expr>,
    },
    /// N-ary conjunction. Children are kept flat, an `And` never directly
    /// contains another `And` produced by [`Expr::conjoin`].
    And(Vec<Expr>),
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn binary(op: BinaryOpType, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Merge two optional clauses under AND.
    ///
    /// If only one side is present it is returned unmodified; two present
    /// sides are combined into a single flattened conjunction.
    pub fn conjoin(lhs: Option<Expr>, rhs: Option<Expr>) -> Option<Expr> {
        match (lhs, rhs) {
            (None, other) | (other, None) => other,
            (Some(lhs), Some(rhs)) => {
                let mut children = match lhs {
                    Expr::And(children) => children,
                    other => vec![other],
                };
                match rhs {
                    Expr::And(more) => children.extend(more),
                    other => children.push(other),
                }
                Some(Expr::And(children))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq_node(column: &str, value: i64) -> Expr {
        Expr::binary(BinaryOpType::Equal, Expr::column(column), Expr::literal(value))
    }

    #[test]
    fn conjoin_identities() {
        assert_eq!(Expr::conjoin(None, None), None);
        let node = eq_node("id", 1);
        assert_eq!(Expr::conjoin(Some(node.clone()), None), Some(node.clone()));
        assert_eq!(Expr::conjoin(None, Some(node.clone())), Some(node));
    }

    #[test]
    fn conjoin_flattens() {
        let a = eq_node("a", 1);
        let b = eq_node("b", 2);
        let c = eq_node("c", 3);
        let merged = Expr::conjoin(
            Expr::conjoin(Some(a.clone()), Some(b.clone())),
            Some(c.clone()),
        );
        assert_eq!(merged, Some(Expr::And(vec![a, b, c])));
    }
}
