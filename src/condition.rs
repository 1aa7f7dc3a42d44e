use crate::{BinaryOpType, Expr, Value};

/// A single declarative constraint on one column.
///
/// A plain value implies equality; the other variants tag the value with the
/// comparison to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equal(Value),
    NotEqual(Value),
    Less(Value),
    Greater(Value),
    LessEqual(Value),
    GreaterEqual(Value),
    Between(Value, Value),
    In(Vec<Value>),
}

impl Condition {
    fn into_expr(self, column: &str) -> Expr {
        fn binary(op: BinaryOpType, column: &str, value: Value) -> Expr {
            Expr::binary(op, Expr::column(column), Expr::Literal(value))
        }
        match self {
            Condition::Equal(v) => binary(BinaryOpType::Equal, column, v),
            Condition::NotEqual(v) => binary(BinaryOpType::NotEqual, column, v),
            Condition::Less(v) => binary(BinaryOpType::Less, column, v),
            Condition::Greater(v) => binary(BinaryOpType::Greater, column, v),
            Condition::LessEqual(v) => binary(BinaryOpType::LessEqual, column, v),
            Condition::GreaterEqual(v) => binary(BinaryOpType::GreaterEqual, column, v),
            Condition::Between(low, high) => Expr::Between {
                subject: Box::new(Expr::column(column)),
                low: Box::new(Expr::Literal(low)),
                high: Box::new(Expr::Literal(high)),
            },
            Condition::In(values) => Expr::InList {
                subject: Box::new(Expr::column(column)),
                values: values.into_iter().map(Expr::Literal).collect(),
            },
        }
    }
}

/// A condition map: column names to constraints, combined under AND.
///
/// Keys are unique and keep their insertion order, so translation is stable
/// across runs. Maps are built per call and consumed once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions(Vec<(String, Condition)>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the constraint for a column, replacing any previous one in place.
    pub fn insert(&mut self, column: impl Into<String>, condition: Condition) {
        let column = column.into();
        if let Some(entry) = self.0.iter_mut().find(|(name, _)| *name == column) {
            entry.1 = condition;
        } else {
            self.0.push((column, condition));
        }
    }

    pub fn with(mut self, column: impl Into<String>, condition: Condition) -> Self {
        self.insert(column, condition);
        self
    }

    /// Shorthand for the common equality constraint.
    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(column, Condition::Equal(value.into()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Condition)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Translate a condition map into a where-clause tree.
///
/// An empty map yields no clause, a single entry degenerates to its bare node
/// and multiple entries combine under a single conjunction.
pub fn where_clause(conditions: &Conditions) -> Option<Expr> {
    let mut nodes = conditions
        .iter()
        .map(|(column, condition)| condition.clone().into_expr(column));
    match conditions.len() {
        0 => None,
        1 => nodes.next(),
        _ => Some(Expr::And(nodes.collect())),
    }
}
