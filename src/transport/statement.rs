use crate::core::Value;
use crate::record::Method;
use crate::transaction::TransactionId;

/// A classified call description: what the client is about to send.
///
/// The operation kind is a tagged constructor choice, never something parsed
/// back out of the SQL text. The optional transaction token lets an adapter
/// route a statement into an existing scope when the issuing connection is
/// not the one that opened it.
///
/// # Examples
///
/// ```
/// use querymock::{Method, Statement};
///
/// let statement = Statement::select("SELECT * FROM users WHERE id = ?").bind(1);
/// assert_eq!(statement.method(), Method::Select);
/// assert_eq!(statement.bindings().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    bindings: Vec<Value>,
    method: Method,
    transaction: Option<TransactionId>,
}

impl Statement {
    fn with_method(method: Method, sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            bindings: Vec::new(),
            method,
            transaction: None,
        }
    }

    pub fn select(sql: impl Into<String>) -> Self {
        Self::with_method(Method::Select, sql)
    }

    pub fn insert(sql: impl Into<String>) -> Self {
        Self::with_method(Method::Insert, sql)
    }

    pub fn update(sql: impl Into<String>) -> Self {
        Self::with_method(Method::Update, sql)
    }

    pub fn del(sql: impl Into<String>) -> Self {
        Self::with_method(Method::Del, sql)
    }

    pub fn first(sql: impl Into<String>) -> Self {
        Self::with_method(Method::First, sql)
    }

    pub fn pluck(sql: impl Into<String>) -> Self {
        Self::with_method(Method::Pluck, sql)
    }

    pub fn count(sql: impl Into<String>) -> Self {
        Self::with_method(Method::Count, sql)
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Self::with_method(Method::Raw, sql)
    }

    /// Append one parameter value
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.bindings.push(value.into());
        self
    }

    /// Replace the parameter list wholesale
    pub fn with_bindings(mut self, bindings: Vec<Value>) -> Self {
        self.bindings = bindings;
        self
    }

    /// Route this statement into an existing transaction scope
    pub fn transacting(mut self, id: TransactionId) -> Self {
        self.transaction = Some(id);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bindings(&self) -> &[Value] {
        &self.bindings
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn transaction(&self) -> Option<TransactionId> {
        self.transaction
    }

    pub(crate) fn into_parts(self) -> (String, Vec<Value>, Method, Option<TransactionId>) {
        (self.sql, self.bindings, self.method, self.transaction)
    }
}
