use crate::ast::NodeId;
use std::fmt;

pub const SYMBOL_UNDEFINED: &str = "Undefined";
pub const SYMBOL_NULL: &str = "Null";

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    String(String),
    /// Executable body stored under a name (a function, or a block value).
    Body(NodeId),
    /// Result of reading a name that is not visible.
    Undefined,
    /// Result of a body or call that returned nothing.
    Null,
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Body(_) => true,
            Value::Undefined | Value::Null => false,
        }
    }

    /// Numeric reading used by arithmetic: strings are parsed, anything else is NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    /// Integer reading used by the bitwise operators (wraps to 32 bits).
    pub fn to_int32(&self) -> i32 {
        let n = self.to_number();
        if !n.is_finite() {
            return 0;
        }
        let wrapped = n.trunc().rem_euclid(4_294_967_296.0);
        wrapped as u32 as i32
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        // Covers -0 as well
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Body(_) => write!(f, "[body]"),
            Value::Undefined => write!(f, "{}", SYMBOL_UNDEFINED),
            Value::Null => write!(f, "{}", SYMBOL_NULL),
        }
    }
}
