use parsekit::{TokenCursor, Tokenizer};

mod test_calculator;
mod test_mixed_grammar;
mod test_tokenizer_config;

fn tokenize(src: &str) -> TokenCursor {
    Tokenizer::new().tokenize(src, "calc").unwrap()
}

fn texts(cursor: &TokenCursor) -> Vec<&str> {
    cursor.tokens().iter().map(|token| token.text()).collect()
}

/// Arithmetic trees shared by the calculator tests.
#[derive(Clone, PartialEq, Debug)]
enum Expr {
    Num(i64),
    Op(String),
    Neg(Box<Expr>),
    Binary(Box<Expr>, String, Box<Expr>),
}

impl Expr {
    fn binary(lhs: Expr, op: &str, rhs: Expr) -> Self {
        Self::Binary(Box::new(lhs), op.to_string(), Box::new(rhs))
    }

    fn eval(&self) -> i64 {
        match self {
            Self::Num(value) => *value,
            Self::Op(op) => panic!("dangling operator {op}"),
            Self::Neg(inner) => -inner.eval(),
            Self::Binary(lhs, op, rhs) => {
                let (lhs, rhs) = (lhs.eval(), rhs.eval());
                match op.as_str() {
                    "+" => lhs + rhs,
                    "-" => lhs - rhs,
                    "*" => lhs * rhs,
                    "/" => lhs / rhs,
                    "^" => lhs.pow(rhs as u32),
                    other => panic!("unknown operator {other}"),
                }
            }
        }
    }
}

fn number(text: &str) -> Result<Expr, String> {
    text.parse()
        .map(Expr::Num)
        .map_err(|_| format!("`{text}' is not a number"))
}
