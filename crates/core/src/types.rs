use std::fmt;

/// A declared column type. The source spelling is kept verbatim in `raw` so
/// DDL can be re-serialized exactly; `base`/`args`/`unsigned`/`array` are the
/// decomposed form the normalizer compares.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub raw: String,
    pub base: String,
    pub args: Vec<u32>,
    pub unsigned: bool,
    pub array: bool,
}

impl TypeName {
    pub fn simple(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            raw: base.clone(),
            base: base.to_ascii_lowercase(),
            args: Vec::new(),
            unsigned: false,
            array: false,
        }
    }

    pub fn with_args(base: impl Into<String>, args: Vec<u32>) -> Self {
        let base = base.into();
        let rendered_args = args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self {
            raw: format!("{base}({rendered_args})"),
            base: base.to_ascii_lowercase(),
            args,
            unsigned: false,
            array: false,
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A scalar value carried by table options and adapter metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Null => f.write_str("NULL"),
        }
    }
}
