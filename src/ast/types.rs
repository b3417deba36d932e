use std::fmt::Display;

/// A type written in source, e.g. `number` or `lambda(string) -> string`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnnotation {
    Number,
    String,
    Bool,
    List,
    Struct,
    Void,
    Lambda {
        params: Vec<TypeAnnotation>,
        return_type: Box<TypeAnnotation>,
    },
}

impl Display for TypeAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeAnnotation::Number => write!(f, "number"),
            TypeAnnotation::String => write!(f, "string"),
            TypeAnnotation::Bool => write!(f, "bool"),
            TypeAnnotation::List => write!(f, "list"),
            TypeAnnotation::Struct => write!(f, "struct"),
            TypeAnnotation::Void => write!(f, "void"),
            TypeAnnotation::Lambda {
                params,
                return_type,
            } => {
                write!(f, "lambda(")?;
                for (index, param) in params.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ") -> {}", return_type)
            }
        }
    }
}
