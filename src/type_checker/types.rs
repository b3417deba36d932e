use std::fmt::Display;

use crate::ast::types::TypeAnnotation;

/// The static type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Number,
    Bool,
    String,
    List,
    Struct,
    Lambda,
    Void,
    Null,
    /// Element reads and other values whose type is only known at runtime.
    Unknown,
}

/// The two value representations of the target machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValType {
    F64,
    I32,
}

impl Display for ValType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValType::F64 => write!(f, "f64"),
            ValType::I32 => write!(f, "i32"),
        }
    }
}

impl Type {
    pub fn from_annotation(annotation: &TypeAnnotation) -> Type {
        match annotation {
            TypeAnnotation::Number => Type::Number,
            TypeAnnotation::String => Type::String,
            TypeAnnotation::Bool => Type::Bool,
            TypeAnnotation::List => Type::List,
            TypeAnnotation::Struct => Type::Struct,
            TypeAnnotation::Void => Type::Void,
            TypeAnnotation::Lambda { .. } => Type::Lambda,
        }
    }

    /// The slot a value of this type occupies. `Void` has none.
    pub fn val_type(&self) -> Option<ValType> {
        match self {
            Type::Number | Type::Bool | Type::Unknown => Some(ValType::F64),
            Type::String | Type::List | Type::Struct | Type::Lambda | Type::Null => {
                Some(ValType::I32)
            }
            Type::Void => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Number | Type::Bool | Type::Unknown)
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Type::String | Type::List | Type::Struct | Type::Lambda | Type::Null
        )
    }

    /// Whether a value of type `other` may be used where `self` is expected.
    pub fn is_compatible(&self, other: &Type) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            (Type::Unknown, _) | (_, Type::Unknown) => true,
            (Type::Number, Type::Bool) | (Type::Bool, Type::Number) => true,
            (Type::Null, b) => b.is_reference(),
            (a, Type::Null) => a.is_reference(),
            _ => false,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Type::Number => "number",
            Type::Bool => "bool",
            Type::String => "string",
            Type::List => "list",
            Type::Struct => "struct",
            Type::Lambda => "lambda",
            Type::Void => "void",
            Type::Null => "null",
            Type::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
    pub signature: Option<LambdaSignature>,
}

impl Parameter {
    pub fn new(name: &str, annotation: Option<&TypeAnnotation>) -> Self {
        Parameter {
            name: name.to_string(),
            ty: annotation.map(Type::from_annotation).unwrap_or(Type::Number),
            signature: annotation.and_then(LambdaSignature::from_annotation),
        }
    }
}

/// Parameter and result types of a lambda value.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaSignature {
    pub params: Vec<Parameter>,
    pub return_type: Type,
    pub return_signature: Option<Box<LambdaSignature>>,
    /// Name of the scope that owns the lambda's parameters and locals.
    /// Only lambda literals have one; signatures written as annotations
    /// describe values and carry `None`.
    pub scope: Option<String>,
}

impl LambdaSignature {
    /// Signature described by a `lambda(...) -> T` annotation, if it is one.
    pub fn from_annotation(annotation: &TypeAnnotation) -> Option<LambdaSignature> {
        match annotation {
            TypeAnnotation::Lambda {
                params,
                return_type,
            } => Some(LambdaSignature {
                params: params
                    .iter()
                    .enumerate()
                    .map(|(index, param)| Parameter::new(&format!("arg{}", index), Some(param)))
                    .collect(),
                return_type: Type::from_annotation(return_type),
                return_signature: LambdaSignature::from_annotation(return_type).map(Box::new),
                scope: None,
            }),
            _ => None,
        }
    }

    /// The parameter and result slots after lowering.
    pub fn lowered(&self) -> (Vec<ValType>, Option<ValType>) {
        let params = self
            .params
            .iter()
            .map(|param| param.ty.val_type().unwrap_or(ValType::F64))
            .collect();
        (params, self.return_type.val_type())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    pub name: String,
    pub ty: Type,
    /// Name of the declaring scope: `global`, a function name or `lambda#<n>`.
    pub scope: String,
    pub line: u32,
    pub is_parameter: bool,
    pub initialized: bool,
    pub signature: Option<LambdaSignature>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Type,
    pub return_signature: Option<LambdaSignature>,
    pub line: u32,
}
