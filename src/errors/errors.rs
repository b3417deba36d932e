use std::fmt::Display;

use thiserror::Error;

use crate::Position;

/// A diagnostic reported by the lexer, the parser or the type checker.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_internal_error(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => "UnrecognisedToken",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::UnexpectedTokenDetailed { .. } => "UnexpectedTokenDetailed",
            ErrorImpl::NumberParseError { .. } => "NumberParseError",
            ErrorImpl::UnterminatedString => "UnterminatedString",
            ErrorImpl::VariableAlreadyDeclared { .. } => "VariableAlreadyDeclared",
            ErrorImpl::VariableNotDeclared { .. } => "VariableNotDeclared",
            ErrorImpl::FunctionAlreadyDeclared { .. } => "FunctionAlreadyDeclared",
            ErrorImpl::FunctionNotDeclared { .. } => "FunctionNotDeclared",
            ErrorImpl::UnexpectedArguments { .. } => "UnexpectedArguments",
            ErrorImpl::MissingArguments { .. } => "MissingArguments",
            ErrorImpl::ArgumentTypeMatchError { .. } => "ArgumentTypeMatchError",
            ErrorImpl::TypeMatchError { .. } => "TypeMatchError",
            ErrorImpl::AssignmentCountMismatch { .. } => "AssignmentCountMismatch",
            ErrorImpl::UnknownType { .. } => "UnknownType",
            ErrorImpl::NotCallable { .. } => "NotCallable",
            ErrorImpl::VoidValue => "VoidValue",
            ErrorImpl::BreakOutsideLoop => "BreakOutsideLoop",
            ErrorImpl::ContinueOutsideLoop => "ContinueOutsideLoop",
            ErrorImpl::ReturnOutsideFunction => "ReturnOutsideFunction",
            ErrorImpl::CapturedVariable { .. } => "CapturedVariable",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => ErrorTip::None,
            ErrorImpl::UnexpectedToken { token } => ErrorTip::Suggestion(format!(
                "Unexpected token: `{}`, did you miss a semicolon?",
                token
            )),
            ErrorImpl::UnexpectedTokenDetailed { token, message } => {
                ErrorTip::Suggestion(format!("Unexpected token: `{}`, {}", token, message))
            }
            ErrorImpl::NumberParseError { token } => {
                ErrorTip::Suggestion(format!("Invalid number: `{}`", token))
            }
            ErrorImpl::UnterminatedString => {
                ErrorTip::Suggestion(String::from("String literal is missing its closing quote"))
            }
            ErrorImpl::VariableAlreadyDeclared { variable } => {
                ErrorTip::Suggestion(format!("Variable `{}` already declared", variable))
            }
            ErrorImpl::VariableNotDeclared { variable } => {
                ErrorTip::Suggestion(format!("Variable `{}` not declared", variable))
            }
            ErrorImpl::FunctionAlreadyDeclared { function } => {
                ErrorTip::Suggestion(format!("Function `{}` already declared", function))
            }
            ErrorImpl::FunctionNotDeclared { function } => {
                ErrorTip::Suggestion(format!("Function `{}` not declared", function))
            }
            ErrorImpl::UnexpectedArguments { expected, received } => ErrorTip::Suggestion(format!(
                "Expected {} arguments, received {}",
                expected, received
            )),
            ErrorImpl::MissingArguments { expected, received } => ErrorTip::Suggestion(format!(
                "Expected {} arguments, received {}",
                expected, received
            )),
            ErrorImpl::ArgumentTypeMatchError { expected, received } => {
                ErrorTip::Suggestion(format!(
                    "Expected argument type `{}`, received `{}`",
                    expected, received
                ))
            }
            ErrorImpl::TypeMatchError { expected, received } => ErrorTip::Suggestion(format!(
                "Expected type `{}`, received `{}`",
                expected, received
            )),
            ErrorImpl::AssignmentCountMismatch { targets, values } => {
                ErrorTip::Suggestion(format!(
                    "{} targets are assigned {} values",
                    targets, values
                ))
            }
            ErrorImpl::UnknownType { type_ } => {
                ErrorTip::Suggestion(format!("Unknown type `{}` found", type_))
            }
            ErrorImpl::NotCallable { name, type_ } => ErrorTip::Suggestion(format!(
                "`{}` has type `{}` and cannot be called",
                name, type_
            )),
            ErrorImpl::VoidValue => ErrorTip::Suggestion(String::from(
                "This expression produces no value",
            )),
            ErrorImpl::BreakOutsideLoop => {
                ErrorTip::Suggestion(String::from("`break` is only allowed inside a loop"))
            }
            ErrorImpl::ContinueOutsideLoop => {
                ErrorTip::Suggestion(String::from("`continue` is only allowed inside a loop"))
            }
            ErrorImpl::ReturnOutsideFunction => ErrorTip::Suggestion(String::from(
                "Only functions and lambdas can return a value",
            )),
            ErrorImpl::CapturedVariable { variable } => ErrorTip::Suggestion(format!(
                "Lambdas cannot capture `{}` from an enclosing function",
                variable
            )),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.position.line, self.position.column, self.internal_error
        )
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("unrecognised token: {token:?}")]
    UnrecognisedToken { token: String },
    #[error("unexpected token: {token:?}")]
    UnexpectedToken { token: String },
    #[error("unexpected token ({message:?}): {token:?}")]
    UnexpectedTokenDetailed { token: String, message: String },
    #[error("error parsing number: {token:?}")]
    NumberParseError { token: String },
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("variable {variable:?} already declared")]
    VariableAlreadyDeclared { variable: String },
    #[error("variable {variable:?} not declared")]
    VariableNotDeclared { variable: String },
    #[error("function {function:?} already declared")]
    FunctionAlreadyDeclared { function: String },
    #[error("function {function:?} not declared")]
    FunctionNotDeclared { function: String },
    #[error("unexpected arguments: expected {expected:?}, received {received:?}")]
    UnexpectedArguments { expected: usize, received: usize },
    #[error("missing arguments: expected {expected:?}, received {received:?}")]
    MissingArguments { expected: usize, received: usize },
    #[error("argument types do not match: expected {expected:?}, received {received:?}")]
    ArgumentTypeMatchError { expected: String, received: String },
    #[error("types do not match: expected {expected:?}, received {received:?}")]
    TypeMatchError { expected: String, received: String },
    #[error("{targets} assignment targets but {values} values")]
    AssignmentCountMismatch { targets: usize, values: usize },
    #[error("unknown type {type_} found")]
    UnknownType { type_: String },
    #[error("{name:?} of type {type_} is not callable")]
    NotCallable { name: String, type_: String },
    #[error("expression has no value")]
    VoidValue,
    #[error("break outside of a loop")]
    BreakOutsideLoop,
    #[error("continue outside of a loop")]
    ContinueOutsideLoop,
    #[error("return with a value outside of a function")]
    ReturnOutsideFunction,
    #[error("lambda captures local variable {variable:?}")]
    CapturedVariable { variable: String },
}

/// Fatal errors raised while generating a module.
///
/// Each of these means the checker accepted something it should have
/// rejected, or a configured limit was hit. Generation of the unit stops.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("cannot resolve callee `{name}` at line {line}")]
    UnresolvedCallee { name: String, line: u32 },
    #[error("cannot resolve variable `{name}` at line {line}")]
    UnresolvedVariable { name: String, line: u32 },
    #[error("no function information recorded for `{name}`")]
    MissingFunctionInfo { name: String },
    #[error("no signature recorded for lambda at line {line}")]
    MissingLambdaSignature { line: u32 },
    #[error("`break` at line {line} reached code generation outside of a loop")]
    BreakOutsideLoop { line: u32 },
    #[error("`continue` at line {line} reached code generation outside of a loop")]
    ContinueOutsideLoop { line: u32 },
    #[error("function `{function}` needs more than {limit} {kind} scratch locals")]
    ScratchLocalsExhausted {
        function: String,
        kind: &'static str,
        limit: u32,
    },
    #[error("module needs {required} table slots but the limit is {capacity}")]
    TableCapacityExceeded { required: u32, capacity: u32 },
    #[error("expression at line {line} produces no value")]
    VoidValue { line: u32 },
    #[error("invalid assignment target at line {line}")]
    InvalidAssignmentTarget { line: u32 },
}
