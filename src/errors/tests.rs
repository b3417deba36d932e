//! Unit tests for error handling.
//!
//! This module contains tests for error types and error reporting.

use crate::errors::errors::{CompileError, Error, ErrorImpl, ErrorTip};
use crate::Position;

#[test]
fn test_error_creation() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "@".to_string(),
        },
        Position::new(10, 1, 11),
    );

    assert_eq!(error.get_error_name(), "UnrecognisedToken");
}

#[test]
fn test_error_position() {
    let pos = Position::new(42, 3, 7);
    let error = Error::new(
        ErrorImpl::UnexpectedToken {
            token: "identifier".to_string(),
        },
        pos,
    );

    assert_eq!(error.get_position().offset, 42);
    assert_eq!(error.get_position().line, 3);
    assert_eq!(error.get_position().column, 7);
}

#[test]
fn test_type_mismatch_error() {
    let error = Error::new(
        ErrorImpl::TypeMatchError {
            expected: "number".to_string(),
            received: "string".to_string(),
        },
        Position::null(),
    );

    assert_eq!(error.get_error_name(), "TypeMatchError");
    assert_eq!(
        error.get_tip().to_string(),
        "Expected type `number`, received `string`"
    );
}

#[test]
fn test_variable_not_declared_error() {
    let error = Error::new(
        ErrorImpl::VariableNotDeclared {
            variable: "foo".to_string(),
        },
        Position::null(),
    );

    assert_eq!(error.get_error_name(), "VariableNotDeclared");
}

#[test]
fn test_function_already_declared_error() {
    let error = Error::new(
        ErrorImpl::FunctionAlreadyDeclared {
            function: "main".to_string(),
        },
        Position::null(),
    );

    assert_eq!(error.get_error_name(), "FunctionAlreadyDeclared");
}

#[test]
fn test_loop_control_errors() {
    let error = Error::new(ErrorImpl::BreakOutsideLoop, Position::null());
    assert_eq!(error.get_error_name(), "BreakOutsideLoop");

    let error = Error::new(ErrorImpl::ContinueOutsideLoop, Position::null());
    assert_eq!(error.get_error_name(), "ContinueOutsideLoop");
}

#[test]
fn test_error_tip_none() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "@".to_string(),
        },
        Position::null(),
    );

    assert!(matches!(error.get_tip(), ErrorTip::None));
}

#[test]
fn test_error_tip_suggestion() {
    let error = Error::new(
        ErrorImpl::UnexpectedToken {
            token: "}".to_string(),
        },
        Position::null(),
    );

    match error.get_tip() {
        ErrorTip::Suggestion(_) => (),
        _ => panic!("Expected suggestion tip"),
    }
}

#[test]
fn test_error_tip_display() {
    let tip = ErrorTip::Suggestion("Try this instead".to_string());
    assert_eq!(tip.to_string(), "Try this instead");

    let tip = ErrorTip::None;
    assert_eq!(tip.to_string(), "");
}

#[test]
fn test_argument_count_errors() {
    let error = Error::new(
        ErrorImpl::UnexpectedArguments {
            expected: 2,
            received: 3,
        },
        Position::null(),
    );
    assert_eq!(error.get_error_name(), "UnexpectedArguments");

    let error = Error::new(
        ErrorImpl::MissingArguments {
            expected: 3,
            received: 1,
        },
        Position::null(),
    );
    assert_eq!(error.get_error_name(), "MissingArguments");
}

#[test]
fn test_error_display_includes_line_and_column() {
    let error = Error::new(
        ErrorImpl::CapturedVariable {
            variable: "total".to_string(),
        },
        Position::new(30, 4, 12),
    );

    assert_eq!(
        error.to_string(),
        "4:12: lambda captures local variable \"total\""
    );
}

#[test]
fn test_compile_error_messages() {
    let error = CompileError::TableCapacityExceeded {
        required: 12,
        capacity: 10,
    };
    assert_eq!(
        error.to_string(),
        "module needs 12 table slots but the limit is 10"
    );

    let error = CompileError::BreakOutsideLoop { line: 4 };
    assert_eq!(
        error.to_string(),
        "`break` at line 4 reached code generation outside of a loop"
    );
}
