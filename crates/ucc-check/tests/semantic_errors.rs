//! End-to-end semantic analysis tests: parse source text, run the
//! analyser, and check either the resulting annotations or the exact
//! diagnostic (code, message, position).

use ucc_check::{analyze, SemanticError};
use ucc_core::ast::{ExprKind, GlobalItem, Program, Stmt};
use ucc_core::types::UcType;

fn check(source: &str) -> Result<Program, SemanticError> {
    let mut program = ucc_parse::parse(source).expect("test source should parse");
    analyze(&mut program)?;
    Ok(program)
}

fn check_err(source: &str) -> SemanticError {
    check(source).expect_err("analysis should fail")
}

// -- accepted programs ------------------------------------------------------

#[test]
fn accepts_arithmetic_and_annotates_types() {
    let program = check("int main() { int a; a = 2 + 3; print(a); return a; }").unwrap();
    let GlobalItem::Func(func) = &program.items[0] else {
        panic!("expected function");
    };
    let Stmt::Expr(assign) = &func.body.stmts[0] else {
        panic!("expected assignment statement");
    };
    let ExprKind::Assign { rvalue, .. } = &assign.kind else {
        panic!("expected assignment");
    };
    // Sound typing: both operands int, the sum int, the assignment void.
    let ExprKind::Binary { left, right, .. } = &rvalue.kind else {
        panic!("expected binary rvalue");
    };
    assert_eq!(left.ty, Some(UcType::Int));
    assert_eq!(right.ty, Some(UcType::Int));
    assert_eq!(rvalue.ty, Some(UcType::Int));
    assert_eq!(assign.ty, Some(UcType::Void));
}

#[test]
fn relational_operator_yields_bool() {
    let program = check("int main() { if (1 < 2) return 1; return 0; }").unwrap();
    let GlobalItem::Func(func) = &program.items[0] else {
        panic!("expected function");
    };
    let Stmt::If { cond, .. } = &func.body.stmts[0] else {
        panic!("expected if");
    };
    assert_eq!(cond.ty, Some(UcType::Bool));
}

#[test]
fn identifier_resolution_sets_scope() {
    let program = check("int g; int main() { g = 1; return g; }").unwrap();
    let GlobalItem::Func(func) = &program.items[1] else {
        panic!("expected function");
    };
    let Stmt::Expr(assign) = &func.body.stmts[0] else {
        panic!("expected assignment");
    };
    let ExprKind::Assign { lvalue, .. } = &assign.kind else {
        panic!("expected assignment");
    };
    let ExprKind::Id(id) = &lvalue.kind else {
        panic!("expected identifier lvalue");
    };
    assert!(id.scope.is_some());
}

#[test]
fn array_dimensions_resolve_from_initializer() {
    let program = check("int main() { int v[] = {1, 2, 3}; return v[0]; }").unwrap();
    let GlobalItem::Func(func) = &program.items[0] else {
        panic!("expected function");
    };
    let decl = &func.body.decls[0];
    assert_eq!(decl.dims, vec![Some(3)]);
    assert_eq!(
        decl.ty.as_ref().map(|t| t.to_string()),
        Some("int[3]".to_string())
    );
}

#[test]
fn string_initializer_sizes_a_char_array() {
    let program = check("int main() { char s[] = \"hello\"; print(s); return 0; }").unwrap();
    let GlobalItem::Func(func) = &program.items[0] else {
        panic!("expected function");
    };
    assert_eq!(func.body.decls[0].dims, vec![Some(5)]);
}

#[test]
fn shadowing_in_inner_scope_is_allowed() {
    check("int main() { int x; x = 1; { float x; x = 2.0; } return x; }").unwrap();
}

#[test]
fn matrix_initializer_matches_shape() {
    check("int m[2][3] = {{1, 2, 3}, {4, 5, 6}}; int main() { return m[1][2]; }").unwrap();
}

#[test]
fn functions_with_parameters_type_check() {
    check("int f(int x) { return x + 1; } int main() { return f(4); }").unwrap();
}

// -- rejected programs ------------------------------------------------------

#[test]
fn undefined_identifier_is_code_1() {
    let err = check_err("int main() { return x; }");
    assert_eq!(err.code(), 1);
    assert_eq!(err.to_string(), "SemanticError: x is not defined @ 1:21");
}

#[test]
fn non_int_index_is_code_2() {
    let err = check_err("int main() { int a[3]; return a[2.0]; }");
    assert_eq!(err.code(), 2);
    assert!(err
        .to_string()
        .contains("type(float) must be of type(int)"));
}

#[test]
fn assert_requires_bool_code_3() {
    let err = check_err("int main() { assert 1 + 2; return 0; }");
    assert_eq!(err.code(), 3);
}

#[test]
fn assignment_type_mismatch_is_code_4() {
    let err = check_err("int main() { int a; a = 2.0; return a; }");
    assert_eq!(err.code(), 4);
    assert!(err
        .to_string()
        .contains("Cannot assign type(float) to type(int)"));
}

#[test]
fn unsupported_assign_operator_is_code_5() {
    let err = check_err("int main() { char c; char d; c = 'a'; d = 'b'; c %= d; return 0; }");
    // Same-typed operands, but char admits only plain assignment.
    assert_eq!(err.code(), 5);
}

#[test]
fn mismatched_binary_operands_is_code_6() {
    let err = check_err("int main() { return 1 + 2.0; }");
    assert_eq!(err.code(), 6);
    assert!(err
        .to_string()
        .contains("Binary operator + does not have matching LHS/RHS types"));
}

#[test]
fn unsupported_binary_operator_is_code_7() {
    let err = check_err("int main() { int a; int b; a = 1; b = 2; if (a && b) return 1; return 0; }");
    assert_eq!(err.code(), 7);
}

#[test]
fn break_outside_loop_is_code_8() {
    let err = check_err("int main() { break; return 0; }");
    assert_eq!(err.code(), 8);
}

#[test]
fn break_inside_loop_is_accepted() {
    check("int main() { while (1 < 2) { break; } return 0; }").unwrap();
}

#[test]
fn unsized_array_without_initializer_is_code_9() {
    let err = check_err("int main() { int a[]; return 0; }");
    assert_eq!(err.code(), 9);
}

#[test]
fn initializer_size_mismatch_is_code_10() {
    let err = check_err("int main() { int v[2] = {1, 2, 3}; return 0; }");
    assert_eq!(err.code(), 10);
    assert!(err.to_string().contains("Size mismatch on v initialization"));
}

#[test]
fn scalar_initializer_type_mismatch_is_code_11() {
    let err = check_err("int main() { int a = 2.5; return a; }");
    assert_eq!(err.code(), 11);
}

#[test]
fn scalar_initialized_with_list_is_code_12() {
    let err = check_err("int main() { int a = {1, 2}; return a; }");
    assert_eq!(err.code(), 12);
}

#[test]
fn ragged_initializer_lists_are_code_13() {
    let err = check_err("int m[2][2] = {{1, 2}, {3}}; int main() { return 0; }");
    assert_eq!(err.code(), 13);
}

#[test]
fn while_condition_must_be_bool_code_15() {
    let err = check_err("int main() { while (1) return 1; return 0; }");
    assert_eq!(err.code(), 15);
    assert!(err
        .to_string()
        .contains("conditional expression is type(int), not type(bool)"));
}

#[test]
fn calling_a_variable_is_code_16() {
    let err = check_err("int main() { int x; x = 1; return x(); }");
    assert_eq!(err.code(), 16);
    assert!(err.to_string().contains("x is not a function"));
}

#[test]
fn wrong_argument_count_is_code_17() {
    let err = check_err("int f(int x) { return x; } int main() { return f(1, 2); }");
    assert_eq!(err.code(), 17);
}

#[test]
fn wrong_argument_type_is_code_18() {
    let err = check_err("int f(int x) { return x; } int main() { return f(2.0); }");
    assert_eq!(err.code(), 18);
    assert!(err.to_string().contains("Type mismatch with parameter x"));
}

#[test]
fn if_condition_must_be_bool_code_19() {
    let err = check_err("int main() { if (1 + 2) return 1; return 0; }");
    assert_eq!(err.code(), 19);
}

#[test]
fn non_constant_in_initializer_list_is_code_20() {
    let err = check_err("int v[2] = {1, 1 + 1}; int main() { return 0; }");
    assert_eq!(err.code(), 20);
}

#[test]
fn non_constant_global_scalar_initializer_is_code_20() {
    let err = check_err("int g = 1 + 2; int main() { return g; }");
    assert_eq!(err.code(), 20);
}

#[test]
fn printing_a_non_basic_variable_is_code_22() {
    let err = check_err("int main() { int a[2][2]; print(a); return 0; }");
    assert_eq!(err.code(), 22);
    assert!(err
        .to_string()
        .contains("a does not reference a variable of basic type"));
}

#[test]
fn reading_into_a_non_variable_is_code_23() {
    let err = check_err("int main() { read(1 + 2); return 0; }");
    assert_eq!(err.code(), 23);
}

#[test]
fn missing_return_in_non_void_function_is_code_24() {
    let err = check_err("int main() { print(1); }");
    assert_eq!(err.code(), 24);
    assert!(err
        .to_string()
        .contains("Return of type(void) is incompatible with type(int) function definition"));
}

#[test]
fn wrong_return_type_is_code_24() {
    let err = check_err("int main() { return 2.0; }");
    assert_eq!(err.code(), 24);
    assert!(err
        .to_string()
        .contains("Return of type(float) is incompatible with type(int) function definition"));
}

#[test]
fn redeclaration_in_same_scope_is_code_25() {
    let err = check_err("int main() { int a; float a; return 0; }");
    assert_eq!(err.code(), 25);
    assert!(err
        .to_string()
        .contains("Name a is already defined in this scope"));
}

#[test]
fn duplicate_function_name_is_code_25() {
    let err = check_err("int f() { return 1; } int f() { return 2; } int main() { return 0; }");
    assert_eq!(err.code(), 25);
}

#[test]
fn unsupported_unary_operator_is_code_26() {
    let err = check_err("int main() { float f; f = 1.0; f++; return 0; }");
    assert_eq!(err.code(), 26);
    assert!(err.to_string().contains("Unary operator p++ is not supported"));
}

#[test]
fn first_violation_wins() {
    // Both an undefined name and a type mismatch; the undefined name is
    // reached first.
    let err = check_err("int main() { int a; a = x + 2.5; return a; }");
    assert_eq!(err.code(), 1);
}
