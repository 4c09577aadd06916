//! CEL expression unparser (AST to source text).
//!
//! The output is semantically equivalent to the tree but may differ from the
//! original source in whitespace and parenthesization. Comprehensions produced
//! by the standard macros are rendered back as macro calls.

use crate::expr::{BinaryOp, Expr, MapEntry, SpannedExpr, StructField, UnaryOp};
use crate::operators::{binary_symbol, precedence, unary_symbol};

/// Convert a CEL expression tree to source text.
pub fn ast_to_string(expr: &SpannedExpr) -> String {
    unparse(&expr.node)
}

fn unparse(expr: &Expr) -> String {
    match expr {
        Expr::Null => "null".to_string(),
        Expr::Bool(b) => b.to_string(),
        Expr::Int(n) => n.to_string(),
        Expr::UInt(n) => format!("{}u", n),
        Expr::Float(f) => format_float(*f),
        Expr::String(s) => format!("\"{}\"", escape_string(s)),
        Expr::Bytes(b) => format!("b\"{}\"", escape_bytes(b)),

        Expr::Ident(name) => name.clone(),
        Expr::RootIdent(name) => format!(".{}", name),

        Expr::List(elements) => {
            let items: Vec<String> = elements.iter().map(|e| unparse(&e.node)).collect();
            format!("[{}]", items.join(", "))
        }
        Expr::Map(entries) => unparse_map(entries),

        Expr::Unary { op, expr } => unparse_unary(*op, expr),
        Expr::Binary { op, left, right } => unparse_binary(*op, left, right),
        Expr::Ternary {
            cond,
            then_expr,
            else_expr,
        } => format!(
            "{} ? {} : {}",
            unparse_with_parens_if_needed(&cond.node, Some(0)),
            unparse(&then_expr.node),
            unparse(&else_expr.node)
        ),

        Expr::Member { expr, field } => format!("{}.{}", unparse_primary(&expr.node), field),
        Expr::Index { expr, index } => {
            format!("{}[{}]", unparse_primary(&expr.node), unparse(&index.node))
        }
        Expr::Call { expr, args } => unparse_call(expr, args),
        Expr::Struct { type_name, fields } => unparse_struct(type_name, fields),

        Expr::Comprehension {
            iter_var,
            iter_range,
            accu_var,
            accu_init,
            loop_condition,
            loop_step,
            result,
        } => unparse_macro(iter_var, iter_range, accu_var, accu_init, loop_step, result)
            .unwrap_or_else(|| {
                format!(
                    "__comprehension__({}, {}, {}, {}, {}, {}, {})",
                    unparse(&iter_range.node),
                    iter_var,
                    accu_var,
                    unparse(&accu_init.node),
                    unparse(&loop_condition.node),
                    unparse(&loop_step.node),
                    unparse(&result.node)
                )
            }),
        Expr::MemberTestOnly { expr, field } => {
            format!("has({}.{})", unparse_primary(&expr.node), field)
        }
    }
}

/// Format a float, ensuring it always has a decimal point or exponent.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "double(\"NaN\")".to_string();
    }
    if f.is_infinite() {
        return if f.is_sign_positive() {
            "double(\"Infinity\")".to_string()
        } else {
            "double(\"-Infinity\")".to_string()
        };
    }
    let s = f.to_string();
    if s.contains('.') || s.contains('e') || s.contains('E') {
        s
    } else {
        format!("{}.0", s)
    }
}

/// Escape a string for CEL output.
fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => result.push_str(&format!("\\u{:04x}", c as u32)),
            c => result.push(c),
        }
    }
    result
}

fn escape_bytes(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        match b {
            b'\\' => result.push_str("\\\\"),
            b'"' => result.push_str("\\\""),
            b'\n' => result.push_str("\\n"),
            b'\r' => result.push_str("\\r"),
            b'\t' => result.push_str("\\t"),
            b if b.is_ascii_graphic() || b == b' ' => result.push(b as char),
            b => result.push_str(&format!("\\x{:02x}", b)),
        }
    }
    result
}

fn unparse_map(entries: &[MapEntry]) -> String {
    let items: Vec<String> = entries
        .iter()
        .map(|entry| format!("{}: {}", unparse(&entry.key.node), unparse(&entry.value.node)))
        .collect();
    format!("{{{}}}", items.join(", "))
}

fn unparse_struct(type_name: &str, fields: &[StructField]) -> String {
    let items: Vec<String> = fields
        .iter()
        .map(|f| format!("{}: {}", f.name, unparse(&f.value.node)))
        .collect();
    format!("{}{{{}}}", type_name, items.join(", "))
}

fn unparse_unary(op: UnaryOp, expr: &SpannedExpr) -> String {
    match &expr.node {
        Expr::Binary { .. } | Expr::Ternary { .. } => {
            format!("{}({})", unary_symbol(op), unparse(&expr.node))
        }
        _ => format!("{}{}", unary_symbol(op), unparse(&expr.node)),
    }
}

fn unparse_binary(op: BinaryOp, left: &SpannedExpr, right: &SpannedExpr) -> String {
    let op_prec = precedence(op);
    let left_str = unparse_with_parens_if_needed(&left.node, Some(op_prec));
    // Left-associative: an equal-precedence right operand needs parens.
    let right_str = unparse_with_parens_if_needed(&right.node, Some(op_prec + 1));
    format!("{} {} {}", left_str, binary_symbol(op), right_str)
}

fn unparse_with_parens_if_needed(expr: &Expr, parent_prec: Option<u8>) -> String {
    match (expr, parent_prec) {
        (Expr::Binary { op, .. }, Some(p)) if precedence(*op) < p => format!("({})", unparse(expr)),
        (Expr::Ternary { .. }, Some(_)) => format!("({})", unparse(expr)),
        _ => unparse(expr),
    }
}

fn unparse_primary(expr: &Expr) -> String {
    match expr {
        Expr::Binary { .. } | Expr::Ternary { .. } | Expr::Unary { .. } => {
            format!("({})", unparse(expr))
        }
        _ => unparse(expr),
    }
}

fn unparse_call(callee: &SpannedExpr, args: &[SpannedExpr]) -> String {
    let args_str: Vec<String> = args.iter().map(|a| unparse(&a.node)).collect();
    match &callee.node {
        Expr::Member { expr: receiver, field } => {
            format!("{}.{}({})", unparse_primary(&receiver.node), field, args_str.join(", "))
        }
        other => format!("{}({})", unparse_primary(other), args_str.join(", ")),
    }
}

fn is_ident(expr: &SpannedExpr, name: &str) -> bool {
    matches!(&expr.node, Expr::Ident(n) if n == name)
}

/// `accu + [elem]`, returning `elem`.
fn appended_element<'a>(step: &'a SpannedExpr, accu_var: &str) -> Option<&'a SpannedExpr> {
    match &step.node {
        Expr::Binary {
            op: BinaryOp::Add,
            left,
            right,
        } if is_ident(left, accu_var) => match &right.node {
            Expr::List(elems) if elems.len() == 1 => elems.first(),
            _ => None,
        },
        _ => None,
    }
}

/// Recognize the comprehension shapes the standard macros expand to.
fn unparse_macro(
    iter_var: &str,
    iter_range: &SpannedExpr,
    accu_var: &str,
    accu_init: &SpannedExpr,
    loop_step: &SpannedExpr,
    result: &SpannedExpr,
) -> Option<String> {
    let range = unparse_primary(&iter_range.node);
    let returns_accu = is_ident(result, accu_var);

    match (&accu_init.node, &loop_step.node) {
        (Expr::Bool(init), Expr::Binary { op, left, right })
            if returns_accu && is_ident(left, accu_var) =>
        {
            let name = match (init, op) {
                (true, BinaryOp::And) => "all",
                (false, BinaryOp::Or) => "exists",
                _ => return None,
            };
            Some(format!("{}.{}({}, {})", range, name, iter_var, unparse(&right.node)))
        }
        (
            Expr::Int(0),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            },
        ) if is_ident(else_expr, accu_var)
            && matches!(&then_expr.node, Expr::Binary { op: BinaryOp::Add, .. })
            && matches!(&result.node, Expr::Binary { op: BinaryOp::Eq, .. }) =>
        {
            Some(format!("{}.exists_one({}, {})", range, iter_var, unparse(&cond.node)))
        }
        (Expr::List(init), Expr::Binary { .. }) if init.is_empty() && returns_accu => {
            let transform = appended_element(loop_step, accu_var)?;
            Some(format!("{}.map({}, {})", range, iter_var, unparse(&transform.node)))
        }
        (
            Expr::List(init),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            },
        ) if init.is_empty() && returns_accu && is_ident(else_expr, accu_var) => {
            let elem = appended_element(then_expr, accu_var)?;
            if is_ident(elem, iter_var) {
                Some(format!("{}.filter({}, {})", range, iter_var, unparse(&cond.node)))
            } else {
                Some(format!(
                    "{}.map({}, {}, {})",
                    range,
                    iter_var,
                    unparse(&cond.node),
                    unparse(&elem.node)
                ))
            }
        }
        _ => None,
    }
}
