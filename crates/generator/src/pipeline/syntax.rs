//! Small syntax-tree helpers shared by the rewriters

use hemmer_provider_migrator_analyzer::naming::make_ident;
use hemmer_provider_migrator_analyzer::PathStep;
use proc_macro2::Literal;
use syn::{Expr, ExprCall, ExprMethodCall, Ident, UnOp};

/// Peel parentheses and invisible groups
pub(crate) fn strip_parens(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(inner) => strip_parens(&inner.expr),
        Expr::Group(inner) => strip_parens(&inner.expr),
        _ => expr,
    }
}

/// Peel `&`/`&mut` as well as parentheses
pub(crate) fn strip_reference(expr: &Expr) -> &Expr {
    match strip_parens(expr) {
        Expr::Reference(inner) => strip_reference(&inner.expr),
        other => other,
    }
}

/// The identifier of a single-segment path expression
pub(crate) fn ident_of(expr: &Expr) -> Option<&Ident> {
    match strip_parens(expr) {
        Expr::Path(path) if path.qself.is_none() => path.path.get_ident(),
        _ => None,
    }
}

pub(crate) fn is_ident(expr: &Expr, name: &str) -> bool {
    ident_of(expr).is_some_and(|ident| ident == name)
}

/// Leftmost identifier of a place or call chain (`props.sku[0].name` → `props`)
pub(crate) fn root_ident(expr: &Expr) -> Option<&Ident> {
    match expr {
        Expr::Field(field) => root_ident(&field.base),
        Expr::Index(index) => root_ident(&index.expr),
        Expr::MethodCall(call) => root_ident(&call.receiver),
        Expr::Try(inner) => root_ident(&inner.expr),
        Expr::Paren(inner) => root_ident(&inner.expr),
        Expr::Reference(inner) => root_ident(&inner.expr),
        Expr::Unary(unary) => root_ident(&unary.expr),
        Expr::Path(_) => ident_of(expr),
        _ => None,
    }
}

/// Field names of `root.a.b` when `expr` is a plain field chain on `root`
pub(crate) fn field_chain(expr: &Expr, root: &str) -> Option<Vec<String>> {
    let mut names = Vec::new();
    let mut current = strip_parens(expr);
    loop {
        match current {
            Expr::Field(field) => {
                let syn::Member::Named(name) = &field.member else {
                    return None;
                };
                names.push(syn::ext::IdentExt::unraw(name).to_string());
                current = strip_parens(&field.base);
            }
            other if is_ident(other, root) => break,
            _ => return None,
        }
    }
    if names.is_empty() {
        return None;
    }
    names.reverse();
    Some(names)
}

/// A method call on `receiver_ident` named `method`
pub(crate) fn method_call_on<'e>(
    expr: &'e Expr,
    receiver_ident: &str,
    method: &str,
) -> Option<&'e ExprMethodCall> {
    match strip_parens(expr) {
        Expr::MethodCall(call)
            if call.method == method && is_ident(strip_reference(&call.receiver), receiver_ident) =>
        {
            Some(call)
        }
        _ => None,
    }
}

/// `path(args)` calls, returning the joined callee path
pub(crate) fn call_path(expr: &Expr) -> Option<(String, &ExprCall)> {
    let Expr::Call(call) = strip_parens(expr) else {
        return None;
    };
    let Expr::Path(func) = call.func.as_ref() else {
        return None;
    };
    let path = func
        .path
        .segments
        .iter()
        .map(|s| s.ident.to_string())
        .collect::<Vec<_>>()
        .join("::");
    Some((path, call))
}

/// Drop a trailing `.id()` so a typed ID value is used directly
pub(crate) fn strip_id_call(expr: &Expr) -> Expr {
    match strip_parens(expr) {
        Expr::MethodCall(call) if call.method == "id" && call.args.is_empty() => {
            (*call.receiver).clone()
        }
        Expr::Reference(inner) => strip_id_call(&inner.expr),
        other => other.clone(),
    }
}

/// Drop a leading `*` or a trailing `.unwrap()`
pub(crate) fn strip_deref(expr: &Expr) -> &Expr {
    match strip_parens(expr) {
        Expr::Unary(unary) if matches!(unary.op, UnOp::Deref(_)) => strip_parens(&unary.expr),
        Expr::MethodCall(call) if call.method == "unwrap" && call.args.is_empty() => {
            strip_parens(&call.receiver)
        }
        other => other,
    }
}

/// `Ok(())`
pub(crate) fn ok_unit() -> Expr {
    syn::parse_quote!(Ok(()))
}

pub(crate) fn is_ok_unit(expr: &Expr) -> bool {
    let Expr::Call(call) = strip_parens(expr) else {
        return false;
    };
    is_ident(&call.func, "Ok")
        && call.args.len() == 1
        && matches!(&call.args[0], Expr::Tuple(tuple) if tuple.elems.is_empty())
}

/// A path expression from a `::`-separated string
pub(crate) fn path_expr(path: &str) -> Option<Expr> {
    syn::parse_str::<syn::ExprPath>(path).ok().map(Expr::Path)
}

/// `var` as an expression
pub(crate) fn var_expr(var: &str) -> Expr {
    let ident = make_ident(var);
    syn::parse_quote!(#ident)
}

/// `var.a[0].b` for a resolved tag path
pub(crate) fn model_access(var: &str, steps: &[PathStep<'_>]) -> Expr {
    let mut expr = var_expr(var);
    for step in steps {
        expr = match step {
            PathStep::Field(field) => {
                let member = make_ident(&field.name);
                syn::parse_quote!(#expr.#member)
            }
            PathStep::Index(index) => {
                let index = Literal::usize_unsuffixed(*index);
                syn::parse_quote!(#expr[#index])
            }
        };
    }
    expr
}

/// `meta.resource_data`, the canonical untyped state reference
pub(crate) fn resource_data(meta_var: &str) -> Expr {
    let meta = make_ident(meta_var);
    syn::parse_quote!(#meta.resource_data)
}
