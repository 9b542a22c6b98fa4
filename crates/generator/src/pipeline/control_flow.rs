//! Statement-list rewrites: timeouts, identifier handling, trailing reads

use super::syntax::{call_path, is_ok_unit, method_call_on, ok_unit, strip_id_call, var_expr};
use super::{RewriteContext, Rewriter, SyntaxNode};
use hemmer_provider_migrator_analyzer::naming::make_ident;
use hemmer_provider_migrator_analyzer::string_literal;
use syn::{Block, Expr, Stmt};

/// Control flow the typed SDK takes care of
///
/// - `let (ctx, cancel) = timeouts::for_create(..);` is dropped together with
///   a `defer!` release that immediately follows it
/// - `d.set_id("")` becomes `return meta.mark_as_gone(id);`, swallowing a
///   following `return Ok(())`; other arguments become `meta.set_id(id)`
/// - a trailing `return read(d, meta)` becomes `return Ok(())`
pub struct ControlFlow;

impl Rewriter for ControlFlow {
    fn name(&self) -> &'static str {
        "control_flow"
    }

    fn try_apply(&self, node: SyntaxNode<'_>, cx: &mut RewriteContext<'_>) -> bool {
        let SyntaxNode::Block(block) = node else {
            return false;
        };
        let elided = elide_timeouts(block, cx);
        let identified = rewrite_set_id(block, cx);
        let returned = rewrite_trailing_read(block, cx);
        elided || identified || returned
    }
}

fn elide_timeouts(block: &mut Block, cx: &RewriteContext<'_>) -> bool {
    let mut changed = false;
    let mut index = 0;
    while index < block.stmts.len() {
        if !is_timeout_acquisition(&block.stmts[index], cx) {
            index += 1;
            continue;
        }
        block.stmts.remove(index);
        if block
            .stmts
            .get(index)
            .is_some_and(|stmt| is_release(stmt, &cx.config.release_macro))
        {
            block.stmts.remove(index);
        }
        changed = true;
    }
    changed
}

/// `let .. = timeouts::for_*(..);`
fn is_timeout_acquisition(stmt: &Stmt, cx: &RewriteContext<'_>) -> bool {
    let Stmt::Local(local) = stmt else {
        return false;
    };
    let Some(init) = &local.init else {
        return false;
    };
    let prefix = format!("{}::for_", cx.config.timeout_module);
    call_path(&init.expr).is_some_and(|(path, _)| path.starts_with(&prefix))
}

/// `defer! { .. }`
fn is_release(stmt: &Stmt, release_macro: &str) -> bool {
    match stmt {
        Stmt::Macro(mac) => mac.mac.path.is_ident(release_macro),
        Stmt::Expr(Expr::Macro(mac), _) => mac.mac.path.is_ident(release_macro),
        _ => false,
    }
}

fn rewrite_set_id(block: &mut Block, cx: &RewriteContext<'_>) -> bool {
    let Some(accessor) = cx.function.accessor.as_deref() else {
        return false;
    };
    let meta = make_ident(&cx.config.meta_var);

    let mut changed = false;
    let mut index = 0;
    while index < block.stmts.len() {
        let argument = match &block.stmts[index] {
            Stmt::Expr(expr, Some(_)) => method_call_on(expr, accessor, "set_id")
                .filter(|call| call.args.len() == 1)
                .map(|call| call.args[0].clone()),
            _ => None,
        };
        let Some(argument) = argument else {
            index += 1;
            continue;
        };

        // Only a terminal clear, or one followed by nothing but a bare success
        let rest = &block.stmts[index + 1..];
        let terminal = rest.is_empty() || (rest.len() == 1 && is_bare_success(&rest[0]));
        if terminal && string_literal(&argument).is_some_and(|s| s.is_empty()) {
            let id = var_expr(cx.config.primary_identity_var());
            block.stmts.truncate(index);
            block.stmts.push(syn::parse_quote!(return #meta.mark_as_gone(#id);));
        } else {
            let id = strip_id_call(&argument);
            block.stmts[index] = syn::parse_quote!(#meta.set_id(#id););
        }
        changed = true;
        index += 1;
    }
    changed
}

/// `return Ok(());` or a tail `Ok(())`
fn is_bare_success(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Expr(Expr::Return(ret), _) => ret.expr.as_deref().is_some_and(is_ok_unit),
        Stmt::Expr(expr, None) => is_ok_unit(expr),
        _ => false,
    }
}

fn rewrite_trailing_read(block: &mut Block, cx: &RewriteContext<'_>) -> bool {
    let is_read_call = |expr: &Expr| {
        call_path(expr).is_some_and(|(path, call)| {
            path == cx.read_fn && call.args.first().is_some_and(|arg| cx.is_accessor(arg))
        })
    };

    match block.stmts.last_mut() {
        Some(Stmt::Expr(Expr::Return(ret), _)) => {
            if !ret.expr.as_deref().is_some_and(is_read_call) {
                return false;
            }
            ret.expr = Some(Box::new(ok_unit()));
            true
        }
        Some(Stmt::Expr(expr, None)) if is_read_call(&*expr) => {
            *expr = ok_unit();
            true
        }
        _ => false,
    }
}
