//! Table-driven helper renames

use super::syntax::{call_path, resource_data};
use super::{RewriteContext, Rewriter, SyntaxNode};
use std::collections::BTreeMap;
use syn::{Expr, ExprPath};
use tracing::warn;

/// Renames helper calls to their model-aware counterparts
/// (`zones::flatten_untyped(..)` → `zones::flatten(..)`) and moves
/// `d.is_new_resource()` onto `meta.resource_data`.
pub struct FunctionRename {
    renames: BTreeMap<String, ExprPath>,
}

impl FunctionRename {
    pub fn new(table: &BTreeMap<String, String>) -> Self {
        let renames = table
            .iter()
            .filter_map(|(from, to)| match syn::parse_str::<ExprPath>(to) {
                Ok(path) => Some((from.clone(), path)),
                Err(e) => {
                    warn!(%from, %to, error = %e, "ignoring rename to an invalid path");
                    None
                }
            })
            .collect();
        Self { renames }
    }
}

impl Rewriter for FunctionRename {
    fn name(&self) -> &'static str {
        "function_rename"
    }

    fn try_apply(&self, node: SyntaxNode<'_>, cx: &mut RewriteContext<'_>) -> bool {
        let SyntaxNode::Expr(expr) = node else {
            return false;
        };

        if let Expr::MethodCall(call) = &mut *expr {
            if call.method == "is_new_resource" && cx.is_accessor(&call.receiver) {
                *call.receiver = resource_data(&cx.config.meta_var);
                return true;
            }
            return false;
        }

        let Some(replacement) = call_path(expr).and_then(|(path, _)| self.renames.get(&path)) else {
            return false;
        };
        let replacement = replacement.clone();
        let Expr::Call(call) = expr else {
            return false;
        };
        *call.func = Expr::Path(replacement);
        true
    }
}
