//! Metadata extraction for one untyped resource

use crate::model::{Model, ModelField, ModelSet, PathStep};
use crate::naming::{render_type, to_camel_case};
use crate::registry::{resource_literal, RegistryEntry};
use crate::schema::{parse_schema_map, synthesize_models, SchemaField};
use crate::{AnalyzerError, Result};
use hemmer_provider_migrator_common::MigrationConfig;
use std::collections::HashMap;
use std::time::Duration;
use syn::ext::IdentExt;
use syn::{BinOp, Expr, ExprStruct, FnArg, Item, ItemFn, ItemUse, Lit, Member, Pat, Type};
use tracing::{debug, info};

/// What a function does for the resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionRole {
    Create,
    Read,
    Update,
    Delete,
    /// Any other function of the source file (flatten/expand helpers, ...)
    Helper,
}

impl FunctionRole {
    pub fn is_crud(self) -> bool {
        !matches!(self, FunctionRole::Helper)
    }

    /// Name of the typed trait method implementing this role
    pub fn method_name(self) -> Option<&'static str> {
        match self {
            FunctionRole::Create => Some("create"),
            FunctionRole::Read => Some("read"),
            FunctionRole::Update => Some("update"),
            FunctionRole::Delete => Some("delete"),
            FunctionRole::Helper => None,
        }
    }
}

/// A function of the resource source and its migration metadata
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub role: FunctionRole,
    /// Name of the typed model variable inside this function
    pub var_model: String,
    /// Identifier of the untyped accessor parameter, if any
    pub accessor: Option<String>,
    /// Zero when the definition specifies none
    pub timeout: Duration,
    pub item: ItemFn,
}

/// Everything later stages need to know about one resource
#[derive(Debug, Clone)]
pub struct MetaInfo {
    /// CamelCase resource name (e.g., "RedisCache")
    pub resource_name: String,
    /// Module the source file belongs to (its parent directory)
    pub package: String,
    /// Name of the top model
    pub model_name: String,
    /// Name of the generated receiver struct
    pub receiver: String,
    /// Expression validating imported resource IDs
    pub id_validator: Option<Expr>,
    /// Resource type string (e.g., "azurerm_redis_cache")
    pub resource_type: String,
    pub schema_version: u32,
    pub state_upgraders: Option<Expr>,
    pub has_update: bool,
    pub imports: Vec<ItemUse>,
    pub models: ModelSet,
    pub arguments: Vec<SchemaField>,
    pub attributes: Vec<SchemaField>,
    /// Constructor of schema maps, reused when emitting arguments/attributes
    pub schema_ctor: Option<syn::Path>,
    pub functions: Vec<Function>,
    pub create: String,
    pub read: String,
    pub update: Option<String>,
    pub delete: String,
    /// Items carried over untouched (consts, declared models, impls, ...)
    pub passthrough: Vec<Item>,
}

impl MetaInfo {
    pub fn find_field_by_tag(&self, model_name: &str, tag: &str) -> Option<&ModelField> {
        self.models.find_field_by_tag(model_name, tag)
    }

    pub fn resolve_tag_path(&self, model_name: &str, tag: &str) -> Option<Vec<PathStep<'_>>> {
        self.models.resolve_tag_path(model_name, tag)
    }

    pub fn top_model(&self) -> Option<&Model> {
        self.models.top_model()
    }

    pub fn top_field(&self, name: &str) -> Option<&ModelField> {
        self.models.top_field(name)
    }

    pub fn find_model_by_keys<'k>(&self, keys: impl IntoIterator<Item = &'k str>) -> Option<&Model> {
        self.models.find_model_by_keys(keys)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Build the MetaInfo of one registry entry
pub fn extract(entry: &RegistryEntry, config: &MigrationConfig) -> Result<MetaInfo> {
    let definition = entry
        .file
        .items
        .iter()
        .find_map(|item| match item {
            Item::Fn(func) if func.sig.ident == entry.function => Some(func),
            _ => None,
        })
        .and_then(|func| resource_literal(func, &config.resource_type_name))
        .ok_or_else(|| AnalyzerError::MissingDefinition(entry.name.clone()))?;

    let resource_name = to_camel_case(
        entry
            .name
            .strip_prefix(config.name_prefix.as_str())
            .unwrap_or(&entry.name),
    );
    let model_name = format!("{resource_name}Model");
    let package = entry
        .path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let schema_expr = field_expr(definition, "schema")
        .ok_or_else(|| AnalyzerError::MissingSchema(entry.name.clone()))?;
    let schema = parse_schema_map(schema_expr, config)
        .ok_or_else(|| AnalyzerError::MissingSchema(entry.name.clone()))?;

    let crud_name = |field: &str| field_expr(definition, field).and_then(function_reference);
    let missing = |role: &str| AnalyzerError::MissingFunction {
        resource: entry.name.clone(),
        function: role.to_string(),
    };
    let create = crud_name("create").ok_or_else(|| missing("create"))?;
    let read = crud_name("read").ok_or_else(|| missing("read"))?;
    let delete = crud_name("delete").ok_or_else(|| missing("delete"))?;
    let update = crud_name("update");

    let timeouts = field_expr(definition, "timeouts")
        .map(parse_timeouts)
        .unwrap_or_default();

    let mut roles = HashMap::from([
        (create.as_str(), FunctionRole::Create),
        (read.as_str(), FunctionRole::Read),
        (delete.as_str(), FunctionRole::Delete),
    ]);
    if let Some(update) = &update {
        roles.insert(update.as_str(), FunctionRole::Update);
    }

    let mut imports = Vec::new();
    let mut functions = Vec::new();
    let mut passthrough = Vec::new();
    let mut declared = Vec::new();
    for item in &entry.file.items {
        match item {
            Item::Use(item_use) => imports.push(item_use.clone()),
            Item::Fn(func) if func.sig.ident == entry.function => {}
            Item::Fn(func) => {
                let name = func.sig.ident.to_string();
                let role = roles.get(name.as_str()).copied().unwrap_or(FunctionRole::Helper);
                functions.push(build_function(func, role, &timeouts, config));
            }
            Item::Struct(item) => {
                if let Some(model) = declared_model(item) {
                    declared.push(model);
                }
                passthrough.push(item.clone().into());
            }
            other => passthrough.push(other.clone()),
        }
    }

    for (role, name) in [("create", &create), ("read", &read), ("delete", &delete)]
        .into_iter()
        .chain(update.iter().map(|u| ("update", u)))
    {
        if !functions.iter().any(|f| &f.name == name) {
            return Err(missing(role));
        }
    }

    let mut models = synthesize_models(&model_name, &schema.fields);
    for model in declared {
        models.retain(|m| m.name != model.name);
        models.push(model);
    }

    let (attributes, arguments): (Vec<_>, Vec<_>) =
        schema.fields.into_iter().partition(SchemaField::is_attribute);

    info!(
        resource = %entry.name,
        %package,
        models = models.len(),
        functions = functions.len(),
        "extracted resource metadata"
    );

    Ok(MetaInfo {
        receiver: format!("{resource_name}Resource"),
        resource_name,
        package,
        models: ModelSet::new(model_name.clone(), models),
        model_name,
        id_validator: field_expr(definition, "importer").map(id_validator),
        resource_type: entry.name.clone(),
        schema_version: field_expr(definition, "schema_version")
            .and_then(integer_value)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0),
        state_upgraders: field_expr(definition, "state_upgraders").cloned(),
        has_update: update.is_some(),
        imports,
        arguments,
        attributes,
        schema_ctor: schema.ctor,
        functions,
        create,
        read,
        update,
        delete,
        passthrough,
    })
}

fn build_function(
    func: &ItemFn,
    role: FunctionRole,
    timeouts: &HashMap<String, Duration>,
    config: &MigrationConfig,
) -> Function {
    let accessor = func.sig.inputs.iter().find_map(|arg| {
        let FnArg::Typed(typed) = arg else {
            return None;
        };
        let Pat::Ident(pat) = typed.pat.as_ref() else {
            return None;
        };
        is_accessor_type(&typed.ty, &config.accessor_type).then(|| pat.ident.to_string())
    });

    let var_model = match (&accessor, role) {
        (Some(accessor), FunctionRole::Helper) => accessor.clone(),
        _ => config.model_var.clone(),
    };
    let timeout = role
        .method_name()
        .and_then(|method| timeouts.get(method).copied())
        .unwrap_or(Duration::ZERO);

    debug!(function = %func.sig.ident, ?role, ?accessor, %var_model, "collected function");
    Function {
        name: func.sig.ident.to_string(),
        role,
        var_model,
        accessor,
        timeout,
        item: func.clone(),
    }
}

fn is_accessor_type(ty: &Type, accessor_type: &str) -> bool {
    match ty {
        Type::Reference(reference) => is_accessor_type(&reference.elem, accessor_type),
        Type::Path(path) => path.path.segments.last().is_some_and(|s| s.ident == accessor_type),
        _ => false,
    }
}

/// A struct whose fields carry `#[tfschema("key")]` attributes
fn declared_model(item: &syn::ItemStruct) -> Option<Model> {
    let mut fields = Vec::new();
    for field in &item.fields {
        let Some(ident) = &field.ident else {
            continue;
        };
        let tag = field
            .attrs
            .iter()
            .find(|a| a.path().is_ident("tfschema"))
            .and_then(|a| a.parse_args::<syn::LitStr>().ok());
        if let Some(tag) = tag {
            fields.push(ModelField {
                name: ident.unraw().to_string(),
                ty: render_type(&field.ty),
                tag: tag.value(),
            });
        }
    }
    (!fields.is_empty()).then(|| Model {
        name: item.ident.to_string(),
        fields,
        declared: true,
    })
}

fn field_expr<'a>(literal: &'a ExprStruct, name: &str) -> Option<&'a Expr> {
    literal
        .fields
        .iter()
        .find(|f| matches!(&f.member, Member::Named(n) if n == name))
        .map(|f| &f.expr)
}

/// `read: resource_x_read` or `update: Some(resource_x_update)`
fn function_reference(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Path(path) => {
            let ident = path.path.get_ident()?.to_string();
            (ident != "None").then_some(ident)
        }
        Expr::Call(call) if call.args.len() == 1 => match call.func.as_ref() {
            Expr::Path(path) if path.path.is_ident("Some") => function_reference(&call.args[0]),
            _ => None,
        },
        _ => None,
    }
}

/// `importer(validate::x_id)` → `validate::x_id`; other shapes are kept whole
fn id_validator(expr: &Expr) -> Expr {
    match expr {
        Expr::Call(call) if call.args.len() == 1 => call.args[0].clone(),
        other => other.clone(),
    }
}

fn parse_timeouts(expr: &Expr) -> HashMap<String, Duration> {
    let Expr::Struct(literal) = expr else {
        return HashMap::new();
    };
    literal
        .fields
        .iter()
        .filter_map(|f| {
            let Member::Named(name) = &f.member else {
                return None;
            };
            Some((name.to_string(), duration_value(&f.expr)?))
        })
        .collect()
}

/// Constant-fold `Duration::from_secs(90 * 60)` and wrappers around it
fn duration_value(expr: &Expr) -> Option<Duration> {
    match expr {
        Expr::Paren(inner) => duration_value(&inner.expr),
        Expr::Call(call) if call.args.len() == 1 => {
            let Expr::Path(func) = call.func.as_ref() else {
                return None;
            };
            let method = func.path.segments.last()?.ident.to_string();
            let seconds = |scale: u64| {
                integer_value(&call.args[0])
                    .and_then(|v| u64::try_from(v).ok())
                    .and_then(|v| v.checked_mul(scale))
                    .map(Duration::from_secs)
            };
            match method.as_str() {
                "from_secs" => seconds(1),
                "from_mins" => seconds(60),
                "from_hours" => seconds(3600),
                "from_millis" => integer_value(&call.args[0])
                    .and_then(|v| u64::try_from(v).ok())
                    .map(Duration::from_millis),
                // Some(..), default_timeout(..) and similar wrappers
                _ => duration_value(&call.args[0]),
            }
        }
        _ => None,
    }
}

fn integer_value(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Int(int) => int.base10_parse().ok(),
            _ => None,
        },
        Expr::Paren(inner) => integer_value(&inner.expr),
        Expr::Binary(binary) => {
            let (left, right) = (integer_value(&binary.left)?, integer_value(&binary.right)?);
            match binary.op {
                BinOp::Mul(_) => left.checked_mul(right),
                BinOp::Add(_) => left.checked_add(right),
                BinOp::Sub(_) => left.checked_sub(right),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_duration_value() {
        let expr: Expr = parse_quote!(Some(Duration::from_secs(90 * 60)));
        assert_eq!(duration_value(&expr), Some(Duration::from_secs(5400)));
        let expr: Expr = parse_quote!(pluginsdk::default_timeout(Duration::from_mins(5)));
        assert_eq!(duration_value(&expr), Some(Duration::from_secs(300)));
        let expr: Expr = parse_quote!(Duration::from_secs(timeout));
        assert_eq!(duration_value(&expr), None);
        let expr: Expr = parse_quote!(Duration::from_hours(6000000000000000));
        assert_eq!(duration_value(&expr), None);
        let expr: Expr = parse_quote!(Duration::from_secs(-5));
        assert_eq!(duration_value(&expr), None);
    }

    #[test]
    fn test_function_reference() {
        assert_eq!(function_reference(&parse_quote!(resource_x_read)).as_deref(), Some("resource_x_read"));
        assert_eq!(function_reference(&parse_quote!(Some(resource_x_update))).as_deref(), Some("resource_x_update"));
        assert_eq!(function_reference(&parse_quote!(None)), None);
    }

    #[test]
    fn test_declared_model() {
        let item: syn::ItemStruct = parse_quote! {
            pub struct SkuModel {
                #[tfschema("name")]
                pub name: String,
                #[tfschema("type")]
                pub r#type: Option<String>,
                pub scratch: bool,
            }
        };
        let model = declared_model(&item).unwrap();
        assert!(model.declared);
        assert_eq!(model.fields.len(), 2);
        assert_eq!(model.fields[1].name, "type");
        assert_eq!(model.fields[1].ty, "Option<String>");
    }

    #[test]
    fn test_accessor_detection() {
        let config = MigrationConfig::default();
        let func: ItemFn = parse_quote! {
            fn expand_sku(input: &ResourceData, other: i64) -> Sku { todo!() }
        };
        let function = build_function(&func, FunctionRole::Helper, &HashMap::new(), &config);
        assert_eq!(function.accessor.as_deref(), Some("input"));
        assert_eq!(function.var_model, "input");
        assert_eq!(function.timeout, Duration::ZERO);

        let crud = build_function(&func, FunctionRole::Read, &HashMap::new(), &config);
        assert_eq!(crud.var_model, "model");
    }
}
