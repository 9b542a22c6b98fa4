//! Schema map parsing and model synthesis

use crate::model::{Model, ModelField};
use crate::naming::{field_name_for_tag, path_to_string, to_camel_case};
use hemmer_provider_migrator_common::{MigrationConfig, ValueKind};
use quote::ToTokens;
use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::{Expr, ExprArray, ExprStruct, Lit, Member, Token};
use tracing::warn;

/// One persisted attribute of a resource schema
#[derive(Debug, Clone)]
pub struct SchemaField {
    pub tag: String,
    pub kind: ValueKind,
    pub elem: Option<SchemaElem>,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// The original schema expression, re-emitted verbatim
    pub expr: Expr,
}

/// Element of a collection attribute
#[derive(Debug, Clone)]
pub enum SchemaElem {
    Scalar(ValueKind),
    Block(Vec<SchemaField>),
}

impl SchemaField {
    /// Computed-only fields are attributes, everything else is an argument
    pub fn is_attribute(&self) -> bool {
        self.computed && !self.required && !self.optional
    }
}

/// Parsed schema map together with the constructor that built it
#[derive(Debug, Clone)]
pub struct SchemaMap {
    pub fields: Vec<SchemaField>,
    /// Function wrapping the entry array (e.g., `pluginsdk::schema_map`)
    pub ctor: Option<syn::Path>,
}

/// Parse the value of a `schema:` field
pub fn parse_schema_map(expr: &Expr, config: &MigrationConfig) -> Option<SchemaMap> {
    let ctor = match strip(expr) {
        Expr::Call(call) => match call.func.as_ref() {
            Expr::Path(path) => Some(path.path.clone()),
            _ => None,
        },
        _ => None,
    };
    let array = find_entry_array(expr)?;

    let mut fields = Vec::new();
    for element in &array.elems {
        let Expr::Tuple(tuple) = element else {
            continue;
        };
        if tuple.elems.len() != 2 {
            continue;
        }
        let (key, value) = (&tuple.elems[0], &tuple.elems[1]);
        let Some(tag) = string_literal(key) else {
            warn!(key = %key.to_token_stream(), "schema key is not a string literal, skipping");
            continue;
        };
        fields.push(parse_schema_field(&tag, value, config));
    }

    Some(SchemaMap { fields, ctor })
}

/// Parse one schema entry value
fn parse_schema_field(tag: &str, value: &Expr, config: &MigrationConfig) -> SchemaField {
    let mut field = empty_field(tag, value);

    match strip(value) {
        Expr::Struct(literal) if struct_named(literal, "Schema") => {
            apply_schema_literal(&mut field, literal, config);
        }
        Expr::Call(call) => {
            let helper = match call.func.as_ref() {
                Expr::Path(path) => config.schema_helpers.get(&path_to_string(&path.path)),
                _ => None,
            };
            match helper {
                Some(helper) => {
                    field.kind = helper.kind;
                    field.elem = helper.elem.map(SchemaElem::Scalar);
                    field.required = helper.required;
                    field.computed = helper.computed;
                    field.optional = !helper.required && !helper.computed;
                }
                None => {
                    warn!(tag, call = %call.func.to_token_stream(), "unknown schema helper, assuming optional string");
                    field.optional = true;
                }
            }
        }
        other => {
            warn!(tag, expr = %other.to_token_stream(), "unrecognised schema expression, assuming optional string");
            field.optional = true;
        }
    }

    field
}

fn empty_field(tag: &str, expr: &Expr) -> SchemaField {
    SchemaField {
        tag: tag.to_string(),
        kind: ValueKind::String,
        elem: None,
        required: false,
        optional: false,
        computed: false,
        expr: expr.clone(),
    }
}

fn apply_schema_literal(field: &mut SchemaField, literal: &ExprStruct, config: &MigrationConfig) {
    for entry in &literal.fields {
        let Member::Named(name) = &entry.member else {
            continue;
        };
        match name.unraw().to_string().as_str() {
            "type" | "type_" | "kind" => {
                let variant = match strip(&entry.expr) {
                    Expr::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
                    _ => None,
                };
                match variant.as_deref().and_then(ValueKind::from_variant) {
                    Some(kind) => field.kind = kind,
                    None => warn!(tag = %field.tag, "unrecognised value type, assuming string"),
                }
            }
            "required" => field.required = bool_literal(&entry.expr),
            "optional" => field.optional = bool_literal(&entry.expr),
            "computed" => field.computed = bool_literal(&entry.expr),
            "elem" => field.elem = parse_elem(&entry.expr, config),
            _ => {}
        }
    }
}

/// Parse `elem: Elem::resource(Resource { .. })` or `elem: Elem::schema(Schema { .. })`
fn parse_elem(expr: &Expr, config: &MigrationConfig) -> Option<SchemaElem> {
    let literal = find_struct(expr)?;
    if struct_named(literal, &config.resource_type_name) {
        let schema = literal
            .fields
            .iter()
            .find(|f| matches!(&f.member, Member::Named(n) if n == "schema"))?;
        let map = parse_schema_map(&schema.expr, config)?;
        Some(SchemaElem::Block(map.fields))
    } else if struct_named(literal, "Schema") {
        let mut inner = empty_field("", expr);
        apply_schema_literal(&mut inner, literal, config);
        Some(SchemaElem::Scalar(inner.kind))
    } else {
        None
    }
}

/// Build the model forest described by a schema
///
/// Nested blocks become `<Tag>Model`; a name already taken is prefixed
/// with the parent model's stem.
pub fn synthesize_models(top: &str, fields: &[SchemaField]) -> Vec<Model> {
    let mut models = Vec::new();
    synthesize_into(top, fields, &mut models);
    models
}

fn synthesize_into(name: &str, fields: &[SchemaField], models: &mut Vec<Model>) {
    // Reserve the slot so nested names cannot collide with this model
    let index = models.len();
    models.push(Model {
        name: name.to_string(),
        fields: Vec::new(),
        declared: false,
    });

    let mut model_fields = Vec::with_capacity(fields.len());
    for field in fields {
        let ty = match (&field.elem, field.kind) {
            (Some(SchemaElem::Block(nested)), kind) => {
                let nested_name = nested_model_name(name, &field.tag, models);
                synthesize_into(&nested_name, nested, models);
                if kind == ValueKind::Map {
                    format!("HashMap<String, {nested_name}>")
                } else {
                    format!("Vec<{nested_name}>")
                }
            }
            (elem, kind) => {
                let elem_ty = match elem {
                    Some(SchemaElem::Scalar(k)) => k.scalar_rust_type().unwrap_or("String"),
                    _ => "String",
                };
                match kind {
                    kind if kind.is_sequence() => format!("Vec<{elem_ty}>"),
                    ValueKind::Map => format!("HashMap<String, {elem_ty}>"),
                    scalar => scalar.scalar_rust_type().unwrap_or("String").to_string(),
                }
            }
        };
        model_fields.push(ModelField {
            name: field_name_for_tag(&field.tag),
            ty,
            tag: field.tag.clone(),
        });
    }
    models[index].fields = model_fields;
}

fn nested_model_name(parent: &str, tag: &str, models: &[Model]) -> String {
    let taken = |name: &str| models.iter().any(|m| m.name == name);
    let base = to_camel_case(tag);
    let candidate = format!("{base}Model");
    if !taken(&candidate) {
        return candidate;
    }

    let stem = parent.strip_suffix("Model").unwrap_or(parent);
    let prefixed = format!("{stem}{base}Model");
    if !taken(&prefixed) {
        return prefixed;
    }
    (2usize..)
        .map(|n| format!("{stem}{base}{n}Model"))
        .find(|name| !taken(name))
        .unwrap_or(prefixed)
}

/// Peel parentheses, groups and references
fn strip(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(inner) => strip(&inner.expr),
        Expr::Reference(inner) => strip(&inner.expr),
        Expr::Group(inner) => strip(&inner.expr),
        _ => expr,
    }
}

fn struct_named(literal: &ExprStruct, name: &str) -> bool {
    literal.path.segments.last().is_some_and(|s| s.ident == name)
}

/// First struct literal reachable through wrapper calls
fn find_struct(expr: &Expr) -> Option<&ExprStruct> {
    match strip(expr) {
        Expr::Struct(literal) => Some(literal),
        Expr::Call(call) => call.args.iter().find_map(find_struct),
        Expr::MethodCall(call) => find_struct(&call.receiver),
        _ => None,
    }
}

/// First array of entries reachable through constructor calls or `vec![..]`
fn find_entry_array(expr: &Expr) -> Option<ExprArray> {
    match strip(expr) {
        Expr::Array(array) => Some(array.clone()),
        Expr::Call(call) => call.args.iter().find_map(find_entry_array),
        Expr::MethodCall(call) => find_entry_array(&call.receiver)
            .or_else(|| call.args.iter().find_map(find_entry_array)),
        Expr::Macro(mac) if mac.mac.path.is_ident("vec") => {
            let elems = mac
                .mac
                .parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated)
                .ok()?;
            Some(ExprArray {
                attrs: Vec::new(),
                bracket_token: Default::default(),
                elems,
            })
        }
        _ => None,
    }
}

/// The string value of `"x"`, `"x".to_string()`, `"x".into()` or `String::from("x")`
pub fn string_literal(expr: &Expr) -> Option<String> {
    match strip(expr) {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Some(s.value()),
            _ => None,
        },
        Expr::MethodCall(call)
            if call.args.is_empty()
                && matches!(call.method.to_string().as_str(), "to_string" | "into" | "to_owned") =>
        {
            string_literal(&call.receiver)
        }
        Expr::Call(call) if call.args.len() == 1 => match call.func.as_ref() {
            Expr::Path(path) if path_to_string(&path.path) == "String::from" => {
                string_literal(&call.args[0])
            }
            _ => None,
        },
        _ => None,
    }
}

fn bool_literal(expr: &Expr) -> bool {
    matches!(strip(expr), Expr::Lit(lit) if matches!(&lit.lit, Lit::Bool(b) if b.value))
}
