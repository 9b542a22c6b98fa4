//! Typed model forest and schema-tag resolution

use crate::naming::{element_model_name, is_sequence_type};
use std::collections::BTreeSet;
use tracing::error;

/// One field of a typed model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelField {
    /// Target field identifier (e.g., "resource_group_name")
    pub name: String,
    /// Declared type (e.g., "Vec<SkuModel>")
    pub ty: String,
    /// Persisted schema key this field corresponds to
    pub tag: String,
}

/// A typed model struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub name: String,
    pub fields: Vec<ModelField>,
    /// Declared in the source file rather than synthesized from the schema
    pub declared: bool,
}

impl Model {
    pub fn field_by_tag(&self, tag: &str) -> Option<&ModelField> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&ModelField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The complete set of schema tags of this model
    pub fn tag_set(&self) -> BTreeSet<&str> {
        self.fields.iter().map(|f| f.tag.as_str()).collect()
    }
}

/// One step of a resolved tag path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStep<'a> {
    Field(&'a ModelField),
    /// List index into a sequence field (the `0` in `sku.0.name`)
    Index(usize),
}

/// All models of one resource, rooted at the top model
#[derive(Debug, Clone, Default)]
pub struct ModelSet {
    top: String,
    models: Vec<Model>,
}

impl ModelSet {
    pub fn new(top: impl Into<String>, models: Vec<Model>) -> Self {
        Self {
            top: top.into(),
            models,
        }
    }

    /// Name of the top (root) model
    pub fn top_name(&self) -> &str {
        &self.top
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn get(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    /// The root model; its absence is an internal-consistency error
    pub fn top_model(&self) -> Option<&Model> {
        let model = self.get(&self.top);
        if model.is_none() {
            error!(model = %self.top, "top model is missing from the model set");
        }
        model
    }

    /// A named field of the root model
    pub fn top_field(&self, name: &str) -> Option<&ModelField> {
        self.top_model()?.field_by_name(name)
    }

    /// Resolve a dotted schema tag to the field it names
    ///
    /// An empty `model_name` starts from the top model. Every segment must
    /// resolve; `None` otherwise.
    pub fn find_field_by_tag(&self, model_name: &str, tag: &str) -> Option<&ModelField> {
        self.resolve_tag_path(model_name, tag)?
            .into_iter()
            .rev()
            .find_map(|step| match step {
                PathStep::Field(field) => Some(field),
                PathStep::Index(_) => None,
            })
    }

    /// Resolve a dotted schema tag to every step from `model_name` down
    pub fn resolve_tag_path(&self, model_name: &str, tag: &str) -> Option<Vec<PathStep<'_>>> {
        let model = if model_name.is_empty() {
            self.top_model()?
        } else {
            self.get(model_name)?
        };

        let (head, rest) = tag.split_once('.').unwrap_or((tag, ""));
        let field = model.field_by_tag(head)?;
        let mut steps = vec![PathStep::Field(field)];
        if rest.is_empty() {
            return Some(steps);
        }

        let (index, rest) = rest.split_once('.').unwrap_or((rest, ""));
        let rest = match index.parse::<usize>() {
            Ok(index) if is_sequence_type(&field.ty) => {
                steps.push(PathStep::Index(index));
                rest
            }
            Ok(_) => return None,
            // Not an index: the whole remainder is the next tag
            Err(_) => tag.split_once('.').map_or("", |(_, rest)| rest),
        };
        if rest.is_empty() {
            return Some(steps);
        }

        let next = element_model_name(&field.ty)?;
        steps.extend(self.resolve_tag_path(&next, rest)?);
        Some(steps)
    }

    /// Follow field names from the top model (`["sku", "name"]` → `sku.name`)
    pub fn field_by_path(&self, names: &[String]) -> Option<&ModelField> {
        let (first, rest) = names.split_first()?;
        let mut field = self.top_field(first)?;
        for name in rest {
            let next = element_model_name(&field.ty)?;
            field = self.get(&next)?.field_by_name(name)?;
        }
        Some(field)
    }

    /// The model whose complete tag set equals `keys` exactly
    pub fn find_model_by_keys<'k>(
        &self,
        keys: impl IntoIterator<Item = &'k str>,
    ) -> Option<&Model> {
        let keys: BTreeSet<&str> = keys.into_iter().collect();
        if keys.is_empty() {
            return None;
        }
        self.models.iter().find(|m| m.tag_set() == keys)
    }
}
