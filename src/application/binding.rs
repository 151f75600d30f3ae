//! Field bindings between object attributes and tree paths
//!
//! A [`FieldBinding`] ties one (possibly nested) attribute of a [`Record`]
//! to one path in a node tree, converting through the registry on the way.
//! Absent values never cross the boundary: they are not written to the tree,
//! and they never overwrite an attribute that already exists.

use tracing::{debug, instrument};

use crate::application::convert::ConverterRegistry;
use crate::application::tree::{NodeId, SaveOptions, Tree};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{check_key, join_path, parse_path, Record, Value};

/// Separator between nested attribute names, as in `image.kernel`.
pub const ATTR_SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    /// Intermediate attributes leading to the leaf
    attr_path: Vec<String>,
    attr: String,
    ty: Option<String>,
    path: String,
}

impl FieldBinding {
    /// Bind attribute `var` (dot-separated for nesting) to `path`.
    ///
    /// `ty` must be unset or registered in `registry`. `path` defaults to the
    /// attribute names joined with `/`; every component must be a valid key.
    pub fn new(
        registry: &ConverterRegistry,
        var: &str,
        ty: Option<&str>,
        path: Option<&str>,
    ) -> ApplicationResult<Self> {
        registry.check_type(ty)?;

        let mut names: Vec<String> = var
            .split(ATTR_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        let Some(attr) = names.pop() else {
            return Err(ApplicationError::configuration(format!(
                "invalid field name: '{}'",
                var
            )));
        };

        let path = match path {
            Some(p) => join_path(parse_path(p)?),
            None => {
                let segments: Vec<&str> = names
                    .iter()
                    .map(String::as_str)
                    .chain([attr.as_str()])
                    .collect();
                for segment in &segments {
                    check_key(segment)?;
                }
                join_path(segments)
            }
        };
        if path.is_empty() {
            return Err(ApplicationError::configuration(format!(
                "empty store path for field '{}'",
                var
            )));
        }

        Ok(Self {
            attr_path: names,
            attr,
            ty: ty.map(String::from),
            path,
        })
    }

    pub fn attr(&self) -> &str {
        &self.attr
    }

    pub fn ty(&self) -> Option<&str> {
        self.ty.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Attribute value on `obj`, `None` as soon as any link is missing or null.
    pub fn get_obj<'a>(&self, obj: &'a Record) -> Option<&'a Value> {
        obj.walk(self.attr_path.iter().map(String::as_str))?
            .get(&self.attr)
            .filter(|v| !v.is_null())
    }

    /// Assign onto `obj`, creating intermediate records as needed.
    ///
    /// An absent value is skipped when the attribute already exists, and
    /// stored as `Value::Null` otherwise.
    pub fn set_obj(&self, obj: &mut Record, value: Option<Value>) -> ApplicationResult<()> {
        let mut target = obj;
        for name in &self.attr_path {
            target = target
                .record_mut(name)
                .map_err(|found| ApplicationError::InvalidTarget {
                    attr: name.clone(),
                    reason: format!("expected a record, found {}", found),
                })?;
        }
        if value.is_none() && target.contains(&self.attr) {
            return Ok(());
        }
        target.set(self.attr.clone(), value.unwrap_or(Value::Null));
        Ok(())
    }

    /// Decoded value at the bound path below `node`, `None` if there is none.
    pub fn get_db(
        &self,
        registry: &ConverterRegistry,
        tree: &mut Tree,
        node: NodeId,
    ) -> ApplicationResult<Option<Value>> {
        let id = match tree.lookup(node, &self.path) {
            Ok(id) => id,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        match tree.scalar_value(id)? {
            Some(text) => Ok(Some(registry.decode(text, self.ty())?)),
            None => Ok(None),
        }
    }

    /// Encode `value` and assign it at the bound path. `None` writes nothing.
    pub fn set_db(
        &self,
        registry: &ConverterRegistry,
        tree: &mut Tree,
        node: NodeId,
        value: Option<&Value>,
    ) -> ApplicationResult<()> {
        let Some(value) = value else {
            return Ok(());
        };
        let data = registry.encode(value, self.ty())?;
        tree.set(node, &self.path, data)?;
        Ok(())
    }

    #[instrument(level = "trace", skip(self, registry, tree, obj), fields(attr = %self.attr, path = %self.path))]
    pub fn export_to_store(
        &self,
        registry: &ConverterRegistry,
        tree: &mut Tree,
        node: NodeId,
        obj: &Record,
    ) -> ApplicationResult<()> {
        self.set_db(registry, tree, node, self.get_obj(obj))
    }

    #[instrument(level = "trace", skip(self, registry, tree, obj), fields(attr = %self.attr, path = %self.path))]
    pub fn import_from_store(
        &self,
        registry: &ConverterRegistry,
        tree: &mut Tree,
        node: NodeId,
        obj: &mut Record,
    ) -> ApplicationResult<()> {
        let value = self.get_db(registry, tree, node)?;
        self.set_obj(obj, value)
    }
}

/// Apply every binding's import, in order.
pub fn import_all(
    registry: &ConverterRegistry,
    tree: &mut Tree,
    node: NodeId,
    obj: &mut Record,
    fields: &[FieldBinding],
) -> ApplicationResult<()> {
    debug!("import_all: {} fields", fields.len());
    for field in fields {
        field.import_from_store(registry, tree, node, obj)?;
    }
    Ok(())
}

/// Apply every binding's export, in order, then save `node` once.
pub fn export_all(
    registry: &ConverterRegistry,
    tree: &mut Tree,
    node: NodeId,
    obj: &Record,
    fields: &[FieldBinding],
    opts: SaveOptions,
) -> ApplicationResult<()> {
    debug!("export_all: {} fields, {:?}", fields.len(), opts);
    for field in fields {
        field.export_to_store(registry, tree, node, obj)?;
    }
    tree.save(node, opts)
}
