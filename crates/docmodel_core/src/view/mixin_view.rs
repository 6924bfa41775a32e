//! Accessor tables and borrowed document views.

use crate::error::{ModelError, ModelResult};
use crate::model::classifier::{ClassifierId, ClassifierKind};
use crate::model::document::{layout_class, Document, Layout, LayoutSource};
use crate::model::key::PhysicalKey;
use crate::schema::hierarchy::Hierarchy;
use log::debug;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Where one declared attribute lives in a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    pub key: PhysicalKey,
    pub owner: ClassifierId,
    wire: String,
}

impl Accessor {
    pub fn wire_key(&self) -> &str {
        &self.wire
    }
}

/// Field accessors declared by one classifier, chained to its parent's.
#[derive(Debug)]
pub struct AccessorTable {
    classifier: ClassifierId,
    kind: ClassifierKind,
    fields: BTreeMap<String, Accessor>,
    parent: Option<Rc<AccessorTable>>,
}

impl AccessorTable {
    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    pub fn kind(&self) -> ClassifierKind {
        self.kind
    }

    /// Looks `name` up on this table, then up the parent chain.
    pub fn accessor(&self, name: &str) -> Option<&Accessor> {
        match self.fields.get(name) {
            Some(accessor) => Some(accessor),
            None => self.parent.as_deref().and_then(|parent| parent.accessor(name)),
        }
    }

    /// Visible attribute names, nearest declaration first.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        if let Some(parent) = self.parent.as_deref() {
            for name in parent.names() {
                if !self.fields.contains_key(name) {
                    names.push(name);
                }
            }
        }
        names
    }

    fn require(&self, name: &str) -> ModelResult<&Accessor> {
        self.accessor(name)
            .ok_or_else(|| ModelError::AttributeNotFound {
                class: self.classifier.clone(),
                attribute: name.to_string(),
            })
    }
}

/// Builds and memoizes accessor tables for one model instance.
#[derive(Debug, Default)]
pub struct ViewBuilder {
    tables: RefCell<HashMap<ClassifierId, Rc<AccessorTable>>>,
}

impl ViewBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of memoized tables.
    pub fn cached(&self) -> usize {
        self.tables.borrow().len()
    }

    /// Returns the accessor table of `id`, building it and its ancestors'
    /// tables on first use.
    pub fn table(&self, hierarchy: &Hierarchy, id: &str) -> ModelResult<Rc<AccessorTable>> {
        if let Some(table) = self.tables.borrow().get(id) {
            return Ok(Rc::clone(table));
        }

        let classifier = hierarchy.get(id)?;
        let parent = match classifier.extends.as_deref() {
            Some(parent) => Some(self.table(hierarchy, parent)?),
            None => None,
        };
        let fields = classifier
            .attributes
            .iter()
            .map(|attribute| {
                let key = classifier.physical_key(&attribute.name);
                let accessor = Accessor {
                    wire: key.to_wire(),
                    key,
                    owner: classifier.id.clone(),
                };
                (attribute.name.clone(), accessor)
            })
            .collect();
        let table = Rc::new(AccessorTable {
            classifier: classifier.id.clone(),
            kind: classifier.kind,
            fields,
            parent,
        });

        debug!(
            "event=view_table_build module=view status=ok classifier={}",
            classifier.id
        );
        self.tables
            .borrow_mut()
            .insert(classifier.id.clone(), Rc::clone(&table));
        Ok(table)
    }

    /// Views `doc` as classifier `id`.
    ///
    /// For a CLASS, the document must be of that class or a subclass and the
    /// view reports the document's own class.
    pub fn view<'a>(
        &self,
        hierarchy: &Hierarchy,
        doc: &'a Document,
        id: &str,
    ) -> ModelResult<DocView<'a>> {
        let table = self.table(hierarchy, id)?;
        check_view_target(hierarchy, &table, doc)?;
        Ok(DocView {
            layout: doc.layout(),
            table,
        })
    }

    /// Writable variant of [`ViewBuilder::view`].
    pub fn view_mut<'a>(
        &self,
        hierarchy: &Hierarchy,
        doc: &'a mut Document,
        id: &str,
    ) -> ModelResult<DocViewMut<'a>> {
        let table = self.table(hierarchy, id)?;
        check_view_target(hierarchy, &table, doc)?;
        Ok(DocViewMut {
            layout: doc.layout_mut(),
            table,
        })
    }

    /// Registers `mixin` on `doc` (once) and returns a writable view of it.
    ///
    /// # Errors
    /// - `NotAMixin` when `mixin` is a CLASS.
    /// - `IncompatibleMixin` when the mixin's base class is not an ancestor
    ///   of the document's class.
    pub fn cast<'a>(
        &self,
        hierarchy: &Hierarchy,
        doc: &'a mut Document,
        mixin: &str,
    ) -> ModelResult<DocViewMut<'a>> {
        if hierarchy.kind(mixin)? != ClassifierKind::Mixin {
            return Err(ModelError::NotAMixin(mixin.to_string()));
        }
        let base = hierarchy.resolve_concrete_class(mixin)?;
        if !hierarchy.is_subtype(doc.class(), base) {
            return Err(ModelError::IncompatibleMixin {
                mixin: mixin.to_string(),
                class: doc.class().to_string(),
            });
        }
        if doc.add_mixin(mixin) {
            debug!(
                "event=mixin_cast module=view status=ok doc_id={} mixin={}",
                doc.id(),
                mixin
            );
        }
        self.view_mut(hierarchy, doc, mixin)
    }
}

/// Returns whether `mixin` is in the document's applied-mixins list.
pub fn is_mixed_in(doc: &Document, mixin: &str) -> bool {
    doc.is_mixed_in(mixin)
}

fn check_view_target(
    hierarchy: &Hierarchy,
    table: &AccessorTable,
    doc: &Document,
) -> ModelResult<()> {
    if table.kind == ClassifierKind::Class && !hierarchy.is_subtype(doc.class(), &table.classifier)
    {
        return Err(ModelError::IncompatibleMixin {
            mixin: table.classifier.clone(),
            class: doc.class().to_string(),
        });
    }
    Ok(())
}

fn view_class<'a>(table: &'a AccessorTable, layout: &'a Layout) -> &'a str {
    match table.kind {
        ClassifierKind::Mixin => &table.classifier,
        ClassifierKind::Class => layout_class(layout).unwrap_or(&table.classifier),
    }
}

/// Read-only view of a document through an accessor table.
#[derive(Debug, Clone)]
pub struct DocView<'a> {
    layout: &'a Layout,
    table: Rc<AccessorTable>,
}

impl<'a> DocView<'a> {
    /// Mixin id for mixin views, the document's own class otherwise.
    pub fn class(&self) -> &str {
        view_class(&self.table, self.layout)
    }

    pub fn table(&self) -> &AccessorTable {
        &self.table
    }

    /// Reads attribute `name` at its physical key.
    ///
    /// # Errors
    /// - `AttributeNotFound` when `name` is not visible on this view.
    pub fn get(&self, name: &str) -> ModelResult<Option<&'a Value>> {
        let accessor = self.table.require(name)?;
        Ok(self.layout.get(accessor.wire_key()))
    }
}

impl LayoutSource for DocView<'_> {
    fn layout(&self) -> &Layout {
        self.layout
    }
}

/// Writable view of a document through an accessor table.
#[derive(Debug)]
pub struct DocViewMut<'a> {
    layout: &'a mut Layout,
    table: Rc<AccessorTable>,
}

impl DocViewMut<'_> {
    pub fn class(&self) -> &str {
        view_class(&self.table, &*self.layout)
    }

    pub fn table(&self) -> &AccessorTable {
        &self.table
    }

    pub fn get(&self, name: &str) -> ModelResult<Option<&Value>> {
        let accessor = self.table.require(name)?;
        Ok(self.layout.get(accessor.wire_key()))
    }

    /// Writes attribute `name` at its physical key; returns the old value.
    pub fn set(&mut self, name: &str, value: Value) -> ModelResult<Option<Value>> {
        let wire = self.table.require(name)?.wire_key().to_string();
        Ok(self.layout.insert(wire, value))
    }

    /// Deletes attribute `name`; returns the removed value.
    pub fn remove(&mut self, name: &str) -> ModelResult<Option<Value>> {
        let wire = self.table.require(name)?.wire_key().to_string();
        Ok(self.layout.remove(&wire))
    }
}

impl LayoutSource for DocViewMut<'_> {
    fn layout(&self) -> &Layout {
        &*self.layout
    }
}
