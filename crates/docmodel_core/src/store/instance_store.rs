//! In-memory document collection.
//!
//! # Responsibility
//! - Own the documents of one loaded model together with its hierarchy and
//!   view cache.
//! - Route create/find/update/push/remove through the assigner, matcher
//!   and mutation engine.
//!
//! # Invariants
//! - Document ids are unique within a store.
//! - The class index is owned here, invalidated on insert/remove and rebuilt
//!   on the next scan.

use crate::config::ModelOptions;
use crate::error::{ModelError, ModelResult};
use crate::model::classifier::{ClassifierId, ClassifierKind};
use crate::model::document::{
    DocId, Document, Layout, LayoutSource, CLASS_KEY, ID_KEY, MIXINS_KEY,
};
use crate::mutation::assign::Assigner;
use crate::mutation::ops::Mutator;
use crate::mutation::selector::SelectorStep;
use crate::query::matcher::match_query;
use crate::schema::hierarchy::Hierarchy;
use crate::view::mixin_view::{DocView, DocViewMut, ViewBuilder};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

type ClassIndex = HashMap<ClassifierId, Vec<DocId>>;

/// Loaded model: classifiers plus the documents typed by them.
#[derive(Debug)]
pub struct Model {
    hierarchy: Hierarchy,
    views: ViewBuilder,
    options: ModelOptions,
    documents: BTreeMap<DocId, Document>,
    class_index: RefCell<Option<ClassIndex>>,
}

impl Model {
    pub fn new(hierarchy: Hierarchy) -> Self {
        Self::with_options(hierarchy, ModelOptions::default())
    }

    pub fn with_options(hierarchy: Hierarchy, options: ModelOptions) -> Self {
        Self {
            hierarchy,
            views: ViewBuilder::new(),
            options,
            documents: BTreeMap::new(),
            class_index: RefCell::new(None),
        }
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn views(&self) -> &ViewBuilder {
        &self.views
    }

    pub fn options(&self) -> ModelOptions {
        self.options
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn assigner(&self) -> Assigner<'_> {
        assigner(&self.hierarchy, self.options)
    }

    /// Bulk-loads persisted documents.
    ///
    /// Either every document is inserted or none is.
    ///
    /// # Errors
    /// - `InvalidDocument` when a layout lacks identity fields or its
    ///   `_class` is a mixin.
    /// - `NotFound` when `_class` is unknown.
    /// - `NotAMixin`/`IncompatibleMixin` for a bad `_mixins` entry.
    /// - `AlreadyExists` for an id present in the store or repeated in input.
    pub fn load_model(&mut self, documents: impl IntoIterator<Item = Document>) -> ModelResult<usize> {
        let mut staged = BTreeMap::new();
        for document in documents {
            document.validate()?;
            if self.hierarchy.kind(document.class())? != ClassifierKind::Class {
                return Err(ModelError::InvalidDocument(format!(
                    "`{CLASS_KEY}` of {} names mixin {}",
                    document.id(),
                    document.class()
                )));
            }
            if let Some(mixins) = document.get(MIXINS_KEY) {
                self.hierarchy.validate_mixins(document.class(), mixins)?;
            }
            let id = document.id().to_string();
            if self.documents.contains_key(&id) || staged.contains_key(&id) {
                return Err(ModelError::AlreadyExists(id));
            }
            staged.insert(id, document);
        }

        let count = staged.len();
        self.documents.append(&mut staged);
        self.invalidate_index();
        info!(
            "event=documents_load module=store status=ok count={} total={}",
            count,
            self.documents.len()
        );
        Ok(count)
    }

    /// Creates a document typed by `class` from loose `values`.
    ///
    /// `_class` is set to the concrete class of `class`; when `class` is a
    /// mixin it is also recorded in `_mixins`. A fresh UUID is used when no
    /// id is given.
    pub fn create_document(
        &mut self,
        class: &str,
        values: &Map<String, Value>,
        id: Option<DocId>,
    ) -> ModelResult<&Document> {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.documents.contains_key(&id) {
            warn!(
                "event=document_create module=store status=error error_code=already_exists doc_id={}",
                id
            );
            return Err(ModelError::AlreadyExists(id));
        }

        let concrete = self.hierarchy.resolve_concrete_class(class)?.to_string();
        let mut layout = Layout::new();
        layout.insert(ID_KEY.to_string(), Value::String(id.clone()));
        layout.insert(CLASS_KEY.to_string(), Value::String(concrete.clone()));
        if self.hierarchy.is_mixin(class) {
            layout.insert(
                MIXINS_KEY.to_string(),
                Value::Array(vec![Value::String(class.to_string())]),
            );
        }
        self.assigner().assign(&mut layout, class, values)?;
        let document = Document::from_layout(layout)?;
        if document.id() != id {
            return Err(ModelError::InvalidDocument(format!(
                "`{ID_KEY}` in values does not match {id}"
            )));
        }
        if document.class() != concrete {
            return Err(ModelError::InvalidDocument(format!(
                "`{CLASS_KEY}` in values does not match {concrete}"
            )));
        }
        if let Some(mixins) = document.get(MIXINS_KEY) {
            self.hierarchy.validate_mixins(&concrete, mixins)?;
        }

        debug!(
            "event=document_create module=store status=ok doc_id={} class={}",
            id,
            document.class()
        );
        self.invalidate_index();
        let document: &Document = self.documents.entry(id).or_insert(document);
        Ok(document)
    }

    pub fn get_document(&self, id: &str) -> ModelResult<&Document> {
        self.documents
            .get(id)
            .ok_or_else(|| ModelError::NotFound(id.to_string()))
    }

    /// Raw physical-key layout of a document, for index builders.
    pub fn get_layout(&self, id: &str) -> ModelResult<&Layout> {
        self.get_document(id).map(LayoutSource::layout)
    }

    /// Returns documents in scope of `class` that match `query`, ordered by id.
    ///
    /// # Errors
    /// - `NotFound` when `class` is unknown.
    /// - Attribute resolution and `$regex` errors from matching.
    pub fn find(&self, class: &str, query: &Map<String, Value>) -> ModelResult<Vec<&Document>> {
        let base = self.hierarchy.resolve_concrete_class(class)?;
        let mut candidates = self.candidates(base);
        candidates.sort();

        let mut found = Vec::new();
        for id in candidates {
            let Some(document) = self.documents.get(&id) else {
                continue;
            };
            if match_query(&self.hierarchy, class, document, query)? {
                found.push(document);
            }
        }
        debug!(
            "event=find module=store status=ok class={} hits={}",
            class,
            found.len()
        );
        Ok(found)
    }

    /// Ids of documents whose class extends `base`, via the class index.
    fn candidates(&self, base: &str) -> Vec<DocId> {
        let mut slot = self.class_index.borrow_mut();
        let index = slot.get_or_insert_with(|| {
            let mut index = ClassIndex::new();
            for (id, document) in &self.documents {
                index
                    .entry(document.class().to_string())
                    .or_default()
                    .push(id.clone());
            }
            debug!(
                "event=class_index_build module=store status=ok classes={} documents={}",
                index.len(),
                self.documents.len()
            );
            index
        });
        index
            .iter()
            .filter(|(class, _)| self.hierarchy.is_subtype(class, base))
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect()
    }

    fn invalidate_index(&self) {
        self.class_index.borrow_mut().take();
    }

    /// Set: merges `values` into the node addressed by `selector`.
    ///
    /// Identity fields cannot be overwritten, see [`Mutator::set`].
    pub fn update_document(
        &mut self,
        id: &str,
        selector: &[SelectorStep],
        values: &Map<String, Value>,
    ) -> ModelResult<()> {
        let mutator = mutator(&self.hierarchy, self.options);
        let document = self
            .documents
            .get_mut(id)
            .ok_or_else(|| ModelError::NotFound(id.to_string()))?;
        let class = document.class().to_string();
        let result = mutator.set(&class, document.layout_mut(), selector, values);
        log_mutation("update", id, &result);
        result
    }

    /// Push: appends one typed element to the array attribute named by the
    /// last selector segment.
    pub fn push_document(
        &mut self,
        id: &str,
        selector: &[SelectorStep],
        value: &Value,
    ) -> ModelResult<()> {
        let mutator = mutator(&self.hierarchy, self.options);
        let document = self
            .documents
            .get_mut(id)
            .ok_or_else(|| ModelError::NotFound(id.to_string()))?;
        let class = document.class().to_string();
        let result = mutator.push(&class, document.layout_mut(), selector, value);
        log_mutation("push", id, &result);
        result
    }

    /// Removes the whole document for an empty selector, otherwise pulls the
    /// element the selector matches.
    pub fn remove_document(&mut self, id: &str, selector: &[SelectorStep]) -> ModelResult<()> {
        if selector.is_empty() {
            self.documents
                .remove(id)
                .ok_or_else(|| ModelError::NotFound(id.to_string()))?;
            self.invalidate_index();
            debug!("event=document_remove module=store status=ok doc_id={}", id);
            return Ok(());
        }

        let mutator = mutator(&self.hierarchy, self.options);
        let document = self
            .documents
            .get_mut(id)
            .ok_or_else(|| ModelError::NotFound(id.to_string()))?;
        let class = document.class().to_string();
        let result = mutator.pull(&class, document.layout_mut(), selector);
        log_mutation("pull", id, &result);
        result
    }

    /// All documents, ordered by id.
    pub fn dump(&self) -> Vec<Document> {
        self.documents.values().cloned().collect()
    }

    /// Views document `id` as classifier `classifier`.
    pub fn view(&self, id: &str, classifier: &str) -> ModelResult<DocView<'_>> {
        let document = self.get_document(id)?;
        self.views.view(&self.hierarchy, document, classifier)
    }

    pub fn view_mut(&mut self, id: &str, classifier: &str) -> ModelResult<DocViewMut<'_>> {
        let document = self
            .documents
            .get_mut(id)
            .ok_or_else(|| ModelError::NotFound(id.to_string()))?;
        self.views.view_mut(&self.hierarchy, document, classifier)
    }

    /// Applies `mixin` to document `id` and returns a writable view of it.
    pub fn cast(&mut self, id: &str, mixin: &str) -> ModelResult<DocViewMut<'_>> {
        let document = self
            .documents
            .get_mut(id)
            .ok_or_else(|| ModelError::NotFound(id.to_string()))?;
        self.views.cast(&self.hierarchy, document, mixin)
    }

    pub fn is_mixed_in(&self, id: &str, mixin: &str) -> ModelResult<bool> {
        Ok(self.get_document(id)?.is_mixed_in(mixin))
    }
}

fn assigner(hierarchy: &Hierarchy, options: ModelOptions) -> Assigner<'_> {
    Assigner::new(hierarchy).strict_array_input(options.strict_array_input)
}

fn mutator(hierarchy: &Hierarchy, options: ModelOptions) -> Mutator<'_> {
    Mutator::new(hierarchy, assigner(hierarchy, options))
}

fn log_mutation(operation: &str, id: &str, result: &ModelResult<()>) {
    match result {
        Ok(()) => debug!(
            "event=document_{} module=store status=ok doc_id={}",
            operation, id
        ),
        Err(err) => warn!(
            "event=document_{} module=store status=error doc_id={} error={}",
            operation, id, err
        ),
    }
}
