use docmodel_core::{
    AttributeType, Classifier, Document, Hierarchy, Model, ModelError, ModelOptions, SelectorStep,
};
use serde_json::{json, Map, Value};

fn hierarchy() -> Hierarchy {
    Hierarchy::load_model([
        Classifier::class("core.class.Doc").domain("model"),
        Classifier::class("task.class.Task")
            .extends("core.class.Doc")
            .attribute("name", AttributeType::String)
            .attribute(
                "tasks",
                AttributeType::array_of(AttributeType::instance_of("task.class.SubTask")),
            ),
        Classifier::class("task.class.SubTask").attribute("name", AttributeType::String),
        Classifier::mixin("task.mixin.Estimate")
            .extends("task.class.Task")
            .attribute("name", AttributeType::String)
            .attribute("hours", AttributeType::Number),
    ])
    .unwrap()
}

fn values(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn document(value: Value) -> Document {
    Document::from_layout(values(value)).unwrap()
}

#[test]
fn create_document_assigns_identity_and_typed_values() {
    let mut model = Model::new(hierarchy());
    let doc = model
        .create_document(
            "task.class.Task",
            &values(json!({"name": "t", "tasks": [{"name": "a"}]})),
            Some("t1".to_string()),
        )
        .unwrap();

    assert_eq!(doc.id(), "t1");
    assert_eq!(doc.class(), "task.class.Task");
    assert_eq!(
        doc.get("tasks"),
        Some(&json!([{"_class": "task.class.SubTask", "name": "a"}]))
    );
    assert_eq!(model.len(), 1);
}

#[test]
fn create_document_generates_unique_ids() {
    let mut model = Model::new(hierarchy());
    let first = model
        .create_document("task.class.Task", &Map::new(), None)
        .unwrap()
        .id()
        .to_string();
    let second = model
        .create_document("task.class.Task", &Map::new(), None)
        .unwrap()
        .id()
        .to_string();

    assert_ne!(first, second);
    assert!(uuid::Uuid::parse_str(&first).is_ok());
    assert_eq!(model.len(), 2);
}

#[test]
fn create_document_rejects_duplicate_ids() {
    let mut model = Model::new(hierarchy());
    model
        .create_document("task.class.Task", &Map::new(), Some("t1".to_string()))
        .unwrap();
    let err = model
        .create_document("task.class.Task", &Map::new(), Some("t1".to_string()))
        .unwrap_err();
    assert_eq!(err, ModelError::AlreadyExists("t1".to_string()));
}

#[test]
fn create_document_through_mixin_applies_it() {
    let mut model = Model::new(hierarchy());
    let doc = model
        .create_document(
            "task.mixin.Estimate",
            &values(json!({"name": "est", "hours": 3})),
            Some("t1".to_string()),
        )
        .unwrap();

    assert_eq!(doc.class(), "task.class.Task");
    assert_eq!(doc.mixins(), vec!["task.mixin.Estimate"]);
    assert_eq!(doc.get("name|task~mixin~Estimate"), Some(&json!("est")));
    assert_eq!(doc.get("name"), None);

    let found = model
        .find("task.mixin.Estimate", &values(json!({"hours": 3})))
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn create_document_rejects_unknown_class() {
    let mut model = Model::new(hierarchy());
    let err = model
        .create_document("task.class.Missing", &Map::new(), None)
        .unwrap_err();
    assert_eq!(err, ModelError::NotFound("task.class.Missing".to_string()));
    assert!(model.is_empty());
}

#[test]
fn strict_options_reject_non_array_input() {
    let mut model = Model::with_options(hierarchy(), ModelOptions::strict());
    let err = model
        .create_document(
            "task.class.Task",
            &values(json!({"tasks": "raw"})),
            Some("t1".to_string()),
        )
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidAttributeType { .. }));
    assert!(model.get_document("t1").is_err());

    let mut permissive = Model::new(hierarchy());
    let doc = permissive
        .create_document("task.class.Task", &values(json!({"tasks": "raw"})), None)
        .unwrap();
    assert_eq!(doc.get("tasks"), Some(&json!("raw")));
}

#[test]
fn find_sees_documents_created_after_a_previous_scan() {
    let mut model = Model::new(hierarchy());
    model
        .create_document("task.class.Task", &Map::new(), Some("t1".to_string()))
        .unwrap();
    assert_eq!(model.find("core.class.Doc", &Map::new()).unwrap().len(), 1);

    model
        .create_document("task.class.Task", &Map::new(), Some("t2".to_string()))
        .unwrap();
    assert_eq!(model.find("core.class.Doc", &Map::new()).unwrap().len(), 2);

    model.remove_document("t1", &[]).unwrap();
    let remaining = model.find("core.class.Doc", &Map::new()).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id(), "t2");
}

#[test]
fn remove_document_with_empty_selector_drops_document() {
    let mut model = Model::new(hierarchy());
    model
        .create_document("task.class.Task", &Map::new(), Some("t1".to_string()))
        .unwrap();
    model.remove_document("t1", &[]).unwrap();

    assert!(model.is_empty());
    assert_eq!(
        model.remove_document("t1", &[]).unwrap_err(),
        ModelError::NotFound("t1".to_string())
    );
}

#[test]
fn load_model_is_all_or_nothing() {
    let mut model = Model::new(hierarchy());
    let err = model
        .load_model([
            document(json!({"_id": "a", "_class": "task.class.Task"})),
            document(json!({"_id": "b", "_class": "task.mixin.Estimate"})),
        ])
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidDocument(_)));
    assert!(model.is_empty());

    let err = model
        .load_model([
            document(json!({"_id": "a", "_class": "task.class.Task"})),
            document(json!({"_id": "a", "_class": "task.class.Task"})),
        ])
        .unwrap_err();
    assert_eq!(err, ModelError::AlreadyExists("a".to_string()));
    assert!(model.is_empty());

    let loaded = model
        .load_model([
            document(json!({"_id": "a", "_class": "task.class.Task", "name": "x"})),
            document(json!({"_id": "b", "_class": "task.class.Task", "_mixins": ["task.mixin.Estimate"]})),
        ])
        .unwrap();
    assert_eq!(loaded, 2);
    assert!(model.is_mixed_in("b", "task.mixin.Estimate").unwrap());
}

#[test]
fn document_layout_requires_identity_fields() {
    let err = Document::from_layout(values(json!({"_class": "task.class.Task"}))).unwrap_err();
    assert!(matches!(err, ModelError::InvalidDocument(_)));
}

#[test]
fn dump_round_trips_through_load_model() {
    let mut model = Model::new(hierarchy());
    model
        .create_document(
            "task.class.Task",
            &values(json!({"name": "t", "tasks": [{"name": "a"}]})),
            Some("t1".to_string()),
        )
        .unwrap();
    model.cast("t1", "task.mixin.Estimate").unwrap();
    model
        .update_document(
            "t1",
            &[SelectorStep::matching("tasks", json!({"name": "a"}))],
            &values(json!({"name": "b"})),
        )
        .unwrap();

    let dumped = model.dump();
    let mut restored = Model::new(hierarchy());
    restored.load_model(dumped.clone()).unwrap();

    assert_eq!(restored.dump(), dumped);
    assert_eq!(
        restored.get_layout("t1").unwrap()["tasks"][0]["name"],
        json!("b")
    );
}

#[test]
fn create_document_keeps_concrete_class() {
    let mut model = Model::new(hierarchy());
    let err = model
        .create_document(
            "task.class.Task",
            &values(json!({"_class": "task.mixin.Estimate"})),
            Some("t2".to_string()),
        )
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidDocument(_)));
    assert!(model.get_document("t2").is_err());

    let err = model
        .create_document(
            "task.class.Task",
            &values(json!({"_class": "task.class.SubTask"})),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidDocument(_)));
    assert!(model.is_empty());
}

#[test]
fn applied_mixins_must_fit_the_document_class() {
    let mut model = Model::new(hierarchy());
    let err = model
        .create_document(
            "task.class.Task",
            &values(json!({"_mixins": "task.mixin.Estimate"})),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidDocument(_)));

    let err = model
        .create_document(
            "task.class.SubTask",
            &values(json!({"_mixins": ["task.mixin.Estimate"]})),
            None,
        )
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::IncompatibleMixin {
            mixin: "task.mixin.Estimate".to_string(),
            class: "task.class.SubTask".to_string(),
        }
    );

    let err = model
        .load_model([document(
            json!({"_id": "a", "_class": "task.class.Task", "_mixins": ["task.class.SubTask"]}),
        )])
        .unwrap_err();
    assert_eq!(err, ModelError::NotAMixin("task.class.SubTask".to_string()));
    assert!(model.is_empty());
}
