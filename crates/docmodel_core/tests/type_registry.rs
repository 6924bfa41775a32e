use docmodel_core::{AttributeType, Classifier, ClassifierKind, Hierarchy, ModelError, PhysicalKey};

fn hierarchy() -> Hierarchy {
    Hierarchy::load_model([
        Classifier::class("core.class.Doc")
            .domain("model")
            .attribute("createdOn", AttributeType::Date),
        Classifier::class("task.class.Task")
            .extends("core.class.Doc")
            .domain("task")
            .attribute("name", AttributeType::String)
            .attribute(
                "tasks",
                AttributeType::array_of(AttributeType::instance_of("task.class.SubTask")),
            ),
        Classifier::class("task.class.Bug")
            .extends("task.class.Task")
            .attribute("severity", AttributeType::Number),
        Classifier::class("task.class.SubTask").attribute("name", AttributeType::String),
        Classifier::mixin("task.mixin.Estimate")
            .extends("task.class.Task")
            .attribute("name", AttributeType::String)
            .attribute("hours", AttributeType::Number),
        Classifier::mixin("task.mixin.DetailedEstimate")
            .extends("task.mixin.Estimate")
            .attribute("breakdown", AttributeType::String),
    ])
    .unwrap()
}

#[test]
fn is_subtype_is_reflexive_for_every_classifier() {
    let hierarchy = hierarchy();
    for classifier in hierarchy.classifiers() {
        assert!(hierarchy.is_subtype(&classifier.id, &classifier.id));
    }
}

#[test]
fn is_subtype_is_transitive_along_extends() {
    let hierarchy = hierarchy();
    assert!(hierarchy.is_subtype("task.class.Bug", "task.class.Task"));
    assert!(hierarchy.is_subtype("task.class.Task", "core.class.Doc"));
    assert!(hierarchy.is_subtype("task.class.Bug", "core.class.Doc"));
    assert!(hierarchy.is_subtype("task.mixin.DetailedEstimate", "core.class.Doc"));

    assert!(!hierarchy.is_subtype("core.class.Doc", "task.class.Task"));
    assert!(!hierarchy.is_subtype("task.class.SubTask", "core.class.Doc"));
    assert!(!hierarchy.is_subtype("unknown.class.X", "core.class.Doc"));
}

#[test]
fn get_unknown_classifier_fails_with_not_found() {
    let hierarchy = hierarchy();
    let err = hierarchy.get("unknown.class.X").unwrap_err();
    assert_eq!(err, ModelError::NotFound("unknown.class.X".to_string()));
}

#[test]
fn resolve_attribute_walks_to_owning_classifier() {
    let hierarchy = hierarchy();
    let resolved = hierarchy
        .resolve_attribute("task.class.Bug", "createdOn")
        .unwrap();
    assert_eq!(resolved.owner, "core.class.Doc");
    assert_eq!(resolved.key, PhysicalKey::plain("createdOn"));
    assert_eq!(resolved.attribute.ty, AttributeType::Date);
}

#[test]
fn resolve_attribute_reports_missing_names() {
    let hierarchy = hierarchy();
    let err = hierarchy
        .resolve_attribute("task.class.Task", "severity")
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::AttributeNotFound {
            class: "task.class.Task".to_string(),
            attribute: "severity".to_string(),
        }
    );
}

#[test]
fn mixin_and_class_attributes_with_same_name_get_distinct_keys() {
    let hierarchy = hierarchy();
    let class_name = hierarchy.resolve_attribute("task.class.Task", "name").unwrap();
    let mixin_name = hierarchy
        .resolve_attribute("task.mixin.Estimate", "name")
        .unwrap();

    assert_ne!(class_name.wire_key(), mixin_name.wire_key());
    assert_eq!(class_name.wire_key(), "name");
    assert_eq!(mixin_name.wire_key(), "name|task~mixin~Estimate");
}

#[test]
fn derived_mixin_inherits_parent_mixin_keys() {
    let hierarchy = hierarchy();
    let hours = hierarchy
        .resolve_attribute("task.mixin.DetailedEstimate", "hours")
        .unwrap();
    assert_eq!(hours.owner, "task.mixin.Estimate");
    assert_eq!(hours.wire_key(), "hours|task~mixin~Estimate");

    let tasks = hierarchy
        .resolve_attribute("task.mixin.DetailedEstimate", "tasks")
        .unwrap();
    assert_eq!(tasks.wire_key(), "tasks");
}

#[test]
fn resolve_key_accepts_mixin_wire_form() {
    let hierarchy = hierarchy();
    let resolved = hierarchy
        .resolve_key("task.class.Task", "hours|task~mixin~Estimate")
        .unwrap();
    assert_eq!(resolved.owner, "task.mixin.Estimate");
}

#[test]
fn mixin_key_round_trips_for_dotted_ids() {
    for (mixin, name) in [
        ("task.mixin.Estimate", "hours"),
        ("plain", "x"),
        ("a.b.c.d.e", "long_name"),
    ] {
        let key = PhysicalKey::mixin(mixin, name);
        let decoded = PhysicalKey::parse(&key.to_wire());
        assert_eq!(decoded.mixin_id(), Some(mixin));
        assert_eq!(decoded.name(), name);
    }
}

#[test]
fn resolve_domain_uses_nearest_declaration() {
    let hierarchy = hierarchy();
    assert_eq!(hierarchy.resolve_domain("core.class.Doc").unwrap(), "model");
    assert_eq!(hierarchy.resolve_domain("task.class.Bug").unwrap(), "task");
    assert_eq!(
        hierarchy.resolve_domain("task.mixin.DetailedEstimate").unwrap(),
        "task"
    );
    assert_eq!(
        hierarchy.resolve_domain("task.class.SubTask").unwrap_err(),
        ModelError::NoDomain("task.class.SubTask".to_string())
    );
}

#[test]
fn resolve_concrete_class_skips_mixins() {
    let hierarchy = hierarchy();
    assert_eq!(
        hierarchy
            .resolve_concrete_class("task.mixin.DetailedEstimate")
            .unwrap(),
        "task.class.Task"
    );
    assert_eq!(
        hierarchy.resolve_concrete_class("task.class.Bug").unwrap(),
        "task.class.Bug"
    );
    assert_eq!(
        hierarchy.kind("task.mixin.Estimate").unwrap(),
        ClassifierKind::Mixin
    );
}

#[test]
fn all_attributes_lists_nearest_declaration_once() {
    let hierarchy = hierarchy();
    let attributes = hierarchy.all_attributes("task.mixin.Estimate").unwrap();
    let keys: Vec<String> = attributes.iter().map(|a| a.wire_key()).collect();
    assert_eq!(
        keys,
        vec![
            "name|task~mixin~Estimate",
            "hours|task~mixin~Estimate",
            "tasks",
            "createdOn",
        ]
    );
}

#[test]
fn load_model_rejects_invalid_input() {
    let duplicate = Hierarchy::load_model([
        Classifier::class("a.class.A"),
        Classifier::class("a.class.A"),
    ])
    .unwrap_err();
    assert_eq!(duplicate, ModelError::AlreadyExists("a.class.A".to_string()));

    let dangling =
        Hierarchy::load_model([Classifier::class("a.class.A").extends("a.class.Missing")])
            .unwrap_err();
    assert_eq!(dangling, ModelError::NotFound("a.class.Missing".to_string()));

    let cycle = Hierarchy::load_model([
        Classifier::class("a.class.A").extends("a.class.B"),
        Classifier::class("a.class.B").extends("a.class.A"),
    ])
    .unwrap_err();
    assert!(matches!(cycle, ModelError::CyclicInheritance(_)));

    let reserved = Hierarchy::load_model([Classifier::class("a|b")]).unwrap_err();
    assert_eq!(reserved, ModelError::InvalidIdentifier("a|b".to_string()));
}
