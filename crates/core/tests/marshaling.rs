//! End-to-end behavior of entities, marshaling, converters and the cache

use std::marker::PhantomData;
use std::sync::Arc;

use typedprop_core::{
    ConverterStrategy, Dump, Error, FlatArray, Marshal, ObjectRef, PropertyAccess, RuntimeCache,
    Schema, SchemaObject, SchemaRegistry, TypeDescriptor, Value,
};

#[derive(Schema)]
#[schema(type_name = "Person")]
struct Person {
    handle: ObjectRef,

    name: PhantomData<Option<String>>,

    #[schema(default = "0")]
    age: PhantomData<i64>,

    friends: PhantomData<Option<Vec<Person>>>,

    #[schema(field = "home", readonly)]
    _address: PhantomData<Option<ObjectRef>>,
}

#[derive(Schema)]
#[schema(type_name = "Employee", extends = "Person")]
struct Employee {
    handle: ObjectRef,

    #[schema(ty = "float")]
    salary: PhantomData<Option<f64>>,
}

#[derive(Schema)]
#[schema(record)]
struct Address {
    handle: ObjectRef,

    city: PhantomData<Value>,
}

#[derive(Schema)]
struct Counter {
    handle: ObjectRef,

    #[schema(default = "0")]
    hits: PhantomData<i32>,

    ratio: PhantomData<Option<f32>>,

    #[schema(default = r#"{"a": 1}"#)]
    tally: PhantomData<indexmap::IndexMap<String, u8>>,
}

fn registry() -> SchemaRegistry {
    let registry = SchemaRegistry::new();
    registry.register_schema::<Person>();
    registry.register_schema::<Employee>();
    registry.register_schema::<Address>();
    registry.register_schema::<Counter>();
    registry.register(
        TypeDescriptor::entity("Node")
            .property("label", "string")
            .property("child", "Node"),
    );
    registry.register(
        TypeDescriptor::entity("Bag")
            .property("id", "int")
            .permissive()
            .default_type("int"),
    );
    registry
}

fn marshal() -> Arc<Marshal> {
    Marshal::with_cache(Arc::new(registry()), Arc::new(RuntimeCache::new()))
}

fn json(src: &str) -> Value {
    Value::from_json_str(src).unwrap()
}

#[test]
fn test_generated_descriptor() {
    let descriptor = Person::descriptor();
    assert_eq!(descriptor.name(), "Person");
    assert_eq!(
        descriptor.properties(),
        &[
            ("name".to_string(), "string".to_string()),
            ("age".to_string(), "int".to_string()),
            ("friends".to_string(), "Person[]".to_string()),
            ("home".to_string(), "object".to_string()),
        ]
    );
    assert_eq!(descriptor.defaults().get("age"), Some(&Value::Int(0)));
    assert_eq!(Person::AGE_FIELD, "age");
    assert_eq!(Person::ADDRESS_FIELD, "home");
    assert_eq!(Employee::descriptor().parent(), Some("Person"));
}

#[test]
fn test_matching_value_is_unchanged() {
    let m = marshal();
    let p = Person::create(&m, None).unwrap();
    p.set_name("Ada").unwrap();
    p.set_age(36).unwrap();
    assert_eq!(p.name().unwrap().as_deref(), Some("Ada"));
    assert_eq!(p.age().unwrap(), 36);
}

#[test]
fn test_numeric_text_is_cast() {
    let m = marshal();
    let p = Person::create(&m, None).unwrap();
    p.set_age("12").unwrap();
    assert_eq!(p.age().unwrap(), 12);

    match p.set_age("12abc") {
        Err(Error::TypeMismatch {
            owner,
            field,
            expected,
            value,
            ..
        }) => {
            assert_eq!(owner, "Person");
            assert_eq!(field, "age");
            assert_eq!(expected, "int");
            assert_eq!(value, Value::from("12abc"));
        }
        other => panic!("expected TypeMismatch, got {:?}", other),
    }
    // Failed writes leave the field untouched
    assert_eq!(p.age().unwrap(), 12);
}

#[test]
fn test_typed_collection_builds_instances_in_key_order() {
    let m = marshal();
    let p = Person::create(
        &m,
        Some(json(
            r#"{"friends": {"0": {"name": "Grace"}, "1": {"name": "Linus", "age": "54"}}}"#,
        )),
    )
    .unwrap();

    let friends = p.friends().unwrap().unwrap();
    assert_eq!(friends.len(), 2);
    assert_eq!(friends[0].name().unwrap().as_deref(), Some("Grace"));
    assert_eq!(friends[1].name().unwrap().as_deref(), Some("Linus"));
    assert_eq!(friends[1].age().unwrap(), 54);

    let keys: Vec<String> = match p.handle().get("friends").unwrap() {
        Value::Map(entries) => entries.keys().cloned().collect(),
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(keys, vec!["0", "1"]);
}

#[test]
fn test_nested_failure_names_element() {
    let m = marshal();
    let err = Person::create(&m, Some(json(r#"{"friends": [{"age": "old"}]}"#)))
        .err()
        .unwrap();
    assert!(matches!(err, Error::TypeMismatch { ref field, .. } if field == "age"));
}

#[test]
fn test_subtype_accepted_for_parent_field() {
    let m = marshal();
    let e = Employee::create(&m, Some(json(r#"{"name": "Ada", "salary": 10}"#))).unwrap();
    assert_eq!(e.salary().unwrap(), Some(10.0));

    let p = Person::create(&m, None).unwrap();
    p.set_friends(Value::List(vec![Value::Object(e.handle().clone())]))
        .unwrap();
    assert!(Person::from_handle(e.handle().clone()).is_some());
    assert!(Employee::from_handle(p.handle().clone()).is_none());
}

#[test]
fn test_record_is_flat_copied() {
    let m = marshal();
    let p = Person::create(&m, None).unwrap();
    p.handle()
        .set("home", ObjectRef::record("Address", Default::default()))
        .unwrap();

    let home = p.handle().get("home").unwrap();
    let address = Address::from_handle(home.as_object().unwrap().clone()).unwrap();
    assert_eq!(address.type_name(), "Address");
    address.set_city("Paris").unwrap();
    assert_eq!(address.city().unwrap(), Value::from("Paris"));
}

#[test]
fn test_self_assignment_fails() {
    let m = marshal();
    let a = m.instantiate("Node", None).unwrap();
    assert!(matches!(
        a.set("child", a.clone()),
        Err(Error::CircularReference { .. })
    ));
}

#[test]
fn test_dump_of_cycle_has_one_placeholder() {
    let m = marshal();
    let a = m.instantiate("Node", Some(json(r#"{"label": "a"}"#))).unwrap();
    let b = m.instantiate("Node", Some(json(r#"{"label": "b"}"#))).unwrap();
    a.set("child", b.clone()).unwrap();
    b.set("child", a.clone()).unwrap();

    let lines = Dump::default().convert(&Value::Object(a.clone())).unwrap();
    assert_eq!(
        lines,
        vec![
            "Node (2)",
            "  label: \"a\"",
            "  child: Node (2)",
            "    label: \"b\"",
            "    child: *RECURSION* Node",
        ]
    );

    assert!(matches!(
        FlatArray::strict().convert(&Value::Object(a.clone())),
        Err(Error::CircularReference { .. })
    ));
    let flat = FlatArray::graceful().convert(&Value::Object(a.clone())).unwrap();
    assert_eq!(
        flat.to_json().unwrap(),
        serde_json::json!({"label": "a", "child": {"label": "b", "child": null}})
    );

    // Null is not a Node, so break the cycle with a fresh leaf
    b.set("child", m.instantiate("Node", None).unwrap()).unwrap();
}

#[test]
fn test_cache_export_clear_import() {
    let cache = Arc::new(RuntimeCache::new());
    let m = Marshal::with_cache(Arc::new(registry()), Arc::clone(&cache));
    Person::create(&m, None).unwrap();
    m.instantiate("Node", None).unwrap();

    let definitions = cache.definitions("Person").unwrap();
    let defaults = cache.defaults("Person").unwrap();
    let blob = cache.export().unwrap();

    cache.clear();
    assert!(cache.definitions("Person").is_none());

    cache.import(&blob).unwrap();
    assert_eq!(*cache.definitions("Person").unwrap(), *definitions);
    assert_eq!(*cache.defaults("Person").unwrap(), *defaults);
    assert!(cache.definitions("Node").is_some());

    // Warm instances behave like cold ones
    let p = Person::create(&m, Some(json(r#"{"age": "7"}"#))).unwrap();
    assert_eq!(p.age().unwrap(), 7);
}

#[test]
fn test_corrupt_snapshot_is_rejected() {
    let cache = RuntimeCache::new();
    assert!(matches!(
        cache.import(b"\x00\x01garbage"),
        Err(Error::CacheCorrupt(_))
    ));
}

#[test]
fn test_permissive_and_strict_writes() {
    let m = marshal();
    let bag = m.instantiate("Bag", None).unwrap();
    bag.set("extra", "5").unwrap();
    assert_eq!(bag.get("extra").unwrap(), Value::Int(5));

    let p = Person::create(&m, None).unwrap();
    assert!(matches!(
        p.handle().set("extra", 5),
        Err(Error::UnknownProperty { .. })
    ));
    assert!(matches!(
        p.handle().get("extra"),
        Err(Error::UnknownProperty { .. })
    ));
}

#[test]
fn test_narrow_numeric_markers() {
    let m = marshal();
    let c = Counter::create(&m, None).unwrap();
    assert_eq!(c.hits().unwrap(), 0i32);
    assert_eq!(c.ratio().unwrap(), None);
    assert_eq!(c.tally().unwrap()["a"], 1u8);

    c.set_hits("41").unwrap();
    c.set_ratio(0.5).unwrap();
    assert_eq!(c.hits().unwrap(), 41);
    assert_eq!(c.ratio().unwrap(), Some(0.5f32));

    // Declared `int` accepts it; the i32 getter cannot represent it
    c.set_hits(i64::from(i32::MAX) + 1).unwrap();
    assert!(matches!(c.hits(), Err(Error::TypeMismatch { .. })));
}
