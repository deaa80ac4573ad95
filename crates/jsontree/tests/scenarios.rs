use jsontree::{Json, JsonError, JsonKind, Number, WithOptions};
use serde_json::json;

#[test]
fn parse_keeps_key_order_and_indexes_arrays() {
    let doc = Json::parse(r#"{"a":1,"b":[1,2,3]}"#).unwrap();
    assert!(doc.is_object());
    assert_eq!(doc.keys().unwrap(), vec!["a", "b"]);
    let b = doc.get("b").unwrap().unwrap();
    assert_eq!(b.at(1).unwrap().as_integer().unwrap(), 2);
}

#[test]
fn deep_merge_versus_shallow_overwrite() {
    let patch = Json::parse(r#"{"a":{"c":2}}"#).unwrap();

    let deep = Json::parse(r#"{"a":{"b":1}}"#).unwrap();
    deep.with(&patch, &WithOptions::new().merge("")).unwrap();
    assert_eq!(deep, Json::from(json!({"a": {"b": 1, "c": 2}})));

    let shallow = Json::parse(r#"{"a":{"b":1}}"#).unwrap();
    shallow.with(&patch, &WithOptions::new()).unwrap();
    assert_eq!(shallow, Json::from(json!({"a": {"c": 2}})));
}

#[test]
fn merge_options_written_as_json() {
    let base = Json::parse(r#"{"a":{"b":1}}"#).unwrap();
    let options = WithOptions::from_json(&[Json::from("merge")]).unwrap();
    base.with(&Json::parse(r#"{"a":{"c":2}}"#).unwrap(), &options)
        .unwrap();
    assert_eq!(base.to_string(), r#"{"a":{"b":1,"c":2}}"#);
}

#[test]
fn number_literals_survive_a_round_trip() {
    let literals = [
        "0",
        "-7",
        "2147483648",
        "9223372036854775807",
        "123456789012345678901234567890",
        "-98765432109876543210",
        "0.1",
        "1.5e-7",
        "3.14159265358979323846264338327950288",
        "1e400",
    ];
    for literal in literals {
        let doc = Json::parse(literal).unwrap();
        assert_eq!(doc.to_string(), literal, "literal {literal}");
    }
    assert!(matches!(
        Json::parse("2147483648").unwrap().as_number().unwrap(),
        Number::Long(2147483648)
    ));
    assert!(matches!(
        Json::parse("123456789012345678901234567890")
            .unwrap()
            .as_number()
            .unwrap(),
        Number::BigInt(_)
    ));
    assert!(matches!(
        Json::parse("1e400").unwrap().as_number().unwrap(),
        Number::Decimal(_)
    ));
}

#[test]
fn mutation_through_handles_is_visible_everywhere() {
    let doc = Json::parse(r#"{"list":[{"n":1}]}"#).unwrap();
    let item = doc.pointer("/list/0").unwrap().unwrap();
    item.set("n", 2).unwrap();
    assert_eq!(doc.to_string(), r#"{"list":[{"n":2}]}"#);

    let list = item.up().unwrap();
    assert!(Json::ptr_eq(&list.up().unwrap(), &doc));
    list.delete_at(0).unwrap();
    assert!(item.up().is_none());
    assert_eq!(doc.to_string(), r#"{"list":[]}"#);
}

#[test]
fn errors_are_typed() {
    assert!(matches!(
        Json::parse(r#"{"a":}"#),
        Err(JsonError::MalformedInput { offset: 5, .. })
    ));
    assert!(matches!(
        Json::parse(r#"{"a":[1,2"#),
        Err(JsonError::UnexpectedEnd { .. })
    ));
    assert_eq!(
        Json::from(true).at(0).unwrap_err(),
        JsonError::TypeMismatch {
            operation: "at",
            found: JsonKind::Boolean
        }
    );
}

#[test]
fn handles_cross_threads() {
    let doc = Json::parse(r#"{"count":0}"#).unwrap();
    std::thread::scope(|scope| {
        for i in 0..4 {
            let doc = doc.clone();
            scope.spawn(move || {
                doc.set(format!("t{i}"), i).unwrap();
            });
        }
    });
    assert_eq!(doc.len().unwrap(), 5);
}
