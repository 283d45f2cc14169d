use chtl_style::{expand_ampersand, merge_declarations, parse_declarations, serialize_declarations};

#[test]
fn parses_inline_declarations_in_order() {
    let decls = parse_declarations("color: red; font-size: 12px ;; bogus");
    assert_eq!(
        decls,
        vec![
            ("color".to_string(), "red".to_string()),
            ("font-size".to_string(), "12px".to_string()),
        ]
    );
}

#[test]
fn serializes_with_single_spaces() {
    let decls = vec![("color".to_string(), "red".to_string())];
    assert_eq!(serialize_declarations(&decls), "color: red;");
    assert_eq!(serialize_declarations(&[]), "");
}

#[test]
fn merge_keeps_order_and_overrides_in_place() {
    let new = vec![
        ("color".to_string(), "blue".to_string()),
        ("margin".to_string(), "0".to_string()),
    ];
    let merged = merge_declarations(Some("color: red; width: 10px;"), &new);
    assert_eq!(merged, "color: blue; width: 10px; margin: 0;");
}

#[test]
fn merge_without_existing_attribute() {
    let new = vec![("color".to_string(), "red".to_string())];
    assert_eq!(merge_declarations(None, &new), "color: red;");
}

#[test]
fn ampersand_is_replaced_by_owner() {
    assert_eq!(expand_ampersand("&:hover", ".btn"), ".btn:hover");
    assert_eq!(expand_ampersand(" & > span ", "#x"), "#x > span");
}
