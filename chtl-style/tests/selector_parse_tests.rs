use chtl_style::{RuleHead, Selector, rule_head};

#[test]
fn parses_tag_class_and_id_anchors() {
    assert_eq!(
        Selector::parse("div").unwrap(),
        Selector::Tag { name: "div".into(), index: None }
    );
    assert_eq!(Selector::parse(".card").unwrap(), Selector::Class("card".into()));
    assert_eq!(Selector::parse(" #main ").unwrap(), Selector::Id("main".into()));
}

#[test]
fn parses_indexed_tag() {
    let sel = Selector::parse("span[2]").unwrap();
    assert_eq!(sel.index(), Some(2));
    assert_eq!(sel.to_string(), "span[2]");
}

#[test]
fn rebase_shifts_index_and_rejects_underflow() {
    let sel = Selector::parse("li[1]").unwrap().rebase_index(1).unwrap();
    assert_eq!(sel.index(), Some(0));
    assert!(Selector::parse("li[0]").unwrap().rebase_index(1).is_err());
    // class selectors carry no index
    assert_eq!(
        Selector::parse(".x").unwrap().rebase_index(1).unwrap(),
        Selector::Class("x".into())
    );
}

#[test]
fn rejects_compound_selectors() {
    assert!(Selector::parse("div .x").is_err());
    assert!(Selector::parse("").is_err());
    assert!(Selector::parse("div[").is_err());
}

#[test]
fn matches_on_tag_class_and_id() {
    let class = Selector::Class("hot".into());
    assert!(class.matches("span", None, Some("a hot b")));
    assert!(!class.matches("span", None, Some("hotter")));
    assert!(!class.matches("span", None, None));

    let id = Selector::Id("main".into());
    assert!(id.matches("div", Some("main"), None));
    assert!(!id.matches("div", Some("side"), None));

    let tag = Selector::parse("p[3]").unwrap();
    assert!(tag.matches("p", None, None));
}

#[test]
fn rule_head_detects_leading_compound() {
    assert_eq!(rule_head(".box:hover"), RuleHead::Class("box".into()));
    assert_eq!(rule_head("#hero > h1"), RuleHead::Id("hero".into()));
    assert_eq!(rule_head("&:hover"), RuleHead::Ampersand);
    assert_eq!(rule_head("div p"), RuleHead::Other);
}
