use crate::runtime::{
    cell::{Cell, CellFlags, Kind, Payload, Typeset},
    context::ContextKind,
    core::Core,
    error::CoreError,
};

fn abc(core: &mut Core) -> crate::runtime::gc::ContextId {
    core.object_from(&[
        ("a", Cell::integer(1)),
        ("b", Cell::integer(2)),
        ("c", Cell::integer(3)),
    ])
    .unwrap()
}

#[test]
fn repeated_name_keeps_first_slot_and_last_value() {
    let mut core = Core::new();
    let ctx = core
        .object_from(&[
            ("x", Cell::integer(1)),
            ("y", Cell::integer(2)),
            ("X", Cell::integer(3)),
        ])
        .unwrap();
    let x = core.intern("x");

    assert_eq!(core.context_len(ctx).unwrap(), 2);
    assert_eq!(core.find(ctx, x, false).unwrap(), Some(1));
    assert_eq!(core.select(ctx, x).unwrap().unwrap().as_integer().unwrap(), 3);
}

#[test]
fn construct_shares_value_between_chained_set_words() {
    let mut core = Core::new();
    let a = core.set_word("a");
    let b = core.set_word("b");
    let c = core.set_word("c");
    let spec = core.new_array(vec![a, b, Cell::integer(5), c]);
    let ctx = core.construct(ContextKind::Object, spec).unwrap();

    let (a, b, c) = (core.intern("a"), core.intern("b"), core.intern("c"));
    assert_eq!(core.select(ctx, a).unwrap().unwrap().as_integer().unwrap(), 5);
    assert_eq!(core.select(ctx, b).unwrap().unwrap().as_integer().unwrap(), 5);
    assert_eq!(core.select(ctx, c).unwrap().unwrap().kind(), Kind::Blank);
}

#[test]
fn construct_rejects_value_in_key_position() {
    let mut core = Core::new();
    let spec = core.new_array(vec![Cell::integer(1)]);
    let err = core.construct(ContextKind::Object, spec).unwrap_err();
    assert!(matches!(err, CoreError::BadConstruction { .. }));
}

#[test]
fn append_after_inherit_copies_keylist() {
    let mut core = Core::new();
    let parent = abc(&mut core);
    let empty = core.new_array(vec![]);
    let child = core.construct_with_parent(parent, empty).unwrap();
    assert!(core.shares_keylist(parent, child).unwrap());

    let d = core.intern("d");
    core.append(child, d, &Cell::integer(4)).unwrap();

    assert!(!core.shares_keylist(parent, child).unwrap());
    assert_eq!(core.find(parent, d, false).unwrap(), None);
    assert_eq!(core.context_len(parent).unwrap(), 3);
    assert_eq!(core.context_len(child).unwrap(), 4);
}

#[test]
fn append_existing_key_updates_in_place() {
    let mut core = Core::new();
    let ctx = abc(&mut core);
    let b = core.intern("B");
    let index = core.append(ctx, b, &Cell::integer(20)).unwrap();

    assert_eq!(index, 2);
    assert_eq!(core.context_len(ctx).unwrap(), 3);
    assert_eq!(core.var_at(ctx, 2).unwrap().as_integer().unwrap(), 20);
}

#[test]
fn append_to_hidden_key_fails() {
    let mut core = Core::new();
    let ctx = abc(&mut core);
    let b = core.intern("b");
    core.hide(ctx, b).unwrap();

    let err = core.append(ctx, b, &Cell::integer(9)).unwrap_err();
    assert_eq!(err, CoreError::HiddenField { name: "b".into() });
    assert_eq!(core.visible_keys(ctx).unwrap().len(), 2);
}

#[test]
fn poke_reaches_hidden_keys() {
    let mut core = Core::new();
    let ctx = abc(&mut core);
    let b = core.intern("b");
    core.hide(ctx, b).unwrap();

    core.poke(ctx, b, &Cell::integer(9)).unwrap();
    assert_eq!(core.select(ctx, b).unwrap().unwrap().as_integer().unwrap(), 9);
}

#[test]
fn protected_slot_refuses_writes() {
    let mut core = Core::new();
    let ctx = abc(&mut core);
    let a = core.intern("a");
    core.protect(ctx, a).unwrap();

    assert!(matches!(
        core.append(ctx, a, &Cell::integer(0)),
        Err(CoreError::ProtectedField { .. })
    ));
    assert!(matches!(
        core.poke(ctx, a, &Cell::integer(0)),
        Err(CoreError::ProtectedField { .. })
    ));

    core.unprotect(ctx, a).unwrap();
    core.poke(ctx, a, &Cell::integer(0)).unwrap();
}

#[test]
fn errors_name_unknown_symbols_without_panicking() {
    let mut other = Core::new();
    let foreign = (0..64)
        .map(|n| other.intern(&format!("k{n}")))
        .last()
        .unwrap();

    let mut core = Core::new();
    let ctx = abc(&mut core);
    core.append(ctx, foreign, &Cell::integer(1)).unwrap();
    core.protect(ctx, foreign).unwrap();

    let err = core.append(ctx, foreign, &Cell::integer(2)).unwrap_err();
    assert_eq!(err, CoreError::ProtectedField { name: "?".into() });

    core.unprotect(ctx, foreign).unwrap();
    core.hide(ctx, foreign).unwrap();
    let err = core.append(ctx, foreign, &Cell::integer(2)).unwrap_err();
    assert_eq!(err, CoreError::HiddenField { name: "?".into() });
}

#[test]
fn reads_do_not_carry_slot_protection() {
    let mut core = Core::new();
    let ctx = abc(&mut core);
    let a = core.intern("a");
    core.protect(ctx, a).unwrap();

    let value = core.var_at(ctx, 1).unwrap();
    assert!(!value.has_flag(CellFlags::PROTECTED));
}

#[test]
fn frames_cannot_grow() {
    let mut core = Core::new();
    let frame = core.make_context_sized(ContextKind::Frame, 0).unwrap();
    let x = core.intern("x");
    let err = core.append(frame, x, &Cell::blank()).unwrap_err();
    assert_eq!(
        err,
        CoreError::IllegalAction {
            verb: "append",
            kind: Kind::Frame
        }
    );
}

#[test]
fn shallow_copy_shares_nested_blocks() {
    let mut core = Core::new();
    let inner = core.block(vec![Cell::integer(1)]);
    let ctx = core.object_from(&[("list", inner)]).unwrap();

    let shallow = core.copy_context(ctx, Typeset::EMPTY).unwrap();
    let deep = core.copy_context(ctx, Typeset::ANY_SERIES).unwrap();

    let original = core.var_at(ctx, 1).unwrap().as_array().unwrap();
    assert_eq!(core.var_at(shallow, 1).unwrap().as_array().unwrap(), original);
    assert_ne!(core.var_at(deep, 1).unwrap().as_array().unwrap(), original);
    assert!(core.shares_keylist(ctx, deep).unwrap());
    assert!(core.equal_contexts(ctx, deep).unwrap());
}

#[test]
fn deep_copy_keeps_self_reference_shape() {
    let mut core = Core::new();
    let ctx = abc(&mut core);
    let me = core.intern("me");
    let value = core.context_value(ctx).unwrap();
    core.append(ctx, me, &value).unwrap();

    let copy = core.copy_context(ctx, Typeset::ANY_SERIES).unwrap();
    let inner = core.select(copy, me).unwrap().unwrap().as_context().unwrap();
    assert_eq!(inner, copy);
}

#[test]
fn equality_depends_on_declaration_order() {
    let mut core = Core::new();
    let ab = core
        .object_from(&[("a", Cell::integer(1)), ("b", Cell::integer(2))])
        .unwrap();
    let ba = core
        .object_from(&[("b", Cell::integer(2)), ("a", Cell::integer(1))])
        .unwrap();
    let ab_again = core
        .object_from(&[("A", Cell::integer(1)), ("b", Cell::integer(2))])
        .unwrap();

    assert!(!core.equal_contexts(ab, ba).unwrap());
    assert!(core.equal_contexts(ab, ab_again).unwrap());
}

#[test]
fn equality_skips_hidden_keys() {
    let mut core = Core::new();
    let left = abc(&mut core);
    let right = core
        .object_from(&[("a", Cell::integer(1)), ("c", Cell::integer(3))])
        .unwrap();
    let b = core.intern("b");
    assert!(!core.equal_contexts(left, right).unwrap());

    core.hide(left, b).unwrap();
    assert!(core.equal_contexts(left, right).unwrap());
}

#[test]
fn equality_terminates_on_cycles() {
    let mut core = Core::new();
    let left = abc(&mut core);
    let right = abc(&mut core);
    let me = core.intern("me");
    let left_value = core.context_value(left).unwrap();
    let right_value = core.context_value(right).unwrap();
    core.append(left, me, &left_value).unwrap();
    core.append(right, me, &right_value).unwrap();

    assert!(core.equal_contexts(left, right).unwrap());
}

#[test]
fn equality_compares_series_from_their_positions() {
    let mut core = Core::new();
    let array = core.new_array(vec![Cell::integer(1), Cell::integer(2)]);
    let tail = core.new_array(vec![Cell::integer(2)]);
    let at = |array, index| Cell::init(Kind::Block, Payload::Array { array, index }).unwrap();

    assert!(!core.values_equal(&at(array, 0), &at(array, 1), false).unwrap());
    assert!(core.values_equal(&at(array, 1), &at(tail, 0), false).unwrap());
    assert!(core.values_equal(&at(array, 5), &at(tail, 1), false).unwrap());

    let text = core.text("Hello");
    let text_id = text.as_text().unwrap();
    let ello = core.text("ELLO");
    let shifted = Cell::init(Kind::Text, Payload::Series { text: text_id, index: 1 }).unwrap();
    assert!(!core.values_equal(&text, &shifted, false).unwrap());
    assert!(core.values_equal(&shifted, &ello, false).unwrap());
    assert!(!core.values_equal(&shifted, &ello, true).unwrap());

    let head = core.object_from(&[("s", at(array, 0))]).unwrap();
    let second = core.object_from(&[("s", at(array, 1))]).unwrap();
    assert!(!core.equal_contexts(head, second).unwrap());
}

#[test]
fn reflection_lists_visible_keys_only() {
    let mut core = Core::new();
    let ctx = abc(&mut core);
    let c = core.intern("c");
    core.hide(ctx, c).unwrap();

    let words = core.words_of(ctx).unwrap();
    let values = core.values_of(ctx).unwrap();
    let body = core.body_of(ctx).unwrap();
    assert_eq!(core.array_cells(words).unwrap().len(), 2);
    assert_eq!(core.array_cells(values).unwrap().len(), 2);
    assert_eq!(core.array_cells(body).unwrap().len(), 4);

    let rebuilt = core.construct(ContextKind::Object, body).unwrap();
    assert_eq!(core.context_len(rebuilt).unwrap(), 2);
}

#[test]
fn meta_link_is_optional() {
    let mut core = Core::new();
    let ctx = abc(&mut core);
    let meta = core.object_from(&[("title", Cell::blank())]).unwrap();
    assert_eq!(core.meta_of(ctx).unwrap(), None);

    core.set_meta(ctx, Some(meta)).unwrap();
    assert_eq!(core.meta_of(ctx).unwrap(), Some(meta));
}
