use crate::runtime::{
    cell::{Binding, Cell, Kind, MAX_INLINE_DEPTH, Payload},
    core::Core,
    error::CoreError,
};

#[test]
fn shallow_quotes_stay_in_header() {
    let mut core = Core::new();
    let mut cell = Cell::integer(7);
    core.quotify(&mut cell, 2).unwrap();

    assert_eq!(cell.kind(), Kind::Quoted);
    assert_eq!(cell.heart(), Kind::Integer);
    assert_eq!(cell.quote_depth(), 2);
    assert_eq!(core.heap().live_count(), 0);
}

#[test]
fn deep_quotes_use_one_indirection() {
    let mut core = Core::new();
    let mut cell = Cell::integer(7);
    core.quotify(&mut cell, MAX_INLINE_DEPTH + 1).unwrap();
    assert_eq!(cell.heart(), Kind::Quoted);
    assert_eq!(core.heap().live_count(), 1);

    core.quotify(&mut cell, 10).unwrap();
    assert_eq!(cell.quote_depth(), MAX_INLINE_DEPTH + 11);
    assert_eq!(core.heap().live_count(), 1);
    assert_eq!(core.unquoted_kind(&cell).unwrap(), Kind::Integer);
}

#[test]
fn unquote_returns_to_inline_form() {
    let mut core = Core::new();
    let mut cell = Cell::integer(7);
    core.quotify(&mut cell, 6).unwrap();
    core.unquotify(&mut cell, 4).unwrap();

    assert_eq!(cell.heart(), Kind::Integer);
    assert_eq!(cell.quote_depth(), 2);
    assert_eq!(*cell.payload(), Payload::Integer(7));
}

#[test]
fn dequotify_reports_depth() {
    let mut core = Core::new();
    let mut cell = Cell::logic(true);
    core.quotify(&mut cell, 9).unwrap();
    assert_eq!(core.dequotify(&mut cell).unwrap(), 9);
    assert!(cell.as_logic().unwrap());
}

#[test]
fn unquote_past_zero_is_an_error() {
    let mut core = Core::new();
    let mut cell = Cell::integer(1);
    core.quotify(&mut cell, 1).unwrap();
    let err = core.unquotify(&mut cell, 2).unwrap_err();
    assert_eq!(
        err,
        CoreError::QuoteUnderflow {
            depth: 1,
            requested: 2
        }
    );
}

#[test]
fn quoting_past_the_depth_counter_fails_unchanged() {
    let mut core = Core::new();
    let mut cell = Cell::integer(7);
    core.quotify(&mut cell, u32::MAX - 1).unwrap();

    let err = core.quotify(&mut cell, 2).unwrap_err();
    assert!(matches!(err, CoreError::BadConstruction { .. }));
    assert_eq!(cell.quote_depth(), u32::MAX - 1);

    core.quotify(&mut cell, 1).unwrap();
    assert_eq!(core.dequotify(&mut cell).unwrap(), u32::MAX);
    assert_eq!(cell.as_integer().unwrap(), 7);
}

#[test]
fn deep_quoted_inert_value_is_unbound() {
    let mut core = Core::new();
    let mut cell = Cell::integer(3);
    core.quotify(&mut cell, 5).unwrap();
    assert_eq!(cell.binding(), Binding::Unbound);
}

#[test]
fn deep_quoted_word_keeps_outer_binding() {
    let mut core = Core::new();
    let ctx = core
        .object_from(&[("a", Cell::integer(1)), ("b", Cell::integer(2))])
        .unwrap();
    let b = core.intern("b");
    let mut word = Cell::word(b);
    word.bind_specific(ctx, 2);

    core.quotify(&mut word, 5).unwrap();
    assert_eq!(word.binding(), Binding::Specific(ctx));

    core.unquotify(&mut word, 5).unwrap();
    assert_eq!(word.kind(), Kind::Word);
    assert_eq!(word.word_index().unwrap(), 2);
    assert_eq!(word.binding(), Binding::Specific(ctx));
}

#[test]
fn unescaped_leaves_original_alone() {
    let mut core = Core::new();
    let mut cell = Cell::decimal(1.5);
    core.quotify(&mut cell, 4).unwrap();
    let plain = core.unescaped(&cell).unwrap();

    assert_eq!(plain.as_decimal().unwrap(), 1.5);
    assert_eq!(core.quoted_depth(&cell), 4);
}
