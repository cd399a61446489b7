use cellcore::runtime::{
    cell::{Cell, Kind, MAX_INLINE_DEPTH},
    core::Core,
    error::CoreError,
};

fn samples(core: &mut Core) -> Vec<Cell> {
    vec![
        Cell::integer(42),
        Cell::blank(),
        core.text("quoted"),
        core.word("w"),
        core.block(vec![Cell::integer(1)]),
    ]
}

#[test]
fn unquote_undoes_the_matching_quote() {
    let mut core = Core::new();
    for value in samples(&mut core) {
        for d1 in 0..6 {
            for d2 in 0..6 {
                let mut expected = value.clone();
                core.quotify(&mut expected, d1).unwrap();

                let mut actual = value.clone();
                core.quotify(&mut actual, d1 + d2).unwrap();
                core.unquotify(&mut actual, d2).unwrap();

                assert_eq!(actual.kind(), expected.kind());
                assert_eq!(actual.quote_depth(), expected.quote_depth());
                assert_eq!(actual.binding(), expected.binding());
                assert!(
                    core.values_equal(&actual, &expected, true).unwrap(),
                    "{d1}+{d2} on {:?}",
                    value
                );
            }
        }
    }
}

#[test]
fn allocation_only_on_crossing_the_inline_limit() {
    let mut core = Core::new();
    let before = core.heap().total_allocations();

    let mut cell = Cell::integer(5);
    core.quotify(&mut cell, MAX_INLINE_DEPTH).unwrap();
    assert_eq!(core.heap().total_allocations(), before);

    let mut cell = Cell::integer(5);
    core.quotify(&mut cell, 4).unwrap();
    assert_eq!(core.heap().total_allocations(), before + 1);

    core.quotify(&mut cell, 5).unwrap();
    assert_eq!(cell.quote_depth(), 9);
    assert_eq!(core.heap().total_allocations(), before + 1);

    core.unquotify(&mut cell, 4).unwrap();
    assert_eq!(core.heap().total_allocations(), before + 1);
}

#[test]
fn crossing_down_and_up_again_allocates_again() {
    let mut core = Core::new();
    let before = core.heap().total_allocations();
    let mut cell = Cell::char('q');

    core.quotify(&mut cell, 4).unwrap();
    core.unquotify(&mut cell, 2).unwrap();
    assert_eq!(cell.heart(), Kind::Char);
    core.quotify(&mut cell, 2).unwrap();

    assert_eq!(core.heap().total_allocations(), before + 2);
}

#[test]
fn underflow_is_reported_for_both_forms() {
    let mut core = Core::new();
    let mut inline = Cell::integer(1);
    core.quotify(&mut inline, 2).unwrap();
    assert!(matches!(
        core.unquotify(&mut inline, 3),
        Err(CoreError::QuoteUnderflow { depth: 2, requested: 3 })
    ));

    let mut deep = Cell::integer(1);
    core.quotify(&mut deep, 7).unwrap();
    assert!(matches!(
        core.unquotify(&mut deep, 8),
        Err(CoreError::QuoteUnderflow { depth: 7, requested: 8 })
    ));
}
