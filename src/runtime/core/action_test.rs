use crate::runtime::{
    action::{ActionFlags, Details, Verb},
    cell::{Cell, CellFlags, Kind, Typeset},
    context::{KeyFlags, ParamClass},
    core::{Core, FrameBuilder, ParamSpec},
    error::{CoreError, CoreResult},
    gc::{ActionId, ContextId},
};

fn echo_native(core: &mut Core, frame: ContextId) -> CoreResult<Cell> {
    core.var_at(frame, 1)
}

/// `[a b /only c d]` as a native returning its frame values.
fn sample(core: &mut Core) -> ActionId {
    let params: Vec<ParamSpec> = [
        ("a", ParamClass::Normal),
        ("b", ParamClass::Normal),
        ("only", ParamClass::Refinement),
        ("c", ParamClass::Normal),
        ("d", ParamClass::Normal),
    ]
    .into_iter()
    .map(|(name, class)| ParamSpec::new(core.intern(name), class))
    .collect();
    core.make_native(&params, echo_native).unwrap()
}

fn spec_block(core: &mut Core, cells: Vec<Cell>) -> Cell {
    core.block(cells)
}

#[test]
fn spec_dialect_classes() {
    let mut core = Core::new();
    let mut quoted = core.word("q");
    core.quotify(&mut quoted, 1).unwrap();
    let doc = core.text("documentation");
    let local = core.tag("local");
    let cells = vec![
        doc,
        core.word("n"),
        quoted,
        core.get_word("s"),
        core.refinement("r"),
        core.word("arg"),
        core.set_word("return"),
        local,
        core.word("tmp"),
    ];
    let spec = core.new_array(cells);
    let params = core.parse_spec(spec).unwrap();

    let classes: Vec<ParamClass> = params.iter().map(|p| p.class).collect();
    assert_eq!(
        classes,
        vec![
            ParamClass::Normal,
            ParamClass::HardQuote,
            ParamClass::SoftQuote,
            ParamClass::Refinement,
            ParamClass::Normal,
            ParamClass::Return,
            ParamClass::Local,
        ]
    );
}

#[test]
fn type_block_narrows_parameter() {
    let mut core = Core::new();
    let integer = core.word("integer!");
    let skip = core.tag("skip");
    let types = core.block(vec![integer, Cell::datatype(Kind::Text), skip]);
    let cells = vec![core.word("value"), types];
    let spec = core.new_array(cells);
    let params = core.parse_spec(spec).unwrap();

    assert_eq!(params[0].types, Typeset::of(&[Kind::Integer, Kind::Text]));
    assert!(params[0].flags.contains(KeyFlags::SKIPPABLE));
}

#[test]
fn duplicate_parameters_are_rejected() {
    let mut core = Core::new();
    let cells = vec![core.word("x"), core.word("X")];
    let spec = spec_block(&mut core, cells);
    let body = core.block(vec![]);
    let err = core.make_action_from(&spec, Some(&body)).unwrap_err();
    assert!(matches!(err, CoreError::BadConstruction { .. }));
}

#[test]
fn make_action_from_other_values_fails() {
    let mut core = Core::new();
    let err = core.make_action_from(&Cell::integer(1), None).unwrap_err();
    assert!(matches!(err, CoreError::BadConstruction { .. }));
}

#[test]
fn cached_flags_follow_paramlist() {
    let mut core = Core::new();
    let mut quoted = core.word("target");
    core.quotify(&mut quoted, 1).unwrap();
    let requote = core.tag("requote");
    let ret_types = core.block(vec![requote]);
    let cells = vec![quoted, core.set_word("return"), ret_types];
    let spec = spec_block(&mut core, cells);
    let body = core.block(vec![]);
    let action = core.make_action_from(&spec, Some(&body)).unwrap();

    assert!(core.quotes_first(action).unwrap());
    assert!(core.requotes_return(action).unwrap());
    assert!(core.is_invisible(action).unwrap());
    assert!(!core.skippable_first(action).unwrap());
    assert!(!core.defers_lookback(action).unwrap());
}

#[test]
fn extra_flags_cannot_fake_cached_ones() {
    let mut core = Core::new();
    let paramlist = core.make_paramlist(&[]).unwrap();
    let action = core
        .make_action(
            paramlist,
            Details::Typechecker(Typeset::ANY_VALUE),
            ActionFlags::QUOTES_FIRST.union(ActionFlags::DEFERS_LOOKBACK),
        )
        .unwrap();

    assert!(!core.quotes_first(action).unwrap());
    assert!(core.defers_lookback(action).unwrap());
}

#[test]
fn copying_an_action_gives_new_identity() {
    let mut core = Core::new();
    let original = sample(&mut core);
    let source = Cell::action(original);
    let copy = core.make_action_from(&source, None).unwrap();

    assert_ne!(copy, original);
    assert!(std::rc::Rc::ptr_eq(
        core.heap().action(copy).unwrap().paramlist(),
        core.heap().action(original).unwrap().paramlist(),
    ));
    assert_eq!(core.underlying_of(copy).unwrap(), original);
}

#[test]
fn specialize_hides_filled_parameters() {
    let mut core = Core::new();
    let action = sample(&mut core);
    let a = core.intern("a");
    let special = core.specialize(action, &[(a, Cell::integer(10))], &[]).unwrap();

    let names: Vec<String> = core
        .params_of(special)
        .unwrap()
        .iter()
        .map(|key| core.spelling(key.spelling).to_string())
        .collect();
    assert_eq!(names, ["b", "only", "c", "d"]);

    let Details::Specialized { exemplar } = core.heap().action(special).unwrap().details().clone()
    else {
        panic!("expected a specialization");
    };
    let slot = core.heap().varlist(exemplar).unwrap().var(1).unwrap();
    assert!(slot.has_flag(CellFlags::MARKED));
    assert_eq!(core.underlying_of(special).unwrap(), action);
}

#[test]
fn specialize_type_checks_fills() {
    let mut core = Core::new();
    let action = sample(&mut core);
    let only = core.intern("only");
    let err = core
        .specialize(action, &[(only, Cell::integer(1))], &[])
        .unwrap_err();
    assert_eq!(
        err,
        CoreError::ArgumentType {
            param: "only".into(),
            found: Kind::Integer
        }
    );
}

#[test]
fn specializing_twice_folds_into_one_exemplar() {
    let mut core = Core::new();
    let action = sample(&mut core);
    let (a, b) = (core.intern("a"), core.intern("b"));
    let once = core.specialize(action, &[(a, Cell::integer(1))], &[]).unwrap();
    let twice = core.specialize(once, &[(b, Cell::integer(2))], &[]).unwrap();

    let mut builder = FrameBuilder::new(&mut core, twice).unwrap();
    let frame = builder.finish(&mut core).unwrap();
    assert_eq!(core.var_at(frame, 1).unwrap().as_integer().unwrap(), 1);
    assert_eq!(core.var_at(frame, 2).unwrap().as_integer().unwrap(), 2);

    let again = core.specialize(twice, &[(a, Cell::integer(5))], &[]);
    assert!(matches!(again, Err(CoreError::BadConstruction { .. })));
}

#[test]
fn partial_refinement_arguments_follow_normal_ones() {
    let mut core = Core::new();
    let action = sample(&mut core);
    let only = core.intern("only");
    let partial = core.specialize(action, &[], &[only]).unwrap();

    let mut builder = FrameBuilder::new(&mut core, partial).unwrap();
    for n in 1..=4 {
        builder.push_arg(&mut core, &Cell::integer(n)).unwrap();
    }
    let frame = builder.finish(&mut core).unwrap();

    assert!(core.var_at(frame, 3).unwrap().as_logic().unwrap());
    assert_eq!(core.var_at(frame, 4).unwrap().as_integer().unwrap(), 3);
    assert_eq!(core.var_at(frame, 5).unwrap().as_integer().unwrap(), 4);
}

#[test]
fn missing_and_surplus_arguments() {
    let mut core = Core::new();
    let action = sample(&mut core);

    let mut builder = FrameBuilder::new(&mut core, action).unwrap();
    builder.push_arg(&mut core, &Cell::integer(1)).unwrap();
    assert_eq!(
        builder.finish(&mut core).unwrap_err(),
        CoreError::MissingArgument { param: "b".into() }
    );

    let mut builder = FrameBuilder::new(&mut core, action).unwrap();
    builder.push_arg(&mut core, &Cell::integer(1)).unwrap();
    builder.push_arg(&mut core, &Cell::integer(2)).unwrap();
    assert_eq!(
        builder.push_arg(&mut core, &Cell::integer(3)).unwrap_err(),
        CoreError::TooManyArguments { expected: 2 }
    );
    let frame = builder.finish(&mut core).unwrap();
    assert!(!core.var_at(frame, 3).unwrap().as_logic().unwrap());
}

#[test]
fn caller_refinement_extends_positional_order() {
    let mut core = Core::new();
    let action = sample(&mut core);
    let only = core.intern("only");

    let mut builder = FrameBuilder::new(&mut core, action).unwrap();
    builder.use_refinement(&mut core, only).unwrap();
    for n in 1..=4 {
        builder.push_arg(&mut core, &Cell::integer(n)).unwrap();
    }
    let frame = builder.finish(&mut core).unwrap();
    assert_eq!(core.var_at(frame, 5).unwrap().as_integer().unwrap(), 4);
}

#[test]
fn generic_actions_dispatch_on_first_argument() {
    let mut core = Core::new();
    let length = core.make_generic(Verb::Length).unwrap();
    let ctx = core
        .object_from(&[("a", Cell::integer(1)), ("b", Cell::integer(2))])
        .unwrap();
    let target = core.context_value(ctx).unwrap();

    let mut no_eval = NoEval;
    let result = core.invoke(length, &[target], &mut no_eval).unwrap();
    assert_eq!(result.as_integer().unwrap(), 2);

    let err = core.invoke(length, &[Cell::integer(5)], &mut no_eval).unwrap_err();
    assert_eq!(
        err,
        CoreError::IllegalAction {
            verb: "length",
            kind: Kind::Integer
        }
    );
}

#[test]
fn typechecker_answers_membership() {
    let mut core = Core::new();
    let check = core.make_typechecker(Typeset::ANY_STRING).unwrap();
    let text = core.text("x");
    let mut no_eval = NoEval;

    assert!(core.invoke(check, &[text], &mut no_eval).unwrap().as_logic().unwrap());
    assert!(!core.invoke(check, &[Cell::nulled()], &mut no_eval).unwrap().as_logic().unwrap());
}

#[test]
fn invoking_a_reclaimed_action_is_detected() {
    let mut core = Core::new();
    let action = sample(&mut core);
    core.collect_garbage();

    let err = core.invoke(action, &[], &mut NoEval).unwrap_err();
    assert!(matches!(err, CoreError::Inaccessible { .. }));
}

struct NoEval;

impl crate::runtime::action::Evaluator for NoEval {
    fn eval_body(
        &mut self,
        _core: &mut Core,
        _body: crate::runtime::gc::ArrayId,
        _frame: ContextId,
    ) -> CoreResult<Cell> {
        Ok(Cell::void())
    }
}
