use crate::runtime::{
    action::Evaluator,
    cell::{Binding, Cell, Kind},
    core::{Core, FrameBuilder},
    error::{CoreError, CoreResult},
    gc::{ActionId, ArrayId, ContextId},
};

/// Evaluates a body by returning the value of its first word, optionally
/// calling another action first.
#[derive(Default)]
struct Recorder {
    frames: Vec<ContextId>,
    parents: Vec<Option<ContextId>>,
    nested: Option<ActionId>,
    foreign: Option<ArrayId>,
}

impl Evaluator for Recorder {
    fn eval_body(&mut self, core: &mut Core, body: ArrayId, frame: ContextId) -> CoreResult<Cell> {
        self.frames.push(frame);
        let parent = core.frame_parent(frame)?;
        self.parents.push(parent);
        if let Some(inner) = self.nested.take() {
            core.invoke(inner, &[Cell::integer(2)], self)?;
        }
        let source = self.foreign.unwrap_or(body);
        let word = core.array_cells(source)?[0].clone();
        core.word_value(&word, Some(frame))
    }
}

/// `func [x] [x [x y]]`
fn identity(core: &mut Core) -> ActionId {
    let spec = vec![core.word("x")];
    let spec = core.block(spec);
    let nested = vec![core.word("x"), core.word("y")];
    let nested = core.block(nested);
    let body = vec![core.word("x"), nested];
    let body = core.block(body);
    core.make_action_from(&spec, Some(&body)).unwrap()
}

fn body_of(core: &Core, action: ActionId) -> ArrayId {
    match core.heap().action(action).unwrap().details() {
        crate::runtime::action::Details::Interpreted { body } => *body,
        other => panic!("not interpreted: {other:?}"),
    }
}

#[test]
fn relativize_binds_params_and_nested_arrays() {
    let mut core = Core::new();
    let action = identity(&mut core);
    let body = body_of(&core, action);
    let cells = core.array_cells(body).unwrap().to_vec();

    assert_eq!(cells[0].binding(), Binding::Relative(action));
    assert_eq!(cells[0].word_index().unwrap(), 1);
    assert_eq!(cells[1].binding(), Binding::Relative(action));

    let nested = core.array_cells(cells[1].as_array().unwrap()).unwrap();
    assert_eq!(nested[0].binding(), Binding::Relative(action));
    assert_eq!(nested[1].binding(), Binding::Unbound);
}

#[test]
fn relativize_is_done_once_per_body() {
    let mut core = Core::new();
    let first = identity(&mut core);
    let second = identity(&mut core);
    let body = body_of(&core, first);

    core.relativize(body, first).unwrap();
    assert!(matches!(
        core.relativize(body, second),
        Err(CoreError::BindingMismatch { .. })
    ));
}

#[test]
fn caller_block_is_left_unbound() {
    let mut core = Core::new();
    let spec = vec![core.word("x")];
    let spec = core.block(spec);
    let body = vec![core.word("x")];
    let body = core.block(body);
    core.make_action_from(&spec, Some(&body)).unwrap();

    let original = core.array_cells(body.as_array().unwrap()).unwrap();
    assert_eq!(original[0].binding(), Binding::Unbound);
}

#[test]
fn relative_word_resolves_in_running_frame() {
    let mut core = Core::new();
    let action = identity(&mut core);
    let mut eval = Recorder::default();

    let result = core.invoke(action, &[Cell::integer(42)], &mut eval).unwrap();
    assert_eq!(result.as_integer().unwrap(), 42);
    assert_eq!(core.frame_depth(), 0);
}

#[test]
fn expired_frame_no_longer_resolves() {
    let mut core = Core::new();
    let action = identity(&mut core);
    let mut eval = Recorder::default();
    core.invoke(action, &[Cell::integer(1)], &mut eval).unwrap();

    let frame = eval.frames[0];
    let body = body_of(&core, action);
    let word = core.array_cells(body).unwrap()[0].clone();
    assert_eq!(
        core.resolve(&word, Some(frame)).unwrap_err(),
        CoreError::FrameExpired
    );
    assert_eq!(
        core.derelativize(&word, Some(frame)).unwrap_err(),
        CoreError::FrameExpired
    );
}

#[test]
fn frame_of_another_action_is_rejected() {
    let mut core = Core::new();
    let first = identity(&mut core);
    let second = identity(&mut core);
    let mut eval = Recorder {
        foreign: Some(body_of(&core, first)),
        ..Recorder::default()
    };

    let err = core.invoke(second, &[Cell::integer(1)], &mut eval).unwrap_err();
    assert!(matches!(err, CoreError::BindingMismatch { .. }));
}

#[test]
fn specialization_runs_with_the_same_body_binding() {
    let mut core = Core::new();
    let action = identity(&mut core);
    let x = core.intern("x");
    let special = core.specialize(action, &[(x, Cell::integer(7))], &[]).unwrap();

    let mut eval = Recorder::default();
    let result = core.invoke(special, &[], &mut eval).unwrap();
    assert_eq!(result.as_integer().unwrap(), 7);
}

#[test]
fn unpushed_frame_is_not_a_specifier() {
    let mut core = Core::new();
    let action = identity(&mut core);
    let body = body_of(&core, action);
    let word = core.array_cells(body).unwrap()[0].clone();

    let mut builder = FrameBuilder::new(&mut core, action).unwrap();
    builder.push_arg(&mut core, &Cell::integer(3)).unwrap();
    let frame = builder.finish(&mut core).unwrap();

    // A frame that was built but never pushed is not running.
    assert_eq!(
        core.derelativize(&word, Some(frame)).unwrap_err(),
        CoreError::FrameExpired
    );
    assert!(matches!(
        core.resolve(&word, None),
        Err(CoreError::BindingMismatch { .. })
    ));
}

#[test]
fn unbound_word_does_not_resolve() {
    let mut core = Core::new();
    let word = core.word("free").into_relative();
    assert_eq!(
        core.resolve(&word, None).unwrap_err(),
        CoreError::NotBound {
            name: "free".into()
        }
    );
}

#[test]
fn bind_deep_reaches_nested_blocks() {
    let mut core = Core::new();
    let ctx = core
        .object_from(&[("a", Cell::integer(1)), ("b", Cell::integer(2))])
        .unwrap();
    let inner = vec![core.word("b")];
    let inner = core.block(inner);
    let cells = vec![core.word("a"), inner, core.word("c")];
    let array = core.new_array(cells);

    assert_eq!(core.bind_deep(array, ctx).unwrap(), 2);
    let first = core.array_cells(array).unwrap()[0].clone();
    assert_eq!(core.word_value(&first, None).unwrap().as_integer().unwrap(), 1);

    let var = core.resolve(&first, None).unwrap();
    core.set_var(var, &Cell::integer(10)).unwrap();
    assert_eq!(core.get_var(var).unwrap().as_integer().unwrap(), 10);
}

#[test]
fn bind_deep_sees_through_quote_levels() {
    let mut core = Core::new();
    let ctx = core
        .object_from(&[("w", Cell::integer(0)), ("x", Cell::integer(7))])
        .unwrap();
    let mut once = core.word("x");
    core.quotify(&mut once, 1).unwrap();
    let mut deep = core.word("X");
    core.quotify(&mut deep, 5).unwrap();
    let array = core.new_array(vec![once, deep]);

    assert_eq!(core.bind_deep(array, ctx).unwrap(), 2);
    for cell in core.array_cells(array).unwrap().to_vec() {
        assert_eq!(cell.binding(), Binding::Specific(ctx));
        let mut plain = cell.clone();
        core.dequotify(&mut plain).unwrap();
        assert_eq!(core.word_value(&plain, None).unwrap().as_integer().unwrap(), 7);
    }
}

#[test]
fn nested_frames_report_parent() {
    let mut core = Core::new();
    let outer = identity(&mut core);
    let inner = identity(&mut core);
    let mut eval = Recorder {
        nested: Some(inner),
        ..Recorder::default()
    };

    core.invoke(outer, &[Cell::integer(1)], &mut eval).unwrap();
    assert_eq!(eval.parents, vec![None, Some(eval.frames[0])]);
}

#[test]
fn expired_frame_reflection() {
    let mut core = Core::new();
    let action = identity(&mut core);
    let name = core.intern("identity");

    let mut builder = FrameBuilder::new(&mut core, action).unwrap();
    builder.push_arg(&mut core, &Cell::integer(1)).unwrap();
    builder.label(&mut core, name).unwrap();
    let frame = builder.frame();
    assert_eq!(core.frame_label(frame).unwrap(), Some(name));

    core.invoke_frame(builder, &mut Recorder::default()).unwrap();
    assert_eq!(core.frame_label(frame).unwrap(), None);
    assert_eq!(core.frame_parent(frame).unwrap(), None);
    assert_eq!(core.frame_action(frame).unwrap(), Some(action));
    assert_eq!(core.context_kind(frame).unwrap().kind(), Kind::Frame);
}
