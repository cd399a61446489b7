#![allow(dead_code)]

use cellcore::runtime::{
    action::Evaluator,
    cell::Cell,
    context::VarRef,
    core::Core,
    error::CoreResult,
    gc::{ActionId, ArrayId, ContextId},
};

/// `func [<params>] [<first param>]`, returning its first argument.
pub fn first_param_fn(core: &mut Core, params: &[&str]) -> ActionId {
    let spec: Vec<Cell> = params.iter().map(|name| core.word(name)).collect();
    let spec = core.block(spec);
    let body = vec![core.word(params[0])];
    let body = core.block(body);
    core.make_action_from(&spec, Some(&body))
        .expect("action from spec block")
}

/// Minimal evaluator: a body's value is the value of its first word.
///
/// While `recurse` is above zero the body first calls `action` again with
/// `recurse` as its argument, so frames of the same action nest.
#[derive(Default)]
pub struct FirstWord {
    pub action: Option<ActionId>,
    pub recurse: i64,
    pub resolved: Vec<VarRef>,
    pub frames: Vec<ContextId>,
}

impl Evaluator for FirstWord {
    fn eval_body(&mut self, core: &mut Core, body: ArrayId, frame: ContextId) -> CoreResult<Cell> {
        self.frames.push(frame);
        if let (Some(action), true) = (self.action, self.recurse > 0) {
            self.recurse -= 1;
            let arg = Cell::integer(self.recurse);
            core.invoke(action, &[arg], self)?;
        }
        let word = core.array_cells(body)?[0].clone();
        let var = core.resolve(&word, Some(frame))?;
        self.resolved.push(var);
        core.get_var(var)
    }
}
