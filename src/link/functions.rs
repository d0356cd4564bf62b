/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Built-in link semantics and the custom-function passthrough.

use constraint_solver::Exp;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::Link;
use crate::controller::ControllerView;
use crate::program::time_parameter_name;
use crate::symbolic::{add, sub, symbols, zeros};
use crate::LinkError;

/// Named scalars forwarded to custom link functions.
pub type ExtraParams = BTreeMap<String, f64>;

/// User residual function: `(link, controllers, extra params) -> residual rows`.
pub type CustomLinkFn =
    Rc<dyn Fn(&Link, &[&dyn ControllerView], &ExtraParams) -> Result<Vec<Exp>, LinkError>>;

/// Residual semantics of a link.
#[derive(Clone)]
pub enum LinkFunction {
    /// `Σ (to_second(x_0) - to_first(x_i))` over the link's state key.
    StatesEquality,
    /// `Σ (u_0 - u_i)` over the link's control key. No mapping is applied.
    ControlsEquality,
    /// Centre of mass of the first node equals the one of the second.
    ComEquality,
    /// Centre of mass velocity of the first node equals the one of the second.
    ComVelocityEquality,
    /// Both phases last the same time.
    TimeEquality,
    /// User residual function.
    Custom(CustomLinkFn),
    /// Function of another penalty category kept under its own name.
    Tagged { name: String, function: CustomLinkFn },
}

impl LinkFunction {
    pub fn name(&self) -> &str {
        match self {
            LinkFunction::StatesEquality => "states_equality",
            LinkFunction::ControlsEquality => "controls_equality",
            LinkFunction::ComEquality => "com_equality",
            LinkFunction::ComVelocityEquality => "com_velocity_equality",
            LinkFunction::TimeEquality => "time_equality",
            LinkFunction::Custom(_) => "custom",
            LinkFunction::Tagged { name, .. } => name,
        }
    }

    /// Realizes the residual of `link` over `controllers`.
    ///
    /// Every function first assigns occurrence indices to the controllers.
    pub fn realize<C: ControllerView>(
        &self,
        link: &Link,
        controllers: &mut [C],
    ) -> Result<Vec<Exp>, LinkError> {
        prepare_controller_cx(controllers);
        match self {
            LinkFunction::StatesEquality => states_equality(link, controllers),
            LinkFunction::ControlsEquality => controls_equality(link, controllers),
            LinkFunction::ComEquality => com_equality(link, controllers, CenterOfMass::Position),
            LinkFunction::ComVelocityEquality => {
                com_equality(link, controllers, CenterOfMass::Velocity)
            }
            LinkFunction::TimeEquality => time_equality(controllers),
            LinkFunction::Custom(function) | LinkFunction::Tagged { function, .. } => {
                let views: Vec<&dyn ControllerView> = controllers
                    .iter()
                    .map(|controller| controller as &dyn ControllerView)
                    .collect();
                function(link, views.as_slice(), link.extra_params())
            }
        }
    }
}

impl fmt::Debug for LinkFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkFunction::Custom(_) => write!(f, "Custom(..)"),
            LinkFunction::Tagged { name, .. } => write!(f, "Tagged({name})"),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Sets each controller's occurrence index to the number of earlier
/// controllers of the same call sharing its phase.
pub fn prepare_controller_cx<C: ControllerView>(controllers: &mut [C]) {
    let mut seen_phases = Vec::with_capacity(controllers.len());
    for controller in controllers.iter_mut() {
        let phase = controller.phase_idx();
        let occurrence = seen_phases.iter().filter(|&&seen| seen == phase).count();
        controller.set_occurrence(occurrence);
        seen_phases.push(phase);
    }
}

fn expect_two<'c, C>(function: &str, controllers: &'c [C]) -> Result<(&'c C, &'c C), LinkError> {
    match controllers {
        [pre, post] => Ok((pre, post)),
        _ => Err(LinkError::ControllerCount {
            function: function.to_string(),
            expected: 2,
            actual: controllers.len(),
        }),
    }
}

fn expect_at_least_two<C>(function: &str, controllers: &[C]) -> Result<(), LinkError> {
    if controllers.len() < 2 {
        return Err(LinkError::ControllerCount {
            function: function.to_string(),
            expected: 2,
            actual: controllers.len(),
        });
    }
    Ok(())
}

/// Sums `first - other` over every controller after the first.
fn accumulate_differences(
    function: &str,
    first: &[Exp],
    others: impl Iterator<Item = Result<Vec<Exp>, LinkError>>,
) -> Result<Vec<Exp>, LinkError> {
    let mut out = zeros(first.len());
    for (idx, other) in others.enumerate() {
        let other = other?;
        if other.len() != first.len() {
            return Err(LinkError::ShapeMismatch {
                function: function.to_string(),
                first: first.len(),
                other: other.len(),
                position: idx + 1,
            });
        }
        out = add(&out, &sub(first, &other));
    }
    Ok(out)
}

fn states_equality<C: ControllerView>(link: &Link, controllers: &[C]) -> Result<Vec<Exp>, LinkError> {
    const NAME: &str = "states_equality";
    expect_at_least_two(NAME, controllers)?;
    let key = link.variable_key();
    let mapping = link.states_mapping();

    let states_0 = mapping.to_second.map(&controllers[0].states().get(key)?)?;
    let others = controllers[1..]
        .iter()
        .map(|controller| mapping.to_first.map(&controller.states().get(key)?));
    accumulate_differences(NAME, &states_0, others)
}

fn controls_equality<C: ControllerView>(
    link: &Link,
    controllers: &[C],
) -> Result<Vec<Exp>, LinkError> {
    const NAME: &str = "controls_equality";
    expect_at_least_two(NAME, controllers)?;
    let key = link.variable_key();

    let controls_0 = controllers[0].controls().get(key)?;
    let others = controllers[1..]
        .iter()
        .map(|controller| controller.controls().get(key));
    accumulate_differences(NAME, &controls_0, others)
}

#[derive(Debug, Clone, Copy)]
enum CenterOfMass {
    Position,
    Velocity,
}

impl CenterOfMass {
    fn function_name(self) -> &'static str {
        match self {
            CenterOfMass::Position => "com_equality",
            CenterOfMass::Velocity => "com_velocity_equality",
        }
    }
}

/// Slices block `key` of `pre`'s layout out of its mapped state vector.
fn mapped_block<'s>(
    function: &str,
    mapped: &'s [Exp],
    controller: &impl ControllerView,
    key: &str,
) -> Result<&'s [Exp], LinkError> {
    let range = controller.states().index(key)?;
    let end = range.end;
    mapped.get(range).ok_or_else(|| LinkError::ShapeMismatch {
        function: function.to_string(),
        first: end,
        other: mapped.len(),
        position: 0,
    })
}

fn com_equality<C: ControllerView>(
    link: &Link,
    controllers: &[C],
    quantity: CenterOfMass,
) -> Result<Vec<Exp>, LinkError> {
    let name = quantity.function_name();
    let (pre, post) = expect_two(name, controllers)?;
    let mapping = link.states_mapping();

    let pre_states = pre.states();
    let post_states = post.states();
    let pre_raw = pre_states.all();
    let post_raw = post_states.all();
    let states_pre = mapping.to_second.map(&pre_raw)?;
    let states_post = mapping.to_first.map(&post_raw)?;
    if states_pre.len() != states_post.len() {
        return Err(LinkError::ShapeMismatch {
            function: name.to_string(),
            first: states_pre.len(),
            other: states_post.len(),
            position: 1,
        });
    }

    // The model is evaluated on placeholders standing for post's layout, the
    // compiled function is then called on post's actual node symbols.
    let post_placeholders: Vec<(String, Vec<Exp>)> = post_states
        .blocks()
        .iter()
        .map(|(block, cx)| (block.clone(), symbols(&format!("{name}_{block}"), cx.len())))
        .collect();
    let post_sym: Vec<Exp> = post_placeholders
        .iter()
        .flat_map(|(_, cx)| cx.iter().cloned())
        .collect();
    let placeholder = |key: &str| {
        post_placeholders
            .iter()
            .find(|(block, _)| block == key)
            .map(|(_, cx)| cx.as_slice())
            .ok_or_else(|| LinkError::UnknownVariable {
                phase: post.phase_idx(),
                key: key.to_string(),
            })
    };

    let pre_q = mapped_block(name, &states_pre, pre, "q")?;
    let post_q = placeholder("q")?;
    let (pre_value, post_value) = match quantity {
        CenterOfMass::Position => (
            pre.model()?.center_of_mass(pre_q)?,
            post.model()?.center_of_mass(post_q)?,
        ),
        CenterOfMass::Velocity => {
            let pre_qdot = mapped_block(name, &states_pre, pre, "qdot")?;
            let post_qdot = placeholder("qdot")?;
            (
                pre.model()?.center_of_mass_velocity(pre_q, pre_qdot)?,
                post.model()?.center_of_mass_velocity(post_q, post_qdot)?,
            )
        }
    };

    let difference = sub(&pre_value, &post_value);
    let function = pre.compile(name, difference, &[&pre_raw, &post_sym])?;
    function.call(&[&pre_raw, &post_raw])
}

fn time_equality<C: ControllerView>(controllers: &[C]) -> Result<Vec<Exp>, LinkError> {
    let (pre, post) = expect_two("time_equality", controllers)?;
    let time_of = |controller: &C, role: &'static str| {
        let phase = controller.phase_idx();
        let wanted = time_parameter_name(phase);
        controller
            .parameters()
            .into_iter()
            .find(|parameter| parameter.name == wanted)
            .map(|parameter| parameter.cx)
            .ok_or(LinkError::MissingTimeParameter { phase, role })
    };
    let time_pre = time_of(pre, "first")?;
    let time_post = time_of(post, "second")?;
    Ok(vec![Exp::sub(time_pre, time_post)])
}
