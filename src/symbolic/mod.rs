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

//! Vector helpers over scalar `constraint_solver::Exp` trees.
//!
//! A residual is an ordered vector of scalar expressions. These helpers keep
//! the element-wise arithmetic, substitution and numeric evaluation used by
//! the link functions in one place.

mod function;

pub use function::CompiledFunction;

use constraint_solver::Exp;
use std::collections::{BTreeSet, HashMap};

/// Returns `n` zero rows.
pub fn zeros(n: usize) -> Vec<Exp> {
    (0..n).map(|_| Exp::val(0.0)).collect()
}

/// Returns a vector of fresh symbols named `<prefix>_<i>`.
pub fn symbols(prefix: &str, n: usize) -> Vec<Exp> {
    (0..n).map(|i| Exp::var(format!("{prefix}_{i}"))).collect()
}

/// Element-wise `a + b`. Callers check lengths beforehand.
pub fn add(a: &[Exp], b: &[Exp]) -> Vec<Exp> {
    a.iter()
        .zip(b)
        .map(|(l, r)| Exp::add(l.clone(), r.clone()))
        .collect()
}

/// Element-wise `a - b`. Callers check lengths beforehand.
pub fn sub(a: &[Exp], b: &[Exp]) -> Vec<Exp> {
    a.iter()
        .zip(b)
        .map(|(l, r)| Exp::sub(l.clone(), r.clone()))
        .collect()
}

/// Name of a bare symbol, `None` for any compound expression.
pub fn symbol_name(exp: &Exp) -> Option<&str> {
    match exp {
        Exp::Var(name) => Some(name.as_str()),
        _ => None,
    }
}

/// Evaluates an expression against known values.
///
/// Returns `None` when a referenced variable is unbound.
pub fn evaluate_exp(exp: &Exp, env: &HashMap<String, f64>) -> Option<f64> {
    match exp {
        Exp::Val(v) => Some(*v),
        Exp::Var(name) => env.get(name).copied(),
        Exp::Add(l, r) => Some(evaluate_exp(l, env)? + evaluate_exp(r, env)?),
        Exp::Sub(l, r) => Some(evaluate_exp(l, env)? - evaluate_exp(r, env)?),
        Exp::Mul(l, r) => Some(evaluate_exp(l, env)? * evaluate_exp(r, env)?),
        Exp::Div(l, r) => Some(evaluate_exp(l, env)? / evaluate_exp(r, env)?),
        Exp::Power(base, power) => Some(evaluate_exp(base, env)?.powf(*power)),
        Exp::Neg(v) => Some(-evaluate_exp(v, env)?),
        Exp::Sin(v) => Some(evaluate_exp(v, env)?.sin()),
        Exp::Cos(v) => Some(evaluate_exp(v, env)?.cos()),
        Exp::Ln(v) => Some(evaluate_exp(v, env)?.ln()),
        Exp::Exp(v) => Some(evaluate_exp(v, env)?.exp()),
    }
}

/// Evaluates every row, failing as a whole on the first unbound variable.
pub fn evaluate_all(exps: &[Exp], env: &HashMap<String, f64>) -> Option<Vec<f64>> {
    exps.iter().map(|exp| evaluate_exp(exp, env)).collect()
}

/// Collects variable names referenced in an expression.
pub fn collect_var_names(exp: &Exp, out: &mut BTreeSet<String>) {
    match exp {
        Exp::Val(_) => {}
        Exp::Var(name) => {
            out.insert(name.clone());
        }
        Exp::Add(l, r) | Exp::Sub(l, r) | Exp::Mul(l, r) | Exp::Div(l, r) => {
            collect_var_names(l, out);
            collect_var_names(r, out);
        }
        Exp::Power(base, _)
        | Exp::Neg(base)
        | Exp::Sin(base)
        | Exp::Cos(base)
        | Exp::Ln(base)
        | Exp::Exp(base) => {
            collect_var_names(base, out);
        }
    }
}

/// Rebuilds `exp` with every bound variable replaced by its expression.
pub fn substitute(exp: &Exp, bindings: &HashMap<String, Exp>) -> Exp {
    match exp {
        Exp::Val(v) => Exp::val(*v),
        Exp::Var(name) => match bindings.get(name) {
            Some(replacement) => replacement.clone(),
            None => Exp::var(name.clone()),
        },
        Exp::Add(l, r) => Exp::add(substitute(l, bindings), substitute(r, bindings)),
        Exp::Sub(l, r) => Exp::sub(substitute(l, bindings), substitute(r, bindings)),
        Exp::Mul(l, r) => Exp::mul(substitute(l, bindings), substitute(r, bindings)),
        Exp::Div(l, r) => Exp::div(substitute(l, bindings), substitute(r, bindings)),
        Exp::Power(base, power) => Exp::power(substitute(base, bindings), *power),
        Exp::Neg(v) => Exp::neg(substitute(v, bindings)),
        Exp::Sin(v) => Exp::sin(substitute(v, bindings)),
        Exp::Cos(v) => Exp::cos(substitute(v, bindings)),
        Exp::Ln(v) => Exp::ln(substitute(v, bindings)),
        Exp::Exp(v) => Exp::exp(substitute(v, bindings)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_difference_of_symbols() {
        let a = symbols("a", 2);
        let b = symbols("b", 2);
        let diff = sub(&a, &b);
        let env: HashMap<String, f64> = [("a_0", 3.0), ("a_1", 1.0), ("b_0", 1.0), ("b_1", 1.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(evaluate_all(&diff, &env), Some(vec![2.0, 0.0]));
    }

    #[test]
    fn unbound_variable_yields_none() {
        let exp = Exp::add(Exp::var("x".to_string()), Exp::val(1.0));
        assert_eq!(evaluate_exp(&exp, &HashMap::new()), None);
    }

    #[test]
    fn substitution_replaces_only_bound_names() {
        let exp = Exp::mul(Exp::var("x".to_string()), Exp::var("y".to_string()));
        let mut bindings = HashMap::new();
        bindings.insert("x".to_string(), Exp::val(4.0));
        let replaced = substitute(&exp, &bindings);

        let mut names = BTreeSet::new();
        collect_var_names(&replaced, &mut names);
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["y".to_string()]);

        let env: HashMap<String, f64> = [("y".to_string(), 0.5)].into_iter().collect();
        assert_eq!(evaluate_exp(&replaced, &env), Some(2.0));
    }

    #[test]
    fn zeros_evaluate_without_environment() {
        assert_eq!(evaluate_all(&zeros(3), &HashMap::new()), Some(vec![0.0; 3]));
    }
}
