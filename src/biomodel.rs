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

//! Biomechanical model capability consumed by the centre-of-mass links.

use constraint_solver::Exp;
use rs_math3d::Vec3d;
use std::fmt;

use crate::LinkError;

/// Physical computations a phase's model exposes to link functions.
///
/// Implementations build symbolic expressions over the generalized
/// coordinates `q` and velocities `qdot` they are given.
pub trait BiomechanicalModel: fmt::Debug {
    /// Centre of mass position in the global frame.
    fn center_of_mass(&self, q: &[Exp]) -> Result<[Exp; 3], LinkError>;

    /// Centre of mass velocity in the global frame.
    fn center_of_mass_velocity(&self, q: &[Exp], qdot: &[Exp]) -> Result<[Exp; 3], LinkError>;
}

/// Rigid segment of a [`PlanarChain`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub length: f64,
    pub mass: f64,
    /// Position of the segment's centre of mass along its length (0 = proximal end).
    pub com_ratio: f64,
}

impl Segment {
    pub fn new(length: f64, mass: f64, com_ratio: f64) -> Self {
        Self {
            length,
            mass,
            com_ratio,
        }
    }
}

/// Serial chain of rigid segments moving in the x-y plane.
///
/// The chain is rooted at the origin and `q[i]` is the angle of segment `i`
/// relative to segment `i - 1` (segment 0 is measured from the x axis).
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarChain {
    segments: Vec<Segment>,
}

impl PlanarChain {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn total_mass(&self) -> f64 {
        self.segments.iter().map(|segment| segment.mass).sum()
    }

    fn check_len(&self, what: &str, len: usize) -> Result<(), LinkError> {
        if len != self.segments.len() {
            return Err(LinkError::compile(
                "planar_chain",
                format!("{what} has {len} rows, the chain has {} segments", self.segments.len()),
            ));
        }
        Ok(())
    }

    /// Numeric centre of mass for concrete joint angles.
    pub fn center_of_mass_at(&self, q: &[f64]) -> Vec3d {
        let (mut x, mut y) = (0.0, 0.0);
        let (mut joint_x, mut joint_y, mut angle) = (0.0, 0.0, 0.0);
        for (segment, q_i) in self.segments.iter().zip(q) {
            angle += q_i;
            let (sin, cos) = f64::sin_cos(angle);
            x += segment.mass * (joint_x + segment.com_ratio * segment.length * cos);
            y += segment.mass * (joint_y + segment.com_ratio * segment.length * sin);
            joint_x += segment.length * cos;
            joint_y += segment.length * sin;
        }
        let mass = self.total_mass();
        Vec3d::new(x / mass, y / mass, 0.0)
    }

    /// Numeric centre of mass velocity for concrete joint angles and rates.
    pub fn center_of_mass_velocity_at(&self, q: &[f64], qdot: &[f64]) -> Vec3d {
        let (mut vx, mut vy) = (0.0, 0.0);
        let (mut joint_vx, mut joint_vy) = (0.0, 0.0);
        let (mut angle, mut rate) = (0.0, 0.0);
        for ((segment, q_i), qdot_i) in self.segments.iter().zip(q).zip(qdot) {
            angle += q_i;
            rate += qdot_i;
            let (sin, cos) = f64::sin_cos(angle);
            vx += segment.mass * (joint_vx - segment.com_ratio * segment.length * sin * rate);
            vy += segment.mass * (joint_vy + segment.com_ratio * segment.length * cos * rate);
            joint_vx -= segment.length * sin * rate;
            joint_vy += segment.length * cos * rate;
        }
        let mass = self.total_mass();
        Vec3d::new(vx / mass, vy / mass, 0.0)
    }
}

/// Running sum `acc + term`, starting from `term` when empty.
fn accumulate(acc: Option<Exp>, term: Exp) -> Option<Exp> {
    Some(match acc {
        Some(acc) => Exp::add(acc, term),
        None => term,
    })
}

impl BiomechanicalModel for PlanarChain {
    fn center_of_mass(&self, q: &[Exp]) -> Result<[Exp; 3], LinkError> {
        self.check_len("q", q.len())?;
        let inv_mass = 1.0 / self.total_mass();

        let mut angle: Option<Exp> = None;
        let (mut joint_x, mut joint_y): (Option<Exp>, Option<Exp>) = (None, None);
        let (mut x, mut y): (Option<Exp>, Option<Exp>) = (None, None);
        for (segment, q_i) in self.segments.iter().zip(q) {
            let theta = accumulate(angle.take(), q_i.clone()).unwrap_or_else(|| Exp::val(0.0));
            angle = Some(theta.clone());
            let cos = Exp::cos(theta.clone());
            let sin = Exp::sin(theta);

            // Segment centre: joint + ratio * length * (cos, sin).
            let reach = segment.com_ratio * segment.length;
            let com_x = accumulate(joint_x.clone(), Exp::mul(Exp::val(reach), cos.clone()));
            let com_y = accumulate(joint_y.clone(), Exp::mul(Exp::val(reach), sin.clone()));
            if let (Some(com_x), Some(com_y)) = (com_x, com_y) {
                x = accumulate(x.take(), Exp::mul(Exp::val(segment.mass * inv_mass), com_x));
                y = accumulate(y.take(), Exp::mul(Exp::val(segment.mass * inv_mass), com_y));
            }

            joint_x = accumulate(joint_x.take(), Exp::mul(Exp::val(segment.length), cos));
            joint_y = accumulate(joint_y.take(), Exp::mul(Exp::val(segment.length), sin));
        }

        Ok([
            x.unwrap_or_else(|| Exp::val(0.0)),
            y.unwrap_or_else(|| Exp::val(0.0)),
            Exp::val(0.0),
        ])
    }

    fn center_of_mass_velocity(&self, q: &[Exp], qdot: &[Exp]) -> Result<[Exp; 3], LinkError> {
        self.check_len("q", q.len())?;
        self.check_len("qdot", qdot.len())?;
        let inv_mass = 1.0 / self.total_mass();

        let (mut angle, mut rate): (Option<Exp>, Option<Exp>) = (None, None);
        let (mut joint_vx, mut joint_vy): (Option<Exp>, Option<Exp>) = (None, None);
        let (mut vx, mut vy): (Option<Exp>, Option<Exp>) = (None, None);
        for ((segment, q_i), qdot_i) in self.segments.iter().zip(q).zip(qdot) {
            let theta = accumulate(angle.take(), q_i.clone()).unwrap_or_else(|| Exp::val(0.0));
            let omega = accumulate(rate.take(), qdot_i.clone()).unwrap_or_else(|| Exp::val(0.0));
            angle = Some(theta.clone());
            rate = Some(omega.clone());

            // d/dt (cos, sin)(theta) = omega * (-sin, cos)(theta)
            let dcos = Exp::neg(Exp::mul(Exp::sin(theta.clone()), omega.clone()));
            let dsin = Exp::mul(Exp::cos(theta), omega);

            let reach = segment.com_ratio * segment.length;
            let com_vx = accumulate(joint_vx.clone(), Exp::mul(Exp::val(reach), dcos.clone()));
            let com_vy = accumulate(joint_vy.clone(), Exp::mul(Exp::val(reach), dsin.clone()));
            if let (Some(com_vx), Some(com_vy)) = (com_vx, com_vy) {
                vx = accumulate(vx.take(), Exp::mul(Exp::val(segment.mass * inv_mass), com_vx));
                vy = accumulate(vy.take(), Exp::mul(Exp::val(segment.mass * inv_mass), com_vy));
            }

            joint_vx = accumulate(joint_vx.take(), Exp::mul(Exp::val(segment.length), dcos));
            joint_vy = accumulate(joint_vy.take(), Exp::mul(Exp::val(segment.length), dsin));
        }

        Ok([
            vx.unwrap_or_else(|| Exp::val(0.0)),
            vy.unwrap_or_else(|| Exp::val(0.0)),
            Exp::val(0.0),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::{evaluate_exp, symbols};
    use std::collections::HashMap;

    fn two_link() -> PlanarChain {
        PlanarChain::new(vec![Segment::new(1.0, 2.0, 0.5), Segment::new(0.5, 1.0, 0.5)])
    }

    fn bind(prefix: &str, values: &[f64], env: &mut HashMap<String, f64>) {
        for (i, value) in values.iter().enumerate() {
            env.insert(format!("{prefix}_{i}"), *value);
        }
    }

    #[test]
    fn straight_chain_com_along_x() {
        let com = two_link().center_of_mass_at(&[0.0, 0.0]);
        // (2 * 0.5 + 1 * 1.25) / 3
        assert!((com.x - 0.75).abs() < 1e-12);
        assert!(com.y.abs() < 1e-12);
    }

    #[test]
    fn symbolic_com_matches_numeric() {
        let model = two_link();
        let q = symbols("q", 2);
        let com = model.center_of_mass(&q).expect("com");
        let values = [0.3, -0.8];
        let mut env = HashMap::new();
        bind("q", &values, &mut env);

        let expected = model.center_of_mass_at(&values);
        let x = evaluate_exp(&com[0], &env).expect("x");
        let y = evaluate_exp(&com[1], &env).expect("y");
        assert!((x - expected.x).abs() < 1e-12);
        assert!((y - expected.y).abs() < 1e-12);
    }

    #[test]
    fn symbolic_com_velocity_matches_finite_difference() {
        let model = two_link();
        let q = symbols("q", 2);
        let qdot = symbols("qdot", 2);
        let com_dot = model.center_of_mass_velocity(&q, &qdot).expect("com velocity");

        let q_values = [0.4, 0.2];
        let qdot_values = [1.5, -0.5];
        let mut env = HashMap::new();
        bind("q", &q_values, &mut env);
        bind("qdot", &qdot_values, &mut env);

        let h = 1e-6;
        let ahead: Vec<f64> = q_values
            .iter()
            .zip(&qdot_values)
            .map(|(q, v)| q + h * v)
            .collect();
        let before = model.center_of_mass_at(&q_values);
        let after = model.center_of_mass_at(&ahead);
        let fd_x = (after.x - before.x) / h;

        let vx = evaluate_exp(&com_dot[0], &env).expect("vx");
        assert!((vx - fd_x).abs() < 1e-4);
        let numeric = model.center_of_mass_velocity_at(&q_values, &qdot_values);
        assert!((vx - numeric.x).abs() < 1e-12);
    }

    #[test]
    fn rejects_wrong_coordinate_count() {
        let q = symbols("q", 3);
        assert!(two_link().center_of_mass(&q).is_err());
    }
}
