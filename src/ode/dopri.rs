//! Dormand–Prince 4(5) integration onto a caller-supplied time grid.
//!
//! The step-size controller runs freely between grid points; a step is only
//! shortened when it would overshoot the next requested time, so every output
//! sample is an exact step endpoint (no interpolation).

use super::{OdeError, OdeOptions, OdeSystem, Trajectory};

// Dormand–Prince coefficients
const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 5th-order weights (advancing solution)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// 4th-order embedded weights (error estimate)
const BS1: f64 = 5179.0 / 57600.0;
const BS3: f64 = 7571.0 / 16695.0;
const BS4: f64 = 393.0 / 640.0;
const BS5: f64 = -92097.0 / 339200.0;
const BS6: f64 = 187.0 / 2100.0;
const BS7: f64 = 1.0 / 40.0;

const E1: f64 = B1 - BS1;
const E3: f64 = B3 - BS3;
const E4: f64 = B4 - BS4;
const E5: f64 = B5 - BS5;
const E6: f64 = B6 - BS6;
const E7: f64 = -BS7;

/// Integrate `sys` from `y0` at `times[0]` and return the state at every grid time.
///
/// # Errors
/// - invalid tolerances, empty or decreasing grid, wrong `y0` dimension
/// - `StepLimitExceeded` when `opts.max_steps` attempted steps do not reach the end
/// - `NonFinite` as soon as a stage produces NaN/inf
pub fn integrate<S: OdeSystem>(
    sys: &S,
    y0: &[f64],
    times: &[f64],
    opts: &OdeOptions,
) -> Result<Trajectory, OdeError> {
    opts.validate()?;
    let n = sys.ndim();
    if y0.len() != n {
        return Err(OdeError::DimensionMismatch {
            expected: n,
            got: y0.len(),
        });
    }
    let Some(&t_start) = times.first() else {
        return Err(OdeError::EmptyGrid);
    };
    for (i, &t) in times.iter().enumerate() {
        if !t.is_finite() || (i > 0 && t < times[i - 1]) {
            return Err(OdeError::InvalidGrid { index: i });
        }
    }
    if y0.iter().any(|v| !v.is_finite()) {
        return Err(OdeError::NonFinite { t: t_start });
    }

    let span = times[times.len() - 1] - t_start;
    let mut states = Vec::with_capacity(times.len());
    states.push(y0.to_vec());
    if span == 0.0 {
        states.resize(times.len(), y0.to_vec());
        return Ok(Trajectory {
            times: times.to_vec(),
            states,
        });
    }

    let mut t = t_start;
    let mut y = y0.to_vec();
    let mut h = opts.initial_step(span);
    let mut steps = 0usize;

    let mut k1 = vec![0.0; n];
    let mut k2 = vec![0.0; n];
    let mut k3 = vec![0.0; n];
    let mut k4 = vec![0.0; n];
    let mut k5 = vec![0.0; n];
    let mut k6 = vec![0.0; n];
    let mut k7 = vec![0.0; n];
    let mut y_tmp = vec![0.0; n];
    let mut y_new = vec![0.0; n];

    sys.rhs(t, &y, &mut k1);

    for &target in &times[1..] {
        while t < target {
            if steps >= opts.max_steps {
                return Err(OdeError::StepLimitExceeded {
                    max_steps: opts.max_steps,
                    t,
                });
            }
            steps += 1;

            let remaining = target - t;
            let clamped = h >= remaining;
            let h_try = if clamped { remaining } else { h };

            for i in 0..n {
                y_tmp[i] = y[i] + h_try * A21 * k1[i];
            }
            sys.rhs(t + h_try / 5.0, &y_tmp, &mut k2);

            for i in 0..n {
                y_tmp[i] = y[i] + h_try * (A31 * k1[i] + A32 * k2[i]);
            }
            sys.rhs(t + 3.0 * h_try / 10.0, &y_tmp, &mut k3);

            for i in 0..n {
                y_tmp[i] = y[i] + h_try * (A41 * k1[i] + A42 * k2[i] + A43 * k3[i]);
            }
            sys.rhs(t + 4.0 * h_try / 5.0, &y_tmp, &mut k4);

            for i in 0..n {
                y_tmp[i] =
                    y[i] + h_try * (A51 * k1[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]);
            }
            sys.rhs(t + 8.0 * h_try / 9.0, &y_tmp, &mut k5);

            for i in 0..n {
                y_tmp[i] = y[i]
                    + h_try
                        * (A61 * k1[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i] + A65 * k5[i]);
            }
            sys.rhs(t + h_try, &y_tmp, &mut k6);

            for i in 0..n {
                y_new[i] = y[i]
                    + h_try * (B1 * k1[i] + B3 * k3[i] + B4 * k4[i] + B5 * k5[i] + B6 * k6[i]);
            }

            // FSAL: k7 is the derivative at the new point.
            sys.rhs(t + h_try, &y_new, &mut k7);

            let mut err_norm = 0.0;
            for i in 0..n {
                let ei = h_try
                    * (E1 * k1[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i] + E7 * k7[i]);
                let sc = opts.atol + opts.rtol * y[i].abs().max(y_new[i].abs());
                err_norm += (ei / sc) * (ei / sc);
            }
            err_norm = (err_norm / n as f64).sqrt();

            if !err_norm.is_finite() {
                return Err(OdeError::NonFinite { t });
            }

            let accepted = err_norm <= 1.0;
            if accepted {
                t = if clamped { target } else { t + h_try };
                y.copy_from_slice(&y_new);
                k1.copy_from_slice(&k7);
            }

            let factor = if err_norm == 0.0 {
                5.0
            } else {
                (0.9 * err_norm.powf(-0.2)).clamp(0.2, 5.0)
            };
            let h_next = (h_try * factor).max(opts.h_min).min(opts.h_max);
            // A short step forced by the grid says nothing about the natural step size.
            h = if clamped && accepted { h.max(h_next) } else { h_next };
        }
        states.push(y.clone());
    }

    Ok(Trajectory {
        times: times.to_vec(),
        states,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ode::{day_grid, linspace};

    struct Decay {
        k: f64,
    }

    impl OdeSystem for Decay {
        fn ndim(&self) -> usize {
            1
        }
        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = -self.k * y[0];
        }
    }

    struct Oscillator;

    impl OdeSystem for Oscillator {
        fn ndim(&self) -> usize {
            2
        }
        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = y[1];
            dydt[1] = -y[0];
        }
    }

    struct Blowup;

    impl OdeSystem for Blowup {
        fn ndim(&self) -> usize {
            1
        }
        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = (y[0] - 2.0).ln();
        }
    }

    #[test]
    fn exponential_decay_matches_closed_form_on_grid() {
        let sys = Decay { k: 0.3 };
        let grid = day_grid(15);
        let traj = integrate(&sys, &[10.0], &grid, &OdeOptions::default()).unwrap();
        assert_eq!(traj.len(), 15);
        for (t, s) in traj.times.iter().zip(&traj.states) {
            let exact = 10.0 * (-0.3 * t).exp();
            assert!((s[0] - exact).abs() < 1e-8, "t={t}: {} vs {exact}", s[0]);
        }
    }

    #[test]
    fn oscillator_conserves_energy() {
        let grid = linspace(0.0, 20.0, 41);
        let traj = integrate(&Oscillator, &[1.0, 0.0], &grid, &OdeOptions::default()).unwrap();
        let last = traj.states.last().unwrap();
        assert!((last[0] - 20.0f64.cos()).abs() < 1e-7);
        assert!((last[0] * last[0] + last[1] * last[1] - 1.0).abs() < 1e-7);
    }

    #[test]
    fn repeated_grid_times_repeat_the_state() {
        let sys = Decay { k: 1.0 };
        let traj = integrate(&sys, &[1.0], &[0.0, 1.0, 1.0, 2.0], &OdeOptions::default()).unwrap();
        assert_eq!(traj.states[1], traj.states[2]);
    }

    #[test]
    fn decreasing_grid_is_rejected() {
        let sys = Decay { k: 1.0 };
        let err = integrate(&sys, &[1.0], &[0.0, 2.0, 1.0], &OdeOptions::default()).unwrap_err();
        assert_eq!(err, OdeError::InvalidGrid { index: 2 });
    }

    #[test]
    fn non_finite_rhs_is_reported() {
        let err = integrate(&Blowup, &[1.0], &[0.0, 1.0], &OdeOptions::default()).unwrap_err();
        assert!(matches!(err, OdeError::NonFinite { .. }));
    }

    #[test]
    fn step_limit_is_enforced() {
        let opts = OdeOptions {
            max_steps: 3,
            h0: 1e-3,
            ..OdeOptions::default()
        };
        let err = integrate(&Decay { k: 1.0 }, &[1.0], &[0.0, 100.0], &opts).unwrap_err();
        assert!(matches!(err, OdeError::StepLimitExceeded { .. }));
    }
}
