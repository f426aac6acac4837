//! Compartmental epidemic models as [`OdeSystem`] right-hand sides.
//!
//! State layouts (in order):
//!
//! | model    | state                     |
//! |----------|---------------------------|
//! | SIR      | S, I, R                   |
//! | SIRC     | S, I, R, C                |
//! | SEIR     | S, E, I, R                |
//! | SEIRC    | S, E, I, R, C             |
//! | SEIAR    | S, E, I, A, R             |
//! | SEIARC   | S, E, I, A, R, C          |
//! | SEIARD   | S, E, I, A, R, D          |
//! | SEIARDC  | S, E, I, A, R, D, C       |
//!
//! The `C` variants append cumulative infections: new infections for SIRC,
//! exposed-to-infectious transitions for the others.
//!
//! None of these take part in fitting; the estimation core only uses
//! [`crate::models::ReducedSir`]. They are here for scenario simulation.

use serde::{Deserialize, Serialize};

use crate::ode::{OdeError, OdeOptions, OdeSystem, Trajectory, integrate};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sir {
    pub population: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl OdeSystem for Sir {
    fn ndim(&self) -> usize {
        3
    }

    fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let (s, i) = (y[0], y[1]);
        let infection = self.beta * s * i / self.population;
        dydt[0] = -infection;
        dydt[1] = infection - self.gamma * i;
        dydt[2] = self.gamma * i;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sirc {
    pub population: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl OdeSystem for Sirc {
    fn ndim(&self) -> usize {
        4
    }

    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]) {
        let sir = Sir {
            population: self.population,
            beta: self.beta,
            gamma: self.gamma,
        };
        sir.rhs(t, &y[..3], &mut dydt[..3]);
        dydt[3] = self.beta * y[0] * y[1] / self.population;
    }
}

/// SEIR with incubation rate `alpha` (1 / latent period).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Seir {
    pub population: f64,
    pub beta: f64,
    pub alpha: f64,
    pub gamma: f64,
}

impl OdeSystem for Seir {
    fn ndim(&self) -> usize {
        4
    }

    fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let (s, e, i) = (y[0], y[1], y[2]);
        let infection = self.beta * s * i / self.population;
        dydt[0] = -infection;
        dydt[1] = infection - self.alpha * e;
        dydt[2] = self.alpha * e - self.gamma * i;
        dydt[3] = self.gamma * i;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Seirc {
    pub population: f64,
    pub beta: f64,
    pub alpha: f64,
    pub gamma: f64,
}

impl OdeSystem for Seirc {
    fn ndim(&self) -> usize {
        5
    }

    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]) {
        let seir = Seir {
            population: self.population,
            beta: self.beta,
            alpha: self.alpha,
            gamma: self.gamma,
        };
        seir.rhs(t, &y[..4], &mut dydt[..4]);
        dydt[4] = self.alpha * y[1];
    }
}

/// SEIR with an asymptomatic branch.
///
/// A fraction `rho` of incubating cases becomes asymptomatic; asymptomatic
/// cases transmit at relative infectiousness `kappa`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Seiar {
    pub population: f64,
    pub beta: f64,
    pub alpha: f64,
    pub gamma_i: f64,
    pub gamma_a: f64,
    pub rho: f64,
    pub kappa: f64,
}

impl OdeSystem for Seiar {
    fn ndim(&self) -> usize {
        5
    }

    fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let (s, e, i, a) = (y[0], y[1], y[2], y[3]);
        let infection = self.beta * s * (i + self.kappa * a) / self.population;
        dydt[0] = -infection;
        dydt[1] = infection - self.alpha * e;
        dydt[2] = (1.0 - self.rho) * self.alpha * e - self.gamma_i * i;
        dydt[3] = self.rho * self.alpha * e - self.gamma_a * a;
        dydt[4] = self.gamma_i * i + self.gamma_a * a;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Seiarc(pub Seiar);

impl OdeSystem for Seiarc {
    fn ndim(&self) -> usize {
        6
    }

    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]) {
        self.0.rhs(t, &y[..5], &mut dydt[..5]);
        dydt[5] = self.0.alpha * y[1];
    }
}

/// SEIAR with disease deaths among symptomatic cases at rate `delta_i`.
///
/// The force of infection uses the living population `N - D`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Seiard {
    pub population: f64,
    pub beta: f64,
    pub kappa: f64,
    pub alpha: f64,
    pub rho: f64,
    pub gamma_i: f64,
    pub gamma_a: f64,
    pub delta_i: f64,
}

impl OdeSystem for Seiard {
    fn ndim(&self) -> usize {
        6
    }

    fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let (s, e, i, a, d) = (y[0], y[1], y[2], y[3], y[5]);
        let living = self.population - d;
        let force = self.beta * (i + self.kappa * a) / living;
        dydt[0] = -force * s;
        dydt[1] = force * s - self.alpha * e;
        dydt[2] = (1.0 - self.rho) * self.alpha * e - (self.gamma_i + self.delta_i) * i;
        dydt[3] = self.rho * self.alpha * e - self.gamma_a * a;
        dydt[4] = self.gamma_i * i + self.gamma_a * a;
        dydt[5] = self.delta_i * i;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Seiardc(pub Seiard);

impl OdeSystem for Seiardc {
    fn ndim(&self) -> usize {
        7
    }

    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]) {
        self.0.rhs(t, &y[..6], &mut dydt[..6]);
        dydt[6] = self.0.alpha * y[1];
    }
}

/// Integrate any compartmental model over an integer day grid `0..days`.
pub fn simulate<S: OdeSystem>(
    model: &S,
    initial_state: &[f64],
    days: usize,
    opts: &OdeOptions,
) -> Result<Trajectory, OdeError> {
    integrate(model, initial_state, &crate::ode::day_grid(days.max(1)), opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(state: &[f64], upto: usize) -> f64 {
        state[..upto].iter().sum()
    }

    #[test]
    fn sir_conserves_population() {
        let model = Sir {
            population: 1000.0,
            beta: 0.4,
            gamma: 0.1,
        };
        let traj = simulate(&model, &[999.0, 1.0, 0.0], 120, &OdeOptions::default()).unwrap();
        for s in &traj.states {
            assert!((total(s, 3) - 1000.0).abs() < 1e-6);
        }
        let last = traj.states.last().unwrap();
        assert!(last[2] > 800.0, "most of the population should recover");
    }

    #[test]
    fn sirc_cumulative_equals_infected_plus_recovered() {
        let model = Sirc {
            population: 5000.0,
            beta: 0.3,
            gamma: 0.1,
        };
        let traj = simulate(&model, &[4995.0, 5.0, 0.0, 5.0], 90, &OdeOptions::default()).unwrap();
        for s in &traj.states {
            assert!((s[3] - (s[1] + s[2])).abs() < 1e-6);
        }
    }

    #[test]
    fn seiar_and_seiard_conserve_their_totals() {
        let seiar = Seiar {
            population: 10_000.0,
            beta: 0.5,
            alpha: 0.2,
            gamma_i: 0.1,
            gamma_a: 0.15,
            rho: 0.4,
            kappa: 0.5,
        };
        let y0 = [9_990.0, 10.0, 0.0, 0.0, 0.0];
        let traj = simulate(&seiar, &y0, 150, &OdeOptions::default()).unwrap();
        for s in &traj.states {
            assert!((total(s, 5) - 10_000.0).abs() < 1e-5);
        }

        let seiard = Seiardc(Seiard {
            population: 10_000.0,
            beta: 0.5,
            kappa: 0.5,
            alpha: 0.2,
            rho: 0.4,
            gamma_i: 0.1,
            gamma_a: 0.15,
            delta_i: 0.01,
        });
        let y0 = [9_990.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let traj = simulate(&seiard, &y0, 150, &OdeOptions::default()).unwrap();
        let last = traj.states.last().unwrap();
        assert!((total(last, 6) - 10_000.0).abs() < 1e-5);
        assert!(last[5] > 0.0, "some deaths expected");
        assert!(last[6] >= last[4], "cumulative cases bound recoveries");
    }

    #[test]
    fn seirc_tracks_incubation_outflow() {
        let model = Seirc {
            population: 2000.0,
            beta: 0.6,
            alpha: 0.25,
            gamma: 0.2,
        };
        let traj = simulate(&model, &[1990.0, 10.0, 0.0, 0.0, 0.0], 60, &OdeOptions::default()).unwrap();
        for s in &traj.states {
            // Everyone who left E is either infectious or recovered.
            assert!((s[4] - (s[2] + s[3])).abs() < 1e-6);
        }
    }
}
