//! Functions for numerical integration of the Lindblad master equation.
//!
//! Hamiltonians are supplied as functions of time and decay rates are in
//! inverse days. Output is "reduced": rather than storing the full trajectory,
//! a caller-supplied function is applied to the state at each requested time.

use ndarray as nd;
use num_complex::Complex64 as C64;

pub mod adaptive;
pub mod lindblad;

pub use adaptive::StepStats;

/// Compute a "norm" of an object, treating it as a representation of a quantum
/// state.
pub trait StateNorm {
    fn norm(&self) -> C64;
}

/// The norm of an `ndarray::Array1<num_complex::Complex64>` is the quadrature
/// sum of its elements.
impl StateNorm for nd::Array1<C64> {
    fn norm(&self) -> C64 { self.mapv(|a| a * a.conj()).sum().sqrt() }
}

/// The norm of an `ndarray::Array2<num_complex::Complex64>` is the sum of its
/// main diagonal.
impl StateNorm for nd::Array2<C64> {
    fn norm(&self) -> C64 { self.diag().iter().sum() }
}

/// Compute the commutator `[A, B] = A B - B A`.
pub fn commutator<SA, SB>(
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
) -> nd::Array2<C64>
where
    SA: nd::Data<Elem = C64>,
    SB: nd::Data<Elem = C64>,
{
    A.dot(B) - B.dot(A)
}

/// Compute the anti-commutator `{A, B} = A B + B A`.
pub fn anti_commutator<SA, SB>(
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
) -> nd::Array2<C64>
where
    SA: nd::Data<Elem = C64>,
    SB: nd::Data<Elem = C64>,
{
    A.dot(B) + B.dot(A)
}

/// Compute the expectation value `Tr(rho O)` of an observable.
pub fn expectation<SA, SB>(
    O: &nd::ArrayBase<SA, nd::Ix2>,
    rho: &nd::ArrayBase<SB, nd::Ix2>,
) -> f64
where
    SA: nd::Data<Elem = C64>,
    SB: nd::Data<Elem = C64>,
{
    rho.dot(O).diag().iter().sum::<C64>().re
}

fn array_diff<A>(arr: &nd::Array1<A>) -> nd::Array1<A>
where A: Copy + std::ops::Sub<A, Output = A>
{
    arr.iter().zip(arr.iter().skip(1))
        .map(|(ak, akp1)| *akp1 - *ak)
        .collect()
}

// fourth-order Runge-Kutta for the time-dependent Hamiltonian given by a
// function with reduced integration output, generic over the dimension of the
// quantum state array and the RHS of the ODE being solved; one step per
// interval of `t`
pub(crate) fn do_evolve_fn_reduced<D, H, F, X, T>(
    z0: &nd::Array<C64, D>,
    h: H,
    rhs: F,
    t: &nd::Array1<f64>,
    x: X,
) -> Vec<T>
where
    D: nd::Dimension,
    H: Fn(f64) -> nd::Array2<C64>,
    F: Fn(&nd::Array2<C64>, &nd::Array<C64, D>) -> nd::Array<C64, D>,
    X: Fn(&nd::Array<C64, D>) -> T,
{
    let dt = array_diff(t);
    let mut z_old: nd::Array<C64, D> = z0.clone();
    let mut hk: nd::Array2<C64>;
    let mut hkp1h: nd::Array2<C64>;
    let mut hkp1: nd::Array2<C64>;
    let mut k1: nd::Array<C64, D>;
    let mut k2: nd::Array<C64, D>;
    let mut k3: nd::Array<C64, D>;
    let mut k4: nd::Array<C64, D>;
    let mut z_new: nd::Array<C64, D>;
    let mut x_t: Vec<T> = Vec::with_capacity(t.len());
    x_t.push(x(&z_old));
    let iter = dt.iter().zip(t);
    for (&dtk, &tk) in iter {
        hk = h(tk);
        hkp1h = h(tk + dtk / 2.0);
        hkp1 = h(tk + dtk);
        k1 = rhs(&hk, &z_old);
        k2 = rhs(&hkp1h, &(&z_old + &k1 * (dtk / 2.0)));
        k3 = rhs(&hkp1h, &(&z_old + &k2 * (dtk / 2.0)));
        k4 = rhs(&hkp1, &(&z_old + &k3 * dtk));
        z_new = &z_old + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dtk / 6.0);
        x_t.push(x(&z_new));
        z_old = z_new;
    }
    x_t
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn commutator_of_ladder_and_sz() {
        let sz = nd::array![
            [C64::from(1.0), C64::from(0.0)],
            [C64::from(0.0), C64::from(-1.0)],
        ];
        let sx = nd::array![
            [C64::from(0.0), C64::from(1.0)],
            [C64::from(1.0), C64::from(0.0)],
        ];
        let c = commutator(&sz, &sx);
        assert_eq!(c[[0, 1]], C64::from(2.0));
        assert_eq!(c[[1, 0]], C64::from(-2.0));
        let a = anti_commutator(&sz, &sx);
        assert!(a.iter().all(|z| *z == C64::from(0.0)));
    }

    #[test]
    fn expectation_of_projector_is_population() {
        let rho = nd::array![
            [C64::from(0.25), C64::new(0.1, 0.2)],
            [C64::new(0.1, -0.2), C64::from(0.75)],
        ];
        let p1 = nd::array![
            [C64::from(0.0), C64::from(0.0)],
            [C64::from(0.0), C64::from(1.0)],
        ];
        assert_abs_diff_eq!(expectation(&p1, &rho), 0.75, epsilon = 1e-15);
    }

    #[test]
    fn state_norms() {
        let psi = nd::array![C64::from(3.0), C64::new(0.0, 4.0)];
        assert_abs_diff_eq!(psi.norm().re, 5.0, epsilon = 1e-15);
        let rho = nd::Array2::<C64>::eye(3);
        assert_eq!(rho.norm(), C64::from(3.0));
    }

    #[test]
    fn rk4_rotates_two_level_system() {
        // H = sx / 2 drives |0> -> |1> with P1(t) = sin^2(t / 2)
        let sx = nd::array![
            [C64::from(0.0), C64::from(0.5)],
            [C64::from(0.5), C64::from(0.0)],
        ];
        let rho0 = nd::array![
            [C64::from(1.0), C64::from(0.0)],
            [C64::from(0.0), C64::from(0.0)],
        ];
        let t = nd::Array1::linspace(0.0, std::f64::consts::PI, 401);
        let p1 = do_evolve_fn_reduced(
            &rho0,
            |_| sx.clone(),
            |h, rho| -C64::i() * commutator(h, rho),
            &t,
            |rho| rho[[1, 1]].re,
        );
        assert_eq!(p1.len(), t.len());
        for (tk, pk) in t.iter().zip(p1) {
            assert_abs_diff_eq!(pk, (tk / 2.0).sin().powi(2), epsilon = 1e-8);
        }
    }
}
