use tracing::debug;

use super::sparse::SparseMatrix;
use super::vector::DenseVector;

/// Stopping parameters for [`conjugate_gradient`].
#[derive(Debug, Clone, Copy)]
pub struct CgParams {
    pub max_iterations: usize,
    /// Stop once `|Δ(rᵀr)|` between iterations drops below `tolerance * n`.
    pub tolerance: f32,
}

/// Outcome of a conjugate gradient solve.
///
/// Hitting `max_iterations` is not a failure: `solution` is the last iterate.
#[derive(Debug, Clone)]
pub struct CgSolution {
    pub solution: DenseVector,
    pub iterations: usize,
    pub converged: bool,
    /// Squared residual norm of the returned iterate.
    pub residual_sq: f32,
}

/// Solve `A x = b` for symmetric positive semi-definite `A`, starting at `guess`.
pub fn conjugate_gradient(
    a: &SparseMatrix,
    guess: &DenseVector,
    b: &DenseVector,
    params: CgParams,
) -> CgSolution {
    let n = guess.len();
    assert_eq!(b.len(), n, "right-hand side must match guess length");

    let mut x = guess.clone();
    let mut r = DenseVector::zeros(n);
    let mut p = DenseVector::zeros(n);
    let mut ap = DenseVector::zeros(n);

    // r = b - A * x
    a.mul_vec(&x, &mut ap);
    DenseVector::sub(&mut r, b, &ap);
    p.copy_from(&r);

    let mut rsq = r.dot(&r);
    let mut iterations = 0;
    let mut converged = rsq == 0.0;

    while !converged && iterations < params.max_iterations {
        a.mul_vec(&p, &mut ap);
        let p_ap = p.dot(&ap);
        if !(p_ap.is_finite() && p_ap > 0.0) {
            converged = true;
            break;
        }

        let alpha = rsq / p_ap;
        x.add_scaled(&p, alpha); // x = x + alpha * p
        r.add_scaled(&ap, -alpha); // r = r - alpha * Ap
        iterations += 1;

        let rsq_new = r.dot(&r);
        if (rsq_new - rsq).abs() < params.tolerance * n as f32 || rsq_new == 0.0 {
            rsq = rsq_new;
            converged = true;
            break;
        }

        let beta = rsq_new / rsq;
        p.scale_add(beta, &r); // p = r + beta * p
        rsq = rsq_new;
    }

    debug!(n, iterations, converged, residual_sq = rsq, "Conjugate gradient finished");

    CgSolution {
        solution: x,
        iterations,
        converged,
        residual_sq: rsq,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tridiagonal(n: usize) -> SparseMatrix {
        let mut m = SparseMatrix::square(n);
        for i in 0..n {
            m.add(i, i, 4.0);
            if i > 0 {
                m.add(i, i - 1, -1.0);
            }
            if i + 1 < n {
                m.add(i, i + 1, -1.0);
            }
        }
        m
    }

    fn tight() -> CgParams {
        CgParams {
            max_iterations: 1000,
            tolerance: 1e-10,
        }
    }

    #[test]
    fn solves_small_spd_system() {
        let a = tridiagonal(5);
        let expected = DenseVector::from_vec(vec![1.0, -2.0, 0.5, 3.0, 1.0]);
        let mut b = DenseVector::zeros(5);
        a.mul_vec(&expected, &mut b);

        let result = conjugate_gradient(&a, &DenseVector::zeros(5), &b, tight());
        assert!(result.converged);
        for i in 0..5 {
            assert_abs_diff_eq!(result.solution[i], expected[i], epsilon = 1e-4);
        }
    }

    #[test]
    fn exact_guess_returns_immediately() {
        let a = tridiagonal(4);
        let x = DenseVector::from_vec(vec![0.25, 0.5, 0.75, 1.0]);
        let mut b = DenseVector::zeros(4);
        a.mul_vec(&x, &mut b);

        let result = conjugate_gradient(&a, &x, &b, tight());
        assert!(result.iterations <= 1);
        for i in 0..4 {
            assert_abs_diff_eq!(result.solution[i], x[i], epsilon = 1e-5);
            assert!(result.solution[i].is_finite());
        }
    }

    #[test]
    fn iteration_cap_returns_partial_iterate() {
        let a = tridiagonal(50);
        let b = DenseVector::from_vec(vec![1.0; 50]);
        let params = CgParams {
            max_iterations: 2,
            tolerance: 0.0,
        };
        let result = conjugate_gradient(&a, &DenseVector::zeros(50), &b, params);
        assert_eq!(result.iterations, 2);
        assert!(!result.converged);
        assert!(result.solution.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn empty_system() {
        let a = SparseMatrix::square(0);
        let result = conjugate_gradient(&a, &DenseVector::zeros(0), &DenseVector::zeros(0), tight());
        assert!(result.converged);
        assert!(result.solution.is_empty());
    }
}
