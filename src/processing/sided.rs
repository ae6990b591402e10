//! One-sided / two-sided bookkeeping.
//!
//! All frequency grids in this crate are the DFT grid `f_k = k·df`,
//! `df = fs/n`, `k = 0..n`. A real record of `n` samples has a
//! conjugate-symmetric spectrum: bin `k` mirrors bin `n - k` for
//! `k = 1..n`. Bin 0 (DC) has no mirror, and when `n` is even bin `n/2`
//! is its own mirror (the Nyquist bin, exactly `fs/2`).
//!
//! The one-sided form keeps bins `0..=n/2`. `is_onesided_center` records
//! whether its last bin is the Nyquist bin, i.e. whether `n` was even.
//! Together with `df` that fixes both the sampling rate and the two-sided
//! length when rebuilding:
//!
//! ```text
//! n = 6: [0 1 2 *3 4 5]   one-sided [0 1 2 3]  center  -> fs = 2·fmax
//! n = 5: [0 1 2 3 4]      one-sided [0 1 2]    !center -> fs = 2·fmax + df
//! ```

use ndarray::{s, Array1, Array2, ArrayView1};
use num_complex::Complex64;

use super::{ProcessingError, Sidedness};

/// Sampling rate implied by the last grid frequency.
///
/// A one-sided grid ending on Nyquist reaches exactly `fs/2`; one ending
/// short of it needs one more `df`. A two-sided DFT grid stops one bin
/// below `fs`.
pub fn sampling_rate(fmax: f64, df: f64, sided: Sidedness, is_onesided_center: bool) -> f64 {
    match sided {
        Sidedness::Two => fmax + df,
        Sidedness::One if is_onesided_center => fmax * 2.0,
        Sidedness::One => fmax * 2.0 + df,
    }
}

/// Number of one-sided bins kept from `n` two-sided bins.
pub const fn onesided_len(n: usize) -> usize {
    n / 2 + 1
}

/// Number of two-sided bins rebuilt from `h` one-sided bins.
pub const fn twosided_len(h: usize, is_onesided_center: bool) -> usize {
    if is_onesided_center {
        2 * h - 2
    } else {
        2 * h - 1
    }
}

/// Grid spacing of a uniform grid.
pub fn grid_step(frequency: ArrayView1<'_, f64>) -> Result<f64, ProcessingError> {
    if frequency.len() < 2 {
        return Err(ProcessingError::InsufficientData {
            needed: 2,
            available: frequency.len(),
        });
    }
    Ok(frequency[1] - frequency[0])
}

/// Truncate a raw transform to its non-negative half.
///
/// Amplitudes are not rescaled: this is for transform-shaped arrays, not
/// densities.
pub fn fourier_to_onesided<T: Clone>(
    frequency: ArrayView1<'_, f64>,
    response: &Array2<T>,
) -> (Array1<f64>, Array2<T>, bool) {
    let n = frequency.len();
    let half = onesided_len(n).min(n);
    let is_onesided_center = n % 2 == 0;
    tracing::trace!(n, half, is_onesided_center, "Fourier -> one-sided");
    (
        frequency.slice(s![..half]).to_owned(),
        response.slice(s![..half, ..]).to_owned(),
        is_onesided_center,
    )
}

/// Fold a two-sided density onto the non-negative half.
///
/// Every retained bin that has a mirror picks up the mirror's contribution
/// (is doubled). DC never has one; the Nyquist bin (even `n`) is its own.
pub fn psd_to_onesided(
    frequency: ArrayView1<'_, f64>,
    response: ArrayView1<'_, f64>,
) -> Result<(Array1<f64>, Array1<f64>, bool), ProcessingError> {
    let n = frequency.len();
    if response.len() != n {
        return Err(ProcessingError::ShapeMismatch {
            what: "psd_to_onesided",
            rows: response.len(),
            expected: n,
        });
    }
    if n == 0 {
        return Err(ProcessingError::InsufficientData {
            needed: 1,
            available: 0,
        });
    }
    let half = onesided_len(n).min(n);
    let is_onesided_center = n % 2 == 0;
    let folded = fold_density_onesided(response.slice(s![..half]), is_onesided_center);
    Ok((
        frequency.slice(s![..half]).to_owned(),
        folded,
        is_onesided_center,
    ))
}

/// Apply the doubling rule to an already-truncated half of a two-sided
/// density.
pub fn fold_density_onesided(half: ArrayView1<'_, f64>, is_onesided_center: bool) -> Array1<f64> {
    let h = half.len();
    let mut out = half.to_owned();
    for (k, v) in out.iter_mut().enumerate() {
        let self_mirrored = k == 0 || (is_onesided_center && k == h - 1);
        if !self_mirrored {
            *v *= 2.0;
        }
    }
    out
}

/// Rebuild the two-sided density from a one-sided one.
///
/// Exact inverse of [`psd_to_onesided`]: mirrored bins are halved and
/// copied to `n - k`, DC and Nyquist are kept as-is.
pub fn psd_to_twosided(
    frequency: ArrayView1<'_, f64>,
    response: ArrayView1<'_, f64>,
    is_onesided_center: bool,
    df: f64,
) -> Result<(Array1<f64>, Array1<f64>), ProcessingError> {
    let h = frequency.len();
    if response.len() != h {
        return Err(ProcessingError::ShapeMismatch {
            what: "psd_to_twosided",
            rows: response.len(),
            expected: h,
        });
    }
    let needed = if is_onesided_center { 2 } else { 1 };
    if h < needed {
        return Err(ProcessingError::InsufficientData {
            needed,
            available: h,
        });
    }

    let n = twosided_len(h, is_onesided_center);
    let mut out = Array1::<f64>::zeros(n);
    for k in 0..h {
        let self_mirrored = k == 0 || (is_onesided_center && k == h - 1);
        out[k] = if self_mirrored {
            response[k]
        } else {
            response[k] / 2.0
        };
    }
    for k in h..n {
        out[k] = out[n - k];
    }
    tracing::trace!(h, n, is_onesided_center, "one-sided -> two-sided density");
    Ok((super::uniform_grid(n, df), out))
}

/// Spectral density of a transform normalized by its point count.
///
/// `X·conj(X)/df` is real by construction; its real part is returned.
pub fn psd_density_from_transform(
    frequency: ArrayView1<'_, f64>,
    transform: ArrayView1<'_, Complex64>,
) -> Result<Array1<f64>, ProcessingError> {
    let df = grid_step(frequency)?;
    if df <= 0.0 {
        return Err(ProcessingError::InvalidParameter {
            name: "df",
            value: df,
            reason: "frequency grid must be increasing",
        });
    }
    Ok(transform.mapv(|z| (z * z.conj()).re / df))
}

/// Piecewise-linear interpolation of `(xp, fp)` at `x`.
///
/// `xp` must be increasing. Points outside `[xp[0], xp[-1]]` take the end
/// value.
pub fn interp(x: ArrayView1<'_, f64>, xp: ArrayView1<'_, f64>, fp: ArrayView1<'_, f64>) -> Array1<f64> {
    let m = xp.len();
    x.mapv(|xi| {
        if m == 0 {
            return f64::NAN;
        }
        if xi <= xp[0] {
            return fp[0];
        }
        if xi >= xp[m - 1] {
            return fp[m - 1];
        }
        // first index with xp[j] > xi; j is in 1..m here
        let j = xp.as_slice().map_or_else(
            || xp.iter().position(|&v| v > xi).unwrap_or(m - 1),
            |xs| xs.partition_point(|&v| v <= xi),
        );
        let (x0, x1) = (xp[j - 1], xp[j]);
        let (y0, y1) = (fp[j - 1], fp[j]);
        if x1 == x0 {
            y1
        } else {
            y0 + (xi - x0) * (y1 - y0) / (x1 - x0)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn symmetric_density(n: usize) -> Array1<f64> {
        // conjugate-symmetric layout: value(k) == value(n - k)
        Array1::from_iter((0..n).map(|k| {
            let m = k.min(n - k) as f64;
            1.0 + m * 0.5
        }))
    }

    #[test]
    fn test_sampling_rate_examples() {
        assert!((sampling_rate(3.0, 1.0, Sidedness::One, true) - 6.0).abs() < 1e-12);
        assert!((sampling_rate(1.0, 1.0, Sidedness::One, false) - 3.0).abs() < 1e-12);
        assert!((sampling_rate(5.0, 1.0, Sidedness::Two, true) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_fourier_to_onesided_parity() {
        let f = uniform(6);
        let r = Array2::<f64>::ones((6, 1));
        let (f1, r1, center) = fourier_to_onesided(f.view(), &r);
        assert_eq!(f1.len(), 4);
        assert_eq!(r1.nrows(), 4);
        assert!(center);

        let f = uniform(5);
        let r = Array2::<f64>::ones((5, 1));
        let (f1, r1, center) = fourier_to_onesided(f.view(), &r);
        assert_eq!(f1.len(), 3);
        assert_eq!(r1.nrows(), 3);
        assert!(!center);
    }

    #[test]
    fn test_psd_to_onesided_doubling_even() {
        let f = uniform(6);
        let r = symmetric_density(6);
        let (f1, r1, center) = psd_to_onesided(f.view(), r.view()).unwrap();
        assert!(center);
        assert_eq!(f1, array![0.0, 1.0, 2.0, 3.0]);
        // DC and Nyquist untouched, interior doubled
        assert_eq!(r1, array![r[0], 2.0 * r[1], 2.0 * r[2], r[3]]);
    }

    #[test]
    fn test_psd_to_onesided_doubling_odd() {
        let f = uniform(5);
        let r = symmetric_density(5);
        let (_, r1, center) = psd_to_onesided(f.view(), r.view()).unwrap();
        assert!(!center);
        assert_eq!(r1, array![r[0], 2.0 * r[1], 2.0 * r[2]]);
    }

    #[test]
    fn test_round_trip_both_parities() {
        for n in [2_usize, 3, 6, 7, 64, 101] {
            let f = uniform(n);
            let r = symmetric_density(n);
            let (f1, r1, center) = psd_to_onesided(f.view(), r.view()).unwrap();
            let (f2, r2) = psd_to_twosided(f1.view(), r1.view(), center, 1.0).unwrap();
            assert_eq!(f2.len(), n, "n={n}");
            for k in 0..n {
                assert!((f2[k] - f[k]).abs() < 1e-12);
                assert!((r2[k] - r[k]).abs() < 1e-12, "n={n} k={k}");
            }
        }
    }

    #[test]
    fn test_twosided_rejects_short_center_input() {
        let f = array![0.0];
        let r = array![1.0];
        assert!(psd_to_twosided(f.view(), r.view(), true, 1.0).is_err());
        let (f2, r2) = psd_to_twosided(f.view(), r.view(), false, 1.0).unwrap();
        assert_eq!(f2.len(), 1);
        assert_eq!(r2[0], 1.0);
    }

    #[test]
    fn test_density_from_transform() {
        let f = array![0.0, 0.5, 1.0];
        let x = array![
            Complex64::new(1.0, 0.0),
            Complex64::new(3.0, 4.0),
            Complex64::new(0.0, -2.0)
        ];
        let d = psd_density_from_transform(f.view(), x.view()).unwrap();
        assert_eq!(d, array![2.0, 50.0, 8.0]);
    }

    #[test]
    fn test_interp_clamps_and_interpolates() {
        let xp = array![1.0, 2.0, 4.0];
        let fp = array![10.0, 20.0, 0.0];
        let x = array![0.0, 1.5, 3.0, 4.0, 9.0];
        let y = interp(x.view(), xp.view(), fp.view());
        assert_eq!(y, array![10.0, 15.0, 10.0, 0.0, 0.0]);
    }

    fn uniform(n: usize) -> Array1<f64> {
        crate::processing::uniform_grid(n, 1.0)
    }
}
