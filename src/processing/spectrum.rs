//! Real-valued spectral magnitudes: PSD and VRS.
//!
//! Both share one container, [`Spectrum`], tagged with the quantity it
//! holds. Everything that only makes sense for a density (synthesis, SDOF
//! responses, VRS) lives on [`PowerSpectralDensity`].

use ndarray::{Array1, Array2, ArrayView1};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

use super::sdof::{self, check_positive};
use super::sided::{grid_step, interp, psd_to_onesided, psd_to_twosided, sampling_rate};
use super::synthesis::{PhaseStrategy, SingleGlobalPhase};
use super::{
    channel_labels, uniform_grid, FftEncoding, FftProcessor, ProcessingError, Sample, Sidedness,
    Signal, SpectralRepresentation,
};

/// What a [`Spectrum`] measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectrumQuantity {
    PowerSpectralDensity,
    VibrationResponse,
}

impl SpectrumQuantity {
    /// Axis label for a response measured in `units`.
    pub fn unit_label(self, units: &str) -> String {
        match self {
            Self::PowerSpectralDensity => format!("{units}^2/Hz"),
            Self::VibrationResponse => units.to_string(),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::PowerSpectralDensity => "PSD",
            Self::VibrationResponse => "VRS",
        }
    }
}

/// Type-level tag for a [`Spectrum`].
pub trait SpectrumKind:
    std::fmt::Debug + Clone + Copy + PartialEq + Default + Send + Sync + 'static
{
    const QUANTITY: SpectrumQuantity;
}

/// Tag for power spectral density, `units²/Hz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Density;

impl SpectrumKind for Density {
    const QUANTITY: SpectrumQuantity = SpectrumQuantity::PowerSpectralDensity;
}

/// Tag for vibration response magnitude, `units`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Response;

impl SpectrumKind for Response {
    const QUANTITY: SpectrumQuantity = SpectrumQuantity::VibrationResponse;
}

/// Single-channel real spectrum on a frequency grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "", try_from = "RawSpectrum")]
pub struct Spectrum<K: SpectrumKind> {
    frequency: Array1<f64>,
    response: Array1<f64>,
    label: Vec<String>,
    sided: Sidedness,
    is_onesided_center: bool,
    octave_spacing: u32,
    #[serde(skip)]
    kind: PhantomData<K>,
}

/// Wire form of [`Spectrum`]; deserialized values go through
/// [`Spectrum::from_values`].
#[derive(Deserialize)]
struct RawSpectrum {
    frequency: Array1<f64>,
    response: Array1<f64>,
    #[serde(default)]
    label: Vec<String>,
    sided: Sidedness,
    is_onesided_center: Option<bool>,
    #[serde(default)]
    octave_spacing: u32,
}

impl<K: SpectrumKind> TryFrom<RawSpectrum> for Spectrum<K> {
    type Error = ProcessingError;

    fn try_from(raw: RawSpectrum) -> Result<Self, Self::Error> {
        Self::from_values(
            raw.frequency,
            raw.response,
            raw.label,
            raw.sided,
            raw.is_onesided_center,
            raw.octave_spacing,
        )
    }
}

pub type PowerSpectralDensity = Spectrum<Density>;
pub type VibrationResponseSpectrum = Spectrum<Response>;

impl<K: SpectrumKind> Spectrum<K> {
    /// Build from a `[nfreq × 1]` response.
    ///
    /// More than one column, complex elements and a missing
    /// `is_onesided_center` are all rejected.
    pub fn new<T: Sample>(
        frequency: Array1<f64>,
        response: Array2<T>,
        label: Vec<String>,
        sided: Sidedness,
        is_onesided_center: Option<bool>,
        octave_spacing: u32,
    ) -> Result<Self, ProcessingError> {
        let entity = K::QUANTITY.name();
        if T::IS_COMPLEX {
            return Err(ProcessingError::ComplexValued { entity });
        }
        if response.ncols() != 1 {
            return Err(ProcessingError::MultiChannel {
                entity,
                columns: response.ncols(),
            });
        }
        let values = response.column(0).mapv(Sample::real_part);
        Self::from_values(
            frequency,
            values,
            label,
            sided,
            is_onesided_center,
            octave_spacing,
        )
    }

    pub fn from_values(
        frequency: Array1<f64>,
        response: Array1<f64>,
        label: Vec<String>,
        sided: Sidedness,
        is_onesided_center: Option<bool>,
        octave_spacing: u32,
    ) -> Result<Self, ProcessingError> {
        let entity = K::QUANTITY.name();
        let is_onesided_center =
            is_onesided_center.ok_or(ProcessingError::MissingCenterParity { entity })?;
        if response.len() != frequency.len() {
            return Err(ProcessingError::ShapeMismatch {
                what: entity,
                rows: response.len(),
                expected: frequency.len(),
            });
        }
        Ok(Self {
            frequency,
            response,
            label: channel_labels(label, 1),
            sided,
            is_onesided_center,
            octave_spacing,
            kind: PhantomData,
        })
    }

    /// Same grid and metadata, new values.
    fn with_response(&self, frequency: Array1<f64>, response: Array1<f64>) -> Self {
        Self {
            frequency,
            response,
            label: self.label.clone(),
            sided: self.sided,
            is_onesided_center: self.is_onesided_center,
            octave_spacing: self.octave_spacing,
            kind: PhantomData,
        }
    }

    pub const fn frequency(&self) -> &Array1<f64> {
        &self.frequency
    }

    pub const fn values(&self) -> &Array1<f64> {
        &self.response
    }

    pub fn label(&self) -> &[String] {
        &self.label
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = vec![label.into()];
        self
    }

    pub const fn sided(&self) -> Sidedness {
        self.sided
    }

    pub const fn is_onesided_center(&self) -> bool {
        self.is_onesided_center
    }

    pub const fn octave_spacing(&self) -> u32 {
        self.octave_spacing
    }

    pub const fn quantity(&self) -> SpectrumQuantity {
        K::QUANTITY
    }

    pub fn unit_label(&self, units: &str) -> String {
        K::QUANTITY.unit_label(units)
    }

    pub fn len(&self) -> usize {
        self.frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequency.is_empty()
    }

    fn require_uniform(&self) -> Result<(), ProcessingError> {
        if self.octave_spacing == 0 {
            Ok(())
        } else {
            Err(ProcessingError::OctaveSpacingNotImplemented(self.octave_spacing))
        }
    }

    pub fn df(&self) -> Result<f64, ProcessingError> {
        self.require_uniform()?;
        grid_step(self.frequency.view())
    }

    pub fn fsampling(&self) -> Result<f64, ProcessingError> {
        let df = self.df()?;
        let fmax = self.frequency[self.frequency.len() - 1];
        Ok(sampling_rate(fmax, df, self.sided, self.is_onesided_center))
    }

    /// Fold onto the non-negative half with the doubling rule.
    pub fn to_onesided(&self) -> Result<Self, ProcessingError> {
        if self.sided == Sidedness::One {
            return Ok(self.clone());
        }
        let (frequency, response, is_onesided_center) =
            psd_to_onesided(self.frequency.view(), self.response.view())?;
        tracing::debug!(
            quantity = K::QUANTITY.name(),
            from = self.frequency.len(),
            to = frequency.len(),
            is_onesided_center,
            "to one-sided"
        );
        Ok(Self {
            sided: Sidedness::One,
            is_onesided_center,
            ..self.with_response(frequency, response)
        })
    }

    /// Rebuild the full DFT range.
    ///
    /// Already two-sided values are returned as-is once `df` and
    /// `fsampling` are confirmed computable.
    pub fn to_twosided(&self) -> Result<Self, ProcessingError> {
        if self.sided == Sidedness::Two {
            self.fsampling()?;
            return Ok(self.clone());
        }
        let df = self.df()?;
        let (frequency, response) = psd_to_twosided(
            self.frequency.view(),
            self.response.view(),
            self.is_onesided_center,
            df,
        )?;
        tracing::debug!(
            quantity = K::QUANTITY.name(),
            from = self.frequency.len(),
            to = frequency.len(),
            "to two-sided"
        );
        Ok(Self {
            sided: Sidedness::Two,
            ..self.with_response(frequency, response)
        })
    }

    /// Log-log interpolation onto `frequency`.
    ///
    /// Zero-frequency source bins are left out of the log grid. Target
    /// points outside the source range take the nearest end value.
    pub fn resample(&self, frequency: Array1<f64>) -> Result<Self, ProcessingError> {
        if let Some(&bad) = frequency.iter().find(|f| !(f.is_finite() && **f >= 0.0)) {
            return Err(ProcessingError::InvalidParameter {
                name: "frequency",
                value: bad,
                reason: "resample frequencies must be finite and >= 0",
            });
        }
        let (xp, fp): (Vec<f64>, Vec<f64>) = self
            .frequency
            .iter()
            .zip(self.response.iter())
            .filter(|(f, _)| **f > 0.0)
            // log of an exact zero would poison the interpolation
            .map(|(f, s)| (f.log2(), s.max(f64::MIN_POSITIVE).log2()))
            .unzip();
        if xp.is_empty() {
            return Err(ProcessingError::InsufficientData {
                needed: 1,
                available: 0,
            });
        }

        let (lo, hi) = (self.frequency[0], self.frequency[self.frequency.len() - 1]);
        let outside = frequency.iter().filter(|&&f| f < lo || f > hi).count();
        if outside > 0 {
            tracing::warn!(
                outside,
                lo,
                hi,
                "resample target extends past the source grid, end values held"
            );
        }

        let x = frequency.mapv(f64::log2);
        let y = interp(x.view(), ArrayView1::from(&xp), ArrayView1::from(&fp));
        let response = y.mapv(f64::exp2);
        tracing::debug!(from = self.frequency.len(), to = frequency.len(), "log-log resample");
        Ok(self.with_response(frequency, response))
    }

    /// Overall level, `sqrt(Σ S·df)`.
    pub fn grms(&self) -> Result<f64, ProcessingError> {
        let df = self.df()?;
        Ok((self.response.sum() * df).sqrt())
    }
}

impl Spectrum<Density> {
    /// Random-phase time series with this PSD.
    ///
    /// The two-sided magnitude `sqrt(S·df)` gets a phase per bin from
    /// `strategy`, then an inverse transform gives the record, sampled at
    /// `fsampling`.
    pub fn to_time_series<R: RngCore>(
        &self,
        strategy: &dyn PhaseStrategy,
        rng: &mut R,
    ) -> Result<Signal, ProcessingError> {
        let two = self.to_twosided()?;
        let df = two.df()?;
        let fs = two.fsampling()?;
        let n = two.len();

        let phases = strategy.phases(n, rng);
        let scale = n as f64;
        let spectrum: Vec<Complex64> = two
            .response
            .iter()
            .zip(&phases)
            .map(|(&s, &phase)| Complex64::from_polar((s * df).sqrt(), phase) * scale)
            .collect();
        let processor = FftProcessor::new(n, fs)?;
        let samples = Array1::from_iter(processor.inverse(&spectrum)?.into_iter().map(|z| z.re));

        tracing::debug!(n, fs, df, "PSD -> time series");
        Signal::from_samples(uniform_grid(n, 1.0 / fs), samples, self.label[0].clone())
    }

    /// [`Self::to_time_series`] with [`SingleGlobalPhase`] and a seeded RNG.
    pub fn to_time_series_seeded(&self, seed: u64) -> Result<Signal, ProcessingError> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.to_time_series(&SingleGlobalPhase, &mut rng)
    }

    /// SDOF transmissibility on this grid (one-sided, real/imag).
    pub fn to_sdof_transmissibility(
        &self,
        q: f64,
        natural_frequency: f64,
    ) -> Result<SpectralRepresentation, ProcessingError> {
        let zeta = sdof::damping_ratio(q)?;
        check_positive("natural_frequency", natural_frequency)?;
        let values = self
            .frequency
            .mapv(|f| sdof::transmissibility(f, natural_frequency, zeta));
        SpectralRepresentation::from_values(
            self.frequency.clone(),
            values,
            self.label.clone(),
            FftEncoding::RealImag,
            Sidedness::One,
            Some(false),
        )
    }

    /// Acceleration transfer magnitude of an SDOF system, scaled so the
    /// first bin equals this PSD's first bin.
    pub fn to_sdof_vrs_response(
        &self,
        q: f64,
        natural_frequency: f64,
    ) -> Result<VibrationResponseSpectrum, ProcessingError> {
        let zeta = sdof::damping_ratio(q)?;
        check_positive("natural_frequency", natural_frequency)?;
        let mut magnitude = self
            .frequency
            .mapv(|f| sdof::acceleration_transfer(f, natural_frequency, zeta).norm());
        let reference = magnitude.first().copied().unwrap_or(0.0);
        if reference == 0.0 {
            return Err(ProcessingError::InvalidParameter {
                name: "frequency[0]",
                value: self.frequency.first().copied().unwrap_or(0.0),
                reason: "transfer magnitude at the first bin is zero, cannot normalize",
            });
        }
        let scale = self.response[0] / reference;
        magnitude.mapv_inplace(|m| m * scale);
        VibrationResponseSpectrum::from_values(
            self.frequency.clone(),
            magnitude,
            self.label.clone(),
            Sidedness::One,
            Some(false),
            0,
        )
    }

    /// Vibration response spectrum, one SDOF sum per grid frequency.
    pub fn to_vrs(&self, q: f64) -> Result<VibrationResponseSpectrum, ProcessingError> {
        self.vrs_with(q, sdof::vrs_serial)
    }

    /// [`Self::to_vrs`] with the natural frequencies evaluated on the rayon
    /// pool.
    pub fn to_vrs_par(&self, q: f64) -> Result<VibrationResponseSpectrum, ProcessingError> {
        self.vrs_with(q, sdof::vrs_parallel)
    }

    fn vrs_with(
        &self,
        q: f64,
        eval: fn(ArrayView1<'_, f64>, ArrayView1<'_, f64>, f64, f64) -> Array1<f64>,
    ) -> Result<VibrationResponseSpectrum, ProcessingError> {
        self.require_uniform()?;
        let zeta = sdof::damping_ratio(q)?;
        let df = sdof::mean_step(self.frequency.view())?;
        let vrs = eval(self.frequency.view(), self.response.view(), zeta, df);
        tracing::debug!(n = self.frequency.len(), q, df, "PSD -> VRS");
        self.as_response(vrs)
    }

    /// Miles' equation at every grid frequency, `sqrt(π/(4ζ)·fn·S(fn))`.
    pub fn to_miles(&self, q: f64) -> Result<VibrationResponseSpectrum, ProcessingError> {
        self.require_uniform()?;
        let zeta = sdof::damping_ratio(q)?;
        let factor = std::f64::consts::PI / (4.0 * zeta);
        let vrs = Array1::from_iter(
            self.frequency
                .iter()
                .zip(self.response.iter())
                .map(|(&f, &s)| (factor * f * s).sqrt()),
        );
        self.as_response(vrs)
    }

    fn as_response(&self, response: Array1<f64>) -> Result<VibrationResponseSpectrum, ProcessingError> {
        VibrationResponseSpectrum::from_values(
            self.frequency.clone(),
            response,
            self.label.clone(),
            self.sided,
            Some(self.is_onesided_center),
            self.octave_spacing,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn flat_psd(n: usize, df: f64, level: f64) -> PowerSpectralDensity {
        PowerSpectralDensity::from_values(
            uniform_grid(n, df),
            Array1::from_elem(n, level),
            vec!["flat".into()],
            Sidedness::One,
            Some(true),
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_constructor_contracts() {
        let f = array![0.0, 1.0];
        let two_cols = Array2::<f64>::zeros((2, 2));
        assert!(matches!(
            PowerSpectralDensity::new(f.clone(), two_cols, vec![], Sidedness::One, Some(true), 0),
            Err(ProcessingError::MultiChannel { columns: 2, .. })
        ));
        let complex = Array2::<Complex64>::zeros((2, 1));
        assert!(matches!(
            PowerSpectralDensity::new(f.clone(), complex, vec![], Sidedness::One, Some(true), 0),
            Err(ProcessingError::ComplexValued { .. })
        ));
        let ok = Array2::<f32>::ones((2, 1));
        let psd =
            PowerSpectralDensity::new(f.clone(), ok, vec![], Sidedness::One, Some(true), 0).unwrap();
        assert_eq!(psd.label(), ["channel_0"]);
        assert_eq!(
            PowerSpectralDensity::from_values(f, array![1.0, 1.0], vec![], Sidedness::One, None, 0)
                .unwrap_err(),
            ProcessingError::MissingCenterParity { entity: "PSD" }
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let psd = flat_psd(6, 2.0, 0.1);
        let json = serde_json::to_value(&psd).unwrap();
        let back: PowerSpectralDensity = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, psd);
        assert_eq!(back.df().unwrap(), 2.0);

        let mut short = json.clone();
        short["response"] = serde_json::to_value(array![0.1, 0.1]).unwrap();
        assert!(serde_json::from_value::<PowerSpectralDensity>(short).is_err());

        let mut no_center = json;
        no_center
            .as_object_mut()
            .unwrap()
            .remove("is_onesided_center");
        assert!(serde_json::from_value::<PowerSpectralDensity>(no_center).is_err());
    }

    #[test]
    fn test_quantity_labels() {
        let psd = flat_psd(4, 1.0, 1.0);
        assert_eq!(psd.quantity(), SpectrumQuantity::PowerSpectralDensity);
        assert_eq!(psd.unit_label("g"), "g^2/Hz");
        let vrs = psd.to_vrs(10.0).unwrap();
        assert_eq!(vrs.quantity(), SpectrumQuantity::VibrationResponse);
        assert_eq!(vrs.unit_label("g"), "g");
    }

    #[test]
    fn test_octave_spacing_fails_loudly() {
        let psd = PowerSpectralDensity::from_values(
            array![10.0, 20.0, 40.0],
            array![1.0, 1.0, 1.0],
            vec![],
            Sidedness::One,
            Some(false),
            3,
        )
        .unwrap();
        assert_eq!(psd.df(), Err(ProcessingError::OctaveSpacingNotImplemented(3)));
        assert!(psd.fsampling().is_err());
        assert!(psd.to_time_series_seeded(1).is_err());
        assert_eq!(
            psd.to_vrs(10.0),
            Err(ProcessingError::OctaveSpacingNotImplemented(3))
        );
        assert_eq!(
            psd.to_vrs_par(10.0),
            Err(ProcessingError::OctaveSpacingNotImplemented(3))
        );
        assert_eq!(
            psd.to_miles(10.0),
            Err(ProcessingError::OctaveSpacingNotImplemented(3))
        );
    }

    #[test]
    fn test_sided_round_trip_and_area() {
        for (n, center) in [(5_usize, true), (5, false)] {
            let one = PowerSpectralDensity::from_values(
                uniform_grid(n, 2.0),
                Array1::from_iter((0..n).map(|k| 1.0 + k as f64)),
                vec![],
                Sidedness::One,
                Some(center),
                0,
            )
            .unwrap();
            let two = one.to_twosided().unwrap();
            assert_eq!(two.len(), if center { 8 } else { 9 });
            assert!((two.grms().unwrap() - one.grms().unwrap()).abs() < 1e-12);
            assert!((two.fsampling().unwrap() - one.fsampling().unwrap()).abs() < 1e-12);
            let back = two.to_onesided().unwrap();
            assert_eq!(back.is_onesided_center(), center);
            for (a, b) in back.values().iter().zip(one.values().iter()) {
                assert!((a - b).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_resample_breakpoints_and_clamp() {
        let psd = PowerSpectralDensity::from_values(
            array![20.0, 80.0, 320.0],
            array![0.04, 0.01, 0.0025],
            vec![],
            Sidedness::One,
            Some(true),
            0,
        )
        .unwrap();
        let out = psd.resample(array![0.0, 10.0, 20.0, 40.0, 80.0, 320.0, 1000.0]).unwrap();
        let v = out.values();
        assert!((v[0] - 0.04).abs() < 1e-12);
        assert!((v[1] - 0.04).abs() < 1e-12);
        assert!((v[2] - 0.04).abs() < 1e-12);
        // -6 dB/octave slope: halving per octave
        assert!((v[3] - 0.02).abs() < 1e-12);
        assert!((v[4] - 0.01).abs() < 1e-12);
        assert!((v[6] - 0.0025).abs() < 1e-12);
        assert!(psd.resample(array![-1.0]).is_err());
    }

    #[test]
    fn test_sdof_vrs_response_normalized() {
        let psd = PowerSpectralDensity::from_values(
            array![20.0, 50.0, 100.0, 200.0],
            array![0.01, 0.02, 0.02, 0.01],
            vec![],
            Sidedness::One,
            Some(true),
            0,
        )
        .unwrap();
        let vrs = psd.to_sdof_vrs_response(10.0, 100.0).unwrap();
        assert!((vrs.values()[0] - 0.01).abs() < 1e-15);
        assert!(vrs.values()[2] > vrs.values()[3]);
        assert_eq!(vrs.sided(), Sidedness::One);
        assert!(!vrs.is_onesided_center());

        let from_dc = flat_psd(4, 10.0, 1.0);
        assert!(from_dc.to_sdof_vrs_response(10.0, 100.0).is_err());
    }

    #[test]
    fn test_transmissibility_container() {
        let psd = flat_psd(101, 2.0, 1.0);
        let t = psd.to_sdof_transmissibility(10.0, 100.0).unwrap();
        assert_eq!(t.sided(), Sidedness::One);
        assert!(!t.is_onesided_center());
        assert_eq!(t.encoding(), FftEncoding::RealImag);
        let (mag, _) = t.magnitude_phase(false);
        assert!((mag[[50, 0]] - 101.0_f64.sqrt()).abs() < 1e-9);
        assert!((mag[[0, 0]] - 1.0).abs() < 1e-12);
        assert!(psd.to_sdof_transmissibility(0.0, 100.0).is_err());
        assert!(psd.to_sdof_transmissibility(10.0, -5.0).is_err());
    }

    #[test]
    fn test_vrs_higher_q_higher_response() {
        let psd = flat_psd(200, 5.0, 0.04);
        let low = psd.to_vrs(5.0).unwrap();
        let high = psd.to_vrs(25.0).unwrap();
        for k in 20..180 {
            assert!(high.values()[k] > low.values()[k], "k={k}");
        }
        assert_eq!(psd.to_vrs_par(25.0).unwrap(), high);
    }

    #[test]
    fn test_miles_flat_profile() {
        let psd = flat_psd(11, 10.0, 0.04);
        let miles = psd.to_miles(10.0).unwrap();
        // sqrt(π/2·Q·fn·S) at fn=100
        let expected = (std::f64::consts::PI / 2.0 * 10.0 * 100.0 * 0.04).sqrt();
        assert!((miles.values()[10] - expected).abs() < 1e-12);
        assert_eq!(miles.values()[0], 0.0);
    }

    #[test]
    fn test_seeded_synthesis_deterministic() {
        let psd = flat_psd(65, 1.0, 0.5);
        let a = psd.to_time_series_seeded(42).unwrap();
        let b = psd.to_time_series_seeded(42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
        assert!((a.sampling_rate() - 128.0).abs() < 1e-9);
        assert!(a.rms()[0] <= psd.grms().unwrap() + 1e-9);
    }
}
