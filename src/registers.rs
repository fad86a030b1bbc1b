//! ## HyperLogLog registers
//! A `RegisterArray` holds `m = 2^b` registers for one key, where `b` is the precision.
//!
//! Hash layout used by `add`:
//! - 0..b bits     - register index
//! - b..64 bits    - remaining `64 - b` bits, whose leading-zero run gives the rank
//!
//! Each register stores the maximum rank routed to it, so re-adding an identifier
//! never changes the array. Estimation uses the standard HyperLogLog formula with
//! linear counting for the small range. Between the linear counting threshold and the
//! point where every register is non-zero the raw estimate overshoots, so that range
//! applies the LogLog-Beta correction instead.
//!
//! [Original HyperLogLog paper](https://algo.inria.fr/flajolet/Publications/FlFuGaMe07.pdf)
//! [LogLog-Beta paper](https://arxiv.org/pdf/1612.02284.pdf)
//!
//! The large-range correction (`E > 2^32 / 30`) from the paper exists for 32-bit hashes
//! and is omitted here, since hashes are 64 bits wide.

use std::fmt::{Debug, Formatter};

use crate::error::{Error, Result};
use crate::hash::hash;

/// Smallest supported precision (16 registers).
pub const MIN_PRECISION: u8 = 4;
/// Largest supported precision (65536 registers).
pub const MAX_PRECISION: u8 = 16;
/// Default precision, 16384 registers with ~0.81% standard error.
pub const DEFAULT_PRECISION: u8 = 14;

/// Check that `precision` lies in `[MIN_PRECISION, MAX_PRECISION]`.
#[inline]
pub fn validate_precision(precision: u8) -> Result<u8> {
    if (MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
        Ok(precision)
    } else {
        Err(Error::InvalidPrecision(precision))
    }
}

/// Largest rank a register can hold for a given precision.
///
/// The rank saturates at `64 - b + 1` when all remaining hash bits are zero.
#[inline]
pub const fn max_rank(precision: u8) -> u8 {
    64 - precision + 1
}

/// Split a hash into register index and rank for a given precision.
#[inline]
pub(crate) fn decode_hash(hash: u64, precision: u8) -> (usize, u8) {
    let idx = (hash & ((1u64 << precision) - 1)) as usize;
    let w = hash >> precision;
    // `w` has its top `precision` bits cleared, so leading zeros are at least `precision`.
    let rank = (w.leading_zeros() - u32::from(precision) + 1) as u8;
    (idx, rank)
}

#[derive(Clone, PartialEq, Eq)]
pub struct RegisterArray {
    precision: u8,
    registers: Box<[u8]>,
}

#[allow(clippy::len_without_is_empty)]
impl RegisterArray {
    /// Create an all-zero register array. Fails if `precision` is out of range.
    pub fn new(precision: u8) -> Result<Self> {
        let precision = validate_precision(precision)?;
        Ok(Self {
            precision,
            registers: vec![0u8; 1 << precision].into_boxed_slice(),
        })
    }

    /// Rebuild a register array from raw registers, e.g. when restoring a snapshot.
    pub fn from_registers(precision: u8, registers: Vec<u8>) -> Result<Self> {
        let precision = validate_precision(precision)?;
        let m = 1usize << precision;
        if registers.len() != m {
            return Err(Error::PrecisionMismatch {
                expected: m,
                found: registers.len(),
            });
        }
        let max = max_rank(precision);
        if let Some((idx, rank)) = registers.iter().enumerate().find(|(_, &r)| r > max) {
            return Err(Error::InvalidRegisters(format!(
                "register {idx} holds rank {rank}, maximum for precision {precision} is {max}"
            )));
        }
        Ok(Self {
            precision,
            registers: registers.into_boxed_slice(),
        })
    }

    /// Precision `b` this array was created with.
    #[inline]
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Number of registers `m`.
    #[inline]
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// Whether every register is zero, i.e. nothing was added. `len` is never 0.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.registers.iter().all(|&r| r == 0)
    }

    #[inline]
    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    /// Hash `identifier` and add it. Returns whether a register changed.
    #[inline]
    pub fn add(&mut self, identifier: &[u8]) -> bool {
        self.add_hash(hash(identifier))
    }

    /// Add an already hashed identifier. Returns whether a register changed.
    #[inline]
    pub fn add_hash(&mut self, hash: u64) -> bool {
        let (idx, rank) = decode_hash(hash, self.precision);
        self.update_rank(idx, rank)
    }

    /// Raise register `idx` to `rank` unless it already holds a larger or equal value.
    #[inline]
    pub(crate) fn update_rank(&mut self, idx: usize, rank: u8) -> bool {
        let register = &mut self.registers[idx];
        if rank > *register {
            *register = rank;
            true
        } else {
            false
        }
    }

    /// Merge `rhs` into `self` by taking the register-wise maximum.
    pub fn merge(&mut self, rhs: &RegisterArray) -> Result<()> {
        if self.len() != rhs.len() {
            return Err(Error::PrecisionMismatch {
                expected: self.len(),
                found: rhs.len(),
            });
        }
        for (lhs, &rhs) in self.registers.iter_mut().zip(rhs.registers.iter()) {
            if rhs > *lhs {
                *lhs = rhs;
            }
        }
        Ok(())
    }

    /// Reset every register to zero.
    pub fn clear(&mut self) {
        self.registers.fill(0);
    }

    /// Return the bias-corrected cardinality estimate.
    pub fn estimate(&self) -> f64 {
        let m = self.len() as f64;
        let mut sum = 0.0;
        let mut zeros = 0usize;
        for &rank in self.registers.iter() {
            if rank == 0 {
                zeros += 1;
            }
            sum += 2f64.powi(-i32::from(rank));
        }

        let raw = alpha(self.len()) * m * m / sum;
        if raw <= 2.5 * m && zeros > 0 {
            // linear counting
            m * (m / zeros as f64).ln()
        } else {
            // LogLog-Beta, equals `raw` once no register is zero
            let zeros = zeros as f64;
            alpha(self.len()) * m * (m - zeros) / (sum + beta_horner(zeros, self.precision))
        }
    }

    /// Return the estimate rounded to the nearest non-negative integer.
    #[inline]
    pub fn count(&self) -> u64 {
        (self.estimate().max(0.0) + 0.5) as u64
    }

    /// Expected relative standard error `1.04 / sqrt(m)`.
    #[inline]
    pub fn standard_error(&self) -> f64 {
        1.04 / (self.len() as f64).sqrt()
    }
}

impl Debug for RegisterArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ precision: {}, registers: {}, estimate: {} }}",
            self.precision,
            self.len(),
            self.count()
        )
    }
}

/// Parameter for bias correction
#[inline]
fn alpha(m: usize) -> f64 {
    match m {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / (m as f64)),
    }
}

/// Computes LogLog-Beta estimate bias correction using Horner's method.
///
/// Paper: https://arxiv.org/pdf/1612.02284.pdf
#[inline]
fn beta_horner(z: f64, precision: u8) -> f64 {
    let beta = BETA[usize::from(precision - MIN_PRECISION)];
    let zl = (z + 1.0).ln();
    let mut res = 0.0;
    for i in (1..8).rev() {
        res = res * zl + beta[i];
    }
    res * zl + beta[0] * z
}

/// LogLog-Beta polynomial coefficients for precision in [4..16] range.
const BETA: [[f64; 8]; 13] = [
    // p = 4
    [
        -0.582581413904517,
        -1.93530035756005,
        11.079323758035073,
        -22.131357446444323,
        22.505391846630037,
        -12.000723834917984,
        3.220579408194167,
        -0.342225302271235,
    ],
    // p = 5
    [
        -0.7518999460733967,
        -0.959003007774876,
        5.59973713221416,
        -8.209763699976552,
        6.509125489447204,
        -2.683029373432373,
        0.5612891113138221,
        -0.0463331622196545,
    ],
    // p = 6
    [
        29.825790096961963,
        -31.328708333772592,
        -10.594252303658228,
        -11.572012568909962,
        3.818875437390749,
        -2.416013032853081,
        0.4542208940970826,
        -0.0575155452020420,
    ],
    // p = 7
    [
        2.810292129082006,
        -3.9780498518175995,
        1.3162680041351582,
        -3.92524863358059,
        2.008083575394647,
        -0.7527151937556955,
        0.1265569894242751,
        -0.0109946438726240,
    ],
    // p = 8
    [
        1.0063354488755052,
        -2.005806664051124,
        1.6436974936651412,
        -2.7056080994056617,
        1.392099802442226,
        -0.4647037427218319,
        0.07384282377269775,
        -0.00578554885254223,
    ],
    // p = 9
    [
        -0.09415657458167959,
        -0.7813097592455053,
        1.7151494675071246,
        -1.7371125040651634,
        0.8644150848904892,
        -0.23819027465047218,
        0.03343448400269076,
        -0.00207858528178157,
    ],
    // p = 10
    [
        -0.25935400670790054,
        -0.5259830199980581,
        1.4893303492587684,
        -1.2964271408499357,
        0.6228475621722162,
        -0.1567232677025104,
        0.02054415903878563,
        -0.00112488483925502,
    ],
    // p = 11
    [
        -4.32325553856025e-01,
        -1.08450736399632e-01,
        6.09156550741120e-01,
        -1.65687801845180e-02,
        -7.95829341087617e-02,
        4.71830602102918e-02,
        -7.81372902346934e-03,
        5.84268708489995e-04,
    ],
    // p = 12
    [
        -3.84979202588598e-01,
        1.83162233114364e-01,
        1.30396688841854e-01,
        7.04838927629266e-02,
        -8.95893971464453e-03,
        1.13010036741605e-02,
        -1.94285569591290e-03,
        2.25435774024964e-04,
    ],
    // p = 13
    [
        -0.41655270946462997,
        -0.22146677040685156,
        0.38862131236999947,
        0.4534097974606237,
        -0.36264738324476375,
        0.12304650053558529,
        -0.0170154038455551,
        0.00102750367080838,
    ],
    // p = 14
    [
        -3.71009760230692e-01,
        9.78811941207509e-03,
        1.85796293324165e-01,
        2.03015527328432e-01,
        -1.16710521803686e-01,
        4.31106699492820e-02,
        -5.99583540511831e-03,
        4.49704299509437e-04,
    ],
    // p = 15
    [
        -0.38215145543875273,
        -0.8906940053609084,
        0.3760233577467887,
        0.9933597744068238,
        -0.6557744163831896,
        0.1833234212970361,
        -0.02241529633062872,
        0.00121399789330194,
    ],
    // p = 16
    [
        -0.3733187664375306,
        -1.41704077448123,
        0.40729184796612533,
        1.5615203390658416,
        -0.9924223353428613,
        0.2606468139948309,
        -0.03053811369682807,
        0.00155770210179105,
    ],
];

#[cfg(test)]
pub mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use test_case::test_case;

    #[test_case(3 => Err(Error::InvalidPrecision(3)))]
    #[test_case(4 => Ok(16))]
    #[test_case(14 => Ok(16384))]
    #[test_case(16 => Ok(65536))]
    #[test_case(17 => Err(Error::InvalidPrecision(17)))]
    fn test_new(precision: u8) -> Result<usize> {
        RegisterArray::new(precision).map(|r| r.len())
    }

    #[test_case(0x0000_0000_0000_0005, 4 => (5, 61); "remaining bits all zero saturate")]
    #[test_case(0x8000_0000_0000_0003, 4 => (3, 1); "leftmost remaining bit set")]
    #[test_case(0x0000_0000_0000_0010, 4 => (0, 60); "lowest remaining bit set")]
    #[test_case(0x0400_0000_0000_0012, 4 => (2, 6))]
    #[test_case(0x0000_0000_0001_0000, 14 => (0, 48))]
    #[test_case(u64::MAX, 14 => (16383, 1))]
    fn test_decode_hash(hash: u64, precision: u8) -> (usize, u8) {
        decode_hash(hash, precision)
    }

    #[test]
    fn test_max_rank_fits_saturated_hash() {
        for precision in MIN_PRECISION..=MAX_PRECISION {
            let (_, rank) = decode_hash(0, precision);
            assert_eq!(rank, max_rank(precision));
        }
    }

    #[test]
    fn test_add_keeps_maximum() {
        let mut r = RegisterArray::new(4).unwrap();
        // index 1, rank 3
        assert!(r.add_hash(0x2000_0000_0000_0001));
        // same index, smaller rank is a no-op
        assert!(!r.add_hash(0x8000_0000_0000_0001));
        assert_eq!(r.registers()[1], 3);
        // same index, larger rank wins
        assert!(r.add_hash(0x0100_0000_0000_0001));
        assert_eq!(r.registers()[1], 8);
    }

    #[test]
    fn test_estimate_empty() {
        let r = RegisterArray::new(12).unwrap();
        assert!(r.is_zero());
        assert_eq!(r.estimate(), 0.0);
        assert_eq!(r.count(), 0);
        assert_eq!(format!("{:?}", r), "{ precision: 12, registers: 4096, estimate: 0 }");
    }

    #[test_case(4)]
    #[test_case(10)]
    #[test_case(14)]
    #[test_case(16)]
    fn test_single_identifier_counts_one(precision: u8) {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let mut r = RegisterArray::new(precision).unwrap();
            r.add(&rng.gen::<u64>().to_le_bytes());
            assert_eq!(r.count(), 1);
        }
    }

    #[test]
    fn test_idempotent_add() {
        let mut r = RegisterArray::new(14).unwrap();
        r.add(b"a@x.com");
        let once = r.clone();
        for _ in 0..100 {
            assert!(!r.add(b"a@x.com"));
        }
        assert_eq!(r, once);
        assert_eq!(r.count(), 1);
    }

    #[test_case(10, 100)]
    #[test_case(10, 10_000)]
    #[test_case(12, 50_000)]
    #[test_case(12, 10_240; "just above linear counting")]
    #[test_case(14, 42_598; "default precision just above linear counting")]
    #[test_case(14, 100_000)]
    fn test_accuracy(precision: u8, distinct: usize) {
        let trials = 20;
        let mut outliers = 0;
        for seed in 0..trials {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut r = RegisterArray::new(precision).unwrap();
            for _ in 0..distinct {
                r.add_hash(hash(&rng.gen::<u64>().to_le_bytes()));
            }
            let bound = 3.0 * r.standard_error() * distinct as f64;
            let error = (r.count() as f64 - distinct as f64).abs();
            if error > bound {
                eprintln!("seed {seed}: estimate {} for {distinct} distinct", r.count());
                outliers += 1;
            }
        }
        // 3 sigma outliers are rare but possible
        assert!(outliers <= 2, "{outliers} of {trials} trials outside 3 sigma");
    }

    #[test_case(10)]
    #[test_case(12)]
    #[test_case(14)]
    fn test_no_bias_above_linear_counting(precision: u8) {
        // 2.6 m distinct: raw estimate is in use while some registers are still zero
        let distinct = (1usize << precision) * 26 / 10;
        let trials = 20;
        let mut total = 0.0;
        let mut r = RegisterArray::new(precision).unwrap();
        for seed in 0..trials {
            let mut rng = StdRng::seed_from_u64(seed);
            r.clear();
            for _ in 0..distinct {
                r.add_hash(rng.gen());
            }
            assert!(r.registers().contains(&0));
            total += (r.estimate() - distinct as f64) / distinct as f64;
        }
        let bias = total / trials as f64;
        assert!(bias.abs() < r.standard_error(), "relative bias {bias}");
    }

    #[test]
    fn test_merge() {
        let mut lhs = RegisterArray::new(10).unwrap();
        let mut rhs = RegisterArray::new(10).unwrap();
        for i in 0..500u32 {
            lhs.add(&i.to_le_bytes());
        }
        for i in 250..750u32 {
            rhs.add(&i.to_le_bytes());
        }
        let mut merged = lhs.clone();
        merged.merge(&rhs).unwrap();
        for ((&m, &l), &r) in merged.registers().iter().zip(lhs.registers()).zip(rhs.registers()) {
            assert_eq!(m, l.max(r));
        }
        let error = (merged.count() as f64 - 750.0).abs() / 750.0;
        assert!(error < 3.0 * merged.standard_error());
    }

    #[test]
    fn test_merge_precision_mismatch() {
        let mut lhs = RegisterArray::new(10).unwrap();
        let rhs = RegisterArray::new(12).unwrap();
        assert_eq!(
            lhs.merge(&rhs),
            Err(Error::PrecisionMismatch {
                expected: 1024,
                found: 4096
            })
        );
    }

    #[test]
    fn test_from_registers() {
        let mut r = RegisterArray::new(4).unwrap();
        r.add(b"a@x.com");
        r.add(b"b@x.com");
        let restored = RegisterArray::from_registers(4, r.registers().to_vec()).unwrap();
        assert_eq!(restored, r);

        assert!(matches!(
            RegisterArray::from_registers(4, vec![0; 15]),
            Err(Error::PrecisionMismatch {
                expected: 16,
                found: 15
            })
        ));
        let mut too_large = vec![0; 16];
        too_large[3] = max_rank(4) + 1;
        assert!(matches!(
            RegisterArray::from_registers(4, too_large),
            Err(Error::InvalidRegisters(_))
        ));
    }

    #[test]
    fn test_clear() {
        let mut r = RegisterArray::new(8).unwrap();
        r.add(b"a@x.com");
        assert!(!r.is_zero());
        r.clear();
        assert!(r.is_zero());
        assert_eq!(r.count(), 0);
    }
}
