use crate::error::{MediaFfmpegError, Result};

/// Stream time base as reported by `ffprobe` (`num/den` seconds per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    /// Creates a rational with a positive denominator and a non-zero numerator.
    ///
    /// # Example
    /// ```
    /// use media_ffmpeg::Rational;
    ///
    /// let tb = Rational::new(1, 15_360).expect("valid");
    /// assert_eq!(tb.den, 15_360);
    /// ```
    pub fn new(num: i32, den: i32) -> Result<Self> {
        if den <= 0 || num == 0 {
            return Err(MediaFfmpegError::InvalidRational { num, den });
        }

        Ok(Self { num, den })
    }

    /// Parses `ffprobe` text such as `1/15360` or `30000/1001`.
    pub fn parse(input: &str) -> Result<Self> {
        let (num, den) = input
            .split_once('/')
            .ok_or_else(|| MediaFfmpegError::Parse {
                context: "rational",
                value: input.to_string(),
            })?;
        let num = parse_i32(num, "rational num")?;
        let den = parse_i32(den, "rational den")?;
        Self::new(num, den)
    }

    /// Value of the rational as floating point.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Converts a tick count in this time base to seconds.
    pub fn ticks_to_seconds(self, ticks: i64) -> f64 {
        ticks as f64 * self.as_f64()
    }
}

/// Rescales `ts` between time bases with nearest rounding.
///
/// # Example
/// ```
/// use media_ffmpeg::{Rational, rescale};
///
/// let sixtieths = Rational::new(1, 60).expect("valid");
/// let mpeg = Rational::new(1, 90_000).expect("valid");
/// assert_eq!(rescale(30, sixtieths, mpeg), 45_000);
/// ```
pub fn rescale(ts: i64, from: Rational, to: Rational) -> i64 {
    let numerator = i128::from(ts) * i128::from(from.num) * i128::from(to.den);
    let denominator = i128::from(from.den) * i128::from(to.num);
    let rounded = div_round_nearest(numerator, denominator);
    rounded.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

fn div_round_nearest(num: i128, den: i128) -> i128 {
    debug_assert!(den != 0);

    let negative = (num < 0) != (den < 0);
    let (abs_num, abs_den) = (num.abs(), den.abs());
    let mut out = abs_num / abs_den;
    if (abs_num % abs_den).saturating_mul(2) >= abs_den {
        out += 1;
    }

    if negative { -out } else { out }
}

fn parse_i32(value: &str, context: &'static str) -> Result<i32> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| MediaFfmpegError::Parse {
            context,
            value: value.to_string(),
        })
}
