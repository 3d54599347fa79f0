use crate::error::{Result, ScrubError};

/// Rational time base, `num / den` seconds per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    /// Creates a validated rational.
    ///
    /// # Example
    /// ```
    /// use scrubber::Rational;
    ///
    /// let tb = Rational::new(1, 90_000).expect("valid");
    /// assert_eq!(tb.den, 90_000);
    /// ```
    pub fn new(num: i32, den: i32) -> Result<Self> {
        if num <= 0 || den <= 0 {
            return Err(ScrubError::InvalidConfig {
                reason: format!("invalid time base {num}/{den}"),
            });
        }
        Ok(Self { num, den })
    }
}

/// Tick rate used when asking the extractor for a frame: 60 ticks per second.
pub const EXTRACTION_TIME_BASE: Rational = Rational { num: 1, den: 60 };

/// Rescales `ts` from one time base to another with nearest rounding.
///
/// # Example
/// ```
/// use scrubber::{EXTRACTION_TIME_BASE, Rational, rescale};
///
/// let mpeg = Rational::new(1, 90_000).expect("valid");
/// assert_eq!(rescale(60, EXTRACTION_TIME_BASE, mpeg), 90_000);
/// ```
pub fn rescale(ts: i64, from: Rational, to: Rational) -> i64 {
    media_ffmpeg::rescale(ts, from.into(), to.into())
}

/// A timestamp quantized to [`EXTRACTION_TIME_BASE`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameTime {
    pub ticks: i64,
}

impl FrameTime {
    pub const ZERO: Self = Self { ticks: 0 };

    /// Quantizes `seconds`, truncating toward zero.
    ///
    /// Negative and non-finite inputs map to zero.
    ///
    /// # Example
    /// ```
    /// use scrubber::FrameTime;
    ///
    /// assert_eq!(FrameTime::from_seconds(1.5).ticks, 90);
    /// assert_eq!(FrameTime::from_seconds(0.0166).ticks, 0);
    /// ```
    pub fn from_seconds(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Self::ZERO;
        }
        let ticks = (seconds * f64::from(EXTRACTION_TIME_BASE.den)).trunc();
        Self {
            ticks: ticks.min(i64::MAX as f64) as i64,
        }
    }

    pub fn seconds(self) -> f64 {
        self.ticks as f64 / f64::from(EXTRACTION_TIME_BASE.den)
    }

    /// Expresses this time in ticks of `time_base`.
    pub fn rescale_to(self, time_base: Rational) -> i64 {
        rescale(self.ticks, EXTRACTION_TIME_BASE, time_base)
    }
}

impl From<Rational> for media_ffmpeg::Rational {
    fn from(value: Rational) -> Self {
        Self {
            num: value.num,
            den: value.den,
        }
    }
}

impl From<media_ffmpeg::Rational> for Rational {
    fn from(value: media_ffmpeg::Rational) -> Self {
        Self {
            num: value.num,
            den: value.den,
        }
    }
}
