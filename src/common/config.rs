//! Options controlling how tolerant the decoders are.

/// How the decoders react to data that violates a SHOULD/MUST rule of the
/// format but can still be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Warn and continue on every recoverable anomaly.
    Lenient,
    /// Reject an unterminated `UnicodeString`, warn on everything else.
    #[default]
    Standard,
    /// Reject every anomaly, including non-zero reserved fields.
    Strict,
}

/// What to do with a formula cell whose shared flag points nowhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SharedFormulaPolicy {
    /// Log a warning and keep the cell's own tokens as a plain formula.
    #[default]
    Lenient,
    /// Fail the sheet load.
    Strict,
}

/// Options for the typed-property and record decoders.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    pub strictness: Strictness,
}

impl DecodeOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn strict() -> Self {
        Self {
            strictness: Strictness::Strict,
        }
    }

    #[inline]
    pub fn lenient() -> Self {
        Self {
            strictness: Strictness::Lenient,
        }
    }

    #[inline]
    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Whether a missing UTF-16 terminator fails the decode.
    #[inline]
    pub fn rejects_unterminated_unicode(&self) -> bool {
        self.strictness != Strictness::Lenient
    }

    /// Whether non-zero reserved fields and unterminated code-page strings fail.
    #[inline]
    pub fn rejects_anomalies(&self) -> bool {
        self.strictness == Strictness::Strict
    }
}

/// Options for loading a workbook.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    pub decode: DecodeOptions,
    pub shared_formulas: SharedFormulaPolicy,
}

impl ReadOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_decode_options(mut self, decode: DecodeOptions) -> Self {
        self.decode = decode;
        self
    }

    #[inline]
    pub fn with_shared_formula_policy(mut self, policy: SharedFormulaPolicy) -> Self {
        self.shared_formulas = policy;
        self
    }
}
