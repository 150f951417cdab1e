use std::fmt;

/// Local token counter using the cl100k BPE.
///
/// Provider-reported usage is authoritative; this is for estimates made
/// before a call (budget checks) and for responses that omit usage.
#[derive(Clone, Copy)]
pub struct TokenCounter {
    bpe: &'static bpe_openai::Tokenizer,
}

impl fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCounter").finish()
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bpe: bpe_openai::cl100k_base(),
        }
    }

    /// Count tokens in a string.
    #[must_use]
    pub fn count_str(&self, text: &str) -> usize {
        self.bpe.count(text)
    }
}
