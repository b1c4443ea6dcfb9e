//! Reference-trie configuration.

/// Tuning knobs for [`crate::trie::ReferenceTrie`].
#[derive(Debug, Clone)]
pub struct Config {
    /// How many past roots (each paired with a full key snapshot) the trie retains for
    /// serving change proofs. Once a root falls out of this window, `get_change_proof`
    /// reports `had_roots_in_history = false` for it instead of fabricating a diff.
    pub history_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            history_length: 256,
        }
    }
}
