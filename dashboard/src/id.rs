use nanoid::nanoid;

/// Alphabet for generated model keys (no ambiguous glyphs).
const MODEL_KEY_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y',
    'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
/// Generated model key length.
const MODEL_KEY_LENGTH: usize = 20;

/// Generates a string key for models that do not use incrementing keys.
pub fn generate_model_key() -> String {
    nanoid!(MODEL_KEY_LENGTH, MODEL_KEY_ALPHABET)
}
