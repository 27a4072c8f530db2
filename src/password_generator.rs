//! Random password generation.
//!
//! Options are immutable once built; the builder validates that every enabled
//! character group has at least two distinct non-whitespace characters and
//! that the per-group minimums fit in the requested length. Generation
//! satisfies the minimums first, fills the remainder from the union of all
//! enabled groups and shuffles the result so group runs do not leak position
//! information.

use crate::error::CryptoError;
use crate::random::CryptoRandom;

const DEFAULT_UPPER: &str = "QWERTYUIOPASDFGHJKLZXCVBNM";
const DEFAULT_LOWER: &str = "qwertyuiopasdfghjklzxcvbnm";
const DEFAULT_DIGITS: &str = "0123456789";
const DEFAULT_SYMBOLS: &str = "!@#$%^&*_+-";

const MIN_LENGTH: usize = 4;

#[derive(Debug, Clone)]
struct CharacterGroup {
    chars: Vec<char>,
    minimum: usize,
}

/// Validated, immutable options for [`generate_password`].
#[derive(Debug, Clone)]
pub struct PasswordGenerationOptions {
    length: usize,
    groups: Vec<CharacterGroup>,
}

impl PasswordGenerationOptions {
    /// Length 16 with at least 4 upper case, 4 lower case, 2 digits and
    /// 2 symbols.
    pub fn default_options() -> Self {
        let group = |chars: &str, minimum: usize| CharacterGroup {
            chars: chars.chars().collect(),
            minimum,
        };
        Self {
            length: 16,
            groups: vec![
                group(DEFAULT_UPPER, 4),
                group(DEFAULT_LOWER, 4),
                group(DEFAULT_DIGITS, 2),
                group(DEFAULT_SYMBOLS, 2),
            ],
        }
    }

    pub fn builder() -> PasswordGenerationOptionsBuilder {
        PasswordGenerationOptionsBuilder::new()
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

#[derive(Debug, Clone)]
pub struct PasswordGenerationOptionsBuilder {
    length: usize,
    upper: Option<(String, usize)>,
    lower: Option<(String, usize)>,
    digits: Option<(String, usize)>,
    symbols: Option<(String, usize)>,
    custom: Vec<(String, usize)>,
}

impl PasswordGenerationOptionsBuilder {
    fn new() -> Self {
        Self {
            length: 16,
            upper: Some((DEFAULT_UPPER.to_string(), 4)),
            lower: Some((DEFAULT_LOWER.to_string(), 4)),
            digits: Some((DEFAULT_DIGITS.to_string(), 2)),
            symbols: Some((DEFAULT_SYMBOLS.to_string(), 2)),
            custom: Vec::new(),
        }
    }

    pub fn length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn upper_case(mut self, chars: &str, minimum: usize) -> Self {
        self.upper = Some((chars.to_string(), minimum));
        self
    }

    pub fn lower_case(mut self, chars: &str, minimum: usize) -> Self {
        self.lower = Some((chars.to_string(), minimum));
        self
    }

    pub fn digits(mut self, chars: &str, minimum: usize) -> Self {
        self.digits = Some((chars.to_string(), minimum));
        self
    }

    pub fn symbols(mut self, chars: &str, minimum: usize) -> Self {
        self.symbols = Some((chars.to_string(), minimum));
        self
    }

    pub fn without_upper_case(mut self) -> Self {
        self.upper = None;
        self
    }

    pub fn without_lower_case(mut self) -> Self {
        self.lower = None;
        self
    }

    pub fn without_digits(mut self) -> Self {
        self.digits = None;
        self
    }

    pub fn without_symbols(mut self) -> Self {
        self.symbols = None;
        self
    }

    pub fn custom_group(mut self, chars: &str, minimum: usize) -> Self {
        self.custom.push((chars.to_string(), minimum));
        self
    }

    pub fn build(self) -> Result<PasswordGenerationOptions, CryptoError> {
        if self.length < MIN_LENGTH {
            return Err(CryptoError::InvalidArgument(format!(
                "password length must be at least {MIN_LENGTH}, got {}",
                self.length
            )));
        }

        let mut groups = Vec::new();
        let enabled = [&self.upper, &self.lower, &self.digits, &self.symbols];
        for (chars, minimum) in enabled.into_iter().flatten().cloned().chain(self.custom) {
            groups.push(validate_group(&chars, minimum)?);
        }
        if groups.is_empty() {
            return Err(CryptoError::InvalidArgument(
                "at least one character group must be enabled".to_string(),
            ));
        }

        let required: usize = groups.iter().map(|g| g.minimum).sum();
        if required > self.length {
            return Err(CryptoError::InvalidArgument(format!(
                "group minimums require {required} characters but length is {}",
                self.length
            )));
        }

        Ok(PasswordGenerationOptions {
            length: self.length,
            groups,
        })
    }
}

fn validate_group(chars: &str, minimum: usize) -> Result<CharacterGroup, CryptoError> {
    let collected: Vec<char> = chars.chars().collect();
    let mut distinct = collected.clone();
    distinct.sort_unstable();
    distinct.dedup();
    if collected.len() < 2
        || distinct.len() != collected.len()
        || collected.iter().any(|c| c.is_whitespace())
    {
        return Err(CryptoError::InvalidArgument(
            "character group needs at least 2 distinct non-whitespace characters".to_string(),
        ));
    }
    Ok(CharacterGroup {
        chars: collected,
        minimum,
    })
}

/// Generates a password with [`PasswordGenerationOptions::default_options`].
pub fn generate_password() -> String {
    generate_password_with(&PasswordGenerationOptions::default_options(), &CryptoRandom::new())
}

pub fn generate_password_with(
    options: &PasswordGenerationOptions,
    rng: &CryptoRandom,
) -> String {
    let mut password: Vec<char> = Vec::with_capacity(options.length);
    for group in &options.groups {
        for _ in 0..group.minimum {
            password.push(pick(&group.chars, rng));
        }
    }

    let combined: Vec<char> = options
        .groups
        .iter()
        .flat_map(|g| g.chars.iter().copied())
        .collect();
    while password.len() < options.length {
        password.push(pick(&combined, rng));
    }

    // Fisher-Yates, so the per-group minimums are not clustered at the front.
    for i in (1..password.len()).rev() {
        let j = rng.next_u32_below(i as u32 + 1) as usize;
        password.swap(i, j);
    }
    password.into_iter().collect()
}

fn pick(chars: &[char], rng: &CryptoRandom) -> char {
    chars[rng.next_u32_below(chars.len() as u32) as usize]
}
