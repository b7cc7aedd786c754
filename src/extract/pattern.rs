use crate::error::PatternError;
use regex::Regex;

/// How a matched substring is turned into a number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coercion {
    /// Keep `[0-9.]` and parse as a float
    #[default]
    Float,
    /// Keep `[0-9]` and parse as an integer
    Integer,
}

impl Coercion {
    /// Strip foreign characters from `matched` and parse what remains
    pub fn apply(self, matched: &str) -> Option<f64> {
        match self {
            Coercion::Float => {
                let digits: String = matched
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '.')
                    .collect();
                digits.parse::<f64>().ok()
            }
            Coercion::Integer => {
                let digits: String = matched.chars().filter(|c| c.is_ascii_digit()).collect();
                digits.parse::<i64>().ok().map(|v| v as f64)
            }
        }
    }
}

/// A named extraction rule with ordered pattern alternatives
///
/// Alternatives are tried in declaration order; the first one that matches
/// anywhere in the text wins.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    name: String,
    alternatives: Vec<Regex>,
    coercion: Coercion,
    fallback: f64,
}

impl FieldPattern {
    /// Build a pattern from one or more regular expressions
    ///
    /// # Errors
    ///
    /// Returns `PatternError` naming the field if any alternative fails to compile.
    pub fn new(name: impl Into<String>, alternatives: &[&str]) -> Result<Self, PatternError> {
        let mut pattern = Self {
            name: name.into(),
            alternatives: Vec::with_capacity(alternatives.len()),
            coercion: Coercion::default(),
            fallback: 0.0,
        };
        for alternative in alternatives {
            pattern.push_alternative(alternative)?;
        }
        Ok(pattern)
    }

    pub fn with_coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    /// Append an alternative after the existing ones
    pub fn push_alternative(&mut self, alternative: &str) -> Result<(), PatternError> {
        let regex = Regex::new(alternative).map_err(|source| PatternError {
            field: self.name.clone(),
            source,
        })?;
        self.alternatives.push(regex);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coercion(&self) -> Coercion {
        self.coercion
    }

    pub fn fallback(&self) -> f64 {
        self.fallback
    }

    pub fn alternative_count(&self) -> usize {
        self.alternatives.len()
    }

    /// First matching substring, trying alternatives in order
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.alternatives
            .iter()
            .find_map(|regex| regex.find(text))
            .map(|m| m.as_str())
    }
}

/// Append `alternative` to the pattern named `field`
///
/// Returns `Ok(false)` when no pattern carries that name.
pub fn add_alternative(
    patterns: &mut [FieldPattern],
    field: &str,
    alternative: &str,
) -> Result<bool, PatternError> {
    match patterns.iter_mut().find(|p| p.name == field) {
        Some(pattern) => {
            pattern.push_alternative(alternative)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_coercion_strips_noise() {
        assert_eq!(Coercion::Float.apply("user 12.3%"), Some(12.3));
        assert_eq!(Coercion::Float.apply("12.3% user"), Some(12.3));
        assert_eq!(Coercion::Float.apply("sys"), None);
        assert_eq!(Coercion::Float.apply("1.2.3"), None);
    }

    #[test]
    fn test_integer_coercion_strips_noise() {
        assert_eq!(Coercion::Integer.apply("MemTotal:  3809036 kB"), Some(3_809_036.0));
        assert_eq!(Coercion::Integer.apply("kB"), None);
    }

    #[test]
    fn test_first_alternative_wins() {
        let pattern = FieldPattern::new("user", &[r"(?i)user\s+\d+%", r"\d+%\s*user"]).unwrap();
        // Both alternatives match; the first declared one is used
        assert_eq!(pattern.find("7% user, User 9%"), Some("User 9%"));
    }

    #[test]
    fn test_falls_through_to_later_alternative() {
        let pattern = FieldPattern::new("user", &[r"(?i)user\s+\d+%", r"\d+%\s*user"]).unwrap();
        assert_eq!(pattern.find("load 7% user"), Some("7% user"));
        assert_eq!(pattern.find("nothing here"), None);
    }

    #[test]
    fn test_invalid_alternative_names_field() {
        let err = FieldPattern::new("system", &["(sys"]).unwrap_err();
        assert_eq!(err.field, "system");
    }

    #[test]
    fn test_add_alternative_by_name() {
        let mut patterns = vec![
            FieldPattern::new("user", &[r"user\s+\d+"]).unwrap(),
            FieldPattern::new("system", &[r"sys\s+\d+"]).unwrap(),
        ];

        assert!(add_alternative(&mut patterns, "system", r"\d+\s+sy\b").unwrap());
        assert!(!add_alternative(&mut patterns, "idle", r"\d+\s+id").unwrap());
        assert_eq!(patterns[1].alternative_count(), 2);
        assert!(add_alternative(&mut patterns, "user", "(").is_err());
    }

    #[test]
    fn test_builder_options() {
        let pattern = FieldPattern::new("total", &[r"\d+"])
            .unwrap()
            .with_coercion(Coercion::Integer)
            .with_fallback(-1.0);
        assert_eq!(pattern.coercion(), Coercion::Integer);
        assert_eq!(pattern.fallback(), -1.0);
        assert_eq!(pattern.name(), "total");
    }
}
