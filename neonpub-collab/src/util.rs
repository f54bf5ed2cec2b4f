use rand::{distributions::Alphanumeric, thread_rng, Rng};

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

/// A code people type in to join a venue
pub fn join_code(length: usize) -> String {
    random_string(length).to_ascii_uppercase()
}

/// Cuts a string to at most `max` characters, respecting char boundaries
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod test {
    use super::{join_code, truncate_chars};

    #[test]
    fn join_codes_are_upper_case_alphanumeric() {
        let code = join_code(8);

        assert_eq!(code.len(), 8);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("città", 4), "citt");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
