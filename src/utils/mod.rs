pub fn join<'a, T, S>(i: T, sep: S) -> String
where
    T: IntoIterator,
    T::Item: ToString,
    S: Into<&'a str>,
{
    i.into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(sep.into())
}

/// Indents every non-empty line of `s` by `n` levels of two spaces.
pub fn indent<S: AsRef<str>>(s: S, n: usize) -> String {
    let pad = "  ".repeat(n);
    s.as_ref()
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{indent, join};

    #[test]
    fn indents_non_empty_lines() {
        assert_eq!(indent("a\n\nb", 2), "    a\n\n    b");
    }

    #[test]
    fn joins_displayable_items() {
        assert_eq!(join(&[1, 2, 3], ", "), "1, 2, 3");
        assert_eq!(join(Vec::<String>::new(), " → "), "");
    }
}
