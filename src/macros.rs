macro_rules! str {
    ($s:expr) => {
        $s.to_string()
    };
}

/// Unwraps an `Option`, running the `else` expression (or returning) on
/// `None`.
macro_rules! unless {
    ($ex:expr, else $else_block:expr) => {
        match $ex {
            Some(x) => x,
            _ => $else_block,
        }
    };
    ($ex:expr) => {
        match $ex {
            Some(x) => x,
            _ => return,
        }
    };
}

/// Appends a line to a defect chain, indented by `depth` levels of four
/// spaces.
macro_rules! push_line {
    ($chain:expr, $depth:expr, $($arg:tt)*) => {{
        let chain: &mut String = &mut $chain;
        chain.push('\n');
        for _ in 0..$depth {
            chain.push_str("    ");
        }
        chain.push_str(&format!($($arg)*));
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn push_line_indents_by_depth() {
        let mut chain = str!("Summary");
        push_line!(chain, 1, "{} [{}]", "A.a", "App");
        push_line!(chain, 2, "nested");
        assert_eq!(chain, "Summary\n    A.a [App]\n        nested");
    }

    #[test]
    fn unless_falls_back_on_none() {
        let found = unless!(None::<u32>, else 7);
        assert_eq!(found, 7);
        assert_eq!(unless!(Some(1), else 7), 1);
    }
}
