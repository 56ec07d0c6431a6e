/// Attributes decoded from the trailing `key(value)` list of a manifest line.
///
/// Decoding is lenient: unknown keys are ignored and numbers that do not
/// parse become zero. A bad attribute never rejects the line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    /// `size(...)`: uncompressed size.
    pub size: u64,
    /// `cmpsize(...)`: compressed payload size.
    pub cmpsize: u64,
    /// `symval(...)`: symlink target.
    pub symval: Option<String>,
    /// `mach(...)`: architecture constraint expression.
    pub mach: Option<String>,
}

impl Attributes {
    /// Decodes an attribute string such as `size(100) cmpsize(42) symval(a)`.
    ///
    /// Inside a value, `:)` is an escaped parenthesis and does not close the
    /// value. A value without a closing parenthesis runs to the end of the
    /// string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut attrs = Self::default();
        let mut rest = raw;

        loop {
            rest = rest.trim_start();

            if rest.is_empty() {
                break;
            }

            let key_end = rest
                .find(|c: char| c.is_whitespace() || c == '(')
                .unwrap_or(rest.len());

            if key_end == 0 {
                // Stray '(' with no key in front of it.
                rest = &rest[1..];
                continue;
            }

            let key = &rest[..key_end];
            rest = &rest[key_end..];

            // Bare word without a value.
            let Some(open) = rest.strip_prefix('(') else {
                continue;
            };

            let (value, remainder) = split_value(open);
            rest = remainder;

            attrs.apply(key, value);
        }

        attrs
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key.to_ascii_lowercase().as_str() {
            "size" => self.size = parse_number(value),
            "cmpsize" => self.cmpsize = parse_number(value),
            "symval" => self.symval = Some(value.to_owned()),
            "mach" => self.mach = Some(value.trim().to_owned()),
            _ => {}
        }
    }
}

/// Splits `s` (the text after an opening parenthesis) into the value and
/// whatever follows the closing parenthesis.
fn split_value(s: &str) -> (&str, &str) {
    let mut from = 0;

    loop {
        let Some(pos) = s[from..].find(')') else {
            return (s.trim(), "");
        };

        let close = from + pos;

        if s[..close].ends_with(':') {
            from = close + 1;
            continue;
        }

        return (&s[..close], &s[close + 1..]);
    }
}

fn parse_number(value: &str) -> u64 {
    value.trim().parse().unwrap_or(0)
}
