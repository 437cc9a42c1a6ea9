//! Textual variable-path parsing, e.g. `result.allyourbase.success` or
//! `list[0].name`.

/// One hop of a [`VariablePath`]: a map key or a list index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Name(String),
    Index(usize),
}

/// A parsed variable path, ready to drive [`crate::VariableStore`]
/// traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariablePath(pub Vec<Segment>);

impl VariablePath {
    /// Splits on `.`, `[`, `]`; a token that parses as an unsigned integer
    /// becomes an [`Segment::Index`], everything else a [`Segment::Name`].
    pub fn parse(input: &str) -> VariablePath {
        let tokens = input.split(|c| c == '.' || c == '[' || c == ']').filter(|s| !s.is_empty());
        let segments = tokens
            .map(|tok| match tok.parse::<usize>() {
                Ok(idx) => Segment::Index(idx),
                Err(_) => Segment::Name(tok.to_string()),
            })
            .collect();
        VariablePath(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for VariablePath {
    fn from(s: &str) -> Self {
        VariablePath::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_path() {
        let p = VariablePath::parse("result.allyourbase.success");
        assert_eq!(
            p.segments(),
            &[
                Segment::Name("result".into()),
                Segment::Name("allyourbase".into()),
                Segment::Name("success".into()),
            ]
        );
    }

    #[test]
    fn parses_indexed_path() {
        let p = VariablePath::parse("list[0].name");
        assert_eq!(
            p.segments(),
            &[Segment::Name("list".into()), Segment::Index(0), Segment::Name("name".into())]
        );
    }
}
