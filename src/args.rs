use anyhow::{bail, Context, Result};

pub const DEFAULT_ZOOM: f32 = 100.0;
pub const DEFAULT_ROTATE: f32 = 0.0;

/// Parsed command line: `<input> <page_number> [zoom] [rotate]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub input: String,
    /// 0-based page index (the command line takes 1-based numbers).
    pub page: i32,
    /// Zoom in percent.
    pub zoom: f32,
    /// Rotation in degrees.
    pub rotate: f32,
}

impl Args {
    pub fn usage(program: &str) -> String {
        format!("usage: {} input page_number [zoom] [rotate]", program)
    }

    pub fn from_env() -> Result<Self> {
        Self::parse_from(std::env::args())
    }

    /// Parse an argument list whose first item is the program name.
    pub fn parse_from<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let program = args.next().unwrap_or_else(|| "toshokan".to_string());
        let rest: Vec<String> = args.collect();

        if rest.len() < 2 {
            bail!("{}", Self::usage(&program));
        }

        let input = rest[0].clone();
        let page_number: i32 = rest[1]
            .parse()
            .with_context(|| format!("invalid page number: {}", rest[1]))?;

        let zoom = match rest.get(2) {
            Some(s) => s
                .parse::<f32>()
                .with_context(|| format!("invalid zoom: {}", s))?,
            None => DEFAULT_ZOOM,
        };
        if !zoom.is_finite() || zoom <= 0.0 {
            bail!("zoom must be a positive number, got {}", zoom);
        }

        let rotate = match rest.get(3) {
            Some(s) => s
                .parse::<f32>()
                .with_context(|| format!("invalid rotation: {}", s))?,
            None => DEFAULT_ROTATE,
        };
        if !rotate.is_finite() {
            bail!("rotation must be finite, got {}", rotate);
        }

        if rest.len() > 4 {
            log::warn!("Ignoring {} extra argument(s)", rest.len() - 4);
        }

        let page = page_number
            .checked_sub(1)
            .with_context(|| format!("page number out of range: {}", page_number))?;

        Ok(Self {
            input,
            page,
            zoom,
            rotate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let args = Args::parse_from(["toshokan", "book.pdf", "3"]).unwrap();
        assert_eq!(args.input, "book.pdf");
        assert_eq!(args.page, 2);
        assert_eq!(args.zoom, 100.0);
        assert_eq!(args.rotate, 0.0);
    }

    #[test]
    fn test_all_arguments() {
        let args = Args::parse_from(["toshokan", "a.pdf", "1", "150", "90"]).unwrap();
        assert_eq!(args.page, 0);
        assert_eq!(args.zoom, 150.0);
        assert_eq!(args.rotate, 90.0);
    }

    #[test]
    fn test_missing_page_is_usage_error() {
        let err = Args::parse_from(["viewer", "a.pdf"]).unwrap_err();
        assert!(err.to_string().starts_with("usage: viewer"));
    }

    #[test]
    fn test_non_numeric_page_rejected() {
        let err = Args::parse_from(["toshokan", "a.pdf", "two"]).unwrap_err();
        assert!(err.to_string().contains("invalid page number"));
    }

    #[test]
    fn test_zero_zoom_rejected() {
        assert!(Args::parse_from(["toshokan", "a.pdf", "1", "0"]).is_err());
        assert!(Args::parse_from(["toshokan", "a.pdf", "1", "-50"]).is_err());
    }

    #[test]
    fn test_page_zero_becomes_negative_index() {
        // Range checking happens once the page count is known.
        let args = Args::parse_from(["toshokan", "a.pdf", "0"]).unwrap();
        assert_eq!(args.page, -1);
    }

    #[test]
    fn test_minimum_page_number_rejected() {
        let err = Args::parse_from(["toshokan", "a.pdf", "-2147483648"]).unwrap_err();
        assert!(err.to_string().contains("page number out of range"));
    }
}
