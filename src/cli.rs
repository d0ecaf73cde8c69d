use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Files or directories to scan
    #[arg(required = true)]
    pub input: Vec<String>,

    /// Directory of .RULE files to build the license index from
    #[arg(short, long)]
    pub rules: String,

    /// Output file path
    #[arg(default_value = "output.json", short)]
    pub output_file: String,

    /// Minimum relevance weighted score (0-100) of a reported match
    #[arg(long, default_value = "0", value_parser = parse_score)]
    pub license_score: f32,

    /// Include the matched text lines in the output
    #[arg(long)]
    pub license_text: bool,

    /// Maximum recursion depth (0 means no recursion)
    #[arg(short, long, default_value = "50")]
    pub max_depth: usize,

    /// Exclude patterns (glob patterns like "*.tmp" or "node_modules")
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Vec<String>,
}

fn parse_score(value: &str) -> Result<f32, String> {
    let score: f32 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if (0.0..=100.0).contains(&score) {
        Ok(score)
    } else {
        Err(format!("score must be within 0-100, got {}", score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::parse_from([
            "provenant-license",
            "--rules",
            "rules",
            "--license-score",
            "80",
            "--license-text",
            "-e",
            "*.tmp,target",
            "src",
            "LICENSE",
        ]);
        assert_eq!(cli.input, vec!["src", "LICENSE"]);
        assert_eq!(cli.rules, "rules");
        assert_eq!(cli.license_score, 80.0);
        assert!(cli.license_text);
        assert_eq!(cli.exclude, vec!["*.tmp", "target"]);
        assert_eq!(cli.output_file, "output.json");
        assert_eq!(cli.max_depth, 50);
    }

    #[test]
    fn test_license_score_range() {
        let result = Cli::try_parse_from(["provenant-license", "-r", "rules", "--license-score", "120", "src"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rules_are_required() {
        assert!(Cli::try_parse_from(["provenant-license", "src"]).is_err());
    }
}
