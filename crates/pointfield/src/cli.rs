use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "pointfield",
    author,
    version,
    about = "Particle field viewer with a noise-distortion post-processing pass"
)]
pub struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(long, value_name = "FILE", env = "POINTFIELD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of particles (overrides `particles.count`).
    #[arg(long, value_name = "N")]
    pub particles: Option<usize>,

    /// Seed for the particle field (overrides `particles.seed`).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Set a published parameter, e.g. `--set "noiseAmount=0.6"`. Repeatable.
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_param_override)]
    pub overrides: Vec<ParamOverride>,

    /// Print the published parameters after setup and exit.
    #[arg(long)]
    pub list_params: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamOverride {
    pub name: String,
    pub value: f32,
}

pub fn parse() -> Cli {
    Cli::parse()
}

fn parse_param_override(raw: &str) -> Result<ParamOverride, String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("parameter name is empty in '{raw}'"));
    }
    let value = value
        .trim()
        .parse::<f32>()
        .map_err(|err| format!("invalid value for '{name}': {err}"))?;
    if !value.is_finite() {
        return Err(format!("value for '{name}' must be finite"));
    }
    Ok(ParamOverride {
        name: name.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides_with_spaces_in_names() {
        let parsed = parse_param_override("light x = -0.5").unwrap();
        assert_eq!(
            parsed,
            ParamOverride {
                name: "light x".into(),
                value: -0.5
            }
        );
    }

    #[test]
    fn rejects_malformed_overrides() {
        assert!(parse_param_override("noiseAmount").is_err());
        assert!(parse_param_override("=0.5").is_err());
        assert!(parse_param_override("noiseAmount=loud").is_err());
        assert!(parse_param_override("noiseAmount=inf").is_err());
    }

    #[test]
    fn cli_collects_repeated_sets() {
        let cli = Cli::try_parse_from([
            "pointfield",
            "--particles",
            "100",
            "--seed",
            "3",
            "--set",
            "noiseSpeed=0.5",
            "--set",
            "light y=1",
            "--list-params",
        ])
        .unwrap();
        assert_eq!(cli.particles, Some(100));
        assert_eq!(cli.seed, Some(3));
        assert_eq!(cli.overrides.len(), 2);
        assert_eq!(cli.overrides[1].name, "light y");
        assert!(cli.list_params);
    }
}
