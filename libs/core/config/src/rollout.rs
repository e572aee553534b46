use crate::{env_or_default, env_parse_or, ConfigError, FromEnv};

/// Workflow rollout and approval configuration.
///
/// Environment variables:
/// - `ROLLOUT_PHASES`: comma-separated phase percentages (default "10,50,100")
/// - `ROLLOUT_QUALITY_REGRESSION_PCT`: regression past this percentage of
///   the application-quality score halts the rollout (default 5.0)
/// - `APPROVAL_MIN_CONFIDENCE`: mean peer confidence required to proceed
///   (default 0.75)
/// - `APPROVAL_TIMEOUT_S`: deadline for a single peer approval RPC
///   (default 15)
#[derive(Clone, Debug)]
pub struct RolloutConfig {
    pub phases: Vec<u8>,
    pub quality_regression_pct: f64,
    pub approval_min_confidence: f64,
    pub approval_timeout_s: u64,
}

impl FromEnv for RolloutConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_phases = env_or_default("ROLLOUT_PHASES", "10,50,100");
        let phases = parse_phases(&raw_phases)?;

        Ok(Self {
            phases,
            quality_regression_pct: env_parse_or("ROLLOUT_QUALITY_REGRESSION_PCT", 5.0)?,
            approval_min_confidence: env_parse_or("APPROVAL_MIN_CONFIDENCE", 0.75)?,
            approval_timeout_s: env_parse_or("APPROVAL_TIMEOUT_S", 15)?,
        })
    }
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            phases: vec![10, 50, 100],
            quality_regression_pct: 5.0,
            approval_min_confidence: 0.75,
            approval_timeout_s: 15,
        }
    }
}

fn parse_phases(raw: &str) -> Result<Vec<u8>, ConfigError> {
    let phases: Result<Vec<u8>, _> = raw
        .split(',')
        .map(|s| s.trim().parse::<u8>())
        .collect();

    let phases = phases.map_err(|e| ConfigError::ParseError {
        key: "ROLLOUT_PHASES".to_string(),
        details: format!("{}", e),
    })?;

    // Phases must be ascending and end at 100 so the final phase covers
    // the whole fleet.
    if phases.is_empty()
        || phases.windows(2).any(|w| w[0] >= w[1])
        || *phases.last().unwrap() != 100
    {
        return Err(ConfigError::ParseError {
            key: "ROLLOUT_PHASES".to_string(),
            details: format!("phases must be ascending and end at 100, got '{}'", raw),
        });
    }

    Ok(phases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollout_defaults() {
        temp_env::with_vars(
            [
                ("ROLLOUT_PHASES", None::<&str>),
                ("APPROVAL_MIN_CONFIDENCE", None),
            ],
            || {
                let config = RolloutConfig::from_env().unwrap();
                assert_eq!(config.phases, vec![10, 50, 100]);
                assert!((config.approval_min_confidence - 0.75).abs() < f64::EPSILON);
            },
        );
    }

    #[test]
    fn test_rollout_phases_must_be_ascending() {
        assert!(parse_phases("50,10,100").is_err());
    }

    #[test]
    fn test_rollout_phases_must_end_at_full() {
        assert!(parse_phases("10,50,90").is_err());
    }

    #[test]
    fn test_rollout_phases_custom() {
        let phases = parse_phases("5, 25, 100").unwrap();
        assert_eq!(phases, vec![5, 25, 100]);
    }
}
