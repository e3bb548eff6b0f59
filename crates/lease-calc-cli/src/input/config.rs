use lease_calc_core::time_value::SolverConfig;

use super::file;

/// Load solver settings from a YAML or JSON file; defaults when no path is given.
pub fn load_solver_config(path: Option<&str>) -> Result<SolverConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(SolverConfig::default());
    };

    let (canonical, contents) = file::read_text(path)?;
    let is_yaml = canonical
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let config: SolverConfig = if is_yaml {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };
    config.validate()?;

    tracing::debug!(path = %canonical.display(), ?config, "solver configuration loaded");
    Ok(config)
}
