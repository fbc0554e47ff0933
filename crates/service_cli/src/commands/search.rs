//! Search command implementation
//!
//! Runs `rkopt_optimiser::optimise` and persists accepted methods.

use std::path::{Path, PathBuf};

use rkopt_optimiser::{optimise, EnrichedMethod};
use tracing::{info, warn};

use crate::config::CliConfig;
use crate::Result;

/// File name of a persisted method, e.g. `erk_s4_k1_p3_ssp.json`.
pub fn output_file_name(method: &EnrichedMethod) -> String {
    let d = &method.descriptor;
    let class: String = d
        .class()
        .name()
        .chars()
        .map(|c| if c == '*' { 'x' } else { c })
        .collect();
    format!(
        "{}_s{}_k{}_p{}_{}.json",
        class,
        d.stages(),
        d.steps(),
        d.order(),
        d.objective()
    )
}

/// Write `method` as pretty JSON under `dir`.
pub fn write_method(method: &EnrichedMethod, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(output_file_name(method));
    let json = serde_json::to_string_pretty(method)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Run the search command
pub fn run(
    stages: usize,
    order: usize,
    class: &str,
    objective: &str,
    config: &CliConfig,
) -> Result<()> {
    info!("Starting search...");
    info!("  Class: {}  stages: {}  order: {}", class, stages, order);
    info!("  Objective: {}", objective);

    let method = optimise(stages, order, class, objective, &config.options)?;
    println!("{}", method.summary());

    if method.persistable {
        let path = write_method(&method, &config.output_dir)?;
        info!("Wrote method to {}", path.display());
    } else {
        warn!(
            "Attained order {} differs from requested {}; not written",
            method.attained_order, order
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rkopt_methods::{MethodClass, MethodDescriptor, MethodFamily, Objective};
    use rkopt_optimiser::{finalize, OptimiseOptions, SearchReport, SearchStatus};

    fn method(class: MethodClass) -> EnrichedMethod {
        let descriptor = MethodDescriptor::new(class, 3, 1, 2, Objective::Ssp).unwrap();
        let x = descriptor.family().smart_guess();
        let report = SearchReport {
            status: SearchStatus::Converged,
            ties: 1,
            runs: 1,
            successful_runs: 1,
            seed: 0,
        };
        finalize(&x, &descriptor, report, &OptimiseOptions::default()).unwrap()
    }

    #[test]
    fn test_output_file_name_escapes_star() {
        assert_eq!(
            output_file_name(&method(MethodClass::TwoSStar)),
            "2Sx_s3_k1_p2_ssp.json"
        );
    }

    #[test]
    fn test_written_json_has_coefficients() {
        let dir = std::env::temp_dir().join(format!("rkopt_cli_test_{}", std::process::id()));
        let path = write_method(&method(MethodClass::TwoSStar), &dir).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["attained_order"], 2);
        assert_eq!(value["coefficients"]["b"].as_array().unwrap().len(), 3);
        assert_eq!(value["persistable"], true);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
