use std::process::Command;

use anyhow::{Context, Result};

const PACKAGE: &str = "airtime-queue";

/// `None` builds without default features.
const FEATURE_COMBINATIONS: &[Option<&[&str]>] = &[
    None,
    Some(&[]), // default
    Some(&["test-utils"]),
];

/// Check that all supported feature combinations compile successfully.
pub fn test_feature_matrix() -> Result<()> {
    println!("Testing {} {PACKAGE} feature combinations...", FEATURE_COMBINATIONS.len());

    for (index, combination) in FEATURE_COMBINATIONS.iter().enumerate() {
        let mut command = Command::new("cargo");
        command.args(["check", "--all-targets", "-p", PACKAGE]);

        let label = match combination {
            None => {
                command.arg("--no-default-features");
                "no-default-features".to_string()
            }
            Some([]) => "default".to_string(),
            Some(features) => {
                let joined = features.join(",");
                command.arg("--features").arg(&joined);
                joined
            }
        };

        println!("\n[{}/{}] {label}", index + 1, FEATURE_COMBINATIONS.len());

        let status =
            command.status().with_context(|| format!("Failed to run cargo check for '{label}'"))?;

        if !status.success() {
            anyhow::bail!("Feature combination '{label}' failed to compile");
        }

        println!("✅ Features '{label}' compiled successfully");
    }

    println!("\n✅ All {} feature combinations compile successfully!", FEATURE_COMBINATIONS.len());

    Ok(())
}
