// End-to-end RPFR calculations on the ZnCl4 fixture logs
use isofrac::analysis::{
    analyze_pair, Advisory, AnalysisError, AnalysisOptions, FileRole, SecondaryRpfr, SkipReason,
};
use isofrac::isotope::{ExtendedElementTable, PeriodicTable};
use isofrac::parser::LogFile;
use isofrac::report::{self, Detail};
use isofrac::settings::SettingsManager;
use isofrac::validation::MoleculeShape;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to check if two floats are approximately equal
fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

fn fixture_text(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name);
    fs::read_to_string(path).unwrap()
}

fn analyze(light: &str, heavy: &str) -> Result<isofrac::FractionationReport, AnalysisError> {
    analyze_pair(
        &LogFile::from_text("zncl4_64.log", light),
        &LogFile::from_text("zncl4_66.log", heavy),
        MoleculeShape::NonLinear,
        &AnalysisOptions::default(),
        &PeriodicTable,
    )
}

#[test]
fn test_zncl4_primary_and_secondary() {
    let report = analyze(&fixture_text("zncl4_64.log"), &fixture_text("zncl4_66.log")).unwrap();

    assert_eq!(report.temperature, 298.15);
    assert!(approx_eq(report.primary.ratio_sum, -0.0315100969, 1e-8));
    assert!(approx_eq(report.primary.ln_q_light, 2.6961634304, 1e-7));
    assert!(approx_eq(report.primary.ln_q_heavy, 2.7301585764, 1e-7));
    assert!(approx_eq(report.primary.beta, 2.485049102, 1e-6));

    match &report.secondary {
        SecondaryRpfr::Computed { motion, result } => {
            assert_eq!(motion.element, "Zn");
            assert_eq!(motion.atomic_number, 30);
            assert_eq!(motion.light_active.len(), 6);
            assert_eq!(motion.heavy_active.len(), 6);
            assert!(result.is_finite());
            assert!(approx_eq(result.beta, 2.485049102, 1e-6));
        }
        other => panic!("secondary RPFR should be computed: {:?}", other),
    }
    assert!(report.advisories.is_empty());
}

#[test]
fn test_low_frequency_above_threshold() {
    let light = fixture_text("zncl4_64.log").replace("    6.0627", "   35.0000");
    let report = analyze(&light, &fixture_text("zncl4_66.log")).unwrap();
    assert_eq!(
        report.advisories,
        vec![Advisory::LowFrequencyThresholdExceeded {
            role: FileRole::Light,
            values: vec![35.0],
            threshold: 30.0,
        }]
    );
    assert!(approx_eq(report.primary.beta, 2.485049102, 1e-6));
}

#[test]
fn test_unequal_active_subsets_skip_secondary() {
    let heavy = fixture_text("zncl4_66.log").replace(
        "     1  30     0.00   0.51   0.00      0.00   0.00   0.51      0.00   0.00   0.00",
        "     1  30     0.00   0.51   0.00      0.00   0.00   0.51      0.00   0.00   0.05",
    );
    let report = analyze(&fixture_text("zncl4_64.log"), &heavy).unwrap();
    match &report.secondary {
        SecondaryRpfr::Skipped { motion, reason } => {
            assert_eq!(*reason, SkipReason::ActiveCountMismatch { light: 6, heavy: 7 });
            let motion = motion.as_ref().unwrap();
            assert_eq!(motion.heavy_displacements[8], 0.05);
        }
        other => panic!("secondary RPFR should be skipped: {:?}", other),
    }
    assert!(report.primary.is_finite());
}

#[test]
fn test_repeated_element_keeps_primary_result() {
    // four Cl atoms give four displacement sums per mode
    let light = fixture_text("zncl4_64.log").replace("Zn(Iso=64)", "Cl(Iso=35)");
    let heavy = fixture_text("zncl4_66.log").replace("Zn(Iso=66)", "Cl(Iso=37)");
    let report = analyze(&light, &heavy).unwrap();

    assert!(approx_eq(report.primary.beta, 2.485049102, 1e-6));
    assert_eq!(
        report.secondary,
        SecondaryRpfr::Skipped {
            motion: None,
            reason: SkipReason::StructuralMismatch {
                role: FileRole::Light,
                coordinates: 36,
                frequencies: 9,
            },
        }
    );
    assert!(report.advisories.is_empty());

    let text = report::render_text(&report, Detail::Basic);
    assert!(text.contains("yields 36 modes but 9 frequencies"));
}

#[test]
fn test_temperature_mismatch() {
    let heavy = fixture_text("zncl4_66.log").replace("298.150 Kelvin", "300.000 Kelvin");
    let err = analyze(&fixture_text("zncl4_64.log"), &heavy).unwrap_err();
    assert!(matches!(err, AnalysisError::TemperatureMismatch(_)));
    assert!(err.to_string().contains("298.15"));
}

#[test]
fn test_missing_temperature_names_the_file() {
    let heavy = fixture_text("zncl4_66.log").replace(" Temperature   298.150 Kelvin.", "");
    let err = analyze(&fixture_text("zncl4_64.log"), &heavy).unwrap_err();
    match &err {
        AnalysisError::Extraction { role, .. } => assert_eq!(*role, FileRole::Heavy),
        other => panic!("unexpected error: {}", other),
    }
    assert!(err.to_string().contains("zncl4_66.log"));
}

#[test]
fn test_frequency_count_mismatch() {
    let light = fixture_text("zncl4_64.log").replace("NAtoms=      5", "NAtoms=      6");
    let err = analyze(&light, &fixture_text("zncl4_66.log")).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Validation {
            role: FileRole::Light,
            ..
        }
    ));
}

#[test]
fn test_unoptimised_molecule_is_advisory() {
    let heavy = fixture_text("zncl4_66.log").replace("     YES", "     NO ");
    let report = analyze(&fixture_text("zncl4_64.log"), &heavy).unwrap();
    assert_eq!(
        report.advisories,
        vec![Advisory::ConvergenceTableMissing {
            role: FileRole::Heavy
        }]
    );
    assert!(report.heavy.convergence.is_none());
    assert!(report.light.convergence.is_some());
}

#[test]
fn test_custom_element_from_settings() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("isofrac_config.cfg");
    fs::write(&config, "[elements]\nZx = 30\n").unwrap();
    let settings = SettingsManager::from_file(&config).unwrap();

    let light = fixture_text("zncl4_64.log").replace("Zn(Iso=64)", "Zx(Iso=64)");
    let heavy = fixture_text("zncl4_66.log").replace("Zn(Iso=66)", "Zx(Iso=66)");
    let light = LogFile::from_text("light.log", &light);
    let heavy = LogFile::from_text("heavy.log", &heavy);

    let report = analyze_pair(
        &light,
        &heavy,
        MoleculeShape::NonLinear,
        &AnalysisOptions::default(),
        &settings.element_table(),
    )
    .unwrap();
    assert!(report.secondary.result().is_some());

    let report = analyze_pair(
        &light,
        &heavy,
        MoleculeShape::NonLinear,
        &AnalysisOptions::default(),
        &ExtendedElementTable::new(HashMap::new()),
    )
    .unwrap();
    assert_eq!(
        report.secondary,
        SecondaryRpfr::Skipped {
            motion: None,
            reason: SkipReason::UnknownElement {
                element: "Zx".to_string()
            }
        }
    );
}

#[test]
fn test_reports_on_disk() {
    let temp = TempDir::new().unwrap();
    let report = analyze(&fixture_text("zncl4_64.log"), &fixture_text("zncl4_66.log")).unwrap();

    let text_path = temp.path().join("results/zncl4/report.txt");
    report::write_text(&report, &text_path, Detail::Full).unwrap();
    let text = fs::read_to_string(&text_path).unwrap();
    assert!(text.contains("Zn isotopes extracted: 64Zn and 66Zn"));
    assert!(text.contains("Number of frequencies used in calculating FULL RPFR: 9"));
    assert!(text.contains("Number of frequencies used in calculating secondary RPFR: 6"));
    assert!(text.contains("Light isotope convergence table:"));

    let json_path = temp.path().join("results/zncl4/report.json");
    report::write_json(&report, &json_path).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(value["shape"], "NonLinear");
    assert_eq!(value["heavy"]["frequencies"].as_array().unwrap().len(), 9);
    assert!(approx_eq(
        value["primary"]["beta"].as_f64().unwrap(),
        2.485049102,
        1e-6
    ));
}
