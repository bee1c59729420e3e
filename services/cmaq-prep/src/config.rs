//! Run configuration for cmaq-prep.
//!
//! One YAML file describes a whole run: where the meteorology, chemistry
//! and source data live, which domains and dates to process, the species
//! tables, and which optional sources to include. Path values support
//! `${VAR}`, `${VAR:-default}` and `~` expansion; relative paths are taken
//! from the directory holding the configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use cmaq_common::time::midnight;
use emissions::{InputFrequency, TemporalPolicy};
use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub paths: PathsConfig,
    pub tables: TablesConfig,
    pub domains: Vec<DomainConfig>,
    pub dates: DateRange,
    /// Chemical mechanism tag used in output names, e.g. `CB6`.
    pub mechanism: String,
    /// Mechanism name used in MEGAN file names, when it differs.
    #[serde(default)]
    pub megan_mechanism: Option<String>,
    #[serde(default)]
    pub anthropogenic: AnthropogenicConfig,
    #[serde(default)]
    pub features: FeatureSwitches,
    #[serde(default)]
    pub temporal: TemporalPolicy,
    /// Instant the global CTM calendar calls day 366.
    #[serde(default = "default_ctm_epoch")]
    pub ctm_epoch: DateTime<Utc>,
}

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// MCIP output, organised as `<met_dir>/<YYYY-MM-DD>/<domain>`.
    pub met_dir: PathBuf,
    /// CMAQ inputs and outputs, organised like `met_dir`.
    pub ctm_dir: PathBuf,
    /// Folder of `wrfchemi_<domain>_<timestamp>` files.
    pub anthropogenic_dir: PathBuf,
    /// Folder with `wrfout_<domain>_*` files, if they are not kept with
    /// the MCIP output.
    #[serde(default)]
    pub wrf_dir: Option<PathBuf>,
    /// GFAS fire product.
    #[serde(default)]
    pub gfas_file: Option<PathBuf>,
    /// Global CTM output for initial and boundary conditions.
    #[serde(default)]
    pub ctm_file: Option<PathBuf>,
}

/// Species tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    /// WRF-Chem to CMAQ conversion table.
    pub conversion: PathBuf,
    /// GFAS to CMAQ species map.
    #[serde(default)]
    pub fire_species: Option<PathBuf>,
    /// CMAQ namelists carrying molecular weights.
    #[serde(default)]
    pub namelists: Vec<PathBuf>,
    /// Global CTM to CMAQ species map.
    #[serde(default)]
    pub bcon_species: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Domain tag, e.g. `d01`.
    pub name: String,
    /// Grid name used in MEGAN and IC/BC file names.
    pub grid: String,
    /// Suffix of the MCIP files; discovered from `GRIDCRO2D_*` when absent.
    #[serde(default)]
    pub mcip_suffix: Option<String>,
    /// Domain tag in WRF-Chem file names, when it differs from `name`.
    #[serde(default)]
    pub wrf_domain: Option<String>,
    /// Coastline shapefile for the surf-zone file.
    #[serde(default)]
    pub coastline: Option<PathBuf>,
}

impl DomainConfig {
    pub fn wrf_domain(&self) -> &str {
        self.wrf_domain.as_deref().unwrap_or(&self.name)
    }
}

/// Inclusive range of dates to process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut out = Vec::new();
        let mut day = self.start;
        while day <= self.end {
            out.push(day);
            day += Duration::days(1);
        }
        out
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthropogenicConfig {
    #[serde(default)]
    pub frequency: InputFrequency,
}

/// Optional processing stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSwitches {
    #[serde(default = "default_true")]
    pub add_biogenic: bool,
    #[serde(default = "default_true")]
    pub add_fires: bool,
    #[serde(default = "default_true")]
    pub prepare_ic_bc: bool,
    /// Write open-ocean and surf-zone fractions for the sea-salt module.
    #[serde(default)]
    pub surf_zone: bool,
    /// Rewrite outputs that already exist.
    #[serde(default)]
    pub force_update: bool,
}

impl Default for FeatureSwitches {
    fn default() -> Self {
        Self {
            add_biogenic: true,
            add_fires: true,
            prepare_ic_bc: true,
            surf_zone: false,
            force_update: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Day 366 of a calendar counted from year 0.
fn default_ctm_epoch() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .map(midnight)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// ============================================================================
// Loading
// ============================================================================

impl RunConfig {
    /// Read, expand and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read run config from {:?}", path))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&content, base).with_context(|| format!("Invalid run config {:?}", path))
    }

    /// Parse YAML text; relative paths are resolved against `base`.
    pub fn from_yaml(content: &str, base: &Path) -> Result<Self> {
        let mut config: RunConfig =
            serde_yaml::from_str(content).context("Failed to parse run config YAML")?;
        config.resolve_paths(base)?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) -> Result<()> {
        let paths = &mut self.paths;
        for p in [&mut paths.met_dir, &mut paths.ctm_dir, &mut paths.anthropogenic_dir] {
            *p = resolve_path(p, base)?;
        }
        for p in [&mut paths.wrf_dir, &mut paths.gfas_file, &mut paths.ctm_file]
            .into_iter()
            .flatten()
        {
            *p = resolve_path(p, base)?;
        }

        let tables = &mut self.tables;
        tables.conversion = resolve_path(&tables.conversion, base)?;
        for p in [&mut tables.fire_species, &mut tables.bcon_species]
            .into_iter()
            .flatten()
        {
            *p = resolve_path(p, base)?;
        }
        for p in &mut tables.namelists {
            *p = resolve_path(p, base)?;
        }

        for p in self.domains.iter_mut().filter_map(|d| d.coastline.as_mut()) {
            *p = resolve_path(p, base)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.dates.end >= self.dates.start,
            "dates.end ({}) is before dates.start ({})",
            self.dates.end,
            self.dates.start
        );
        anyhow::ensure!(!self.domains.is_empty(), "At least one domain must be configured");
        anyhow::ensure!(self.temporal.period_days > 0, "temporal.period_days must be greater than 0");
        anyhow::ensure!(!self.mechanism.trim().is_empty(), "mechanism cannot be empty");

        for (i, domain) in self.domains.iter().enumerate() {
            anyhow::ensure!(!domain.name.is_empty(), "domains[{}].name cannot be empty", i);
            anyhow::ensure!(
                self.domains[..i].iter().all(|d| d.name != domain.name),
                "Domain {} is listed twice",
                domain.name
            );
        }

        if self.features.add_fires {
            anyhow::ensure!(self.paths.gfas_file.is_some(), "add_fires requires paths.gfas_file");
            anyhow::ensure!(
                self.tables.fire_species.is_some(),
                "add_fires requires tables.fire_species"
            );
            anyhow::ensure!(
                !self.tables.namelists.is_empty(),
                "add_fires requires at least one entry in tables.namelists"
            );
        }
        if self.features.prepare_ic_bc {
            anyhow::ensure!(self.paths.ctm_file.is_some(), "prepare_ic_bc requires paths.ctm_file");
            anyhow::ensure!(
                self.tables.bcon_species.is_some(),
                "prepare_ic_bc requires tables.bcon_species"
            );
        }
        if self.features.surf_zone {
            for domain in &self.domains {
                anyhow::ensure!(
                    domain.coastline.is_some(),
                    "surf_zone requires a coastline shapefile for domain {}",
                    domain.name
                );
            }
        }
        Ok(())
    }

    pub fn megan_mechanism(&self) -> &str {
        self.megan_mechanism.as_deref().unwrap_or(&self.mechanism)
    }

    /// MCIP output for one date and domain.
    pub fn mcip_dir(&self, date: NaiveDate, domain: &str) -> PathBuf {
        dated_dir(&self.paths.met_dir, date, domain)
    }

    /// CMAQ input directory for one date and domain.
    pub fn chem_dir(&self, date: NaiveDate, domain: &str) -> PathBuf {
        dated_dir(&self.paths.ctm_dir, date, domain)
    }
}

fn dated_dir(base: &Path, date: NaiveDate, domain: &str) -> PathBuf {
    base.join(date.format("%Y-%m-%d").to_string()).join(domain)
}

/// Expand `${VAR}`, `${VAR:-default}` and `~`, then anchor relative paths
/// at `base`.
fn resolve_path(path: &Path, base: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand path {:?}", raw))?;
    let expanded = PathBuf::from(expanded.as_ref());
    Ok(if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
paths:
  met_dir: mcip
  ctm_dir: /data/cmaq
  anthropogenic_dir: wrfchemi
tables:
  conversion: tables/wrfchem.txt
domains:
  - name: d01
    grid: AUS_12km
dates:
  start: 2024-01-10
  end: 2024-01-12
mechanism: CB6
features:
  add_fires: false
  prepare_ic_bc: false
"#;

    fn parse(yaml: &str) -> Result<RunConfig> {
        RunConfig::from_yaml(yaml, Path::new("/etc/cmaq"))
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse(MINIMAL).unwrap();
        assert_eq!(config.paths.met_dir, PathBuf::from("/etc/cmaq/mcip"));
        assert_eq!(config.paths.ctm_dir, PathBuf::from("/data/cmaq"));
        assert_eq!(config.tables.conversion, PathBuf::from("/etc/cmaq/tables/wrfchem.txt"));
        assert_eq!(config.temporal, TemporalPolicy::default());
        assert_eq!(config.anthropogenic.frequency, InputFrequency::Hourly);
        assert!(config.features.add_biogenic);
        assert!(!config.features.force_update);
        assert_eq!(config.megan_mechanism(), "CB6");
        assert_eq!(config.domains[0].wrf_domain(), "d01");
        assert_eq!(config.ctm_epoch.format("%Y-%m-%d").to_string(), "0001-01-01");
        assert_eq!(config.dates.days().len(), 3);
    }

    #[test]
    fn test_dated_directories() {
        let config = parse(MINIMAL).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(config.chem_dir(day, "d01"), PathBuf::from("/data/cmaq/2024-01-10/d01"));
        assert_eq!(config.mcip_dir(day, "d01"), PathBuf::from("/etc/cmaq/mcip/2024-01-10/d01"));
    }

    #[test]
    fn test_env_expansion() {
        std::env::set_var("CMAQ_PREP_TEST_ROOT", "/scratch/run1");
        let yaml = MINIMAL.replace("/data/cmaq", "${CMAQ_PREP_TEST_ROOT}/cmaq");
        let config = parse(&yaml).unwrap();
        assert_eq!(config.paths.ctm_dir, PathBuf::from("/scratch/run1/cmaq"));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let yaml = MINIMAL.replace("end: 2024-01-12", "end: 2024-01-09");
        let err = parse(&yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("before"));
    }

    #[test]
    fn test_empty_domains_rejected() {
        let yaml = MINIMAL.replace("  - name: d01\n    grid: AUS_12km\n", "  []\n");
        assert!(parse(&yaml).is_err());
    }

    #[test]
    fn test_zero_period_rejected() {
        let yaml = format!("{}temporal:\n  period_days: 0\n", MINIMAL);
        let err = parse(&yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("period_days"));
    }

    #[test]
    fn test_fires_need_inputs() {
        let yaml = MINIMAL.replace("  add_fires: false\n", "");
        let err = parse(&yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("gfas_file"));
    }

    #[test]
    fn test_temporal_and_frequency_overrides() {
        let yaml = format!(
            "{}temporal:\n  period_days: 14\n  allow_nearest_fallback: true\nanthropogenic:\n  frequency: daily\nctm_epoch: 2021-06-01T00:00:00Z\n",
            MINIMAL
        );
        let config = parse(&yaml).unwrap();
        assert_eq!(config.temporal.period_days, 14);
        assert!(config.temporal.allow_nearest_fallback);
        assert_eq!(config.anthropogenic.frequency, InputFrequency::Daily);
        assert_eq!(config.ctm_epoch.format("%Y-%m-%d").to_string(), "2021-06-01");
    }

    #[test]
    fn test_surf_zone_needs_coastline() {
        let yaml = format!("{}  surf_zone: true\n", MINIMAL);
        let err = parse(&yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("coastline shapefile for domain d01"));

        let yaml = yaml.replace("    grid: AUS_12km\n", "    grid: AUS_12km\n    coastline: gshhs/GSHHS_f_L1.shp\n");
        let config = parse(&yaml).unwrap();
        assert!(config.features.surf_zone);
        assert_eq!(
            config.domains[0].coastline.as_deref(),
            Some(Path::new("/etc/cmaq/gshhs/GSHHS_f_L1.shp"))
        );
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = parse(include_str!("../cmaq-prep.example.yaml")).unwrap();
        assert_eq!(config.domains.len(), 2);
        assert_eq!(config.domains[1].mcip_suffix.as_deref(), Some("CAS_D02_35L"));
        assert!(config.paths.gfas_file.is_some());
        assert!(config.features.surf_zone);
        assert!(config.domains.iter().all(|d| d.coastline.is_some()));
        assert_eq!(config.dates.days().len(), 7);
    }
}
