//! WRF-Chem anthropogenic emissions cut to the CMAQ domain.
//!
//! Emission files are named `wrfchemi_<domain>_<YYYY-MM-DD_HH:MM:SS>` and
//! hold `[Time, emissions_zdim, south_north, west_east]` fields on the WRF
//! grid. The CMAQ domain is a sub-window of that grid, so fields are cut
//! rather than interpolated.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, NaiveDate, Utc};
use cmaq_common::time::{hourly_steps, midnight, parse_wrfchemi_timestamp};
use cmaq_common::{CurvilinearGrid, HOURS_PER_OUTPUT_DAY};
use dataset::{open_dataset, Dataset, Variable};
use regrid::SubWindow;
use serde::{Deserialize, Serialize};
use speciation::{ConversionTable, SpeciesClass};
use tracing::{debug, info};

use crate::discover::files_with_prefix;
use crate::field::EmissionsAccumulator;
use crate::temporal::TemporalPolicy;
use crate::units::UnitConverter;
use crate::{EmissionsError, Result};

/// How the WRF-Chem archive is split into files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFrequency {
    /// One file per hour with a single time step.
    #[default]
    Hourly,
    /// One file per day with 24 hourly steps.
    Daily,
}

/// A discovered emission file and the time in its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrfChemiFile {
    pub path: PathBuf,
    pub time: DateTime<Utc>,
}

/// Emission files for `domain` in `dir`, sorted by time.
///
/// Names whose timestamp does not parse are skipped.
pub fn discover_wrfchemi(dir: &Path, domain: &str) -> Result<Vec<WrfChemiFile>> {
    let prefix = format!("wrfchemi_{}_", domain);
    let mut files: Vec<WrfChemiFile> = files_with_prefix(dir, &prefix)?
        .into_iter()
        .filter_map(|f| match parse_wrfchemi_timestamp(&f.rest) {
            Ok(time) => Some(WrfChemiFile { path: f.path, time }),
            Err(e) => {
                debug!(path = %f.path.display(), error = %e, "Skipping file with unparsable timestamp");
                None
            }
        })
        .collect();
    if files.is_empty() {
        return Err(EmissionsError::NoInputFiles {
            what: prefix,
            dir: dir.to_path_buf(),
        });
    }
    files.sort_by_key(|f| f.time);
    Ok(files)
}

/// Source of one output hour: file index and time step within the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourSource {
    pub file: usize,
    pub step: usize,
}

/// Pick the file and step for each of the 25 output hours of `date`.
///
/// Hourly archives match each hour on its own. Daily archives take hours
/// 0..24 from the day's file and the closing midnight from step 0 of the
/// next day's file.
pub fn hour_sources(
    frequency: InputFrequency,
    date: NaiveDate,
    files: &[WrfChemiFile],
    policy: &TemporalPolicy,
) -> Result<Vec<HourSource>> {
    match frequency {
        InputFrequency::Hourly => {
            let available: Vec<_> = files.iter().map(|f| f.time).collect();
            let required = hourly_steps(date, HOURS_PER_OUTPUT_DAY);
            Ok(policy
                .match_hourly(&required, &available)?
                .into_iter()
                .map(|file| HourSource { file, step: 0 })
                .collect())
        }
        InputFrequency::Daily => {
            let days: Vec<_> = files.iter().map(|f| midnight(f.time.date_naive())).collect();
            let today = policy.match_time(midnight(date), &days)?;
            let next_date = date
                .checked_add_days(Days::new(1))
                .ok_or_else(|| EmissionsError::invalid_input("date", format!("{} has no next day", date)))?;
            let tomorrow = policy.match_time(midnight(next_date), &days)?;
            let mut out: Vec<HourSource> = (0..HOURS_PER_OUTPUT_DAY - 1)
                .map(|step| HourSource { file: today, step })
                .collect();
            out.push(HourSource {
                file: tomorrow,
                step: 0,
            });
            Ok(out)
        }
    }
}

/// WRF-Chem emissions for one domain, with the conversion table trimmed to
/// the species the files actually contain.
#[derive(Debug, Clone)]
pub struct AnthropogenicSource {
    table: ConversionTable,
    files: Vec<WrfChemiFile>,
    frequency: InputFrequency,
    policy: TemporalPolicy,
}

impl AnthropogenicSource {
    pub fn discover(
        dir: &Path,
        domain: &str,
        mut table: ConversionTable,
        frequency: InputFrequency,
        policy: TemporalPolicy,
    ) -> Result<Self> {
        let files = discover_wrfchemi(dir, domain)?;
        let first = open_dataset(&files[0].path)?;
        let available: BTreeSet<String> =
            first.variable_names().into_iter().map(String::from).collect();
        table.retain_available(&available, first.source());
        info!(
            domain = %domain,
            files = files.len(),
            direct = table.direct.len(),
            voc_members = table.voc_members.len(),
            "Found anthropogenic emission files"
        );
        Ok(Self {
            table,
            files,
            frequency,
            policy,
        })
    }

    pub fn table(&self) -> &ConversionTable {
        &self.table
    }

    pub fn files(&self) -> &[WrfChemiFile] {
        &self.files
    }

    /// Species produced by direct conversion and VOC lumping.
    pub fn destination_species(&self) -> Vec<(String, SpeciesClass)> {
        self.table
            .direct
            .iter()
            .map(|m| (m.dest.clone(), m.class))
            .chain(self.table.organics.iter().map(|o| (o.dest.clone(), SpeciesClass::Gas)))
            .collect()
    }

    /// Add direct and VOC-lumped contributions for the 25 hours of `date`.
    ///
    /// WRF-Chem layers beyond the accumulator's layer count are ignored.
    pub fn accumulate(
        &self,
        acc: &mut EmissionsAccumulator,
        date: NaiveDate,
        converter: &UnitConverter,
        window: &SubWindow,
    ) -> Result<()> {
        let shape = acc.shape();
        if (window.rows, window.cols) != (shape.rows, shape.cols) {
            return Err(EmissionsError::shape_mismatch(
                "sub-window cells",
                shape.frame_len(),
                window.rows * window.cols,
            ));
        }
        let sources = hour_sources(self.frequency, date, &self.files, &self.policy)?;

        // Each file is opened once, however many hours it serves
        let mut by_file: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();
        for (hour, src) in sources.iter().enumerate() {
            by_file.entry(src.file).or_default().push((hour, src.step));
        }

        let gas_factor = converter.gas_factor();
        for (file_idx, hours) in by_file {
            let ds = open_dataset(&self.files[file_idx].path)?;
            debug!(path = %self.files[file_idx].path.display(), hours = hours.len(), "Reading emissions");

            for (hour, step) in hours {
                for m in &self.table.direct {
                    let var = ds.require_variable(&m.source)?;
                    let factor = converter.flux_factor(m.class);
                    for (k, frame) in windowed_layers(var, step, window, shape.layers, ds.source())?
                        .iter()
                        .enumerate()
                    {
                        acc.add_frame(&m.dest, hour, k, frame, factor)?;
                    }
                }

                if self.table.organics.is_empty() || self.table.voc_members.is_empty() {
                    continue;
                }
                let mut voc_sum: Vec<Vec<f64>> = Vec::new();
                for name in &self.table.voc_members {
                    let var = ds.require_variable(name)?;
                    let layers = windowed_layers(var, step, window, shape.layers, ds.source())?;
                    if voc_sum.is_empty() {
                        voc_sum = layers;
                        continue;
                    }
                    for (total, layer) in voc_sum.iter_mut().zip(&layers) {
                        for (t, &v) in total.iter_mut().zip(layer) {
                            *t += v;
                        }
                    }
                }
                for organic in &self.table.organics {
                    for (k, frame) in voc_sum.iter().enumerate() {
                        acc.add_frame(&organic.dest, hour, k, frame, gas_factor * organic.fraction)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Declare the table's zero-fill placeholders.
    pub fn apply_zero_fill(&self, acc: &mut EmissionsAccumulator) {
        for (name, class) in &self.table.zero_fill {
            acc.zero_fill(name, *class);
        }
    }
}

/// Layers `0..min(zdim, max_layers)` of time step `step`, cut to `window`.
fn windowed_layers(
    var: &Variable,
    step: usize,
    window: &SubWindow,
    max_layers: usize,
    source_name: &str,
) -> Result<Vec<Vec<f64>>> {
    if var.shape.len() != 4 {
        return Err(EmissionsError::invalid_input(
            source_name,
            format!("expected [Time, zdim, south_north, west_east], got shape {:?}", var.shape),
        ));
    }
    let (zdim, ny, nx) = (var.shape[1], var.shape[2], var.shape[3]);
    if window.row0 + window.rows > ny || window.col0 + window.cols > nx {
        return Err(EmissionsError::invalid_input(
            source_name,
            format!("window {:?} exceeds the {} x {} emissions grid", window, ny, nx),
        ));
    }
    let volume = var.frame(step).ok_or_else(|| {
        EmissionsError::invalid_input(
            source_name,
            format!("time step {} out of range ({} steps)", step, var.frames()),
        )
    })?;
    Ok((0..zdim.min(max_layers))
        .map(|k| window.extract(&volume[k * ny * nx..(k + 1) * ny * nx], nx))
        .collect())
}

/// WRF grid hosting the CMAQ domain, from the first `wrfout_<domain>_*`
/// file found in `dirs` (`XLAT` and `XLONG`, first time step).
pub fn load_host_grid(dirs: &[&Path], domain: &str) -> Result<CurvilinearGrid> {
    let prefix = format!("wrfout_{}_", domain);
    for dir in dirs.iter().filter(|d| d.is_dir()) {
        let Some(found) = files_with_prefix(dir, &prefix)?.into_iter().next() else {
            continue;
        };
        let ds = open_dataset(&found.path)?;
        let xlat = ds.require_variable("XLAT")?;
        let xlong = ds.require_variable("XLONG")?;
        let n = xlat.shape.len();
        if n < 2 {
            return Err(EmissionsError::invalid_input(ds.source(), "XLAT must be at least 2D"));
        }
        let (rows, cols) = (xlat.shape[n - 2], xlat.shape[n - 1]);
        let lat = xlat.values()[..rows * cols].to_vec();
        let lon = xlong
            .values()
            .get(..rows * cols)
            .ok_or_else(|| EmissionsError::shape_mismatch("XLONG", rows * cols, xlong.len()))?
            .to_vec();
        debug!(path = %found.path.display(), rows, cols, "Loaded host grid");
        return Ok(CurvilinearGrid::new(rows, cols, lat, lon)?);
    }
    Err(EmissionsError::NoInputFiles {
        what: prefix,
        dir: dirs.first().map(|d| d.to_path_buf()).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn file_at(time: DateTime<Utc>) -> WrfChemiFile {
        WrfChemiFile {
            path: PathBuf::from(format!("wrfchemi_d01_{}", time)),
            time,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    #[test]
    fn test_hourly_sources() {
        let start = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let files: Vec<_> = (0..25).map(|h| file_at(start + Duration::hours(h))).collect();
        let sources = hour_sources(InputFrequency::Hourly, date(), &files, &TemporalPolicy::default()).unwrap();
        assert_eq!(sources.len(), 25);
        assert_eq!(sources[24], HourSource { file: 24, step: 0 });
    }

    #[test]
    fn test_daily_sources_use_next_day_for_last_hour() {
        let files = vec![
            file_at(Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap()),
            file_at(Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap()),
        ];
        let sources = hour_sources(InputFrequency::Daily, date(), &files, &TemporalPolicy::default()).unwrap();
        assert_eq!(sources.len(), 25);
        assert_eq!(sources[23], HourSource { file: 0, step: 23 });
        assert_eq!(sources[24], HourSource { file: 1, step: 0 });
    }

    #[test]
    fn test_daily_sources_reuse_sample_week() {
        // A single sample week starting one week before the date
        let files: Vec<_> = (0..7)
            .map(|d| file_at(Utc.with_ymd_and_hms(2024, 1, 3 + d, 0, 0, 0).unwrap()))
            .collect();
        let sources = hour_sources(InputFrequency::Daily, date(), &files, &TemporalPolicy::default()).unwrap();
        // 10 Jan maps to 3 Jan, 11 Jan to 4 Jan
        assert_eq!(sources[0].file, 0);
        assert_eq!(sources[24].file, 1);
    }

    #[test]
    fn test_windowed_layers() {
        // 1 step, 2 layers, 3 x 3 host grid
        let data: Vec<f64> = (0..18).map(|v| v as f64).collect();
        let var = Variable::new("E_NO", &["Time", "z", "y", "x"], &[1, 2, 3, 3], data).unwrap();
        let window = SubWindow { row0: 1, col0: 1, rows: 2, cols: 2 };
        let layers = windowed_layers(&var, 0, &window, 5, "test").unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0], vec![4.0, 5.0, 7.0, 8.0]);
        assert_eq!(layers[1], vec![13.0, 14.0, 16.0, 17.0]);

        let limited = windowed_layers(&var, 0, &window, 1, "test").unwrap();
        assert_eq!(limited.len(), 1);
        assert!(windowed_layers(&var, 1, &window, 5, "test").is_err());
    }
}
