//! Date × domain processing loop.
//!
//! For each date and domain the pipeline grids fire emissions, merges
//! anthropogenic, zero-filled, biogenic and fire emissions into one hourly
//! file, and interpolates initial (first date) and boundary (first domain)
//! conditions from the global CTM. Grid correspondences are computed once
//! per domain and reused for every date. Surf-zone files, when enabled, are
//! written once per domain from the first date's MCIP grid.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use cmaq_common::{BoundingBox, CurvilinearGrid, PointSet};
use dataset::Dataset;
use emissions::{
    add_biogenic, add_fire, conditions_dataset, date_steps, emissions_dataset, fire_dataset,
    fire_mapping, load_host_grid, open_megan, read_tflags, surf_zone_dataset, vertical_columns,
    write_output, AnthropogenicSource, ConditionBuilder, ConditionPoints, CtmProduct,
    EmissionsAccumulator, EmissionsField, FieldShape, FireGridding, GfasProduct, IoapiHeader,
    McipDomain, McipFile, McipFiles, OutputNames, UnitConverter,
};
use regrid::{find_subwindow, surf_zone_fractions, Coastline, GridMapping, SubWindow};
use speciation::{ConversionTable, MapLayout, MolecularWeights, SpeciesMap};
use tracing::{debug, info, warn};

use crate::config::{DomainConfig, RunConfig};

/// Output hours per merged emissions file.
const OUTPUT_HOURS: usize = 25;

/// Outputs of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

impl RunSummary {
    fn record_written(&mut self, path: PathBuf) {
        self.written.push(path);
    }

    fn record_skipped(&mut self, path: PathBuf) {
        info!(path = %path.display(), "Output exists; skipping");
        self.skipped.push(path);
    }
}

/// Fire inputs shared by every domain.
struct FireInputs {
    product: GfasProduct,
    species: SpeciesMap,
    weights: MolecularWeights,
}

/// Global CTM inputs shared by every domain.
struct ConditionInputs {
    product: CtmProduct,
    species: SpeciesMap,
}

/// Per-domain state that does not change between dates.
struct DomainCache {
    source: AnthropogenicSource,
    window: SubWindow,
    fire_mapping: Option<GridMapping>,
}

pub struct Pipeline<'a> {
    config: &'a RunConfig,
    conversion: ConversionTable,
    fire: Option<FireInputs>,
    conditions: Option<ConditionInputs>,
    domains: BTreeMap<String, DomainCache>,
}

impl<'a> Pipeline<'a> {
    /// Load species tables and the run-wide fire and CTM products.
    pub fn new(config: &'a RunConfig) -> Result<Self> {
        let conversion = ConversionTable::load(&config.tables.conversion)
            .with_context(|| format!("Failed to load conversion table {:?}", config.tables.conversion))?;

        let fire = if config.features.add_fires {
            let (Some(gfas_file), Some(map_file)) = (&config.paths.gfas_file, &config.tables.fire_species) else {
                anyhow::bail!("add_fires requires paths.gfas_file and tables.fire_species");
            };
            Some(FireInputs {
                product: GfasProduct::open(gfas_file)
                    .with_context(|| format!("Failed to open GFAS product {:?}", gfas_file))?,
                species: SpeciesMap::load(map_file, MapLayout::Fire)
                    .with_context(|| format!("Failed to load fire species map {:?}", map_file))?,
                weights: MolecularWeights::load_all(&config.tables.namelists)
                    .context("Failed to load molecular weights")?,
            })
        } else {
            None
        };

        let conditions = if config.features.prepare_ic_bc {
            let (Some(ctm_file), Some(map_file)) = (&config.paths.ctm_file, &config.tables.bcon_species) else {
                anyhow::bail!("prepare_ic_bc requires paths.ctm_file and tables.bcon_species");
            };
            Some(ConditionInputs {
                product: CtmProduct::open(ctm_file, config.ctm_epoch)
                    .with_context(|| format!("Failed to open global CTM file {:?}", ctm_file))?,
                species: SpeciesMap::load(map_file, MapLayout::Boundary)
                    .with_context(|| format!("Failed to load boundary species map {:?}", map_file))?,
            })
        } else {
            None
        };

        Ok(Self {
            config,
            conversion,
            fire,
            conditions,
            domains: BTreeMap::new(),
        })
    }

    /// Process every configured date and domain.
    pub fn run(&mut self) -> Result<RunSummary> {
        let config = self.config;
        let mut summary = RunSummary::default();
        let days = config.dates.days();
        info!(
            dates = days.len(),
            domains = config.domains.len(),
            fires = self.fire.is_some(),
            biogenic = config.features.add_biogenic,
            ic_bc = self.conditions.is_some(),
            surf_zone = config.features.surf_zone,
            "Starting run"
        );

        for (date_idx, &date) in days.iter().enumerate() {
            for (dom_idx, domain) in config.domains.iter().enumerate() {
                info!(date = %date, domain = %domain.name, "Processing");
                if date_idx == 0 && config.features.surf_zone {
                    self.process_surf_zone(date, domain, &mut summary)
                        .with_context(|| format!("Surf zone for {}", domain.name))?;
                }
                self.process_emissions(date, domain, &mut summary)
                    .with_context(|| format!("Emissions for {} on {}", domain.name, date))?;
                if self.conditions.is_some() {
                    self.process_conditions(date, domain, date_idx == 0, dom_idx == 0, &mut summary)
                        .with_context(|| format!("Initial/boundary conditions for {} on {}", domain.name, date))?;
                }
            }
        }

        info!(
            written = summary.written.len(),
            skipped = summary.skipped.len(),
            "Run complete"
        );
        Ok(summary)
    }

    fn output_names(&self, domain: &DomainConfig) -> OutputNames {
        OutputNames {
            domain: domain.name.clone(),
            grid: domain.grid.clone(),
            mechanism: self.config.mechanism.clone(),
        }
    }

    fn mcip_files(&self, date: NaiveDate, domain: &DomainConfig) -> Result<McipFiles> {
        let dir = self.config.mcip_dir(date, &domain.name);
        match &domain.mcip_suffix {
            Some(suffix) => Ok(McipFiles::new(dir, suffix.clone())),
            None => McipFiles::discover(&dir).with_context(|| format!("No MCIP output in {:?}", dir)),
        }
    }

    fn force(&self) -> bool {
        self.config.features.force_update
    }

    // ========================================================================
    // Emissions
    // ========================================================================

    fn process_emissions(&mut self, date: NaiveDate, domain: &DomainConfig, summary: &mut RunSummary) -> Result<()> {
        let chem_dir = self.config.chem_dir(date, &domain.name);
        let names = self.output_names(domain);
        let merged_path = names.merged_emissions(&chem_dir, date);
        if merged_path.exists() && !self.force() {
            summary.record_skipped(merged_path);
            return Ok(());
        }

        let files = self.mcip_files(date, domain)?;
        let mcip = McipDomain::load(&files).context("Failed to load MCIP grid")?;
        let header = IoapiHeader::from_mcip(&mcip.attributes);
        self.ensure_domain_cache(&files, &mcip, domain)?;
        let cache = self
            .domains
            .get(&domain.name)
            .context("domain cache was not initialised")?;

        let fire = match (&self.fire, &cache.fire_mapping) {
            (Some(inputs), Some(mapping)) => {
                let field = grid_fire(inputs, mapping, &files, &mcip, date)?;
                let fire_path = names.fire_emissions(&chem_dir);
                if fire_path.exists() && !self.force() {
                    summary.record_skipped(fire_path);
                } else {
                    write_output(&fire_path, &fire_dataset(&field, &header)?)?;
                    summary.record_written(fire_path);
                }
                Some(field)
            }
            _ => None,
        };

        let shape = FieldShape::new(OUTPUT_HOURS, mcip.layers, mcip.rows(), mcip.cols());
        let mut acc = EmissionsAccumulator::with_species(shape, cache.source.destination_species());
        let converter = UnitConverter::new(mcip.geometry);
        cache
            .source
            .accumulate(&mut acc, date, &converter, &cache.window)
            .context("Failed to add anthropogenic emissions")?;
        cache.source.apply_zero_fill(&mut acc);

        if self.config.features.add_biogenic {
            let megan = open_megan(&chem_dir, &domain.grid, self.config.megan_mechanism(), date)?;
            add_biogenic(&mut acc, &megan).context("Failed to add biogenic emissions")?;
        }
        if let Some(fire) = &fire {
            add_fire(&mut acc, fire).context("Failed to add fire emissions")?;
        }

        let merged = acc.finalize();
        write_output(&merged_path, &emissions_dataset(&merged, date, &header)?)?;
        summary.record_written(merged_path);
        Ok(())
    }

    /// Set up the anthropogenic source, host window and fire mapping the
    /// first time a domain is seen.
    fn ensure_domain_cache(&mut self, files: &McipFiles, mcip: &McipDomain, domain: &DomainConfig) -> Result<()> {
        if self.domains.contains_key(&domain.name) {
            return Ok(());
        }
        let paths = &self.config.paths;
        let wrf_domain = domain.wrf_domain();

        let source = AnthropogenicSource::discover(
            &paths.anthropogenic_dir,
            wrf_domain,
            self.conversion.clone(),
            self.config.anthropogenic.frequency,
            self.config.temporal,
        )
        .with_context(|| format!("No anthropogenic emissions for {}", wrf_domain))?;

        let mut host_dirs: Vec<&Path> = vec![files.dir()];
        if let Some(wrf_dir) = &paths.wrf_dir {
            host_dirs.push(wrf_dir);
        }
        host_dirs.push(&paths.anthropogenic_dir);
        let host = load_host_grid(&host_dirs, wrf_domain)?;
        let window = find_subwindow(&mcip.grid, &host, &domain.name)?;
        debug!(
            domain = %domain.name,
            row0 = window.row0,
            col0 = window.col0,
            "Located CMAQ domain within the WRF grid"
        );

        let fire_mapping = match &self.fire {
            Some(inputs) => {
                let mapping = fire_mapping(&mcip.grid, &inputs.product)?;
                debug!(domain = %domain.name, overlaps = mapping.overlap_count(), "Computed fire grid mapping");
                Some(mapping)
            }
            None => None,
        };

        self.domains.insert(
            domain.name.clone(),
            DomainCache {
                source,
                window,
                fire_mapping,
            },
        );
        Ok(())
    }

    // ========================================================================
    // Initial and boundary conditions
    // ========================================================================

    fn process_conditions(
        &self,
        date: NaiveDate,
        domain: &DomainConfig,
        initial: bool,
        boundary: bool,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let Some(inputs) = &self.conditions else {
            return Ok(());
        };
        let chem_dir = self.config.chem_dir(date, &domain.name);
        let names = self.output_names(domain);
        let icon_path = names.initial_conditions(&chem_dir);
        let bcon_path = names.boundary_conditions(&chem_dir);

        let do_ic = initial && self.needs_write(&icon_path, summary);
        let do_bc = boundary && self.needs_write(&bcon_path, summary);
        if !(do_ic || do_bc) {
            return Ok(());
        }

        let files = self.mcip_files(date, domain)?;
        let mcip = McipDomain::load(&files).context("Failed to load MCIP grid")?;
        let header = IoapiHeader::from_mcip(&mcip.attributes);

        let met2d = files.open(McipFile::MetCro2d)?;
        let tflags = read_tflags(&met2d)?;
        let steps = &tflags[date_steps(&tflags, date)?];
        let times = steps
            .iter()
            .map(|t| t.to_datetime())
            .collect::<std::result::Result<Vec<DateTime<Utc>>, _>>()?;

        let psurf = met2d
            .require_variable("PRSFC")?
            .get(&[0, 0, mcip.rows() - 1, mcip.cols() - 1])
            .context("PRSFC has no value at the last grid cell")?;
        let levels = inputs
            .product
            .level_indices(psurf, &mcip.sigma, mcip.top_pressure);
        debug!(?levels, psurf, "Matched CMAQ layers to CTM levels");

        if do_ic {
            let builder = ConditionBuilder::new(&inputs.product, &inputs.species, levels.clone(), times[0])?;
            let points = ConditionPoints::interior(&mcip.grid, mcip.layers, &inputs.product);
            let field = builder.build(&points)?;
            write_output(&icon_path, &conditions_dataset(&field, &steps[..1], &header, false)?)?;
            summary.record_written(icon_path);
        }

        if do_bc {
            let bdy = files.open(McipFile::GridBdy2d)?;
            let perimeter = PointSet::new(
                bdy.require_variable("LAT")?.values().to_vec(),
                bdy.require_variable("LON")?.values().to_vec(),
            )?;
            let builder = ConditionBuilder::for_times(&inputs.product, &inputs.species, levels, &times)?;
            let points = ConditionPoints::perimeter(&perimeter, mcip.layers, &inputs.product);
            let field = builder.build(&points)?;
            write_output(&bcon_path, &conditions_dataset(&field, steps, &header, true)?)?;
            summary.record_written(bcon_path);
        }
        Ok(())
    }

    // ========================================================================
    // Surf zone
    // ========================================================================

    fn process_surf_zone(&self, date: NaiveDate, domain: &DomainConfig, summary: &mut RunSummary) -> Result<()> {
        let shapefile = domain
            .coastline
            .as_ref()
            .with_context(|| format!("No coastline shapefile for domain {}", domain.name))?;
        let path = self.output_names(domain).surf_zone(&self.config.paths.ctm_dir);
        if !self.needs_write(&path, summary) {
            return Ok(());
        }

        let files = self.mcip_files(date, domain)?;
        let mcip = McipDomain::load(&files).context("Failed to load MCIP grid")?;
        let cro = files.open(McipFile::GridCro2d)?;
        let header = IoapiHeader::from_mcip(&cro.attributes);

        let bbox = corner_bbox(&mcip.grid)?;
        let coastline = Coastline::load(shapefile, &bbox)?;
        let fractions = surf_zone_fractions(&mcip.grid, &coastline)?;
        write_output(&path, &surf_zone_dataset(&fractions, &header)?)?;
        summary.record_written(path);
        Ok(())
    }

    fn needs_write(&self, path: &Path, summary: &mut RunSummary) -> bool {
        if path.exists() && !self.force() {
            summary.record_skipped(path.to_path_buf());
            return false;
        }
        true
    }
}

/// Lon/lat extent of every cell corner of `grid`.
fn corner_bbox(grid: &CurvilinearGrid) -> Result<BoundingBox> {
    let mut points = Vec::with_capacity((grid.rows() + 1) * (grid.cols() + 1));
    for row in 0..=grid.rows() {
        for col in 0..=grid.cols() {
            let (lat, lon) = grid.corner(row, col)?;
            points.push((lon, lat));
        }
    }
    BoundingBox::from_points(&points).context("Grid has no corners")
}

/// Grid the GFAS step for `date` onto the domain.
fn grid_fire(
    inputs: &FireInputs,
    mapping: &GridMapping,
    files: &McipFiles,
    mcip: &McipDomain,
    date: NaiveDate,
) -> Result<EmissionsField> {
    let met3d = files.open(McipFile::MetCro3d)?;
    let cro = files.open(McipFile::GridCro2d)?;
    let columns = vertical_columns(&met3d, &cro)?;
    if columns.len() != mcip.grid.len() {
        warn!(
            columns = columns.len(),
            cells = mcip.grid.len(),
            "Vertical columns do not cover the grid"
        );
    }
    let gridding = FireGridding {
        species: &inputs.species,
        weights: &inputs.weights,
        mapping,
        columns: &columns,
        layers: mcip.layers,
    };
    let field = gridding
        .grid(&inputs.product, inputs.product.time_index(date))
        .context("Failed to grid fire emissions")?;
    Ok(field)
}
